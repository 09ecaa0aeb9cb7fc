//! xlsxfiling - Pure-Rust converter from regulatory Excel workbooks to XML filings
//!
//! This crate reads spreadsheets holding regulatory trading data and emits
//! XML documents shaped for the external schemas they are filed against:
//!
//! - **13F information table**: a flat sheet with one header row and one holding
//!   per row. Column headers are resolved against a fixed field vocabulary that
//!   tolerates naming variance.
//! - **Rule 606 order-routing report**: a free-form print layout with one section
//!   per security category. Sections, summary rows and venue lists are located by
//!   the literal labels in the leftmost column.
//!
//! Generated documents can be checked against an XSD with the built-in
//! [`schema`] validator.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxfiling::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // Convert a holdings sheet to a 13F information table
//!     converter.convert_flat("holdings.xlsx", "holdings.xml")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! For in-memory conversion, use `Cursor`:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsxfiling::ConverterBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = ConverterBuilder::new().build()?;
//! let excel_data: Vec<u8> = vec![]; // Your Excel file bytes
//! let mut xml_output = Vec::new();
//! converter.convert_flat_to_writer(Cursor::new(excel_data), &mut xml_output)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Order-Routing Reports
//!
//! ```rust,no_run
//! use xlsxfiling::{ConverterBuilder, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_sheet_selector(SheetSelector::Index(0))
//!         .with_schema("schemas/606.xsd")
//!         .build()?;
//!
//!     let outcome = converter.convert_sectioned("606.xlsx", "out", "Outset Financial", 2024, 2);
//!     for warning in &outcome.warnings {
//!         eprintln!("layout: {}", warning.message);
//!     }
//!     println!("valid: {:?}", outcome.is_valid);
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
mod extract;
mod fields;
mod formatter;
mod model;
mod naming;
mod output;
mod parser;
pub mod schema;
mod security;
mod types;

// 公開API
pub use api::{FilingPeriod, SheetSelector};
pub use builder::{Converter, ConverterBuilder, SectionedOutcome, DEFAULT_MATERIAL_ASPECTS};
pub use error::XlsxToXmlError;
pub use extract::{LayoutVocabulary, SectionSpec};
pub use fields::{
    resolve_field, ColumnRef, FieldKey, FieldSpec, ResolvedColumnMap, INFORMATION_TABLE_FIELDS,
};
pub use formatter::{
    format_cph4, format_decimal2, format_fraction_as_pct, format_integer, format_pct,
    format_usd_amount, format_whole_dollars, numeric, Lexical, NumericKind,
};
pub use model::{
    CategorySummary, InfoTableEntry, LayoutWarning, LayoutWarningKind, OrderTypeValues,
    ReportDocument, SecurityCategoryBlock, VenueRecord,
};
pub use naming::{information_table_file_name, order_routing_file_name};
pub use schema::{Diagnostic, ValidationResult};
pub use security::SecurityConfig;
pub use types::CellValue;
