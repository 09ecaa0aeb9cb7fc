//! CLI Tool Example
//!
//! This example demonstrates how to build a command-line tool
//! using xlsxfiling for converting regulatory workbooks to XML filings.
//!
//! Set `RUST_LOG=debug` to see how columns and sections were located.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use xlsxfiling::{ConverterBuilder, FilingPeriod, SheetSelector, XlsxToXmlError};

fn usage(program: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {} 13f <input.xlsx> <output.xml|-> [options]", program);
    eprintln!("  {} 13f-dir <input_dir> <output_dir> --year <y> --quarter <q> [options]", program);
    eprintln!("  {} 606 <input.xlsx> <output_dir> --firm <name> --year <y> --quarter <q> [options]", program);
    eprintln!("\nOptions:");
    eprintln!("  --sheet-index <n>    Select sheet by index (0-based)");
    eprintln!("  --sheet-name <name>  Select sheet by name");
    eprintln!("  --schema <xsd>       Validate the order routing report against an XSD");
    eprintln!("  --json               Print the order routing outcome as JSON");
    eprintln!("\nExamples:");
    eprintln!("  {} 13f holdings.xlsx holdings.xml", program);
    eprintln!("  {} 13f holdings.xlsx - --sheet-name \"Holdings\"", program);
    eprintln!(
        "  {} 606 606.xlsx out --firm \"Outset Financial\" --year 2024 --quarter 2 --schema 606.xsd",
        program
    );
    eprintln!(
        "  {} 606 606.xlsx out --firm \"Outset Financial\" --year 2024 --quarter 2 --json",
        program
    );
    process::exit(1);
}

#[derive(Default)]
struct Options {
    sheet_selector: SheetSelector,
    schema: Option<PathBuf>,
    firm: Option<String>,
    year: Option<u16>,
    quarter: Option<u8>,
    json: bool,
}

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    args.get(i + 1).cloned().unwrap_or_else(|| {
        eprintln!("Error: {} requires a value", flag);
        process::exit(1);
    })
}

fn parse_number<T: std::str::FromStr>(text: &str, flag: &str) -> T {
    text.parse::<T>().unwrap_or_else(|_| {
        eprintln!("Error: Invalid value for {}: {}", flag, text);
        process::exit(1);
    })
}

fn parse_options(args: &[String]) -> Options {
    let mut options = Options::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--json" {
            options.json = true;
            i += 1;
            continue;
        }
        match flag {
            "--sheet-index" => {
                options.sheet_selector =
                    SheetSelector::Index(parse_number(&value_of(args, i, flag), flag));
            }
            "--sheet-name" => {
                options.sheet_selector = SheetSelector::Name(value_of(args, i, flag));
            }
            "--schema" => options.schema = Some(PathBuf::from(value_of(args, i, flag))),
            "--firm" => options.firm = Some(value_of(args, i, flag)),
            "--year" => options.year = Some(parse_number(&value_of(args, i, flag), flag)),
            "--quarter" => options.quarter = Some(parse_number(&value_of(args, i, flag), flag)),
            _ => {
                eprintln!("Error: Unknown option: {}", flag);
                process::exit(1);
            }
        }
        i += 2;
    }
    options
}

fn period_of(options: &Options) -> Result<FilingPeriod, XlsxToXmlError> {
    match (options.year, options.quarter) {
        (Some(year), Some(quarter)) => FilingPeriod::new(year, quarter),
        _ => Err(XlsxToXmlError::Config(
            "--year and --quarter are required".to_string(),
        )),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        usage(&args[0]);
    }

    let options = parse_options(&args[4..]);
    let result = match args[1].as_str() {
        "13f" => convert_holdings(&args[2], &args[3], options),
        "13f-dir" => convert_holdings_dir(&args[2], &args[3], options),
        "606" => convert_order_routing(&args[2], &args[3], options),
        _ => usage(&args[0]),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            handle_error(e);
            process::exit(1);
        }
    }
}

fn convert_holdings(
    input_path: &str,
    output_path: &str,
    options: Options,
) -> Result<bool, XlsxToXmlError> {
    let converter = ConverterBuilder::new()
        .with_sheet_selector(options.sheet_selector)
        .build()?;

    if output_path == "-" {
        let input = std::fs::File::open(input_path)?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        converter.convert_flat_to_writer(input, &mut handle)?;
        handle.flush()?;
    } else {
        converter.convert_flat(input_path, output_path)?;
        println!("Conversion completed: {} -> {}", input_path, output_path);
    }
    Ok(true)
}

fn convert_holdings_dir(
    input_dir: &str,
    output_dir: &str,
    options: Options,
) -> Result<bool, XlsxToXmlError> {
    let period = period_of(&options)?;
    let converter = ConverterBuilder::new()
        .with_sheet_selector(options.sheet_selector)
        .build()?;

    let mut all_ok = true;
    for (input, result) in converter.convert_directory(input_dir, output_dir, &period)? {
        match result {
            Ok(output) => println!("{} -> {}", input.display(), output.display()),
            Err(e) => {
                all_ok = false;
                eprintln!("{}: {}", input.display(), e);
            }
        }
    }
    Ok(all_ok)
}

fn convert_order_routing(
    input_path: &str,
    output_dir: &str,
    options: Options,
) -> Result<bool, XlsxToXmlError> {
    let period = period_of(&options)?;
    let firm = options
        .firm
        .ok_or_else(|| XlsxToXmlError::Config("--firm is required".to_string()))?;

    let mut builder = ConverterBuilder::new().with_sheet_selector(options.sheet_selector);
    if let Some(schema) = options.schema {
        builder = builder.with_schema(schema);
    }
    let converter = builder.build()?;

    let outcome =
        converter.convert_sectioned(input_path, output_dir, &firm, period.year, period.quarter);
    let succeeded = outcome.output_path.is_some() && outcome.is_valid != Some(false);

    if options.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to serialize outcome: {}", e);
                return Ok(false);
            }
        }
        return Ok(succeeded);
    }

    for warning in &outcome.warnings {
        eprintln!("Layout warning: {}", warning.message);
    }
    if let Some(path) = &outcome.output_path {
        println!("Report written to: {}", path.display());
    }
    match outcome.is_valid {
        Some(true) => println!("Schema validation passed."),
        Some(false) => {
            eprintln!("Schema validation failed:");
            for message in &outcome.diagnostics {
                eprintln!("  {}", message);
            }
        }
        None => {}
    }

    Ok(succeeded)
}

fn handle_error(error: XlsxToXmlError) {
    match error {
        XlsxToXmlError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        XlsxToXmlError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The file may not be a valid Excel file or may be corrupted.");
        }
        XlsxToXmlError::Xml(xml_err) => {
            eprintln!("XML Error: {}", xml_err);
        }
        XlsxToXmlError::Zip(msg) => {
            eprintln!("ZIP Archive Error: {}", msg);
            eprintln!("The file may be corrupted or not a valid ZIP archive.");
        }
        XlsxToXmlError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        XlsxToXmlError::FieldResolution { missing } => {
            eprintln!("Required column(s) not found:");
            for field in missing {
                eprintln!("  {}", field);
            }
        }
        XlsxToXmlError::RowProcessing { row, cell, message } => {
            eprintln!("Row Processing Error:");
            eprintln!("  Row: {}", row);
            eprintln!("  Cell: {}", cell);
            eprintln!("  Details: {}", message);
        }
        XlsxToXmlError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The file violates security constraints (e.g., file size limit).");
        }
    }
}
