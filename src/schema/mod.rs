//! Schema Validator Module
//!
//! 生成したXMLを外部のXSDで事後検証します。XSDは組み立て処理には使いません。
//!
//! 対応するXSDの範囲は、要素宣言（`ref`を含む）、名前付き・無名の複合型、
//! `sequence`／`choice`／`all`と出現回数、`simpleContent`、属性、
//! 制約ファセット付きの単純型、`union`／`list`、主要な組み込み型です。
//! 診断はlibxml2と同じ文面で、行・列とともに文書順に返します。
//!
//! # 使用例
//!
//! ```rust
//! use xlsxfiling::schema::validate_str;
//!
//! let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="qtr" type="xs:positiveInteger"/>
//! </xs:schema>"#;
//!
//! assert!(validate_str("<qtr>2</qtr>", xsd).is_valid);
//! assert!(!validate_str("<qtr>0</qtr>", xsd).is_valid);
//! ```

mod compile;
mod datatypes;
mod model;
mod validator;

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

pub use model::Schema;

/// 検証の診断1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1始まりの行番号（ファイルを読めなかった場合は0）
    pub line: u32,
    /// 1始まりの列番号（ファイルを読めなかった場合は0）
    pub column: u32,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// 検証結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            is_valid: diagnostics.is_empty(),
            diagnostics,
        }
    }

    /// `行:列: メッセージ`形式の一覧
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

impl Schema {
    /// XSDテキストからスキーマをコンパイル
    pub fn parse(text: &str) -> Result<Self, Diagnostic> {
        compile::compile_schema(text)
    }

    /// XSDファイルを読み込んでコンパイル
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Diagnostic> {
        Self::parse(&read_resource(path.as_ref())?)
    }

    /// XMLテキストを検証
    pub fn validate_str(&self, xml: &str) -> ValidationResult {
        let result = ValidationResult::from_diagnostics(validator::validate_document(self, xml));
        log::debug!(
            "Schema validation finished: {} diagnostic(s)",
            result.diagnostics.len()
        );
        result
    }

    /// XMLファイルを検証
    pub fn validate_file(&self, xml_path: impl AsRef<Path>) -> ValidationResult {
        match read_resource(xml_path.as_ref()) {
            Ok(xml) => self.validate_str(&xml),
            Err(diagnostic) => ValidationResult::from_diagnostics(vec![diagnostic]),
        }
    }
}

fn read_resource(path: &Path) -> Result<String, Diagnostic> {
    fs::read_to_string(path).map_err(|e| Diagnostic {
        line: 0,
        column: 0,
        message: format!("Failed to load '{}': {}", path.display(), e),
    })
}

/// XMLファイルをXSDファイルで検証
///
/// どちらかの読み込み・解析に失敗した場合も例外的な終了はせず、
/// 診断1件を持つ不合格の結果を返します。入力は変更しません。
pub fn validate(xml_path: impl AsRef<Path>, schema_path: impl AsRef<Path>) -> ValidationResult {
    match Schema::from_file(schema_path) {
        Ok(schema) => schema.validate_file(xml_path),
        Err(diagnostic) => ValidationResult::from_diagnostics(vec![diagnostic]),
    }
}

/// メモリ上のXMLとXSDで検証
pub fn validate_str(xml: &str, xsd: &str) -> ValidationResult {
    match Schema::parse(xsd) {
        Ok(schema) => schema.validate_str(xml),
        Err(diagnostic) => ValidationResult::from_diagnostics(vec![diagnostic]),
    }
}
