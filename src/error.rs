//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 致命的でない状態（レイアウト警告、数値のデフォルト値、スキーマ検証結果）は
//! エラーではなく値として返されます。

use thiserror::Error;

/// xlsxfilingクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、列解決、行抽出、XML出力の各段階で発生する
/// 致命的なエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（入力ファイルなし、出力先に書き込めないなど）
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Xml`: XML文書の書き出し中に発生したエラー（quick-xml由来）
/// - `Config`: 設定の検証に失敗したエラー
/// - `FieldResolution`: 必須列が見つからないエラー（行の読み込み前に発生）
/// - `RowProcessing`: 列解決後に特定の行の抽出に失敗したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxfiling::XlsxToXmlError;
/// use std::fs::File;
///
/// fn open_positions(path: &str) -> Result<(), XlsxToXmlError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxToXmlError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// ファイル形式が不正、破損したファイル、サポートされていない形式などが
    /// 原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// XML文書の書き出しエラー
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIPアーカイブの検査エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時、または変換呼び出しの引数検証時に発生します。
    /// 例えば、四半期が1〜4の範囲外の場合や、シートが見つからない場合です。
    #[error("Configuration error: {0}")]
    Config(String),

    /// 必須フィールドが列見出しに解決できなかったエラー
    ///
    /// 最初の1件だけでなく、見つからなかったすべてのフィールドを列挙します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxfiling::XlsxToXmlError;
    ///
    /// let error = XlsxToXmlError::FieldResolution {
    ///     missing: vec!["cusip".to_string(), "value".to_string()],
    /// };
    /// // 出力: "Required column(s) not found: cusip, value"
    /// println!("{}", error);
    /// ```
    #[error("Required column(s) not found: {}", .missing.join(", "))]
    FieldResolution {
        /// 解決できなかった正規フィールドキー（定義順）
        missing: Vec<String>,
    },

    /// 行の抽出に失敗したエラー
    ///
    /// 1行でも失敗した場合、変換全体が中断されます（部分的な文書は出力しません）。
    #[error("Failed to process row {row} (cell {cell}): {message}")]
    RowProcessing {
        /// シート上の行番号（1始まり）
        row: u32,
        /// 問題のセル座標（A1記法）
        cell: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
