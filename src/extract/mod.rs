//! Extraction Module
//!
//! グリッドから正規レコードを取り出す2種類の抽出器を提供します。
//!
//! - `flat`: 見出し行1行 + データ行のシート（13F）
//! - `sections`: 列Aのラベルで区切られた自由形式の印刷レイアウト（注文回送レポート）

mod flat;
mod sections;
mod vocabulary;

pub(crate) use flat::{header_labels, header_row, FlatExtractor};
pub(crate) use sections::SectionScanner;
pub use vocabulary::{LayoutVocabulary, SectionSpec};
