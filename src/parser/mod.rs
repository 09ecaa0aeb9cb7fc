//! Parser Module
//!
//! calamineを使用したExcelファイル解析。
//! 選択した1枚のシートを、絶対座標の[`Grid`](crate::types::Grid)として取り出します。

mod workbook;

pub(crate) use workbook::WorkbookParser;
