//! Public API Types
//!
//! 公開APIで使用する列挙型・値型を定義するモジュール。

use serde::Serialize;

use crate::error::XlsxToXmlError;

/// シート選択方式
///
/// 変換対象となる1枚のシートを選択する方法を指定します。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SheetSelector {
    /// 先頭のシート（デフォルト）
    #[default]
    First,

    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(1)` は2枚目のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Holdings".to_string())`
    Name(String),
}

/// 報告対象期間（年・四半期）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FilingPeriod {
    /// 西暦年（例: 2024）
    pub year: u16,
    /// 四半期（1〜4）
    pub quarter: u8,
}

impl FilingPeriod {
    /// 期間を生成し、四半期の範囲を検証する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxfiling::FilingPeriod;
    ///
    /// let period = FilingPeriod::new(2024, 2).unwrap();
    /// assert_eq!(period.first_month(), 4);
    /// assert!(FilingPeriod::new(2024, 5).is_err());
    /// ```
    pub fn new(year: u16, quarter: u8) -> Result<Self, XlsxToXmlError> {
        if !(1..=4).contains(&quarter) {
            return Err(XlsxToXmlError::Config(format!(
                "Quarter must be between 1 and 4, got {}",
                quarter
            )));
        }
        Ok(Self { year, quarter })
    }

    /// 四半期の最初の月（1, 4, 7, 10）
    pub fn first_month(&self) -> u8 {
        (self.quarter - 1) * 3 + 1
    }

    /// ファイル名用の四半期トークン（例: Q1 2025 → `1q25`）
    pub fn token(&self) -> String {
        format!("{}q{:02}", self.quarter, self.year % 100)
    }
}
