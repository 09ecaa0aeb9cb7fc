//! Formatter Module
//!
//! セル値をスキーマの単純型が要求する字句形式へ変換するモジュール。
//!
//! すべての関数は全域関数です。欠損・空白・数値として解析できない入力は
//! エラーにならず、型ごとに定められたデフォルト値に置き換えられます。
//!
//! | 関数 | 字句形式 | デフォルト |
//! |------|----------|------------|
//! | [`format_pct`] | 小数2桁 | `""` |
//! | [`format_decimal2`] | 符号付き小数2桁 | `""` |
//! | [`format_cph4`] | 小数4桁 | `""` |
//! | [`format_usd_amount`] | 小数2桁 | `"0.00"` |
//! | [`format_integer`] | 整数 | `"0"` |
//! | [`format_whole_dollars`] | 整数（四捨五入） | `"0"` |

use crate::types::CellValue;

/// 書式化の結果
///
/// 値が解析できたか、デフォルト値にフォールバックしたかを区別します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexical {
    /// 入力値から生成された字句
    Parsed(String),
    /// 入力が欠損・解析不能だったため採用されたデフォルト字句
    Defaulted(String),
}

impl Lexical {
    /// 字句を文字列スライスとして取得
    pub fn as_str(&self) -> &str {
        match self {
            Lexical::Parsed(s) | Lexical::Defaulted(s) => s,
        }
    }

    /// 字句を`String`として取り出す
    pub fn into_string(self) -> String {
        match self {
            Lexical::Parsed(s) | Lexical::Defaulted(s) => s,
        }
    }

    /// デフォルト値が採用されたかどうか
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Lexical::Defaulted(_))
    }
}

impl std::fmt::Display for Lexical {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 列が保持する数値の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// 数値ではない（テキスト列）
    None,
    /// 整数（株数、議決権数など）
    Integer,
    /// 小数（金額など）
    Decimal,
}

/// セル値を数値として解釈する（ベストエフォート）
///
/// 空セル、空白文字列、数値として解析できない値は`None`になります。
pub fn numeric(cell: &CellValue) -> Option<f64> {
    cell.as_number()
}

/// 固定小数点で書式化し、`-0.00`のような負のゼロを正規化する
fn fixed(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

fn fixed_or(value: Option<f64>, places: usize, default: &str) -> Lexical {
    match value {
        Some(v) if v.is_finite() => Lexical::Parsed(fixed(v, places)),
        _ => Lexical::Defaulted(default.to_string()),
    }
}

/// パーセンテージ（小数2桁、スケーリングなし）
///
/// 例: `25.5` → `"25.50"`。欠損時は`""`（該当なし）。
pub fn format_pct(value: Option<f64>) -> Lexical {
    fixed_or(value, 2, "")
}

/// 符号付き通貨金額（小数2桁）
///
/// 例: `-5.5` → `"-5.50"`。欠損時は`""`。
pub fn format_decimal2(value: Option<f64>) -> Lexical {
    fixed_or(value, 2, "")
}

/// 100株あたりのレート（小数4桁）
///
/// 例: `0.12` → `"0.1200"`。欠損時は`""`。
pub fn format_cph4(value: Option<f64>) -> Lexical {
    fixed_or(value, 4, "")
}

/// USD金額（小数2桁）
///
/// 他の3関数と異なり、欠損時は`"0.00"`を返します。
/// スキーマ上「報告なし」ではなく「ゼロ」として扱われる値に使用します。
///
/// 組み込みの2種類の変換はこの字句を使いません（注文回送レポートの支払額は
/// 欠損を`""`として出力します）。PDFなど別の入力から注文回送レポートの値を
/// 組み立てる呼び出し側のための公開ヘルパーです。
///
/// ```rust
/// use xlsxfiling::{format_usd_amount, Lexical};
///
/// assert_eq!(format_usd_amount(Some(-1250.5)).as_str(), "-1250.50");
/// assert_eq!(format_usd_amount(None), Lexical::Defaulted("0.00".to_string()));
/// ```
pub fn format_usd_amount(value: Option<f64>) -> Lexical {
    fixed_or(value, 2, "0.00")
}

/// 整数フィールド（桁区切り・符号パディングなし）
///
/// 小数部は切り捨てます。欠損時は`"0"`。
pub fn format_integer(value: Option<f64>) -> Lexical {
    match value {
        Some(v) if v.is_finite() => Lexical::Parsed(format!("{}", v.trunc() as i64)),
        _ => Lexical::Defaulted("0".to_string()),
    }
}

/// 金額をドル単位に丸めた整数
///
/// 元データの精度に関わらず、最も近い整数へ丸めます（0.5は0から遠い方向）。
/// 解析できない場合は[`format_usd_amount`]と同じくゼロ扱いで`"0"`。
pub fn format_whole_dollars(value: Option<f64>) -> Lexical {
    match value {
        Some(v) if v.is_finite() => Lexical::Parsed(format!("{}", v.round() as i64)),
        _ => Lexical::Defaulted("0".to_string()),
    }
}

/// 割合（0〜1）をパーセンテージ字句に変換
///
/// 例: `0.2` → `"20.00"`。欠損時は`""`。
pub fn format_fraction_as_pct(fraction: Option<f64>) -> Lexical {
    format_pct(fraction.map(|f| f * 100.0))
}
