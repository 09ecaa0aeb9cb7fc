//! Output Naming Module
//!
//! 提出ファイルの命名規則。

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::api::FilingPeriod;

/// ファイル名末尾の固定トークン
const THIRTEEN_F_SUFFIX: &str = "13f";

/// `<四半期>q<西暦下2桁>`形式のトークン（例: `1q25`）
static RE_PERIOD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[1-4]q\d{2}").expect("valid period token regex"));

/// 13F情報テーブルの出力ファイル名
///
/// 入力ファイル名の語幹を小文字の英数字のみにし、末尾の`13f`を除いたうえで、
/// 四半期トークンがなければ付加し、最後に`13f.xml`を付けます。
///
/// # 使用例
///
/// ```rust
/// use xlsxfiling::{information_table_file_name, FilingPeriod};
///
/// let period = FilingPeriod::new(2024, 4).unwrap();
/// assert_eq!(
///     information_table_file_name("Zeno Capital.xlsx", &period),
///     "zenocapital4q2413f.xml"
/// );
/// ```
pub fn information_table_file_name(input: impl AsRef<Path>, period: &FilingPeriod) -> String {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut base: String = stem
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if let Some(trimmed) = base.strip_suffix(THIRTEEN_F_SUFFIX) {
        base = trimmed.to_string();
    }

    if !RE_PERIOD_TOKEN.is_match(&base) {
        base.push_str(&period.token());
    }

    format!("{}{}.xml", base, THIRTEEN_F_SUFFIX)
}

/// 注文回送レポートの出力ファイル名
///
/// `<会社名の最初の単語>_606_NMS_<年>_Q<四半期>.xml`。英数字（Unicodeを含む）以外は`_`に置き換えます。
pub fn order_routing_file_name(firm_name: &str, period: &FilingPeriod) -> String {
    let first_word = firm_name.split_whitespace().next().unwrap_or("report");
    let sanitized: String = first_word
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{}_606_NMS_{}_Q{}.xml",
        sanitized, period.year, period.quarter
    )
}
