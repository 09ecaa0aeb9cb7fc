//! Field Resolution Module
//!
//! 表記揺れのある列見出しを、文書種別ごとに固定された正規フィールドへ対応付ける。
//!
//! 比較はすべて前後の空白を除去し、大文字・小文字を区別せずに行います。
//! 優先順位は次のとおりです。
//!
//! 1. 主ラベルとの完全一致
//! 2. 同義語との完全一致（定義順で最初に一致したもの）
//! 3. 位置フォールバックのラベルが見出しとして存在する場合、その列
//! 4. 位置フォールバックの末尾が整数で、有効な列インデックスの場合、その列
//! 5. 該当なし

use std::collections::BTreeMap;
use std::fmt;

use crate::error::XlsxToXmlError;
use crate::formatter::NumericKind;

/// 13F情報テーブルの正規フィールドキー
///
/// キーは文書種別内で一意です（列挙型で表現することで保証）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    NameOfIssuer,
    TitleOfClass,
    Cusip,
    Figi,
    Value,
    SshPrnamt,
    SshPrnamtType,
    PutCall,
    InvestmentDiscretion,
    OtherManager,
    VotingSole,
    VotingShared,
    VotingNone,
}

impl FieldKey {
    /// 正規キー文字列（出力XMLの要素名と同じ）
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::NameOfIssuer => "nameOfIssuer",
            FieldKey::TitleOfClass => "titleOfClass",
            FieldKey::Cusip => "cusip",
            FieldKey::Figi => "figi",
            FieldKey::Value => "value",
            FieldKey::SshPrnamt => "sshPrnamt",
            FieldKey::SshPrnamtType => "sshPrnamtType",
            FieldKey::PutCall => "putCall",
            FieldKey::InvestmentDiscretion => "investmentDiscretion",
            FieldKey::OtherManager => "otherManager",
            FieldKey::VotingSole => "Sole",
            FieldKey::VotingShared => "Shared",
            FieldKey::VotingNone => "None",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 正規フィールドの定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// 正規キー
    pub key: FieldKey,
    /// 主ラベル
    pub primary_label: &'static str,
    /// 同義語（評価順）
    pub synonyms: &'static [&'static str],
    /// 必須フィールドかどうか
    pub required: bool,
    /// 数値の種類
    pub numeric: NumericKind,
    /// 位置フォールバック（見出しラベル、または末尾が列インデックスのプレースホルダー）
    pub positional_fallback: Option<&'static str>,
}

/// 13F情報テーブルのフィールド定義（定義順 = エラーメッセージの列挙順）
pub const INFORMATION_TABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: FieldKey::NameOfIssuer,
        primary_label: "Name of Issuer",
        synonyms: &["Issuer", "Issuer Name", "Name"],
        required: true,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::TitleOfClass,
        primary_label: "Title of Class",
        synonyms: &["Class", "Class Title", "Title"],
        required: true,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::Cusip,
        primary_label: "Cusip",
        synonyms: &["Cusip Number", "CUSIP No"],
        required: true,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::Figi,
        primary_label: "FIGI",
        synonyms: &["Figi Number"],
        required: false,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::Value,
        primary_label: "Value (to the nearest dollar)",
        synonyms: &["Value", "Market Value", "Fair Market Value"],
        required: true,
        numeric: NumericKind::Decimal,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::SshPrnamt,
        primary_label: "Shares or Principal Amount",
        synonyms: &["Shares", "Shares/Prn Amt", "Principal Amount", "Amount"],
        required: true,
        numeric: NumericKind::Integer,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::SshPrnamtType,
        primary_label: "Shares/Principal",
        synonyms: &["SH/PRN", "Type"],
        required: true,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::PutCall,
        primary_label: "put/call",
        synonyms: &["Put Call"],
        required: false,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::InvestmentDiscretion,
        primary_label: "Investment Discretion",
        synonyms: &["Discretion"],
        required: true,
        numeric: NumericKind::None,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::OtherManager,
        primary_label: "Other Managers",
        synonyms: &["Other Manager", "Managers"],
        required: false,
        numeric: NumericKind::Integer,
        positional_fallback: None,
    },
    FieldSpec {
        key: FieldKey::VotingSole,
        primary_label: "Sole",
        synonyms: &["Voting Sole", "Voting Authority Sole"],
        required: true,
        numeric: NumericKind::Integer,
        positional_fallback: Some("Unnamed: 9"),
    },
    FieldSpec {
        key: FieldKey::VotingShared,
        primary_label: "Shared",
        synonyms: &["Voting Shared", "Voting Authority Shared"],
        required: true,
        numeric: NumericKind::Integer,
        positional_fallback: Some("Unnamed: 10"),
    },
    FieldSpec {
        key: FieldKey::VotingNone,
        primary_label: "None",
        synonyms: &["Voting None", "Voting Authority None"],
        required: true,
        numeric: NumericKind::Integer,
        positional_fallback: Some("Unnamed: 11"),
    },
];

/// 解決された列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// 列インデックス（0始まり）
    pub index: usize,
    /// シート上の見出しテキスト
    pub label: String,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

fn find_label(headers: &[String], label: &str) -> Option<usize> {
    let wanted = normalize(label);
    headers.iter().position(|h| normalize(h) == wanted)
}

/// プレースホルダー末尾の整数（例: `"Unnamed: 10"` → `10`）
fn trailing_index(label: &str) -> Option<usize> {
    let trimmed = label.trim_end();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}

/// 1つのフィールド定義を列見出しに対して解決する
///
/// # 使用例
///
/// ```rust
/// use xlsxfiling::{resolve_field, INFORMATION_TABLE_FIELDS};
///
/// let headers = vec!["  ISSUER ".to_string(), "Cusip".to_string()];
/// let column = resolve_field(&headers, &INFORMATION_TABLE_FIELDS[0]).unwrap();
/// assert_eq!(column.index, 0);
/// ```
pub fn resolve_field(headers: &[String], spec: &FieldSpec) -> Option<ColumnRef> {
    let column_ref = |index: usize| ColumnRef {
        index,
        label: headers[index].clone(),
    };

    // 1. 主ラベル
    if let Some(index) = find_label(headers, spec.primary_label) {
        return Some(column_ref(index));
    }

    // 2. 同義語
    for synonym in spec.synonyms {
        if let Some(index) = find_label(headers, synonym) {
            return Some(column_ref(index));
        }
    }

    let fallback = spec.positional_fallback?;

    // 3. フォールバックラベルが見出しとして存在する
    if let Some(index) = find_label(headers, fallback) {
        return Some(column_ref(index));
    }

    // 4. 末尾の整数を列インデックスとして無条件に採用
    trailing_index(fallback)
        .filter(|index| *index < headers.len())
        .map(column_ref)
}

/// 正規キーから実際の列への対応表
///
/// 変換ごとに1回だけ構築され、行ごとに再解決することはありません。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedColumnMap {
    columns: BTreeMap<FieldKey, ColumnRef>,
}

impl ResolvedColumnMap {
    /// すべてのフィールド定義を解決する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ResolvedColumnMap)` - すべての必須フィールドが解決できた場合
    /// * `Err(XlsxToXmlError::FieldResolution)` - 解決できなかった必須フィールドをすべて列挙
    pub fn build(headers: &[String], specs: &[FieldSpec]) -> Result<Self, XlsxToXmlError> {
        let mut columns = BTreeMap::new();
        let mut missing = Vec::new();

        for spec in specs {
            match resolve_field(headers, spec) {
                Some(column) => {
                    log::debug!(
                        "Resolved field '{}' to column {} ('{}')",
                        spec.key,
                        column.index,
                        column.label
                    );
                    columns.insert(spec.key, column);
                }
                None if spec.required => missing.push(spec.key.as_str().to_string()),
                None => log::debug!("Optional field '{}' not present", spec.key),
            }
        }

        if !missing.is_empty() {
            return Err(XlsxToXmlError::FieldResolution { missing });
        }

        Ok(Self { columns })
    }

    /// 正規キーに対応する列
    pub fn get(&self, key: FieldKey) -> Option<&ColumnRef> {
        self.columns.get(&key)
    }

    /// 正規キーに対応する列インデックス
    pub fn index_of(&self, key: FieldKey) -> Option<usize> {
        self.get(key).map(|c| c.index)
    }

    /// 解決済みフィールド数
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// 解決済みフィールドが1つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
