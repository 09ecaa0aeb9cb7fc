//! Layout Vocabulary Module
//!
//! 注文回送レポートのレイアウトを識別するラベル語彙。
//! レポートのテンプレートが変わった場合は、コードではなくこの設定を差し替えます。

/// 1つの証券カテゴリーセクションの定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    /// シート列Aに記載されるセクション見出し（大文字・小文字を区別して一致）
    pub title: String,
    /// カテゴリー名
    pub category_name: String,
    /// 出力XMLの要素名
    pub element: String,
}

impl SectionSpec {
    /// セクション定義を生成
    pub fn new(title: &str, category_name: &str, element: &str) -> Self {
        Self {
            title: title.to_string(),
            category_name: category_name.to_string(),
            element: element.to_string(),
        }
    }
}

/// セクション走査用のラベル語彙
///
/// # 使用例
///
/// ```rust
/// use xlsxfiling::LayoutVocabulary;
///
/// let mut vocabulary = LayoutVocabulary::default();
/// vocabulary.footer_sentinels.push("3rd Quarter, 2024".to_string());
/// assert_eq!(vocabulary.sections.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutVocabulary {
    /// 語彙のバージョン（レポートテンプレートの識別用）
    pub version: String,
    /// セクション定義（この順でカテゴリーが出力される）
    pub sections: Vec<SectionSpec>,
    /// 集計ブロックのラベル（大文字・小文字を区別しない）
    pub summary_label: String,
    /// 執行場所リストのラベル（大文字・小文字を区別しない）
    pub venues_label: String,
    /// 執行場所リストを終了させる完全一致の文字列
    pub footer_sentinels: Vec<String>,
    /// 執行場所リストを終了させる前方一致の文字列
    pub sentinel_prefixes: Vec<String>,
    /// 執行場所リストを終了させる正規表現（コンバーター構築時にコンパイル）
    pub sentinel_patterns: Vec<String>,
}

impl Default for LayoutVocabulary {
    /// 2024年版レポートテンプレートの語彙
    fn default() -> Self {
        Self {
            version: "2024.2".to_string(),
            sections: vec![
                SectionSpec::new("S&P 500 Stocks", "NMS Stock", "rSP500"),
                SectionSpec::new("Non-S&P 500 stocks", "Other NMS Stock", "rOtherStocks"),
                SectionSpec::new("Options", "Option", "rOptions"),
            ],
            summary_label: "Summary".to_string(),
            venues_label: "Venues".to_string(),
            footer_sentinels: vec!["2nd Quarter, 2024".to_string()],
            sentinel_prefixes: vec!["Outset does not have".to_string()],
            sentinel_patterns: vec![r"^(1st|2nd|3rd|4th) Quarter, \d{4}$".to_string()],
        }
    }
}

impl LayoutVocabulary {
    /// テキストがいずれかのセクション見出しと一致するか
    pub fn is_section_title(&self, text: &str) -> bool {
        self.sections.iter().any(|s| s.title == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections_in_category_order() {
        let vocabulary = LayoutVocabulary::default();
        let elements: Vec<&str> = vocabulary.sections.iter().map(|s| s.element.as_str()).collect();
        assert_eq!(elements, vec!["rSP500", "rOtherStocks", "rOptions"]);
    }

    #[test]
    fn test_is_section_title_case_sensitive() {
        let vocabulary = LayoutVocabulary::default();
        assert!(vocabulary.is_section_title("Options"));
        assert!(!vocabulary.is_section_title("options"));
        assert!(!vocabulary.is_section_title("Summary"));
    }
}
