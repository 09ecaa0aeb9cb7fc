//! Section Scanner
//!
//! 注文回送レポートのシートは印刷用のレイアウトであり、構造上の目印を持ちません。
//! A列のラベル文字列とそこからの相対位置だけを手がかりに、
//! セクション、集計ブロック、執行場所リストを特定します。

use regex::Regex;

use crate::error::XlsxToXmlError;
use crate::extract::vocabulary::{LayoutVocabulary, SectionSpec};
use crate::formatter::{format_pct, numeric};
use crate::model::{
    CategorySummary, LayoutWarning, LayoutWarningKind, OrderTypeValues, SecurityCategoryBlock,
    VenueRecord,
};
use crate::types::Grid;

/// ラベル行から値の行までのオフセット（ラベル → 見出し → 値）
const LABEL_TO_VALUES: usize = 2;

/// 執行場所行の列配置
const VENUE_PCT_COLS: [usize; 4] = [1, 2, 3, 4];
const VENUE_USD_COLS: [usize; 4] = [5, 6, 7, 8];

/// セクション走査器
///
/// 語彙の正規表現は構築時に一度だけコンパイルします。
#[derive(Debug, Clone)]
pub(crate) struct SectionScanner {
    vocabulary: LayoutVocabulary,
    patterns: Vec<Regex>,
    material_aspects: String,
}

/// 1セクションの走査中に見つかった位置
#[derive(Debug, Default)]
struct SectionLayout {
    title_row: usize,
    summary_label_row: Option<usize>,
    venues_label_row: Option<usize>,
}

impl SectionScanner {
    /// 走査器を生成
    ///
    /// # エラー
    ///
    /// * `XlsxToXmlError::Config` - セクション定義が空、または正規表現が不正な場合
    pub fn new(
        vocabulary: LayoutVocabulary,
        material_aspects: String,
    ) -> Result<Self, XlsxToXmlError> {
        if vocabulary.sections.is_empty() {
            return Err(XlsxToXmlError::Config(
                "Layout vocabulary defines no sections".to_string(),
            ));
        }

        let patterns = vocabulary
            .sentinel_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    XlsxToXmlError::Config(format!("Invalid sentinel pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            vocabulary,
            patterns,
            material_aspects,
        })
    }

    /// 語彙のバージョン
    pub fn vocabulary_version(&self) -> &str {
        &self.vocabulary.version
    }

    /// 先頭セルの値が執行場所リストの終端を示すか
    pub fn is_sentinel(&self, text: &str) -> bool {
        self.vocabulary.footer_sentinels.iter().any(|s| s == text)
            || self
                .vocabulary
                .sentinel_prefixes
                .iter()
                .any(|p| text.starts_with(p.as_str()))
            || self.patterns.iter().any(|re| re.is_match(text))
    }

    /// すべてのセクションを語彙の順に走査
    ///
    /// 見つからないセクションも空のブロックとして出力に含め、警告を記録します。
    pub fn scan(&self, grid: &Grid) -> (Vec<SecurityCategoryBlock>, Vec<LayoutWarning>) {
        let mut warnings = Vec::new();
        let blocks = self
            .vocabulary
            .sections
            .iter()
            .map(|spec| self.scan_section(grid, spec, &mut warnings))
            .collect();
        (blocks, warnings)
    }

    fn scan_section(
        &self,
        grid: &Grid,
        spec: &SectionSpec,
        warnings: &mut Vec<LayoutWarning>,
    ) -> SecurityCategoryBlock {
        let mut block = SecurityCategoryBlock {
            category_name: spec.category_name.clone(),
            element: spec.element.clone(),
            ..SecurityCategoryBlock::default()
        };

        let layout = match self.locate(grid, spec) {
            Some(layout) => layout,
            None => {
                push_warning(
                    warnings,
                    spec,
                    LayoutWarningKind::SectionMissing,
                    format!("Section '{}' not found", spec.title),
                );
                return block;
            }
        };

        let summary_values_row = match layout.summary_label_row {
            Some(label_row) => {
                let values_row = label_row + LABEL_TO_VALUES;
                if values_row < grid.row_count() {
                    block.summary = read_summary(grid, values_row);
                } else {
                    push_warning(
                        warnings,
                        spec,
                        LayoutWarningKind::SummaryOutOfBounds,
                        format!(
                            "Summary values row {} for '{}' is beyond the end of the sheet",
                            values_row + 1,
                            spec.title
                        ),
                    );
                }
                Some(values_row)
            }
            None => {
                push_warning(
                    warnings,
                    spec,
                    LayoutWarningKind::SummaryMissing,
                    format!("'{}' label not found in '{}'", self.vocabulary.summary_label, spec.title),
                );
                None
            }
        };

        let venue_start = match layout.venues_label_row {
            Some(label_row) => label_row + LABEL_TO_VALUES,
            None => {
                let start = summary_values_row
                    .map(|row| row + LABEL_TO_VALUES)
                    .unwrap_or(layout.title_row + 1);
                push_warning(
                    warnings,
                    spec,
                    LayoutWarningKind::VenuesLabelMissing,
                    format!(
                        "'{}' label not found in '{}', reading venues from row {}",
                        self.vocabulary.venues_label,
                        spec.title,
                        start + 1
                    ),
                );
                start
            }
        };

        block.venues = self.read_venues(grid, venue_start);
        log::debug!(
            "Section '{}': {} venue(s) from row {}",
            spec.title,
            block.venues.len(),
            venue_start + 1
        );

        block
    }

    /// セクション見出しと、その範囲内のラベル行を特定
    ///
    /// ラベルの検索は次のセクション見出しの手前までに限られます。
    fn locate(&self, grid: &Grid, spec: &SectionSpec) -> Option<SectionLayout> {
        let title_row = (0..grid.row_count()).find(|&r| grid.leading_text(r) == spec.title)?;

        let bound = ((title_row + 1)..grid.row_count())
            .find(|&r| self.vocabulary.is_section_title(&grid.leading_text(r)))
            .unwrap_or(grid.row_count());

        let find_label = |label: &str| {
            ((title_row + 1)..bound).find(|&r| grid.leading_text(r).eq_ignore_ascii_case(label))
        };

        Some(SectionLayout {
            title_row,
            summary_label_row: find_label(&self.vocabulary.summary_label),
            venues_label_row: find_label(&self.vocabulary.venues_label),
        })
    }

    /// 執行場所の行を終端まで読み込む
    fn read_venues(&self, grid: &Grid, start: usize) -> Vec<VenueRecord> {
        let mut venues = Vec::new();

        for row in start..grid.row_count() {
            let name = grid.leading_text(row);
            if name.is_empty() || grid.is_row_blank(row) {
                break;
            }
            if self.vocabulary.is_section_title(&name) || self.is_sentinel(&name) {
                log::debug!("Venue list terminated at row {} by '{}'", row + 1, name);
                break;
            }

            let fraction = |col: usize| numeric(grid.cell(row, col)).map(|v| v / 100.0);
            let amount = |col: usize| numeric(grid.cell(row, col));

            venues.push(VenueRecord {
                venue_name: name,
                mic: None,
                mpid: None,
                order_fraction: None,
                order_type_fractions: order_type_values(VENUE_PCT_COLS.map(fraction)),
                net_payment_usd: order_type_values(VENUE_USD_COLS.map(amount)),
                net_payment_cph: OrderTypeValues::default(),
                material_aspects: self.material_aspects.clone(),
            });
        }

        venues
    }
}

fn order_type_values(values: [Option<f64>; 4]) -> OrderTypeValues {
    let [market, marketable_limit, non_marketable_limit, other] = values;
    OrderTypeValues {
        market,
        marketable_limit,
        non_marketable_limit,
        other,
    }
}

/// 集計値の行を読み込む
///
/// 値は非指定注文の割合と注文種別4つの計5列です。
/// 先頭セルが数値なら0列目から、キャプション文字列なら1列目から読みます。
fn read_summary(grid: &Grid, values_row: usize) -> CategorySummary {
    let start = if numeric(grid.cell(values_row, 0)).is_some() {
        0
    } else {
        1
    };
    let pct = |offset: usize| format_pct(numeric(grid.cell(values_row, start + offset))).into_string();

    CategorySummary {
        non_directed_pct: pct(0),
        market_order_pct: pct(1),
        marketable_limit_order_pct: pct(2),
        non_marketable_limit_order_pct: pct(3),
        other_order_pct: pct(4),
    }
}

fn push_warning(
    warnings: &mut Vec<LayoutWarning>,
    spec: &SectionSpec,
    kind: LayoutWarningKind,
    message: String,
) {
    log::warn!("{}", message);
    warnings.push(LayoutWarning {
        section: spec.title.clone(),
        kind,
        message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn s(text: &str) -> CellValue {
        CellValue::String(text.to_string())
    }

    fn n(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn venue_row(name: &str, values: [f64; 8]) -> Vec<CellValue> {
        let mut row = vec![s(name)];
        row.extend(values.iter().map(|v| n(*v)));
        row
    }

    fn scanner() -> SectionScanner {
        SectionScanner::new(LayoutVocabulary::default(), "Disclosure".to_string()).unwrap()
    }

    /// S&P 500セクションのみを持つシート（集計・執行場所ラベルあり）
    fn scenario_b_rows() -> Vec<Vec<CellValue>> {
        vec![
            vec![s("S&P 500 Stocks")],
            vec![s("Summary")],
            vec![s("Non-Directed Orders"), s("Market"), s("Marketable Limit")],
            vec![n(100.0), n(50.0), n(30.0), n(15.0), n(5.0)],
            vec![],
            vec![s("Venues")],
            vec![s("Venue"), s("Market %")],
            venue_row("NYSE", [20.0, 10.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0]),
        ]
    }

    #[test]
    fn test_scenario_b_summary_and_venue() {
        let grid = Grid::new(scenario_b_rows());
        let (blocks, warnings) = scanner().scan(&grid);

        assert_eq!(blocks.len(), 3);
        let sp500 = &blocks[0];
        assert_eq!(sp500.element, "rSP500");
        assert_eq!(sp500.summary.non_directed_pct, "100.00");
        assert_eq!(sp500.summary.market_order_pct, "50.00");
        assert_eq!(sp500.summary.other_order_pct, "5.00");
        assert_eq!(sp500.venues.len(), 1);
        assert_eq!(sp500.venues[0].venue_name, "NYSE");
        assert_eq!(sp500.venues[0].market_pct(), "20.00");
        assert_eq!(sp500.venues[0].material_aspects, "Disclosure");
        assert_eq!(sp500.venues[0].payment_pairs()[0].0, "0.00");

        // 残り2セクションは見つからない
        assert!(blocks[1].venues.is_empty());
        assert_eq!(blocks[1].summary, CategorySummary::default());
        let missing: Vec<&str> = warnings
            .iter()
            .filter(|w| w.kind == LayoutWarningKind::SectionMissing)
            .map(|w| w.section.as_str())
            .collect();
        assert_eq!(missing, vec!["Non-S&P 500 stocks", "Options"]);
    }

    #[test]
    fn test_summary_with_caption_starts_one_column_right() {
        let grid = Grid::new(vec![
            vec![s("Options")],
            vec![s("summary")],
            vec![],
            vec![s("All orders"), n(100.0), n(25.5), n(24.5), n(40.0), n(10.0)],
        ]);
        let (blocks, _) = scanner().scan(&grid);
        let options = &blocks[2];
        assert_eq!(options.summary.non_directed_pct, "100.00");
        assert_eq!(options.summary.market_order_pct, "25.50");
        assert_eq!(options.summary.other_order_pct, "10.00");
    }

    #[test]
    fn test_venues_stop_at_next_section_title() {
        let mut rows = scenario_b_rows();
        rows.push(venue_row("NASDAQ", [10.0; 8]));
        rows.push(vec![s("Non-S&P 500 stocks")]);
        rows.push(vec![s("Summary")]);
        rows.push(vec![]);
        rows.push(vec![n(100.0), n(1.0), n(2.0), n(3.0), n(4.0)]);
        rows.push(vec![s("Venues")]);
        rows.push(vec![]);
        rows.push(venue_row("IEX", [1.0; 8]));
        let grid = Grid::new(rows);

        let (blocks, warnings) = scanner().scan(&grid);
        let names: Vec<&str> = blocks[0].venues.iter().map(|v| v.venue_name.as_str()).collect();
        assert_eq!(names, vec!["NYSE", "NASDAQ"]);
        assert_eq!(blocks[1].venues[0].venue_name, "IEX");
        assert_eq!(blocks[1].summary.market_order_pct, "1.00");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, LayoutWarningKind::SectionMissing);
    }

    #[test]
    fn test_venues_stop_at_sentinels() {
        for footer in [
            "2nd Quarter, 2024",
            "3rd Quarter, 2025",
            "Outset does not have any arrangements",
        ] {
            let mut rows = scenario_b_rows();
            rows.push(vec![s(footer)]);
            rows.push(venue_row("Should not appear", [1.0; 8]));
            let (blocks, _) = scanner().scan(&Grid::new(rows));
            assert_eq!(blocks[0].venues.len(), 1, "footer: {}", footer);
        }
    }

    #[test]
    fn test_venues_stop_at_blank_leading_cell() {
        let mut rows = scenario_b_rows();
        rows.push(vec![CellValue::Empty, n(1.0)]);
        rows.push(venue_row("Orphan", [1.0; 8]));
        let (blocks, _) = scanner().scan(&Grid::new(rows));
        assert_eq!(blocks[0].venues.len(), 1);
    }

    #[test]
    fn test_missing_venues_label_falls_back_after_summary() {
        let grid = Grid::new(vec![
            vec![s("S&P 500 Stocks")],
            vec![s("Summary")],
            vec![],
            vec![n(100.0), n(50.0), n(30.0), n(15.0), n(5.0)],
            vec![s("Venue"), s("Market %")],
            venue_row("NYSE", [20.0, 10.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0]),
        ]);
        let (blocks, warnings) = scanner().scan(&grid);

        assert_eq!(blocks[0].venues.len(), 1);
        assert_eq!(blocks[0].venues[0].venue_name, "NYSE");
        assert!(warnings
            .iter()
            .any(|w| w.kind == LayoutWarningKind::VenuesLabelMissing));
    }

    #[test]
    fn test_missing_summary_keeps_defaults() {
        let grid = Grid::new(vec![
            vec![s("S&P 500 Stocks")],
            vec![s("Venues")],
            vec![],
            venue_row("NYSE", [20.0, 10.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0]),
        ]);
        let (blocks, warnings) = scanner().scan(&grid);
        assert_eq!(blocks[0].summary, CategorySummary::default());
        assert_eq!(blocks[0].venues.len(), 1);
        assert!(warnings
            .iter()
            .any(|w| w.kind == LayoutWarningKind::SummaryMissing));
    }

    #[test]
    fn test_summary_beyond_sheet_is_warning() {
        let grid = Grid::new(vec![vec![s("S&P 500 Stocks")], vec![s("Summary")]]);
        let (blocks, warnings) = scanner().scan(&grid);
        assert_eq!(blocks[0].summary, CategorySummary::default());
        assert!(warnings
            .iter()
            .any(|w| w.kind == LayoutWarningKind::SummaryOutOfBounds));
    }

    #[test]
    fn test_non_numeric_venue_cells_are_absent() {
        let mut rows = scenario_b_rows();
        rows[7] = vec![s("CBOE"), s("n/a"), CellValue::Empty, n(5.0)];
        let (blocks, _) = scanner().scan(&Grid::new(rows));
        let venue = &blocks[0].venues[0];
        assert_eq!(venue.market_pct(), "");
        assert_eq!(venue.order_type_pcts()[2], "5.00");
        assert_eq!(venue.payment_pairs()[0], (String::new(), String::new()));
    }

    #[test]
    fn test_new_rejects_invalid_configuration() {
        let mut vocabulary = LayoutVocabulary::default();
        vocabulary.sentinel_patterns.push("(unclosed".to_string());
        assert!(matches!(
            SectionScanner::new(vocabulary, String::new()),
            Err(XlsxToXmlError::Config(_))
        ));

        let empty = LayoutVocabulary {
            sections: Vec::new(),
            ..LayoutVocabulary::default()
        };
        assert!(matches!(
            SectionScanner::new(empty, String::new()),
            Err(XlsxToXmlError::Config(_))
        ));
    }
}
