//! Domain Model Module
//!
//! 抽出結果を表すレコード型。XML組み立ての入力になります。

use serde::Serialize;

use crate::formatter::{format_cph4, format_decimal2, format_fraction_as_pct};

/// 13F情報テーブルの1行分（書式化済み）
///
/// 省略可能な要素は`None`の場合に出力されません（空要素ではなく省略）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoTableEntry {
    pub name_of_issuer: String,
    pub title_of_class: String,
    pub cusip: String,
    pub figi: Option<String>,
    /// ドル単位に丸めた評価額
    pub value: String,
    pub ssh_prnamt: String,
    pub ssh_prnamt_type: String,
    pub put_call: Option<String>,
    pub investment_discretion: String,
    pub other_manager: Option<String>,
    pub voting_sole: String,
    pub voting_shared: String,
    pub voting_none: String,
}

/// 注文種別ごとの値（成行、指値（執行可能）、指値（執行不能）、その他）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OrderTypeValues {
    pub market: Option<f64>,
    pub marketable_limit: Option<f64>,
    pub non_marketable_limit: Option<f64>,
    pub other: Option<f64>,
}

impl OrderTypeValues {
    /// 注文種別の順に並べた値
    pub fn as_array(&self) -> [Option<f64>; 4] {
        [
            self.market,
            self.marketable_limit,
            self.non_marketable_limit,
            self.other,
        ]
    }
}

/// カテゴリーごとの集計（書式化済みパーセンテージ）
///
/// 集計ブロックが見つからない場合はすべて空文字列のままになります。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategorySummary {
    /// 非指定注文の割合（`ndoPct`）
    pub non_directed_pct: String,
    pub market_order_pct: String,
    pub marketable_limit_order_pct: String,
    pub non_marketable_limit_order_pct: String,
    pub other_order_pct: String,
}

/// 執行場所（venue）1件分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VenueRecord {
    pub venue_name: String,
    /// 市場識別コード（MIC）
    pub mic: Option<String>,
    /// 市場参加者ID（MPID）
    pub mpid: Option<String>,
    /// カテゴリー内の注文に占める割合（割合表記、0〜1）
    pub order_fraction: Option<f64>,
    /// 注文種別ごとの割合（割合表記、0〜1）
    pub order_type_fractions: OrderTypeValues,
    /// 注文種別ごとの純支払額（USD）
    pub net_payment_usd: OrderTypeValues,
    /// 注文種別ごとの純支払額（100株あたり）
    pub net_payment_cph: OrderTypeValues,
    /// 重要事項の開示文
    pub material_aspects: String,
}

impl VenueRecord {
    /// `orderPct`の字句
    pub fn order_pct(&self) -> String {
        format_fraction_as_pct(self.order_fraction).into_string()
    }

    /// `marketPct`の字句
    pub fn market_pct(&self) -> String {
        format_fraction_as_pct(self.order_type_fractions.market).into_string()
    }

    /// 注文種別ごとのパーセンテージ字句
    pub fn order_type_pcts(&self) -> [String; 4] {
        self.order_type_fractions
            .as_array()
            .map(|f| format_fraction_as_pct(f).into_string())
    }

    /// 注文種別ごとの (USD, 100株あたり) 支払額字句
    pub fn payment_pairs(&self) -> [(String, String); 4] {
        let usd = self.net_payment_usd.as_array();
        let cph = self.net_payment_cph.as_array();
        [0, 1, 2, 3].map(|i| {
            (
                format_decimal2(usd[i]).into_string(),
                format_cph4(cph[i]).into_string(),
            )
        })
    }
}

/// 証券カテゴリー1件分のブロック
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SecurityCategoryBlock {
    /// カテゴリー名（例: "NMS Stock"）
    pub category_name: String,
    /// 出力XMLの要素名（例: "rSP500"）
    pub element: String,
    pub summary: CategorySummary,
    /// シート上の行順
    pub venues: Vec<VenueRecord>,
}

/// 注文回送レポート全体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub schema_version: String,
    pub firm_name: String,
    pub report_year: u16,
    pub report_quarter: u8,
    /// 非指定注文のカテゴリー（レイアウト語彙に定義された順）
    pub non_directed: Vec<SecurityCategoryBlock>,
    /// 指定注文のカテゴリー（元データがないため常に空）
    pub directed: Vec<SecurityCategoryBlock>,
}

/// レイアウト警告の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutWarningKind {
    /// セクション見出しが見つからない
    SectionMissing,
    /// 集計ラベルが見つからない
    SummaryMissing,
    /// 集計値の行がシートの範囲外
    SummaryOutOfBounds,
    /// 執行場所ラベルが見つからず、推定位置から読み始めた
    VenuesLabelMissing,
}

/// セクション走査中に記録された非致命的な警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutWarning {
    /// 対象セクションの見出し
    pub section: String,
    pub kind: LayoutWarningKind,
    pub message: String,
}
