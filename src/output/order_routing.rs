//! 注文回送レポート（`heldOrderRoutingPublicReport`）のXML

use chrono::NaiveDateTime;
use std::io::Write;

use super::XmlEmitter;
use crate::api::FilingPeriod;
use crate::error::XlsxToXmlError;
use crate::model::{ReportDocument, SecurityCategoryBlock, VenueRecord};

const ROOT: &str = "heldOrderRoutingPublicReport";

/// `timestamp`要素の書式
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 注文種別ごとの支払額要素名（USD, 100株あたり）
const PAYMENT_ELEMENTS: [(&str, &str); 4] = [
    (
        "netPmtPaidRecvMarketOrdersUsd",
        "netPmtPaidRecvMarketOrdersCph",
    ),
    (
        "netPmtPaidRecvMarketableLimitOrdersUsd",
        "netPmtPaidRecvMarketableLimitOrdersCph",
    ),
    (
        "netPmtPaidRecvNonMarketableLimitOrdersUsd",
        "netPmtPaidRecvNonMarketableLimitOrdersCph",
    ),
    (
        "netPmtPaidRecvOtherOrdersUsd",
        "netPmtPaidRecvOtherOrdersCph",
    ),
];

/// 注文種別ごとの割合要素名
const PCT_ELEMENTS: [&str; 4] = [
    "marketPct",
    "marketableLimitPct",
    "nonMarketableLimitPct",
    "otherPct",
];

/// 注文回送レポートのフォーマッター
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderRoutingFormatter {
    /// ルート要素のデフォルト名前空間（未指定なら出力しない）
    pub namespace: Option<String>,
    /// レポート作成日時（未指定なら`timestamp`要素を省略）
    pub timestamp: Option<NaiveDateTime>,
}

impl OrderRoutingFormatter {
    pub fn render<W: Write>(
        &self,
        report: &ReportDocument,
        writer: &mut W,
    ) -> Result<(), XlsxToXmlError> {
        let period = FilingPeriod::new(report.report_year, report.report_quarter)?;
        let year = report.report_year.to_string();

        let mut xml = XmlEmitter::new(writer);
        xml.declaration()?;
        match &self.namespace {
            Some(uri) => xml.start(ROOT, &[("xmlns", uri.as_str())])?,
            None => xml.start(ROOT, &[])?,
        }

        xml.text("version", &report.schema_version)?;
        xml.text("bd", &report.firm_name)?;
        xml.text("year", &year)?;
        xml.text("qtr", &report.report_quarter.to_string())?;
        if let Some(timestamp) = &self.timestamp {
            xml.text("timestamp", &timestamp.format(TIMESTAMP_FORMAT).to_string())?;
        }

        // 四半期全体を先頭月の1件として出力する
        xml.start("rMonthly", &[])?;
        xml.text("year", &year)?;
        xml.text("mon", &period.first_month().to_string())?;
        for block in &report.non_directed {
            render_category(&mut xml, block)?;
        }
        xml.end("rMonthly")?;

        xml.end(ROOT)?;
        xml.finish()?;
        Ok(())
    }
}

fn render_category<W: Write>(
    xml: &mut XmlEmitter<W>,
    block: &SecurityCategoryBlock,
) -> Result<(), XlsxToXmlError> {
    let summary = &block.summary;

    xml.start(&block.element, &[])?;
    xml.text("ndoPct", &summary.non_directed_pct)?;
    xml.text("ndoMarketPct", &summary.market_order_pct)?;
    xml.text("ndoMarketableLimitPct", &summary.marketable_limit_order_pct)?;
    xml.text("ndoNonmarketableLimitPct", &summary.non_marketable_limit_order_pct)?;
    xml.text("ndoOtherPct", &summary.other_order_pct)?;

    xml.start("rVenues", &[])?;
    for venue in &block.venues {
        render_venue(xml, venue)?;
    }
    xml.end("rVenues")?;

    xml.end(&block.element)
}

fn render_venue<W: Write>(xml: &mut XmlEmitter<W>, venue: &VenueRecord) -> Result<(), XlsxToXmlError> {
    xml.start("rVenue", &[])?;
    xml.text("name", &venue.venue_name)?;
    xml.optional("mic", venue.mic.as_deref())?;
    xml.optional("mpid", venue.mpid.as_deref())?;
    xml.text("orderPct", &venue.order_pct())?;

    for (element, pct) in PCT_ELEMENTS.iter().zip(venue.order_type_pcts()) {
        xml.text(element, &pct)?;
    }
    for ((usd_element, cph_element), (usd, cph)) in
        PAYMENT_ELEMENTS.iter().zip(venue.payment_pairs())
    {
        xml.text(usd_element, &usd)?;
        xml.text(cph_element, &cph)?;
    }

    if !venue.material_aspects.is_empty() {
        xml.text("materialAspects", &venue.material_aspects)?;
    }
    xml.end("rVenue")
}
