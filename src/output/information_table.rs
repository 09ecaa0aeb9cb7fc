//! 13F情報テーブルのXML

use std::io::Write;

use super::XmlEmitter;
use crate::error::XlsxToXmlError;
use crate::model::InfoTableEntry;

/// 情報テーブルの名前空間
pub(crate) const INFORMATION_TABLE_NAMESPACE: &str =
    "http://www.sec.gov/edgar/document/thirteenf/informationtable";

/// 13F情報テーブルのフォーマッター
pub(crate) struct InformationTableFormatter;

impl InformationTableFormatter {
    /// レコードを入力の行順に`ns1:infoTable`として出力
    pub fn render<W: Write>(
        &self,
        entries: &[InfoTableEntry],
        writer: &mut W,
    ) -> Result<(), XlsxToXmlError> {
        let mut xml = XmlEmitter::new(writer);
        xml.declaration()?;
        xml.start(
            "ns1:informationTable",
            &[("xmlns:ns1", INFORMATION_TABLE_NAMESPACE)],
        )?;

        for entry in entries {
            render_entry(&mut xml, entry)?;
        }

        xml.end("ns1:informationTable")?;
        xml.finish()?;
        Ok(())
    }
}

fn render_entry<W: Write>(
    xml: &mut XmlEmitter<W>,
    entry: &InfoTableEntry,
) -> Result<(), XlsxToXmlError> {
    xml.start("ns1:infoTable", &[])?;
    xml.text("ns1:nameOfIssuer", &entry.name_of_issuer)?;
    xml.text("ns1:titleOfClass", &entry.title_of_class)?;
    xml.text("ns1:cusip", &entry.cusip)?;
    xml.optional("ns1:figi", entry.figi.as_deref())?;
    xml.text("ns1:value", &entry.value)?;

    xml.start("ns1:shrsOrPrnAmt", &[])?;
    xml.text("ns1:sshPrnamt", &entry.ssh_prnamt)?;
    xml.text("ns1:sshPrnamtType", &entry.ssh_prnamt_type)?;
    xml.end("ns1:shrsOrPrnAmt")?;

    xml.optional("ns1:putCall", entry.put_call.as_deref())?;
    xml.text("ns1:investmentDiscretion", &entry.investment_discretion)?;
    xml.optional("ns1:otherManager", entry.other_manager.as_deref())?;

    xml.start("ns1:votingAuthority", &[])?;
    xml.text("ns1:Sole", &entry.voting_sole)?;
    xml.text("ns1:Shared", &entry.voting_shared)?;
    xml.text("ns1:None", &entry.voting_none)?;
    xml.end("ns1:votingAuthority")?;

    xml.end("ns1:infoTable")
}
