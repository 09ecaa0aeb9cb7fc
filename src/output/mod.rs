//! Output Format Module
//!
//! 抽出済みレコードからスキーマ形状どおりのXML文書を組み立てるモジュール。
//! 文書の種類ごとにフォーマッターを分け、共通のXML書き出しは[`XmlEmitter`]が担います。

mod information_table;
mod order_routing;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::error::XlsxToXmlError;

pub(crate) use information_table::InformationTableFormatter;
pub(crate) use order_routing::OrderRoutingFormatter;

/// インデント文字（タブ）
const INDENT_CHAR: u8 = b'\t';

/// 決定的なXML書き出し
///
/// 単一のXML宣言、タブによるインデント、末尾の改行を常に同じ形で出力します。
/// 空の値も`<a></a>`として書き出し、自己終了タグは使いません。
pub(crate) struct XmlEmitter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlEmitter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, INDENT_CHAR, 1),
        }
    }

    /// `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>`
    pub fn declaration(&mut self) -> Result<(), XlsxToXmlError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(())
    }

    /// 開始タグ
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XlsxToXmlError> {
        let mut tag = BytesStart::new(name);
        for attribute in attributes {
            tag.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(tag))?;
        Ok(())
    }

    /// 終了タグ
    pub fn end(&mut self, name: &str) -> Result<(), XlsxToXmlError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// テキストのみを持つ要素（特殊文字はエスケープされる）
    pub fn text(&mut self, name: &str, text: &str) -> Result<(), XlsxToXmlError> {
        self.writer
            .create_element(name)
            .write_text_content(BytesText::new(text))?;
        Ok(())
    }

    /// 値がある場合のみ要素を出力
    pub fn optional(&mut self, name: &str, text: Option<&str>) -> Result<(), XlsxToXmlError> {
        match text {
            Some(text) => self.text(name, text),
            None => Ok(()),
        }
    }

    /// 末尾の改行を書き、内側のライターを返す
    pub fn finish(self) -> Result<W, XlsxToXmlError> {
        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        inner.flush()?;
        Ok(inner)
    }
}
