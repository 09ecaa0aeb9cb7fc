//! Integration Tests for xlsxfiling
//!
//! 実際のワークブックを生成し、13F情報テーブルと注文回送レポートの
//! 変換・検証をエンドツーエンドで確認します。

use rust_xlsxwriter::*;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use xlsxfiling::{
    schema, ConverterBuilder, FilingPeriod, LayoutWarningKind, SheetSelector, XlsxToXmlError,
};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    pub const SCENARIO_A_HEADERS: [&str; 10] = [
        "Name of Issuer",
        "Title of Class",
        "Cusip",
        "Value (to the nearest dollar)",
        "Shares or Principal Amount",
        "Shares/Principal",
        "Investment Discretion",
        "Sole",
        "Shared",
        "None",
    ];

    pub fn write_texts(
        sheet: &mut Worksheet,
        row: u32,
        first_col: u16,
        texts: &[&str],
    ) -> Result<(), XlsxError> {
        for (offset, text) in texts.iter().enumerate() {
            sheet.write_string(row, first_col + offset as u16, *text)?;
        }
        Ok(())
    }

    pub fn write_numbers(
        sheet: &mut Worksheet,
        row: u32,
        first_col: u16,
        numbers: &[f64],
    ) -> Result<(), XlsxError> {
        for (offset, number) in numbers.iter().enumerate() {
            sheet.write_number(row, first_col + offset as u16, *number)?;
        }
        Ok(())
    }

    /// 1行のholdingを書き込む（文字列3列 + 数値2列 + 文字列2列 + 数値3列）
    pub fn write_holding(
        sheet: &mut Worksheet,
        row: u32,
        issuer: &str,
        cusip: &str,
        value: f64,
        shares: f64,
    ) -> Result<(), XlsxError> {
        write_texts(sheet, row, 0, &[issuer, "COM", cusip])?;
        write_numbers(sheet, row, 3, &[value, shares])?;
        write_texts(sheet, row, 5, &["SH", "SOLE"])?;
        write_numbers(sheet, row, 7, &[shares, 0.0, 0.0])?;
        Ok(())
    }

    /// シナリオA: 1行だけの13Fシート
    pub fn generate_scenario_a() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        write_texts(sheet, 0, 0, &SCENARIO_A_HEADERS)?;
        write_holding(sheet, 1, "Acme Corp", "000000000", 1234567.4, 1000.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 3行のholding
    pub fn generate_holdings() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        write_texts(sheet, 0, 0, &SCENARIO_A_HEADERS)?;
        write_holding(sheet, 1, "Zeta Inc", "98956P102", 5000.5, 10.0)?;
        write_holding(sheet, 2, "Alpha Corp", "02079K305", 250000.0, 2500.0)?;
        write_holding(sheet, 3, "Mu Holdings", "594918104", 99.49, 1.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 列見出しが同義語で書かれたシート（任意列あり）
    pub fn generate_synonym_headers() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        write_texts(
            sheet,
            0,
            0,
            &[
                "  ISSUER ",
                "class",
                "CUSIP No",
                "FIGI",
                "Market Value",
                "Shares",
                "SH/PRN",
                "Put Call",
                "Discretion",
                "Other Managers",
                "Voting Sole",
                "Voting Shared",
                "Voting None",
            ],
        )?;

        write_texts(sheet, 1, 0, &["Acme Corp", "COM", "000360206", "BBG000BLNNH6"])?;
        write_numbers(sheet, 1, 4, &[1500.0, 300.0])?;
        write_texts(sheet, 1, 6, &["SH", "Call", "DFND"])?;
        write_numbers(sheet, 1, 9, &[2.0, 100.0, 150.0, 50.0])?;

        // 任意列が空の行
        write_texts(sheet, 2, 0, &["Beta LLC", "COM", "000000001"])?;
        write_numbers(sheet, 2, 4, &[20.0, 5.0])?;
        write_texts(sheet, 2, 6, &["SH"])?;
        write_texts(sheet, 2, 8, &["SOLE"])?;
        write_numbers(sheet, 2, 10, &[5.0, 0.0, 0.0])?;

        Ok(workbook.save_to_buffer()?)
    }

    /// 必須列の一部が欠けたシート
    pub fn generate_missing_columns() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        write_texts(
            sheet,
            0,
            0,
            &[
                "Name of Issuer",
                "Title of Class",
                "Value",
                "Shares or Principal Amount",
                "Shares/Principal",
                "Investment Discretion",
            ],
        )?;
        write_texts(sheet, 1, 0, &["Acme Corp", "COM"])?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 2枚目のシートにデータがあるワークブック
    pub fn generate_two_sheets() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Cover")?;
        cover.write_string(0, 0, "13F Holdings Report")?;

        let holdings = workbook.add_worksheet();
        holdings.set_name("Holdings")?;
        write_texts(holdings, 0, 0, &SCENARIO_A_HEADERS)?;
        write_holding(holdings, 1, "Acme Corp", "000000000", 10.0, 1.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn write_section(
        sheet: &mut Worksheet,
        title_row: u32,
        title: &str,
        summary: (Option<&str>, [f64; 5]),
        venues: &[(&str, [f64; 8])],
    ) -> Result<u32, XlsxError> {
        sheet.write_string(title_row, 0, title)?;
        sheet.write_string(title_row + 1, 0, "Summary")?;
        write_texts(
            sheet,
            title_row + 2,
            0,
            &["Non-Directed Orders as % of All Orders", "Market Orders %"],
        )?;
        match summary.0 {
            Some(caption) => {
                sheet.write_string(title_row + 3, 0, caption)?;
                write_numbers(sheet, title_row + 3, 1, &summary.1)?;
            }
            None => write_numbers(sheet, title_row + 3, 0, &summary.1)?,
        }
        sheet.write_string(title_row + 4, 0, "Venues")?;
        write_texts(sheet, title_row + 5, 0, &["Venue - Non-directed Order Flow"])?;

        let mut row = title_row + 6;
        for (name, values) in venues {
            sheet.write_string(row, 0, *name)?;
            write_numbers(sheet, row, 1, values)?;
            row += 1;
        }
        Ok(row)
    }

    /// シナリオB: 3セクションの注文回送レポート
    ///
    /// 1つ目の執行場所リストの直後に次のセクション見出しがあり、
    /// 2つ目は期間のフッター、3つ目は開示文の接頭辞で終わります。
    pub fn generate_order_routing() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(
            0,
            0,
            "Outset Financial - Held NMS Stocks and Options Order Routing Public Report",
        )?;
        sheet.write_string(1, 0, "2nd Quarter, 2024")?;

        let next = write_section(
            sheet,
            3,
            "S&P 500 Stocks",
            (None, [100.0, 50.0, 30.0, 15.0, 5.0]),
            &[
                ("NYSE", [20.0, 10.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0]),
                (
                    "Citadel Securities",
                    [30.0, 40.0, 50.0, 60.0, 1250.5, 0.0, -10.25, 0.0],
                ),
            ],
        )?;

        let next = write_section(
            sheet,
            next,
            "Non-S&P 500 stocks",
            (Some("Non-Directed"), [100.0, 60.0, 20.0, 10.0, 10.0]),
            &[("Virtu Americas", [55.5, 60.0, 50.0, 40.0, 0.0, 0.0, 0.0, 0.0])],
        )?;
        sheet.write_string(next, 0, "2nd Quarter, 2024")?;

        let next = write_section(
            sheet,
            next + 1,
            "Options",
            (None, [100.0, 0.0, 0.0, 0.0, 0.0]),
            &[("CBOE", [100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
        )?;
        sheet.write_string(
            next,
            0,
            "Outset does not have a profit sharing arrangement with any venue.",
        )?;

        Ok(workbook.save_to_buffer()?)
    }
}

fn fixture_schema(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(filename);
    path
}

fn convert_flat_to_string(data: Vec<u8>) -> Result<String, XlsxToXmlError> {
    let converter = ConverterBuilder::new().build()?;
    let mut output = Vec::new();
    converter.convert_flat_to_writer(Cursor::new(data), &mut output)?;
    Ok(String::from_utf8(output).unwrap())
}

// シナリオA: 1行の13Fシート
#[test]
fn test_scenario_a_flat_conversion() {
    let xml = convert_flat_to_string(fixtures::generate_scenario_a().unwrap()).unwrap();

    assert!(xml.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<ns1:informationTable"
    ));
    assert_eq!(xml.matches("<?xml").count(), 1);
    assert_eq!(xml.matches("<ns1:infoTable>").count(), 1);
    assert!(xml.contains("<ns1:nameOfIssuer>Acme Corp</ns1:nameOfIssuer>"));
    assert!(xml.contains("<ns1:cusip>000000000</ns1:cusip>"));
    assert!(xml.contains("<ns1:value>1234567</ns1:value>"));
    assert!(xml.contains("<ns1:sshPrnamt>1000</ns1:sshPrnamt>"));
    assert!(xml.contains("<ns1:Sole>1000</ns1:Sole>"));
    assert!(xml.contains("<ns1:Shared>0</ns1:Shared>"));

    // 任意列がないので要素も出力しない
    assert!(!xml.contains("ns1:figi"));
    assert!(!xml.contains("ns1:putCall"));
    assert!(!xml.contains("ns1:otherManager"));
}

#[test]
fn test_one_record_per_row_in_input_order() {
    let xml = convert_flat_to_string(fixtures::generate_holdings().unwrap()).unwrap();

    assert_eq!(xml.matches("<ns1:infoTable>").count(), 3);
    let zeta = xml.find("Zeta Inc").unwrap();
    let alpha = xml.find("Alpha Corp").unwrap();
    let mu = xml.find("Mu Holdings").unwrap();
    assert!(zeta < alpha && alpha < mu);

    // 金額は最も近いドルに丸める
    assert!(xml.contains("<ns1:value>5001</ns1:value>"));
    assert!(xml.contains("<ns1:value>250000</ns1:value>"));
    assert!(xml.contains("<ns1:value>99</ns1:value>"));
}

#[test]
fn test_synonym_headers_and_optional_fields() {
    let xml = convert_flat_to_string(fixtures::generate_synonym_headers().unwrap()).unwrap();

    assert_eq!(xml.matches("<ns1:infoTable>").count(), 2);
    assert_eq!(xml.matches("<ns1:figi>BBG000BLNNH6</ns1:figi>").count(), 1);
    assert_eq!(xml.matches("<ns1:putCall>Call</ns1:putCall>").count(), 1);
    assert_eq!(xml.matches("<ns1:otherManager>2</ns1:otherManager>").count(), 1);
    assert!(xml.contains("<ns1:investmentDiscretion>DFND</ns1:investmentDiscretion>"));
    assert!(xml.contains("<ns1:Shared>150</ns1:Shared>"));

    let beta = xml.find("Beta LLC").unwrap();
    assert!(!xml[beta..].contains("ns1:figi"));
    assert!(!xml[beta..].contains("ns1:putCall"));
}

#[test]
fn test_missing_required_columns_are_all_listed() {
    let result = convert_flat_to_string(fixtures::generate_missing_columns().unwrap());

    match result {
        Err(XlsxToXmlError::FieldResolution { missing }) => {
            assert_eq!(missing, vec!["cusip", "Sole", "Shared", "None"]);
        }
        other => panic!("Expected FieldResolution error, got {:?}", other),
    }
}

#[test]
fn test_sheet_selection_by_name() {
    let data = fixtures::generate_two_sheets().unwrap();

    let converter = ConverterBuilder::new()
        .with_sheet_selector(SheetSelector::Name("Holdings".to_string()))
        .build()
        .unwrap();
    let entries = converter.extract_entries(Cursor::new(data.clone())).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name_of_issuer, "Acme Corp");

    // 先頭シートには見出しがない
    let converter = ConverterBuilder::new().build().unwrap();
    assert!(matches!(
        converter.extract_entries(Cursor::new(data.clone())),
        Err(XlsxToXmlError::FieldResolution { .. })
    ));

    let converter = ConverterBuilder::new()
        .with_sheet_selector(SheetSelector::Name("Missing".to_string()))
        .build()
        .unwrap();
    assert!(matches!(
        converter.extract_entries(Cursor::new(data)),
        Err(XlsxToXmlError::Config(_))
    ));
}

#[test]
fn test_convert_flat_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("holdings.xlsx");
    fs::write(&input, fixtures::generate_holdings().unwrap()).unwrap();
    let output = dir.path().join("holdings.xml");

    let converter = ConverterBuilder::new().build().unwrap();
    converter.convert_flat(&input, &output).unwrap();
    let first = fs::read(&output).unwrap();
    converter.convert_flat(&input, &output).unwrap();
    let second = fs::read(&output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_failed_flat_conversion_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.xlsx");
    fs::write(&input, fixtures::generate_missing_columns().unwrap()).unwrap();
    let output = dir.path().join("broken.xml");

    let converter = ConverterBuilder::new().build().unwrap();
    assert!(converter.convert_flat(&input, &output).is_err());
    assert!(!output.exists());

    let missing = converter.convert_flat(dir.path().join("nope.xlsx"), &output);
    assert!(matches!(missing, Err(XlsxToXmlError::Io(_))));
}

#[test]
fn test_flat_output_conforms_to_schema() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Zeno Capital.xlsx");
    fs::write(&input, fixtures::generate_synonym_headers().unwrap()).unwrap();

    let converter = ConverterBuilder::new().build().unwrap();
    let period = FilingPeriod::new(2024, 4).unwrap();
    let output = converter
        .convert_flat_into(&input, dir.path(), &period)
        .unwrap();
    assert_eq!(output, dir.path().join("zenocapital4q2413f.xml"));

    let result = schema::validate(&output, fixture_schema("information_table.xsd"));
    assert!(result.is_valid, "{:?}", result.messages());
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_convert_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("in");
    let output_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    fs::write(input_dir.join("b_fund.xlsx"), fixtures::generate_holdings().unwrap()).unwrap();
    fs::write(input_dir.join("a_fund.xlsx"), fixtures::generate_scenario_a().unwrap()).unwrap();
    fs::write(
        input_dir.join("c_broken.xlsx"),
        fixtures::generate_missing_columns().unwrap(),
    )
    .unwrap();
    fs::write(input_dir.join("notes.txt"), b"not a workbook").unwrap();

    let converter = ConverterBuilder::new().build().unwrap();
    let period = FilingPeriod::new(2025, 1).unwrap();
    let results = converter
        .convert_directory(&input_dir, &output_dir, &period)
        .unwrap();

    let names: Vec<String> = results
        .iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_fund.xlsx", "b_fund.xlsx", "c_broken.xlsx"]);

    assert_eq!(
        results[0].1.as_ref().unwrap(),
        &output_dir.join("afund1q2513f.xml")
    );
    assert!(output_dir.join("bfund1q2513f.xml").exists());
    assert!(matches!(
        results[2].1,
        Err(XlsxToXmlError::FieldResolution { .. })
    ));
}

#[test]
fn test_convert_directory_rejects_colliding_output_names() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("in");
    let output_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    fs::write(input_dir.join("Acme Fund.xlsx"), fixtures::generate_scenario_a().unwrap()).unwrap();
    fs::write(input_dir.join("acme-fund.xlsx"), fixtures::generate_holdings().unwrap()).unwrap();

    let converter = ConverterBuilder::new().build().unwrap();
    let period = FilingPeriod::new(2025, 1).unwrap();
    let results = converter
        .convert_directory(&input_dir, &output_dir, &period)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, input_dir.join("Acme Fund.xlsx"));
    assert_eq!(
        results[0].1.as_ref().unwrap(),
        &output_dir.join("acmefund1q2513f.xml")
    );
    match &results[1].1 {
        Err(XlsxToXmlError::Config(msg)) => assert!(msg.contains("acmefund1q2513f.xml")),
        other => panic!("Expected Config error, got {:?}", other),
    }

    let written: Vec<_> = fs::read_dir(&output_dir).unwrap().collect();
    assert_eq!(written.len(), 1);

    // 残ったファイルは最初の入力（シナリオA）の内容
    let xml = fs::read_to_string(output_dir.join("acmefund1q2513f.xml")).unwrap();
    let expected = {
        let mut buffer = Vec::new();
        converter
            .convert_flat_to_writer(Cursor::new(fixtures::generate_scenario_a().unwrap()), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    };
    assert_eq!(xml, expected);
}

// シナリオB: セクション形式の注文回送レポート
#[test]
fn test_scenario_b_report_model() {
    let converter = ConverterBuilder::new().build().unwrap();
    let period = FilingPeriod::new(2024, 2).unwrap();
    let (report, warnings) = converter
        .build_report(
            Cursor::new(fixtures::generate_order_routing().unwrap()),
            "Outset Financial",
            &period,
        )
        .unwrap();

    assert!(warnings.is_empty(), "{:?}", warnings);
    let elements: Vec<&str> = report
        .non_directed
        .iter()
        .map(|b| b.element.as_str())
        .collect();
    assert_eq!(elements, vec!["rSP500", "rOtherStocks", "rOptions"]);

    let sp500 = &report.non_directed[0];
    assert_eq!(sp500.summary.non_directed_pct, "100.00");
    assert_eq!(sp500.summary.market_order_pct, "50.00");
    assert_eq!(sp500.summary.other_order_pct, "5.00");
    let names: Vec<&str> = sp500.venues.iter().map(|v| v.venue_name.as_str()).collect();
    assert_eq!(names, vec!["NYSE", "Citadel Securities"]);
    assert_eq!(sp500.venues[0].market_pct(), "20.00");
    assert_eq!(sp500.venues[0].order_pct(), "");

    // 集計行の先頭がキャプションなら1列右から読む
    let others = &report.non_directed[1];
    assert_eq!(others.summary.market_order_pct, "60.00");
    assert_eq!(others.venues.len(), 1);
    assert_eq!(others.venues[0].market_pct(), "55.50");

    let options = &report.non_directed[2];
    assert_eq!(options.venues.len(), 1);
    assert_eq!(options.venues[0].venue_name, "CBOE");
}

#[test]
fn test_scenario_b_output_and_validation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("606.xlsx");
    fs::write(&input, fixtures::generate_order_routing().unwrap()).unwrap();
    let output_dir = dir.path().join("reports");

    let converter = ConverterBuilder::new()
        .with_schema(fixture_schema("order_routing.xsd"))
        .build()
        .unwrap();
    let outcome = converter.convert_sectioned(&input, &output_dir, "Outset Financial", 2024, 2);

    assert_eq!(outcome.is_valid, Some(true), "{:?}", outcome.diagnostics);
    assert!(outcome.diagnostics.is_empty());
    let output_path = outcome.output_path.unwrap();
    assert_eq!(output_path, output_dir.join("Outset_606_NMS_2024_Q2.xml"));

    let xml = fs::read_to_string(&output_path).unwrap();
    assert!(xml.contains("\t\t\t\t\t<name>Citadel Securities</name>\n"));
    assert!(xml.contains("<netPmtPaidRecvMarketOrdersUsd>1250.50</netPmtPaidRecvMarketOrdersUsd>"));
    assert!(xml.contains(
        "<netPmtPaidRecvNonMarketableLimitOrdersUsd>-10.25</netPmtPaidRecvNonMarketableLimitOrdersUsd>"
    ));
    assert!(xml.contains("<netPmtPaidRecvMarketOrdersCph></netPmtPaidRecvMarketOrdersCph>"));
    assert_eq!(xml.matches("<rVenue>").count(), 4);
    assert_eq!(xml.matches("<materialAspects>").count(), 4);
}

#[test]
fn test_validation_scenario_missing_required_element() {
    let converter = ConverterBuilder::new().build().unwrap();
    let period = FilingPeriod::new(2024, 2).unwrap();
    let mut output = Vec::new();
    converter
        .convert_sectioned_to_writer(
            Cursor::new(fixtures::generate_order_routing().unwrap()),
            &mut output,
            "Outset Financial",
            &period,
        )
        .unwrap();
    let xml = String::from_utf8(output).unwrap();
    let xsd = fs::read_to_string(fixture_schema("order_routing.xsd")).unwrap();

    let conformant = schema::validate_str(&xml, &xsd);
    assert!(conformant.is_valid);
    assert!(conformant.diagnostics.is_empty());

    let malformed = xml.replace("\t<bd>Outset Financial</bd>\n", "");
    let result = schema::validate_str(&malformed, &xsd);
    assert!(!result.is_valid);
    assert!(!result.diagnostics.is_empty());
    assert!(result.diagnostics[0].line > 1);
    assert!(result.diagnostics[0].message.contains("bd"));
}

#[test]
fn test_sectioned_missing_sections_warn_but_write() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("holdings.xlsx");
    // セクション見出しのないシート
    fs::write(&input, fixtures::generate_scenario_a().unwrap()).unwrap();

    let converter = ConverterBuilder::new()
        .with_schema(fixture_schema("order_routing.xsd"))
        .with_material_aspects("")
        .build()
        .unwrap();
    let outcome = converter.convert_sectioned(&input, dir.path(), "Outset", 2024, 3);

    assert!(outcome.output_path.is_some());
    assert_eq!(outcome.warnings.len(), 3);
    assert!(outcome
        .warnings
        .iter()
        .all(|w| w.kind == LayoutWarningKind::SectionMissing));
    // 空のブロックもスキーマ上は有効
    assert_eq!(outcome.is_valid, Some(true), "{:?}", outcome.diagnostics);
}
