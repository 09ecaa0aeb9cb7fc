//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::api::{FilingPeriod, SheetSelector};
use crate::error::XlsxToXmlError;
use crate::extract::{header_labels, header_row, FlatExtractor, LayoutVocabulary, SectionScanner};
use crate::fields::{ResolvedColumnMap, INFORMATION_TABLE_FIELDS};
use crate::model::{InfoTableEntry, LayoutWarning, ReportDocument};
use crate::naming::{information_table_file_name, order_routing_file_name};
use crate::output::{InformationTableFormatter, OrderRoutingFormatter};
use crate::parser::WorkbookParser;
use crate::security::SecurityConfig;
use crate::types::Grid;

/// 出力する注文回送スキーマのバージョン
const ORDER_ROUTING_SCHEMA_VERSION: &str = "1.3";

/// 執行場所ごとに出力する開示文のデフォルト
pub const DEFAULT_MATERIAL_ASPECTS: &str = "Does not have a profit sharing arrangement with or receive rebates or payments for order flow from any of the above venues/market centers.";

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 事後検証に使うXSD（Noneなら検証しない）
    pub schema_path: Option<PathBuf>,

    /// 執行場所の開示文（空なら`materialAspects`を省略）
    pub material_aspects: String,

    /// セクション走査の語彙
    pub vocabulary: LayoutVocabulary,

    /// 注文回送レポートのデフォルト名前空間
    pub namespace: Option<String>,

    /// 注文回送レポートの作成日時
    pub timestamp: Option<NaiveDateTime>,

    /// 入力ファイルのセキュリティ制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::First,
            schema_path: None,
            material_aspects: DEFAULT_MATERIAL_ASPECTS.to_string(),
            vocabulary: LayoutVocabulary::default(),
            namespace: None,
            timestamp: None,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxfiling::{ConverterBuilder, SheetSelector};
///
/// # fn main() -> Result<(), xlsxfiling::XlsxToXmlError> {
/// let converter = ConverterBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("606 Report".to_string()))
///     .with_schema("schemas/606.xsd")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: 先頭のシート
    /// - スキーマ検証: なし
    /// - 開示文: `DEFAULT_MATERIAL_ASPECTS`
    /// - 語彙: 2024年版テンプレート
    /// - 名前空間・作成日時: 出力しない
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 変換対象のシートを選択する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxfiling::{ConverterBuilder, SheetSelector};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_sheet_selector(SheetSelector::Index(1));
    /// ```
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 注文回送レポートの事後検証に使うXSDを指定する
    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_path = Some(path.into());
        self
    }

    /// 執行場所ごとの開示文を指定する
    ///
    /// 空文字列を指定すると`materialAspects`要素を出力しません。
    pub fn with_material_aspects(mut self, text: impl Into<String>) -> Self {
        self.config.material_aspects = text.into();
        self
    }

    /// セクション走査の語彙を差し替える
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxfiling::{ConverterBuilder, LayoutVocabulary};
    ///
    /// let mut vocabulary = LayoutVocabulary::default();
    /// vocabulary.footer_sentinels.push("3rd Quarter, 2024".to_string());
    /// let builder = ConverterBuilder::new().with_vocabulary(vocabulary);
    /// ```
    pub fn with_vocabulary(mut self, vocabulary: LayoutVocabulary) -> Self {
        self.config.vocabulary = vocabulary;
        self
    }

    /// 注文回送レポートのルート要素にデフォルト名前空間を付ける
    pub fn with_order_routing_namespace(mut self, uri: impl Into<String>) -> Self {
        self.config.namespace = Some(uri.into());
        self
    }

    /// 注文回送レポートに`timestamp`要素を出力する
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.config.timestamp = Some(timestamp);
        self
    }

    /// 入力ファイルのセキュリティ制限を指定する
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxToXmlError::Config(String)`: 設定の検証に失敗した場合
    ///   * 語彙にセクションが1つもない
    ///   * 終端パターンが正規表現としてコンパイルできない
    ///   * 語彙の集計ラベル・執行場所ラベルが空
    pub fn build(self) -> Result<Converter, XlsxToXmlError> {
        let vocabulary = &self.config.vocabulary;
        if vocabulary.summary_label.trim().is_empty() || vocabulary.venues_label.trim().is_empty()
        {
            return Err(XlsxToXmlError::Config(
                "Summary and venues labels must not be empty".to_string(),
            ));
        }

        let scanner = SectionScanner::new(
            self.config.vocabulary.clone(),
            self.config.material_aspects.clone(),
        )?;

        Ok(Converter {
            config: self.config,
            scanner,
        })
    }
}

/// 注文回送レポート変換の結果
///
/// 致命的なエラーも`Err`ではなくこの値で返します。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionedOutcome {
    /// 書き出したXMLのパス（致命的エラー時は`None`）
    pub output_path: Option<PathBuf>,
    /// スキーマ検証の結果（スキーマ未指定なら`None`）
    pub is_valid: Option<bool>,
    /// `行:列: メッセージ`形式の検証診断、またはエラーメッセージ
    pub diagnostics: Vec<String>,
    pub warnings: Vec<LayoutWarning>,
}

/// 変換処理のファサード
///
/// 13F情報テーブル（1行1レコードの表）と注文回送レポート（セクション形式）の
/// 2種類の変換を提供します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxfiling::ConverterBuilder;
///
/// # fn main() -> Result<(), xlsxfiling::XlsxToXmlError> {
/// let converter = ConverterBuilder::new().build()?;
/// converter.convert_flat("holdings.xlsx", "holdings.xml")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// セクション走査器
    scanner: SectionScanner,
}

impl Converter {
    fn load_grid<R: Read + Seek>(&self, input: R) -> Result<Grid, XlsxToXmlError> {
        let mut parser = WorkbookParser::open(input, &self.config.security)?;
        let sheet_name = parser.select_sheet(&self.config.sheet_selector)?;
        parser.read_grid(&sheet_name)
    }

    /// 13F情報テーブルのレコードを抽出
    ///
    /// 必須列が1つでも解決できなければ、行を読む前に
    /// `XlsxToXmlError::FieldResolution`で失敗します。
    pub fn extract_entries<R: Read + Seek>(
        &self,
        input: R,
    ) -> Result<Vec<InfoTableEntry>, XlsxToXmlError> {
        let grid = self.load_grid(input)?;
        let header = header_row(&grid);
        let headers = header_labels(&grid, header);
        let columns = ResolvedColumnMap::build(&headers, INFORMATION_TABLE_FIELDS)?;
        FlatExtractor::new(columns, header).extract(&grid)
    }

    /// 13F情報テーブルのXMLをライターへ書き出す
    ///
    /// 文書全体を組み立ててから書き出すため、途中で失敗した場合は何も書きません。
    pub fn convert_flat_to_writer<R: Read + Seek, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> Result<usize, XlsxToXmlError> {
        let entries = self.extract_entries(input)?;

        let mut buffer = Vec::new();
        InformationTableFormatter.render(&entries, &mut buffer)?;

        output.write_all(&buffer)?;
        output.flush()?;
        Ok(entries.len())
    }

    /// 13F情報テーブルのXMLファイルを作成
    ///
    /// # 引数
    ///
    /// * `input` - 入力ワークブックのパス
    /// * `output` - 出力XMLのパス（既存ファイルは上書き）
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxToXmlError::Io` - 入力ファイルがない、出力先に書き込めない
    /// * `XlsxToXmlError::FieldResolution` - 必須列が見つからない
    /// * `XlsxToXmlError::RowProcessing` - 行の抽出に失敗した
    pub fn convert_flat(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<(), XlsxToXmlError> {
        let input = input.as_ref();
        let output = output.as_ref();

        let entries = self.extract_entries(File::open(input)?)?;
        let mut buffer = Vec::new();
        InformationTableFormatter.render(&entries, &mut buffer)?;
        fs::write(output, &buffer)?;

        log::info!(
            "Wrote {} information table entries from '{}' to '{}'",
            entries.len(),
            input.display(),
            output.display()
        );
        Ok(())
    }

    /// 13F情報テーブルのXMLを命名規則に従って出力ディレクトリへ作成
    ///
    /// # 戻り値
    ///
    /// 作成したファイルのパス
    pub fn convert_flat_into(
        &self,
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        period: &FilingPeriod,
    ) -> Result<PathBuf, XlsxToXmlError> {
        let input = input.as_ref();
        let output_path = output_dir
            .as_ref()
            .join(information_table_file_name(input, period));
        self.convert_flat(input, &output_path)?;
        Ok(output_path)
    }

    /// ディレクトリ内のすべての`.xlsx`を13F情報テーブルに変換
    ///
    /// ファイルごとに並列で処理し、結果を入力パスの昇順で返します。
    /// 1ファイルの失敗は他のファイルの変換を止めません。
    /// 出力ファイル名が同じになる入力は、最初の1件以外が`XlsxToXmlError::Config`になります。
    pub fn convert_directory(
        &self,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        period: &FilingPeriod,
    ) -> Result<Vec<(PathBuf, Result<PathBuf, XlsxToXmlError>)>, XlsxToXmlError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut inputs = Vec::new();
        for entry in fs::read_dir(input_dir.as_ref())? {
            let path = entry?.path();
            let is_xlsx = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("xlsx"));
            if path.is_file() && is_xlsx {
                inputs.push(path);
            }
        }
        inputs.sort();

        // 出力名が重複する入力は、昇順で最初のもの以外を変換しない
        let mut claimed = HashSet::new();
        let jobs: Vec<(PathBuf, String, bool)> = inputs
            .into_iter()
            .map(|input| {
                let name = information_table_file_name(&input, period);
                let unique = claimed.insert(name.clone());
                (input, name, unique)
            })
            .collect();

        let results = jobs
            .into_par_iter()
            .map(|(input, name, unique)| {
                let result = if unique {
                    self.convert_flat_into(&input, output_dir, period)
                } else {
                    Err(XlsxToXmlError::Config(format!(
                        "Output file '{}' is already produced by another input",
                        name
                    )))
                };
                if let Err(e) = &result {
                    log::warn!("Failed to convert '{}': {}", input.display(), e);
                }
                (input, result)
            })
            .collect();

        Ok(results)
    }

    /// 注文回送レポートのモデルを組み立てる
    ///
    /// セクションが見つからない場合も失敗せず、空のブロックと警告を返します。
    pub fn build_report<R: Read + Seek>(
        &self,
        input: R,
        firm_name: &str,
        period: &FilingPeriod,
    ) -> Result<(ReportDocument, Vec<LayoutWarning>), XlsxToXmlError> {
        let firm_name = firm_name.trim();
        if firm_name.is_empty() {
            return Err(XlsxToXmlError::Config(
                "Firm name must not be empty".to_string(),
            ));
        }

        let grid = self.load_grid(input)?;
        log::debug!(
            "Scanning sections with vocabulary version {}",
            self.scanner.vocabulary_version()
        );
        let (non_directed, warnings) = self.scanner.scan(&grid);

        let report = ReportDocument {
            schema_version: ORDER_ROUTING_SCHEMA_VERSION.to_string(),
            firm_name: firm_name.to_string(),
            report_year: period.year,
            report_quarter: period.quarter,
            non_directed,
            directed: Vec::new(),
        };
        Ok((report, warnings))
    }

    /// 注文回送レポートのXMLをライターへ書き出す
    pub fn convert_sectioned_to_writer<R: Read + Seek, W: Write>(
        &self,
        input: R,
        mut output: W,
        firm_name: &str,
        period: &FilingPeriod,
    ) -> Result<Vec<LayoutWarning>, XlsxToXmlError> {
        let (report, warnings) = self.build_report(input, firm_name, period)?;

        let mut buffer = Vec::new();
        self.order_routing_formatter().render(&report, &mut buffer)?;

        output.write_all(&buffer)?;
        output.flush()?;
        Ok(warnings)
    }

    /// 注文回送レポートのXMLファイルを作成し、設定されたXSDで検証する
    ///
    /// 出力ディレクトリがなければ作成します。ファイル名は
    /// `<会社名の最初の単語>_606_NMS_<年>_Q<四半期>.xml`です。
    ///
    /// 致命的なエラーは`output_path = None`、`is_valid = Some(false)`と
    /// 1件の診断として返します。検証に失敗してもファイルは残ります。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxfiling::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxfiling::XlsxToXmlError> {
    /// let converter = ConverterBuilder::new()
    ///     .with_schema("schemas/606.xsd")
    ///     .build()?;
    /// let outcome = converter.convert_sectioned("606.xlsx", "out", "Outset Financial", 2024, 2);
    /// if outcome.is_valid == Some(false) {
    ///     for message in &outcome.diagnostics {
    ///         eprintln!("{}", message);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_sectioned(
        &self,
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        firm_name: &str,
        year: u16,
        quarter: u8,
    ) -> SectionedOutcome {
        match self.write_sectioned(input.as_ref(), output_dir.as_ref(), firm_name, year, quarter)
        {
            Ok((output_path, warnings)) => {
                let (is_valid, diagnostics) = match &self.config.schema_path {
                    Some(schema_path) => {
                        let result = crate::schema::validate(&output_path, schema_path);
                        (Some(result.is_valid), result.messages())
                    }
                    None => (None, Vec::new()),
                };
                SectionedOutcome {
                    output_path: Some(output_path),
                    is_valid,
                    diagnostics,
                    warnings,
                }
            }
            Err(e) => {
                log::warn!("Order routing conversion failed: {}", e);
                SectionedOutcome {
                    output_path: None,
                    is_valid: Some(false),
                    diagnostics: vec![format!("Error during XML creation: {}", e)],
                    warnings: Vec::new(),
                }
            }
        }
    }

    fn write_sectioned(
        &self,
        input: &Path,
        output_dir: &Path,
        firm_name: &str,
        year: u16,
        quarter: u8,
    ) -> Result<(PathBuf, Vec<LayoutWarning>), XlsxToXmlError> {
        let period = FilingPeriod::new(year, quarter)?;
        let (report, warnings) = self.build_report(File::open(input)?, firm_name, &period)?;

        let mut buffer = Vec::new();
        self.order_routing_formatter().render(&report, &mut buffer)?;

        fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(order_routing_file_name(&report.firm_name, &period));
        fs::write(&output_path, &buffer)?;

        log::info!(
            "Wrote order routing report with {} categories to '{}'",
            report.non_directed.len(),
            output_path.display()
        );
        Ok((output_path, warnings))
    }

    fn order_routing_formatter(&self) -> OrderRoutingFormatter {
        OrderRoutingFormatter {
            namespace: self.config.namespace.clone(),
            timestamp: self.config.timestamp,
        }
    }
}
