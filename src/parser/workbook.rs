//! Workbook Parser Module
//!
//! calamineのラッパーとして、ワークブックを開き、シートを選択し、
//! セル値をグリッドへ変換します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use std::io::{Cursor, Read};

use crate::api::SheetSelector;
use crate::error::XlsxToXmlError;
use crate::security::SecurityConfig;
use crate::types::{CellValue, Grid};

/// ワークブックパーサー
///
/// 入力全体をメモリに読み込み、セキュリティ検査を通過した場合のみ
/// calamineで開きます（XLSX形式のみサポート）。
pub(crate) struct WorkbookParser {
    workbook: Xlsx<Cursor<Vec<u8>>>,
}

impl WorkbookParser {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー
    /// * `security` - 入力サイズとアーカイブ構造の制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(XlsxToXmlError)` - サイズ超過、不正なアーカイブ、XLSX以外の形式の場合
    pub fn open<R: Read>(mut reader: R, security: &SecurityConfig) -> Result<Self, XlsxToXmlError> {
        let mut buffer = Vec::new();
        let bytes_read = reader.read_to_end(&mut buffer)?;
        security.check_input_size(bytes_read)?;

        // calamineに渡す前にアーカイブ構造を検査
        security.inspect_archive(Cursor::new(buffer.as_slice()))?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(XlsxToXmlError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxToXmlError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(WorkbookParser { workbook })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シート選択方式に基づいてシート名を決定
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(XlsxToXmlError::Config)` - シートが存在しない、またはインデックスが範囲外の場合
    pub fn select_sheet(&self, selector: &SheetSelector) -> Result<String, XlsxToXmlError> {
        let all_sheet_names = self.sheet_names();

        match selector {
            SheetSelector::First => all_sheet_names
                .first()
                .cloned()
                .ok_or_else(|| XlsxToXmlError::Config("Workbook has no sheets".to_string())),

            SheetSelector::Index(index) => {
                all_sheet_names.get(*index).cloned().ok_or_else(|| {
                    XlsxToXmlError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        all_sheet_names.len()
                    ))
                })
            }

            SheetSelector::Name(name) => {
                if !all_sheet_names.contains(name) {
                    return Err(XlsxToXmlError::Config(format!("Sheet '{}' not found", name)));
                }
                Ok(name.clone())
            }
        }
    }

    /// シートをグリッドとして読み込む
    ///
    /// calamineの使用範囲（used range）は先頭の空行・空列を含まないため、
    /// 開始位置の分だけ空セルを補い、シート上の絶対座標を保ちます。
    pub fn read_grid(&mut self, sheet_name: &str) -> Result<Grid, XlsxToXmlError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxToXmlError::Parse(e.into()))?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];

        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; start_col as usize];
            cells.extend(row.iter().map(convert_cell));
            rows.push(cells);
        }

        log::debug!(
            "Loaded sheet '{}': {} rows (used range starts at row {}, col {})",
            sheet_name,
            rows.len(),
            start_row,
            start_col
        );

        Ok(Grid::new(rows))
    }
}

/// calamineのセルデータを`CellValue`へ変換
///
/// 日付セルはExcelのシリアル値（数値）として扱います。
#[allow(unreachable_patterns)]
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        Data::Empty => CellValue::Empty,
        _ => CellValue::Empty,
    }
}
