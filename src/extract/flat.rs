//! Flat Record Extractor
//!
//! 見出し行の下に1行1レコードで並ぶシート（13F情報テーブル）から、
//! 解決済みの列対応表を使って書式化済みレコードを取り出す。

use crate::error::XlsxToXmlError;
use crate::fields::{FieldKey, ResolvedColumnMap};
use crate::formatter::{format_integer, format_whole_dollars, numeric};
use crate::model::InfoTableEntry;
use crate::types::{CellCoord, CellValue, Grid};

/// 見出し行のインデックス
///
/// 最初の空でない行を見出しとみなします。シートがすべて空の場合は0行目です。
pub(crate) fn header_row(grid: &Grid) -> usize {
    (0..grid.row_count())
        .find(|&row| !grid.is_row_blank(row))
        .unwrap_or(0)
}

/// CUSIPの桁数
const CUSIP_LEN: usize = 9;

/// 見出し行のラベルを取得
///
/// 空の見出しセルは`Unnamed: <列インデックス>`という名前になります。
/// 見出しのない列にも位置フォールバックで到達できるよう、
/// グリッドの最大列数まで名前を付けます。
pub(crate) fn header_labels(grid: &Grid, header_row: usize) -> Vec<String> {
    (0..grid.col_count())
        .map(|col| {
            let text = grid.cell(header_row, col).as_text();
            if text.is_empty() {
                format!("Unnamed: {}", col)
            } else {
                text
            }
        })
        .collect()
}

/// 13Fレコード抽出器
///
/// 列対応表を所有し、行ごとに再解決することはありません。
#[derive(Debug, Clone)]
pub(crate) struct FlatExtractor {
    columns: ResolvedColumnMap,
    header_row: usize,
}

impl FlatExtractor {
    pub fn new(columns: ResolvedColumnMap, header_row: usize) -> Self {
        Self {
            columns,
            header_row,
        }
    }

    /// 見出し行以降のすべてのデータ行を抽出
    ///
    /// すべてのセルが空の行はデータ行ではないため読み飛ばします。
    /// 1行でも失敗した場合はエラーを返し、部分的な結果は返しません。
    pub fn extract(&self, grid: &Grid) -> Result<Vec<InfoTableEntry>, XlsxToXmlError> {
        let mut entries = Vec::new();

        for row in (self.header_row + 1)..grid.row_count() {
            if grid.is_row_blank(row) {
                log::debug!("Skipping blank row {}", row + 1);
                continue;
            }
            entries.push(self.extract_row(grid, row)?);
        }

        Ok(entries)
    }

    /// 1行分のレコードを抽出
    fn extract_row(&self, grid: &Grid, row: usize) -> Result<InfoTableEntry, XlsxToXmlError> {
        Ok(InfoTableEntry {
            name_of_issuer: self.required_text(grid, row, FieldKey::NameOfIssuer)?,
            title_of_class: self.required_text(grid, row, FieldKey::TitleOfClass)?,
            cusip: cusip_text(self.required_cell(grid, row, FieldKey::Cusip)?),
            figi: self.optional_text(grid, row, FieldKey::Figi),
            value: format_whole_dollars(numeric(self.cell(grid, row, FieldKey::Value)))
                .into_string(),
            ssh_prnamt: self.integer(grid, row, FieldKey::SshPrnamt),
            ssh_prnamt_type: self.required_text(grid, row, FieldKey::SshPrnamtType)?,
            put_call: self.optional_text(grid, row, FieldKey::PutCall),
            investment_discretion: self.required_text(grid, row, FieldKey::InvestmentDiscretion)?,
            other_manager: self
                .optional_cell(grid, row, FieldKey::OtherManager)
                .map(|cell| format_integer(numeric(cell)).into_string()),
            voting_sole: self.integer(grid, row, FieldKey::VotingSole),
            voting_shared: self.integer(grid, row, FieldKey::VotingShared),
            voting_none: self.integer(grid, row, FieldKey::VotingNone),
        })
    }

    fn cell<'g>(&self, grid: &'g Grid, row: usize, key: FieldKey) -> &'g CellValue {
        match self.columns.index_of(key) {
            Some(col) => grid.cell(row, col),
            None => Grid::empty_cell(),
        }
    }

    /// 値のあるセルのみ返す（省略可能フィールド用）
    fn optional_cell<'g>(&self, grid: &'g Grid, row: usize, key: FieldKey) -> Option<&'g CellValue> {
        let cell = self.cell(grid, row, key);
        (!cell.is_blank()).then_some(cell)
    }

    fn optional_text(&self, grid: &Grid, row: usize, key: FieldKey) -> Option<String> {
        self.optional_cell(grid, row, key).map(CellValue::as_text)
    }

    fn required_cell<'g>(
        &self,
        grid: &'g Grid,
        row: usize,
        key: FieldKey,
    ) -> Result<&'g CellValue, XlsxToXmlError> {
        let col = self.columns.index_of(key).unwrap_or(0);
        let cell = self.cell(grid, row, key);
        if cell.is_blank() {
            return Err(XlsxToXmlError::RowProcessing {
                row: row as u32 + 1,
                cell: CellCoord::new(row as u32, col as u32).to_a1_notation(),
                message: format!("required value '{}' is blank", key),
            });
        }
        Ok(cell)
    }

    fn required_text(&self, grid: &Grid, row: usize, key: FieldKey) -> Result<String, XlsxToXmlError> {
        self.required_cell(grid, row, key).map(CellValue::as_text)
    }

    fn integer(&self, grid: &Grid, row: usize, key: FieldKey) -> String {
        format_integer(numeric(self.cell(grid, row, key))).into_string()
    }
}

/// CUSIPのテキスト
///
/// 数値として保存されたCUSIPは先頭のゼロが失われているため、9桁に補います。
fn cusip_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
            format!("{:0width$}", *n as u64, width = CUSIP_LEN)
        }
        other => other.as_text(),
    }
}
