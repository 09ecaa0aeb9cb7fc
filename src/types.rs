//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 空セル、または空白のみの文字列かどうかを判定
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 値を文字列として取得（書式適用前）
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// 前後の空白を除いたテキスト
    pub fn as_text(&self) -> String {
        self.as_raw_string().trim().to_string()
    }

    /// 数値として解釈できる場合はその値を返す
    ///
    /// 文字列セルは前後の空白と桁区切りのカンマを除いてから解析します。
    /// NaNや無限大は数値として扱いません。
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => *n,
            CellValue::String(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return None;
                }
                cleaned.parse::<f64>().ok()?
            }
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// シート1枚分のセルグリッド
///
/// 行・列ともに0始まりの絶対座標で保持します。変換中は不変です。
/// 範囲外の参照は空セルとして扱われます。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// 行データからグリッドを生成
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 最も長い行の列数
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// 指定行のセル列（範囲外の場合は空スライス）
    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 指定座標のセル
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(Self::empty_cell())
    }

    /// 空セルへの参照
    pub fn empty_cell() -> &'static CellValue {
        &EMPTY_CELL
    }

    /// 先頭列（A列）のテキスト（前後の空白を除去）
    pub fn leading_text(&self, row: usize) -> String {
        self.cell(row, 0).as_text()
    }

    /// 行のすべてのセルが空白かどうか
    pub fn is_row_blank(&self, row: usize) -> bool {
        self.row(row).iter().all(CellValue::is_blank)
    }
}
