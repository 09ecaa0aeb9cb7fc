//! Security Module
//!
//! アップロードされたワークブックをcalamineに渡す前の事前検査。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大ファイルへの対策を提供します。

use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxToXmlError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 256MB (268_435_456 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,       // 100MB
            max_input_file_size: 268_435_456, // 256MB
        }
    }
}

impl SecurityConfig {
    /// 入力バイト列のサイズを検査
    pub(crate) fn check_input_size(&self, len: usize) -> Result<(), XlsxToXmlError> {
        if len as u64 > self.max_input_file_size {
            return Err(XlsxToXmlError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// XLSX（ZIPアーカイブ）の中身を検査
    ///
    /// エントリ数、各エントリのパスとサイズ、展開後サイズの累計を確認します。
    /// 中身の展開は行いません。
    pub(crate) fn inspect_archive<R: Read + Seek>(
        &self,
        reader: R,
    ) -> Result<(), XlsxToXmlError> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| XlsxToXmlError::Zip(format!("{}", e)))?;

        if archive.len() > self.max_file_count {
            return Err(XlsxToXmlError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| XlsxToXmlError::Zip(format!("{}", e)))?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                XlsxToXmlError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(XlsxToXmlError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(file_size)
                .ok_or_else(|| {
                    XlsxToXmlError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(XlsxToXmlError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// ZIPエントリのパス検証
///
/// 空のパス、絶対パス、`..`、バックスラッシュを含むパスを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    if path.starts_with('/') || path.starts_with("C:\\") || path.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}
