use crate::utils::error::{Result, UartError};
use crate::utils::monitor::TimingReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MIN_MATRIX_SIZE: u8 = 2;
pub const MAX_MATRIX_SIZE: u8 = 10;

/// 矩陣邊長 N，保證落在 [2, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatrixSize(u8);

impl MatrixSize {
    pub fn new(size: i64) -> Result<Self> {
        if size < MIN_MATRIX_SIZE as i64 || size > MAX_MATRIX_SIZE as i64 {
            return Err(UartError::InvalidSize { size });
        }
        Ok(Self(size as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn dim(self) -> usize {
        self.0 as usize
    }

    /// N²
    pub fn cells(self) -> usize {
        self.dim() * self.dim()
    }
}

impl fmt::Display for MatrixSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 裝置回傳每個結果值的寬度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WordWidth {
    #[default]
    #[serde(rename = "8bit")]
    Byte,
    /// 每個值兩個位元組，高位在前
    #[serde(rename = "16bit")]
    Word,
}

impl WordWidth {
    pub fn bytes_per_value(self) -> usize {
        match self {
            WordWidth::Byte => 1,
            WordWidth::Word => 2,
        }
    }
}

impl FromStr for WordWidth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "8" | "8bit" | "8-bit" | "byte" => Ok(WordWidth::Byte),
            "16" | "16bit" | "16-bit" | "word" => Ok(WordWidth::Word),
            other => Err(format!("unknown mode '{}', expected 8bit or 16bit", other)),
        }
    }
}

impl fmt::Display for WordWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordWidth::Byte => write!(f, "8bit"),
            WordWidth::Word => write!(f, "16bit"),
        }
    }
}

/// 以 row-major 平坦序列儲存的 N×N 方陣
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    /// 長度必須剛好是 size²，否則回傳 None
    pub fn from_flat(size: usize, data: Vec<T>) -> Option<Self> {
        if size == 0 || data.len() != size * size {
            return None;
        }
        Some(Self { size, data })
    }

    pub fn from_fn(size: MatrixSize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let n = size.dim();
        let data = (0..n * n).map(|i| f(i / n, i % n)).collect();
        Self { size: n, data }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.data.get(row * self.size + col).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks(self.size)
    }

    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(|row| row.to_vec()).collect()
    }
}

impl Matrix<u8> {
    /// 主機端參考乘積，只用於比對裝置結果
    pub fn multiply(&self, other: &Matrix<u8>) -> Option<Matrix<u32>> {
        if self.size != other.size {
            return None;
        }
        let n = self.size;
        let mut data = vec![0u32; n * n];
        for row in 0..n {
            for col in 0..n {
                data[row * n + col] = (0..n)
                    .map(|k| self.data[row * n + k] as u32 * other.data[k * n + col] as u32)
                    .sum();
            }
        }
        Some(Matrix { size: n, data })
    }
}

impl<T: Copy + Serialize> Serialize for Matrix<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.data.chunks(self.size))
    }
}

impl<T: Copy + fmt::Display> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .data
            .iter()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);

        for (i, row) in self.rows().enumerate() {
            let prefix = if i == 0 { "[[" } else { " [" };
            let cells: Vec<String> = row.iter().map(|v| format!("{:>width$}", v)).collect();
            let suffix = if i + 1 == self.size { "]]" } else { "]\n" };
            write!(f, "{}{}{}", prefix, cells.join(" "), suffix)?;
        }
        Ok(())
    }
}

/// 在期限內沒收齊回應時的結果，計數單位為線路上的位元組
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialResult {
    pub width: WordWidth,
    pub received: usize,
    pub expected: usize,
    pub bytes: Vec<u8>,
}

impl PartialResult {
    pub fn received_values(&self) -> usize {
        self.received / self.width.bytes_per_value()
    }

    pub fn expected_values(&self) -> usize {
        self.expected / self.width.bytes_per_value()
    }

    pub fn into_error(self) -> UartError {
        UartError::IncompleteTransfer {
            received: self.received,
            expected: self.expected,
        }
    }
}

impl fmt::Display for PartialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            WordWidth::Byte => write!(
                f,
                "Error: Received {} values, expected {}",
                self.received, self.expected
            ),
            WordWidth::Word => write!(
                f,
                "Error: Expected {} bytes, but received {}.",
                self.expected, self.received
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Complete { result: Matrix<u16> },
    Partial(PartialResult),
}

impl TransferOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, TransferOutcome::Complete { .. })
    }

    pub fn matrix(&self) -> Option<&Matrix<u16>> {
        match self {
            TransferOutcome::Complete { result } => Some(result),
            TransferOutcome::Partial(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Matrix<u16>> {
        match self {
            TransferOutcome::Complete { result } => Ok(result),
            TransferOutcome::Partial(partial) => Err(partial.into_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: u32,
    pub actual: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub matched: bool,
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    /// 8-bit 模式下裝置只送回低位元組，因此只比較 mod 256
    pub fn compare(reference: &Matrix<u32>, actual: &Matrix<u16>, width: WordWidth) -> Self {
        let mut mismatches = Vec::new();
        for row in 0..reference.size() {
            for col in 0..reference.size() {
                let full = reference.get(row, col).unwrap_or_default();
                let expected = match width {
                    WordWidth::Byte => full & 0xFF,
                    WordWidth::Word => full & 0xFFFF,
                };
                let actual_value = actual.get(row, col).unwrap_or_default();
                if expected != actual_value as u32 {
                    mismatches.push(Mismatch {
                        row,
                        col,
                        expected,
                        actual: actual_value,
                    });
                }
            }
        }
        Self {
            matched: mismatches.is_empty() && reference.size() == actual.size(),
            mismatches,
        }
    }
}

/// 一次 session 的完整紀錄，可輸出為 JSON
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub port: String,
    pub size: MatrixSize,
    pub mode: WordWidth,
    pub matrix_a: Matrix<u8>,
    pub matrix_b: Matrix<u8>,
    pub outcome: TransferOutcome,
    pub verification: Option<Verification>,
    pub timing: TimingReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Result(u8),
    NoResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub first: u8,
    pub second: u8,
    pub outcome: ProbeOutcome,
}

impl ProbeReport {
    pub fn matches_sum(&self) -> bool {
        match self.outcome {
            ProbeOutcome::Result(value) => value as u16 == self.first as u16 + self.second as u16,
            ProbeOutcome::NoResponse => false,
        }
    }
}
