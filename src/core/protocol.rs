//! Host ↔ FPGA wire format.
//!
//! ```text
//! Host -> Device: [size]                    1 byte, 2..=10
//! Host -> Device: [A0 .. A(N*N-1)]          N*N bytes, row-major
//! Host -> Device: [B0 .. B(N*N-1)]          N*N bytes, row-major
//! Device -> Host: [R0 .. R(N*N-1)]          8-bit mode
//!              or [hi0, lo0, hi1, lo1, ..]  16-bit mode
//! ```
//!
//! There is no framing, acknowledgement or checksum. A single dropped or
//! corrupted byte shifts every value after it and the host has no way to
//! notice; a short response is the only failure that can be detected here.

use crate::domain::model::{Matrix, MatrixSize, PartialResult, TransferOutcome, WordWidth};

pub fn size_header(size: MatrixSize) -> u8 {
    size.get()
}

/// 1 + 2·N²
pub fn request_len(size: MatrixSize) -> usize {
    1 + 2 * size.cells()
}

pub fn response_len(size: MatrixSize, width: WordWidth) -> usize {
    size.cells() * width.bytes_per_value()
}

/// 完整的請求位元組：header、A、B
pub fn encode_request(size: MatrixSize, a: &Matrix<u8>, b: &Matrix<u8>) -> Vec<u8> {
    let mut frame = Vec::with_capacity(request_len(size));
    frame.push(size_header(size));
    frame.extend_from_slice(a.as_slice());
    frame.extend_from_slice(b.as_slice());
    frame
}

/// 依到達順序還原邏輯值；16-bit 模式下多出的單一位元組會被忽略
pub fn decode_values(bytes: &[u8], width: WordWidth) -> Vec<u16> {
    match width {
        WordWidth::Byte => bytes.iter().map(|&b| b as u16).collect(),
        WordWidth::Word => bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
    }
}

/// 收齊才 reshape，否則回報部分結果
pub fn assemble_response(size: MatrixSize, width: WordWidth, bytes: Vec<u8>) -> TransferOutcome {
    let expected = response_len(size, width);
    if bytes.len() == expected {
        let values = decode_values(&bytes, width);
        if let Some(result) = Matrix::from_flat(size.dim(), values) {
            return TransferOutcome::Complete { result };
        }
    }

    TransferOutcome::Partial(PartialResult {
        width,
        received: bytes.len(),
        expected,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: i64) -> MatrixSize {
        MatrixSize::new(n).unwrap()
    }

    #[test]
    fn test_request_len_for_all_sizes() {
        for n in 2..=10 {
            let s = size(n);
            let a = Matrix::from_flat(s.dim(), vec![1u8; s.cells()]).unwrap();
            let b = Matrix::from_flat(s.dim(), vec![2u8; s.cells()]).unwrap();
            let frame = encode_request(s, &a, &b);
            assert_eq!(frame.len(), 1 + 2 * (n * n) as usize);
            assert_eq!(frame.len(), request_len(s));
            assert_eq!(frame[0], n as u8);
        }
    }

    #[test]
    fn test_request_keeps_row_major_order() {
        let s = size(2);
        let a = Matrix::from_flat(2, vec![1u8, 2, 3, 4]).unwrap();
        let b = Matrix::from_flat(2, vec![5u8, 6, 7, 8]).unwrap();
        assert_eq!(encode_request(s, &a, &b), vec![2, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_decode_word_pairs() {
        let bytes = [0x01, 0x00, 0x00, 0xFF, 0x00, 0x0A, 0x02, 0x00];
        assert_eq!(decode_values(&bytes, WordWidth::Word), vec![256, 255, 10, 512]);
        assert_eq!(decode_values(&[0xFF, 0xFF], WordWidth::Word), vec![65535]);
        assert_eq!(decode_values(&[0x01, 0x02, 0x03], WordWidth::Word), vec![258]);
    }

    #[test]
    fn test_assemble_byte_mode() {
        let outcome = assemble_response(size(2), WordWidth::Byte, vec![10, 20, 30, 40]);
        let matrix = outcome.matrix().unwrap();
        assert_eq!(matrix.to_rows(), vec![vec![10, 20], vec![30, 40]]);
    }

    #[test]
    fn test_assemble_word_mode() {
        let bytes = vec![0x01, 0x00, 0x00, 0xFF, 0x00, 0x0A, 0x02, 0x00];
        let outcome = assemble_response(size(2), WordWidth::Word, bytes);
        let matrix = outcome.matrix().unwrap();
        assert_eq!(matrix.to_rows(), vec![vec![256, 255], vec![10, 512]]);
    }

    #[test]
    fn test_short_response_is_partial() {
        let outcome = assemble_response(size(2), WordWidth::Byte, vec![1, 2, 3]);
        match outcome {
            TransferOutcome::Partial(partial) => {
                assert_eq!(partial.received, 3);
                assert_eq!(partial.expected, 4);
                assert_eq!(partial.bytes, vec![1, 2, 3]);
            }
            other => panic!("expected partial result, got {:?}", other),
        }

        let outcome = assemble_response(size(2), WordWidth::Word, vec![0, 1, 0, 2, 0, 3, 0]);
        assert!(!outcome.is_complete());
    }
}
