//! gzip 압축.
//!
//! 업로드 본문 압축과 (테스트용) 해제.

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use pingbox_core::error::CoreError;
use std::io::Read;

/// gzip 압축
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = GzEncoder::new(data, Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| CoreError::Internal(format!("gzip 압축 실패: {e}")))?;
    Ok(compressed)
}

/// gzip 해제
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CoreError::Internal(format!("gzip 해제 실패: {e}")))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_roundtrip() {
        let data = br#"{"report_info":{"seq":0},"metrics":{"clicks":4}}"#;
        let compressed = gzip(data).unwrap();
        assert_eq!(gunzip(&compressed).unwrap(), data.to_vec());
    }

    #[test]
    fn gzip_header_present() {
        let compressed = gzip(b"payload").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn corrupted_data_rejected() {
        let result = gunzip(b"not gzip at all");
        assert!(result.is_err());
    }
}
