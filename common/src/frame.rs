/// A single frame as delivered by the camera, still in its wire encoding
/// (JPEG for both the MJPEG stream and the polling endpoint).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl CapturedFrame {
    pub fn new(data: Vec<u8>, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            data,
            captured_at_ms,
            seq,
        }
    }

    pub fn payload_size(&self) -> usize {
        self.data.len()
    }
}

/// Current wall clock in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// File name for a locally exported still, e.g. `lovelens-1708300000000.png`.
pub fn export_file_name(captured_at_ms: i64) -> String {
    format!("lovelens-{captured_at_ms}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_file_name_format() {
        assert_eq!(export_file_name(1708300000000), "lovelens-1708300000000.png");
    }

    #[test]
    fn payload_size_reports_data_length() {
        let frame = CapturedFrame::new(vec![0xFF, 0xD8, 0xFF, 0xE0], 1708300000000, 42);
        assert_eq!(frame.payload_size(), 4);
        assert_eq!(frame.seq, 42);
    }
}
