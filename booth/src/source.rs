use bytes::BytesMut;
use futures_util::StreamExt;
use lovelens_common::config::CameraConfig;
use lovelens_common::frame::{now_ms, CapturedFrame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("camera permission denied (HTTP {0})")]
    PermissionDenied(u16),
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Acquires live streams from the booth camera over HTTP.
pub struct CameraSource;

impl CameraSource {
    /// Connect to the camera and start a background reader feeding the
    /// returned stream. The requested resolution is a hint; the camera may
    /// serve any aspect ratio, and nothing downstream assumes square frames.
    pub async fn acquire(config: &CameraConfig) -> Result<CameraStream, SourceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::DeviceUnavailable(e.to_string()))?;

        match config.mode.as_str() {
            "mjpeg" => {
                let url = format!(
                    "{}?quality={}&fps={}&width={}&height={}",
                    config.url, config.quality, config.fps, config.ideal_width, config.ideal_height
                );
                info!(url, "connecting to MJPEG stream");
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::DeviceUnavailable(e.to_string()))?;
                check_status(response.status())?;
                info!(status = %response.status(), "camera stream open");

                let (tx, rx) = watch::channel(None);
                let reader = tokio::spawn(run_mjpeg_reader(response, tx));
                Ok(CameraStream {
                    latest: rx,
                    reader: Some(reader),
                })
            }
            "polling" => {
                let url = format!(
                    "{}?quality={}&width={}&height={}",
                    config.url.replace("/stream", "/frame"),
                    config.quality,
                    config.ideal_width,
                    config.ideal_height
                );
                info!(url, fps = config.fps, "polling camera for frames");
                // Probe once so acquisition errors surface here, not in the
                // background task.
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::DeviceUnavailable(e.to_string()))?;
                check_status(response.status())?;

                let interval = Duration::from_secs_f64(1.0 / config.fps.max(0.1));
                let (tx, rx) = watch::channel(None);
                if let Ok(bytes) = response.bytes().await {
                    let _ = tx.send(Some(next_frame(bytes.to_vec())));
                }
                let reader = tokio::spawn(run_polling_reader(client, url, interval, tx));
                Ok(CameraStream {
                    latest: rx,
                    reader: Some(reader),
                })
            }
            other => Err(SourceError::DeviceUnavailable(format!(
                "unknown camera mode '{other}', expected 'mjpeg' or 'polling'"
            ))),
        }
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), SourceError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::PermissionDenied(status.as_u16()));
    }
    if !status.is_success() {
        return Err(SourceError::DeviceUnavailable(format!("HTTP {status}")));
    }
    Ok(())
}

fn next_frame(data: Vec<u8>) -> CapturedFrame {
    let seq = SEQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    CapturedFrame::new(data, now_ms(), seq)
}

/// A live camera stream: the reader task keeps `latest` up to date until the
/// stream is released.
pub struct CameraStream {
    latest: watch::Receiver<Option<CapturedFrame>>,
    reader: Option<JoinHandle<()>>,
}

impl CameraStream {
    /// Most recent frame, if the camera has produced one yet.
    pub fn latest(&self) -> Option<CapturedFrame> {
        self.latest.borrow().clone()
    }

    /// Subscribe to frames. The receiver outlives the stream, but after
    /// release it only ever reports the sender as closed.
    pub fn frames(&self) -> watch::Receiver<Option<CapturedFrame>> {
        self.latest.clone()
    }

    /// Stop the reader task and with it all camera I/O. Idempotent.
    pub fn release(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.abort();
            info!("camera stream released");
        }
    }

    pub fn is_live(&self) -> bool {
        self.reader
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) fn stub() -> Self {
        let (tx, rx) = watch::channel(None);
        let reader = tokio::spawn(async move {
            let _tx = tx;
            futures_util::future::pending::<()>().await;
        });
        Self {
            latest: rx,
            reader: Some(reader),
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.release();
    }
}

async fn run_mjpeg_reader(
    response: reqwest::Response,
    tx: watch::Sender<Option<CapturedFrame>>,
) {
    let mut byte_stream = response.bytes_stream();
    let mut parser = MjpegParser::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "camera stream error, reader stopping");
                return;
            }
        };
        for jpeg in parser.push(&chunk) {
            let frame = next_frame(jpeg);
            debug!(seq = frame.seq, bytes = frame.payload_size(), "frame from camera");
            if tx.send(Some(frame)).is_err() {
                return;
            }
        }
    }
    info!("camera stream ended");
}

async fn run_polling_reader(
    client: reqwest::Client,
    url: String,
    interval: Duration,
    tx: watch::Sender<Option<CapturedFrame>>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(bytes) => {
                    let frame = next_frame(bytes.to_vec());
                    debug!(seq = frame.seq, bytes = frame.payload_size(), "frame from camera");
                    if tx.send(Some(frame)).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "failed to read camera frame body"),
            },
            Ok(resp) => warn!(status = %resp.status(), "non-success response from camera"),
            Err(e) => warn!(error = %e, "failed to fetch camera frame"),
        }
    }
}

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental parser for the camera's multipart stream: feed it network
/// chunks, get back complete JPEG frames.
pub(crate) struct MjpegParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MjpegParser {
    pub(crate) fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        // Discard everything up to and including the boundary
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep last few bytes in case boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let keep = self.buffer.len() - BOUNDARY.len();
                            let _ = self.buffer.split_to(keep);
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        // Discard headers
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    // Look for the next boundary to know where the JPEG ends
                    if let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY) {
                        let jpeg_end = self.jpeg_start + pos;
                        // Strip trailing \r\n before the boundary
                        let end = if jpeg_end >= 2
                            && self.buffer[jpeg_end - 2] == b'\r'
                            && self.buffer[jpeg_end - 1] == b'\n'
                        {
                            jpeg_end - 2
                        } else {
                            jpeg_end
                        };
                        let jpeg = self.buffer[..end].to_vec();
                        let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                        if !jpeg.is_empty() {
                            frames.push(jpeg);
                        }
                        // Already past the boundary, go straight to headers
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // No boundary yet; remember where to resume scanning
                        self.jpeg_start = if self.buffer.len() > BOUNDARY.len() {
                            self.buffer.len() - BOUNDARY.len()
                        } else {
                            0
                        };
                        break;
                    }
                }
            }
        }
        frames
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(jpeg: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(BOUNDARY);
        out.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        out.extend_from_slice(jpeg);
        out.extend_from_slice(b"\r\n");
        out
    }

    #[test]
    fn single_frame_in_one_chunk() {
        let mut parser = MjpegParser::new();
        let mut stream = part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        stream.extend_from_slice(BOUNDARY);
        let frames = parser.push(&stream);
        assert_eq!(frames, vec![vec![0xFF, 0xD8, 0xFF, 0xD9]]);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut parser = MjpegParser::new();
        let mut stream = part(&[1, 2, 3]);
        stream.extend_from_slice(&part(&[4, 5, 6]));
        stream.extend_from_slice(BOUNDARY);
        let frames = parser.push(&stream);
        assert_eq!(frames, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut parser = MjpegParser::new();
        let mut stream = part(&[9, 8, 7, 6, 5]);
        stream.extend_from_slice(BOUNDARY);

        let mut collected = Vec::new();
        // Feed one byte at a time: boundary and header markers span chunks.
        for byte in stream {
            collected.extend(parser.push(&[byte]));
        }
        assert_eq!(collected, vec![vec![9, 8, 7, 6, 5]]);
    }

    #[test]
    fn empty_part_is_skipped() {
        let mut parser = MjpegParser::new();
        let mut stream = part(&[]);
        stream.extend_from_slice(&part(&[42]));
        stream.extend_from_slice(BOUNDARY);
        let frames = parser.push(&stream);
        assert_eq!(frames, vec![vec![42]]);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mut stream = CameraStream::stub();
        assert!(stream.is_live());
        stream.release();
        stream.release();
        assert!(!stream.is_live());
    }
}
