use bytes::BytesMut;
use chrono::Utc;
use futures_util::StreamExt;
use rlgl_common::frame::CameraFrame;
use rlgl_common::robot::RobotEvent;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::BridgeError;

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse state for the MJPEG multipart stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental splitter for a `multipart/x-mixed-replace` MJPEG body.
///
/// Feed it chunks as they arrive; it returns every JPEG whose closing
/// boundary has been seen. A part still being received stays buffered.
pub struct MjpegParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MjpegParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut jpegs = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep the tail in case the boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    if let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY)
                    {
                        let jpeg_end = self.jpeg_start + pos;
                        // Strip trailing \r\n before boundary
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
                            jpegs.push(jpeg);
                        }
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Avoid re-scanning what was already searched
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        break;
                    }
                }
            }
        }

        jpegs
    }
}

impl Default for MjpegParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the robot's camera stream and forward decoded frames.
/// Reconnects with exponential backoff; returns once the receiver is gone.
pub async fn run_camera_stream(
    client: reqwest::Client,
    stream_url: String,
    events: mpsc::Sender<RobotEvent>,
) {
    let mut backoff = Duration::from_secs(2);
    let max_backoff = Duration::from_secs(30);
    let mut seq: u64 = 0;

    loop {
        info!(url = stream_url, "connecting to camera stream");
        match consume_stream(&client, &stream_url, &events, &mut seq).await {
            Ok(StreamEnd::ReceiverClosed) => {
                debug!("event receiver dropped, stopping camera stream");
                return;
            }
            Ok(StreamEnd::Eof) => {
                info!("camera stream ended cleanly, reconnecting");
                backoff = Duration::from_secs(2);
            }
            Err(e) => {
                error!(error = %e, "camera stream error, reconnecting in {:?}", backoff);
            }
        }
        if events.is_closed() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(max_backoff);
    }
}

enum StreamEnd {
    Eof,
    ReceiverClosed,
}

async fn consume_stream(
    client: &reqwest::Client,
    url: &str,
    events: &mpsc::Sender<RobotEvent>,
    seq: &mut u64,
) -> Result<StreamEnd, BridgeError> {
    let response = client.get(url).send().await.map_err(BridgeError::HttpConnect)?;

    if !response.status().is_success() {
        return Err(BridgeError::HttpStatus(response.status().as_u16()));
    }

    info!(status = %response.status(), "connected to camera stream");

    let mut byte_stream = response.bytes_stream();
    let mut parser = MjpegParser::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(BridgeError::HttpStream)?;

        for jpeg in parser.push(&chunk) {
            let frame_seq = *seq;
            *seq += 1;
            let now_ms = Utc::now().timestamp_millis();
            let frame = match CameraFrame::decode(&jpeg, now_ms, frame_seq) {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, seq = frame_seq, bytes = jpeg.len(), "skipping undecodable camera frame");
                    continue;
                }
            };

            match events.try_send(RobotEvent::CameraFrame(frame)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(seq = frame_seq, "game loop busy, dropping camera frame");
                }
                Err(TrySendError::Closed(_)) => return Ok(StreamEnd::ReceiverClosed),
            }
        }
    }

    Ok(StreamEnd::Eof)
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

    const STREAM: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA\r\n\
--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\nBBBB\r\n--frame\r\n";

    #[test]
    fn splits_whole_body() {
        let mut parser = MjpegParser::new();
        let jpegs = parser.push(STREAM);
        assert_eq!(jpegs, vec![b"AAAA".to_vec(), b"BBBB".to_vec()]);
    }

    #[test]
    fn splits_across_small_chunks() {
        let mut parser = MjpegParser::new();
        let mut jpegs = Vec::new();
        for chunk in STREAM.chunks(5) {
            jpegs.extend(parser.push(chunk));
        }
        assert_eq!(jpegs, vec![b"AAAA".to_vec(), b"BBBB".to_vec()]);
    }

    #[test]
    fn incomplete_part_is_held_back() {
        let mut parser = MjpegParser::new();
        let jpegs = parser.push(b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA");
        assert!(jpegs.is_empty());
        let jpegs = parser.push(b"\r\n--frame\r\n");
        assert_eq!(jpegs, vec![b"AAAA".to_vec()]);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let mut parser = MjpegParser::new();
        let mut body = b"HTTP noise before the first part".to_vec();
        body.extend_from_slice(STREAM);
        assert_eq!(parser.push(&body).len(), 2);
    }

    #[test]
    fn find_subsequence_positions() {
        assert_eq!(find_subsequence(b"abc--frame\r\n", BOUNDARY), Some(3));
        assert_eq!(find_subsequence(b"--fr", BOUNDARY), None);
    }
}
