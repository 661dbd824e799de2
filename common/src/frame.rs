use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// A decoded camera frame with capture metadata.
///
/// Frames are ephemeral: the game loop keeps at most the previous one, and
/// only while the red light is on.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub image: DynamicImage,
    /// Unix millis at which the bridge received the frame.
    pub captured_at_ms: i64,
    /// Sequence number assigned by the camera stream reader.
    pub seq: u64,
}

impl CameraFrame {
    pub fn new(image: DynamicImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image,
            captured_at_ms,
            seq,
        }
    }

    /// Decode a JPEG (or any format the `image` crate can sniff) into a frame.
    pub fn decode(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;
        Ok(Self::new(image, captured_at_ms, seq))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Milliseconds between capture and `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.captured_at_ms
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_jpeg() {
        let frame = CameraFrame::decode(&jpeg_bytes(16, 8), 1708300000000, 3).unwrap();
        assert_eq!(frame.width(), 16);
        assert_eq!(frame.height(), 8);
        assert_eq!(frame.seq, 3);
        assert_eq!(frame.age_ms(1708300000250), 250);
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(CameraFrame::decode(&[], 0, 0), Err(FrameError::Empty)));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let result = CameraFrame::decode(&[0x00, 0x01, 0x02, 0x03], 0, 0);
        assert!(matches!(result, Err(FrameError::Decode(_))));
    }
}
