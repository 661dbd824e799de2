use image::GrayImage;
use rlgl_common::game::PlayerSlot;

/// Motion reading for one player's half of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfReading {
    /// Share of on pixels in percent: `sum / (rows * cols * 255 / 100)`.
    pub density_percent: f64,
    pub moving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub left: HalfReading,
    pub right: HalfReading,
}

impl Movement {
    pub fn pair(&self) -> (bool, bool) {
        (self.left.moving, self.right.moving)
    }

    pub fn any(&self) -> bool {
        self.left.moving || self.right.moving
    }

    pub fn reading(&self, slot: PlayerSlot) -> HalfReading {
        match slot {
            PlayerSlot::First => self.left,
            PlayerSlot::Second => self.right,
        }
    }

    /// Players caught moving, in slot order.
    pub fn moving_slots(&self) -> Vec<PlayerSlot> {
        PlayerSlot::ALL
            .into_iter()
            .filter(|slot| self.reading(*slot).moving)
            .collect()
    }
}

/// Decides movement per half from binarized difference images.
///
/// With the default cut-off of 0 any single on pixel is movement; the
/// threshold slider only changes what gets binarized to on.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    min_density_percent: f64,
}

impl MotionDetector {
    pub fn new(min_density_percent: f64) -> Self {
        Self {
            min_density_percent,
        }
    }

    pub fn inspect(&self, left: &GrayImage, right: &GrayImage) -> Movement {
        Movement {
            left: self.read_half(left),
            right: self.read_half(right),
        }
    }

    fn read_half(&self, half: &GrayImage) -> HalfReading {
        let density_percent = density_percent(half);
        HalfReading {
            density_percent,
            moving: density_percent > self.min_density_percent,
        }
    }
}

/// Normalized intensity sum of a binarized image; 0 for an empty image.
pub fn density_percent(img: &GrayImage) -> f64 {
    let area = img.width() as u64 * img.height() as u64;
    if area == 0 {
        return 0.0;
    }
    let sum: u64 = img.as_raw().iter().map(|&v| v as u64).sum();
    sum as f64 * 100.0 / (area as f64 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn all_black_has_zero_density() {
        assert_eq!(density_percent(&GrayImage::new(4, 4)), 0.0);
    }

    #[test]
    fn all_white_has_full_density() {
        assert_eq!(density_percent(&GrayImage::from_pixel(4, 4, Luma([255]))), 100.0);
    }

    #[test]
    fn quarter_white_is_twenty_five_percent() {
        let img = GrayImage::from_fn(4, 4, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        assert_eq!(density_percent(&img), 25.0);
    }

    #[test]
    fn empty_half_never_moves() {
        let detector = MotionDetector::new(0.0);
        let movement = detector.inspect(&GrayImage::new(0, 0), &GrayImage::new(0, 4));
        assert_eq!(movement.pair(), (false, false));
    }

    #[test]
    fn cutoff_filters_sparse_noise() {
        let mut noisy = GrayImage::new(10, 10);
        noisy.put_pixel(0, 0, Luma([255]));
        let strict = MotionDetector::new(0.0).inspect(&noisy, &GrayImage::new(10, 10));
        assert!(strict.left.moving);
        let tolerant = MotionDetector::new(5.0).inspect(&noisy, &GrayImage::new(10, 10));
        assert!(!tolerant.left.moving);
        assert!(!tolerant.any());
    }

    #[test]
    fn moving_slots_follow_halves() {
        let white = GrayImage::from_pixel(2, 2, Luma([255]));
        let black = GrayImage::new(2, 2);
        let movement = MotionDetector::new(0.0).inspect(&black, &white);
        assert_eq!(movement.moving_slots(), vec![PlayerSlot::Second]);
    }
}
