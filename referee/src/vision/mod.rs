//! Frame differencing: grayscale + blur, difference, binarization, and the
//! per-half motion density check.

pub mod difference;
pub mod motion;
pub mod preprocess;

use image::GrayImage;
use rlgl_common::config::DifferenceMode;

pub use motion::{Movement, MotionDetector};

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("frame size changed from {previous:?} to {current:?}")]
    DimensionMismatch {
        previous: (u32, u32),
        current: (u32, u32),
    },
}

/// Result of comparing two prepared frames.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub movement: Movement,
    /// Binarized difference with the player divider drawn in, for display only.
    pub display: GrayImage,
}

/// Compare two prepared (grayscale, blurred) frames.
///
/// Pure in `(previous, current, threshold)`: the detector and difference mode
/// are fixed for the lifetime of a game.
pub fn compare(
    previous: &GrayImage,
    current: &GrayImage,
    threshold: u8,
    mode: DifferenceMode,
    detector: &MotionDetector,
) -> Result<Comparison, VisionError> {
    let diff = difference::difference(current, previous, mode)?;
    let binary = difference::binarize(&diff, threshold);
    let (left, right) = difference::split_halves(&binary);
    let movement = detector.inspect(&left, &right);

    let mut display = binary;
    difference::draw_divider(&mut display);
    Ok(Comparison { movement, display })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn detector() -> MotionDetector {
        MotionDetector::new(0.0)
    }

    /// 4x4 frame whose left two columns are `left` and right two columns `right`.
    fn halves(left: u8, right: u8) -> GrayImage {
        GrayImage::from_fn(4, 4, |x, _| if x < 2 { Luma([left]) } else { Luma([right]) })
    }

    #[test]
    fn identical_frames_show_no_movement() {
        let frame = halves(80, 80);
        let cmp = compare(&frame, &frame, 100, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(cmp.movement.pair(), (false, false));
        assert_eq!(cmp.movement.left.density_percent, 0.0);
    }

    #[test]
    fn left_change_only_moves_left() {
        let previous = halves(0, 0);
        let current = halves(50, 0);
        let cmp = compare(&previous, &current, 30, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(cmp.movement.pair(), (true, false));
        assert_eq!(cmp.movement.left.density_percent, 100.0);
    }

    #[test]
    fn difference_equal_to_threshold_is_still() {
        let previous = halves(10, 10);
        let current = halves(40, 40);
        let cmp = compare(&previous, &current, 30, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(cmp.movement.pair(), (false, false));
    }

    #[test]
    fn halves_are_independent() {
        let previous = halves(0, 0);
        let mut current = halves(0, 0);
        current.put_pixel(3, 3, Luma([200]));
        let cmp = compare(&previous, &current, 100, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(cmp.movement.pair(), (false, true));
    }

    #[test]
    fn single_hot_pixel_counts_as_movement() {
        let previous = GrayImage::new(64, 48);
        let mut current = previous.clone();
        current.put_pixel(5, 5, Luma([255]));
        let cmp = compare(&previous, &current, 254, DifferenceMode::Absolute, &detector()).unwrap();
        assert!(cmp.movement.left.moving);
        assert!(cmp.movement.left.density_percent > 0.0);
        assert!(!cmp.movement.right.moving);
    }

    #[test]
    fn darkening_is_ignored_in_saturating_mode() {
        let previous = halves(200, 200);
        let current = halves(0, 0);
        let saturating =
            compare(&previous, &current, 30, DifferenceMode::Saturating, &detector()).unwrap();
        assert_eq!(saturating.movement.pair(), (false, false));
        let absolute =
            compare(&previous, &current, 30, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(absolute.movement.pair(), (true, true));
    }

    #[test]
    fn same_inputs_give_same_result() {
        let previous = halves(0, 0);
        let current = halves(35, 20);
        let first = compare(&previous, &current, 30, DifferenceMode::Absolute, &detector()).unwrap();
        // A later threshold change does not alter an earlier comparison's inputs.
        let _ = compare(&previous, &current, 200, DifferenceMode::Absolute, &detector()).unwrap();
        let again = compare(&previous, &current, 30, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(first.movement, again.movement);
        assert_eq!(first.display, again.display);
    }

    #[test]
    fn divider_is_display_only() {
        let frame = halves(0, 0);
        let cmp = compare(&frame, &frame, 0, DifferenceMode::Absolute, &detector()).unwrap();
        assert_eq!(cmp.movement.pair(), (false, false));
        assert_eq!(cmp.display.get_pixel(2, 0), &Luma([255]));
    }

    #[test]
    fn mismatched_frames_are_an_error() {
        let err = compare(
            &GrayImage::new(4, 4),
            &GrayImage::new(8, 4),
            30,
            DifferenceMode::Absolute,
            &detector(),
        )
        .unwrap_err();
        assert!(matches!(err, VisionError::DimensionMismatch { .. }));
    }
}
