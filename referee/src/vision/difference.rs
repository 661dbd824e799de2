use image::{imageops, GrayImage, Luma};
use rlgl_common::config::DifferenceMode;

use super::VisionError;

pub fn difference(
    current: &GrayImage,
    previous: &GrayImage,
    mode: DifferenceMode,
) -> Result<GrayImage, VisionError> {
    if current.dimensions() != previous.dimensions() {
        return Err(VisionError::DimensionMismatch {
            previous: previous.dimensions(),
            current: current.dimensions(),
        });
    }

    let mut out = GrayImage::new(current.width(), current.height());
    for ((dst, cur), prev) in out.pixels_mut().zip(current.pixels()).zip(previous.pixels()) {
        let (c, p) = (cur.0[0], prev.0[0]);
        dst.0[0] = match mode {
            DifferenceMode::Absolute => c.abs_diff(p),
            DifferenceMode::Saturating => c.saturating_sub(p),
        };
    }
    Ok(out)
}

/// 255 where the difference is strictly above `threshold`, 0 elsewhere.
pub fn binarize(diff: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = diff.clone();
    for px in out.pixels_mut() {
        px.0[0] = if px.0[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Split into the two players' regions: columns `[0, w)` and `[w, 2w)` with
/// `w = width / 2`. An odd last column belongs to neither.
pub fn split_halves(img: &GrayImage) -> (GrayImage, GrayImage) {
    let half = img.width() / 2;
    let height = img.height();
    let left = imageops::crop_imm(img, 0, 0, half, height).to_image();
    let right = imageops::crop_imm(img, half, 0, half, height).to_image();
    (left, right)
}

/// Draw the vertical line separating the two players.
pub fn draw_divider(img: &mut GrayImage) {
    let x = img.width() / 2;
    if x >= img.width() {
        return;
    }
    for y in 0..img.height() {
        img.put_pixel(x, y, Luma([255]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_difference_is_symmetric() {
        let a = GrayImage::from_pixel(2, 2, Luma([10]));
        let b = GrayImage::from_pixel(2, 2, Luma([60]));
        let ab = difference(&a, &b, DifferenceMode::Absolute).unwrap();
        let ba = difference(&b, &a, DifferenceMode::Absolute).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.get_pixel(0, 0), &Luma([50]));
    }

    #[test]
    fn saturating_difference_clamps_at_zero() {
        let darker = GrayImage::from_pixel(2, 2, Luma([10]));
        let brighter = GrayImage::from_pixel(2, 2, Luma([60]));
        let diff = difference(&darker, &brighter, DifferenceMode::Saturating).unwrap();
        assert_eq!(diff.get_pixel(1, 1), &Luma([0]));
        let diff = difference(&brighter, &darker, DifferenceMode::Saturating).unwrap();
        assert_eq!(diff.get_pixel(1, 1), &Luma([50]));
    }

    #[test]
    fn binarize_is_strict() {
        let mut diff = GrayImage::new(3, 1);
        diff.put_pixel(0, 0, Luma([29]));
        diff.put_pixel(1, 0, Luma([30]));
        diff.put_pixel(2, 0, Luma([31]));
        let bin = binarize(&diff, 30);
        assert_eq!(bin.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn binarize_at_max_threshold_is_always_black() {
        let diff = GrayImage::from_pixel(2, 2, Luma([255]));
        assert!(binarize(&diff, 255).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn odd_width_drops_last_column() {
        let img = GrayImage::from_fn(5, 2, |x, _| Luma([x as u8]));
        let (left, right) = split_halves(&img);
        assert_eq!(left.dimensions(), (2, 2));
        assert_eq!(right.dimensions(), (2, 2));
        assert_eq!(left.get_pixel(1, 0), &Luma([1]));
        assert_eq!(right.get_pixel(0, 0), &Luma([2]));
        assert_eq!(right.get_pixel(1, 1), &Luma([3]));
    }

    #[test]
    fn one_pixel_wide_image_has_empty_halves() {
        let (left, right) = split_halves(&GrayImage::new(1, 3));
        assert_eq!(left.width(), 0);
        assert_eq!(right.width(), 0);
    }
}
