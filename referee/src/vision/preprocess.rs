use image::{imageops, DynamicImage, GrayImage};

/// Grayscale conversion followed by a Gaussian blur. A sigma of 0 skips the blur.
pub fn prepare(image: &DynamicImage, blur_sigma: f32) -> GrayImage {
    let gray = image.to_luma8();
    if blur_sigma > 0.0 {
        imageops::blur(&gray, blur_sigma)
    } else {
        gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn converts_color_to_luma() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([255, 255, 255])));
        let gray = prepare(&rgb, 0.0);
        assert_eq!(gray.dimensions(), (6, 4));
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn blur_spreads_a_single_bright_pixel() {
        let mut gray = GrayImage::new(9, 9);
        gray.put_pixel(4, 4, Luma([255]));
        let blurred = prepare(&DynamicImage::ImageLuma8(gray), 1.1);
        assert_eq!(blurred.dimensions(), (9, 9));
        assert!(blurred.get_pixel(4, 4).0[0] < 255);
        assert!(blurred.get_pixel(5, 4).0[0] > 0);
    }

    #[test]
    fn uniform_frame_survives_blur() {
        let gray = GrayImage::from_pixel(8, 8, Luma([120]));
        let blurred = prepare(&DynamicImage::ImageLuma8(gray), 1.1);
        assert!(blurred.pixels().all(|p| (p.0[0] as i32 - 120).abs() <= 1));
    }
}
