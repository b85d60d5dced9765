use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

/// 拡大率（小さいキャプチャは Tesseract の認識率が低い）
const SCALE: u32 = 2;

/// キャプチャ画像を OCR 向けに二値化し、PNG で返す
///
/// グレースケール → 拡大 → 平均輝度でしきい値処理。
pub fn preprocess(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let gray = image::load_from_memory(bytes)?.to_luma8();
    let (width, height) = gray.dimensions();
    let scaled = imageops::resize(&gray, width * SCALE, height * SCALE, FilterType::Triangle);

    let threshold = mean_luminance(&scaled);
    let binary = GrayImage::from_fn(scaled.width(), scaled.height(), |x, y| {
        if scaled.get_pixel(x, y).0[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(binary).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn mean_luminance(img: &GrayImage) -> u8 {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return 127;
    }
    let sum: u64 = img.pixels().map(|p| u64::from(p.0[0])).sum();
    (sum / count) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png() -> Vec<u8> {
        // 左半分が暗い 8x4 の画像
        let img = GrayImage::from_fn(8, 4, |x, _| if x < 4 { Luma([40u8]) } else { Luma([220u8]) });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_preprocess_binarizes_and_scales() {
        let processed = preprocess(&sample_png()).unwrap();
        let img = image::load_from_memory(&processed).unwrap().to_luma8();

        assert_eq!(img.dimensions(), (16, 8));
        assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(15, 7).0[0], 255);
    }

    #[test]
    fn test_preprocess_rejects_garbage() {
        assert!(preprocess(b"definitely not an image").is_err());
    }
}
