//! Image preprocessing for the soil classifier.
//!
//! Decodes an uploaded blob, resizes to the model's fixed spatial resolution,
//! and normalizes pixel intensities to [0, 1]. The steps mirror the training
//! pipeline exactly; a different resize filter or channel layout would
//! degrade accuracy without any visible error.

use image::imageops::FilterType;
use ndarray::Array1;

use crate::error::AppError;

// ---

/// Spatial resolution the image model expects.
pub const IMAGE_SIZE: u32 = 224;

/// Decode image bytes into the model's input vector.
///
/// Resizes to exactly `IMAGE_SIZE` x `IMAGE_SIZE` with bilinear filtering
/// (direct resize, no aspect-ratio preservation), then flattens to RGB
/// interleaved f32 in [0, 1]. Malformed data is a [`AppError::Decode`].
pub fn image_to_input(bytes: &[u8]) -> Result<Array1<f32>, AppError> {
    // ---
    let img = image::load_from_memory(bytes).map_err(|e| AppError::Decode(e.to_string()))?;
    let resized = img.resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let pixels: Vec<f32> = rgb
        .pixels()
        .flat_map(|p| p.0.iter().map(|&c| c as f32 / 255.0))
        .collect();

    Ok(Array1::from_vec(pixels))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::io::Cursor;

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        // ---
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn decodes_resizes_and_normalizes() {
        // ---
        let bytes = tiny_png(50, 30);
        let input = image_to_input(&bytes).expect("valid image");

        assert_eq!(input.len(), (IMAGE_SIZE * IMAGE_SIZE * 3) as usize);
        assert!(input.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn square_input_unchanged_by_aspect() {
        // ---
        // Non-square and square images both land at the same fixed shape.
        let squished = image_to_input(&tiny_png(300, 100)).unwrap();
        let square = image_to_input(&tiny_png(224, 224)).unwrap();
        assert_eq!(squished.len(), square.len());
    }

    #[test]
    fn malformed_bytes_are_a_decode_error() {
        // ---
        let err = image_to_input(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn empty_upload_is_a_decode_error() {
        // ---
        let err = image_to_input(&[]).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
