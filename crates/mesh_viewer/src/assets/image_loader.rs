//! Image loading utilities for texture data
//!
//! Decodes PNG and JPEG files into tightly packed RGBA8 pixels ready for GPU
//! upload. Batches of files decode in parallel on the rayon pool.

use crate::assets::AssetError;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let img = image::open(path_ref).map_err(|e| {
            AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e))
        })?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Decode a batch of keyed image files in parallel.
///
/// Results come back in input order; every decode has finished when this
/// returns.
pub fn decode_all(files: &[(String, PathBuf)]) -> Vec<(String, Result<ImageData, AssetError>)> {
    files
        .par_iter()
        .map(|(key, path)| (key.clone(), ImageData::from_file(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, color: [u8; 4]) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(2, 3, image::Rgba(color))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_from_file_converts_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "red.png", [255, 0, 0, 255]);

        let img = ImageData::from_file(&path).unwrap();
        assert_eq!((img.width, img.height), (2, 3));
        assert_eq!(img, ImageData::solid_color(2, 3, [255, 0, 0, 255]));
    }

    #[test]
    fn test_missing_file() {
        let result = ImageData::from_file("does/not/exist.png");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_decode_all_keeps_order_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let red = write_png(dir.path(), "red.png", [255, 0, 0, 255]);
        let blue = write_png(dir.path(), "blue.png", [0, 0, 255, 255]);

        let files = vec![
            ("red".to_string(), red),
            ("missing".to_string(), dir.path().join("missing.png")),
            ("blue".to_string(), blue),
        ];
        let decoded = decode_all(&files);

        let keys: Vec<&str> = decoded.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["red", "missing", "blue"]);
        assert!(decoded[0].1.is_ok());
        assert!(decoded[1].1.is_err());
        assert_eq!(decoded[2].1.as_ref().unwrap().data[2], 255);
    }
}
