use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder};
use log::info;

use crate::error::ImageIoError;
use crate::grid::PixelGrid;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Formats the persistence boundary understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
}

impl SaveFormat {
    pub fn from_path(path: &Path) -> Result<Self, ImageIoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(SaveFormat::Png),
            "jpg" | "jpeg" => Ok(SaveFormat::Jpeg),
            _ => Err(ImageIoError::UnsupportedFormat(ext)),
        }
    }
}

/// Decode an image file into a new grid. Every cell is dirty afterwards.
pub fn load_grid(path: &Path) -> Result<PixelGrid, ImageIoError> {
    SaveFormat::from_path(path)?;
    let image = image::open(path)?.to_rgba8();
    let grid = PixelGrid::new(image.width(), image.height())?;
    for (x, y, px) in image.enumerate_pixels() {
        grid.set_pixel(x as i32, y as i32, *px);
    }
    grid.mark_all_dirty();
    info!("Loaded {} ({}x{})", path.display(), grid.width(), grid.height());
    Ok(grid)
}

/// Encode the grid by extension. JPEG drops alpha; `quality` is clamped to 1..=100.
pub fn save_grid(grid: &PixelGrid, path: &Path, quality: u8) -> Result<(), ImageIoError> {
    let format = SaveFormat::from_path(path)?;
    let image = grid.to_image();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                ColorType::Rgb8,
            )?;
        }
    }
    writer.flush()?;
    info!("Saved {} ({}x{}, {:?})", path.display(), grid.width(), grid.height(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLUE, RED, WHITE};
    use image::Rgba;

    #[test]
    fn format_follows_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("a.PNG")).unwrap(), SaveFormat::Png);
        assert_eq!(SaveFormat::from_path(Path::new("a.jpeg")).unwrap(), SaveFormat::Jpeg);
        assert!(matches!(
            SaveFormat::from_path(Path::new("a.gif")),
            Err(ImageIoError::UnsupportedFormat(ext)) if ext == "gif"
        ));
        assert!(SaveFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn png_round_trip_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let grid = PixelGrid::filled(5, 3, WHITE).unwrap();
        grid.set_pixel(4, 2, RED);
        grid.set_pixel(0, 1, Rgba([10, 20, 30, 40]));
        save_grid(&grid, &path, DEFAULT_JPEG_QUALITY).unwrap();

        let loaded = load_grid(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (5, 3));
        assert_eq!(loaded.to_image(), grid.to_image());
        assert_eq!(loaded.get_and_clear_dirty_region(), Some(loaded.bounds()));
    }

    #[test]
    fn jpeg_writes_opaque_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let grid = PixelGrid::filled(8, 8, BLUE).unwrap();
        save_grid(&grid, &path, 0).unwrap();
        let loaded = load_grid(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 8));
        assert!(loaded.to_image().pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_grid(&dir.path().join("nope.png")).is_err());
    }
}
