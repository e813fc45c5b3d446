//! Screenshot capture and report encoding

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::Result;

/// Width of the `<img>` tag emitted for reports
pub const REPORT_IMAGE_WIDTH: u32 = 200;

/// A screenshot written to the host
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// File holding the raw PNG bytes
    pub path: PathBuf,
    /// The same bytes, base64-encoded
    pub base64_data: String,
    /// Pixel size, when the bytes decode as an image
    pub dimensions: Option<(u32, u32)>,
}

impl Screenshot {
    /// Load the screenshot stored at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path)?;

        let dimensions = image::load_from_memory(&bytes)
            .ok()
            .map(|img| (img.width(), img.height()));
        debug!(
            "Screenshot {}: {} bytes, dimensions {:?}",
            path.display(),
            bytes.len(),
            dimensions
        );

        Ok(Self {
            path,
            base64_data: general_purpose::STANDARD.encode(&bytes),
            dimensions,
        })
    }

    /// Inline `<img>` tag for HTML reports
    pub fn to_html(&self) -> String {
        format!(
            r#"<img src="data:image/png;base64,{}" width="{}">"#,
            self.base64_data, REPORT_IMAGE_WIDTH
        )
    }

    /// Decode the base64 payload back into PNG bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(general_purpose::STANDARD.decode(&self.base64_data)?)
    }
}

/// Timestamped screenshot file name: `screenshot_yyyy-mm-dd_HH-MM-SS-mmm.png`
pub fn default_screenshot_name() -> String {
    let now: DateTime<Local> = Local::now();
    format!("screenshot_{}.png", now.format("%Y-%m-%d_%H-%M-%S-%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_from_file_reads_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, png(3, 5)).unwrap();

        let shot = Screenshot::from_file(&path).unwrap();
        assert_eq!(shot.dimensions, Some((3, 5)));
        assert_eq!(shot.decode().unwrap(), std::fs::read(&path).unwrap());
    }

    #[test]
    fn test_non_image_bytes_have_no_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"error: device offline").unwrap();

        let shot = Screenshot::from_file(&path).unwrap();
        assert_eq!(shot.dimensions, None);
    }

    #[test]
    fn test_html_tag() {
        let shot = Screenshot {
            path: PathBuf::from("x.png"),
            base64_data: "QUJD".to_string(),
            dimensions: None,
        };
        assert_eq!(
            shot.to_html(),
            r#"<img src="data:image/png;base64,QUJD" width="200">"#
        );
    }

    #[test]
    fn test_default_name_shape() {
        let name = default_screenshot_name();
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));
    }
}
