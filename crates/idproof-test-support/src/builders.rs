//! Synthetic upload and OCR text builders for testing.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};

/// Builder for encoded test uploads.
///
/// Every method returns file bytes ready to pass to the pipeline or write to
/// disk. An encoding failure yields empty bytes, which uploads reject.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// High-contrast checkerboard PNG.
    #[must_use]
    pub fn checkerboard_png(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        encode(&DynamicImage::ImageLuma8(img), ImageFormat::Png)
    }

    /// Uniform gray PNG.
    #[must_use]
    pub fn uniform_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |_, _| Luma([value]));
        encode(&DynamicImage::ImageLuma8(img), ImageFormat::Png)
    }

    /// Smooth RGB gradient JPEG.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let r = ((255 * x) / width.max(1)) as u8;
            let g = ((255 * y) / height.max(1)) as u8;
            image::Rgb([r, g, 128])
        });
        encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    /// A valid PNG below the minimum upload dimensions.
    #[must_use]
    pub fn too_small_png() -> Vec<u8> {
        Self::uniform_png(32, 32, 128)
    }

    /// Bytes that do not decode as any image.
    #[must_use]
    pub fn not_an_image() -> Vec<u8> {
        b"%PDF-1.4 this is not an image".to_vec()
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    if img.write_to(&mut buf, format).is_err() {
        return Vec::new();
    }
    buf.into_inner()
}

/// Builder for OCR output resembling a national ID card.
#[derive(Debug, Clone, Default)]
pub struct OcrTextBuilder {
    lines: Vec<String>,
}

impl OcrTextBuilder {
    /// Starts with a typical card header.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: vec![
                "GOVERNMENT OF INDIA".to_string(),
                "Ravi Kumar".to_string(),
            ],
        }
    }

    /// Starts from nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Adds a `<label>: <date>` line.
    #[must_use]
    pub fn labeled_dob(mut self, label: &str, date: &str) -> Self {
        self.lines.push(format!("{label}: {date}"));
        self
    }

    /// Adds a line with a bare date.
    #[must_use]
    pub fn bare_date(mut self, date: &str) -> Self {
        self.lines.push(format!("Issued {date}"));
        self
    }

    /// Adds an arbitrary line.
    #[must_use]
    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    /// Joins the lines as OCR output.
    #[must_use]
    pub fn build(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push_str("\nMALE\n1234 5678 9012");
        text
    }
}
