use super::ImageError;
use std::fmt;
use std::sync::Arc;

/// How the alpha channel of a bitmap relates to its color channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaType {
    Opaque,
    Premul,
    Unpremul,
}

/// Pixel layout of a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgba8888,
    Bgra8888,
    Rgb565,
    Argb4444,
    Alpha8,
}

impl ColorType {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Rgba8888 | ColorType::Bgra8888 => 4,
            ColorType::Rgb565 | ColorType::Argb4444 => 2,
            ColorType::Alpha8 => 1,
        }
    }
}

/// A decoded pixel buffer.
///
/// Pixels are shared, so cloning a bitmap is cheap and never copies the
/// buffer. Use [`Bitmap::deep_copy`] when an independent buffer is needed.
#[derive(Clone)]
pub struct Bitmap {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    color_type: ColorType,
    alpha_type: AlphaType,
}

impl Bitmap {
    pub fn new(
        pixels: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        bytes_per_row: usize,
        color_type: ColorType,
        alpha_type: AlphaType,
    ) -> Result<Self, ImageError> {
        let pixels = pixels.into();
        // Sizes that overflow `usize` can never be backed by a buffer.
        let min_row = (width as usize)
            .checked_mul(color_type.bytes_per_pixel())
            .unwrap_or(usize::MAX);
        if bytes_per_row < min_row {
            return Err(ImageError::RowTooShort {
                bytes_per_row,
                required: min_row,
            });
        }

        let required = bytes_per_row
            .checked_mul(height as usize)
            .unwrap_or(usize::MAX);
        if pixels.len() < required {
            return Err(ImageError::BufferTooSmall {
                actual: pixels.len(),
                required,
            });
        }

        Ok(Self {
            pixels,
            width,
            height,
            bytes_per_row,
            color_type,
            alpha_type,
        })
    }

    /// Tightly packed RGBA8888 pixels
    pub fn from_rgba8(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        alpha_type: AlphaType,
    ) -> Result<Self, ImageError> {
        Self::new(
            pixels,
            width,
            height,
            (width as usize).saturating_mul(4),
            ColorType::Rgba8888,
            alpha_type,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    pub fn alpha_type(&self) -> AlphaType {
        self.alpha_type
    }

    pub fn is_premultiplied(&self) -> bool {
        self.alpha_type == AlphaType::Premul
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy the pixels into a buffer no other bitmap shares
    pub fn deep_copy(&self) -> Self {
        Self {
            pixels: Arc::from(&self.pixels[..]),
            ..self.clone()
        }
    }

    /// True when both bitmaps point at the same pixel buffer
    pub fn shares_pixels(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("color_type", &self.color_type)
            .field("alpha_type", &self.alpha_type)
            .finish_non_exhaustive()
    }
}
