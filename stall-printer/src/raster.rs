//! 1-bit raster encoding for GS v 0
//!
//! Images are flattened onto an opaque background, downscaled to the paper
//! width, binarized by luminance threshold and packed 8 pixels per byte,
//! most significant bit first. A set bit is a printed dot.

use std::str::FromStr;

use crate::error::RasterError;

/// Background used for transparent pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Background {
    #[default]
    White,
    Black,
}

impl Background {
    fn level(self) -> u8 {
        match self {
            Background::White => 255,
            Background::Black => 0,
        }
    }
}

impl FromStr for Background {
    type Err = std::convert::Infallible;

    /// Anything other than "white" is treated as black
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("white") {
            Ok(Background::White)
        } else {
            Ok(Background::Black)
        }
    }
}

/// Rasterization parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Images wider than this are downscaled (aspect preserved)
    pub max_width: u32,
    pub invert: bool,
    /// Luminance below this prints a dot
    pub threshold: u8,
    pub background: Background,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            max_width: 384,
            invert: false,
            threshold: 200,
            background: Background::White,
        }
    }
}

/// Packed raster ready for GS v 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Bytes per row (padded width / 8)
    pub row_bytes: u16,
    /// Rows
    pub height: u16,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// GS v 0 m xL xH yL yH with m = 0 (normal density)
    pub fn header(&self) -> [u8; 8] {
        let [x_l, x_h] = self.row_bytes.to_le_bytes();
        let [y_l, y_h] = self.height.to_le_bytes();
        [0x1D, 0x76, 0x30, 0x00, x_l, x_h, y_l, y_h]
    }

    /// Pack a row-major luminance buffer
    pub fn pack(
        width: u32,
        height: u32,
        luma: &[u8],
        threshold: u8,
        invert: bool,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty);
        }
        let padded = (width + 7) & !7;
        let row_bytes = padded / 8;
        let (Ok(rb), Ok(h)) = (u16::try_from(row_bytes), u16::try_from(height)) else {
            return Err(RasterError::TooLarge {
                width_bytes: row_bytes,
                height,
            });
        };

        let mut data = vec![0u8; row_bytes as usize * height as usize];
        for y in 0..height as usize {
            let src = &luma[y * width as usize..(y + 1) * width as usize];
            let dst = &mut data[y * row_bytes as usize..(y + 1) * row_bytes as usize];
            for (x, &l) in src.iter().enumerate() {
                let ink = (l < threshold) != invert;
                if ink {
                    dst[x / 8] |= 0x80 >> (x % 8);
                }
            }
        }

        Ok(Self {
            row_bytes: rb,
            height: h,
            data,
        })
    }
}

/// Rasterize a decoded image
#[cfg(feature = "image")]
pub fn rasterize(
    img: &image::DynamicImage,
    opts: &RasterOptions,
) -> Result<RasterImage, RasterError> {
    use image::imageops::{self, FilterType};

    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(RasterError::Empty);
    }

    // Flatten alpha onto the background
    let bg = opts.background.level() as u32;
    let flat = image::RgbImage::from_fn(w, h, |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = p[3] as u32;
        let mix = |c: u8| ((c as u32 * a + bg * (255 - a) + 127) / 255) as u8;
        image::Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    });

    let flat = if opts.max_width > 0 && w > opts.max_width {
        let new_h = ((h as u64 * opts.max_width as u64) / w as u64).max(1) as u32;
        imageops::resize(&flat, opts.max_width, new_h, FilterType::Lanczos3)
    } else {
        flat
    };

    let (w, h) = flat.dimensions();
    let luma: Vec<u8> = flat
        .pixels()
        .map(|p| {
            let l = (p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000;
            l as u8
        })
        .collect();

    RasterImage::pack(w, h, &luma, opts.threshold, opts.invert)
}

/// Load and rasterize an image file
#[cfg(feature = "image")]
#[tracing::instrument(skip(opts))]
pub fn rasterize_file(path: &str, opts: &RasterOptions) -> Result<RasterImage, RasterError> {
    if !std::path::Path::new(path).exists() {
        return Err(RasterError::NotFound(path.to_string()));
    }
    let img = image::open(path)?;
    let raster = rasterize(&img, opts)?;
    tracing::debug!(
        row_bytes = raster.row_bytes,
        height = raster.height,
        "bitmap rasterized"
    );
    Ok(raster)
}

#[cfg(not(feature = "image"))]
pub fn rasterize_file(_path: &str, _opts: &RasterOptions) -> Result<RasterImage, RasterError> {
    Err(RasterError::Unsupported)
}
