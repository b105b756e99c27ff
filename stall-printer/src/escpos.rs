//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::{SELECT_CP1252, encode_text};
use crate::raster::RasterImage;

/// Text alignment (ESC a n)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn code(self) -> u8 {
        match self {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        }
    }
}

/// Character font (ESC M n)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Font {
    #[default]
    A,
    B,
}

impl Font {
    pub fn code(self) -> u8 {
        match self {
            Font::A => 0,
            Font::B => 1,
        }
    }
}

/// Per-line text style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub align: Alignment,
    pub bold: bool,
    /// Width multiplier, 1..=8
    pub width: u8,
    /// Height multiplier, 1..=8
    pub height: u8,
    pub font: Font,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            align: Alignment::Left,
            bold: false,
            width: 1,
            height: 1,
            font: Font::A,
        }
    }
}

/// Compute the GS ! parameter: low nibble width-1, high nibble height-1
pub fn size_byte(width: u8, height: u8) -> u8 {
    let w = width.clamp(1, 8) - 1;
    let h = height.clamp(1, 8) - 1;
    w | (h << 4)
}

/// ESC/POS command builder
///
/// Text is transcoded to the printer code page as it is appended, so raw
/// command and raster bytes are never touched by a later conversion.
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    /// Create a builder starting with printer init and code page selection
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        buf.extend_from_slice(&SELECT_CP1252);
        Self { buf }
    }

    /// Create a builder with no preamble (for continuation chunks)
    pub fn empty() -> Self {
        Self { buf: Vec::new() }
    }

    // === Text Output ===

    /// Write text in the printer code page
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_text(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    pub fn align(&mut self, align: Alignment) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, align.code()]);
        self
    }

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.align(Alignment::Center)
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.align(Alignment::Left)
    }

    /// Align text to right
    pub fn right(&mut self) -> &mut Self {
        self.align(Alignment::Right)
    }

    // === Text Style ===

    /// Emphasis on/off (ESC E n)
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, u8::from(on)]);
        self
    }

    /// Character size multipliers (GS ! n), clamped to 1..=8
    pub fn char_size(&mut self, width: u8, height: u8) -> &mut Self {
        self.buf
            .extend_from_slice(&[0x1D, 0x21, size_byte(width, height)]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.char_size(2, 2)
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.char_size(1, 1)
    }

    /// Select font (ESC M n)
    pub fn font(&mut self, font: Font) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x4D, font.code()]);
        self
    }

    /// Apply a full line style: align, size, bold, font
    pub fn style(&mut self, style: &TextStyle) -> &mut Self {
        self.align(style.align)
            .char_size(style.width, style.height)
            .bold(style.bold)
            .font(style.font)
    }

    // === Graphics ===

    /// Raster bit image (GS v 0)
    pub fn raster(&mut self, image: &RasterImage) -> &mut Self {
        self.buf.extend_from_slice(&image.header());
        self.buf.extend_from_slice(&image.data);
        self
    }

    // === Paper Control ===

    /// Cut paper (full cut, GS V 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]);
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the bytes built so far, leaving the builder empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}
