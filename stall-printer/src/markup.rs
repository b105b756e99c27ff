//! Inline receipt markup
//!
//! A line may start with any number of `[[TAG]]` tokens, which are parsed
//! left to right and never printed:
//!
//! ```text
//! [[C]][[BIG]]PIZZA-12
//! [[SIZE:2x3]][[FONT:B]]Margherita
//! [[RAWHEX:1B 70 00 19 FA]]
//! [[LOGO:/srv/logo.png|w=256|invert|bg=white|th=180]]
//! [[CUT]]
//! ```

use crate::error::TagError;
use crate::escpos::{Alignment, Font};
use crate::raster::{Background, RasterOptions};

/// Parsed markup tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Align(Alignment),
    Bold(bool),
    /// Width at least 2
    DoubleWidth,
    /// Height at least 2
    DoubleHeight,
    /// 2x2 and bold
    Big,
    /// Soft size, clamped to 1..=8
    Size { width: u8, height: u8 },
    Font(Font),
    /// Reset to the default style
    Norm,
    /// Newline; drops the rest of the line
    Break,
    /// Feed and cut; drops the rest of the line
    Cut,
    /// Direct GS ! n
    RawSize { width: u8, height: u8 },
    /// Literal bytes
    RawHex(Vec<u8>),
    /// Embedded bitmap
    Image(ImageSpec),
    /// Not a known tag; ignored
    Unknown(String),
}

/// `path|w=<px>|invert|bg=<white|black>|th=<0-255>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub path: String,
    pub options: RasterOptions,
}

/// Split leading tags off a line
///
/// Returns the tag bodies (trimmed) and the remaining text. The remainder is
/// left-trimmed after every tag.
pub fn split_tags(line: &str) -> (Vec<&str>, &str) {
    let mut tags = Vec::new();
    let mut rest = line;
    while rest.starts_with("[[") {
        let Some(end) = rest.find("]]") else {
            break;
        };
        tags.push(rest[2..end].trim());
        rest = rest[end + 2..].trim_start();
    }
    (tags, rest)
}

/// Parse a tag body (without brackets); names are case-insensitive
pub fn parse_tag(body: &str) -> Result<Tag, TagError> {
    let upper = body.to_ascii_uppercase();
    let (name, arg) = match body.split_once(':') {
        Some((n, a)) => (n.trim().to_ascii_uppercase(), Some(a.trim())),
        None => (upper.clone(), None),
    };

    let tag = match (name.as_str(), arg) {
        ("C", None) => Tag::Align(Alignment::Center),
        ("L", None) => Tag::Align(Alignment::Left),
        ("R", None) => Tag::Align(Alignment::Right),
        ("B", None) => Tag::Bold(true),
        ("NOB", None) => Tag::Bold(false),
        ("DW", None) => Tag::DoubleWidth,
        ("DH", None) => Tag::DoubleHeight,
        ("BIG", None) => Tag::Big,
        ("NORM", None) => Tag::Norm,
        ("BR", None) => Tag::Break,
        ("CUT", None) => Tag::Cut,
        ("SIZE", Some(a)) => {
            let (width, height) = parse_size(a)?;
            Tag::Size { width, height }
        }
        ("RAWSIZE", Some(a)) => {
            let (width, height) = parse_size(a)?;
            Tag::RawSize { width, height }
        }
        ("FONT", Some(a)) => {
            if a.eq_ignore_ascii_case("b") {
                Tag::Font(Font::B)
            } else {
                Tag::Font(Font::A)
            }
        }
        ("RAWHEX", Some(a)) => {
            let compact: String = a.chars().filter(|c| *c != ' ').collect();
            Tag::RawHex(hex::decode(compact)?)
        }
        ("LOGO" | "BITMAP", Some(a)) => Tag::Image(parse_image_spec(a)?),
        _ => Tag::Unknown(upper),
    };
    Ok(tag)
}

/// Parse `WxH`, clamping each side to 1..=8
fn parse_size(arg: &str) -> Result<(u8, u8), TagError> {
    let lower = arg.to_ascii_lowercase();
    let (w, h) = lower
        .split_once('x')
        .ok_or_else(|| TagError::InvalidSize(arg.to_string()))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map(|v| v.clamp(1, 8) as u8)
            .map_err(|_| TagError::InvalidSize(arg.to_string()))
    };
    Ok((parse(w)?, parse(h)?))
}

/// Parse `path|opt|opt...`; unparseable numeric options keep their default
fn parse_image_spec(arg: &str) -> Result<ImageSpec, TagError> {
    let mut parts = arg.split('|').map(str::trim).filter(|p| !p.is_empty());
    let path = parts.next().ok_or(TagError::MissingPath)?.to_string();

    let mut options = RasterOptions::default();
    for opt in parts {
        let lower = opt.to_ascii_lowercase();
        if let Some(v) = lower.strip_prefix("w=") {
            if let Ok(w) = v.trim().parse() {
                options.max_width = w;
            }
        } else if matches!(lower.as_str(), "invert" | "inverse" | "inv") {
            options.invert = true;
        } else if let Some(v) = lower.strip_prefix("bg=") {
            if let Ok(bg) = v.parse::<Background>() {
                options.background = bg;
            }
        } else if let Some(v) = lower.strip_prefix("th=") {
            if let Ok(th) = v.trim().parse::<i64>() {
                options.threshold = th.clamp(0, 255) as u8;
            }
        }
    }

    Ok(ImageSpec { path, options })
}
