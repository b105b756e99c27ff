//! Markup to ESC/POS encoder
//!
//! Interprets receipt markup line by line and streams the resulting bytes
//! into a [`Sink`]. Style is reset to the encoder defaults at the start of
//! every line; a tag that fails only loses its own effect.

use crate::error::{PrintResult, TagError};
use crate::escpos::{EscPosBuilder, TextStyle};
use crate::markup::{Tag, parse_tag, split_tags};
use crate::printer::Sink;
use crate::raster::rasterize_file;
use tracing::{debug, warn};

/// Lines fed before a cut
const CUT_FEED_LINES: u8 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptEncoder {
    defaults: TextStyle,
}

/// Per-line interpreter state
struct LineState {
    style: TextStyle,
    raw_size: bool,
    /// BR/CUT drop whatever text follows them
    drop_rest: bool,
}

impl ReceiptEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: TextStyle) -> Self {
        Self { defaults }
    }

    /// Encode a full receipt in memory
    pub fn encode(&self, text: &str, cut: bool) -> Vec<u8> {
        let mut b = EscPosBuilder::new();
        for line in text.lines() {
            self.encode_line(line, &mut b);
        }
        if cut {
            Self::cut(&mut b);
        }
        b.build()
    }

    /// Stream a receipt into a sink, one chunk per markup line
    ///
    /// The sink is closed on every exit path. The first error (write or
    /// close) is returned.
    pub async fn print_to<S: Sink + ?Sized>(
        &self,
        text: &str,
        cut: bool,
        sink: &mut S,
    ) -> PrintResult<()> {
        let streamed = self.stream(text, cut, sink).await;
        let closed = sink.close().await;
        streamed.and(closed)
    }

    async fn stream<S: Sink + ?Sized>(&self, text: &str, cut: bool, sink: &mut S) -> PrintResult<()> {
        let mut b = EscPosBuilder::new();
        for line in text.lines() {
            self.encode_line(line, &mut b);
            if !b.is_empty() {
                sink.write(&b.take()).await?;
            }
        }
        if cut {
            Self::cut(&mut b);
        }
        if !b.is_empty() {
            sink.write(&b.take()).await?;
        }
        Ok(())
    }

    /// Feed past the tear bar and cut
    fn cut(b: &mut EscPosBuilder) {
        b.text("\n\n").feed(CUT_FEED_LINES).cut();
    }

    fn encode_line(&self, raw: &str, b: &mut EscPosBuilder) {
        let line = raw.trim_end_matches('\r');
        let (tags, text) = split_tags(line);

        let mut st = LineState {
            style: self.defaults,
            raw_size: false,
            drop_rest: false,
        };

        for body in tags {
            if st.drop_rest {
                break;
            }
            let applied = parse_tag(body).and_then(|tag| self.apply(tag, &mut st, b));
            if let Err(e) = applied {
                warn!(tag = body, error = %e, "markup tag skipped");
            }
        }

        if st.raw_size {
            b.align(st.style.align)
                .bold(st.style.bold)
                .font(st.style.font);
        } else {
            b.style(&st.style);
        }

        if !st.drop_rest && !text.is_empty() {
            b.line(text);
        }
    }

    fn apply(&self, tag: Tag, st: &mut LineState, b: &mut EscPosBuilder) -> Result<(), TagError> {
        debug!(?tag, "markup tag");
        let style = &mut st.style;
        match tag {
            Tag::Align(a) => style.align = a,
            Tag::Bold(on) => style.bold = on,
            Tag::DoubleWidth => style.width = style.width.max(2),
            Tag::DoubleHeight => style.height = style.height.max(2),
            Tag::Big => {
                style.width = 2;
                style.height = 2;
                style.bold = true;
            }
            Tag::Size { width, height } => {
                style.width = width;
                style.height = height;
            }
            Tag::Font(f) => style.font = f,
            Tag::Norm => *style = self.defaults,
            Tag::Break => {
                b.newline();
                st.drop_rest = true;
            }
            Tag::Cut => {
                Self::cut(b);
                st.drop_rest = true;
            }
            Tag::RawSize { width, height } => {
                b.char_size(width, height);
                st.raw_size = true;
            }
            Tag::RawHex(bytes) => {
                if bytes.len() == 3 && bytes[0] == 0x1D && bytes[1] == 0x21 {
                    st.raw_size = true;
                }
                b.raw(&bytes);
            }
            Tag::Image(spec) => {
                let raster = rasterize_file(&spec.path, &spec.options)?;
                b.align(style.align).raster(&raster).newline();
            }
            Tag::Unknown(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use crate::printer::MemorySink;
    use async_trait::async_trait;

    const PREAMBLE: [u8; 5] = [0x1B, 0x40, 0x1B, 0x74, 16];

    fn body(text: &str, cut: bool) -> Vec<u8> {
        let out = ReceiptEncoder::new().encode(text, cut);
        assert_eq!(&out[..5], &PREAMBLE);
        out[5..].to_vec()
    }

    fn soft(align: u8, size: u8, bold: u8, font: u8) -> Vec<u8> {
        vec![
            0x1B, 0x61, align, 0x1D, 0x21, size, 0x1B, 0x45, bold, 0x1B, 0x4D, font,
        ]
    }

    #[test]
    fn test_center_bold() {
        let mut expected = soft(1, 0x00, 1, 0);
        expected.extend_from_slice(b"Hello\n");
        assert_eq!(body("[[C]][[B]]Hello", false), expected);
    }

    #[test]
    fn test_size_clamped_to_eight_by_one() {
        let mut expected = soft(0, 0x07, 0, 0);
        expected.extend_from_slice(b"X\n");
        assert_eq!(body("[[SIZE:9x0]]X", false), expected);
    }

    #[test]
    fn test_style_resets_each_line() {
        let mut expected = soft(2, 0x11, 1, 0);
        expected.extend_from_slice(b"A\n");
        expected.extend(soft(0, 0x00, 0, 0));
        expected.extend_from_slice(b"B\n");
        assert_eq!(body("[[R]][[BIG]]A\r\nB", false), expected);
    }

    #[test]
    fn test_dw_then_norm() {
        let mut expected = soft(0, 0x00, 0, 1);
        expected.extend_from_slice(b"x\n");
        assert_eq!(body("[[DW]][[DH]][[NORM]][[FONT:B]]x", false), expected);
    }

    #[test]
    fn test_blank_line_emits_style_only() {
        assert_eq!(body("", false), Vec::<u8>::new());
        assert_eq!(body("\n", false), soft(0, 0, 0, 0));
    }

    #[test]
    fn test_rawsize_suppresses_soft_size() {
        let mut expected = vec![0x1D, 0x21, 0x12];
        expected.extend_from_slice(&[0x1B, 0x61, 0x00, 0x1B, 0x45, 0x00, 0x1B, 0x4D, 0x00]);
        expected.extend_from_slice(b"Big\n");
        assert_eq!(body("[[RAWSIZE:3x2]]Big", false), expected);
    }

    #[test]
    fn test_rawhex_size_suppresses_soft_size() {
        let out = body("[[RAWHEX:1D 21 11]]T", false);
        assert_eq!(&out[..3], &[0x1D, 0x21, 0x11]);
        let size_cmds = out.windows(2).filter(|w| w[0] == 0x1D && w[1] == 0x21).count();
        assert_eq!(size_cmds, 1);
    }

    #[test]
    fn test_bad_hex_is_skipped() {
        let mut expected = soft(0, 0, 1, 0);
        expected.extend_from_slice(b"ok\n");
        assert_eq!(body("[[RAWHEX:GG]][[B]]ok", false), expected);
    }

    #[test]
    fn test_break_drops_rest() {
        let mut expected = vec![b'\n'];
        expected.extend(soft(0, 0, 0, 0));
        assert_eq!(body("[[BR]][[B]]ignored", false), expected);
    }

    #[test]
    fn test_cut_tag_and_final_cut() {
        let cut = [b'\n', b'\n', 0x1B, 0x64, 3, 0x1D, 0x56, 0x00];
        let mut expected = cut.to_vec();
        expected.extend(soft(0, 0, 0, 0));
        expected.extend_from_slice(&cut);
        assert_eq!(body("[[CUT]]gone", true), expected);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let mut expected = soft(1, 0, 0, 0);
        expected.extend_from_slice(b"after\n");
        assert_eq!(body("[[C]][[LOGO:/no/such.png]]after", false), expected);
    }

    #[test]
    fn test_unknown_tag_ignored() {
        let mut expected = soft(0, 0, 0, 0);
        expected.extend_from_slice(b"t\n");
        assert_eq!(body("[[BLINK]]t", false), expected);
    }

    #[tokio::test]
    async fn test_stream_matches_encode() {
        let text = "[[C]]Title\nline\n[[CUT]]";
        let mut sink = MemorySink::default();
        ReceiptEncoder::new()
            .print_to(text, true, &mut sink)
            .await
            .unwrap();
        assert!(sink.closed);
        assert_eq!(sink.data, ReceiptEncoder::new().encode(text, true));
    }

    struct FailingSink {
        closed: bool,
    }

    #[async_trait]
    impl Sink for FailingSink {
        async fn write(&mut self, _bytes: &[u8]) -> PrintResult<()> {
            Err(PrintError::Connection("broken pipe".into()))
        }

        async fn close(&mut self) -> PrintResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_closed_on_write_error() {
        let mut sink = FailingSink { closed: false };
        let result = ReceiptEncoder::new()
            .print_to("hello", true, &mut sink)
            .await;
        assert!(result.is_err());
        assert!(sink.closed);
    }
}
