use crate::{
    error::{SlidecastError, SlidecastResult},
    frame::Frame,
};

/// Parse `#RRGGBB` or `#RRGGBBAA` into an rgb triple and an alpha byte
/// (255 when omitted).
pub fn parse_hex_color(s: &str) -> SlidecastResult<([u8; 3], u8)> {
    let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
    if hex.len() != 6 && hex.len() != 8 {
        return Err(SlidecastError::validation(format!(
            "invalid hex color '{s}': expected #RRGGBB or #RRGGBBAA"
        )));
    }
    let byte = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| SlidecastError::validation(format!("invalid hex color '{s}'")))
    };
    let rgb = [byte(0)?, byte(2)?, byte(4)?];
    let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
    Ok((rgb, alpha))
}

/// Turns a text line into a coverage bitmap. The default implementation
/// shapes with `fontdue`; tests substitute a fixed-cell fake.
pub trait TextRasterizer {
    /// Pixel extent of `text` at `font_size`.
    fn measure(&self, text: &str, font_size: f32) -> (u32, u32);

    /// Row-major alpha coverage (0 = transparent) plus its dimensions.
    fn render(&self, text: &str, font_size: f32) -> (Vec<u8>, u32, u32);
}

pub struct FontdueRasterizer {
    font: fontdue::Font,
}

impl FontdueRasterizer {
    pub fn from_bytes(data: &[u8]) -> SlidecastResult<Self> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| SlidecastError::validation(format!("failed to parse font: {e}")))?;
        Ok(Self { font })
    }

    pub fn from_file(path: &std::path::Path) -> SlidecastResult<Self> {
        use anyhow::Context as _;
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font file '{}'", path.display()))?;
        Self::from_bytes(&data)
    }

    fn line_metrics(&self, text: &str, font_size: f32) -> (f32, i32, i32) {
        let mut width = 0.0f32;
        let mut ascent = 0i32;
        let mut descent = 0i32;
        for ch in text.chars() {
            let m = self.font.metrics(ch, font_size);
            width += m.advance_width;
            ascent = ascent.max(m.height as i32 + m.ymin);
            descent = descent.min(m.ymin);
        }
        (width, ascent, descent)
    }
}

impl TextRasterizer for FontdueRasterizer {
    fn measure(&self, text: &str, font_size: f32) -> (u32, u32) {
        let (width, ascent, descent) = self.line_metrics(text, font_size);
        (width.ceil() as u32, (ascent - descent).max(1) as u32)
    }

    fn render(&self, text: &str, font_size: f32) -> (Vec<u8>, u32, u32) {
        let (width, ascent, descent) = self.line_metrics(text, font_size);
        let w = (width.ceil() as u32).max(1);
        let h = ((ascent - descent).max(1)) as u32;
        let mut bitmap = vec![0u8; (w * h) as usize];

        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let (m, coverage) = self.font.rasterize(ch, font_size);
            let gx = (pen_x + m.xmin as f32) as i64;
            let gy = i64::from(ascent - (m.height as i32 + m.ymin));
            for row in 0..m.height {
                let y = gy + row as i64;
                if y < 0 || y >= i64::from(h) {
                    continue;
                }
                for col in 0..m.width {
                    let x = gx + col as i64;
                    if x < 0 || x >= i64::from(w) {
                        continue;
                    }
                    let dst = &mut bitmap[(y as u32 * w + x as u32) as usize];
                    *dst = (*dst).max(coverage[row * m.width + col]);
                }
            }
            pen_x += m.advance_width;
        }
        (bitmap, w, h)
    }
}

fn blend(dst: [u8; 3], src: [u8; 3], alpha: u8) -> [u8; 3] {
    let a = u32::from(alpha);
    let ia = 255 - a;
    [
        ((u32::from(src[0]) * a + u32::from(dst[0]) * ia + 127) / 255) as u8,
        ((u32::from(src[1]) * a + u32::from(dst[1]) * ia + 127) / 255) as u8,
        ((u32::from(src[2]) * a + u32::from(dst[2]) * ia + 127) / 255) as u8,
    ]
}

fn draw_text(frame: &mut Frame, text: &str, rasterizer: &dyn TextRasterizer, font_size: f32, color: [u8; 3], x: i64, y: i64) {
    let (bitmap, tw, th) = rasterizer.render(text, font_size);
    for row in 0..th {
        let dy = y + i64::from(row);
        if dy < 0 || dy >= i64::from(frame.height()) {
            continue;
        }
        for col in 0..tw {
            let dx = x + i64::from(col);
            if dx < 0 || dx >= i64::from(frame.width()) {
                continue;
            }
            let coverage = bitmap[(row * tw + col) as usize];
            if coverage == 0 {
                continue;
            }
            let dst = frame.get(dx as u32, dy as u32);
            frame.put(dx as u32, dy as u32, blend(dst, color, coverage));
        }
    }
}

/// Opening title card: a solid background with the title centered. The
/// alpha component of `bg_color` is accepted but the card is always drawn
/// opaque since nothing renders behind it. A zero `font_size` picks an
/// automatic size of `max(32, min(height/10, width/(len+5)))`.
pub fn title_screen(
    width: u32,
    height: u32,
    text: &str,
    font_size: u32,
    color: [u8; 3],
    bg_color: [u8; 3],
    rasterizer: &dyn TextRasterizer,
) -> Frame {
    let mut frame = Frame::filled(width, height, bg_color);
    if text.is_empty() {
        return frame;
    }

    let size = if font_size > 0 {
        font_size
    } else {
        let fit = (height / 10).min(width / (text.chars().count() as u32 + 5));
        fit.max(32)
    } as f32;

    let (tw, th) = rasterizer.measure(text, size);
    let x = i64::from(width / 2) - i64::from(tw / 2);
    let y = i64::from(height / 2) - i64::from(th / 2);
    draw_text(&mut frame, text, rasterizer, size, color, x, y);
    frame
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Overlay a caption on its own background band. The band spans the full
/// width, is `text_height + font_size` tall, and is alpha-blended over the
/// frame when `bg_alpha < 255`.
pub fn add_caption(
    frame: &Frame,
    text: &str,
    rasterizer: &dyn TextRasterizer,
    font_size: u32,
    color: [u8; 3],
    bg_color: [u8; 3],
    bg_alpha: u8,
    position: CaptionPosition,
) -> Frame {
    if text.is_empty() {
        return frame.clone();
    }
    let (w, h) = (frame.width(), frame.height());
    let size = font_size.max(1) as f32;
    let (tw, th) = rasterizer.measure(text, size);

    let band_h = (th + font_size).min(h);
    let band_y = match position {
        CaptionPosition::Top => 0,
        CaptionPosition::Center => (h - band_h) / 2,
        CaptionPosition::Bottom => h - band_h,
    };

    let mut out = frame.clone();
    for y in band_y..band_y + band_h {
        for x in 0..w {
            let px = if bg_alpha == 255 {
                bg_color
            } else {
                blend(out.get(x, y), bg_color, bg_alpha)
            };
            out.put(x, y, px);
        }
    }

    let x = i64::from(w / 2) - i64::from(tw / 2);
    let y = i64::from(band_y) + i64::from(band_h / 2) - i64::from(th / 2);
    draw_text(&mut out, text, rasterizer, size, color, x, y);
    out
}
