use crate::{error::SlidecastResult, frame::Frame};

/// The closed catalog of inter-image transitions. Each variant is a pure
/// function `(outgoing, incoming, progress) -> frame` with progress running
/// 0 -> 1 over the transition's frame count. Numeric ids 0-14 are kept for
/// backward compatibility with older configurations; unknown names and ids
/// resolve to [`Transition::Fade`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Fade,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
    ZoomIn,
    ZoomOut,
    SlideLeft,
    SlideRight,
    CubeRotation,
    DoorOpen,
    Pixelate,
    RadialWipe,
    SplitVertical,
    PageCurl,
}

pub const ALL_TRANSITIONS: [Transition; 15] = [
    Transition::Fade,
    Transition::WipeLeft,
    Transition::WipeRight,
    Transition::WipeUp,
    Transition::WipeDown,
    Transition::ZoomIn,
    Transition::ZoomOut,
    Transition::SlideLeft,
    Transition::SlideRight,
    Transition::CubeRotation,
    Transition::DoorOpen,
    Transition::Pixelate,
    Transition::RadialWipe,
    Transition::SplitVertical,
    Transition::PageCurl,
];

impl Transition {
    pub fn name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::WipeLeft => "wipe_left",
            Self::WipeRight => "wipe_right",
            Self::WipeUp => "wipe_up",
            Self::WipeDown => "wipe_down",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::SlideLeft => "slide_left",
            Self::SlideRight => "slide_right",
            Self::CubeRotation => "cube_rotation",
            Self::DoorOpen => "door_open",
            Self::Pixelate => "pixelate",
            Self::RadialWipe => "radial_wipe",
            Self::SplitVertical => "split_vertical",
            Self::PageCurl => "page_curl",
        }
    }

    /// Lookup by name, falling back to `Fade` for anything unknown.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        ALL_TRANSITIONS
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap_or(Self::Fade)
    }

    /// Lookup by legacy numeric id (0-14), falling back to `Fade`.
    pub fn from_id(id: u32) -> Self {
        ALL_TRANSITIONS
            .get(id as usize)
            .copied()
            .unwrap_or(Self::Fade)
    }

    /// Uniform draw among all registered transitions.
    pub fn random<R: rand::Rng>(rng: &mut R) -> Self {
        ALL_TRANSITIONS[rng.gen_range(0..ALL_TRANSITIONS.len())]
    }

    /// Apply the transition. Frames of mismatched dimensions, and any
    /// internal region arithmetic failure, fall back to a crossfade rather
    /// than erroring.
    pub fn apply(self, a: &Frame, b: &Frame, progress: f64) -> Frame {
        let p = progress.clamp(0.0, 1.0);
        if a.width() != b.width() || a.height() != b.height() {
            let b = b.resized(a.width(), a.height());
            return fade(a, &b, p);
        }
        match self.try_apply(a, b, p) {
            Ok(out) if out.width() == a.width() && out.height() == a.height() => out,
            _ => fade(a, b, p),
        }
    }

    fn try_apply(self, a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
        match self {
            Self::Fade => Ok(fade(a, b, p)),
            Self::WipeLeft => wipe(a, b, p, Axis::X, false),
            Self::WipeRight => wipe(a, b, p, Axis::X, true),
            Self::WipeUp => wipe(a, b, p, Axis::Y, false),
            Self::WipeDown => wipe(a, b, p, Axis::Y, true),
            Self::ZoomIn => zoom_in(a, b, p),
            Self::ZoomOut => zoom_out(a, b, p),
            Self::SlideLeft => slide(a, b, p, true),
            Self::SlideRight => slide(a, b, p, false),
            Self::CubeRotation => cube_rotation(a, b, p),
            Self::DoorOpen => door_open(a, b, p),
            Self::Pixelate => pixelate(a, b, p),
            Self::RadialWipe => radial_wipe(a, b, p),
            Self::SplitVertical => split_vertical(a, b, p),
            Self::PageCurl => page_curl(a, b, p),
        }
    }
}

/// Linear cross-blend `(1-p)*A + p*B`, exact at both endpoints.
pub fn fade(a: &Frame, b: &Frame, p: f64) -> Frame {
    let t = ((p * 255.0).round() as u32).min(255);
    let it = 255 - t;
    let mut out = Frame::new(a.width(), a.height());
    for y in 0..a.height() {
        for x in 0..a.width() {
            let pa = a.get(x, y);
            let pb = b.get(x, y);
            let mut px = [0u8; 3];
            for c in 0..3 {
                px[c] = ((u32::from(pa[c]) * it + u32::from(pb[c]) * t + 127) / 255) as u8;
            }
            out.put(x, y, px);
        }
    }
    out
}

enum Axis {
    X,
    Y,
}

fn wipe(a: &Frame, b: &Frame, p: f64, axis: Axis, inverted: bool) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let mut out = a.clone();
    match axis {
        Axis::X => {
            let cut = if inverted {
                (w as f64 * (1.0 - p)) as u32
            } else {
                (w as f64 * p) as u32
            }
            .min(w);
            // Non-inverted reveals B on [0, cut); inverted on [cut, w).
            let (x0, width) = if inverted { (cut, w - cut) } else { (0, cut) };
            if width > 0 {
                out.blit_in_place(&b.cropped(x0, 0, width, h)?, i64::from(x0), 0);
            }
        }
        Axis::Y => {
            let cut = if inverted {
                (h as f64 * (1.0 - p)) as u32
            } else {
                (h as f64 * p) as u32
            }
            .min(h);
            let (y0, height) = if inverted { (cut, h - cut) } else { (0, cut) };
            if height > 0 {
                out.blit_in_place(&b.cropped(0, y0, w, height)?, 0, i64::from(y0));
            }
        }
    }
    Ok(out)
}

fn zoom_in(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let factor = p.max(0.1);
    let sw = ((w as f64 * factor) as u32).clamp(10.min(w), w);
    let sh = ((h as f64 * factor) as u32).clamp(10.min(h), h);
    let scaled = b.resized(sw, sh);

    let mut out = a.clone();
    out.blit_in_place(
        &scaled,
        i64::from(w / 2) - i64::from(sw / 2),
        i64::from(h / 2) - i64::from(sh / 2),
    );
    Ok(out)
}

fn zoom_out(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let factor = (1.0 - p).max(0.1);
    let sw = ((w as f64 * factor) as u32).clamp(10.min(w), w);
    let sh = ((h as f64 * factor) as u32).clamp(10.min(h), h);
    let scaled = a.resized(sw, sh);

    let mut out = b.clone();
    out.blit_in_place(
        &scaled,
        i64::from(w / 2) - i64::from(sw / 2),
        i64::from(h / 2) - i64::from(sh / 2),
    );
    Ok(out)
}

fn slide(a: &Frame, b: &Frame, p: f64, leftward: bool) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let offset = ((w as f64 * p) as u32).min(w);
    let mut out = Frame::new(w, h);

    if leftward {
        if offset < w {
            out.blit_in_place(&a.cropped(offset, 0, w - offset, h)?, 0, 0);
        }
        if offset > 0 {
            out.blit_in_place(&b.cropped(0, 0, offset, h)?, i64::from(w - offset), 0);
        }
    } else {
        if offset < w {
            out.blit_in_place(&a.cropped(0, 0, w - offset, h)?, i64::from(offset), 0);
        }
        if offset > 0 {
            out.blit_in_place(&b.cropped(w - offset, 0, offset, h)?, 0, 0);
        }
    }
    Ok(out)
}

/// Two-phase perspective approximation: the first half shrinks A onto a
/// symmetric inset rectangle, the second half grows B back out from the
/// matching inset.
fn cube_rotation(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let (frame, q) = if p < 0.5 {
        (a, p * 2.0)
    } else {
        (b, 1.0 - (p - 0.5) * 2.0)
    };

    let inset_x = ((w as f64 * q) / 2.0) as u32;
    let inset_y = ((h as f64 * q) / 2.0) as u32;
    let mut out = Frame::new(w, h);
    if inset_x * 2 >= w || inset_y * 2 >= h {
        return Ok(out);
    }
    let inner = frame.resized(w - inset_x * 2, h - inset_y * 2);
    out.blit_in_place(&inner, i64::from(inset_x), i64::from(inset_y));
    Ok(out)
}

fn door_open(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let center = w / 2;
    let door = (center as f64 * (1.0 - p)) as u32;

    let mut out = b.clone();
    if door > 0 {
        out.blit_in_place(&a.cropped(center - door, 0, door, h)?, 0, 0);
        out.blit_in_place(&a.cropped(center, 0, door, h)?, i64::from(w - door), 0);
    }
    Ok(out)
}

fn pixelate(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let (frame, q) = if p < 0.5 {
        (a, p * 2.0)
    } else {
        (b, 1.0 - (p - 0.5) * 2.0)
    };

    let block = (q * 64.0).clamp(2.0, 64.0) as u32;
    let small = frame.resized((w / block).max(1), (h / block).max(1));
    Ok(small.resized_nearest(w, h))
}

fn radial_wipe(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let diagonal = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt();
    let radius = p * diagonal;
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;

    let mut out = Frame::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            out.put(x, y, if d < radius { b.get(x, y) } else { a.get(x, y) });
        }
    }
    Ok(out)
}

fn split_vertical(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let half = w / 2;
    let offset = ((w as f64 * p * 0.5) as u32).min(half);

    let mut out = b.clone();
    if offset < half {
        out.blit_in_place(&a.cropped(offset, 0, half - offset, h)?, 0, 0);
    }
    if half + offset < w {
        out.blit_in_place(
            &a.cropped(half, 0, w - half - offset, h)?,
            i64::from(half + offset),
            0,
        );
    }
    Ok(out)
}

/// Simplified page curl: B revealed left of the cut with a soft gradient
/// band (10% of width), A sheared slightly rightward to suggest the curl.
fn page_curl(a: &Frame, b: &Frame, p: f64) -> SlidecastResult<Frame> {
    let (w, h) = (a.width(), a.height());
    let curl_x = (w as f64 * p) as i64;
    let gradient_width = ((w as f64 * 0.1) as i64).max(1);
    let shear = 0.2 * p;

    let mut out = Frame::new(w, h);
    for y in 0..h {
        for x in 0..w {
            // Full B left of the band, full sheared A right of the cut.
            let dist = curl_x - x as i64;
            let mask = if dist <= 0 {
                0u32
            } else if dist >= gradient_width {
                255
            } else {
                (255 * dist as u32) / gradient_width as u32
            };

            let src_x = x as f64 - shear * y as f64;
            let pa = if src_x >= 0.0 && (src_x as u32) < w {
                a.get(src_x as u32, y)
            } else {
                [0, 0, 0]
            };
            let pb = b.get(x, y);

            let mut px = [0u8; 3];
            for c in 0..3 {
                px[c] = ((u32::from(pb[c]) * mask + u32::from(pa[c]) * (255 - mask) + 127) / 255)
                    as u8;
            }
            out.put(x, y, px);
        }
    }
    Ok(out)
}
