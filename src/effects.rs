use crate::frame::Frame;

/// Ken Burns pan/zoom direction. The job alternates by image parity: the
/// first image always zooms in, then even indices zoom in and odd indices
/// zoom out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KenBurnsDirection {
    In,
    Out,
}

impl KenBurnsDirection {
    pub fn for_image_index(index: usize) -> Self {
        if index % 2 == 0 {
            Self::In
        } else {
            Self::Out
        }
    }
}

/// Simulated pan/zoom over a static image. `progress` and `intensity` are in
/// [0, 1]; the zoom scale stays within `[1.0, 1.0 + (0.05 + 0.15*intensity)]`
/// and the pan shift within 10% of each dimension. Output has the input's
/// dimensions; the crop window is clamped inside the scaled image and any
/// uncovered remainder stays zero-filled.
pub fn ken_burns(
    frame: &Frame,
    direction: KenBurnsDirection,
    progress: f64,
    intensity: f64,
) -> Frame {
    let progress = progress.clamp(0.0, 1.0);
    let intensity = intensity.clamp(0.0, 1.0);
    let (w, h) = (frame.width(), frame.height());

    let max_zoom = 0.05 + intensity * 0.15;
    let (scale, shift_factor) = match direction {
        KenBurnsDirection::In => (1.0 + max_zoom * progress, progress),
        KenBurnsDirection::Out => (1.0 + max_zoom * (1.0 - progress), 1.0 - progress),
    };
    let shift_x = (w as f64 * 0.1 * shift_factor * intensity) as u32;
    let shift_y = (h as f64 * 0.1 * shift_factor * intensity) as u32;

    let scaled_w = ((w as f64 * scale) as u32).max(w);
    let scaled_h = ((h as f64 * scale) as u32).max(h);
    let scaled = frame.resized(scaled_w, scaled_h);

    let base_x = (scaled_w - w) / 2;
    let base_y = (scaled_h - h) / 2;
    let (start_x, start_y) = match direction {
        KenBurnsDirection::In => (base_x + shift_x, base_y + shift_y),
        KenBurnsDirection::Out => (base_x.saturating_sub(shift_x), base_y.saturating_sub(shift_y)),
    };

    let end_x = (start_x + w).min(scaled_w);
    let end_y = (start_y + h).min(scaled_h);
    if start_x >= end_x || start_y >= end_y {
        return Frame::new(w, h);
    }
    let copy_w = end_x - start_x;
    let copy_h = end_y - start_y;

    let window = match scaled.cropped(start_x, start_y, copy_w, copy_h) {
        Ok(f) => f,
        Err(_) => return frame.clone(),
    };
    Frame::new(w, h).with_blit(&window, 0, 0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorAdjust {
    #[default]
    None,
    Warm,
    Cold,
    Vintage,
    Bw,
}

impl ColorAdjust {
    pub fn apply(self, frame: &Frame) -> Frame {
        match self {
            Self::None => frame.clone(),
            Self::Warm => scale_channels(frame, 1.2, 1.0, 0.8),
            Self::Cold => scale_channels(frame, 0.8, 1.0, 1.2),
            Self::Bw => desaturate(frame),
            Self::Vintage => {
                let sepia = sepia_tone(frame);
                vignette(&sepia, 0.3)
            }
        }
    }
}

fn scale_channels(frame: &Frame, rs: f64, gs: f64, bs: f64) -> Frame {
    map_pixels(frame, |[r, g, b]| {
        [
            clamp_u8(r as f64 * rs),
            clamp_u8(g as f64 * gs),
            clamp_u8(b as f64 * bs),
        ]
    })
}

fn desaturate(frame: &Frame) -> Frame {
    map_pixels(frame, |rgb| {
        let y = clamp_u8(luminance(rgb));
        [y, y, y]
    })
}

fn sepia_tone(frame: &Frame) -> Frame {
    map_pixels(frame, |[r, g, b]| {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        [
            clamp_u8(0.393 * r + 0.769 * g + 0.189 * b),
            clamp_u8(0.349 * r + 0.686 * g + 0.168 * b),
            clamp_u8(0.272 * r + 0.534 * g + 0.131 * b),
        ]
    })
}

/// Radial darkening: `1 - intensity * clamp(distance_from_center / max_radius, 0, 1)`
/// multiplied into every channel.
pub fn vignette(frame: &Frame, intensity: f64) -> Frame {
    let (w, h) = (frame.width(), frame.height());
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let max_radius = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt() / 2.0;

    let mut out = Frame::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            let mask = 1.0 - intensity * (d / max_radius).clamp(0.0, 1.0);
            let [r, g, b] = frame.get(x, y);
            out.put(
                x,
                y,
                [
                    clamp_u8(r as f64 * mask),
                    clamp_u8(g as f64 * mask),
                    clamp_u8(b as f64 * mask),
                ],
            );
        }
    }
    out
}

/// Visual complexity in [0.5, 1.0]: normalized mean Sobel gradient magnitude
/// weighted 0.7 plus normalized pixel variance weighted 0.3. Available as an
/// external signal; not consumed by the timing planner.
pub fn estimate_complexity(frame: &Frame) -> f64 {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    if w < 3 || h < 3 {
        return 0.5;
    }

    let mut gray = vec![0.0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            gray[y * w + x] = luminance(frame.get(x as u32, y as u32));
        }
    }

    let mut edge_sum = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let px = |dx: i64, dy: i64| gray[(y as i64 + dy) as usize * w + (x as i64 + dx) as usize];
            let gx = -px(-1, -1) - 2.0 * px(-1, 0) - px(-1, 1)
                + px(1, -1)
                + 2.0 * px(1, 0)
                + px(1, 1);
            let gy = -px(-1, -1) - 2.0 * px(0, -1) - px(1, -1)
                + px(-1, 1)
                + 2.0 * px(0, 1)
                + px(1, 1);
            edge_sum += (gx * gx + gy * gy).sqrt();
        }
    }
    let edge_density = edge_sum / ((w - 2) as f64 * (h - 2) as f64) / 255.0;

    let mean = gray.iter().sum::<f64>() / gray.len() as f64;
    let variance =
        gray.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / gray.len() as f64 / (255.0 * 255.0);

    let complexity = edge_density * 0.7 + variance * 0.3;
    (0.5 + complexity * 0.5).min(1.0)
}

fn luminance([r, g, b]: [u8; 3]) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_pixels(frame: &Frame, f: impl Fn([u8; 3]) -> [u8; 3]) -> Frame {
    let mut out = Frame::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            out.put(x, y, f(frame.get(x, y)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ken_burns_preserves_dimensions() {
        let src = Frame::filled(64, 36, [90, 90, 90]);
        for p in [0.0, 0.3, 1.0] {
            let out = ken_burns(&src, KenBurnsDirection::In, p, 1.0);
            assert_eq!((out.width(), out.height()), (64, 36));
            let out = ken_burns(&src, KenBurnsDirection::Out, p, 1.0);
            assert_eq!((out.width(), out.height()), (64, 36));
        }
    }

    #[test]
    fn ken_burns_in_at_zero_progress_is_identity() {
        let src = Frame::filled(32, 32, [120, 40, 200]);
        let out = ken_burns(&src, KenBurnsDirection::In, 0.0, 0.8);
        assert_eq!(out, src);
    }

    #[test]
    fn ken_burns_direction_alternates_by_parity() {
        assert_eq!(KenBurnsDirection::for_image_index(0), KenBurnsDirection::In);
        assert_eq!(KenBurnsDirection::for_image_index(1), KenBurnsDirection::Out);
        assert_eq!(KenBurnsDirection::for_image_index(2), KenBurnsDirection::In);
    }

    #[test]
    fn warm_scales_red_up_and_blue_down() {
        let src = Frame::filled(2, 2, [100, 100, 100]);
        let out = ColorAdjust::Warm.apply(&src);
        assert_eq!(out.get(0, 0), [120, 100, 80]);
    }

    #[test]
    fn cold_is_the_inverse_scaling() {
        let src = Frame::filled(2, 2, [100, 100, 100]);
        let out = ColorAdjust::Cold.apply(&src);
        assert_eq!(out.get(0, 0), [80, 100, 120]);
    }

    #[test]
    fn warm_clamps_at_255() {
        let src = Frame::filled(1, 1, [250, 0, 0]);
        let out = ColorAdjust::Warm.apply(&src);
        assert_eq!(out.get(0, 0)[0], 255);
    }

    #[test]
    fn bw_replicates_luminance() {
        let src = Frame::filled(1, 1, [255, 0, 0]);
        let out = ColorAdjust::Bw.apply(&src);
        let [r, g, b] = out.get(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 76);
    }

    #[test]
    fn vignette_leaves_center_untouched_and_darkens_corners() {
        let src = Frame::filled(100, 100, [200, 200, 200]);
        let out = vignette(&src, 0.3);
        // Pixel (50, 50) sits exactly on the center for an even grid.
        assert_eq!(out.get(50, 50), [200, 200, 200]);
        assert!(out.get(0, 0)[0] < 200);
    }

    #[test]
    fn complexity_of_flat_frame_is_floor() {
        let src = Frame::filled(32, 32, [128, 128, 128]);
        assert_eq!(estimate_complexity(&src), 0.5);
    }

    #[test]
    fn complexity_grows_with_edges() {
        let mut noisy = Frame::new(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                noisy.put(x, y, [v, v, v]);
            }
        }
        let flat = Frame::filled(32, 32, [128, 128, 128]);
        assert!(estimate_complexity(&noisy) > estimate_complexity(&flat));
    }
}
