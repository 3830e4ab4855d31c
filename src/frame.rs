use std::path::{Path, PathBuf};

use image::{imageops, imageops::FilterType, RgbImage};

use crate::error::{SlidecastError, SlidecastResult};

/// One fixed-size rgb8 raster. Transforms return new frames; the pixel data
/// of an existing frame is never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    img: RgbImage,
}

impl Frame {
    /// A zero-filled (black) frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            img: RgbImage::new(width, height),
        }
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, image::Rgb(rgb)),
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        Self { img }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.img.get_pixel(x, y).0
    }

    pub fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        self.img.put_pixel(x, y, image::Rgb(rgb));
    }

    /// Raw rgb24 bytes, row-major, no padding.
    pub fn data(&self) -> &[u8] {
        self.img.as_raw()
    }

    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.img
    }

    pub fn resized(&self, width: u32, height: u32) -> Frame {
        Frame {
            img: imageops::resize(&self.img, width.max(1), height.max(1), FilterType::Triangle),
        }
    }

    pub fn resized_nearest(&self, width: u32, height: u32) -> Frame {
        Frame {
            img: imageops::resize(&self.img, width.max(1), height.max(1), FilterType::Nearest),
        }
    }

    /// Copy of the `width`x`height` region at `(x, y)`. Errors when the
    /// region does not lie fully inside the frame.
    pub fn cropped(&self, x: u32, y: u32, width: u32, height: u32) -> SlidecastResult<Frame> {
        if x + width > self.width() || y + height > self.height() {
            return Err(SlidecastError::validation(format!(
                "crop region {}x{}+{}+{} exceeds frame bounds {}x{}",
                width,
                height,
                x,
                y,
                self.width(),
                self.height()
            )));
        }
        Ok(Frame {
            img: imageops::crop_imm(&self.img, x, y, width, height).to_image(),
        })
    }

    /// Blit `src` onto a copy of this frame at `(x, y)`, clipped to bounds.
    pub fn with_blit(&self, src: &Frame, x: i64, y: i64) -> Frame {
        let mut out = self.clone();
        out.blit_in_place(src, x, y);
        out
    }

    pub(crate) fn blit_in_place(&mut self, src: &Frame, x: i64, y: i64) {
        let (dw, dh) = (self.width() as i64, self.height() as i64);
        for sy in 0..src.height() as i64 {
            let dy = y + sy;
            if dy < 0 || dy >= dh {
                continue;
            }
            for sx in 0..src.width() as i64 {
                let dx = x + sx;
                if dx < 0 || dx >= dw {
                    continue;
                }
                self.put(dx as u32, dy as u32, src.get(sx as u32, sy as u32));
            }
        }
    }
}

/// Fit a frame to `ratio` (reduced width:height), producing exactly
/// `target_width x (target_width * ratio.1 / ratio.0)` pixels. Sources whose
/// aspect ratio is already within 0.01 of the target are plainly resized;
/// anything else is resized so one axis matches and center-cropped on the
/// other.
pub fn aspect_fit(frame: &Frame, ratio: (u32, u32), target_width: Option<u32>) -> Frame {
    let (w, h) = (frame.width(), frame.height());
    let target_w = target_width.unwrap_or(w).max(1);
    let target_h = ((target_w as u64 * ratio.1 as u64) / ratio.0.max(1) as u64).max(1) as u32;

    let current_ratio = w as f64 / h.max(1) as f64;
    let target_ratio = ratio.0 as f64 / ratio.1.max(1) as f64;

    if (current_ratio - target_ratio).abs() < 0.01 {
        return frame.resized(target_w, target_h);
    }

    if current_ratio > target_ratio {
        // Source is wider: match height, crop width at center.
        let new_h = target_h;
        let new_w = ((new_h as f64 * current_ratio).round() as u32).max(target_w);
        let resized = frame.resized(new_w, new_h);
        let start_x = (new_w - target_w) / 2;
        resized
            .cropped(start_x, 0, target_w, target_h)
            .unwrap_or(resized)
    } else {
        // Source is taller: match width, crop height at center.
        let new_w = target_w;
        let new_h = ((new_w as f64 / current_ratio).round() as u32).max(target_h);
        let resized = frame.resized(new_w, new_h);
        let start_y = (new_h - target_h) / 2;
        resized
            .cropped(0, start_y, target_w, target_h)
            .unwrap_or(resized)
    }
}

/// Reads still images for the job. The default implementation decodes from
/// disk via the `image` crate; tests substitute in-memory sources.
pub trait ImageSource {
    fn read(&self, path: &Path) -> SlidecastResult<Frame>;
}

pub struct DiskImageSource;

impl ImageSource for DiskImageSource {
    fn read(&self, path: &Path) -> SlidecastResult<Frame> {
        let img = image::open(path)
            .map_err(|e| SlidecastError::unreadable_image(path.display().to_string(), e.to_string()))?;
        Ok(Frame::from_rgb_image(img.to_rgb8()))
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// All supported image files directly under `dir`, lexicographic by filename.
pub fn list_image_files(dir: &Path) -> SlidecastResult<Vec<PathBuf>> {
    use anyhow::Context as _;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list image directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in '{}'", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_fit_exact_dims_for_wider_source() {
        let src = Frame::filled(400, 100, [10, 20, 30]);
        let out = aspect_fit(&src, (16, 9), Some(160));
        assert_eq!(out.width(), 160);
        assert_eq!(out.height(), 90);
    }

    #[test]
    fn aspect_fit_exact_dims_for_taller_source() {
        let src = Frame::filled(100, 400, [10, 20, 30]);
        let out = aspect_fit(&src, (16, 9), Some(160));
        assert_eq!(out.width(), 160);
        assert_eq!(out.height(), 90);
    }

    #[test]
    fn aspect_fit_near_ratio_is_plain_resize() {
        let src = Frame::filled(1600, 900, [200, 0, 0]);
        let out = aspect_fit(&src, (16, 9), Some(320));
        assert_eq!(out.width(), 320);
        assert_eq!(out.height(), 180);
        assert_eq!(out.get(160, 90), [200, 0, 0]);
    }

    #[test]
    fn aspect_fit_defaults_target_width_to_source_width() {
        let src = Frame::filled(320, 320, [0, 0, 0]);
        let out = aspect_fit(&src, (16, 9), None);
        assert_eq!(out.width(), 320);
        assert_eq!(out.height(), 180);
    }

    #[test]
    fn cropped_rejects_out_of_bounds() {
        let src = Frame::new(10, 10);
        assert!(src.cropped(5, 5, 10, 10).is_err());
        assert!(src.cropped(0, 0, 10, 10).is_ok());
    }

    #[test]
    fn blit_clips_to_bounds() {
        let dst = Frame::new(4, 4);
        let src = Frame::filled(4, 4, [255, 255, 255]);
        let out = dst.with_blit(&src, 2, 2);
        assert_eq!(out.get(0, 0), [0, 0, 0]);
        assert_eq!(out.get(3, 3), [255, 255, 255]);
    }

    #[test]
    fn list_image_files_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("slidecast_list_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.webp"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        let files = list_image_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.webp"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
