use std::path::{Path, PathBuf};

use crate::{
    effects::ColorAdjust,
    error::{SlidecastError, SlidecastResult},
    text::CaptionPosition,
    transitions::Transition,
};

/// How the transition at each image boundary is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionSelect {
    /// Independent seeded draw per boundary.
    Random,
    Fixed(Transition),
}

impl TransitionSelect {
    /// `"random"` draws per boundary; an integer is a legacy transition id;
    /// anything else is treated as a transition name (unknown names fall
    /// back to fade).
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("random") {
            Self::Random
        } else if let Ok(id) = s.parse::<u32>() {
            Self::Fixed(Transition::from_id(id))
        } else {
            Self::Fixed(Transition::from_name(s))
        }
    }
}

/// `"W:H"` as a reduced ratio; malformed or degenerate input falls back to
/// 16:9.
pub fn parse_aspect_ratio(s: &str) -> (u32, u32) {
    let mut parts = s.trim().splitn(2, ':');
    let w = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let h = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    match (w, h) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => (16, 9),
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub output_file: PathBuf,
    /// Hard total-duration target; a non-positive value falls back to
    /// `image_duration` per still.
    pub video_duration: f64,
    pub image_duration: f64,
    pub frame_rate: u32,
    pub transition_duration: f64,
    pub transition_type: String,
    pub output_aspect_ratio: String,
    pub output_width: u32,
    pub ken_burns_enabled: bool,
    pub ken_burns_intensity: f64,
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("slideshow.mp4"),
            video_duration: 59.0,
            image_duration: 3.0,
            frame_rate: 25,
            transition_duration: 0.5,
            transition_type: "random".to_string(),
            output_aspect_ratio: "16:9".to_string(),
            output_width: 1280,
            ken_burns_enabled: false,
            ken_burns_intensity: 0.5,
            seed: 0,
        }
    }
}

impl RenderSettings {
    pub fn transition_select(&self) -> TransitionSelect {
        TransitionSelect::parse(&self.transition_type)
    }

    pub fn aspect_ratio(&self) -> (u32, u32) {
        parse_aspect_ratio(&self.output_aspect_ratio)
    }

    /// Output dimensions, rounded down to even for the encoder.
    pub fn output_dimensions(&self) -> (u32, u32) {
        let (rw, rh) = self.aspect_ratio();
        let w = self.output_width.max(2) & !1;
        let h = (((w as u64 * rh as u64) / rw as u64) as u32).max(2) & !1;
        (w, h)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub title_text: String,
    pub title_duration: f64,
    pub title_font_size: u32,
    pub title_color: String,
    pub title_bg_color: String,
    pub captions_enabled: bool,
    pub caption_font_size: u32,
    pub caption_color: String,
    pub caption_bg_color: String,
    pub caption_position: CaptionPosition,
    pub font_path: Option<PathBuf>,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            title_text: String::new(),
            title_duration: 3.0,
            title_font_size: 0,
            title_color: "#FFFFFF".to_string(),
            title_bg_color: "#00000080".to_string(),
            captions_enabled: false,
            caption_font_size: 24,
            caption_color: "#FFFFFF".to_string(),
            caption_bg_color: "#00000080".to_string(),
            caption_position: CaptionPosition::Bottom,
            font_path: None,
        }
    }
}

impl TextSettings {
    pub fn title_enabled(&self) -> bool {
        !self.title_text.is_empty()
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub file: Option<PathBuf>,
    pub volume: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub loop_audio: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            file: None,
            volume: 1.0,
            fade_in: 2.0,
            fade_out: 2.0,
            loop_audio: true,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub color: ColorAdjust,
    pub vignette: bool,
    pub vignette_intensity: f64,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            color: ColorAdjust::None,
            vignette: false,
            vignette_intensity: 0.3,
        }
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    pub settings: RenderSettings,
    pub text: TextSettings,
    pub audio: AudioSettings,
    pub effects: EffectSettings,
}

impl SlideshowConfig {
    pub fn load(path: &Path) -> SlidecastResult<Self> {
        use anyhow::Context as _;
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SlidecastResult<()> {
        if self.settings.video_duration <= 0.0 && self.settings.image_duration <= 0.0 {
            return Err(SlidecastError::validation(
                "either video_duration or image_duration must be positive",
            ));
        }
        if self.settings.frame_rate == 0 {
            return Err(SlidecastError::validation("frame_rate must be positive"));
        }
        if self.settings.transition_duration < 0.0 {
            return Err(SlidecastError::validation(
                "transition_duration must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.settings.ken_burns_intensity) {
            return Err(SlidecastError::validation(
                "ken_burns_intensity must be within [0, 1]",
            ));
        }
        if self.audio.volume < 0.0 {
            return Err(SlidecastError::validation("audio volume must not be negative"));
        }
        crate::text::parse_hex_color(&self.text.title_color)?;
        crate::text::parse_hex_color(&self.text.title_bg_color)?;
        crate::text::parse_hex_color(&self.text.caption_color)?;
        crate::text::parse_hex_color(&self.text.caption_bg_color)?;
        Ok(())
    }
}
