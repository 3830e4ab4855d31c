use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use rand::SeedableRng as _;

use crate::{
    audio::AudioProvider,
    checkpoint::{Checkpoint, CheckpointStore},
    config::{SlideshowConfig, TransitionSelect},
    effects::{ken_burns, vignette, KenBurnsDirection},
    error::{SlidecastError, SlidecastResult},
    frame::{aspect_fit, Frame, ImageSource},
    sink::{FrameSink, SinkFactory},
    text::{add_caption, parse_hex_color, title_screen, TextRasterizer},
    timing::TimingPlan,
    transitions::Transition,
};

const IMAGE_CHECKPOINT_EVERY: u64 = 30;
const TRANSITION_CHECKPOINT_EVERY: u64 = 10;
const PAUSE_POLL: std::time::Duration = std::time::Duration::from_millis(50);

type ProgressFn = Box<dyn Fn(f32, &str) + Send + Sync>;

/// Shared control surface for a running job: cooperative cancellation and
/// pause flags plus an optional progress callback. Reported percentages
/// are monotonic even across a resume rewind.
pub struct JobContext {
    cancel: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
    last_percent: AtomicU32,
}

impl JobContext {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            pause: Arc::new(AtomicBool::new(false)),
            progress: None,
            last_percent: AtomicU32::new(0),
        }
    }

    pub fn with_progress(mut self, f: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Flag another thread can set to stop the job at the next frame.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.pause)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    fn report(&self, percent: f32, phase: &str) {
        let pct = percent.clamp(0.0, 100.0);
        let bits = pct.to_bits();
        let last = self.last_percent.load(Ordering::Relaxed);
        if f32::from_bits(last) > pct {
            return;
        }
        self.last_percent.store(bits, Ordering::Relaxed);
        if let Some(f) = &self.progress {
            f(pct, phase);
        }
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Stopped at a frame boundary; the checkpoint was left in place so a
    /// later run can resume.
    Cancelled,
}

enum WriteStatus {
    Written,
    /// The hard total-frame ceiling was reached; stop rendering.
    Full,
    Cancelled,
}

struct FrameWriter<'a> {
    sink: Box<dyn FrameSink>,
    frame_count: u64,
    plan: TimingPlan,
    ctx: &'a JobContext,
    store: &'a dyn CheckpointStore,
    output: &'a Path,
    config_path: &'a str,
}

impl FrameWriter<'_> {
    fn write(
        &mut self,
        frame: &Frame,
        image_index: usize,
        checkpoint_every: u64,
    ) -> SlidecastResult<WriteStatus> {
        while self.ctx.is_paused() && !self.ctx.is_cancelled() {
            std::thread::sleep(PAUSE_POLL);
        }
        if self.ctx.is_cancelled() {
            self.save_checkpoint(image_index)?;
            return Ok(WriteStatus::Cancelled);
        }
        if self.frame_count >= self.plan.total_frames {
            return Ok(WriteStatus::Full);
        }

        self.sink.write(frame)?;
        self.frame_count += 1;

        if self.frame_count % checkpoint_every == 0 {
            self.save_checkpoint(image_index)?;
        }
        let percent = self.frame_count as f32 / self.plan.total_frames as f32 * 100.0;
        self.ctx.report(percent.min(99.0), "rendering");
        Ok(WriteStatus::Written)
    }

    fn save_checkpoint(&self, image_index: usize) -> SlidecastResult<()> {
        let cp = Checkpoint::new(
            self.frame_count,
            self.plan.total_frames,
            image_index,
            self.output,
            self.config_path,
        );
        self.store.save(self.output, &cp)
    }
}

/// A full render of one slideshow: plan, render (optionally resuming from a
/// checkpoint), finalize, mux audio. All IO goes through the injected
/// traits so the pipeline itself is deterministic and testable.
pub struct SlideshowJob<'a> {
    pub config: &'a SlideshowConfig,
    pub images: Vec<PathBuf>,
    pub source: &'a dyn ImageSource,
    pub sinks: &'a dyn SinkFactory,
    pub audio: Option<&'a dyn AudioProvider>,
    pub checkpoints: &'a dyn CheckpointStore,
    pub rasterizer: Option<&'a dyn TextRasterizer>,
    pub config_path: String,
}

impl SlideshowJob<'_> {
    pub fn run(&self, ctx: &JobContext) -> SlidecastResult<JobOutcome> {
        ctx.report(0.0, "initializing");
        let settings = &self.config.settings;
        let (width, height) = settings.output_dimensions();

        let images = self.load_images();
        if images.len() < 2 {
            return Err(SlidecastError::InsufficientImages {
                found: images.len(),
            });
        }
        let num_images = images.len();

        let title_enabled = self.title_enabled();
        let title_duration = if title_enabled {
            self.config.text.title_duration
        } else {
            0.0
        };
        let plan = TimingPlan::plan(
            num_images,
            settings.video_duration,
            settings.image_duration,
            settings.transition_duration,
            title_duration,
            settings.frame_rate,
        )?;
        tracing::info!(
            images = num_images,
            total_frames = plan.total_frames,
            frames_per_image = plan.frames_per_image,
            transition_frames = plan.transition_frames,
            "planned slideshow"
        );

        let output = &settings.output_file;
        let temp = temp_render_path(output);

        let resume = self
            .checkpoints
            .load(output)
            .filter(|cp| cp.is_consistent(plan.total_frames, num_images));
        let start_image = resume.as_ref().map(|cp| cp.image_index).unwrap_or(0);
        if let Some(cp) = &resume {
            tracing::info!(
                image_index = cp.image_index,
                frame_count = cp.frame_count,
                "resuming from checkpoint"
            );
        }

        let sink = self.sinks.open(&temp, width, height, settings.frame_rate)?;
        let mut writer = FrameWriter {
            sink,
            // Checkpoints land mid-segment; rewind to the segment boundary
            // so frame accounting matches what gets re-rendered.
            frame_count: plan.segment_start(start_image, title_enabled),
            plan,
            ctx,
            store: self.checkpoints,
            output,
            config_path: &self.config_path,
        };

        let status =
            match self.render(&mut writer, &images, &plan, start_image, resume.is_some(), width, height) {
                Ok(status) => status,
                Err(e) => {
                    let _ = writer.sink.finish();
                    remove_temp(&temp);
                    return Err(e);
                }
            };
        if matches!(status, WriteStatus::Cancelled) {
            writer.sink.finish()?;
            remove_temp(&temp);
            tracing::info!("render cancelled, checkpoint retained");
            return Ok(JobOutcome::Cancelled);
        }

        ctx.report(99.0, "finalizing");
        writer.sink.finish()?;
        replace_file(&temp, output)?;

        if let (Some(provider), Some(track)) = (self.audio, &self.config.audio.file) {
            ctx.report(99.5, "muxing audio");
            let duration = plan.total_frames as f64 / f64::from(settings.frame_rate);
            if let Err(e) = self.mux_audio(provider, track, output, duration) {
                tracing::warn!(error = %e, "audio mux failed, keeping silent video");
            }
        }

        self.checkpoints.delete(output);
        ctx.report(100.0, "completed");
        Ok(JobOutcome::Completed)
    }

    fn render(
        &self,
        writer: &mut FrameWriter<'_>,
        images: &[(PathBuf, Frame)],
        plan: &TimingPlan,
        start_image: usize,
        resumed: bool,
        width: u32,
        height: u32,
    ) -> SlidecastResult<WriteStatus> {
        let settings = &self.config.settings;
        let title_enabled = self.title_enabled();

        let mut prev: Option<Frame> = if resumed {
            if start_image > 0 {
                let (path, raw) = &images[start_image - 1];
                Some(self.compose_image(path, raw, width, height)?)
            } else if title_enabled {
                Some(self.title_frame(width, height)?)
            } else {
                None
            }
        } else if title_enabled {
            let title = self.title_frame(width, height)?;
            for _ in 0..plan.title_frames {
                match writer.write(&title, 0, IMAGE_CHECKPOINT_EVERY)? {
                    WriteStatus::Written => {}
                    other => return Ok(other),
                }
            }
            Some(title)
        } else {
            None
        };

        for (idx, (path, raw)) in images.iter().enumerate().skip(start_image) {
            let current = self.compose_image(path, raw, width, height)?;

            if let Some(prev_frame) = &prev {
                let transition = self.transition_for_boundary(idx);
                for f in 0..plan.transition_frames {
                    let p = (f + 1) as f64 / plan.transition_frames as f64;
                    let frame = transition.apply(prev_frame, &current, p);
                    match writer.write(&frame, idx, TRANSITION_CHECKPOINT_EVERY)? {
                        WriteStatus::Written => {}
                        other => return Ok(other),
                    }
                }
            }

            let direction = KenBurnsDirection::for_image_index(idx);
            for f in 0..plan.frames_per_image {
                let frame = if settings.ken_burns_enabled {
                    let p = f as f64 / plan.frames_per_image.saturating_sub(1).max(1) as f64;
                    ken_burns(&current, direction, p, settings.ken_burns_intensity)
                } else {
                    current.clone()
                };
                match writer.write(&frame, idx, IMAGE_CHECKPOINT_EVERY)? {
                    WriteStatus::Written => {}
                    other => return Ok(other),
                }
            }
            prev = Some(current);
        }
        Ok(WriteStatus::Written)
    }

    /// Each image is decoded once here; `compose_image` reuses the decoded
    /// frame for every segment that needs it, including resume rewinds.
    fn load_images(&self) -> Vec<(PathBuf, Frame)> {
        self.images
            .iter()
            .filter_map(|path| match self.source.read(path) {
                Ok(frame) => Some((path.clone(), frame)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable image");
                    None
                }
            })
            .collect()
    }

    fn compose_image(
        &self,
        path: &Path,
        raw: &Frame,
        width: u32,
        height: u32,
    ) -> SlidecastResult<Frame> {
        let settings = &self.config.settings;

        let mut frame = aspect_fit(raw, settings.aspect_ratio(), Some(width));
        if frame.width() != width || frame.height() != height {
            frame = frame.resized(width, height);
        }

        frame = self.config.effects.color.apply(&frame);
        if self.config.effects.vignette {
            frame = vignette(&frame, self.config.effects.vignette_intensity);
        }

        if self.config.text.captions_enabled {
            if let Some(rasterizer) = self.rasterizer {
                let caption = caption_text(path);
                let (color, _) = parse_hex_color(&self.config.text.caption_color)?;
                let (bg, bg_alpha) = parse_hex_color(&self.config.text.caption_bg_color)?;
                frame = add_caption(
                    &frame,
                    &caption,
                    rasterizer,
                    self.config.text.caption_font_size,
                    color,
                    bg,
                    bg_alpha,
                    self.config.text.caption_position,
                );
            }
        }
        Ok(frame)
    }

    fn title_frame(&self, width: u32, height: u32) -> SlidecastResult<Frame> {
        let text = &self.config.text;
        let rasterizer = self
            .rasterizer
            .ok_or_else(|| SlidecastError::validation("title requested without a font"))?;
        let (color, _) = parse_hex_color(&text.title_color)?;
        // The background alpha is accepted in config but the card renders
        // opaque, nothing sits behind it.
        let (bg, _) = parse_hex_color(&text.title_bg_color)?;
        Ok(title_screen(
            width,
            height,
            &text.title_text,
            text.title_font_size,
            color,
            bg,
            rasterizer,
        ))
    }

    fn title_enabled(&self) -> bool {
        self.config.text.title_enabled() && self.rasterizer.is_some()
    }

    /// Boundary transitions are drawn from a per-boundary RNG seeded off
    /// the job seed, so a resumed run picks the same transitions as a
    /// fresh one.
    fn transition_for_boundary(&self, image_index: usize) -> Transition {
        match self.config.settings.transition_select() {
            TransitionSelect::Fixed(t) => t,
            TransitionSelect::Random => {
                let seed = self
                    .config
                    .settings
                    .seed
                    .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    .wrapping_add(image_index as u64);
                Transition::random(&mut rand::rngs::StdRng::seed_from_u64(seed))
            }
        }
    }

    fn mux_audio(
        &self,
        provider: &dyn AudioProvider,
        track: &Path,
        output: &Path,
        target_duration_secs: f64,
    ) -> SlidecastResult<()> {
        let audio_cfg = &self.config.audio;
        let prepared = provider.prepare(
            track,
            target_duration_secs,
            audio_cfg.volume,
            audio_cfg.fade_in,
            audio_cfg.fade_out,
            audio_cfg.loop_audio,
        )?;

        let muxed = temp_mux_path(output);
        let result = provider
            .mux(output, prepared.path(), &muxed)
            .and_then(|()| replace_file(&muxed, output));
        if result.is_err() {
            // A failed encode can leave a partial mux output behind.
            remove_temp(&muxed);
        }
        result
    }
}

/// Caption from the file stem: a leading ordering prefix like `01_` is
/// stripped and remaining underscores become spaces.
fn caption_text(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let trimmed = stem
        .split_once('_')
        .filter(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, rest)| rest.to_string())
        .unwrap_or(stem);
    trimmed.replace('_', " ")
}

fn temp_render_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".temp.mp4");
    PathBuf::from(name)
}

fn temp_mux_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".audio_temp.mp4");
    PathBuf::from(name)
}

fn remove_temp(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

fn replace_file(from: &Path, to: &Path) -> SlidecastResult<()> {
    use anyhow::Context as _;
    // Non-file sinks (in-memory captures) leave nothing to move.
    if !from.exists() {
        return Ok(());
    }
    std::fs::rename(from, to)
        .with_context(|| format!("failed to move '{}' into '{}'", from.display(), to.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Checkpoint;
    use std::{
        collections::HashMap,
        sync::{atomic::AtomicUsize, Mutex},
    };

    struct MemSource {
        frames: HashMap<PathBuf, Frame>,
    }

    impl MemSource {
        fn solid(colors: &[(&str, [u8; 3])], w: u32, h: u32) -> (Self, Vec<PathBuf>) {
            let mut frames = HashMap::new();
            let mut paths = Vec::new();
            for (name, rgb) in colors {
                let path = PathBuf::from(name);
                frames.insert(path.clone(), Frame::filled(w, h, *rgb));
                paths.push(path);
            }
            (Self { frames }, paths)
        }
    }

    impl ImageSource for MemSource {
        fn read(&self, path: &Path) -> SlidecastResult<Frame> {
            self.frames.get(path).cloned().ok_or_else(|| {
                SlidecastError::unreadable_image(path.display().to_string(), "not in memory")
            })
        }
    }

    #[derive(Default)]
    struct MemSinkState {
        frames: Vec<Frame>,
        finished: bool,
    }

    struct MemSink {
        state: Arc<Mutex<MemSinkState>>,
    }

    impl FrameSink for MemSink {
        fn write(&mut self, frame: &Frame) -> SlidecastResult<()> {
            self.state.lock().unwrap().frames.push(frame.clone());
            Ok(())
        }

        fn finish(&mut self) -> SlidecastResult<()> {
            self.state.lock().unwrap().finished = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemSinkFactory {
        state: Arc<Mutex<MemSinkState>>,
    }

    impl SinkFactory for MemSinkFactory {
        fn open(
            &self,
            _path: &Path,
            _width: u32,
            _height: u32,
            _fps: u32,
        ) -> SlidecastResult<Box<dyn FrameSink>> {
            Ok(Box::new(MemSink {
                state: Arc::clone(&self.state),
            }))
        }
    }

    #[derive(Default)]
    struct MemStore {
        saved: Mutex<HashMap<PathBuf, Checkpoint>>,
    }

    impl CheckpointStore for MemStore {
        fn load(&self, output: &Path) -> Option<Checkpoint> {
            self.saved.lock().unwrap().get(output).cloned()
        }

        fn save(&self, output: &Path, checkpoint: &Checkpoint) -> SlidecastResult<()> {
            self.saved
                .lock()
                .unwrap()
                .insert(output.to_path_buf(), checkpoint.clone());
            Ok(())
        }

        fn delete(&self, output: &Path) {
            self.saved.lock().unwrap().remove(output);
        }
    }

    fn base_config() -> SlideshowConfig {
        let mut cfg = SlideshowConfig::default();
        cfg.settings.output_file = PathBuf::from("mem://out.mp4");
        cfg.settings.output_width = 64;
        cfg.settings.output_aspect_ratio = "16:9".to_string();
        cfg.settings.video_duration = 5.0;
        cfg.settings.frame_rate = 10;
        cfg.settings.transition_duration = 1.0;
        cfg.settings.transition_type = "fade".to_string();
        cfg
    }

    fn job<'a>(
        cfg: &'a SlideshowConfig,
        images: Vec<PathBuf>,
        source: &'a MemSource,
        sinks: &'a MemSinkFactory,
        store: &'a MemStore,
    ) -> SlideshowJob<'a> {
        SlideshowJob {
            config: cfg,
            images,
            source,
            sinks,
            audio: None,
            checkpoints: store,
            rasterizer: None,
            config_path: String::new(),
        }
    }

    #[test]
    fn fewer_than_two_readable_images_is_fatal() {
        let cfg = base_config();
        let (source, mut paths) = MemSource::solid(&[("a.png", [255, 0, 0])], 64, 36);
        paths.push(PathBuf::from("missing.png"));
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        let err = job(&cfg, paths, &source, &sinks, &store)
            .run(&JobContext::new())
            .unwrap_err();
        assert!(matches!(err, SlidecastError::InsufficientImages { found: 1 }));
    }

    #[test]
    fn full_run_writes_planned_frames_and_clears_checkpoint() {
        let cfg = base_config();
        let (source, paths) = MemSource::solid(
            &[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0]), ("c.png", [0, 0, 255])],
            64,
            36,
        );
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        let outcome = job(&cfg, paths, &source, &sinks, &store)
            .run(&JobContext::new())
            .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);

        let state = sinks.state.lock().unwrap();
        // (5 - 2*1)/3 = 1s per image at 10 fps: 3*10 stills + 2*10 transitions.
        assert_eq!(state.frames.len(), 50);
        assert!(state.finished);
        assert_eq!(state.frames[0].get(0, 0), [255, 0, 0]);
        assert_eq!(state.frames[49].get(0, 0), [0, 0, 255]);
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn cancellation_stops_early_and_leaves_a_checkpoint() {
        let cfg = base_config();
        let (source, paths) =
            MemSource::solid(&[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0])], 64, 36);
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        let ctx = JobContext::new();
        ctx.cancel_handle().store(true, Ordering::Relaxed);
        let outcome = job(&cfg, paths, &source, &sinks, &store).run(&ctx).unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
        assert_eq!(sinks.state.lock().unwrap().frames.len(), 0);
        assert!(!store.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn stale_checkpoint_is_ignored() {
        let cfg = base_config();
        let (source, paths) =
            MemSource::solid(&[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0])], 64, 36);
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        // Wrong plan: total frames do not match.
        let stale = Checkpoint::new(10, 9999, 1, &cfg.settings.output_file, "");
        store.save(&cfg.settings.output_file, &stale).unwrap();

        job(&cfg, paths, &source, &sinks, &store)
            .run(&JobContext::new())
            .unwrap();
        // Fresh run: first frame is image 0, not image 1.
        assert_eq!(sinks.state.lock().unwrap().frames[0].get(0, 0), [255, 0, 0]);
    }

    #[test]
    fn resume_renders_only_from_the_checkpointed_image() {
        let cfg = base_config();
        let (source, paths) = MemSource::solid(
            &[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0]), ("c.png", [0, 0, 255])],
            64,
            36,
        );
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        // Consistent checkpoint pointing at the last image.
        let cp = Checkpoint::new(45, 50, 2, &cfg.settings.output_file, "");
        store.save(&cfg.settings.output_file, &cp).unwrap();

        let outcome = job(&cfg, paths, &source, &sinks, &store)
            .run(&JobContext::new())
            .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);

        let state = sinks.state.lock().unwrap();
        // Segment for image 2 starts at frame 30: one transition + one still.
        assert_eq!(state.frames.len(), 20);
        // First resumed frame is early in the fade out of image 1.
        assert!(state.frames[0].get(0, 0)[1] > 200);
        assert_eq!(state.frames[9].get(0, 0), [0, 0, 255]);
        assert_eq!(state.frames[19].get(0, 0), [0, 0, 255]);
    }

    #[test]
    fn resumed_frames_match_the_fresh_run() {
        let mut cfg = base_config();
        cfg.settings.transition_type = "random".to_string();
        cfg.settings.seed = 11;
        let (source, paths) = MemSource::solid(
            &[("a.png", [200, 10, 10]), ("b.png", [10, 200, 10]), ("c.png", [10, 10, 200])],
            64,
            36,
        );
        let store = MemStore::default();

        let fresh_sinks = MemSinkFactory::default();
        job(&cfg, paths.clone(), &source, &fresh_sinks, &store)
            .run(&JobContext::new())
            .unwrap();
        let fresh = fresh_sinks.state.lock().unwrap().frames.clone();

        let cp = Checkpoint::new(35, 50, 1, &cfg.settings.output_file, "");
        store.save(&cfg.settings.output_file, &cp).unwrap();
        let resumed_sinks = MemSinkFactory::default();
        job(&cfg, paths, &source, &resumed_sinks, &store)
            .run(&JobContext::new())
            .unwrap();
        let resumed = resumed_sinks.state.lock().unwrap().frames.clone();

        // Image 1's segment starts at frame 10 of the fresh run.
        assert_eq!(resumed.len(), 40);
        assert_eq!(&fresh[10..], &resumed[..]);
    }

    #[test]
    fn paused_job_writes_nothing_until_unpaused() {
        let cfg = base_config();
        let (source, paths) =
            MemSource::solid(&[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0])], 64, 36);
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();
        let ctx = JobContext::new();
        ctx.pause_handle().store(true, Ordering::Relaxed);

        std::thread::scope(|s| {
            let cfg = &cfg;
            let source = &source;
            let sink_ref = &sinks;
            let store = &store;
            let ctx_ref = &ctx;
            let handle = s.spawn(move || job(cfg, paths, source, sink_ref, store).run(ctx_ref));

            // The first write blocks on the pause flag, so no frame reaches
            // the sink no matter how long we wait.
            for _ in 0..2 {
                std::thread::sleep(std::time::Duration::from_millis(120));
                assert_eq!(sinks.state.lock().unwrap().frames.len(), 0);
            }

            ctx.pause_handle().store(false, Ordering::Relaxed);
            let outcome = handle.join().unwrap().unwrap();
            assert_eq!(outcome, JobOutcome::Completed);
        });

        // Once unpaused the run emits every planned frame, none skipped.
        let state = sinks.state.lock().unwrap();
        assert_eq!(state.frames.len(), 50);
        assert!(state.finished);
    }

    struct CountingSource<'a> {
        inner: &'a MemSource,
        reads: AtomicUsize,
    }

    impl ImageSource for CountingSource<'_> {
        fn read(&self, path: &Path) -> SlidecastResult<Frame> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.read(path)
        }
    }

    #[test]
    fn each_image_is_decoded_exactly_once() {
        let cfg = base_config();
        let (inner, paths) = MemSource::solid(
            &[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0]), ("c.png", [0, 0, 255])],
            64,
            36,
        );
        let source = CountingSource {
            inner: &inner,
            reads: AtomicUsize::new(0),
        };
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        let outcome = SlideshowJob {
            config: &cfg,
            images: paths,
            source: &source,
            sinks: &sinks,
            audio: None,
            checkpoints: &store,
            rasterizer: None,
            config_path: String::new(),
        }
        .run(&JobContext::new())
        .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(source.reads.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn captions_strip_ordering_prefixes_and_underscores() {
        assert_eq!(caption_text(Path::new("photos/01_sunset_beach.jpg")), "sunset beach");
        assert_eq!(caption_text(Path::new("cliff_top.png")), "cliff top");
        assert_eq!(caption_text(Path::new("042.png")), "042");
        assert_eq!(caption_text(Path::new("2024_trip.png")), "trip");
    }

    #[test]
    fn progress_reports_are_monotonic() {
        let cfg = base_config();
        let (source, paths) =
            MemSource::solid(&[("a.png", [255, 0, 0]), ("b.png", [0, 255, 0])], 64, 36);
        let sinks = MemSinkFactory::default();
        let store = MemStore::default();

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink_reports = Arc::clone(&reports);
        let ctx = JobContext::new().with_progress(move |pct, _| {
            sink_reports.lock().unwrap().push(pct);
        });
        job(&cfg, paths, &source, &sinks, &store).run(&ctx).unwrap();

        let reports = reports.lock().unwrap();
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 100.0);
    }
}
