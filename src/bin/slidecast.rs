use std::path::PathBuf;

use clap::{Parser, Subcommand};

use slidecast::{
    audio::FfmpegAudio,
    config::SlideshowConfig,
    frame::{list_image_files, DiskImageSource},
    job::{JobContext, JobOutcome, SlideshowJob},
    sink::FfmpegSinkFactory,
    text::FontdueRasterizer,
    transitions::ALL_TRANSITIONS,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a slideshow MP4 from a folder of images (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// List the available transition names.
    Transitions,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Folder containing the input images.
    folder: PathBuf,

    /// Configuration JSON; command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output MP4 path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Target video duration in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Audio track to mux under the video.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Opening title text.
    #[arg(long)]
    title: Option<String>,

    /// Overlay each image's filename as a caption.
    #[arg(long)]
    captions: bool,

    /// Transition name, legacy numeric id, or "random".
    #[arg(long)]
    transition: Option<String>,

    /// Pan/zoom over each image instead of holding it still.
    #[arg(long)]
    ken_burns: bool,

    /// Output aspect ratio, e.g. "16:9".
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Color effect: none, warm, cold, vintage, or bw.
    #[arg(long)]
    color_effect: Option<String>,

    /// Seed for random transition selection.
    #[arg(long)]
    seed: Option<u64>,

    /// Font file for title and caption text.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Transitions => {
            for t in ALL_TRANSITIONS {
                println!("{}", t.name());
            }
            Ok(())
        }
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut config = match &args.config {
        Some(path) => SlideshowConfig::load(path)?,
        None => SlideshowConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    let images = list_image_files(&args.folder)?;
    tracing::info!(folder = %args.folder.display(), count = images.len(), "found images");

    let rasterizer = load_rasterizer(&config)?;

    let job = SlideshowJob {
        config: &config,
        images,
        source: &DiskImageSource,
        sinks: &FfmpegSinkFactory,
        audio: Some(&FfmpegAudio),
        checkpoints: &slidecast::JsonCheckpointStore,
        rasterizer: rasterizer
            .as_ref()
            .map(|r| r as &dyn slidecast::text::TextRasterizer),
        config_path,
    };

    // An interrupted run is not lost: checkpoints are written periodically
    // and the next invocation resumes from the last one.
    let ctx = JobContext::new().with_progress(|pct, phase| {
        tracing::info!(percent = f64::from(pct), phase, "progress");
    });

    match job.run(&ctx)? {
        JobOutcome::Completed => {
            eprintln!("wrote {}", config.settings.output_file.display());
        }
        JobOutcome::Cancelled => {
            eprintln!("cancelled, run again to resume");
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut SlideshowConfig, args: &RenderArgs) -> anyhow::Result<()> {
    if let Some(out) = &args.out {
        config.settings.output_file = out.clone();
    }
    if let Some(duration) = args.duration {
        config.settings.video_duration = duration;
    }
    if let Some(audio) = &args.audio {
        config.audio.file = Some(audio.clone());
    }
    if let Some(title) = &args.title {
        config.text.title_text = title.clone();
    }
    if args.captions {
        config.text.captions_enabled = true;
    }
    if let Some(transition) = &args.transition {
        config.settings.transition_type = transition.clone();
    }
    if args.ken_burns {
        config.settings.ken_burns_enabled = true;
    }
    if let Some(ratio) = &args.aspect_ratio {
        config.settings.output_aspect_ratio = ratio.clone();
    }
    if let Some(effect) = &args.color_effect {
        config.effects.color = serde_json::from_value(serde_json::Value::String(effect.clone()))
            .map_err(|_| anyhow::anyhow!("unknown color effect '{effect}'"))?;
    }
    if let Some(seed) = args.seed {
        config.settings.seed = seed;
    }
    if let Some(font) = &args.font {
        config.text.font_path = Some(font.clone());
    }
    config.validate()?;
    Ok(())
}

/// Text rendering is optional: without a usable font the title and captions
/// are skipped with a warning rather than failing the render.
fn load_rasterizer(config: &SlideshowConfig) -> anyhow::Result<Option<FontdueRasterizer>> {
    let wants_text = !config.text.title_text.is_empty() || config.text.captions_enabled;
    if !wants_text {
        return Ok(None);
    }

    let Some(path) = &config.text.font_path else {
        tracing::warn!("title/captions requested but no font configured, skipping text");
        return Ok(None);
    };
    match FontdueRasterizer::from_file(path) {
        Ok(r) => Ok(Some(r)),
        Err(e) => {
            tracing::warn!(font = %path.display(), error = %e, "failed to load font, skipping text");
            Ok(None)
        }
    }
}
