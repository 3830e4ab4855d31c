use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    error::{SlidecastError, SlidecastResult},
    frame::Frame,
};

/// Destination for rendered frames, written in presentation order. `finish`
/// must be called exactly once after the last frame.
pub trait FrameSink {
    fn write(&mut self, frame: &Frame) -> SlidecastResult<()>;
    fn finish(&mut self) -> SlidecastResult<()>;
}

/// Opens sinks for the job. Abstracted so tests can capture frames in
/// memory instead of spawning an encoder.
pub trait SinkFactory {
    fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> SlidecastResult<Box<dyn FrameSink>>;
}

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(SlidecastError::validation("encode fps must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // We target yuv420p output for maximum player compatibility.
            return Err(SlidecastError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// MP4 sink backed by a system `ffmpeg` process fed raw rgb24 frames over
/// stdin. The system binary is used rather than `ffmpeg-next` to avoid
/// native FFmpeg dev header/lib requirements.
pub struct FfmpegSink {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl FfmpegSink {
    pub fn open(cfg: EncodeConfig) -> SlidecastResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::sink(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg("-y")
            .args([
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", cfg.width, cfg.height),
                "-r",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::sink(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::sink("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            cfg,
            child,
            stdin: Some(stdin),
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write(&mut self, frame: &Frame) -> SlidecastResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(SlidecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::sink("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin
            .write_all(frame.data())
            .map_err(|e| SlidecastError::sink(format!("failed to write frame to ffmpeg stdin: {e}")))?;
        Ok(())
    }

    fn finish(&mut self) -> SlidecastResult<()> {
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| SlidecastError::sink(format!("failed to wait for ffmpeg to finish: {e}")))?;

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = self.child.stderr.take() {
                use std::io::Read as _;
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(SlidecastError::sink(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

pub struct FfmpegSinkFactory;

impl SinkFactory for FfmpegSinkFactory {
    fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> SlidecastResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::open(EncodeConfig {
            width,
            height,
            fps,
            out_path: path.to_path_buf(),
        })?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        let base = EncodeConfig {
            width: 640,
            height: 360,
            fps: 25,
            out_path: PathBuf::from("out.mp4"),
        };
        assert!(base.validate().is_ok());

        assert!(EncodeConfig { width: 0, ..base.clone() }.validate().is_err());
        assert!(EncodeConfig { height: 0, ..base.clone() }.validate().is_err());
        assert!(EncodeConfig { fps: 0, ..base.clone() }.validate().is_err());
        assert!(EncodeConfig { width: 641, ..base.clone() }.validate().is_err());
        assert!(EncodeConfig { height: 361, ..base }.validate().is_err());
    }
}
