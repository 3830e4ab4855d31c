use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::error::{SlidecastError, SlidecastResult};

/// Temp audio handle; the backing file is removed on drop.
#[derive(Debug)]
pub struct PreparedAudio {
    path: PathBuf,
    cleanup: bool,
}

impl PreparedAudio {
    pub fn temp(path: PathBuf) -> Self {
        Self { path, cleanup: true }
    }

    /// Wrap an existing file without taking ownership of it.
    pub fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            cleanup: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreparedAudio {
    fn drop(&mut self) {
        if self.cleanup {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Audio conditioning and muxing. The default shells out to ffmpeg; tests
/// use a stub that records calls.
pub trait AudioProvider {
    /// Produce an audio stream trimmed or looped to `target_duration_secs`,
    /// with gain and fade envelopes applied.
    fn prepare(
        &self,
        source: &Path,
        target_duration_secs: f64,
        volume: f64,
        fade_in_secs: f64,
        fade_out_secs: f64,
        loop_audio: bool,
    ) -> SlidecastResult<PreparedAudio>;

    /// Combine a finished video with a prepared audio stream into `output`.
    /// The video stream is copied, not re-encoded.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> SlidecastResult<()>;
}

pub struct FfmpegAudio;

impl FfmpegAudio {
    fn temp_wav() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("slidecast_audio_{}_{}.wav", std::process::id(), nanos))
    }

    fn run(mut cmd: Command, what: &str) -> SlidecastResult<()> {
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SlidecastError::audio(format!("failed to run ffmpeg for {what}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlidecastError::audio(format!(
                "ffmpeg {what} exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl AudioProvider for FfmpegAudio {
    fn prepare(
        &self,
        source: &Path,
        target_duration_secs: f64,
        volume: f64,
        fade_in_secs: f64,
        fade_out_secs: f64,
        loop_audio: bool,
    ) -> SlidecastResult<PreparedAudio> {
        if !source.is_file() {
            return Err(SlidecastError::audio(format!(
                "audio file '{}' does not exist",
                source.display()
            )));
        }

        let mut filters = vec![format!("volume={volume}")];
        if fade_in_secs > 0.0 {
            filters.push(format!("afade=t=in:st=0:d={fade_in_secs}"));
        }
        if fade_out_secs > 0.0 {
            let start = (target_duration_secs - fade_out_secs).max(0.0);
            filters.push(format!("afade=t=out:st={start}:d={fade_out_secs}"));
        }

        let out = Self::temp_wav();
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y").args(["-loglevel", "error"]);
        if loop_audio {
            // Loop indefinitely on input; -t below trims to length.
            cmd.args(["-stream_loop", "-1"]);
        }
        cmd.arg("-i")
            .arg(source)
            .args(["-t", &target_duration_secs.to_string()])
            .args(["-af", &filters.join(",")])
            .arg(&out);

        Self::run(cmd, "audio preparation")?;
        Ok(PreparedAudio::temp(out))
    }

    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> SlidecastResult<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-c:a", "aac", "-shortest"])
            .arg(output);
        Self::run(cmd, "audio mux")
    }
}
