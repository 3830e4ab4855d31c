use std::path::{Path, PathBuf};

use crate::error::SlidecastResult;

pub const CHECKPOINT_VERSION: u32 = 1;

/// Persisted render progress, written periodically so an interrupted job
/// can resume instead of starting over. A checkpoint is only honored when
/// it matches the current plan; anything stale is discarded.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub frame_count: u64,
    pub total_frames: u64,
    pub image_index: usize,
    pub output_file: String,
    pub config_path: String,
    pub timestamp_unix_secs: u64,
}

impl Checkpoint {
    pub fn new(
        frame_count: u64,
        total_frames: u64,
        image_index: usize,
        output_file: &Path,
        config_path: &str,
    ) -> Self {
        let timestamp_unix_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: CHECKPOINT_VERSION,
            frame_count,
            total_frames,
            image_index,
            output_file: output_file.display().to_string(),
            config_path: config_path.to_string(),
            timestamp_unix_secs,
        }
    }

    /// Whether this checkpoint can seed a resume of a job planned for
    /// `total_frames` over `num_images` inputs.
    pub fn is_consistent(&self, total_frames: u64, num_images: usize) -> bool {
        self.version == CHECKPOINT_VERSION
            && self.total_frames == total_frames
            && self.frame_count <= total_frames
            && self.image_index < num_images
    }
}

/// Checkpoint persistence, keyed by the job's output path. The default
/// stores JSON next to the output file; tests swap in an in-memory store.
pub trait CheckpointStore {
    fn load(&self, output: &Path) -> Option<Checkpoint>;
    fn save(&self, output: &Path, checkpoint: &Checkpoint) -> SlidecastResult<()>;
    fn delete(&self, output: &Path);
}

/// JSON file store at `<output>.state.json`. Saves go through a temp file
/// and rename so a crash never leaves a half-written checkpoint.
pub struct JsonCheckpointStore;

impl JsonCheckpointStore {
    pub fn state_path(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_os_string();
        name.push(".state.json");
        PathBuf::from(name)
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self, output: &Path) -> Option<Checkpoint> {
        let path = Self::state_path(output);
        let data = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(cp) => Some(cp),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt checkpoint");
                None
            }
        }
    }

    fn save(&self, output: &Path, checkpoint: &Checkpoint) -> SlidecastResult<()> {
        use anyhow::Context as _;

        let path = Self::state_path(output);
        let json = serde_json::to_string_pretty(checkpoint)
            .context("failed to serialize checkpoint")?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write checkpoint '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move checkpoint into '{}'", path.display()))?;
        Ok(())
    }

    fn delete(&self, output: &Path) {
        let path = Self::state_path(output);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove checkpoint");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_output(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("slidecast_cp_{}_{}.mp4", tag, std::process::id()))
    }

    #[test]
    fn consistency_requires_matching_plan() {
        let cp = Checkpoint::new(100, 500, 2, Path::new("out.mp4"), "cfg.json");
        assert!(cp.is_consistent(500, 5));
        assert!(!cp.is_consistent(400, 5));
        assert!(!cp.is_consistent(500, 2));

        let mut over = cp.clone();
        over.frame_count = 501;
        assert!(!over.is_consistent(500, 5));

        let mut old = cp;
        old.version = 0;
        assert!(!old.is_consistent(500, 5));
    }

    #[test]
    fn save_load_delete_round_trip() {
        let output = temp_output("roundtrip");
        let store = JsonCheckpointStore;
        let cp = Checkpoint::new(42, 500, 1, &output, "cfg.json");

        store.save(&output, &cp).unwrap();
        let loaded = store.load(&output).unwrap();
        assert_eq!(loaded.frame_count, 42);
        assert_eq!(loaded.image_index, 1);

        store.delete(&output);
        assert!(store.load(&output).is_none());
    }

    #[test]
    fn corrupt_checkpoint_loads_as_none() {
        let output = temp_output("corrupt");
        let path = JsonCheckpointStore::state_path(&output);
        std::fs::write(&path, "{not json").unwrap();

        assert!(JsonCheckpointStore.load(&output).is_none());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_checkpoint_loads_as_none() {
        assert!(JsonCheckpointStore.load(Path::new("/nonexistent/out.mp4")).is_none());
    }
}
