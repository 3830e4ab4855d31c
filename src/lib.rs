#![forbid(unsafe_code)]

pub mod audio;
pub mod checkpoint;
pub mod config;
pub mod effects;
pub mod error;
pub mod frame;
pub mod job;
pub mod sink;
pub mod text;
pub mod timing;
pub mod transitions;

pub use checkpoint::{Checkpoint, CheckpointStore, JsonCheckpointStore};
pub use config::{SlideshowConfig, TransitionSelect};
pub use error::{SlidecastError, SlidecastResult};
pub use frame::{DiskImageSource, Frame, ImageSource};
pub use job::{JobContext, JobOutcome, SlideshowJob};
pub use sink::{FrameSink, SinkFactory};
pub use timing::TimingPlan;
pub use transitions::{Transition, ALL_TRANSITIONS};
