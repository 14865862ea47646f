pub mod buffer;
pub mod controller;
pub mod frame;
pub mod loop_worker;

pub use buffer::{Snapshot, SnapshotBuffer, SNAPSHOT_CAPACITY};
pub use controller::CaptureController;
pub use frame::{FrameSource, StillFrameSource};
