pub mod error;
pub mod index;
pub mod layout;
pub mod query;
pub mod render;
pub mod schema;

pub use error::{Result, StoreError};
pub use index::FrameIndex;
pub use layout::{DataDir, default_base_dir};
pub use query::{ExactFetch, FrameStats};
pub use render::{SnapshotRenderer, partition_key};
