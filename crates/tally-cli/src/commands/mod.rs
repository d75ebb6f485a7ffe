//! CLI command implementations
//!
//! - `train` - Training pipeline commands (train all or one artifact)
//! - `status` - Artifact slot inspection

pub mod status;
pub mod train;

pub use status::*;
pub use train::*;
