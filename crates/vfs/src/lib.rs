//! Filesystem abstraction and remote bind points
//!
//! This crate provides the filesystem handle the application works through:
//! the local disk by default, or a composite that mounts rclone remotes onto
//! local paths.

pub mod bind;
pub mod local;
pub mod remote;
pub mod traits;

pub use bind::*;
pub use local::LocalFs;
pub use remote::{RcloneDriver, RcloneFs};
pub use traits::*;
