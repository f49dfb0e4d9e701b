//! File system helpers.
//!
//! - [`atomic`]: temp-file-then-rename writes for small state files
//! - [`paths`]: conversion between on-disk paths and manifest-relative POSIX paths
//! - [`retry`]: delete and rename that tolerate briefly locked files

pub mod atomic;
pub mod paths;
pub mod retry;

pub use atomic::{atomic_write, atomic_write_async, ensure_dir};
pub use paths::{is_safe_relative, join_relative, to_posix_relative};
pub use retry::{remove_file_with_retry, rename_with_retry};
