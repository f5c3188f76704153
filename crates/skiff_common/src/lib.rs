//! Shared foundational types used across the Skiff compiler toolchain.
//!
//! This crate provides content hashing for file versions and declaration
//! signatures, project-relative path helpers, and the internal error type
//! used for invariant violations.

#![warn(missing_docs)]

pub mod hash;
pub mod path;
pub mod result;

pub use hash::{ContentHash, ParseHashError};
pub use path::{file_name, join_relative, normalize_path, parent_dir, relative_path};
pub use result::{InternalError, SkiffResult};
