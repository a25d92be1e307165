//! Shared types, errors, and access scoping for Quarry.
//!
//! This crate provides the foundational types used across all Quarry crates.
//! It has no internal Quarry dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`types`]: Documents, chunks, and date windows
//! - [`scope`]: Mandatory per-user access scoping

#![doc = include_str!("../README.md")]

pub mod error;
pub mod scope;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use scope::Scope;
pub use types::{Chunk, DateWindow, Document, DocumentStatus};
