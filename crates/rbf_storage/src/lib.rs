//! # RBF Storage
//!
//! Storage backend trait and implementations for RBF logs.
//!
//! This crate provides the lowest-level byte-store abstraction the RBF
//! framing layer writes through. Backends are **opaque byte stores** -
//! they do not interpret the data they hold.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (read, append, backfill, flush)
//! - No knowledge of RBF frames, fences, or checksums
//! - `rbf_core` owns all format interpretation
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral logs
//! - [`FileBackend`] - For persistent logs using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use rbf_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let mut buf = [0u8; 11];
//! backend.read_at(offset, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
