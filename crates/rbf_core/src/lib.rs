//! # RBF Core
//!
//! The RBF framing layer: an append-only, self-describing binary log
//! format used as the durability substrate for higher-level stores.
//!
//! ## Frame Format
//!
//! ```text
//! | HeadLen (4) | FrameTag (4) | Payload (N) | Status (S) | TailLen (4) | CRC32C (4) |
//! ```
//!
//! Every frame is preceded and followed by a 4-byte fence magic; a store
//! begins with a Genesis Fence at offset 0. The status fill length `S` is
//! `4 - (N mod 4)`, so frames are always a multiple of 4 bytes long and
//! every frame address is 4-byte aligned. `HeadLen == TailLen ==
//! 16 + N + S`, and the CRC32C covers tag, payload, status and TailLen -
//! everything except the backfilled HeadLen, the CRC itself, and the
//! fences.
//!
//! ## Writing
//!
//! [`Framer`] appends frames either one-shot ([`Framer::append`]) or
//! through a streaming [`FrameBuilder`] that accepts payload bytes
//! incrementally, supports reserving interior regions for later backfill,
//! and computes the CRC as bytes flow rather than buffering the payload.
//! Dropping a builder without committing discards the frame - at zero
//! I/O cost when nothing has reached the backend yet.
//!
//! ## Recovery
//!
//! [`Scanner`] recovers the maximal ordered set of valid frames from an
//! arbitrary byte sequence, newest first, without any external index.
//! Truncation and corruption anywhere in the log cost only the damaged
//! frames; everything else is still found. Integrity failures are never
//! errors - damaged regions are skipped, and [`Scanner::try_read_at`]
//! answers "not found".
//!
//! ## Example
//!
//! ```rust
//! use rbf_core::{Framer, FrameTag, Scanner};
//! use rbf_storage::InMemoryBackend;
//!
//! let mut framer = Framer::new(InMemoryBackend::new(), true).unwrap();
//! framer.append(FrameTag::new(1), b"first record").unwrap();
//! framer.append(FrameTag::new(2), b"second record").unwrap();
//!
//! let backend = framer.into_inner();
//! let scanner = Scanner::new(&backend);
//! let newest = scanner.scan_reverse().next().unwrap();
//! assert_eq!(newest.tag, FrameTag::new(2));
//! assert_eq!(scanner.read_payload(&newest).unwrap(), b"second record");
//! ```
//!
//! Frame payloads and tags are opaque at this layer; record semantics,
//! tombstone reconciliation, and durability ordering all belong to the
//! layers above.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod error;
mod framer;
mod scanner;

pub mod layout;
pub mod types;

pub use checksum::Crc32c;
pub use error::{RbfError, RbfResult};
pub use framer::{FrameBuilder, Framer, Reservation};
pub use scanner::{RbfFrame, ReadAt, ScanReverse, Scanner};
pub use types::{Address64, FrameStatus, FrameTag};
