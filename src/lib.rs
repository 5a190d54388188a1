//! ZIP archives over a from-scratch DEFLATE codec.
//!
//! The crate has two layers. The `deflate` module implements RFC 1951 in
//! both directions: an LZ77 hash-chain matcher plus Huffman coding on the
//! way in, and a table-driven bit-level decoder on the way out. The `zip`
//! module implements the PKZIP container at the Info-ZIP 2.0 subset level:
//! a validating reader that borrows the caller's buffer and a writer that
//! produces a standalone archive.
//!
//! All entry points are synchronous and operate on caller-provided buffers;
//! there is no file or network I/O and no shared mutable state, so
//! independent operations may run concurrently on distinct buffers.

pub mod bits;
pub mod crc32;
pub mod deflate;
pub mod error;
pub mod huffman;
pub mod zip;

pub use crc32::{crc32, Crc32};
pub use deflate::{deflate, inflate, Inflated};
pub use error::{Error, Result};
pub use zip::{
    max_archive_size, write_archive, Archive, ArchiveWriter, DosDateTime, FileSpec, Member,
    Method,
};
