//! EPUB Canonical Fragment Identifiers
//!
//! Parses CFI text into a structured address, serializes it back, and
//! provides the address algebra used when walking publications: appending
//! across document boundaries, extracting sub-paths, building ranges and
//! comparing locations in reading order.
//!
//! # Modules
//!
//! - `cfi`: the address value type, parser, serializer and helpers
//! - `config`: settings for the `epubcfi` command-line tool

pub mod cfi;
pub mod config;

pub use cfi::{Cfi, CfiError, Offset, SpatialPoint, Step};
