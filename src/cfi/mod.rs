//! CFI (Canonical Fragment Identifier) module for EPUB
//!
//! This module provides parsing, serialization, composition and comparison
//! of EPUB CFI strings.
//!
//! # Overview
//!
//! EPUB CFI is a standardized way to reference specific locations within EPUB publications.
//! It uses a path-based syntax similar to XPath but designed specifically for EPUBs.
//!
//! # Example CFI
//!
//! ```text
//! epubcfi(/6/4[chapter1]!/4/2/1:42)
//!         │  │          │ │ │ │ └── character offset 42
//!         │  │          │ │ │ └──── text node (odd = text)
//!         │  │          │ │ └────── element index
//!         │  │          │ └──────── element index (body)
//!         │  │          └────────── indirection (into content doc)
//!         │  └───────────────────── spine item with ID
//!         └──────────────────────── spine element
//! ```
//!
//! A range shares a prefix and splits into two suffixes:
//! `epubcfi(/6/4!/4/10,/2/1:1,/3:4)`.
//!
//! # Usage
//!
//! ```
//! use epubcfi::cfi::{is_before, Cfi};
//!
//! let mut cfi: Cfi = "epubcfi(/6/4[chap01]!)".parse().unwrap();
//! cfi.append_str("/4/2/1:42").unwrap();
//! assert_eq!(cfi.to_string(), "epubcfi(/6/4[chap01]!/4/2/1:42)");
//!
//! let inner = cfi.sub_cfi(2);
//! assert_eq!(inner, "/4/2/1:42");
//!
//! let a: Cfi = "epubcfi(/6/4!/4/2/1:10)".parse().unwrap();
//! let b: Cfi = "epubcfi(/6/4!/4/2/1:20)".parse().unwrap();
//! assert!(is_before(&a, &b));
//! ```

mod address;
mod comparator;
mod error;
mod generator;
mod parser;
mod types;

// Re-export main types
pub use address::Cfi;
pub use types::{Offset, SpatialPoint, Step};

// Re-export errors
pub use error::{CfiError, CompositionError, ParseErrorKind, Result};

// Re-export parser functions
pub use parser::{parse, try_parse};

// Re-export generator
pub use generator::{generate_cfi, generate_cfi_range, CfiBuilder};

// Re-export comparator functions
pub use comparator::{compare, compare_cfi_strings, is_after, is_before, is_in_range, is_in_span};
