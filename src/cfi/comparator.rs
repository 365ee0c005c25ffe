//! CFI Comparison and Ordering
//!
//! Implements reading-order comparison for CFIs to enable sorting annotations
//! and determining reading progress order.
//!
//! Reading order looks only at step indices and offsets. ID assertions and
//! indirection markers do not move a location, so two CFIs that differ only
//! there compare `Equal` while still being unequal under `==`. For that
//! reason this is a set of functions rather than an `Ord` impl.

use std::cmp::Ordering;

use super::address::Cfi;
use super::parser::parse;
use super::types::{Offset, Step};

/// Compare two CFIs in reading order
///
/// A range is placed at its start location.
pub fn compare(a: &Cfi, b: &Cfi) -> Ordering {
    compare_steps(&a.start(), &b.start())
}

fn compare_steps(a: &Cfi, b: &Cfi) -> Ordering {
    let (a, b) = (a.components(), b.components());
    for (step_a, step_b) in a.iter().zip(b.iter()) {
        let cmp = compare_step(step_a, step_b);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    // If all compared steps are equal, longer path is "greater"
    a.len().cmp(&b.len())
}

fn compare_step(a: &Step, b: &Step) -> Ordering {
    a.index()
        .cmp(&b.index())
        .then_with(|| compare_offsets(a.offset(), b.offset()))
}

fn offset_rank(offset: &Offset) -> u8 {
    match offset {
        Offset::None => 0,
        Offset::Character { .. } => 1,
        Offset::Temporal { .. } => 2,
        Offset::Spatial { .. } => 3,
        Offset::SpatioTemporal { .. } => 4,
    }
}

fn compare_offsets(a: &Offset, b: &Offset) -> Ordering {
    match (a, b) {
        (Offset::Character { offset: x, .. }, Offset::Character { offset: y, .. }) => x.cmp(y),
        (Offset::Temporal { seconds: x }, Offset::Temporal { seconds: y }) => x.total_cmp(y),
        (Offset::Spatial { point: x }, Offset::Spatial { point: y }) => x.cmp(y),
        (
            Offset::SpatioTemporal {
                seconds: sx,
                point: px,
            },
            Offset::SpatioTemporal {
                seconds: sy,
                point: py,
            },
        ) => sx.total_cmp(sy).then_with(|| px.cmp(py)),
        _ => offset_rank(a).cmp(&offset_rank(b)),
    }
}

/// Determine if CFI `a` comes before CFI `b` in reading order
pub fn is_before(a: &Cfi, b: &Cfi) -> bool {
    compare(a, b) == Ordering::Less
}

/// Determine if CFI `a` comes after CFI `b` in reading order
pub fn is_after(a: &Cfi, b: &Cfi) -> bool {
    compare(a, b) == Ordering::Greater
}

/// Check if a CFI falls within `start..=end`
pub fn is_in_range(cfi: &Cfi, start: &Cfi, end: &Cfi) -> bool {
    compare(cfi, start) != Ordering::Less && compare(cfi, end) != Ordering::Greater
}

/// Check if a CFI falls within the span of a ranged CFI
///
/// A single-path `range` contains only locations equal to it in reading order.
pub fn is_in_span(cfi: &Cfi, range: &Cfi) -> bool {
    is_in_range(cfi, &range.start(), &range.end())
}

/// Compare two CFI strings, returning their ordering
/// Returns None if either CFI is invalid
pub fn compare_cfi_strings(a: &str, b: &str) -> Option<Ordering> {
    let cfi_a = parse(a).ok()?;
    let cfi_b = parse(b).ok()?;
    Some(compare(&cfi_a, &cfi_b))
}
