//! CFI Generator
//!
//! Generates CFIs from document positions and text selections.

use super::address::Cfi;
use super::error::{CfiError, ParseErrorKind, Result};
use super::types::{Offset, Step};

/// Builder for constructing CFIs programmatically
///
/// Offsets and indirection apply to the most recently added step. The first
/// misuse is remembered and reported by [`CfiBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CfiBuilder {
    steps: Vec<Step>,
    error: Option<CfiError>,
}

/// CFI uses 1-based even numbering for elements: index 0 -> /2, index 1 -> /4
fn element_index(index: usize) -> Result<u32> {
    index
        .checked_add(1)
        .and_then(|n| n.checked_mul(2))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| CfiError::invalid(index.to_string(), ParseErrorKind::IndexOverflow))
}

/// Text nodes use odd numbering: index 0 -> /1, index 1 -> /3
fn text_node_index(index: usize) -> Result<u32> {
    index
        .checked_mul(2)
        .and_then(|n| n.checked_add(1))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| CfiError::invalid(index.to_string(), ParseErrorKind::IndexOverflow))
}

impl CfiBuilder {
    /// Create a new CFI builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step, recording the first failure
    fn push(mut self, step: Result<Step>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match step {
            Ok(step) => self.steps.push(step),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Replace the last step, recording the first failure
    fn update_last(mut self, f: impl FnOnce(Step) -> Result<Step>, what: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.steps.pop() {
            Some(step) => match f(step) {
                Ok(step) => self.steps.push(step),
                Err(e) => self.error = Some(e),
            },
            None => {
                self.error = Some(CfiError::invalid(what, ParseErrorKind::DanglingOffset));
            }
        }
        self
    }

    /// Add a step to the package document (/6 is the spine in EPUB 3)
    pub fn package_step(self) -> Self {
        self.push(Ok(Step::new(6)))
    }

    /// Add a spine item step (converts 0-based index to CFI format)
    pub fn spine_item(self, index: usize) -> Self {
        self.push(element_index(index).map(Step::new))
    }

    /// Add a spine item step with ID assertion
    pub fn spine_item_with_id(self, index: usize, id: impl Into<String>) -> Self {
        self.push(element_index(index).map(|i| Step::with_id(i, id)))
    }

    /// Mark the last step as entering the referenced content document
    pub fn indirection(self) -> Self {
        self.update_last(Step::into_indirector, "!")
    }

    /// Add an element step within the content document (0-based)
    pub fn element(self, index: usize) -> Self {
        self.push(element_index(index).map(Step::new))
    }

    /// Add an element step with raw CFI index (for when you have the actual CFI value)
    pub fn element_raw(self, cfi_index: u32) -> Self {
        self.push(Ok(Step::new(cfi_index)))
    }

    /// Add an element step with ID assertion
    pub fn element_with_id(self, index: usize, id: impl Into<String>) -> Self {
        self.push(element_index(index).map(|i| Step::with_id(i, id)))
    }

    /// Add a text node step (odd numbers for text nodes)
    pub fn text_node(self, index: usize) -> Self {
        self.push(text_node_index(index).map(Step::new))
    }

    /// Set the character offset of the last step
    pub fn character_offset(self, offset: u32) -> Self {
        self.offset(Offset::character(offset))
    }

    /// Set the character offset with a text assertion for validation
    pub fn character_offset_with_text(self, offset: u32, text: impl Into<String>) -> Self {
        self.offset(Offset::character_with_text(offset, text))
    }

    /// Set a temporal offset (for audio/video)
    pub fn temporal_offset(self, seconds: f64) -> Self {
        self.offset(Offset::temporal(seconds))
    }

    /// Set a spatial offset (for images)
    pub fn spatial_offset(self, x: f64, y: f64) -> Self {
        self.offset(Offset::spatial(x, y))
    }

    /// Set both a temporal and a spatial offset
    pub fn spatio_temporal_offset(self, seconds: f64, x: f64, y: f64) -> Self {
        self.offset(Offset::spatio_temporal(seconds, x, y))
    }

    fn offset(self, offset: Offset) -> Self {
        let what = offset.to_string();
        self.update_last(|step| step.with_offset(offset), &what)
    }

    /// Build the final CFI
    pub fn build(self) -> Result<Cfi> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(Cfi::from_steps(self.steps)),
        }
    }

    /// Get the steps added so far
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Generate a CFI for a position in a spine item
///
/// # Arguments
/// * `spine_index` - 0-based index of the spine item
/// * `element_path` - Path of element indices within the content document
/// * `text_node_index` - Index of the text node within the final element (0-based)
/// * `char_offset` - Character offset within the text node
///
/// # Example
/// ```ignore
/// // CFI for character 42 in the first text node of the first paragraph in chapter 2
/// let cfi = generate_cfi(1, &[0], 0, 42)?;
/// // Returns: epubcfi(/6/4!/2/2/1:42)
/// ```
pub fn generate_cfi(
    spine_index: usize,
    element_path: &[usize],
    text_node_index: usize,
    char_offset: u32,
) -> Result<Cfi> {
    content_path(spine_index, element_path)
        .text_node(text_node_index)
        .character_offset(char_offset)
        .build()
}

/// Package step, spine item, indirection, body, then `element_path`
fn content_path(spine_index: usize, element_path: &[usize]) -> CfiBuilder {
    let builder = CfiBuilder::new()
        .package_step()
        .spine_item(spine_index)
        .indirection()
        .element(0); // body

    element_path
        .iter()
        .fold(builder, |builder, &idx| builder.element(idx))
}

/// Generate a CFI range for a text selection within one spine item
///
/// The shared prefix is the common ancestor of both element paths.
pub fn generate_cfi_range(
    spine_index: usize,
    start_path: &[usize],
    start_text_index: usize,
    start_offset: u32,
    end_path: &[usize],
    end_text_index: usize,
    end_offset: u32,
) -> Result<Cfi> {
    let common_len = start_path
        .iter()
        .zip(end_path.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let base = content_path(spine_index, &start_path[..common_len]).build()?;
    let start = generate_cfi(spine_index, start_path, start_text_index, start_offset)?;
    let end = generate_cfi(spine_index, end_path, end_text_index, end_offset)?;

    Cfi::from_range(&base, &start, &end)
}
