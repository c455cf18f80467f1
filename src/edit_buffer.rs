//! Pending-edit state for fields under modification.
//!
//! While the user types, proposed changes accumulate here as
//! [`FieldPatch`] entries keyed by the field's current index in the cached
//! list. Nothing is validated beyond presence — a patch is whatever the
//! edit boxes currently hold.
//!
//! Because the backend re-sorts fields after every write, an index-keyed
//! entry is only meaningful against the exact field list it was created
//! for. Every successful save or delete therefore calls [`EditBuffer::clear_all`];
//! selectively keeping entries would silently attach edits to the wrong
//! fields.

use crate::record::{Field, Subfield};
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Partial changes to one field.
///
/// Unset members mean "unchanged"; [`FieldPatch::materialize`] fills them
/// from the currently displayed field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    /// Proposed new tag, if edited.
    pub tag: Option<String>,
    /// Proposed first indicator, if edited.
    pub indicator1: Option<char>,
    /// Proposed second indicator, if edited.
    pub indicator2: Option<char>,
    /// Proposed replacement subfield list, if edited.
    pub subfields: Option<SmallVec<[Subfield; 4]>>,
}

impl FieldPatch {
    /// A patch with nothing set.
    #[must_use]
    pub fn new() -> Self {
        FieldPatch::default()
    }

    /// True when nothing has been edited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.indicator1.is_none()
            && self.indicator2.is_none()
            && self.subfields.is_none()
    }

    /// Overlay `other` on this patch. Members set in `other` win.
    pub fn merge(&mut self, other: FieldPatch) {
        if other.tag.is_some() {
            self.tag = other.tag;
        }
        if other.indicator1.is_some() {
            self.indicator1 = other.indicator1;
        }
        if other.indicator2.is_some() {
            self.indicator2 = other.indicator2;
        }
        if other.subfields.is_some() {
            self.subfields = other.subfields;
        }
    }

    /// Produce the full field this patch describes, falling back to `base`
    /// for anything not edited.
    #[must_use]
    pub fn materialize(&self, base: &Field) -> Field {
        let mut field = Field::new(
            self.tag.clone().unwrap_or_else(|| base.tag.clone()),
            self.indicator1.unwrap_or(base.indicator1),
            self.indicator2.unwrap_or(base.indicator2),
        );
        field.set_subfields(
            self.subfields
                .clone()
                .unwrap_or_else(|| base.subfields.clone()),
        );
        field
    }
}

/// Pending edits for one record, keyed by field index.
#[derive(Debug, Default)]
pub struct EditBuffer {
    entries: IndexMap<usize, FieldPatch>,
}

impl EditBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        EditBuffer::default()
    }

    /// Merge `patch` into the entry for `index`, creating it if absent.
    pub fn set_pending(&mut self, index: usize, patch: FieldPatch) {
        self.entries.entry(index).or_default().merge(patch);
    }

    /// The pending patch for `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FieldPatch> {
        self.entries.get(&index)
    }

    /// Remove and return the entry for `index`.
    pub fn remove(&mut self, index: usize) -> Option<FieldPatch> {
        self.entries.shift_remove(&index)
    }

    /// Drop every entry. Called after any successful mutation, since
    /// server-side reordering invalidates all index keys at once.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Number of fields with pending edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no edits are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
