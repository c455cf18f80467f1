//! MARC field structures for the editor cache.
//!
//! This module provides the core field types the editor works with:
//! - [`Field`] — One variable data field of a bibliographic record
//! - [`Subfield`] — Named data elements within fields
//!
//! A record, as the catalog backend serves it, is an ordered sequence of
//! fields. The editor caches it as a plain `Vec<Field>` and identifies
//! individual fields **positionally** — a field's identity is its index in
//! that list, not a stable ID. The backend re-sorts fields numerically
//! after every write, so indices held across a mutation are meaningless;
//! see [`crate::editor`] for the invalidation rules this forces.
//!
//! # Examples
//!
//! Build a field fluently:
//!
//! ```
//! use mrced::Field;
//!
//! let field = Field::builder("245".to_string(), '1', '0')
//!     .subfield('a', "The Great Gatsby".to_string())
//!     .subfield('c', "F. Scott Fitzgerald".to_string())
//!     .build();
//!
//! assert_eq!(field.get_subfield('a'), Some("The Great Gatsby"));
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A data field in a MARC record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Field {
    /// Create a new data field with no subfields
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        Field {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use mrced::Field;
    ///
    /// let field = Field::builder("650".to_string(), ' ', '0')
    ///     .subfield('a', "Cataloging".to_string())
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder(tag: String, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: Field::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice
    ///
    /// Convenience method that converts &str to String automatically.
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Get all values for a subfield code
    #[must_use]
    pub fn get_subfield_values(&self, code: char) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Iterate over all subfields
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }

    /// Replace the entire subfield list
    pub fn set_subfields(&mut self, subfields: SmallVec<[Subfield; 4]>) {
        self.subfields = subfields;
    }

    /// Get the field's content as a formatted string
    ///
    /// Concatenates all subfield values with spaces, for display in field
    /// listings.
    #[must_use]
    pub fn value(&self) -> String {
        self.subfields
            .iter()
            .map(|sf| sf.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for fluently constructing MARC fields
///
/// # Examples
///
/// ```
/// use mrced::Field;
///
/// let field = Field::builder("245".to_string(), '1', '0')
///     .subfield('a', "Title".to_string())
///     .subfield('b', "Subtitle".to_string())
///     .build();
/// ```
#[derive(Debug)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: String) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Add a subfield using a string slice
    #[must_use]
    pub fn subfield_str(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield_str(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = Field::new("245".to_string(), '1', '0');
        assert_eq!(field.tag, "245");
        assert_eq!(field.indicator1, '1');
        assert_eq!(field.indicator2, '0');
        assert!(field.subfields.is_empty());
    }

    #[test]
    fn test_field_subfields() {
        let mut field = Field::new("245".to_string(), '1', '0');
        field.add_subfield('a', "Title".to_string());
        field.add_subfield('c', "Author".to_string());
        field.add_subfield('a', "Title continued".to_string());

        assert_eq!(field.get_subfield('a'), Some("Title"));
        let a_values = field.get_subfield_values('a');
        assert_eq!(a_values.len(), 2);
    }

    #[test]
    fn test_field_builder() {
        let field = Field::builder("650".to_string(), ' ', '0')
            .subfield_str('a', "Subject")
            .subfield_str('x', "Subdivision")
            .build();

        assert_eq!(field.get_subfield('a'), Some("Subject"));
        assert_eq!(field.get_subfield('x'), Some("Subdivision"));
    }

    #[test]
    fn test_field_value_concatenation() {
        let field = Field::builder("245".to_string(), '1', '0')
            .subfield_str('a', "Title")
            .subfield_str('b', "Subtitle")
            .build();

        assert_eq!(field.value(), "Title Subtitle");
    }

    #[test]
    fn test_set_subfields_replaces() {
        let mut field = Field::builder("245".to_string(), '1', '0')
            .subfield_str('a', "Old")
            .build();

        let mut replacement: SmallVec<[Subfield; 4]> = SmallVec::new();
        replacement.push(Subfield {
            code: 'a',
            value: "New".to_string(),
        });
        field.set_subfields(replacement);

        assert_eq!(field.get_subfield('a'), Some("New"));
        assert_eq!(field.subfields.len(), 1);
    }
}
