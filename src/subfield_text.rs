//! Free-text encoding and decoding of subfield lists.
//!
//! Cataloging UIs edit a field's subfields as a single line of delimited
//! text, e.g. `$a Title $b Subtitle`. This module converts between that
//! display form and the structured [`Subfield`] list.
//!
//! Decoding is best-effort: a token missing its subfield code (a `$`
//! followed by whitespace or end of input) carries no usable data and is
//! dropped from the result. Dropped tokens are logged at `warn` level so
//! the loss is observable.
//!
//! # Examples
//!
//! ```
//! use mrced::subfield_text::{format_subfields, parse_subfields};
//!
//! let subfields = parse_subfields("$a Title $b Subtitle");
//! assert_eq!(subfields.len(), 2);
//! assert_eq!(format_subfields(&subfields), "$a Title $b Subtitle");
//! ```

use crate::record::Subfield;
use lazy_static::lazy_static;
use regex::Regex;
use smallvec::SmallVec;
use tracing::warn;

lazy_static! {
    static ref TAG_PATTERN: Regex = Regex::new(r"^[0-9A-Za-z]{3}$").unwrap();
}

/// Encode a subfield list as display text.
///
/// Each subfield is rendered as `$<code> <value>`, joined with single
/// spaces. An empty list yields an empty string.
#[must_use]
pub fn format_subfields(subfields: &[Subfield]) -> String {
    subfields
        .iter()
        .map(|sf| {
            if sf.value.is_empty() {
                format!("${}", sf.code)
            } else {
                format!("${} {}", sf.code, sf.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode display text into a subfield list.
///
/// Splits on `$` delimiters. The character immediately following each `$`
/// is the subfield code; the remainder of the token, trimmed, is the
/// value. An empty value is preserved (`"$a"` decodes to code `a` with an
/// empty value). Malformed tokens — a `$` followed by whitespace or
/// nothing, or text before the first `$` — are dropped.
#[must_use]
pub fn parse_subfields(text: &str) -> SmallVec<[Subfield; 4]> {
    let mut subfields = SmallVec::new();

    for (i, token) in text.split('$').enumerate() {
        if i == 0 {
            // Anything before the first delimiter has no code
            if !token.trim().is_empty() {
                warn!(token, "dropping subfield text before first delimiter");
            }
            continue;
        }

        let mut chars = token.chars();
        match chars.next() {
            Some(code) if !code.is_whitespace() => {
                subfields.push(Subfield {
                    code,
                    value: chars.as_str().trim().to_string(),
                });
            }
            _ => {
                warn!(token, "dropping subfield token without code");
            }
        }
    }

    subfields
}

/// Parse a field tag from edit-box text.
///
/// Returns the trimmed tag when it is exactly three alphanumeric
/// characters, `None` otherwise.
#[must_use]
pub fn parse_tag(text: &str) -> Option<String> {
    let trimmed = text.trim();
    TAG_PATTERN.is_match(trimmed).then(|| trimmed.to_string())
}

/// Parse an indicator from edit-box text.
///
/// The first character of the trimmed input is the indicator; empty input
/// means a blank indicator.
#[must_use]
pub fn parse_indicator(text: &str) -> char {
    text.trim().chars().next().unwrap_or(' ')
}
