//! HTTP client for the catalog backend.
//!
//! [`CatalogClient`] wraps the four record-editing endpoints the backend
//! exposes, attaching the session's bearer token to every request:
//!
//! - `GET /catalog/sudoc/{id}` — ordered field array
//! - `PATCH /catalog/sudoc/{id}/field/{index}` — update one field,
//!   returns the full reordered field array
//! - `DELETE /catalog/sudoc/{id}/field/{index}` — delete one field,
//!   returns the full reordered field array
//! - `POST /catalog/sudoc/{id}/field/add` — create a field, returns it
//!
//! The backend serves subfields in two shapes — sometimes a plain object
//! of `code: value` pairs, sometimes an array of `{code, value}` objects.
//! Both are normalized to the typed [`Field`] representation here, at the
//! boundary, so nothing downstream branches on payload shape.
//!
//! Non-2xx responses are turned into [`EditorError::Api`], carrying the
//! server's own message verbatim when the body provides one.

use crate::error::{EditorError, Result};
use crate::record::Field;
use crate::session::Session;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Client for the catalog record-editing API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl CatalogClient {
    /// Create a client for the backend at `base_url`, authenticating with
    /// the given session.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use mrced::{CatalogClient, Session};
    ///
    /// let session = Arc::new(Session::with_token("t0k3n".to_string()));
    /// let client = CatalogClient::new("https://catalog.example.org", session);
    /// ```
    #[must_use]
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        CatalogClient {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    /// Fetch the ordered field list for a record.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn record_fields(&self, record_id: &str) -> Result<Vec<Field>> {
        let url = format!("{}/catalog/sudoc/{record_id}", self.base_url);
        debug!(record_id, "fetching record fields");

        let response = self.authorize(self.http.get(&url)).send().await?;
        let wire: Vec<WireField> = error_for_status(response).await?.json().await?;
        Ok(wire.into_iter().map(WireField::into_field).collect())
    }

    /// Update the field at `index`, returning the server's full reordered
    /// field list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn update_field(
        &self,
        record_id: &str,
        index: usize,
        field: &Field,
    ) -> Result<Vec<Field>> {
        let url = format!("{}/catalog/sudoc/{record_id}/field/{index}", self.base_url);
        debug!(record_id, index, tag = %field.tag, "updating field");

        let response = self
            .authorize(self.http.patch(&url))
            .json(&FieldPayload::from(field))
            .send()
            .await?;
        let wire: Vec<WireField> = error_for_status(response).await?.json().await?;
        Ok(wire.into_iter().map(WireField::into_field).collect())
    }

    /// Delete the field at `index`, returning the server's full reordered
    /// field list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn delete_field(&self, record_id: &str, index: usize) -> Result<Vec<Field>> {
        let url = format!("{}/catalog/sudoc/{record_id}/field/{index}", self.base_url);
        debug!(record_id, index, "deleting field");

        let response = self.authorize(self.http.delete(&url)).send().await?;
        let wire: Vec<WireField> = error_for_status(response).await?.json().await?;
        Ok(wire.into_iter().map(WireField::into_field).collect())
    }

    /// Create a new field on the record, returning the created field.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn add_field(&self, record_id: &str, field: &Field) -> Result<Field> {
        let url = format!("{}/catalog/sudoc/{record_id}/field/add", self.base_url);
        debug!(record_id, tag = %field.tag, "adding field");

        let response = self
            .authorize(self.http.post(&url))
            .json(&FieldPayload::from(field))
            .send()
            .await?;
        let wire: WireField = error_for_status(response).await?.json().await?;
        Ok(wire.into_field())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EditorError::Api {
        status: status.as_u16(),
        message: error_message(&body, status.as_u16()),
    })
}

/// Extract a human-readable message from an error response body.
///
/// Prefers the conventional JSON keys, falls back to the raw body, then to
/// a generic status line.
fn error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail", "error"] {
            if let Some(msg) = value.get(key).and_then(serde_json::Value::as_str) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Wire representation
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireField {
    tag: String,
    #[serde(default)]
    ind1: Option<String>,
    #[serde(default)]
    ind2: Option<String>,
    #[serde(default)]
    subfields: Option<WireSubfields>,
}

/// Subfields arrive either as an object or as a pair array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSubfields {
    Map(IndexMap<String, String>),
    Pairs(Vec<WirePair>),
}

#[derive(Debug, Deserialize)]
struct WirePair {
    code: String,
    value: String,
}

impl WireField {
    fn into_field(self) -> Field {
        let mut field = Field::new(
            self.tag,
            wire_indicator(self.ind1.as_deref()),
            wire_indicator(self.ind2.as_deref()),
        );
        match self.subfields {
            Some(WireSubfields::Map(map)) => {
                for (code, value) in map {
                    if let Some(code) = code.chars().next() {
                        field.add_subfield(code, value);
                    }
                }
            }
            Some(WireSubfields::Pairs(pairs)) => {
                for pair in pairs {
                    if let Some(code) = pair.code.chars().next() {
                        field.add_subfield(code, pair.value);
                    }
                }
            }
            None => {}
        }
        field
    }
}

fn wire_indicator(value: Option<&str>) -> char {
    value.and_then(|s| s.chars().next()).unwrap_or(' ')
}

/// Mutation payload: `{tag, indicators: [ind1, ind2], subfields: [{code, value}, …]}`.
#[derive(Debug, Serialize)]
struct FieldPayload<'a> {
    tag: &'a str,
    indicators: [char; 2],
    subfields: Vec<PairPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct PairPayload<'a> {
    code: char,
    value: &'a str,
}

impl<'a> From<&'a Field> for FieldPayload<'a> {
    fn from(field: &'a Field) -> Self {
        FieldPayload {
            tag: &field.tag,
            indicators: [field.indicator1, field.indicator2],
            subfields: field
                .subfields()
                .map(|sf| PairPayload {
                    code: sf.code,
                    value: &sf.value,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_subfields_as_object() {
        let wire: WireField = serde_json::from_value(json!({
            "tag": "245",
            "ind1": "1",
            "ind2": "0",
            "subfields": {"a": "Title", "b": "Subtitle"}
        }))
        .unwrap();

        let field = wire.into_field();
        assert_eq!(field.tag, "245");
        assert_eq!(field.indicator1, '1');
        assert_eq!(field.indicator2, '0');
        assert_eq!(field.get_subfield('a'), Some("Title"));
        assert_eq!(field.get_subfield('b'), Some("Subtitle"));
    }

    #[test]
    fn test_wire_subfields_as_pair_array() {
        let wire: WireField = serde_json::from_value(json!({
            "tag": "650",
            "ind1": " ",
            "ind2": "0",
            "subfields": [
                {"code": "a", "value": "Cataloging"},
                {"code": "x", "value": "History"}
            ]
        }))
        .unwrap();

        let field = wire.into_field();
        assert_eq!(field.get_subfield('a'), Some("Cataloging"));
        assert_eq!(field.get_subfield('x'), Some("History"));
    }

    #[test]
    fn test_wire_missing_indicators_default_blank() {
        let wire: WireField = serde_json::from_value(json!({
            "tag": "500",
            "subfields": {"a": "Note"}
        }))
        .unwrap();

        let field = wire.into_field();
        assert_eq!(field.indicator1, ' ');
        assert_eq!(field.indicator2, ' ');
    }

    #[test]
    fn test_field_payload_shape() {
        let field = Field::builder("245".to_string(), '1', '0')
            .subfield_str('a', "Title")
            .build();

        let payload = serde_json::to_value(FieldPayload::from(&field)).unwrap();
        assert_eq!(
            payload,
            json!({
                "tag": "245",
                "indicators": ["1", "0"],
                "subfields": [{"code": "a", "value": "Title"}]
            })
        );
    }

    #[test]
    fn test_error_message_from_json_keys() {
        assert_eq!(
            error_message(r#"{"message": "bad tag"}"#, 422),
            "bad tag"
        );
        assert_eq!(
            error_message(r#"{"detail": "not found"}"#, 404),
            "not found"
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("plain text failure", 500), "plain text failure");
        assert_eq!(error_message("", 502), "HTTP 502");
        assert_eq!(error_message("   ", 503), "HTTP 503");
    }
}
