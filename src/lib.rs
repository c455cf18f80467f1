#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # MRCED: MARC Rust Catalog EDitor
//!
//! A client library for editing MARC bibliographic records held in a
//! library catalog REST backend, with debounced auto-save.
//!
//! The backend owns the records and re-sorts fields numerically after
//! every write, so a field's only identity on the wire is its position in
//! the record's field list. This crate packages the client-side state
//! machine that makes editing against that contract safe: an edit buffer
//! keyed by field index, an auto-save scheduler that commits after an
//! inactivity window, and commit logic that replaces the whole cached
//! list with server truth and drops every stale buffer entry after each
//! successful mutation.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mrced::{AutoSaveConfig, CatalogClient, EditorEvent, RecordEditor, Session};
//!
//! # async fn run() -> mrced::Result<()> {
//! let session = Arc::new(Session::with_token(token));
//! let client = CatalogClient::new("https://catalog.example.org", session);
//! let (editor, mut events) = RecordEditor::new(client, &AutoSaveConfig::default());
//!
//! editor.load("gd0042").await?;
//! editor.begin_edit(3)?;
//! editor.edit_subfield_text(3, "$a New Title $c Updated Author")?;
//!
//! // Keystrokes debounce; after 4 s of inactivity the field is PATCHed
//! // and the editor re-renders from the server's reordered response.
//! while let Some(event) = events.recv().await {
//!     match event {
//!         EditorEvent::Saved { index } => println!("field {index} saved"),
//!         EditorEvent::SaveFailed { message, .. } => eprintln!("{message}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`] — Field and subfield structures (`Field`, `Subfield`)
//! - [`subfield_text`] — `$a value $b value` display-text codec
//! - [`edit_buffer`] — Pending-edit state keyed by field index
//! - [`autosave`] — Debounce timers and the typing-grace window
//! - [`editor`] — Cache, commit logic, and the event stream
//! - [`client`] — HTTP client for the catalog endpoints
//! - [`session`] — Bearer-token session with explicit login/logout
//! - [`error`] — Error types and result type

pub mod autosave;
pub mod client;
pub mod edit_buffer;
/// The record editor: cached fields, pending edits, and commit logic.
pub mod editor;
pub mod error;
pub mod record;
pub mod session;
pub mod subfield_text;

pub use autosave::{AutoSave, AutoSaveConfig};
pub use client::CatalogClient;
pub use edit_buffer::{EditBuffer, FieldPatch};
pub use editor::{EditorEvent, RecordEditor};
pub use error::{EditorError, Result};
pub use record::{Field, FieldBuilder, Subfield};
pub use session::Session;
pub use subfield_text::{format_subfields, parse_indicator, parse_subfields, parse_tag};
