//! The record editor: cached fields, pending edits, and commit logic.
//!
//! [`RecordEditor`] owns the client-side state for one record at a time:
//! the cached field list (server truth, replaced wholesale after every
//! mutation), the [`EditBuffer`] of pending edits, the per-index in-flight
//! guard, and the [`AutoSave`] scheduler that turns inactivity into
//! commits.
//!
//! The one invariant everything here serves: **field indices are not
//! stable across writes**. The backend re-sorts fields numerically after
//! each save or delete, so the moment any mutation succeeds, every
//! index-keyed buffer entry is invalid — not just the one that was
//! committed. Every success path therefore replaces the whole cached list
//! with the server's response and clears the whole buffer.
//!
//! Outcomes are reported as [`EditorEvent`]s on an unbounded channel so a
//! UI can render toasts and inline errors without polling.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use mrced::{AutoSaveConfig, CatalogClient, RecordEditor, Session};
//!
//! # async fn run() -> mrced::Result<()> {
//! let session = Arc::new(Session::with_token("t0k3n".to_string()));
//! let client = CatalogClient::new("https://catalog.example.org", session);
//! let (editor, mut events) = RecordEditor::new(client, &AutoSaveConfig::default());
//!
//! editor.load("gd0042").await?;
//! editor.begin_edit(3)?;
//! editor.edit_subfield_text(3, "$a New Title")?;
//! // …4 s of inactivity later the PATCH goes out and an
//! // EditorEvent::Saved { index: 3 } arrives on `events`.
//! # Ok(())
//! # }
//! ```

use crate::autosave::{AutoSave, AutoSaveConfig};
use crate::client::CatalogClient;
use crate::edit_buffer::{EditBuffer, FieldPatch};
use crate::error::{EditorError, Result};
use crate::record::Field;
use crate::subfield_text::{parse_indicator, parse_subfields, parse_tag};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Notification of an editor outcome, for rendering toasts and inline
/// error states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A record was fetched and cached.
    Loaded {
        /// The record that was loaded.
        record_id: String,
        /// Number of fields the server returned.
        field_count: usize,
    },
    /// A record fetch failed; the editor degraded to the unloaded state.
    LoadFailed {
        /// The record that failed to load.
        record_id: String,
        /// User-facing failure message.
        message: String,
    },
    /// A field save was accepted and the cache refreshed.
    Saved {
        /// Index the save was issued for (pre-reorder).
        index: usize,
    },
    /// A field save was rejected; pending edits were kept.
    SaveFailed {
        /// Index the save was issued for.
        index: usize,
        /// User-facing failure message.
        message: String,
    },
    /// A field delete was accepted and the cache refreshed.
    Deleted {
        /// Index the delete was issued for (pre-reorder).
        index: usize,
    },
    /// A field delete was rejected; the cache is unchanged.
    DeleteFailed {
        /// Index the delete was issued for.
        index: usize,
        /// User-facing failure message.
        message: String,
    },
    /// A new field was created on the record.
    FieldAdded {
        /// Tag of the created field.
        tag: String,
    },
}

/// Auto-saving editor for one bibliographic record at a time.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct RecordEditor {
    inner: Arc<EditorInner>,
}

#[derive(Debug)]
struct EditorInner {
    client: CatalogClient,
    autosave: AutoSave,
    state: Mutex<EditorState>,
    events: mpsc::UnboundedSender<EditorEvent>,
}

#[derive(Debug, Default)]
struct EditorState {
    record_id: Option<String>,
    fields: Vec<Field>,
    buffer: EditBuffer,
    editing: Option<usize>,
    saving: HashSet<usize>,
    /// Bumped on load/close. An in-flight response whose generation no
    /// longer matches belongs to a record the user navigated away from
    /// and must not touch the cache.
    generation: u64,
}

impl RecordEditor {
    /// Create an editor and the receiving end of its event stream.
    #[must_use]
    pub fn new(
        client: CatalogClient,
        config: &AutoSaveConfig,
    ) -> (Self, mpsc::UnboundedReceiver<EditorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let editor = RecordEditor {
            inner: Arc::new(EditorInner {
                client,
                autosave: AutoSave::new(config),
                state: Mutex::new(EditorState::default()),
                events,
            }),
        };
        (editor, receiver)
    }

    /// Fetch a record and make it the edited record.
    ///
    /// Replaces any previously loaded record; pending edits and armed
    /// timers are discarded. On failure the editor degrades to the
    /// unloaded state and a [`EditorEvent::LoadFailed`] is emitted.
    ///
    /// # Errors
    ///
    /// Returns the fetch error alongside the emitted event.
    pub async fn load(&self, record_id: &str) -> Result<()> {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.lock();
            state.generation += 1;
            state.generation
        };
        inner.autosave.cancel_all();

        match inner.client.record_fields(record_id).await {
            Ok(fields) => {
                let field_count = fields.len();
                {
                    let mut state = inner.state.lock();
                    if state.generation != generation {
                        debug!(record_id, "load superseded before completion");
                        return Ok(());
                    }
                    state.record_id = Some(record_id.to_string());
                    state.fields = fields;
                    state.buffer.clear_all();
                    state.editing = None;
                    state.saving.clear();
                }
                inner.emit(EditorEvent::Loaded {
                    record_id: record_id.to_string(),
                    field_count,
                });
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = inner.state.lock();
                    if state.generation == generation {
                        state.record_id = None;
                        state.fields.clear();
                        state.buffer.clear_all();
                        state.editing = None;
                        state.saving.clear();
                    }
                }
                inner.emit(EditorEvent::LoadFailed {
                    record_id: record_id.to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Tear down editing state, as on navigating away from the record.
    ///
    /// Armed timers are invalidated and any in-flight response will be
    /// discarded when it lands.
    pub fn close(&self) {
        self.inner.autosave.cancel_all();
        let mut state = self.inner.state.lock();
        state.generation += 1;
        state.record_id = None;
        state.fields.clear();
        state.buffer.clear_all();
        state.editing = None;
        state.saving.clear();
    }

    /// Enter single-field edit mode for the field at `index`.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the index is out of range.
    pub fn begin_edit(&self, index: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.record_id.is_none() {
            return Err(EditorError::NoRecord);
        }
        if index >= state.fields.len() {
            return Err(EditorError::FieldOutOfRange(index));
        }
        state.editing = Some(index);
        Ok(())
    }

    /// Record a keystroke's worth of changes against the field at `index`
    /// and (re)arm the auto-save timers.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the index is out of range.
    pub fn apply_edit(&self, index: usize, patch: FieldPatch) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.record_id.is_none() {
                return Err(EditorError::NoRecord);
            }
            if index >= state.fields.len() {
                return Err(EditorError::FieldOutOfRange(index));
            }
            state.buffer.set_pending(index, patch);
        }

        let inner = Arc::clone(&self.inner);
        self.inner.autosave.keystroke(move || async move {
            let _ = inner.commit(index, false).await;
        });
        Ok(())
    }

    /// Apply tag edit-box text to the field at `index`.
    ///
    /// The tag is taken best-effort: input that is not exactly three
    /// alphanumeric characters leaves the pending tag unchanged, though
    /// the keystroke still resets the auto-save timers.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the index is out of range.
    pub fn edit_tag(&self, index: usize, text: &str) -> Result<()> {
        let patch = FieldPatch {
            tag: parse_tag(text),
            ..FieldPatch::new()
        };
        self.apply_edit(index, patch)
    }

    /// Apply indicator edit-box text to the field at `index`.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the index is out of range.
    pub fn edit_indicators(&self, index: usize, ind1: &str, ind2: &str) -> Result<()> {
        let patch = FieldPatch {
            indicator1: Some(parse_indicator(ind1)),
            indicator2: Some(parse_indicator(ind2)),
            ..FieldPatch::new()
        };
        self.apply_edit(index, patch)
    }

    /// Apply subfield edit-box text (`$a value $b value …`) to the field
    /// at `index`. Malformed tokens are dropped, per
    /// [`crate::subfield_text::parse_subfields`].
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the index is out of range.
    pub fn edit_subfield_text(&self, index: usize, text: &str) -> Result<()> {
        let patch = FieldPatch {
            subfields: Some(parse_subfields(text)),
            ..FieldPatch::new()
        };
        self.apply_edit(index, patch)
    }

    /// Commit the field at `index` immediately, bypassing the debounce.
    ///
    /// Subject to the same in-flight guard as auto-save: if a save for
    /// this index is already running, this is a no-op. Unlike the
    /// auto-save path, an explicit save goes out even with no pending
    /// edits (re-asserting the field as displayed).
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded, the index is out of range, or the
    /// request fails; a failed request also emits
    /// [`EditorEvent::SaveFailed`] and keeps pending edits intact.
    pub async fn save_now(&self, index: usize) -> Result<()> {
        self.inner.commit(index, true).await
    }

    /// Discard pending edits for the field at `index` and leave edit mode
    /// without a network call.
    pub fn cancel(&self, index: usize) {
        {
            let mut state = self.inner.state.lock();
            state.buffer.remove(index);
            if state.editing == Some(index) {
                state.editing = None;
            }
        }
        self.inner.autosave.cancel_all();
    }

    /// Delete the field at `index`.
    ///
    /// On success the cached list is replaced with the server's reordered
    /// response and every pending edit is discarded — the remaining
    /// fields shift position, so any retained entry would silently target
    /// the wrong field.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded, the index is out of range, or the
    /// request fails (which also emits [`EditorEvent::DeleteFailed`]).
    pub async fn delete_field(&self, index: usize) -> Result<()> {
        let inner = &self.inner;
        let (record_id, generation) = {
            let state = inner.state.lock();
            let record_id = state.record_id.clone().ok_or(EditorError::NoRecord)?;
            if index >= state.fields.len() {
                return Err(EditorError::FieldOutOfRange(index));
            }
            (record_id, state.generation)
        };

        match inner.client.delete_field(&record_id, index).await {
            Ok(fields) => {
                {
                    let mut state = inner.state.lock();
                    if state.generation != generation {
                        debug!(index, "discarding delete response for a superseded record");
                        return Ok(());
                    }
                    state.fields = fields;
                    state.buffer.clear_all();
                    state.editing = None;
                }
                inner.autosave.cancel_all();
                inner.emit(EditorEvent::Deleted { index });
                Ok(())
            }
            Err(err) => {
                inner.emit(EditorEvent::DeleteFailed {
                    index,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Create a new field on the loaded record, then refresh the cached
    /// list (the server renumbers on add exactly as on any other write).
    ///
    /// If the creation succeeds but the refresh fails, the stale cache is
    /// kept and a warning logged; the next load reconciles.
    ///
    /// # Errors
    ///
    /// Fails if no record is loaded or the create request fails.
    pub async fn add_field(&self, field: Field) -> Result<Field> {
        let inner = &self.inner;
        let (record_id, generation) = {
            let state = inner.state.lock();
            let record_id = state.record_id.clone().ok_or(EditorError::NoRecord)?;
            (record_id, state.generation)
        };

        let created = inner.client.add_field(&record_id, &field).await?;
        inner.emit(EditorEvent::FieldAdded {
            tag: created.tag.clone(),
        });

        match inner.client.record_fields(&record_id).await {
            Ok(fields) => {
                let mut state = inner.state.lock();
                if state.generation == generation {
                    state.fields = fields;
                    state.buffer.clear_all();
                    state.editing = None;
                    drop(state);
                    inner.autosave.cancel_all();
                }
            }
            Err(err) => {
                warn!(record_id = %record_id, error = %err, "field added but refresh failed; cache is stale");
            }
        }
        Ok(created)
    }

    /// Toggle the inactivity auto-save path at runtime.
    pub fn set_autosave(&self, enabled: bool) {
        self.inner.autosave.set_enabled(enabled);
    }

    /// Whether the inactivity auto-save path is active.
    #[must_use]
    pub fn autosave_enabled(&self) -> bool {
        self.inner.autosave.enabled()
    }

    /// ID of the loaded record, if any.
    #[must_use]
    pub fn record_id(&self) -> Option<String> {
        self.inner.state.lock().record_id.clone()
    }

    /// Snapshot of the cached field list.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.inner.state.lock().fields.clone()
    }

    /// Snapshot of the field at `index`, if present.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<Field> {
        self.inner.state.lock().fields.get(index).cloned()
    }

    /// Index currently in edit mode, if any.
    #[must_use]
    pub fn editing(&self) -> Option<usize> {
        self.inner.state.lock().editing
    }

    /// Number of fields with pending unsaved edits.
    #[must_use]
    pub fn pending_edits(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }
}

impl EditorInner {
    /// Commit the field at `index` to the backend.
    ///
    /// `explicit` distinguishes a user-initiated save (always sent) from
    /// the auto-save path (skipped when nothing is pending).
    async fn commit(&self, index: usize, explicit: bool) -> Result<()> {
        let (record_id, field, generation) = {
            let mut state = self.state.lock();
            let record_id = state.record_id.clone().ok_or(EditorError::NoRecord)?;
            if state.saving.contains(&index) {
                debug!(index, "save already in flight");
                return Ok(());
            }
            let base = state
                .fields
                .get(index)
                .ok_or(EditorError::FieldOutOfRange(index))?;
            let field = match state.buffer.get(index) {
                Some(patch) => patch.materialize(base),
                None if explicit => base.clone(),
                None => {
                    debug!(index, "nothing pending, skipping auto-save");
                    return Ok(());
                }
            };
            state.saving.insert(index);
            (record_id, field, state.generation)
        };

        let result = self.client.update_field(&record_id, index, &field).await;

        let outcome = {
            let mut state = self.state.lock();
            state.saving.remove(&index);
            match result {
                Ok(fields) => {
                    if state.generation != generation {
                        debug!(index, "discarding save response for a superseded record");
                        return Ok(());
                    }
                    state.fields = fields;
                    state.buffer.clear_all();
                    if state.editing == Some(index) {
                        state.editing = None;
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };

        match outcome {
            Ok(()) => {
                self.autosave.cancel_all();
                self.emit(EditorEvent::Saved { index });
                Ok(())
            }
            Err(err) => {
                self.emit(EditorEvent::SaveFailed {
                    index,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn emit(&self, event: EditorEvent) {
        // Receiver may have been dropped; outcomes are best-effort
        let _ = self.events.send(event);
    }
}
