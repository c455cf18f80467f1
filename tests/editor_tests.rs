//! Integration tests for the record editor and its auto-save path.
//!
//! Each test stands up a wiremock backend and drives the editor the way a
//! cataloging UI would: load, enter edit mode, forward keystrokes, and
//! observe the event stream. Auto-save timings are shortened so the
//! debounce can be exercised in real time.

use std::sync::Arc;
use std::time::Duration;

use mrced::{
    AutoSaveConfig, CatalogClient, EditorError, EditorEvent, Field, RecordEditor, Session,
};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORD: &str = "gd0042";

fn fast_config() -> AutoSaveConfig {
    AutoSaveConfig {
        enabled: true,
        commit_delay: Duration::from_millis(400),
        typing_grace: Duration::from_millis(50),
    }
}

fn editor_for(server: &MockServer) -> (RecordEditor, UnboundedReceiver<EditorEvent>) {
    let session = Arc::new(Session::with_token("t0k3n".to_string()));
    let client = CatalogClient::new(server.uri(), session);
    RecordEditor::new(client, &fast_config())
}

/// Six-field record with the title field at index 3.
fn initial_fields() -> serde_json::Value {
    json!([
        {"tag": "035", "ind1": " ", "ind2": " ", "subfields": {"a": "(OCoLC)12345"}},
        {"tag": "086", "ind1": "0", "ind2": " ", "subfields": {"a": "A 1.1:"}},
        {"tag": "100", "ind1": "1", "ind2": " ", "subfields": {"a": "Doe, Jane"}},
        {"tag": "245", "ind1": "1", "ind2": "0", "subfields": {"a": "Old Title"}},
        {"tag": "500", "ind1": " ", "ind2": " ", "subfields": {"a": "General note"}},
        {"tag": "650", "ind1": " ", "ind2": "0", "subfields": {"a": "Documents"}}
    ])
}

async fn mount_initial_get(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/catalog/sudoc/{RECORD}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .mount(server)
        .await;
}

async fn next_event(events: &mut UnboundedReceiver<EditorEvent>) -> EditorEvent {
    tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .expect("timed out waiting for editor event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_debounce_coalesces_keystrokes_into_one_patch() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/3")))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .expect(1)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Loaded { field_count: 6, .. }
    ));

    editor.begin_edit(3).expect("begin_edit failed");
    for text in ["$a N", "$a Ne", "$a New", "$a New T", "$a New Title"] {
        editor.edit_subfield_text(3, text).expect("edit failed");
        sleep(Duration::from_millis(50)).await;
    }

    sleep(Duration::from_millis(1200)).await;

    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Saved { index: 3 }
    ));
    assert_eq!(editor.pending_edits(), 0);
    assert_eq!(editor.editing(), None);
}

#[tokio::test]
async fn test_title_edit_scenario_patches_field_three() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    // The server accepts the new title and returns a reordered list
    let reordered = json!([
        {"tag": "086", "ind1": "0", "ind2": " ", "subfields": {"a": "A 1.1:"}},
        {"tag": "245", "ind1": "1", "ind2": "0", "subfields": {"a": "New Title"}}
    ]);
    Mock::given(method("PATCH"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/3")))
        .and(body_json(json!({
            "tag": "245",
            "indicators": ["1", "0"],
            "subfields": [{"code": "a", "value": "New Title"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reordered))
        .expect(1)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    editor.begin_edit(3).expect("begin_edit failed");
    editor
        .edit_subfield_text(3, "$a New Title")
        .expect("edit failed");

    sleep(Duration::from_millis(1000)).await;

    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Saved { index: 3 }
    ));

    // Cache equals the server's response verbatim
    let expected = vec![
        Field::builder("086".to_string(), '0', ' ')
            .subfield_str('a', "A 1.1:")
            .build(),
        Field::builder("245".to_string(), '1', '0')
            .subfield_str('a', "New Title")
            .build(),
    ];
    assert_eq!(editor.fields(), expected);
    assert_eq!(editor.editing(), None);
    assert_eq!(editor.pending_edits(), 0);
}

#[tokio::test]
async fn test_save_failure_keeps_pending_edit() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/3")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    editor.begin_edit(3).expect("begin_edit failed");
    editor
        .edit_subfield_text(3, "$a New Title")
        .expect("edit failed");

    sleep(Duration::from_millis(1000)).await;

    match next_event(&mut events).await {
        EditorEvent::SaveFailed { index, message } => {
            assert_eq!(index, 3);
            assert_eq!(message, "boom");
        }
        other => panic!("expected SaveFailed, got {other:?}"),
    }

    // Pending edit survives for retry; cache unchanged; still editing
    assert_eq!(editor.pending_edits(), 1);
    assert_eq!(
        editor.field(3).unwrap().get_subfield('a'),
        Some("Old Title")
    );
    assert_eq!(editor.editing(), Some(3));
}

#[tokio::test]
async fn test_delete_discards_unrelated_pending_edit() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    // Any PATCH here would be the stale buffer firing; there must be none
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .expect(0)
        .mount(&server)
        .await;

    let shifted = json!([
        {"tag": "035", "ind1": " ", "ind2": " ", "subfields": {"a": "(OCoLC)12345"}},
        {"tag": "086", "ind1": "0", "ind2": " ", "subfields": {"a": "A 1.1:"}},
        {"tag": "245", "ind1": "1", "ind2": "0", "subfields": {"a": "Old Title"}},
        {"tag": "500", "ind1": " ", "ind2": " ", "subfields": {"a": "General note"}},
        {"tag": "650", "ind1": " ", "ind2": "0", "subfields": {"a": "Documents"}}
    ]);
    Mock::given(method("DELETE"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(shifted))
        .expect(1)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    // Unsaved pending edit on index 5, then delete index 2
    editor.begin_edit(5).expect("begin_edit failed");
    editor
        .edit_subfield_text(5, "$a Government documents")
        .expect("edit failed");
    editor.delete_field(2).await.expect("delete failed");

    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Deleted { index: 2 }
    ));
    assert_eq!(editor.pending_edits(), 0);
    assert_eq!(editor.fields().len(), 5);

    // Let any stale timer fire; the expect(0) PATCH mock verifies on drop
    sleep(Duration::from_millis(800)).await;
}

#[tokio::test]
async fn test_manual_save_during_inflight_autosave_is_single_submit() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/3")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(initial_fields())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    editor.begin_edit(3).expect("begin_edit failed");
    editor
        .edit_subfield_text(3, "$a New Title")
        .expect("edit failed");

    // Auto-save fires at ~400 ms and stays in flight until ~900 ms;
    // the manual save at ~600 ms must be absorbed by the guard.
    sleep(Duration::from_millis(600)).await;
    editor.save_now(3).await.expect("manual save errored");

    sleep(Duration::from_millis(600)).await;
    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Saved { index: 3 }
    ));
    assert!(events.try_recv().is_err(), "only one save outcome expected");
}

#[tokio::test]
async fn test_load_failure_degrades_to_unloaded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/catalog/sudoc/{RECORD}")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "record unavailable"})),
        )
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    let err = editor.load(RECORD).await.unwrap_err();
    assert!(matches!(err, EditorError::Api { status: 500, .. }));

    match next_event(&mut events).await {
        EditorEvent::LoadFailed { record_id, message } => {
            assert_eq!(record_id, RECORD);
            assert_eq!(message, "record unavailable");
        }
        other => panic!("expected LoadFailed, got {other:?}"),
    }

    assert_eq!(editor.record_id(), None);
    assert!(editor.fields().is_empty());
}

#[tokio::test]
async fn test_cancel_discards_edit_without_network() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .expect(0)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    editor.begin_edit(3).expect("begin_edit failed");
    editor
        .edit_subfield_text(3, "$a Abandoned edit")
        .expect("edit failed");
    editor.cancel(3);

    assert_eq!(editor.pending_edits(), 0);
    assert_eq!(editor.editing(), None);

    sleep(Duration::from_millis(800)).await;
}

#[tokio::test]
async fn test_autosave_disabled_until_explicit_save() {
    let server = MockServer::start().await;
    mount_initial_get(&server).await;

    Mock::given(method("PATCH"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/3")))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .expect(1)
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    editor.set_autosave(false);
    editor.begin_edit(3).expect("begin_edit failed");
    editor
        .edit_subfield_text(3, "$a New Title")
        .expect("edit failed");

    // Debounce elapses with auto-save off: nothing goes out
    sleep(Duration::from_millis(800)).await;
    assert_eq!(editor.pending_edits(), 1);

    editor.save_now(3).await.expect("manual save failed");
    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::Saved { index: 3 }
    ));
    assert_eq!(editor.pending_edits(), 0);
}

#[tokio::test]
async fn test_add_field_refreshes_cache_from_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/catalog/sudoc/{RECORD}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(initial_fields()))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/catalog/sudoc/{RECORD}/field/add")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "tag": "246",
            "ind1": "3",
            "ind2": " ",
            "subfields": {"a": "Variant Title"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut refreshed = initial_fields();
    refreshed.as_array_mut().unwrap().insert(
        4,
        json!({"tag": "246", "ind1": "3", "ind2": " ", "subfields": {"a": "Variant Title"}}),
    );
    Mock::given(method("GET"))
        .and(path(format!("/catalog/sudoc/{RECORD}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(refreshed))
        .mount(&server)
        .await;

    let (editor, mut events) = editor_for(&server);
    editor.load(RECORD).await.expect("load failed");
    let _ = next_event(&mut events).await;

    let field = Field::builder("246".to_string(), '3', ' ')
        .subfield_str('a', "Variant Title")
        .build();
    let created = editor.add_field(field).await.expect("add failed");

    assert_eq!(created.tag, "246");
    assert!(matches!(
        next_event(&mut events).await,
        EditorEvent::FieldAdded { .. }
    ));
    assert_eq!(editor.fields().len(), 7);
    assert_eq!(editor.pending_edits(), 0);
}
