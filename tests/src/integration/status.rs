//! # Status Tracking
//!
//! The host pushes `status` with only the fields that changed. A
//! `getstatus` reply is a full snapshot and replaces what was known.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{next_event, reply, Harness};
    use dorico_bus::{EventTopic, RemoteEvent, Subscription};
    use dorico_comms::Reply;
    use dorico_types::enums::NoteInputMode;
    use dorico_types::requests::GetStatusRequest;
    use dorico_types::{Envelope, Response, StatusResponse};
    use serde_json::{json, Value};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn status(fields: Value) -> Value {
        let mut message = json!({ "message": "status" });
        if let (Some(target), Some(source)) = (message.as_object_mut(), fields.as_object()) {
            target.extend(source.clone());
        }
        message
    }

    async fn next_status(events: &mut Subscription) -> StatusResponse {
        match next_event(events).await {
            RemoteEvent::Status(status) => *status,
            other => panic!("expected status, got {other:?}"),
        }
    }

    // =========================================================================
    // PUSHES
    // =========================================================================

    #[tokio::test]
    async fn test_partial_pushes_accumulate() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Status]);

        harness.host.push_json(&status(json!({ "hasScore": true, "activeOpenScoreID": 3 })));
        let first = next_status(&mut events).await;
        assert!(first.has_score);
        assert!(!first.can_undo);

        harness.host.push_json(&status(json!({ "canUndo": true })));
        let second = next_status(&mut events).await;
        assert!(second.has_score, "omitted field lost its value");
        assert!(second.can_undo);
        assert_eq!(second.active_open_score_id, 3);

        assert_eq!(harness.context.current_status(), Some(second));
    }

    #[tokio::test]
    async fn test_null_keeps_previous_value() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Status]);

        harness.host.push_json(&status(json!({ "hasSelection": true })));
        next_status(&mut events).await;

        harness.host.push_json(&status(json!({ "hasSelection": null, "inPlayback": true })));
        let merged = next_status(&mut events).await;
        assert!(merged.has_selection);
        assert!(merged.in_playback);
    }

    #[tokio::test]
    async fn test_identical_pushes_are_each_delivered() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Status]);

        let push = status(json!({ "hasScore": true }));
        harness.host.push_json(&push);
        harness.host.push_json(&push);

        assert_eq!(next_status(&mut events).await, next_status(&mut events).await);
    }

    #[tokio::test]
    async fn test_bad_push_leaves_baseline_untouched() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Status]);

        harness.host.push_json(&status(json!({ "hasScore": true })));
        next_status(&mut events).await;

        harness.host.push_json(&status(json!({ "canUndo": "sometimes" })));
        harness.host.push_json(&status(json!({ "inPlayback": true })));

        let after = next_status(&mut events).await;
        assert!(after.has_score);
        assert!(after.in_playback);
        assert!(!after.can_undo);
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    #[tokio::test]
    async fn test_status_reply_replaces_baseline() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Status]);

        harness.host.push_json(&status(json!({ "hasScore": true, "canUndo": true })));
        next_status(&mut events).await;

        let pending = harness.send(GetStatusRequest, None);
        assert_eq!(harness.expect_sent().await["message"], "getstatus");
        harness
            .host
            .push_json(&status(json!({ "hasScore": true, "noteInputMode": "kInsert" })));

        let snapshot = match reply(pending).await {
            Reply::Response(Envelope { response: Response::Status(status), .. }) => *status,
            other => panic!("unexpected reply {other:?}"),
        };
        assert!(snapshot.has_score);
        assert!(!snapshot.can_undo, "snapshot should not inherit pushed fields");
        assert_eq!(snapshot.note_input_mode, NoteInputMode::Insert);

        // Also published, and visible as the current status.
        assert_eq!(next_status(&mut events).await, snapshot);
        assert_eq!(harness.context.current_status(), Some(snapshot.clone()));

        // Later pushes patch the new baseline.
        harness.host.push_json(&status(json!({ "inPlayback": true })));
        let patched = next_status(&mut events).await;
        assert!(patched.in_playback);
        assert_eq!(patched.note_input_mode, NoteInputMode::Insert);
        assert!(!patched.can_undo);
    }

    #[tokio::test]
    async fn test_no_status_before_first_push() {
        let harness = Harness::connected().await;
        assert_eq!(harness.context.current_status(), None);
    }
}
