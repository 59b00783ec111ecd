//! # Message Dispatch
//!
//! Nothing the host sends may stop the receive loop. Each payload here is
//! followed by a normal exchange to prove the loop is still serving.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{next_event, reply, Harness};
    use dorico_bus::{EventTopic, RemoteEvent};
    use dorico_comms::{ConnectionState, Reply};
    use dorico_types::requests::GetFlowsRequest;
    use dorico_types::{Envelope, Response};
    use serde_json::json;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    /// Round-trip one request to show the loop is alive and the bad payload
    /// was not attributed to anyone.
    async fn assert_still_serving(harness: &mut Harness) {
        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_json(&json!({
            "message": "flowslist",
            "openScoreID": 77,
            "flows": []
        }));

        match reply(pending).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                assert_eq!(list.open_score_id, 77)
            }
            other => panic!("loop stopped serving: {other:?}"),
        }
        assert_eq!(harness.context.state(), ConnectionState::Open);
    }

    // =========================================================================
    // BAD PAYLOADS
    // =========================================================================

    #[tokio::test]
    async fn test_malformed_json_is_skipped() {
        let mut harness = Harness::connected().await;
        harness.host.push_text("{ not json");
        assert_still_serving(&mut harness).await;
    }

    #[tokio::test]
    async fn test_missing_tag_is_skipped() {
        let mut harness = Harness::connected().await;
        harness.host.push_json(&json!({ "code": "kOK" }));
        harness.host.push_json(&json!([1, 2, 3]));
        assert_still_serving(&mut harness).await;
    }

    #[tokio::test]
    async fn test_unknown_tag_is_skipped() {
        let mut harness = Harness::connected().await;
        harness.host.push_json(&json!({ "message": "teleport", "to": "Mars" }));
        assert_still_serving(&mut harness).await;
    }

    #[tokio::test]
    async fn test_undecodable_reply_does_not_complete_head() {
        let mut harness = Harness::connected().await;

        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        // Right tag, wrong shape.
        harness.host.push_json(&json!({ "message": "flowslist", "flows": "none" }));
        harness.host.push_json(&json!({ "message": "flowslist", "openScoreID": 8, "flows": [] }));

        match reply(pending).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                assert_eq!(list.open_score_id, 8)
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_skipped() {
        let mut harness = Harness::connected().await;
        harness.host.push_binary(vec![0x7b, 0xff, 0xfe, 0x7d]);
        assert_still_serving(&mut harness).await;
    }

    #[tokio::test]
    async fn test_empty_message_is_skipped() {
        let mut harness = Harness::connected().await;
        harness.host.push_text("");
        assert_still_serving(&mut harness).await;
    }

    // =========================================================================
    // UNPROMPTED MESSAGES
    // =========================================================================

    #[tokio::test]
    async fn test_every_push_shape_is_published() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::All]);

        harness.host.push_json(&json!({ "message": "selectionchanged", "openScoreId": 1 }));
        harness.host.push_json(&json!({ "message": "optionschanged", "openScoreId": 2 }));
        harness
            .host
            .push_json(&json!({ "message": "playbackconfigurationchanged", "openScoreId": 3 }));
        harness.host.push_json(&json!({
            "message": "librarychanged",
            "openScoreId": 4,
            "collections": ["paragraphStyles"]
        }));

        assert!(matches!(next_event(&mut events).await, RemoteEvent::SelectionChanged(c) if c.open_score_id == 1));
        assert!(matches!(next_event(&mut events).await, RemoteEvent::OptionsChanged(c) if c.open_score_id == 2));
        assert!(matches!(
            next_event(&mut events).await,
            RemoteEvent::PlaybackConfigurationChanged(c) if c.open_score_id == 3
        ));
        match next_event(&mut events).await {
            RemoteEvent::LibraryChanged(changed) => {
                assert_eq!(changed.open_score_id, 4);
                assert_eq!(changed.collections, vec!["paragraphStyles".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_binary_text_frame_is_dispatched() {
        let harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Selection]);

        harness
            .host
            .push_binary(br#"{"message":"selectionchanged","openScoreId":5}"#.to_vec());

        assert!(matches!(
            next_event(&mut events).await,
            RemoteEvent::SelectionChanged(c) if c.open_score_id == 5
        ));
    }
}
