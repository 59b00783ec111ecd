//! # Reply Attribution
//!
//! The host answers in the order requests were written and may interleave
//! pushes at any point. These tests play the host through the in-memory
//! transport and check that every caller gets its own reply.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{next_event, reply, Harness, WAIT};
    use dorico_bus::{EventTopic, RemoteEvent};
    use dorico_comms::{AbortReason, Reply};
    use dorico_types::requests::{
        GetFlowsRequest, GetLayoutsRequest, GetLibraryEntitiesRequest, GetPropertiesRequest,
    };
    use dorico_types::{Envelope, Response};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn flows(open_score_id: i64) -> serde_json::Value {
        json!({
            "message": "flowslist",
            "openScoreID": open_score_id,
            "flows": [{ "flowID": 1, "flowName": "Flow 1" }]
        })
    }

    fn entities_for(collection: &str) -> serde_json::Value {
        let id: i64 = collection.trim_start_matches('c').parse().unwrap_or(-1);
        json!({
            "message": "libraryentitieslist",
            "openScoreId": id,
            "libraryEntities": []
        })
    }

    // =========================================================================
    // FIFO ATTRIBUTION
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_callers_each_get_their_own_reply() {
        const CALLERS: i64 = 16;
        let mut harness = Harness::connected().await;

        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let handle = harness.send(GetLibraryEntitiesRequest::new(format!("c{i}")), None);
                (i, handle)
            })
            .collect();

        // Answer in wire order. Each reply names the collection it answers.
        for _ in 0..CALLERS {
            let sent = harness.expect_sent().await;
            let collection = sent["collection"].as_str().unwrap_or_default().to_string();
            assert!(harness.host.push_json(&entities_for(&collection)));
        }

        for (i, handle) in handles {
            match reply(handle).await {
                Reply::Response(Envelope { response: Response::LibraryEntitiesList(list), .. }) => {
                    assert_eq!(list.open_score_id, i, "caller {i} got another caller's reply");
                }
                other => panic!("caller {i} got {other:?}"),
            }
        }

        assert_eq!(harness.context.pending_requests(), 0);
        let stats = harness.context.queue_stats();
        assert_eq!(stats.total_enqueued.load(Ordering::Relaxed), CALLERS as u64);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), CALLERS as u64);
    }

    #[tokio::test]
    async fn test_mixed_shapes_complete_in_order() {
        let mut harness = Harness::connected().await;

        let first = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        let second = harness.send(GetLayoutsRequest, None);
        harness.expect_sent().await;

        harness.host.push_json(&flows(3));
        harness.host.push_json(&json!({
            "message": "layoutslist",
            "openScoreID": 3,
            "layouts": [{ "layoutID": 1, "layoutName": "Full score" }]
        }));

        assert!(matches!(
            reply(first).await,
            Reply::Response(Envelope { response: Response::FlowsList(_), .. })
        ));
        assert!(matches!(
            reply(second).await,
            Reply::Response(Envelope { response: Response::LayoutsList(_), .. })
        ));
    }

    // =========================================================================
    // PUSHES AND ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_push_between_request_and_reply_is_published_not_attributed() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Selection]);

        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;

        harness.host.push_json(&json!({ "message": "selectionchanged", "openScoreId": 4 }));
        harness.host.push_json(&flows(4));

        assert!(matches!(
            next_event(&mut events).await,
            RemoteEvent::SelectionChanged(changed) if changed.open_score_id == 4
        ));
        match reply(pending).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                assert_eq!(list.open_score_id, 4)
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_code_completes_head_whatever_it_awaits() {
        let mut harness = Harness::connected().await;

        let failing = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        let following = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;

        harness.host.push_json(&json!({
            "message": "response",
            "code": "kError",
            "detail": "No score open"
        }));
        harness.host.push_json(&flows(1));

        match reply(failing).await {
            Reply::Error(code) => {
                assert_eq!(code.code, "kError");
                assert_eq!(code.detail.as_deref(), Some("No score open"));
            }
            other => panic!("expected error reply, got {other:?}"),
        }
        assert!(matches!(
            reply(following).await,
            Reply::Response(Envelope { response: Response::FlowsList(_), .. })
        ));
        assert_eq!(harness.context.queue_stats().total_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_reply_without_waiter_is_dropped() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Selection]);

        harness.host.push_json(&flows(9));
        // Messages are handled in order: once the push is seen, so was the stray reply.
        harness.host.push_json(&json!({ "message": "selectionchanged", "openScoreId": 9 }));
        next_event(&mut events).await;

        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_json(&flows(2));

        match reply(pending).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                assert_eq!(list.open_score_id, 2)
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    // =========================================================================
    // ABANDONED REQUESTS
    // =========================================================================

    #[tokio::test]
    async fn test_timed_out_head_is_flushed_for_the_next_reply() {
        let mut harness = Harness::connected().await;

        let abandoned = harness.send(GetPropertiesRequest, Some(Duration::from_millis(20)));
        harness.expect_sent().await;
        assert_eq!(reply(abandoned).await, Reply::Aborted(AbortReason::TimedOut));

        // Still queued until the next message arrives.
        assert_eq!(harness.context.pending_requests(), 1);

        let next = harness.send(GetFlowsRequest, Some(WAIT));
        harness.expect_sent().await;
        harness.host.push_json(&flows(5));

        match reply(next).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                assert_eq!(list.open_score_id, 5)
            }
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(harness.context.pending_requests(), 0);
        assert_eq!(harness.context.queue_stats().total_flushed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_canceled_caller_returns_promptly_and_connection_stays_usable() {
        let mut harness = Harness::connected().await;
        let cancel = dorico_comms::CancellationToken::new();

        let context = harness.context.clone();
        let token = cancel.clone();
        let canceled = tokio::spawn(async move {
            context.send(&GetPropertiesRequest, &token, None).await
        });
        harness.expect_sent().await;
        cancel.cancel();

        let outcome = tokio::time::timeout(WAIT, canceled)
            .await
            .expect("cancel was not observed")
            .expect("task panicked");
        assert_eq!(outcome, Ok(Reply::Aborted(AbortReason::Canceled)));

        let next = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_json(&flows(6));
        assert!(matches!(
            reply(next).await,
            Reply::Response(Envelope { response: Response::FlowsList(_), .. })
        ));
    }
}
