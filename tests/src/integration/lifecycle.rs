//! # Connection Lifecycle
//!
//! Connect, orderly stop, and every way a connection can go away while
//! callers are waiting on it.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{eventually, next_event, reply, Harness, WAIT};
    use dorico_bus::{EventTopic, RemoteEvent};
    use dorico_comms::{
        AbortReason, CancellationToken, CommsConfig, CommsError, ConnectionArgs,
        ConnectionState, Reply, TransportError,
    };
    use dorico_types::requests::{GetFlowsRequest, GetPropertiesRequest, GetStatusRequest};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    const WAITERS: usize = 5;

    /// Queue `WAITERS` requests the host never answers.
    async fn waiting(harness: &mut Harness) -> Vec<tokio::task::JoinHandle<Result<Reply, CommsError>>> {
        let mut handles = Vec::with_capacity(WAITERS);
        for _ in 0..WAITERS {
            handles.push(harness.send(GetPropertiesRequest, Some(Duration::from_secs(30))));
            harness.expect_sent().await;
        }
        assert_eq!(harness.context.pending_requests(), WAITERS);
        handles
    }

    async fn assert_all_disconnected(
        handles: Vec<tokio::task::JoinHandle<Result<Reply, CommsError>>>,
    ) {
        for handle in handles {
            assert_eq!(reply(handle).await, Reply::Aborted(AbortReason::Disconnected));
        }
    }

    // =========================================================================
    // CONNECT
    // =========================================================================

    #[tokio::test]
    async fn test_send_before_connect_writes_nothing() {
        let mut harness = Harness::new(CommsConfig::default());

        let result = harness
            .context
            .send(&GetFlowsRequest, &CancellationToken::new(), None)
            .await;

        assert_eq!(result, Err(CommsError::NotConnected));
        assert!(harness.host.try_next_sent().is_none());
        assert_eq!(harness.context.queue_stats().total_enqueued.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_connect_canceled_before_open() {
        let harness = Harness::new(CommsConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = harness.context.connect(&ConnectionArgs::default(), &cancel).await;

        assert_eq!(result, Err(CommsError::RequestAborted(AbortReason::Canceled)));
        assert_eq!(harness.context.state(), ConnectionState::Disconnected);
        assert!(!harness.context.is_running());
    }

    #[tokio::test]
    async fn test_connect_rejects_blank_address() {
        let harness = Harness::new(CommsConfig::default());
        let args = ConnectionArgs::default().with_address("   ");

        let result = harness.context.connect(&args, &CancellationToken::new()).await;

        assert!(matches!(result, Err(CommsError::Config(_))));
        assert_eq!(harness.context.state(), ConnectionState::Disconnected);
    }

    // =========================================================================
    // STOP
    // =========================================================================

    #[tokio::test]
    async fn test_stop_waits_for_host_close() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Connection]);

        let context = harness.context.clone();
        let stopping = tokio::spawn(async move {
            context.stop(&CancellationToken::new(), Some(WAIT)).await
        });

        let sent = harness.expect_sent().await;
        assert_eq!(sent, json!({ "message": "disconnect" }));
        harness.host.push_close(Some(1000), Some("bye"));

        let outcome = tokio::time::timeout(WAIT, stopping).await.expect("stop hung");
        assert_ok!(outcome.expect("stop panicked"));
        assert_eq!(harness.context.state(), ConnectionState::Disconnected);
        assert!(!harness.context.is_running());
        assert_eq!(
            next_event(&mut events).await,
            RemoteEvent::Disconnected { code: Some(1000), reason: Some("bye".into()) }
        );
    }

    #[tokio::test]
    async fn test_stop_timeout_leaves_connection_open() {
        let mut harness = Harness::connected().await;

        let result = harness
            .context
            .stop(&CancellationToken::new(), Some(Duration::from_millis(20)))
            .await;

        assert_err!(result.clone());
        assert_eq!(result, Err(CommsError::RequestAborted(AbortReason::TimedOut)));
        assert_eq!(harness.context.state(), ConnectionState::Open);
        assert_eq!(harness.expect_sent().await["message"], "disconnect");
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters_and_closes_transport() {
        let mut harness = Harness::connected().await;
        let handles = waiting(&mut harness).await;

        harness.context.shutdown().await;

        assert_all_disconnected(handles).await;
        assert!(harness.host.close_requested());
        assert_eq!(harness.context.state(), ConnectionState::Disconnected);
    }

    // =========================================================================
    // CONNECTION LOSS
    // =========================================================================

    #[tokio::test]
    async fn test_close_frame_wakes_every_waiter_once() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Connection]);
        let handles = waiting(&mut harness).await;

        harness.host.push_close(Some(1001), None);

        assert_all_disconnected(handles).await;
        assert_eq!(
            next_event(&mut events).await,
            RemoteEvent::Disconnected { code: Some(1001), reason: None }
        );
        assert!(events.try_recv().expect("bus open").is_none(), "disconnect published twice");

        let context = harness.context.clone();
        assert!(eventually(|| context.state() == ConnectionState::Disconnected).await);
        assert_eq!(harness.context.pending_requests(), 0);
        assert_eq!(
            harness.context.queue_stats().total_drained.load(Ordering::Relaxed),
            WAITERS as u64
        );
    }

    #[tokio::test]
    async fn test_read_error_is_a_disconnect() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Connection]);
        let handles = waiting(&mut harness).await;

        harness
            .host
            .push_error(TransportError::Receive("connection reset by peer".into()));

        assert_all_disconnected(handles).await;
        match next_event(&mut events).await {
            RemoteEvent::Disconnected { code: None, reason: Some(reason) } => {
                assert!(reason.contains("connection reset"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_host_vanishing_is_a_disconnect() {
        let Harness { context, host, bus } = Harness::connected().await;
        let mut events = bus.subscribe(dorico_bus::EventFilter::topics(vec![EventTopic::Connection]));

        drop(host);

        assert_eq!(
            next_event(&mut events).await,
            RemoteEvent::Disconnected { code: None, reason: None }
        );
        assert!(eventually(|| !context.is_running()).await);
    }

    #[tokio::test]
    async fn test_send_after_close_fails_fast() {
        let mut harness = Harness::connected().await;
        let mut events = harness.subscribe(vec![EventTopic::Connection]);

        harness.host.push_close(Some(1000), None);
        next_event(&mut events).await;
        let context = harness.context.clone();
        assert!(eventually(|| context.state() == ConnectionState::Disconnected).await);

        let result = harness
            .context
            .send(&GetStatusRequest, &CancellationToken::new(), None)
            .await;
        assert_eq!(result, Err(CommsError::NotConnected));
        assert!(harness.host.try_next_sent().is_none());
    }

    // =========================================================================
    // WRITE FAILURE
    // =========================================================================

    #[tokio::test]
    async fn test_write_failure_aborts_only_that_request() {
        let mut harness = Harness::connected().await;

        harness.host.fail_sends(true);
        let failed = harness.send(GetFlowsRequest, None);
        assert_eq!(reply(failed).await, Reply::Aborted(AbortReason::SendFailed));
        assert_eq!(harness.context.state(), ConnectionState::Open);

        harness.host.fail_sends(false);
        let next = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_json(&json!({ "message": "flowslist", "openScoreID": 1, "flows": [] }));
        assert!(matches!(reply(next).await, Reply::Response(_)));
    }
}
