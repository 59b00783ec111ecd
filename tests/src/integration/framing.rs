//! # Fragment Reassembly
//!
//! A message larger than the receive buffer arrives as several fragments.
//! The loop concatenates them and decodes text only once the last one is in.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{reply, Harness};
    use dorico_comms::{CommsConfig, Reply};
    use dorico_types::requests::GetFlowsRequest;
    use dorico_types::{Envelope, Response};
    use proptest::prelude::*;
    use serde_json::json;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn small_buffer(size: usize) -> CommsConfig {
        CommsConfig {
            receive_buffer_size: size,
            ..CommsConfig::default()
        }
    }

    /// Ask for the flows and answer with one flow called `name`.
    async fn flow_name_round_trip(buffer: usize, name: &str) -> String {
        let mut harness = Harness::connected_with(small_buffer(buffer)).await;

        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_json(&json!({
            "message": "flowslist",
            "openScoreID": 1,
            "flows": [{ "flowID": 1, "flowName": name }]
        }));

        match reply(pending).await {
            Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => {
                list.flows[0].flow_name.clone()
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    // =========================================================================
    // REASSEMBLY
    // =========================================================================

    #[tokio::test]
    async fn test_message_spanning_many_fragments() {
        let name = "Allegro ma non troppo ".repeat(20);
        assert_eq!(flow_name_round_trip(8, &name).await, name);
    }

    #[tokio::test]
    async fn test_reassembled_text_reaches_caller_verbatim() {
        let mut harness = Harness::connected_with(small_buffer(5)).await;
        let text = "{ \"message\" : \"flowslist\",\n  \"openScoreID\": 6,\n  \"flows\": [],\n  \"tempo\": \"♩ = 120\" }";

        let pending = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        harness.host.push_text(text);

        let reply = reply(pending).await;
        assert_eq!(reply.raw(), Some(text));
        assert!(matches!(
            reply.into_response(),
            Some(Response::FlowsList(list)) if list.open_score_id == 6
        ));
    }

    #[tokio::test]
    async fn test_multibyte_characters_split_across_fragments() {
        // Three-byte and four-byte sequences straddle every 3-byte boundary.
        let name = "Flöte ♪ Prélude 𝄞 Satz";
        assert_eq!(flow_name_round_trip(3, name).await, name);
    }

    #[tokio::test]
    async fn test_single_byte_buffer() {
        assert_eq!(flow_name_round_trip(1, "Coda").await, "Coda");
    }

    #[tokio::test]
    async fn test_consecutive_messages_stay_separate() {
        let mut harness = Harness::connected_with(small_buffer(5)).await;

        let first = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;
        let second = harness.send(GetFlowsRequest, None);
        harness.expect_sent().await;

        for id in [10, 20] {
            harness
                .host
                .push_json(&json!({ "message": "flowslist", "openScoreID": id, "flows": [] }));
        }

        for (handle, id) in [(first, 10), (second, 20)] {
            match reply(handle).await {
                Reply::Response(Envelope { response: Response::FlowsList(list), .. }) => assert_eq!(list.open_score_id, id),
                other => panic!("unexpected reply {other:?}"),
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_any_buffer_size_reassembles(buffer in 1usize..64, name in "\\PC{0,40}") {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            let received = runtime.block_on(flow_name_round_trip(buffer, &name));
            prop_assert_eq!(received, name);
        }
    }
}
