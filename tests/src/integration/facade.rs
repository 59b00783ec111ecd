//! # Facade Sessions
//!
//! Whole sessions through [`DoricoRemote`](dorico_remote::DoricoRemote),
//! with the host following a fixed script.

#[cfg(test)]
mod tests {
    use super::super::fixtures::WAIT;
    use dorico_comms::{MemoryConnector, MemoryHost};
    use dorico_remote::{
        CommsConfig, ConnectionArgs, DoricoRemote, EventFilter, EventTopic, RemoteError,
        RemoteEvent,
    };
    use dorico_types::enums::FlowIds;
    use dorico_types::requests::{OptionValue, Scope};
    use dorico_types::{Command, CommandParameter, Note};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    /// One scripted exchange: the tag the client must send, then what the
    /// host writes back. `None` answers nothing.
    type Step = (&'static str, Option<Value>);

    fn remote() -> (DoricoRemote, MemoryHost) {
        let (connector, host) = MemoryConnector::pair();
        let config = CommsConfig {
            request_timeout_ms: Some(2_000),
            ..CommsConfig::default()
        };
        let remote = DoricoRemote::with_connector(Arc::new(connector), config).expect("config");
        (remote, host)
    }

    /// Play `script` and hand back every message the client sent.
    fn play(mut host: MemoryHost, script: Vec<Step>) -> JoinHandle<(MemoryHost, Vec<Value>)> {
        tokio::spawn(async move {
            let mut sent = Vec::new();
            for (tag, answer) in script {
                let message = timeout(WAIT, host.next_sent_json())
                    .await
                    .expect("client went quiet")
                    .expect("client sent invalid JSON");
                assert_eq!(message["message"], tag, "out of script: {message}");
                sent.push(message);
                match answer {
                    Some(value) => {
                        host.push_json(&value);
                    }
                    None if tag == "disconnect" => {
                        host.push_close(Some(1000), None);
                    }
                    None => {}
                }
            }
            (host, sent)
        })
    }

    fn handshake() -> Vec<Step> {
        vec![
            ("connect", Some(json!({ "message": "sessiontoken", "sessionToken": "tok-1" }))),
            ("acceptsessiontoken", Some(json!({ "message": "response", "code": "kConnected" }))),
        ]
    }

    fn ok() -> Option<Value> {
        Some(json!({ "message": "response", "code": "kOK" }))
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    #[tokio::test]
    async fn test_full_session() {
        let (remote, host) = remote();
        let mut script = handshake();
        script.extend([
            (
                "getflows",
                Some(json!({
                    "message": "flowslist",
                    "openScoreID": 2,
                    "flows": [
                        { "flowID": 1, "flowName": "I. Allegro" },
                        { "flowID": 2, "flowName": "II. Adagio" }
                    ]
                })),
            ),
            ("command", ok()),
            ("disconnect", None),
        ]);
        let host = play(host, script);

        remote
            .connect("Integration", &ConnectionArgs::default())
            .await
            .expect("connect");
        assert!(remote.is_connected());
        assert_eq!(remote.session_token().as_deref(), Some("tok-1"));

        let flows = remote.get_flows().await.expect("flows");
        assert_eq!(flows.open_score_id, 2);
        assert_eq!(flows.flows.len(), 2);

        let mut command = Command::new("Edit.GoToBar");
        command.add_parameter(CommandParameter::new("BarNumber", "12"));
        assert_eq!(remote.send_command(&command).await.expect("command").code, "kOK");

        remote.disconnect().await.expect("disconnect");
        assert!(!remote.is_connected());

        let (_host, sent) = host.await.expect("host script");
        assert_eq!(sent[0]["clientName"], "Integration");
        assert_eq!(sent[1]["sessionToken"], "tok-1");
        assert_eq!(sent[3], json!({ "message": "command", "command": "Edit.GoToBar?BarNumber=12" }));
    }

    #[tokio::test]
    async fn test_resume_with_session_token() {
        let (remote, host) = remote();
        let host = play(
            host,
            vec![("connect", Some(json!({ "message": "response", "code": "kConnected" })))],
        );

        let args = ConnectionArgs::default().with_session_token("tok-9");
        remote.connect("Integration", &args).await.expect("resume");

        let (_host, sent) = host.await.expect("host script");
        assert_eq!(sent[0]["sessionToken"], "tok-9");
        assert_eq!(remote.session_token().as_deref(), Some("tok-9"));
    }

    #[tokio::test]
    async fn test_rejected_token_leaves_client_disconnected() {
        let (remote, host) = remote();
        let host = play(
            host,
            vec![("connect", Some(json!({ "message": "response", "code": "kTokenExpired" })))],
        );

        let args = ConnectionArgs::default().with_session_token("stale");
        let result = remote.connect("Integration", &args).await;

        assert!(matches!(result, Err(RemoteError::SessionRejected { ref code }) if code == "kTokenExpired"));
        assert!(!remote.is_connected());
        let (host, _) = host.await.expect("host script");
        assert!(host.close_requested());
    }

    #[tokio::test]
    async fn test_host_error_surfaces_as_protocol_error() {
        let (remote, host) = remote();
        let mut script = handshake();
        script.push((
            "setoptions",
            Some(json!({ "message": "response", "code": "kError", "detail": "Unknown option" })),
        ));
        script.push(("getlayouts", Some(json!({ "message": "layoutslist", "layouts": [] }))));
        let host = play(host, script);

        remote.connect("Integration", &ConnectionArgs::default()).await.expect("connect");

        let result = remote
            .set_notation_options(
                vec![OptionValue::new("accidentalVisibility", "kModernRules")],
                Scope::Group(FlowIds::All),
            )
            .await;
        match result {
            Err(RemoteError::Protocol { tag, code, detail }) => {
                assert_eq!(tag, "setoptions");
                assert_eq!(code, "kError");
                assert_eq!(detail.as_deref(), Some("Unknown option"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }

        // The connection is still good.
        assert!(remote.get_layouts().await.expect("layouts").layouts.is_empty());

        let (_host, sent) = host.await.expect("host script");
        assert_eq!(sent[2]["optionsType"], "kNotation");
        assert_eq!(sent[2]["flowIDs"], "kAll");
        assert_eq!(
            sent[2]["optionvalues"],
            json!([{ "path": "accidentalVisibility", "value": "kModernRules" }])
        );
    }

    #[tokio::test]
    async fn test_enter_note_sends_accidental_then_pitch() {
        let (remote, host) = remote();
        let mut script = handshake();
        script.extend([("command", ok()), ("command", ok())]);
        let host = play(host, script);

        remote.connect("Integration", &ConnectionArgs::default()).await.expect("connect");
        let note = Note::from_name("F#", 4).expect("note");
        remote.enter_note(&note).await.expect("enter note");

        let (_host, sent) = host.await.expect("host script");
        let commands: Vec<&str> = sent[2..]
            .iter()
            .filter_map(|m| m["command"].as_str())
            .collect();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("NoteInput.SetAccidental"));
        assert!(commands[1].starts_with("NoteInput.Pitch"));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out_and_session_survives() {
        let (remote, host) = remote();
        let mut script = handshake();
        script.extend([
            ("getproperties", None),
            ("getappinfo", Some(json!({ "message": "version", "variant": "Pro", "number": "5.1.0" }))),
        ]);
        let host = play(host, script);

        remote.connect("Integration", &ConnectionArgs::default()).await.expect("connect");
        remote.set_timeout(Some(Duration::from_millis(30)));

        let result = remote.get_properties().await;
        assert!(matches!(&result, Err(e) if e.is_aborted()), "got {result:?}");

        remote.set_timeout(Some(WAIT));
        let version = remote.get_app_info().await.expect("app info");
        assert_eq!(version.number, "5.1.0");
        host.await.expect("host script");
    }

    #[tokio::test]
    async fn test_pushes_reach_subscribers() {
        let (remote, host) = remote();
        let host = play(host, handshake());
        remote.connect("Integration", &ConnectionArgs::default()).await.expect("connect");
        let (host, _) = host.await.expect("host script");

        let mut selection = remote.subscribe(EventFilter::topics(vec![EventTopic::Selection]));
        let mut status = remote.subscribe(EventFilter::topics(vec![EventTopic::Status]));

        host.push_json(&json!({ "message": "status", "hasScore": true }));
        host.push_json(&json!({ "message": "selectionchanged", "openScoreId": 7 }));

        let event = timeout(WAIT, selection.recv()).await.expect("no event").expect("bus");
        assert!(matches!(event, RemoteEvent::SelectionChanged(c) if c.open_score_id == 7));
        let event = timeout(WAIT, status.recv()).await.expect("no event").expect("bus");
        assert!(matches!(event, RemoteEvent::Status(ref s) if s.has_score));
        assert!(remote.current_status().is_some_and(|s| s.has_score));
    }

    #[tokio::test]
    async fn test_host_close_is_reported() {
        let (remote, host) = remote();
        let host = play(host, handshake());
        remote.connect("Integration", &ConnectionArgs::default()).await.expect("connect");
        let (host, _) = host.await.expect("host script");
        let mut events = remote.subscribe(EventFilter::topics(vec![EventTopic::Connection]));

        host.push_close(Some(1001), Some("Dorico is quitting"));

        let event = timeout(WAIT, events.recv()).await.expect("no event").expect("bus");
        assert_eq!(
            event,
            RemoteEvent::Disconnected { code: Some(1001), reason: Some("Dorico is quitting".into()) }
        );
        assert!(matches!(remote.get_flows().await, Err(RemoteError::NotConnected)));
    }
}
