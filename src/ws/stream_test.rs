use super::*;
use serde_json::json;

struct Harness {
    socket: mpsc::UnboundedSender<String>,
    outbound: mpsc::UnboundedReceiver<String>,
    events: broadcast::Sender<Event>,
}

impl Harness {
    fn new() -> Self {
        let (socket, outbound) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(16);
        Self { socket, outbound, events }
    }

    fn link(&self, ready: bool, status: Option<ServerStatus>) -> Link<'_> {
        Link { socket: Some(&self.socket), ready, status, events: &self.events }
    }

    fn sent(&mut self) -> Vec<Frame> {
        let mut sent = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            sent.push(frames::decode_frame(&text).expect("outbound frame should decode"));
        }
        sent
    }
}

// =============================================================================
// StreamName
// =============================================================================

#[test]
fn parse_round_trips_every_kind() {
    for kind in StreamName::ALL {
        assert_eq!(StreamName::parse(kind.as_str()), Some(kind));
    }
}

#[test]
fn parse_rejects_unknown_names() {
    assert_eq!(StreamName::parse("status"), None);
    assert_eq!(StreamName::parse("Console"), None);
    assert_eq!(StreamName::parse(""), None);
}

#[test]
fn console_runs_during_transitions() {
    let statuses = StreamName::Console.start_statuses();
    assert!(statuses.contains(&ServerStatus::Starting));
    assert!(statuses.contains(&ServerStatus::Stopping));
    assert!(statuses.contains(&ServerStatus::Restarting));
    assert!(!statuses.contains(&ServerStatus::Offline));
}

#[test]
fn other_kinds_run_only_online() {
    for kind in [StreamName::Tick, StreamName::Stats, StreamName::Heap, StreamName::Management] {
        assert_eq!(kind.start_statuses(), &[ServerStatus::Online]);
    }
}

#[test]
fn stream_name_serializes_lowercase() {
    assert_eq!(serde_json::to_value(StreamName::Management).unwrap(), json!("management"));
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[test]
fn start_sends_default_console_payload() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Console.create();

    assert!(stream.start(None, &harness.link(true, Some(ServerStatus::Online))));

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].stream.as_deref(), Some("console"));
    assert_eq!(sent[0].kind, "start");
    assert_eq!(sent[0].data, Some(json!({"tail": 0})));
}

#[test]
fn start_with_data_overrides_default() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Console.create();

    stream.start(Some(json!({"tail": 50})), &harness.link(true, Some(ServerStatus::Online)));

    assert_eq!(harness.sent()[0].data, Some(json!({"tail": 50})));
}

#[test]
fn start_without_data_keeps_previous_payload() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Console.create();
    let online = Some(ServerStatus::Online);

    stream.start(Some(json!({"tail": 50})), &harness.link(true, online));
    harness.sent();
    stream.on_disconnected();

    stream.start(None, &harness.link(true, online));
    assert_eq!(harness.sent()[0].data, Some(json!({"tail": 50})));

    stream.on_disconnected();
    assert!(stream.try_start(&harness.link(true, online)));
    assert_eq!(harness.sent()[0].data, Some(json!({"tail": 50})));
}

#[test]
fn start_waits_for_ready_socket() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Tick.create();

    assert!(!stream.start(None, &harness.link(false, Some(ServerStatus::Online))));
    assert!(harness.sent().is_empty());
    assert!(stream.wants_start());

    assert!(stream.try_start(&harness.link(true, Some(ServerStatus::Online))));
    assert_eq!(harness.sent()[0].kind, "start");
}

#[test]
fn start_waits_for_eligible_status() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Tick.create();

    assert!(!stream.start(None, &harness.link(true, Some(ServerStatus::Starting))));
    assert!(!stream.try_start(&harness.link(true, None)));
    assert!(harness.sent().is_empty());
}

#[test]
fn started_stream_is_not_started_twice() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Heap.create();
    let link = harness.link(true, Some(ServerStatus::Online));

    stream.start(None, &link);
    stream.on_frame("started", None, &link);
    assert!(stream.is_started());
    assert!(!stream.try_start(&link));
    assert_eq!(harness.sent().len(), 1);
}

#[test]
fn status_change_stops_ineligible_stream() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Stats.create();

    let online = harness.link(true, Some(ServerStatus::Online));
    stream.start(None, &online);
    stream.on_frame("started", None, &online);

    stream.on_status_change(&harness.link(true, Some(ServerStatus::Stopping)));

    let kinds: Vec<String> = harness.sent().into_iter().map(|frame| frame.kind).collect();
    assert_eq!(kinds, vec!["start", "stop"]);
    // Still started until the remote confirms.
    assert!(stream.is_started());
}

#[test]
fn stop_clears_intent_and_sends_stop() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Console.create();
    let link = harness.link(true, Some(ServerStatus::Online));

    stream.start(None, &link);
    stream.on_frame("started", None, &link);
    assert!(stream.stop(&link));
    assert!(!stream.wants_start());

    let sent = harness.sent();
    assert_eq!(sent.last().map(|frame| frame.kind.as_str()), Some("stop"));
}

#[test]
fn stop_of_idle_stream_sends_nothing() {
    let mut harness = Harness::new();
    let mut stream = StreamName::Console.create();

    assert!(!stream.stop(&harness.link(true, Some(ServerStatus::Online))));
    assert!(harness.sent().is_empty());
}

#[test]
fn disconnect_resets_started() {
    let harness = Harness::new();
    let mut stream = StreamName::Tick.create();
    let link = harness.link(true, Some(ServerStatus::Online));

    stream.on_frame("started", None, &link);
    stream.on_disconnected();
    assert!(!stream.is_started());
}

#[test]
fn started_and_stopped_emit_only_specific_events() {
    let harness = Harness::new();
    let mut events = harness.events.subscribe();
    let mut stream = StreamName::Tick.create();
    let link = harness.link(true, Some(ServerStatus::Online));

    stream.on_frame("started", None, &link);
    stream.on_frame("stopped", None, &link);

    assert_eq!(
        events.try_recv().unwrap(),
        Event::Stream { stream: StreamName::Tick, event: StreamEvent::Started }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        Event::Stream { stream: StreamName::Tick, event: StreamEvent::Stopped }
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn send_requires_socket() {
    let (events, _) = broadcast::channel(4);
    let link = Link { socket: None, ready: true, status: Some(ServerStatus::Online), events: &events };
    assert!(!link.send("console", "start", None));
}
