use super::*;
use exaroton::ServerInfo;
use exaroton::ws::{EventEnvelope, StreamName, TickData};

#[test]
fn flags_override_environment_lookup() {
    let cli = Cli::try_parse_from(["exaroton-cli", "--token", "flag-token", "--base-url", "http://localhost/v1/", "servers"])
        .expect("arguments should parse");

    assert_eq!(config_lookup(&cli, ENV_API_TOKEN).as_deref(), Some("flag-token"));
    assert_eq!(config_lookup(&cli, ENV_BASE_URL).as_deref(), Some("http://localhost/v1/"));
}

#[test]
fn watch_collects_repeated_streams() {
    let cli = Cli::try_parse_from([
        "exaroton-cli", "--token", "t", "watch", "abc", "--stream", "tick", "--stream", "heap", "--tail", "10",
    ])
    .expect("arguments should parse");

    let Command::Watch(args) = cli.command else {
        panic!("expected watch command");
    };
    assert_eq!(args.server, "abc");
    assert_eq!(args.streams, vec!["tick".to_owned(), "heap".to_owned()]);
    assert_eq!(args.tail, Some(10));
}

#[test]
fn command_joins_trailing_words() {
    let cli = Cli::try_parse_from(["exaroton-cli", "--token", "t", "command", "abc", "say", "hello", "world"])
        .expect("arguments should parse");

    let Command::Command { command, .. } = cli.command else {
        panic!("expected command subcommand");
    };
    assert_eq!(command.join(" "), "say hello world");
}

#[test]
fn event_line_renders_lifecycle_and_envelopes() {
    assert_eq!(event_line(&Event::Ready), Some(json!({"event": "ready"})));
    assert_eq!(
        event_line(&Event::Error("refused".to_owned())),
        Some(json!({"event": "error", "message": "refused"}))
    );
    assert_eq!(
        event_line(&Event::Stream { stream: StreamName::Tick, event: StreamEvent::Started }),
        Some(json!({"event": "started", "stream": "tick"}))
    );

    let envelope = EventEnvelope {
        stream: StreamName::Tick,
        kind: "tick".to_owned(),
        data: json!({"averageTickTime": 50.0, "tps": 20.0}),
    };
    assert_eq!(
        event_line(&Event::Envelope(envelope)),
        Some(json!({"event": "event", "stream": "tick", "type": "tick", "data": {"averageTickTime": 50.0, "tps": 20.0}}))
    );
}

#[test]
fn event_line_skips_typed_payloads() {
    let tick = TickData { average_tick_time: 50.0, tps: 20.0 };
    let event = Event::Stream { stream: StreamName::Tick, event: StreamEvent::Tick(tick) };
    assert_eq!(event_line(&event), None);
}

#[test]
fn event_line_includes_status_snapshot() {
    let server = ServerInfo { id: "abc".to_owned(), ..ServerInfo::default() };
    let line = event_line(&Event::Status(Box::new(server))).expect("status should render");
    assert_eq!(line["event"], "status");
    assert_eq!(line["server"]["id"], "abc");
}
