use super::*;
use crate::status::ServerStatus;
use crate::ws::{Event, EventEnvelope, MemoryUsage};
use serde_json::json;
use tokio::sync::broadcast;

fn collect(stream: StreamName, kind: &str, data: Value) -> Vec<Event> {
    let (events, mut rx) = broadcast::channel(16);
    let link = Link { socket: None, ready: true, status: Some(ServerStatus::Online), events: &events };
    on_data(stream, kind, data, &link);

    let mut published = Vec::new();
    while let Ok(event) = rx.try_recv() {
        published.push(event);
    }
    published
}

#[test]
fn stats_payload_is_typed_and_enveloped() {
    let data = json!({"memory": {"percent": 42.5, "usage": 1_073_741_824.0}});
    let published = collect(StreamName::Stats, "stats", data.clone());

    assert_eq!(
        published,
        vec![
            Event::Stream {
                stream: StreamName::Stats,
                event: StreamEvent::Stats(StatsData {
                    memory: MemoryUsage { percent: 42.5, usage: 1_073_741_824.0 },
                }),
            },
            Event::Envelope(EventEnvelope { stream: StreamName::Stats, kind: "stats".to_owned(), data }),
        ]
    );
}

#[test]
fn heap_payload_is_typed() {
    let published = collect(StreamName::Heap, "heap", json!({"usage": 512.0}));
    assert_eq!(
        published[0],
        Event::Stream { stream: StreamName::Heap, event: StreamEvent::Heap(HeapData { usage: 512.0 }) }
    );
}

#[test]
fn unknown_shape_falls_back_to_raw_data() {
    let published = collect(StreamName::Heap, "heap", json!({"unexpected": true}));
    assert_eq!(
        published[0],
        Event::Stream {
            stream: StreamName::Heap,
            event: StreamEvent::Data { kind: "heap".to_owned(), data: json!({"unexpected": true}) },
        }
    );
    assert_eq!(published.len(), 2);
}
