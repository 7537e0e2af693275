//! Stats and heap stream payloads.
//!
//! Both streams forward every payload. Known shapes get a typed event; any
//! other payload is published as [`StreamEvent::Data`].

use serde_json::Value;

use super::event::{HeapData, StatsData, StreamEvent};
use super::stream::{Link, StreamName};

pub(crate) fn on_data(stream: StreamName, kind: &str, data: Value, link: &Link<'_>) {
    let event = match stream {
        StreamName::Stats => decode::<StatsData>(&data).map(StreamEvent::Stats),
        StreamName::Heap => decode::<HeapData>(&data).map(StreamEvent::Heap),
        StreamName::Console | StreamName::Tick | StreamName::Management => None,
    }
    .unwrap_or_else(|| StreamEvent::Data { kind: kind.to_owned(), data: data.clone() });

    link.emit_payload(stream, kind, event, data);
}

fn decode<T: serde::de::DeserializeOwned>(data: &Value) -> Option<T> {
    T::deserialize(data).ok()
}

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod tests;
