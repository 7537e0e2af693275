//! Tick stream payloads.

use serde_json::Value;

use super::event::{StreamEvent, TickData};
use super::stream::{Link, StreamName};

pub(crate) const TYPE_TICK: &str = "tick";

/// Highest tick rate the game loop runs at.
const MAX_TPS: f64 = 20.0;

/// Ticks per second from an average tick time in milliseconds, capped at 20
/// and rounded to one decimal.
#[must_use]
pub fn ticks_per_second(average_tick_time: f64) -> f64 {
    ((1000.0 / average_tick_time).min(MAX_TPS) * 10.0).round() / 10.0
}

pub(crate) fn on_data(kind: &str, mut data: Value, link: &Link<'_>) {
    if kind != TYPE_TICK {
        tracing::debug!(kind, "ws: tick ignored frame");
        return;
    }
    let Some(average_tick_time) = data.get("averageTickTime").and_then(Value::as_f64) else {
        tracing::warn!("ws: tick frame without averageTickTime");
        return;
    };

    let tps = ticks_per_second(average_tick_time);
    if let Value::Object(map) = &mut data {
        map.insert("tps".to_owned(), serde_json::json!(tps));
    }
    link.emit_payload(StreamName::Tick, kind, StreamEvent::Tick(TickData { average_tick_time, tps }), data);
}

#[cfg(test)]
#[path = "tick_test.rs"]
mod tests;
