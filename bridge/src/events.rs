use futures_util::StreamExt;
use rlgl_common::game::CubeId;
use rlgl_common::robot::RobotEvent;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::BridgeError;

/// One line of the robot's `/events` stream.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Tapped {
        cube: CubeId,
        #[serde(default)]
        tap_count: u32,
    },
    #[serde(other)]
    Other,
}

/// Follow the robot's newline-delimited JSON event stream and forward cube taps.
/// Reconnects with exponential backoff; returns once the receiver is gone.
pub async fn run_event_stream(
    client: reqwest::Client,
    events_url: String,
    events: mpsc::Sender<RobotEvent>,
) {
    let mut backoff = Duration::from_secs(2);
    let max_backoff = Duration::from_secs(30);

    loop {
        info!(url = events_url, "connecting to robot event stream");
        match consume_events(&client, &events_url, &events).await {
            Ok(()) => {
                if events.is_closed() {
                    debug!("event receiver dropped, stopping event stream");
                    return;
                }
                info!("event stream ended cleanly, reconnecting");
                backoff = Duration::from_secs(2);
            }
            Err(e) => {
                error!(error = %e, "event stream error, reconnecting in {:?}", backoff);
            }
        }
        if events.is_closed() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(max_backoff);
    }
}

async fn consume_events(
    client: &reqwest::Client,
    url: &str,
    events: &mpsc::Sender<RobotEvent>,
) -> Result<(), BridgeError> {
    let response = client.get(url).send().await.map_err(BridgeError::HttpConnect)?;

    if !response.status().is_success() {
        return Err(BridgeError::HttpStatus(response.status().as_u16()));
    }

    let mut byte_stream = response.bytes_stream();
    let mut pending: Vec<u8> = Vec::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(BridgeError::HttpStream)?;
        pending.extend_from_slice(&chunk);

        while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=newline).collect();
            let Some(event) = parse_line(&line) else {
                continue;
            };
            // Taps are never dropped: wait for room in the queue.
            if events.send(event).await.is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

fn parse_line(line: &[u8]) -> Option<RobotEvent> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<WireEvent>(text) {
        Ok(WireEvent::Tapped { cube, tap_count }) => {
            debug!(%cube, tap_count, "cube tapped");
            Some(RobotEvent::Tapped { cube })
        }
        Ok(WireEvent::Other) => None,
        Err(e) => {
            warn!(error = %e, line = text, "malformed robot event, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tap() {
        let event = parse_line(b"{\"type\":\"tapped\",\"cube\":\"cube-1\",\"tap_count\":2}\n");
        match event {
            Some(RobotEvent::Tapped { cube }) => assert_eq!(cube, CubeId::new("cube-1")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn tap_count_is_optional() {
        assert!(matches!(
            parse_line(b"{\"type\":\"tapped\",\"cube\":\"c\"}"),
            Some(RobotEvent::Tapped { .. })
        ));
    }

    #[test]
    fn ignores_other_event_types() {
        assert!(parse_line(b"{\"type\":\"object_moved\",\"cube\":\"c\"}").is_none());
    }

    #[test]
    fn ignores_blank_and_malformed_lines() {
        assert!(parse_line(b"\r\n").is_none());
        assert!(parse_line(b"not json").is_none());
    }
}
