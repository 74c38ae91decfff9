//! Viewer push transport.
//!
//! `GET /api/rooms/:room_id/events` opens a long-lived SSE stream: one
//! `snapshot` record first, then the room's typed JSON events in publish
//! order. There is no cross-reconnect buffering; a client that detects a seq
//! gap reconnects and resyncs from a fresh snapshot.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

use crate::http::{credentials_from, AppResult, AppState};
use stagecast_core::models::{ConnectionId, RoomId};
use stagecast_core::service::EventIngress;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Unregisters the subscriber the moment the stream is dropped, so viewer
/// counts and code connection slots are released synchronously with the
/// socket going away.
struct DisconnectGuard {
    ingress: Arc<EventIngress>,
    connection_id: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.ingress.disconnect(&self.connection_id);
    }
}

/// Open a push stream for a room
///
/// GET /api/rooms/:room_id/events
pub async fn room_events(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let room_id = RoomId::from_string(room_id);
    let credentials = credentials_from(&headers, query.code, query.name)?;
    let (connection_id, snapshot, rx) = state.ingress.connect(&room_id, &credentials)?;

    let guard = DisconnectGuard {
        ingress: Arc::clone(&state.ingress),
        connection_id,
    };

    // Serialize the snapshot up front so a failure surfaces as an HTTP
    // error instead of a broken stream.
    let snapshot_json = serde_json::to_string(&snapshot)
        .map_err(|e| crate::http::AppError::internal_server_error(e.to_string()))?;
    let snapshot_event = Event::default().event("snapshot").data(snapshot_json);

    let deltas = ReceiverStream::new(rx).map(move |room_event| {
        // The guard rides inside the closure; dropping the stream drops it.
        let _keep_alive = &guard;
        let event = match serde_json::to_string(&room_event) {
            Ok(json) => Event::default().data(json),
            Err(e) => {
                tracing::error!("Failed to serialize room event: {}", e);
                Event::default().comment("serialization error")
            }
        };
        Ok(event)
    });

    let stream = stream::once(async move { Ok(snapshot_event) }).chain(deltas);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
