//! Chat routes — submit, poll, and stream.
//!
//! DESIGN
//! ======
//! Handlers only translate HTTP to service calls:
//! - `POST /send` decodes `message=<urlencoded>` and hands it to
//!   `services::command::submit`
//! - `GET /messages` returns the joined snapshot
//! - `GET /stream` runs `services::notifier::stream_updates` against an SSE
//!   response body
//!
//! The SSE body is fed through a one-slot channel. When the client goes away
//! the receiver is dropped and the subscriber task exits, whether it was
//! parked on the change signal or mid-delivery. Writers are never affected.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{Form, FromRef, FromRequest, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::identity::ClientKey;
use crate::services::command::{self, Dispatched};
use crate::services::message_log::Snapshot;
use crate::services::notifier::{self, SinkError, UpdateSink};
use crate::state::AppState;

/// Worst case for one character in a form body: four UTF-8 bytes, each
/// written as `%XX`.
const MAX_ENCODED_BYTES_PER_CHAR: usize = 12;

/// Room for the `message=` key and any extra form fields.
const SUBMIT_BODY_SLACK_BYTES: usize = 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("error reading request body")]
    Body,
    #[error("error parsing request body: bad percent-encoding")]
    InvalidEncoding,
    #[error("error parsing request body: {0}")]
    Malformed(String),
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected submit");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

// =============================================================================
// SUBMIT
// =============================================================================

#[derive(Deserialize)]
struct SendForm {
    message: String,
}

/// Decoded `message` field of a submit body.
///
/// Only as many bytes as can encode `max_message_len` characters are read.
/// Anything past that is dropped unread, so an oversized message is cut
/// rather than refused; `submit` then caps it on a char boundary.
pub struct SubmitBody(pub String);

impl<S> FromRequest<S> for SubmitBody
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SubmitError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limit = submit_read_limit(AppState::from_ref(state).config.max_message_len);
        let (mut parts, body) = req.into_parts();
        let bytes = read_capped(body, limit).await?;
        if !percent_escapes_valid(&bytes) {
            return Err(SubmitError::InvalidEncoding);
        }

        // The body is always form-encoded, whatever the client labelled it.
        // Plain `fetch` sends `text/plain` and curl often sends nothing.
        parts
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        let req = Request::from_parts(parts, Body::from(bytes));
        let Form(form) = Form::<SendForm>::from_request(req, state)
            .await
            .map_err(|rejection| SubmitError::Malformed(rejection.body_text()))?;
        Ok(Self(form.message))
    }
}

fn submit_read_limit(max_message_len: usize) -> usize {
    max_message_len
        .saturating_mul(MAX_ENCODED_BYTES_PER_CHAR)
        .saturating_add(SUBMIT_BODY_SLACK_BYTES)
}

/// Collect at most `limit` bytes of `body`, discarding the rest.
async fn read_capped(body: Body, limit: usize) -> Result<Bytes, SubmitError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| SubmitError::Body)?;
        let room = limit - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    if truncated {
        drop_partial_escape(&mut buf);
        debug!(limit, "submit body truncated");
    }
    Ok(Bytes::from(buf))
}

/// A cut can land inside a `%XX` escape; drop the dangling fragment.
fn drop_partial_escape(buf: &mut Vec<u8>) {
    if let Some(pos) = buf.iter().rev().take(2).position(|&b| b == b'%') {
        buf.truncate(buf.len() - 1 - pos);
    }
}

/// `POST /send` — post a chat line or a slash-command.
///
/// Responds with the rendered record when one was appended, empty otherwise.
pub async fn send(
    State(state): State<AppState>,
    ClientKey(identity): ClientKey,
    SubmitBody(message): SubmitBody,
) -> Response {
    match command::submit(&state, &identity, &message) {
        Dispatched::Appended(record) => Html(record).into_response(),
        _ => StatusCode::OK.into_response(),
    }
}

/// Every `%` must be followed by two hex digits.
fn percent_escapes_valid(bytes: &Bytes) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

// =============================================================================
// POLL
// =============================================================================

/// `GET /messages` — the whole log as one HTML fragment.
pub async fn messages(State(state): State<AppState>) -> Html<String> {
    Html(state.log.snapshot().joined())
}

// =============================================================================
// STREAM
// =============================================================================

/// Adapts the notifier's sink to an SSE response body.
struct SseSink {
    tx: mpsc::Sender<Event>,
}

#[async_trait]
impl UpdateSink for SseSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.tx
            .send(Event::default().data(sse_payload(snapshot)))
            .await
            .map_err(|_| SinkError::Closed)
    }
}

/// SSE `data:` fields cannot span lines.
fn sse_payload(snapshot: &Snapshot) -> String {
    snapshot.joined().replace(['\r', '\n'], " ")
}

/// `GET /stream` — push the full log on connect and after every change.
pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Event>(1);
    let closed = tx.clone();
    let log = state.log.clone();

    tokio::spawn(async move {
        tokio::select! {
            end = notifier::stream_updates(log, SseSink { tx }) => {
                debug!(
                    subscriber_id = %end.subscriber_id,
                    delivered = end.delivered,
                    last_version = ?end.last_version,
                    reason = %end.reason,
                    "sse stream ended"
                );
            }
            () = closed.closed() => {
                debug!("sse client disconnected while idle");
            }
        }
    });

    let events = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
