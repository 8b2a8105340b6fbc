//! HTTP routes: request/response join, presence, service-to-service
//! sounds, leave, the event-stream subscription and the leaderboard.
//!
//! Every room-scoped route takes `?room=<name>` and falls back to the
//! configured default room.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use honk_protocol::{Account, AccountId, Codec, ProtocolError, RoomEvent};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::leaderboard::{RecordRequest, SortedReactions};
use crate::server::ServerState;
use crate::HonkError;

#[derive(Debug, Deserialize)]
struct RoomQuery {
    room: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeQuery {
    room: Option<String>,
    #[serde(rename = "accountId")]
    account_id: String,
    #[serde(rename = "accountName")]
    account_name: String,
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    name: String,
}

#[derive(Debug, Serialize)]
struct JoinResponse {
    account: Account,
}

#[derive(Debug, Serialize)]
struct WhoThere {
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct LeaveRequest {
    #[serde(rename = "accountId")]
    account_id: AccountId,
}

/// Build the application routes.
pub(crate) fn build_routes(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/join", post(join))
        .route("/who-there", get(who_there))
        .route("/honk", post(honk))
        .route("/leave", post(leave))
        .route("/subscribe", get(subscribe))
        .route("/leaderboard", get(leaderboard).post(record_reaction))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn join(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<JoinResponse>), HonkError> {
    let request: JoinRequest = state.codec.decode(&body)?;
    let room = state.room(query.room.as_deref()).await;
    let account = room.join(request.name).await?;
    Ok((StatusCode::CREATED, Json(JoinResponse { account })))
}

async fn who_there(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<WhoThere>, HonkError> {
    let room = state.room(query.room.as_deref()).await;
    let accounts = room.presence().await?;
    Ok(Json(WhoThere { accounts }))
}

async fn honk(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
    body: Bytes,
) -> Result<&'static str, HonkError> {
    let event: RoomEvent = state.codec.decode(&body)?;
    let RoomEvent::Sound { name, from } = event else {
        return Err(ProtocolError::InvalidMessage(
            "only sound events can be posted".to_string(),
        )
        .into());
    };
    let room = state.room(query.room.as_deref()).await;
    room.sound(name, from).await?;
    Ok("OK")
}

async fn leave(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
    body: Bytes,
) -> Result<StatusCode, HonkError> {
    let request: LeaveRequest = state.codec.decode(&body)?;
    let room = state.room(query.room.as_deref()).await;
    room.leave(request.account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Streams room events as Server-Sent Events until the client goes away,
/// which ends the subscription and leaves the room.
async fn subscribe(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SubscribeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HonkError> {
    let account = Account {
        id: AccountId::new(query.account_id),
        name: query.account_name,
    };
    let room = state.room(query.room.as_deref()).await;
    let subscription = room.subscribe(account).await?;

    let events = subscription.into_stream().filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(error) => {
                tracing::warn!(%error, "dropping unencodable event");
                None
            }
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn leaderboard(
    State(state): State<Arc<ServerState>>,
) -> Json<SortedReactions> {
    Json(state.leaderboard.sorted().await)
}

async fn record_reaction(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HonkError> {
    // Any string counts, including the empty one; only a missing name is
    // rejected, by the decoder.
    let request: RecordRequest = state.codec.decode(&body)?;
    state.leaderboard.increment(&request.name).await;
    Ok((StatusCode::CREATED, Json(state.leaderboard.sorted().await)))
}
