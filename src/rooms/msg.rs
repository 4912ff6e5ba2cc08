use axum::{debug_handler, extract::State};
use uuid::Uuid;

use crate::{
    extract::{Json, Path},
    messages::{Message, MessagePayload, MessageStore},
    session::Caller,
    AppResult,
};

use super::RoomStore;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_messages(
    State(rooms): State<RoomStore>,
    State(messages): State<MessageStore>,
    caller: Caller,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(messages.list(&rooms, &caller, room_id).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(rooms): State<RoomStore>,
    State(messages): State<MessageStore>,
    caller: Caller,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<MessagePayload>,
) -> AppResult<Json<Message>> {
    Ok(Json(messages.post(&rooms, &caller, room_id, payload).await?))
}
