use axum::{debug_handler, extract::State};

use crate::{extract::Json, session::Caller, AppResult};

use super::{Room, RoomPayload, RoomStore};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create_room(
    State(rooms): State<RoomStore>,
    caller: Caller,
    Json(payload): Json<RoomPayload>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.create(&caller, payload).await?))
}
