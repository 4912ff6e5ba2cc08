use axum::{debug_handler, extract::State};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    extract::{Json, Path},
    session::Caller,
    AppResult,
};

use super::{Room, RoomPatch, RoomStore};

#[derive(Deserialize)]
pub(crate) struct AddMemberPayload {
    member: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(
    State(rooms): State<RoomStore>,
    caller: Caller,
) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(rooms.list_for(&caller).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_room(
    State(rooms): State<RoomStore>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.get(&caller, id).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_room(
    State(rooms): State<RoomStore>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<RoomPatch>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.update(&caller, id, patch).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn add_member(
    State(rooms): State<RoomStore>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(AddMemberPayload { member }): Json<AddMemberPayload>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.add_member(&caller, id, &member).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_room(
    State(rooms): State<RoomStore>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Room>> {
    Ok(Json(rooms.delete(&caller, id).await?))
}
