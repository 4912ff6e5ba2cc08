mod msg;
mod new;
mod room;
mod store;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use store::{Room, RoomPatch, RoomPayload, RoomStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(room::list_rooms).post(new::create_room))
        .route(
            "/rooms/{id}",
            get(room::get_room)
                .put(room::update_room)
                .delete(room::delete_room),
        )
        .route("/rooms/{id}/add", post(room::add_member))
        .route("/rooms/{id}/messages", get(msg::list_messages))
        .route("/rooms/{id}/message", post(msg::post_message))
}
