//! Ownership and membership checks shared by both stores.
//!
//! Every check returns `Unauthorized` on failure; callers propagate it with `?`
//! so nothing after a failed check can run.

use uuid::Uuid;

use crate::{messages::Message, rooms::Room, session::Caller, AppError, AppResult};

/// Room lookup capability needed by anything scoped to a room.
pub trait RoomAccess {
    /// Resolves `room_id` and returns the room only if `caller` is a member.
    ///
    /// Fails with `NotFound` when the room is absent, `Unauthorized` when the
    /// caller is not in its member list.
    fn member_room(
        &self,
        caller: &Caller,
        room_id: Uuid,
        action: &'static str,
    ) -> impl Future<Output = AppResult<Room>> + Send;
}

pub fn ensure_owner(caller: &Caller, room: &Room, action: &'static str) -> AppResult<()> {
    if room.owner == caller.as_str() {
        Ok(())
    } else {
        tracing::debug!(room_id = %room.id, %caller, "{action}: caller is not the owner");
        Err(AppError::Unauthorized { action, id: room.id })
    }
}

pub fn ensure_member(caller: &Caller, room: &Room, action: &'static str) -> AppResult<()> {
    if room.has_member(caller.as_str()) {
        Ok(())
    } else {
        tracing::debug!(room_id = %room.id, %caller, "{action}: caller is not a member");
        Err(AppError::Unauthorized { action, id: room.id })
    }
}

pub fn ensure_sender(caller: &Caller, message: &Message, action: &'static str) -> AppResult<()> {
    if message.sender == caller.as_str() {
        Ok(())
    } else {
        tracing::debug!(message_id = %message.id, %caller, "{action}: caller is not the sender");
        Err(AppError::Unauthorized { action, id: message.id })
    }
}
