use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    access::{self, RoomAccess},
    db,
    session::Caller,
    AppError, AppResult,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub message: String,
    pub sender: String,
    pub room_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    message: String,
    sender: String,
    room_id: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Self> {
        Ok(Message {
            id: Uuid::parse_str(&row.id)?,
            message: row.message,
            sender: row.sender,
            room_id: Uuid::parse_str(&row.room_id)?,
            created_at: db::from_millis(row.created_at)?,
        })
    }
}

/// Owns the message collection.
///
/// Room-scoped operations resolve the room through a [`RoomAccess`] before
/// reading or writing anything here.
#[derive(Clone)]
pub struct MessageStore {
    db_pool: SqlitePool,
}

impl MessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn list(
        &self,
        rooms: &impl RoomAccess,
        caller: &Caller,
        room_id: Uuid,
    ) -> AppResult<Vec<Message>> {
        rooms.member_room(caller, room_id, "list messages of a room").await?;

        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id,message,sender,room_id,created_at FROM messages WHERE room_id=? ORDER BY rowid",
        )
        .bind(room_id.to_string())
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    pub async fn post(
        &self,
        rooms: &impl RoomAccess,
        caller: &Caller,
        room_id: Uuid,
        payload: MessagePayload,
    ) -> AppResult<Message> {
        const POST: &str = "send message to a room";

        rooms.member_room(caller, room_id, POST).await?;

        let message = Message {
            id: Uuid::now_v7(),
            message: payload.message,
            sender: caller.as_str().to_owned(),
            room_id,
            created_at: db::now(),
        };

        sqlx::query("INSERT INTO messages (id,room_id,sender,message,created_at) values (?,?,?,?,?)")
            .bind(message.id.to_string())
            .bind(message.room_id.to_string())
            .bind(&message.sender)
            .bind(&message.message)
            .bind(db::to_millis(message.created_at))
            .execute(&self.db_pool)
            .await
            .map_err(|err| match err {
                // room deleted after the membership check
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound { action: POST, what: "room", id: room_id }
                }
                err => err.into(),
            })?;

        tracing::info!(message_id = %message.id, %room_id, sender = %caller, "message posted");
        Ok(message)
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> AppResult<Message> {
        const ACTION: &str = "delete a message";

        let row: Option<MessageRow> =
            sqlx::query_as("SELECT id,message,sender,room_id,created_at FROM messages WHERE id=?")
                .bind(id.to_string())
                .fetch_optional(&self.db_pool)
                .await?;
        let Some(row) = row else {
            return Err(AppError::NotFound { action: ACTION, what: "message", id });
        };

        let message = Message::try_from(row)?;
        access::ensure_sender(caller, &message, ACTION)?;

        let result = sqlx::query("DELETE FROM messages WHERE id=?")
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { action: ACTION, what: "message", id });
        }

        tracing::info!(message_id = %id, "message deleted");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::{Room, RoomPayload, RoomStore};

    async fn stores() -> (RoomStore, MessageStore) {
        let db_pool = db::memory().await.unwrap();
        (RoomStore::new(db_pool.clone()), MessageStore::new(db_pool))
    }

    async fn team_room(rooms: &RoomStore) -> Room {
        let alice = Caller::new("alice");
        let room = rooms
            .create(
                &alice,
                RoomPayload {
                    title: "Team".to_owned(),
                    description: "d".to_owned(),
                    avatar: "a".to_owned(),
                },
            )
            .await
            .unwrap();
        rooms.add_member(&alice, room.id, "bob").await.unwrap()
    }

    fn text(message: &str) -> MessagePayload {
        MessagePayload { message: message.to_owned() }
    }

    #[tokio::test]
    async fn members_post_and_list_in_order() {
        let (rooms, messages) = stores().await;
        let room = team_room(&rooms).await;
        let bob = Caller::new("bob");

        let first = messages.post(&rooms, &bob, room.id, text("hi")).await.unwrap();
        let second = messages
            .post(&rooms, &Caller::new("alice"), room.id, text("hello"))
            .await
            .unwrap();
        assert_eq!(first.sender, "bob");
        assert_eq!(first.room_id, room.id);
        assert_ne!(first.id, second.id);

        let listed = messages.list(&rooms, &bob, room.id).await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn non_members_cannot_post_or_list() {
        let (rooms, messages) = stores().await;
        let room = team_room(&rooms).await;
        let carol = Caller::new("carol");

        assert!(matches!(
            messages.post(&rooms, &carol, room.id, text("let me in")).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            messages.list(&rooms, &carol, room.id).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(messages.list(&rooms, &Caller::new("alice"), room.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_room_is_not_found() {
        let (rooms, messages) = stores().await;
        let ghost = Uuid::now_v7();

        assert!(matches!(
            messages.post(&rooms, &Caller::new("alice"), ghost, text("hi")).await,
            Err(AppError::NotFound { what: "room", .. })
        ));
        assert!(matches!(
            messages.list(&rooms, &Caller::new("alice"), ghost).await,
            Err(AppError::NotFound { what: "room", .. })
        ));
    }

    #[tokio::test]
    async fn only_the_sender_deletes() {
        let (rooms, messages) = stores().await;
        let room = team_room(&rooms).await;
        let bob = Caller::new("bob");

        let msg = messages.post(&rooms, &bob, room.id, text("hi")).await.unwrap();
        assert!(matches!(
            messages.delete(&Caller::new("alice"), msg.id).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert_eq!(messages.delete(&bob, msg.id).await.unwrap(), msg);
        assert!(matches!(
            messages.delete(&bob, msg.id).await,
            Err(AppError::NotFound { what: "message", .. })
        ));
    }

    /// Hands out a room resolved earlier, whatever happened to it since.
    struct Resolved(Room);

    impl RoomAccess for Resolved {
        async fn member_room(&self, _: &Caller, _: Uuid, _: &'static str) -> AppResult<Room> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn posting_into_a_room_deleted_after_the_check_is_not_found() {
        let (rooms, messages) = stores().await;
        let room = team_room(&rooms).await;
        let resolved = Resolved(room.clone());
        rooms.delete(&Caller::new("alice"), room.id).await.unwrap();

        let result = messages.post(&resolved, &Caller::new("bob"), room.id, text("hi")).await;
        assert!(matches!(
            result,
            Err(AppError::NotFound { what: "room", id, .. }) if id == room.id
        ));
    }

    #[tokio::test]
    async fn deleting_a_room_drops_its_messages() {
        let (rooms, messages) = stores().await;
        let room = team_room(&rooms).await;
        let bob = Caller::new("bob");

        let msg = messages.post(&rooms, &bob, room.id, text("hi")).await.unwrap();
        rooms.delete(&Caller::new("alice"), room.id).await.unwrap();

        assert!(matches!(
            messages.delete(&bob, msg.id).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
