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
pub struct Room {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub avatar: String,
    pub owner: String,
    /// Insertion ordered, no duplicates, always contains `owner`.
    pub members: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    pub(crate) version: i64,
}

impl Room {
    pub fn has_member(&self, identity: &str) -> bool {
        self.members.iter().any(|member| member == identity)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoomPayload {
    pub title: String,
    pub description: String,
    pub avatar: String,
}

/// Fields present here replace the stored ones; absent fields are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: String,
    title: String,
    description: String,
    avatar: String,
    owner: String,
    members: String,
    created_at: i64,
    updated_at: i64,
    version: i64,
}

impl TryFrom<RoomRow> for Room {
    type Error = AppError;

    fn try_from(row: RoomRow) -> AppResult<Self> {
        Ok(Room {
            id: Uuid::parse_str(&row.id)?,
            title: row.title,
            description: row.description,
            avatar: row.avatar,
            owner: row.owner,
            members: serde_json::from_str(&row.members)?,
            created_at: db::from_millis(row.created_at)?,
            updated_at: db::from_millis(row.updated_at)?,
            version: row.version,
        })
    }
}

const SELECT_ROOM: &str =
    "SELECT id,title,description,avatar,owner,members,created_at,updated_at,version FROM rooms";

/// Owns the room collection. Every mutation checks ownership first.
#[derive(Clone)]
pub struct RoomStore {
    db_pool: SqlitePool,
}

impl RoomStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Rooms `caller` is a member of, in creation order.
    pub async fn list_for(&self, caller: &Caller) -> AppResult<Vec<Room>> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "{SELECT_ROOM} WHERE EXISTS (SELECT 1 FROM json_each(rooms.members) WHERE json_each.value=?) ORDER BY rowid"
        ))
        .bind(caller.as_str())
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(Room::try_from).collect()
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> AppResult<Room> {
        self.member_room(caller, id, "get a room").await
    }

    pub async fn create(&self, caller: &Caller, payload: RoomPayload) -> AppResult<Room> {
        let now = db::now();
        let room = Room {
            id: Uuid::now_v7(),
            title: payload.title,
            description: payload.description,
            avatar: payload.avatar,
            owner: caller.as_str().to_owned(),
            members: vec![caller.as_str().to_owned()],
            created_at: now,
            updated_at: now,
            version: 0,
        };

        sqlx::query(
            "INSERT INTO rooms (id,title,description,avatar,owner,members,created_at,updated_at,version) values (?,?,?,?,?,?,?,?,?)",
        )
        .bind(room.id.to_string())
        .bind(&room.title)
        .bind(&room.description)
        .bind(&room.avatar)
        .bind(&room.owner)
        .bind(serde_json::to_string(&room.members)?)
        .bind(db::to_millis(room.created_at))
        .bind(db::to_millis(room.updated_at))
        .bind(room.version)
        .execute(&self.db_pool)
        .await?;

        tracing::info!(room_id = %room.id, owner = %caller, "room created");
        Ok(room)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, patch: RoomPatch) -> AppResult<Room> {
        const ACTION: &str = "update a room";

        let mut room = self.require(id, ACTION).await?;
        access::ensure_owner(caller, &room, ACTION)?;

        if let Some(title) = patch.title {
            room.title = title;
        }
        if let Some(description) = patch.description {
            room.description = description;
        }
        if let Some(avatar) = patch.avatar {
            room.avatar = avatar;
        }
        room.updated_at = db::now();

        self.write(&mut room, ACTION).await?;
        tracing::info!(room_id = %id, "room updated");
        Ok(room)
    }

    /// Adding someone already in the room changes nothing and returns the room as stored.
    /// `member` is opaque and stored exactly as given.
    pub async fn add_member(&self, caller: &Caller, id: Uuid, member: &str) -> AppResult<Room> {
        const ACTION: &str = "add member to a room";

        if member.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "couldn't {ACTION} with id={id}. member must not be empty"
            )));
        }

        let mut room = self.require(id, ACTION).await?;
        access::ensure_owner(caller, &room, ACTION)?;

        if room.has_member(member) {
            tracing::debug!(room_id = %id, member, "already a member");
            return Ok(room);
        }

        room.members.push(member.to_owned());
        self.write(&mut room, ACTION).await?;
        tracing::info!(room_id = %id, member, "member added");
        Ok(room)
    }

    /// Removes the room; its messages go with it through the storage cascade.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> AppResult<Room> {
        const ACTION: &str = "delete a room";

        let room = self.require(id, ACTION).await?;
        access::ensure_owner(caller, &room, ACTION)?;

        let result = sqlx::query("DELETE FROM rooms WHERE id=?")
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { action: ACTION, what: "room", id });
        }

        tracing::info!(room_id = %id, "room deleted");
        Ok(room)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(&format!("{SELECT_ROOM} WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.db_pool)
            .await?;

        row.map(Room::try_from).transpose()
    }

    async fn require(&self, id: Uuid, action: &'static str) -> AppResult<Room> {
        self.find(id)
            .await?
            .ok_or(AppError::NotFound { action, what: "room", id })
    }

    /// Writes back the mutable fields if nobody else wrote the room since it was read.
    async fn write(&self, room: &mut Room, action: &'static str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE rooms SET title=?,description=?,avatar=?,members=?,updated_at=?,version=? WHERE id=? AND version=?",
        )
        .bind(&room.title)
        .bind(&room.description)
        .bind(&room.avatar)
        .bind(serde_json::to_string(&room.members)?)
        .bind(db::to_millis(room.updated_at))
        .bind(room.version + 1)
        .bind(room.id.to_string())
        .bind(room.version)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(room_id = %room.id, "stale write rejected");
            return Err(AppError::Conflict { action, id: room.id });
        }

        room.version += 1;
        Ok(())
    }
}

impl RoomAccess for RoomStore {
    async fn member_room(
        &self,
        caller: &Caller,
        room_id: Uuid,
        action: &'static str,
    ) -> AppResult<Room> {
        let room = self.require(room_id, action).await?;
        access::ensure_member(caller, &room, action)?;
        Ok(room)
    }
}
