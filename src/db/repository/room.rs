use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_room(conn: &Connection, room: &Room) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO rooms (id, name, room_type) VALUES (?1, ?2, ?3)",
        params![room.id.to_string(), room.name, room.room_type.as_str()],
    )?;
    Ok(())
}

pub fn get_room(conn: &Connection, id: &Uuid) -> Result<Option<Room>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, room_type FROM rooms WHERE id = ?1",
            params![id.to_string()],
            room_tuple,
        )
        .optional()?;
    row.map(room_from_tuple).transpose()
}

pub fn list_rooms(conn: &Connection) -> Result<Vec<Room>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, room_type FROM rooms ORDER BY name")?;
    let rows = stmt.query_map([], room_tuple)?;

    let mut rooms = Vec::new();
    for row in rows {
        rooms.push(room_from_tuple(row?)?);
    }
    Ok(rooms)
}

/// Appointments booked into the room keep their row with `room_id` cleared.
pub fn delete_room(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("room", id));
    }
    Ok(())
}

fn room_tuple(row: &rusqlite::Row<'_>) -> Result<(String, String, String), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn room_from_tuple((id, name, room_type): (String, String, String)) -> Result<Room, DatabaseError> {
    Ok(Room {
        id: parse_uuid("rooms.id", &id)?,
        name,
        room_type: RoomType::from_str(&room_type)?,
    })
}
