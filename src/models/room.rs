use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RoomType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub room_type: RoomType,
}
