use crate::room::Room;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use system::RoomId;

pub type RoomHandle = Arc<tokio::sync::Mutex<Room>>;

/// Process-wide room table.
///
/// The table lock is only held for lookups and insert/remove, never across an
/// await. All room-scoped work happens under the room's own lock, so
/// unrelated rooms never contend. Lock order is room first, table second.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned()
    }

    /// Returns the room and whether this call created it. `make` runs while
    /// the table lock is held, so exactly one concurrent caller creates a
    /// given room.
    pub fn get_or_create<F>(&self, room_id: &str, make: F) -> (RoomHandle, bool)
    where
        F: FnOnce() -> Room,
    {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(room) = rooms.get(room_id) {
            return (room.clone(), false);
        }
        let room = Arc::new(tokio::sync::Mutex::new(make()));
        rooms.insert(room_id.to_owned(), room.clone());
        log::info!("Room {} created", room_id);
        (room, true)
    }

    /// Must be called with the room's lock held. Removes and closes the room
    /// when it has no members left.
    pub fn destroy_if_empty(&self, room: &mut Room) -> bool {
        if !room.membership.is_empty() || room.is_closed() {
            return false;
        }
        room.close();
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&room.id);
        log::info!("Room {} destroyed", room.id);
        true
    }

    pub fn len(&self) -> usize {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::Member;

    fn room(id: &str) -> Room {
        Room::new(id.to_owned(), Member::new(1, "Alice"))
    }

    #[test]
    fn it_creates_room_once() {
        let registry = RoomRegistry::new();
        let (first, created) = registry.get_or_create("R1", || room("R1"));
        assert!(created);
        let (second, created) = registry.get_or_create("R1", || panic!("must not create twice"));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn it_removes_room_when_all_members_leave() {
        let registry = RoomRegistry::new();
        let (handle, _) = registry.get_or_create("R1", || room("R1"));
        let mut room = handle.lock().await;

        assert!(!registry.destroy_if_empty(&mut room));
        room.membership.remove(1);
        assert!(registry.destroy_if_empty(&mut room));
        assert!(room.is_closed());
        assert!(registry.get("R1").is_none());
        assert!(registry.is_empty());
    }
}
