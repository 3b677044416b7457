//! In-memory username cache in front of [`UserRoomDb`], implementing
//! [`jukebox_core::collab::UserDirectory`].
//!
//! Grounded in `UserCache`/`DbManager` from the original backend: reads are
//! served from the cache, writes go through to sqlite and then populate it.

use std::collections::HashMap;
use std::sync::Arc;

use jukebox_core::collab::UserDirectory;
use log::info;
use parking_lot::RwLock;

use crate::db::UserRoomDb;

pub struct CachingUserDirectory {
    db: Arc<UserRoomDb>,
    cache: RwLock<HashMap<u32, (String, u32)>>,
}

impl CachingUserDirectory {
    pub fn new(db: Arc<UserRoomDb>) -> Self {
        Self { db, cache: RwLock::new(HashMap::new()) }
    }
}

impl UserDirectory for CachingUserDirectory {
    fn resolve(&self, user_id: u32) -> Option<(String, u32)> {
        if let Some(entry) = self.cache.read().get(&user_id) {
            return Some(entry.clone());
        }

        let record = self.db.get_user_by_id(user_id).ok().flatten()?;
        let entry = (record.username.clone(), record.room_id);
        self.cache.write().insert(user_id, entry.clone());
        Some(entry)
    }

    fn login(&self, username: &str, room_id: u32) -> anyhow::Result<u32> {
        if let Some(existing) = self.db.get_user_by_name_and_room(username, room_id)? {
            info!("user {username} already logged into room {room_id}, reusing id {}", existing.user_id);
            self.cache
                .write()
                .insert(existing.user_id, (username.to_string(), room_id));
            return Ok(existing.user_id);
        }

        let record = self.db.add_user(username, room_id)?;
        self.cache
            .write()
            .insert(record.user_id, (username.to_string(), room_id));
        Ok(record.user_id)
    }
}
