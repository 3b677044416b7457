//! `rusqlite`-backed storage for users, rooms, and the song history table.
//!
//! Schema and statements are a direct port of the Go backend's sqlite
//! manager, extended with the rooms table the newer `internal/database`
//! variant added.

use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

const CREATE_ROOMS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS rooms (
        room_id     INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        create_date DATETIME NOT NULL,
        last_access DATETIME NOT NULL
    );";

const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL,
        room_id     INTEGER NOT NULL,
        logged_in   BOOLEAN NOT NULL,
        last_access DATETIME NOT NULL,
        FOREIGN KEY (room_id) REFERENCES rooms(room_id)
    );";

const CREATE_SONGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        title      TEXT NOT NULL,
        service    TEXT NOT NULL,
        service_id TEXT NOT NULL,
        date       DATETIME NOT NULL,
        user_id    INTEGER NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(user_id)
    );";

pub struct UserRecord {
    pub user_id: u32,
    pub username: String,
    pub room_id: u32,
}

pub struct RoomRecord {
    pub room_id: u32,
    pub name: String,
}

pub struct UserRoomDb {
    conn: Mutex<Connection>,
}

impl UserRoomDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        conn.execute(CREATE_ROOMS_TABLE, [])?;
        conn.execute(CREATE_USERS_TABLE, [])?;
        conn.execute(CREATE_SONGS_TABLE, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn add_room(&self, name: &str) -> Result<RoomRecord> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO rooms (name, create_date, last_access) VALUES (?1, datetime('now'), datetime('now'))",
            params![name],
        )
        .context("inserting room")?;
        let room_id = conn.last_insert_rowid() as u32;
        Ok(RoomRecord { room_id, name: name.to_string() })
    }

    pub fn get_room_by_name(&self, name: &str) -> Result<Option<RoomRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT room_id, name FROM rooms WHERE name = ?1",
            params![name],
            |row| Ok(RoomRecord { room_id: row.get(0)?, name: row.get(1)? }),
        )
        .optional()
        .context("querying room by name")
    }

    pub fn add_user(&self, username: &str, room_id: u32) -> Result<UserRecord> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (username, room_id, logged_in, last_access) VALUES (?1, ?2, 1, datetime('now'))",
            params![username, room_id],
        )
        .context("inserting user")?;
        let user_id = conn.last_insert_rowid() as u32;
        Ok(UserRecord { user_id, username: username.to_string(), room_id })
    }

    pub fn get_user_by_name_and_room(&self, username: &str, room_id: u32) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT user_id, username, room_id FROM users WHERE username = ?1 AND room_id = ?2",
            params![username, room_id],
            |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    room_id: row.get(2)?,
                })
            },
        )
        .optional()
        .context("querying user by name and room")
    }

    pub fn get_user_by_id(&self, user_id: u32) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT user_id, username, room_id FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    room_id: row.get(2)?,
                })
            },
        )
        .optional()
        .context("querying user by id")
    }

    pub fn update_username(&self, user_id: u32, username: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET username = ?1 WHERE user_id = ?2",
            params![username, user_id],
        )
        .context("updating username")?;
        Ok(())
    }

    /// Record a song submission in the history table and return its
    /// assigned id.
    pub fn add_song(&self, title: &str, service: &str, service_id: &str, user_id: u32) -> Result<u32> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO songs (title, service, service_id, date, user_id) VALUES (?1, ?2, ?3, datetime('now'), ?4)",
            params![title, service, service_id, user_id],
        )
        .context("inserting song")?;
        Ok(conn.last_insert_rowid() as u32)
    }
}
