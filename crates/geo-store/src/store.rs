use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use geo_core::KeyValueStore;

use crate::error::Result;
use crate::schema;

/// SQLite-backed preference store. One database per profile.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!("opened store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> geo_core::error::Result<Option<String>> {
        Ok(self.get_preference(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> geo_core::error::Result<()> {
        Ok(self.set_preference(key, value)?)
    }
}
