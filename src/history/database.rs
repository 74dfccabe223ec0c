use super::{PersistentStore, StoreError};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::Path;

pub struct HistoryDatabase {
    conn: Connection,
}

impl HistoryDatabase {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_tables()?;
        Ok(db)
    }

    fn initialize_tables(&self) -> Result<(), StoreError> {
        // One row per distinct track, keyed by its metadata fingerprint
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                file_hash TEXT PRIMARY KEY,
                artist_name TEXT NOT NULL,
                album_name TEXT NOT NULL,
                track_name TEXT NOT NULL
            )",
            [],
        )?;

        // One row per finished (or late-skipped) play
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                history_id INTEGER PRIMARY KEY,
                file_hash TEXT NOT NULL REFERENCES files(file_hash),
                date TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_file_hash ON history(file_hash)",
            [],
        )?;

        Ok(())
    }

    #[cfg(test)]
    pub fn play_count(&self, fingerprint: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE file_hash = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    #[cfg(test)]
    pub fn file_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl PersistentStore for HistoryDatabase {
    fn record_file(
        &mut self,
        fingerprint: &str,
        artist: &str,
        album: &str,
        track: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO files (file_hash, artist_name, album_name, track_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![fingerprint, artist, album, track],
        )?;
        Ok(())
    }

    fn record_history(
        &mut self,
        fingerprint: &str,
        played_at: DateTime<Local>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO history (file_hash, date) VALUES (?1, ?2)",
            params![fingerprint, played_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
