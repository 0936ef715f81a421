use anyhow::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, OpenFlags};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::storage::area::StorageArea;

/// SQLite-based storage database.
///
/// One database file can hold several named areas (for instance `"local"` and
/// `"session"`), each of which is handed out as an independent [`SqliteArea`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(std::time::Duration::from_millis(500))?;
                c.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS storage_items (
                        area TEXT NOT NULL,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                        PRIMARY KEY(area, key)
                    );"
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(std::time::Duration::from_secs(5))
            .build(manager)?;

        Ok(Self { pool })
    }

    /// Returns the area called `name` inside this database.
    pub fn area(&self, name: &str) -> SqliteArea {
        SqliteArea {
            pool: self.pool.clone(),
            area: name.to_string(),
        }
    }
}

/// A single named key/value area backed by [`SqliteStore`].
pub struct SqliteArea {
    pool: Pool<SqliteConnectionManager>,
    area: String,
}

impl SqliteArea {
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

impl StorageArea for SqliteArea {
    fn get_item(&self, key: &str) -> Option<String> {
        let conn = self.conn().ok()?;
        conn.query_row(
            "SELECT value FROM storage_items WHERE area=?1 AND key=?2",
            params![self.area, key],
            |row| row.get::<_, String>(0),
        ).ok()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO storage_items(area,key,value) VALUES (?1,?2,?3)
             ON CONFLICT(area,key) DO UPDATE
             SET value=excluded.value, updated_at=strftime('%s','now')",
            params![self.area, key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM storage_items WHERE area=?1 AND key=?2",
            params![self.area, key],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM storage_items WHERE area=?1",
            params![self.area],
        )?;
        Ok(())
    }

    fn len(&self) -> usize {
        let conn = match self.conn() { Ok(c) => c, Err(_) => return 0 };
        conn.query_row::<u32, _, _>(
            "SELECT COUNT(*) FROM storage_items WHERE area=?1",
            params![self.area],
            |row| row.get(0),
        ).unwrap_or(0) as usize
    }

    fn keys(&self) -> Vec<String> {
        let conn = match self.conn() { Ok(c) => c, Err(_) => return vec![] };
        let mut stmt = match conn.prepare(
            "SELECT key FROM storage_items WHERE area=?1 ORDER BY key",
        ) { Ok(s) => s, Err(_) => return vec![] };

        let rows = match stmt.query_map(
            params![self.area],
            |row| row.get::<_, String>(0),
        ) { Ok(r) => r, Err(_) => return vec![] };

        rows.filter_map(|r| r.ok()).collect()
    }
}
