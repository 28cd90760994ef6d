//! Connection to the favorites database.
//!
//! [`Database`] is what [`SqliteFavoritesStore`](crate::store::SqliteFavoritesStore)
//! sits on. Opening one always brings the schema to
//! [`CURRENT_SCHEMA_VERSION`](super::migrations::CURRENT_SCHEMA_VERSION),
//! including files written by older releases of the browser.

use std::path::Path;

use log::debug;
use rusqlite::Connection;

use super::migrations;

/// An open favorites database with an up-to-date schema.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the favorites file at `path`, creating it and its directories if
    /// needed, and upgrades the schema.
    ///
    /// The upgrade runs in one transaction: a file that cannot be upgraded is
    /// left exactly as it was and the error is returned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                // A failure here surfaces as a CANTOPEN from `Connection::open`.
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let conn = Connection::open(path.as_ref())?;
        debug!("favorites: opened database {}", path.as_ref().display());
        Self::upgraded(conn)
    }

    /// A private database that disappears with the process.
    ///
    /// Backs the tests, and the app when the favorites file cannot be opened.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::upgraded(Connection::open_in_memory()?)
    }

    fn upgraded(mut conn: Connection) -> Result<Self, rusqlite::Error> {
        let tx = conn.transaction()?;
        migrations::run_all(&tx)?;
        tx.commit()?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access, needed to open transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
