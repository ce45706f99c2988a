pub mod config;
pub mod schema;
pub mod settings;

use rusqlite::Connection;
use std::path::Path;

pub use config::Config;

pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    schema::initialize(&conn)?;
    Ok(conn)
}
