use rusqlite::{params, Connection, OptionalExtension};

pub fn get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Store `value` only if `key` has no value yet. Returns `true` if written.
pub fn set_if_absent(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(changed > 0)
}

/// Every stored setting, ordered by key.
pub fn all(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn test_get_missing_is_none() {
        let conn = conn();
        assert_eq!(get(&conn, "shell").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let conn = conn();
        set(&conn, "shell", "/bin/sh").unwrap();
        set(&conn, "shell", "/bin/bash").unwrap();
        assert_eq!(get(&conn, "shell").unwrap().as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn test_set_if_absent_keeps_existing() {
        let conn = conn();
        assert!(set_if_absent(&conn, "theme", "dark").unwrap());
        assert!(!set_if_absent(&conn, "theme", "light").unwrap());
        assert_eq!(get(&conn, "theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_all_sorted_by_key() {
        let conn = conn();
        set(&conn, "theme", "dark").unwrap();
        set(&conn, "shell", "/bin/sh").unwrap();
        let rows = all(&conn).unwrap();
        assert_eq!(
            rows,
            vec![
                ("shell".to_string(), "/bin/sh".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }
}
