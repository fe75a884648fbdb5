use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

/// Token keys accepted when reading, highest priority first. Older front ends
/// stored the token under different names; all of them keep working.
pub const TOKEN_KEYS: [&str; 3] = ["accessToken", "token", "jwt"];

const EXPIRY_KEY: &str = "expiresAt";

/// Durable session state. One row per key in a small SQLite table under the
/// sidecar state directory; the token and its optional expiry are the only
/// things that ever live here.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    pub fn open(state_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(state_dir)?;
        let conn = Connection::open(state_dir.join("campusd.sqlite3"))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The active bearer token, if any, scanning the accepted keys in
    /// priority order.
    pub fn token(&self) -> Option<String> {
        for key in TOKEN_KEYS {
            match self.read(key) {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("session read failed for {}: {}", key, e);
                    return None;
                }
            }
        }
        None
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self.read(EXPIRY_KEY) {
            Ok(Some(raw)) => DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Ok(None) => None,
            Err(e) => {
                log::warn!("session read failed for {}: {}", EXPIRY_KEY, e);
                None
            }
        }
    }

    /// Stores a fresh token under the canonical key and drops any value held
    /// under the legacy keys, so a later read cannot resurrect an old token.
    pub fn set(&self, token: &str, expires_at: Option<DateTime<Utc>>) -> anyhow::Result<()> {
        let conn = self.lock();
        for key in &TOKEN_KEYS[1..] {
            conn.execute("DELETE FROM session_kv WHERE key = ?", [key])?;
        }
        conn.execute(
            "INSERT INTO session_kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (TOKEN_KEYS[0], token),
        )?;
        match expires_at {
            Some(dt) => {
                conn.execute(
                    "INSERT INTO session_kv(key, value) VALUES(?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    (EXPIRY_KEY, dt.to_rfc3339()),
                )?;
            }
            None => {
                conn.execute("DELETE FROM session_kv WHERE key = ?", [EXPIRY_KEY])?;
            }
        }
        Ok(())
    }

    /// Wipes the token under every accepted key plus the expiry.
    pub fn clear(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        for key in TOKEN_KEYS {
            conn.execute("DELETE FROM session_kv WHERE key = ?", [key])?;
        }
        conn.execute("DELETE FROM session_kv WHERE key = ?", [EXPIRY_KEY])?;
        Ok(())
    }

    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.lock();
        let value = conn
            .query_row("SELECT value FROM session_kv WHERE key = ?", [key], |r| {
                r.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    #[cfg(test)]
    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO session_kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_roundtrip_with_expiry() {
        let store = SessionStore::open_in_memory().expect("open store");
        assert_eq!(store.token(), None);

        let expiry = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        store.set("tok-abc", Some(expiry)).expect("set");
        assert_eq!(store.token().as_deref(), Some("tok-abc"));
        assert_eq!(store.expiry(), Some(expiry));

        store.set("tok-def", None).expect("set again");
        assert_eq!(store.token().as_deref(), Some("tok-def"));
        assert_eq!(store.expiry(), None);
    }

    #[test]
    fn legacy_keys_are_read_in_priority_order() {
        let store = SessionStore::open_in_memory().expect("open store");
        store.put("jwt", "from-jwt").expect("seed jwt");
        assert_eq!(store.token().as_deref(), Some("from-jwt"));

        store.put("token", "from-token").expect("seed token");
        assert_eq!(store.token().as_deref(), Some("from-token"));

        store.put("accessToken", "from-access").expect("seed accessToken");
        assert_eq!(store.token().as_deref(), Some("from-access"));
    }

    #[test]
    fn set_drops_legacy_keys() {
        let store = SessionStore::open_in_memory().expect("open store");
        store.put("jwt", "stale").expect("seed jwt");
        store.set("fresh", None).expect("set");

        assert_eq!(store.read("jwt").expect("read jwt"), None);
        assert_eq!(store.token().as_deref(), Some("fresh"));
    }

    #[test]
    fn clear_wipes_every_key() {
        let store = SessionStore::open_in_memory().expect("open store");
        store.put("accessToken", "a").expect("seed");
        store.put("token", "b").expect("seed");
        store.put("jwt", "c").expect("seed");
        store.clear().expect("clear");
        assert_eq!(store.token(), None);
    }
}
