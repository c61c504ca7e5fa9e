use rusqlite::{OptionalExtension, Result as SqlResult, params};

use super::database::{SharedDatabase, lock};

/// What survives a restart of a signed-in session.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub uid: String,
    pub email: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for CachedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Single-row cache of the last signed-in identity.
///
/// Calls are synchronous and touch one row, once per sign-in, renewal or
/// sign-out, so callers on the runtime invoke them inline.
pub struct SessionCache {
    db: SharedDatabase,
}

impl SessionCache {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn load(&self) -> SqlResult<Option<CachedSession>> {
        let db = lock(&self.db);
        db.connection()
            .query_row(
                "SELECT uid, email, refresh_token FROM session_cache WHERE id = 1",
                [],
                |row| {
                    Ok(CachedSession {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        refresh_token: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn save(&self, session: &CachedSession) -> SqlResult<()> {
        let db = lock(&self.db);
        db.connection().execute(
            "INSERT OR REPLACE INTO session_cache (id, uid, email, refresh_token, updated_at)
             VALUES (1, ?1, ?2, ?3, strftime('%s', 'now'))",
            params![session.uid, session.email, session.refresh_token],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> SqlResult<()> {
        let db = lock(&self.db);
        db.connection()
            .execute("DELETE FROM session_cache WHERE id = 1", [])?;
        Ok(())
    }
}
