use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tether_core::{
    Link, LinkError, LinkStore, NewLink, OwnerId, Principal, ReadLinkStore, Result, ReusePolicy,
    ShortCode,
};
use tracing::debug;

/// MySQL implementation of the link store contract.
///
/// Uniqueness is enforced by the `uk_links_short_code` key, so two racing
/// inserts for one code resolve to one row and one `DuplicateCode`.
/// Deleting a link removes its row and records the code in
/// `retired_codes` in the same transaction. Timestamps are stored as
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MySqlLinkStore {
    pool: MySqlPool,
    reuse: ReusePolicy,
}

impl MySqlLinkStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            reuse: ReusePolicy::default(),
        }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    pub fn with_reuse_policy(mut self, reuse: ReusePolicy) -> Self {
        self.reuse = reuse;
        self
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LinkError::Storage(format!("migration failed: {e}")))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn retired_blocks(&self, retired_at: Option<i64>, now: Timestamp) -> Result<bool> {
        match retired_at {
            None => Ok(false),
            Some(millis) => Ok(!self.reuse.allows_reuse(parse_millis(millis)?, now)),
        }
    }
}

fn parse_millis(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis)
        .map_err(|e| LinkError::Storage(format!("invalid timestamp '{millis}': {e}")))
}

fn link_from_row(row: &MySqlRow) -> Result<Link> {
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let target_url: String = row.try_get("target_url").map_err(map_sqlx_error)?;
    let owner: Option<String> = row.try_get("owner").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;

    Ok(Link {
        code: ShortCode::new_unchecked(code),
        target_url,
        owner: owner.map(OwnerId::new),
        created_at: parse_millis(created_at)?,
        expires_at: expires_at.map(parse_millis).transpose()?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn is_deadlock(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "40001")
}

fn map_sqlx_error(err: sqlx::Error) -> LinkError {
    let message = err.to_string();
    if is_deadlock(&err) {
        return LinkError::StorageUnavailable(message);
    }

    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => LinkError::StorageUnavailable(message),
        _ => LinkError::Storage(message),
    }
}

#[async_trait]
impl ReadLinkStore for MySqlLinkStore {
    async fn get(&self, code: &ShortCode) -> Result<Link> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target_url, owner, created_at, expires_at
            FROM links
            WHERE short_code = ?
              AND (expires_at IS NULL OR expires_at > ?)
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .bind(Timestamp::now().as_millisecond())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => link_from_row(&row),
            None => Err(LinkError::NotFound(code.to_string())),
        }
    }

    async fn find(&self, code: &ShortCode) -> Result<Option<Link>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target_url, owner, created_at, expires_at
            FROM links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let live = sqlx::query("SELECT 1 FROM links WHERE short_code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();
        if live {
            return Ok(true);
        }

        let retired_at: Option<i64> =
            sqlx::query_scalar("SELECT retired_at FROM retired_codes WHERE short_code = ?")
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        self.retired_blocks(retired_at, Timestamp::now())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Link>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, target_url, owner, created_at, expires_at
            FROM links
            WHERE owner = ?
              AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY seq ASC
            "#,
        )
        .bind(owner.as_str())
        .bind(Timestamp::now().as_millisecond())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(link_from_row).collect()
    }
}

#[async_trait]
impl LinkStore for MySqlLinkStore {
    async fn create(&self, link: NewLink) -> Result<Link> {
        let now = Timestamp::now();
        link.validate(now)?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let retired_at: Option<i64> = sqlx::query_scalar(
            "SELECT retired_at FROM retired_codes WHERE short_code = ? FOR UPDATE",
        )
        .bind(link.code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if self.retired_blocks(retired_at, now)? {
            return Err(LinkError::DuplicateCode(link.code.to_string()));
        }
        if retired_at.is_some() {
            sqlx::query("DELETE FROM retired_codes WHERE short_code = ?")
                .bind(link.code.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, target_url, owner, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.code.as_str())
        .bind(&link.target_url)
        .bind(link.owner.as_ref().map(OwnerId::as_str))
        .bind(now.as_millisecond())
        .bind(link.expires_at.map(|ts| ts.as_millisecond()))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(LinkError::DuplicateCode(link.code.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(code = %link.code, "stored link");

        // Stored precision is milliseconds; hand back what a later read returns.
        Ok(link.into_link(parse_millis(now.as_millisecond())?))
    }

    async fn delete(&self, code: &ShortCode, requester: &Principal) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let owner: Option<Option<String>> =
            sqlx::query_scalar("SELECT owner FROM links WHERE short_code = ? FOR UPDATE")
                .bind(code.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let Some(owner) = owner else {
            return Err(LinkError::NotFound(code.to_string()));
        };
        if let Some(owner) = owner {
            if requester.owner().map(OwnerId::as_str) != Some(owner.as_str()) {
                return Err(LinkError::Forbidden(code.to_string()));
            }
        }

        sqlx::query("DELETE FROM links WHERE short_code = ?")
            .bind(code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO retired_codes (short_code, retired_at)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE retired_at = VALUES(retired_at)
            "#,
        )
        .bind(code.as_str())
        .bind(Timestamp::now().as_millisecond())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(code = %code, "deleted link");
        Ok(())
    }
}
