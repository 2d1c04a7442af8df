#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Poll, PollOption, Vote};

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
}

/// Poll definitions, keyed by poll id.
#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError>;
    async fn find_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError>;
    async fn all_polls(&self) -> Result<Vec<Poll>, StoreError>;
}

/// Current votes, keyed by (poll id, user id).
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Inserts or replaces the vote stored under the same key.
    async fn put_vote(&self, vote: &Vote) -> Result<(), StoreError>;
    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError>;
}

pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

// Fixed precision so that text order matches time order
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("Failed to parse {column}: {e}")))
}

pub struct Database {
    pool: SqlitePool,
    polls_table: String,
    votes_table: String,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        Self::connect(
            &config.database_url,
            config.db_max_connections,
            &config.polls_table,
            &config.votes_table,
        )
        .await
    }

    pub async fn connect(
        db_url: &str,
        max_connections: u32,
        polls_table: &str,
        votes_table: &str,
    ) -> Result<Self, StoreError> {
        for table in [polls_table, votes_table] {
            if !is_valid_table_name(table) {
                return Err(StoreError::Misconfigured(format!("invalid table name: {table}")));
            }
        }

        // Create database if it doesn't exist
        if !db_url.contains(":memory:") && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        let database = Self {
            pool,
            polls_table: polls_table.to_string(),
            votes_table: votes_table.to_string(),
        };
        database.init_schema().await?;

        Ok(database)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        // Options live in the poll row so a poll is written in one statement
        let polls = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
            self.polls_table
        );
        sqlx::query(&polls).execute(&self.pool).await?;

        let votes = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                poll_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                option_id INTEGER NOT NULL,
                voted_at TEXT NOT NULL,
                PRIMARY KEY (poll_id, user_id)
            );
            "#,
            self.votes_table
        );
        sqlx::query(&votes).execute(&self.pool).await?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_poll_id ON {0} (poll_id);",
            self.votes_table
        );
        sqlx::query(&index).execute(&self.pool).await?;

        debug!(
            "Schema ready (polls table: {}, votes table: {})",
            self.polls_table, self.votes_table
        );
        Ok(())
    }

    fn poll_from_row(row: &SqliteRow) -> Result<Poll, StoreError> {
        let options_json: String = row.try_get("options")?;
        let options: Vec<PollOption> = serde_json::from_str(&options_json)?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Poll {
            id: row.try_get("id")?,
            question: row.try_get("question")?,
            options,
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    fn vote_from_row(row: &SqliteRow) -> Result<Vote, StoreError> {
        let option_id: i64 = row.try_get("option_id")?;
        let voted_at: String = row.try_get("voted_at")?;

        Ok(Vote {
            poll_id: row.try_get("poll_id")?,
            user_id: row.try_get("user_id")?,
            option_id: u32::try_from(option_id)
                .map_err(|_| StoreError::Corrupt(format!("option id out of range: {option_id}")))?,
            voted_at: parse_timestamp(&voted_at, "voted_at")?,
        })
    }
}

#[async_trait]
impl PollRepository for Database {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let options = serde_json::to_string(&poll.options)?;
        let sql = format!(
            "INSERT INTO {} (id, question, options, created_at) VALUES (?, ?, ?, ?)",
            self.polls_table
        );

        sqlx::query(&sql)
            .bind(&poll.id)
            .bind(&poll.question)
            .bind(options)
            .bind(format_timestamp(&poll.created_at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        let sql = format!(
            "SELECT id, question, options, created_at FROM {} WHERE id = ?",
            self.polls_table
        );

        let row = sqlx::query(&sql)
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::poll_from_row).transpose()
    }

    async fn all_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let sql = format!(
            "SELECT id, question, options, created_at FROM {} ORDER BY created_at DESC, id",
            self.polls_table
        );

        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::poll_from_row)
            .collect()
    }
}

#[async_trait]
impl VoteRepository for Database {
    async fn put_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {} (poll_id, user_id, option_id, voted_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(poll_id, user_id)
            DO UPDATE SET option_id = excluded.option_id, voted_at = excluded.voted_at
            "#,
            self.votes_table
        );

        sqlx::query(&sql)
            .bind(&vote.poll_id)
            .bind(&vote.user_id)
            .bind(i64::from(vote.option_id))
            .bind(format_timestamp(&vote.voted_at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let sql = format!(
            "SELECT poll_id, user_id, option_id, voted_at FROM {} WHERE poll_id = ?",
            self.votes_table
        );

        sqlx::query(&sql)
            .bind(poll_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::vote_from_row)
            .collect()
    }
}
