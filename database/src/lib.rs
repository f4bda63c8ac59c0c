use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

pub mod error;
pub mod guestbook;
pub mod models;
pub mod ownership;
pub mod profiles;
mod schema;

pub use error::{DatabaseError, Result};
pub use guestbook::{GuestbookStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use models::*;
pub use profiles::ProfileStore;

/// Database connection pool
#[derive(Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the database file and make sure all tables
    /// exist.
    pub async fn new(database_path: &str) -> Result<Self> {
        // Ensure the data directory exists
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Connecting to database at: {}", database_path);

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        debug!("Database connection established");

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// A private in-memory database. Used by tests and throwaway runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // Every connection to :memory: is a separate database, so keep one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create any missing tables and indexes
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        for statement in schema::STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database migrations completed");
        Ok(())
    }

    /// Round-trip a trivial query to confirm the store is reachable
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Check if a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count
            FROM sqlite_master
            WHERE type='table' AND name=?
        "#;

        let result: (i32,) = sqlx::query_as(query)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }

    pub fn guestbook(&self) -> GuestbookStore<'_> {
        GuestbookStore::new(self)
    }

    pub fn profiles(&self) -> ProfileStore<'_> {
        ProfileStore::new(self)
    }
}

/// Fresh identifier for a new record
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection() {
        let db = test_support::create_test_db().await;
        assert!(db.pool().acquire().await.is_ok());
        assert!(db.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_tables_created() {
        let db = test_support::create_test_db().await;
        for table in [
            "guestbook_entries",
            "guestbook_replies",
            "profile_posts",
            "profile_comments",
            "profile_comment_replies",
        ] {
            assert!(db.table_exists(table).await.unwrap(), "{} missing", table);
        }
        assert!(!db.table_exists("non_existent_table").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_database_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("guestbook.db");
        let path = path.to_string_lossy().to_string();

        let db = Database::new(&path).await.unwrap();
        db.migrate().await.unwrap();
        drop(db);

        let db = Database::new(&path).await.unwrap();
        assert!(db.table_exists("guestbook_entries").await.unwrap());
    }
}
