//! Guestbook entries and their replies.

use crate::models::{
    EntryPage, EntryWithReplies, GuestbookEntry, GuestbookReply, NewEntry, NewReply, SortOrder,
};
use crate::{generate_id, Database, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use tracing::{debug, info};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 50;

const ENTRY_COLUMNS: &str =
    "id, name, avatar, content, image_url, is_admin, created_at, updated_at";
const REPLY_COLUMNS: &str =
    "id, entry_id, name, content, image_url, is_admin, created_at, updated_at";

/// Guestbook queries over a borrowed [`Database`]
pub struct GuestbookStore<'a> {
    db: &'a Database,
}

impl<'a> GuestbookStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// One page of entries with all of their replies, oldest reply first.
    ///
    /// `page` starts at 1; `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list_entries(&self, sort: SortOrder, page: u32, limit: u32) -> Result<EntryPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(limit);

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guestbook_entries")
            .fetch_one(self.db.pool())
            .await?;

        let query = format!(
            "SELECT {} FROM guestbook_entries ORDER BY created_at {order}, rowid {order} LIMIT ? OFFSET ?",
            ENTRY_COLUMNS,
            order = sort.sql()
        );
        let entries: Vec<GuestbookEntry> = sqlx::query_as(&query)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        let mut replies = self.replies_for(&entries).await?;
        let entries = entries
            .into_iter()
            .map(|entry| EntryWithReplies {
                replies: replies.remove(&entry.id).unwrap_or_default(),
                entry,
            })
            .collect();

        let total = total.max(0) as u64;
        let total_pages = total.div_ceil(u64::from(limit)).max(1);

        Ok(EntryPage {
            entries,
            page,
            limit,
            total,
            total_pages,
        })
    }

    async fn replies_for(
        &self,
        entries: &[GuestbookEntry],
    ) -> Result<HashMap<String, Vec<GuestbookReply>>> {
        let mut grouped: HashMap<String, Vec<GuestbookReply>> = HashMap::new();
        if entries.is_empty() {
            return Ok(grouped);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM guestbook_replies WHERE entry_id IN (",
            REPLY_COLUMNS
        ));
        let mut ids = builder.separated(", ");
        for entry in entries {
            ids.push_bind(entry.id.as_str());
        }
        builder.push(") ORDER BY created_at ASC, rowid ASC");

        let replies: Vec<GuestbookReply> = builder
            .build_query_as()
            .fetch_all(self.db.pool())
            .await?;

        for reply in replies {
            grouped.entry(reply.entry_id.clone()).or_default().push(reply);
        }
        Ok(grouped)
    }

    pub async fn get_entry(&self, id: &str) -> Result<Option<GuestbookEntry>> {
        let query = format!("SELECT {} FROM guestbook_entries WHERE id = ?", ENTRY_COLUMNS);
        let entry = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(entry)
    }

    pub async fn create_entry(&self, new: NewEntry) -> Result<GuestbookEntry> {
        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO guestbook_entries
                (id, name, avatar, content, image_url, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.avatar)
        .bind(&new.content)
        .bind(&new.image_url)
        .bind(new.ownership.secret_hash.as_ref().map(|h| h.as_str()))
        .bind(new.ownership.created_by_admin)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created guestbook entry {}", id);

        Ok(GuestbookEntry {
            id,
            name: new.name,
            avatar: new.avatar,
            content: new.content,
            image_url: new.image_url,
            is_admin: new.ownership.created_by_admin,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace an entry's content. Returns the updated entry, or `None` if it
    /// no longer exists.
    pub async fn update_entry(&self, id: &str, content: &str) -> Result<Option<GuestbookEntry>> {
        let result =
            sqlx::query("UPDATE guestbook_entries SET content = ?, updated_at = ? WHERE id = ?")
                .bind(content)
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!("Updated guestbook entry {}", id);
        self.get_entry(id).await
    }

    /// Delete an entry; its replies go with it. Returns whether a row was
    /// removed.
    pub async fn delete_entry(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM guestbook_entries WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted guestbook entry {}", id);
        }
        Ok(deleted)
    }

    pub async fn get_reply(&self, id: &str) -> Result<Option<GuestbookReply>> {
        let query = format!("SELECT {} FROM guestbook_replies WHERE id = ?", REPLY_COLUMNS);
        let reply = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(reply)
    }

    /// Add a reply under `entry_id`. Returns `None` when the entry does not
    /// exist.
    pub async fn create_reply(
        &self,
        entry_id: &str,
        new: NewReply,
    ) -> Result<Option<GuestbookReply>> {
        if self.get_entry(entry_id).await?.is_none() {
            return Ok(None);
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO guestbook_replies
                (id, entry_id, name, content, image_url, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(entry_id)
        .bind(&new.name)
        .bind(&new.content)
        .bind(&new.image_url)
        .bind(new.ownership.secret_hash.as_ref().map(|h| h.as_str()))
        .bind(new.ownership.created_by_admin)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created reply {} on guestbook entry {}", id, entry_id);

        Ok(Some(GuestbookReply {
            id,
            entry_id: entry_id.to_string(),
            name: new.name,
            content: new.content,
            image_url: new.image_url,
            is_admin: new.ownership.created_by_admin,
            created_at: now,
            updated_at: now,
        }))
    }

    pub async fn update_reply(&self, id: &str, content: &str) -> Result<Option<GuestbookReply>> {
        let result =
            sqlx::query("UPDATE guestbook_replies SET content = ?, updated_at = ? WHERE id = ?")
                .bind(content)
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!("Updated guestbook reply {}", id);
        self.get_reply(id).await
    }

    pub async fn delete_reply(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM guestbook_replies WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted guestbook reply {}", id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin_owned, create_test_db, owned_by};

    fn entry(content: &str) -> NewEntry {
        NewEntry {
            name: "visitor".into(),
            avatar: "🙂".into(),
            content: content.into(),
            image_url: None,
            ownership: owned_by("secret1"),
        }
    }

    fn reply(content: &str) -> NewReply {
        NewReply {
            name: "host".into(),
            content: content.into(),
            image_url: None,
            ownership: admin_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_entry() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let created = store.create_entry(entry("hello")).await.unwrap();
        let fetched = store.get_entry(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.content, "hello");
        assert!(!fetched.is_admin);
        assert!(store.get_entry("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sorting_and_paging() {
        let db = create_test_db().await;
        let store = db.guestbook();

        for n in 1..=7 {
            store.create_entry(entry(&format!("entry {}", n))).await.unwrap();
        }

        let newest = store.list_entries(SortOrder::New, 1, 5).await.unwrap();
        assert_eq!(newest.total, 7);
        assert_eq!(newest.total_pages, 2);
        assert_eq!(newest.entries.len(), 5);
        assert_eq!(newest.entries[0].entry.content, "entry 7");

        let oldest = store.list_entries(SortOrder::Old, 2, 5).await.unwrap();
        assert_eq!(oldest.page, 2);
        assert_eq!(oldest.entries.len(), 2);
        assert_eq!(oldest.entries[0].entry.content, "entry 6");
        assert_eq!(oldest.entries[1].entry.content, "entry 7");
    }

    #[tokio::test]
    async fn test_list_clamps_arguments() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let empty = store.list_entries(SortOrder::New, 0, 500).await.unwrap();
        assert_eq!(empty.page, 1);
        assert_eq!(empty.limit, MAX_PAGE_SIZE);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.total_pages, 1);

        let tiny = store.list_entries(SortOrder::New, 1, 0).await.unwrap();
        assert_eq!(tiny.limit, 1);
    }

    #[tokio::test]
    async fn test_replies_attached_oldest_first() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let first = store.create_entry(entry("first")).await.unwrap();
        let second = store.create_entry(entry("second")).await.unwrap();
        store.create_reply(&first.id, reply("a")).await.unwrap().unwrap();
        store.create_reply(&first.id, reply("b")).await.unwrap().unwrap();

        let page = store.list_entries(SortOrder::Old, 1, 5).await.unwrap();
        let listed_first = &page.entries[0];
        assert_eq!(listed_first.entry.id, first.id);
        let contents: Vec<_> = listed_first.replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["a", "b"]);
        assert!(listed_first.replies.iter().all(|r| r.is_admin));

        assert_eq!(page.entries[1].entry.id, second.id);
        assert!(page.entries[1].replies.is_empty());
    }

    #[tokio::test]
    async fn test_reply_requires_entry() {
        let db = create_test_db().await;
        let store = db.guestbook();
        assert!(store.create_reply("missing", reply("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_entry_and_reply() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let created = store.create_entry(entry("before")).await.unwrap();
        let updated = store.update_entry(&created.id, "after").await.unwrap().unwrap();
        assert_eq!(updated.content, "after");
        assert!(updated.updated_at >= created.updated_at);
        assert!(store.update_entry("missing", "x").await.unwrap().is_none());

        let r = store.create_reply(&created.id, reply("r1")).await.unwrap().unwrap();
        let r = store.update_reply(&r.id, "r2").await.unwrap().unwrap();
        assert_eq!(r.content, "r2");
    }

    #[tokio::test]
    async fn test_delete_entry_cascades_replies() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let created = store.create_entry(entry("bye")).await.unwrap();
        let r = store.create_reply(&created.id, reply("r")).await.unwrap().unwrap();

        assert!(store.delete_entry(&created.id).await.unwrap());
        assert!(!store.delete_entry(&created.id).await.unwrap());
        assert!(store.get_reply(&r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reply() {
        let db = create_test_db().await;
        let store = db.guestbook();

        let created = store.create_entry(entry("e")).await.unwrap();
        let r = store.create_reply(&created.id, reply("r")).await.unwrap().unwrap();
        assert!(store.delete_reply(&r.id).await.unwrap());
        assert!(store.get_reply(&r.id).await.unwrap().is_none());
        assert!(store.get_entry(&created.id).await.unwrap().is_some());
    }
}
