//! Profile posts, their comments and the replies under those comments.

use crate::models::{
    CommentReply, CommentReplyRow, CommentRow, NewComment, NewCommentReply, NewPost,
    ProfileComment, ProfilePost, PostRow,
};
use crate::{generate_id, Database, Result};
use chrono::Utc;
use sqlx::{types::Json, SqliteConnection};
use tracing::{debug, info};

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.role, p.bio, p.cover_url, p.image_urls, p.created_at,
           (SELECT COUNT(*) FROM profile_comments c WHERE c.post_id = p.id) AS comment_count
    FROM profile_posts p
"#;

const COMMENT_COLUMNS: &str =
    "id, post_id, name, avatar, content, image_urls, likes_count, is_admin, created_at, updated_at";
const COMMENT_REPLY_COLUMNS: &str =
    "id, comment_id, name, avatar, content, image_urls, is_admin, created_at, updated_at";

/// Profile queries over a borrowed [`Database`]
pub struct ProfileStore<'a> {
    db: &'a Database,
}

impl<'a> ProfileStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All posts, newest first, each with its comment count
    pub async fn list_posts(&self) -> Result<Vec<ProfilePost>> {
        let query = format!("{} ORDER BY p.created_at DESC, p.rowid DESC", POST_SELECT);
        let rows: Vec<PostRow> = sqlx::query_as(&query).fetch_all(self.db.pool()).await?;
        Ok(rows.into_iter().map(ProfilePost::from).collect())
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<ProfilePost>> {
        let query = format!("{} WHERE p.id = ?", POST_SELECT);
        let row: Option<PostRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(ProfilePost::from))
    }

    pub async fn create_post(&self, new: NewPost) -> Result<ProfilePost> {
        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO profile_posts (id, title, role, bio, cover_url, image_urls, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.role)
        .bind(&new.bio)
        .bind(&new.cover_url)
        .bind(Json(&new.image_urls))
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created profile post {}", id);

        Ok(ProfilePost {
            id,
            title: new.title,
            role: new.role,
            bio: new.bio,
            cover_url: new.cover_url,
            image_urls: new.image_urls,
            created_at: now,
            comment_count: 0,
        })
    }

    /// Comments on a post, most liked first, then newest
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<ProfileComment>> {
        let query = format!(
            "SELECT {} FROM profile_comments WHERE post_id = ? \
             ORDER BY likes_count DESC, created_at DESC, rowid DESC",
            COMMENT_COLUMNS
        );
        let rows: Vec<CommentRow> = sqlx::query_as(&query)
            .bind(post_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(ProfileComment::from).collect())
    }

    pub async fn get_comment(&self, id: &str) -> Result<Option<ProfileComment>> {
        let query = format!("SELECT {} FROM profile_comments WHERE id = ?", COMMENT_COLUMNS);
        let row: Option<CommentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(ProfileComment::from))
    }

    /// Add a comment to a post. Returns `None` when the post does not exist.
    pub async fn create_comment(
        &self,
        post_id: &str,
        new: NewComment,
    ) -> Result<Option<ProfileComment>> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM profile_posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO profile_comments
                (id, post_id, name, avatar, content, image_urls, likes_count,
                 password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(post_id)
        .bind(&new.name)
        .bind(&new.avatar)
        .bind(&new.content)
        .bind(Json(&new.image_urls))
        .bind(new.ownership.secret_hash.as_ref().map(|h| h.as_str()))
        .bind(new.ownership.created_by_admin)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created comment {} on profile post {}", id, post_id);

        Ok(Some(ProfileComment {
            id,
            post_id: post_id.to_string(),
            name: new.name,
            avatar: new.avatar,
            content: new.content,
            image_urls: new.image_urls,
            likes_count: 0,
            is_admin: new.ownership.created_by_admin,
            created_at: now,
            updated_at: now,
        }))
    }

    /// Replace a comment's content, and its images when `image_urls` is given
    pub async fn update_comment(
        &self,
        id: &str,
        content: &str,
        image_urls: Option<&[String]>,
    ) -> Result<Option<ProfileComment>> {
        let result = match image_urls {
            Some(urls) => {
                sqlx::query(
                    "UPDATE profile_comments SET content = ?, image_urls = ?, updated_at = ? WHERE id = ?",
                )
                .bind(content)
                .bind(Json(urls))
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?
            }
            None => {
                sqlx::query("UPDATE profile_comments SET content = ?, updated_at = ? WHERE id = ?")
                    .bind(content)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.db.pool())
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!("Updated profile comment {}", id);
        self.get_comment(id).await
    }

    /// Delete a comment and, through the cascade, its replies. Returns the
    /// image URLs of the comment and its replies that no remaining record
    /// still lists, or `None` when the comment does not exist.
    pub async fn delete_comment(&self, id: &str) -> Result<Option<Vec<String>>> {
        let mut tx = self.db.pool().begin().await?;

        let reply_images: Vec<(Json<Vec<String>>,)> =
            sqlx::query_as("SELECT image_urls FROM profile_comment_replies WHERE comment_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let deleted: Option<(Json<Vec<String>>,)> =
            sqlx::query_as("DELETE FROM profile_comments WHERE id = ? RETURNING image_urls")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut images),)) = deleted else {
            return Ok(None);
        };
        images.extend(reply_images.into_iter().flat_map(|(Json(urls),)| urls));

        let released = unreferenced_images(&mut tx, images).await?;
        tx.commit().await?;

        info!("Deleted profile comment {}", id);
        Ok(Some(released))
    }

    /// Add one like to a comment on `post_id` and return the new count.
    /// `None` when no such comment exists under that post.
    pub async fn like_comment(&self, post_id: &str, comment_id: &str) -> Result<Option<i64>> {
        let likes: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE profile_comments SET likes_count = likes_count + 1
            WHERE id = ? AND post_id = ?
            RETURNING likes_count
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(likes.map(|(count,)| count))
    }

    /// Replies under a comment, oldest first
    pub async fn list_replies(&self, comment_id: &str) -> Result<Vec<CommentReply>> {
        let query = format!(
            "SELECT {} FROM profile_comment_replies WHERE comment_id = ? ORDER BY created_at ASC, rowid ASC",
            COMMENT_REPLY_COLUMNS
        );
        let rows: Vec<CommentReplyRow> = sqlx::query_as(&query)
            .bind(comment_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(CommentReply::from).collect())
    }

    pub async fn get_reply(&self, id: &str) -> Result<Option<CommentReply>> {
        let query = format!(
            "SELECT {} FROM profile_comment_replies WHERE id = ?",
            COMMENT_REPLY_COLUMNS
        );
        let row: Option<CommentReplyRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(CommentReply::from))
    }

    /// Add a reply to a comment. The caller is responsible for checking the
    /// comment belongs to the post in the request path.
    pub async fn create_reply(
        &self,
        comment_id: &str,
        new: NewCommentReply,
    ) -> Result<Option<CommentReply>> {
        if self.get_comment(comment_id).await?.is_none() {
            return Ok(None);
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO profile_comment_replies
                (id, comment_id, name, avatar, content, image_urls,
                 password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(comment_id)
        .bind(&new.name)
        .bind(&new.avatar)
        .bind(&new.content)
        .bind(Json(&new.image_urls))
        .bind(new.ownership.secret_hash.as_ref().map(|h| h.as_str()))
        .bind(new.ownership.created_by_admin)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!("Created reply {} on profile comment {}", id, comment_id);

        Ok(Some(CommentReply {
            id,
            comment_id: comment_id.to_string(),
            name: new.name,
            avatar: new.avatar,
            content: new.content,
            image_urls: new.image_urls,
            is_admin: new.ownership.created_by_admin,
            created_at: now,
            updated_at: now,
        }))
    }

    pub async fn update_reply(
        &self,
        id: &str,
        content: &str,
        image_urls: Option<&[String]>,
    ) -> Result<Option<CommentReply>> {
        let result = match image_urls {
            Some(urls) => {
                sqlx::query(
                    "UPDATE profile_comment_replies SET content = ?, image_urls = ?, updated_at = ? WHERE id = ?",
                )
                .bind(content)
                .bind(Json(urls))
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE profile_comment_replies SET content = ?, updated_at = ? WHERE id = ?",
                )
                .bind(content)
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!("Updated profile comment reply {}", id);
        self.get_reply(id).await
    }

    /// Delete a comment reply. Returns its image URLs that no remaining
    /// record still lists, or `None` when the reply does not exist.
    pub async fn delete_reply(&self, id: &str) -> Result<Option<Vec<String>>> {
        let mut tx = self.db.pool().begin().await?;

        let deleted: Option<(Json<Vec<String>>,)> = sqlx::query_as(
            "DELETE FROM profile_comment_replies WHERE id = ? RETURNING image_urls",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(images),)) = deleted else {
            return Ok(None);
        };

        let released = unreferenced_images(&mut tx, images).await?;
        tx.commit().await?;

        info!("Deleted profile comment reply {}", id);
        Ok(Some(released))
    }
}

/// Whether any stored record still lists the bound image URL
const IMAGE_IN_USE: &str = r#"
    WITH target(url) AS (SELECT ?)
    SELECT EXISTS (
        SELECT 1 FROM profile_comments c, json_each(c.image_urls) j, target t WHERE j.value = t.url
        UNION ALL
        SELECT 1 FROM profile_comment_replies r, json_each(r.image_urls) j, target t WHERE j.value = t.url
        UNION ALL
        SELECT 1 FROM profile_posts p, json_each(p.image_urls) j, target t WHERE j.value = t.url
        UNION ALL
        SELECT 1 FROM profile_posts p, target t WHERE p.cover_url = t.url
        UNION ALL
        SELECT 1 FROM guestbook_entries e, target t WHERE e.image_url = t.url
        UNION ALL
        SELECT 1 FROM guestbook_replies r, target t WHERE r.image_url = t.url
    )
"#;

/// The URLs in `urls` that nothing references any more, in order and
/// without duplicates. Image lists are client supplied, so a URL can be
/// shared with records the caller does not own.
async fn unreferenced_images(conn: &mut SqliteConnection, urls: Vec<String>) -> Result<Vec<String>> {
    let mut released: Vec<String> = Vec::with_capacity(urls.len());
    for url in urls {
        if released.contains(&url) {
            continue;
        }
        let (in_use,): (i64,) = sqlx::query_as(IMAGE_IN_USE)
            .bind(&url)
            .fetch_one(&mut *conn)
            .await?;
        if in_use == 0 {
            released.push(url);
        } else {
            debug!(url = %url, "Image still referenced; keeping it");
        }
    }
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_db, owned_by};

    fn post(title: &str) -> NewPost {
        NewPost {
            title: title.into(),
            role: "designer".into(),
            bio: String::new(),
            cover_url: String::new(),
            image_urls: vec!["/uploads/a.png".into()],
        }
    }

    fn comment(content: &str, images: &[&str]) -> NewComment {
        NewComment {
            name: "guest".into(),
            avatar: "🙂".into(),
            content: content.into(),
            image_urls: images.iter().map(|s| s.to_string()).collect(),
            ownership: owned_by("secret1"),
        }
    }

    #[tokio::test]
    async fn test_posts_with_comment_count() {
        let db = create_test_db().await;
        let store = db.profiles();

        let older = store.create_post(post("older")).await.unwrap();
        let newer = store.create_post(post("newer")).await.unwrap();
        store.create_comment(&older.id, comment("hi", &[])).await.unwrap().unwrap();
        store.create_comment(&older.id, comment("hey", &[])).await.unwrap().unwrap();

        let posts = store.list_posts().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, newer.id);
        assert_eq!(posts[0].comment_count, 0);
        assert_eq!(posts[1].comment_count, 2);
        assert_eq!(posts[1].image_urls, vec!["/uploads/a.png".to_string()]);

        let fetched = store.get_post(&older.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "older");
        assert!(store.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_requires_post() {
        let db = create_test_db().await;
        let store = db.profiles();
        assert!(store.create_comment("missing", comment("x", &[])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comments_ordered_by_likes_then_newest() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();

        let first = store.create_comment(&p.id, comment("first", &[])).await.unwrap().unwrap();
        let second = store.create_comment(&p.id, comment("second", &[])).await.unwrap().unwrap();
        let liked = store.create_comment(&p.id, comment("liked", &[])).await.unwrap().unwrap();

        assert_eq!(store.like_comment(&p.id, &liked.id).await.unwrap(), Some(1));
        assert_eq!(store.like_comment(&p.id, &liked.id).await.unwrap(), Some(2));

        let ids: Vec<_> = store
            .list_comments(&p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![liked.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_like_scoped_to_post() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();
        let other = store.create_post(post("other")).await.unwrap();
        let c = store.create_comment(&p.id, comment("c", &[])).await.unwrap().unwrap();

        assert_eq!(store.like_comment(&other.id, &c.id).await.unwrap(), None);
        assert_eq!(store.like_comment(&p.id, "missing").await.unwrap(), None);
        assert_eq!(store.get_comment(&c.id).await.unwrap().unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn test_update_comment_images_optional() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();
        let c = store
            .create_comment(&p.id, comment("v1", &["/uploads/one.png"]))
            .await
            .unwrap()
            .unwrap();

        let kept = store.update_comment(&c.id, "v2", None).await.unwrap().unwrap();
        assert_eq!(kept.content, "v2");
        assert_eq!(kept.image_urls, vec!["/uploads/one.png".to_string()]);

        let cleared = store.update_comment(&c.id, "v3", Some(&[] as &[String])).await.unwrap().unwrap();
        assert!(cleared.image_urls.is_empty());

        assert!(store.update_comment("missing", "x", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_comment_returns_images_and_cascades() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();
        let c = store
            .create_comment(&p.id, comment("c", &["/uploads/x.png", "/uploads/y.png"]))
            .await
            .unwrap()
            .unwrap();
        let r = store
            .create_reply(&c.id, comment("r", &["/uploads/z.png", "/uploads/x.png"]))
            .await
            .unwrap()
            .unwrap();

        let images = store.delete_comment(&c.id).await.unwrap().unwrap();
        assert_eq!(
            images,
            vec![
                "/uploads/x.png".to_string(),
                "/uploads/y.png".to_string(),
                "/uploads/z.png".to_string(),
            ]
        );
        assert!(store.get_reply(&r.id).await.unwrap().is_none());
        assert!(store.delete_comment(&c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_replies() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();
        let c = store.create_comment(&p.id, comment("c", &[])).await.unwrap().unwrap();

        assert!(store.create_reply("missing", comment("x", &[])).await.unwrap().is_none());

        let a = store.create_reply(&c.id, comment("a", &[])).await.unwrap().unwrap();
        let b = store.create_reply(&c.id, comment("b", &[])).await.unwrap().unwrap();
        let listed: Vec<_> = store
            .list_replies(&c.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, vec![a.id.clone(), b.id.clone()]);

        let edited = store.update_reply(&a.id, "a2", None).await.unwrap().unwrap();
        assert_eq!(edited.content, "a2");

        assert_eq!(store.delete_reply(&b.id).await.unwrap(), Some(vec![]));
        assert!(store.delete_reply(&b.id).await.unwrap().is_none());
        assert_eq!(store.list_replies(&c.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_images_listed_elsewhere() {
        let db = create_test_db().await;
        let store = db.profiles();
        let p = store.create_post(post("p")).await.unwrap();
        let owner = store
            .create_comment(&p.id, comment("mine", &["/uploads/shared.png"]))
            .await
            .unwrap()
            .unwrap();
        let copier = store
            .create_comment(&p.id, comment("copy", &["/uploads/shared.png", "/uploads/own.png"]))
            .await
            .unwrap()
            .unwrap();

        let released = store.delete_comment(&copier.id).await.unwrap().unwrap();
        assert_eq!(released, vec!["/uploads/own.png".to_string()]);

        // The post lists /uploads/a.png, so a reply naming it cannot release it
        let reply = store
            .create_reply(&owner.id, comment("r", &["/uploads/a.png"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.delete_reply(&reply.id).await.unwrap(), Some(vec![]));

        let released = store.delete_comment(&owner.id).await.unwrap().unwrap();
        assert_eq!(released, vec!["/uploads/shared.png".to_string()]);
    }
}
