//! Ownership facts for the authorization layer.
//!
//! This is the only place stored secret digests are read back.

use crate::Database;
use async_trait::async_trait;
use authz::{CredentialHash, OwnedResource, ResourceKind, ResourceLookup};
use sqlx::FromRow;

#[derive(FromRow)]
struct OwnershipRow {
    id: String,
    parent_id: Option<String>,
    password_hash: Option<String>,
    is_admin: bool,
}

fn ownership_query(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::GuestbookEntry => {
            "SELECT id, NULL AS parent_id, password_hash, is_admin FROM guestbook_entries WHERE id = ?"
        }
        ResourceKind::GuestbookReply => {
            "SELECT id, entry_id AS parent_id, password_hash, is_admin FROM guestbook_replies WHERE id = ?"
        }
        ResourceKind::ProfileComment => {
            "SELECT id, post_id AS parent_id, password_hash, is_admin FROM profile_comments WHERE id = ?"
        }
        ResourceKind::CommentReply => {
            "SELECT id, comment_id AS parent_id, password_hash, is_admin FROM profile_comment_replies WHERE id = ?"
        }
    }
}

impl Database {
    /// Fetch the ownership facts of one record, or `None` if it does not exist
    pub async fn find_owned(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> crate::Result<Option<OwnedResource>> {
        let row: Option<OwnershipRow> = sqlx::query_as(ownership_query(kind))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|row| OwnedResource {
            kind,
            id: row.id,
            parent_id: row.parent_id,
            owner_secret_hash: row
                .password_hash
                .filter(|digest| !digest.is_empty())
                .map(CredentialHash::new),
            created_by_admin: row.is_admin,
        }))
    }
}

#[async_trait]
impl ResourceLookup for Database {
    async fn find_resource(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> authz::Result<Option<OwnedResource>> {
        Ok(self.find_owned(kind, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewComment, NewEntry, NewPost, NewReply};
    use crate::test_support::{admin_owned, create_test_db, owned_by};
    use authz::{
        AdminKey, Argon2Hasher, Credentials, DenyReason, GrantSigner, OwnershipGuard, ResourceRef,
    };
    use std::time::Duration;

    fn guard() -> OwnershipGuard {
        OwnershipGuard::new(
            AdminKey::new("admin-secret"),
            Argon2Hasher::fast_insecure(),
            GrantSigner::random(Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn test_find_entry_and_reply() {
        let db = create_test_db().await;
        let store = db.guestbook();
        let entry = store
            .create_entry(NewEntry {
                name: "n".into(),
                avatar: "🙂".into(),
                content: "c".into(),
                image_url: None,
                ownership: owned_by("secret1"),
            })
            .await
            .unwrap();
        let reply = store
            .create_reply(
                &entry.id,
                NewReply {
                    name: "admin".into(),
                    content: "r".into(),
                    image_url: None,
                    ownership: admin_owned(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        let found = db
            .find_owned(ResourceKind::GuestbookEntry, &entry.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.kind, ResourceKind::GuestbookEntry);
        assert!(found.parent_id.is_none());
        assert!(found.owner_secret_hash.is_some());
        assert!(!found.created_by_admin);

        let found = db
            .find_owned(ResourceKind::GuestbookReply, &reply.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.parent_id.as_deref(), Some(entry.id.as_str()));
        assert!(found.owner_secret_hash.is_none());
        assert!(found.created_by_admin);

        // Kinds are looked up in their own table only
        assert!(db
            .find_owned(ResourceKind::ProfileComment, &entry.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_verify_through_store() {
        let db = create_test_db().await;
        let profiles = db.profiles();
        let post = profiles
            .create_post(NewPost {
                title: "t".into(),
                role: String::new(),
                bio: String::new(),
                cover_url: String::new(),
                image_urls: vec![],
            })
            .await
            .unwrap();
        let comment = profiles
            .create_comment(
                &post.id,
                NewComment {
                    name: "n".into(),
                    avatar: "🙂".into(),
                    content: "c".into(),
                    image_urls: vec![],
                    ownership: owned_by("secret1"),
                },
            )
            .await
            .unwrap()
            .unwrap();

        let guard = guard();
        let target = ResourceRef::new(ResourceKind::ProfileComment, &comment.id).under(&post.id);

        let ok = guard
            .verify(&db, &target, &Credentials::password("secret1"))
            .await
            .unwrap();
        assert!(ok.decision.is_allowed());
        assert!(ok.grant.is_some());

        let wrong = guard
            .verify(&db, &target, &Credentials::password("nope!"))
            .await
            .unwrap();
        assert_eq!(wrong.decision.deny_reason(), Some(DenyReason::Unauthorized));

        let elsewhere = ResourceRef::new(ResourceKind::ProfileComment, &comment.id).under("other");
        let misplaced = guard
            .verify(&db, &elsewhere, &Credentials::password("secret1"))
            .await
            .unwrap();
        assert_eq!(misplaced.decision.deny_reason(), Some(DenyReason::BadRequest));

        let missing = ResourceRef::new(ResourceKind::ProfileComment, "missing");
        let absent = guard
            .verify(&db, &missing, &Credentials::password("secret1"))
            .await
            .unwrap();
        assert_eq!(absent.decision.deny_reason(), Some(DenyReason::NotFound));
    }
}
