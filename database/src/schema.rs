//! Table definitions, applied in order on every startup.

pub(crate) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS guestbook_entries (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        avatar TEXT NOT NULL,
        content TEXT NOT NULL,
        image_url TEXT,
        password_hash TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS guestbook_replies (
        id TEXT PRIMARY KEY,
        entry_id TEXT NOT NULL,
        name TEXT NOT NULL,
        content TEXT NOT NULL,
        image_url TEXT,
        password_hash TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (entry_id) REFERENCES guestbook_entries(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profile_posts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT '',
        bio TEXT NOT NULL DEFAULT '',
        cover_url TEXT NOT NULL DEFAULT '',
        image_urls TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profile_comments (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL,
        name TEXT NOT NULL,
        avatar TEXT NOT NULL,
        content TEXT NOT NULL,
        image_urls TEXT NOT NULL DEFAULT '[]',
        likes_count INTEGER NOT NULL DEFAULT 0,
        password_hash TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (post_id) REFERENCES profile_posts(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profile_comment_replies (
        id TEXT PRIMARY KEY,
        comment_id TEXT NOT NULL,
        name TEXT NOT NULL,
        avatar TEXT NOT NULL,
        content TEXT NOT NULL,
        image_urls TEXT NOT NULL DEFAULT '[]',
        password_hash TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (comment_id) REFERENCES profile_comments(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_guestbook_replies_entry ON guestbook_replies(entry_id)",
    "CREATE INDEX IF NOT EXISTS idx_profile_comments_post ON profile_comments(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_comment_replies_comment ON profile_comment_replies(comment_id)",
];
