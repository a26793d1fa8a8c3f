use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                id            TEXT PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                account_kind  TEXT NOT NULL DEFAULT 'personal',
                verified      INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE friend_requests (
                id           TEXT PRIMARY KEY,
                sender_id    TEXT NOT NULL REFERENCES profiles(id),
                receiver_id  TEXT NOT NULL REFERENCES profiles(id),
                status       TEXT NOT NULL DEFAULT 'pending',
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_friend_requests_sender ON friend_requests(sender_id);
            CREATE INDEX idx_friend_requests_receiver ON friend_requests(receiver_id);

            CREATE TABLE follows (
                follower_id   TEXT NOT NULL REFERENCES profiles(id),
                following_id  TEXT NOT NULL REFERENCES profiles(id),
                created_at    TEXT NOT NULL,
                PRIMARY KEY (follower_id, following_id)
            );

            CREATE INDEX idx_follows_following ON follows(following_id);

            CREATE TABLE posts (
                id               TEXT PRIMARY KEY,
                user_id          TEXT NOT NULL REFERENCES profiles(id),
                content_type     TEXT NOT NULL,
                media_url        TEXT NOT NULL,
                additional_urls  TEXT NOT NULL DEFAULT '[]',
                caption          TEXT NOT NULL DEFAULT '',
                hashtags         TEXT NOT NULL DEFAULT '[]',
                mentions         TEXT NOT NULL DEFAULT '[]',
                location         TEXT,
                hide_counts      INTEGER NOT NULL DEFAULT 0,
                scheduled_at     TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_posts_user ON posts(user_id, content_type);

            CREATE TABLE interactions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                content_id  TEXT NOT NULL,
                kind        TEXT NOT NULL,
                body        TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_interactions_content ON interactions(content_id, kind);
            CREATE UNIQUE INDEX idx_interactions_one_like
                ON interactions(user_id, content_id) WHERE kind = 'like';

            CREATE TABLE ad_campaigns (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES profiles(id),
                content_id      TEXT NOT NULL,
                duration_hours  INTEGER NOT NULL,
                radius_km       INTEGER NOT NULL,
                price           REAL NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending',
                start_time      TEXT NOT NULL,
                end_time        TEXT NOT NULL,
                views           INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_ad_campaigns_user ON ad_campaigns(user_id);

            CREATE TABLE ad_price_tiers (
                id              TEXT PRIMARY KEY,
                duration_hours  INTEGER NOT NULL,
                radius_km       INTEGER NOT NULL,
                price           REAL NOT NULL
            );

            CREATE TABLE content_drafts (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES profiles(id),
                content_type  TEXT,
                payload       TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            );

            -- Default campaign packages
            INSERT INTO ad_price_tiers (id, duration_hours, radius_km, price) VALUES
                ('00000000-0000-0000-0000-00000000a001', 24, 5, 199.0),
                ('00000000-0000-0000-0000-00000000a002', 72, 25, 499.0),
                ('00000000-0000-0000-0000-00000000a003', 168, 50, 999.0);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
