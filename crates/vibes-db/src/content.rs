use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;
use vibes_types::models::{ContentDraft, ContentType, InteractionKind, Post};

use crate::Database;
use crate::rows::{count_col, enum_col, json_col, opt_ts_col, strings_col, ts, ts_col, uuid_col};

impl Database {
    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        let additional_urls = serde_json::to_string(&post.additional_urls)?;
        let hashtags = serde_json::to_string(&post.hashtags)?;
        let mentions = serde_json::to_string(&post.mentions)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, content_type, media_url, additional_urls, caption,
                                    hashtags, mentions, location, hide_counts, scheduled_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    post.id.to_string(),
                    post.user_id.to_string(),
                    post.content_type.as_str(),
                    post.media_url,
                    additional_urls,
                    post.caption,
                    hashtags,
                    mentions,
                    post.location,
                    post.hide_counts,
                    post.scheduled_at.as_ref().map(ts),
                    ts(&post.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let post = conn
                .query_row(
                    "SELECT id, user_id, content_type, media_url, additional_urls, caption,
                            hashtags, mentions, location, hide_counts, scheduled_at, created_at
                     FROM posts WHERE id = ?1",
                    [id.to_string()],
                    post_from_row,
                )
                .optional()?;
            Ok(post)
        })
    }

    pub fn count_posts(&self, user_id: Uuid, content_type: ContentType) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND content_type = ?2",
                params![user_id.to_string(), content_type.as_str()],
                |row| count_col(row, 0),
            )?;
            Ok(n)
        })
    }

    // -- Interactions --

    /// Returns false when the row was ignored (a repeated like).
    pub fn insert_interaction(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        kind: InteractionKind,
        body: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT OR IGNORE INTO interactions (id, user_id, content_id, kind, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    content_id.to_string(),
                    kind.as_str(),
                    body,
                    ts(&at),
                ],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn delete_like(&self, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM interactions WHERE user_id = ?1 AND content_id = ?2 AND kind = 'like'",
                params![user_id.to_string(), content_id.to_string()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn liked_content_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT content_id FROM interactions WHERE user_id = ?1 AND kind = 'like'",
            )?;
            let ids = stmt
                .query_map([user_id.to_string()], |row| uuid_col(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn count_interactions(&self, content_id: Uuid, kind: InteractionKind) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM interactions WHERE content_id = ?1 AND kind = ?2",
                params![content_id.to_string(), kind.as_str()],
                |row| count_col(row, 0),
            )?;
            Ok(n)
        })
    }

    // -- Drafts --

    pub fn insert_draft(&self, draft: &ContentDraft) -> Result<()> {
        let payload = serde_json::to_string(&draft.payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO content_drafts (id, user_id, content_type, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.id.to_string(),
                    draft.user_id.to_string(),
                    draft.content_type.map(|c| c.as_str()),
                    payload,
                    ts(&draft.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Overwrite a draft owned by `draft.user_id`. Returns false when no such draft exists.
    pub fn update_draft(&self, draft: &ContentDraft) -> Result<bool> {
        let payload = serde_json::to_string(&draft.payload)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE content_drafts SET content_type = ?3, payload = ?4, updated_at = ?5
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    draft.id.to_string(),
                    draft.user_id.to_string(),
                    draft.content_type.map(|c| c.as_str()),
                    payload,
                    ts(&draft.updated_at),
                ],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn delete_draft(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM content_drafts WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn get_draft(&self, id: Uuid) -> Result<Option<ContentDraft>> {
        self.with_conn(|conn| {
            let draft = conn
                .query_row(
                    "SELECT id, user_id, content_type, payload, updated_at
                     FROM content_drafts WHERE id = ?1",
                    [id.to_string()],
                    draft_from_row,
                )
                .optional()?;
            Ok(draft)
        })
    }

    pub fn list_drafts(&self, user_id: Uuid) -> Result<Vec<ContentDraft>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content_type, payload, updated_at
                 FROM content_drafts WHERE user_id = ?1
                 ORDER BY updated_at DESC",
            )?;
            let drafts = stmt
                .query_map([user_id.to_string()], draft_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(drafts)
        })
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        content_type: enum_col(row, 2, ContentType::parse)?,
        media_url: row.get(3)?,
        additional_urls: strings_col(row, 4)?,
        caption: row.get(5)?,
        hashtags: strings_col(row, 6)?,
        mentions: strings_col(row, 7)?,
        location: row.get(8)?,
        hide_counts: row.get(9)?,
        scheduled_at: opt_ts_col(row, 10)?,
        created_at: ts_col(row, 11)?,
    })
}

fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<ContentDraft> {
    let content_type = match row.get::<_, Option<String>>(2)? {
        Some(_) => Some(enum_col(row, 2, ContentType::parse)?),
        None => None,
    };
    Ok(ContentDraft {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        content_type,
        payload: json_col(row, 3)?,
        updated_at: ts_col(row, 4)?,
    })
}
