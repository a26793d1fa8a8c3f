use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;
use vibes_types::models::{FriendRequest, FriendRequestStatus};

use crate::Database;
use crate::rows::{count_col, enum_col, ts, ts_col, uuid_col};

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

impl Database {
    // -- Friend requests --

    pub fn insert_friend_request(&self, request: &FriendRequest) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    request.id.to_string(),
                    request.sender_id.to_string(),
                    request.receiver_id.to_string(),
                    request.status.as_str(),
                    ts(&request.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1");
            let request = conn
                .query_row(&sql, [id.to_string()], request_from_row)
                .optional()?;
            Ok(request)
        })
    }

    /// Any request between the two users regardless of direction or status.
    pub fn find_request_between(&self, a: Uuid, b: Uuid) -> Result<Option<FriendRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM friend_requests
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at DESC
                 LIMIT 1"
            );
            let request = conn
                .query_row(&sql, params![a.to_string(), b.to_string()], request_from_row)
                .optional()?;
            Ok(request)
        })
    }

    pub fn pending_requests_for(&self, receiver_id: Uuid) -> Result<Vec<FriendRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM friend_requests
                 WHERE receiver_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([receiver_id.to_string()], request_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no request has that id.
    pub fn update_request_status(&self, id: Uuid, status: FriendRequestStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE friend_requests SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn delete_requests_between(&self, a: Uuid, b: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM friend_requests
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)",
                params![a.to_string(), b.to_string()],
            )?;
            Ok(affected)
        })
    }

    pub fn count_accepted_requests(&self, profile_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM friend_requests
                 WHERE status = 'accepted' AND (sender_id = ?1 OR receiver_id = ?1)",
                [profile_id.to_string()],
                |row| count_col(row, 0),
            )?;
            Ok(n)
        })
    }

    // -- Follows --

    /// Insert `a -> b` and `b -> a` in one transaction. Existing edges are kept,
    /// so replaying the call is harmless.
    pub fn insert_follow_pair(&self, a: Uuid, b: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created_at = ts(&at);
            for (follower, following) in [(a, b), (b, a)] {
                tx.execute(
                    "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![follower.to_string(), following.to_string(), created_at],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Remove the edges in both directions. Returns how many existed.
    pub fn delete_follow_pair(&self, a: Uuid, b: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM follows
                 WHERE (follower_id = ?1 AND following_id = ?2)
                    OR (follower_id = ?2 AND following_id = ?1)",
                params![a.to_string(), b.to_string()],
            )?;
            Ok(affected)
        })
    }

    pub fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2)",
                params![follower_id.to_string(), following_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn count_followers(&self, profile_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
                [profile_id.to_string()],
                |row| count_col(row, 0),
            )?;
            Ok(n)
        })
    }

    /// Number of business accounts `profile_id` follows.
    pub fn count_followed_brands(&self, profile_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM follows f
                 JOIN profiles p ON p.id = f.following_id
                 WHERE f.follower_id = ?1 AND p.account_kind = 'business'",
                [profile_id.to_string()],
                |row| count_col(row, 0),
            )?;
            Ok(n)
        })
    }
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<FriendRequest> {
    Ok(FriendRequest {
        id: uuid_col(row, 0)?,
        sender_id: uuid_col(row, 1)?,
        receiver_id: uuid_col(row, 2)?,
        status: enum_col(row, 3, FriendRequestStatus::parse)?,
        created_at: ts_col(row, 4)?,
    })
}
