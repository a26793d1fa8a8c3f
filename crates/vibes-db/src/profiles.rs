use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;
use vibes_types::models::{AccountKind, Profile, ProfileLink};

use crate::Database;
use crate::rows::{enum_col, ts, ts_col, uuid_col};

impl Database {
    pub fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, account_kind, verified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile.id.to_string(),
                    profile.username,
                    profile.account_kind.as_str(),
                    profile.verified,
                    ts(&profile.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| {
            let profile = conn
                .query_row(
                    "SELECT id, username, account_kind, verified, created_at
                     FROM profiles WHERE id = ?1",
                    [id.to_string()],
                    profile_from_row,
                )
                .optional()?;
            Ok(profile)
        })
    }

    /// The `get_profile_links` procedure: every profile that follows `profile_id`
    /// or shares an accepted friend request with it.
    ///
    /// With `include_badges`, each link is tagged `brand` (business account),
    /// `verified`, and `mutual` (follow edges in both directions).
    pub fn profile_links(&self, profile_id: Uuid, include_badges: bool) -> Result<Vec<ProfileLink>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.username, p.account_kind, p.verified,
                        EXISTS (SELECT 1 FROM follows a
                                WHERE a.follower_id = ?1 AND a.following_id = p.id)
                        AND EXISTS (SELECT 1 FROM follows b
                                    WHERE b.follower_id = p.id AND b.following_id = ?1)
                 FROM profiles p
                 WHERE p.id IN (
                     SELECT follower_id FROM follows WHERE following_id = ?1
                     UNION
                     SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END
                     FROM friend_requests
                     WHERE status = 'accepted' AND (sender_id = ?1 OR receiver_id = ?1)
                 )
                 ORDER BY p.username",
            )?;

            let links = stmt
                .query_map([profile_id.to_string()], |row| {
                    let account_kind = enum_col(row, 2, AccountKind::parse)?;
                    let verified: bool = row.get(3)?;
                    let mutual: bool = row.get(4)?;

                    let mut badges = Vec::new();
                    if include_badges {
                        if account_kind == AccountKind::Business {
                            badges.push("brand".to_string());
                        }
                        if verified {
                            badges.push("verified".to_string());
                        }
                        if mutual {
                            badges.push("mutual".to_string());
                        }
                    }

                    Ok(ProfileLink {
                        profile_id: uuid_col(row, 0)?,
                        username: row.get(1)?,
                        account_kind,
                        badges,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(links)
        })
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: uuid_col(row, 0)?,
        username: row.get(1)?,
        account_kind: enum_col(row, 2, AccountKind::parse)?,
        verified: row.get(3)?,
        created_at: ts_col(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::profile;
    use chrono::Utc;

    #[test]
    fn profile_roundtrips_account_kind() {
        let db = Database::open_in_memory().unwrap();
        let id = profile(&db, "acme", AccountKind::Business);

        let loaded = db.get_profile(id).unwrap().unwrap();
        assert_eq!(loaded.username, "acme");
        assert_eq!(loaded.account_kind, AccountKind::Business);
        assert!(db.get_profile(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn links_include_followers_and_friends_with_badges() {
        let db = Database::open_in_memory().unwrap();
        let me = profile(&db, "me", AccountKind::Personal);
        let friend = profile(&db, "friend", AccountKind::Personal);
        let brand = profile(&db, "brand", AccountKind::Business);
        let stranger = profile(&db, "stranger", AccountKind::Personal);

        db.insert_follow_pair(me, friend, Utc::now()).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, following_id, created_at) VALUES (?1, ?2, ?3)",
                params![brand.to_string(), me.to_string(), ts(&Utc::now())],
            )?;
            Ok(())
        })
        .unwrap();

        let links = db.profile_links(me, true).unwrap();
        let names: Vec<_> = links.iter().map(|l| l.username.as_str()).collect();
        assert_eq!(names, vec!["brand", "friend"]);
        assert_eq!(links[0].badges, vec!["brand".to_string()]);
        assert_eq!(links[1].badges, vec!["mutual".to_string()]);
        assert!(links.iter().all(|l| l.profile_id != stranger));

        let plain = db.profile_links(me, false).unwrap();
        assert!(plain.iter().all(|l| l.badges.is_empty()));
    }
}
