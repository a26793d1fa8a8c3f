use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;
use vibes_types::models::{AdCampaign, CampaignStatus, PriceTier};

use crate::Database;
use crate::rows::{count_col, enum_col, ts, ts_col, uuid_col};

impl Database {
    pub fn insert_campaign(&self, campaign: &AdCampaign) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ad_campaigns (id, user_id, content_id, duration_hours, radius_km, price,
                                           status, start_time, end_time, views)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    campaign.id.to_string(),
                    campaign.user_id.to_string(),
                    campaign.content_id.to_string(),
                    campaign.duration_hours,
                    campaign.radius_km,
                    campaign.price,
                    campaign.status.as_str(),
                    ts(&campaign.start_time),
                    ts(&campaign.end_time),
                    campaign.views as i64,
                ],
            )?;
            Ok(())
        })
    }

    /// Campaigns owned by `user_id`, newest first. Like and comment counts are
    /// left at zero; callers join them from interactions.
    pub fn campaigns_for_user(&self, user_id: Uuid) -> Result<Vec<AdCampaign>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content_id, duration_hours, radius_km, price,
                        status, start_time, end_time, views
                 FROM ad_campaigns WHERE user_id = ?1
                 ORDER BY start_time DESC",
            )?;
            let campaigns = stmt
                .query_map([user_id.to_string()], campaign_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(campaigns)
        })
    }

    /// Returns false unless a campaign with that id belongs to `user_id` and
    /// is not already in `status`.
    pub fn update_campaign_status(
        &self,
        id: Uuid,
        user_id: Uuid,
        status: CampaignStatus,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE ad_campaigns SET status = ?3 WHERE id = ?1 AND user_id = ?2 AND status != ?3",
                params![id.to_string(), user_id.to_string(), status.as_str()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn list_price_tiers(&self) -> Result<Vec<PriceTier>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, duration_hours, radius_km, price FROM ad_price_tiers ORDER BY price ASC",
            )?;
            let tiers = stmt
                .query_map([], |row| {
                    Ok(PriceTier {
                        id: uuid_col(row, 0)?,
                        duration_hours: row.get(1)?,
                        radius_km: row.get(2)?,
                        price: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tiers)
        })
    }
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<AdCampaign> {
    Ok(AdCampaign {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        content_id: uuid_col(row, 2)?,
        duration_hours: row.get(3)?,
        radius_km: row.get(4)?,
        price: row.get(5)?,
        status: enum_col(row, 6, CampaignStatus::parse)?,
        start_time: ts_col(row, 7)?,
        end_time: ts_col(row, 8)?,
        views: count_col(row, 9)?,
        likes_count: 0,
        comments_count: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::profile;
    use chrono::{Duration, Utc};
    use vibes_types::models::AccountKind;

    #[test]
    fn default_tiers_are_seeded_in_price_order() {
        let db = Database::open_in_memory().unwrap();
        let tiers = db.list_price_tiers().unwrap();
        assert_eq!(tiers.len(), 3);
        assert!(tiers.windows(2).all(|w| w[0].price <= w[1].price));
        assert_eq!(tiers[0].radius_km, 5);
    }

    #[test]
    fn status_update_is_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = profile(&db, "owner", AccountKind::Business);
        let other = profile(&db, "other", AccountKind::Business);
        let now = Utc::now();
        let campaign = AdCampaign {
            id: Uuid::new_v4(),
            user_id: owner,
            content_id: Uuid::new_v4(),
            duration_hours: 24,
            radius_km: 5,
            price: 199.0,
            status: CampaignStatus::Active,
            start_time: now,
            end_time: now + Duration::hours(24),
            views: 12,
            likes_count: 0,
            comments_count: 0,
        };
        db.insert_campaign(&campaign).unwrap();

        assert!(!db.update_campaign_status(campaign.id, other, CampaignStatus::Completed).unwrap());
        assert!(db.update_campaign_status(campaign.id, owner, CampaignStatus::Completed).unwrap());
        assert!(!db.update_campaign_status(campaign.id, owner, CampaignStatus::Completed).unwrap());

        let loaded = db.campaigns_for_user(owner).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, CampaignStatus::Completed);
        assert_eq!(loaded[0].views, 12);
    }
}
