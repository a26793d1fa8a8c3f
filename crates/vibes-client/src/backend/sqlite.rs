use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vibes_db::Database;
use vibes_types::models::{
    AdCampaign, CampaignStatus, ContentDraft, ContentType, FriendRequest, FriendRequestStatus,
    InteractionKind, PriceTier, Post, Profile, ProfileLink,
};

use super::Backend;

/// [`Backend`] over the bundled SQLite database. Queries run on the blocking
/// pool so callers never stall the async runtime.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Arc<Database>,
}

impl SqliteBackend {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.run(move |db| db.get_profile(id)).await
    }

    async fn get_profile_links(
        &self,
        profile_id: Uuid,
        include_badges: bool,
    ) -> Result<Vec<ProfileLink>> {
        self.run(move |db| db.profile_links(profile_id, include_badges)).await
    }

    async fn find_request_between(&self, a: Uuid, b: Uuid) -> Result<Option<FriendRequest>> {
        self.run(move |db| db.find_request_between(a, b)).await
    }

    async fn get_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        self.run(move |db| db.get_friend_request(id)).await
    }

    async fn insert_friend_request(&self, request: &FriendRequest) -> Result<()> {
        let request = request.clone();
        self.run(move |db| db.insert_friend_request(&request)).await
    }

    async fn update_request_status(&self, id: Uuid, status: FriendRequestStatus) -> Result<bool> {
        self.run(move |db| db.update_request_status(id, status)).await
    }

    async fn delete_requests_between(&self, a: Uuid, b: Uuid) -> Result<usize> {
        self.run(move |db| db.delete_requests_between(a, b)).await
    }

    async fn count_accepted_requests(&self, profile_id: Uuid) -> Result<u64> {
        self.run(move |db| db.count_accepted_requests(profile_id)).await
    }

    async fn pending_requests_for(&self, receiver_id: Uuid) -> Result<Vec<FriendRequest>> {
        self.run(move |db| db.pending_requests_for(receiver_id)).await
    }

    async fn insert_follow_pair(&self, a: Uuid, b: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.run(move |db| db.insert_follow_pair(a, b, at)).await
    }

    async fn delete_follow_pair(&self, a: Uuid, b: Uuid) -> Result<usize> {
        self.run(move |db| db.delete_follow_pair(a, b)).await
    }

    async fn count_followers(&self, profile_id: Uuid) -> Result<u64> {
        self.run(move |db| db.count_followers(profile_id)).await
    }

    async fn count_followed_brands(&self, profile_id: Uuid) -> Result<u64> {
        self.run(move |db| db.count_followed_brands(profile_id)).await
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        let post = post.clone();
        self.run(move |db| db.insert_post(&post)).await
    }

    async fn count_posts(&self, user_id: Uuid, content_type: ContentType) -> Result<u64> {
        self.run(move |db| db.count_posts(user_id, content_type)).await
    }

    async fn count_interactions(&self, content_id: Uuid, kind: InteractionKind) -> Result<u64> {
        self.run(move |db| db.count_interactions(content_id, kind)).await
    }

    async fn insert_like(&self, user_id: Uuid, content_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.run(move |db| db.insert_interaction(user_id, content_id, InteractionKind::Like, None, at))
            .await
    }

    async fn delete_like(&self, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        self.run(move |db| db.delete_like(user_id, content_id)).await
    }

    async fn liked_content_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.run(move |db| db.liked_content_ids(user_id)).await
    }

    async fn campaigns_for_user(&self, user_id: Uuid) -> Result<Vec<AdCampaign>> {
        self.run(move |db| db.campaigns_for_user(user_id)).await
    }

    async fn insert_campaign(&self, campaign: &AdCampaign) -> Result<()> {
        let campaign = campaign.clone();
        self.run(move |db| db.insert_campaign(&campaign)).await
    }

    async fn update_campaign_status(
        &self,
        id: Uuid,
        user_id: Uuid,
        status: CampaignStatus,
    ) -> Result<bool> {
        self.run(move |db| db.update_campaign_status(id, user_id, status)).await
    }

    async fn list_price_tiers(&self) -> Result<Vec<PriceTier>> {
        self.run(|db| db.list_price_tiers()).await
    }

    async fn insert_draft(&self, draft: &ContentDraft) -> Result<()> {
        let draft = draft.clone();
        self.run(move |db| db.insert_draft(&draft)).await
    }

    async fn update_draft(&self, draft: &ContentDraft) -> Result<bool> {
        let draft = draft.clone();
        self.run(move |db| db.update_draft(&draft)).await
    }

    async fn delete_draft(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.run(move |db| db.delete_draft(id, user_id)).await
    }

    async fn get_draft(&self, id: Uuid) -> Result<Option<ContentDraft>> {
        self.run(move |db| db.get_draft(id)).await
    }

    async fn list_drafts(&self, user_id: Uuid) -> Result<Vec<ContentDraft>> {
        self.run(move |db| db.list_drafts(user_id)).await
    }
}
