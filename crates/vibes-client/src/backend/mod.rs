//! The hosted data collaborator: tables and remote procedures.
//!
//! Components only see this trait. [`SqliteBackend`] is the bundled
//! implementation; a hosted backend client implements the same calls.

mod sqlite;

pub use sqlite::SqliteBackend;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vibes_types::models::{
    AdCampaign, CampaignStatus, ContentDraft, ContentType, FriendRequest, FriendRequestStatus,
    InteractionKind, PriceTier, Post, Profile, ProfileLink,
};

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    // -- profiles --

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    /// Remote procedure `get_profile_links`.
    async fn get_profile_links(&self, profile_id: Uuid, include_badges: bool)
    -> Result<Vec<ProfileLink>>;

    // -- friend_requests --

    async fn find_request_between(&self, a: Uuid, b: Uuid) -> Result<Option<FriendRequest>>;

    async fn get_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>>;

    async fn insert_friend_request(&self, request: &FriendRequest) -> Result<()>;

    /// Returns false when no request has that id.
    async fn update_request_status(&self, id: Uuid, status: FriendRequestStatus) -> Result<bool>;

    async fn delete_requests_between(&self, a: Uuid, b: Uuid) -> Result<usize>;

    async fn count_accepted_requests(&self, profile_id: Uuid) -> Result<u64>;

    async fn pending_requests_for(&self, receiver_id: Uuid) -> Result<Vec<FriendRequest>>;

    // -- follows --

    /// Both directed edges in one write; existing edges are left alone.
    async fn insert_follow_pair(&self, a: Uuid, b: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn delete_follow_pair(&self, a: Uuid, b: Uuid) -> Result<usize>;

    async fn count_followers(&self, profile_id: Uuid) -> Result<u64>;

    /// Followed profiles with a business account.
    async fn count_followed_brands(&self, profile_id: Uuid) -> Result<u64>;

    // -- posts --

    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn count_posts(&self, user_id: Uuid, content_type: ContentType) -> Result<u64>;

    // -- interactions --

    async fn count_interactions(&self, content_id: Uuid, kind: InteractionKind) -> Result<u64>;

    /// Returns false when the like already existed.
    async fn insert_like(&self, user_id: Uuid, content_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    async fn delete_like(&self, user_id: Uuid, content_id: Uuid) -> Result<bool>;

    async fn liked_content_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    // -- ad_campaigns / ad_price_tiers --

    async fn campaigns_for_user(&self, user_id: Uuid) -> Result<Vec<AdCampaign>>;

    async fn insert_campaign(&self, campaign: &AdCampaign) -> Result<()>;

    async fn update_campaign_status(
        &self,
        id: Uuid,
        user_id: Uuid,
        status: CampaignStatus,
    ) -> Result<bool>;

    async fn list_price_tiers(&self) -> Result<Vec<PriceTier>>;

    // -- content_drafts --

    async fn insert_draft(&self, draft: &ContentDraft) -> Result<()>;

    async fn update_draft(&self, draft: &ContentDraft) -> Result<bool>;

    async fn delete_draft(&self, id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn get_draft(&self, id: Uuid) -> Result<Option<ContentDraft>>;

    async fn list_drafts(&self, user_id: Uuid) -> Result<Vec<ContentDraft>>;
}
