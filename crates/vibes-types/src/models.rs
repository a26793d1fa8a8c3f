use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Content --

/// The two post formats the app publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Photo or carousel post, up to ten images.
    Vibe,
    /// Short vertical video, a single file.
    Banger,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vibe => "vibe",
            Self::Banger => "banger",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vibe" => Some(Self::Vibe),
            "banger" => Some(Self::Banger),
            _ => None,
        }
    }

    /// Object storage bucket holding uploads of this type.
    pub fn bucket(&self) -> &'static str {
        match self {
            Self::Vibe => "vibes",
            Self::Banger => "bangers",
        }
    }

    pub fn max_files(&self) -> usize {
        match self {
            Self::Vibe => 10,
            Self::Banger => 1,
        }
    }

    /// Whether a MIME type can be attached to a post of this type.
    pub fn accepts_mime(&self, mime: &str) -> bool {
        match self {
            Self::Vibe => mime.starts_with("image/"),
            Self::Banger => mime.starts_with("video/"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: ContentType,
    pub media_url: String,
    pub additional_urls: Vec<String>,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub location: Option<String>,
    pub hide_counts: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Autosaved upload session. The payload is opaque JSON owned by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: Option<ContentType>,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Comment,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
        }
    }
}

// -- Profiles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Personal,
    Business,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub account_kind: AccountKind,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Counts shown on a profile header.
///
/// `links` means mutual friends for personal accounts and followers for
/// business accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub links: u64,
    pub vibes: u64,
    pub bangers: u64,
    pub brands: u64,
}

/// A connected profile as returned by the `get_profile_links` procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLink {
    pub profile_id: Uuid,
    pub username: String,
    pub account_kind: AccountKind,
    pub badges: Vec<String>,
}

// -- Social graph --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

// -- Advertising --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Active,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdCampaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub duration_hours: u32,
    pub radius_km: u32,
    pub price: f64,
    pub status: CampaignStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub views: u64,
    /// Joined from interaction records on `content_id`.
    pub likes_count: u64,
    pub comments_count: u64,
}

/// A fixed (duration, radius, price) package offered for campaigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub id: Uuid,
    pub duration_hours: u32,
    pub radius_km: u32,
    pub price: f64,
}

/// One point of the audience-size curve: users reachable within `distance_km`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachSample {
    pub distance_km: u32,
    pub user_count: u64,
}
