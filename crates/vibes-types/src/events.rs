use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local notifications raised by client-side flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    /// The actor sent a friend request
    FriendRequestSent { request_id: Uuid, receiver_id: Uuid },

    /// The actor accepted an incoming request
    FriendRequestAccepted { request_id: Uuid, sender_id: Uuid },

    /// A paid campaign went live
    CampaignStarted { campaign_id: Uuid, content_id: Uuid },

    /// A post finished publishing
    PostPublished { post_id: Uuid },
}

impl NotificationEvent {
    /// Title line shown by the platform notification.
    pub fn title(&self) -> &'static str {
        match self {
            Self::FriendRequestSent { .. } => "Friend request sent",
            Self::FriendRequestAccepted { .. } => "Friend request accepted",
            Self::CampaignStarted { .. } => "Campaign started",
            Self::PostPublished { .. } => "Post published",
        }
    }
}
