//! Friend requests, follow edges and profile counts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vibes_types::events::NotificationEvent;
use vibes_types::models::{
    AccountKind, ContentType, FriendRequest, FriendRequestStatus, ProfileLink, ProfileStats,
};

use crate::ClientContext;
use crate::clock::is_due;
use crate::error::{ClientError, Result};
use crate::notify::notify_best_effort;
use crate::saga::StepLog;

const ACCEPT_FLOW: &str = "accept_friend_request";
const STEP_UPDATE_STATUS: &str = "update_status";
const STEP_FOLLOW_EDGES: &str = "create_follow_edges";

/// An accept whose status update landed but whose follow edges did not.
#[derive(Debug, Clone)]
pub struct IncompleteAccept {
    pub request: FriendRequest,
    pub log: StepLog,
}

pub struct SocialGraph {
    ctx: ClientContext,
    incomplete: HashMap<Uuid, IncompleteAccept>,
    last_request_poll: Option<DateTime<Utc>>,
}

impl SocialGraph {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            incomplete: HashMap::new(),
            last_request_poll: None,
        }
    }

    pub async fn send_friend_request(&self, receiver_id: Uuid) -> Result<FriendRequest> {
        let sender_id = self.ctx.session.actor()?;
        if sender_id == receiver_id {
            return Err(ClientError::validation("You can't send a friend request to yourself"));
        }

        if let Some(existing) = self
            .ctx
            .backend
            .find_request_between(sender_id, receiver_id)
            .await?
        {
            debug!("Request {} already links {} and {}", existing.id, sender_id, receiver_id);
            return Err(ClientError::Conflict(
                "A friend request already exists between you and this user".into(),
            ));
        }

        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: FriendRequestStatus::Pending,
            created_at: self.ctx.clock.now(),
        };
        self.ctx.backend.insert_friend_request(&request).await?;

        info!("Friend request {} sent to {}", request.id, receiver_id);
        notify_best_effort(
            self.ctx.notifier.as_ref(),
            NotificationEvent::FriendRequestSent {
                request_id: request.id,
                receiver_id,
            },
        );
        Ok(request)
    }

    /// Accept or reject a pending request addressed to the actor.
    ///
    /// Accepting updates the status and then writes both follow edges. If the
    /// edges fail, the request stays accepted and the flow is remembered for
    /// [`resume_accept`](Self::resume_accept).
    pub async fn respond_to_friend_request(
        &mut self,
        request_id: Uuid,
        accept: bool,
    ) -> Result<FriendRequestStatus> {
        let actor = self.ctx.session.actor()?;
        let request = self
            .ctx
            .backend
            .get_friend_request(request_id)
            .await?
            .filter(|r| r.receiver_id == actor && r.status == FriendRequestStatus::Pending)
            .ok_or_else(|| ClientError::not_found("Friend request not found"))?;

        let status = if accept {
            FriendRequestStatus::Accepted
        } else {
            FriendRequestStatus::Rejected
        };

        let mut log = StepLog::new(ACCEPT_FLOW);
        if !self
            .ctx
            .backend
            .update_request_status(request_id, status)
            .await?
        {
            return Err(ClientError::not_found("Friend request not found"));
        }
        log.complete(STEP_UPDATE_STATUS);

        if !accept {
            info!("Friend request {} rejected", request_id);
            return Ok(status);
        }

        let now = self.ctx.clock.now();
        if let Err(e) = self
            .ctx
            .backend
            .insert_follow_pair(request.sender_id, actor, now)
            .await
        {
            log.fail(STEP_FOLLOW_EDGES, format!("{:#}", e));
            warn!("Partial accept, {}", log);
            self.incomplete
                .insert(request_id, IncompleteAccept { request, log });
            return Err(e.into());
        }
        log.complete(STEP_FOLLOW_EDGES);

        self.accepted(&request);
        Ok(status)
    }

    /// Replay the follow-edge write of an interrupted accept.
    pub async fn resume_accept(&mut self, request_id: Uuid) -> Result<()> {
        let actor = self.ctx.session.actor()?;
        let mut pending = self
            .incomplete
            .remove(&request_id)
            .filter(|p| p.request.receiver_id == actor)
            .ok_or_else(|| ClientError::not_found("No interrupted accept for this request"))?;

        let now = self.ctx.clock.now();
        match self
            .ctx
            .backend
            .insert_follow_pair(pending.request.sender_id, actor, now)
            .await
        {
            Ok(()) => {
                pending.log.complete(STEP_FOLLOW_EDGES);
                debug!("Resumed {}", pending.log);
                self.accepted(&pending.request);
                Ok(())
            }
            Err(e) => {
                warn!("Resuming accept {} failed again: {:#}", request_id, e);
                self.incomplete.insert(request_id, pending);
                Err(e.into())
            }
        }
    }

    pub fn incomplete_accept(&self, request_id: Uuid) -> Option<&IncompleteAccept> {
        self.incomplete.get(&request_id)
    }

    fn accepted(&self, request: &FriendRequest) {
        info!("Friend request {} accepted", request.id);
        notify_best_effort(
            self.ctx.notifier.as_ref(),
            NotificationEvent::FriendRequestAccepted {
                request_id: request.id,
                sender_id: request.sender_id,
            },
        );
    }

    /// Drop the follow edges and any request between the actor and `other`.
    pub async fn unfriend(&self, other: Uuid) -> Result<()> {
        let actor = self.ctx.session.actor()?;
        let edges = self.ctx.backend.delete_follow_pair(actor, other).await?;
        let requests = self.ctx.backend.delete_requests_between(actor, other).await?;
        debug!(
            "Unfriended {}: removed {} edges, {} requests",
            other, edges, requests
        );
        Ok(())
    }

    pub async fn get_profile_stats(&self, profile_id: Uuid) -> Result<ProfileStats> {
        self.ctx.session.actor()?;
        let backend = &self.ctx.backend;
        let profile = backend
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| ClientError::not_found("Profile not found"))?;

        let links = async {
            match profile.account_kind {
                AccountKind::Business => backend.count_followers(profile_id).await,
                AccountKind::Personal => backend.count_accepted_requests(profile_id).await,
            }
        };
        let (links, vibes, bangers, brands) = futures_util::try_join!(
            links,
            backend.count_posts(profile_id, ContentType::Vibe),
            backend.count_posts(profile_id, ContentType::Banger),
            backend.count_followed_brands(profile_id),
        )?;

        Ok(ProfileStats {
            links,
            vibes,
            bangers,
            brands,
        })
    }

    /// Connected profiles with badges. Personal and business accounts go
    /// through the same procedure.
    pub async fn get_profile_links(&self, profile_id: Uuid) -> Result<Vec<ProfileLink>> {
        self.ctx.session.actor()?;
        Ok(self.ctx.backend.get_profile_links(profile_id, true).await?)
    }

    /// Incoming requests still waiting for an answer.
    pub async fn pending_requests(&self) -> Result<Vec<FriendRequest>> {
        let actor = self.ctx.session.actor()?;
        Ok(self.ctx.backend.pending_requests_for(actor).await?)
    }

    /// Fetch pending requests when the poll interval elapsed on the context clock.
    pub async fn poll_requests_if_due(&mut self) -> Result<Option<Vec<FriendRequest>>> {
        let now = self.ctx.clock.now();
        if !is_due(self.last_request_poll, now, self.ctx.config.poll_interval) {
            return Ok(None);
        }
        self.last_request_poll = Some(now);
        self.pending_requests().await.map(Some)
    }
}

/// Publish the actor's pending requests on `tx` every poll interval until every
/// receiver is gone.
pub fn spawn_request_refresh(
    graph: Arc<Mutex<SocialGraph>>,
    tx: watch::Sender<Vec<FriendRequest>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let every = graph.lock().await.ctx.config.poll_interval;
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                debug!("No listeners left, stopping request refresh");
                break;
            }
            let result = graph.lock().await.pending_requests().await;
            match result {
                Ok(requests) => {
                    tx.send_replace(requests);
                }
                Err(e) => warn!("Friend request refresh failed: {}", e),
            }
        }
    })
}
