//! Paid promotion of posts: listing, stopping and buying campaigns.
//!
//! The campaign list is an [`OptimisticCache`]: stopping a campaign hides it
//! from the active list at once, and the next reload settles what the server
//! actually holds.

use std::sync::Arc;

use chrono::Duration;
use futures_util::future::try_join_all;
use serde_json::json;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vibes_types::api::{CreateOrderRequest, VerifyPaymentRequest};
use vibes_types::events::NotificationEvent;
use vibes_types::models::{AdCampaign, CampaignStatus, InteractionKind, PriceTier, ReachSample};

use crate::ClientContext;
use crate::cache::{OptimisticCache, Patch};
use crate::error::{ClientError, Result};
use crate::notify::notify_best_effort;
use crate::payments::{Checkout, PaymentGateway, PaymentOutcome, validate_amount};
use crate::saga::StepLog;

const CREATE_FLOW: &str = "create_campaign";
const STEP_CREATE_ORDER: &str = "create_order";
const STEP_CHECKOUT: &str = "checkout";
const STEP_VERIFY: &str = "verify_payment";
const STEP_INSERT: &str = "insert_campaign";

/// The actor's campaigns split for display. Pending campaigns count as active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignBoard {
    pub active: Vec<AdCampaign>,
    pub completed: Vec<AdCampaign>,
}

impl CampaignBoard {
    pub fn from_campaigns(campaigns: Vec<AdCampaign>) -> Self {
        let (completed, active) = campaigns
            .into_iter()
            .partition(|c| c.status == CampaignStatus::Completed);
        Self { active, completed }
    }

    pub fn find(&self, id: Uuid) -> Option<&AdCampaign> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignPatch {
    Stop(Uuid),
}

impl Patch<CampaignBoard> for CampaignPatch {
    fn apply(&self, board: &mut CampaignBoard) {
        match *self {
            Self::Stop(id) => {
                if let Some(i) = board.active.iter().position(|c| c.id == id) {
                    let mut campaign = board.active.remove(i);
                    campaign.status = CampaignStatus::Completed;
                    board.completed.insert(0, campaign);
                }
            }
        }
    }
}

/// Users reachable within `radius_km`: the first sample at or beyond the
/// radius, or 0 when the curve stops short of it.
pub fn estimate_reach(samples: &[ReachSample], radius_km: u32) -> u64 {
    samples
        .iter()
        .find(|s| s.distance_km >= radius_km)
        .map(|s| s.user_count)
        .unwrap_or(0)
}

/// A campaign that was paid for but could not be stored.
#[derive(Debug, Clone)]
pub struct UnsettledCampaign {
    pub campaign: AdCampaign,
    pub payment: VerifyPaymentRequest,
    pub log: StepLog,
}

pub struct CampaignManager {
    ctx: ClientContext,
    gateway: Arc<dyn PaymentGateway>,
    board: OptimisticCache<CampaignBoard, CampaignPatch>,
    unsettled: Vec<UnsettledCampaign>,
}

impl CampaignManager {
    pub fn new(ctx: ClientContext, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            ctx,
            gateway,
            board: OptimisticCache::new(),
            unsettled: Vec::new(),
        }
    }

    /// Current view, with pending stops applied. `None` until the first load.
    pub fn board(&self) -> Option<CampaignBoard> {
        self.board.view()
    }

    pub fn confirmed_board(&self) -> Option<&CampaignBoard> {
        self.board.confirmed()
    }

    pub async fn load_campaigns(&mut self) -> Result<CampaignBoard> {
        let actor = self.ctx.session.actor()?;
        let backend = &self.ctx.backend;
        let campaigns = backend.campaigns_for_user(actor).await?;

        let campaigns = try_join_all(campaigns.into_iter().map(|mut campaign| async move {
            let (likes, comments) = futures_util::try_join!(
                backend.count_interactions(campaign.content_id, InteractionKind::Like),
                backend.count_interactions(campaign.content_id, InteractionKind::Comment),
            )?;
            campaign.likes_count = likes;
            campaign.comments_count = comments;
            Ok::<_, anyhow::Error>(campaign)
        }))
        .await?;

        let board = CampaignBoard::from_campaigns(campaigns);
        debug!(
            "Loaded {} active and {} completed campaigns",
            board.active.len(),
            board.completed.len()
        );
        self.board.confirm(board.clone(), self.ctx.clock.now());
        Ok(board)
    }

    /// Reload when the poll interval elapsed on the context clock.
    pub async fn refresh_if_due(&mut self) -> Result<bool> {
        if !self
            .board
            .is_due(self.ctx.clock.now(), self.ctx.config.poll_interval)
        {
            return Ok(false);
        }
        self.load_campaigns().await?;
        Ok(true)
    }

    /// Hide an active campaign locally. Dropped by the next reload.
    pub fn mark_stopped(&mut self, id: Uuid) -> Result<()> {
        let shown = self
            .board
            .view()
            .is_some_and(|b| b.active.iter().any(|c| c.id == id));
        if !shown {
            return Err(ClientError::not_found("Campaign is not running"));
        }
        self.board.push(CampaignPatch::Stop(id));
        Ok(())
    }

    /// Stop a campaign the actor owns. The local view hides it right away when
    /// it is on the board. The remote update is sent either way.
    pub async fn stop_campaign(&mut self, id: Uuid) -> Result<()> {
        let actor = self.ctx.session.actor()?;
        if self.mark_stopped(id).is_err() {
            debug!("Campaign {} is not on the board, stopping remotely only", id);
        }

        let stopped = self
            .ctx
            .backend
            .update_campaign_status(id, actor, CampaignStatus::Completed)
            .await;

        // server state wins either way
        if let Err(e) = self.load_campaigns().await {
            warn!("Reload after stopping {} failed: {}", id, e);
        }

        if !stopped? {
            return Err(ClientError::not_found("Campaign not found"));
        }
        info!("Stopped campaign {}", id);
        Ok(())
    }

    pub fn estimate_reach(&self, radius_km: u32) -> u64 {
        estimate_reach(&self.ctx.config.reach_samples, radius_km)
    }

    pub async fn price_tiers(&self) -> Result<Vec<PriceTier>> {
        Ok(self.ctx.backend.list_price_tiers().await?)
    }

    /// Pay for `tier` and start promoting `content_id`.
    ///
    /// Nothing is stored unless the payment succeeds and verifies. If storing
    /// fails after that, the campaign is kept in [`unsettled`](Self::unsettled).
    pub async fn create_campaign(
        &mut self,
        tier: &PriceTier,
        content_id: Uuid,
        checkout: &dyn Checkout,
    ) -> Result<AdCampaign> {
        let actor = self.ctx.session.actor()?;
        validate_amount(tier.price)?;
        let mut log = StepLog::new(CREATE_FLOW);

        let request = CreateOrderRequest {
            amount: tier.price,
            currency: Some(self.ctx.config.currency.clone()),
            notes: Some(json!({
                "content_id": content_id,
                "tier_id": tier.id,
            })),
            description: Some(format!(
                "{}h campaign within {} km",
                tier.duration_hours, tier.radius_km
            )),
        };
        let order = match self.gateway.create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                log.fail(STEP_CREATE_ORDER, format!("{:#}", e));
                warn!("{}", log);
                return Err(e.into());
            }
        };
        log.complete(STEP_CREATE_ORDER);
        debug!("Order {} created for {} {}", order.id, order.amount, order.currency);

        let payment = match checkout.collect(&order).await {
            PaymentOutcome::Succeeded(payment) if payment.order_id == order.id => payment,
            PaymentOutcome::Succeeded(payment) => {
                log.fail(STEP_CHECKOUT, "order mismatch");
                warn!("Checkout returned order {} for {}", payment.order_id, order.id);
                return Err(ClientError::Remote("Payment does not match the order".into()));
            }
            PaymentOutcome::Failed(reason) => {
                log.fail(STEP_CHECKOUT, reason.clone());
                info!("{}", log);
                return Err(ClientError::Remote(reason));
            }
            PaymentOutcome::Cancelled => {
                log.fail(STEP_CHECKOUT, "cancelled");
                info!("{}", log);
                return Err(ClientError::Remote("Payment was cancelled".into()));
            }
        };
        log.complete(STEP_CHECKOUT);

        if !self.gateway.verify(&payment).await? {
            log.fail(STEP_VERIFY, "signature mismatch");
            warn!("{}", log);
            return Err(ClientError::Remote("Payment could not be verified".into()));
        }
        log.complete(STEP_VERIFY);

        let start_time = self.ctx.clock.now();
        let campaign = AdCampaign {
            id: Uuid::new_v4(),
            user_id: actor,
            content_id,
            duration_hours: tier.duration_hours,
            radius_km: tier.radius_km,
            price: tier.price,
            status: CampaignStatus::Active,
            start_time,
            end_time: start_time + Duration::hours(i64::from(tier.duration_hours)),
            views: 0,
            likes_count: 0,
            comments_count: 0,
        };

        if let Err(e) = self.ctx.backend.insert_campaign(&campaign).await {
            log.fail(STEP_INSERT, format!("{:#}", e));
            warn!("Paid campaign not stored, {}", log);
            self.unsettled.push(UnsettledCampaign {
                campaign,
                payment,
                log,
            });
            return Err(e.into());
        }

        self.started(&campaign).await;
        Ok(campaign)
    }

    pub fn unsettled(&self) -> &[UnsettledCampaign] {
        &self.unsettled
    }

    /// Retry storing paid campaigns. Returns how many were stored.
    pub async fn settle_unsettled(&mut self) -> Result<usize> {
        self.ctx.session.actor()?;
        let mut settled = 0;

        for mut entry in std::mem::take(&mut self.unsettled) {
            match self.ctx.backend.insert_campaign(&entry.campaign).await {
                Ok(()) => {
                    entry.log.complete(STEP_INSERT);
                    debug!("Settled {}", entry.log);
                    self.started(&entry.campaign).await;
                    settled += 1;
                }
                Err(e) => {
                    warn!(
                        "Campaign {} for order {} still not stored: {:#}",
                        entry.campaign.id, entry.payment.order_id, e
                    );
                    self.unsettled.push(entry);
                }
            }
        }
        Ok(settled)
    }

    async fn started(&mut self, campaign: &AdCampaign) {
        info!("Campaign {} started for {}", campaign.id, campaign.content_id);
        notify_best_effort(
            self.ctx.notifier.as_ref(),
            NotificationEvent::CampaignStarted {
                campaign_id: campaign.id,
                content_id: campaign.content_id,
            },
        );
        if let Err(e) = self.load_campaigns().await {
            warn!("Reload after starting {} failed: {}", campaign.id, e);
        }
    }
}

/// Reload campaigns every poll interval and publish the view on `tx` until
/// every receiver is gone.
pub fn spawn_campaign_refresh(
    manager: Arc<Mutex<CampaignManager>>,
    tx: watch::Sender<CampaignBoard>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let every = manager.lock().await.ctx.config.poll_interval;
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                debug!("No listeners left, stopping campaign refresh");
                break;
            }
            let result = manager.lock().await.load_campaigns().await;
            match result {
                Ok(board) => {
                    tx.send_replace(board);
                }
                Err(e) => warn!("Campaign refresh failed: {}", e),
            }
        }
    })
}
