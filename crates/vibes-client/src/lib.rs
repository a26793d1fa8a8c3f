//! Orchestration core of the Vibes client: upload sessions and their edit
//! state, friend-request flows, ad campaigns and liked posts.
//!
//! Every component is built from a [`ClientContext`], which bundles the data
//! collaborator, the signed-in session, a clock and the notifier.

pub mod backend;
pub mod cache;
pub mod campaigns;
pub mod clock;
pub mod config;
pub mod edit;
pub mod error;
pub mod likes;
pub mod notify;
pub mod payments;
pub mod saga;
pub mod session;
pub mod social;
pub mod storage;
pub mod upload;

use std::sync::Arc;

use tracing::info;
use vibes_db::Database;

use crate::backend::{Backend, SqliteBackend};
use crate::campaigns::CampaignManager;
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::likes::LikedPosts;
use crate::notify::{LogNotifier, Notifier};
use crate::payments::{HttpPaymentGateway, PaymentGateway};
use crate::session::Session;
use crate::social::SocialGraph;
use crate::storage::{LocalStorage, ObjectStorage};
use crate::upload::UploadController;

pub use crate::error::{ClientError, Result};

/// Shared handles every component needs.
#[derive(Clone)]
pub struct ClientContext {
    pub backend: Arc<dyn Backend>,
    pub session: Session,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<ClientConfig>,
}

impl ClientContext {
    pub fn new(backend: Arc<dyn Backend>, session: Session) -> Self {
        Self {
            backend,
            session,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier::default()),
            config: Arc::new(ClientConfig::default()),
        }
    }

    /// Context over the SQLite database named in `config`.
    pub fn open(config: ClientConfig, session: Session) -> anyhow::Result<Self> {
        let db = Database::open(&config.db_path)?;
        info!("Client backend ready at {}", config.db_path.display());
        Ok(Self::new(Arc::new(SqliteBackend::new(Arc::new(db))), session).with_config(config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

/// Entry point wiring a context to its storage and payment collaborators.
#[derive(Clone)]
pub struct VibesClient {
    ctx: ClientContext,
    storage: Arc<dyn ObjectStorage>,
    gateway: Arc<dyn PaymentGateway>,
}

impl VibesClient {
    pub fn new(
        ctx: ClientContext,
        storage: Arc<dyn ObjectStorage>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            ctx,
            storage,
            gateway,
        }
    }

    /// Local database, local object storage and the HTTP payment service,
    /// all as named in `config`.
    pub async fn connect(config: ClientConfig, session: Session) -> anyhow::Result<Self> {
        let storage = LocalStorage::new(config.storage_dir.clone(), config.public_url.clone()).await?;
        let gateway = HttpPaymentGateway::new(config.payments_url.clone());
        let ctx = ClientContext::open(config, session)?;
        Ok(Self::new(ctx, Arc::new(storage), Arc::new(gateway)))
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    pub fn upload_session(&self) -> UploadController {
        UploadController::new(self.ctx.clone(), self.storage.clone())
    }

    pub fn social_graph(&self) -> SocialGraph {
        SocialGraph::new(self.ctx.clone())
    }

    pub fn campaign_manager(&self) -> CampaignManager {
        CampaignManager::new(self.ctx.clone(), self.gateway.clone())
    }

    pub fn liked_posts(&self) -> LikedPosts {
        LikedPosts::new(self.ctx.clone())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;
    use vibes_db::Database;
    use vibes_types::models::{AccountKind, Profile};

    use crate::ClientContext;
    use crate::backend::SqliteBackend;
    use crate::clock::ManualClock;
    use crate::session::Session;

    pub struct Harness {
        pub db: Arc<Database>,
        pub clock: Arc<ManualClock>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                db: Arc::new(Database::open_in_memory().unwrap()),
                clock: Arc::new(ManualClock::default()),
            }
        }

        pub fn profile(&self, username: &str, kind: AccountKind) -> Uuid {
            let profile = Profile {
                id: Uuid::new_v4(),
                username: username.to_string(),
                account_kind: kind,
                verified: false,
                created_at: Utc::now(),
            };
            self.db.insert_profile(&profile).unwrap();
            profile.id
        }

        /// Context acting as `user`.
        pub fn context(&self, user: Uuid) -> ClientContext {
            ClientContext::new(
                Arc::new(SqliteBackend::new(self.db.clone())),
                Session::for_user(user),
            )
            .with_clock(self.clock.clone())
        }
    }
}
