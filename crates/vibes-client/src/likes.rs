use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::ClientContext;
use crate::cache::{OptimisticCache, Patch};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikePatch {
    Like(Uuid),
    Unlike(Uuid),
}

impl Patch<HashSet<Uuid>> for LikePatch {
    fn apply(&self, liked: &mut HashSet<Uuid>) {
        match *self {
            Self::Like(id) => {
                liked.insert(id);
            }
            Self::Unlike(id) => {
                liked.remove(&id);
            }
        }
    }
}

/// The actor's liked content, updated optimistically.
pub struct LikedPosts {
    ctx: ClientContext,
    liked: OptimisticCache<HashSet<Uuid>, LikePatch>,
}

impl LikedPosts {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            liked: OptimisticCache::new(),
        }
    }

    pub fn is_liked(&self, content_id: Uuid) -> bool {
        self.liked
            .view()
            .is_some_and(|liked| liked.contains(&content_id))
    }

    pub fn liked(&self) -> HashSet<Uuid> {
        self.liked.view().unwrap_or_default()
    }

    pub async fn reload(&mut self) -> Result<()> {
        let actor = self.ctx.session.actor()?;
        let ids = self.ctx.backend.liked_content_ids(actor).await?;
        debug!("Loaded {} liked posts", ids.len());
        self.liked
            .confirm(ids.into_iter().collect(), self.ctx.clock.now());
        Ok(())
    }

    /// Flip the like on `content_id`. The view changes before the write; a
    /// failed write is rolled back by the reload that follows it.
    pub async fn toggle_like(&mut self, content_id: Uuid) -> Result<bool> {
        let actor = self.ctx.session.actor()?;
        if self.liked.confirmed().is_none() {
            self.reload().await?;
        }

        let like = !self.is_liked(content_id);
        let patch = if like {
            LikePatch::Like(content_id)
        } else {
            LikePatch::Unlike(content_id)
        };
        self.liked.push(patch);

        let now = self.ctx.clock.now();
        let written = if like {
            self.ctx.backend.insert_like(actor, content_id, now).await
        } else {
            self.ctx.backend.delete_like(actor, content_id).await
        };

        if let Err(e) = self.reload().await {
            warn!("Reload after like toggle failed: {}", e);
        }
        written?;
        Ok(like)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::test_support::Harness;
    use chrono::Utc;
    use vibes_types::models::{AccountKind, InteractionKind};

    #[tokio::test]
    async fn toggle_likes_then_unlikes() {
        let h = Harness::new();
        let user = h.profile("ana", AccountKind::Personal);
        let post = Uuid::new_v4();
        let mut likes = LikedPosts::new(h.context(user));

        assert!(likes.toggle_like(post).await.unwrap());
        assert!(likes.is_liked(post));
        assert_eq!(h.db.count_interactions(post, InteractionKind::Like).unwrap(), 1);

        assert!(!likes.toggle_like(post).await.unwrap());
        assert!(!likes.is_liked(post));
        assert_eq!(h.db.count_interactions(post, InteractionKind::Like).unwrap(), 0);
    }

    #[tokio::test]
    async fn patch_shows_until_reload() {
        let h = Harness::new();
        let user = h.profile("ana", AccountKind::Personal);
        let post = Uuid::new_v4();
        let mut likes = LikedPosts::new(h.context(user));
        likes.reload().await.unwrap();

        likes.liked.push(LikePatch::Like(post));
        assert!(likes.is_liked(post));

        likes.reload().await.unwrap();
        assert!(!likes.is_liked(post));

        // liked elsewhere: the server copy wins
        h.db.insert_interaction(user, post, InteractionKind::Like, None, Utc::now())
            .unwrap();
        likes.reload().await.unwrap();
        assert_eq!(likes.liked(), HashSet::from([post]));
    }

    #[tokio::test]
    async fn failed_write_is_rolled_back() {
        let h = Harness::new();

        // interactions.user_id must reference a profile
        let mut ghost = LikedPosts::new(h.context(Uuid::new_v4()));
        let post = Uuid::new_v4();
        assert!(matches!(
            ghost.toggle_like(post).await,
            Err(ClientError::Remote(_))
        ));
        assert!(!ghost.is_liked(post));
    }
}
