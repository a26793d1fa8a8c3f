//! Upload session: pick a post type, attach files, fill in details, publish.
//!
//! Steps run `type -> upload -> details`; `edit` is reached by going back
//! from `details`. Files, previews and edit states are kept index-aligned
//! through every add, remove and reorder.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vibes_types::events::NotificationEvent;
use vibes_types::models::{ContentDraft, ContentType, Post};

use crate::ClientContext;
use crate::clock::is_due;
use crate::edit::{EditState, EditStore, move_item};
use crate::error::{ClientError, Result};
use crate::notify::notify_best_effort;
use crate::storage::ObjectStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Type,
    Upload,
    Details,
    Edit,
    /// Published.
    Closed,
    /// Closed with the draft kept for later.
    Saved,
    Discarded,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Saved | Self::Discarded)
    }
}

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Extension for the stored object: from the file name, else the MIME subtype.
    pub fn extension(&self) -> String {
        let from_name = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        let from_mime = self
            .mime
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()));

        from_name
            .or(from_mime)
            .unwrap_or("bin")
            .to_ascii_lowercase()
    }
}

/// Local preview handle for an attached file. Drafts persist these, never bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub id: Uuid,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    WrongType { expected: ContentType },
    TooLarge { size: u64, limit: u64 },
    LimitReached { limit: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType { expected: ContentType::Vibe } => write!(f, "only images can be added to a vibe"),
            Self::WrongType { expected: ContentType::Banger } => write!(f, "only a video can be added to a banger"),
            Self::TooLarge { size, limit } => {
                write!(f, "file is {} bytes, the limit is {} bytes", size, limit)
            }
            Self::LimitReached { limit } => write!(f, "at most {} files per post", limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectReason,
}

/// Outcome of [`UploadController::add_files`]. Rejections are for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddFilesReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedFile>,
}

impl AddFilesReport {
    /// Some files were dropped because the post was full.
    pub fn truncated(&self) -> bool {
        self.rejected
            .iter()
            .any(|r| matches!(r.reason, RejectReason::LimitReached { .. }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub caption: String,
    pub hashtags: BTreeSet<String>,
    pub mentions: BTreeSet<String>,
    pub location: Option<String>,
    pub hide_counts: bool,
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl Details {
    /// Details with hashtags and mentions pulled out of the caption.
    pub fn from_caption(caption: impl Into<String>) -> Self {
        let caption = caption.into();
        let (hashtags, mentions) = extract_tags(&caption);
        Self {
            caption,
            hashtags,
            mentions,
            ..Self::default()
        }
    }
}

/// `#tags` and `@mentions` in `text`, lowercased, without their sigils.
pub fn extract_tags(text: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut hashtags = BTreeSet::new();
    let mut mentions = BTreeSet::new();

    for word in text.split_whitespace() {
        let (set, rest) = if let Some(rest) = word.strip_prefix('#') {
            (&mut hashtags, rest)
        } else if let Some(rest) = word.strip_prefix('@') {
            (&mut mentions, rest)
        } else {
            continue;
        };

        let tag: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
            .collect();
        let tag = tag.trim_end_matches('.');
        if !tag.is_empty() {
            set.insert(tag.to_lowercase());
        }
    }

    (hashtags, mentions)
}

/// The data an upload session collects.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    pub content_type: Option<ContentType>,
    pub files: Vec<MediaFile>,
    pub previews: Vec<Preview>,
    pub details: Details,
    pub autosave_id: Option<Uuid>,
}

/// A file named by a resumed draft but not attached yet. Re-attaching a file
/// with the same name brings its edits back.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingFile {
    pub preview: Preview,
    pub edit: EditState,
}

/// What autosave writes. File bytes are left out on purpose: a resumed draft
/// knows which files it had but cannot restore them.
#[derive(Debug, Serialize, Deserialize)]
struct DraftPayload {
    content_type: Option<ContentType>,
    files: Vec<Preview>,
    edits: Vec<EditState>,
    details: Details,
}

pub struct UploadController {
    ctx: ClientContext,
    storage: Arc<dyn ObjectStorage>,
    step: Step,
    session: UploadSession,
    edits: EditStore,
    /// Files a resumed draft referenced; the user has to pick them again.
    missing_files: Vec<MissingFile>,
    last_autosave: Option<DateTime<Utc>>,
}

impl UploadController {
    pub fn new(ctx: ClientContext, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            ctx,
            storage,
            step: Step::Type,
            session: UploadSession::default(),
            edits: EditStore::new(),
            missing_files: Vec::new(),
            last_autosave: None,
        }
    }

    /// Reopen an autosaved draft. Type, details, edits and the draft id come
    /// back; the files are listed in [`missing_files`](Self::missing_files).
    pub fn resume(
        ctx: ClientContext,
        storage: Arc<dyn ObjectStorage>,
        draft: ContentDraft,
    ) -> Result<Self> {
        let payload: DraftPayload = serde_json::from_value(draft.payload)
            .map_err(|e| ClientError::validation(format!("Draft is unreadable: {}", e)))?;

        let mut controller = Self::new(ctx, storage);
        controller.session.content_type = payload.content_type.or(draft.content_type);
        controller.session.details = payload.details;
        controller.session.autosave_id = Some(draft.id);
        let mut edits = payload.edits.into_iter();
        controller.missing_files = payload
            .files
            .into_iter()
            .map(|preview| MissingFile {
                preview,
                edit: edits.next().unwrap_or_default(),
            })
            .collect();
        if controller.session.content_type.is_some() {
            controller.step = Step::Upload;
        }

        info!(
            "Resumed draft {} ({} files to re-attach)",
            draft.id,
            controller.missing_files.len()
        );
        Ok(controller)
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn edits(&self) -> &EditStore {
        &self.edits
    }

    /// Edit the per-file states. Structural changes go through the controller.
    pub fn edits_mut(&mut self) -> &mut EditStore {
        &mut self.edits
    }

    pub fn missing_files(&self) -> &[MissingFile] {
        &self.missing_files
    }

    pub fn select_type(&mut self, content_type: ContentType) -> Result<()> {
        self.ensure_open()?;
        if !self.session.files.is_empty() {
            return Err(ClientError::validation(
                "Remove the selected files before changing the post type",
            ));
        }
        self.session.content_type = Some(content_type);
        self.step = Step::Upload;
        Ok(())
    }

    pub fn add_files(&mut self, files: Vec<MediaFile>) -> Result<AddFilesReport> {
        self.ensure_open()?;
        let content_type = match (self.step, self.session.content_type) {
            (Step::Upload | Step::Edit | Step::Details, Some(content_type)) => content_type,
            _ => return Err(ClientError::validation("Choose a post type first")),
        };

        let limit = content_type.max_files();
        let max_bytes = self.ctx.config.max_upload_bytes;
        let mut report = AddFilesReport::default();

        for file in files {
            let reason = if !content_type.accepts_mime(&file.mime) {
                Some(RejectReason::WrongType {
                    expected: content_type,
                })
            } else if file.size() > max_bytes {
                Some(RejectReason::TooLarge {
                    size: file.size(),
                    limit: max_bytes,
                })
            } else if self.session.files.len() >= limit {
                Some(RejectReason::LimitReached { limit })
            } else {
                None
            };

            if let Some(reason) = reason {
                debug!("Rejected {}: {}", file.name, reason);
                report.rejected.push(RejectedFile {
                    name: file.name,
                    reason,
                });
                continue;
            }

            self.session.previews.push(Preview {
                id: Uuid::new_v4(),
                file_name: file.name.clone(),
                mime: file.mime.clone(),
                size: file.size(),
            });
            let edit = self.take_missing_edit(&file.name);
            self.session.files.push(file);
            self.edits.push(edit);
            report.accepted += 1;
        }

        if self.step == Step::Upload && !self.session.files.is_empty() {
            self.step = Step::Details;
        }

        info!(
            "Added {} files ({} rejected), {} attached",
            report.accepted,
            report.rejected.len(),
            self.session.files.len()
        );
        Ok(report)
    }

    pub fn remove_file(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        self.check_index(index)?;

        self.session.files.remove(index);
        self.session.previews.remove(index);
        self.edits.remove(index);

        if self.session.files.is_empty() && matches!(self.step, Step::Details | Step::Edit) {
            self.step = Step::Upload;
        }
        Ok(())
    }

    pub fn reorder_files(&mut self, from: usize, to: usize) -> Result<()> {
        self.ensure_open()?;
        self.check_index(from)?;
        self.check_index(to)?;

        move_item(&mut self.session.files, from, to);
        move_item(&mut self.session.previews, from, to);
        self.edits.reorder(from, to);
        Ok(())
    }

    pub fn set_details(&mut self, details: Details) -> Result<()> {
        self.ensure_open()?;
        self.session.details = details;
        Ok(())
    }

    pub fn back(&mut self) -> Result<Step> {
        self.step = match self.step {
            Step::Details => Step::Edit,
            Step::Edit => Step::Upload,
            Step::Upload if self.session.files.is_empty() => {
                self.session.content_type = None;
                Step::Type
            }
            Step::Upload => {
                return Err(ClientError::validation(
                    "Remove the selected files before changing the post type",
                ));
            }
            Step::Type => return Err(ClientError::validation("Already at the first step")),
            Step::Closed | Step::Saved | Step::Discarded => {
                return Err(ClientError::validation("This upload session is closed"));
            }
        };
        Ok(self.step)
    }

    pub fn proceed(&mut self) -> Result<Step> {
        self.step = match self.step {
            Step::Upload | Step::Edit if !self.session.files.is_empty() => Step::Details,
            Step::Type => return Err(ClientError::validation("Choose a post type first")),
            Step::Upload | Step::Edit => {
                return Err(ClientError::validation("Select at least one file"));
            }
            Step::Details => return Err(ClientError::validation("Ready to publish")),
            Step::Closed | Step::Saved | Step::Discarded => {
                return Err(ClientError::validation("This upload session is closed"));
            }
        };
        Ok(self.step)
    }

    /// Save the session as a draft. Returns the draft id, or `None` if nothing
    /// has been saved yet. Failures are logged and never reach the caller.
    pub async fn autosave(&mut self) -> Option<Uuid> {
        if self.step.is_terminal() {
            return self.session.autosave_id;
        }
        self.last_autosave = Some(self.ctx.clock.now());

        match self.write_draft().await {
            Ok(id) => {
                self.session.autosave_id = Some(id);
                debug!("Autosaved draft {}", id);
            }
            Err(e) => warn!("Autosave failed: {}", e),
        }
        self.session.autosave_id
    }

    /// Autosave when the interval has elapsed on the context clock.
    pub async fn autosave_if_due(&mut self) -> bool {
        let now = self.ctx.clock.now();
        if self.step.is_terminal()
            || !is_due(self.last_autosave, now, self.ctx.config.autosave_interval)
        {
            return false;
        }
        self.autosave().await;
        true
    }

    pub async fn publish(&mut self) -> Result<Post> {
        self.ensure_open()?;
        let user_id = self.ctx.session.actor()?;
        if self.session.files.is_empty() {
            return Err(ClientError::validation("Select at least one file to publish"));
        }
        let content_type = self
            .session
            .content_type
            .ok_or_else(|| ClientError::validation("Choose a post type first"))?;
        let bucket = content_type.bucket();

        let mut urls = Vec::with_capacity(self.session.files.len());
        for file in &self.session.files {
            let path = format!("{}/{}.{}", user_id, random_token(), file.extension());
            let stored = self.storage.upload(bucket, &path, file.data.clone()).await?;
            urls.push(self.storage.public_url(bucket, &stored));
        }

        let mut urls = urls.into_iter();
        let media_url = urls.next().unwrap_or_default();
        let details = &self.session.details;
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content_type,
            media_url,
            additional_urls: urls.collect(),
            caption: details.caption.clone(),
            hashtags: details.hashtags.iter().cloned().collect(),
            mentions: details.mentions.iter().cloned().collect(),
            location: details.location.clone(),
            hide_counts: details.hide_counts,
            scheduled_at: details.scheduled_time,
            created_at: self.ctx.clock.now(),
        };
        self.ctx.backend.insert_post(&post).await?;

        if let Some(draft_id) = self.session.autosave_id.take() {
            if let Err(e) = self.ctx.backend.delete_draft(draft_id, user_id).await {
                warn!("Published post {} but could not delete draft {}: {:#}", post.id, draft_id, e);
            }
        }

        info!("Published {} {} with {} files", content_type.as_str(), post.id, self.session.files.len());
        notify_best_effort(
            self.ctx.notifier.as_ref(),
            NotificationEvent::PostPublished { post_id: post.id },
        );
        self.finish(Step::Closed);
        Ok(post)
    }

    /// Close the session and delete its draft. Deleting is best-effort.
    pub async fn discard(&mut self) {
        if self.step.is_terminal() {
            return;
        }
        if let (Some(draft_id), Ok(user_id)) = (self.session.autosave_id, self.ctx.session.actor()) {
            match self.ctx.backend.delete_draft(draft_id, user_id).await {
                Ok(_) => debug!("Deleted draft {}", draft_id),
                Err(e) => warn!("Could not delete draft {}: {:#}", draft_id, e),
            }
        }
        self.session.autosave_id = None;
        self.finish(Step::Discarded);
    }

    /// Save once more and close, keeping the draft for later.
    pub async fn close_keeping_draft(&mut self) -> Option<Uuid> {
        let id = self.autosave().await;
        self.finish(Step::Saved);
        id
    }

    fn finish(&mut self, step: Step) {
        self.step = step;
        self.session.files.clear();
        self.session.previews.clear();
        self.edits.reset();
    }

    async fn write_draft(&self) -> anyhow::Result<Uuid> {
        let user_id = self.ctx.session.actor()?;
        let payload = DraftPayload {
            content_type: self.session.content_type,
            files: self.session.previews.clone(),
            edits: self.edits.states().to_vec(),
            details: self.session.details.clone(),
        };
        let draft = ContentDraft {
            id: self.session.autosave_id.unwrap_or_else(Uuid::new_v4),
            user_id,
            content_type: self.session.content_type,
            payload: serde_json::to_value(&payload)?,
            updated_at: self.ctx.clock.now(),
        };

        if self.session.autosave_id.is_some() && self.ctx.backend.update_draft(&draft).await? {
            return Ok(draft.id);
        }

        // first save, or the draft vanished remotely
        self.ctx.backend.insert_draft(&draft).await?;
        Ok(draft.id)
    }

    fn take_missing_edit(&mut self, name: &str) -> EditState {
        match self.missing_files.iter().position(|m| m.preview.file_name == name) {
            Some(i) => self.missing_files.remove(i).edit,
            None => EditState::default(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.step.is_terminal() {
            return Err(ClientError::validation("This upload session is closed"));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.session.files.len() {
            return Err(ClientError::validation(format!("No file at position {}", index + 1)));
        }
        Ok(())
    }
}

/// Autosave `controller` on the configured interval until its session ends.
pub fn spawn_autosave(controller: Arc<Mutex<UploadController>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let every = controller.lock().await.ctx.config.autosave_interval;
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut controller = controller.lock().await;
            if controller.step().is_terminal() {
                debug!("Upload session ended, stopping autosave");
                break;
            }
            controller.autosave().await;
        }
    })
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::edit::{EditPatch, Filter};
    use crate::storage::LocalStorage;
    use crate::test_support::Harness;
    use anyhow::bail;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use vibes_types::models::AccountKind;

    fn image(name: &str) -> MediaFile {
        MediaFile::new(name, "image/jpeg", name.as_bytes().to_vec())
    }

    struct Fixture {
        harness: Harness,
        user: Uuid,
        tmp: TempDir,
        storage: Arc<LocalStorage>,
    }

    impl Fixture {
        async fn new() -> Self {
            let harness = Harness::new();
            let user = harness.profile("creator", AccountKind::Personal);
            let tmp = TempDir::new().unwrap();
            let storage = Arc::new(
                LocalStorage::new(tmp.path().to_path_buf(), "https://cdn.test")
                    .await
                    .unwrap(),
            );
            Self {
                harness,
                user,
                tmp,
                storage,
            }
        }

        fn controller(&self) -> UploadController {
            let ctx = self.harness.context(self.user).with_config(ClientConfig {
                max_upload_bytes: 1024,
                ..ClientConfig::default()
            });
            UploadController::new(ctx, self.storage.clone())
        }
    }

    fn names(controller: &UploadController) -> Vec<String> {
        controller.session().files.iter().map(|f| f.name.clone()).collect()
    }

    #[tokio::test]
    async fn add_files_keeps_arrays_aligned_and_reports_rejections() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        assert_eq!(c.step(), Step::Upload);

        let report = c
            .add_files(vec![
                image("a.jpg"),
                MediaFile::new("clip.mp4", "video/mp4", vec![0u8; 10]),
                image("b.jpg"),
                MediaFile::new("huge.png", "image/png", vec![0u8; 2048]),
                image("c.jpg"),
            ])
            .unwrap();

        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0].reason, RejectReason::WrongType { .. }));
        assert!(matches!(report.rejected[1].reason, RejectReason::TooLarge { size: 2048, .. }));
        assert!(!report.truncated());

        let session = c.session();
        assert_eq!(session.files.len(), session.previews.len());
        assert_eq!(session.files.len(), c.edits().len());
        assert_eq!(names(&c), vec!["a.jpg", "b.jpg", "c.jpg"]);
        let preview_names: Vec<_> = session.previews.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(preview_names, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(c.step(), Step::Details);
    }

    #[tokio::test]
    async fn vibe_batches_truncate_at_ten() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files((0..9).map(|i| image(&format!("{i}.jpg"))).collect())
            .unwrap();

        let report = c.add_files(vec![image("9.jpg"), image("10.jpg")]).unwrap();
        assert_eq!(report.accepted, 1);
        assert!(report.truncated());
        assert_eq!(report.rejected[0].name, "10.jpg");
        assert_eq!(c.session().files.len(), 10);
        assert_eq!(c.edits().len(), 10);
    }

    #[tokio::test]
    async fn banger_takes_a_single_video() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Banger).unwrap();

        let report = c
            .add_files(vec![
                image("still.jpg"),
                MediaFile::new("one.mp4", "video/mp4", vec![1u8; 8]),
                MediaFile::new("two.mov", "video/quicktime", vec![2u8; 8]),
            ])
            .unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(names(&c), vec!["one.mp4"]);
        assert!(report.truncated());
    }

    #[tokio::test]
    async fn files_need_a_type_and_type_is_locked_by_files() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        assert!(matches!(c.add_files(vec![image("a.jpg")]), Err(ClientError::Validation(_))));

        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg")]).unwrap();
        assert!(c.select_type(ContentType::Banger).is_err());
    }

    #[tokio::test]
    async fn reorder_moves_all_three_arrays() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg"), image("b.jpg"), image("c.jpg")]).unwrap();
        c.edits_mut().select(0).unwrap();
        c.edits_mut().update_current(EditPatch::filter(Filter::Moon)).unwrap();
        let first_preview = c.session().previews[0].id;

        c.reorder_files(0, 2).unwrap();

        assert_eq!(names(&c), vec!["b.jpg", "c.jpg", "a.jpg"]);
        assert_eq!(c.session().previews[2].id, first_preview);
        assert_eq!(c.edits().states()[2].filter, Filter::Moon);
        assert_eq!(c.edits().states()[0].filter, Filter::Normal);
        assert!(c.reorder_files(0, 3).is_err());
    }

    #[tokio::test]
    async fn removing_last_file_returns_to_upload() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg"), image("b.jpg")]).unwrap();

        c.remove_file(0).unwrap();
        assert_eq!(names(&c), vec!["b.jpg"]);
        assert_eq!(c.session().previews.len(), 1);
        assert_eq!(c.edits().len(), 1);

        c.remove_file(0).unwrap();
        assert_eq!(c.step(), Step::Upload);
        assert!(matches!(c.remove_file(0), Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn back_reaches_edit_only_from_details() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        assert!(c.back().is_err());
        c.select_type(ContentType::Vibe).unwrap();
        assert!(c.proceed().is_err());
        c.add_files(vec![image("a.jpg")]).unwrap();

        assert_eq!(c.back().unwrap(), Step::Edit);
        assert_eq!(c.proceed().unwrap(), Step::Details);
        assert_eq!(c.back().unwrap(), Step::Edit);
        assert_eq!(c.back().unwrap(), Step::Upload);
        assert!(c.back().is_err());
    }

    #[tokio::test]
    async fn going_back_to_type_clears_the_choice() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        assert_eq!(c.back().unwrap(), Step::Type);
        assert_eq!(c.session().content_type, None);

        assert!(matches!(c.add_files(vec![image("a.jpg")]), Err(ClientError::Validation(_))));
        assert!(c.session().files.is_empty());
        assert_eq!(c.step(), Step::Type);

        c.select_type(ContentType::Banger).unwrap();
        assert_eq!(c.step(), Step::Upload);
        assert_eq!(c.session().content_type, Some(ContentType::Banger));
    }

    #[tokio::test]
    async fn publish_without_files_is_a_validation_error() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        assert!(matches!(c.publish().await, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn publish_uploads_in_order_and_cleans_up_draft() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("first.jpg"), image("second.png")]).unwrap();
        c.set_details(Details::from_caption("Golden hour #Beach @sam")).unwrap();
        let draft_id = c.autosave().await.unwrap();

        let post = c.publish().await.unwrap();

        let prefix = format!("https://cdn.test/vibes/{}/", fx.user);
        assert!(post.media_url.starts_with(&prefix));
        assert!(post.media_url.ends_with(".jpg"));
        assert_eq!(post.additional_urls.len(), 1);
        assert!(post.additional_urls[0].ends_with(".png"));
        assert_eq!(post.hashtags, vec!["beach".to_string()]);
        assert_eq!(post.mentions, vec!["sam".to_string()]);

        let stored_path = post.media_url.trim_start_matches("https://cdn.test/");
        assert_eq!(std::fs::read(fx.tmp.path().join(stored_path)).unwrap(), b"first.jpg");

        assert!(fx.harness.db.get_post(post.id).unwrap().is_some());
        assert!(fx.harness.db.get_draft(draft_id).unwrap().is_none());
        assert_eq!(c.step(), Step::Closed);
        assert!(c.edits().is_empty());
        assert!(c.publish().await.is_err());
    }

    struct BrokenStorage;

    #[async_trait]
    impl ObjectStorage for BrokenStorage {
        async fn upload(&self, _bucket: &str, _path: &str, _data: Bytes) -> anyhow::Result<String> {
            bail!("bucket unavailable")
        }

        fn public_url(&self, bucket: &str, path: &str) -> String {
            format!("https://broken/{bucket}/{path}")
        }
    }

    #[tokio::test]
    async fn upload_failure_aborts_publish() {
        let fx = Fixture::new().await;
        let mut c = UploadController::new(fx.harness.context(fx.user), Arc::new(BrokenStorage));
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg")]).unwrap();

        let err = c.publish().await.unwrap_err();
        assert!(matches!(err, ClientError::Remote(ref m) if m.contains("bucket unavailable")));
        assert_eq!(c.step(), Step::Details);
        assert_eq!(c.session().files.len(), 1);
        assert_eq!(fx.harness.db.count_posts(fx.user, ContentType::Vibe).unwrap(), 0);
    }

    #[tokio::test]
    async fn autosave_reuses_draft_id_and_skips_bytes() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg")]).unwrap();

        let first = c.autosave().await.unwrap();
        c.set_details(Details::from_caption("second pass")).unwrap();
        let second = c.autosave().await.unwrap();
        assert_eq!(first, second);

        let drafts = fx.harness.db.list_drafts(fx.user).unwrap();
        assert_eq!(drafts.len(), 1);
        let payload = &drafts[0].payload;
        assert_eq!(payload["details"]["caption"], "second pass");
        assert_eq!(payload["files"][0]["file_name"], "a.jpg");
        assert!(payload["files"][0].get("data").is_none());
    }

    #[tokio::test]
    async fn autosave_failures_are_swallowed() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        fx.harness
            .db
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE content_drafts")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(c.autosave().await, None);
        c.add_files(vec![image("a.jpg")]).unwrap();
        assert_eq!(c.step(), Step::Details);
    }

    #[tokio::test]
    async fn autosave_runs_on_the_clock() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Banger).unwrap();

        assert!(c.autosave_if_due().await);
        assert!(!c.autosave_if_due().await);

        fx.harness.clock.advance(chrono::Duration::seconds(30));
        assert!(c.autosave_if_due().await);
        assert_eq!(fx.harness.db.list_drafts(fx.user).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn autosave_task_saves_until_the_session_ends() {
        let fx = Fixture::new().await;
        let ctx = fx.harness.context(fx.user).with_config(ClientConfig {
            autosave_interval: std::time::Duration::from_millis(20),
            ..ClientConfig::default()
        });
        let mut c = UploadController::new(ctx, fx.storage.clone());
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg")]).unwrap();

        let controller = Arc::new(Mutex::new(c));
        let handle = spawn_autosave(controller.clone());

        let saved = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                if let Some(id) = controller.lock().await.session().autosave_id {
                    return id;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert!(fx.harness.db.get_draft(saved).unwrap().is_some());

        assert_eq!(controller.lock().await.close_keeping_draft().await, Some(saved));
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn resumed_draft_lists_files_to_reattach() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg"), image("b.jpg")]).unwrap();
        c.edits_mut().select(1).unwrap();
        c.edits_mut().update_current(EditPatch::filter(Filter::Lark)).unwrap();
        c.set_details(Details::from_caption("later #draft")).unwrap();
        let id = c.autosave().await.unwrap();

        let draft = fx.harness.db.get_draft(id).unwrap().unwrap();
        let mut resumed = UploadController::resume(
            fx.harness.context(fx.user),
            fx.storage.clone(),
            draft,
        )
        .unwrap();

        assert_eq!(resumed.step(), Step::Upload);
        assert_eq!(resumed.session().content_type, Some(ContentType::Vibe));
        assert_eq!(resumed.session().details.caption, "later #draft");
        assert_eq!(resumed.session().autosave_id, Some(id));
        assert!(resumed.session().files.is_empty());
        assert_eq!(resumed.missing_files().len(), 2);
        assert_eq!(resumed.missing_files()[1].edit.filter, Filter::Lark);

        resumed.add_files(vec![image("b.jpg")]).unwrap();
        assert_eq!(resumed.edits().states()[0].filter, Filter::Lark);
        assert_eq!(resumed.missing_files().len(), 1);
        assert_eq!(resumed.missing_files()[0].preview.file_name, "a.jpg");
    }

    #[tokio::test]
    async fn discard_deletes_the_draft() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();
        c.add_files(vec![image("a.jpg")]).unwrap();
        c.autosave().await.unwrap();

        c.discard().await;
        assert_eq!(c.step(), Step::Discarded);
        assert!(fx.harness.db.list_drafts(fx.user).unwrap().is_empty());
        assert!(c.add_files(vec![image("b.jpg")]).is_err());
    }

    #[tokio::test]
    async fn closing_keeps_the_draft() {
        let fx = Fixture::new().await;
        let mut c = fx.controller();
        c.select_type(ContentType::Vibe).unwrap();

        let id = c.close_keeping_draft().await.unwrap();
        assert_eq!(c.step(), Step::Saved);
        assert!(fx.harness.db.get_draft(id).unwrap().is_some());
    }

    #[test]
    fn tags_are_extracted_from_caption() {
        let (tags, mentions) = extract_tags("Sunset at #Goa with @Asha_K. #sunset #goa! @ #");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["goa", "sunset"]);
        assert_eq!(mentions.into_iter().collect::<Vec<_>>(), vec!["asha_k"]);
    }

    #[test]
    fn extension_falls_back_to_mime() {
        assert_eq!(MediaFile::new("IMG.JPG", "image/jpeg", Vec::new()).extension(), "jpg");
        assert_eq!(MediaFile::new("clip", "video/mp4", Vec::new()).extension(), "mp4");
        assert_eq!(MediaFile::new("x", "application/x-weird+thing", Vec::new()).extension(), "bin");
    }
}
