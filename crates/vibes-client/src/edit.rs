//! Per-file edit parameters for an upload session.
//!
//! Every mutation replaces whole top-level fields and produces a new
//! [`EditState`] value, which keeps undo/redo a matter of swapping values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    Normal,
    Clarendon,
    Gingham,
    Moon,
    Lark,
    Reyes,
    Juno,
    Slumber,
}

/// Tone adjustments, each in `[-100, 100]`. Deserialized values are clamped too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAdjustments")]
pub struct Adjustments {
    brightness: i32,
    contrast: i32,
    saturation: i32,
}

#[derive(Deserialize)]
struct RawAdjustments {
    brightness: i32,
    contrast: i32,
    saturation: i32,
}

impl From<RawAdjustments> for Adjustments {
    fn from(raw: RawAdjustments) -> Self {
        Self::new(raw.brightness, raw.contrast, raw.saturation)
    }
}

impl Adjustments {
    pub fn new(brightness: i32, contrast: i32, saturation: i32) -> Self {
        Self {
            brightness: brightness.clamp(-100, 100),
            contrast: contrast.clamp(-100, 100),
            saturation: saturation.clamp(-100, 100),
        }
    }

    pub fn brightness(&self) -> i32 {
        self.brightness
    }

    pub fn contrast(&self) -> i32 {
        self.contrast
    }

    pub fn saturation(&self) -> i32 {
        self.saturation
    }
}

/// Placement in percent of the canvas, each axis in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPosition")]
pub struct Position {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct RawPosition {
    x: f32,
    y: f32,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Self::new(raw.x, raw.y)
    }
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
        }
    }

    pub fn center() -> Self {
        Self::new(50.0, 50.0)
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OverlayKind {
    Text {
        text: String,
        font_size: u16,
        color: String,
    },
    Sticker {
        glyph: String,
        scale: f32,
        rotation: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: Uuid,
    pub position: Position,
    pub kind: OverlayKind,
}

impl Overlay {
    pub fn text(text: impl Into<String>, position: Position) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            kind: OverlayKind::Text {
                text: text.into(),
                font_size: 24,
                color: "#ffffff".into(),
            },
        }
    }

    pub fn sticker(glyph: impl Into<String>, position: Position) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            kind: OverlayKind::Sticker {
                glyph: glyph.into(),
                scale: 1.0,
                rotation: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub track_ref: String,
    pub start_time_sec: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceOver {
    pub audio_ref: String,
    pub duration_sec: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditState {
    pub filter: Filter,
    pub adjustments: Adjustments,
    pub overlays: Vec<Overlay>,
    pub music: Option<MusicTrack>,
    pub voice_over: Option<VoiceOver>,
}

impl EditState {
    pub fn text_overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays
            .iter()
            .filter(|o| matches!(o.kind, OverlayKind::Text { .. }))
    }

    pub fn stickers(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays
            .iter()
            .filter(|o| matches!(o.kind, OverlayKind::Sticker { .. }))
    }

    /// Shallow merge: each field present in `patch` replaces ours wholesale.
    pub fn merged(&self, patch: EditPatch) -> Self {
        Self {
            filter: patch.filter.unwrap_or(self.filter),
            adjustments: patch.adjustments.unwrap_or(self.adjustments),
            overlays: patch.overlays.unwrap_or_else(|| self.overlays.clone()),
            music: patch.music.unwrap_or_else(|| self.music.clone()),
            voice_over: patch.voice_over.unwrap_or_else(|| self.voice_over.clone()),
        }
    }
}

/// Partial update for [`EditStore::update_current`]. `music` and `voice_over`
/// use `Some(None)` to clear the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPatch {
    pub filter: Option<Filter>,
    pub adjustments: Option<Adjustments>,
    pub overlays: Option<Vec<Overlay>>,
    pub music: Option<Option<MusicTrack>>,
    pub voice_over: Option<Option<VoiceOver>>,
}

impl EditPatch {
    pub fn filter(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn adjustments(adjustments: Adjustments) -> Self {
        Self {
            adjustments: Some(adjustments),
            ..Self::default()
        }
    }

    pub fn overlays(overlays: Vec<Overlay>) -> Self {
        Self {
            overlays: Some(overlays),
            ..Self::default()
        }
    }

    pub fn music(music: Option<MusicTrack>) -> Self {
        Self {
            music: Some(music),
            ..Self::default()
        }
    }

    pub fn voice_over(voice_over: Option<VoiceOver>) -> Self {
        Self {
            voice_over: Some(voice_over),
            ..Self::default()
        }
    }
}

/// Edit states for the files of one session, indexed like the files, plus a
/// cursor on the one being edited.
#[derive(Debug, Clone, Default)]
pub struct EditStore {
    states: Vec<EditState>,
    cursor: usize,
    undo: Vec<(usize, EditState)>,
    redo: Vec<(usize, EditState)>,
}

impl EditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[EditState] {
        &self.states
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&EditState> {
        self.states.get(self.cursor)
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.states.len() {
            return Err(ClientError::validation(format!("No file at position {}", index + 1)));
        }
        self.cursor = index;
        Ok(())
    }

    pub fn update_current(&mut self, patch: EditPatch) -> Result<&EditState> {
        let index = self.cursor;
        let current = self
            .states
            .get(index)
            .ok_or_else(|| ClientError::validation("No file selected for editing"))?;

        let next = current.merged(patch);
        let previous = std::mem::replace(&mut self.states[index], next);
        self.undo.push((index, previous));
        self.redo.clear();
        Ok(&self.states[index])
    }

    pub fn add_overlay(&mut self, overlay: Overlay) -> Result<&EditState> {
        let mut overlays = self.current_overlays()?;
        overlays.push(overlay);
        self.update_current(EditPatch::overlays(overlays))
    }

    pub fn remove_overlay(&mut self, id: Uuid) -> Result<&EditState> {
        let overlays = self
            .current_overlays()?
            .into_iter()
            .filter(|o| o.id != id)
            .collect();
        self.update_current(EditPatch::overlays(overlays))
    }

    /// Drag an overlay to a new position.
    pub fn move_overlay(&mut self, id: Uuid, position: Position) -> Result<&EditState> {
        let mut overlays = self.current_overlays()?;
        let overlay = overlays
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ClientError::not_found("Overlay not found"))?;
        overlay.position = position;
        self.update_current(EditPatch::overlays(overlays))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some((index, state)) if index < self.states.len() => {
                let newer = std::mem::replace(&mut self.states[index], state);
                self.redo.push((index, newer));
                self.cursor = index;
                true
            }
            _ => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some((index, state)) if index < self.states.len() => {
                let older = std::mem::replace(&mut self.states[index], state);
                self.undo.push((index, older));
                self.cursor = index;
                true
            }
            _ => false,
        }
    }

    /// Drop every state and move the cursor back to the start.
    pub fn reset(&mut self) {
        self.states.clear();
        self.cursor = 0;
        self.undo.clear();
        self.redo.clear();
    }

    // Structural changes follow the file list and are driven by the upload
    // controller only. History indexes would go stale, so they clear it.

    pub(crate) fn push(&mut self, state: EditState) {
        self.states.push(state);
    }

    pub(crate) fn remove(&mut self, index: usize) {
        self.states.remove(index);
        if self.cursor > index || self.cursor >= self.states.len() {
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.undo.clear();
        self.redo.clear();
    }

    pub(crate) fn reorder(&mut self, from: usize, to: usize) {
        move_item(&mut self.states, from, to);
        self.cursor = moved_index(self.cursor, from, to);
        self.undo.clear();
        self.redo.clear();
    }

    fn current_overlays(&self) -> Result<Vec<Overlay>> {
        self.current()
            .map(|s| s.overlays.clone())
            .ok_or_else(|| ClientError::validation("No file selected for editing"))
    }
}

/// Move `v[from]` to position `to`, shifting the items in between.
pub(crate) fn move_item<T>(v: &mut Vec<T>, from: usize, to: usize) {
    let item = v.remove(from);
    v.insert(to, item);
}

/// Where the item at `index` ends up after `move_item(from, to)`.
fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < index && index <= to {
        index - 1
    } else if to <= index && index < from {
        index + 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(n: usize) -> EditStore {
        let mut store = EditStore::new();
        for _ in 0..n {
            store.push(EditState::default());
        }
        store
    }

    #[test]
    fn update_merges_only_given_fields() {
        let mut store = store_with(1);
        store.update_current(EditPatch::filter(Filter::Juno)).unwrap();
        store
            .update_current(EditPatch::adjustments(Adjustments::new(20, -10, 5)))
            .unwrap();

        let state = store.current().unwrap();
        assert_eq!(state.filter, Filter::Juno);
        assert_eq!(state.adjustments, Adjustments::new(20, -10, 5));
        assert!(state.overlays.is_empty());
    }

    #[test]
    fn values_are_clamped() {
        assert_eq!(Adjustments::new(150, -300, 0), Adjustments::new(100, -100, 0));
        assert_eq!(Position::new(-5.0, 120.0), Position::new(0.0, 100.0));
    }

    #[test]
    fn saved_states_are_clamped_on_load() {
        let saved = serde_json::json!({
            "filter": "lark",
            "adjustments": { "brightness": 400, "contrast": -101, "saturation": 7 },
            "overlays": [{
                "id": Uuid::new_v4(),
                "position": { "x": -20.0, "y": 250.0 },
                "kind": "sticker",
                "glyph": "*",
                "scale": 1.0,
                "rotation": 0.0
            }],
            "music": null,
            "voice_over": null
        });
        let state: EditState = serde_json::from_value(saved).unwrap();

        assert_eq!(state.filter, Filter::Lark);
        assert_eq!(state.adjustments.brightness(), 100);
        assert_eq!(state.adjustments.contrast(), -100);
        assert_eq!(state.adjustments.saturation(), 7);
        assert_eq!(state.overlays[0].position, Position::new(0.0, 100.0));

        let round = serde_json::to_value(&state).unwrap();
        assert_eq!(round["adjustments"]["brightness"], 100);
    }

    #[test]
    fn overlay_edits_produce_new_values() {
        let mut store = store_with(1);
        let before = store.current().unwrap().clone();

        let caption = Overlay::text("hello", Position::center());
        let caption_id = caption.id;
        store.add_overlay(caption).unwrap();
        store.add_overlay(Overlay::sticker("🔥", Position::new(10.0, 10.0))).unwrap();
        assert_eq!(before.overlays.len(), 0);

        let state = store.current().unwrap();
        assert_eq!(state.text_overlays().count(), 1);
        assert_eq!(state.stickers().count(), 1);

        store.move_overlay(caption_id, Position::new(80.0, 20.0)).unwrap();
        assert_eq!(
            store.current().unwrap().overlays[0].position,
            Position::new(80.0, 20.0)
        );

        store.remove_overlay(caption_id).unwrap();
        assert_eq!(store.current().unwrap().text_overlays().count(), 0);
        assert!(matches!(
            store.move_overlay(caption_id, Position::center()),
            Err(ClientError::NotFound(_))
        ));
    }

    #[test]
    fn music_can_be_cleared() {
        let mut store = store_with(1);
        store
            .update_current(EditPatch::music(Some(MusicTrack {
                track_ref: "track-1".into(),
                start_time_sec: 12,
            })))
            .unwrap();
        assert!(store.current().unwrap().music.is_some());

        store.update_current(EditPatch::filter(Filter::Moon)).unwrap();
        assert!(store.current().unwrap().music.is_some());

        store.update_current(EditPatch::music(None)).unwrap();
        assert!(store.current().unwrap().music.is_none());
    }

    #[test]
    fn undo_and_redo_swap_whole_states() {
        let mut store = store_with(2);
        store.select(1).unwrap();
        store.update_current(EditPatch::filter(Filter::Lark)).unwrap();
        store.update_current(EditPatch::filter(Filter::Reyes)).unwrap();

        assert!(store.undo());
        assert_eq!(store.current().unwrap().filter, Filter::Lark);
        assert!(store.undo());
        assert_eq!(store.current().unwrap().filter, Filter::Normal);
        assert!(!store.undo());

        assert!(store.redo());
        assert_eq!(store.current().unwrap().filter, Filter::Lark);

        store.update_current(EditPatch::filter(Filter::Moon)).unwrap();
        assert!(!store.redo());
    }

    #[test]
    fn empty_store_rejects_updates() {
        let mut store = EditStore::new();
        assert!(store.current().is_none());
        assert!(matches!(
            store.update_current(EditPatch::filter(Filter::Moon)),
            Err(ClientError::Validation(_))
        ));
        assert!(store.select(0).is_err());
    }

    #[test]
    fn reset_clears_states_and_cursor() {
        let mut store = store_with(3);
        store.select(2).unwrap();
        store.update_current(EditPatch::filter(Filter::Gingham)).unwrap();

        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), 0);
        assert!(!store.can_undo());
    }

    #[test]
    fn cursor_follows_reordered_state() {
        let mut store = store_with(3);
        store.select(0).unwrap();
        store.update_current(EditPatch::filter(Filter::Slumber)).unwrap();

        store.reorder(0, 2);
        assert_eq!(store.cursor(), 2);
        assert_eq!(store.current().unwrap().filter, Filter::Slumber);

        store.select(1).unwrap();
        store.reorder(2, 0);
        assert_eq!(store.cursor(), 2);
    }

    #[test]
    fn moved_index_matches_move_item() {
        for from in 0..4 {
            for to in 0..4 {
                let mut v: Vec<usize> = (0..4).collect();
                move_item(&mut v, from, to);
                for original in 0..4 {
                    let pos = v.iter().position(|&x| x == original).unwrap();
                    assert_eq!(moved_index(original, from, to), pos);
                }
            }
        }
    }
}
