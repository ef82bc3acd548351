//! The editing session a host drives.
//!
//! [`EditorSession`] owns the document, the gesture gate, the display link
//! and one controller per gesture. Every entry point that changes the buffer
//! follows the same pipeline: write, re-parse, recompute geometry, normalize
//! stray spacing, redraw the overlay.

use std::{
  ops::Range,
  time::Instant,
};

use ruled_core::geometry::Point;
use thiserror::Error;

use crate::{
  animation::DisplayLink,
  buffer::{
    StyledText,
    StyledTextBuffer,
  },
  config::EditorConfig,
  document::{
    Document,
    DocumentError,
  },
  gesture::{
    GestureContext,
    GestureError,
    GestureGate,
    GestureKind,
  },
  haptics::{
    HapticFeedback,
    NoHaptics,
  },
  layout::{
    FixedLineLayout,
    LayoutEngine,
  },
  overlay::{
    Emphasis,
    NoOverlay,
    OverlayFrame,
    OverlaySink,
  },
  paragraph::ParagraphId,
  persistence::{
    self,
    NoteStore,
    PersistenceError,
  },
  reorder::{
    ReorderController,
    ReorderOutcome,
  },
  scroll_snap::ScrollSnapController,
  spacing::SpacingController,
  style::Detent,
  swipe::{
    SwipeController,
    SwipeOutcome,
  },
};

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
  #[error("a gesture or spacing animation is in progress")]
  GestureInProgress,
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error(transparent)]
  Gesture(#[from] GestureError),
  #[error(transparent)]
  Persistence(#[from] PersistenceError),
}

/// Host capabilities handed to a session.
pub struct Collaborators {
  pub layout:  Box<dyn LayoutEngine>,
  pub haptics: Box<dyn HapticFeedback>,
  pub overlay: Box<dyn OverlaySink>,
}

impl Default for Collaborators {
  fn default() -> Self {
    Self {
      layout:  Box::new(FixedLineLayout::default()),
      haptics: Box::new(NoHaptics),
      overlay: Box::new(NoOverlay),
    }
  }
}

/// State shared by all controllers.
struct Surface {
  document: Document,
  gate:     GestureGate,
  display:  DisplayLink,
  layout:   Box<dyn LayoutEngine>,
  haptics:  Box<dyn HapticFeedback>,
}

impl Surface {
  fn cx(&mut self) -> GestureContext<'_> {
    GestureContext {
      document: &mut self.document,
      gate:     &mut self.gate,
      layout:   &*self.layout,
      haptics:  &mut *self.haptics,
      display:  &mut self.display,
    }
  }
}

pub struct EditorSession {
  config:      EditorConfig,
  surface:     Surface,
  overlay:     Box<dyn OverlaySink>,
  spacing:     SpacingController,
  reorder:     ReorderController,
  swipe:       SwipeController,
  scroll_snap: ScrollSnapController,
}

impl EditorSession {
  pub fn new(config: EditorConfig, buffer: StyledTextBuffer, collaborators: Collaborators) -> Self {
    let Collaborators {
      layout,
      haptics,
      overlay,
    } = collaborators;
    let document = Document::new(buffer, &*layout);
    let mut session = Self {
      spacing: SpacingController::new(config.spacing),
      reorder: ReorderController::new(config.reorder, config.reorder_enabled),
      swipe: SwipeController::new(config.swipe, config.spacing),
      scroll_snap: ScrollSnapController::new(config.scroll_snap, config.magnetic_scroll_enabled),
      config,
      surface: Surface {
        document,
        gate: GestureGate::new(),
        display: DisplayLink::new(),
        layout,
        haptics,
      },
      overlay,
    };
    session.normalize();
    session.redraw();
    session
  }

  /// Empty note in the configured default style.
  pub fn new_note(config: EditorConfig, collaborators: Collaborators) -> Self {
    let buffer = StyledTextBuffer::new(config.new_note_style());
    Self::new(config, buffer, collaborators)
  }

  /// Note from `store`, or an empty one if it cannot be read.
  pub fn load(config: EditorConfig, store: &dyn NoteStore, collaborators: Collaborators) -> Self {
    let buffer = persistence::load_or_default(store, config.new_note_style());
    Self::new(config, buffer, collaborators)
  }

  pub fn save(&self, store: &mut dyn NoteStore) -> Result<()> {
    store.save(self.surface.document.buffer())?;
    Ok(())
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  /// Takes effect with the next gesture or parse.
  pub fn set_config(&mut self, config: EditorConfig) {
    self.spacing.set_config(config.spacing);
    self
      .reorder
      .set_config(config.reorder, config.reorder_enabled);
    self.swipe.set_config(config.swipe, config.spacing);
    self
      .scroll_snap
      .set_config(config.scroll_snap, config.magnetic_scroll_enabled);
    self.config = config;
  }

  pub fn document(&self) -> &Document {
    &self.surface.document
  }

  pub fn text(&self) -> String {
    self.surface.document.text()
  }

  pub fn gate(&self) -> &GestureGate {
    &self.surface.gate
  }

  pub fn display(&self) -> &DisplayLink {
    &self.surface.display
  }

  pub fn spacing(&self) -> &SpacingController {
    &self.spacing
  }

  pub fn reorder(&self) -> &ReorderController {
    &self.reorder
  }

  pub fn swipe(&self) -> &SwipeController {
    &self.swipe
  }

  pub fn scroll_snap(&self) -> &ScrollSnapController {
    &self.scroll_snap
  }

  /// Whether no gesture, animation or frame subscription is live.
  pub fn is_idle(&self) -> bool {
    self.surface.gate.is_idle() && !self.surface.display.is_running()
  }

  /// Replace `range` with typed `text`.
  pub fn edit(&mut self, range: Range<usize>, text: &str) -> Result<()> {
    if self
      .surface
      .gate
      .active()
      .is_some_and(GestureKind::is_structural)
    {
      return Err(EditorError::GestureInProgress);
    }
    let surface = &mut self.surface;
    surface.document.edit(range, text, &*surface.layout)?;
    self.normalize();
    self.redraw();
    Ok(())
  }

  /// Swap in content from outside the session, e.g. a sync or undo.
  pub fn replace_buffer(&mut self, content: &StyledText) -> Result<()> {
    let gate = &self.surface.gate;
    if gate.active().is_some() || gate.is_settling() || self.spacing.is_animating() {
      tracing::debug!(active = ?gate.active(), "external replacement rejected");
      return Err(EditorError::GestureInProgress);
    }
    let surface = &mut self.surface;
    surface.document.replace_all(content, &*surface.layout);
    self.normalize();
    self.redraw();
    Ok(())
  }

  pub fn set_container_width(&mut self, width: f32) {
    let surface = &mut self.surface;
    surface.layout.set_container_width(width);
    surface.document.refresh_geometry(&*surface.layout);
    self.redraw();
  }

  pub fn set_font_scale(&mut self, scale: f32) {
    let surface = &mut self.surface;
    surface.layout.set_font_scale(scale);
    surface.document.refresh_geometry(&*surface.layout);
    self.redraw();
  }

  pub fn set_viewport_height(&mut self, height: f32) {
    self.surface.document.set_viewport_height(height);
    self.redraw();
  }

  pub fn set_cursor(&mut self, pos: usize) {
    self.surface.document.set_cursor(pos);
  }

  // pinch

  pub fn pinch_began(&mut self, first: Point, second: Point, now: Instant) -> Result<()> {
    self.spacing.begin(&mut self.surface.cx(), first, second, now)?;
    self.redraw();
    Ok(())
  }

  pub fn pinch_changed(&mut self, first: Point, second: Point) -> Option<f32> {
    let live = self.spacing.update(&mut self.surface.cx(), first, second);
    if live.is_some() {
      self.redraw();
    }
    live
  }

  pub fn pinch_ended(&mut self, now: Instant) {
    self.spacing.end(&mut self.surface.cx(), now);
    self.redraw();
  }

  pub fn pinch_cancelled(&mut self, now: Instant) {
    self.spacing.cancel(&mut self.surface.cx(), now);
    self.redraw();
  }

  // reorder

  pub fn reorder_began(&mut self, touch: Point) -> Result<ParagraphId> {
    let id = self.reorder.begin(&mut self.surface.cx(), touch)?;
    self.redraw();
    Ok(id)
  }

  pub fn reorder_moved(&mut self, touch: Point, now: Instant) -> bool {
    let moved = self.reorder.update(&mut self.surface.cx(), touch, now);
    self.redraw();
    moved
  }

  pub fn reorder_touch_added(&mut self) {
    self.reorder.touch_added(&mut self.surface.cx());
  }

  pub fn reorder_touch_removed(&mut self, now: Instant) {
    self.reorder.touch_removed(&mut self.surface.cx(), now);
  }

  pub fn reorder_ended(&mut self) -> Option<ReorderOutcome> {
    let outcome = self.reorder.end(&mut self.surface.cx());
    self.redraw();
    outcome
  }

  pub fn reorder_cancelled(&mut self) -> Option<ReorderOutcome> {
    let outcome = self.reorder.cancel(&mut self.surface.cx());
    self.redraw();
    outcome
  }

  // swipe

  pub fn swipe_began(&mut self, touch: Point) -> Result<ParagraphId> {
    Ok(self.swipe.begin(&mut self.surface.cx(), touch)?)
  }

  pub fn swipe_moved(&mut self, touch: Point, now: Instant) -> Result<()> {
    let result = self.swipe.update(&mut self.surface.cx(), touch, now);
    self.redraw();
    Ok(result?)
  }

  pub fn swipe_ended(&mut self, now: Instant) -> Option<SwipeOutcome> {
    let outcome = self.swipe.end(&mut self.surface.cx(), now);
    self.after_swipe(outcome)
  }

  pub fn swipe_cancelled(&mut self, now: Instant) -> Option<SwipeOutcome> {
    let outcome = self.swipe.cancel(&mut self.surface.cx(), now);
    self.after_swipe(outcome)
  }

  fn after_swipe(&mut self, outcome: Option<SwipeOutcome>) -> Option<SwipeOutcome> {
    if matches!(
      outcome,
      Some(SwipeOutcome::Replied { .. } | SwipeOutcome::Deleted { .. })
    ) {
      self.normalize();
    }
    self.redraw();
    outcome
  }

  // scroll

  pub fn scroll_began(&mut self) {
    self.scroll_snap.begin_drag(&mut self.surface.cx());
  }

  /// Returns the offset actually applied.
  pub fn scrolled(&mut self, offset: f32) -> f32 {
    let applied = self.scroll_snap.drag(&mut self.surface.cx(), offset);
    self.redraw();
    applied
  }

  pub fn scroll_ended(&mut self, now: Instant) -> Option<ParagraphId> {
    self.scroll_snap.end_drag(&mut self.surface.cx(), now)
  }

  /// Momentum scrolling came to rest.
  pub fn scroll_decelerated(&mut self, now: Instant) -> Option<ParagraphId> {
    self.scroll_snap.settle(&mut self.surface.cx(), now)
  }

  // direct commands

  /// Insert an empty paragraph after `index`. Returns the new index.
  pub fn reply_to(&mut self, index: usize) -> Result<usize> {
    self.surface.gate.check(GestureKind::ReplySwipe)?;
    let surface = &mut self.surface;
    let new = surface
      .document
      .insert_reply(index, &self.config.spacing, &*surface.layout)?;
    self.normalize();
    self.redraw();
    Ok(new)
  }

  pub fn delete_paragraph(&mut self, index: usize) -> Result<()> {
    self.surface.gate.check(GestureKind::DeleteSwipe)?;
    let surface = &mut self.surface;
    surface
      .document
      .delete_paragraph(index, &*surface.layout)?;
    self.normalize();
    self.redraw();
    Ok(())
  }

  pub fn move_paragraph(&mut self, from: usize, to: usize) -> Result<()> {
    self.surface.gate.check(GestureKind::ReorderDrag)?;
    let surface = &mut self.surface;
    surface
      .document
      .move_paragraph(from, to, &*surface.layout)?;
    self.redraw();
    Ok(())
  }

  /// Put the spacing after paragraph `index` on `detent` without animating.
  pub fn set_spacing(&mut self, index: usize, detent: Detent) -> Result<()> {
    self.surface.gate.check(GestureKind::SpacingPinch)?;
    let spacing = self.config.spacing.value(detent);
    let surface = &mut self.surface;
    surface
      .document
      .set_paragraph_spacing(index, spacing, &*surface.layout)?;
    self.redraw();
    Ok(())
  }

  /// Advance every running animation. Returns whether the host should keep
  /// delivering frames.
  pub fn on_frame(&mut self, now: Instant) -> bool {
    let mut changed = self.spacing.tick(&mut self.surface.cx(), now);
    changed |= self.reorder.tick(&mut self.surface.cx(), now);
    changed |= self.swipe.tick(&mut self.surface.cx(), now);
    changed |= self.scroll_snap.tick(&mut self.surface.cx(), now);
    if changed {
      self.redraw();
    }
    self.surface.display.is_running()
  }

  fn normalize(&mut self) {
    self.spacing.relocate(&self.surface.document);
    let protected = self.spacing.protected_ids();
    let surface = &mut self.surface;
    if surface
      .document
      .normalize_spacing(&self.config.spacing, &protected, &*surface.layout)
    {
      tracing::trace!("normalized stray paragraph spacing");
    }
  }

  fn redraw(&mut self) {
    let dragged = self.reorder.dragged();
    let swiped = self.swipe.swiped();
    let centered = self.scroll_snap.centered();
    let spacing = &self.spacing;
    let mut frame = OverlayFrame::capture(&self.surface.document, |_, id| {
      if dragged == Some(id) {
        Emphasis::Lifted
      } else if swiped == Some(id) {
        Emphasis::Swiped
      } else if spacing.involves(id) {
        Emphasis::Spacing
      } else if centered == Some(id) {
        Emphasis::Centered
      } else {
        Emphasis::None
      }
    });
    frame.ghost = self.reorder.ghost();
    frame.swipe = self.swipe.visual();
    self.overlay.redraw(&frame);
  }
}
