//! Long-press drag that live-reorders paragraphs.
//!
//! The dragged paragraph is moved in the buffer as soon as the touch crosses
//! a neighbour's midpoint, so the logical order always matches what is on
//! screen. Near the top or bottom edge of the viewport the content scrolls
//! under the touch, faster the closer the touch gets to the edge.

use std::time::Instant;

use ruled_core::geometry::Point;

use crate::{
  animation::{
    FrameClient,
    FrameHandle,
  },
  config::ReorderConfig,
  gesture::{
    GestureContext,
    GestureError,
    GestureKind,
    Result,
  },
  haptics::HapticStrength,
  overlay::Ghost,
  paragraph::ParagraphId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReorderPhase {
  Idle,
  Dragging,
}

/// Where a finished drag left its paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderOutcome {
  pub id:   ParagraphId,
  pub from: usize,
  pub to:   usize,
}

#[derive(Debug, Clone)]
struct Drag {
  id:            ParagraphId,
  source:        usize,
  current:       usize,
  config:        ReorderConfig,
  /// Primary touch, in viewport coordinates.
  touch:         Point,
  touch_offset:  Point,
  extra_touches: usize,
  /// Auto-scroll speed in points per second, negative scrolls up.
  velocity:      f32,
  last_tick:     Option<Instant>,
}

#[derive(Debug)]
pub struct ReorderController {
  config:  ReorderConfig,
  enabled: bool,
  drag:    Option<Drag>,
  frame:   Option<FrameHandle>,
}

impl ReorderController {
  pub fn new(config: ReorderConfig, enabled: bool) -> Self {
    Self {
      config,
      enabled,
      drag: None,
      frame: None,
    }
  }

  /// Takes effect with the next drag.
  pub fn set_config(&mut self, config: ReorderConfig, enabled: bool) {
    self.config = config;
    self.enabled = enabled;
  }

  pub fn phase(&self) -> ReorderPhase {
    if self.drag.is_some() {
      ReorderPhase::Dragging
    } else {
      ReorderPhase::Idle
    }
  }

  pub fn dragged(&self) -> Option<ParagraphId> {
    self.drag.as_ref().map(|drag| drag.id)
  }

  pub fn ghost(&self) -> Option<Ghost> {
    self.drag.as_ref().map(|drag| {
      Ghost {
        id:           drag.id,
        touch:        drag.touch,
        touch_offset: drag.touch_offset,
      }
    })
  }

  pub fn is_auto_scrolling(&self) -> bool {
    self.drag.as_ref().is_some_and(|drag| drag.velocity != 0.0)
  }

  /// Pick up the paragraph under `touch` (viewport coordinates).
  pub fn begin(&mut self, cx: &mut GestureContext<'_>, touch: Point) -> Result<ParagraphId> {
    if !self.enabled {
      return Err(GestureError::Disabled(GestureKind::ReorderDrag));
    }
    cx.gate.check(GestureKind::ReorderDrag)?;
    let index = cx
      .document
      .paragraph_at(touch)
      .ok_or(GestureError::NoParagraph)?;
    let id = cx.document.paragraphs()[index].id;
    let bounds = cx.document.geometry().bounds(index).unwrap_or_default();
    let content = cx.document.to_content(touch);
    cx.gate.try_begin(GestureKind::ReorderDrag)?;

    tracing::debug!(?id, index, "reorder drag began");
    self.drag = Some(Drag {
      id,
      source: index,
      current: index,
      config: self.config,
      touch,
      touch_offset: Point::new(content.x - bounds.x, content.y - bounds.y),
      extra_touches: 0,
      velocity: 0.0,
      last_tick: None,
    });
    Ok(id)
  }

  /// Follow the primary touch. Returns whether the order changed.
  pub fn update(&mut self, cx: &mut GestureContext<'_>, touch: Point, now: Instant) -> bool {
    let Some(drag) = self.drag.as_mut() else {
      return false;
    };
    drag.touch = touch;
    let moved = retarget(drag, cx);
    self.update_auto_scroll(cx, now);
    moved
  }

  /// A second finger landed: manual scrolling takes over from auto-scroll.
  pub fn touch_added(&mut self, cx: &mut GestureContext<'_>) {
    let Some(drag) = self.drag.as_mut() else {
      return;
    };
    drag.extra_touches += 1;
    drag.velocity = 0.0;
    drag.last_tick = None;
    cx.display.release(&mut self.frame);
  }

  pub fn touch_removed(&mut self, cx: &mut GestureContext<'_>, now: Instant) {
    let Some(drag) = self.drag.as_mut() else {
      return;
    };
    drag.extra_touches = drag.extra_touches.saturating_sub(1);
    self.update_auto_scroll(cx, now);
  }

  /// Auto-scroll step. Returns whether the scroll offset or order changed.
  pub fn tick(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> bool {
    let Some(drag) = self.drag.as_mut() else {
      return false;
    };
    if drag.velocity == 0.0 {
      return false;
    }
    let last = drag.last_tick.replace(now).unwrap_or(now);
    let elapsed = now.saturating_duration_since(last).as_secs_f32();
    let before = cx.document.scroll().offset;
    let after = cx
      .document
      .set_scroll_offset(before + drag.velocity * elapsed);
    tracing::trace!(before, after, "reorder auto-scroll");
    let moved = retarget(drag, cx);
    moved || after != before
  }

  pub fn end(&mut self, cx: &mut GestureContext<'_>) -> Option<ReorderOutcome> {
    self.finish(cx)
  }

  /// Same cleanup as [`Self::end`]; moves already applied stay applied.
  pub fn cancel(&mut self, cx: &mut GestureContext<'_>) -> Option<ReorderOutcome> {
    self.finish(cx)
  }

  fn finish(&mut self, cx: &mut GestureContext<'_>) -> Option<ReorderOutcome> {
    let drag = self.drag.take()?;
    cx.display.release(&mut self.frame);
    cx.gate.release(GestureKind::ReorderDrag);
    cx.haptics.pulse(HapticStrength::Medium);
    cx.document.refresh_geometry(cx.layout);
    let outcome = ReorderOutcome {
      id:   drag.id,
      from: drag.source,
      to:   drag.current,
    };
    tracing::debug!(?outcome, "reorder drag ended");
    Some(outcome)
  }

  fn update_auto_scroll(&mut self, cx: &mut GestureContext<'_>, now: Instant) {
    let Some(drag) = self.drag.as_mut() else {
      return;
    };
    drag.velocity = if drag.extra_touches > 0 {
      0.0
    } else {
      edge_velocity(&drag.config, drag.touch.y, cx.document.scroll().viewport_height)
    };
    if drag.velocity == 0.0 {
      drag.last_tick = None;
      cx.display.release(&mut self.frame);
    } else if self.frame.is_none_or(|handle| !cx.display.is_live(handle)) {
      drag.last_tick = Some(now);
      cx.display.ensure(&mut self.frame, FrameClient::AutoScroll);
    }
  }
}

/// Move the dragged paragraph to the slot under the touch.
fn retarget(drag: &mut Drag, cx: &mut GestureContext<'_>) -> bool {
  if let Some(idx) = cx.document.model().index_of(drag.id) {
    drag.current = idx;
  }
  let y = cx.document.to_content(drag.touch).y;
  let paragraphs = cx.document.paragraphs();
  let mut target = paragraphs
    .iter()
    .filter(|p| p.geometry.mid_y() < y)
    .count();
  if target > drag.current {
    target -= 1;
  }
  let target = target.min(paragraphs.len().saturating_sub(1));
  if target == drag.current {
    return false;
  }
  match cx
    .document
    .move_paragraph(drag.current, target, cx.layout)
  {
    Ok(()) => {
      tracing::trace!(from = drag.current, to = target, "paragraph moved");
      drag.current = target;
      true
    },
    Err(err) => {
      tracing::trace!(%err, "reorder move failed");
      false
    },
  }
}

/// Signed auto-scroll speed for a touch at viewport height `y`.
fn edge_velocity(config: &ReorderConfig, y: f32, viewport_height: f32) -> f32 {
  let threshold = config.scroll_edge_threshold;
  if threshold <= 0.0 {
    return 0.0;
  }
  let speed = |distance: f32| {
    let proximity = (1.0 - distance.max(0.0) / threshold).clamp(0.0, 1.0);
    config.min_scroll_speed + (config.max_scroll_speed - config.min_scroll_speed) * proximity
  };
  if y < threshold {
    -speed(y)
  } else if y > viewport_height - threshold {
    speed(viewport_height - y)
  } else {
    0.0
  }
}
