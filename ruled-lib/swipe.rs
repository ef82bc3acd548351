//! Horizontal swipe on a paragraph: right to reply, left to delete.
//!
//! ```text
//! Idle --down--> Pending --horizontal move--> Tracking(direction) --release--> Idle
//!                   |                                |
//!            vertical move                      not confirmed
//!                   v                                v
//!                 Idle                          SpringingBack --settled--> Idle
//! ```
//!
//! A reply is confirmed by releasing at the threshold. A delete additionally
//! needs the touch held at the threshold until the hold timer completes;
//! completion pulses right away, before the finger lifts.

use std::time::Instant;

use ruled_core::{
  easing::Easing,
  geometry::Point,
};

use crate::{
  animation::{
    FrameClient,
    FrameHandle,
    Tween,
  },
  buffer::StyledText,
  config::{
    SpacingConfig,
    SwipeConfig,
  },
  gesture::{
    GestureContext,
    GestureError,
    GestureKind,
    Result,
  },
  haptics::HapticStrength,
  overlay::SwipeVisual,
  paragraph::ParagraphId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
  /// Rightwards.
  Reply,
  /// Leftwards.
  Delete,
}

impl SwipeDirection {
  pub fn gesture(self) -> GestureKind {
    match self {
      SwipeDirection::Reply => GestureKind::ReplySwipe,
      SwipeDirection::Delete => GestureKind::DeleteSwipe,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipePhase {
  Idle,
  /// Finger down, direction not decided yet.
  Pending,
  Tracking(SwipeDirection),
  SpringingBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
  /// A paragraph was inserted at `index`.
  Replied { index: usize },
  /// The paragraph at `index` was removed, or cleared if it was the only one.
  Deleted { index: usize },
  SprungBack,
}

#[derive(Debug, Clone)]
struct Swipe {
  id:            ParagraphId,
  origin:        Point,
  snapshot:      StyledText,
  config:        SwipeConfig,
  direction:     Option<SwipeDirection>,
  offset:        f32,
  hold_started:  Option<Instant>,
  hold_progress: f32,
  hold_complete: bool,
}

#[derive(Debug, Clone)]
struct SpringBack {
  id:        ParagraphId,
  direction: Option<SwipeDirection>,
  threshold: f32,
  offset:    Tween<f32>,
  ring:      Tween<f32>,
  current:   (f32, f32),
}

#[derive(Debug)]
pub struct SwipeController {
  config:       SwipeConfig,
  spacing:      SpacingConfig,
  swipe:        Option<Swipe>,
  settle:       Option<SpringBack>,
  hold_frame:   Option<FrameHandle>,
  settle_frame: Option<FrameHandle>,
}

impl SwipeController {
  pub fn new(config: SwipeConfig, spacing: SpacingConfig) -> Self {
    Self {
      config,
      spacing,
      swipe: None,
      settle: None,
      hold_frame: None,
      settle_frame: None,
    }
  }

  /// Takes effect with the next swipe.
  pub fn set_config(&mut self, config: SwipeConfig, spacing: SpacingConfig) {
    self.config = config;
    self.spacing = spacing;
  }

  pub fn phase(&self) -> SwipePhase {
    match (&self.swipe, &self.settle) {
      (Some(swipe), _) => {
        swipe
          .direction
          .map_or(SwipePhase::Pending, SwipePhase::Tracking)
      },
      (None, Some(_)) => SwipePhase::SpringingBack,
      (None, None) => SwipePhase::Idle,
    }
  }

  pub fn swiped(&self) -> Option<ParagraphId> {
    self
      .swipe
      .as_ref()
      .map(|swipe| swipe.id)
      .or(self.settle.as_ref().map(|settle| settle.id))
  }

  /// Content of the paragraph as it was when the finger went down.
  pub fn snapshot(&self) -> Option<&StyledText> {
    self.swipe.as_ref().map(|swipe| &swipe.snapshot)
  }

  pub fn hold_progress(&self) -> f32 {
    self.swipe.as_ref().map_or(0.0, |swipe| swipe.hold_progress)
  }

  pub fn visual(&self) -> Option<SwipeVisual> {
    if let Some(swipe) = &self.swipe {
      return Some(SwipeVisual {
        id:            swipe.id,
        direction:     swipe.direction,
        offset:        swipe.offset,
        icon_progress: (swipe.offset.abs() / swipe.config.threshold).min(1.0),
        ring_progress: swipe.hold_progress,
      });
    }
    self.settle.as_ref().map(|settle| {
      let (offset, ring) = settle.current;
      SwipeVisual {
        id: settle.id,
        direction: settle.direction,
        offset,
        icon_progress: (offset.abs() / settle.threshold).min(1.0),
        ring_progress: ring,
      }
    })
  }

  /// Finger down at `touch` (viewport coordinates).
  pub fn begin(&mut self, cx: &mut GestureContext<'_>, touch: Point) -> Result<ParagraphId> {
    cx.gate.check(GestureKind::ReplySwipe)?;
    let index = cx
      .document
      .paragraph_at(touch)
      .ok_or(GestureError::NoParagraph)?;
    let paragraph = &cx.document.paragraphs()[index];
    let id = paragraph.id;
    let snapshot = paragraph.content.clone();

    self.settle = None;
    cx.display.release(&mut self.settle_frame);
    self.swipe = Some(Swipe {
      id,
      origin: touch,
      snapshot,
      config: self.config,
      direction: None,
      offset: 0.0,
      hold_started: None,
      hold_progress: 0.0,
      hold_complete: false,
    });
    Ok(id)
  }

  /// Follow the touch. The first decisive move either locks a direction and
  /// claims the gate, or abandons the swipe to scrolling.
  pub fn update(&mut self, cx: &mut GestureContext<'_>, touch: Point, now: Instant) -> Result<()> {
    let Some(swipe) = self.swipe.as_mut() else {
      return Ok(());
    };
    let dx = touch.x - swipe.origin.x;
    let dy = touch.y - swipe.origin.y;

    let direction = match swipe.direction {
      Some(direction) => direction,
      None if dx == 0.0 && dy == 0.0 => return Ok(()),
      None if dy.abs() > dx.abs() => {
        tracing::debug!(dx, dy, "vertical move, leaving it to scrolling");
        self.swipe = None;
        return Ok(());
      },
      None => {
        let direction = if dx > 0.0 {
          SwipeDirection::Reply
        } else {
          SwipeDirection::Delete
        };
        if let Err(err) = cx.gate.try_begin(direction.gesture()) {
          self.swipe = None;
          return Err(err);
        }
        swipe.direction = Some(direction);
        direction
      },
    };

    let threshold = swipe.config.threshold;
    swipe.offset = match direction {
      SwipeDirection::Reply => dx.clamp(0.0, threshold),
      SwipeDirection::Delete => dx.clamp(-threshold, 0.0),
    };

    if direction == SwipeDirection::Delete && !swipe.hold_complete {
      if swipe.offset.abs() >= threshold {
        if swipe.hold_started.is_none() {
          tracing::trace!("delete hold started");
          swipe.hold_started = Some(now);
          cx.display.ensure(&mut self.hold_frame, FrameClient::SwipeHold);
        }
      } else if swipe.hold_started.take().is_some() {
        tracing::trace!("delete hold reset");
        swipe.hold_progress = 0.0;
        cx.display.release(&mut self.hold_frame);
      }
    }
    Ok(())
  }

  /// Advance the hold timer and the spring back. Returns whether the visual
  /// changed.
  pub fn tick(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> bool {
    let mut changed = false;

    if let Some(swipe) = self.swipe.as_mut()
      && let Some(started) = swipe.hold_started
      && !swipe.hold_complete
    {
      let hold = swipe.config.hold_duration();
      swipe.hold_progress = if hold.is_zero() {
        1.0
      } else {
        (now.saturating_duration_since(started).as_secs_f32() / hold.as_secs_f32()).min(1.0)
      };
      changed = true;
      if swipe.hold_progress >= 1.0 {
        tracing::debug!(id = ?swipe.id, "delete hold complete");
        swipe.hold_complete = true;
        cx.haptics.pulse(HapticStrength::Heavy);
        cx.display.release(&mut self.hold_frame);
      }
    }

    if let Some(settle) = self.settle.as_mut() {
      settle.current = (settle.offset.value_at(now), settle.ring.value_at(now));
      changed = true;
      if settle.offset.is_finished(now) && settle.ring.is_finished(now) {
        self.settle = None;
        cx.display.release(&mut self.settle_frame);
      }
    }
    changed
  }

  /// Finger up: confirm per direction, or spring back.
  pub fn end(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> Option<SwipeOutcome> {
    self.finish(cx, now, true)
  }

  /// Interrupted swipes never confirm.
  pub fn cancel(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> Option<SwipeOutcome> {
    self.finish(cx, now, false)
  }

  fn finish(&mut self, cx: &mut GestureContext<'_>, now: Instant, allow_confirm: bool) -> Option<SwipeOutcome> {
    let swipe = self.swipe.take()?;
    cx.display.release(&mut self.hold_frame);
    let direction = swipe.direction?;
    cx.gate.release(direction.gesture());

    let confirmed = allow_confirm
      && match direction {
        SwipeDirection::Reply => swipe.offset.abs() >= swipe.config.threshold,
        SwipeDirection::Delete => swipe.hold_complete,
      };
    if confirmed && let Some(index) = cx.document.model().index_of(swipe.id) {
      let result = match direction {
        SwipeDirection::Reply => {
          cx.document
            .insert_reply(index, &self.spacing, cx.layout)
            .map(|index| SwipeOutcome::Replied { index })
        },
        SwipeDirection::Delete => {
          cx.document
            .delete_paragraph(index, cx.layout)
            .map(|()| SwipeOutcome::Deleted { index })
        },
      };
      match result {
        Ok(outcome) => {
          tracing::debug!(?outcome, "swipe confirmed");
          return Some(outcome);
        },
        Err(err) => tracing::trace!(%err, "swipe action failed"),
      }
    }

    let duration = swipe.config.spring_back_duration();
    self.settle = Some(SpringBack {
      id: swipe.id,
      direction: Some(direction),
      threshold: swipe.config.threshold,
      offset: Tween::new(now, duration, swipe.offset, 0.0, Easing::EaseOutBack),
      ring: Tween::new(now, duration, swipe.hold_progress, 0.0, Easing::EaseOutCubic),
      current: (swipe.offset, swipe.hold_progress),
    });
    cx.display.ensure(&mut self.settle_frame, FrameClient::SwipeSettle);
    Some(SwipeOutcome::SprungBack)
  }
}
