//! Pinch-to-relate: continuous adjustment of the spacing between two
//! adjacent paragraphs, settling on one of two detents.
//!
//! ```text
//! Idle --begin--> Priming <--zone--> Active
//!                    |                  |
//!                 release            release
//!                    v                  v
//!                Reverting          Committing --settled--> Idle
//! ```
//!
//! While the pinch is down the spacing follows the change in distance
//! between the two touches, clamped to the detents. Moving to within the
//! activation threshold of the detent opposite to where the pinch started
//! primes a commit; releasing then settles on that detent, otherwise on the
//! spacing the pinch started from.

use std::{
  ops::Range,
  time::Instant,
};

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
  config::SpacingConfig,
  document::Document,
  gesture::{
    GestureContext,
    GestureError,
    GestureKind,
    Result,
  },
  haptics::HapticStrength,
  paragraph::ParagraphId,
  style::Detent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpacingPhase {
  Idle,
  /// Pinch down, release would revert.
  Priming,
  /// Pinch down, release would commit to the opposite detent.
  Active,
  Committing,
  Reverting,
}

#[derive(Debug, Clone)]
struct Pinch {
  id:               ParagraphId,
  range:            Range<usize>,
  config:           SpacingConfig,
  initial_spacing:  f32,
  start_detent:     Detent,
  /// Detent the spacing rested on when the pinch began.
  occupied:         Option<Detent>,
  initial_distance: f32,
  live:             f32,
  primed:           bool,
  /// Set once a limit pulse fired, until the spacing leaves the limit again.
  at_limit:         bool,
}

impl Pinch {
  fn target(&self) -> f32 {
    if self.primed {
      self.config.value(self.start_detent.opposite())
    } else {
      self.initial_spacing
    }
  }
}

/// One in-flight spacing transition, keyed by the paragraph's id.
#[derive(Debug, Clone)]
struct SpacingAnimation {
  id:     ParagraphId,
  range:  Range<usize>,
  tween:  Tween<f32>,
  commit: bool,
}

#[derive(Debug)]
pub struct SpacingController {
  config:     SpacingConfig,
  pinch:      Option<Pinch>,
  animations: Vec<SpacingAnimation>,
  frame:      Option<FrameHandle>,
}

impl SpacingController {
  pub fn new(config: SpacingConfig) -> Self {
    Self {
      config,
      pinch: None,
      animations: Vec::new(),
      frame: None,
    }
  }

  /// Takes effect with the next pinch.
  pub fn set_config(&mut self, config: SpacingConfig) {
    self.config = config;
  }

  pub fn phase(&self) -> SpacingPhase {
    match (&self.pinch, self.animations.last()) {
      (Some(pinch), _) if pinch.primed => SpacingPhase::Active,
      (Some(_), _) => SpacingPhase::Priming,
      (None, Some(animation)) if animation.commit => SpacingPhase::Committing,
      (None, Some(_)) => SpacingPhase::Reverting,
      (None, None) => SpacingPhase::Idle,
    }
  }

  pub fn is_pinching(&self) -> bool {
    self.pinch.is_some()
  }

  pub fn is_animating(&self) -> bool {
    !self.animations.is_empty()
  }

  pub fn is_primed(&self) -> bool {
    self.pinch.as_ref().is_some_and(|pinch| pinch.primed)
  }

  pub fn live_spacing(&self) -> Option<f32> {
    self.pinch.as_ref().map(|pinch| pinch.live)
  }

  pub fn initial_spacing(&self) -> Option<f32> {
    self.pinch.as_ref().map(|pinch| pinch.initial_spacing)
  }

  /// Whether paragraph `id` is being pinched or is settling.
  pub fn involves(&self, id: ParagraphId) -> bool {
    self.pinch.as_ref().is_some_and(|pinch| pinch.id == id)
      || self.animations.iter().any(|animation| animation.id == id)
  }

  /// Paragraphs whose spacing is owned by this controller right now.
  pub fn protected_ids(&self) -> Vec<ParagraphId> {
    self
      .pinch
      .iter()
      .map(|pinch| pinch.id)
      .chain(self.animations.iter().map(|animation| animation.id))
      .collect()
  }

  /// Re-resolve the pinched and settling ranges after an edit shifted them.
  pub fn relocate(&mut self, document: &Document) {
    if let Some(pinch) = self.pinch.as_mut() {
      follow(document, pinch.id, &mut pinch.range);
    }
    for animation in &mut self.animations {
      follow(document, animation.id, &mut animation.range);
    }
  }

  /// Start a pinch with touches at `first` and `second` (viewport
  /// coordinates). They must sit over two adjacent paragraphs.
  pub fn begin(
    &mut self,
    cx: &mut GestureContext<'_>,
    first: Point,
    second: Point,
    now: Instant,
  ) -> Result<()> {
    cx.gate.check(GestureKind::SpacingPinch)?;
    let (a, b) = match (
      cx.document.paragraph_at(first),
      cx.document.paragraph_at(second),
    ) {
      (Some(a), Some(b)) if a.abs_diff(b) == 1 => (a, b),
      pair => {
        tracing::debug!(?pair, "pinch rejected");
        return Err(GestureError::AmbiguousGeometry);
      },
    };
    let Some(upper) = cx.document.paragraphs().get(a.min(b)) else {
      return Err(GestureError::AmbiguousGeometry);
    };
    let (id, range, spacing) = (upper.id, upper.range.clone(), upper.spacing);

    let initial_spacing = self.take_animation(id, now).unwrap_or(spacing);
    self.release_frame_if_idle(cx);
    cx.gate.try_begin(GestureKind::SpacingPinch)?;

    let config = self.config;
    tracing::debug!(?id, initial_spacing, "pinch began");
    self.pinch = Some(Pinch {
      id,
      range,
      config,
      initial_spacing,
      start_detent: config.nearest(initial_spacing),
      occupied: config.detent_of(initial_spacing),
      initial_distance: first.distance(second),
      live: initial_spacing,
      primed: false,
      at_limit: false,
    });
    Ok(())
  }

  /// Follow the touches. Returns the live spacing written to the buffer.
  pub fn update(&mut self, cx: &mut GestureContext<'_>, first: Point, second: Point) -> Option<f32> {
    let pinch = self.pinch.as_mut()?;
    let config = pinch.config;
    let delta = first.distance(second) - pinch.initial_distance;
    pinch.live = config.clamp(pinch.initial_spacing + delta);

    if !follow(cx.document, pinch.id, &mut pinch.range) {
      tracing::trace!(id = ?pinch.id, "pinched paragraph is gone");
    } else if let Err(err) = cx.document.apply_spacing(&pinch.range, pinch.live, cx.layout) {
      tracing::trace!(%err, "dropping live spacing write");
    }

    let opposite = config.value(pinch.start_detent.opposite());
    let primed = (pinch.live - opposite).abs() <= config.activation_threshold;
    if primed != pinch.primed {
      pinch.primed = primed;
      cx.haptics.pulse(if primed {
        HapticStrength::Medium
      } else {
        HapticStrength::Light
      });
    }

    match config.detent_of(pinch.live) {
      Some(detent) if Some(detent) != pinch.occupied => {
        if !pinch.at_limit {
          pinch.at_limit = true;
          cx.haptics.pulse(HapticStrength::Soft);
        }
      },
      Some(_) => {},
      None => pinch.at_limit = false,
    }
    Some(pinch.live)
  }

  /// Release: settle on the opposite detent if primed, else revert.
  pub fn end(&mut self, cx: &mut GestureContext<'_>, now: Instant) {
    let Some(pinch) = self.pinch.take() else {
      return;
    };
    cx.gate.release(GestureKind::SpacingPinch);

    let target = pinch.target();
    tracing::debug!(id = ?pinch.id, live = pinch.live, target, primed = pinch.primed, "pinch released");
    self.animations.push(SpacingAnimation {
      id:     pinch.id,
      range:  pinch.range,
      tween:  Tween::new(
        now,
        pinch.config.settle_duration(),
        pinch.live,
        target,
        Easing::EaseOutBack,
      ),
      commit: pinch.primed,
    });
    cx.display.ensure(&mut self.frame, FrameClient::SpacingSettle);
    cx.gate.set_settling(true);
  }

  /// Interrupted pinches settle back where they started.
  pub fn cancel(&mut self, cx: &mut GestureContext<'_>, now: Instant) {
    if let Some(pinch) = self.pinch.as_mut() {
      pinch.primed = false;
    }
    self.end(cx, now);
  }

  /// Advance settle animations. Returns whether any spacing changed.
  pub fn tick(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> bool {
    if self.animations.is_empty() {
      return false;
    }
    let mut changed = false;
    self.animations.retain_mut(|animation| {
      let document = &mut *cx.document;
      if !follow(document, animation.id, &mut animation.range) {
        tracing::trace!(range = ?animation.range, "dropping stale spacing animation");
        return false;
      }

      let finished = animation.tween.is_finished(now);
      let value = animation.tween.value_at(now);
      if let Err(err) = document.apply_spacing(&animation.range, value, cx.layout) {
        tracing::trace!(%err, "dropping stale spacing animation");
        return false;
      }
      changed = true;
      if finished {
        tracing::debug!(id = ?animation.id, value, "spacing settled");
        cx.haptics.pulse(HapticStrength::Light);
      }
      !finished
    });
    self.release_frame_if_idle(cx);
    changed
  }

  /// Remove the animation running on paragraph `id`, returning its value
  /// at `now`.
  fn take_animation(&mut self, id: ParagraphId, now: Instant) -> Option<f32> {
    let idx = self
      .animations
      .iter()
      .position(|animation| animation.id == id)?;
    let animation = self.animations.remove(idx);
    Some(animation.tween.value_at(now))
  }

  fn release_frame_if_idle(&mut self, cx: &mut GestureContext<'_>) {
    if self.animations.is_empty() {
      cx.display.release(&mut self.frame);
      cx.gate.set_settling(false);
    }
  }
}

/// Point `range` at paragraph `id`'s current range. Returns false once the
/// paragraph no longer exists.
fn follow(document: &Document, id: ParagraphId, range: &mut Range<usize>) -> bool {
  let Some(paragraph) = document
    .model()
    .index_of(id)
    .and_then(|idx| document.paragraphs().get(idx))
  else {
    return false;
  };
  range.clone_from(&paragraph.range);
  true
}
