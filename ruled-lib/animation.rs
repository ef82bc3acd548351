//! Frame-driven animation primitives.
//!
//! The engine never sleeps or spawns timers. Hosts call
//! [`crate::editor::EditorSession::on_frame`] once per display refresh for as
//! long as the [`DisplayLink`] has subscriptions, passing the frame timestamp.
//! Every animation derives its value from the wall-clock time elapsed since it
//! started, so dropped frames never desynchronize timing.

use std::time::{
  Duration,
  Instant,
};

use ruled_core::easing::{
  Animatable,
  Easing,
};
use smallvec::SmallVec;

/// A value moving from `from` to `to` over `duration`, starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T: Animatable> {
  start:    Instant,
  duration: Duration,
  from:     T,
  to:       T,
  easing:   Easing,
}

impl<T: Animatable> Tween<T> {
  pub fn new(start: Instant, duration: Duration, from: T, to: T, easing: Easing) -> Self {
    Self {
      start,
      duration,
      from,
      to,
      easing,
    }
  }

  pub fn start(&self) -> Instant {
    self.start
  }

  pub fn from(&self) -> &T {
    &self.from
  }

  pub fn target(&self) -> &T {
    &self.to
  }

  pub fn easing(&self) -> Easing {
    self.easing
  }

  /// Normalized elapsed time in `[0, 1]`.
  pub fn progress(&self, now: Instant) -> f32 {
    let elapsed = now.saturating_duration_since(self.start);
    if self.duration.is_zero() {
      return 1.0;
    }
    (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
  }

  pub fn is_finished(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.start) >= self.duration
  }

  /// Value at `now`; exactly the target once finished.
  pub fn value_at(&self, now: Instant) -> T {
    if self.is_finished(now) {
      return self.to.clone();
    }
    self.from.lerp(&self.to, self.easing.apply(self.progress(now)))
  }
}

/// Handle for one display link subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// What a subscription animates. Lets hosts and tests see why frames are
/// being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameClient {
  SpacingSettle,
  AutoScroll,
  SwipeHold,
  SwipeSettle,
  ScrollSnap,
}

/// Registry of per-frame subscriptions, one per running animation.
#[derive(Debug, Default)]
pub struct DisplayLink {
  next_id:       u64,
  subscriptions: SmallVec<[(FrameHandle, FrameClient); 4]>,
}

impl DisplayLink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&mut self, client: FrameClient) -> FrameHandle {
    let handle = FrameHandle(self.next_id);
    self.next_id += 1;
    self.subscriptions.push((handle, client));
    tracing::trace!(?handle, ?client, "display link subscribed");
    handle
  }

  pub fn cancel(&mut self, handle: FrameHandle) {
    self.subscriptions.retain(|(id, _)| *id != handle);
  }

  /// Subscribe `slot` unless it already holds a live handle.
  pub fn ensure(&mut self, slot: &mut Option<FrameHandle>, client: FrameClient) {
    if slot.is_none_or(|handle| !self.is_live(handle)) {
      *slot = Some(self.subscribe(client));
    }
  }

  /// Cancel the handle in `slot`, if any.
  pub fn release(&mut self, slot: &mut Option<FrameHandle>) {
    if let Some(handle) = slot.take() {
      self.cancel(handle);
    }
  }

  pub fn is_live(&self, handle: FrameHandle) -> bool {
    self.subscriptions.iter().any(|(id, _)| *id == handle)
  }

  pub fn is_subscribed(&self, client: FrameClient) -> bool {
    self.subscriptions.iter().any(|(_, c)| *c == client)
  }

  /// Whether the host should keep delivering frames.
  pub fn is_running(&self) -> bool {
    !self.subscriptions.is_empty()
  }

  pub fn active_count(&self) -> usize {
    self.subscriptions.len()
  }
}

/// A fixed-step stand-in for the display refresh, for simulations and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepClock {
  now:  Instant,
  step: Duration,
}

impl FixedStepClock {
  pub fn new(start: Instant, frames_per_second: u32) -> Self {
    Self {
      now:  start,
      step: Duration::from_secs(1) / frames_per_second.max(1),
    }
  }

  pub fn now(&self) -> Instant {
    self.now
  }

  pub fn step(&self) -> Duration {
    self.step
  }

  /// Advance by one frame and return the new timestamp.
  pub fn tick(&mut self) -> Instant {
    self.now += self.step;
    self.now
  }

  pub fn advance(&mut self, by: Duration) -> Instant {
    self.now += by;
    self.now
  }
}
