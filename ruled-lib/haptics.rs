//! Fire-and-forget haptic feedback capability.

use std::{
  cell::RefCell,
  rc::Rc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticStrength {
  /// Selection tick, the lightest pulse.
  Selection,
  Soft,
  Light,
  Medium,
  Heavy,
}

pub trait HapticFeedback {
  fn pulse(&mut self, strength: HapticStrength);
}

/// Drops every pulse. For hosts without a haptic engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl HapticFeedback for NoHaptics {
  fn pulse(&mut self, _strength: HapticStrength) {}
}

/// Records pulses in a shared log, so a caller can hand the recorder to a
/// session and still inspect what it emitted.
#[derive(Debug, Default, Clone)]
pub struct RecordedHaptics {
  log: Rc<RefCell<Vec<HapticStrength>>>,
}

impl RecordedHaptics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pulses(&self) -> Vec<HapticStrength> {
    self.log.borrow().clone()
  }

  pub fn count(&self, strength: HapticStrength) -> usize {
    self.log.borrow().iter().filter(|s| **s == strength).count()
  }

  pub fn clear(&self) {
    self.log.borrow_mut().clear();
  }
}

impl HapticFeedback for RecordedHaptics {
  fn pulse(&mut self, strength: HapticStrength) {
    tracing::trace!(?strength, "haptic pulse");
    self.log.borrow_mut().push(strength);
  }
}
