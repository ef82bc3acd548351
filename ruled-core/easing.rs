use crate::geometry::Point;

/// Angular frequency of [`Easing::Spring`], in radians per unit of normalized
/// time. High enough that a half-damped spring has visibly settled by `t = 1`.
const SPRING_FREQUENCY: f32 = 12.0;

/// Overshoot constant of the "back" curves.
const BACK_OVERSHOOT: f32 = 1.70158;

/// Timing curves for animations.
///
/// Every curve maps normalized time `t` in `[0, 1]` to progress, with
/// `apply(0) == 0` and `apply(1) == 1`. Back and spring curves overshoot in
/// between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
  /// Linear interpolation (no easing)
  Linear,
  /// Quadratic ease in
  EaseInQuad,
  /// Quadratic ease out
  EaseOutQuad,
  /// Quadratic ease in and out
  EaseInOutQuad,
  /// Cubic ease in
  EaseInCubic,
  /// Cubic ease out
  EaseOutCubic,
  /// Cubic ease in and out
  EaseInOutCubic,
  /// Quartic ease out
  EaseOutQuart,
  /// Cubic ease out that overshoots the target before settling
  EaseOutBack,
  /// Damped harmonic oscillator. `damping` is the damping ratio, values below
  /// `1.0` oscillate around the target.
  Spring { damping: f32 },
}

impl Easing {
  /// Apply the easing function to a linear time value (0.0 to 1.0)
  pub fn apply(self, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match self {
      Easing::Linear => t,
      Easing::EaseInQuad => t * t,
      Easing::EaseOutQuad => t * (2.0 - t),
      Easing::EaseInOutQuad => {
        if t < 0.5 {
          2.0 * t * t
        } else {
          -1.0 + (4.0 - 2.0 * t) * t
        }
      },
      Easing::EaseInCubic => t * t * t,
      Easing::EaseOutCubic => {
        let t = t - 1.0;
        t * t * t + 1.0
      },
      Easing::EaseInOutCubic => {
        if t < 0.5 {
          4.0 * t * t * t
        } else {
          let t = 2.0 * t - 2.0;
          1.0 + t * t * t / 2.0
        }
      },
      Easing::EaseOutQuart => {
        let t = t - 1.0;
        1.0 - t * t * t * t
      },
      Easing::EaseOutBack => {
        let c3 = BACK_OVERSHOOT + 1.0;
        let t = t - 1.0;
        1.0 + c3 * t * t * t + BACK_OVERSHOOT * t * t
      },
      Easing::Spring { damping } => spring(t, damping),
    }
  }

  /// Whether the curve may leave the `[0, 1]` band before completing.
  pub fn overshoots(self) -> bool {
    match self {
      Easing::EaseOutBack => true,
      Easing::Spring { damping } => damping < 1.0,
      _ => false,
    }
  }
}

fn spring(t: f32, damping: f32) -> f32 {
  if t >= 1.0 {
    return 1.0;
  }
  let omega = SPRING_FREQUENCY;
  let damping = damping.max(0.0);
  if damping >= 1.0 {
    // critically damped
    return 1.0 - (-omega * t).exp() * (1.0 + omega * t);
  }
  let damped = omega * (1.0 - damping * damping).sqrt();
  let envelope = (-damping * omega * t).exp();
  1.0
    - envelope
      * ((damped * t).cos() + (damping * omega / damped) * (damped * t).sin())
}

/// Trait for types that can be animated (interpolated)
pub trait Animatable: Clone {
  /// Linear interpolation between self and target
  /// t is in the range [0.0, 1.0] where 0.0 = self, 1.0 = target. Overshooting
  /// curves may pass values slightly outside that range.
  fn lerp(&self, target: &Self, t: f32) -> Self;
}

impl Animatable for f32 {
  fn lerp(&self, target: &Self, t: f32) -> Self {
    self + (target - self) * t
  }
}

impl Animatable for f64 {
  fn lerp(&self, target: &Self, t: f32) -> Self {
    self + (target - self) * t as f64
  }
}

impl Animatable for Point {
  fn lerp(&self, target: &Self, t: f32) -> Self {
    Point::new(self.x.lerp(&target.x, t), self.y.lerp(&target.y, t))
  }
}

/// Interpolate from `from` to `to` at normalized time `t` along `easing`.
pub fn interpolate<T: Animatable>(from: &T, to: &T, t: f32, easing: Easing) -> T {
  from.lerp(to, easing.apply(t))
}
