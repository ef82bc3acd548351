//! Planar geometry in points, with `y` growing downwards.

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub const ZERO: Self = Self::new(0.0, 0.0);

  pub const fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  pub fn distance(self, other: Self) -> f32 {
    (self.x - other.x).hypot(self.y - other.y)
  }

  pub fn offset(self, dx: f32, dy: f32) -> Self {
    Self::new(self.x + dx, self.y + dy)
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
  pub x:      f32,
  pub y:      f32,
  pub width:  f32,
  pub height: f32,
}

impl Rect {
  pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  #[inline]
  pub fn origin(&self) -> Point {
    Point::new(self.x, self.y)
  }

  #[inline]
  pub fn min_y(&self) -> f32 {
    self.y
  }

  #[inline]
  pub fn max_y(&self) -> f32 {
    self.y + self.height
  }

  #[inline]
  pub fn mid_y(&self) -> f32 {
    self.y + self.height / 2.0
  }

  #[inline]
  pub fn max_x(&self) -> f32 {
    self.x + self.width
  }

  /// Half-open containment: the bottom and right edges belong to the
  /// neighbouring rectangle.
  pub fn contains(&self, point: Point) -> bool {
    point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
  }

  /// Containment on the vertical axis only.
  pub fn contains_y(&self, y: f32) -> bool {
    y >= self.y && y < self.max_y()
  }

  /// Smallest rectangle covering both.
  pub fn union(&self, other: &Self) -> Self {
    let x = self.x.min(other.x);
    let y = self.y.min(other.y);
    let max_x = self.max_x().max(other.max_x());
    let max_y = self.max_y().max(other.max_y());
    Self::new(x, y, max_x - x, max_y - y)
  }

  pub fn translate(&self, dx: f32, dy: f32) -> Self {
    Self::new(self.x + dx, self.y + dy, self.width, self.height)
  }
}
