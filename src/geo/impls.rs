//! Operator overloads.

use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Mul;
use std::ops::Sub;

use crate::geo::Point;

impl<T> From<(T, T)> for Point<T> {
  #[inline]
  fn from((x, y): (T, T)) -> Self {
    Self::new(x, y)
  }
}

impl<T: Add<Output = T> + Copy> Add for Point<T> {
  type Output = Point<T>;
  #[inline]
  fn add(self, other: Self) -> Self {
    Point([self.0[0] + other.0[0], self.0[1] + other.0[1]])
  }
}

impl<T: Sub<Output = T> + Copy> Sub for Point<T> {
  type Output = Point<T>;
  #[inline]
  fn sub(self, other: Self) -> Self {
    Point([self.0[0] - other.0[0], self.0[1] - other.0[1]])
  }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Point<T> {
  type Output = Point<T>;
  #[inline]
  fn mul(self, scale: T) -> Self {
    Point([self.0[0] * scale, self.0[1] * scale])
  }
}

impl<T: AddAssign<T> + Copy> AddAssign for Point<T> {
  #[inline]
  fn add_assign(&mut self, other: Self) {
    self.0[0] += other.0[0];
    self.0[1] += other.0[1];
  }
}
