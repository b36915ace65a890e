//! Axis-aligned bounding boxes in 3D.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    /// A box containing nothing; growing it by one point yields that point.
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.grow(*p);
        }
        bb
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|d| self.min[d] > self.max[d])
    }

    pub fn grow(&mut self, p: [f64; 3]) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(p[d]);
            self.max[d] = self.max[d].max(p[d]);
        }
    }

    pub fn merge(&mut self, other: &Aabb) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(other.min[d]);
            self.max[d] = self.max[d].max(other.max[d]);
        }
    }

    pub fn inflate(&mut self, margin: f64) {
        if self.is_empty() {
            return;
        }
        for d in 0..3 {
            self.min[d] -= margin;
            self.max[d] += margin;
        }
    }

    /// Largest extent along any axis; 0 for an empty box.
    pub fn diameter(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (0..3)
            .map(|d| self.max[d] - self.min[d])
            .fold(0.0, f64::max)
    }

    pub fn center(&self, axis: usize) -> f64 {
        0.5 * (self.min[axis] + self.max[axis])
    }

    /// Axis of largest extent.
    pub fn longest_axis(&self) -> usize {
        let ext = |d: usize| self.max[d] - self.min[d];
        let mut axis = 0;
        for d in 1..3 {
            if ext(d) > ext(axis) {
                axis = d;
            }
        }
        axis
    }

    /// Closed-interval overlap test; touching boxes intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (0..3).all(|d| self.min[d] <= other.max[d] && other.min[d] <= self.max[d])
    }
}
