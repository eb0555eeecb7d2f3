//! Pure geometry: points, rectangles, spline interpolation, arrowheads,
//! dash walking, and the other stateless math the router and renderer share.
//!
//! Everything here is a total function over value types. Degenerate inputs
//! (zero-length vectors, empty polylines) return early rather than producing
//! NaN.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Midpoint between this point and another.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Linear interpolation toward `other` by `t` in [0, 1].
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Unit vector from this point toward `other`, or `None` when the two
    /// points coincide (zero-length guard).
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Self> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len = dx.hypot(dy);
        if len < f64::EPSILON {
            return None;
        }
        Some(Self::new(dx / len, dy / len))
    }
}

/// An axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Whether this rectangle and `other` overlap (touching edges count).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Whether `pt` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// The rectangle grown by `padding` on every side.
    #[must_use]
    pub fn expanded(&self, padding: f64) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }

    /// Whether the segment `a`→`b` passes through this rectangle.
    #[must_use]
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let corners = [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ];
        for i in 0..4 {
            if segments_intersect(a, b, corners[i], corners[(i + 1) % 4]) {
                return true;
            }
        }
        false
    }
}

/// Whether segments `a1`→`a2` and `b1`→`b2` intersect.
#[must_use]
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    false
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Distance from `pt` to the segment `a`→`b`.
#[must_use]
pub fn point_segment_distance(pt: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < f64::EPSILON {
        return pt.distance(a);
    }
    let t = (((pt.x - a.x) * dx + (pt.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    pt.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Distance from `pt` to the nearest segment of `path`.
///
/// Returns `f64::INFINITY` for paths with fewer than two points.
#[must_use]
pub fn point_polyline_distance(pt: Point, path: &[Point]) -> f64 {
    path.windows(2)
        .map(|w| point_segment_distance(pt, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Total length of a polyline.
#[must_use]
pub fn polyline_length(path: &[Point]) -> f64 {
    path.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// The point at arc-length `distance` along `path`, clamped to the ends.
///
/// Returns `None` for an empty path.
#[must_use]
pub fn point_at_distance(path: &[Point], distance: f64) -> Option<Point> {
    let (&first, rest) = path.split_first()?;
    if distance <= 0.0 || rest.is_empty() {
        return Some(first);
    }
    let mut remaining = distance;
    let mut prev = first;
    for &next in rest {
        let seg = prev.distance(next);
        if seg >= remaining && seg > f64::EPSILON {
            return Some(prev.lerp(next, remaining / seg));
        }
        remaining -= seg;
        prev = next;
    }
    Some(prev)
}

/// Sample a Catmull-Rom-style spline through `points`.
///
/// Each consecutive pair is blended within a sliding four-point window
/// (endpoints are duplicated at the boundary) and sampled `samples_per_span`
/// times. With fewer than three input points the input is returned as-is.
#[must_use]
pub fn catmull_rom(points: &[Point], samples_per_span: usize) -> Vec<Point> {
    if points.len() < 3 || samples_per_span == 0 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity((points.len() - 1) * samples_per_span + 1);
    out.push(points[0]);

    for i in 0..points.len() - 1 {
        let p0 = if i == 0 { points[0] } else { points[i - 1] };
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = if i + 2 < points.len() { points[i + 2] } else { points[i + 1] };

        for s in 1..=samples_per_span {
            let t = s as f64 / samples_per_span as f64;
            out.push(catmull_rom_point(p0, p1, p2, p3, t));
        }
    }
    out
}

fn catmull_rom_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let blend = |a: f64, b: f64, c: f64, d: f64| -> f64 {
        0.5 * ((2.0 * b)
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Point::new(blend(p0.x, p1.x, p2.x, p3.x), blend(p0.y, p1.y, p2.y, p3.y))
}

/// Intermediate points for an axis-aligned elbow from `a` to `b`.
///
/// Horizontal-first when the horizontal displacement dominates, otherwise
/// vertical-first. Collinear endpoints need no elbow and return an empty vec.
#[must_use]
pub fn orthogonal_elbow(a: Point, b: Point) -> Vec<Point> {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    if dx < f64::EPSILON || dy < f64::EPSILON {
        return Vec::new();
    }
    if dx >= dy {
        vec![Point::new(b.x, a.y)]
    } else {
        vec![Point::new(a.x, b.y)]
    }
}

/// The three corners of a filled arrowhead whose tip sits at the end of the
/// segment `from`→`tip`.
///
/// Returns `None` when the final segment has zero length.
#[must_use]
pub fn arrowhead(from: Point, tip: Point, size: f64, half_angle: f64) -> Option<[Point; 3]> {
    from.direction_to(tip)?;
    let angle = (tip.y - from.y).atan2(tip.x - from.x);
    let left = Point::new(
        tip.x - size * (angle - half_angle).cos(),
        tip.y - size * (angle - half_angle).sin(),
    );
    let right = Point::new(
        tip.x - size * (angle + half_angle).cos(),
        tip.y - size * (angle + half_angle).sin(),
    );
    Some([tip, left, right])
}

/// Walk `path` in alternating dash/gap runs and return the dash segments.
#[must_use]
pub fn dash_segments(path: &[Point], dash: f64, gap: f64) -> Vec<(Point, Point)> {
    if path.len() < 2 || dash <= 0.0 || gap < 0.0 {
        return Vec::new();
    }
    let total = polyline_length(path);
    if total < f64::EPSILON {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut cursor = 0.0;
    let mut drawing = true;
    while cursor < total {
        let run = if drawing { dash } else { gap };
        let end = (cursor + run).min(total);
        if drawing {
            if let (Some(a), Some(b)) = (point_at_distance(path, cursor), point_at_distance(path, end)) {
                out.push((a, b));
            }
        }
        cursor = end;
        drawing = !drawing;
    }
    out
}

/// Index of the interior point of `path` with the smallest direction change
/// between its adjacent segments — the flattest spot for a label.
///
/// Falls back to the middle index when the path has no interior points.
#[must_use]
pub fn flattest_interior_index(path: &[Point]) -> usize {
    if path.len() < 3 {
        return path.len() / 2;
    }

    let mut best = 1;
    let mut best_turn = f64::INFINITY;
    for i in 1..path.len() - 1 {
        let Some(incoming) = path[i - 1].direction_to(path[i]) else {
            continue;
        };
        let Some(outgoing) = path[i].direction_to(path[i + 1]) else {
            continue;
        };
        let dot = (incoming.x * outgoing.x + incoming.y * outgoing.y).clamp(-1.0, 1.0);
        let turn = dot.acos();
        if turn < best_turn {
            best_turn = turn;
            best = i;
        }
    }
    best
}
