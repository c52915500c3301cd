use serde::{Deserialize, Serialize};

/// A point in the scene's 2D reference frame (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// East/west axis; positive is to the robot's initial right.
    pub x: f64,
    /// North/south axis; positive is the robot's initial forward.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Unit heading vector for an orientation. Orientation 0 points along +y
/// ("north/forward"); increasing orientation rotates clockwise.
#[must_use]
pub fn heading(orientation_degrees: f64) -> (f64, f64) {
    let rad = orientation_degrees.to_radians();
    (rad.sin(), rad.cos())
}

/// Absolute bearing from one point to another, in `[0, 360)` with the same
/// convention as robot orientation (0 = +y, clockwise positive).
#[must_use]
pub fn bearing(from: Point, to: Point) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    normalize_degrees(dx.atan2(dy).to_degrees())
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
#[must_use]
pub fn angular_offset(a: f64, b: f64) -> f64 {
    let diff = (normalize_degrees(a) - normalize_degrees(b)).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// What an observer at a pose sees of a single target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    /// Straight-line distance to the target.
    pub distance: f64,
    /// Bearing offset from the observer's forward axis, `[0, 180]`.
    pub offset_degrees: f64,
    /// Whether the target falls inside the viewing cone.
    pub visible: bool,
}

/// Evaluates a target against a forward viewing cone. Targets exactly on the
/// cone edge count as visible.
#[must_use]
pub fn sight(
    observer: Point,
    orientation_degrees: f64,
    target: Point,
    fov_degrees: f64,
    max_range: f64,
) -> Sighting {
    let distance = observer.distance_to(target);
    let offset_degrees = angular_offset(bearing(observer, target), orientation_degrees);
    let visible = distance <= max_range && offset_degrees <= fov_degrees / 2.0;
    Sighting {
        distance,
        offset_degrees,
        visible,
    }
}

/// First contact of a moving disc against a circle, expressed as the distance
/// travelled from `start` along the segment toward `end`. Returns `None` when
/// the swept path clears the circle by at least `radius`.
#[must_use]
pub fn first_contact(start: Point, end: Point, center: Point, radius: f64) -> Option<f64> {
    let length = start.distance_to(end);
    if length < 0.01 {
        return None;
    }
    let dir_x = (end.x - start.x) / length;
    let dir_y = (end.y - start.y) / length;

    let to_center_x = center.x - start.x;
    let to_center_y = center.y - start.y;
    let projection = to_center_x * dir_x + to_center_y * dir_y;

    let along = projection.clamp(0.0, length);
    let closest = Point::new(start.x + along * dir_x, start.y + along * dir_y);
    if closest.distance_to(center) >= radius {
        return None;
    }

    // Perpendicular distance from the center to the infinite line.
    let lateral_sq = to_center_x
        .mul_add(to_center_x, to_center_y * to_center_y)
        - projection * projection;
    let reach = (radius * radius - lateral_sq.max(0.0)).max(0.0).sqrt();
    Some((projection - reach).clamp(0.0, length))
}
