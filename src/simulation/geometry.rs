//! Geometry helpers for the propagation model.
//!
//! Contains helper functions for:
//! - The submerged share of a straight segment (underwater propagation)
//! - Line-of-sight checks on the map plane against terrain obstacles
//! - Segment-segment intersection with collinear handling

use super::types::{CircleArea, MapPoint, Obstacle, Position3D, RectArea};

/// Length of the part of segment `a -> b` that lies below sea level (z < 0).
///
/// The segment is treated as a straight line in 3D, so when exactly one end is
/// submerged the waterline crossing splits the length proportionally to the
/// heights of the two ends.
pub fn submerged_segment_length(a: &Position3D, b: &Position3D) -> f32 {
    let total = a.distance_to(b);
    let (za, zb) = (a.height(), b.height());
    match (za < 0.0, zb < 0.0) {
        (false, false) => 0.0,
        (true, true) => total,
        _ => {
            let span = (za - zb).abs();
            if span == 0.0 {
                return 0.0;
            }
            let depth = if za < 0.0 { -za } else { -zb };
            total * (depth / span)
        }
    }
}

/// Check if the straight line between two points on the map crosses any obstacle.
///
/// If both points coincide, treats it as a point-inside-obstacle test.
pub fn is_intersect(point1: &MapPoint, point2: &MapPoint, obstacles: &[Obstacle]) -> bool {
    if point1 == point2 {
        return obstacles.iter().any(|obs| match obs {
            Obstacle::Rectangle { area } => point_in_rect(point1, area),
            Obstacle::Circle { area } => point_in_circle(point1, area),
        });
    }

    obstacles.iter().any(|obs| match obs {
        Obstacle::Rectangle { area } => segment_intersects_rect(point1, point2, area),
        Obstacle::Circle { area } => segment_intersects_circle(point1, point2, area),
    })
}

/// (left, right, top, bottom) of a rectangle regardless of corner order.
fn rect_bounds(rect: &RectArea) -> (f32, f32, f32, f32) {
    let left = rect.top_left.x.min(rect.bottom_right.x);
    let right = rect.top_left.x.max(rect.bottom_right.x);
    let top = rect.top_left.y.min(rect.bottom_right.y);
    let bottom = rect.top_left.y.max(rect.bottom_right.y);
    (left, right, top, bottom)
}

/// Inclusive point-in-rectangle test.
pub fn point_in_rect(p: &MapPoint, rect: &RectArea) -> bool {
    let (left, right, top, bottom) = rect_bounds(rect);
    p.x >= left && p.x <= right && p.y >= top && p.y <= bottom
}

pub fn point_in_circle(p: &MapPoint, circle: &CircleArea) -> bool {
    let dx = p.x - circle.center.x;
    let dy = p.y - circle.center.y;
    dx * dx + dy * dy <= circle.radius * circle.radius
}

fn segment_intersects_rect(p1: &MapPoint, p2: &MapPoint, rect: &RectArea) -> bool {
    if point_in_rect(p1, rect) || point_in_rect(p2, rect) {
        return true;
    }

    let (left, right, top, bottom) = rect_bounds(rect);
    let lt = MapPoint { x: left, y: top };
    let rt = MapPoint { x: right, y: top };
    let rb = MapPoint { x: right, y: bottom };
    let lb = MapPoint { x: left, y: bottom };

    segments_intersect(p1, p2, &lt, &rt) || segments_intersect(p1, p2, &rt, &rb) || segments_intersect(p1, p2, &rb, &lb) || segments_intersect(p1, p2, &lb, &lt)
}

/// Distance from the circle center to the closest point of the segment, compared to the radius.
fn segment_intersects_circle(p1: &MapPoint, p2: &MapPoint, circle: &CircleArea) -> bool {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return point_in_circle(p1, circle);
    }
    let t = ((circle.center.x - p1.x) * dx + (circle.center.y - p1.y) * dy) / len2;
    let t = t.clamp(0.0, 1.0);
    let closest = MapPoint {
        x: p1.x + t * dx,
        y: p1.y + t * dy,
    };
    point_in_circle(&closest, circle)
}

/// Orientation of ordered triplet (a,b,c): 1 clockwise, -1 counter-clockwise, 0 collinear.
fn orientation(a: &MapPoint, b: &MapPoint, c: &MapPoint) -> i32 {
    let val = (b.y - a.y) * (c.x - b.x) - (b.x - a.x) * (c.y - b.y);
    if val > 0.0 {
        1
    } else if val < 0.0 {
        -1
    } else {
        0
    }
}

/// True if b lies within the bounding box of a–c (callers ensure collinearity).
fn on_segment(a: &MapPoint, b: &MapPoint, c: &MapPoint) -> bool {
    b.x >= a.x.min(c.x) && b.x <= a.x.max(c.x) && b.y >= a.y.min(c.y) && b.y <= a.y.max(c.y)
}

/// Segment–segment intersection including touching endpoints and collinear overlap.
pub fn segments_intersect(p1: &MapPoint, q1: &MapPoint, p2: &MapPoint, q2: &MapPoint) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }
    (o1 == 0 && on_segment(p1, p2, q1)) || (o2 == 0 && on_segment(p1, q2, q1)) || (o3 == 0 && on_segment(p2, p1, q2)) || (o4 == 0 && on_segment(p2, q1, q2))
}
