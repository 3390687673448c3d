//! Distance and angle helpers shared by the classifiers.
//!
//! Angles between rays are measured with per-ray `atan(dy / dx)`, which
//! divides by the horizontal delta.  Every such helper returns `None`
//! when a delta is zero; callers treat that as a non-qualifying frame.

use std::f32::consts::PI;

use crate::skeleton::Joint;

/// Integer pixel coordinate in a hand silhouette window.
pub type Point = imageproc::point::Point<i32>;

/// Euclidean distance between two joints (millimeters).
pub fn joint_distance(a: &Joint, b: &Joint) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    let dz = (a.z - b.z) as f32;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Distance between two joints ignoring depth.
pub fn planar_distance(a: &Joint, b: &Joint) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Euclidean distance between two pixel coordinates.
pub fn point_distance(a: Point, b: Point) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Continuous angle of the ray `vertex -> p`, in `(-3π/2, π/2)`.
fn ray_angle(vertex: Point, p: Point) -> Option<f32> {
    let dx = (p.x - vertex.x) as f32;
    if dx == 0.0 {
        return None;
    }
    let angle = ((p.y - vertex.y) as f32 / dx).atan();
    Some(if dx < 0.0 { angle - PI } else { angle })
}

/// Interior angle (radians, `[0, π]`) at `vertex` between the rays to
/// `p1` and `p3`.
pub fn interior_angle(p1: Point, vertex: Point, p3: Point) -> Option<f32> {
    let a1 = ray_angle(vertex, p1)?;
    let a2 = ray_angle(vertex, p3)?;
    let diff = (a1 - a2).abs();
    Some(if diff > PI { 2.0 * PI - diff } else { diff })
}

/// Ray angle with the image y axis flipped, normalized to `[0, 2π)`.
fn upright_ray_angle(vertex: Point, p: Point) -> Option<f32> {
    let dx = (p.x - vertex.x) as f32;
    if dx == 0.0 {
        return None;
    }
    let mut angle = (-((p.y - vertex.y) as f32) / dx).atan();
    if dx < 0.0 {
        angle += PI;
    }
    if angle < 0.0 {
        angle += 2.0 * PI;
    }
    Some(angle)
}

/// Direction (radians, counter-clockwise from +x with y pointing up) of
/// the bisector of the opening at `vertex` between `p1` and `p3`.
///
/// The result can exceed `2π` when the opening straddles the +x axis;
/// [`whole_degrees`] folds it back.
pub fn orientation_angle(p1: Point, vertex: Point, p3: Point) -> Option<f32> {
    let mut a1 = upright_ray_angle(vertex, p1)?;
    let mut a2 = upright_ray_angle(vertex, p3)?;
    let mut spread = (a1 - a2).abs();

    if spread > PI {
        spread = 2.0 * PI - spread;
        if a1 < a2 {
            a1 += 2.0 * PI;
        } else if a2 < a1 {
            a2 += 2.0 * PI;
        }
    }

    Some(a1.min(a2) + spread / 2.0)
}

/// Absolute inclination (radians, `[0, π/2]`) of the segment `a - b`.
pub fn slope_angle(a: Point, b: Point) -> Option<f32> {
    let dx = (a.x - b.x) as f32;
    if dx == 0.0 {
        return None;
    }
    Some(((a.y - b.y) as f32 / dx).atan().abs())
}

/// Radians to whole degrees, truncated and taken modulo 360.
pub fn whole_degrees(radians: f32) -> i32 {
    ((radians / PI * 180.0) as i32) % 360
}
