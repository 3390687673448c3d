//! Hand silhouette analysis over the raw depth image.
//!
//! Given an approximate hand position, cut a square window out of the
//! depth frame, refine the hand center inside it, build a binary
//! silhouette of everything at roughly the hand's depth, and describe
//! the silhouette's concavities as convexity defects.  Finger gaps show
//! up as deep, narrow defects.
//!
//! All results are owned values; an unusable window or an empty
//! silhouette yields an empty defect list.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::filter::median_filter;
use imageproc::geometry::convex_hull;
use tracing::trace;

use crate::geometry::{interior_angle, point_distance, Point};
use crate::skeleton::DepthFrame;

// ── Configuration ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct HandShapeConfig {
    /// Nearest valid depth sample (exclusive, millimeters).
    pub near_mm: u16,
    /// Farthest valid depth sample (exclusive, millimeters).
    pub far_mm: u16,
    /// Window side length at the reference distance, in pixels.
    pub reference_box: f32,
    /// Largest window side accepted, in pixels; bigger windows are skipped.
    pub max_box: u32,
    /// Samples farther than this from the hand depth are background.
    pub depth_tolerance_mm: i32,
    /// Median filter radius (3 gives a 7x7 kernel).
    pub median_radius: u32,
    /// Defects opening wider than this are not finger gaps.
    pub max_defect_angle_deg: f32,
}

impl Default for HandShapeConfig {
    fn default() -> Self {
        Self {
            near_mm: 500,
            far_mm: 1500,
            reference_box: 150.0,
            max_box: 400,
            depth_tolerance_mm: 150,
            median_radius: 3,
            max_defect_angle_deg: 90.0,
        }
    }
}

impl HandShapeConfig {
    fn in_band(&self, value: u16) -> bool {
        value > self.near_mm && value < self.far_mm
    }

    fn near_hand(&self, value: u16, hand_z: i32) -> bool {
        self.in_band(value) && (value as i32 - hand_z).abs() < self.depth_tolerance_mm
    }
}

// ── Defects ────────────────────────────────────────────────

/// One concavity of the silhouette relative to its convex hull.
/// Coordinates are relative to the analysis window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defect {
    /// Hull vertex where the concavity begins.
    pub start: Point,
    /// Hull vertex where it ends.
    pub end: Point,
    /// Contour point farthest from the hull edge.
    pub depth_point: Point,
    /// Distance from `depth_point` to the hull edge, in pixels.
    pub depth: f32,
}

// ── Window ─────────────────────────────────────────────────

/// Side length of the analysis window for a hand `z` millimeters away,
/// a multiple of 4.  Zero means the hand is too far (or `z` is invalid).
pub fn window_size(z: i32, config: &HandShapeConfig) -> u32 {
    if z <= 0 {
        return 0;
    }
    let band = f32::from(config.far_mm) - f32::from(config.near_mm);
    let scale = band / (z as f32 * 0.8);
    let size = (config.reference_box * scale).round().max(0.0) as u32;
    size - size % 4
}

/// Pixel ranges `[x0, x1) x [y0, y1)` of a window centered on (cx, cy),
/// clamped to the frame.
fn clamp_window(cx: i64, cy: i64, half: i64, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let clamp = |v: i64, max: u32| v.clamp(0, i64::from(max)) as u32;
    (
        clamp(cx - half, width),
        clamp(cx + half, width),
        clamp(cy - half, height),
        clamp(cy + half, height),
    )
}

/// Hand center refined from the depth image, with the hand depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandCenter {
    x: i64,
    y: i64,
    z: i32,
}

fn refine_center(
    depth: &DepthFrame<'_>,
    start: HandCenter,
    size: u32,
    config: &HandShapeConfig,
) -> HandCenter {
    let half = i64::from(size / 2);
    let (width, height) = (depth.width(), depth.height());

    // Pass 1: nearest in-band sample closer than the current estimate.
    let mut nearest = start;
    let (x0, x1, y0, y1) = clamp_window(start.x, start.y, half, width, height);
    for x in (x0..x1).step_by(2) {
        for y in (y0..y1).step_by(2) {
            let Some(value) = depth.get(x, y) else {
                continue;
            };
            if config.in_band(value) && i32::from(value) < nearest.z {
                nearest = HandCenter {
                    x: i64::from(x),
                    y: i64::from(y),
                    z: i32::from(value),
                };
            }
        }
    }

    // Pass 2: centroid of the samples at about that depth.
    let (x0, x1, y0, y1) = clamp_window(nearest.x, nearest.y, half, width, height);
    let (mut sum_x, mut sum_y, mut count) = (0i64, 0i64, 0i64);
    for x in (x0..x1).step_by(2) {
        for y in (y0..y1).step_by(2) {
            if depth
                .get(x, y)
                .is_some_and(|value| config.near_hand(value, nearest.z))
            {
                sum_x += i64::from(x);
                sum_y += i64::from(y);
                count += 1;
            }
        }
    }

    if count == 0 {
        return nearest;
    }
    HandCenter {
        x: sum_x / count,
        y: sum_y / count,
        z: nearest.z,
    }
}

/// Binary hand silhouette (255 = hand) for the window around a hand at
/// screen position (x, y), `z` millimeters away.  `None` when the window
/// size degenerates.
pub fn segment_hand(
    depth: &DepthFrame<'_>,
    x: i32,
    y: i32,
    z: i32,
    config: &HandShapeConfig,
) -> Option<GrayImage> {
    let size = window_size(z, config);
    if size == 0 || size > depth.width() || size > config.max_box {
        trace!(z, size, "hand shape: window out of range");
        return None;
    }

    let start = HandCenter {
        x: i64::from(x),
        y: i64::from(y),
        z,
    };
    let center = refine_center(depth, start, size, config);

    let half = i64::from(size / 2);
    let left = (center.x - half).max(0);
    let top = (center.y - half).max(0);

    Some(GrayImage::from_fn(size, size, |i, j| {
        let sample = u32::try_from(left + i64::from(i))
            .ok()
            .zip(u32::try_from(top + i64::from(j)).ok())
            .and_then(|(px, py)| depth.get(px, py));
        match sample {
            Some(value) if config.near_hand(value, center.z) => Luma([255]),
            _ => Luma([0]),
        }
    }))
}

// ── Hull and defects ───────────────────────────────────────

fn cross(o: Point, a: Point, b: Point) -> i64 {
    i64::from(a.x - o.x) * i64::from(b.y - o.y) - i64::from(a.y - o.y) * i64::from(b.x - o.x)
}

/// Indices into `points` of its convex hull vertices, in ascending
/// index order.  A repeated point maps to its first occurrence.
pub fn hull_indices(points: &[Point]) -> Vec<usize> {
    let mut first_seen: HashMap<(i32, i32), usize> = HashMap::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        first_seen.entry((p.x, p.y)).or_insert(i);
    }
    if first_seen.len() < 3 {
        let mut distinct: Vec<usize> = first_seen.into_values().collect();
        distinct.sort_unstable();
        return distinct;
    }

    let mut hull: Vec<usize> = convex_hull(points)
        .iter()
        .filter_map(|p| first_seen.get(&(p.x, p.y)).copied())
        .collect();
    hull.sort_unstable();
    hull.dedup();
    hull
}

fn distance_to_edge(p: Point, a: Point, b: Point) -> f32 {
    let length = point_distance(a, b);
    if length == 0.0 {
        return point_distance(a, p);
    }
    cross(a, b, p).unsigned_abs() as f32 / length
}

/// Convexity defects of a closed contour given its hull indices in
/// ascending order.  Hull edges with no contour point off the edge
/// produce nothing.
pub fn contour_defects(points: &[Point], hull: &[usize]) -> Vec<Defect> {
    let n = points.len();
    if hull.len() < 3 {
        return Vec::new();
    }

    let mut defects = Vec::new();
    for (k, &s) in hull.iter().enumerate() {
        let e = hull[(k + 1) % hull.len()];
        let (start, end) = (points[s], points[e]);

        let mut deepest: Option<(Point, f32)> = None;
        let mut i = (s + 1) % n;
        while i != e {
            let d = distance_to_edge(points[i], start, end);
            if deepest.map_or(true, |(_, best)| d > best) {
                deepest = Some((points[i], d));
            }
            i = (i + 1) % n;
        }

        if let Some((depth_point, depth)) = deepest {
            if depth > 0.0 {
                defects.push(Defect {
                    start,
                    end,
                    depth_point,
                    depth,
                });
            }
        }
    }
    defects
}

fn polygon_area(points: &[Point]) -> i64 {
    let n = points.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    twice.abs()
}

/// Outline of the largest blob in a binary silhouette.
fn largest_outline(silhouette: &GrayImage, config: &HandShapeConfig) -> Option<Vec<Point>> {
    let smoothed = median_filter(silhouette, config.median_radius, config.median_radius);
    let level = otsu_level(&smoothed);
    let binary = GrayImage::from_fn(smoothed.width(), smoothed.height(), |x, y| {
        if smoothed.get_pixel(x, y).0[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    find_contours::<i32>(&binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .max_by_key(|c| polygon_area(&c.points))
        .map(|c| c.points)
}

// ── Analyzer ───────────────────────────────────────────────

/// Every convexity defect of the hand silhouette, unfiltered.
pub fn convexity_defects(
    depth: &DepthFrame<'_>,
    x: i32,
    y: i32,
    z: i32,
    config: &HandShapeConfig,
) -> Vec<Defect> {
    let Some(silhouette) = segment_hand(depth, x, y, z, config) else {
        return Vec::new();
    };
    let Some(outline) = largest_outline(&silhouette, config) else {
        trace!("hand shape: no contour");
        return Vec::new();
    };
    let hull = hull_indices(&outline);
    contour_defects(&outline, &hull)
}

/// Finger-gap defects: convexity defects whose opening at the deepest
/// point is no wider than `max_defect_angle_deg`.  Defects whose angle
/// cannot be measured are dropped.
pub fn analyze(
    depth: &DepthFrame<'_>,
    x: i32,
    y: i32,
    z: i32,
    config: &HandShapeConfig,
) -> Vec<Defect> {
    let max_angle = config.max_defect_angle_deg.to_radians();
    let defects: Vec<Defect> = convexity_defects(depth, x, y, z, config)
        .into_iter()
        .filter(|d| {
            interior_angle(d.start, d.depth_point, d.end).is_some_and(|angle| angle <= max_angle)
        })
        .collect();
    trace!(count = defects.len(), "hand shape: defects");
    defects
}

#[cfg(test)]
pub(crate) fn blank_depth(width: u32, height: u32) -> Vec<u16> {
    vec![0; (width * height) as usize]
}

#[cfg(test)]
pub(crate) fn fill_rect(data: &mut [u16], width: u32, x0: u32, y0: u32, x1: u32, y1: u32, value: u16) {
    for y in y0..y1 {
        for x in x0..x1 {
            data[(y * width + x) as usize] = value;
        }
    }
}

/// 640x480 frame with a horns hand at 990mm around (320, 240): a palm
/// with two 15px fingers raised, 30px apart.
#[cfg(test)]
pub(crate) fn horns_depth() -> Vec<u16> {
    let mut data = blank_depth(640, 480);
    fill_rect(&mut data, 640, 290, 240, 350, 290, 990);
    fill_rect(&mut data, 640, 290, 190, 305, 240, 990);
    fill_rect(&mut data, 640, 335, 190, 350, 240, 990);
    data
}

/// 640x480 frame with two fingers held sideways at 990mm around
/// (320, 240).  A longer middle finger splits the two gaps on the hull,
/// and the upper finger is shorter than the lower one.
#[cfg(test)]
pub(crate) fn sideways_fingers_depth() -> Vec<u16> {
    let mut data = blank_depth(640, 480);
    fill_rect(&mut data, 640, 280, 200, 310, 276, 990);
    fill_rect(&mut data, 640, 310, 200, 340, 215, 990);
    fill_rect(&mut data, 640, 310, 230, 375, 245, 990);
    fill_rect(&mut data, 640, 310, 261, 360, 276, 990);
    data
}

/// 640x480 frame with joined palms at 790mm around (320, 240): three
/// arms slanting up and to the right from a common base, the middle one
/// longest, leaving two deep diagonal slots side by side.
#[cfg(test)]
pub(crate) fn joined_palms_depth() -> Vec<u16> {
    let mut data = blank_depth(640, 480);
    for y in 0..480i32 {
        for x in 0..640i32 {
            // `a` runs up and to the right, `b` down and to the right.
            let (dx, dy) = (x - 260, y - 247);
            let (a, b) = (dx - dy, dx + dy);
            let base = (0..40).contains(&a) && (0..112).contains(&b);
            let outer_arm = (40..140).contains(&a) && ((0..24).contains(&b) || (88..112).contains(&b));
            let middle_arm = (40..160).contains(&a) && (44..68).contains(&b);
            if base || outer_arm || middle_arm {
                data[(y * 640 + x) as usize] = 790;
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_window_size_scales_with_distance() {
        let config = HandShapeConfig::default();
        assert_eq!(window_size(1000, &config), 188);
        assert_eq!(window_size(800, &config), 232);
        assert_eq!(window_size(1000, &config) % 4, 0);
    }

    #[test]
    fn test_window_size_degenerate() {
        let config = HandShapeConfig::default();
        assert_eq!(window_size(60_000, &config), 0);
        assert_eq!(window_size(0, &config), 0);
        assert_eq!(window_size(-500, &config), 0);
    }

    #[test]
    fn test_zero_window_yields_no_defects() {
        let config = HandShapeConfig::default();
        let data = blank_depth(640, 480);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();
        assert!(analyze(&depth, 320, 240, 60_000, &config).is_empty());
        assert!(analyze(&depth, 320, 240, 0, &config).is_empty());
    }

    #[test]
    fn test_window_wider_than_frame() {
        let config = HandShapeConfig::default();
        let data = blank_depth(100, 100);
        let depth = DepthFrame::new(&data, 100, 100).unwrap();
        assert!(segment_hand(&depth, 50, 50, 1000, &config).is_none());
    }

    #[test]
    fn test_empty_depth_yields_no_defects() {
        let config = HandShapeConfig::default();
        let data = blank_depth(640, 480);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();
        assert!(analyze(&depth, 320, 240, 1000, &config).is_empty());
    }

    #[test]
    fn test_hand_near_corner_does_not_underflow() {
        let config = HandShapeConfig::default();
        let mut data = blank_depth(640, 480);
        fill_rect(&mut data, 640, 0, 0, 40, 40, 990);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();
        let silhouette = segment_hand(&depth, 5, 5, 1000, &config).unwrap();
        assert_eq!(silhouette.width(), 188);
        assert_eq!(silhouette.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_silhouette_ignores_background() {
        let config = HandShapeConfig::default();
        let mut data = blank_depth(640, 480);
        // Wall behind the hand, outside the depth tolerance.
        fill_rect(&mut data, 640, 0, 0, 640, 480, 1400);
        fill_rect(&mut data, 640, 300, 220, 340, 260, 1000);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();
        let silhouette = segment_hand(&depth, 320, 240, 1100, &config).unwrap();

        let on = silhouette.pixels().filter(|px| px.0[0] == 255).count();
        assert_eq!(on, 40 * 40);
    }

    #[test]
    fn test_u_shape_has_deep_defect() {
        let config = HandShapeConfig::default();
        let mut data = blank_depth(640, 480);
        // Two 15px fingers joined at the bottom, 30px gap between them.
        fill_rect(&mut data, 640, 290, 210, 305, 270, 990);
        fill_rect(&mut data, 640, 335, 210, 350, 270, 990);
        fill_rect(&mut data, 640, 290, 255, 350, 270, 990);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let defects = analyze(&depth, 320, 240, 1000, &config);
        let deep: Vec<&Defect> = defects.iter().filter(|d| d.depth > 30.0).collect();
        assert_eq!(deep.len(), 1, "defects: {:?}", defects);
        let gap = deep[0];
        assert!(gap.depth_point.y > gap.start.y);
        assert!(gap.depth_point.y > gap.end.y);
    }

    #[test]
    fn test_horns_keep_one_finger_gap() {
        let config = HandShapeConfig::default();
        let data = horns_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let kept = analyze(&depth, 320, 240, 1000, &config);
        assert_eq!(kept.len(), 1, "defects: {:?}", kept);
        assert!(kept[0].depth > 40.0);
    }

    #[test]
    fn test_sideways_fingers_keep_two_gaps() {
        let config = HandShapeConfig::default();
        let data = sideways_fingers_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let kept = analyze(&depth, 320, 240, 1000, &config);
        assert_eq!(kept.len(), 2, "defects: {:?}", kept);
        assert!(kept.iter().all(|d| d.depth > 25.0));
    }

    #[test]
    fn test_window_above_max_box_is_skipped() {
        let config = HandShapeConfig::default();
        // 150mm away the window would be 1248px across.
        assert_eq!(window_size(150, &config), 1248);
        let data = blank_depth(1300, 4);
        let depth = DepthFrame::new(&data, 1300, 4).unwrap();
        assert!(segment_hand(&depth, 650, 2, 150, &config).is_none());
        assert!(analyze(&depth, 650, 2, 150, &config).is_empty());
    }

    #[test]
    fn test_solid_block_has_no_deep_defect() {
        let config = HandShapeConfig::default();
        let mut data = blank_depth(640, 480);
        fill_rect(&mut data, 640, 280, 200, 360, 280, 990);
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let defects = convexity_defects(&depth, 320, 240, 1000, &config);
        assert!(defects.iter().all(|d| d.depth < 5.0), "defects: {:?}", defects);
    }

    #[test]
    fn test_hull_of_square_with_notch() {
        // Square outline with a notch cut into the top edge.
        let points = vec![
            p(0, 0),
            p(4, 0),
            p(5, 3),
            p(6, 0),
            p(10, 0),
            p(10, 10),
            p(0, 10),
        ];
        let hull = hull_indices(&points);
        assert_eq!(hull, vec![0, 4, 5, 6]);

        let defects = contour_defects(&points, &hull);
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].depth_point, p(5, 3));
        assert_eq!(defects[0].start, p(0, 0));
        assert_eq!(defects[0].end, p(10, 0));
        assert!((defects[0].depth - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_hull_repeated_point_maps_to_first_occurrence() {
        let points = vec![p(0, 0), p(10, 0), p(10, 10), p(0, 10), p(0, 0)];
        assert_eq!(hull_indices(&points), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_hull_degenerate_inputs() {
        assert!(hull_indices(&[]).is_empty());
        assert_eq!(hull_indices(&[p(1, 1), p(1, 1)]).len(), 1);
        assert!(contour_defects(&[p(0, 0), p(1, 1)], &[0, 1]).is_empty());
    }

    #[test]
    fn test_polygon_area() {
        let square = [p(0, 0), p(10, 0), p(10, 10), p(0, 10)];
        assert_eq!(polygon_area(&square), 200);
    }
}
