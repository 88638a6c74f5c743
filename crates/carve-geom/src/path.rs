//! Flattening of path outlines into 2D polylines. Point verbs pass through;
//! quadratic control points are sampled at the detail level, with implied
//! on-curve midpoints between consecutive controls.

use carve_lang::{PathData, PathVerb};
use glam::DVec2;

/// Flatten to a polyline. The returned points never repeat the closing
/// point; `path.closed` says whether the outline wraps.
pub fn flatten(path: &PathData, detail: u32) -> Vec<DVec2> {
    let mut items: Vec<(DVec2, bool)> = Vec::with_capacity(path.verbs.len());
    for verb in &path.verbs {
        match verb {
            PathVerb::Point(p) => items.push((DVec2::new(p[0], p[1]), false)),
            PathVerb::Curve(c) => items.push((DVec2::new(c[0], c[1]), true)),
        }
    }

    // consecutive control points get an implied on-curve midpoint
    let mut expanded: Vec<(DVec2, bool)> = Vec::with_capacity(items.len() * 2);
    for i in 0..items.len() {
        expanded.push(items[i]);
        let next = (i + 1) % items.len();
        let wraps = i + 1 == items.len();
        if items[i].1 && items[next].1 && (!wraps || path.closed) {
            expanded.push(((items[i].0 + items[next].0) * 0.5, false));
        }
    }

    // an outline must start on-curve; rotate (closed) or trim (open)
    if path.closed {
        if let Some(first_on) = expanded.iter().position(|(_, ctrl)| !ctrl) {
            expanded.rotate_left(first_on);
        }
    } else {
        while expanded.first().is_some_and(|(_, ctrl)| *ctrl) {
            expanded.remove(0);
        }
        while expanded.last().is_some_and(|(_, ctrl)| *ctrl) {
            expanded.pop();
        }
    }

    let on_count = expanded.iter().filter(|(_, ctrl)| !ctrl).count();
    if on_count == 0 {
        return Vec::new();
    }

    let segs = (detail / 4).max(2);
    let mut out: Vec<DVec2> = Vec::new();
    let mut pending_control: Option<DVec2> = None;
    for &(p, is_control) in &expanded {
        if is_control {
            pending_control = Some(p);
            continue;
        }
        match (out.last().copied(), pending_control.take()) {
            (Some(prev), Some(ctrl)) => sample_quadratic(&mut out, prev, ctrl, p, segs),
            _ => out.push(p),
        }
    }
    // a trailing control on a closed path curves back to the start
    if let (Some(ctrl), Some(&first), Some(&last)) =
        (pending_control, out.first(), out.last())
    {
        if path.closed {
            sample_quadratic(&mut out, last, ctrl, first, segs);
            out.pop(); // the closing point itself is implied
        }
    }

    dedupe(&mut out, path.closed);
    out
}

fn sample_quadratic(out: &mut Vec<DVec2>, a: DVec2, c: DVec2, b: DVec2, segs: u32) {
    for k in 1..=segs {
        let t = f64::from(k) / f64::from(segs);
        let u = 1.0 - t;
        out.push(a * (u * u) + c * (2.0 * u * t) + b * (t * t));
    }
}

fn dedupe(points: &mut Vec<DVec2>, closed: bool) {
    points.dedup_by(|a, b| (*a - *b).length_squared() < 1e-18);
    if closed && points.len() > 1 {
        let first = points[0];
        if let Some(&last) = points.last() {
            if (first - last).length_squared() < 1e-18 {
                points.pop();
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use carve_lang::PathData;

    fn pts(path: &PathData, detail: u32) -> Vec<[f64; 2]> {
        flatten(path, detail).iter().map(|p| [p.x, p.y]).collect()
    }

    #[test]
    fn plain_points_pass_through() {
        let path = PathData {
            verbs: vec![
                PathVerb::Point([0.0, 0.0]),
                PathVerb::Point([1.0, 0.0]),
                PathVerb::Point([1.0, 1.0]),
            ],
            closed: false,
        };
        assert_eq!(pts(&path, 16), vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    }

    #[test]
    fn quadratic_is_sampled() {
        let path = PathData {
            verbs: vec![
                PathVerb::Point([0.0, 0.0]),
                PathVerb::Curve([1.0, 2.0]),
                PathVerb::Point([2.0, 0.0]),
            ],
            closed: false,
        };
        let flat = flatten(&path, 16);
        assert!(flat.len() > 3);
        // curve midpoint of a quadratic is (a + 2c + b) / 4
        let mid = flat[flat.len() / 2];
        assert!((mid.y - 1.0).abs() < 0.05, "midpoint {mid:?}");
        // endpoints preserved
        assert_eq!(flat[0], DVec2::new(0.0, 0.0));
        assert_eq!(flat[flat.len() - 1], DVec2::new(2.0, 0.0));
    }

    #[test]
    fn consecutive_curves_get_implied_midpoint() {
        let path = PathData {
            verbs: vec![
                PathVerb::Point([0.0, 0.0]),
                PathVerb::Curve([1.0, 1.0]),
                PathVerb::Curve([2.0, -1.0]),
                PathVerb::Point([3.0, 0.0]),
            ],
            closed: false,
        };
        let flat = flatten(&path, 8);
        // the implied on-point (1.5, 0) must be on the polyline
        assert!(flat.iter().any(|p| (p.x - 1.5).abs() < 1e-9 && p.y.abs() < 1e-9));
    }

    #[test]
    fn open_path_drops_dangling_controls() {
        let path = PathData {
            verbs: vec![
                PathVerb::Curve([9.0, 9.0]),
                PathVerb::Point([0.0, 0.0]),
                PathVerb::Point([1.0, 0.0]),
                PathVerb::Curve([9.0, 9.0]),
            ],
            closed: false,
        };
        assert_eq!(pts(&path, 8), vec![[0.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn empty_path_flattens_to_nothing() {
        assert!(flatten(&PathData::default(), 8).is_empty());
    }
}
