//! Integer rasterization of the primitive outlines used by the tools.
//!
//! Each routine walks lattice points and hands them to a sink, so the same
//! geometry feeds tracked grid writes on release and preview writes during a
//! drag.

use crate::grid::PixelRect;

/// Hand `(x, y)` to the sink only when it lands inside `clip`.
#[inline]
fn emit<F: FnMut(i32, i32)>(clip: PixelRect, x: i64, y: i64, plot: &mut F) {
    if x >= clip.min_x as i64 && x <= clip.max_x as i64 && y >= clip.min_y as i64 && y <= clip.max_y as i64 {
        plot(x as i32, y as i32);
    }
}

/// `ceil(a / b)` for `b > 0`.
#[inline]
fn ceil_div(a: i128, b: i128) -> i128 {
    -(-a).div_euclid(b)
}

/// Bresenham segment from `(x0, y0)` to `(x1, y1)`, both endpoints included.
///
/// Only points inside `clip` are plotted, and the walk starts and stops where
/// the major axis crosses `clip`, so the work is bounded by the clip size
/// however far the endpoints lie off canvas.
pub fn line<F: FnMut(i32, i32)>(x0: i32, y0: i32, x1: i32, y1: i32, clip: PixelRect, mut plot: F) {
    let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    if dx >= dy {
        let range = (clip.min_x as i64, clip.max_x as i64);
        walk(x0, y0, dx, dy, sx, sy, range, |maj, min| emit(clip, maj, min, &mut plot));
    } else {
        let range = (clip.min_y as i64, clip.max_y as i64);
        walk(y0, x0, dy, dx, sy, sx, range, |maj, min| emit(clip, min, maj, &mut plot));
    }
}

/// Midpoint walk along the major axis. Step `k` sits at major offset `k` and
/// minor offset `ceil((2k·dmin - dmaj) / 2dmaj)`; the error term is seeded
/// from that closed form at the first step inside `range`.
#[allow(clippy::too_many_arguments)]
fn walk<F: FnMut(i64, i64)>(
    maj0: i64,
    min0: i64,
    dmaj: i64,
    dmin: i64,
    smaj: i64,
    smin: i64,
    range: (i64, i64),
    mut emit: F,
) {
    let (k_lo, k_hi) = if smaj > 0 {
        (range.0 - maj0, range.1 - maj0)
    } else {
        (maj0 - range.1, maj0 - range.0)
    };
    let first = k_lo.max(0);
    let last = k_hi.min(dmaj);
    if first > last {
        return;
    }
    if dmaj == 0 {
        emit(maj0, min0);
        return;
    }

    let (maj_d, min_d, k) = (dmaj as i128, dmin as i128, first as i128);
    let m = ceil_div(2 * k * min_d - maj_d, 2 * maj_d);
    // Bounded to (2·dmin - 2·dmaj, 2·dmin], so it fits back into i64.
    let mut err = (2 * min_d * (k + 1) - maj_d - 2 * maj_d * m) as i64;
    let mut m = m as i64;

    for k in first..=last {
        emit(maj0 + smaj * k, min0 + smin * m);
        if err > 0 {
            m += 1;
            err -= 2 * dmaj;
        }
        err += 2 * dmin;
    }
}

/// Border of the box spanned by two corners (in any order), limited to `clip`.
pub fn rect_outline<F: FnMut(i32, i32)>(x0: i32, y0: i32, x1: i32, y1: i32, clip: PixelRect, mut plot: F) {
    let (left, right) = (x0.min(x1) as i64, x0.max(x1) as i64);
    let (top, bottom) = (y0.min(y1) as i64, y0.max(y1) as i64);

    for x in left.max(clip.min_x as i64)..=right.min(clip.max_x as i64) {
        emit(clip, x, top, &mut plot);
        emit(clip, x, bottom, &mut plot);
    }
    for y in top.max(clip.min_y as i64)..=bottom.min(clip.max_y as i64) {
        emit(clip, left, y, &mut plot);
        emit(clip, right, y, &mut plot);
    }
}

/// Ellipse inscribed in the box spanned by two corners, sampled once per degree.
pub fn ellipse_outline<F: FnMut(i32, i32)>(x0: i32, y0: i32, x1: i32, y1: i32, clip: PixelRect, mut plot: F) {
    let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
    let cx = (x0 + x1) / 2;
    let cy = (y0 + y1) / 2;
    let rx = (x1 - x0).abs() / 2;
    let ry = (y1 - y0).abs() / 2;

    if rx == 0 && ry == 0 {
        emit(clip, cx, cy, &mut plot);
        return;
    }

    for deg in 0..360 {
        let theta = (deg as f64).to_radians();
        let x = cx + (rx as f64 * theta.cos()) as i64;
        let y = cy + (ry as f64 * theta.sin()) as i64;
        emit(clip, x, y, &mut plot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: PixelRect = PixelRect { min_x: 0, min_y: 0, max_x: 63, max_y: 63 };

    fn collect<F: Fn(&mut dyn FnMut(i32, i32))>(f: F) -> Vec<(i32, i32)> {
        let mut pts = Vec::new();
        f(&mut |x, y| pts.push((x, y)));
        pts
    }

    #[test]
    fn horizontal_line_hits_every_cell() {
        let pts = collect(|p| line(0, 0, 5, 0, CANVAS, p));
        assert_eq!(pts, (0..=5).map(|x| (x, 0)).collect::<Vec<_>>());
    }

    #[test]
    fn diagonal_and_reverse_lines() {
        let pts = collect(|p| line(3, 3, 0, 0, CANVAS, p));
        assert_eq!(pts, vec![(3, 3), (2, 2), (1, 1), (0, 0)]);

        let pts = collect(|p| line(0, 0, 4, 2, CANVAS, p));
        assert_eq!(pts.first(), Some(&(0, 0)));
        assert_eq!(pts.last(), Some(&(4, 2)));
        assert_eq!(pts.len(), 5);
    }

    #[test]
    fn single_point_line() {
        assert_eq!(collect(|p| line(2, 7, 2, 7, CANVAS, p)), vec![(2, 7)]);
    }

    #[test]
    fn rectangle_outline_skips_interior() {
        let mut pts = collect(|p| rect_outline(3, 3, 0, 0, CANVAS, p));
        pts.sort();
        pts.dedup();
        assert_eq!(pts.len(), 12);
        assert!(!pts.contains(&(1, 1)));
        assert!(pts.contains(&(3, 0)));
    }

    #[test]
    fn degenerate_ellipse_is_one_point() {
        assert_eq!(collect(|p| ellipse_outline(4, 4, 5, 5, CANVAS, p)), vec![(4, 4)]);
    }

    #[test]
    fn ellipse_touches_its_extremes() {
        let pts = collect(|p| ellipse_outline(0, 0, 10, 6, CANVAS, p));
        assert_eq!(pts.len(), 360);
        assert!(pts.contains(&(10, 3)));
        assert!(pts.contains(&(5, 6)));
        assert!(pts.contains(&(0, 3)));
        assert!(pts.iter().all(|&(x, y)| (0..=10).contains(&x) && (0..=6).contains(&y)));
    }

    #[test]
    fn far_endpoints_are_clipped_to_the_canvas() {
        let pts = collect(|p| line(0, 0, (1 << 30) + 10, 0, CANVAS, p));
        assert_eq!(pts, (0..=63).map(|x| (x, 0)).collect::<Vec<_>>());

        let pts = collect(|p| line(i32::MIN, i32::MIN, i32::MAX, i32::MAX, CANVAS, p));
        assert_eq!(pts.len(), 64);
        assert!(pts.iter().all(|&(x, y)| x == y));

        assert!(collect(|p| line(-5_000_000, 70, 5_000_000, 90, CANVAS, p)).is_empty());
    }

    #[test]
    fn clipped_walk_matches_the_full_walk() {
        let window = PixelRect::new(40, 7, 103, 70);
        let whole = PixelRect::new(0, 0, 200, 200);
        for (x0, y0, x1, y1) in [(0, 0, 140, 57), (140, 57, 0, 0), (3, 150, 60, 0)] {
            let full = collect(|p| line(x0, y0, x1, y1, whole, p));
            let clipped = collect(|p| line(x0, y0, x1, y1, window, p));
            let expected: Vec<_> = full
                .into_iter()
                .filter(|&(x, y)| window.contains(x as u32, y as u32))
                .collect();
            assert_eq!(clipped, expected);
        }
    }

    #[test]
    fn huge_shapes_stay_bounded() {
        let pts = collect(|p| rect_outline(-1_000_000_000, 2, i32::MAX, 5, CANVAS, p));
        assert_eq!(pts.len(), 64 * 2);
        assert!(collect(|p| ellipse_outline(i32::MAX - 1, 0, i32::MAX, 3, CANVAS, p)).is_empty());
        assert!(collect(|p| ellipse_outline(i32::MIN, i32::MIN, i32::MAX, i32::MAX, CANVAS, p)).len() <= 360);
    }
}
