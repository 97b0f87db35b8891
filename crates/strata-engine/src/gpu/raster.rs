//! Pixel-centre rasterization shared by the backends.
//!
//! A pixel `(x, y)` is covered when its centre `(x + 0.5, y + 0.5)` lies
//! inside the triangle. Centres exactly on an edge are owned by one side only
//! (decided by edge direction), so two triangles sharing an edge never cover
//! the same pixel twice and never leave a gap between them.

use crate::coords::{Extent, Vec2};

/// Signed doubled area of `(a, b, p)` in pixel space (+Y down).
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Tie-break for centres lying exactly on the edge `a -> b`.
///
/// Exactly one of `a -> b` and `b -> a` owns the edge.
#[inline]
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x > 0.0)
}

#[inline]
fn inside(w: f32, owned: bool) -> bool {
    w > 0.0 || (w == 0.0 && owned)
}

/// Calls `plot(x, y)` for every pixel of `extent` covered by the triangle.
///
/// Vertices are in pixel space. Degenerate and non-finite triangles cover
/// nothing.
pub fn fill_triangle(extent: Extent, tri: [Vec2; 3], mut plot: impl FnMut(u32, u32)) {
    let [v0, mut v1, mut v2] = tri;
    if !(v0.is_finite() && v1.is_finite() && v2.is_finite()) || extent.is_empty() {
        return;
    }

    let area = edge(v0, v1, v2);
    if area == 0.0 {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
    }

    let own0 = owns_edge(v1, v2);
    let own1 = owns_edge(v2, v0);
    let own2 = owns_edge(v0, v1);

    let lo = v0.min(v1).min(v2);
    let hi = v0.max(v1).max(v2);
    let x0 = (lo.x.floor().max(0.0)) as u32;
    let y0 = (lo.y.floor().max(0.0)) as u32;
    let x1 = (hi.x.ceil().min(extent.width as f32)).max(0.0) as u32;
    let y1 = (hi.y.ceil().min(extent.height as f32)).max(0.0) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if inside(edge(v1, v2, p), own0)
                && inside(edge(v2, v0, p), own1)
                && inside(edge(v0, v1, p), own2)
            {
                plot(x, y);
            }
        }
    }
}

/// Quad outline of one thick segment, corners in winding order.
///
/// The segment is extended by half the width at both ends so consecutive
/// segments of a loop meet without notches at the corners.
pub fn segment_quad(a: Vec2, b: Vec2, width: f32) -> Option<[Vec2; 4]> {
    let d = b - a;
    let len = d.length();
    if !(len > 0.0) || !(width > 0.0) {
        return None;
    }
    let h = width * 0.5;
    let dir = d * (1.0 / len);
    let n = dir.perp() * h;
    let a = a - dir * h;
    let b = b + dir * h;
    Some([a + n, b + n, b - n, a - n])
}

/// Segment quads of the closed loop through `points`.
pub fn line_loop_quads(points: &[Vec2], width: f32) -> Vec<[Vec2; 4]> {
    if points.len() < 2 {
        return Vec::new();
    }
    let n = points.len();
    // A two-point loop is a single segment traced twice.
    let segments = if n == 2 { 1 } else { n };
    (0..segments)
        .filter_map(|i| segment_quad(points[i], points[(i + 1) % n], width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(extent: Extent, tri: [Vec2; 3]) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        fill_triangle(extent, tri, |x, y| out.push((x, y)));
        out
    }

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    // ── triangles ─────────────────────────────────────────────────────────

    #[test]
    fn covers_pixel_centres_only() {
        let px = covered(Extent::new(4, 4), [v(0.0, 0.0), v(4.0, 0.0), v(0.0, 4.0)]);
        assert!(px.contains(&(0, 0)));
        assert!(px.contains(&(2, 0)));
        assert!(!px.contains(&(3, 3)));
    }

    #[test]
    fn winding_does_not_matter() {
        let e = Extent::new(8, 8);
        let mut a = covered(e, [v(1.0, 1.0), v(7.0, 2.0), v(3.0, 7.0)]);
        let mut b = covered(e, [v(1.0, 1.0), v(3.0, 7.0), v(7.0, 2.0)]);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_edge_is_covered_exactly_once() {
        // Two triangles of a 4x4 square whose diagonal passes through centres.
        let e = Extent::new(4, 4);
        let first = covered(e, [v(0.0, 0.0), v(4.0, 0.0), v(4.0, 4.0)]);
        let second = covered(e, [v(0.0, 0.0), v(4.0, 4.0), v(0.0, 4.0)]);

        assert_eq!(first.len() + second.len(), 16);
        assert!(first.iter().all(|p| !second.contains(p)));
    }

    #[test]
    fn clipped_to_extent() {
        let px = covered(Extent::new(2, 2), [v(-10.0, -10.0), v(10.0, -10.0), v(0.0, 10.0)]);
        assert!(px.iter().all(|&(x, y)| x < 2 && y < 2));
        assert_eq!(px.len(), 4);
    }

    #[test]
    fn degenerate_covers_nothing() {
        assert!(covered(Extent::new(4, 4), [v(0.0, 0.0), v(2.0, 2.0), v(4.0, 4.0)]).is_empty());
        assert!(covered(Extent::new(4, 4), [v(f32::NAN, 0.0), v(2.0, 2.0), v(4.0, 0.0)]).is_empty());
    }

    // ── strokes ───────────────────────────────────────────────────────────

    #[test]
    fn segment_quad_has_width_and_caps() {
        let q = segment_quad(v(10.0, 10.0), v(20.0, 10.0), 4.0).unwrap();
        let r = crate::coords::Rect::from_points(q).unwrap();
        assert_eq!(r, crate::coords::Rect::new(8.0, 8.0, 22.0, 12.0));
    }

    #[test]
    fn zero_length_segment_is_skipped() {
        assert!(segment_quad(v(1.0, 1.0), v(1.0, 1.0), 2.0).is_none());
        assert!(segment_quad(v(1.0, 1.0), v(3.0, 1.0), 0.0).is_none());
    }

    #[test]
    fn loop_closes_back_to_first_point() {
        let quads = line_loop_quads(&[v(0.0, 0.0), v(10.0, 0.0), v(0.0, 10.0)], 2.0);
        assert_eq!(quads.len(), 3);
    }
}
