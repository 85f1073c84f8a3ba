// Planar polygon predicates used to validate flattened profiles before sweeping.
//
// Polygons are closed implicitly: the last point connects back to the first.

use glam::Vec2;

/// Tolerance for orientation tests on coordinates of roughly unit scale.
pub(crate) const EPSILON: f32 = 1e-7;

/// Points closer than this are treated as one vertex.
pub(crate) const WELD_DISTANCE: f32 = 1e-6;

/// Shoelace area; positive for counter-clockwise polygons.
pub(crate) fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    let twice: f32 = (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum();
    twice * 0.5
}

/// Drop consecutive duplicates, including a trailing copy of the first point.
pub(crate) fn dedup_closed(points: &mut Vec<Vec2>) {
    points.dedup_by(|b, a| a.distance(*b) <= WELD_DISTANCE);
    while points.len() > 1 && points[0].distance(points[points.len() - 1]) <= WELD_DISTANCE {
        points.pop();
    }
}

/// Even-odd point containment.
pub(crate) fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn within_box(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Closed-segment intersection test. Touching counts as intersecting.
pub(crate) fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);

    let straddles = |p: f32, q: f32| (p > EPSILON && q < -EPSILON) || (p < -EPSILON && q > EPSILON);
    if straddles(d1, d2) && straddles(d3, d4) {
        return true;
    }

    (d1.abs() <= EPSILON && within_box(c, d, a))
        || (d2.abs() <= EPSILON && within_box(c, d, b))
        || (d3.abs() <= EPSILON && within_box(a, b, c))
        || (d4.abs() <= EPSILON && within_box(a, b, d))
}

/// True when no two non-adjacent edges meet and no vertex folds an edge back onto its neighbour.
pub(crate) fn is_simple(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let e1 = cur - prev;
        let e2 = next - cur;
        if e1.perp_dot(e2).abs() <= EPSILON && e1.dot(e2) < 0.0 {
            return false;
        }
    }

    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (points[j], points[(j + 1) % n]);
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }

    true
}

/// True when any edge of `a` meets any edge of `b`.
pub(crate) fn polygons_intersect(a: &[Vec2], b: &[Vec2]) -> bool {
    let (na, nb) = (a.len(), b.len());
    (0..na).any(|i| {
        let (p, q) = (a[i], a[(i + 1) % na]);
        (0..nb).any(|j| segments_intersect(p, q, b[j], b[(j + 1) % nb]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)]
    }

    #[test]
    fn area_sign_follows_winding() {
        let mut sq = square();
        assert_relative_eq!(signed_area(&sq), 1.0);
        sq.reverse();
        assert_relative_eq!(signed_area(&sq), -1.0);
    }

    #[test]
    fn bow_tie_is_not_simple() {
        let bow = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert!(!is_simple(&bow));
        assert!(is_simple(&square()));
    }

    #[test]
    fn spike_back_along_edge_is_not_simple() {
        let spike = vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
        assert!(!is_simple(&spike));
    }

    #[test]
    fn dedup_removes_closing_point() {
        let mut pts = square();
        pts.insert(1, Vec2::new(0.0, 0.0));
        pts.push(Vec2::new(0.0, 0.0));
        dedup_closed(&mut pts);
        assert_eq!(pts, square());
    }

    #[test]
    fn containment_and_overlap() {
        let outer = square();
        let inner: Vec<Vec2> = outer.iter().map(|p| *p * 0.5 + Vec2::splat(0.25)).collect();
        assert!(point_in_polygon(inner[0], &outer));
        assert!(!polygons_intersect(&outer, &inner));

        let shifted: Vec<Vec2> = inner.iter().map(|p| *p + Vec2::new(0.6, 0.0)).collect();
        assert!(polygons_intersect(&outer, &shifted));
    }
}
