use super::polygon::{Polygon, cross, segments_properly_intersect, signed_area};
use super::transform::Pose;
use nalgebra::{Point2, Vector2};

/// Axis-aligned bounding box used as the broad phase for all footprint tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Aabb {
    pub fn from_points<I: IntoIterator<Item = Point2<f64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (
                Point2::new(min.x.min(p.x), min.y.min(p.y)),
                Point2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Self { min, max })
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// True when the boxes overlap by more than `eps` along both axes.
    pub fn intersects(&self, other: &Aabb, eps: f64) -> bool {
        self.min.x < other.max.x - eps
            && other.min.x < self.max.x - eps
            && self.min.y < other.max.y - eps
            && other.min.y < self.max.y - eps
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

/// A convex polygon, stored counter-clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPart {
    vertices: Vec<Point2<f64>>,
}

impl ConvexPart {
    pub fn new(mut vertices: Vec<Point2<f64>>) -> Self {
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.vertices).abs()
    }

    fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    fn axes(&self) -> impl Iterator<Item = Vector2<f64>> + '_ {
        self.edges().filter_map(|(a, b)| {
            let edge = b - a;
            let normal = Vector2::new(-edge.y, edge.x);
            let len = normal.norm();
            (len > 1e-12).then(|| normal / len)
        })
    }

    fn project(&self, axis: &Vector2<f64>) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|p| p.coords.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Point lies inside the part by more than `eps` from every edge.
    pub fn contains_point_strict(&self, point: &Point2<f64>, eps: f64) -> bool {
        self.edges().all(|(a, b)| {
            let len = (b - a).norm();
            len > 1e-12 && cross(&a, &b, point) / len > eps
        })
    }
}

/// Separating-axis penetration depth of two convex parts.
///
/// Zero or negative means the parts are disjoint or only touch.
pub fn penetration_depth(a: &ConvexPart, b: &ConvexPart) -> f64 {
    let mut depth = f64::INFINITY;
    for axis in a.axes().chain(b.axes()) {
        let (a_lo, a_hi) = a.project(&axis);
        let (b_lo, b_hi) = b.project(&axis);
        let overlap = a_hi.min(b_hi) - a_lo.max(b_lo);
        if overlap <= 0.0 {
            return overlap;
        }
        depth = depth.min(overlap);
    }
    depth
}

/// The 2D area a piece occupies, decomposed into convex parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    parts: Vec<ConvexPart>,
    bounds: Aabb,
}

impl Footprint {
    pub fn new(parts: Vec<ConvexPart>) -> Self {
        let bounds = Aabb::from_points(parts.iter().flat_map(|p| p.vertices().iter().copied()))
            .unwrap_or(Aabb {
                min: Point2::origin(),
                max: Point2::origin(),
            });
        Self { parts, bounds }
    }

    pub fn parts(&self) -> &[ConvexPart] {
        &self.parts
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Sum of the part areas.
    pub fn area(&self) -> f64 {
        self.parts.iter().map(ConvexPart::area).sum()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.parts.iter().flat_map(|p| p.vertices().iter())
    }

    pub fn transformed(&self, pose: &Pose) -> Footprint {
        Footprint::new(
            self.parts
                .iter()
                .map(|part| {
                    ConvexPart::new(part.vertices().iter().map(|v| pose.apply_point(v)).collect())
                })
                .collect(),
        )
    }
}

/// True when two placed footprints overlap by more than `eps`.
pub fn overlaps(a: &Footprint, b: &Footprint, eps: f64) -> bool {
    if !a.bounds.intersects(&b.bounds, eps) {
        return false;
    }
    a.parts.iter().any(|pa| {
        b.parts
            .iter()
            .any(|pb| penetration_depth(pa, pb) > eps)
    })
}

/// True iff the footprint lies inside `outline` and clear of every hole.
///
/// Vertices on the outline within `eps` count as inside, so pieces may sit
/// flush with the board edge.
pub fn within(shape: &Footprint, outline: &Polygon, holes: &[Polygon], eps: f64) -> bool {
    if !shape.vertices().all(|v| outline.contains_point(v, eps)) {
        return false;
    }
    for part in shape.parts() {
        if part_crosses(part, outline) {
            return false;
        }
        if outline
            .vertices()
            .iter()
            .any(|v| part.contains_point_strict(v, eps))
        {
            return false;
        }
        for hole in holes {
            if part_overlaps_polygon(part, hole, eps) {
                return false;
            }
        }
    }
    true
}

fn part_crosses(part: &ConvexPart, polygon: &Polygon) -> bool {
    part.edges().any(|(a, b)| {
        polygon
            .edges()
            .any(|(c, d)| segments_properly_intersect(a, b, c, d))
    })
}

fn part_overlaps_polygon(part: &ConvexPart, polygon: &Polygon, eps: f64) -> bool {
    part.vertices()
        .iter()
        .any(|v| polygon.contains_point_strict(v, eps))
        || polygon
            .vertices()
            .iter()
            .any(|v| part.contains_point_strict(v, eps))
        || part_crosses(part, polygon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> ConvexPart {
        ConvexPart::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    fn board(w: f64, h: f64) -> Polygon {
        Polygon::from_pairs(&[[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]])
    }

    #[test]
    fn convex_part_is_normalised_to_counter_clockwise() {
        let part = ConvexPart::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
        ]);
        assert!(signed_area(part.vertices()) > 0.0);
        assert_eq!(part.area(), 1.0);
    }

    #[test]
    fn crossing_rectangles_overlap() {
        let a = Footprint::new(vec![rect(-10.0, -1.0, 10.0, 1.0)]);
        let b = Footprint::new(vec![rect(-1.0, -10.0, 1.0, 10.0)]);
        assert!(overlaps(&a, &b, 0.5));
    }

    #[test]
    fn abutting_rectangles_do_not_overlap() {
        let a = Footprint::new(vec![rect(0.0, 0.0, 10.0, 2.0)]);
        let b = Footprint::new(vec![rect(10.0, 0.0, 20.0, 2.0)]);
        assert!(!overlaps(&a, &b, 0.5));
    }

    #[test]
    fn shallow_overlap_below_tolerance_is_ignored() {
        let a = Footprint::new(vec![rect(0.0, 0.0, 10.0, 2.0)]);
        let b = Footprint::new(vec![rect(9.7, 0.0, 20.0, 2.0)]);
        assert!(!overlaps(&a, &b, 0.5));
        assert!(overlaps(&a, &b, 0.1));
    }

    #[test]
    fn penetration_depth_is_smallest_axis_overlap() {
        let depth = penetration_depth(&rect(0.0, 0.0, 10.0, 10.0), &rect(8.0, 5.0, 20.0, 20.0));
        assert!((depth - 2.0).abs() < 1e-9);
    }

    #[test]
    fn footprint_inside_board_is_within() {
        let fp = Footprint::new(vec![rect(10.0, 10.0, 100.0, 30.0)]);
        assert!(within(&fp, &board(200.0, 200.0), &[], 1e-6));
    }

    #[test]
    fn footprint_flush_with_edge_is_within() {
        let fp = Footprint::new(vec![rect(0.0, 0.0, 100.0, 30.0)]);
        assert!(within(&fp, &board(200.0, 200.0), &[], 1e-6));
    }

    #[test]
    fn footprint_poking_out_is_not_within() {
        let fp = Footprint::new(vec![rect(150.0, 10.0, 250.0, 30.0)]);
        assert!(!within(&fp, &board(200.0, 200.0), &[], 1e-6));
    }

    #[test]
    fn footprint_spanning_concave_notch_is_not_within() {
        let l_shape = Polygon::from_pairs(&[
            [0.0, 0.0],
            [100.0, 0.0],
            [100.0, 20.0],
            [20.0, 20.0],
            [20.0, 100.0],
            [0.0, 100.0],
        ]);
        let fp = Footprint::new(vec![ConvexPart::new(vec![
            Point2::new(10.0, 90.0),
            Point2::new(15.0, 90.0),
            Point2::new(90.0, 15.0),
            Point2::new(90.0, 10.0),
        ])]);
        assert!(!within(&fp, &l_shape, &[], 1e-6));
    }

    #[test]
    fn footprint_over_hole_is_not_within() {
        let hole = Polygon::from_pairs(&[[50.0, 50.0], [80.0, 50.0], [80.0, 80.0], [50.0, 80.0]]);
        let crossing = Footprint::new(vec![rect(40.0, 60.0, 120.0, 70.0)]);
        let clear = Footprint::new(vec![rect(40.0, 100.0, 120.0, 110.0)]);
        let swallowed = Footprint::new(vec![rect(60.0, 60.0, 70.0, 70.0)]);
        let outline = board(200.0, 200.0);
        assert!(!within(&crossing, &outline, std::slice::from_ref(&hole), 1e-6));
        assert!(!within(&swallowed, &outline, std::slice::from_ref(&hole), 1e-6));
        assert!(within(&clear, &outline, std::slice::from_ref(&hole), 1e-6));
    }

    #[test]
    fn aabb_union_covers_both_boxes() {
        let a = Aabb::from_points([Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]).unwrap();
        let b = Aabb::from_points([Point2::new(5.0, -2.0), Point2::new(6.0, 0.0)]).unwrap();
        let u = a.union(&b);
        assert_eq!(u.min, Point2::new(0.0, -2.0));
        assert_eq!(u.max, Point2::new(6.0, 1.0));
        assert_eq!(u.width(), 6.0);
        assert_eq!(u.height(), 3.0);
    }
}
