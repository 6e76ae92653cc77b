use super::shapes::Aabb;
use nalgebra::{Point2, Vector2};

const ORIENTATION_EPS: f64 = 1e-9;

/// A simple closed polygon stored as an ordered vertex ring.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2<f64>>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        Self { vertices }
    }

    pub fn from_pairs(pairs: &[[f64; 2]]) -> Self {
        Self::new(pairs.iter().map(|p| Point2::new(p[0], p[1])).collect())
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over the edges as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn centroid(&self) -> Option<Point2<f64>> {
        let area = self.signed_area();
        if area.abs() < ORIENTATION_EPS {
            return None;
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in self.edges() {
            let cross = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        Some(Point2::new(cx / (6.0 * area), cy / (6.0 * area)))
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }

    /// Returns the first pair of edges that intersect illegally, or `None` for a simple ring.
    ///
    /// Adjacent edges may only share their common vertex; any other contact,
    /// including collinear backtracking, counts as a self-intersection.
    pub fn self_intersection(&self) -> Option<(usize, usize)> {
        let n = self.vertices.len();
        if n < 3 {
            return None;
        }
        let edges: Vec<_> = self.edges().collect();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                let (p1, p2) = edges[i];
                let (q1, q2) = edges[j];
                if adjacent {
                    let shared = if j == i + 1 { p2 } else { p1 };
                    let (a_far, b_far) = if j == i + 1 { (p1, q2) } else { (p2, q1) };
                    if collinear_overlap(shared, a_far, b_far) {
                        return Some((i, j));
                    }
                } else if segments_touch(p1, p2, q1, q2) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Even-odd ray casting; boundary points are reported as inside when within `eps`.
    pub fn contains_point(&self, point: &Point2<f64>, eps: f64) -> bool {
        if self.distance_to_boundary(point) <= eps {
            return true;
        }
        self.strictly_contains(point)
    }

    /// Interior test that excludes the boundary band of width `eps`.
    pub fn contains_point_strict(&self, point: &Point2<f64>, eps: f64) -> bool {
        self.distance_to_boundary(point) > eps && self.strictly_contains(point)
    }

    pub fn distance_to_boundary(&self, point: &Point2<f64>) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(point, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn translated(&self, offset: Vector2<f64>) -> Self {
        Self::new(self.vertices.iter().map(|p| p + offset).collect())
    }

    fn strictly_contains(&self, point: &Point2<f64>) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > point.y) != (b.y > point.y) {
                let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

pub fn signed_area(vertices: &[Point2<f64>]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

#[inline]
pub fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < ORIENTATION_EPS {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// True when the open segments cross at a single interior point of both.
pub fn segments_properly_intersect(
    p1: Point2<f64>,
    p2: Point2<f64>,
    q1: Point2<f64>,
    q2: Point2<f64>,
) -> bool {
    let d1 = cross(&q1, &q2, &p1);
    let d2 = cross(&q1, &q2, &p2);
    let d3 = cross(&p1, &p2, &q1);
    let d4 = cross(&p1, &p2, &q2);
    let opposite = |a: f64, b: f64| {
        (a > ORIENTATION_EPS && b < -ORIENTATION_EPS) || (a < -ORIENTATION_EPS && b > ORIENTATION_EPS)
    };
    opposite(d1, d2) && opposite(d3, d4)
}

/// True when the closed segments share at least one point.
pub fn segments_touch(p1: Point2<f64>, p2: Point2<f64>, q1: Point2<f64>, q2: Point2<f64>) -> bool {
    if segments_properly_intersect(p1, p2, q1, q2) {
        return true;
    }
    distance_to_segment(&p1, &q1, &q2) <= ORIENTATION_EPS
        || distance_to_segment(&p2, &q1, &q2) <= ORIENTATION_EPS
        || distance_to_segment(&q1, &p1, &p2) <= ORIENTATION_EPS
        || distance_to_segment(&q2, &p1, &p2) <= ORIENTATION_EPS
}

fn collinear_overlap(shared: Point2<f64>, a_far: Point2<f64>, b_far: Point2<f64>) -> bool {
    if cross(&shared, &a_far, &b_far).abs() > ORIENTATION_EPS {
        return false;
    }
    (a_far - shared).dot(&(b_far - shared)) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Polygon {
        Polygon::from_pairs(&[[0.0, 0.0], [size, 0.0], [size, size], [0.0, size]])
    }

    #[test]
    fn area_and_centroid_of_square() {
        let poly = square(10.0);
        assert_eq!(poly.area(), 100.0);
        assert!(poly.signed_area() > 0.0);
        let c = poly.centroid().unwrap();
        assert!((c.x - 5.0).abs() < 1e-12 && (c.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn clockwise_ring_has_negative_signed_area() {
        let poly = Polygon::from_pairs(&[[0.0, 0.0], [0.0, 4.0], [4.0, 4.0], [4.0, 0.0]]);
        assert_eq!(poly.signed_area(), -16.0);
        assert_eq!(poly.area(), 16.0);
    }

    #[test]
    fn degenerate_polygon_has_no_centroid() {
        let poly = Polygon::from_pairs(&[[0.0, 0.0], [5.0, 0.0], [10.0, 0.0]]);
        assert_eq!(poly.area(), 0.0);
        assert!(poly.centroid().is_none());
    }

    #[test]
    fn contains_point_handles_inside_outside_and_boundary() {
        let poly = square(10.0);
        assert!(poly.contains_point(&Point2::new(5.0, 5.0), 1e-6));
        assert!(!poly.contains_point(&Point2::new(15.0, 5.0), 1e-6));
        assert!(poly.contains_point(&Point2::new(10.0, 5.0), 1e-6));
        assert!(!poly.contains_point_strict(&Point2::new(10.0, 5.0), 1e-6));
    }

    #[test]
    fn contains_point_in_concave_l_shape() {
        let poly = Polygon::from_pairs(&[
            [0.0, 0.0],
            [20.0, 0.0],
            [20.0, 5.0],
            [5.0, 5.0],
            [5.0, 20.0],
            [0.0, 20.0],
        ]);
        assert!(poly.contains_point(&Point2::new(2.0, 18.0), 1e-6));
        assert!(poly.contains_point(&Point2::new(18.0, 2.0), 1e-6));
        assert!(!poly.contains_point(&Point2::new(15.0, 15.0), 1e-6));
    }

    #[test]
    fn bowtie_is_reported_as_self_intersecting() {
        let poly = Polygon::from_pairs(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]);
        assert_eq!(poly.self_intersection(), Some((0, 2)));
    }

    #[test]
    fn simple_polygon_has_no_self_intersection() {
        assert!(square(3.0).self_intersection().is_none());
    }

    #[test]
    fn backtracking_edge_is_a_self_intersection() {
        let poly = Polygon::from_pairs(&[[0.0, 0.0], [10.0, 0.0], [5.0, 0.0], [5.0, 5.0]]);
        assert!(poly.self_intersection().is_some());
    }

    #[test]
    fn proper_intersection_excludes_touching_endpoints() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert!(segments_properly_intersect(
            a,
            b,
            Point2::new(5.0, -5.0),
            Point2::new(5.0, 5.0)
        ));
        assert!(!segments_properly_intersect(
            a,
            b,
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 5.0)
        ));
        assert!(segments_touch(
            a,
            b,
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 5.0)
        ));
    }

    #[test]
    fn distance_to_segment_clamps_to_endpoints() {
        let d = distance_to_segment(
            &Point2::new(-3.0, 4.0),
            &Point2::new(0.0, 0.0),
            &Point2::new(10.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-12);
    }
}
