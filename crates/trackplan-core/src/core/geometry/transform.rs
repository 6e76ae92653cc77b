use super::Tolerances;
use nalgebra::{Point2, Rotation2, Vector2};

/// Wraps an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed smallest difference `a - b` in degrees, in `(-180, 180]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = normalize_degrees(a - b);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Position, rotation and mirror state of a placed piece.
///
/// Applying a pose mirrors across the local x axis first (when flipped), then
/// rotates counter-clockwise by `rotation` degrees, then translates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point2<f64>,
    pub rotation: f64,
    pub flipped: bool,
}

impl Pose {
    pub fn new(position: Point2<f64>, rotation: f64, flipped: bool) -> Self {
        Self {
            position,
            rotation: normalize_degrees(rotation),
            flipped,
        }
    }

    pub fn identity() -> Self {
        Self::new(Point2::origin(), 0.0, false)
    }

    pub fn apply_point(&self, local: &Point2<f64>) -> Point2<f64> {
        let mirrored = mirror(local.coords, self.flipped);
        let rotated = Rotation2::new(self.rotation.to_radians()) * mirrored;
        self.position + rotated
    }

    pub fn apply_heading(&self, local_heading: f64) -> f64 {
        let heading = if self.flipped {
            -local_heading
        } else {
            local_heading
        };
        normalize_degrees(heading + self.rotation)
    }
}

/// A port in world coordinates: where it sits and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPort {
    pub position: Point2<f64>,
    pub heading: f64,
}

/// Maps a local port offset and heading into the world frame of a placement.
pub fn transform(
    offset: &Point2<f64>,
    heading: f64,
    position: Point2<f64>,
    rotation: f64,
    flipped: bool,
) -> WorldPort {
    let pose = Pose::new(position, rotation, flipped);
    WorldPort {
        position: pose.apply_point(offset),
        heading: pose.apply_heading(heading),
    }
}

/// Two ports mate when they coincide and face each other.
pub fn ports_align(a: &WorldPort, b: &WorldPort, tolerances: &Tolerances) -> bool {
    ports_coincide(a, b, tolerances) && headings_oppose(a.heading, b.heading, tolerances)
}

pub fn ports_coincide(a: &WorldPort, b: &WorldPort, tolerances: &Tolerances) -> bool {
    (a.position - b.position).norm() <= tolerances.position_eps_mm
}

pub fn headings_oppose(a: f64, b: f64, tolerances: &Tolerances) -> bool {
    angle_difference(a, b + 180.0).abs() <= tolerances.angle_eps_deg
}

/// Solves for the pose that puts a local port exactly onto `target`, facing it.
pub fn pose_aligning(
    local_offset: &Point2<f64>,
    local_heading: f64,
    flipped: bool,
    target: &WorldPort,
) -> Pose {
    let heading = if flipped {
        -local_heading
    } else {
        local_heading
    };
    let rotation = normalize_degrees(target.heading + 180.0 - heading);
    let rotated = Rotation2::new(rotation.to_radians()) * mirror(local_offset.coords, flipped);
    Pose::new(target.position - rotated, rotation, flipped)
}

#[inline]
fn mirror(v: Vector2<f64>, flipped: bool) -> Vector2<f64> {
    if flipped { Vector2::new(v.x, -v.y) } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_degrees_wraps_into_range() {
        assert!(close(normalize_degrees(370.0), 10.0));
        assert!(close(normalize_degrees(-90.0), 270.0));
        assert!(close(normalize_degrees(720.0), 0.0));
        assert!(normalize_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn angle_difference_picks_shortest_signed_turn() {
        assert!(close(angle_difference(10.0, 350.0), 20.0));
        assert!(close(angle_difference(350.0, 10.0), -20.0));
        assert!(close(angle_difference(180.0, 0.0), 180.0));
    }

    #[test]
    fn transform_rotates_then_translates() {
        let port = transform(
            &Point2::new(10.0, 0.0),
            0.0,
            Point2::new(100.0, 50.0),
            90.0,
            false,
        );
        assert!(close(port.position.x, 100.0));
        assert!(close(port.position.y, 60.0));
        assert!(close(port.heading, 90.0));
    }

    #[test]
    fn transform_mirrors_before_rotating() {
        let port = transform(&Point2::new(0.0, 5.0), 30.0, Point2::origin(), 0.0, true);
        assert!(close(port.position.y, -5.0));
        assert!(close(port.heading, 330.0));
    }

    #[test]
    fn ports_align_requires_opposed_headings() {
        let tol = Tolerances::default();
        let a = WorldPort {
            position: Point2::new(0.0, 0.0),
            heading: 0.0,
        };
        let facing = WorldPort {
            position: Point2::new(2.0, 0.0),
            heading: 183.0,
        };
        let parallel = WorldPort {
            position: Point2::new(0.0, 0.0),
            heading: 0.0,
        };
        let far = WorldPort {
            position: Point2::new(10.0, 0.0),
            heading: 180.0,
        };
        assert!(ports_align(&a, &facing, &tol));
        assert!(!ports_align(&a, &parallel, &tol));
        assert!(!ports_align(&a, &far, &tol));
    }

    #[test]
    fn pose_aligning_lands_port_on_target() {
        let target = WorldPort {
            position: Point2::new(300.0, 200.0),
            heading: 45.0,
        };
        for flipped in [false, true] {
            let offset = Point2::new(-84.0, 12.0);
            let pose = pose_aligning(&offset, 200.0, flipped, &target);
            let placed = WorldPort {
                position: pose.apply_point(&offset),
                heading: pose.apply_heading(200.0),
            };
            assert!((placed.position - target.position).norm() < 1e-9);
            assert!(ports_align(&placed, &target, &Tolerances::default()));
            assert!(close(angle_difference(placed.heading, target.heading), 180.0));
        }
    }
}
