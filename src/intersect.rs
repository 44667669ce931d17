use crate::consts::SURFACE_EPSILON;
use crate::light::Material;
use crate::tuple::Tuple3D;

/// The nearest intersection of a ray with the scene.
///
/// Mostly a record of what the shading kernel needs to know about the hit
/// surface: where it was hit, which way it faces, and what it is made of.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// The point where the intersection occurs.
    pub point: Tuple3D,

    /// The unit surface normal at `point`.
    pub normal: Tuple3D,

    /// The material at `point`. For decal hits this is derived from the
    /// sampled texel.
    pub material: Material,

    /// The distance from the ray origin to `point`.
    pub distance: f64,
}

impl Hit {
    /// A point slightly off the surface, on the side `dir` travels towards.
    ///
    /// Secondary rays start here so that the surface they leave does not
    /// immediately occlude them (this causes "acne").
    pub fn over_point(&self, dir: Tuple3D) -> Tuple3D {
        if dir.dot(&self.normal) < 0.0 {
            self.point - self.normal * SURFACE_EPSILON
        } else {
            self.point + self.normal * SURFACE_EPSILON
        }
    }
}

/// Refracts a unit direction through a surface following Snell's law.
///
/// `eta_t` is the refractive index of the medium being entered and `eta_i`
/// the index of the medium being exited. When the incidence cosine shows the
/// ray leaves the object rather than entering it, the normal is flipped and
/// the two media are swapped.
///
/// Returns `None` on total internal reflection.
pub fn refract(dir: Tuple3D, normal: Tuple3D, eta_t: f64, eta_i: f64)
    -> Option<Tuple3D> {
    let cosi = -dir.dot(&normal).clamp(-1.0, 1.0);
    if cosi < 0.0 {
        return refract(dir, -normal, eta_i, eta_t);
    }

    let eta = eta_i / eta_t;
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k < 0.0 {
        None
    } else {
        Some(dir * eta + normal * (eta * cosi - k.sqrt()))
    }
}

#[test]
fn refract_matching_media_passes_straight_through() {
    let dir = Tuple3D::new(1.0, -1.0, 0.0).normalize();
    let normal = Tuple3D::new(0.0, 1.0, 0.0);

    assert_eq!(refract(dir, normal, 1.0, 1.0), Some(dir));
}

#[test]
fn refract_bends_towards_normal_when_entering() {
    let dir = Tuple3D::new(1.0, -1.0, 0.0).normalize();
    let normal = Tuple3D::new(0.0, 1.0, 0.0);
    let t = refract(dir, normal, 1.5, 1.0).unwrap();

    // sin(theta_t) = sin(45) / 1.5
    let sin_t = (0.5f64).sqrt() / 1.5;
    assert_eq!(t, Tuple3D::new(sin_t, -(1.0 - sin_t * sin_t).sqrt(), 0.0));
}

#[test]
fn refract_swaps_media_when_exiting() {
    // Leaving glass at a shallow angle from the inside reflects totally.
    let dir = Tuple3D::new(1.0, 0.2, 0.0).normalize();
    let normal = Tuple3D::new(0.0, 1.0, 0.0);

    assert_eq!(refract(dir, normal, 1.5, 1.0), None);

    // A steep exit still refracts, bending away from the normal.
    let dir = Tuple3D::new(0.1, 1.0, 0.0).normalize();
    let t = refract(dir, normal, 1.5, 1.0).unwrap();
    assert!(t.x > dir.x);
    assert!(feq(t.magnitude(), 1.0));
}

#[test]
fn over_point_follows_direction() {
    let hit = Hit {
        point: Tuple3D::new(0.0, 1.0, 0.0),
        normal: Tuple3D::new(0.0, 1.0, 0.0),
        material: Default::default(),
        distance: 1.0,
    };

    assert_eq!(hit.over_point(Tuple3D::new(0.0, 1.0, 0.0)),
        Tuple3D::new(0.0, 1.0 + SURFACE_EPSILON, 0.0));
    assert_eq!(hit.over_point(Tuple3D::new(0.0, -1.0, 0.0)),
        Tuple3D::new(0.0, 1.0 - SURFACE_EPSILON, 0.0));
}

#[cfg(test)]
use crate::feq;
