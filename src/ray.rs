use crate::tuple::Tuple3D;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ray3D {
    pub origin: Tuple3D,
    pub direction: Tuple3D,
}

impl Ray3D {
    /// Creates a ray. The direction is normalized on construction.
    pub fn new(origin: Tuple3D, direction: Tuple3D) -> Ray3D {
        Ray3D { origin, direction: direction.normalize() }
    }

    pub fn position(&self, t: f64) -> Tuple3D {
        self.origin + (t * self.direction)
    }
}

#[test]
fn ray_position() {
    let r = Ray3D::new(
                Tuple3D::new(2.0, 3.0, 4.0),
                Tuple3D::new(1.0, 0.0, 0.0)
            );

    assert_eq!(r.position(0.0), Tuple3D::new(2.0, 3.0, 4.0));
    assert_eq!(r.position(1.0), Tuple3D::new(3.0, 3.0, 4.0));
    assert_eq!(r.position(-1.0), Tuple3D::new(1.0, 3.0, 4.0));
    assert_eq!(r.position(2.5), Tuple3D::new(4.5, 3.0, 4.0));
}

#[test]
fn ray_direction_is_normalized() {
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -16.0));

    assert_eq!(r.direction, Tuple3D::new(0.0, 0.0, -1.0));
}
