use std::ops::{ Add, Sub, Neg, Mul, Index };

use crate::feq;

/// A three component vector, used for points and directions alike.
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Tuple3D {
    pub x: f64,
    pub y: f64,
    pub z: f64
}

impl PartialEq for Tuple3D {
    fn eq(&self, other: &Tuple3D) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z)
    }
}

/// A four component vector.
///
/// Used for material albedos (diffuse, specular, reflection, refraction) and
/// for decal texels (red, green, blue, alpha).
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Tuple4D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64
}

impl PartialEq for Tuple4D {
    fn eq(&self, other: &Tuple4D) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z) &&
            feq(self.w, other.w)
    }
}

impl Tuple3D {
    pub fn new(x: f64, y: f64, z: f64) -> Tuple3D {
        Tuple3D { x, y, z }
    }

    pub fn zero() -> Tuple3D {
        Tuple3D { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn magnitude(&self) -> f64 {
        f64::sqrt(self.dot(self))
    }

    /// Scales the vector to unit length.
    ///
    /// The zero vector has no direction; callers never pass one.
    pub fn normalize(&self) -> Tuple3D {
        *self * (1.0 / self.magnitude())
    }

    pub fn dot(&self, other: &Tuple3D) -> f64 {
        self.x * other.x
            + self.y * other.y
            + self.z * other.z
    }

    pub fn cross(&self, other: &Tuple3D) -> Tuple3D {
        Tuple3D {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Reflects a vector across a normal.
    pub fn reflect(&self, normal: &Tuple3D) -> Tuple3D {
        *self - (*normal * 2.0 * self.dot(normal))
    }
}

impl Tuple4D {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Tuple4D {
        Tuple4D { x, y, z, w }
    }
}

impl Index<usize> for Tuple3D {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Tuple3D index {} out of range", i),
        }
    }
}

impl Index<usize> for Tuple4D {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            3 => &self.w,
            _ => panic!("Tuple4D index {} out of range", i),
        }
    }
}

/// Conversion from a slice, as found in scene descriptions.
///
/// Missing components default to zero, extra components are ignored.
impl From<&[f64]> for Tuple3D {
    fn from(v: &[f64]) -> Tuple3D {
        Tuple3D {
            x: v.get(0).copied().unwrap_or_default(),
            y: v.get(1).copied().unwrap_or_default(),
            z: v.get(2).copied().unwrap_or_default(),
        }
    }
}

impl From<[f64; 3]> for Tuple3D {
    fn from(v: [f64; 3]) -> Tuple3D {
        Tuple3D { x: v[0], y: v[1], z: v[2] }
    }
}

impl Add for Tuple3D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Tuple3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Tuple3D {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Implements scalar right-multiplication for a 3D tuple.
///
/// ```
/// use tinyrt::tuple::Tuple3D;
///
/// let t = Tuple3D::new(1.0, 2.0, 3.0);
///
/// // (notice how the scalar is on the right)
/// assert_eq!(t * 5.0, Tuple3D::new(5.0, 10.0, 15.0));
/// ```
impl Mul<f64> for Tuple3D {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
        }
    }
}

/// Implements scalar left-multiplication for a 3D tuple.
///
/// ```rust
/// use tinyrt::tuple::Tuple3D;
///
/// let t = Tuple3D::new(1.0, 2.0, 3.0);
///
/// // (notice how the scalar is on the left)
/// assert_eq!(5.0 * t, Tuple3D::new(5.0, 10.0, 15.0));
/// ```
impl Mul<Tuple3D> for f64 {
    type Output = Tuple3D;

    fn mul(self, other: Tuple3D) -> Tuple3D {
        Tuple3D {
            x: self * other.x,
            y: self * other.y,
            z: self * other.z,
        }
    }
}

impl Mul<f64> for Tuple4D {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
            w: self.w * other
        }
    }
}

/* Tests */

#[test]
fn add_tuples() {
    let a1 = Tuple3D::new(3.0, -2.0, 5.0);
    let a2 = Tuple3D::new(-2.0, 3.0, 1.0);

    assert_eq!(a1 + a2, Tuple3D::new(1.0, 1.0, 6.0));
}

#[test]
fn sub_vectors() {
    let p1 = Tuple3D::new(3.0, 2.0, 1.0);
    let p2 = Tuple3D::new(5.0, 6.0, 7.0);

    assert_eq!(p1 - p2, Tuple3D::new(-2.0, -4.0, -6.0));
}

#[test]
fn neg_tuple() {
    let a = Tuple3D::new(1.0, -2.0, 3.0);

    assert_eq!(-a, Tuple3D::new(-1.0, 2.0, -3.0));
}

#[test]
fn mul_fraction() {
    let a = Tuple4D::new(1.0, -2.0, 3.0, -4.0);

    assert_eq!(a * 0.5, Tuple4D::new(0.5, -1.0, 1.5, -2.0));
}

#[test]
fn magnitude_neg() {
    let v = Tuple3D::new(-1.0, -2.0, -3.0);

    assert_eq!(v.magnitude(), f64::sqrt(14.0));
}

#[test]
fn normalize_dirty() {
    let v = Tuple3D::new(1.0, 2.0, 3.0);
    let e = Tuple3D::new(
        1.0 / f64::sqrt(14.0),
        2.0 / f64::sqrt(14.0),
        3.0 / f64::sqrt(14.0)
    );

    assert_eq!(v.normalize(), e);
    assert!(feq(v.normalize().magnitude(), 1.0));
}

#[test]
fn dot_vectors() {
    let a = Tuple3D::new(1.0, 2.0, 3.0);
    let b = Tuple3D::new(2.0, 3.0, 4.0);

    assert_eq!(a.dot(&b), 20.0);
}

#[test]
fn cross_vectors() {
    let a = Tuple3D::new(1.0, 2.0, 3.0);
    let b = Tuple3D::new(2.0, 3.0, 4.0);

    let c = Tuple3D::new(-1.0, 2.0, -1.0);
    let d = Tuple3D::new(1.0, -2.0, 1.0);

    assert_eq!(a.cross(&b), c);
    assert_eq!(b.cross(&a), d);
}

#[test]
fn reflect_45() {
    let v = Tuple3D::new(1.0, -1.0, 0.0);
    let n = Tuple3D::new(0.0, 1.0, 0.0);
    let r = v.reflect(&n);

    assert_eq!(r, Tuple3D::new(1.0, 1.0, 0.0));
}

#[test]
fn index_components() {
    let albedo = Tuple4D::new(0.6, 0.3, 0.1, 0.0);

    assert_eq!(albedo[0], 0.6);
    assert_eq!(albedo[3], 0.0);
    assert_eq!(Tuple3D::new(1.0, 2.0, 3.0)[2], 3.0);
}

#[test]
fn from_short_slice() {
    let v: &[f64] = &[1.0, 2.0];

    assert_eq!(Tuple3D::from(v), Tuple3D::new(1.0, 2.0, 0.0));
}
