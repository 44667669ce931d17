use crate::intersect::Hit;
use crate::light::Material;
use crate::ray::Ray3D;
use crate::texture::DecalImage;
use crate::tuple::Tuple3D;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Tuple3D,
    pub radius: f64,
    pub material: Material,
}

impl Sphere {
    pub fn new(center: Tuple3D, radius: f64, material: Material) -> Sphere {
        Sphere { center, radius, material }
    }

    /// The outward unit normal at a point on the sphere.
    pub fn normal_at(&self, point: Tuple3D) -> Tuple3D {
        (point - self.center).normalize()
    }
}

/// Checks whether a ray intersects a sphere.
///
/// The center is projected onto the ray; if the closest approach is further
/// from the center than the radius, the ray misses. Otherwise the nearer root
/// is returned, or the farther one when the nearer lies behind the origin
/// (the origin is inside the sphere). `None` if both lie behind.
pub fn ray_sphere_intersect(ray: &Ray3D, sphere: &Sphere) -> Option<f64> {
    let l = sphere.center - ray.origin;
    let tca = l.dot(&ray.direction);
    let d2 = l.dot(&l) - tca * tca;
    let r2 = sphere.radius * sphere.radius;

    if d2 > r2 {
        return None;
    }

    let thc = (r2 - d2).sqrt();
    let t0 = tca - thc;
    let t1 = tca + thc;

    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// The orientation of the decal plane for a rotation angle in degrees.
///
/// The decal turns around the vertical axis. `normal` is the facing
/// direction, `horizontal` runs along image rows and `vertical` runs down
/// image columns.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecalFrame {
    pub normal: Tuple3D,
    pub horizontal: Tuple3D,
    pub vertical: Tuple3D,
}

impl DecalFrame {
    pub fn new(angle: f64) -> DecalFrame {
        let a = angle.to_radians();
        let b = (angle - 90.0).to_radians();

        let normal = Tuple3D::new(a.cos(), 0.0, a.sin());
        let horizontal = Tuple3D::new(b.cos(), 0.0, b.sin());
        let vertical = horizontal.cross(&normal);

        DecalFrame { normal, horizontal, vertical }
    }
}

/// A billboard image placed in the scene.
///
/// The decal is a rectangle centered on `anchor`, with the physical size of
/// its image. Fully transparent texels let rays pass through.
#[derive(Clone, Debug, PartialEq)]
pub struct Decal {
    pub image: DecalImage,
    pub anchor: Tuple3D,
    pub material: Material,
}

impl Decal {
    pub fn new(image: DecalImage, anchor: Tuple3D) -> Decal {
        Decal { image, anchor, material: Material::decal() }
    }

    /// Intersects a ray with the decal turned by `angle` degrees.
    ///
    /// Only hits strictly closer than `nearest` count. The returned normal
    /// faces the incoming ray.
    pub fn intersect(&self, ray: &Ray3D, angle: f64, nearest: f64)
        -> Option<Hit> {
        let frame = DecalFrame::new(angle);
        let to_anchor = self.anchor - ray.origin;

        let distance = to_anchor.dot(&frame.normal)
            / ray.direction.dot(&frame.normal);
        if !(distance > 0.0 && distance < nearest) {
            return None;
        }

        // Offset of the crossing point from the anchor, within the plane
        let p = ray.direction * distance - to_anchor;
        let u = p.dot(&frame.horizontal);
        let v = p.dot(&frame.vertical);

        let fwidth = self.image.world_width();
        let fheight = self.image.world_height();
        if u.abs() * 2.0 >= fwidth || v.abs() * 2.0 >= fheight {
            return None;
        }

        let x = ((u + fwidth / 2.0) / fwidth * self.image.width() as f64) as usize;
        let y = ((v + fheight / 2.0) / fheight * self.image.height() as f64) as usize;
        let texel = self.image.texel(
            x.min(self.image.width() - 1),
            y.min(self.image.height() - 1),
        );

        if texel.w <= 0.0 {
            return None;
        }

        let normal = if frame.normal.dot(&ray.direction) > 0.0 {
            -frame.normal
        } else {
            frame.normal
        };

        Some(Hit {
            point: p + self.anchor,
            normal,
            material: self.material.with_texel(texel),
            distance,
        })
    }
}

#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::tuple::Tuple4D;

#[cfg(test)]
fn solid_decal(texel: Tuple4D) -> DecalImage {
    DecalImage::new(100, 100, vec![texel; 100 * 100]).unwrap()
}

#[test]
fn ray_misses_sphere() {
    let s = Sphere::new(Tuple3D::new(0.0, 0.0, -5.0), 1.0, Material::ivory());
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 1.0, -2.0));

    assert_eq!(ray_sphere_intersect(&r, &s), None);
}

#[test]
fn ray_hits_near_side_first() {
    let s = Sphere::new(Tuple3D::new(0.0, 0.0, -5.0), 1.0, Material::ivory());
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    assert_eq!(ray_sphere_intersect(&r, &s), Some(4.0));
}

#[test]
fn ray_inside_sphere_hits_far_side() {
    let s = Sphere::new(Tuple3D::zero(), 1.0, Material::ivory());
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, 1.0));

    assert_eq!(ray_sphere_intersect(&r, &s), Some(1.0));
}

#[test]
fn sphere_behind_ray() {
    let s = Sphere::new(Tuple3D::new(0.0, 0.0, 5.0), 1.0, Material::ivory());
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    assert_eq!(ray_sphere_intersect(&r, &s), None);
}

#[test]
fn decal_frame_is_orthonormal() {
    for angle in &[0.0, 15.0, 90.0, 200.0] {
        let f = DecalFrame::new(*angle);

        assert!(crate::feq(f.normal.dot(&f.horizontal), 0.0));
        assert!(crate::feq(f.normal.dot(&f.vertical), 0.0));
        assert!(crate::feq(f.vertical.magnitude(), 1.0));
    }

    // Image rows run downwards
    assert_eq!(DecalFrame::new(0.0).vertical, Tuple3D::new(0.0, -1.0, 0.0));
}

#[test]
fn opaque_decal_hit_takes_texel_color() {
    let decal = Decal::new(solid_decal(Tuple4D::new(1.0, 0.0, 0.0, 1.0)),
        Tuple3D::new(0.0, 0.0, -5.0));
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    let hit = decal.intersect(&r, 90.0, f64::MAX).unwrap();
    assert!(crate::feq(hit.distance, 5.0));
    assert_eq!(hit.point, Tuple3D::new(0.0, 0.0, -5.0));
    assert_eq!(hit.normal, Tuple3D::new(0.0, 0.0, 1.0));
    assert_eq!(hit.material.diffuse_color, Color::red());
    assert_eq!(hit.material.albedo.x, 1.0);
    assert_eq!(hit.material.albedo.w, 0.0);
}

#[test]
fn decal_normal_faces_the_ray() {
    let decal = Decal::new(solid_decal(Tuple4D::new(1.0, 1.0, 1.0, 1.0)),
        Tuple3D::new(0.0, 0.0, -5.0));
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    // Turned the other way round, the plane normal points away from the eye
    let hit = decal.intersect(&r, 270.0, f64::MAX).unwrap();
    assert_eq!(hit.normal, Tuple3D::new(0.0, 0.0, 1.0));
}

#[test]
fn transparent_decal_is_not_hit() {
    let decal = Decal::new(solid_decal(Tuple4D::new(1.0, 0.0, 0.0, 0.0)),
        Tuple3D::new(0.0, 0.0, -5.0));
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    assert_eq!(decal.intersect(&r, 90.0, f64::MAX), None);
}

#[test]
fn decal_hit_beyond_nearest_is_ignored() {
    let decal = Decal::new(solid_decal(Tuple4D::new(1.0, 0.0, 0.0, 1.0)),
        Tuple3D::new(0.0, 0.0, -5.0));
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));

    assert_eq!(decal.intersect(&r, 90.0, 4.0), None);
}

#[test]
fn ray_beside_decal_misses() {
    let decal = Decal::new(solid_decal(Tuple4D::new(1.0, 0.0, 0.0, 1.0)),
        Tuple3D::new(0.0, 0.0, -5.0));

    // The decal is one unit wide; aim one unit to the side of the anchor
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(1.0, 0.0, -5.0));
    assert_eq!(decal.intersect(&r, 90.0, f64::MAX), None);
}
