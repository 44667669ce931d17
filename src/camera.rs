use crate::canvas::Canvas;
use crate::consts::{ CANVAS_HEIGHT, CANVAS_WIDTH, FIELD_OF_VIEW };
use crate::ray::Ray3D;
use crate::tuple::Tuple3D;
use crate::world::World;

/// An orthonormal camera basis.
///
/// `right` and `up` span the image plane; `forward` points away from the
/// viewer, through the center of the image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewBasis {
    pub right: Tuple3D,
    pub up: Tuple3D,
    pub forward: Tuple3D,
}

impl ViewBasis {
    /// Builds the basis for a pitch of `vertical` and a yaw of `horizontal`
    /// degrees.
    ///
    /// The yaw turns around the vertical axis, then the pitch tilts the
    /// result; at zero angles the camera looks down -z with +y up.
    pub fn new(vertical: f64, horizontal: f64) -> ViewBasis {
        let (sv, cv) = vertical.to_radians().sin_cos();
        let (sh, ch) = horizontal.to_radians().sin_cos();

        ViewBasis {
            right: Tuple3D::new(ch, 0.0, -sh),
            up: Tuple3D::new(sv * sh, cv, sv * ch),
            forward: Tuple3D::new(-cv * sh, sv, -cv * ch),
        }
    }
}

/// A camera record for generating a canvas.
///
/// The camera sits at the origin. Its orientation is not part of the record;
/// it is given per frame, so one camera serves every frame of an animation.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// The horizontal size of the resultant canvas.
    pub hsize: usize,

    /// The vertical size of the resultant canvas.
    pub vsize: usize,

    /// The angle describing "how much" the camera can see, vertically.
    pub field_of_view: f64,
}

impl Default for Camera {
    fn default() -> Camera {
        Camera::new(CANVAS_WIDTH, CANVAS_HEIGHT, FIELD_OF_VIEW)
    }
}

impl Camera {
    pub fn new(hsize: usize, vsize: usize, field_of_view: f64) -> Camera {
        Camera { hsize, vsize, field_of_view }
    }

    /// Distance from the eye to the image plane, in pixel units.
    pub fn focal_length(&self) -> f64 {
        self.vsize as f64 / (2.0 * (self.field_of_view / 2.0).tan())
    }

    pub fn ray_for_pixel(&self, basis: &ViewBasis, px: usize, py: usize)
        -> Ray3D {
        // Offsets from the center of the canvas to the pixel's center
        let xoffset = (px as f64 + 0.5) - self.hsize as f64 / 2.0;
        let yoffset = self.vsize as f64 / 2.0 - (py as f64 + 0.5);

        let direction = basis.right * xoffset
            + basis.up * yoffset
            + basis.forward * self.focal_length();

        Ray3D::new(Tuple3D::zero(), direction)
    }

    /// Renders one frame: one ray per pixel, tone mapped into a canvas.
    pub fn render(&self, w: &World, vertical: f64, horizontal: f64,
        decal_angle: f64) -> Canvas {
        let basis = ViewBasis::new(vertical, horizontal);
        let mut image = Canvas::new(self.hsize, self.vsize);

        for y in 0..self.vsize {
            for x in 0..self.hsize {
                let ray = self.ray_for_pixel(&basis, x, y);
                let color = w.color_at(&ray, decal_angle, 0);
                image.write_pixel(x, y, &color);
            }
        }

        image
    }
}

#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::geometry::{ Decal, Sphere };
#[cfg(test)]
use crate::light::{ Light, Material };
#[cfg(test)]
use crate::texture::{ DecalImage, EnvironmentMap };
#[cfg(test)]
use crate::tuple::Tuple4D;

#[test]
fn basis_at_rest_looks_down_negative_z() {
    let b = ViewBasis::new(0.0, 0.0);

    assert_eq!(b.right, Tuple3D::new(1.0, 0.0, 0.0));
    assert_eq!(b.up, Tuple3D::new(0.0, 1.0, 0.0));
    assert_eq!(b.forward, Tuple3D::new(0.0, 0.0, -1.0));
}

#[test]
fn basis_is_orthonormal() {
    for &(v, h) in &[(10.0, 0.0), (0.0, 75.0), (-30.0, 200.0), (359.0, 1.0)] {
        let b = ViewBasis::new(v, h);

        assert!(crate::feq(b.right.magnitude(), 1.0));
        assert!(crate::feq(b.up.magnitude(), 1.0));
        assert!(crate::feq(b.forward.magnitude(), 1.0));
        assert!(crate::feq(b.right.dot(&b.up), 0.0));
        assert!(crate::feq(b.right.dot(&b.forward), 0.0));
        assert!(crate::feq(b.up.dot(&b.forward), 0.0));
    }
}

#[test]
fn yaw_turns_towards_negative_x() {
    let b = ViewBasis::new(0.0, 90.0);

    assert_eq!(b.forward, Tuple3D::new(-1.0, 0.0, 0.0));
    assert_eq!(b.up, Tuple3D::new(0.0, 1.0, 0.0));
}

#[test]
fn ray_through_center() {
    // An even-sized canvas has no center pixel; use an odd one
    let c = Camera::new(201, 101, std::f64::consts::PI / 2.0);
    let r = c.ray_for_pixel(&ViewBasis::new(0.0, 0.0), 100, 50);

    assert_eq!(r.origin, Tuple3D::zero());
    assert_eq!(r.direction, Tuple3D::new(0.0, 0.0, -1.0));
}

#[test]
fn ray_through_corner() {
    let c = Camera::new(201, 101, std::f64::consts::PI / 2.0);
    let r = c.ray_for_pixel(&ViewBasis::new(0.0, 0.0), 0, 0);

    // With a 90 degree field of view the focal length is half the height
    let e = Tuple3D::new(-100.0, 50.0, -50.5).normalize();
    assert_eq!(r.direction, e);
}

#[cfg(test)]
fn small_world() -> World {
    let decal = DecalImage::new(100, 100,
        vec![Tuple4D::new(0.9, 0.1, 0.1, 0.5); 100 * 100]).unwrap();
    let mut w = World::new(EnvironmentMap::uniform(Color::rgb(0.2, 0.7, 0.8)),
        Decal::new(decal, Tuple3D::new(-4.0, 2.0, -10.0)));

    w.add_sphere(Sphere::new(Tuple3D::new(-3.0, 0.0, -16.0), 2.0,
        Material::ivory()));
    w.add_sphere(Sphere::new(Tuple3D::new(-1.0, -1.5, -12.0), 2.0,
        Material::glass()));
    w.add_sphere(Sphere::new(Tuple3D::new(7.0, 5.0, -18.0), 4.0,
        Material::mirror()));
    w.add_light(Light::new(Tuple3D::new(-20.0, 20.0, 20.0), 1.5));
    w.add_light(Light::new(Tuple3D::new(30.0, 50.0, -25.0), 1.8));
    w
}

#[test]
fn render_is_opaque_and_full_size() {
    let w = small_world();
    let c = Camera::new(32, 24, std::f64::consts::PI / 3.0);

    for &(v, h, d) in &[(0.0, 0.0, 15.0), (45.0, 120.0, 90.0), (359.0, 271.0, 0.0)] {
        let image = c.render(&w, v, h, d);
        let bytes = image.as_bytes();

        assert_eq!(bytes.len(), 32 * 24 * 4);
        assert!(bytes.chunks(4).all(|px| px[3] == 255));
    }
}

#[test]
fn looking_away_shows_environment() {
    let w = small_world();
    let c = Camera::new(8, 6, std::f64::consts::PI / 3.0);

    // Yawed half a turn, the camera looks down +z where nothing is placed
    let image = c.render(&w, 0.0, 180.0, 15.0);
    let sky = Color::rgb(0.2, 0.7, 0.8).to_rgba8();
    assert!(image.as_bytes().chunks(4).all(|px| px == &sky[..]));
}
