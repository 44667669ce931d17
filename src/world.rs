use crate::color::Color;
use crate::consts::{ FAR_PLANE, RECURSION_DEPTH, VACUUM_RI };
use crate::geometry::{ Decal, Sphere, ray_sphere_intersect };
use crate::intersect::{ Hit, refract };
use crate::light::Light;
use crate::ray::Ray3D;
use crate::texture::EnvironmentMap;
use crate::tuple::Tuple3D;

/// A world with spheres, lights, a decal and an environment map.
///
/// The world is assembled once and then only read. Rendering takes `&self`
/// everywhere, so a single world is shared by every worker thread without
/// locking.
#[derive(Clone, Debug)]
pub struct World {
    pub spheres: Vec<Sphere>,
    pub lights: Vec<Light>,
    pub environment: EnvironmentMap,
    pub decal: Decal,
}

impl World {
    /// Creates a world with no spheres and no lights.
    pub fn new(environment: EnvironmentMap, decal: Decal) -> World {
        World { spheres: Vec::new(), lights: Vec::new(), environment, decal }
    }

    pub fn add_sphere(&mut self, sphere: Sphere) {
        self.spheres.push(sphere);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Finds the nearest surface along a ray.
    ///
    /// Spheres are tested first, in order; on exactly equal distances the
    /// earlier sphere wins. The decal, turned by `decal_angle` degrees, then
    /// replaces the sphere hit if it is strictly closer. Anything at or past
    /// `FAR_PLANE` counts as a miss.
    pub fn intersect(&self, ray: &Ray3D, decal_angle: f64) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;
        let mut distance = f64::MAX;

        for sphere in self.spheres.iter() {
            if let Some(t) = ray_sphere_intersect(ray, sphere) {
                if t < distance {
                    distance = t;
                    let point = ray.position(t);
                    nearest = Some(Hit {
                        point,
                        normal: sphere.normal_at(point),
                        material: sphere.material,
                        distance: t,
                    });
                }
            }
        }

        if let Some(hit) = self.decal.intersect(ray, decal_angle, distance) {
            nearest = Some(hit);
        }

        nearest.filter(|hit| hit.distance < FAR_PLANE)
    }

    /// Determines whether `light` is hidden from a surface point.
    ///
    /// A shadow ray leaves the point (offset off the surface, towards the
    /// light); the light is blocked if anything is hit closer than the light
    /// itself.
    pub fn is_shadowed(&self, hit: &Hit, light: &Light, decal_angle: f64)
        -> bool {
        let to_light = light.position - hit.point;
        let light_distance = to_light.magnitude();
        let light_dir = to_light.normalize();

        let origin = hit.over_point(light_dir);
        let shadow_ray = Ray3D { origin, direction: light_dir };

        match self.intersect(&shadow_ray, decal_angle) {
            Some(blocker) => (blocker.point - origin).magnitude() < light_distance,
            None => false,
        }
    }

    /// Sums the diffuse and specular light intensities reaching a hit.
    ///
    /// Diffuse is Lambertian; specular is Phong, using the material's
    /// exponent. Shadowed lights contribute nothing.
    pub fn light_intensity(&self, hit: &Hit, dir: Tuple3D, decal_angle: f64)
        -> (f64, f64) {
        let mut diffuse = 0.0;
        let mut specular = 0.0;

        for light in self.lights.iter() {
            if self.is_shadowed(hit, light, decal_angle) {
                continue;
            }

            let light_dir = (light.position - hit.point).normalize();
            diffuse += light.intensity * light_dir.dot(&hit.normal).max(0.0);

            let reflect_dot_eye = -(-light_dir).reflect(&hit.normal).dot(&dir);
            specular += reflect_dot_eye.max(0.0)
                .powf(hit.material.specular_exponent) * light.intensity;
        }

        (diffuse, specular)
    }

    /// Determines the color seen along a ray.
    ///
    /// Rays that hit nothing, and rays recursed deeper than
    /// `RECURSION_DEPTH`, take their color from the environment map. Hits are
    /// shaded from four terms weighted by the material albedo: diffuse and
    /// specular light, and the colors seen along the reflected and refracted
    /// rays. The result is not clamped.
    pub fn color_at(&self, ray: &Ray3D, decal_angle: f64, depth: usize)
        -> Color {
        let hit = if depth > RECURSION_DEPTH {
            None
        } else {
            self.intersect(ray, decal_angle)
        };

        let hit = match hit {
            Some(hit) => hit,
            None => return self.environment.sample(ray.direction),
        };

        let m = hit.material;
        let dir = ray.direction;

        let reflected = || {
            let reflect_dir = dir.reflect(&hit.normal).normalize();
            let reflect_ray = Ray3D {
                origin: hit.over_point(reflect_dir),
                direction: reflect_dir,
            };
            self.color_at(&reflect_ray, decal_angle, depth + 1)
        };

        let reflect_color = if m.albedo[2] != 0.0 {
            reflected()
        } else {
            Color::black()
        };

        // Total internal reflection sends the refracted share back along
        // the reflected ray.
        let refract_color = if m.albedo[3] != 0.0 {
            match refract(dir, hit.normal, m.refractive_index, VACUUM_RI) {
                Some(t) => {
                    let refract_dir = t.normalize();
                    let refract_ray = Ray3D {
                        origin: hit.over_point(refract_dir),
                        direction: refract_dir,
                    };
                    self.color_at(&refract_ray, decal_angle, depth + 1)
                },
                None if m.albedo[2] != 0.0 => reflect_color,
                None => reflected(),
            }
        } else {
            Color::black()
        };

        let (diffuse, specular) = self.light_intensity(&hit, dir, decal_angle);

        m.diffuse_color * diffuse * m.albedo[0]
            + Color::white() * specular * m.albedo[1]
            + reflect_color * m.albedo[2]
            + refract_color * m.albedo[3]
    }
}

#[cfg(test)]
use crate::light::Material;
#[cfg(test)]
use crate::texture::{ DecalImage, gradient_map };
#[cfg(test)]
use crate::tuple::Tuple4D;

/// A decal that no ray can hit, placed far outside the test scenes.
#[cfg(test)]
fn hidden_decal() -> Decal {
    let image = DecalImage::new(1, 1, vec![Tuple4D::default()]).unwrap();
    Decal::new(image, Tuple3D::new(0.0, 0.0, -500.0))
}

#[cfg(test)]
fn empty_world(environment: EnvironmentMap) -> World {
    World::new(environment, hidden_decal())
}

#[test]
fn ray_towards_ivory_sphere_reports_outward_normal() {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    let center = Tuple3D::new(-3.0, 0.0, -16.0);
    w.add_sphere(Sphere::new(center, 2.0, Material::ivory()));
    w.add_light(Light::new(Tuple3D::new(-20.0, 20.0, 20.0), 1.5));

    let r = Ray3D::new(Tuple3D::zero(), center);
    let hit = w.intersect(&r, 0.0).expect("ray aims at the sphere");

    assert!(crate::feq(hit.normal.magnitude(), 1.0));
    assert!(crate::feq((hit.point - center).dot(&hit.normal), 2.0));
    assert!(hit.normal.dot(&r.direction) < 0.0);
    assert_eq!(hit.material, Material::ivory());
}

#[test]
fn nearest_sphere_wins() {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -20.0), 1.0,
        Material::red_rubber()));
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -10.0), 1.0,
        Material::ivory()));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    let hit = w.intersect(&r, 0.0).unwrap();

    assert!(crate::feq(hit.distance, 9.0));
    assert_eq!(hit.material, Material::ivory());
}

#[test]
fn equidistant_spheres_keep_list_order() {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    let center = Tuple3D::new(0.0, 0.0, -10.0);
    w.add_sphere(Sphere::new(center, 1.0, Material::mirror()));
    w.add_sphere(Sphere::new(center, 1.0, Material::ivory()));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    assert_eq!(w.intersect(&r, 0.0).unwrap().material, Material::mirror());
}

#[test]
fn surfaces_past_far_plane_are_missed() {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -2000.0), 10.0,
        Material::ivory()));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    assert_eq!(w.intersect(&r, 0.0), None);
}

#[test]
fn missed_ray_samples_environment() {
    let map = gradient_map(16, 8);
    let mut w = empty_world(map.clone());
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -10.0), 1.0,
        Material::ivory()));

    // Aim along +x, away from the sphere
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(1.0, 0.0, 0.0));
    assert_eq!(w.color_at(&r, 0.0, 0), map.texel(8, 4));

    // A quarter turn towards +z
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, 1.0));
    assert_eq!(w.color_at(&r, 0.0, 0), map.texel(12, 4));
}

#[test]
fn too_deep_ray_samples_environment() {
    let map = gradient_map(16, 8);
    let mut w = empty_world(map.clone());
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -10.0), 1.0,
        Material::ivory()));

    // Aims straight at the sphere, but is past the recursion limit
    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    assert_eq!(w.color_at(&r, 0.0, RECURSION_DEPTH + 1), map.sample(r.direction));
}

#[test]
fn nested_mirrors_stop_at_recursion_limit() {
    let sky = Color::rgb(0.2, 0.4, 0.6);
    let mut w = empty_world(EnvironmentMap::uniform(sky));

    // A half-silvered mirror inside a half-silvered mirror, viewed from the
    // center: every bounce stays inside and halves the light.
    let half_mirror = Material::new(1.0, Tuple4D::new(0.0, 0.0, 0.5, 0.0),
        Color::black(), 0.0);
    w.add_sphere(Sphere::new(Tuple3D::zero(), 10.0, half_mirror));
    w.add_sphere(Sphere::new(Tuple3D::zero(), 5.0, half_mirror));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.3, 0.2, -1.0));
    let c = w.color_at(&r, 0.0, 0);

    // Depths 0 through 4 reflect, depth 5 reads the environment
    let expected = sky * 0.5f64.powi(RECURSION_DEPTH as i32 + 1);
    assert_eq!(c, expected);
}

#[test]
fn perfect_mirror_shows_environment() {
    let sky = Color::rgb(0.2, 0.4, 0.6);
    let mut w = empty_world(EnvironmentMap::uniform(sky));
    let mirror = Material::new(1.0, Tuple4D::new(0.0, 0.0, 1.0, 0.0),
        Color::black(), 0.0);
    w.add_sphere(Sphere::new(Tuple3D::zero(), 5.0, mirror));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    assert_eq!(w.color_at(&r, 0.0, 0), sky);
}

#[test]
fn total_internal_reflection_refracts_the_reflected_color() {
    let sky = Color::rgb(0.2, 0.4, 0.6);

    // From inside a glass sphere, parallel to the axis but well off center,
    // every bounce meets the surface past the critical angle. Had the
    // refracted share been lost, each bounce would dim the sky.
    let r = Ray3D::new(Tuple3D::new(4.5, 0.0, 0.0), Tuple3D::new(0.0, 0.0, -1.0));
    let weights = [
        Tuple4D::new(0.0, 0.0, 0.5, 0.5),
        Tuple4D::new(0.0, 0.0, 0.0, 1.0),
    ];

    for albedo in weights.iter() {
        let mut w = empty_world(EnvironmentMap::uniform(sky));
        let glass = Material::new(1.5, *albedo, Color::black(), 0.0);
        w.add_sphere(Sphere::new(Tuple3D::zero(), 5.0, glass));

        let hit = w.intersect(&r, 0.0).unwrap();
        assert_eq!(refract(r.direction, hit.normal, 1.5, VACUUM_RI), None);
        assert_eq!(w.color_at(&r, 0.0, 0), sky);
    }
}

#[cfg(test)]
fn shadow_world(blocked: bool) -> World {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    let matte = Material::new(1.0, Tuple4D::new(1.0, 1.0, 0.0, 0.0),
        Color::white(), 1.0);

    w.add_sphere(Sphere::new(Tuple3D::zero(), 1.0, matte));
    if blocked {
        w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, 5.0), 1.0, matte));
    }
    w.add_light(Light::new(Tuple3D::new(0.0, 0.0, 10.0), 1.5));
    w
}

#[test]
fn occluded_light_contributes_nothing() {
    let w = shadow_world(true);

    // From between the spheres, look back at the lit side of the first one
    let r = Ray3D::new(Tuple3D::new(0.0, 0.0, 3.0), Tuple3D::new(0.0, 0.0, -1.0));
    let hit = w.intersect(&r, 0.0).unwrap();

    assert!(w.is_shadowed(&hit, &w.lights[0], 0.0));
    assert_eq!(w.light_intensity(&hit, r.direction, 0.0), (0.0, 0.0));
    assert_eq!(w.color_at(&r, 0.0, 0), Color::black());
}

#[test]
fn unoccluded_light_shades_surface() {
    let w = shadow_world(false);

    let r = Ray3D::new(Tuple3D::new(0.0, 0.0, 3.0), Tuple3D::new(0.0, 0.0, -1.0));
    let hit = w.intersect(&r, 0.0).unwrap();

    assert!(!w.is_shadowed(&hit, &w.lights[0], 0.0));

    // Head-on: N.L = 1 and the reflected light runs straight back at the eye
    let (diffuse, specular) = w.light_intensity(&hit, r.direction, 0.0);
    assert!(crate::feq(diffuse, 1.5));
    assert!(crate::feq(specular, 1.5));
    assert_eq!(w.color_at(&r, 0.0, 0), Color::rgb(3.0, 3.0, 3.0));
}

#[test]
fn light_behind_surface_gives_no_diffuse() {
    let mut w = shadow_world(false);
    w.lights[0].position = Tuple3D::new(0.0, 0.0, -10.0);

    let r = Ray3D::new(Tuple3D::new(0.0, 0.0, 3.0), Tuple3D::new(0.0, 0.0, -1.0));
    let hit = w.intersect(&r, 0.0).unwrap();

    // The sphere itself is in the way of its own far side
    assert_eq!(w.light_intensity(&hit, r.direction, 0.0), (0.0, 0.0));
}

#[test]
fn opaque_decal_occludes_spheres_behind_it() {
    let mut w = empty_world(EnvironmentMap::uniform(Color::black()));
    let image = DecalImage::new(100, 100,
        vec![Tuple4D::new(0.0, 1.0, 0.0, 1.0); 100 * 100]).unwrap();
    w.decal = Decal::new(image, Tuple3D::new(0.0, 0.0, -5.0));
    w.add_sphere(Sphere::new(Tuple3D::new(0.0, 0.0, -10.0), 1.0,
        Material::ivory()));

    let r = Ray3D::new(Tuple3D::zero(), Tuple3D::new(0.0, 0.0, -1.0));
    let hit = w.intersect(&r, 90.0).unwrap();
    assert!(crate::feq(hit.distance, 5.0));
    assert_eq!(hit.material.diffuse_color, Color::rgb(0.0, 1.0, 0.0));

    // Turned edge-on, the decal no longer covers the sphere
    let hit = w.intersect(&r, 0.0).unwrap();
    assert!(crate::feq(hit.distance, 9.0));
}
