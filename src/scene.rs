use std::convert::{ TryFrom, TryInto };
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde::{ Serialize, Deserialize };

use crate::color::Color;
use crate::consts::DECAL_ANCHOR;
use crate::error::{ Error, Result };
use crate::geometry::{ Decal, Sphere };
use crate::light::{ Light, Material };
use crate::texture::{ DecalImage, EnvironmentMap };
use crate::tuple::{ Tuple3D, Tuple4D };
use crate::world::World;

/// A scene description, as read from JSON.
///
/// Only the geometry and the lights are described; the environment map and
/// the decal image are loaded separately and joined in `build`.
///
/// ```json
/// {
///     "spheres": [
///         { "center": [-3, 0, -16], "radius": 2, "material": "ivory" },
///         { "center": [1.5, -0.5, -18], "radius": 3, "material": {
///             "refractive_index": 1.0,
///             "albedo": [0.9, 0.1, 0.0, 0.0],
///             "diffuse_color": [0.3, 0.1, 0.1],
///             "specular_exponent": 10
///         } }
///     ],
///     "lights": [ { "position": [-20, 20, 20], "intensity": 1.5 } ],
///     "decal_anchor": [-4, 2, -10]
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneJson {
    pub spheres: Vec<SphereJson>,
    pub lights: Vec<LightJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decal_anchor: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SphereJson {
    pub center: Vec<f64>,
    pub radius: f64,
    pub material: MaterialJson,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightJson {
    pub position: Vec<f64>,
    pub intensity: f64,
}

/// A material, either by preset name or spelled out.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialJson {
    Preset(String),
    Explicit {
        refractive_index: f64,
        albedo: Vec<f64>,
        diffuse_color: Vec<f64>,
        specular_exponent: f64,
    },
}

/// Checks that a JSON vector has exactly `expected` components.
fn components<'a>(field: &'static str, v: &'a [f64], expected: usize)
    -> Result<&'a [f64]> {
    if v.len() != expected {
        return Err(Error::Components { field, expected, actual: v.len() });
    }

    Ok(v)
}

fn point(field: &'static str, v: &[f64]) -> Result<Tuple3D> {
    Ok(Tuple3D::from(components(field, v, 3)?))
}

impl TryFrom<&MaterialJson> for Material {
    type Error = Error;

    fn try_from(material_json: &MaterialJson) -> Result<Material> {
        match material_json {
            MaterialJson::Preset(name) => Material::preset(name)
                .ok_or_else(|| Error::UnknownMaterial(name.clone())),
            MaterialJson::Explicit {
                refractive_index,
                albedo,
                diffuse_color,
                specular_exponent
            } => {
                let a = components("albedo", albedo, 4)?;
                let c = components("diffuse_color", diffuse_color, 3)?;

                Ok(Material::new(
                    *refractive_index,
                    Tuple4D::new(a[0], a[1], a[2], a[3]),
                    Color::from(c),
                    *specular_exponent,
                ))
            }
        }
    }
}

impl TryFrom<&SphereJson> for Sphere {
    type Error = Error;

    fn try_from(sphere_json: &SphereJson) -> Result<Sphere> {
        if !(sphere_json.radius > 0.0) {
            return Err(Error::Radius(sphere_json.radius));
        }

        Ok(Sphere::new(
            point("center", &sphere_json.center)?,
            sphere_json.radius,
            (&sphere_json.material).try_into()?,
        ))
    }
}

impl TryFrom<&LightJson> for Light {
    type Error = Error;

    fn try_from(light_json: &LightJson) -> Result<Light> {
        Ok(Light::new(point("position", &light_json.position)?,
            light_json.intensity))
    }
}

impl FromStr for SceneJson {
    type Err = Error;

    fn from_str(s: &str) -> Result<SceneJson> {
        Ok(serde_json::from_str(s)?)
    }
}

impl SceneJson {
    /// Reads a scene description from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SceneJson> {
        fs::read_to_string(path)?.parse()
    }

    /// The built-in scene: three spheres, three lights and the decal.
    pub fn default_scene() -> SceneJson {
        let sphere = |center: [f64; 3], radius: f64, preset: &str| SphereJson {
            center: center.to_vec(),
            radius,
            material: MaterialJson::Preset(preset.to_string()),
        };
        let light = |position: [f64; 3], intensity: f64| LightJson {
            position: position.to_vec(),
            intensity,
        };

        SceneJson {
            spheres: vec![
                sphere([-3.0, 0.0, -16.0], 2.0, "ivory"),
                sphere([1.5, -0.5, -18.0], 3.0, "red_rubber"),
                sphere([7.0, 5.0, -18.0], 4.0, "mirror"),
            ],
            lights: vec![
                light([-20.0, 20.0, 20.0], 1.5),
                light([30.0, 50.0, -25.0], 1.8),
                light([30.0, 20.0, 30.0], 1.7),
            ],
            decal_anchor: Some(DECAL_ANCHOR.to_vec()),
        }
    }

    /// Builds a world from the description and the loaded maps.
    ///
    /// Fails on the first invalid sphere, light or anchor; nothing is
    /// clamped or guessed.
    pub fn build(&self, environment: EnvironmentMap, decal: DecalImage)
        -> Result<World> {
        let anchor = match &self.decal_anchor {
            Some(v) => point("decal_anchor", v)?,
            None => Tuple3D::from(DECAL_ANCHOR),
        };

        let mut world = World::new(environment, Decal::new(decal, anchor));
        for sphere_json in &self.spheres {
            world.add_sphere(sphere_json.try_into()?);
        }
        for light_json in &self.lights {
            world.add_light(light_json.try_into()?);
        }

        info!("built scene with {} spheres and {} lights",
            world.spheres.len(), world.lights.len());
        Ok(world)
    }
}

#[cfg(test)]
fn maps() -> (EnvironmentMap, DecalImage) {
    let decal = DecalImage::new(2, 2, vec![Tuple4D::new(1.0, 1.0, 1.0, 1.0); 4])
        .unwrap();
    (EnvironmentMap::uniform(Color::white()), decal)
}

#[test]
fn default_scene_builds() {
    let (env, decal) = maps();
    let w = SceneJson::default_scene().build(env, decal).unwrap();

    assert_eq!(w.spheres.len(), 3);
    assert_eq!(w.lights.len(), 3);
    assert_eq!(w.spheres[1].material, Material::red_rubber());
    assert_eq!(w.spheres[2].radius, 4.0);
    assert_eq!(w.lights[2].position, Tuple3D::new(30.0, 20.0, 30.0));
    assert_eq!(w.decal.anchor, Tuple3D::new(-4.0, 2.0, -10.0));
}

#[test]
fn parse_presets_and_explicit_materials() {
    let json = r#"{
        "spheres": [
            { "center": [0, 0, -5], "radius": 1, "material": "glass" },
            { "center": [1, 2, 3], "radius": 0.5, "material": {
                "refractive_index": 1.3,
                "albedo": [0.5, 0.5, 0.0, 0.0],
                "diffuse_color": [0.1, 0.2, 0.3],
                "specular_exponent": 7
            } }
        ],
        "lights": [ { "position": [0, 10, 0], "intensity": 2 } ],
        "decal_anchor": [0, 0, -20]
    }"#;

    let (env, decal) = maps();
    let w = json.parse::<SceneJson>().unwrap().build(env, decal).unwrap();

    assert_eq!(w.spheres[0].material, Material::glass());
    assert_eq!(w.spheres[1].material, Material::new(1.3,
        Tuple4D::new(0.5, 0.5, 0.0, 0.0), Color::rgb(0.1, 0.2, 0.3), 7.0));
    assert_eq!(w.lights[0].intensity, 2.0);
    assert_eq!(w.decal.anchor, Tuple3D::new(0.0, 0.0, -20.0));
}

#[test]
fn missing_anchor_uses_default() {
    let json = r#"{ "spheres": [], "lights": [] }"#;
    let (env, decal) = maps();
    let w = json.parse::<SceneJson>().unwrap().build(env, decal).unwrap();

    assert!(w.spheres.is_empty());
    assert_eq!(w.decal.anchor, Tuple3D::from(DECAL_ANCHOR));
}

#[test]
fn unknown_preset_is_rejected() {
    let json = r#"{
        "spheres": [ { "center": [0, 0, -5], "radius": 1, "material": "velvet" } ],
        "lights": []
    }"#;

    let (env, decal) = maps();
    let err = json.parse::<SceneJson>().unwrap().build(env, decal).unwrap_err();
    assert!(matches!(err, Error::UnknownMaterial(ref name) if name == "velvet"));
}

#[test]
fn malformed_vectors_are_rejected() {
    let json = r#"{
        "spheres": [],
        "lights": [ { "position": [0, 10], "intensity": 1 } ]
    }"#;

    let (env, decal) = maps();
    let err = json.parse::<SceneJson>().unwrap().build(env, decal).unwrap_err();
    assert!(matches!(err,
        Error::Components { field: "position", expected: 3, actual: 2 }));
}

#[test]
fn non_positive_radius_is_rejected() {
    let mut scene = SceneJson::default_scene();
    scene.spheres[0].radius = 0.0;

    let (env, decal) = maps();
    assert!(matches!(scene.build(env, decal), Err(Error::Radius(_))));
}

#[test]
fn invalid_json_is_an_error() {
    assert!(matches!("{ \"spheres\": ".parse::<SceneJson>(), Err(Error::Json(_))));
}

#[test]
fn read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    fs::write(&path, serde_json::to_string(&SceneJson::default_scene()).unwrap())
        .unwrap();

    let scene = SceneJson::from_file(&path).unwrap();
    assert_eq!(scene.spheres.len(), 3);
    assert_eq!(scene.decal_anchor, Some(DECAL_ANCHOR.to_vec()));

    assert!(matches!(SceneJson::from_file(dir.path().join("missing.json")),
        Err(Error::Io(_))));
}
