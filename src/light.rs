use crate::color::Color;
use crate::consts::{ GLASS_RI, VACUUM_RI };
use crate::tuple::{ Tuple3D, Tuple4D };

/// A point light.
///
/// A very simple light source. Provides an intensity and a position where
/// light is produced from. Lights are white; only the intensity varies.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Light {
    pub position: Tuple3D,
    pub intensity: f64,
}

impl Light {
    pub fn new(position: Tuple3D, intensity: f64) -> Light {
        Light { position, intensity }
    }
}

/// A material record.
///
/// The `albedo` weights the four contributions to a shaded point, in order:
/// diffuse, specular, reflection and refraction. The weights do not need to
/// sum to one (the mirror preset has a specular weight of 10).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub refractive_index: f64,
    pub albedo: Tuple4D,
    pub diffuse_color: Color,
    pub specular_exponent: f64,
}

impl Default for Material {
    fn default() -> Material {
        Material {
            refractive_index: VACUUM_RI,
            albedo: Tuple4D::new(1.0, 0.0, 0.0, 0.0),
            diffuse_color: Color::black(),
            specular_exponent: 0.0,
        }
    }
}

impl Material {
    pub fn new(refractive_index: f64, albedo: Tuple4D, diffuse_color: Color,
        specular_exponent: f64) -> Material {
        Material { refractive_index, albedo, diffuse_color, specular_exponent }
    }

    pub fn ivory() -> Material {
        Material::new(VACUUM_RI, Tuple4D::new(0.6, 0.3, 0.1, 0.0),
            Color::rgb(0.4, 0.4, 0.3), 50.0)
    }

    pub fn glass() -> Material {
        Material::new(GLASS_RI, Tuple4D::new(0.0, 0.5, 0.1, 0.8),
            Color::rgb(0.6, 0.7, 0.8), 125.0)
    }

    pub fn red_rubber() -> Material {
        Material::new(VACUUM_RI, Tuple4D::new(0.9, 0.1, 0.0, 0.0),
            Color::rgb(0.3, 0.1, 0.1), 10.0)
    }

    pub fn mirror() -> Material {
        Material::new(VACUUM_RI, Tuple4D::new(0.0, 10.0, 0.8, 0.0),
            Color::rgb(1.0, 1.0, 1.0), 1425.0)
    }

    /// The base material of the decal, before a texel is applied.
    pub fn decal() -> Material {
        Material::new(VACUUM_RI, Tuple4D::new(1.0, 0.0, 0.0, 0.0),
            Color::rgb(0.1, 0.1, 0.3), 10.0)
    }

    /// Looks up a named preset, as used by scene descriptions.
    pub fn preset(name: &str) -> Option<Material> {
        match name {
            "ivory" => Some(Material::ivory()),
            "glass" => Some(Material::glass()),
            "red_rubber" => Some(Material::red_rubber()),
            "mirror" => Some(Material::mirror()),
            "decal" => Some(Material::decal()),
            _ => None,
        }
    }

    /// Derives the material of a decal hit from a texel.
    ///
    /// The texel replaces the diffuse color, and its alpha splits the weight
    /// between the diffuse term and full transparency.
    pub fn with_texel(&self, texel: Tuple4D) -> Material {
        let mut m = *self;
        m.diffuse_color = Color::rgb(texel.x, texel.y, texel.z);
        m.albedo.x = texel.w;
        m.albedo.w = 1.0 - texel.w;
        m
    }
}

#[test]
fn presets_by_name() {
    assert_eq!(Material::preset("ivory"), Some(Material::ivory()));
    assert_eq!(Material::preset("mirror").unwrap().specular_exponent, 1425.0);
    assert_eq!(Material::preset("velvet"), None);
}

#[test]
fn texel_overrides_diffuse_and_transparency() {
    let base = Material::decal();
    let m = base.with_texel(Tuple4D::new(0.2, 0.4, 0.6, 0.25));

    assert_eq!(m.diffuse_color, Color::rgb(0.2, 0.4, 0.6));
    assert_eq!(m.albedo, Tuple4D::new(0.25, 0.0, 0.0, 0.75));
    assert_eq!(m.specular_exponent, base.specular_exponent);

    // The base material is left untouched
    assert_eq!(base.diffuse_color, Color::rgb(0.1, 0.1, 0.3));
}
