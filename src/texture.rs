use std::f64::consts::PI;
use std::path::Path;

use image::{ RgbImage, RgbaImage };

use crate::color::Color;
use crate::consts::DECAL_DPI;
use crate::error::{ Error, Result };
use crate::tuple::{ Tuple3D, Tuple4D };

/// A spherical environment map.
///
/// Rays which escape the scene sample this map by direction: the azimuth
/// around the vertical axis selects the column, the inclination from the
/// vertical axis selects the row.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentMap {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl EnvironmentMap {
    /// Creates an environment map from row-major samples.
    pub fn new(width: usize, height: usize, pixels: Vec<Color>)
        -> Result<EnvironmentMap> {
        check_size("environment map", width, height, pixels.len())?;
        Ok(EnvironmentMap { width, height, pixels })
    }

    /// Creates a map of a single color.
    pub fn uniform(color: Color) -> EnvironmentMap {
        EnvironmentMap { width: 1, height: 1, pixels: vec![color] }
    }

    /// Loads an environment map from an image file (JPEG, PNG).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<EnvironmentMap> {
        let img = image::open(path)?.to_rgb8();
        EnvironmentMap::from_image(&img)
    }

    pub fn from_image(img: &RgbImage) -> Result<EnvironmentMap> {
        let pixels = img.pixels()
            .map(|p| Color::from_rgb8(p[0], p[1], p[2]))
            .collect();

        EnvironmentMap::new(img.width() as usize, img.height() as usize, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reads the texel at column `x`, row `y`.
    pub fn texel(&self, x: usize, y: usize) -> Color {
        self.pixels[x + y * self.width]
    }

    /// Maps a unit direction to the texel coordinates it samples.
    ///
    /// Coordinates are clamped to the bounds of the map.
    pub fn coordinates(&self, dir: Tuple3D) -> (usize, usize) {
        let u = (dir.z.atan2(dir.x) / (2.0 * PI) + 0.5) * self.width as f64;
        let v = dir.y.clamp(-1.0, 1.0).acos() / PI * self.height as f64;

        let x = (u as i64).clamp(0, self.width as i64 - 1) as usize;
        let y = (v as i64).clamp(0, self.height as i64 - 1) as usize;
        (x, y)
    }

    /// Samples the map in a unit direction.
    pub fn sample(&self, dir: Tuple3D) -> Color {
        let (x, y) = self.coordinates(dir);
        self.texel(x, y)
    }
}

/// A decal image: colors with alpha.
///
/// The decal is printed at a fixed density of `DECAL_DPI` pixels per world
/// unit, which determines its physical size in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct DecalImage {
    width: usize,
    height: usize,
    pixels: Vec<Tuple4D>,
}

impl DecalImage {
    pub fn new(width: usize, height: usize, pixels: Vec<Tuple4D>)
        -> Result<DecalImage> {
        check_size("decal", width, height, pixels.len())?;
        Ok(DecalImage { width, height, pixels })
    }

    /// Loads a decal from an image file; the alpha channel is kept.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DecalImage> {
        let img = image::open(path)?.to_rgba8();
        DecalImage::from_image(&img)
    }

    pub fn from_image(img: &RgbaImage) -> Result<DecalImage> {
        let pixels = img.pixels()
            .map(|p| Tuple4D::new(p[0] as f64, p[1] as f64, p[2] as f64,
                p[3] as f64) * (1.0 / 255.0))
            .collect();

        DecalImage::new(img.width() as usize, img.height() as usize, pixels)
    }

    /// Width of the decal in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the decal in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of the decal in world units.
    pub fn world_width(&self) -> f64 {
        self.width as f64 / DECAL_DPI
    }

    /// Height of the decal in world units.
    pub fn world_height(&self) -> f64 {
        self.height as f64 / DECAL_DPI
    }

    pub fn texel(&self, x: usize, y: usize) -> Tuple4D {
        self.pixels[x + y * self.width]
    }
}

fn check_size(what: &'static str, width: usize, height: usize, actual: usize)
    -> Result<()> {
    if width == 0 || height == 0 || actual == 0 {
        return Err(Error::EmptyMap { what });
    }

    if width * height != actual {
        return Err(Error::MapSize { what, width, height, actual });
    }

    Ok(())
}

/// A map where every texel is unique: red encodes the column, green the row.
#[cfg(test)]
pub fn gradient_map(width: usize, height: usize) -> EnvironmentMap {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            pixels.push(Color::rgb(x as f64 / width as f64,
                y as f64 / height as f64, 0.5));
        }
    }

    EnvironmentMap::new(width, height, pixels).unwrap()
}

#[test]
fn reject_empty_map() {
    let err = EnvironmentMap::new(0, 4, Vec::new()).unwrap_err();
    assert!(matches!(err, Error::EmptyMap { .. }));
}

#[test]
fn reject_mis_sized_decal() {
    let err = DecalImage::new(2, 2, vec![Tuple4D::default(); 3]).unwrap_err();
    assert!(matches!(err, Error::MapSize { actual: 3, .. }));
}

#[test]
fn sample_along_axes() {
    let map = gradient_map(8, 4);

    // atan2(0, 1) = 0 lands mid-row; acos(0) lands mid-column
    assert_eq!(map.coordinates(Tuple3D::new(1.0, 0.0, 0.0)), (4, 2));
    assert_eq!(map.sample(Tuple3D::new(1.0, 0.0, 0.0)), map.texel(4, 2));

    // Straight up is the top row
    assert_eq!(map.coordinates(Tuple3D::new(0.0, 1.0, 0.0)), (4, 0));

    // Straight down and the seam behind are clamped into the map
    assert_eq!(map.coordinates(Tuple3D::new(0.0, -1.0, 0.0)), (4, 3));
    assert_eq!(map.coordinates(Tuple3D::new(-1.0, 0.0, 0.0)), (7, 2));

    // A quarter turn towards +z
    assert_eq!(map.coordinates(Tuple3D::new(0.0, 0.0, 1.0)), (6, 2));
}

#[test]
fn decal_physical_size() {
    let decal = DecalImage::new(200, 50,
        vec![Tuple4D::default(); 200 * 50]).unwrap();

    assert_eq!((decal.width(), decal.height()), (200, 50));
    assert_eq!(decal.world_width(), 2.0);
    assert_eq!(decal.world_height(), 0.5);
}

#[test]
fn dimensions_follow_the_pixels() {
    let map = EnvironmentMap::from_image(&RgbImage::new(6, 3)).unwrap();
    assert_eq!((map.width(), map.height()), (6, 3));
    assert_eq!(map.coordinates(Tuple3D::new(0.0, -1.0, 0.0)), (3, 2));

    let uniform = EnvironmentMap::uniform(Color::white());
    assert_eq!((uniform.width(), uniform.height()), (1, 1));
}

#[test]
fn decal_from_image_keeps_alpha() {
    let mut img = RgbaImage::new(2, 1);
    img.put_pixel(1, 0, image::Rgba([255, 0, 0, 51]));
    let decal = DecalImage::from_image(&img).unwrap();

    assert_eq!(decal.texel(0, 0), Tuple4D::new(0.0, 0.0, 0.0, 0.0));
    assert_eq!(decal.texel(1, 0), Tuple4D::new(1.0, 0.0, 0.0, 0.2));
}
