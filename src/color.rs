use std::ops::{ Add, Mul };

use crate::feq;

/// A color.
///
/// Represented conventionally with red-green-blue (RGB) values. Samples read
/// from images range from 0.0 to 1.0 inclusive; shading results may exceed
/// 1.0 until they are tone mapped with `Color::to_rgba8`.
///
/// # Examples
///
/// Construct the color red:
///
/// ```
/// # #![allow(unused)]
/// # use tinyrt::color::Color;
/// let red = Color::red();
/// assert_eq!(red, Color::rgb(1.0, 0.0, 0.0));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialOrd)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Partial equality on two colors.
///
/// Similar to the `PartialEq` implementation on `Tuple3D`, `Color`s are
/// compared component-wise, accounting for possible floating point error in
/// comparisons.
impl PartialEq for Color {
    fn eq(&self, other: &Color) -> bool {
        feq(self.r, other.r) &&
            feq(self.g, other.g) &&
            feq(self.b, other.b)
    }
}

/// Conversion from a slice, as found in scene descriptions.
///
/// Takes the first three elements of the slice, and assigns them to the `r`,
/// `g` and `b` fields of the `Color`, in that order. Missing elements are
/// assigned defaults in place.
impl From<&[f64]> for Color {
    fn from(v: &[f64]) -> Color {
        match v.len() {
            0 => Default::default(),
            1 => Color { r: v[0], ..Default::default() },
            2 => Color { r: v[0], g: v[1], ..Default::default() },
            _ => Color { r: v[0], g: v[1], b: v[2] }
        }
    }
}

impl Color {
    /// Creates a color with red, green and blue values.
    pub fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    /// Creates a color from 8-bit channels, normalised to `[0, 1]`.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Color {
        Color {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// The color black.
    pub fn black() -> Color {
        Color {
            r: 0.0,
            g: 0.0,
            b: 0.0
        }
    }

    /// The color white.
    pub fn white() -> Color {
        Color {
            r: 1.0,
            g: 1.0,
            b: 1.0
        }
    }

    /// The color red.
    pub fn red() -> Color {
        Color {
            r: 1.0,
            g: 0.0,
            b: 0.0
        }
    }

    /// The largest of the three channels.
    pub fn max_component(&self) -> f64 {
        self.r.max(self.g).max(self.b)
    }

    /// Tone maps a shading result to an opaque 8-bit RGBA pixel.
    ///
    /// If any channel exceeds 1.0, all three channels are scaled down by the
    /// largest one so the hue is kept. Channels are then clamped to `[0, 1]`
    /// and quantized; alpha is always 255.
    ///
    /// ```
    /// # use tinyrt::color::Color;
    /// let bright = Color::rgb(2.0, 1.0, 0.0);
    /// assert_eq!(bright.to_rgba8(), [255, 127, 0, 255]);
    /// ```
    pub fn to_rgba8(&self) -> [u8; 4] {
        let max = self.max_component();
        let c = if max > 1.0 { *self * (1.0 / max) } else { *self };

        let quantize = |v: f64| (255.0 * v.clamp(0.0, 1.0)) as u8;
        [quantize(c.r), quantize(c.g), quantize(c.b), 255]
    }
}

/// Adds two colors together.
///
/// Components are added together individually.
impl Add<Color> for Color {
    type Output = Color;

    fn add(self, other: Color) -> Self::Output {
        Color {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
        }
    }
}

/// Multiplies a color by a scalar.
///
/// Each component is multiplied by the scalar.
impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, other: f64) -> Self::Output {
        Color {
            r: self.r * other,
            g: self.g * other,
            b: self.b * other,
        }
    }
}

#[test]
fn add_colors() {
    let c1 = Color::rgb(0.9, 0.6, 0.75);
    let c2 = Color::rgb(0.7, 0.1, 0.25);
    let c3 = Color { r: 1.6, g: 0.7, b: 1.0 };

    assert_eq!(c1 + c2, c3);
}

#[test]
fn multiply_colors() {
    let c1 = Color::rgb(0.2, 0.3, 0.4);
    let c2 = Color { r: 0.4, g: 0.6, b: 0.8 };

    assert_eq!(c1 * 2.0, c2);
}

#[test]
fn from_rgb8_normalises() {
    assert_eq!(Color::from_rgb8(255, 0, 51), Color::rgb(1.0, 0.0, 0.2));
}

#[test]
fn tone_map_in_range_is_quantized() {
    assert_eq!(Color::rgb(0.5, 0.0, 1.0).to_rgba8(), [127, 0, 255, 255]);
}

#[test]
fn tone_map_preserves_hue_when_overexposed() {
    // 4:2:1 stays 4:2:1 after scaling by 1/4
    assert_eq!(Color::rgb(4.0, 2.0, 1.0).to_rgba8(), [255, 127, 63, 255]);
}

#[test]
fn tone_map_clamps_negative_channels() {
    assert_eq!(Color::rgb(-0.5, 0.25, 3.0).to_rgba8(), [0, 21, 255, 255]);
}
