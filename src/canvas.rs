use std::path::Path;

use image::{ Rgb, RgbImage };

use crate::color::Color;
use crate::error::Result;

/// A canvas for drawing pixels.
///
/// This structure stores the results of the ray tracer. The `Camera` casts
/// one ray per pixel into a `World` and writes the tone mapped color here.
///
/// Pixels are stored as a flat, row-major buffer of 8-bit RGBA values, the
/// layout a display expects; its size is fixed at construction time.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Canvas {
    /// The width of the canvas, in pixels.
    pub width: usize,

    /// The height of the canvas, in pixels.
    pub height: usize,

    /// The pixels of the canvas, four bytes each.
    pixels: Vec<u8>,
}

impl Canvas {
    /// Creates a new, opaque black canvas with specified width and height.
    pub fn new(width: usize, height: usize) -> Canvas {
        let mut pixels = vec![0; width * height * 4];
        for alpha in pixels.iter_mut().skip(3).step_by(4) {
            *alpha = 255;
        }

        Canvas { width, height, pixels }
    }

    /// Writes a color to a location on the `Canvas`.
    ///
    /// The color is tone mapped with `Color::to_rgba8`. Out-of-bounds pixels
    /// are ignored. Pixels are specified in row-column order, where `y` is
    /// the row of the pixel, and `x` is the column.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tinyrt::color::Color;
    /// # use tinyrt::canvas::Canvas;
    /// let purple = Color::rgb(1.0, 0.0, 1.0);
    /// let mut canvas = Canvas::new(8, 8);
    /// canvas.write_pixel(4, 2, &purple);
    /// assert_eq!(canvas.read_pixel(4, 2).unwrap(), [255, 0, 255, 255]);
    /// ```
    pub fn write_pixel(&mut self, x: usize, y: usize, pixel: &Color) {
        // Silently ignore out-of-bounds pixels
        if x >= self.width || y >= self.height {
            return;
        }

        let i = ((y * self.width) + x) * 4;
        self.pixels[i..i + 4].copy_from_slice(&pixel.to_rgba8());
    }

    /// Reads a pixel from a location on the `Canvas`.
    ///
    /// If the specified pixel location is out-of-bounds, `None` is returned.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None
        }

        let i = ((y * self.width) + x) * 4;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }

    /// The raw RGBA buffer, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Converts to an image, dropping the (always opaque) alpha channel.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let i = ((y as usize * self.width) + x as usize) * 4;
            Rgb([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
        })
    }

    /// Saves the canvas to an image file.
    ///
    /// The format is chosen from the file extension (`.jpg`, `.png`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }
}

#[test]
fn new_canvas_is_opaque_black() {
    let c = Canvas::new(3, 2);

    assert_eq!(c.as_bytes().len(), 3 * 2 * 4);
    assert_eq!(c.read_pixel(2, 1), Some([0, 0, 0, 255]));
}

#[test]
fn out_of_bounds_pixels_are_ignored() {
    let mut c = Canvas::new(2, 2);
    c.write_pixel(2, 0, &Color::white());

    assert_eq!(c.read_pixel(2, 0), None);
    assert!(c.as_bytes().chunks(4).all(|px| px == &[0, 0, 0, 255][..]));
}

#[test]
fn pixels_are_row_major() {
    let mut c = Canvas::new(4, 3);
    c.write_pixel(1, 2, &Color::red());

    let i = (2 * 4 + 1) * 4;
    assert_eq!(&c.as_bytes()[i..i + 4], &[255, 0, 0, 255][..]);
}

#[test]
fn save_and_reload_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");

    let mut c = Canvas::new(4, 2);
    c.write_pixel(3, 1, &Color::rgb(0.0, 1.0, 0.0));
    c.save(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (4, 2));
    assert_eq!(img.get_pixel(3, 1), &Rgb([0, 255, 0]));
    assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
}
