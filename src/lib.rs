pub mod consts;
pub mod error;

pub mod tuple;
pub mod ray;
pub mod light;

pub mod geometry;
pub mod intersect;
pub mod texture;
pub mod world;
pub mod camera;

pub mod color;
pub mod canvas;

pub mod queue;
pub mod reorder;
pub mod parallel;

pub mod scene;

pub use error::{ Error, Result };

use consts::FEQ_EPSILON;
pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}
