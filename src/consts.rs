// Frame parameters
pub const CANVAS_WIDTH: usize = 512;
pub const CANVAS_HEIGHT: usize = 384;
pub const FIELD_OF_VIEW: f64 = std::f64::consts::PI / 3.0;
pub const OUT_FILE: &'static str = "./out.jpg";

// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

// Offset applied along the normal before casting secondary rays
pub const SURFACE_EPSILON: f64 = 1e-3;

// Maximum recursion depth for reflection and refraction
pub const RECURSION_DEPTH: usize = 4;

// Rays travelling further than this escape to the environment map
pub const FAR_PLANE: f64 = 1000.0;

// Decal parameters
pub const DECAL_DPI: f64 = 100.0;
pub const DECAL_ANGLE: f64 = 15.0;
pub const DECAL_ANCHOR: [f64; 3] = [-4.0, 2.0, -10.0];

// Pipeline parameters
pub const QUEUE_CAPACITY: usize = 20;
pub const REORDER_THRESHOLD: usize = 10;

// Animation parameters
pub const TICK_RATE: f64 = 150.0;
pub const DECAL_ANGLE_SPEED: f64 = 6.0;

// Common refraction indices
pub const VACUUM_RI: f64 = 1.0;
pub const GLASS_RI: f64 = 1.5;
