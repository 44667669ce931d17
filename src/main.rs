use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::thread;
use std::time::{ Duration, Instant };

use anyhow::{ bail, Context, Result };
use clap::Parser;
use log::info;

use tinyrt::camera::Camera;
use tinyrt::consts::{ DECAL_ANGLE, DECAL_ANGLE_SPEED, OUT_FILE, TICK_RATE };
use tinyrt::parallel::{ default_worker_count, render_once, Pipeline };
use tinyrt::reorder::{ FrameResult, FrameSink };
use tinyrt::scene::SceneJson;
use tinyrt::texture::{ DecalImage, EnvironmentMap };
use tinyrt::world::World;

/// Frame rate assumed until the first measurement is in.
const INITIAL_FPS: f64 = 30.0;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Equirectangular environment map (JPEG or PNG)
    #[clap(long, default_value = "envmap.jpg")]
    envmap: PathBuf,

    /// Decal image, with alpha
    #[clap(long, default_value = "logo.png")]
    decal: PathBuf,

    /// Scene description; the built-in scene is used if absent
    #[clap(long)]
    scene: Option<PathBuf>,

    /// Where the single frame is written when not animating
    #[clap(long, default_value = OUT_FILE)]
    output: PathBuf,

    /// Run the frame pipeline instead of rendering a single frame
    #[clap(long)]
    animate: bool,

    /// Number of frames to render when animating
    #[clap(long, default_value_t = 120)]
    frames: u64,

    /// Directory receiving the animated frames as numbered PNGs
    #[clap(long)]
    frames_dir: Option<PathBuf>,

    /// Render threads [default: all but one]
    #[clap(long)]
    threads: Option<usize>,

    /// Camera pitch, in degrees
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    vertical: f64,

    /// Camera yaw, in degrees
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    horizontal: f64,

    /// Initial decal rotation, in degrees
    #[clap(long, default_value_t = DECAL_ANGLE, allow_hyphen_values = true)]
    decal_angle: f64,
}

fn load_world(args: &Args) -> Result<World> {
    let environment = EnvironmentMap::open(&args.envmap).with_context(|| {
        format!("failed to load environment map {}", args.envmap.display())
    })?;
    let decal = DecalImage::open(&args.decal).with_context(|| {
        format!("failed to load decal {}", args.decal.display())
    })?;

    let scene = match &args.scene {
        Some(path) => SceneJson::from_file(path).with_context(|| {
            format!("failed to read scene {}", path.display())
        })?,
        None => SceneJson::default_scene(),
    };

    Ok(scene.build(environment, decal)?)
}

/// Writes one delivered frame as `frame-NNNNN.png`.
fn save_frame(dir: &Path, width: usize, height: usize, frame: &FrameResult)
    -> tinyrt::Result<()> {
    let path = dir.join(format!("frame-{:05}.png", frame.sequence));
    image::save_buffer(path, &frame.pixels, width as u32, height as u32,
        image::ColorType::Rgba8)?;
    Ok(())
}

/// Stands in for the window: counts frames, measures the frame rate and
/// optionally writes every frame to disk.
struct Display {
    width: usize,
    height: usize,
    frames_dir: Option<PathBuf>,

    shown: u64,
    frame_count: u64,
    last_report: Instant,
    fps: f64,

    error: Option<tinyrt::Error>,
}

impl Display {
    fn new(camera: &Camera, frames_dir: Option<PathBuf>) -> Display {
        Display {
            width: camera.hsize,
            height: camera.vsize,
            frames_dir,
            shown: 0,
            frame_count: 0,
            last_report: Instant::now(),
            fps: INITIAL_FPS,
            error: None,
        }
    }

    /// Fails with the first error met while writing frames.
    fn check(&mut self) -> tinyrt::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl FrameSink for Display {
    fn on_frame_ready(&mut self, frame: FrameResult) {
        self.shown += 1;
        self.frame_count += 1;

        if let Some(dir) = &self.frames_dir {
            if self.error.is_none() {
                if let Err(e) = save_frame(dir, self.width, self.height, &frame) {
                    self.error = Some(e);
                }
            }
        }

        let elapsed = self.last_report.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frame_count as f64 / elapsed.as_secs_f64();
            info!("fps: {:.1}", self.fps);

            self.frame_count = 0;
            self.last_report = Instant::now();
        }
    }
}

fn animate(args: &Args, world: World, camera: Camera) -> Result<()> {
    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir).with_context(|| {
            format!("failed to create {}", dir.display())
        })?;
    }

    let workers = args.threads.unwrap_or_else(default_worker_count);
    if workers == 0 {
        bail!("at least one render thread is needed");
    }

    let mut display = Display::new(&camera, args.frames_dir.clone());
    let mut pipeline = Pipeline::new(Arc::new(world), Arc::new(camera), workers);
    let tick = Duration::from_secs_f64(1.0 / TICK_RATE);

    let started = Instant::now();
    let mut decal_angle = args.decal_angle;
    let mut accepted = 0;
    let mut dropped = 0;

    while accepted < args.frames {
        // Only an accepted request moves the animation forward.
        if pipeline.submit(args.vertical, args.horizontal, decal_angle) {
            accepted += 1;
            decal_angle = (decal_angle + DECAL_ANGLE_SPEED / display.fps.max(1.0))
                % 360.0;
        } else {
            dropped += 1;
        }

        pipeline.check();
        pipeline.drain(&mut display);
        display.check()?;
        thread::sleep(tick);
    }

    // Wait for the requests still in flight.
    while display.shown + (pipeline.buffered() as u64) < accepted {
        pipeline.check();
        pipeline.drain(&mut display);
        display.check()?;
        thread::sleep(tick);
    }

    let frames = pipeline.shutdown();
    frames.flush(&mut display);
    display.check()?;

    info!("showed {} frames in {:.2?} ({} requests dropped)",
        display.shown, started.elapsed(), dropped);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let world = load_world(&args)?;
    let camera = Camera::default();

    if args.animate {
        return animate(&args, world, camera);
    }

    let started = Instant::now();
    let canvas = render_once(&world, &camera, args.vertical, args.horizontal,
        args.decal_angle);
    canvas.save(&args.output).with_context(|| {
        format!("failed to write {}", args.output.display())
    })?;

    info!("rendered {} in {:.2?}", args.output.display(), started.elapsed());
    Ok(())
}
