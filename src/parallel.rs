use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{ debug, error, info };

use crate::camera::Camera;
use crate::canvas::Canvas;
use crate::consts::{ QUEUE_CAPACITY, REORDER_THRESHOLD };
use crate::queue::RequestQueue;
use crate::reorder::{ FrameResult, FrameSink, ReorderBuffer };
use crate::world::World;

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, world: Arc<World>, camera: Arc<Camera>,
        queue: Arc<RequestQueue>, frames: Arc<ReorderBuffer>) -> Worker {

        let thread = thread::Builder::new()
            .name(format!("render-{}", id))
            .spawn(move || {
                // Obtain requests until the queue is closed.
                while let Some(request) = queue.take() {
                    let started = Instant::now();
                    let canvas = camera.render(&world, request.vertical,
                        request.horizontal, request.decal_angle);

                    debug!("worker {} rendered frame {} in {:?}",
                        id, request.sequence, started.elapsed());

                    frames.publish(FrameResult {
                        sequence: request.sequence,
                        pixels: canvas.into_bytes(),
                    });
                }
            })
            .unwrap_or_else(|e| panic!("failed to spawn worker {}: {}", id, e));

        Worker { id, thread: Some(thread) }
    }
}

/// A fixed set of render threads.
///
/// Every worker loops on the request queue, renders with the shared world
/// and camera, and publishes the frame to the reorder buffer. No lock is held
/// while rendering.
pub struct ThreadPool {
    workers: Vec<Worker>,
    queue: Arc<RequestQueue>,
}

impl ThreadPool {
    pub fn new(size: usize, world: Arc<World>, camera: Arc<Camera>,
        queue: Arc<RequestQueue>, frames: Arc<ReorderBuffer>) -> ThreadPool {
        // There should be at least one thread to run workers.
        assert!(size > 0);

        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            workers.push(Worker::new(
                id,
                Arc::clone(&world),
                Arc::clone(&camera),
                Arc::clone(&queue),
                Arc::clone(&frames),
            ));
        }

        info!("started {} render workers", size);
        ThreadPool { workers, queue }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Re-raises the panic of any worker that has died.
    ///
    /// Workers only stop on their own by panicking, so a finished thread in
    /// a running pool is a dead one. Its frame will never arrive.
    fn check(&mut self) {
        for worker in &mut self.workers {
            let finished = worker.thread.as_ref()
                .map_or(false, |thread| thread.is_finished());
            if !finished {
                continue;
            }

            if let Some(thread) = worker.thread.take() {
                if let Err(payload) = thread.join() {
                    error!("render worker {} panicked", worker.id);
                    panic::resume_unwind(payload);
                }
            }
        }
    }

    /// Closes the queue and waits for every worker to finish its current
    /// frame.
    ///
    /// A worker that panicked takes the process down with it: there is no
    /// way to recover its frame.
    fn join(&mut self) {
        self.queue.close();

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("render worker {} panicked", worker.id);
                    if !thread::panicking() {
                        panic!("render worker {} panicked", worker.id);
                    }
                }
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();
    }
}

/// The number of render workers to use: all hardware threads but the one
/// driving the display, and at least one.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// The interactive render pipeline.
///
/// Requests go into a bounded queue, a pool of workers renders them in
/// parallel, and a reorder buffer hands the frames back in request order.
/// `submit` and `drain` are meant to be called from one control thread.
pub struct Pipeline {
    queue: Arc<RequestQueue>,
    frames: Arc<ReorderBuffer>,
    pool: ThreadPool,
}

impl Pipeline {
    /// Starts a pipeline with the standard queue capacity and reorder
    /// threshold.
    pub fn new(world: Arc<World>, camera: Arc<Camera>, workers: usize)
        -> Pipeline {
        Pipeline::with_limits(world, camera, workers, QUEUE_CAPACITY,
            REORDER_THRESHOLD)
    }

    pub fn with_limits(world: Arc<World>, camera: Arc<Camera>, workers: usize,
        capacity: usize, threshold: usize) -> Pipeline {
        let queue = Arc::new(RequestQueue::new(capacity));
        let frames = Arc::new(ReorderBuffer::new(threshold));
        let pool = ThreadPool::new(workers, world, camera,
            Arc::clone(&queue), Arc::clone(&frames));

        Pipeline { queue, frames, pool }
    }

    /// Requests a frame. Returns `false` if the request was dropped because
    /// the workers are behind.
    pub fn submit(&self, vertical: f64, horizontal: f64, decal_angle: f64)
        -> bool {
        self.queue.submit(vertical, horizontal, decal_angle)
    }

    /// Hands ready frames to the display; see `ReorderBuffer::drain`.
    pub fn drain<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        self.frames.drain(sink)
    }

    /// Frames rendered but not yet delivered.
    pub fn buffered(&self) -> usize {
        self.frames.len()
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Panics if a render worker has panicked.
    ///
    /// The control thread should call this while it waits for frames, since
    /// a dead worker leaves a gap in the sequence that nothing will fill.
    pub fn check(&mut self) {
        self.pool.check();
    }

    /// Stops the workers and returns the reorder buffer.
    ///
    /// Workers finish the frame they are rendering; requests nobody has
    /// picked up yet are discarded. The returned buffer still holds every
    /// completed frame, for a final `flush`.
    pub fn shutdown(self) -> Arc<ReorderBuffer> {
        let Pipeline { queue: _, frames, pool } = self;
        drop(pool);

        info!("render workers stopped");
        frames
    }
}

/// Renders a single frame on the calling thread, bypassing the pipeline.
pub fn render_once(world: &World, camera: &Camera, vertical: f64,
    horizontal: f64, decal_angle: f64) -> Canvas {
    camera.render(world, vertical, horizontal, decal_angle)
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
use crate::tuple::{ Tuple3D, Tuple4D };
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
fn test_world() -> Arc<World> {
    let decal = DecalImage::new(100, 50,
        vec![Tuple4D::new(0.1, 0.8, 0.1, 1.0); 100 * 50]).unwrap();
    let mut w = World::new(EnvironmentMap::uniform(Color::rgb(0.2, 0.7, 0.8)),
        Decal::new(decal, Tuple3D::new(-4.0, 2.0, -10.0)));

    w.add_sphere(Sphere::new(Tuple3D::new(-3.0, 0.0, -16.0), 2.0,
        Material::ivory()));
    w.add_sphere(Sphere::new(Tuple3D::new(7.0, 5.0, -18.0), 4.0,
        Material::mirror()));
    w.add_light(Light::new(Tuple3D::new(-20.0, 20.0, 20.0), 1.5));
    Arc::new(w)
}

#[cfg(test)]
fn test_camera() -> Arc<Camera> {
    Arc::new(Camera::new(16, 12, std::f64::consts::PI / 3.0))
}

/// Drains `pipeline` until `total` frames have either been delivered or are
/// waiting in the buffer.
#[cfg(test)]
fn wait_for_frames(pipeline: &Pipeline, seen: &mut Vec<FrameResult>,
    total: usize) {
    let deadline = Instant::now() + Duration::from_secs(60);
    loop {
        pipeline.drain(&mut |f: FrameResult| seen.push(f));
        if seen.len() + pipeline.buffered() >= total {
            return;
        }

        assert!(Instant::now() < deadline, "frames never completed");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn worker_count_leaves_a_thread_for_display() {
    let n = default_worker_count();
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    assert!(n >= 1);
    assert!(n == 1 || n == available - 1);
}

#[test]
fn render_once_matches_pipeline_frame() {
    let world = test_world();
    let camera = test_camera();
    let expected = render_once(&world, &camera, 5.0, 10.0, 40.0);

    let pipeline = Pipeline::with_limits(Arc::clone(&world),
        Arc::clone(&camera), 2, 4, 1);
    assert!(pipeline.submit(5.0, 10.0, 40.0));

    let mut seen = Vec::new();
    wait_for_frames(&pipeline, &mut seen, 1);
    pipeline.shutdown().flush(&mut |f: FrameResult| seen.push(f));

    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sequence, 0);
    assert_eq!(seen[0].pixels, expected.into_bytes());
}

#[test]
fn frames_arrive_in_request_order() {
    let camera = test_camera();
    let pipeline = Pipeline::new(test_world(), Arc::clone(&camera), 4);

    // Fewer than the queue holds, so nothing is dropped
    let total = 15;
    for i in 0..total {
        assert!(pipeline.submit(0.0, i as f64 * 3.0, 15.0 + i as f64));
    }

    let mut seen = Vec::new();
    wait_for_frames(&pipeline, &mut seen, total);

    // Drain has left fewer than a threshold's worth behind
    pipeline.drain(&mut |f: FrameResult| seen.push(f));
    assert!(pipeline.buffered() < REORDER_THRESHOLD);

    let frames = pipeline.shutdown();
    frames.flush(&mut |f: FrameResult| seen.push(f));

    let order: Vec<u64> = seen.iter().map(|f| f.sequence).collect();
    assert_eq!(order, (0..total as u64).collect::<Vec<_>>());
    assert!(seen.iter().all(|f| f.pixels.len() == 16 * 12 * 4));
}

#[test]
fn full_queue_drops_requests() {
    // One slow worker cannot keep up with a burst
    let camera = Arc::new(Camera::new(64, 48, std::f64::consts::PI / 3.0));
    let pipeline = Pipeline::with_limits(test_world(), camera, 1, 3, 1);

    let accepted = (0..50).filter(|_| pipeline.submit(0.0, 0.0, 15.0)).count();
    assert!(accepted >= 3);
    assert!(accepted < 50);

    let mut seen = Vec::new();
    wait_for_frames(&pipeline, &mut seen, accepted);
    pipeline.shutdown().flush(&mut |f: FrameResult| seen.push(f));

    let order: Vec<u64> = seen.iter().map(|f| f.sequence).collect();
    assert_eq!(order, (0..accepted as u64).collect::<Vec<_>>());
}

#[test]
fn dead_worker_is_reported() {
    // Far too large a canvas to allocate: rendering panics
    let camera = Arc::new(Camera::new(usize::MAX / 8, 2, std::f64::consts::PI / 3.0));
    let mut pipeline = Pipeline::with_limits(test_world(), camera, 1, 4, 1);
    assert!(pipeline.submit(0.0, 0.0, 15.0));

    let deadline = Instant::now() + Duration::from_secs(60);
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        while Instant::now() < deadline {
            pipeline.check();
            thread::sleep(Duration::from_millis(2));
        }
    }));

    assert!(result.is_err(), "worker death went unnoticed");
}

#[test]
fn healthy_workers_pass_check() {
    let mut pipeline = Pipeline::with_limits(test_world(), test_camera(), 2, 4, 1);
    assert!(pipeline.submit(0.0, 0.0, 15.0));

    let mut seen = Vec::new();
    wait_for_frames(&pipeline, &mut seen, 1);
    pipeline.check();
    pipeline.shutdown().flush(&mut |f: FrameResult| seen.push(f));

    assert_eq!(seen.len(), 1);
}

#[test]
fn shutdown_discards_unclaimed_requests() {
    let pipeline = Pipeline::with_limits(test_world(), test_camera(), 1, 20, 1);
    for _ in 0..20 {
        pipeline.submit(0.0, 0.0, 15.0);
    }

    let frames = pipeline.shutdown();
    let mut seen = Vec::new();
    frames.flush(&mut |f: FrameResult| seen.push(f.sequence));

    // Whatever was finished comes out in order, and nothing after that
    assert_eq!(seen, (0..seen.len() as u64).collect::<Vec<_>>());
    assert!(frames.is_empty());
}
