use std::cmp::{ Ordering, Reverse };
use std::collections::{ BinaryHeap, HashSet };
use std::sync::{ Mutex, PoisonError };

use log::{ debug, warn };

/// A rendered frame.
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// The sequence number of the request this frame answers.
    pub sequence: u64,

    /// Row-major 8-bit RGBA pixels.
    pub pixels: Vec<u8>,
}

/// Results are ordered by sequence number only.
impl PartialEq for FrameResult {
    fn eq(&self, other: &FrameResult) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for FrameResult {}

impl PartialOrd for FrameResult {
    fn partial_cmp(&self, other: &FrameResult) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameResult {
    fn cmp(&self, other: &FrameResult) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

/// The display side of the pipeline.
///
/// A sink is handed each frame exactly once, in increasing sequence order.
pub trait FrameSink {
    fn on_frame_ready(&mut self, frame: FrameResult);
}

impl<F: FnMut(FrameResult)> FrameSink for F {
    fn on_frame_ready(&mut self, frame: FrameResult) {
        self(frame)
    }
}

struct ReorderState {
    pending: BinaryHeap<Reverse<FrameResult>>,

    // Sequence numbers currently in `pending`
    queued: HashSet<u64>,
    next_sequence: u64,
}

impl ReorderState {
    /// Pops the next frame in order, if it has arrived and `enough` holds
    /// for the current backlog.
    fn pop_next<F: Fn(usize) -> bool>(&mut self, enough: F)
        -> Option<FrameResult> {
        if !enough(self.pending.len()) {
            return None;
        }

        if self.pending.peek()?.0.sequence != self.next_sequence {
            return None;
        }

        let Reverse(frame) = self.pending.pop()?;
        self.queued.remove(&frame.sequence);
        self.next_sequence += 1;
        Some(frame)
    }
}

/// A reorder (jitter) buffer for completed frames.
///
/// Workers `publish` frames in whatever order they finish. The display
/// `drain`s them in strict sequence order: nothing is released until
/// `threshold` frames have accumulated, and a frame that has not arrived yet
/// holds back every frame after it. No frame is delivered twice.
pub struct ReorderBuffer {
    state: Mutex<ReorderState>,
    threshold: usize,
}

impl ReorderBuffer {
    pub fn new(threshold: usize) -> ReorderBuffer {
        ReorderBuffer {
            state: Mutex::new(ReorderState {
                pending: BinaryHeap::new(),
                queued: HashSet::new(),
                next_sequence: 0,
            }),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Stores a completed frame.
    ///
    /// Frames older than the last delivered one are discarded, and so is a
    /// second copy of a frame that is still waiting.
    pub fn publish(&self, frame: FrameResult) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if frame.sequence < state.next_sequence {
            warn!("dropping stale frame {} (next is {})",
                frame.sequence, state.next_sequence);
            return;
        }

        if !state.queued.insert(frame.sequence) {
            warn!("dropping duplicate frame {}", frame.sequence);
            return;
        }

        state.pending.push(Reverse(frame));
    }

    /// Delivers buffered frames to `sink`, in order.
    ///
    /// Below the threshold nothing happens. Otherwise frames are released
    /// while the backlog stays at or above the threshold and the next frame
    /// in sequence is present. Returns the number of frames delivered.
    pub fn drain<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        let threshold = self.threshold;
        self.deliver(sink, |len| len >= threshold)
    }

    /// Delivers every buffered frame that continues the sequence, ignoring
    /// the threshold. Used once the producers have stopped.
    pub fn flush<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        self.deliver(sink, |len| len > 0)
    }

    fn deliver<S, F>(&self, sink: &mut S, enough: F) -> usize
    where
        S: FrameSink + ?Sized,
        F: Fn(usize) -> bool,
    {
        // The sink runs outside the lock so that workers can keep publishing
        // while a frame is being displayed.
        let ready: Vec<FrameResult> = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::iter::from_fn(|| state.pop_next(&enough)).collect()
        };

        let count = ready.len();
        for frame in ready {
            debug!("delivering frame {}", frame.sequence);
            sink.on_frame_ready(frame);
        }

        count
    }

    /// The number of frames waiting to be delivered.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sequence number the display is waiting for.
    pub fn next_sequence(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).next_sequence
    }
}

#[cfg(test)]
fn frame(sequence: u64) -> FrameResult {
    FrameResult { sequence, pixels: vec![sequence as u8; 4] }
}

/// Visits 0..n in a scrambled but deterministic order.
#[cfg(test)]
fn scrambled(n: u64, stride: u64) -> Vec<u64> {
    (0..n).map(|i| (i * stride + 3) % n).collect()
}

#[test]
fn holds_back_below_threshold() {
    let buffer = ReorderBuffer::new(10);
    for s in 0..9 {
        buffer.publish(frame(s));
    }

    let mut seen = Vec::new();
    assert_eq!(buffer.drain(&mut |f: FrameResult| seen.push(f.sequence)), 0);
    assert!(seen.is_empty());
    assert_eq!(buffer.len(), 9);
}

#[test]
fn drains_down_to_threshold() {
    let buffer = ReorderBuffer::new(10);
    for s in 0..15 {
        buffer.publish(frame(s));
    }

    let mut seen = Vec::new();
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));

    // 15 buffered: release until only 9 remain
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(buffer.len(), 9);
    assert_eq!(buffer.next_sequence(), 6);
}

#[test]
fn missing_frame_blocks_later_ones() {
    let buffer = ReorderBuffer::new(3);
    for &s in &[0, 1, 3, 4, 5, 6, 7] {
        buffer.publish(frame(s));
    }

    let mut seen = Vec::new();
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
    assert_eq!(seen, vec![0, 1]);

    // Still stuck on 2, however much piles up behind it
    buffer.publish(frame(8));
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
    assert_eq!(seen, vec![0, 1]);

    buffer.publish(frame(2));
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn scrambled_arrivals_are_delivered_in_order() {
    let n = 64;
    for &stride in &[1, 5, 13, 27] {
        let buffer = ReorderBuffer::new(10);
        let mut seen = Vec::new();

        for s in scrambled(n, stride) {
            buffer.publish(frame(s));
            buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
        }
        buffer.flush(&mut |f: FrameResult| seen.push(f.sequence));

        assert_eq!(seen, (0..n).collect::<Vec<_>>());
        assert!(buffer.is_empty());
    }
}

#[test]
fn duplicates_are_never_delivered() {
    let buffer = ReorderBuffer::new(1);
    let mut seen = Vec::new();

    buffer.publish(frame(0));
    buffer.publish(frame(1));
    buffer.publish(frame(1));
    buffer.flush(&mut |f: FrameResult| seen.push(f.sequence));

    buffer.publish(frame(0));
    buffer.publish(frame(2));
    buffer.flush(&mut |f: FrameResult| seen.push(f.sequence));

    assert_eq!(seen, vec![0, 1, 2]);
    assert!(buffer.is_empty());
}

#[test]
fn waiting_duplicates_do_not_count_towards_threshold() {
    let buffer = ReorderBuffer::new(3);
    buffer.publish(frame(0));
    buffer.publish(frame(1));
    buffer.publish(frame(1));

    // Two distinct frames are below the threshold of three
    assert_eq!(buffer.len(), 2);
    let mut seen = Vec::new();
    assert_eq!(buffer.drain(&mut |f: FrameResult| seen.push(f.sequence)), 0);

    buffer.publish(frame(2));
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
    assert_eq!(seen, vec![0]);
}

#[test]
fn flush_stops_at_gap() {
    let buffer = ReorderBuffer::new(10);
    for &s in &[0, 1, 2, 4] {
        buffer.publish(frame(s));
    }

    let mut seen = Vec::new();
    assert_eq!(buffer.flush(&mut |f: FrameResult| seen.push(f.sequence)), 3);
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(buffer.len(), 1);
}

#[test]
fn concurrent_publishers() {
    use std::sync::Arc;
    use std::thread;

    let buffer = Arc::new(ReorderBuffer::new(10));
    let threads: Vec<_> = (0..4u64).map(|t| {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for s in (t..200).step_by(4) {
                buffer.publish(frame(s));
            }
        })
    }).collect();

    let mut seen = Vec::new();
    for t in threads {
        buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
        t.join().unwrap();
    }
    buffer.drain(&mut |f: FrameResult| seen.push(f.sequence));
    buffer.flush(&mut |f: FrameResult| seen.push(f.sequence));

    assert_eq!(seen, (0..200).collect::<Vec<_>>());
}
