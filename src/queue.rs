use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::mpsc::{ self, Receiver, SyncSender, TrySendError };
use std::sync::{ Mutex, PoisonError };

use log::trace;

/// A request to render one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameRequest {
    /// Camera pitch, in degrees.
    pub vertical: f64,

    /// Camera yaw, in degrees.
    pub horizontal: f64,

    /// Rotation of the decal around the vertical axis, in degrees.
    pub decal_angle: f64,

    /// Position of the frame in display order. Assigned by the queue.
    pub sequence: u64,
}

/// A bounded queue of pending frame requests.
///
/// Producers never block: a request submitted while the queue is full is
/// dropped and `submit` reports it. Workers block in `take` until a request
/// arrives or the queue is closed.
///
/// Sequence numbers are handed out in the order requests are accepted,
/// starting at 0, with no gaps for dropped requests.
pub struct RequestQueue {
    sender: Mutex<Option<(SyncSender<FrameRequest>, u64)>>,
    receiver: Mutex<Receiver<FrameRequest>>,
    closed: AtomicBool,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> RequestQueue {
        // A zero-capacity channel would be a rendezvous, not a queue.
        assert!(capacity > 0);

        let (sender, receiver) = mpsc::sync_channel(capacity);

        RequestQueue {
            sender: Mutex::new(Some((sender, 0))),
            receiver: Mutex::new(receiver),
            closed: AtomicBool::new(false),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offers a request to the queue.
    ///
    /// Returns `false`, without consuming a sequence number, when the queue
    /// is full or closed.
    pub fn submit(&self, vertical: f64, horizontal: f64, decal_angle: f64)
        -> bool {
        let mut guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let (sender, next_sequence) = match guard.as_mut() {
            Some(open) => open,
            None => return false,
        };

        let request = FrameRequest {
            vertical,
            horizontal,
            decal_angle,
            sequence: *next_sequence,
        };

        match sender.try_send(request) {
            Ok(()) => {
                *next_sequence += 1;
                true
            },
            Err(TrySendError::Full(request)) => {
                trace!("queue full, dropping request for frame {}",
                    request.sequence);
                false
            },
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Waits for the next request.
    ///
    /// Returns `None` once the queue has been closed; requests still pending
    /// at that point are discarded.
    pub fn take(&self) -> Option<FrameRequest> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);

        if self.is_closed() {
            return None;
        }

        match receiver.recv() {
            Ok(request) if !self.is_closed() => Some(request),
            _ => None,
        }
    }

    /// Closes the queue, waking every waiting worker.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        // Dropping the sender disconnects the channel, which wakes the
        // worker blocked in `recv`.
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[test]
fn accepts_up_to_capacity() {
    use crate::consts::QUEUE_CAPACITY;

    let q = RequestQueue::new(QUEUE_CAPACITY);
    let accepted = (0..QUEUE_CAPACITY + 1)
        .filter(|_| q.submit(0.0, 0.0, 15.0))
        .count();

    assert_eq!(accepted, QUEUE_CAPACITY);
    assert!(!q.submit(0.0, 0.0, 15.0));
}

#[test]
fn sequences_are_consecutive_despite_drops() {
    let q = RequestQueue::new(2);

    assert!(q.submit(1.0, 0.0, 0.0));
    assert!(q.submit(2.0, 0.0, 0.0));
    assert!(!q.submit(3.0, 0.0, 0.0));

    assert_eq!(q.take().map(|r| (r.sequence, r.vertical)), Some((0, 1.0)));
    assert!(q.submit(4.0, 0.0, 0.0));

    assert_eq!(q.take().map(|r| (r.sequence, r.vertical)), Some((1, 2.0)));
    assert_eq!(q.take().map(|r| (r.sequence, r.vertical)), Some((2, 4.0)));
}

#[test]
fn close_discards_pending_and_rejects_new() {
    let q = RequestQueue::new(4);
    assert!(q.submit(0.0, 0.0, 0.0));

    q.close();

    assert!(q.is_closed());
    assert_eq!(q.take(), None);
    assert!(!q.submit(0.0, 0.0, 0.0));
}

#[test]
fn close_wakes_blocked_worker() {
    use std::sync::Arc;
    use std::thread;

    let q = Arc::new(RequestQueue::new(4));
    let worker = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.take())
    };

    // Whether the worker is already waiting or not, it must see the close
    q.close();
    assert_eq!(worker.join().unwrap(), None);
}
