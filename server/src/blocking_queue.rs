//! A bounded blocking FIFO with a "peer closed" sentinel.
//!
//! Grounded in `original_source/server/blocking_queue.h`'s
//! `BlockingMessageQueue`: a mutex + condvar guarded `VecDeque`, plus a
//! `closed` flag. `pop` blocks until an item is available or the queue is
//! closed and drained, at which point it reports closure instead of
//! blocking forever.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, PartialEq, Eq)]
pub enum PopError {
    /// The queue was closed and had no more buffered items.
    Closed,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Cloneable handle to a shared blocking queue. Used both for the
/// process-wide broadcast queue and for each session's per-client send
/// queue.
pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(BlockingQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            condvar: Condvar::new(),
        })
    }

    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.items.push_back(item);
        self.condvar.notify_one();
    }

    /// Blocks until an item is available, or returns `Closed` once the queue
    /// is closed and empty.
    pub fn pop(&self) -> Result<T, PopError> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Ok(item);
            }
            if inner.closed {
                return Err(PopError::Closed);
            }
            inner = self.condvar.wait(inner).unwrap();
        }
    }

    /// Wakes any blocked `pop` with `Closed` once buffered items are
    /// drained.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// A point-in-time copy of the buffered items, oldest first. Used to
    /// seed a new session's send queue from the past-messages log.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().unwrap().items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pop_returns_pushed_items_in_order() {
        let q: Arc<BlockingQueue<i32>> = BlockingQueue::new();
        q.push(1);
        q.push(2);
        assert_eq!(q.pop().unwrap(), 1);
        assert_eq!(q.pop().unwrap(), 2);
    }

    #[test]
    fn pop_blocks_until_push() {
        let q: Arc<BlockingQueue<i32>> = BlockingQueue::new();
        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || q2.pop().unwrap());
        thread::sleep(Duration::from_millis(20));
        q.push(42);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn closed_and_drained_queue_reports_closed() {
        let q: Arc<BlockingQueue<i32>> = BlockingQueue::new();
        q.push(1);
        q.close();
        assert_eq!(q.pop().unwrap(), 1);
        assert_eq!(q.pop(), Err(PopError::Closed));
    }

    #[test]
    fn push_after_close_is_ignored() {
        let q: Arc<BlockingQueue<i32>> = BlockingQueue::new();
        q.close();
        q.push(1);
        assert_eq!(q.pop(), Err(PopError::Closed));
    }
}
