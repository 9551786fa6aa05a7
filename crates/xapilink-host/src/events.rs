use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use xapilink_codec::DecodedValue;

struct QueueState {
    items: VecDeque<DecodedValue>,
    closed: bool,
}

/// FIFO of decoded events, filled by the reader thread.
///
/// Its lock is independent of the command path: event bursts never block an
/// in-flight command, and vice versa.
pub(crate) struct EventQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, event: DecodedValue) {
        let mut state = self.state.lock().expect("event queue poisoned");
        if state.closed {
            return;
        }
        state.items.push_back(event);
        self.available.notify_one();
    }

    /// Mark the queue closed and wake all waiters. Buffered events remain
    /// poppable.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock().expect("event queue poisoned");
        state.closed = true;
        self.available.notify_all();
    }

    /// Pop the next event, waiting up to `timeout` (forever when `None`).
    /// Returns `None` on timeout, or when the queue is closed and drained.
    pub(crate) fn pop(&self, timeout: Option<Duration>) -> Option<DecodedValue> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock().expect("event queue poisoned");
        loop {
            if let Some(event) = state.items.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let (guard, _) = self
                        .available
                        .wait_timeout(state, deadline - now)
                        .expect("event queue poisoned");
                    state = guard;
                }
                None => {
                    state = self.available.wait(state).expect("event queue poisoned");
                }
            }
        }
    }

    /// Pop the next event without waiting.
    pub(crate) fn try_pop(&self) -> Option<DecodedValue> {
        self.state
            .lock()
            .expect("event queue poisoned")
            .items
            .pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().expect("event queue poisoned").items.len()
    }

    pub(crate) fn stream(
        &self,
        timeout_per_item: Option<Duration>,
        max_total: Option<Duration>,
    ) -> EventStream<'_> {
        EventStream {
            queue: self,
            timeout_per_item,
            deadline: max_total.map(|t| Instant::now() + t),
        }
    }
}

/// Bounded, restartable iterator over queued events.
///
/// Two independent clocks end the stream: `timeout_per_item` bounds the wait
/// for each single event, and `max_total` bounds the whole iteration from
/// the moment the stream was created. Without a per-item wait the stream
/// never blocks: it drains whatever is buffered and stops. The stream also
/// ends when the link closes and the queue is drained.
pub struct EventStream<'a> {
    queue: &'a EventQueue,
    timeout_per_item: Option<Duration>,
    deadline: Option<Instant>,
}

impl Iterator for EventStream<'_> {
    type Item = DecodedValue;

    fn next(&mut self) -> Option<DecodedValue> {
        let remaining = match self.deadline {
            Some(deadline) => Some(deadline.checked_duration_since(Instant::now())?),
            None => None,
        };
        match self.timeout_per_item {
            None => self.queue.try_pop(),
            Some(per_item) => {
                let wait = match remaining {
                    Some(remaining) => per_item.min(remaining),
                    None => per_item,
                };
                self.queue.pop(Some(wait))
            }
        }
    }
}
