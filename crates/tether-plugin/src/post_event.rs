//! Per-plugin post-event buffer.
//!
//! Plugin code running on audio or control threads records deferred
//! notifications here; the relay thread takes them out once per cycle.
//! Both sides are lock-free, so a producer never waits on relay processing.

use crossbeam::queue::ArrayQueue;
use smallvec::SmallVec;

pub const MAX_POST_EVENTS: usize = 152;

const SNAPSHOT_STACK_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostEventKind {
    Debug,
    ParameterChange,
    ProgramChange,
    MidiProgramChange,
    /// `index` is the note, `value` the velocity.
    NoteOn,
    /// `index` is the note.
    NoteOff,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostEvent {
    pub kind: PostEventKind,
    pub index: i32,
    pub value: f64,
}

pub type PostEventVec = SmallVec<[PostEvent; SNAPSHOT_STACK_CAPACITY]>;

pub struct PostEventBuffer {
    queue: ArrayQueue<PostEvent>,
}

impl PostEventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Record an event. Returns false (and drops the event) when the buffer is full.
    pub fn post(&self, kind: PostEventKind, index: i32, value: f64) -> bool {
        self.queue.push(PostEvent { kind, index, value }).is_ok()
    }

    /// Take every event pending at the time of the call, oldest first.
    ///
    /// Events posted while the snapshot is taken are left for the next call.
    pub fn snapshot_and_clear(&self) -> PostEventVec {
        let pending = self.queue.len();
        let mut events = PostEventVec::new();
        for _ in 0..pending {
            match self.queue.pop() {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl Default for PostEventBuffer {
    fn default() -> Self {
        Self::new(MAX_POST_EVENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_preserves_order_and_clears() {
        let buffer = PostEventBuffer::default();
        assert!(buffer.post(PostEventKind::ParameterChange, 0, 0.1));
        assert!(buffer.post(PostEventKind::ProgramChange, 3, 0.0));
        assert!(buffer.post(PostEventKind::NoteOn, 60, 100.0));

        let events = buffer.snapshot_and_clear();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, PostEventKind::ParameterChange);
        assert_eq!(events[1].index, 3);
        assert_eq!(events[2].value, 100.0);
        assert!(buffer.is_empty());
        assert!(buffer.snapshot_and_clear().is_empty());
    }

    #[test]
    fn test_producer_drops_when_full() {
        let buffer = PostEventBuffer::new(2);
        assert!(buffer.post(PostEventKind::Debug, 0, 0.0));
        assert!(buffer.post(PostEventKind::Debug, 1, 0.0));
        assert!(!buffer.post(PostEventKind::Debug, 2, 0.0));

        let events = buffer.snapshot_and_clear();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].index, 1);

        // Space is available again after the snapshot
        assert!(buffer.post(PostEventKind::Debug, 3, 0.0));
    }

    #[test]
    fn test_concurrent_producer_never_loses_accepted_events() {
        use std::sync::Arc;

        let buffer = Arc::new(PostEventBuffer::new(64));
        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                let mut accepted = 0;
                for i in 0..1000 {
                    if buffer.post(PostEventKind::ParameterChange, i, 0.0) {
                        accepted += 1;
                    }
                }
                accepted
            })
        };

        let mut received = 0;
        let mut last_index = -1;
        while !producer.is_finished() || !buffer.is_empty() {
            for event in buffer.snapshot_and_clear() {
                assert!(event.index > last_index);
                last_index = event.index;
                received += 1;
            }
        }

        assert_eq!(received, producer.join().unwrap());
    }
}
