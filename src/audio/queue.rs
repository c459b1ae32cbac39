//! Chunk queue — the handoff between the capture callback and the encoder.
//!
//! A thin layer over `std::sync::mpsc` that adds an explicit close protocol:
//! [`ChunkSender::close`] is idempotent and pushes a single terminal sentinel,
//! after which [`ChunkReceiver::dequeue`] drains everything enqueued before
//! the close and then returns `None` forever.  The queue is unbounded so the
//! audio device callback never stalls on a full buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use crate::audio::capture::AudioChunk;

/// Create a connected sender/receiver pair.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        ChunkSender {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        ChunkReceiver { rx, done: false },
    )
}

// ---------------------------------------------------------------------------
// ChunkSender
// ---------------------------------------------------------------------------

/// Producer half.  Cloneable; all clones share the close flag.
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Option<AudioChunk>>,
    closed: Arc<AtomicBool>,
}

impl ChunkSender {
    /// Enqueue a chunk.  Never blocks.  Chunks enqueued after [`close`]
    /// (or after the receiver is gone) are dropped silently — the audio
    /// callback must not panic or stall.
    ///
    /// [`close`]: ChunkSender::close
    pub fn enqueue(&self, chunk: AudioChunk) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Some(chunk));
    }

    /// Signal that no further chunks will be produced.
    ///
    /// Idempotent: only the first call pushes the sentinel, so the consumer
    /// observes it exactly once.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(None);
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkReceiver
// ---------------------------------------------------------------------------

/// Consumer half — single consumer, blocking.
pub struct ChunkReceiver {
    rx: mpsc::Receiver<Option<AudioChunk>>,
    done: bool,
}

impl ChunkReceiver {
    /// Block until the next chunk or the close sentinel.
    ///
    /// Returns chunks in FIFO (enqueue) order; returns `None` once the
    /// sentinel has been observed — or all senders have been dropped — and
    /// keeps returning `None` from then on.
    pub fn dequeue(&mut self) -> Option<AudioChunk> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(Some(chunk)) => Some(chunk),
            Ok(None) | Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn chunk(marker: i16) -> AudioChunk {
        AudioChunk::from_samples(vec![marker; 4], 1)
    }

    #[test]
    fn fifo_order_preserved() {
        let (tx, mut rx) = chunk_channel();
        for i in 0..5 {
            tx.enqueue(chunk(i));
        }
        tx.close();

        for i in 0..5 {
            let c = rx.dequeue().expect("chunk present");
            assert_eq!(c.samples[0], i);
        }
        assert!(rx.dequeue().is_none());
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let (tx, mut rx) = chunk_channel();
        tx.enqueue(chunk(1));
        tx.close();
        tx.close();
        tx.close();

        assert!(rx.dequeue().is_some());
        // Only one sentinel: dequeue returns None repeatedly afterwards
        // without ever surfacing another value.
        assert!(rx.dequeue().is_none());
        assert!(rx.dequeue().is_none());
    }

    #[test]
    fn enqueue_after_close_is_dropped() {
        let (tx, mut rx) = chunk_channel();
        tx.enqueue(chunk(1));
        tx.close();
        tx.enqueue(chunk(2));

        assert_eq!(rx.dequeue().unwrap().samples[0], 1);
        assert!(rx.dequeue().is_none());
    }

    #[test]
    fn clones_share_the_close_flag() {
        let (tx, mut rx) = chunk_channel();
        let tx2 = tx.clone();
        tx.close();
        tx2.enqueue(chunk(9));

        assert!(rx.dequeue().is_none());
    }

    /// Producer-thread shutdown: everything enqueued before the stop signal
    /// is drained by the consumer; the sentinel arrives exactly once.
    #[test]
    fn stop_signal_drains_without_loss() {
        let (tx, mut rx) = chunk_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let producer_stop = stop.clone();
        let producer = thread::spawn(move || {
            let mut produced = 0u32;
            while !producer_stop.load(Ordering::SeqCst) {
                tx.enqueue(chunk(7));
                produced += 1;
                if produced == 100 {
                    // Producer itself requests the stop once enough chunks
                    // are in flight, mimicking the capture loop.
                    producer_stop.store(true, Ordering::SeqCst);
                }
            }
            tx.close();
            produced
        });

        let mut received = 0u32;
        while rx.dequeue().is_some() {
            received += 1;
        }

        let produced = producer.join().expect("producer thread");
        assert_eq!(received, produced);
        assert!(rx.dequeue().is_none());
    }
}
