//! # Block Hand-off Module
//!
//! Moves completed capture blocks from the audio callback to the analysis
//! thread. The slot holds at most one block: publishing while the previous
//! block is still unread evicts it, so the consumer always analyzes the most
//! recently completed block and a slow analysis never builds a backlog.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// One analysis window of mono samples, owned by whoever holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Position of the block in the capture stream, starting at 0
    pub sequence: u64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBlock {
    /// Duration of the block in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f64 / self.sample_rate as f64
        }
    }
}

/// Creates a connected publisher/receiver pair over a one-slot channel.
pub fn block_channel() -> (BlockPublisher, BlockReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let publisher = BlockPublisher {
        tx,
        evict: rx.clone(),
        dropped: 0,
    };
    (publisher, BlockReceiver { rx })
}

/// Producer side, owned by the capture callback.
#[derive(Debug)]
pub struct BlockPublisher {
    tx: Sender<AudioBlock>,
    // Lets the producer pull a stale block back out of a full slot.
    evict: Receiver<AudioBlock>,
    dropped: u64,
}

impl BlockPublisher {
    /// Hands `block` to the consumer, replacing any unread block.
    ///
    /// Returns `true` if a stale block was dropped to make room.
    pub fn publish(&mut self, block: AudioBlock) -> bool {
        let mut block = block;
        let mut replaced = false;
        loop {
            match self.tx.try_send(block) {
                Ok(()) => return replaced,
                Err(TrySendError::Full(returned)) => {
                    if let Ok(stale) = self.evict.try_recv() {
                        self.dropped += 1;
                        replaced = true;
                        log::debug!(
                            "Dropping stale block #{} for #{} (analysis fell behind)",
                            stale.sequence,
                            returned.sequence
                        );
                    }
                    block = returned;
                }
                // Cannot happen while `evict` holds the channel open.
                Err(TrySendError::Disconnected(_)) => return replaced,
            }
        }
    }

    /// Total blocks dropped because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Consumer side, owned by the analysis thread.
#[derive(Debug, Clone)]
pub struct BlockReceiver {
    rx: Receiver<AudioBlock>,
}

impl BlockReceiver {
    /// The underlying channel, for use with `crossbeam_channel::select!`.
    pub fn channel(&self) -> &Receiver<AudioBlock> {
        &self.rx
    }

    /// Takes the pending block, if one is ready.
    pub fn try_take(&self) -> Option<AudioBlock> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next block.
    pub fn take_timeout(&self, timeout: std::time::Duration) -> Option<AudioBlock> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Accumulates device callback buffers into fixed-length blocks.
///
/// Input may be interleaved multi-channel; frames are averaged to mono.
/// Completed blocks are moved out whole, nothing is written into a block
/// after it leaves the assembler.
#[derive(Debug)]
pub struct BlockAssembler {
    block_len: usize,
    sample_rate: u32,
    channels: usize,
    buffer: Vec<f32>,
    next_sequence: u64,
}

impl BlockAssembler {
    /// # Panics
    /// * If `block_len` or `channels` is zero
    pub fn new(block_len: usize, sample_rate: u32, channels: u16) -> Self {
        assert!(block_len > 0, "block length must be positive");
        assert!(channels > 0, "channel count must be positive");
        Self {
            block_len,
            sample_rate,
            channels: channels as usize,
            buffer: Vec::with_capacity(block_len),
            next_sequence: 0,
        }
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Samples collected toward the next block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Appends interleaved `data`, calling `emit` for every completed block.
    ///
    /// A trailing partial frame (fewer than `channels` samples) is ignored.
    pub fn push<F>(&mut self, data: &[f32], mut emit: F)
    where
        F: FnMut(AudioBlock),
    {
        for frame in data.chunks_exact(self.channels) {
            let sample = if self.channels == 1 {
                frame[0]
            } else {
                frame.iter().sum::<f32>() / self.channels as f32
            };
            self.buffer.push(sample);

            if self.buffer.len() == self.block_len {
                let samples =
                    std::mem::replace(&mut self.buffer, Vec::with_capacity(self.block_len));
                emit(AudioBlock {
                    sequence: self.next_sequence,
                    sample_rate: self.sample_rate,
                    samples,
                });
                self.next_sequence += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn block(sequence: u64) -> AudioBlock {
        AudioBlock {
            sequence,
            sample_rate: 44_100,
            samples: vec![sequence as f32; 4],
        }
    }

    #[test]
    fn test_consumer_sees_newest_block() {
        let (mut publisher, receiver) = block_channel();
        assert!(!publisher.publish(block(0)));
        assert!(publisher.publish(block(1)));
        assert!(publisher.publish(block(2)));
        assert_eq!(publisher.dropped(), 2);

        assert_eq!(receiver.try_take().map(|b| b.sequence), Some(2));
        assert!(receiver.try_take().is_none());
    }

    #[test]
    fn test_publish_after_consume_does_not_drop() {
        let (mut publisher, receiver) = block_channel();
        publisher.publish(block(0));
        assert_eq!(receiver.take_timeout(Duration::from_millis(10)).unwrap().sequence, 0);
        assert!(!publisher.publish(block(1)));
        assert_eq!(publisher.dropped(), 0);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (mut publisher, receiver) = block_channel();
        let producer = std::thread::spawn(move || {
            for i in 0..100 {
                publisher.publish(block(i));
            }
        });
        producer.join().unwrap();
        // Only the final block survives an unread burst.
        assert_eq!(receiver.try_take().unwrap().sequence, 99);
    }

    #[test]
    fn test_assembler_splits_into_blocks() {
        let mut assembler = BlockAssembler::new(4, 8_000, 1);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 2.0, 3.0], |b| blocks.push(b));
        assert!(blocks.is_empty());
        assert_eq!(assembler.pending(), 3);

        assembler.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |b| blocks.push(b));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].samples, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(blocks[1].samples, vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!((blocks[0].sequence, blocks[1].sequence), (0, 1));
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn test_assembler_downmixes_interleaved_input() {
        let mut assembler = BlockAssembler::new(2, 48_000, 2);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 0.0, 0.5, 0.5, 9.0], |b| blocks.push(b));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].samples, vec![0.5, 0.5]);
        assert_eq!(blocks[0].sample_rate, 48_000);
    }

    #[test]
    fn test_block_duration() {
        let b = AudioBlock {
            sequence: 0,
            sample_rate: 44_100,
            samples: vec![0.0; 88_200],
        };
        assert_eq!(b.duration(), 2.0);
    }
}
