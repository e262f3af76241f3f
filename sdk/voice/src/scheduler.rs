//! Gapless playback scheduling.
//!
//! A `next_play_time` cursor advances by each buffer's duration so chunks
//! butt up against each other exactly; sources are tracked in a live set so
//! the session can tell when everything scheduled has finished.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use blitsum_core::AudioOutput;
use tokio::sync::mpsc;
use tracing::trace;

use crate::audio;

/// Minimum lead time before a freshly arrived chunk may start.
const MIN_LEAD_SECS: f64 = 0.05;

pub struct GaplessScheduler {
    output: Arc<dyn AudioOutput>,
    sample_rate: u32,
    next_play_time: f64,
    header_latched: bool,
    active: Arc<Mutex<HashSet<u64>>>,
    /// Fires every time the active set becomes empty.
    drained_tx: mpsc::UnboundedSender<()>,
}

impl GaplessScheduler {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        sample_rate: u32,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (drained_tx, drained_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_play_time: output.now(),
            output,
            sample_rate,
            header_latched: false,
            active: Arc::new(Mutex::new(HashSet::new())),
            drained_tx,
        };
        (scheduler, drained_rx)
    }

    /// Decode one raw chunk and schedule it flush against the previous one.
    /// The first chunk of each stream is checked for a RIFF header.
    pub fn push_chunk(&mut self, bytes: &[u8]) {
        let payload = if !self.header_latched {
            self.header_latched = true;
            audio::strip_riff_header(bytes)
        } else {
            bytes
        };
        if payload.is_empty() {
            return;
        }

        let buffer = audio::decode_pcm16le(payload, self.sample_rate);
        let duration = buffer.duration_secs();
        let at = self.next_play_time.max(self.output.now() + MIN_LEAD_SECS);
        self.next_play_time = at + duration;

        let source = self.output.schedule(buffer, at);
        trace!(id = source.id, at, duration, "chunk scheduled");
        self.active.lock().unwrap().insert(source.id);

        let active = self.active.clone();
        let drained = self.drained_tx.clone();
        let id = source.id;
        tokio::spawn(async move {
            // Either resolution or sender drop means the source ended.
            let _ = source.done.await;
            let empty = {
                let mut active = active.lock().unwrap();
                active.remove(&id);
                active.is_empty()
            };
            if empty {
                let _ = drained.send(());
            }
        });
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    /// Stop everything now: silence all sources, clear the set, reset the
    /// cursor to the current clock and re-arm the header latch.
    pub fn flush(&mut self) {
        self.output.stop_all();
        self.active.lock().unwrap().clear();
        self.next_play_time = self.output.now();
        self.header_latched = false;
    }

    /// Re-arm the header latch for a new stream without stopping playback.
    pub fn begin_stream(&mut self) {
        self.header_latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullAudio;

    fn pcm_chunk(samples: usize) -> Vec<u8> {
        vec![0u8; samples * 2]
    }

    #[tokio::test]
    async fn cursor_advances_gaplessly() {
        let output = Arc::new(NullAudio::new());
        let (mut scheduler, _drained) = GaplessScheduler::new(output.clone(), 44_100);

        scheduler.push_chunk(&pcm_chunk(44_100)); // 1 s
        scheduler.push_chunk(&pcm_chunk(22_050)); // 0.5 s

        let starts = output.scheduled_starts();
        assert_eq!(starts.len(), 2);
        // Second buffer starts exactly when the first ends.
        assert!((starts[1] - (starts[0] + 1.0)).abs() < 1e-9);
        assert_eq!(scheduler.active_count(), 2);
    }

    #[tokio::test]
    async fn first_chunk_header_stripped_once() {
        let output = Arc::new(NullAudio::new());
        let (mut scheduler, _drained) = GaplessScheduler::new(output.clone(), 44_100);

        let mut first = vec![0u8; crate::audio::WAV_HEADER_LEN];
        first[..4].copy_from_slice(b"RIFF");
        first[8..12].copy_from_slice(b"WAVE");
        first.extend_from_slice(&pcm_chunk(100));

        scheduler.push_chunk(&first);
        scheduler.push_chunk(&pcm_chunk(100));

        let lengths = output.scheduled_sample_counts();
        assert_eq!(lengths, vec![100, 100]);
    }

    #[tokio::test]
    async fn flush_clears_sources_and_resets_latch() {
        let output = Arc::new(NullAudio::new());
        let (mut scheduler, mut drained) = GaplessScheduler::new(output.clone(), 44_100);

        scheduler.push_chunk(&pcm_chunk(500));
        assert_eq!(scheduler.active_count(), 1);

        scheduler.flush();
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(output.stopped_count(), 1);

        // flush dropped the source senders; the end task fires but the set
        // is already empty, so at most one drain notification arrives.
        tokio::task::yield_now().await;
        let _ = drained.try_recv();
        assert!(drained.try_recv().is_err());
    }

    #[tokio::test]
    async fn drain_fires_when_last_source_ends() {
        let output = Arc::new(NullAudio::new());
        let (mut scheduler, mut drained) = GaplessScheduler::new(output.clone(), 44_100);

        scheduler.push_chunk(&pcm_chunk(10));
        scheduler.push_chunk(&pcm_chunk(10));

        output.finish_all();
        // Let the on-ended tasks run.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(drained.recv().await.is_some());
        assert_eq!(scheduler.active_count(), 0);
    }
}
