//! Recorder task owning a packet ring
//!
//! [`RingPacketStore`] is single-threaded by design. The recorder is the
//! synchronization layer around it: one task owns the store, pulls packets
//! from a [`PacketSource`], and answers snapshot requests from any number of
//! [`RecorderHandle`]s. Handles never touch the store directly, so insertion
//! and extraction are serialized without a lock on the insert path.
//!
//! ```rust,no_run
//! use capture_ring::{CaptureConfig, MemorySink, Recorder, packet_channel};
//!
//! # async fn run() -> capture_ring::Result<()> {
//! let (sender, source) = packet_channel(64);
//! let recorder = Recorder::spawn(source, &CaptureConfig::default())?;
//!
//! // Encoder output goes to `sender`...
//! # drop(sender);
//!
//! let mut sink = MemorySink::new();
//! let summary = recorder.save(&mut sink).await?;
//! println!("saved {} packets", summary.packets);
//! # Ok(())
//! # }
//! ```

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::CaptureConfig;
use crate::sink::PacketSink;
use crate::source::PacketSource;
use crate::store::RingPacketStore;
use crate::stream::ThrottleExt;
use crate::types::{BufferStatus, EncodedPacket, UpdateRate};
use crate::{CaptureError, Result};

/// Consecutive source errors tolerated before intake stops.
///
/// Retained history stays available to snapshots afterwards.
const MAX_SOURCE_ERRORS: u32 = 10;

/// Pending requests per recorder.
const COMMAND_BUFFER: usize = 8;

/// Requests served by the owner task.
enum Command {
    Snapshot(oneshot::Sender<Result<Snapshot>>),
}

/// Packets copied out of a ring, starting at a key frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Most recent codec configuration seen by the recorder
    pub codec_config: Option<Arc<[u8]>>,

    /// Packets in presentation order; the first is a key frame
    pub packets: Vec<EncodedPacket>,
}

impl Snapshot {
    /// Newest minus oldest timestamp.
    pub fn span_us(&self) -> i64 {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => last.timestamp_us.saturating_sub(first.timestamp_us),
            _ => 0,
        }
    }

    /// Total payload bytes.
    pub fn payload_bytes(&self) -> usize {
        self.packets.iter().map(EncodedPacket::len).sum()
    }

    /// Write every packet to `sink`, bracketed by `start` and `finish`.
    pub async fn write_to<K>(&self, sink: &mut K) -> Result<SaveSummary>
    where
        K: PacketSink + ?Sized,
    {
        sink.start(self.codec_config.as_deref()).await?;
        for packet in &self.packets {
            sink.write_packet(packet).await?;
        }
        sink.finish().await?;

        let summary = SaveSummary {
            packets: self.packets.len(),
            payload_bytes: self.payload_bytes(),
            span_us: self.span_us(),
        };
        info!(
            packets = summary.packets,
            bytes = summary.payload_bytes,
            span_us = summary.span_us,
            "Saved captured history"
        );
        Ok(summary)
    }
}

/// Outcome of a completed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub packets: usize,
    pub payload_bytes: usize,
    pub span_us: i64,
}

impl SaveSummary {
    pub fn span(&self) -> Duration {
        Duration::from_micros(self.span_us.max(0) as u64)
    }
}

/// Spawns the task that owns a ring
pub struct Recorder;

impl Recorder {
    /// Build a ring for `config` and spawn its owner task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidConfig`] if `config` cannot size a ring.
    pub fn spawn<S>(source: S, config: &CaptureConfig) -> Result<RecorderHandle>
    where
        S: PacketSource,
    {
        let store = RingPacketStore::from_config(config)?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, status_rx) = watch::channel(store.status());
        let cancel = CancellationToken::new();

        let task = RecorderTask {
            store,
            codec_config: None,
            dropped_packets: 0,
            status: status_tx,
        };
        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            task.run(source, command_rx, cancel_task).await;
        });

        info!(
            bit_rate = config.bit_rate,
            frame_rate = config.frame_rate,
            span_secs = config.span_secs,
            "Recorder started"
        );

        Ok(RecorderHandle {
            commands: command_tx,
            status: status_rx,
            frame_rate: f64::from(config.frame_rate),
            cancel,
        })
    }
}

/// Cloneable handle to a running recorder.
///
/// The recorder stops when [`shutdown`](Self::shutdown) is called or when the
/// last handle is dropped.
///
/// Requests are served ahead of packet intake. Many handles issuing snapshots
/// without pause hold back intake until their queue drains, so the source must
/// buffer (a bounded [`packet_channel`](crate::packet_channel) applies
/// backpressure to the encoder meanwhile).
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<BufferStatus>,
    frame_rate: f64,
    cancel: CancellationToken,
}

impl RecorderHandle {
    /// Copy out retained history from the first key frame onward.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NoKeyFrame`] if no key frame is retained yet
    /// - [`CaptureError::Closed`] if the recorder has stopped
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Snapshot(reply)).await.map_err(|_| CaptureError::Closed)?;
        response.await.map_err(|_| CaptureError::Closed)?
    }

    /// Snapshot the ring and write it to `sink`.
    ///
    /// Packets keep flowing into the ring while the sink writes.
    pub async fn save<K>(&self, sink: &mut K) -> Result<SaveSummary>
    where
        K: PacketSink + ?Sized,
    {
        let snapshot = self.snapshot().await?;
        snapshot.write_to(sink).await
    }

    /// Latest buffer status.
    pub fn status(&self) -> BufferStatus {
        *self.status.borrow()
    }

    /// Status updates, starting with the current value.
    ///
    /// Must be called from within a tokio runtime when `rate` throttles.
    pub fn status_updates(&self, rate: UpdateRate) -> BoxStream<'static, BufferStatus> {
        let updates = WatchStream::new(self.status.clone());
        match rate.throttle_interval(self.frame_rate) {
            None => updates.boxed(),
            Some(interval) => updates.throttle(interval).boxed(),
        }
    }

    /// Wait until the status satisfies `predicate`.
    pub async fn wait_for_status<F>(&self, predicate: F) -> Result<BufferStatus>
    where
        F: FnMut(&BufferStatus) -> bool,
    {
        let mut status = self.status.clone();
        let matched = status.wait_for(predicate).await.map_err(|_| CaptureError::Closed)?;
        Ok(*matched)
    }

    /// Stop the recorder. Pending and later requests fail with `Closed`.
    pub fn shutdown(&self) {
        debug!("Recorder shutdown requested");
        self.cancel.cancel();
    }

    /// Whether the owner task is still serving requests.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// State owned by the recorder task.
struct RecorderTask {
    store: RingPacketStore,
    codec_config: Option<Arc<[u8]>>,
    dropped_packets: u64,
    status: watch::Sender<BufferStatus>,
}

impl RecorderTask {
    async fn run<S>(
        mut self,
        mut source: S,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) where
        S: PacketSource,
    {
        info!("Recorder task started");
        let mut intake_open = true;
        let mut error_count = 0u32;

        loop {
            // Cancellation first, then requests, then intake
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Recorder cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => {
                        debug!("All recorder handles dropped");
                        break;
                    }
                },
                result = source.next_packet(), if intake_open => match result {
                    Ok(Some(packet)) => {
                        error_count = 0;
                        self.accept(packet);
                    }
                    Ok(None) => {
                        info!(retained = self.store.len(), "Packet source ended");
                        intake_open = false;
                    }
                    Err(e) => {
                        error_count += 1;
                        warn!(error = %e, error_count, "Packet source error");
                        if error_count >= MAX_SOURCE_ERRORS {
                            error!(
                                retained = self.store.len(),
                                "Too many consecutive source errors, stopping intake"
                            );
                            intake_open = false;
                        }
                    }
                },
            }
        }

        // Requests queued behind the shutdown see `Closed`.
        commands.close();
        info!(retained = self.store.len(), dropped = self.dropped_packets, "Recorder task stopped");
    }

    fn accept(&mut self, packet: EncodedPacket) {
        if packet.flags.is_codec_config() {
            debug!(len = packet.len(), "Captured codec config");
            self.codec_config = Some(packet.data);
            return;
        }
        if packet.is_empty() && packet.flags.is_end_of_stream() {
            debug!(timestamp_us = packet.timestamp_us, "End of stream marker");
            return;
        }

        match self.store.insert(&packet.data, packet.flags, packet.timestamp_us) {
            Ok(()) => trace!(retained = self.store.len(), "Stored packet"),
            Err(e) => {
                self.dropped_packets += 1;
                error!(error = %e, timestamp_us = packet.timestamp_us, "Dropping packet");
            }
        }

        let mut status = self.store.status();
        status.dropped_packets = self.dropped_packets;
        self.status.send_replace(status);
    }

    fn snapshot(&self) -> Result<Snapshot> {
        if self.store.first_key_frame().is_none() {
            warn!(retained = self.store.len(), "No key frame retained, nothing to save");
            return Err(CaptureError::NoKeyFrame);
        }

        let packets: Vec<EncodedPacket> =
            self.store.packets_from_key_frame().map(|view| view.to_packet()).collect();
        debug!(packets = packets.len(), "Snapshot taken");
        Ok(Snapshot { codec_config: self.codec_config.clone(), packets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::sink::MemorySink;
    use crate::source::packet_channel;
    use crate::test_utils::{StreamShape, init_tracing};
    use crate::types::PacketFlags;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn small_config() -> CaptureConfig {
        // 25 000 payload bytes, 60 slots
        CaptureConfig::new(200_000, 30, 1)
    }

    #[tokio::test]
    async fn snapshot_starts_at_key_frame() {
        init_tracing();
        let (tx, source) = packet_channel(16);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        let shape = StreamShape { gop: 4, key_size: 1_000, delta_size: 200, frame_rate: 30 };
        tx.send(EncodedPacket::new(vec![7u8; 10], PacketFlags::NONE, -33_333)).await.unwrap();
        for packet in shape.packets(6) {
            tx.send(packet).await.unwrap();
        }
        tokio::time::timeout(TIMEOUT, recorder.wait_for_status(|s| s.packets == 7))
            .await
            .unwrap()
            .unwrap();

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.packets.len(), 6);
        assert!(snapshot.packets[0].is_key_frame());
        assert_eq!(snapshot.packets, shape.packets(6));
        assert_eq!(snapshot.span_us(), shape.timestamp_us(5));
    }

    #[tokio::test]
    async fn no_key_frame_is_retryable() {
        let (tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tx.send(EncodedPacket::new(vec![1u8; 10], PacketFlags::NONE, 0)).await.unwrap();
        recorder.wait_for_status(|s| s.packets == 1).await.unwrap();

        let err = recorder.snapshot().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoKeyFrame));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn save_passes_codec_config_and_packets_to_sink() {
        let (tx, source) = packet_channel(16);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tx.send(EncodedPacket::new(vec![0u8, 0, 0, 1, 0x67], PacketFlags::CODEC_CONFIG, 0))
            .await
            .unwrap();
        let shape = StreamShape { gop: 3, key_size: 500, delta_size: 100, frame_rate: 30 };
        for packet in shape.packets(3) {
            tx.send(packet).await.unwrap();
        }
        recorder.wait_for_status(|s| s.packets == 3).await.unwrap();

        let mut sink = MemorySink::new();
        let summary = recorder.save(&mut sink).await.unwrap();

        assert_eq!(sink.codec_config.as_deref(), Some(&[0u8, 0, 0, 1, 0x67][..]));
        assert_eq!(sink.packets, shape.packets(3));
        assert!(sink.finished);
        assert_eq!(summary.packets, 3);
        assert_eq!(summary.payload_bytes, 700);
        assert_eq!(summary.span_us, shape.timestamp_us(2));
    }

    #[tokio::test]
    async fn oversized_packets_are_dropped_and_counted() {
        let (tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tx.send(EncodedPacket::new(vec![0u8; 25_001], PacketFlags::KEY_FRAME, 0)).await.unwrap();
        tx.send(EncodedPacket::new(vec![0u8; 100], PacketFlags::KEY_FRAME, 1)).await.unwrap();

        let status = recorder.wait_for_status(|s| s.packets == 1).await.unwrap();
        assert_eq!(status.dropped_packets, 1);
        assert_eq!(status.payload_bytes, 100);
    }

    #[tokio::test]
    async fn history_survives_end_of_stream() {
        let (tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tx.send(EncodedPacket::new(vec![5u8; 64], PacketFlags::KEY_FRAME, 0)).await.unwrap();
        tx.send(EncodedPacket::new(Vec::new(), PacketFlags::END_OF_STREAM, 1)).await.unwrap();
        drop(tx);
        recorder.wait_for_status(|s| s.packets == 1).await.unwrap();

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.packets.len(), 1);
        assert!(recorder.is_running());
    }

    #[tokio::test]
    async fn shutdown_closes_the_recorder() {
        let (_tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();
        recorder.shutdown();

        let err = recorder.snapshot().await.unwrap_err();
        assert!(matches!(err, CaptureError::Closed));
        assert!(!recorder.is_running());
    }

    #[tokio::test]
    async fn status_updates_follow_insertions() {
        let (tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();
        let mut updates = recorder.status_updates(UpdateRate::Native);

        let initial = updates.next().await.unwrap();
        assert_eq!(initial.packets, 0);
        assert_eq!(initial.data_capacity, 25_000);

        tx.send(EncodedPacket::new(vec![1u8; 10], PacketFlags::KEY_FRAME, 0)).await.unwrap();
        let next = tokio::time::timeout(TIMEOUT, updates.next()).await.unwrap().unwrap();
        assert_eq!(next.packets, 1);
        assert_eq!(recorder.status().payload_bytes, 10);
    }

    /// Source replaying a fixed list of results, then waiting forever.
    struct ScriptedSource {
        steps: VecDeque<Result<Option<EncodedPacket>>>,
        consumed: watch::Sender<usize>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Result<Option<EncodedPacket>>>) -> (Self, watch::Receiver<usize>) {
            let (consumed, progress) = watch::channel(0);
            (Self { steps: steps.into(), consumed }, progress)
        }
    }

    #[async_trait::async_trait]
    impl PacketSource for ScriptedSource {
        async fn next_packet(&mut self) -> Result<Option<EncodedPacket>> {
            match self.steps.pop_front() {
                Some(step) => {
                    self.consumed.send_modify(|n| *n += 1);
                    step
                }
                None => std::future::pending().await,
            }
        }
    }

    fn packet(flags: PacketFlags, timestamp_us: i64) -> Result<Option<EncodedPacket>> {
        Ok(Some(EncodedPacket::new(vec![3u8; 32], flags, timestamp_us)))
    }

    fn failures(count: usize) -> impl Iterator<Item = Result<Option<EncodedPacket>>> {
        (0..count).map(|n| Err(CaptureError::source_failed(format!("encoder hiccup {n}"))))
    }

    #[tokio::test]
    async fn successful_packet_resets_source_error_count() {
        let mut steps = vec![packet(PacketFlags::KEY_FRAME, 0)];
        steps.extend(failures(9));
        steps.push(packet(PacketFlags::NONE, 1));
        steps.extend(failures(9));
        steps.push(packet(PacketFlags::NONE, 2));
        let (source, _progress) = ScriptedSource::new(steps);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tokio::time::timeout(TIMEOUT, recorder.wait_for_status(|s| s.packets == 3))
            .await
            .unwrap()
            .unwrap();
        let snapshot = recorder.snapshot().await.unwrap();
        let timestamps: Vec<i64> = snapshot.packets.iter().map(|p| p.timestamp_us).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn ten_consecutive_source_errors_stop_intake_but_keep_history() {
        let mut steps = vec![packet(PacketFlags::KEY_FRAME, 0)];
        steps.extend(failures(10));
        steps.push(packet(PacketFlags::NONE, 1));
        let (source, mut progress) = ScriptedSource::new(steps);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        // Key frame plus ten errors; the trailing packet is never pulled.
        tokio::time::timeout(TIMEOUT, progress.wait_for(|n| *n == 11)).await.unwrap().unwrap();

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.packets.len(), 1);
        assert_eq!(snapshot.packets[0].timestamp_us, 0);
        assert_eq!(*progress.borrow(), 11);
        assert_eq!(recorder.status().packets, 1);
        assert!(recorder.is_running());
    }

    #[tokio::test]
    async fn extreme_timestamps_do_not_stop_the_recorder() {
        let (tx, source) = packet_channel(4);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();

        tx.send(EncodedPacket::new(vec![1u8; 10], PacketFlags::KEY_FRAME, i64::MIN)).await.unwrap();
        tx.send(EncodedPacket::new(vec![2u8; 10], PacketFlags::NONE, i64::MAX)).await.unwrap();
        let status = tokio::time::timeout(TIMEOUT, recorder.wait_for_status(|s| s.packets == 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.span_us, i64::MAX);

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.packets.len(), 2);
        assert_eq!(snapshot.span_us(), i64::MAX);
        assert!(recorder.is_running());
    }

    #[tokio::test]
    async fn intake_resumes_between_back_to_back_snapshots() {
        let (tx, source) = packet_channel(2);
        let recorder = Recorder::spawn(source, &small_config()).unwrap();
        tx.send(EncodedPacket::new(vec![0u8; 10], PacketFlags::KEY_FRAME, 0)).await.unwrap();
        recorder.wait_for_status(|s| s.packets == 1).await.unwrap();

        let reader = recorder.clone();
        let snapshots = tokio::spawn(async move {
            for _ in 0..50 {
                reader.snapshot().await.unwrap();
            }
        });
        for n in 1..20 {
            tx.send(EncodedPacket::new(vec![1u8; 10], PacketFlags::NONE, n)).await.unwrap();
        }

        tokio::time::timeout(TIMEOUT, recorder.wait_for_status(|s| s.packets == 20))
            .await
            .unwrap()
            .unwrap();
        snapshots.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_fails_before_spawning() {
        let (_tx, source) = packet_channel(1);
        let err = Recorder::spawn(source, &CaptureConfig::new(0, 30, 1)).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig { .. }));
    }
}
