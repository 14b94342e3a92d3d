//! Slot-Indexed Frame Pool
//!
//! Pre-allocated storage for wire-ready Ethernet frames, keyed by slot,
//! eAxC, direction and plane. Every frame is tagged with the OTA symbol it
//! refers to, so each plane can be sent in its own transmission window.
//!
//! # Design
//!
//! - Frame buffers are allocated once and recycled through a lock-free
//!   `ArrayQueue` free list.
//! - Entries live in a ring of slot positions indexed by the system slot
//!   count. Each position is guarded by its own short-lived mutex, so
//!   sectors and slots never contend with each other.
//! - A position still tagged with an older slot is recycled the first time a
//!   newer slot touches it.
//! - Running out of buffers drops the frame and counts it; nothing blocks.

use crate::serdes::DataDirection;
use crate::OfhError;
use bytes::{Bytes, BytesMut};
use common::types::Eaxc;
use common::{SlotPoint, SlotSymbolPoint};
use crossbeam::queue::ArrayQueue;
use parking_lot::{Mutex, MutexGuard};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of slots kept in the ring
pub const DEFAULT_NOF_SLOTS: usize = 20;

/// Message plane of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Control,
    User,
}

/// Identifies one producer stream inside a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub eaxc: Eaxc,
    pub direction: DataDirection,
    pub plane: Plane,
}

impl FrameKey {
    pub fn new(eaxc: Eaxc, direction: DataDirection, plane: Plane) -> Self {
        Self { eaxc, direction, plane }
    }
}

/// Frame pool dimensions
#[derive(Debug, Clone, Copy)]
pub struct FramePoolConfig {
    /// Number of slot positions in the ring
    pub nof_slots: usize,
    /// Total number of frame buffers
    pub nof_buffers: usize,
    /// Capacity of each frame buffer in bytes
    pub mtu: usize,
}

impl Default for FramePoolConfig {
    fn default() -> Self {
        Self {
            nof_slots: DEFAULT_NOF_SLOTS,
            nof_buffers: 4096,
            mtu: 9000,
        }
    }
}

/// Frame pool diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePoolStats {
    /// Frames dropped because no buffer was free
    pub exhausted: u64,
    /// Slots recycled before being transmitted
    pub evicted: u64,
    /// Buffers currently in the free list
    pub available: usize,
}

struct TaggedFrame {
    symbol: u32,
    data: BytesMut,
}

struct PoolEntry {
    key: FrameKey,
    frames: Vec<TaggedFrame>,
}

#[derive(Default)]
struct RingSlot {
    slot: Option<SlotPoint>,
    entries: Vec<PoolEntry>,
}

/// Frame pool shared by the encoders and the message transmitter
pub struct FramePool {
    ring: Vec<Mutex<RingSlot>>,
    freelist: Arc<ArrayQueue<BytesMut>>,
    mtu: usize,
    exhausted: AtomicU64,
    evicted: AtomicU64,
}

impl FramePool {
    /// Create a pool and pre-allocate every buffer
    pub fn new(config: FramePoolConfig) -> Self {
        assert!(config.nof_slots > 0, "Frame pool needs at least one slot");
        assert!(config.nof_buffers > 0, "Frame pool needs at least one buffer");
        assert!(config.mtu > 0, "Invalid frame pool MTU");

        let freelist = Arc::new(ArrayQueue::new(config.nof_buffers));
        for _ in 0..config.nof_buffers {
            // Capacity matches the loop count.
            let _ = freelist.push(BytesMut::with_capacity(config.mtu));
        }

        debug!(
            "Created frame pool: {} slots, {} buffers of {} bytes",
            config.nof_slots, config.nof_buffers, config.mtu
        );

        Self {
            ring: (0..config.nof_slots).map(|_| Mutex::new(RingSlot::default())).collect(),
            freelist,
            mtu: config.mtu,
            exhausted: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Capacity of each frame buffer
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    fn position(&self, slot: SlotPoint) -> &Mutex<RingSlot> {
        &self.ring[slot.system_slot() as usize % self.ring.len()]
    }

    fn recycle(&self, ring_slot: &mut RingSlot) {
        for entry in ring_slot.entries.drain(..) {
            for frame in entry.frames {
                self.release(frame.data);
            }
        }
    }

    fn release(&self, mut frame: BytesMut) {
        frame.clear();
        let _ = self.freelist.push(frame);
    }

    fn acquire(&self) -> Option<BytesMut> {
        match self.freelist.pop() {
            Some(frame) => Some(frame),
            None => {
                let count = self.exhausted.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Frame pool exhausted, dropping frame ({} drops so far)", count);
                None
            }
        }
    }

    /// Invalidate every frame tagged with `slot`
    ///
    /// Calling this on a slot with no frames is a no-op.
    pub fn clear_slot(&self, slot: SlotPoint) {
        let mut ring_slot = self.position(slot).lock();
        if ring_slot.slot == Some(slot) {
            self.recycle(&mut ring_slot);
            ring_slot.slot = None;
        }
    }

    /// Get a writer for the frames of `key` in `slot`
    ///
    /// The writer holds the slot position for its lifetime; drop it as soon as
    /// the encode call finishes.
    pub fn get_buffer(&self, slot: SlotPoint, key: FrameKey) -> FrameWriter<'_> {
        let mut ring_slot = self.position(slot).lock();

        if ring_slot.slot != Some(slot) {
            if let Some(stale) = ring_slot.slot {
                if !ring_slot.entries.is_empty() {
                    self.evicted.fetch_add(1, Ordering::Relaxed);
                    debug!("Evicting untransmitted frames of slot {} for slot {}", stale, slot);
                }
            }
            self.recycle(&mut ring_slot);
            ring_slot.slot = Some(slot);
        }

        let entry = match ring_slot.entries.iter().position(|e| e.key == key) {
            Some(index) => index,
            None => {
                ring_slot.entries.push(PoolEntry { key, frames: Vec::new() });
                ring_slot.entries.len() - 1
            }
        };

        FrameWriter {
            pool: self,
            ring_slot,
            entry,
        }
    }

    /// Take every frame of `slot`, in enqueue order
    pub fn prepare_for_transmission(&self, slot: SlotPoint) -> Vec<PooledFrame> {
        let mut ring_slot = self.position(slot).lock();
        if ring_slot.slot != Some(slot) {
            return Vec::new();
        }

        let frames = ring_slot
            .entries
            .drain(..)
            .flat_map(|entry| entry.frames)
            .map(|frame| PooledFrame {
                frame: Some(frame.data),
                freelist: self.freelist.clone(),
            })
            .collect();
        ring_slot.slot = None;
        frames
    }

    /// Take the `plane` frames tagged with `symbol_point`, in enqueue order
    pub fn prepare_for_transmission_at(&self, symbol_point: SlotSymbolPoint, plane: Plane) -> Vec<PooledFrame> {
        let slot = symbol_point.slot();
        let symbol = symbol_point.symbol_index();
        let mut ring_slot = self.position(slot).lock();
        if ring_slot.slot != Some(slot) {
            return Vec::new();
        }

        let mut ready = Vec::new();
        for entry in ring_slot.entries.iter_mut().filter(|e| e.key.plane == plane) {
            if !entry.frames.iter().any(|f| f.symbol == symbol) {
                continue;
            }
            let (matching, pending): (Vec<_>, Vec<_>) = entry.frames.drain(..).partition(|f| f.symbol == symbol);
            entry.frames = pending;
            ready.extend(matching.into_iter().map(|frame| PooledFrame {
                frame: Some(frame.data),
                freelist: self.freelist.clone(),
            }));
        }
        ready
    }

    /// Number of (eAxC, direction, plane) entries holding frames for `slot`
    pub fn nof_entries(&self, slot: SlotPoint) -> usize {
        let ring_slot = self.position(slot).lock();
        if ring_slot.slot != Some(slot) {
            return 0;
        }
        ring_slot.entries.iter().filter(|e| !e.frames.is_empty()).count()
    }

    /// Keys of the non-empty entries of `slot`, in enqueue order
    pub fn entry_keys(&self, slot: SlotPoint) -> Vec<FrameKey> {
        let ring_slot = self.position(slot).lock();
        if ring_slot.slot != Some(slot) {
            return Vec::new();
        }
        ring_slot
            .entries
            .iter()
            .filter(|e| !e.frames.is_empty())
            .map(|e| e.key)
            .collect()
    }

    /// Copy of the frames stored for `key` in `slot`
    pub fn frames(&self, slot: SlotPoint, key: FrameKey) -> Vec<Bytes> {
        let ring_slot = self.position(slot).lock();
        if ring_slot.slot != Some(slot) {
            return Vec::new();
        }
        ring_slot
            .entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.frames.iter().map(|f| Bytes::copy_from_slice(&f.data)).collect())
            .unwrap_or_default()
    }

    /// Current diagnostics
    pub fn stats(&self) -> FramePoolStats {
        FramePoolStats {
            exhausted: self.exhausted.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            available: self.freelist.len(),
        }
    }
}

/// Scoped write access to one entry of the pool
pub struct FrameWriter<'a> {
    pool: &'a FramePool,
    ring_slot: MutexGuard<'a, RingSlot>,
    entry: usize,
}

impl FrameWriter<'_> {
    /// Append an empty frame buffer, sent with the OTA symbol `symbol` of the slot
    pub fn next_frame(&mut self, symbol: u32) -> Result<&mut BytesMut, OfhError> {
        let data = self.pool.acquire().ok_or(OfhError::PoolExhausted)?;
        let frames = &mut self.ring_slot.entries[self.entry].frames;
        frames.push(TaggedFrame { symbol, data });
        frames
            .last_mut()
            .map(|frame| &mut frame.data)
            .ok_or(OfhError::PoolExhausted)
    }

    /// Return the last appended frame to the pool
    pub fn discard_last(&mut self) {
        if let Some(frame) = self.ring_slot.entries[self.entry].frames.pop() {
            self.pool.release(frame.data);
        }
    }

    /// Number of frames written to the entry so far
    pub fn nof_frames(&self) -> usize {
        self.ring_slot.entries[self.entry].frames.len()
    }
}

/// Frame handed to the transmit boundary; the buffer returns to the pool on drop
pub struct PooledFrame {
    frame: Option<BytesMut>,
    freelist: Arc<ArrayQueue<BytesMut>>,
}

impl Deref for PooledFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.frame.as_deref().unwrap_or(&[])
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            frame.clear();
            let _ = self.freelist.push(frame);
        }
    }
}
