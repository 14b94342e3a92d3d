//! Message Transmitter
//!
//! Sends the frames of the pools to the Ethernet gateway as the OTA clock
//! brings them inside their transmission window. Each source covers one
//! plane of one pool and has its own window, so C-Plane and U-Plane
//! messages follow their own T1a bounds.

use crate::frame_pool::{FramePool, Plane};
use crate::timing::OtaSymbolBoundaryNotifier;
use common::SlotSymbolPoint;
use interfaces::EthernetGateway;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Window in which a message may be sent, in symbols before its OTA symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionWindow {
    /// Earliest point
    pub start: u32,
    /// Latest point
    pub end: u32,
}

impl TransmissionWindow {
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start >= end, "Transmission window opens ({}) after it closes ({})", start, end);
        Self { start, end }
    }
}

/// One plane of a frame pool and its transmission window
pub struct TransmissionSource {
    pub frame_pool: Arc<FramePool>,
    pub plane: Plane,
    pub window: TransmissionWindow,
}

/// Sends every pending frame whose OTA symbol falls inside its window
///
/// On each OTA symbol `S`, the frames tagged with a symbol in
/// `[S + window.end, S + window.start]` are sent, earliest OTA symbol first.
/// A frame is therefore sent as soon as its window opens, or on the next
/// symbol boundary when it is written while the window is already open.
pub struct MessageTransmitter {
    sources: Vec<TransmissionSource>,
    gateway: Arc<dyn EthernetGateway>,
    frames_sent: AtomicU64,
    send_errors: AtomicU64,
}

impl MessageTransmitter {
    pub fn new(sources: Vec<TransmissionSource>, gateway: Arc<dyn EthernetGateway>) -> Self {
        Self {
            sources,
            gateway,
            frames_sent: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
        }
    }

    /// Frames handed to the gateway
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Bursts the gateway failed to send
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    /// Last symbol before OTA at which any source still picks up frames
    pub fn last_transmission_point(&self) -> u32 {
        self.sources.iter().map(|source| source.window.end).max().unwrap_or(0)
    }
}

impl OtaSymbolBoundaryNotifier for MessageTransmitter {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        for source in &self.sources {
            let frames: Vec<_> = (source.window.end..=source.window.start)
                .flat_map(|advance| {
                    source
                        .frame_pool
                        .prepare_for_transmission_at(symbol_point + advance as i32, source.plane)
                })
                .collect();
            if frames.is_empty() {
                continue;
            }

            let burst: Vec<&[u8]> = frames.iter().map(|frame| &frame[..]).collect();
            match self.gateway.send(&burst) {
                Ok(()) => {
                    self.frames_sent.fetch_add(burst.len() as u64, Ordering::Relaxed);
                    trace!("Sent {} {:?}-Plane frames at OTA {}", burst.len(), source.plane, symbol_point);
                }
                Err(e) => {
                    self.send_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Failed to send {} {:?}-Plane frames at OTA {}: {}",
                        burst.len(),
                        source.plane,
                        symbol_point,
                        e
                    );
                }
            }
        }
    }
}
