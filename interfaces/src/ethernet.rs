//! Ethernet Frame Boundary
//!
//! The fronthaul pipeline produces and consumes complete Ethernet frames.
//! These traits are the only contact points with the transport underneath.

use crate::InterfaceError;
use std::sync::Arc;

/// Sink for outbound Ethernet frames
pub trait EthernetGateway: Send + Sync {
    /// Send a burst of frames, preserving their order on the link
    fn send(&self, frames: &[&[u8]]) -> Result<(), InterfaceError>;
}

/// Consumer of inbound Ethernet frames
pub trait FrameNotifier: Send + Sync {
    /// Called once per received frame, from the receiver's worker thread
    fn on_new_frame(&self, frame: &[u8]);
}

/// Source of inbound Ethernet frames
pub trait EthernetReceiver: Send + Sync {
    /// Start delivering frames to `notifier`
    fn start(&self, notifier: Arc<dyn FrameNotifier>) -> Result<(), InterfaceError>;

    /// Stop delivering frames; returns once the worker has exited
    fn stop(&self);
}
