//! Fronthaul Ethernet Interfaces Library
//! 
//! This crate provides the Ethernet I/O boundary of the Open Fronthaul
//! pipeline: the traits used to hand wire-ready frames to a transport and
//! to receive frames from it, plus a ZeroMQ-backed emulated link.

pub mod ethernet;
pub mod zmq_ethernet;

pub use ethernet::{EthernetGateway, EthernetReceiver, FrameNotifier};
pub use zmq_ethernet::{ZmqEthernetConfig, ZmqEthernetGateway, ZmqEthernetReceiver};

use thiserror::Error;

/// Interface errors
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("ZMQ error: {0}")]
    ZmqError(#[from] zmq::Error),
    
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    
    #[error("Interface not initialized")]
    NotInitialized,
    
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    #[error("Frame of {0} bytes exceeds the link MTU")]
    FrameTooLarge(usize),
}
