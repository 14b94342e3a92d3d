//! ZMQ Emulated Fronthaul Link
//!
//! Carries raw Ethernet frames over ZeroMQ PUB/SUB sockets, one ZMQ message
//! per frame. Used in the lab in place of a DPDK or raw-socket NIC.

use crate::ethernet::{EthernetGateway, EthernetReceiver, FrameNotifier};
use crate::InterfaceError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};
use zmq::{Context, Socket};

/// Default ZMQ endpoints
pub const DEFAULT_TX_ADDRESS: &str = "tcp://*:5000";
pub const DEFAULT_RX_ADDRESS: &str = "tcp://localhost:5001";

/// ZMQ link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZmqEthernetConfig {
    /// Address the PUB socket binds to
    #[serde(default = "default_tx_address")]
    pub tx_address: String,
    /// Address the SUB socket connects to
    #[serde(default = "default_rx_address")]
    pub rx_address: String,
    /// High water mark in frames
    #[serde(default = "default_hwm")]
    pub hwm: i32,
    /// Largest frame accepted by the link
    #[serde(default = "default_mtu")]
    pub mtu: usize,
}

fn default_tx_address() -> String {
    DEFAULT_TX_ADDRESS.to_string()
}

fn default_rx_address() -> String {
    DEFAULT_RX_ADDRESS.to_string()
}

fn default_hwm() -> i32 {
    16384
}

fn default_mtu() -> usize {
    9000
}

impl Default for ZmqEthernetConfig {
    fn default() -> Self {
        Self {
            tx_address: default_tx_address(),
            rx_address: default_rx_address(),
            hwm: default_hwm(),
            mtu: default_mtu(),
        }
    }
}

/// Transmit side of the emulated link
pub struct ZmqEthernetGateway {
    // Keeps the context alive as long as the socket.
    _context: Context,
    socket: Mutex<Socket>,
    mtu: usize,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
}

impl ZmqEthernetGateway {
    /// Bind the PUB socket
    pub fn new(config: &ZmqEthernetConfig) -> Result<Self, InterfaceError> {
        let context = Context::new();
        let socket = context.socket(zmq::PUB)?;
        socket.set_sndhwm(config.hwm)?;
        socket.bind(&config.tx_address)?;
        info!("ZMQ fronthaul PUB socket bound to {}", config.tx_address);

        Ok(Self {
            _context: context,
            socket: Mutex::new(socket),
            mtu: config.mtu,
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        })
    }

    /// Number of frames handed to ZMQ
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Number of frames dropped because the high water mark was reached
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}

impl EthernetGateway for ZmqEthernetGateway {
    fn send(&self, frames: &[&[u8]]) -> Result<(), InterfaceError> {
        let socket = self.socket.lock();

        for frame in frames {
            if frame.len() > self.mtu {
                return Err(InterfaceError::FrameTooLarge(frame.len()));
            }

            match socket.send(*frame, zmq::DONTWAIT) {
                Ok(()) => {
                    self.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(zmq::Error::EAGAIN) => {
                    let dropped = self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped % 1000 == 1 {
                        warn!("ZMQ fronthaul link congested, {} frames dropped so far", dropped);
                    }
                }
                Err(e) => return Err(InterfaceError::ZmqError(e)),
            }
        }

        Ok(())
    }
}

/// Receive side of the emulated link
pub struct ZmqEthernetReceiver {
    config: ZmqEthernetConfig,
    context: Context,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ZmqEthernetReceiver {
    /// Create a receiver; the SUB socket is connected on `start`
    pub fn new(config: ZmqEthernetConfig) -> Self {
        Self {
            config,
            context: Context::new(),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }
}

impl EthernetReceiver for ZmqEthernetReceiver {
    fn start(&self, notifier: Arc<dyn FrameNotifier>) -> Result<(), InterfaceError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            debug!("ZMQ fronthaul receiver already running");
            return Ok(());
        }

        let socket = self.context.socket(zmq::SUB)?;
        socket.set_rcvhwm(self.config.hwm)?;
        // Bounded wait so the worker notices a stop request.
        socket.set_rcvtimeo(10)?;
        socket.set_subscribe(b"")?;
        socket.connect(&self.config.rx_address)?;
        info!("ZMQ fronthaul SUB socket connected to {}", self.config.rx_address);

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();

        let worker = std::thread::Builder::new()
            .name("ofh_zmq_rx".to_string())
            .spawn(move || {
                let mut buffer = zmq::Message::new();
                while running.load(Ordering::Acquire) {
                    match socket.recv(&mut buffer, 0) {
                        Ok(()) => notifier.on_new_frame(&buffer),
                        Err(zmq::Error::EAGAIN) => continue,
                        Err(e) => {
                            error!("ZMQ fronthaul receive error: {}", e);
                            break;
                        }
                    }
                }
                debug!("ZMQ fronthaul receiver stopped");
            })
            .map_err(|e| InterfaceError::ConnectionFailed(e.to_string()))?;

        *handle = Some(worker);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.handle.lock().take() {
            if worker.join().is_err() {
                error!("ZMQ fronthaul receiver thread panicked");
            }
        }
    }
}
