//! OTA Symbol-Boundary Timing
//!
//! A single timing worker thread tracks the over-the-air symbol clock and
//! calls every subscribed notifier synchronously on each symbol boundary.
//! The subscriber list is fixed once, before the worker starts.

use common::types::{CyclicPrefix, SubcarrierSpacing};
use common::SlotSymbolPoint;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Receives a call on every OTA symbol boundary
pub trait OtaSymbolBoundaryNotifier: Send + Sync {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint);
}

/// Start/stop control over a pipeline component
pub trait Controller: Send + Sync {
    fn start(&self);

    fn stop(&self);
}

/// Source of OTA symbol-boundary notifications
pub trait TimingManager: Send + Sync {
    /// Controller that starts and stops the symbol clock
    fn get_controller(&self) -> &dyn Controller;

    /// Fan-out point the subscribers register with
    fn get_ota_symbol_boundary_notifier_manager(&self) -> &OtaSymbolBoundaryNotifierManager;
}

/// Fixed fan-out list of OTA symbol-boundary notifiers
#[derive(Default)]
pub struct OtaSymbolBoundaryNotifierManager {
    subscribers: OnceLock<Vec<Arc<dyn OtaSymbolBoundaryNotifier>>>,
}

impl OtaSymbolBoundaryNotifierManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the complete, ordered subscriber list
    ///
    /// The list can only be set once.
    pub fn subscribe(&self, notifiers: Vec<Arc<dyn OtaSymbolBoundaryNotifier>>) {
        let nof_notifiers = notifiers.len();
        assert!(
            self.subscribers.set(notifiers).is_ok(),
            "OTA symbol boundary notifiers already subscribed"
        );
        debug!("Subscribed {} OTA symbol boundary notifiers", nof_notifiers);
    }

    /// Number of subscribed notifiers
    pub fn nof_subscribers(&self) -> usize {
        self.subscribers.get().map_or(0, Vec::len)
    }

    /// Deliver `symbol_point` to every subscriber, in subscription order
    pub fn notify(&self, symbol_point: SlotSymbolPoint) {
        if let Some(subscribers) = self.subscribers.get() {
            for subscriber in subscribers {
                subscriber.on_new_symbol(symbol_point);
            }
        }
    }
}

/// Real-time timing worker configuration
#[derive(Debug, Clone, Copy)]
pub struct RealtimeTimingConfig {
    pub scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    /// Offset added to the system clock before deriving the SFN
    pub clock_offset: Duration,
}

impl RealtimeTimingConfig {
    fn nof_symbols_per_ms(&self) -> u128 {
        self.cp.nof_symbols_per_slot() as u128 * self.scs.slots_per_subframe() as u128
    }

    /// Symbol count since the epoch for the given instant
    fn symbol_count(&self, since_epoch: Duration) -> u128 {
        (since_epoch + self.clock_offset).as_nanos() * self.nof_symbols_per_ms() / 1_000_000
    }

    /// Time since the epoch at which `symbol_count` begins
    fn symbol_start(&self, symbol_count: u128) -> Duration {
        let nanos = (symbol_count * 1_000_000).div_ceil(self.nof_symbols_per_ms());
        Duration::from_nanos(nanos as u64).saturating_sub(self.clock_offset)
    }
}

fn now_since_epoch() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// Timing manager driven by the host system clock
///
/// The SFN is derived from the time elapsed since the UNIX epoch, so every
/// process on a synchronized host agrees on the frame number.
pub struct RealtimeTimingWorker {
    config: RealtimeTimingConfig,
    notifier_manager: Arc<OtaSymbolBoundaryNotifierManager>,
    running: Arc<AtomicBool>,
    skipped_symbols: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeTimingWorker {
    pub fn new(config: RealtimeTimingConfig) -> Self {
        Self {
            config,
            notifier_manager: Arc::new(OtaSymbolBoundaryNotifierManager::new()),
            running: Arc::new(AtomicBool::new(false)),
            skipped_symbols: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Symbols that were notified late because the worker fell behind
    pub fn skipped_symbols(&self) -> u64 {
        self.skipped_symbols.load(Ordering::Relaxed)
    }

    /// Whether the worker thread is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn run(
        config: RealtimeTimingConfig,
        manager: Arc<OtaSymbolBoundaryNotifierManager>,
        running: Arc<AtomicBool>,
        skipped_symbols: Arc<AtomicU64>,
    ) {
        let numerology = config.scs.numerology();
        let nof_symbols = config.cp.nof_symbols_per_slot();
        let symbols_per_cycle = common::slot_point::NOF_SFNS as u128
            * common::slot_point::NOF_SUBFRAMES_PER_FRAME as u128
            * config.nof_symbols_per_ms();

        let mut next_symbol = config.symbol_count(now_since_epoch()) + 1;

        while running.load(Ordering::Acquire) {
            let deadline = config.symbol_start(next_symbol);
            let now = now_since_epoch();
            if deadline > now {
                std::thread::sleep(deadline - now);
                continue;
            }

            let current = config.symbol_count(now);
            if current > next_symbol {
                let skipped = (current - next_symbol) as u64;
                skipped_symbols.fetch_add(skipped, Ordering::Relaxed);
                warn!("Timing worker fell behind by {} symbols", skipped);
            }

            // Catch up symbol by symbol so no subscriber misses a boundary.
            while next_symbol <= current {
                let count = (next_symbol % symbols_per_cycle) as u64;
                manager.notify(SlotSymbolPoint::from_symbol_count(numerology, count, nof_symbols));
                next_symbol += 1;
            }
        }

        debug!("Timing worker stopped");
    }
}

impl Controller for RealtimeTimingWorker {
    fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Timing worker already running");
            return;
        }

        let config = self.config;
        let manager = self.notifier_manager.clone();
        let running = self.running.clone();
        let skipped = self.skipped_symbols.clone();

        let spawned = std::thread::Builder::new()
            .name("ofh_timing".to_string())
            .spawn(move || Self::run(config, manager, running, skipped));

        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                info!(
                    "Started timing worker: {} kHz, {} symbols per slot",
                    self.config.scs.as_khz(),
                    self.config.cp.nof_symbols_per_slot()
                );
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                error!("Failed to spawn timing worker thread: {}", e);
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("Timing worker thread panicked");
            }
            info!("Stopped timing worker");
        }
    }
}

impl TimingManager for RealtimeTimingWorker {
    fn get_controller(&self) -> &dyn Controller {
        self
    }

    fn get_ota_symbol_boundary_notifier_manager(&self) -> &OtaSymbolBoundaryNotifierManager {
        &self.notifier_manager
    }
}

impl Drop for RealtimeTimingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SlotPoint;

    #[derive(Default)]
    struct Recorder {
        symbols: Mutex<Vec<SlotSymbolPoint>>,
    }

    impl OtaSymbolBoundaryNotifier for Recorder {
        fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
            self.symbols.lock().push(symbol_point);
        }
    }

    #[test]
    fn test_manager_notifies_in_subscription_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let manager = OtaSymbolBoundaryNotifierManager::new();

        // Nothing subscribed yet.
        let point = SlotSymbolPoint::new(SlotPoint::new(1, 0, 0), 3, 14);
        manager.notify(point);

        manager.subscribe(vec![first.clone() as Arc<dyn OtaSymbolBoundaryNotifier>, second.clone()]);
        assert_eq!(manager.nof_subscribers(), 2);
        manager.notify(point);

        assert_eq!(*first.symbols.lock(), vec![point]);
        assert_eq!(*second.symbols.lock(), vec![point]);
    }

    #[test]
    #[should_panic(expected = "already subscribed")]
    fn test_manager_subscribes_once() {
        let manager = OtaSymbolBoundaryNotifierManager::new();
        manager.subscribe(Vec::new());
        manager.subscribe(Vec::new());
    }

    #[test]
    fn test_symbol_count_conversion() {
        let config = RealtimeTimingConfig {
            scs: SubcarrierSpacing::Scs30,
            cp: CyclicPrefix::Normal,
            clock_offset: Duration::ZERO,
        };
        // 28 symbols per millisecond at 30 kHz.
        assert_eq!(config.symbol_count(Duration::from_millis(1)), 28);
        assert_eq!(config.symbol_count(Duration::from_nanos(35_714)), 0);
        assert_eq!(config.symbol_count(Duration::from_nanos(35_715)), 1);
        assert_eq!(config.symbol_count(config.symbol_start(1000)), 1000);
        assert_eq!(config.symbol_count(config.symbol_start(1000) - Duration::from_nanos(1)), 999);
    }

    #[test]
    fn test_worker_delivers_consecutive_symbols() {
        let recorder = Arc::new(Recorder::default());
        let worker = RealtimeTimingWorker::new(RealtimeTimingConfig {
            scs: SubcarrierSpacing::Scs15,
            cp: CyclicPrefix::Normal,
            clock_offset: Duration::ZERO,
        });
        worker
            .get_ota_symbol_boundary_notifier_manager()
            .subscribe(vec![recorder.clone() as Arc<dyn OtaSymbolBoundaryNotifier>]);

        worker.get_controller().start();
        assert!(worker.is_running());
        std::thread::sleep(Duration::from_millis(5));
        worker.get_controller().stop();
        assert!(!worker.is_running());

        let symbols = recorder.symbols.lock().clone();
        assert!(symbols.len() > 10);
        for pair in symbols.windows(2) {
            assert_eq!(pair[1] - pair[0], 1);
        }
    }
}
