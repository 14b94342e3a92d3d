//! Albor Space Open Fronthaul Radio Unit Application
//!
//! Brings up the Open Fronthaul sectors described by the configuration file,
//! drives them from the host OTA clock with a test-pattern slot driver and
//! reports pipeline statistics until interrupted.

mod config;
mod scheduler;

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use config::AppConfig;
use interfaces::{EthernetGateway, EthernetReceiver, ZmqEthernetGateway, ZmqEthernetReceiver};
use ofh::{create_sector, RealtimeTimingConfig, RealtimeTimingWorker, SectorDependencies, NOF_SUBCARRIERS_PER_RB};
use ru::{RadioUnit, RuOfh, RuOfhConfig, RuOfhDependencies};
use scheduler::{SectorGridConfig, SlotDriver, SlotEventNotifier};

/// Albor Space Open Fronthaul Radio Unit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (.yml, .yaml or .toml)
    #[arg(short, long, default_value = "ru_ofh.yml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the configuration file
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Depth of the TTI queue between the timing thread and the slot driver
const TTI_QUEUE_SIZE: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_file(&args.config)?;

    // Initialize logging
    let log_level = args.log_level.clone().unwrap_or_else(|| config.log.level.clone());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Albor Space Open Fronthaul Radio Unit");
    info!("Configuration file: {}", args.config);

    let ru_config = &config.ru_ofh;
    info!("Radio Unit configuration:");
    info!("  Subcarrier spacing: {} kHz", ru_config.scs.as_khz());
    info!("  Cyclic prefix: {:?}", ru_config.cp);
    info!("  Duplex: {}", if ru_config.tdd.is_some() { "TDD" } else { "FDD" });
    info!("  Sectors: {}", ru_config.sectors.len());

    let (tti_sender, tti_receiver) = crossbeam::channel::bounded(TTI_QUEUE_SIZE);
    let events = Arc::new(SlotEventNotifier::new(tti_sender));

    // Create the sectors
    let mut sectors = Vec::with_capacity(ru_config.sectors.len());
    let mut grid_configs = Vec::with_capacity(ru_config.sectors.len());
    for (index, sector) in ru_config.sectors.iter().enumerate() {
        let sector_config = config.sector_config(index)?;
        let gateway: Arc<dyn EthernetGateway> = Arc::new(ZmqEthernetGateway::new(&sector.zmq)?);
        let receiver: Arc<dyn EthernetReceiver> = Arc::new(ZmqEthernetReceiver::new(sector.zmq.clone()));

        info!(
            "  Sector {}: {} PRBs, DL eAxC {:?}, UL eAxC {:?}, link {} -> {}",
            index, sector.nof_prb, sector.dl_eaxc, sector.ul_eaxc, sector.zmq.tx_address, sector.zmq.rx_address
        );

        grid_configs.push(SectorGridConfig {
            nof_symbols: ru_config.cp.nof_symbols_per_slot() as usize,
            nof_subc: sector.nof_prb as usize * NOF_SUBCARRIERS_PER_RB,
            nof_ul_ports: sector.ul_eaxc.len(),
        });
        sectors.push(create_sector(
            sector_config,
            SectorDependencies {
                gateway,
                ethernet_receiver: Some(receiver),
                uplink_notifier: events.clone(),
            },
        )?);
    }

    let timing_manager = Arc::new(RealtimeTimingWorker::new(RealtimeTimingConfig {
        scs: ru_config.scs,
        cp: ru_config.cp,
        clock_offset: Duration::ZERO,
    }));

    let ru = Arc::new(RuOfh::new(
        RuOfhConfig {
            nof_slot_offset_du_ru: ru_config.nof_slot_offset_du_ru,
            nof_symbols_per_slot: ru_config.cp.nof_symbols_per_slot(),
        },
        RuOfhDependencies {
            timing_notifier: events.clone(),
            error_notifier: events.clone(),
            sectors,
            timing_manager: timing_manager.clone(),
        },
    ));

    // Start the slot driver before the clock, so the first TTI finds it ready
    let running = Arc::new(AtomicBool::new(true));
    let driver = SlotDriver::new(
        ru.clone(),
        grid_configs,
        config.test_mode.amplitude,
        config.test_mode.request_uplink,
    );
    let driver_handle = {
        let running = running.clone();
        std::thread::Builder::new()
            .name("slot_driver".to_string())
            .spawn(move || driver.run(tti_receiver, running))?
    };

    ru.get_controller().start();
    info!("Radio Unit initialized successfully");

    // Start statistics reporting
    let stats_handle = {
        let ru = ru.clone();
        let events = events.clone();
        let timing_manager = timing_manager.clone();
        let running = running.clone();
        let period = Duration::from_secs(config.log.stats_period_s.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            while running.load(Ordering::Acquire) {
                interval.tick().await;

                let slot_stats = events.stats();
                info!("Slot statistics:");
                info!(
                    "  TTIs: {}, skipped: {}, late DL: {}, late UL: {}, UL symbols: {}",
                    slot_stats.ttis,
                    slot_stats.ttis_dropped,
                    slot_stats.late_downlink,
                    slot_stats.late_uplink,
                    slot_stats.uplink_symbols
                );
                info!("  Timing worker skipped symbols: {}", timing_manager.skipped_symbols());

                for index in 0..ru.nof_sectors() {
                    let Some(sector) = ru.sector(index) else {
                        continue;
                    };
                    let transmitter = sector.get_transmitter();
                    let (dl_pool, ul_pool) = transmitter.frame_pool_stats();
                    let rx = sector.get_receiver().stats();
                    info!(
                        "  Sector {}: TX frames {}, late DL {}, pool exhausted {}/{}, evicted {}/{}",
                        index,
                        transmitter.frames_sent(),
                        transmitter.dl_window_checker().nof_late(),
                        dl_pool.exhausted,
                        ul_pool.exhausted,
                        dl_pool.evicted,
                        ul_pool.evicted
                    );
                    info!(
                        "  Sector {}: RX accepted {}, malformed {}, unrequested {}, window on-time/early/late {}/{}/{}",
                        index,
                        rx.frames_accepted,
                        rx.frames_malformed,
                        rx.frames_unrequested,
                        rx.window.on_time,
                        rx.window.early,
                        rx.window.late
                    );
                }
            }
        })
    };

    // Wait for shutdown signal
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
    }
    info!("Received shutdown signal");

    // Shutdown
    info!("Shutting down Radio Unit");
    running.store(false, Ordering::Release);
    ru.get_controller().stop();

    if driver_handle.join().is_err() {
        error!("Slot driver thread panicked");
    }

    // Wait for tasks to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), stats_handle).await;

    info!("Radio Unit shutdown complete");
    Ok(())
}
