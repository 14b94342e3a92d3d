//! Radio Unit application configuration
//!
//! The configuration file is YAML (`.yml`/`.yaml`) or TOML (`.toml`),
//! selected by extension. Every timing field is in microseconds.

use anyhow::{anyhow, Context};
use common::types::{CyclicPrefix, Eaxc, SubcarrierSpacing};
use common::TddUlDlConfig;
use interfaces::ZmqEthernetConfig;
use ofh::serdes::ethernet::MacAddress;
use ofh::window::TxWindowDurations;
use ofh::{RxWindowTimingParameters, SectorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Open Fronthaul Radio Unit configuration
    pub ru_ofh: RuConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Test-pattern slot driver configuration
    #[serde(default)]
    pub test_mode: TestModeConfig,
}

/// Radio Unit configuration shared by every sector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuConfig {
    /// Subcarrier spacing in kHz
    #[serde(default = "default_scs")]
    pub scs: SubcarrierSpacing,
    /// Cyclic prefix
    #[serde(default = "default_cp")]
    pub cp: CyclicPrefix,
    /// TDD pattern; FDD when absent
    #[serde(default)]
    pub tdd: Option<TddUlDlConfig>,
    /// Slots the scheduler runs ahead of OTA
    #[serde(default = "default_nof_slot_offset_du_ru")]
    pub nof_slot_offset_du_ru: u32,
    /// Downlink processing budget
    #[serde(default = "default_dl_processing_time_us")]
    pub dl_processing_time_us: u64,
    /// Uplink request processing budget
    #[serde(default = "default_ul_processing_time_us")]
    pub ul_processing_time_us: u64,
    /// DU transmission window
    #[serde(default)]
    pub tx_window: TxWindowConfig,
    /// RU reception window
    #[serde(default)]
    pub rx_window: RxWindowConfig,
    /// Downlink look-ahead horizon in symbols; one frame when absent
    #[serde(default)]
    pub max_advance_symbols: Option<u32>,
    /// IQ scaling applied to outgoing and incoming samples
    #[serde(default = "default_iq_scaling")]
    pub iq_scaling: f32,
    /// Frame buffers of each frame pool
    #[serde(default = "default_nof_frame_buffers")]
    pub nof_frame_buffers: usize,
    /// Sectors, indexed by their position
    pub sectors: Vec<SectorAppConfig>,
}

fn default_scs() -> SubcarrierSpacing {
    SubcarrierSpacing::Scs30
}

fn default_cp() -> CyclicPrefix {
    CyclicPrefix::Normal
}

fn default_nof_slot_offset_du_ru() -> u32 {
    2
}

fn default_dl_processing_time_us() -> u64 {
    400
}

fn default_ul_processing_time_us() -> u64 {
    30
}

fn default_iq_scaling() -> f32 {
    0.35
}

fn default_nof_frame_buffers() -> usize {
    4096
}

/// O-RAN T1a bounds of the DU
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TxWindowConfig {
    #[serde(default = "default_t1a_max_cp_dl")]
    pub t1a_max_cp_dl_us: u64,
    #[serde(default = "default_t1a_min_cp_dl")]
    pub t1a_min_cp_dl_us: u64,
    #[serde(default = "default_t1a_max_cp_ul")]
    pub t1a_max_cp_ul_us: u64,
    #[serde(default = "default_t1a_min_cp_ul")]
    pub t1a_min_cp_ul_us: u64,
    #[serde(default = "default_t1a_max_up")]
    pub t1a_max_up_us: u64,
    #[serde(default = "default_t1a_min_up")]
    pub t1a_min_up_us: u64,
}

fn default_t1a_max_cp_dl() -> u64 {
    500
}

fn default_t1a_min_cp_dl() -> u64 {
    258
}

fn default_t1a_max_cp_ul() -> u64 {
    500
}

fn default_t1a_min_cp_ul() -> u64 {
    285
}

fn default_t1a_max_up() -> u64 {
    300
}

fn default_t1a_min_up() -> u64 {
    85
}

impl Default for TxWindowConfig {
    fn default() -> Self {
        Self {
            t1a_max_cp_dl_us: default_t1a_max_cp_dl(),
            t1a_min_cp_dl_us: default_t1a_min_cp_dl(),
            t1a_max_cp_ul_us: default_t1a_max_cp_ul(),
            t1a_min_cp_ul_us: default_t1a_min_cp_ul(),
            t1a_max_up_us: default_t1a_max_up(),
            t1a_min_up_us: default_t1a_min_up(),
        }
    }
}

impl TxWindowConfig {
    pub fn durations(&self) -> TxWindowDurations {
        TxWindowDurations {
            t1a_max_cp_dl: Duration::from_micros(self.t1a_max_cp_dl_us),
            t1a_min_cp_dl: Duration::from_micros(self.t1a_min_cp_dl_us),
            t1a_max_cp_ul: Duration::from_micros(self.t1a_max_cp_ul_us),
            t1a_min_cp_ul: Duration::from_micros(self.t1a_min_cp_ul_us),
            t1a_max_up: Duration::from_micros(self.t1a_max_up_us),
            t1a_min_up: Duration::from_micros(self.t1a_min_up_us),
        }
    }
}

/// O-RAN Ta4 bounds of the RU
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RxWindowConfig {
    #[serde(default = "default_ta4_min")]
    pub ta4_min_us: u64,
    #[serde(default = "default_ta4_max")]
    pub ta4_max_us: u64,
}

fn default_ta4_min() -> u64 {
    50
}

fn default_ta4_max() -> u64 {
    331
}

impl Default for RxWindowConfig {
    fn default() -> Self {
        Self {
            ta4_min_us: default_ta4_min(),
            ta4_max_us: default_ta4_max(),
        }
    }
}

/// Per-sector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectorAppConfig {
    pub dl_eaxc: Vec<Eaxc>,
    pub ul_eaxc: Vec<Eaxc>,
    pub nof_prb: u16,
    /// MAC address of the RU, e.g. "70:b3:d5:e1:5b:06"
    pub ru_mac_addr: String,
    /// MAC address of the DU
    pub du_mac_addr: String,
    #[serde(default)]
    pub vlan_id: Option<u16>,
    #[serde(default = "default_pcp")]
    pub pcp: u8,
    #[serde(default = "default_mtu")]
    pub mtu: usize,
    /// Emulated fronthaul link
    #[serde(default)]
    pub zmq: ZmqEthernetConfig,
}

fn default_pcp() -> u8 {
    7
}

fn default_mtu() -> usize {
    9000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Statistics reporting period in seconds
    #[serde(default = "default_stats_period")]
    pub stats_period_s: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_period() -> u64 {
    5
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stats_period_s: default_stats_period(),
        }
    }
}

/// Test-pattern slot driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestModeConfig {
    /// Amplitude of the downlink test pattern, relative to full scale
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    /// Request the uplink symbols of every slot
    #[serde(default = "default_request_uplink")]
    pub request_uplink: bool,
}

fn default_amplitude() -> f32 {
    0.5
}

fn default_request_uplink() -> bool {
    true
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            request_uplink: default_request_uplink(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML or TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read configuration file {}", path))?;

        let extension = Path::new(path).extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let config = match extension {
            "yml" | "yaml" => Self::from_yaml_str(&contents)?,
            "toml" => Self::from_toml_str(&contents)?,
            other => return Err(anyhow!("Unsupported configuration format '{}': {}", other, path)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Check the settings the sector builder cannot check on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ru_ofh.sectors.is_empty() {
            return Err(anyhow!("At least one sector must be configured"));
        }
        if let Some(tdd) = &self.ru_ofh.tdd {
            tdd.validate(self.ru_ofh.cp)?;
        }
        let rx = &self.ru_ofh.rx_window;
        if rx.ta4_min_us > rx.ta4_max_us {
            return Err(anyhow!("Ta4 min ({} us) above Ta4 max ({} us)", rx.ta4_min_us, rx.ta4_max_us));
        }
        for (index, sector) in self.ru_ofh.sectors.iter().enumerate() {
            sector
                .ru_mac_addr
                .parse::<MacAddress>()
                .with_context(|| format!("Sector {}: invalid RU MAC address", index))?;
            sector
                .du_mac_addr
                .parse::<MacAddress>()
                .with_context(|| format!("Sector {}: invalid DU MAC address", index))?;
        }
        Ok(())
    }

    /// Sector configuration of the sector at `index`
    pub fn sector_config(&self, index: usize) -> anyhow::Result<SectorConfig> {
        let ru = &self.ru_ofh;
        let sector = ru
            .sectors
            .get(index)
            .ok_or_else(|| anyhow!("No sector {} configured", index))?;

        Ok(SectorConfig {
            sector_id: index,
            scs: ru.scs,
            cp: ru.cp,
            tdd_config: ru.tdd,
            dl_eaxc: sector.dl_eaxc.clone(),
            ul_eaxc: sector.ul_eaxc.clone(),
            nof_prb: sector.nof_prb,
            ru_mac: sector.ru_mac_addr.parse()?,
            du_mac: sector.du_mac_addr.parse()?,
            vlan_id: sector.vlan_id,
            pcp: sector.pcp,
            mtu: sector.mtu,
            iq_scaling: ru.iq_scaling,
            tx_window: ru.tx_window.durations(),
            dl_processing_time: Duration::from_micros(ru.dl_processing_time_us),
            ul_processing_time: Duration::from_micros(ru.ul_processing_time_us),
            rx_window: RxWindowTimingParameters::from_durations(
                Duration::from_micros(ru.rx_window.ta4_min_us),
                Duration::from_micros(ru.rx_window.ta4_max_us),
                ru.scs,
                ru.cp,
            ),
            max_advance_symbols: ru.max_advance_symbols,
            nof_frame_buffers: ru.nof_frame_buffers,
        })
    }
}
