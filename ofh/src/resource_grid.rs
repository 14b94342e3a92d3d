//! Resource Grid Access
//!
//! The fronthaul pipeline sees a resource grid only through the reader and
//! writer capabilities defined here. `ResourceGrid` is the dense
//! port × symbol × subcarrier implementation used by the gNB application and
//! the tests.

use common::types::SectorId;
use common::SlotPoint;
use ndarray::{s, Array3};
use num_complex::Complex32;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Slot and sector a resource grid belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceGridContext {
    pub slot: SlotPoint,
    pub sector: SectorId,
}

/// Read capability over a resource grid
pub trait ResourceGridReader: Send + Sync {
    /// Number of antenna ports
    fn nof_ports(&self) -> usize;

    /// Number of OFDM symbols
    fn nof_symbols(&self) -> usize;

    /// Number of subcarriers
    fn nof_subc(&self) -> usize;

    /// Read one resource element
    fn get(&self, port: usize, symbol: usize, subc: usize) -> Complex32;

    /// Copy `out.len()` subcarriers of a symbol starting at `subc_offset`
    fn get_symbol(&self, out: &mut [Complex32], port: usize, symbol: usize, subc_offset: usize);
}

/// Write capability over a resource grid
pub trait ResourceGridWriter: Send {
    /// Number of antenna ports
    fn nof_ports(&self) -> usize;

    /// Number of OFDM symbols
    fn nof_symbols(&self) -> usize;

    /// Number of subcarriers
    fn nof_subc(&self) -> usize;

    /// Write `values` into a symbol starting at `subc_offset`
    fn put(&mut self, port: usize, symbol: usize, subc_offset: usize, values: &[Complex32]);
}

/// Grid shared between the uplink requester and the fronthaul receiver
pub type SharedResourceGrid = Arc<Mutex<ResourceGrid>>;

/// Dense resource grid: [port, symbol, subcarrier]
#[derive(Debug, Clone)]
pub struct ResourceGrid {
    grid: Array3<Complex32>,
}

impl ResourceGrid {
    /// Create a zeroed grid
    pub fn new(nof_ports: usize, nof_symbols: usize, nof_subc: usize) -> Self {
        Self {
            grid: Array3::zeros((nof_ports, nof_symbols, nof_subc)),
        }
    }

    /// Create a zeroed grid wrapped for sharing with the receiver
    pub fn new_shared(nof_ports: usize, nof_symbols: usize, nof_subc: usize) -> SharedResourceGrid {
        Arc::new(Mutex::new(Self::new(nof_ports, nof_symbols, nof_subc)))
    }

    /// Clear the entire grid
    pub fn set_all_zero(&mut self) {
        self.grid.fill(Complex32::new(0.0, 0.0));
    }

    /// Fill one symbol of one port with a single value
    pub fn fill_symbol(&mut self, port: usize, symbol: usize, value: Complex32) {
        self.grid.slice_mut(s![port, symbol, ..]).fill(value);
    }

    /// Check whether every element of a port is zero
    pub fn is_port_empty(&self, port: usize) -> bool {
        self.grid
            .slice(s![port, .., ..])
            .iter()
            .all(|re| re.re == 0.0 && re.im == 0.0)
    }
}

impl ResourceGridReader for ResourceGrid {
    fn nof_ports(&self) -> usize {
        self.grid.dim().0
    }

    fn nof_symbols(&self) -> usize {
        self.grid.dim().1
    }

    fn nof_subc(&self) -> usize {
        self.grid.dim().2
    }

    fn get(&self, port: usize, symbol: usize, subc: usize) -> Complex32 {
        self.grid[(port, symbol, subc)]
    }

    fn get_symbol(&self, out: &mut [Complex32], port: usize, symbol: usize, subc_offset: usize) {
        let row = self.grid.slice(s![port, symbol, subc_offset..subc_offset + out.len()]);
        for (dst, src) in out.iter_mut().zip(row.iter()) {
            *dst = *src;
        }
    }
}

impl ResourceGridWriter for ResourceGrid {
    fn nof_ports(&self) -> usize {
        self.grid.dim().0
    }

    fn nof_symbols(&self) -> usize {
        self.grid.dim().1
    }

    fn nof_subc(&self) -> usize {
        self.grid.dim().2
    }

    fn put(&mut self, port: usize, symbol: usize, subc_offset: usize, values: &[Complex32]) {
        let (nof_ports, nof_symbols, nof_subc) = self.grid.dim();
        if port >= nof_ports || symbol >= nof_symbols || subc_offset + values.len() > nof_subc {
            warn!(
                "Resource grid write out of bounds: port={}, symbol={}, subcarriers [{}, {})",
                port,
                symbol,
                subc_offset,
                subc_offset + values.len()
            );
            return;
        }

        self.grid
            .slice_mut(s![port, symbol, subc_offset..subc_offset + values.len()])
            .iter_mut()
            .zip(values.iter())
            .for_each(|(dst, src)| *dst = *src);
    }
}
