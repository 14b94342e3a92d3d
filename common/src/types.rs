//! Common Types for the Open Fronthaul stack
//!
//! Defines fundamental radio parameters used throughout the pipeline

use serde::{Deserialize, Serialize};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use thiserror::Error;

/// Errors raised when constructing common value types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid subcarrier spacing: {0} kHz")]
    InvalidSubcarrierSpacing(u32),

    #[error("Invalid numerology: {0}")]
    InvalidNumerology(u8),

    #[error("Invalid OFDM symbol range [{start}, {stop}) for {nof_symbols} symbols per slot")]
    InvalidSymbolRange {
        start: u32,
        stop: u32,
        nof_symbols: u32,
    },

    #[error("Invalid TDD pattern: {0}")]
    InvalidTddPattern(String),
}

/// Maximum supported numerology (240 kHz)
pub const MAX_NUMEROLOGY: u8 = 4;

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Numerology index (mu) of this spacing
    pub fn numerology(&self) -> u8 {
        match self {
            SubcarrierSpacing::Scs15 => 0,
            SubcarrierSpacing::Scs30 => 1,
            SubcarrierSpacing::Scs60 => 2,
            SubcarrierSpacing::Scs120 => 3,
            SubcarrierSpacing::Scs240 => 4,
        }
    }

    /// Build from a numerology index
    pub fn from_numerology(numerology: u8) -> Result<Self, TypesError> {
        match numerology {
            0 => Ok(SubcarrierSpacing::Scs15),
            1 => Ok(SubcarrierSpacing::Scs30),
            2 => Ok(SubcarrierSpacing::Scs60),
            3 => Ok(SubcarrierSpacing::Scs120),
            4 => Ok(SubcarrierSpacing::Scs240),
            _ => Err(TypesError::InvalidNumerology(numerology)),
        }
    }

    /// Number of slots in a 1 ms subframe
    pub fn slots_per_subframe(&self) -> u32 {
        1 << self.numerology()
    }

    /// Spacing in kHz
    pub fn as_khz(&self) -> u32 {
        self.to_u32().unwrap_or(15)
    }
}

impl TryFrom<u32> for SubcarrierSpacing {
    type Error = TypesError;

    fn try_from(khz: u32) -> Result<Self, Self::Error> {
        SubcarrierSpacing::from_u32(khz).ok_or(TypesError::InvalidSubcarrierSpacing(khz))
    }
}

impl From<SubcarrierSpacing> for u32 {
    fn from(scs: SubcarrierSpacing) -> Self {
        scs.as_khz()
    }
}

/// Cyclic prefix type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclicPrefix {
    Normal,
    Extended,
}

impl CyclicPrefix {
    /// Number of OFDM symbols per slot
    pub fn nof_symbols_per_slot(&self) -> u32 {
        match self {
            CyclicPrefix::Normal => 14,
            CyclicPrefix::Extended => 12,
        }
    }
}

/// Antenna-carrier identifier of one fronthaul stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eaxc(pub u16);

impl Eaxc {
    /// Get the raw identifier
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Eaxc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sector (cell) index inside a Radio Unit
pub type SectorId = usize;
