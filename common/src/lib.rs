//! Common Utilities and Types Library
//! 
//! This crate provides the timing and radio value types shared by the
//! Open Fronthaul pipeline, the Radio Unit composition layer and the gNB
//! application.

pub mod types;
pub mod slot_point;
pub mod tdd;
pub mod utils;

// Re-export commonly used items
pub use types::*;
pub use slot_point::{SlotPoint, SlotSymbolPoint};
pub use tdd::{OfdmSymbolRange, TddPattern, TddUlDlConfig};
pub use utils::*;
