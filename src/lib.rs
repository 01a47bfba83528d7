//! Lab report extraction engine: turns per-facility PDF lab reports into a
//! flat set of normalized result records.

pub mod assembler;
pub mod config;
pub mod constants;
pub mod error;
pub mod facilities;
pub mod logging;
pub mod normalize;
pub mod ocr;
pub mod output;
pub mod pagetext;
pub mod pipeline;
pub mod records;
