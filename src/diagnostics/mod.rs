//! Diagnostics data model returned alongside cleaned images.
//!
//! Algorithms report what they did through [`CleaningDiagnostics`]: stage
//! timings, the statistics of the optional isolated-pixel post-filter and a
//! map of named counters. The benchmark report embeds it per image.

pub mod cleaning;
pub mod timing;

pub use cleaning::CleaningDiagnostics;
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
