//! Runtime configuration for the benchmark binary.

pub mod bench;
