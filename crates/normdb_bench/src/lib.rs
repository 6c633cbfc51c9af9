//! Benchmark support for NormDB.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
