//! Parsers for 13F filing documents.

pub mod thirteenf;
pub mod units;
pub mod utils;
