//! Database module

mod pool;

pub use pool::*;
