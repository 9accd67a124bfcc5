//! # Memory Management
//!
//! Pre-allocated pools for small, frequently reused handles.

mod pool;

pub use pool::IdPool;
