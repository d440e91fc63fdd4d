//! Shipped implementations of the boundary ports.

pub mod http;
pub mod memory;
pub mod pg;
