//! Registry backends bundled with the gateway.

pub mod memory;

pub use memory::MemoryRegistry;
