//! Network transports for reaching the vault store.

pub mod tcp;

pub use tcp::TcpChannel;
