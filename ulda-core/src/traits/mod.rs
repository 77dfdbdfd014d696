//! Platform abstraction traits: the core never touches the OS RNG or the network directly.

pub mod random;
pub mod channel;
