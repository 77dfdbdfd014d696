//! Native implementations of the core platform traits.

pub mod native_random;

pub use native_random::NativeRandom;
