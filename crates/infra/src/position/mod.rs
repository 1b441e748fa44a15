//! Position source adapters

pub mod replay;

pub use replay::ReplayPositionSource;
