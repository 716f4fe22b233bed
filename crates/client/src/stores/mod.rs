//! Local client state.

pub mod messages;

pub use messages::{ChatLine, Transcript};
