//! Domain Services
//!
//! Pure business logic services that operate on domain entities.
//! These services have no I/O dependencies and are easily testable.

pub mod entrypoint;
mod layer_builder;
mod verifier;

pub use entrypoint::{Entrypoint, SUPERVISOR_SEPARATOR};
pub use layer_builder::LayerBuilder;
pub use verifier::verify;
