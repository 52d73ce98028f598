//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod config_warning;
mod dependency;
mod digest;
mod exposed_port;

pub use config_warning::ConfigWarning;
pub use dependency::{DependencyId, Origin, RegistryProtocol, SourceKind};
pub use digest::{Digest, DigestParseError};
pub use exposed_port::{ExposedPort, Protocol};
