//! Domain Layer
//!
//! The core of packwright - pipeline rules without I/O dependencies.
//!
//! ## Structure
//!
//! - `entities/` - Lock file, build artifact, image spec, image
//! - `value_objects/` - Digest, dependency identity, exposed port
//! - `services/` - Verifier, layer builder, entrypoint wrapper
//! - `ports/` - Interfaces implemented by the infrastructure layer
//!
//! ## Design Principles
//!
//! 1. **No I/O** - This layer never touches the file system or network directly
//! 2. **Validated construction** - Invalid lock files and image specs cannot be built
//! 3. **Ports & Adapters** - All I/O goes through trait-defined ports

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
