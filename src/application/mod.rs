//! Application Layer
//!
//! Use cases that orchestrate the pipeline stages.
//! This layer:
//! - Depends on Domain layer (entities, services, ports)
//! - Does NOT contain business rules (those are in Domain)
//! - Coordinates between Infrastructure and Domain
//!
//! ## Use Cases
//!
//! - `ResolveUseCase` - Fetch, verify and cache every locked dependency
//! - `BuildUseCase` - Compile the source tree hermetically
//! - `AssembleUseCase` - Stack the image layers and derive config/manifest
//! - `Pipeline` - Chains the use cases behind the two CLI actions

pub mod assemble;
pub mod build;
pub mod pipeline;
pub mod resolve;

pub use assemble::{check_supervisor, AssembleUseCase};
pub use build::{BuildOptions, BuildUseCase};
pub use pipeline::{ImageSummary, Pipeline, PipelineInputs, PipelineSummary};
pub use resolve::{ResolveOptions, ResolveUseCase};
