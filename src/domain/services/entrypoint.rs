//! Entrypoint wrapper
//!
//! Container runtimes start the entrypoint as PID 1, which neither reaps
//! orphaned children nor forwards SIGTERM/SIGINT. The artifact is therefore
//! always started through a minimal init supervisor:
//!
//! ```text
//! [supervisor, "--", artifact]
//! ```
//!
//! If the supervisor cannot start, the container exits non-zero before the
//! artifact runs, so no partial state is left behind.

use crate::error::{PipelineError, PipelineResult};

/// Separator between supervisor options and the supervised command
pub const SUPERVISOR_SEPARATOR: &str = "--";

/// Entrypoint command vector whose first element is always the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint(Vec<String>);

impl Entrypoint {
    /// Wrap `artifact` with `supervisor`
    pub fn wrap(supervisor: &str, artifact: &str) -> PipelineResult<Self> {
        for (what, path) in [("supervisor", supervisor), ("artifact", artifact)] {
            if !path.starts_with('/') {
                return Err(PipelineError::assembly(format!(
                    "{what} path '{path}' must be absolute"
                )));
            }
        }
        if supervisor == artifact {
            return Err(PipelineError::assembly(format!(
                "artifact path '{artifact}' collides with the supervisor"
            )));
        }
        Ok(Self(vec![
            supervisor.to_string(),
            SUPERVISOR_SEPARATOR.to_string(),
            artifact.to_string(),
        ]))
    }

    pub fn supervisor(&self) -> &str {
        &self.0[0]
    }

    pub fn artifact(&self) -> &str {
        &self.0[2]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
