//! Engine session abstraction with scoped acquisition and guaranteed release.

use pso_types::{ParameterBounds, PsoResult};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Something that can open a fresh engine session.
///
/// Sessions are never pooled: every optimization run acquires its own.
pub trait EngineBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Start a new engine session. Fails with `PsoError::Engine` when the
    /// engine is unavailable.
    fn start_session(&self) -> PsoResult<Box<dyn EngineSession>>;
}

/// A live connection to the external engine.
pub trait EngineSession: Send {
    /// Trigger the optimization entry point. `None` lets the engine apply
    /// its own default bounds.
    fn submit(&mut self, bounds: Option<&ParameterBounds>) -> PsoResult<()>;

    /// Block until the submitted run finishes. Returns whatever the engine
    /// printed while running.
    fn wait(&mut self) -> PsoResult<String>;

    /// Tear the session down. Must be safe to call on a session that never
    /// submitted or already finished.
    fn close(&mut self);
}

/// Owns an engine session for the duration of one run.
///
/// `close` runs exactly once when the guard goes out of scope, whichever
/// path the caller takes out.
pub struct Session {
    inner: Box<dyn EngineSession>,
    backend: String,
}

impl Session {
    pub fn acquire(backend: &dyn EngineBackend) -> PsoResult<Self> {
        let inner = backend.start_session()?;
        debug!("Engine session acquired ({})", backend.name());
        Ok(Self {
            inner,
            backend: backend.name().to_string(),
        })
    }
}

impl Deref for Session {
    type Target = dyn EngineSession;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.close();
        debug!("Engine session released ({})", self.backend);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
