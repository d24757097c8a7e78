//! # pso-engine
//!
//! Everything that happens inside the isolated runner process: opening an
//! engine session, triggering the optimization entry point with optional
//! bounds, and reading the result artifacts back.

pub mod command;
pub mod invoker;
pub mod reader;
pub mod session;

pub use command::{CommandEngine, EngineConfig, InvocationStyle, DEFAULT_ENGINE, DEFAULT_ENTRY_POINT};
pub use invoker::{run_pipeline, CompletionStatus, OptimizerInvoker, PipelineOutput, RunHandle};
pub use reader::{ReadOutcome, ResultReader, ARTIFACTS};
pub use session::{EngineBackend, EngineSession, Session};
