//! Application Services
//!
//! The execution engine and the event loop that serializes access to it.
//! The engine is synchronous and owns all state; the loop runs it as a
//! background task and fans its events out to subscribers.

mod engine_loop;
mod execution_engine;

pub use engine_loop::{EngineHandle, EngineLoop, EngineLoopConfig, EngineLoopError};
pub use execution_engine::{EnginePorts, EngineSettings, ExecutionEngine, TickReport};
