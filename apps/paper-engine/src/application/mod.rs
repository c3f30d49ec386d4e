//! Application Layer
//!
//! The application layer orchestrates domain logic. It defines:
//!
//! - **Ports**: Interfaces for fees, lots, instruments, prices, storage and events
//! - **Services**: The execution engine and its event loop
//! - **DTOs**: Engine inputs, events, summaries and snapshots

pub mod dto;
pub mod ports;
pub mod services;

pub use dto::*;
pub use ports::*;
pub use services::*;
