//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**:
//!   - `fees/`: Broker and statutory fee schedules
//!   - `lots/`: Exchange lot table
//!   - `instruments/`: Instrument registry
//!   - `persistence/`: Snapshot stores (in-memory, JSON file)
//!   - `events/`: Event publishers
//!
//! - **Wiring**:
//!   - `config/`: Builds the engine's ports and settings from configuration

pub mod config;
pub mod events;
pub mod fees;
pub mod instruments;
pub mod lots;
pub mod persistence;
