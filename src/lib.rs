// Provider catalog and per-provider overrides
pub mod catalog;

// Runtime configuration
pub mod config;

// Connector entity, credential bundle, persistent store
pub mod connector;

// Error taxonomy
pub mod error;

// OAuth state store and orchestrator
pub mod oauth;

// Connect / callback / disconnect / sync coordination
pub mod service;

// Content sync adapters and ingestion contract
pub mod sync;

// Background connection health sweeper
pub mod sweeper;
