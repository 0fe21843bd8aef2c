// toolgate-config/src/lib.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, toolgate-core
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Missing
//! or invalid configuration fails closed; every numeric knob is bounds
//! checked before the gateway starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BackendConfig;
pub use config::ConfigError;
pub use config::DescriptorConfig;
pub use config::GatewayConfig;
pub use config::KeepAliveConfig;
pub use config::MessageConfig;
pub use config::ReconnectConfig;
pub use config::ServerConfig;
pub use config::ServerTransport;
