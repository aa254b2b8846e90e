// kube-gate-config/src/lib.rs
// ============================================================================
// Module: Kube Gate Configuration Library
// Description: Public API surface for Kube Gate configuration.
// Purpose: Expose the configuration document model and loader.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Configuration is a single YAML document with six top-level sections.
//! Environment variables are substituted textually before parsing, and the
//! parsed document is validated fail-closed: an invalid configuration is a
//! fatal startup error, never a degraded run.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AccessLogsConfig;
pub use config::AuthorizationConfig;
pub use config::ConfigError;
pub use config::Configuration;
pub use config::ContextConfig;
pub use config::HttpTransportConfig;
pub use config::JwtConfig;
pub use config::JwtValidationConfig;
pub use config::KubernetesConfig;
pub use config::MiddlewareConfig;
pub use config::OauthAuthorizationServerConfig;
pub use config::OauthProtectedResourceConfig;
pub use config::ServerConfig;
pub use config::TransportConfig;
pub use config::TransportType;
