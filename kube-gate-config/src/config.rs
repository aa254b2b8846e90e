// kube-gate-config/src/config.rs
// ============================================================================
// Module: Kube Gate Configuration
// Description: Configuration document model, loading, and validation.
// Purpose: Provide strict, fail-closed config parsing for the bridge.
// Dependencies: kube-gate-core, serde, serde_yaml
// ============================================================================

//! ## Overview
//! The configuration document has six sections: `server`, `middleware`,
//! `oauth_authorization_server`, `oauth_protected_resource`, `kubernetes`,
//! and `authorization`. `$NAME` and `${NAME}` references are expanded from
//! the process environment textually before parsing, matching how deployment
//! manifests inject secrets. Validation rejects anything the process could
//! not serve correctly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;

use kube_gate_core::Policy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read config: {0}")]
    Io(String),
    /// The document is not valid YAML for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// The document parsed but is not servable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Document Model
// ============================================================================

/// The complete configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Server identity and transport.
    #[serde(default)]
    pub server: ServerConfig,
    /// Transport middleware configuration.
    #[serde(default)]
    pub middleware: MiddlewareConfig,
    /// OAuth authorization-server discovery metadata.
    #[serde(default)]
    pub oauth_authorization_server: OauthAuthorizationServerConfig,
    /// OAuth protected-resource discovery metadata.
    #[serde(default)]
    pub oauth_protected_resource: OauthProtectedResourceConfig,
    /// Cluster contexts and namespace policy.
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    /// Authorization policies and identity settings.
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

/// Server identity and transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name advertised during the MCP handshake.
    #[serde(default)]
    pub name: String,
    /// Server version advertised during the MCP handshake.
    #[serde(default)]
    pub version: String,
    /// Transport selection.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport kind.
    #[serde(default, rename = "type")]
    pub transport_type: TransportType,
    /// HTTP transport settings, used when the kind is `http`.
    #[serde(default)]
    pub http: HttpTransportConfig,
}

/// Supported transport kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default)]
    pub host: String,
}

/// Middleware configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Access log shaping.
    #[serde(default)]
    pub access_logs: AccessLogsConfig,
    /// Forwarded-identity settings.
    #[serde(default)]
    pub jwt: JwtConfig,
}

/// Access log header shaping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessLogsConfig {
    /// Headers excluded from access logs.
    #[serde(default)]
    pub excluded_headers: Vec<String>,
    /// Headers redacted in access logs.
    #[serde(default)]
    pub redacted_headers: Vec<String>,
}

/// Forwarded-identity middleware configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Whether identity forwarding is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Validation settings.
    #[serde(default)]
    pub validation: JwtValidationConfig,
}

/// Forwarded-identity validation settings.
///
/// The bridge only reads the payload segment of the forwarded token;
/// signature verification belongs to the upstream proxy named by `strategy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwtValidationConfig {
    /// Validation strategy label, e.g. `forwarded`.
    #[serde(default)]
    pub strategy: String,
    /// Header carrying the forwarded bearer token.
    #[serde(default)]
    pub forwarded_header: String,
}

/// OAuth authorization-server discovery metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OauthAuthorizationServerConfig {
    /// Whether the discovery endpoint is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Optional endpoint URL suffix.
    #[serde(default)]
    pub url_suffix: String,
    /// Issuer URI advertised to clients.
    #[serde(default)]
    pub issuer_uri: String,
}

/// OAuth protected-resource discovery metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OauthProtectedResourceConfig {
    /// Whether the discovery endpoint is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Optional endpoint URL suffix.
    #[serde(default)]
    pub url_suffix: String,
    /// Resource identifier advertised to clients.
    #[serde(default)]
    pub resource: String,
    /// Authorization servers trusted for this resource.
    #[serde(default)]
    pub auth_servers: Vec<String>,
    /// JWKS URI advertised to clients.
    #[serde(default)]
    pub jwks_uri: String,
    /// Supported scopes advertised to clients.
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Supported bearer methods advertised to clients.
    #[serde(default)]
    pub bearer_methods_supported: Vec<String>,
}

/// Cluster contexts and namespace policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    /// Name of the initial active context.
    #[serde(default)]
    pub default_context: String,
    /// Explicitly configured contexts.
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
    /// Directory whose `*.yaml`/`*.yml` entries each contribute a context.
    #[serde(default)]
    pub contexts_dir: String,
}

impl KubernetesConfig {
    /// Returns true when any context source is configured.
    #[must_use]
    pub fn has_context_sources(&self) -> bool {
        !self.contexts.is_empty() || !self.contexts_dir.is_empty()
    }
}

/// A single named cluster context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Context name; unique across all sources.
    pub name: String,
    /// Credential file path; empty with an empty `kubeconfig_context` means
    /// in-cluster credentials.
    #[serde(default)]
    pub kubeconfig: String,
    /// Sub-context selector inside the credential file.
    #[serde(default)]
    pub kubeconfig_context: String,
    /// Free-form description reported by context tools.
    #[serde(default)]
    pub description: String,
    /// Namespace allow-list; empty allows any non-denied namespace.
    #[serde(default)]
    pub allowed_namespaces: Vec<String>,
    /// Namespace deny-list; wins over the allow-list.
    #[serde(default)]
    pub denied_namespaces: Vec<String>,
}

/// Authorization policies and identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Whether requests without identity claims may match policies.
    #[serde(default)]
    pub allow_anonymous: bool,
    /// Claim name used to derive a display identity.
    #[serde(default)]
    pub identity_claim: String,
    /// Authorization policies, evaluated per request.
    #[serde(default)]
    pub policies: Vec<Policy>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl Configuration {
    /// Loads configuration from a YAML file.
    ///
    /// Environment variables are expanded textually before parsing, then the
    /// document is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates a configuration document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env(content);
        let config: Self =
            serde_yaml::from_str(&expanded).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the document for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the document is not servable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.kubernetes.validate()?;
        self.authorization.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.transport_type == TransportType::Http
            && self.transport.http.host.is_empty()
        {
            return Err(ConfigError::Invalid(
                "server.transport.http.host is required for the http transport".to_string(),
            ));
        }
        Ok(())
    }
}

impl KubernetesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for context in &self.contexts {
            if context.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "kubernetes.contexts entries require a name".to_string(),
                ));
            }
            if !seen.insert(context.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate context name {:?} in kubernetes.contexts",
                    context.name
                )));
            }
        }
        if self.has_context_sources() && self.default_context.is_empty() {
            return Err(ConfigError::Invalid(
                "kubernetes.default_context is required when contexts are configured".to_string(),
            ));
        }
        // Directory-sourced context names are only known at load time, so
        // membership of default_context is enforced by the client manager
        // unless all sources are explicit.
        if self.contexts_dir.is_empty()
            && !self.contexts.is_empty()
            && !seen.contains(self.default_context.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "kubernetes.default_context {:?} is not a configured context",
                self.default_context
            )));
        }
        Ok(())
    }
}

impl AuthorizationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for policy in &self.policies {
            if policy.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "authorization.policies entries require a name".to_string(),
                ));
            }
            if !seen.insert(policy.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate policy name {:?} in authorization.policies",
                    policy.name
                )));
            }
            if policy.matcher.expression.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "policy {:?} requires a match expression",
                    policy.name
                )));
            }
            for fragment in [policy.allow.as_ref(), policy.deny.as_ref()].into_iter().flatten() {
                for rule in &fragment.resources {
                    rule.validate().map_err(|message| {
                        ConfigError::Invalid(format!(
                            "policy {:?} has an invalid resource rule: {message}",
                            policy.name
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Environment Expansion
// ============================================================================

/// Expands `$NAME` and `${NAME}` references from the process environment.
///
/// Unset variables expand to the empty string, matching standard shell-style
/// substitution in deployment tooling.
#[must_use]
pub fn expand_env(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    let mut chars = content.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }
        match chars.peek() {
            Some((_, '{')) => {
                let rest = &content[index + 2..];
                if let Some(end) = rest.find('}') {
                    let name = &rest[..end];
                    if is_valid_var_name(name) {
                        output.push_str(&env::var(name).unwrap_or_default());
                        // Skip past `{NAME}`.
                        for _ in 0..=end + 1 {
                            chars.next();
                        }
                        continue;
                    }
                }
                output.push(ch);
            }
            Some((start, first)) if first.is_ascii_alphabetic() || *first == '_' => {
                let start = *start;
                let mut end = start;
                while let Some((next, candidate)) = chars.peek() {
                    if candidate.is_ascii_alphanumeric() || *candidate == '_' {
                        end = next + candidate.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                output.push_str(&env::var(&content[start..end]).unwrap_or_default());
            }
            _ => output.push(ch),
        }
    }
    output
}

/// Returns true for a well-formed environment variable name.
fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
