// kube-gate-core/src/authz.rs
// ============================================================================
// Module: Policy Evaluator
// Description: Compiled policy evaluation for tool invocations.
// Purpose: Provide fail-closed effective-permission decisions.
// Dependencies: cel-interpreter, serde, thiserror
// ============================================================================

//! ## Overview
//! The evaluator owns the compiled policy set. Each policy carries one CEL
//! match predicate over five free variables (`payload`, `tool`, `context`,
//! `namespace`, `resource`) plus optional allow and deny fragments. Per
//! request, every matching policy's fragments are folded into an
//! effective-permission accumulator and the decision is derived from it.
//! The evaluator is immutable after construction and never blocks.
//!
//! ## Invariants
//! - A predicate that fails to compile is fatal at construction.
//! - A predicate that fails at evaluation time is skipped, never treated as
//!   false-then-denied; the failure affects only its own policy.
//! - Deny-by-default is absolute: an empty matching set denies.
//! - A policy's tool/context deny restricts only that policy's contribution;
//!   resource deny rules accumulate globally and any match denies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use cel_interpreter::Context;
use cel_interpreter::Program;
use cel_interpreter::Value as CelValue;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::claims::IdentityClaims;
use crate::resource::ResourceRef;
use crate::tooling::ToolName;

/// Token meaning "any" in policy sets.
const WILDCARD: &str = "*";

// ============================================================================
// SECTION: Policy Model
// ============================================================================

/// A named authorization policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name, used in diagnostics.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Match predicate deciding whether the policy applies to a request.
    #[serde(rename = "match")]
    pub matcher: MatchExpression,
    /// Permissions granted when the policy matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<PermissionFragment>,
    /// Permissions withheld when the policy matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<PermissionFragment>,
}

/// Match predicate wrapper holding the CEL expression source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchExpression {
    /// CEL boolean expression over the request facts.
    pub expression: String,
}

/// Allow or deny fragment of a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionFragment {
    /// Tool name tokens; `*` means any tool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Context name tokens; `*` means any context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    /// Resource rules, matched rule-wise disjunctively.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRule>,
    /// Label key prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_prefixes: Vec<String>,
    /// Annotation key prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotation_prefixes: Vec<String>,
}

/// Structural rule matched against a resource descriptor.
///
/// An omitted token list means "any" for its field; a rule matches only when
/// every non-empty field matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRule {
    /// API group tokens; the literal `""` targets the core group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// API version tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    /// Resource kind tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    /// Namespace tokens; the literal `""` targets cluster-scoped requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Resource name tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl ResourceRule {
    /// Validates the rule's token lists.
    ///
    /// The empty token is meaningful only for groups (the core API group)
    /// and namespaces (cluster-scoped requests); an empty version, kind, or
    /// name token can never describe a real resource and is rejected.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, tokens) in
            [("versions", &self.versions), ("kinds", &self.kinds), ("names", &self.names)]
        {
            if tokens.iter().any(String::is_empty) {
                return Err(format!("empty token in resource rule {field}"));
            }
        }
        Ok(())
    }

    /// Returns true when the rule matches the descriptor and namespace.
    #[must_use]
    pub fn matches(&self, resource: &ResourceRef, namespace: &str) -> bool {
        token_match(&self.groups, &resource.group)
            && token_match(&self.versions, &resource.version)
            && token_match(&self.kinds, &resource.kind)
            && wildcard_match_any(&self.namespaces, namespace)
            && wildcard_match_any(&self.names, &resource.name)
    }
}

/// Exact-or-wildcard membership test; an empty token list matches anything.
fn token_match(tokens: &[String], value: &str) -> bool {
    tokens.is_empty() || tokens.iter().any(|token| token == WILDCARD || token == value)
}

/// Wildcard-shape membership test; an empty token list matches anything.
fn wildcard_match_any(tokens: &[String], value: &str) -> bool {
    tokens.is_empty() || tokens.iter().any(|token| wildcard_match(token, value))
}

/// Matches the four wildcard shapes: `*`, `prefix*`, `*suffix`, `*middle*`.
fn wildcard_match(pattern: &str, value: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }
    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), Some(_)) => {
            // Both ends starred: containment on the middle.
            let middle = rest.strip_suffix('*').unwrap_or(rest);
            value.contains(middle)
        }
        (Some(suffix), None) => value.ends_with(suffix),
        (None, Some(prefix)) => value.starts_with(prefix),
        (None, None) => pattern == value,
    }
}

// ============================================================================
// SECTION: Requests and Decisions
// ============================================================================

/// Facts available to policy evaluation for one request.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    /// Caller identity claims; empty means anonymous.
    pub claims: &'a IdentityClaims,
    /// Tool being invoked.
    pub tool: &'a str,
    /// Target context name.
    pub context: &'a str,
    /// Target namespace; empty for cluster-scoped requests.
    pub namespace: &'a str,
    /// Resource descriptor; empty triggers virtual substitution.
    pub resource: ResourceRef,
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is permitted.
    Allow,
    /// The request is refused.
    Deny,
}

impl Decision {
    /// Returns true for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing the evaluator.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A policy's match predicate failed to compile.
    #[error("failed to compile policy {policy}: {message}")]
    Compile {
        /// Name of the offending policy.
        policy: String,
        /// Compiler diagnostic.
        message: String,
    },
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// A policy with its precompiled match program.
struct CompiledPolicy {
    policy: Policy,
    program: Program,
}

/// Evaluates authorization policies against per-request facts.
pub struct Evaluator {
    allow_anonymous: bool,
    policies: Vec<CompiledPolicy>,
}

/// Effective permissions accumulated from matching policies.
#[derive(Default)]
struct EffectivePermissions {
    tools: BTreeSet<String>,
    contexts: BTreeSet<String>,
    allow_resources: Vec<ResourceRule>,
    deny_resources: Vec<ResourceRule>,
}

impl Evaluator {
    /// Compiles the policy set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Compile`] when any match predicate is invalid.
    pub fn new(policies: Vec<Policy>, allow_anonymous: bool) -> Result<Self, AuthzError> {
        let mut compiled = Vec::with_capacity(policies.len());
        for policy in policies {
            let program =
                Program::compile(&policy.matcher.expression).map_err(|err| AuthzError::Compile {
                    policy: policy.name.clone(),
                    message: err.to_string(),
                })?;
            compiled.push(CompiledPolicy {
                policy,
                program,
            });
        }
        Ok(Self {
            allow_anonymous,
            policies: compiled,
        })
    }

    /// Returns whether anonymous requests are permitted to match policies.
    #[must_use]
    pub const fn allow_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Decides whether the request is allowed.
    pub fn decide(&self, request: &AccessRequest<'_>) -> Decision {
        if request.claims.is_empty() && !self.allow_anonymous {
            return Decision::Deny;
        }
        let resource = effective_resource(request);
        let Some(context) = self.request_context(request, &resource) else {
            return Decision::Deny;
        };

        let mut permissions = EffectivePermissions::default();
        for compiled in &self.policies {
            if self.matches(compiled, &context) {
                fold_policy(&compiled.policy, &mut permissions);
            }
        }
        decide_from_permissions(&permissions, request, &resource)
    }

    /// Decides whether a label key is permitted for the request.
    pub fn label_prefix_allowed(&self, request: &AccessRequest<'_>, key: &str) -> Decision {
        self.prefix_allowed(request, key, |fragment| &fragment.label_prefixes)
    }

    /// Decides whether an annotation key is permitted for the request.
    pub fn annotation_prefix_allowed(&self, request: &AccessRequest<'_>, key: &str) -> Decision {
        self.prefix_allowed(request, key, |fragment| &fragment.annotation_prefixes)
    }

    /// Shared prefix decision for labels and annotations.
    ///
    /// A deny prefix is a local restriction: when the wildcard allow is
    /// present, a denied key can be re-allowed by any non-wildcard allow
    /// prefix contributed by a matching policy.
    fn prefix_allowed(
        &self,
        request: &AccessRequest<'_>,
        key: &str,
        select: fn(&PermissionFragment) -> &Vec<String>,
    ) -> Decision {
        let resource = effective_resource(request);
        let Some(context) = self.request_context(request, &resource) else {
            return Decision::Deny;
        };

        let mut allowed = BTreeSet::new();
        let mut denied = BTreeSet::new();
        for compiled in &self.policies {
            if !self.matches(compiled, &context) {
                continue;
            }
            if let Some(allow) = &compiled.policy.allow {
                allowed.extend(select(allow).iter().cloned());
            }
            if let Some(deny) = &compiled.policy.deny {
                denied.extend(select(deny).iter().cloned());
            }
        }

        if allowed.contains(WILDCARD) {
            for prefix in &denied {
                if key.starts_with(prefix.as_str()) {
                    let reallowed = allowed
                        .iter()
                        .any(|allow| allow != WILDCARD && key.starts_with(allow.as_str()));
                    return if reallowed { Decision::Allow } else { Decision::Deny };
                }
            }
            return Decision::Allow;
        }
        if allowed.iter().any(|allow| key.starts_with(allow.as_str())) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// Builds the CEL evaluation context for the request facts.
    ///
    /// Returns `None` when a fact cannot be converted; callers fail closed.
    fn request_context(
        &self,
        request: &AccessRequest<'_>,
        resource: &ResourceRef,
    ) -> Option<Context> {
        let mut context = Context::default();
        context.add_variable("payload", request.claims.to_value()).ok()?;
        context.add_variable("tool", request.tool).ok()?;
        context.add_variable("context", request.context).ok()?;
        context.add_variable("namespace", request.namespace).ok()?;
        context
            .add_variable(
                "resource",
                json!({
                    "group": resource.group,
                    "version": resource.version,
                    "kind": resource.kind,
                    "name": resource.name,
                }),
            )
            .ok()?;
        Some(context)
    }

    /// Evaluates a compiled predicate; errors and non-boolean results skip
    /// the policy so one broken predicate cannot suppress another grant.
    fn matches(&self, compiled: &CompiledPolicy, context: &Context) -> bool {
        match compiled.program.execute(context) {
            Ok(CelValue::Bool(matched)) => matched,
            Ok(_) => {
                tracing::warn!(
                    policy = %compiled.policy.name,
                    "policy predicate returned a non-boolean value; skipping"
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    policy = %compiled.policy.name,
                    error = %err,
                    "policy predicate evaluation failed; skipping"
                );
                false
            }
        }
    }
}

/// Substitutes the tool's virtual descriptor when the caller supplied none.
fn effective_resource(request: &AccessRequest<'_>) -> ResourceRef {
    if request.resource.is_empty() {
        if let Some(virtual_resource) =
            ToolName::parse(request.tool).and_then(ToolName::virtual_resource)
        {
            return virtual_resource;
        }
    }
    request.resource.clone()
}

/// Folds one matching policy into the accumulator.
///
/// Tool and context denial is local to the policy: a `*` deny suppresses the
/// policy's whole contribution for that set, and listed tokens are subtracted
/// from it. Resource rules accumulate globally on both sides.
fn fold_policy(policy: &Policy, permissions: &mut EffectivePermissions) {
    let empty = PermissionFragment::default();
    let deny = policy.deny.as_ref().unwrap_or(&empty);
    if let Some(allow) = &policy.allow {
        if !deny.tools.iter().any(|token| token == WILDCARD) {
            for tool in &allow.tools {
                if !deny.tools.contains(tool) {
                    permissions.tools.insert(tool.clone());
                }
            }
        }
        if !deny.contexts.iter().any(|token| token == WILDCARD) {
            for context in &allow.contexts {
                if !deny.contexts.contains(context) {
                    permissions.contexts.insert(context.clone());
                }
            }
        }
        permissions.allow_resources.extend(allow.resources.iter().cloned());
    }
    permissions.deny_resources.extend(deny.resources.iter().cloned());
}

/// Derives the final decision from accumulated permissions.
fn decide_from_permissions(
    permissions: &EffectivePermissions,
    request: &AccessRequest<'_>,
    resource: &ResourceRef,
) -> Decision {
    if !permissions.tools.contains(WILDCARD) && !permissions.tools.contains(request.tool) {
        return Decision::Deny;
    }
    if !permissions.contexts.contains(WILDCARD) && !permissions.contexts.contains(request.context) {
        return Decision::Deny;
    }
    if permissions.allow_resources.is_empty() && permissions.deny_resources.is_empty() {
        return Decision::Allow;
    }
    if permissions.deny_resources.iter().any(|rule| rule.matches(resource, request.namespace)) {
        return Decision::Deny;
    }
    if permissions.allow_resources.is_empty() {
        return Decision::Allow;
    }
    if permissions.allow_resources.iter().any(|rule| rule.matches(resource, request.namespace)) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
