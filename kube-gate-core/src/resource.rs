// kube-gate-core/src/resource.rs
// ============================================================================
// Module: Resource Descriptors
// Description: Resource descriptor type and virtual-resource constants.
// Purpose: Provide the canonical shape for authorization resource facts.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A resource descriptor is the `(group, version, kind, name)` four-tuple a
//! tool invocation acts on. The namespace lives on the request rather than the
//! descriptor because cluster-scoped operations carry an empty namespace. The
//! reserved group `_` denotes virtual resources that do not exist in the
//! cluster; tools without a caller-supplied descriptor map to one of the three
//! virtual kinds below.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Virtual Resources
// ============================================================================

/// Reserved API group for virtual resources.
pub const VIRTUAL_GROUP: &str = "_";

/// Virtual kind covering API discovery tools.
pub const VIRTUAL_KIND_API_DISCOVERY: &str = "APIDiscovery";

/// Virtual kind covering cluster information tools.
pub const VIRTUAL_KIND_CLUSTER_INFO: &str = "ClusterInfo";

/// Virtual kind covering context management tools.
pub const VIRTUAL_KIND_CONTEXT: &str = "Context";

// ============================================================================
// SECTION: Resource Descriptor
// ============================================================================

/// Descriptor for the resource a tool invocation acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// API group; empty for the core group.
    #[serde(default)]
    pub group: String,
    /// API version.
    #[serde(default)]
    pub version: String,
    /// Resource kind.
    #[serde(default)]
    pub kind: String,
    /// Resource name; empty for collection operations.
    #[serde(default)]
    pub name: String,
}

impl ResourceRef {
    /// Creates a descriptor from its four components.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates a virtual descriptor under the reserved group.
    #[must_use]
    pub fn virtual_kind(kind: &str) -> Self {
        Self {
            group: VIRTUAL_GROUP.to_string(),
            version: String::new(),
            kind: kind.to_string(),
            name: String::new(),
        }
    }

    /// Returns true when every component is empty.
    ///
    /// An empty descriptor is the trigger for virtual-resource substitution;
    /// any caller-supplied component makes the descriptor real.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
            && self.version.is_empty()
            && self.kind.is_empty()
            && self.name.is_empty()
    }

    /// Returns true when the descriptor is in the reserved virtual group.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.group == VIRTUAL_GROUP
    }
}
