//! Access policies and their resolution for a target operation.
//!
//! Policies are declared up front through [`PolicyRegistryBuilder`]: one
//! optional policy per operation and one optional policy per group. Both are
//! evaluated when present; an operation-level policy never replaces the
//! policy of its group.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use gatekeep_core::CoreError;

use crate::Profile;

/// Identifier of a guarded operation: the enclosing group plus the action name.
///
/// Rendered as `group.action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    group: Cow<'static, str>,
    action: Cow<'static, str>,
}

impl OperationId {
    pub fn new(group: impl Into<Cow<'static, str>>, action: impl Into<Cow<'static, str>>) -> Self {
        Self {
            group: group.into(),
            action: action.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.group, self.action)
    }
}

impl FromStr for OperationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((group, action)) if !group.is_empty() && !action.is_empty() => {
                Ok(Self::new(group.to_string(), action.to_string()))
            }
            _ => Err(CoreError::invalid_id(format!("OperationId: expected 'group.action', got '{s}'"))),
        }
    }
}

/// Outcome of evaluating one [`AccessPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// `profile` was refused; `position` is its index in the policy.
    Deny { profile: Profile, position: usize },
}

/// A non-empty, ordered list of profiles that must all be granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    profiles: Vec<Profile>,
}

impl AccessPolicy {
    pub fn new<I, P>(profiles: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Profile>,
    {
        let profiles: Vec<Profile> = profiles.into_iter().map(Into::into).collect();
        if profiles.is_empty() {
            return Err(CoreError::validation("access policy requires at least one profile"));
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Evaluate every profile in declaration order.
    ///
    /// Stops at the first profile `decide` refuses; later profiles are never
    /// passed to `decide`.
    pub fn evaluate<F, E>(&self, decide: F) -> Result<Decision, E>
    where
        F: FnMut(&Profile) -> Result<bool, E>,
    {
        self.evaluate_from(0, decide)
    }

    /// Like [`AccessPolicy::evaluate`], skipping the first `start` profiles.
    ///
    /// Used to resume after an `onCheckFailed` override let a refused
    /// profile through.
    pub fn evaluate_from<F, E>(&self, start: usize, mut decide: F) -> Result<Decision, E>
    where
        F: FnMut(&Profile) -> Result<bool, E>,
    {
        for (position, profile) in self.profiles.iter().enumerate().skip(start) {
            if !decide(profile)? {
                return Ok(Decision::Deny {
                    profile: profile.clone(),
                    position,
                });
            }
        }
        Ok(Decision::Allow)
    }
}

/// Actions that bypass the generic pre-check, whatever their group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptOperations {
    actions: HashSet<String>,
}

impl ExemptOperations {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, action: impl Into<String>) {
        self.actions.insert(action.into());
    }

    pub fn contains(&self, op: &OperationId) -> bool {
        self.actions.contains(op.action())
    }
}

impl Default for ExemptOperations {
    /// `login`, `authenticate` and `logout` must stay reachable anonymously.
    fn default() -> Self {
        Self::new(["login", "authenticate", "logout"])
    }
}

/// Startup-built map from operations and groups to their policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    operations: HashMap<OperationId, AccessPolicy>,
    groups: HashMap<String, AccessPolicy>,
    unsecure_operations: HashSet<OperationId>,
    unsecure_groups: HashSet<String>,
    exempt: ExemptOperations,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    /// Policies that apply to `op`: its own first, then its group's.
    pub fn resolve(&self, op: &OperationId) -> Vec<&AccessPolicy> {
        let resolved: Vec<&AccessPolicy> = self
            .operations
            .get(op)
            .into_iter()
            .chain(self.groups.get(op.group()))
            .collect();
        tracing::debug!("resolved {} access policies for {}", resolved.len(), op);
        resolved
    }

    pub fn is_exempt(&self, op: &OperationId) -> bool {
        self.exempt.contains(op)
    }

    /// Whether `op` is marked to never load the connected principal.
    pub fn is_unsecure(&self, op: &OperationId) -> bool {
        self.unsecure_operations.contains(op) || self.unsecure_groups.contains(op.group())
    }

    pub fn exempt(&self) -> &ExemptOperations {
        &self.exempt
    }
}

/// Builder for [`PolicyRegistry`].
///
/// Declaring a second policy for the same operation or group replaces the
/// first one.
#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    registry: PolicyRegistry,
}

impl PolicyRegistryBuilder {
    pub fn operation(mut self, op: OperationId, policy: AccessPolicy) -> Self {
        self.registry.operations.insert(op, policy);
        self
    }

    pub fn group(mut self, group: impl Into<String>, policy: AccessPolicy) -> Self {
        self.registry.groups.insert(group.into(), policy);
        self
    }

    pub fn unsecure_operation(mut self, op: OperationId) -> Self {
        self.registry.unsecure_operations.insert(op);
        self
    }

    pub fn unsecure_group(mut self, group: impl Into<String>) -> Self {
        self.registry.unsecure_groups.insert(group.into());
        self
    }

    /// Add an action name to the exempt set (on top of the defaults).
    pub fn exempt(mut self, action: impl Into<String>) -> Self {
        self.registry.exempt.insert(action);
        self
    }

    pub fn build(self) -> PolicyRegistry {
        self.registry
    }
}
