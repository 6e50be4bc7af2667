//! Mutation configuration
//!
//! Declarative per-resource rules: which fields exist, which actions are
//! allowed on them, and which engine-managed behaviours are switched on.
//! Supplied by the caller per resource type and immutable for one request.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::item::Value;

use super::rules::{FieldValidator, RuleViolation};
use super::Action;

/// Rule for a single field
#[derive(Clone, Default)]
pub struct FieldRule {
    /// Field must be present (and non-null) on create
    pub mandatory: bool,

    /// Shape/action check invoked with `(value, action)`
    pub validator: Option<Arc<dyn FieldValidator>>,
}

impl FieldRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Attach a validator
    pub fn rule(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Attach a closure as validator
    pub fn check<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>, Action) -> Result<(), RuleViolation> + Send + Sync + 'static,
    {
        self.rule(f)
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("mandatory", &self.mandatory)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Black/white lists for one action
#[derive(Debug, Clone, Default)]
pub struct ActionRule {
    /// Fields never allowed for this action
    pub blacklist: BTreeSet<String>,

    /// When present, the only fields allowed for this action
    pub whitelist: Option<BTreeSet<String>>,
}

impl ActionRule {
    /// True when the lists permit `field`
    pub fn permits(&self, field: &str) -> bool {
        if self.blacklist.contains(field) {
            return false;
        }
        self.whitelist
            .as_ref()
            .map_or(true, |whitelist| whitelist.contains(field))
    }
}

/// Per-action lists
#[derive(Debug, Clone, Default)]
pub struct ActionRules {
    pub set: ActionRule,
    pub remove: ActionRule,
    pub add: ActionRule,
}

impl ActionRules {
    pub fn for_action(&self, action: Action) -> &ActionRule {
        match action {
            Action::Set => &self.set,
            Action::Remove => &self.remove,
            Action::Add => &self.add,
        }
    }

    fn for_action_mut(&mut self, action: Action) -> &mut ActionRule {
        match action {
            Action::Set => &mut self.set,
            Action::Remove => &mut self.remove,
            Action::Add => &mut self.add,
        }
    }
}

/// Mutation rules for one resource type
///
/// Defaults: no declared fields, no action lists, `fail_on_error`,
/// `auto_timestamp` and `auto_version` on; `enforce_serial_updates`,
/// `allow_overwrite` and `allow_undeclared_fields` off.
#[derive(Debug, Clone)]
pub struct MutationConfig {
    pub fields: BTreeMap<String, FieldRule>,
    pub action_rules: ActionRules,

    /// One invalid command voids the whole batch
    pub fail_on_error: bool,

    /// Stamp `lastUpdatedDate` (and `creationDate` on create)
    pub auto_timestamp: bool,

    /// Maintain the `version` counter and guard writes with it
    pub auto_version: bool,

    /// Reject updates whose observed version is stale
    pub enforce_serial_updates: bool,

    /// Create may replace an existing item
    pub allow_overwrite: bool,

    /// Accept fields with no entry in `fields`
    pub allow_undeclared_fields: bool,

    /// Extra identity fields that updates may not touch
    pub immutable_fields: BTreeSet<String>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            action_rules: ActionRules::default(),
            fail_on_error: true,
            auto_timestamp: true,
            auto_version: true,
            enforce_serial_updates: false,
            allow_overwrite: false,
            allow_undeclared_fields: false,
            immutable_fields: BTreeSet::new(),
        }
    }
}

impl MutationConfig {
    /// Create a new config builder
    pub fn builder() -> MutationConfigBuilder {
        MutationConfigBuilder::default()
    }

    /// Names of fields that must be present on create
    pub fn mandatory_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, rule)| rule.mandatory)
            .map(|(name, _)| name.as_str())
    }
}

/// Builder for MutationConfig
#[derive(Default)]
pub struct MutationConfigBuilder {
    config: MutationConfig,
}

impl MutationConfigBuilder {
    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.config.fields.insert(name.into(), rule);
        self
    }

    /// Forbid fields for an action
    pub fn blacklist<I, S>(mut self, action: Action, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .action_rules
            .for_action_mut(action)
            .blacklist
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Restrict an action to the listed fields
    pub fn whitelist<I, S>(mut self, action: Action, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .action_rules
            .for_action_mut(action)
            .whitelist
            .get_or_insert_with(BTreeSet::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn fail_on_error(mut self, enabled: bool) -> Self {
        self.config.fail_on_error = enabled;
        self
    }

    pub fn auto_timestamp(mut self, enabled: bool) -> Self {
        self.config.auto_timestamp = enabled;
        self
    }

    pub fn auto_version(mut self, enabled: bool) -> Self {
        self.config.auto_version = enabled;
        self
    }

    pub fn enforce_serial_updates(mut self, enabled: bool) -> Self {
        self.config.enforce_serial_updates = enabled;
        self
    }

    pub fn allow_overwrite(mut self, enabled: bool) -> Self {
        self.config.allow_overwrite = enabled;
        self
    }

    pub fn allow_undeclared_fields(mut self, enabled: bool) -> Self {
        self.config.allow_undeclared_fields = enabled;
        self
    }

    /// Mark fields as identity fields that updates may not change
    pub fn immutable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .immutable_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> MutationConfig {
        self.config
    }
}
