//! Field Validator
//!
//! Pure checks of a command against its [`MutationConfig`]. Identical
//! inputs always produce the identical accept/reject outcome.
//!
//! ## Order per field
//! 1. action blacklist
//! 2. action whitelist
//! 3. field must be declared (unless undeclared fields are allowed)
//! 4. the field's rule function
//!
//! List checks always take precedence over rule functions.

use crate::error::{ParkError, Result};
use crate::item::Key;

use super::{
    Action, CommandMode, FieldChange, LogicalCommand, MutationConfig, CREATION_DATE_FIELD,
    LAST_UPDATED_FIELD, VERSION_FIELD,
};

/// Validate one field change, returning the implied action
pub fn validate_field(
    key: &Key,
    field: &str,
    change: &FieldChange,
    config: &MutationConfig,
) -> Result<Action> {
    let action = change.action();
    let lists = config.action_rules.for_action(action);

    // Steps 1-2: black/white lists
    if !lists.permits(field) {
        return Err(ParkError::ForbiddenField {
            key: key.clone(),
            field: field.to_string(),
            action,
        });
    }

    // Step 3: declared?
    let rule = config.fields.get(field);
    if rule.is_none() && !config.allow_undeclared_fields {
        return Err(ParkError::ForbiddenField {
            key: key.clone(),
            field: field.to_string(),
            action,
        });
    }

    // Step 4: rule function
    if let Some(validator) = rule.and_then(|r| r.validator.as_ref()) {
        validator
            .validate(change.value(), action)
            .map_err(|violation| ParkError::InvalidFieldValue {
                key: key.clone(),
                field: field.to_string(),
                message: violation.0,
            })?;
    }

    Ok(action)
}

/// Validate a whole command before enrichment
pub fn validate_command(
    command: &LogicalCommand,
    config: &MutationConfig,
    mode: CommandMode,
) -> Result<()> {
    let key = &command.key;
    if !key.is_complete() {
        return Err(ParkError::MissingKey {
            detail: format!("{:?} requires both partition and sort key, got {}", mode, key),
        });
    }

    // Deletes carry no field data to validate
    if mode == CommandMode::Delete {
        return Ok(());
    }

    for (field, change) in &command.data {
        if is_engine_managed(field, config) {
            continue;
        }
        let action = validate_field(key, field, change, config)?;

        // A mandatory field may not be removed later either
        if action == Action::Remove && is_mandatory(field, config) {
            return Err(ParkError::MissingField {
                key: key.clone(),
                field: field.clone(),
            });
        }
    }

    if mode == CommandMode::Create {
        for field in config.mandatory_fields() {
            let present = command
                .data
                .get(field)
                .map_or(false, |change| change.action() != Action::Remove);
            if !present {
                return Err(ParkError::MissingField {
                    key: key.clone(),
                    field: field.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Fields the enricher overwrites anyway are not validated
fn is_engine_managed(field: &str, config: &MutationConfig) -> bool {
    match field {
        VERSION_FIELD => config.auto_version,
        LAST_UPDATED_FIELD | CREATION_DATE_FIELD => config.auto_timestamp,
        _ => false,
    }
}

fn is_mandatory(field: &str, config: &MutationConfig) -> bool {
    config.fields.get(field).map_or(false, |rule| rule.mandatory)
}
