//! Command Compiler
//!
//! One enriched command becomes exactly one [`CompiledItem`]:
//! - create → `Put`, guarded by "item must not exist" unless overwrite is allowed
//! - update → partial `Update`, guarded by "item must exist"
//! - delete → `Delete`, guarded by "item must exist"
//!
//! Version guards from the enricher are ANDed onto the existence guard.

use crate::error::{ParkError, Result};
use crate::item::{Attributes, Key, Value};
use crate::store::{CompiledItem, Condition, Operation, UpdateExpression};

use super::{CommandMode, EnrichedCommand, FieldChange, LogicalCommand, MutationConfig};

/// Reject updates that touch identity fields
pub fn check_identity(
    command: &LogicalCommand,
    config: &MutationConfig,
    mode: CommandMode,
) -> Result<()> {
    if mode != CommandMode::Update {
        return Ok(());
    }
    let touched = command
        .data
        .keys()
        .find(|field| Key::is_key_field(field) || config.immutable_fields.contains(*field));
    match touched {
        Some(field) => Err(ParkError::ImmutableField {
            key: command.key.clone(),
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

/// Compile an enriched command
pub fn compile(
    table: &str,
    command: EnrichedCommand,
    mode: CommandMode,
    config: &MutationConfig,
) -> Result<CompiledItem> {
    let EnrichedCommand {
        key,
        data,
        condition,
        version,
    } = command;

    if !key.is_complete() {
        return Err(ParkError::MissingKey {
            detail: format!("cannot compile {:?} for {}", mode, key),
        });
    }

    let (operation, existence) = match mode {
        CommandMode::Create => {
            let attributes = build_attributes(&key, data)?;
            let existence = (!config.allow_overwrite).then_some(Condition::ItemNotExists);
            (Operation::Put(attributes), existence)
        }
        CommandMode::Update => {
            let expression = build_update(data);
            (Operation::Update(expression), Some(Condition::ItemExists))
        }
        CommandMode::Delete => (Operation::Delete, Some(Condition::ItemExists)),
    };

    Ok(CompiledItem {
        table: table.to_string(),
        key,
        operation,
        condition: Condition::merge(existence, condition),
        version,
    })
}

/// Full attribute map for a Put
///
/// Removals have nothing to remove on a new item and are dropped; an add
/// on a new item initialises the field with the delta.
fn build_attributes(key: &Key, data: impl IntoIterator<Item = (String, FieldChange)>) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for (field, change) in data {
        if Key::is_key_field(&field) {
            return Err(ParkError::ImmutableField {
                key: key.clone(),
                field,
            });
        }
        match change {
            FieldChange::Set(Value::Null) | FieldChange::Remove => {}
            FieldChange::Set(value) => {
                attributes.insert(field, value);
            }
            FieldChange::Add(Value::List(items)) => {
                attributes.insert(field, Value::List(items));
            }
            FieldChange::Add(value) if value.is_number() => {
                attributes.insert(field, value);
            }
            // A single element appended to a not-yet-existing list
            FieldChange::Add(value) => {
                attributes.insert(field, Value::List(vec![value]));
            }
        }
    }
    Ok(attributes)
}

/// SET/REMOVE/ADD clauses for only the fields present in `data`
fn build_update(data: impl IntoIterator<Item = (String, FieldChange)>) -> UpdateExpression {
    let mut expression = UpdateExpression::default();
    for (field, change) in data {
        match change {
            FieldChange::Set(Value::Null) | FieldChange::Remove => {
                expression.remove.insert(field);
            }
            FieldChange::Set(value) => {
                expression.set.insert(field, value);
            }
            FieldChange::Add(value) => {
                expression.add.insert(field, value);
            }
        }
    }
    expression
}
