use super::render::render_scalar;
use crate::agent::breakpoint::{Reference, StatusMessage, Variable};
use crate::agent::config::CaptureConfig;
use crate::agent::messages;
use crate::agent::runtime::{ObjectKind, ObjectRef, PropertySlot, Value};
use std::collections::HashMap;

/// Per-snapshot pool of compound values. Object identity collapses to a
/// single entry, so shared structure is captured once and cycles terminate.
#[derive(Default)]
pub struct VariableTable {
    entries: Vec<Variable>,
    index_by_identity: HashMap<usize, i32>,
    not_expanded: Option<i32>,
}

impl VariableTable {
    /// Turn a runtime value into a wire variable: scalars inline, compounds
    /// intern into the table and come back as an index reference.
    pub fn variable_for(&mut self, name: impl Into<String>, value: &Value, cfg: &CaptureConfig) -> Variable {
        match value {
            Value::Object(obj) => Variable::table_ref(name, self.intern(obj, cfg)),
            scalar => Variable::scalar(
                name,
                render_scalar(scalar, cfg.max_string_length),
                scalar.type_name(),
            ),
        }
    }

    /// Intern a compound value, materializing at most `maxProperties` of its
    /// own members. Re-interning the same object returns the existing index.
    pub fn intern(&mut self, obj: &ObjectRef, cfg: &CaptureConfig) -> i32 {
        if let Some(&index) = self.index_by_identity.get(&obj.id()) {
            return index;
        }

        // Reserve the slot before walking members so self-references land on
        // this index instead of recursing.
        let index = self.entries.len() as i32;
        self.entries.push(Variable::default());
        self.index_by_identity.insert(obj.id(), index);

        let data = obj.borrow();
        let total = data.properties.len();
        let mut members = Vec::with_capacity(total.min(cfg.max_properties));
        for property in data.properties.iter().take(cfg.max_properties) {
            let member = match &property.slot {
                PropertySlot::Data(value) => {
                    self.variable_for(property.name.clone(), value, cfg)
                }
                PropertySlot::Accessor => Variable::with_status(
                    Some(property.name.clone()),
                    StatusMessage::error(
                        Reference::VariableValue,
                        messages::NATIVE_PROPERTY,
                        vec![property.name.clone()],
                    ),
                ),
            };
            members.push(member);
        }

        let status = (total > cfg.max_properties).then(|| {
            StatusMessage::info(
                Reference::Unspecified,
                messages::ONLY_FIRST_CAPTURED,
                vec![cfg.max_properties.to_string()],
            )
        });

        let entry = Variable {
            name: None,
            value: data.name.clone(),
            r#type: Some(type_label(data.kind).to_string()),
            members,
            var_table_index: None,
            status,
        };
        self.entries[index as usize] = entry;
        index
    }

    /// Shared sentinel entry referenced by the argument and local stubs of
    /// frames past `maxExpandFrames`.
    pub fn not_expanded_entry(&mut self, max_expand_frames: usize) -> i32 {
        if let Some(index) = self.not_expanded {
            return index;
        }
        let index = self.entries.len() as i32;
        self.entries.push(Variable {
            status: Some(StatusMessage::error(
                Reference::Unspecified,
                messages::FRAMES_NOT_EXPANDED,
                vec![max_expand_frames.to_string()],
            )),
            ..Default::default()
        });
        self.not_expanded = Some(index);
        index
    }

    pub fn into_entries(self) -> Vec<Variable> {
        self.entries
    }
}

fn type_label(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Plain => "object",
        ObjectKind::Array => "array",
        ObjectKind::Function => "function",
    }
}
