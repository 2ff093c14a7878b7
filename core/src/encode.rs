//! Write-back encoder: turns diff output into the destination column's native value

use crate::model::{FieldDescriptor, FieldType, OptionRef, WriteValue};

pub const DEFAULT_SEPARATOR: &str = ", ";

/// Encoded value plus the strings that could not be represented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub value: WriteValue,
    pub dropped: Vec<String>,
}

/// Encode `values` for `destination`.
///
/// MultiSelect destinations get references to existing options whose name
/// matches exactly; values without a matching option are dropped, never
/// created. Every other destination gets the values joined by `separator`.
pub fn encode(destination: &FieldDescriptor, values: &[String], separator: &str) -> Encoded {
    match destination.field_type {
        FieldType::MultiSelect => {
            let mut refs = Vec::with_capacity(values.len());
            let mut dropped = Vec::new();
            for value in values {
                match destination.option_by_name(value) {
                    Some(opt) => refs.push(OptionRef {
                        id: opt.id.clone(),
                        text: opt.name.clone(),
                    }),
                    None => dropped.push(value.clone()),
                }
            }
            Encoded {
                value: WriteValue::Options(refs),
                dropped,
            }
        }
        _ => Encoded {
            value: WriteValue::Text(values.join(separator)),
            dropped: Vec::new(),
        },
    }
}
