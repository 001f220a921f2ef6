//! Fields command: list the schema's field definitions.

use anyhow::{Result, bail};
use courtside_core::{FieldAccess, FieldKind, Schema};

pub fn run(schema: &Schema, category: Option<String>) -> Result<()> {
    let categories: Vec<String> = match category {
        Some(wanted) => {
            if schema.category_fields(&wanted).is_empty() {
                bail!(
                    "unknown category '{}' (categories: {})",
                    wanted,
                    schema.categories().join(", ")
                );
            }
            vec![wanted]
        }
        None => schema.categories().to_vec(),
    };

    for name in categories {
        let fields = schema.category_fields(&name);
        println!("{} ({} fields)", name, fields.len());
        for field in fields {
            let kind = match &field.kind {
                FieldKind::Number => "number".to_string(),
                FieldKind::Enumerated { values } => format!("enum[{}]", values.len()),
                FieldKind::Text { .. } => "text".to_string(),
            };
            let deref = match field.access {
                FieldAccess::Direct => String::new(),
                FieldAccess::Dereference { offset } => format!("  deref @ {:#x}", offset),
            };
            println!(
                "  {:<36} @ {:#06x} bit {:>2} len {:>3}  {}{}",
                field.name, field.offset, field.start_bit, field.length, kind, deref
            );
        }
    }
    Ok(())
}
