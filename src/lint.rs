//! Static checks for record schemas.
//!
//! Reports schema-definition problems that the decoder would otherwise only
//! hit when it reaches the offending field.
//!
//! ## Rules
//!
//! - **Sequence first**: a `list<T>` field must not be the first field of its record.
//! - **Count field**: the field before a `list<T>` must be an unsigned primitive.
//! - **Unknown record**: every referenced record type (fields, elements, variant arms) must exist.
//! - **Discriminant order**: `variant(d)` requires `d` to be an earlier unsigned primitive field.
//! - **Element kind**: sequence elements must be primitives or records.
//! - **Resolver needed** (warning): a `variant` with no table must have a resolver registered in code.
//! - **Zero offset** (warning): `@one_indexed(0)` is the same as no directive.
//!
//! Run the linter via the `lint_schema` binary: `cargo run --bin lint_schema -- file.schema`.
//! Exit code 1 if any error-level findings.

use crate::ast::{FieldDef, FieldKind, RecordDef, Schema};
use std::collections::HashSet;

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    SequenceFirst,
    CountNotUnsigned,
    UnknownRecord,
    DiscriminantOrder,
    ElementKind,
    ResolverNeeded,
    NoDiscriminant,
    ZeroOffset,
}

impl LintRule {
    pub fn id(self) -> &'static str {
        match self {
            LintRule::SequenceFirst => "sequence-first",
            LintRule::CountNotUnsigned => "count-not-unsigned",
            LintRule::UnknownRecord => "unknown-record",
            LintRule::DiscriminantOrder => "discriminant-order",
            LintRule::ElementKind => "element-kind",
            LintRule::ResolverNeeded => "resolver-needed",
            LintRule::NoDiscriminant => "no-discriminant",
            LintRule::ZeroOffset => "zero-offset",
        }
    }
}

/// A single lint message, located by record and field.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub record: String,
    pub field: String,
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

/// Run all rules on a schema. Messages follow declaration order.
pub fn lint(schema: &Schema) -> Vec<LintMessage> {
    let known: HashSet<&str> = schema.records.iter().map(|r| r.name.as_str()).collect();
    let mut out = Vec::new();
    for record in &schema.records {
        for (i, field) in record.fields.iter().enumerate() {
            lint_field(&known, record, i, field, &mut out);
        }
    }
    out
}

fn lint_field(
    known: &HashSet<&str>,
    record: &RecordDef,
    index: usize,
    field: &FieldDef,
    out: &mut Vec<LintMessage>,
) {
    let mut push = |rule: LintRule, severity: Severity, message: String| {
        out.push(LintMessage {
            record: record.name.clone(),
            field: field.name.clone(),
            rule,
            severity,
            message,
        });
    };

    match &field.kind {
        FieldKind::Primitive(_) => {}
        FieldKind::Record(name) => {
            if !known.contains(name.as_str()) {
                push(LintRule::UnknownRecord, Severity::Error, format!("unknown record type {}", name));
            }
        }
        FieldKind::Sequence(elem) => {
            // Excluded sequences are never decoded and need no count field.
            let counted = field.is_eligible();
            if counted && index == 0 {
                push(
                    LintRule::SequenceFirst,
                    Severity::Error,
                    "sequence is the first field; there is no count field before it".to_string(),
                );
            } else if counted {
                let count = &record.fields[index - 1];
                if !matches!(count.kind, FieldKind::Primitive(_)) {
                    push(
                        LintRule::CountNotUnsigned,
                        Severity::Error,
                        format!("count field {} is {}, not an unsigned primitive", count.name, count.kind.describe()),
                    );
                }
            }
            match elem.as_ref() {
                FieldKind::Primitive(_) => {}
                FieldKind::Record(name) => {
                    if !known.contains(name.as_str()) {
                        push(LintRule::UnknownRecord, Severity::Error, format!("unknown element type {}", name));
                    }
                }
                other => push(
                    LintRule::ElementKind,
                    Severity::Error,
                    format!("{} cannot be a sequence element", other.describe()),
                ),
            }
            if field.directives.one_indexed == Some(0) {
                push(
                    LintRule::ZeroOffset,
                    Severity::Warning,
                    "one_indexed(0) has no effect".to_string(),
                );
            }
        }
        FieldKind::Polymorphic(spec) => {
            if spec.discriminant.is_none() {
                push(
                    LintRule::NoDiscriminant,
                    Severity::Warning,
                    "variant names no discriminant; write variant(field) so unresolved values are reported".to_string(),
                );
            }
            if let Some(d) = &spec.discriminant {
                let earlier = record.fields[..index].iter().find(|f| &f.name == d);
                match earlier {
                    Some(f) if matches!(f.kind, FieldKind::Primitive(_)) => {}
                    Some(f) => push(
                        LintRule::DiscriminantOrder,
                        Severity::Error,
                        format!("discriminant {} is {}, not an unsigned primitive", d, f.kind.describe()),
                    ),
                    None => push(
                        LintRule::DiscriminantOrder,
                        Severity::Error,
                        format!("discriminant {} is not declared before this field", d),
                    ),
                }
            }
            match &spec.table {
                Some(table) => {
                    for arm in &table.arms {
                        if !known.contains(arm.record.as_str()) {
                            push(
                                LintRule::UnknownRecord,
                                Severity::Error,
                                format!("unknown variant type {}", arm.record),
                            );
                        }
                    }
                }
                None => push(
                    LintRule::ResolverNeeded,
                    Severity::Warning,
                    "variant has no table; a resolver must be registered".to_string(),
                ),
            }
        }
    }
}
