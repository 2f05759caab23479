//! Parse schema source into field descriptors using PEST.

use crate::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Offset used by a bare `@one_indexed` directive.
pub const DEFAULT_ONE_INDEXED_OFFSET: u64 = 2;

/// Parse schema source into descriptors.
pub fn parse(source: &str) -> Result<Schema, String> {
    let pairs = SchemaParser::parse(Rule::schema, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_schema(pair)
}

fn build_schema(pair: Pair<Rule>) -> Result<Schema, String> {
    let mut records = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::record_section {
            records.push(build_record(inner)?);
        }
    }
    Ok(Schema { records })
}

fn build_record(pair: Pair<Rule>) -> Result<RecordDef, String> {
    let mut name = String::new();
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::field => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    if name.is_empty() {
        return Err("record: missing name".to_string());
    }
    Ok(RecordDef { name, fields })
}

fn build_field(pair: Pair<Rule>) -> Result<FieldDef, String> {
    let mut name = String::new();
    let mut kind = None;
    let mut directives = Directives::default();
    let mut visibility = Visibility::Public;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::directive => apply_directive(inner, &mut directives)?,
            Rule::visibility => visibility = Visibility::Private,
            Rule::ident => name = inner.as_str().to_string(),
            Rule::type_spec => kind = Some(build_type_spec(inner)?),
            _ => {}
        }
    }
    let kind = kind.ok_or_else(|| format!("field {}: missing type", name))?;
    if directives.one_indexed.is_some() && !matches!(kind, FieldKind::Sequence(_)) {
        return Err(format!(
            "field {}: @one_indexed applies only to list fields",
            name
        ));
    }
    Ok(FieldDef {
        name,
        kind,
        directives,
        visibility,
    })
}

fn apply_directive(pair: Pair<Rule>, directives: &mut Directives) -> Result<(), String> {
    let inner = pair.into_inner().next().ok_or("Empty directive")?;
    match inner.as_rule() {
        Rule::skip_attr => directives.skip = true,
        Rule::one_indexed_attr => {
            let offset = match inner.into_inner().find(|p| p.as_rule() == Rule::num) {
                Some(n) => n
                    .as_str()
                    .parse()
                    .map_err(|_| "one_indexed(n): offset out of range")?,
                None => DEFAULT_ONE_INDEXED_OFFSET,
            };
            directives.one_indexed = Some(offset);
        }
        other => return Err(format!("Unknown directive: {:?}", other)),
    }
    Ok(())
}

fn build_type_spec(pair: Pair<Rule>) -> Result<FieldKind, String> {
    let inner = pair.into_inner().next().ok_or("Empty type_spec")?;
    match inner.as_rule() {
        Rule::base_type => Ok(FieldKind::Primitive(parse_width(inner.as_str())?)),
        Rule::list_type => {
            let elem = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::type_spec)
                .ok_or("list<T>: missing element type")?;
            Ok(FieldKind::Sequence(Box::new(build_type_spec(elem)?)))
        }
        Rule::variant_type => Ok(FieldKind::Polymorphic(build_variant(inner)?)),
        Rule::record_ref => Ok(FieldKind::Record(inner.as_str().trim().to_string())),
        other => Err(format!("Unhandled type rule: {:?}", other)),
    }
}

fn build_variant(pair: Pair<Rule>) -> Result<VariantSpec, String> {
    let mut spec = VariantSpec::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => spec.discriminant = Some(inner.as_str().to_string()),
            Rule::variant_table => {
                let mut table = VariantTable::default();
                for arm in inner.into_inner() {
                    if arm.as_rule() == Rule::variant_arm {
                        table.arms.push(build_variant_arm(arm)?);
                    }
                }
                spec.table = Some(table);
            }
            _ => {}
        }
    }
    if spec.table.is_some() && spec.discriminant.is_none() {
        return Err("variant table requires a discriminant: variant(field) { ... }".to_string());
    }
    Ok(spec)
}

fn build_variant_arm(pair: Pair<Rule>) -> Result<VariantArm, String> {
    let mut values = Vec::new();
    let mut record = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::literal => values.push(parse_literal(inner.as_str())?),
            Rule::ident => record = Some(inner.as_str().to_string()),
            _ => {}
        }
    }
    Ok(VariantArm {
        values,
        record: record.ok_or("variant arm: missing record")?,
    })
}

fn parse_width(s: &str) -> Result<Width, String> {
    match s {
        "u8" => Ok(Width::U8),
        "u16" => Ok(Width::U16),
        "u32" => Ok(Width::U32),
        _ => Err(format!("Unknown base type: {}", s)),
    }
}

fn parse_literal(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|_| format!("Invalid literal: {}", s))
}
