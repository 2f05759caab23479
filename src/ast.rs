//! Field descriptors for record schemas.
//!
//! A [`Schema`] is an ordered list of [`RecordDef`]s, each an ordered list of
//! [`FieldDef`]s. Descriptors are plain data: the decoder walks them in
//! declared order and dispatches on [`FieldKind`].

use crate::resolve::{Resolvers, VariantResolver};
use crate::value::{Record, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Root schema definition: the record types, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub records: Vec<RecordDef>,
}

#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        RecordDef {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Ordinal position of a field within the record.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub directives: Directives,
    pub visibility: Visibility,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            kind,
            directives: Directives::default(),
            visibility: Visibility::Public,
        }
    }

    /// Mark the field excluded: it keeps its zero value.
    pub fn skip(mut self) -> Self {
        self.directives.skip = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// The preceding count field stores the element count plus `offset`.
    pub fn one_indexed(mut self, offset: u64) -> Self {
        self.directives.one_indexed = Some(offset);
        self
    }

    /// Whether the decoder reads this field at all.
    pub fn is_eligible(&self) -> bool {
        !self.directives.skip && self.visibility == Visibility::Public
    }
}

/// Declared kind of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Primitive(Width),
    /// Nested record, by type name.
    Record(String),
    /// Elements counted by the immediately preceding field.
    Sequence(Box<FieldKind>),
    /// Concrete record type chosen at decode time.
    Polymorphic(VariantSpec),
}

impl FieldKind {
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Primitive(w) => w.name().to_string(),
            FieldKind::Record(name) => name.clone(),
            FieldKind::Sequence(elem) => format!("list<{}>", elem.describe()),
            FieldKind::Polymorphic(spec) => match &spec.discriminant {
                Some(d) => format!("variant({})", d),
                None => "variant".to_string(),
            },
        }
    }
}

/// Width of an unsigned big-endian primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Width::U8 => "u8",
            Width::U16 => "u16",
            Width::U32 => "u32",
        }
    }

    pub fn zero(self) -> Value {
        match self {
            Width::U8 => Value::U8(0),
            Width::U16 => Value::U16(0),
            Width::U32 => Value::U32(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub skip: bool,
    /// Offset subtracted from the stored count before allocating a sequence.
    pub one_indexed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Internal to the record; never decoded.
    Private,
}

/// How a polymorphic field finds its concrete type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantSpec {
    /// Earlier field whose value selects the variant (used for tables and diagnostics).
    pub discriminant: Option<String>,
    pub table: Option<VariantTable>,
}

/// Inline discriminant-to-record mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantTable {
    pub arms: Vec<VariantArm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantArm {
    pub values: Vec<u64>,
    pub record: String,
}

impl VariantTable {
    pub fn lookup(&self, value: u64) -> Option<&str> {
        self.arms
            .iter()
            .find(|arm| arm.values.contains(&value))
            .map(|arm| arm.record.as_str())
    }
}

/// Resolved schema: records by name plus registered variant resolvers.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub schema: Schema,
    pub records_by_name: HashMap<String, usize>,
    resolvers: Resolvers,
}

impl ResolvedSchema {
    pub fn resolve(schema: Schema) -> Result<Self, String> {
        let mut records_by_name = HashMap::new();
        for (i, r) in schema.records.iter().enumerate() {
            if records_by_name.insert(r.name.clone(), i).is_some() {
                return Err(format!("Duplicate record name: {}", r.name));
            }
            let mut seen = HashSet::new();
            for f in &r.fields {
                if !seen.insert(f.name.as_str()) {
                    return Err(format!("Duplicate field {} in record {}", f.name, r.name));
                }
            }
        }
        let resolved = ResolvedSchema {
            schema,
            records_by_name,
            resolvers: Resolvers::default(),
        };
        resolved.check_containment()?;
        Ok(resolved)
    }

    pub fn get_record(&self, name: &str) -> Option<&RecordDef> {
        self.records_by_name
            .get(name)
            .map(|&i| &self.schema.records[i])
    }

    /// Bind a type-resolution callback to a polymorphic field.
    pub fn register_resolver<V>(&mut self, record: &str, field: &str, resolver: V) -> Result<(), String>
    where
        V: VariantResolver + 'static,
    {
        let def = self
            .get_record(record)
            .ok_or_else(|| format!("Unknown record: {}", record))?;
        let f = def
            .field(field)
            .ok_or_else(|| format!("Unknown field {} in record {}", field, record))?;
        if !matches!(f.kind, FieldKind::Polymorphic(_)) {
            return Err(format!("Field {}.{} is not a variant", record, field));
        }
        self.resolvers.insert(record, field, Arc::new(resolver));
        Ok(())
    }

    pub fn resolver(&self, record: &str, field: &str) -> Option<&dyn VariantResolver> {
        self.resolvers.get(record, field)
    }

    /// Zero-valued instance of a record type.
    pub fn zeroed(&self, name: &str) -> Option<Record> {
        let def = self.get_record(name)?;
        let mut fields = Vec::with_capacity(def.fields.len());
        for f in &def.fields {
            let zero = match &f.kind {
                FieldKind::Primitive(w) => w.zero(),
                FieldKind::Record(nested) => match self.zeroed(nested) {
                    Some(r) => Value::Record(r),
                    None => Value::Nil,
                },
                FieldKind::Sequence(_) => Value::List(Vec::new()),
                FieldKind::Polymorphic(_) => Value::Nil,
            };
            fields.push((f.name.clone(), zero));
        }
        Some(Record::new(def.name.clone(), fields))
    }

    /// Reject records that contain themselves through nested-record fields.
    fn check_containment(&self) -> Result<(), String> {
        fn visit<'a>(
            schema: &'a ResolvedSchema,
            name: &'a str,
            stack: &mut Vec<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> Result<(), String> {
            if done.contains(name) {
                return Ok(());
            }
            if stack.contains(&name) {
                stack.push(name);
                return Err(format!("Record contains itself: {}", stack.join(" -> ")));
            }
            let Some(def) = schema.get_record(name) else {
                return Ok(());
            };
            stack.push(name);
            for f in &def.fields {
                if let FieldKind::Record(nested) = &f.kind {
                    visit(schema, nested, stack, done)?;
                }
            }
            stack.pop();
            done.insert(name);
            Ok(())
        }

        let mut done = HashSet::new();
        for r in &self.schema.records {
            visit(self, &r.name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple() -> RecordDef {
        RecordDef::new("Simple")
            .with_field(FieldDef::new("a", FieldKind::Primitive(Width::U8)))
            .with_field(FieldDef::new("b", FieldKind::Primitive(Width::U16)))
            .with_field(FieldDef::new("ignored", FieldKind::Primitive(Width::U16)).skip())
            .with_field(FieldDef::new("internal", FieldKind::Primitive(Width::U8)).private())
    }

    #[test]
    fn zeroed_record_follows_descriptor_order() {
        let schema = ResolvedSchema::resolve(Schema { records: vec![simple()] }).unwrap();
        let r = schema.zeroed("Simple").unwrap();
        let names: Vec<_> = r.fields().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "ignored", "internal"]);
        assert_eq!(r.get("b"), Some(&Value::U16(0)));
    }

    #[test]
    fn eligibility_excludes_skip_and_private() {
        let def = simple();
        let eligible: Vec<_> = def.fields.iter().filter(|f| f.is_eligible()).map(|f| f.name.as_str()).collect();
        assert_eq!(eligible, ["a", "b"]);
    }

    #[test]
    fn resolve_rejects_duplicates() {
        let err = ResolvedSchema::resolve(Schema { records: vec![simple(), simple()] }).unwrap_err();
        assert!(err.contains("Duplicate record"));

        let dup_field = RecordDef::new("D")
            .with_field(FieldDef::new("x", FieldKind::Primitive(Width::U8)))
            .with_field(FieldDef::new("x", FieldKind::Primitive(Width::U8)));
        let err = ResolvedSchema::resolve(Schema { records: vec![dup_field] }).unwrap_err();
        assert!(err.contains("Duplicate field x"));
    }

    #[test]
    fn resolve_rejects_self_containment() {
        let a = RecordDef::new("A").with_field(FieldDef::new("b", FieldKind::Record("B".into())));
        let b = RecordDef::new("B").with_field(FieldDef::new("a", FieldKind::Record("A".into())));
        let err = ResolvedSchema::resolve(Schema { records: vec![a, b] }).unwrap_err();
        assert!(err.contains("A -> B -> A"), "{}", err);
    }

    #[test]
    fn recursion_through_sequence_is_allowed() {
        let tree = RecordDef::new("Tree")
            .with_field(FieldDef::new("n", FieldKind::Primitive(Width::U8)))
            .with_field(FieldDef::new(
                "children",
                FieldKind::Sequence(Box::new(FieldKind::Record("Tree".into()))),
            ));
        let schema = ResolvedSchema::resolve(Schema { records: vec![tree] }).unwrap();
        assert_eq!(schema.zeroed("Tree").unwrap().get("children"), Some(&Value::List(vec![])));
    }

    #[test]
    fn register_resolver_checks_field_kind() {
        let rec = RecordDef::new("V")
            .with_field(FieldDef::new("e", FieldKind::Primitive(Width::U8)))
            .with_field(FieldDef::new("v", FieldKind::Polymorphic(VariantSpec::default())));
        let mut schema = ResolvedSchema::resolve(Schema { records: vec![rec] }).unwrap();
        let by_tag = |_: &Record| -> Option<String> { None };
        assert!(schema.register_resolver("V", "e", by_tag).is_err());
        assert!(schema.register_resolver("V", "missing", by_tag).is_err());
        assert!(schema.register_resolver("Nope", "v", by_tag).is_err());
        schema.register_resolver("V", "v", by_tag).unwrap();
        assert!(schema.resolver("V", "v").is_some());
    }

    #[test]
    fn table_lookup_matches_any_listed_value() {
        let table = VariantTable {
            arms: vec![
                VariantArm { values: vec![7], record: "Class".into() },
                VariantArm { values: vec![9, 10, 11], record: "Ref".into() },
            ],
        };
        assert_eq!(table.lookup(10), Some("Ref"));
        assert_eq!(table.lookup(7), Some("Class"));
        assert_eq!(table.lookup(99), None);
    }
}
