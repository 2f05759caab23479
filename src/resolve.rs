//! Type-resolution callbacks for polymorphic fields.
//!
//! A resolver inspects the partially decoded record (every field before the
//! polymorphic one is populated) and names the record type to decode next.

use crate::ast::VariantSpec;
use crate::value::Record;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Chooses the concrete record type of a polymorphic field.
pub trait VariantResolver: Send + Sync {
    /// Name of the record type to decode, or `None` if the discriminant is unrecognized.
    fn resolve(&self, record: &Record) -> Option<String>;
}

impl<F> VariantResolver for F
where
    F: Fn(&Record) -> Option<String> + Send + Sync,
{
    fn resolve(&self, record: &Record) -> Option<String> {
        self(record)
    }
}

/// Inline tables resolve by looking up the discriminant's decoded value.
impl VariantResolver for VariantSpec {
    fn resolve(&self, record: &Record) -> Option<String> {
        let table = self.table.as_ref()?;
        let value = record.get_u64(self.discriminant.as_deref()?)?;
        table.lookup(value).map(str::to_string)
    }
}

/// Registered callbacks, keyed by (record, field).
#[derive(Clone, Default)]
pub struct Resolvers {
    by_field: HashMap<(String, String), Arc<dyn VariantResolver>>,
}

impl Resolvers {
    pub fn insert(&mut self, record: &str, field: &str, resolver: Arc<dyn VariantResolver>) {
        self.by_field
            .insert((record.to_string(), field.to_string()), resolver);
    }

    pub fn get(&self, record: &str, field: &str) -> Option<&dyn VariantResolver> {
        self.by_field
            .get(&(record.to_string(), field.to_string()))
            .map(|r| r.as_ref())
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .by_field
            .keys()
            .map(|(r, field)| format!("{}.{}", r, field))
            .collect();
        keys.sort();
        f.debug_struct("Resolvers").field("fields", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{VariantArm, VariantTable};
    use crate::value::Value;

    fn tagged(tag: u8) -> Record {
        Record::new("Tagged", vec![("e".into(), Value::U8(tag)), ("v".into(), Value::Nil)])
    }

    #[test]
    fn closure_resolver() {
        let r = |rec: &Record| match rec.get_u64("e") {
            Some(1) => Some("One".to_string()),
            _ => None,
        };
        assert_eq!(r.resolve(&tagged(1)).as_deref(), Some("One"));
        assert_eq!(r.resolve(&tagged(2)), None);
    }

    #[test]
    fn table_resolver_needs_discriminant() {
        let table = VariantTable {
            arms: vec![VariantArm { values: vec![1], record: "One".into() }],
        };
        let spec = VariantSpec {
            discriminant: Some("e".into()),
            table: Some(table.clone()),
        };
        assert_eq!(spec.resolve(&tagged(1)).as_deref(), Some("One"));
        assert_eq!(spec.resolve(&tagged(99)), None);

        let undirected = VariantSpec { discriminant: None, table: Some(table) };
        assert_eq!(undirected.resolve(&tagged(1)), None);
    }

    #[test]
    fn registry_debug_lists_fields() {
        let mut resolvers = Resolvers::default();
        resolvers.insert("CpInfo", "info", Arc::new(|_: &Record| -> Option<String> { None }));
        assert!(resolvers.get("CpInfo", "info").is_some());
        assert!(resolvers.get("CpInfo", "tag").is_none());
        assert_eq!(format!("{:?}", resolvers), r#"Resolvers { fields: ["CpInfo.info"] }"#);
    }
}
