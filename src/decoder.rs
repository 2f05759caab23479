//! Structural decoder: populate records from a byte stream by walking their
//! field descriptors.
//!
//! Fields are decoded strictly in declared order. Sequences take their length
//! from the immediately preceding field, and polymorphic fields take their
//! concrete type from a resolver that sees the record decoded so far. Nested
//! records, sequence elements and variants are decoded by recursing on the
//! same stream; any failure aborts the whole top-level decode.

use crate::ast::{FieldDef, FieldKind, RecordDef, ResolvedSchema, VariantSpec, Width};
use crate::error::{DecodeError, ErrorKind, SchemaError};
use crate::primitive;
use crate::resolve::VariantResolver;
use crate::value::{Record, Value};
use std::io::{Cursor, Read};
use tracing::{debug, trace};

/// Elements preallocated for a sequence before any of them is read.
const MAX_PREALLOC: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum record nesting (top-level record is depth 1).
    pub max_depth: usize,
    /// Sequence elements allowed in one top-level decode, summed over every
    /// sequence. Checked against each declared count before reading it.
    pub max_elements: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_depth: 64,
            max_elements: 1 << 22,
        }
    }
}

/// Decodes values of a schema from a forward-only reader.
pub struct Decoder<'s, R> {
    reader: R,
    schema: &'s ResolvedSchema,
    options: DecodeOptions,
    consumed: u64,
    depth: usize,
    elements: u64,
}

impl<'s, R: Read> Decoder<'s, R> {
    pub fn new(reader: R, schema: &'s ResolvedSchema) -> Self {
        Decoder {
            reader,
            schema,
            options: DecodeOptions::default(),
            consumed: 0,
            depth: 0,
            elements: 0,
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Bytes read from the stream so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decode into `target`, which must be a zero-valued primitive or record.
    ///
    /// A primitive target is read directly; a record target has every
    /// eligible field populated in order. Any other value is rejected before
    /// a byte is read.
    pub fn decode(&mut self, target: &mut Value) -> Result<(), DecodeError> {
        self.elements = 0;
        let result = match target {
            Value::Record(record) => self.decode_into(record),
            Value::Variant(record) => self.decode_into(record),
            Value::List(_) => Err(ErrorKind::Destination(
                "expected a record or primitive, got a list".to_string(),
            )
            .into()),
            Value::Nil => Err(ErrorKind::Destination(
                "expected a record or primitive, got an unresolved variant".to_string(),
            )
            .into()),
            primitive => self.decode_primitive(primitive),
        };
        self.finish(result)
    }

    /// Allocate a zero-valued record of `type_name` and decode into it.
    pub fn decode_record(&mut self, type_name: &str) -> Result<Record, DecodeError> {
        self.elements = 0;
        let mut record = self
            .schema
            .zeroed(type_name)
            .ok_or_else(|| SchemaError::UnknownRecord(type_name.to_string()))?;
        let result = self.decode_into(&mut record);
        self.finish(result).map(|()| record)
    }

    fn finish(&self, result: Result<(), DecodeError>) -> Result<(), DecodeError> {
        match &result {
            Ok(()) => debug!(consumed = self.consumed, "decode complete"),
            Err(e) => debug!(consumed = self.consumed, error = %e, "decode failed"),
        }
        result
    }

    fn decode_primitive(&mut self, target: &mut Value) -> Result<(), DecodeError> {
        let width = match target {
            Value::U8(_) => Width::U8,
            Value::U16(_) => Width::U16,
            Value::U32(_) => Width::U32,
            _ => return Err(ErrorKind::Destination("expected a primitive".to_string()).into()),
        };
        *target = self.read_primitive(width)?;
        Ok(())
    }

    fn read_primitive(&mut self, width: Width) -> Result<Value, DecodeError> {
        let v = primitive::read(&mut self.reader, width)?;
        self.consumed += width.bytes() as u64;
        Ok(v)
    }

    /// Walk the record's descriptors, decoding each eligible field in place.
    fn decode_into(&mut self, record: &mut Record) -> Result<(), DecodeError> {
        let schema = self.schema;
        let def = schema
            .get_record(record.type_name())
            .ok_or_else(|| SchemaError::UnknownRecord(record.type_name().to_string()))?;
        if record.len() != def.fields.len() {
            return Err(SchemaError::ShapeMismatch {
                type_name: def.name.clone(),
            }
            .into());
        }
        if let Some(first) = def.fields.first() {
            if first.is_eligible() && matches!(first.kind, FieldKind::Sequence(_)) {
                return Err(SchemaError::SequenceFirst {
                    record: def.name.clone(),
                    field: first.name.clone(),
                }
                .into());
            }
        }
        if self.depth >= self.options.max_depth {
            return Err(ErrorKind::DepthExceeded {
                limit: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let result = self.decode_fields(def, record);
        self.depth -= 1;
        result
    }

    fn decode_fields(&mut self, def: &'s RecordDef, record: &mut Record) -> Result<(), DecodeError> {
        for (index, field) in def.fields.iter().enumerate() {
            if !field.is_eligible() {
                continue;
            }
            trace!(record = %def.name, field = %field.name, kind = %field.kind.describe(), "decoding field");
            let value = self
                .decode_field(def, index, field, record)
                .map_err(|e| e.in_field(&field.name))?;
            if let Some(slot) = record.slot_mut(index) {
                *slot = value;
            }
        }
        Ok(())
    }

    fn decode_field(
        &mut self,
        def: &'s RecordDef,
        index: usize,
        field: &'s FieldDef,
        record: &Record,
    ) -> Result<Value, DecodeError> {
        match &field.kind {
            FieldKind::Primitive(width) => self.read_primitive(*width),
            FieldKind::Record(name) => self.decode_nested(name).map(Value::Record),
            FieldKind::Sequence(elem) => {
                let count = self.sequence_len(def, index, field, record)?;
                self.reserve_elements(count)?;
                let mut list = Vec::with_capacity(count.min(MAX_PREALLOC as u64) as usize);
                for j in 0..count {
                    let v = self
                        .decode_element(def, field, elem)
                        .map_err(|e| e.in_element(j as usize))?;
                    list.push(v);
                }
                Ok(Value::List(list))
            }
            FieldKind::Polymorphic(spec) => self.decode_variant(def, index, field, spec, record),
        }
    }

    /// Charge `count` elements against the per-decode budget.
    fn reserve_elements(&mut self, count: u64) -> Result<(), DecodeError> {
        let limit = self.options.max_elements;
        match self.elements.checked_add(count) {
            Some(total) if total <= limit => {
                self.elements = total;
                Ok(())
            }
            _ => Err(ErrorKind::TooManyElements { count, limit }.into()),
        }
    }

    fn decode_nested(&mut self, type_name: &str) -> Result<Record, DecodeError> {
        let mut nested = self
            .schema
            .zeroed(type_name)
            .ok_or_else(|| SchemaError::UnknownRecord(type_name.to_string()))?;
        self.decode_into(&mut nested)?;
        Ok(nested)
    }

    /// Element count from the immediately preceding field, less any one-indexed offset.
    fn sequence_len(
        &self,
        def: &RecordDef,
        index: usize,
        field: &FieldDef,
        record: &Record,
    ) -> Result<u64, DecodeError> {
        if index == 0 {
            return Err(SchemaError::SequenceFirst {
                record: def.name.clone(),
                field: field.name.clone(),
            }
            .into());
        }
        let (count_field, stored) = record
            .field_at(index - 1)
            .and_then(|(name, v)| v.as_u64().map(|n| (name, n)))
            .ok_or_else(|| SchemaError::CountNotUnsigned {
                record: def.name.clone(),
                field: field.name.clone(),
                count_field: def.fields[index - 1].name.clone(),
            })?;
        match field.directives.one_indexed {
            None => Ok(stored),
            Some(offset) => stored.checked_sub(offset).ok_or_else(|| {
                ErrorKind::NegativeCount {
                    count_field: count_field.to_string(),
                    stored,
                    offset,
                }
                .into()
            }),
        }
    }

    fn decode_element(
        &mut self,
        def: &RecordDef,
        field: &FieldDef,
        elem: &FieldKind,
    ) -> Result<Value, DecodeError> {
        match elem {
            FieldKind::Primitive(width) => self.read_primitive(*width),
            FieldKind::Record(name) => self.decode_nested(name).map(Value::Record),
            FieldKind::Sequence(_) | FieldKind::Polymorphic(_) => Err(SchemaError::UndecodableElement {
                record: def.name.clone(),
                field: field.name.clone(),
                kind: elem.describe(),
            }
            .into()),
        }
    }

    fn decode_variant(
        &mut self,
        def: &'s RecordDef,
        index: usize,
        field: &'s FieldDef,
        spec: &'s VariantSpec,
        record: &Record,
    ) -> Result<Value, DecodeError> {
        let discriminant = match &spec.discriminant {
            Some(name) => {
                let value = def
                    .field_index(name)
                    .filter(|&i| i < index)
                    .and_then(|i| record.field_at(i))
                    .and_then(|(_, v)| v.as_u64())
                    .ok_or_else(|| SchemaError::DiscriminantNotDecoded {
                        record: def.name.clone(),
                        field: field.name.clone(),
                        discriminant: name.clone(),
                    })?;
                Some((name.clone(), value))
            }
            None => None,
        };
        let resolver: &dyn VariantResolver = match self.schema.resolver(&def.name, &field.name) {
            Some(r) => r,
            None if spec.table.is_some() => spec,
            None => {
                return Err(SchemaError::MissingResolver {
                    record: def.name.clone(),
                    field: field.name.clone(),
                }
                .into())
            }
        };
        let type_name = resolver.resolve(record).ok_or_else(|| ErrorKind::UnresolvedVariant {
            field: field.name.clone(),
            discriminant,
        })?;
        trace!(record = %def.name, field = %field.name, variant = %type_name, "resolved variant");
        let variant = self.decode_nested(&type_name)?;
        Ok(Value::Variant(Box::new(variant)))
    }
}

/// Decode a record of `type_name` from the start of `bytes`.
pub fn unmarshal(schema: &ResolvedSchema, bytes: &[u8], type_name: &str) -> Result<Record, DecodeError> {
    decode_with_extent(schema, bytes, type_name).1
}

/// Decode a record and also report how many bytes were consumed (up to the failure, on error).
pub fn decode_with_extent(
    schema: &ResolvedSchema,
    bytes: &[u8],
    type_name: &str,
) -> (usize, Result<Record, DecodeError>) {
    let mut decoder = Decoder::new(Cursor::new(bytes), schema);
    let result = decoder.decode_record(type_name);
    (decoder.consumed() as usize, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldDef, RecordDef, Schema};
    use tracing_test::traced_test;

    fn tagged_schema() -> ResolvedSchema {
        let schema = Schema {
            records: vec![
                RecordDef::new("Small").with_field(FieldDef::new("a", FieldKind::Primitive(Width::U8))),
                RecordDef::new("Tagged")
                    .with_field(FieldDef::new("tag", FieldKind::Primitive(Width::U8)))
                    .with_field(FieldDef::new(
                        "body",
                        FieldKind::Polymorphic(VariantSpec {
                            discriminant: Some("tag".into()),
                            table: None,
                        }),
                    )),
            ],
        };
        let mut resolved = ResolvedSchema::resolve(schema).unwrap();
        resolved
            .register_resolver("Tagged", "body", |r: &Record| {
                (r.get_u64("tag") == Some(7)).then(|| "Small".to_string())
            })
            .unwrap();
        resolved
    }

    #[test]
    fn consumed_tracks_reads() {
        let s = tagged_schema();
        let mut d = Decoder::new(Cursor::new(vec![7u8, 42, 0]), &s);
        let r = d.decode_record("Tagged").unwrap();
        assert_eq!(d.consumed(), 2);
        let body = r.get("body").and_then(Value::as_variant).unwrap();
        assert_eq!(body.get("a"), Some(&Value::U8(42)));
    }

    #[test]
    fn variant_destination_decodes_its_record() {
        let s = tagged_schema();
        let mut target = Value::Variant(Box::new(s.zeroed("Small").unwrap()));
        Decoder::new(Cursor::new(vec![5u8]), &s).decode(&mut target).unwrap();
        assert_eq!(target.as_variant().and_then(|r| r.get_u64("a")), Some(5));
    }

    #[test]
    fn prealloc_is_capped() {
        let schema = Schema {
            records: vec![RecordDef::new("Blob")
                .with_field(FieldDef::new("n", FieldKind::Primitive(Width::U32)))
                .with_field(FieldDef::new(
                    "data",
                    FieldKind::Sequence(Box::new(FieldKind::Primitive(Width::U8))),
                ))],
        };
        let s = ResolvedSchema::resolve(schema).unwrap();
        // Claims four billion elements but carries two bytes.
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 1, 2];

        let (consumed, result) = decode_with_extent(&s, &bytes, "Blob");
        let err = result.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TooManyElements { count: 0xFFFF_FFFF, .. }));
        assert_eq!(consumed, 4);

        let mut d = Decoder::new(Cursor::new(&bytes[..]), &s).with_options(DecodeOptions {
            max_elements: u64::MAX,
            ..DecodeOptions::default()
        });
        let err = d.decode_record("Blob").unwrap_err();
        assert!(err.is_truncation());
        assert_eq!(d.consumed(), 6);
    }

    #[test]
    fn element_budget_resets_per_top_level_decode() {
        let schema = Schema {
            records: vec![RecordDef::new("Pair")
                .with_field(FieldDef::new("n", FieldKind::Primitive(Width::U8)))
                .with_field(FieldDef::new(
                    "data",
                    FieldKind::Sequence(Box::new(FieldKind::Primitive(Width::U8))),
                ))],
        };
        let s = ResolvedSchema::resolve(schema).unwrap();
        let mut d = Decoder::new(Cursor::new(vec![2u8, 1, 1, 2, 1, 1]), &s).with_options(DecodeOptions {
            max_elements: 2,
            ..DecodeOptions::default()
        });
        assert!(d.decode_record("Pair").is_ok());
        assert!(d.decode_record("Pair").is_ok());
        assert_eq!(d.consumed(), 6);
    }

    #[test]
    #[traced_test]
    fn logs_resolved_variant() {
        let s = tagged_schema();
        unmarshal(&s, &[7, 1], "Tagged").unwrap();
        assert!(logs_contain("resolved variant"));
        assert!(logs_contain("decode complete"));
    }
}
