//! Decode errors.
//!
//! Every error carries the path from the top-level record down to the
//! failing read, e.g. `field constant_pool, element 3, field info: ...`.

use crate::ast::Width;
use crate::primitive::PrimitiveError;
use std::fmt;
use std::io;

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Element(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "field {}", name),
            PathSegment::Element(i) => write!(f, "element {}", i),
        }
    }
}

#[derive(Debug)]
pub struct DecodeError {
    path: Vec<PathSegment>,
    kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("truncated input: stream ended before {} could be read", .width.name())]
    Truncated { width: Width },
    #[error("IO: {0}")]
    Io(io::Error),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("unresolved variant for field {field}{}", fmt_discriminant(.discriminant))]
    UnresolvedVariant {
        field: String,
        discriminant: Option<(String, u64)>,
    },
    #[error("invalid destination: {0}")]
    Destination(String),
    #[error("count field {count_field} holds {stored}, less than the one-indexed offset {offset}")]
    NegativeCount {
        count_field: String,
        stored: u64,
        offset: u64,
    },
    #[error("nesting deeper than {limit} records")]
    DepthExceeded { limit: usize },
    #[error("sequence of {count} elements exceeds the budget of {limit} elements per decode")]
    TooManyElements { count: u64, limit: u64 },
}

fn fmt_discriminant(d: &Option<(String, u64)>) -> String {
    match d {
        Some((name, value)) => format!(" ({} = {})", name, value),
        None => String::new(),
    }
}

/// A malformed record type. These are programming errors in the schema, not bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown record type {0}")]
    UnknownRecord(String),
    #[error("sequence {field} is the first field of {record}; it has no count field")]
    SequenceFirst { record: String, field: String },
    #[error("count field {count_field} of sequence {record}.{field} is not an unsigned integer")]
    CountNotUnsigned {
        record: String,
        field: String,
        count_field: String,
    },
    #[error("no resolver for variant {record}.{field}")]
    MissingResolver { record: String, field: String },
    #[error("discriminant {discriminant} of variant {record}.{field} is not an earlier unsigned field")]
    DiscriminantNotDecoded {
        record: String,
        field: String,
        discriminant: String,
    },
    #[error("cannot decode {kind} as a sequence element of {record}.{field}")]
    UndecodableElement {
        record: String,
        field: String,
        kind: String,
    },
    #[error("record value of type {type_name} does not match its definition")]
    ShapeMismatch { type_name: String },
}

impl DecodeError {
    pub fn new(kind: ErrorKind) -> Self {
        DecodeError {
            path: Vec::new(),
            kind,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Path from the top-level record to the failure, outermost first.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn is_truncation(&self) -> bool {
        matches!(self.kind, ErrorKind::Truncated { .. })
    }

    pub fn is_schema_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Schema(_))
    }

    pub(crate) fn in_field(self, name: &str) -> Self {
        self.within(PathSegment::Field(name.to_string()))
    }

    pub(crate) fn in_element(self, index: usize) -> Self {
        self.within(PathSegment::Element(index))
    }

    fn within(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", segment)?;
        }
        if !self.path.is_empty() {
            f.write_str(": ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ErrorKind> for DecodeError {
    fn from(kind: ErrorKind) -> Self {
        DecodeError::new(kind)
    }
}

impl From<SchemaError> for DecodeError {
    fn from(e: SchemaError) -> Self {
        DecodeError::new(ErrorKind::Schema(e))
    }
}

impl From<PrimitiveError> for DecodeError {
    fn from(e: PrimitiveError) -> Self {
        DecodeError::new(match e {
            PrimitiveError::Truncated(width) => ErrorKind::Truncated { width },
            PrimitiveError::Io(e) => ErrorKind::Io(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_path() {
        let e = DecodeError::new(ErrorKind::Truncated { width: Width::U16 })
            .in_field("b")
            .in_element(3)
            .in_field("s");
        assert_eq!(
            e.to_string(),
            "field s, element 3, field b: truncated input: stream ended before u16 could be read"
        );
        assert_eq!(e.path().len(), 3);
        assert!(e.is_truncation());
        assert!(!e.is_schema_error());
    }

    #[test]
    fn schema_errors_are_labelled() {
        let e: DecodeError = SchemaError::SequenceFirst {
            record: "Bad".into(),
            field: "s".into(),
        }
        .into();
        assert!(e.is_schema_error());
        assert!(e.to_string().starts_with("schema error: "));
    }

    #[test]
    fn unresolved_variant_names_discriminant() {
        let e = ErrorKind::UnresolvedVariant {
            field: "v".into(),
            discriminant: Some(("e".into(), 99)),
        };
        assert_eq!(e.to_string(), "unresolved variant for field v (e = 99)");
    }
}
