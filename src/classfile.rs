//! JVM class files, decoded through the record schema in `classfile.schema`.
//!
//! The decoder produces a generic [`Record`]; [`ClassFile::from_record`]
//! turns it into typed values. Integer, float, long and double constants are
//! stored as raw big-endian bit patterns and reinterpreted here.
//!
//! Long and double constants occupy two constant-pool slots in the real
//! format, but the schema reads one entry per slot, so pools containing them
//! are not decoded correctly.

use crate::ast::ResolvedSchema;
use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::parser::parse;
use crate::value::{Record, Value};
use std::io::Read;

/// Schema source for the class file layout.
pub const CLASS_FILE_SCHEMA: &str = include_str!("classfile.schema");

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Constant pool entry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    InvokeDynamic = 18,
}

impl ConstantTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::FieldRef,
            10 => ConstantTag::MethodRef,
            11 => ConstantTag::InterfaceMethodRef,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            18 => ConstantTag::InvokeDynamic,
            _ => return None,
        })
    }

    /// Record type holding the entry's payload.
    pub fn record_type(self) -> &'static str {
        match self {
            ConstantTag::Utf8 => "ConstantUtf8Info",
            ConstantTag::Integer => "ConstantIntegerInfo",
            ConstantTag::Float => "ConstantFloatInfo",
            ConstantTag::Long => "ConstantLongInfo",
            ConstantTag::Double => "ConstantDoubleInfo",
            ConstantTag::Class => "ConstantClassInfo",
            ConstantTag::String => "ConstantStringInfo",
            ConstantTag::FieldRef | ConstantTag::MethodRef | ConstantTag::InterfaceMethodRef => {
                "ConstantRefInfo"
            }
            ConstantTag::NameAndType => "ConstantNameAndTypeInfo",
            ConstantTag::MethodHandle => "ConstantMethodHandleInfo",
            ConstantTag::MethodType => "ConstantMethodTypeInfo",
            ConstantTag::InvokeDynamic => "ConstantInvokeDynamicInfo",
        }
    }
}

/// Resolver for `CpInfo.info`: picks the payload record from the decoded tag.
pub fn resolve_cp_info(entry: &Record) -> Option<String> {
    let tag = u8::try_from(entry.get_u64("tag")?).ok()?;
    ConstantTag::from_u8(tag).map(|t| t.record_type().to_string())
}

/// Parse the class file schema and register its resolvers.
pub fn schema() -> Result<ResolvedSchema, String> {
    let mut resolved = ResolvedSchema::resolve(parse(CLASS_FILE_SCHEMA)?)?;
    resolved.register_resolver("CpInfo", "info", resolve_cp_info)?;
    Ok(resolved)
}

#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    #[error("schema: {0}")]
    Schema(String),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("missing or mistyped field {0}")]
    Field(String),
    #[error("unknown constant tag {0}")]
    UnknownTag(u64),
}

/// A constant pool entry with its payload interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

/// A field or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    /// Entries for pool indices 1.. in order.
    pub constant_pool: Vec<Constant>,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

fn uint(r: &Record, name: &str) -> Result<u64, ClassFileError> {
    r.get_u64(name)
        .ok_or_else(|| ClassFileError::Field(format!("{}.{}", r.type_name(), name)))
}

fn u16_field(r: &Record, name: &str) -> Result<u16, ClassFileError> {
    u16::try_from(uint(r, name)?)
        .map_err(|_| ClassFileError::Field(format!("{}.{}", r.type_name(), name)))
}

fn u32_field(r: &Record, name: &str) -> Result<u32, ClassFileError> {
    u32::try_from(uint(r, name)?)
        .map_err(|_| ClassFileError::Field(format!("{}.{}", r.type_name(), name)))
}

fn list<'a>(r: &'a Record, name: &str) -> Result<&'a [Value], ClassFileError> {
    r.get(name)
        .and_then(Value::as_list)
        .ok_or_else(|| ClassFileError::Field(format!("{}.{}", r.type_name(), name)))
}

fn records<'a>(r: &'a Record, name: &str) -> Result<Vec<&'a Record>, ClassFileError> {
    list(r, name)?
        .iter()
        .map(|v| {
            v.as_record()
                .ok_or_else(|| ClassFileError::Field(format!("{}.{}", r.type_name(), name)))
        })
        .collect()
}

impl Constant {
    pub fn from_record(entry: &Record) -> Result<Self, ClassFileError> {
        let tag_value = uint(entry, "tag")?;
        let tag = u8::try_from(tag_value)
            .ok()
            .and_then(ConstantTag::from_u8)
            .ok_or(ClassFileError::UnknownTag(tag_value))?;
        let info = entry
            .get("info")
            .and_then(Value::as_variant)
            .ok_or_else(|| ClassFileError::Field("CpInfo.info".to_string()))?;
        let wide = |info: &Record| -> Result<u64, ClassFileError> {
            Ok((uint(info, "high_bytes")? << 32) | uint(info, "low_bytes")?)
        };
        Ok(match tag {
            ConstantTag::Utf8 => {
                let bytes = info
                    .get("bytes")
                    .and_then(Value::as_bytes)
                    .ok_or_else(|| ClassFileError::Field("ConstantUtf8Info.bytes".to_string()))?;
                Constant::Utf8(String::from_utf8_lossy(&bytes).into_owned())
            }
            ConstantTag::Integer => Constant::Integer(u32_field(info, "bytes")? as i32),
            ConstantTag::Float => Constant::Float(f32::from_bits(u32_field(info, "bytes")?)),
            ConstantTag::Long => Constant::Long(wide(info)? as i64),
            ConstantTag::Double => Constant::Double(f64::from_bits(wide(info)?)),
            ConstantTag::Class => Constant::Class {
                name_index: u16_field(info, "name_index")?,
            },
            ConstantTag::String => Constant::String {
                string_index: u16_field(info, "string_index")?,
            },
            ConstantTag::FieldRef => Constant::FieldRef {
                class_index: u16_field(info, "class_index")?,
                name_and_type_index: u16_field(info, "name_and_type_index")?,
            },
            ConstantTag::MethodRef => Constant::MethodRef {
                class_index: u16_field(info, "class_index")?,
                name_and_type_index: u16_field(info, "name_and_type_index")?,
            },
            ConstantTag::InterfaceMethodRef => Constant::InterfaceMethodRef {
                class_index: u16_field(info, "class_index")?,
                name_and_type_index: u16_field(info, "name_and_type_index")?,
            },
            ConstantTag::NameAndType => Constant::NameAndType {
                name_index: u16_field(info, "name_index")?,
                descriptor_index: u16_field(info, "descriptor_index")?,
            },
            ConstantTag::MethodHandle => Constant::MethodHandle {
                reference_kind: uint(info, "reference_kind")? as u8,
                reference_index: u16_field(info, "reference_index")?,
            },
            ConstantTag::MethodType => Constant::MethodType {
                descriptor_index: u16_field(info, "descriptor_index")?,
            },
            ConstantTag::InvokeDynamic => Constant::InvokeDynamic {
                bootstrap_method_attr_index: u16_field(info, "bootstrap_method_attr_index")?,
                name_and_type_index: u16_field(info, "name_and_type_index")?,
            },
        })
    }
}

impl Attribute {
    fn from_record(r: &Record) -> Result<Self, ClassFileError> {
        let info = r
            .get("info")
            .and_then(Value::as_bytes)
            .ok_or_else(|| ClassFileError::Field("AttributeInfo.info".to_string()))?;
        Ok(Attribute {
            name_index: u16_field(r, "attribute_name_index")?,
            info,
        })
    }
}

impl Member {
    fn from_record(r: &Record) -> Result<Self, ClassFileError> {
        Ok(Member {
            access_flags: u16_field(r, "access_flags")?,
            name_index: u16_field(r, "name_index")?,
            descriptor_index: u16_field(r, "descriptor_index")?,
            attributes: records(r, "attributes")?
                .into_iter()
                .map(Attribute::from_record)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl ClassFile {
    /// Decode a class file with an already-built schema.
    pub fn decode_with<R: Read>(schema: &ResolvedSchema, reader: R) -> Result<Self, ClassFileError> {
        let record = Decoder::new(reader, schema).decode_record("ClassFile")?;
        ClassFile::from_record(&record)
    }

    pub fn decode<R: Read>(reader: R) -> Result<Self, ClassFileError> {
        let schema = schema().map_err(ClassFileError::Schema)?;
        ClassFile::decode_with(&schema, reader)
    }

    pub fn from_record(r: &Record) -> Result<Self, ClassFileError> {
        let interfaces = list(r, "interfaces")?
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| ClassFileError::Field("ClassFile.interfaces".to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(ClassFile {
            magic: u32_field(r, "magic")?,
            minor_version: u16_field(r, "minor_version")?,
            major_version: u16_field(r, "major_version")?,
            constant_pool: records(r, "constant_pool")?
                .into_iter()
                .map(Constant::from_record)
                .collect::<Result<_, _>>()?,
            access_flags: u16_field(r, "access_flags")?,
            this_class: u16_field(r, "this_class")?,
            super_class: u16_field(r, "super_class")?,
            interfaces,
            fields: records(r, "fields")?
                .into_iter()
                .map(Member::from_record)
                .collect::<Result<_, _>>()?,
            methods: records(r, "methods")?
                .into_iter()
                .map(Member::from_record)
                .collect::<Result<_, _>>()?,
            attributes: records(r, "attributes")?
                .into_iter()
                .map(Attribute::from_record)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == MAGIC
    }

    /// Constant at a one-based pool index.
    pub fn constant(&self, index: u16) -> Option<&Constant> {
        self.constant_pool.get(usize::from(index).checked_sub(1)?)
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.constant(index)? {
            Constant::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the class constant at `index`.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.constant(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn this_class_name(&self) -> Option<&str> {
        self.class_name(self.this_class)
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.class_name(self.super_class)
    }
}
