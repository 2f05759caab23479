//! Class file decoding through the built-in schema.

use schemadec::classfile::{self, ClassFile, ClassFileError, Constant, MAGIC};
use schemadec::dump::record_to_dump;
use schemadec::{unmarshal, ErrorKind, PathSegment};
use std::io::{Cursor, Write};

/// Big-endian byte builder for hand-assembled class files.
#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }
    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn utf8(&mut self, s: &str) -> &mut Self {
        self.u8(1).u16(s.len() as u16);
        self.0.extend_from_slice(s.as_bytes());
        self
    }
    fn class(&mut self, name_index: u16) -> &mut Self {
        self.u8(7).u16(name_index)
    }
    fn attribute(&mut self, name_index: u16, info: &[u8]) -> &mut Self {
        self.u16(name_index).u32(info.len() as u32);
        self.0.extend_from_slice(info);
        self
    }
}

/// `public class Hello extends java.lang.Object` with one method and a
/// SourceFile-style class attribute.
fn hello_class() -> Vec<u8> {
    hello_class_with_integer_tag(3)
}

fn hello_class_with_integer_tag(tag: u8) -> Vec<u8> {
    let mut b = Bytes::default();
    b.u32(MAGIC).u16(0).u16(52);
    // Eight entries, count stored one higher.
    b.u16(9)
        .utf8("Hello") // #1
        .class(1) // #2
        .utf8("java/lang/Object") // #3
        .class(3) // #4
        .utf8("main") // #5
        .utf8("([Ljava/lang/String;)V") // #6
        .utf8("Code") // #7
        .u8(tag)
        .u32(42); // #8 Integer
    b.u16(0x0021).u16(2).u16(4);
    // interfaces
    b.u16(1).u16(4);
    // fields
    b.u16(0);
    // methods
    b.u16(1)
        .u16(0x0009)
        .u16(5)
        .u16(6)
        .u16(1)
        .attribute(7, &[0xB1, 0x00, 0x01]);
    // class attributes
    b.u16(1).attribute(1, &[0x00, 0x07]);
    b.0
}

#[test]
fn decode_hello_class() {
    let class = ClassFile::decode(Cursor::new(hello_class())).expect("decode");
    assert!(class.has_valid_magic());
    assert_eq!(class.major_version, 52);
    assert_eq!(class.minor_version, 0);
    assert_eq!(class.constant_pool.len(), 8);
    assert_eq!(class.access_flags, 0x0021);
    assert_eq!(class.this_class_name(), Some("Hello"));
    assert_eq!(class.super_class_name(), Some("java/lang/Object"));
    assert_eq!(class.interfaces, vec![4]);
    assert!(class.fields.is_empty());
    assert_eq!(class.constant(8), Some(&Constant::Integer(42)));
    assert_eq!(class.constant(0), None);
    assert_eq!(class.constant(9), None);

    assert_eq!(class.methods.len(), 1);
    let main = &class.methods[0];
    assert_eq!(class.utf8(main.name_index), Some("main"));
    assert_eq!(class.utf8(main.descriptor_index), Some("([Ljava/lang/String;)V"));
    assert_eq!(main.attributes.len(), 1);
    assert_eq!(class.utf8(main.attributes[0].name_index), Some("Code"));
    assert_eq!(main.attributes[0].info, vec![0xB1, 0x00, 0x01]);

    assert_eq!(class.attributes.len(), 1);
    assert_eq!(class.attributes[0].info, vec![0x00, 0x07]);
}

#[test]
fn decode_consumes_whole_file() {
    let schema = classfile::schema().expect("schema");
    let bytes = hello_class();
    let (consumed, result) = schemadec::decode_with_extent(&schema, &bytes, "ClassFile");
    assert!(result.is_ok());
    assert_eq!(consumed, bytes.len());
}

#[test]
fn decode_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&hello_class()).expect("write");
    file.flush().expect("flush");
    let reader = std::fs::File::open(file.path()).expect("open");
    let class = ClassFile::decode(std::io::BufReader::new(reader)).expect("decode");
    assert_eq!(class.this_class_name(), Some("Hello"));
}

#[test]
fn bad_magic_still_decodes() {
    let mut bytes = hello_class();
    bytes[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let class = ClassFile::decode(Cursor::new(bytes)).expect("decode");
    assert!(!class.has_valid_magic());
    assert_eq!(class.magic, 0xDEAD_BEEF);
}

#[test]
fn every_truncation_fails_as_truncation() {
    let schema = classfile::schema().expect("schema");
    let bytes = hello_class();
    for cut in 0..bytes.len() {
        match ClassFile::decode_with(&schema, Cursor::new(&bytes[..cut])) {
            Err(ClassFileError::Decode(e)) => assert!(e.is_truncation(), "cut at {}: {}", cut, e),
            other => panic!("cut at {}: expected a decode error, got {:?}", cut, other),
        }
    }
}

#[test]
fn unknown_constant_tag_is_unresolved() {
    let bytes = hello_class_with_integer_tag(2);
    let schema = classfile::schema().expect("schema");
    let err = unmarshal(&schema, &bytes, "ClassFile").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnresolvedVariant { .. }));
    assert_eq!(
        err.path(),
        [
            PathSegment::Field("constant_pool".into()),
            PathSegment::Element(7),
            PathSegment::Field("info".into()),
        ]
    );
    assert!(err.to_string().contains("(tag = 2)"), "{}", err);
}

#[test]
fn dump_shows_nested_structure() {
    let schema = classfile::schema().expect("schema");
    let record = unmarshal(&schema, &hello_class(), "ClassFile").expect("decode");
    let text = record_to_dump(&record, 0);
    assert!(text.starts_with("ClassFile {"), "{}", text);
    assert!(text.contains("ConstantUtf8Info {"));
    assert!(text.contains("MemberInfo {"));
}
