//! Format decoded values for display.

use crate::value::{Record, Value};

fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Raw scalar string.
pub fn format_scalar(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::Nil => "nil".to_string(),
        _ => format!("{:?}", v),
    }
}

/// Multi-line dump of a record, two spaces per nesting level.
pub fn record_to_dump(record: &Record, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut lines = vec![format!("{}{} {{", pad, record.type_name())];
    for (name, v) in record.fields() {
        let sub = value_to_dump(v, indent + 1);
        lines.push(format!("{}  {}: {}", pad, name, sub.trim_start()));
    }
    lines.push(format!("{}}}", pad));
    lines.join("\n")
}

/// Format a value for display; `u8` lists are shown as hex bytes.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::U8(_) | Value::U16(_) | Value::U32(_) | Value::Nil => {
            format!("{}{}", pad, format_scalar(v))
        }
        Value::Record(r) => record_to_dump(r, indent),
        Value::Variant(r) => record_to_dump(r, indent),
        Value::List(lst) => {
            if lst.is_empty() {
                return format!("{}[]", pad);
            }
            if let Some(bytes) = v.as_bytes() {
                return format!("{}hex({})", pad, hex_string(&bytes));
            }
            let mut lines = vec![format!("{}[", pad)];
            for (i, item) in lst.iter().enumerate() {
                let sub = value_to_dump(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
    }
}

/// First line of the dump (for one-line summaries).
pub fn value_summary_line(v: &Value) -> String {
    let full = value_to_dump(v, 0);
    full.lines().next().map(|s| s.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_nested_record() {
        let inner = Record::new("Info", vec![("a".into(), Value::U16(1))]);
        let outer = Record::new(
            "Entry",
            vec![
                ("tag".into(), Value::U8(1)),
                ("info".into(), Value::Variant(Box::new(inner))),
                ("raw".into(), Value::List(vec![Value::U8(0xca), Value::U8(0xfe)])),
                ("empty".into(), Value::List(vec![])),
            ],
        );
        let expected = "Entry {\n  tag: 1\n  info: Info {\n    a: 1\n  }\n  raw: hex(ca fe)\n  empty: []\n}";
        assert_eq!(record_to_dump(&outer, 0), expected);
    }

    #[test]
    fn summary_is_first_line() {
        let v = Value::List(vec![Value::U16(1), Value::U16(2)]);
        assert_eq!(value_summary_line(&v), "[");
        assert_eq!(value_summary_line(&Value::U32(7)), "7");
    }
}
