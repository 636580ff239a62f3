//! Key paths into JSON events.
//!
//! Syntax: dotted keys (`requestContext.stage`), array indices
//! (`Records[0]`), quoted keys for names with dashes (`headers.["user-agent"]`
//! or `responseElements["x-amz-id-2"]`), and a trailing `length` segment that
//! yields the length of an array.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Length,
}

/// Split a path into segments. Returns `None` for malformed paths.
pub fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut key = String::new();

    fn flush(key: &mut String, segments: &mut Vec<Segment>) {
        if key.is_empty() {
            return;
        }
        let word = std::mem::take(key);
        segments.push(if word == "length" {
            Segment::Length
        } else {
            Segment::Key(word)
        });
    }

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                flush(&mut key, &mut segments);
                if chars.peek().is_none() {
                    return None;
                }
            }
            '[' => {
                flush(&mut key, &mut segments);
                if chars.peek() == Some(&'"') {
                    chars.next();
                    let mut quoted = String::new();
                    loop {
                        match chars.next()? {
                            '"' => break,
                            ch => quoted.push(ch),
                        }
                    }
                    if chars.next()? != ']' {
                        return None;
                    }
                    segments.push(Segment::Key(quoted));
                } else {
                    let mut digits = String::new();
                    loop {
                        match chars.next()? {
                            ']' => break,
                            ch if ch.is_ascii_digit() => digits.push(ch),
                            _ => return None,
                        }
                    }
                    segments.push(Segment::Index(digits.parse().ok()?));
                }
            }
            ']' | '"' => return None,
            ch => key.push(ch),
        }
    }
    flush(&mut key, &mut segments);

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Resolve `path` against `value`. `length` yields a number for arrays,
/// strings and objects; on other values it is looked up as a plain key.
pub fn resolve(value: &Value, path: &str) -> Option<Value> {
    let segments = parse_path(path)?;
    let mut current = value;
    for segment in &segments {
        match segment {
            Segment::Key(key) => current = current.as_object()?.get(key)?,
            Segment::Index(i) => current = current.as_array()?.get(*i)?,
            Segment::Length => {
                return match current {
                    Value::Array(items) => Some(Value::from(items.len())),
                    Value::String(s) => Some(Value::from(s.chars().count())),
                    Value::Object(map) => match map.get("length") {
                        Some(v) => Some(v.clone()),
                        None => Some(Value::from(map.len())),
                    },
                    _ => None,
                };
            }
        }
    }
    Some(current.clone())
}

/// Whether `path` exists in `value`.
pub fn has_key(value: &Value, path: &str) -> bool {
    resolve(value, path).is_some()
}
