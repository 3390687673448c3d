//! Keyword plist helpers over `lexpr` values.
//!
//! Traces and config overrides are written as Emacs-style plists,
//! e.g. `(:time-ms 33 :joints ((:id :head :x 0 ...)))`.

use lexpr::Value;

/// Strip the leading colon from a keyword, accepting both
/// `Value::Keyword("key")` (elisp parser) and `Value::Symbol(":key")`
/// (default parser) forms.
fn keyword_name(value: &Value) -> Option<&str> {
    match value {
        Value::Keyword(k) => Some(&**k),
        Value::Symbol(s) => s.strip_prefix(':'),
        _ => None,
    }
}

/// Walk a plist and collect `(key, value)` pairs in order.
pub fn plist_entries(value: &Value) -> Vec<(&str, &Value)> {
    let mut entries = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        let Some(key) = keyword_name(pair.car()) else {
            current = pair.cdr();
            continue;
        };
        match pair.cdr() {
            Value::Cons(next) => {
                entries.push((key, next.car()));
                current = next.cdr();
            }
            _ => break,
        }
    }
    entries
}

/// Raw value following `:key` in a plist.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    plist_entries(value)
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Render an atom as a string: keywords lose their colon, `nil`/`t`
/// become "nil"/"t".
pub fn atom_string(value: &Value) -> Option<String> {
    match value {
        Value::Keyword(v) => Some(v.to_string()),
        Value::Symbol(v) => {
            let s: &str = v;
            Some(s.strip_prefix(':').unwrap_or(s).to_string())
        }
        Value::String(v) => Some(v.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
        Value::Null | Value::Nil => Some("nil".to_string()),
        _ => None,
    }
}

/// Extract a keyword value from a plist as a string.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).and_then(atom_string)
}

/// Extract an integer value from a plist.
pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Elements of a proper list; anything else yields an empty vector.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}

/// `t` / `nil` rendering of a flag.
pub fn flag(b: bool) -> &'static str {
    if b {
        "t"
    } else {
        "nil"
    }
}
