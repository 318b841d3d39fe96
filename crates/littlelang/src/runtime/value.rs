use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Error;
use crate::runtime::interpreter::Interp;
use crate::syntax::ast::{quote_str, Block};
use crate::syntax::token::Position;

/// Shared mutable list storage. Cloning a `Value::List` clones the handle,
/// so assignment aliases the same elements.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared mutable map storage; same aliasing rules as lists. Keys are the
/// raw bytes of the key string.
pub type MapRef = Rc<RefCell<HashMap<Vec<u8>, Value>>>;

/// One scope on the interpreter's stack. Shared so that function values can
/// capture the scope they were created in.
pub type ScopeRef = Rc<RefCell<HashMap<String, Value>>>;

/// A littlelang runtime value. Nil, bools, ints, and strs copy; lists, maps,
/// and functions are shared references. Strs are immutable bytes, UTF-8 by
/// convention, so byte-level subscripts can split multi-byte sequences.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(Vec<u8>),
    List(ListRef),
    Map(MapRef),
    Func(FuncValue),
}

pub fn new_list(values: Vec<Value>) -> Value {
    Value::List(Rc::new(RefCell::new(values)))
}

pub fn new_map(map: HashMap<Vec<u8>, Value>) -> Value {
    Value::Map(Rc::new(RefCell::new(map)))
}

impl Value {
    /// The name reported by `type()` and used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil     => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_)  => "int",
            Value::Str(_)  => "str",
            Value::List(_) => "list",
            Value::Map(_)  => "map",
            Value::Func(_) => "func",
        }
    }
}

// ─── Functions ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum FuncValue {
    User(Rc<UserFunc>),
    Builtin(Builtin),
}

impl FuncValue {
    pub fn name(&self) -> String {
        match self {
            FuncValue::User(f) if f.name.is_empty() => "<func>".to_string(),
            FuncValue::User(f) => format!("<func {}>", f.name),
            FuncValue::Builtin(b) => format!("<builtin {}>", b.name),
        }
    }
}

/// A function defined in littlelang source. `closure` is the scope that was
/// on top of the stack when the value was created.
pub struct UserFunc {
    pub name: String,
    pub params: Vec<String>,
    pub ellipsis: bool,
    pub body: Block,
    pub closure: ScopeRef,
}

pub type BuiltinFn = fn(&mut Interp, Position, &[Value]) -> Result<Value, Error>;

/// A host-implemented function exposed through the global scope.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

// ─── Equality ────────────────────────────────────────────────────────────────

/// Deep structural equality. Values of different kinds are unequal; lists
/// and maps compare element-wise; functions compare by identity.
pub fn deep_equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::List(l), Value::List(r)) => {
            let (l, r) = (l.borrow(), r.borrow());
            l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| deep_equals(a, b))
        }
        (Value::Map(l), Value::Map(r)) => {
            let (l, r) = (l.borrow(), r.borrow());
            l.len() == r.len()
                && l.iter().all(|(k, v)| r.get(k).is_some_and(|rv| deep_equals(v, rv)))
        }
        (Value::Func(l), Value::Func(r)) => match (l, r) {
            (FuncValue::User(l), FuncValue::User(r)) => Rc::ptr_eq(l, r),
            (FuncValue::Builtin(l), FuncValue::Builtin(r)) => l.name == r.name,
            _ => false,
        },
        _ => false,
    }
}

// ─── String conversion ───────────────────────────────────────────────────────

/// Render a value as text. With `quote` set, strings come out quoted and
/// escaped (used for container elements); without it, strings holding bytes
/// outside UTF-8 render lossily, so `print()` and `str()` go through
/// `to_display_bytes` instead.
pub fn to_display(value: &Value, quote: bool) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Str(s) => {
            if quote {
                quote_str(s)
            } else {
                String::from_utf8_lossy(s).into_owned()
            }
        }
        Value::List(list) => {
            let items: Vec<String> =
                list.borrow().iter().map(|v| to_display(v, true)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            // Keys sorted so the rendering is stable across runs.
            let mut items: Vec<String> = map
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", quote_str(k), to_display(v, true)))
                .collect();
            items.sort();
            format!("{{{}}}", items.join(", "))
        }
        Value::Func(f) => f.name(),
    }
}

/// Byte-level rendering used by `print()` and `str()`: a raw str passes
/// through byte-for-byte, everything else is UTF-8 text.
pub fn to_display_bytes(value: &Value, quote: bool) -> Vec<u8> {
    match value {
        Value::Str(s) if !quote => s.clone(),
        _ => to_display(value, quote).into_bytes(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_display(self, false))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_display(self, true))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::Str(text.as_bytes().to_vec())
    }

    #[test]
    fn distinct_kinds_are_unequal() {
        assert!(!deep_equals(&Value::Int(0), &Value::Bool(false)));
        assert!(!deep_equals(&Value::Int(1), &Value::Bool(true)));
        assert!(!deep_equals(&Value::Nil, &Value::Bool(false)));
        assert!(!deep_equals(&s(""), &Value::Nil));
    }

    #[test]
    fn list_equality_is_deep() {
        let a = new_list(vec![Value::Int(1), new_list(vec![s("x")])]);
        let b = new_list(vec![Value::Int(1), new_list(vec![s("x")])]);
        let c = new_list(vec![Value::Int(1), new_list(vec![s("y")])]);
        assert!(deep_equals(&a, &b));
        assert!(!deep_equals(&a, &c));
    }

    #[test]
    fn map_equality_is_key_and_value_wise() {
        let mut m1 = HashMap::new();
        m1.insert(b"a".to_vec(), Value::Int(1));
        let mut m2 = HashMap::new();
        m2.insert(b"a".to_vec(), Value::Int(1));
        let mut m3 = HashMap::new();
        m3.insert(b"b".to_vec(), Value::Int(1));
        assert!(deep_equals(&new_map(m1.clone()), &new_map(m2)));
        assert!(!deep_equals(&new_map(m1), &new_map(m3)));
    }

    #[test]
    fn display_sorts_map_keys() {
        let mut m = HashMap::new();
        m.insert(b"b".to_vec(), Value::Int(1));
        m.insert(b"a".to_vec(), Value::Int(2));
        assert_eq!(to_display(&new_map(m), false), r#"{"a": 2, "b": 1}"#);
    }

    #[test]
    fn display_quotes_nested_strings() {
        let l = new_list(vec![s("a\"b"), Value::Int(3)]);
        assert_eq!(to_display(&l, false), r#"["a\"b", 3]"#);
        assert_eq!(to_display(&s("plain"), false), "plain");
    }

    #[test]
    fn quoting_escapes_raw_bytes_but_not_printable_text() {
        // a genuine é stays literal; the lone byte 0xe9 escapes
        let l = new_list(vec![s("é"), Value::Str(vec![0xe9])]);
        assert_eq!(to_display(&l, false), "[\"é\", \"\\xe9\"]");
        assert_eq!(to_display(&s("\u{7}"), true), "\"\\x07\"");
    }

    #[test]
    fn display_bytes_passes_raw_strings_through() {
        assert_eq!(to_display_bytes(&Value::Str(vec![0xe2]), false), vec![0xe2]);
        assert_eq!(to_display_bytes(&Value::Int(42), false), b"42".to_vec());
    }
}
