//! Operator semantics for the evaluator: binary and unary dispatch plus
//! subscript reads and writes. `and`/`or` live in the interpreter because
//! they short-circuit over unevaluated expressions.

use crate::error::{type_error, value_error, Error};
use crate::runtime::value::{deep_equals, new_list, Value};
use crate::syntax::ast::{quote_str, BinOp, UnOp};
use crate::syntax::token::Position;

pub fn binary(pos: Position, op: BinOp, l: Value, r: Value) -> Result<Value, Error> {
    match op {
        BinOp::Equal    => Ok(Value::Bool(deep_equals(&l, &r))),
        BinOp::NotEqual => Ok(Value::Bool(!deep_equals(&l, &r))),
        BinOp::Lt       => Ok(Value::Bool(less(pos, &l, &r)?)),
        BinOp::Gt       => Ok(Value::Bool(less(pos, &r, &l)?)),
        BinOp::Gte      => Ok(Value::Bool(!less(pos, &l, &r)?)),
        BinOp::Lte      => Ok(Value::Bool(!less(pos, &r, &l)?)),
        BinOp::In       => in_(pos, &l, &r),
        BinOp::Add      => add(pos, l, r),
        BinOp::Sub      => sub(pos, l, r),
        BinOp::Mul      => mul(pos, l, r),
        BinOp::Div      => div(pos, l, r),
        BinOp::Mod      => modulo(pos, l, r),
        // short-circuit ops are evaluated by the interpreter
        BinOp::And | BinOp::Or => unreachable!("and/or handled by the evaluator"),
    }
}

pub fn unary(pos: Position, op: UnOp, v: Value) -> Result<Value, Error> {
    match op {
        UnOp::Neg => match v {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            _ => Err(type_error(pos, "unary - requires an int")),
        },
        UnOp::Not => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Err(type_error(pos, "not requires a bool")),
        },
    }
}

/// Ordering within a kind: numeric for ints, byte-lexicographic for strs,
/// recursive lexicographic for lists. Anything else is a type error.
pub fn less(pos: Position, l: &Value, r: &Value) -> Result<bool, Error> {
    match (l, r) {
        (Value::Int(l), Value::Int(r)) => Ok(l < r),
        (Value::Str(l), Value::Str(r)) => Ok(l < r),
        (Value::List(l), Value::List(r)) => {
            let (l, r) = (l.borrow(), r.borrow());
            for (lv, rv) in l.iter().zip(r.iter()) {
                if !deep_equals(lv, rv) {
                    return less(pos, lv, rv);
                }
            }
            Ok(l.len() < r.len())
        }
        _ => Err(type_error(
            pos,
            "comparison requires two ints or two strs (or lists of ints or strs)",
        )),
    }
}

/// Byte-level substring search; an empty needle matches at the start.
pub(crate) fn bytes_index(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn in_(pos: Position, l: &Value, r: &Value) -> Result<Value, Error> {
    match r {
        Value::Str(haystack) => match l {
            Value::Str(needle) => Ok(Value::Bool(bytes_index(haystack, needle).is_some())),
            _ => Err(type_error(pos, "in str requires str on left side")),
        },
        Value::List(list) => {
            let found = list.borrow().iter().any(|v| deep_equals(l, v));
            Ok(Value::Bool(found))
        }
        Value::Map(map) => match l {
            Value::Str(key) => Ok(Value::Bool(map.borrow().contains_key(key))),
            _ => Err(type_error(pos, "in map requires str on left side")),
        },
        _ => Err(type_error(pos, "in requires str, list, or map on right side")),
    }
}

fn add(pos: Position, l: Value, r: Value) -> Result<Value, Error> {
    match (&l, &r) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_add(*r))),
        (Value::Str(l), Value::Str(r)) => {
            let mut out = l.clone();
            out.extend_from_slice(r);
            Ok(Value::Str(out))
        }
        (Value::List(l), Value::List(r)) => {
            let mut result = l.borrow().clone();
            result.extend(r.borrow().iter().cloned());
            Ok(new_list(result))
        }
        (Value::Map(l), Value::Map(r)) => {
            // Right-hand entries win on key collision.
            let mut result = l.borrow().clone();
            for (k, v) in r.borrow().iter() {
                result.insert(k.clone(), v.clone());
            }
            Ok(crate::runtime::value::new_map(result))
        }
        _ => Err(type_error(pos, "+ requires two ints, strs, lists, or maps")),
    }
}

fn sub(pos: Position, l: Value, r: Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_sub(r))),
        _ => Err(type_error(pos, "- requires two ints")),
    }
}

fn mul(pos: Position, l: Value, r: Value) -> Result<Value, Error> {
    match (&l, &r) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_mul(*r))),
        (Value::Int(n), Value::Str(s)) | (Value::Str(s), Value::Int(n)) => {
            if *n < 0 {
                return Err(value_error(pos, "can't multiply string by a negative number"));
            }
            Ok(Value::Str(s.repeat(*n as usize)))
        }
        (Value::Int(n), Value::List(list)) | (Value::List(list), Value::Int(n)) => {
            if *n < 0 {
                return Err(value_error(pos, "can't multiply list by a negative number"));
            }
            let elems = list.borrow();
            let mut result = Vec::with_capacity(elems.len() * *n as usize);
            for _ in 0..*n {
                result.extend(elems.iter().cloned());
            }
            Ok(new_list(result))
        }
        _ => Err(type_error(pos, "* requires two ints or a str or list and an int")),
    }
}

fn div(pos: Position, l: Value, r: Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(_), Value::Int(0)) => Err(value_error(pos, "can't divide by zero")),
        // wrapping_div so i64::MIN / -1 wraps instead of trapping
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_div(r))),
        _ => Err(type_error(pos, "/ requires two ints")),
    }
}

fn modulo(pos: Position, l: Value, r: Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(_), Value::Int(0)) => Err(value_error(pos, "can't divide by zero")),
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_rem(r))),
        _ => Err(type_error(pos, "% requires two ints")),
    }
}

// ─── Subscripts ──────────────────────────────────────────────────────────────

pub fn subscript(pos: Position, container: &Value, subscript: &Value) -> Result<Value, Error> {
    match container {
        Value::Str(s) => match subscript {
            Value::Int(i) => {
                if *i < 0 || *i >= s.len() as i64 {
                    return Err(value_error(pos, format!("subscript {i} out of range")));
                }
                // the raw byte, which may split a multi-byte sequence
                Ok(Value::Str(vec![s[*i as usize]]))
            }
            _ => Err(type_error(pos, "str subscript must be an int")),
        },
        Value::List(list) => match subscript {
            Value::Int(i) => {
                let list = list.borrow();
                if *i < 0 || *i >= list.len() as i64 {
                    return Err(value_error(pos, format!("subscript {i} out of range")));
                }
                Ok(list[*i as usize].clone())
            }
            _ => Err(type_error(pos, "list subscript must be an int")),
        },
        Value::Map(map) => match subscript {
            Value::Str(key) => match map.borrow().get(key) {
                Some(v) => Ok(v.clone()),
                None => Err(value_error(pos, format!("key not found: {}", quote_str(key)))),
            },
            _ => Err(type_error(pos, "map subscript must be a str")),
        },
        _ => Err(type_error(pos, "can only subscript str, list, or map")),
    }
}

pub fn assign_subscript(
    pos: Position,
    container: &Value,
    subscript: &Value,
    value: Value,
) -> Result<(), Error> {
    match container {
        Value::List(list) => match subscript {
            Value::Int(i) => {
                let mut list = list.borrow_mut();
                if *i < 0 || *i >= list.len() as i64 {
                    return Err(value_error(pos, format!("subscript {i} out of range")));
                }
                list[*i as usize] = value;
                Ok(())
            }
            _ => Err(type_error(pos, "list subscript must be an int")),
        },
        Value::Map(map) => match subscript {
            Value::Str(key) => {
                map.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            _ => Err(type_error(pos, "map subscript must be a str")),
        },
        _ => Err(type_error(pos, "can only assign to subscript of list or map")),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    fn s(text: &str) -> Value {
        Value::Str(text.as_bytes().to_vec())
    }

    #[test]
    fn division_truncates_toward_zero() {
        for (l, r, want) in [(9, 3, 3), (10, 3, 3), (10, -2, -5), (-10, 2, -5)] {
            let got = binary(pos(), BinOp::Div, int(l), int(r)).unwrap();
            assert!(deep_equals(&got, &int(want)), "{l} / {r}");
        }
    }

    #[test]
    fn modulo_takes_sign_of_dividend() {
        for (l, r, want) in [(9, 3, 0), (10, 3, 1), (10, -3, 1), (-10, 3, -1)] {
            let got = binary(pos(), BinOp::Mod, int(l), int(r)).unwrap();
            assert!(deep_equals(&got, &int(want)), "{l} % {r}");
        }
    }

    #[test]
    fn divide_by_zero() {
        let err = binary(pos(), BinOp::Div, int(3), int(0)).unwrap_err();
        assert_eq!(err.message, "can't divide by zero");
        let err = binary(pos(), BinOp::Mod, int(3), int(0)).unwrap_err();
        assert_eq!(err.message, "can't divide by zero");
    }

    #[test]
    fn list_ordering_is_lexicographic() {
        let l = new_list(vec![int(1)]);
        let r = new_list(vec![int(1), int(2)]);
        assert!(less(pos(), &l, &r).unwrap());
        assert!(!less(pos(), &r, &l).unwrap());
        let l = new_list(vec![new_list(vec![int(1)]), new_list(vec![int(2)])]);
        let r = new_list(vec![new_list(vec![int(1)]), new_list(vec![int(3)])]);
        assert!(less(pos(), &l, &r).unwrap());
    }

    #[test]
    fn string_repeat() {
        assert!(deep_equals(&mul(pos(), int(3), s("ab")).unwrap(), &s("ababab")));
        assert!(deep_equals(&mul(pos(), s("ab"), int(0)).unwrap(), &s("")));
        let err = mul(pos(), s("ab"), int(-1)).unwrap_err();
        assert_eq!(err.message, "can't multiply string by a negative number");
    }

    #[test]
    fn list_repeat() {
        let got = mul(pos(), int(3), new_list(vec![int(1), int(2)])).unwrap();
        let want = new_list(vec![int(1), int(2), int(1), int(2), int(1), int(2)]);
        assert!(deep_equals(&got, &want));
        let err = mul(pos(), new_list(vec![int(1)]), int(-2)).unwrap_err();
        assert_eq!(err.message, "can't multiply list by a negative number");
    }

    #[test]
    fn in_uses_byte_containment_for_strings() {
        for (needle, haystack, want) in
            [("foo", "foobar", true), ("", "", true), ("", "foo", true), ("foo", "Foobar", false)]
        {
            let got = binary(pos(), BinOp::In, s(needle), s(haystack)).unwrap();
            assert!(deep_equals(&got, &Value::Bool(want)), "{needle:?} in {haystack:?}");
        }
    }

    #[test]
    fn str_subscript_is_byte_level() {
        let got = subscript(pos(), &s("“x"), &int(3)).unwrap();
        assert!(deep_equals(&got, &s("x")));
        // mid-codepoint subscripts yield the raw byte, which quotes as \xNN
        let got = subscript(pos(), &s("“"), &int(0)).unwrap();
        match got {
            Value::Str(b) => {
                assert_eq!(b, vec![0xe2]);
                assert_eq!(quote_str(&b), "\"\\xe2\"");
            }
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn bytes_index_is_byte_level() {
        assert_eq!(bytes_index(b"foobar", b"foo"), Some(0));
        assert_eq!(bytes_index(b"foobar", b"bar"), Some(3));
        assert_eq!(bytes_index(b"foobar", b""), Some(0));
        assert_eq!(bytes_index(b"", b"x"), None);
        // matches inside a multi-byte sequence
        assert_eq!(bytes_index("“".as_bytes(), &[0x80]), Some(1));
    }

    #[test]
    fn subscript_bounds() {
        let err = subscript(pos(), &s("foo"), &int(-1)).unwrap_err();
        assert_eq!(err.message, "subscript -1 out of range");
        let err = subscript(pos(), &new_list(vec![int(1)]), &int(1)).unwrap_err();
        assert_eq!(err.message, "subscript 1 out of range");
    }
}
