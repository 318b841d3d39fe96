//! Built-in functions exposed through the global scope. Each is a plain
//! function over values plus the host state held by the interpreter.

use std::fs;

use crate::error::{runtime_error, type_error, value_error, Error};
use crate::runtime::interpreter::Interp;
use crate::runtime::ops;
use crate::runtime::value::{deep_equals, new_list, to_display_bytes, Builtin, Value};
use crate::syntax::token::Position;

pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "append", func: append },
    Builtin { name: "args", func: args_fn },
    Builtin { name: "char", func: char_fn },
    Builtin { name: "exit", func: exit },
    Builtin { name: "find", func: find },
    Builtin { name: "int", func: int },
    Builtin { name: "join", func: join },
    Builtin { name: "len", func: len },
    Builtin { name: "lower", func: lower },
    Builtin { name: "print", func: print },
    Builtin { name: "range", func: range },
    Builtin { name: "read", func: read },
    Builtin { name: "rune", func: rune },
    Builtin { name: "slice", func: slice },
    Builtin { name: "sort", func: sort },
    Builtin { name: "split", func: split },
    Builtin { name: "str", func: str_fn },
    Builtin { name: "type", func: type_fn },
    Builtin { name: "upper", func: upper },
];

fn ensure_num_args(pos: Position, name: &str, args: &[Value], required: usize) -> Result<(), Error> {
    if args.len() != required {
        let plural = if required == 1 { "" } else { "s" };
        return Err(type_error(
            pos,
            format!("{name}() requires {required} arg{plural}, got {}", args.len()),
        ));
    }
    Ok(())
}

fn strings_to_list(strings: Vec<String>) -> Value {
    new_list(strings.into_iter().map(|s| Value::Str(s.into_bytes())).collect())
}

// ─── Builtins ────────────────────────────────────────────────────────────────

fn append(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    if args.is_empty() {
        return Err(type_error(pos, "append() requires at least 1 arg, got 0"));
    }
    let Value::List(list) = &args[0] else {
        return Err(type_error(pos, "append() requires first argument to be list"));
    };
    list.borrow_mut().extend(args[1..].iter().cloned());
    Ok(Value::Nil)
}

fn args_fn(interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "args", args, 0)?;
    Ok(strings_to_list(interp.args().to_vec()))
}

fn char_fn(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "char", args, 1)?;
    match &args[0] {
        Value::Int(n) => {
            let c = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or('\u{fffd}');
            Ok(Value::Str(c.to_string().into_bytes()))
        }
        other => Err(type_error(pos, format!("char() requires an int, not {}", other.type_name()))),
    }
}

fn exit(interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    if args.len() > 1 {
        return Err(type_error(pos, format!("exit() requires 0 or 1 args, got {}", args.len())));
    }
    let code = match args.first() {
        None => 0,
        Some(Value::Int(n)) => *n as i32,
        Some(other) => {
            return Err(type_error(pos, format!("exit() requires an int, not {}", other.type_name())))
        }
    };
    interp.call_exit(code);
    Ok(Value::Nil)
}

fn find(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "find", args, 2)?;
    match &args[0] {
        Value::Str(haystack) => match &args[1] {
            Value::Str(needle) => {
                let index = ops::bytes_index(haystack, needle).map_or(-1, |i| i as i64);
                Ok(Value::Int(index))
            }
            _ => Err(type_error(pos, "find() on str requires second argument to be a str")),
        },
        Value::List(list) => {
            let index = list
                .borrow()
                .iter()
                .position(|v| deep_equals(&args[1], v))
                .map_or(-1, |i| i as i64);
            Ok(Value::Int(index))
        }
        _ => Err(type_error(pos, "find() requires first argument to be a str or list")),
    }
}

fn int(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "int", args, 1)?;
    match &args[0] {
        Value::Int(_) => Ok(args[0].clone()),
        Value::Str(s) => {
            let parsed = std::str::from_utf8(s).ok().and_then(|text| text.parse::<i64>().ok());
            Ok(parsed.map_or(Value::Nil, Value::Int))
        }
        _ => Err(type_error(pos, "int() requires an int or a str")),
    }
}

fn join(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "join", args, 2)?;
    let Value::Str(sep) = &args[1] else {
        return Err(type_error(pos, "join() requires separator to be a str"));
    };
    let Value::List(list) = &args[0] else {
        return Err(type_error(pos, "join() requires first argument to be a list"));
    };
    let list = list.borrow();
    let mut out = Vec::new();
    for (i, v) in list.iter().enumerate() {
        match v {
            Value::Str(s) => {
                if i > 0 {
                    out.extend_from_slice(sep);
                }
                out.extend_from_slice(s);
            }
            _ => return Err(type_error(pos, "join() requires all list elements to be strs")),
        }
    }
    Ok(Value::Str(out))
}

fn len(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "len", args, 1)?;
    let length = match &args[0] {
        Value::Str(s) => s.len(),
        Value::List(list) => list.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        _ => return Err(type_error(pos, "len() requires a str, list, or map")),
    };
    Ok(Value::Int(length as i64))
}

fn lower(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "lower", args, 1)?;
    match &args[0] {
        Value::Str(s) => {
            Ok(Value::Str(String::from_utf8_lossy(s).to_lowercase().into_bytes()))
        }
        _ => Err(type_error(pos, "lower() requires a str")),
    }
}

fn print(interp: &mut Interp, _pos: Position, args: &[Value]) -> Result<Value, Error> {
    let mut out = Vec::new();
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        out.extend_from_slice(&to_display_bytes(a, false));
    }
    out.push(b'\n');
    let _ = interp.stdout().write_all(&out);
    Ok(Value::Nil)
}

fn range(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "range", args, 1)?;
    match &args[0] {
        Value::Int(n) => {
            if *n < 0 {
                return Err(value_error(pos, "range() argument must not be negative"));
            }
            Ok(new_list((0..*n).map(Value::Int).collect()))
        }
        _ => Err(type_error(pos, "range() requires an int")),
    }
}

fn read(interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    if args.len() > 1 {
        return Err(type_error(pos, format!("read() requires 0 or 1 args, got {}", args.len())));
    }
    let bytes = match args.first() {
        None => {
            let mut buf = Vec::new();
            interp
                .stdin()
                .read_to_end(&mut buf)
                .map_err(|e| runtime_error(pos, format!("read() error: {e}")))?;
            buf
        }
        Some(Value::Str(path)) => {
            let path = String::from_utf8_lossy(path).into_owned();
            fs::read(&path).map_err(|e| runtime_error(pos, format!("read() error: {e}")))?
        }
        Some(_) => return Err(type_error(pos, "read() argument must be a str")),
    };
    Ok(Value::Str(bytes))
}

fn rune(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "rune", args, 1)?;
    match &args[0] {
        Value::Str(s) => {
            let text = String::from_utf8_lossy(s);
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Int(c as i64)),
                _ => Err(value_error(pos, "rune() requires a 1-character str")),
            }
        }
        _ => Err(type_error(pos, "rune() requires a str")),
    }
}

fn slice(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "slice", args, 3)?;
    let (Value::Int(start), Value::Int(end)) = (&args[1], &args[2]) else {
        return Err(type_error(pos, "slice() requires start and end to be ints"));
    };
    let (start, end) = (*start, *end);
    match &args[0] {
        Value::Str(s) => {
            if start < 0 || end > s.len() as i64 || start > end {
                return Err(value_error(pos, "slice() start or end out of bounds"));
            }
            Ok(Value::Str(s[start as usize..end as usize].to_vec()))
        }
        Value::List(list) => {
            let list = list.borrow();
            if start < 0 || end > list.len() as i64 || start > end {
                return Err(value_error(pos, "slice() start or end out of bounds"));
            }
            // a fresh list, never an alias into the original
            Ok(new_list(list[start as usize..end as usize].to_vec()))
        }
        _ => Err(type_error(pos, "slice() requires first argument to be a str or list")),
    }
}

fn sort(interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 && args.len() != 2 {
        return Err(type_error(pos, format!("sort() requires 1 or 2 args, got {}", args.len())));
    }
    let Value::List(list) = &args[0] else {
        return Err(type_error(pos, "sort() requires first argument to be a list"));
    };
    if list.borrow().len() <= 1 {
        return Ok(Value::Nil);
    }

    let values: Vec<Value> = list.borrow().clone();
    let sorted = if args.len() == 1 {
        // elements are their own sort keys
        let pairs = values.into_iter().map(|v| (v.clone(), v)).collect();
        sort_pairs(pos, pairs)?
    } else {
        let Value::Func(key_fn) = &args[1] else {
            return Err(type_error(pos, "sort() requires second argument to be a function"));
        };
        // Decorate-sort-undecorate: the key function runs once per element.
        let mut pairs = Vec::with_capacity(values.len());
        for v in values {
            let key = interp.call_function(pos, key_fn, vec![v.clone()])?;
            pairs.push((v, key));
        }
        sort_pairs(pos, pairs)?
    };
    *list.borrow_mut() = sorted;
    Ok(Value::Nil)
}

fn sort_pairs(pos: Position, mut pairs: Vec<(Value, Value)>) -> Result<Vec<Value>, Error> {
    let mut first_err = None;
    pairs.sort_by(|(_, a), (_, b)| {
        if first_err.is_some() {
            return std::cmp::Ordering::Equal;
        }
        match ops::less(pos, a, b) {
            Ok(true) => std::cmp::Ordering::Less,
            Ok(false) => match ops::less(pos, b, a) {
                Ok(true) => std::cmp::Ordering::Greater,
                Ok(false) => std::cmp::Ordering::Equal,
                Err(e) => {
                    first_err = Some(e);
                    std::cmp::Ordering::Equal
                }
            },
            Err(e) => {
                first_err = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    if let Some(e) = first_err {
        return Err(e);
    }
    Ok(pairs.into_iter().map(|(v, _)| v).collect())
}

fn split(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 && args.len() != 2 {
        return Err(type_error(pos, format!("split() requires 1 or 2 args, got {}", args.len())));
    }
    let Value::Str(s) = &args[0] else {
        return Err(type_error(pos, "split() requires first argument to be a str"));
    };
    let parts: Vec<Vec<u8>> = match args.get(1) {
        // no separator: split on whitespace runs, skipping empties
        None | Some(Value::Nil) => String::from_utf8_lossy(s)
            .split_whitespace()
            .map(|part| part.as_bytes().to_vec())
            .collect(),
        Some(Value::Str(sep)) => {
            if sep.is_empty() {
                return Err(value_error(pos, "split() separator must not be empty"));
            }
            let mut parts = Vec::new();
            let mut rest: &[u8] = s;
            while let Some(i) = ops::bytes_index(rest, sep) {
                parts.push(rest[..i].to_vec());
                rest = &rest[i + sep.len()..];
            }
            parts.push(rest.to_vec());
            parts
        }
        Some(_) => return Err(type_error(pos, "split() requires separator to be a str or nil")),
    };
    Ok(new_list(parts.into_iter().map(Value::Str).collect()))
}

fn str_fn(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "str", args, 1)?;
    Ok(Value::Str(to_display_bytes(&args[0], false)))
}

fn type_fn(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "type", args, 1)?;
    Ok(Value::Str(args[0].type_name().as_bytes().to_vec()))
}

fn upper(_interp: &mut Interp, pos: Position, args: &[Value]) -> Result<Value, Error> {
    ensure_num_args(pos, "upper", args, 1)?;
    match &args[0] {
        Value::Str(s) => {
            Ok(Value::Str(String::from_utf8_lossy(s).to_uppercase().into_bytes()))
        }
        _ => Err(type_error(pos, "upper() requires a str")),
    }
}
