use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::{name_error, runtime_error, type_error, Error};
use crate::runtime::builtins::BUILTINS;
use crate::runtime::ops;
use crate::runtime::value::{new_list, new_map, FuncValue, ScopeRef, UserFunc, Value};
use crate::syntax::ast::{quote_str, BinOp, Block, Expr, Literal, Program, Stmt};
use crate::syntax::lexer::decode_char;
use crate::syntax::token::Position;

/// Host configuration for an interpreter run. Everything defaults to the
/// process environment: real stdin/stdout and `std::process::exit`.
#[derive(Default)]
pub struct Config {
    /// Pre-defined variables injected into the global scope.
    pub vars: HashMap<String, Value>,
    /// Program arguments returned by the `args()` builtin.
    pub args: Vec<String>,
    /// Input for the `read()` builtin.
    pub stdin: Option<Box<dyn Read>>,
    /// Output sink for the `print()` builtin.
    pub stdout: Option<Box<dyn Write>>,
    /// Called by the `exit()` builtin.
    pub exit: Option<Box<dyn FnMut(i32)>>,
}

/// Counters collected during execution, reported by the CLI's `--stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub ops: u64,
    pub user_calls: u64,
    pub builtin_calls: u64,
}

/// Tree-walk evaluator. Holds the scope stack (innermost last), host I/O,
/// and the pending early-return state.
pub struct Interp {
    scopes: Vec<ScopeRef>,
    args: Vec<String>,
    stdin: Box<dyn Read>,
    stdout: Box<dyn Write>,
    exit: Box<dyn FnMut(i32)>,
    stats: Stats,
    return_value: Option<Value>,
    return_pos: Position,
}

impl Interp {
    pub fn new(config: Config) -> Self {
        let Config { vars, args, stdin, stdout, exit } = config;
        let mut interp = Self {
            scopes: vec![Rc::new(RefCell::new(HashMap::new()))],
            args,
            stdin: stdin.unwrap_or_else(|| Box::new(io::stdin())),
            stdout: stdout.unwrap_or_else(|| Box::new(io::stdout())),
            exit: exit.unwrap_or_else(|| Box::new(|code| std::process::exit(code))),
            stats: Stats::default(),
            return_value: None,
            return_pos: Position::new(1, 1),
        };
        for b in BUILTINS {
            interp.assign(b.name, Value::Func(FuncValue::Builtin(*b)));
        }
        for (name, value) in vars {
            interp.assign(&name, value);
        }
        interp
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Run a whole program. A `return` that unwinds to the top level is a
    /// runtime error at the `return` keyword.
    pub fn execute(&mut self, prog: &Program) -> Result<(), Error> {
        for stmt in &prog.statements {
            self.exec_stmt(stmt)?;
            if self.return_value.take().is_some() {
                return Err(runtime_error(self.return_pos, "can't return at top level"));
            }
        }
        Ok(())
    }

    // ─── Scope chain ─────────────────────────────────────────────────────────

    fn push_scope(&mut self, scope: ScopeRef) {
        self.scopes.push(scope);
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn top_scope(&self) -> ScopeRef {
        self.scopes.last().unwrap().clone()
    }

    /// Writes always go to the topmost scope.
    fn assign(&mut self, name: &str, value: Value) {
        self.scopes.last().unwrap().borrow_mut().insert(name.to_string(), value);
    }

    /// Reads search from the top of the stack downward.
    fn lookup(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.borrow().get(name) {
                return Some(v.clone());
            }
        }
        None
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        self.stats.ops += 1;
        match stmt {
            Stmt::Assign { target, value, .. } => match target {
                Expr::Variable { name, .. } => {
                    let v = self.eval_expr(value)?;
                    self.assign(name, v);
                    Ok(())
                }
                Expr::Subscript { container, subscript, .. } => {
                    let c = self.eval_expr(container)?;
                    let s = self.eval_expr(subscript)?;
                    let v = self.eval_expr(value)?;
                    ops::assign_subscript(subscript.pos(), &c, &s, v)
                }
                _ => unreachable!("parser only produces variable or subscript targets"),
            },

            Stmt::If { cond, body, else_body, .. } => match self.eval_expr(cond)? {
                Value::Bool(true) => self.exec_block(body),
                Value::Bool(false) => self.exec_block(else_body),
                other => Err(type_error(
                    cond.pos(),
                    format!("if condition must be bool, got {}", other.type_name()),
                )),
            },

            Stmt::While { cond, body, .. } => loop {
                match self.eval_expr(cond)? {
                    Value::Bool(false) => return Ok(()),
                    Value::Bool(true) => {
                        self.exec_block(body)?;
                        if self.return_value.is_some() {
                            return Ok(());
                        }
                    }
                    other => {
                        return Err(type_error(
                            cond.pos(),
                            format!("while condition must be bool, got {}", other.type_name()),
                        ))
                    }
                }
            },

            Stmt::For { name, iterable, body, .. } => {
                let value = self.eval_expr(iterable)?;
                let mut iter = iterate(iterable.pos(), value)?;
                while let Some(v) = iter.next() {
                    self.assign(name, v);
                    self.exec_block(body)?;
                    if self.return_value.is_some() {
                        break;
                    }
                }
                Ok(())
            }

            Stmt::Expression { expr, .. } => {
                self.eval_expr(expr)?;
                Ok(())
            }

            Stmt::FuncDef { name, params, ellipsis, body, .. } => {
                let f = UserFunc {
                    name: name.clone(),
                    params: params.clone(),
                    ellipsis: *ellipsis,
                    body: body.clone(),
                    closure: self.top_scope(),
                };
                self.assign(name, Value::Func(FuncValue::User(Rc::new(f))));
                Ok(())
            }

            Stmt::Return { pos, result } => {
                let v = self.eval_expr(result)?;
                self.return_value = Some(v);
                self.return_pos = *pos;
                Ok(())
            }
        }
    }

    fn exec_block(&mut self, block: &Block) -> Result<(), Error> {
        for stmt in block {
            self.exec_stmt(stmt)?;
            if self.return_value.is_some() {
                break;
            }
        }
        Ok(())
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, Error> {
        self.stats.ops += 1;
        match expr {
            Expr::Binary { pos, left, op, right } => match op {
                BinOp::And => self.eval_and(*pos, left, right),
                BinOp::Or => self.eval_or(*pos, left, right),
                _ => {
                    let l = self.eval_expr(left)?;
                    let r = self.eval_expr(right)?;
                    ops::binary(*pos, *op, l, r)
                }
            },

            Expr::Unary { pos, op, operand } => {
                let v = self.eval_expr(operand)?;
                ops::unary(*pos, *op, v)
            }

            Expr::Call { func, args, ellipsis, .. } => self.eval_call(func, args, *ellipsis),

            Expr::Literal { value, .. } => Ok(literal_value(value)),

            Expr::Variable { pos, name } => self.lookup(name).ok_or_else(|| {
                name_error(*pos, format!("name {} not found", quote_str(name.as_bytes())))
            }),

            Expr::List { values, .. } => {
                let mut elems = Vec::with_capacity(values.len());
                for v in values {
                    elems.push(self.eval_expr(v)?);
                }
                Ok(new_list(elems))
            }

            Expr::Map { items, .. } => {
                let mut map = HashMap::new();
                for (key_expr, value_expr) in items {
                    let key = match self.eval_expr(key_expr)? {
                        Value::Str(key) => key,
                        other => {
                            return Err(type_error(
                                key_expr.pos(),
                                format!("map key must be str, not {}", other.type_name()),
                            ))
                        }
                    };
                    let value = self.eval_expr(value_expr)?;
                    map.insert(key, value);
                }
                Ok(new_map(map))
            }

            Expr::Subscript { container, subscript, .. } => {
                let c = self.eval_expr(container)?;
                let s = self.eval_expr(subscript)?;
                ops::subscript(subscript.pos(), &c, &s)
            }

            Expr::FuncExpr { params, ellipsis, body, .. } => {
                let f = UserFunc {
                    name: String::new(),
                    params: params.clone(),
                    ellipsis: *ellipsis,
                    body: body.clone(),
                    closure: self.top_scope(),
                };
                Ok(Value::Func(FuncValue::User(Rc::new(f))))
            }
        }
    }

    // Both operands must be bools; the right one is only evaluated when the
    // left doesn't decide the result.
    fn eval_and(&mut self, pos: Position, left: &Expr, right: &Expr) -> Result<Value, Error> {
        match self.eval_expr(left)? {
            Value::Bool(false) => Ok(Value::Bool(false)),
            Value::Bool(true) => match self.eval_expr(right)? {
                Value::Bool(r) => Ok(Value::Bool(r)),
                _ => Err(type_error(pos, "and requires two bools")),
            },
            _ => Err(type_error(pos, "and requires two bools")),
        }
    }

    fn eval_or(&mut self, pos: Position, left: &Expr, right: &Expr) -> Result<Value, Error> {
        match self.eval_expr(left)? {
            Value::Bool(true) => Ok(Value::Bool(true)),
            Value::Bool(false) => match self.eval_expr(right)? {
                Value::Bool(r) => Ok(Value::Bool(r)),
                _ => Err(type_error(pos, "or requires two bools")),
            },
            _ => Err(type_error(pos, "or requires two bools")),
        }
    }

    // ─── Calls ───────────────────────────────────────────────────────────────

    fn eval_call(
        &mut self,
        func_expr: &Expr,
        arg_exprs: &[Expr],
        ellipsis: bool,
    ) -> Result<Value, Error> {
        let f = match self.eval_expr(func_expr)? {
            Value::Func(f) => f,
            other => {
                return Err(type_error(
                    func_expr.pos(),
                    format!("can't call non-function type {}", other.type_name()),
                ))
            }
        };
        let mut args = Vec::with_capacity(arg_exprs.len());
        for a in arg_exprs {
            args.push(self.eval_expr(a)?);
        }
        if ellipsis {
            if let (Some(last), Some(last_expr)) = (args.pop(), arg_exprs.last()) {
                let mut iter = iterate(last_expr.pos(), last)?;
                while let Some(v) = iter.next() {
                    args.push(v);
                }
            }
        }
        self.call_function(func_expr.pos(), &f, args)
    }

    /// Invoke a function value with already-evaluated arguments. Used for
    /// every call site and by built-ins that take callbacks (`sort`).
    pub fn call_function(
        &mut self,
        pos: Position,
        f: &FuncValue,
        args: Vec<Value>,
    ) -> Result<Value, Error> {
        match f {
            FuncValue::Builtin(b) => {
                self.stats.builtin_calls += 1;
                (b.func)(self, pos, &args)
            }
            FuncValue::User(f) => self.call_user(pos, f.clone(), args),
        }
    }

    fn call_user(
        &mut self,
        pos: Position,
        f: Rc<UserFunc>,
        mut args: Vec<Value>,
    ) -> Result<Value, Error> {
        if f.ellipsis {
            if args.len() + 1 < f.params.len() {
                return Err(arity_error(pos, &f.name, f.params.len() - 1, args.len(), true));
            }
            let rest = args.split_off(f.params.len() - 1);
            args.push(new_list(rest));
        }
        if args.len() != f.params.len() {
            return Err(arity_error(pos, &f.name, f.params.len(), args.len(), false));
        }

        self.push_scope(f.closure.clone());
        self.push_scope(Rc::new(RefCell::new(HashMap::new())));
        for (param, arg) in f.params.iter().zip(args) {
            self.assign(param, arg);
        }
        self.stats.user_calls += 1;

        let saved = self.return_value.take();
        let result = self.exec_block(&f.body);
        let value = self.return_value.take().unwrap_or(Value::Nil);
        self.return_value = saved;
        self.pop_scope();
        self.pop_scope();
        result.map(|()| value)
    }

    // ─── Host access for built-ins ───────────────────────────────────────────

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&mut self) -> &mut dyn Read {
        &mut *self.stdin
    }

    pub fn stdout(&mut self) -> &mut dyn Write {
        &mut *self.stdout
    }

    pub fn call_exit(&mut self, code: i32) {
        (self.exit)(code);
    }
}

fn arity_error(pos: Position, name: &str, required: usize, got: usize, at_least: bool) -> Error {
    let plural = if required == 1 { "" } else { "s" };
    let least = if at_least { "at least " } else { "" };
    type_error(pos, format!("{name}() requires {least}{required} arg{plural}, got {got}"))
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Str(s) => Value::Str(s.clone().into_bytes()),
    }
}

// ─── Iteration ───────────────────────────────────────────────────────────────

/// Single-pass iterator over strs (per codepoint), lists (live view by
/// index), and maps (keys snapshotted up front).
#[derive(Debug)]
pub enum Iter {
    Str { s: Vec<u8>, offset: usize },
    List { list: crate::runtime::value::ListRef, index: usize },
    Keys { keys: std::vec::IntoIter<Vec<u8>> },
}

impl Iter {
    pub fn next(&mut self) -> Option<Value> {
        match self {
            Iter::Str { s, offset } => {
                if *offset >= s.len() {
                    return None;
                }
                match decode_char(&s[*offset..]) {
                    Some((c, size)) => {
                        *offset += size;
                        Some(Value::Str(c.to_string().into_bytes()))
                    }
                    None => {
                        // invalid byte: yield a replacement char, move past it
                        *offset += 1;
                        Some(Value::Str("\u{fffd}".as_bytes().to_vec()))
                    }
                }
            }
            Iter::List { list, index } => {
                let v = list.borrow().get(*index).cloned()?;
                *index += 1;
                Some(v)
            }
            Iter::Keys { keys } => keys.next().map(Value::Str),
        }
    }
}

pub fn iterate(pos: Position, value: Value) -> Result<Iter, Error> {
    match value {
        Value::Str(s) => Ok(Iter::Str { s, offset: 0 }),
        Value::List(list) => Ok(Iter::List { list, index: 0 }),
        Value::Map(map) => {
            let keys: Vec<Vec<u8>> = map.borrow().keys().cloned().collect();
            Ok(Iter::Keys { keys: keys.into_iter() })
        }
        other => Err(type_error(
            pos,
            format!("expected iterable (str, list, or map), got {}", other.type_name()),
        )),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    #[test]
    fn string_iteration_decodes_codepoints() {
        let s = Value::Str("“ab”".as_bytes().to_vec());
        let mut iter = iterate(pos(), s).unwrap();
        let mut out = Vec::new();
        while let Some(v) = iter.next() {
            match v {
                Value::Str(s) => out.push(String::from_utf8(s).unwrap()),
                other => panic!("expected str, got {other:?}"),
            }
        }
        assert_eq!(out, vec!["“", "a", "b", "”"]);
    }

    #[test]
    fn list_iteration_is_a_live_view() {
        let list = new_list(vec![Value::Int(1)]);
        let mut iter = iterate(pos(), list.clone()).unwrap();
        assert!(matches!(iter.next(), Some(Value::Int(1))));
        // appending during iteration stays memory-safe
        if let Value::List(l) = &list {
            l.borrow_mut().push(Value::Int(2));
        }
        assert!(matches!(iter.next(), Some(Value::Int(2))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn iterating_an_int_is_a_type_error() {
        let err = iterate(pos(), Value::Int(3)).unwrap_err();
        assert_eq!(err.message, "expected iterable (str, list, or map), got int");
    }
}
