use std::fmt;

use crate::syntax::token::Position;

// ─── Top level ───────────────────────────────────────────────────────────────

/// A parsed littlelang program: an ordered sequence of statements.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Block,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fmt_block(&self.statements))
    }
}

/// A `{ … }` sequence of statements. Blocks do not open scopes; only
/// function calls do.
pub type Block = Vec<Stmt>;

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `target = value`; the target is always a Variable or Subscript.
    Assign {
        pos: Position,
        target: Expr,
        value: Expr,
    },
    /// `if cond { } else { }`; a chained `else if` becomes a one-statement
    /// else block.
    If {
        pos: Position,
        cond: Expr,
        body: Block,
        else_body: Block,
    },
    /// `while cond { }`
    While {
        pos: Position,
        cond: Expr,
        body: Block,
    },
    /// `for name in iterable { }`
    For {
        pos: Position,
        name: String,
        iterable: Expr,
        body: Block,
    },
    /// `return result`
    Return {
        pos: Position,
        result: Expr,
    },
    /// A bare expression evaluated for its side effects.
    Expression {
        pos: Position,
        expr: Expr,
    },
    /// `func name(params) { }`
    FuncDef {
        pos: Position,
        name: String,
        params: Vec<String>,
        ellipsis: bool,
        body: Block,
    },
}

impl Stmt {
    pub fn pos(&self) -> Position {
        match self {
            Stmt::Assign { pos, .. }     => *pos,
            Stmt::If { pos, .. }         => *pos,
            Stmt::While { pos, .. }      => *pos,
            Stmt::For { pos, .. }        => *pos,
            Stmt::Return { pos, .. }     => *pos,
            Stmt::Expression { pos, .. } => *pos,
            Stmt::FuncDef { pos, .. }    => *pos,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value, .. } => write!(f, "{target} = {value}"),
            Stmt::If { cond, body, else_body, .. } => {
                write!(f, "if {cond} {{\n{}\n}}", indent(&fmt_block(body)))?;
                if !else_body.is_empty() {
                    write!(f, " else {{\n{}\n}}", indent(&fmt_block(else_body)))?;
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                write!(f, "while {cond} {{\n{}\n}}", indent(&fmt_block(body)))
            }
            Stmt::For { name, iterable, body, .. } => {
                write!(f, "for {name} in {iterable} {{\n{}\n}}", indent(&fmt_block(body)))
            }
            Stmt::Return { result, .. } => write!(f, "return {result}"),
            Stmt::Expression { expr, .. } => write!(f, "{expr}"),
            Stmt::FuncDef { name, params, ellipsis, body, .. } => {
                write!(f, "func {name}({}{}) {{{}}}",
                    params.join(", "),
                    if *ellipsis { "..." } else { "" },
                    fmt_body(body))
            }
        }
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    /// `left op right`; position is the operator token's.
    Binary {
        pos: Position,
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `not x`, `-x`
    Unary {
        pos: Position,
        op: UnOp,
        operand: Box<Expr>,
    },
    /// `func(args)`; a trailing `...` expands the last argument.
    Call {
        pos: Position,
        func: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
    },
    Literal {
        pos: Position,
        value: Literal,
    },
    Variable {
        pos: Position,
        name: String,
    },
    /// `[a, b, c]`
    List {
        pos: Position,
        values: Vec<Expr>,
    },
    /// `{k: v, ...}` with items kept in source order; keys are expressions.
    Map {
        pos: Position,
        items: Vec<(Expr, Expr)>,
    },
    /// `func(params) { }` used as a value.
    FuncExpr {
        pos: Position,
        params: Vec<String>,
        ellipsis: bool,
        body: Block,
    },
    /// `container[subscript]`; `a.b` desugars to `a["b"]`.
    Subscript {
        pos: Position,
        container: Box<Expr>,
        subscript: Box<Expr>,
    },
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Binary { pos, .. }    => *pos,
            Expr::Unary { pos, .. }     => *pos,
            Expr::Call { pos, .. }      => *pos,
            Expr::Literal { pos, .. }   => *pos,
            Expr::Variable { pos, .. }  => *pos,
            Expr::List { pos, .. }      => *pos,
            Expr::Map { pos, .. }       => *pos,
            Expr::FuncExpr { pos, .. }  => *pos,
            Expr::Subscript { pos, .. } => *pos,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { left, op, right, .. } => write!(f, "({left} {op} {right})"),
            Expr::Unary { op, operand, .. } => {
                let space = if *op == UnOp::Not { " " } else { "" };
                write!(f, "({op}{space}{operand})")
            }
            Expr::Call { func, args, ellipsis, .. } => {
                write!(f, "{func}({}{})",
                    join(args, ", "),
                    if *ellipsis { "..." } else { "" })
            }
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::Variable { name, .. } => f.write_str(name),
            Expr::List { values, .. } => write!(f, "[{}]", join(values, ", ")),
            Expr::Map { items, .. } => {
                let items: Vec<String> = items.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Expr::FuncExpr { params, ellipsis, body, .. } => {
                write!(f, "func({}{}) {{{}}}",
                    params.join(", "),
                    if *ellipsis { "..." } else { "" },
                    fmt_body(body))
            }
            Expr::Subscript { container, subscript, .. } => write!(f, "{container}[{subscript}]"),
        }
    }
}

// ─── Literals and operators ──────────────────────────────────────────────────

/// Literal values are scalars only; lists and maps are built at runtime by
/// their own expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Str(s) => f.write_str(&quote_str(s.as_bytes())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Equal,
    NotEqual,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOp::Or       => "or",
            BinOp::And      => "and",
            BinOp::Equal    => "==",
            BinOp::NotEqual => "!=",
            BinOp::Lt       => "<",
            BinOp::Lte      => "<=",
            BinOp::Gt       => ">",
            BinOp::Gte      => ">=",
            BinOp::In       => "in",
            BinOp::Add      => "+",
            BinOp::Sub      => "-",
            BinOp::Mul      => "*",
            BinOp::Div      => "/",
            BinOp::Mod      => "%",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnOp::Neg => "-",
            UnOp::Not => "not",
        })
    }
}

// ─── Formatting helpers ──────────────────────────────────────────────────────

/// Quote string content the way littlelang source spells it: backslash
/// escapes for `"` `\` and the tab/CR/LF controls, `\xNN` for other control
/// characters and for bytes that aren't valid UTF-8 (byte-level subscripts
/// produce those), and printable text as-is.
pub fn quote_str(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                quote_text(text, &mut out);
                break;
            }
            Err(e) => {
                let (valid, bad) = rest.split_at(e.valid_up_to());
                if let Ok(text) = std::str::from_utf8(valid) {
                    quote_text(text, &mut out);
                }
                let bad_len = e.error_len().unwrap_or(bad.len());
                for b in &bad[..bad_len] {
                    out.push_str(&format!("\\x{b:02x}"));
                }
                rest = &bad[bad_len..];
            }
        }
    }
    out.push('"');
    out
}

fn quote_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '"'  => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            // is_control covers C0, DEL, and the C1 block, all below 0x100
            _ if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            _ => out.push(c),
        }
    }
}

fn fmt_block(block: &[Stmt]) -> String {
    let lines: Vec<String> = block.iter().map(|s| s.to_string()).collect();
    lines.join("\n")
}

// Function bodies collapse to `{}` when empty.
fn fmt_body(body: &[Stmt]) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", indent(&fmt_block(body)))
    }
}

fn indent(s: &str) -> String {
    let lines: Vec<String> = s.lines().map(|line| format!("    {line}")).collect();
    lines.join("\n")
}

fn join(exprs: &[Expr], sep: &str) -> String {
    let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
    parts.join(sep)
}
