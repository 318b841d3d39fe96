pub mod error;
pub mod runtime;
pub mod syntax;

pub use error::{Error, ErrorKind};
pub use runtime::interpreter::{Config, Interp, Stats};
pub use runtime::value::Value;
pub use syntax::ast::{Block, Expr, Program, Stmt};
pub use syntax::token::{Position, Token, TokenKind};

use syntax::parser::Parser;

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse an entire program into its statement list.
pub fn parse_program(input: &[u8]) -> Result<Program, Error> {
    Parser::new(input)?.parse()
}

/// Parse a single expression.
pub fn parse_expression(input: &[u8]) -> Result<Expr, Error> {
    Parser::new(input)?.parse_expression()
}

/// Run a parsed program against the given host configuration. Returns the
/// interpreter statistics on success.
pub fn execute(prog: &Program, config: Config) -> Result<Stats, Error> {
    let mut interp = Interp::new(config);
    interp.execute(prog)?;
    Ok(interp.stats())
}

/// Evaluate a parsed expression, returning its value and the statistics.
pub fn evaluate(expr: &Expr, config: Config) -> Result<(Value, Stats), Error> {
    let mut interp = Interp::new(config);
    let value = interp.eval_expr(expr)?;
    Ok((value, interp.stats()))
}
