use crate::error::{parse_error, Error};
use crate::syntax::ast::{BinOp, Block, Expr, Literal, Program, Stmt, UnOp};
use crate::syntax::lexer::Tokenizer;
use crate::syntax::token::{Token, TokenKind};

/// Recursive-descent parser holding exactly one token of lookahead pulled
/// from the tokenizer. Fails on the first syntax error; no recovery.
pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    tok: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8]) -> Result<Self, Error> {
        let mut tokenizer = Tokenizer::new(input);
        let tok = check_illegal(tokenizer.next())?;
        Ok(Self { tokenizer, tok })
    }

    /// program = statement*
    pub fn parse(mut self) -> Result<Program, Error> {
        let statements = self.parse_statements(&TokenKind::Eof)?;
        Ok(Program { statements })
    }

    /// Parse a single expression (the whole input need not be consumed).
    pub fn parse_expression(mut self) -> Result<Expr, Error> {
        self.parse_expr()
    }

    fn parse_statements(&mut self, end: &TokenKind) -> Result<Block, Error> {
        let mut statements = Block::new();
        while self.tok.kind != *end && self.tok.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    /// statement = if | while | for | return | func | assign-or-expr
    fn parse_statement(&mut self) -> Result<Stmt, Error> {
        match &self.tok.kind {
            TokenKind::If     => self.parse_if(),
            TokenKind::While  => self.parse_while(),
            TokenKind::For    => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Func   => self.parse_func(),
            _ => {
                let pos = self.tok.pos;
                let expr = self.parse_expr()?;
                if self.tok.kind != TokenKind::Assign {
                    return Ok(Stmt::Expression { pos, expr });
                }
                let assign_pos = self.tok.pos;
                match expr {
                    Expr::Variable { .. } | Expr::Subscript { .. } => {
                        self.advance()?;
                        let value = self.parse_expr()?;
                        Ok(Stmt::Assign { pos: assign_pos, target: expr, value })
                    }
                    _ => Err(self.error(
                        "expected name, subscript, or dot expression on left side of =",
                    )),
                }
            }
        }
    }

    /// block = "{" statement* "}"
    fn parse_block(&mut self) -> Result<Block, Error> {
        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_statements(&TokenKind::RBrace)?;
        self.expect(&TokenKind::RBrace)?;
        Ok(body)
    }

    /// if = "if" expression block ("else" (block | if))?
    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::If)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let mut else_body = Block::new();
        if self.tok.kind == TokenKind::Else {
            self.advance()?;
            if self.tok.kind == TokenKind::LBrace {
                else_body = self.parse_block()?;
            } else if self.tok.kind == TokenKind::If {
                else_body = vec![self.parse_if()?];
            } else {
                return Err(self.error(format!(
                    "expected {{ or if after else, not {}",
                    self.tok.kind
                )));
            }
        }
        Ok(Stmt::If { pos, cond, body, else_body })
    }

    /// while = "while" expression block
    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::While)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { pos, cond, body })
    }

    /// for = "for" NAME "in" expression block
    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::For)?;
        let name = self.expect_name()?;
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For { pos, name, iterable, body })
    }

    /// return = "return" expression
    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::Return)?;
        let result = self.parse_expr()?;
        Ok(Stmt::Return { pos, result })
    }

    /// func = "func" NAME params block | "func" params block
    ///
    /// The anonymous form is an expression statement wrapping a FuncExpr.
    fn parse_func(&mut self) -> Result<Stmt, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::Func)?;
        if let TokenKind::Name(name) = &self.tok.kind {
            let name = name.clone();
            self.advance()?;
            let (params, ellipsis) = self.parse_params()?;
            let body = self.parse_block()?;
            Ok(Stmt::FuncDef { pos, name, params, ellipsis, body })
        } else {
            let (params, ellipsis) = self.parse_params()?;
            let body = self.parse_block()?;
            let expr = Expr::FuncExpr { pos, params, ellipsis, body };
            Ok(Stmt::Expression { pos, expr })
        }
    }

    /// params = "(" (NAME ("," NAME)* "..."? ","?)? ")"
    fn parse_params(&mut self) -> Result<(Vec<String>, bool), Error> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut got_comma = true;
        let mut got_ellipsis = false;
        while self.tok.kind != TokenKind::RParen
            && self.tok.kind != TokenKind::Eof
            && !got_ellipsis
        {
            if !got_comma {
                return Err(self.error("expected , between parameters"));
            }
            params.push(self.expect_name()?);
            if self.tok.kind == TokenKind::Ellipsis {
                got_ellipsis = true;
                self.advance()?;
            }
            if self.tok.kind == TokenKind::Comma {
                got_comma = true;
                self.advance()?;
            } else {
                got_comma = false;
            }
        }
        if self.tok.kind != TokenKind::RParen && got_ellipsis {
            return Err(self.error("can only have ... after last parameter"));
        }
        self.expect(&TokenKind::RParen)?;
        Ok((params, got_ellipsis))
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    /// expression = and ("or" and)*
    fn parse_expr(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_and()?;
        while self.tok.kind == TokenKind::Or {
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_and()?;
            expr = binary(pos, expr, BinOp::Or, right);
        }
        Ok(expr)
    }

    /// and = not ("and" not)*
    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_not()?;
        while self.tok.kind == TokenKind::And {
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_not()?;
            expr = binary(pos, expr, BinOp::And, right);
        }
        Ok(expr)
    }

    /// not = "not" not | equality
    fn parse_not(&mut self) -> Result<Expr, Error> {
        if self.tok.kind == TokenKind::Not {
            let pos = self.tok.pos;
            self.advance()?;
            let operand = self.parse_not()?;
            return Ok(Expr::Unary { pos, op: UnOp::Not, operand: Box::new(operand) });
        }
        self.parse_equality()
    }

    /// equality = comparison (("==" | "!=") comparison)*
    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Equal    => BinOp::Equal,
                TokenKind::NotEqual => BinOp::NotEqual,
                _ => break,
            };
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_comparison()?;
            expr = binary(pos, expr, op, right);
        }
        Ok(expr)
    }

    /// comparison = addition (("<" | "<=" | ">" | ">=" | "in") addition)*
    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_addition()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Lt  => BinOp::Lt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::Gt  => BinOp::Gt,
                TokenKind::Gte => BinOp::Gte,
                TokenKind::In  => BinOp::In,
                _ => break,
            };
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_addition()?;
            expr = binary(pos, expr, op, right);
        }
        Ok(expr)
    }

    /// addition = multiply (("+" | "-") multiply)*
    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_multiply()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_multiply()?;
            expr = binary(pos, expr, op, right);
        }
        Ok(expr)
    }

    /// multiply = negative (("*" | "/" | "%") negative)*
    fn parse_multiply(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_negative()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Times  => BinOp::Mul,
                TokenKind::Divide => BinOp::Div,
                TokenKind::Modulo => BinOp::Mod,
                _ => break,
            };
            let pos = self.tok.pos;
            self.advance()?;
            let right = self.parse_negative()?;
            expr = binary(pos, expr, op, right);
        }
        Ok(expr)
    }

    /// negative = "-" negative | call
    fn parse_negative(&mut self) -> Result<Expr, Error> {
        if self.tok.kind == TokenKind::Minus {
            let pos = self.tok.pos;
            self.advance()?;
            let operand = self.parse_negative()?;
            return Ok(Expr::Unary { pos, op: UnOp::Neg, operand: Box::new(operand) });
        }
        self.parse_call()
    }

    /// call = primary (args | subscript | dot)*
    fn parse_call(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.tok.kind {
                TokenKind::LParen => {
                    let pos = self.tok.pos;
                    self.advance()?;
                    let (args, ellipsis) = self.parse_args()?;
                    expr = Expr::Call { pos, func: Box::new(expr), args, ellipsis };
                }
                TokenKind::LBracket => {
                    let pos = self.tok.pos;
                    self.advance()?;
                    let subscript = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Subscript {
                        pos,
                        container: Box::new(expr),
                        subscript: Box::new(subscript),
                    };
                }
                TokenKind::Dot => {
                    let pos = self.tok.pos;
                    self.advance()?;
                    let name_pos = self.tok.pos;
                    let name = self.expect_name()?;
                    let subscript = Expr::Literal { pos: name_pos, value: Literal::Str(name) };
                    expr = Expr::Subscript {
                        pos,
                        container: Box::new(expr),
                        subscript: Box::new(subscript),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// args = "(" (expression ("," expression)* "..."? ","?)? ")"
    fn parse_args(&mut self) -> Result<(Vec<Expr>, bool), Error> {
        let mut args = Vec::new();
        let mut got_comma = true;
        let mut got_ellipsis = false;
        while self.tok.kind != TokenKind::RParen
            && self.tok.kind != TokenKind::Eof
            && !got_ellipsis
        {
            if !got_comma {
                return Err(self.error("expected , between arguments"));
            }
            args.push(self.parse_expr()?);
            if self.tok.kind == TokenKind::Ellipsis {
                got_ellipsis = true;
                self.advance()?;
            }
            if self.tok.kind == TokenKind::Comma {
                got_comma = true;
                self.advance()?;
            } else {
                got_comma = false;
            }
        }
        if self.tok.kind != TokenKind::RParen && got_ellipsis {
            return Err(self.error("can only have ... after last argument"));
        }
        self.expect(&TokenKind::RParen)?;
        Ok((args, got_ellipsis))
    }

    /// primary = NAME | INT | STR | "true" | "false" | "nil" | list | map
    ///         | "func" params block | "(" expression ")"
    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let pos = self.tok.pos;
        let kind = self.tok.kind.clone();
        match kind {
            TokenKind::Name(name) => {
                self.advance()?;
                Ok(Expr::Variable { pos, name })
            }
            TokenKind::Int(digits) => {
                self.advance()?;
                let n: i64 = digits
                    .parse()
                    .map_err(|_| parse_error(pos, format!("integer out of range: {digits}")))?;
                Ok(Expr::Literal { pos, value: Literal::Int(n) })
            }
            TokenKind::Str(s) => {
                self.advance()?;
                Ok(Expr::Literal { pos, value: Literal::Str(s) })
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expr::Literal { pos, value: Literal::Bool(true) })
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expr::Literal { pos, value: Literal::Bool(false) })
            }
            TokenKind::Nil => {
                self.advance()?;
                Ok(Expr::Literal { pos, value: Literal::Nil })
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Func => {
                self.advance()?;
                let (params, ellipsis) = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr::FuncExpr { pos, params, ellipsis, body })
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error(format!("expected expression, not {}", self.tok.kind))),
        }
    }

    /// list = "[" (expression ("," expression)* ","?)? "]"
    fn parse_list(&mut self) -> Result<Expr, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::LBracket)?;
        let mut values = Vec::new();
        let mut got_comma = true;
        while self.tok.kind != TokenKind::RBracket && self.tok.kind != TokenKind::Eof {
            if !got_comma {
                return Err(self.error("expected , between list elements"));
            }
            values.push(self.parse_expr()?);
            if self.tok.kind == TokenKind::Comma {
                got_comma = true;
                self.advance()?;
            } else {
                got_comma = false;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::List { pos, values })
    }

    /// map = "{" (expression ":" expression ("," expression ":" expression)* ","?)? "}"
    fn parse_map(&mut self) -> Result<Expr, Error> {
        let pos = self.tok.pos;
        self.expect(&TokenKind::LBrace)?;
        let mut items = Vec::new();
        let mut got_comma = true;
        while self.tok.kind != TokenKind::RBrace && self.tok.kind != TokenKind::Eof {
            if !got_comma {
                return Err(self.error("expected , between map items"));
            }
            let key = self.parse_expr()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            items.push((key, value));
            if self.tok.kind == TokenKind::Comma {
                got_comma = true;
                self.advance()?;
            } else {
                got_comma = false;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Map { pos, items })
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn advance(&mut self) -> Result<(), Error> {
        self.tok = check_illegal(self.tokenizer.next())?;
        Ok(())
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.tok.kind != *kind {
            return Err(self.error(format!("expected {} and not {}", kind, self.tok.kind)));
        }
        self.advance()
    }

    fn expect_name(&mut self) -> Result<String, Error> {
        if let TokenKind::Name(name) = &self.tok.kind {
            let name = name.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.error(format!("expected name and not {}", self.tok.kind)))
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        parse_error(self.tok.pos, message)
    }
}

fn binary(pos: crate::syntax::token::Position, left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr::Binary { pos, left: Box::new(left), op, right: Box::new(right) }
}

// An Illegal token aborts the parse with the tokenizer's reason.
fn check_illegal(tok: Token) -> Result<Token, Error> {
    if let TokenKind::Illegal(msg) = &tok.kind {
        return Err(parse_error(tok.pos, msg.clone()));
    }
    Ok(tok)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
