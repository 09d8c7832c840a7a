//! Recursive-descent parser
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparison / membership /
//! null test / `matches`, `+ -`, `* / %`, unary minus.

use crate::ast::{BinaryOp, ColumnRef, Expr, Function, UnaryOp};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::{Error, Result};
use datavet_ir::Value;

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "null", "true", "false", "matches",
];

/// Parse an expression string into an [`Expr`]
///
/// # Errors
///
/// Returns [`Error::Syntax`] describing the first problem found.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    if parser.peek().kind == TokenKind::Eof {
        return Err(Error::syntax(1, "empty expression"));
    }
    let expr = parser.parse_or()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(Error::syntax(
            trailing.column,
            format!("unexpected {}", describe(&trailing.kind)),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            let token = self.peek();
            Err(Error::syntax(
                token.column,
                format!("expected {what}, found {}", describe(&token.kind)),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") || self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") || self.eat(&TokenKind::AndAnd) {
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") || self.eat(&TokenKind::Bang) {
            let expr = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match self.peek().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(binary(op, left, right));
        }

        if self.peek().is_keyword("not") && self.peek_at(1).is_keyword("in") {
            self.pos += 2;
            let set = self.parse_additive()?;
            return Ok(Expr::In {
                expr: Box::new(left),
                set: Box::new(set),
                negated: true,
            });
        }
        if self.eat_keyword("in") {
            let set = self.parse_additive()?;
            return Ok(Expr::In {
                expr: Box::new(left),
                set: Box::new(set),
                negated: false,
            });
        }
        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            if !self.eat_keyword("null") {
                let token = self.peek();
                return Err(Error::syntax(
                    token.column,
                    format!("expected 'null' after 'is', found {}", describe(&token.kind)),
                ));
            }
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }
        if self.eat_keyword("matches") {
            let pattern = self.parse_additive()?;
            return Ok(Expr::Matches {
                expr: Box::new(left),
                pattern: Box::new(pattern),
            });
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.parse_unary()?;
            return Ok(match expr {
                Expr::Literal(Value::Integer(i)) => Expr::Literal(Value::Integer(-i)),
                Expr::Literal(Value::Decimal(d)) => Expr::Literal(Value::Decimal(-d)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(other),
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(i) => Ok(Expr::Literal(Value::Integer(i))),
            TokenKind::Dec(d) => Ok(Expr::Literal(Value::Decimal(d))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::QuotedIdent(name) => self.parse_reference(name),
            TokenKind::Ident(name) => {
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    "true" => Ok(Expr::Literal(Value::Boolean(true))),
                    "false" => Ok(Expr::Literal(Value::Boolean(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    _ if KEYWORDS.contains(&lower.as_str()) => Err(Error::syntax(
                        token.column,
                        format!("unexpected keyword '{name}'"),
                    )),
                    _ if self.peek().kind == TokenKind::LParen => {
                        self.parse_call(&name, token.column)
                    }
                    _ => self.parse_reference(name),
                }
            }
            other => Err(Error::syntax(
                token.column,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }

    fn parse_list(&mut self) -> Result<Expr> {
        let mut items = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.parse_or()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RBracket, "',' or ']'")?;
            return Ok(Expr::List(items));
        }
    }

    fn parse_reference(&mut self, first: String) -> Result<Expr> {
        if !self.eat(&TokenKind::Dot) {
            return Ok(Expr::Column(ColumnRef::new(first)));
        }
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) | TokenKind::QuotedIdent(name) => {
                Ok(Expr::Column(ColumnRef::qualified(first, name)))
            }
            other => Err(Error::syntax(
                token.column,
                format!("expected column name after '.', found {}", describe(&other)),
            )),
        }
    }

    fn parse_call(&mut self, name: &str, column: usize) -> Result<Expr> {
        let function = Function::from_name(name)
            .ok_or_else(|| Error::syntax(column, format!("unknown function '{name}'")))?;
        self.expect(&TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RParen, "',' or ')'")?;
                break;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min}-{max}")
            };
            return Err(Error::syntax(
                column,
                format!(
                    "function '{}' expects {expected} argument(s), got {}",
                    function.name(),
                    args.len()
                ),
            ));
        }
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) => format!("'{s}'"),
        TokenKind::QuotedIdent(s) => format!("`{s}`"),
        TokenKind::Str(s) => format!("string '{s}'"),
        TokenKind::Int(i) => format!("number {i}"),
        TokenKind::Dec(d) => format!("number {d}"),
        TokenKind::Eof => "end of expression".to_string(),
        other => format!("{other:?}"),
    }
}
