use thiserror::Error;

use super::ast::{
    AssignTarget, BinaryOp, Block, Expr, ExprKind, IfArm, NodeId, Param, Program, Span, Stmt,
    StmtKind, TypeName, UnaryOp,
};

/// Error raised when behavior source text cannot be tokenized or parsed.
///
/// The parser fails fast on the first malformed construct; everything that
/// can reasonably be deferred (timer amounts, time units) is carried as raw
/// tokens and diagnosed by the analysis phases instead.
#[derive(Debug, Clone, Error)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse behavior source text into a [`Program`].
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(source, tokens).parse_program()
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident,
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Dot,
    Arrow,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    lexeme: String,
    span: Span,
}

struct Lexer<'a> {
    bytes: &'a [u8],
    index: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws_and_comments();
            let span = Span::new(self.line, self.column);
            let Some(ch) = self.current() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    span,
                });
                return Ok(tokens);
            };

            let token = match ch {
                b'(' => self.punct(TokenKind::LParen, span),
                b')' => self.punct(TokenKind::RParen, span),
                b'{' => self.punct(TokenKind::LBrace, span),
                b'}' => self.punct(TokenKind::RBrace, span),
                b'[' => self.punct(TokenKind::LBracket, span),
                b']' => self.punct(TokenKind::RBracket, span),
                b':' => self.punct(TokenKind::Colon, span),
                b',' => self.punct(TokenKind::Comma, span),
                b'.' => self.punct(TokenKind::Dot, span),
                b'+' => self.punct(TokenKind::Plus, span),
                b'*' => self.punct(TokenKind::Star, span),
                b'/' => self.punct(TokenKind::Slash, span),
                b'%' => self.punct(TokenKind::Percent, span),
                b'-' => {
                    self.advance();
                    if self.current() == Some(b'>') {
                        self.advance();
                        Token {
                            kind: TokenKind::Arrow,
                            lexeme: "->".into(),
                            span,
                        }
                    } else {
                        Token {
                            kind: TokenKind::Minus,
                            lexeme: "-".into(),
                            span,
                        }
                    }
                }
                b'=' => {
                    self.advance();
                    if self.current() == Some(b'=') {
                        self.advance();
                        Token {
                            kind: TokenKind::Eq,
                            lexeme: "==".into(),
                            span,
                        }
                    } else {
                        Token {
                            kind: TokenKind::Assign,
                            lexeme: "=".into(),
                            span,
                        }
                    }
                }
                b'!' => {
                    self.advance();
                    if self.current() == Some(b'=') {
                        self.advance();
                        Token {
                            kind: TokenKind::Ne,
                            lexeme: "!=".into(),
                            span,
                        }
                    } else {
                        return Err(self.error_at(span, "expected '=' after '!'"));
                    }
                }
                b'<' => {
                    self.advance();
                    if self.current() == Some(b'=') {
                        self.advance();
                        Token {
                            kind: TokenKind::Le,
                            lexeme: "<=".into(),
                            span,
                        }
                    } else {
                        Token {
                            kind: TokenKind::Lt,
                            lexeme: "<".into(),
                            span,
                        }
                    }
                }
                b'>' => {
                    self.advance();
                    if self.current() == Some(b'=') {
                        self.advance();
                        Token {
                            kind: TokenKind::Ge,
                            lexeme: ">=".into(),
                            span,
                        }
                    } else {
                        Token {
                            kind: TokenKind::Gt,
                            lexeme: ">".into(),
                            span,
                        }
                    }
                }
                b'"' => self.string(span)?,
                b'0'..=b'9' => self.number(span)?,
                c if is_ident_start(c) => self.ident(span),
                other => {
                    return Err(self.error_at(
                        span,
                        &format!("unexpected character '{}'", other as char),
                    ));
                }
            };
            tokens.push(token);
        }
    }

    fn punct(&mut self, kind: TokenKind, span: Span) -> Token {
        let lexeme = (self.current().unwrap_or(b' ') as char).to_string();
        self.advance();
        Token { kind, lexeme, span }
    }

    fn string(&mut self, span: Span) -> ParseResult<Token> {
        self.advance(); // opening quote
        let mut buf = String::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                b'"' => {
                    return Ok(Token {
                        kind: TokenKind::Str(buf.clone()),
                        lexeme: buf,
                        span,
                    });
                }
                b'\\' => {
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error_at(span, "incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        other => {
                            return Err(self.error_at(
                                span,
                                &format!("unknown escape: \\{}", other as char),
                            ));
                        }
                    };
                    buf.push(value);
                }
                _ => buf.push(ch as char),
            }
        }
        Err(self.error_at(span, "unterminated string literal"))
    }

    fn number(&mut self, span: Span) -> ParseResult<Token> {
        let start = self.index;
        while matches!(self.current(), Some(b'0'..=b'9')) {
            self.advance();
        }
        let mut is_float = false;
        if self.current() == Some(b'.') && matches!(self.peek(), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            while matches!(self.current(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.index])
            .map_err(|_| self.error_at(span, "invalid numeric literal"))?
            .to_string();
        let kind = if is_float {
            TokenKind::Float(
                text.parse::<f64>()
                    .map_err(|_| self.error_at(span, "invalid float literal"))?,
            )
        } else {
            TokenKind::Int(
                text.parse::<i64>()
                    .map_err(|_| self.error_at(span, "invalid integer literal"))?,
            )
        };
        Ok(Token {
            kind,
            lexeme: text,
            span,
        })
    }

    fn ident(&mut self, span: Span) -> Token {
        let start = self.index;
        while let Some(ch) = self.current() {
            if is_ident_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.index]).to_string();
        Token {
            kind: TokenKind::Ident,
            lexeme: text,
            span,
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while let Some(ch) = self.current() {
                if ch.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }
            if self.current() == Some(b'#') {
                while let Some(ch) = self.current() {
                    self.advance();
                    if ch == b'\n' {
                        break;
                    }
                }
                continue;
            }
            break;
        }
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current() {
            self.index += 1;
            if ch == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn error_at(&self, span: Span, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    index: usize,
    next_node: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            index: 0,
            next_node: 0,
        }
    }

    fn parse_program(mut self) -> ParseResult<Program> {
        let header = self.expect_keyword("behavior")?;
        let params = if self.check(&TokenKind::LParen) {
            self.parse_params()?
        } else {
            Vec::new()
        };

        let body_id = self.node_id();
        let mut statements = Vec::new();
        while !self.check_keyword("end") {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("behavior is missing its closing 'end'"));
            }
            statements.push(self.parse_stmt()?);
        }
        self.expect_keyword("end")?;
        self.expect(&TokenKind::Eof, "end of input")?;

        Ok(Program {
            params,
            body: Block {
                id: body_id,
                statements,
                span: header,
            },
            source: self.source.to_string(),
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, span) = self.expect_ident("parameter name")?;
                self.expect(&TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty, span });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_type(&mut self) -> ParseResult<TypeName> {
        let (name, span) = self.expect_ident("type name")?;
        match name.as_str() {
            "int" => Ok(TypeName::Int),
            "float" => Ok(TypeName::Float),
            "string" => Ok(TypeName::Str),
            "bool" => Ok(TypeName::Bool),
            "date" => Ok(TypeName::Date),
            "time" => Ok(TypeName::Time),
            "datetime" => Ok(TypeName::DateTime),
            other => Err(self.error_at(span, &format!("unknown type '{}'", other))),
        }
    }

    /// Optional `[len]` suffix on a declaration type.
    fn parse_array_len(&mut self) -> ParseResult<Option<usize>> {
        if !self.eat(&TokenKind::LBracket) {
            return Ok(None);
        }
        let token = self.advance_token();
        let len = match token.kind {
            TokenKind::Int(n) if n > 0 => n as usize,
            _ => {
                return Err(self.error_at(
                    token.span,
                    "array length must be a positive integer literal",
                ));
            }
        };
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Some(len))
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let id = self.node_id();
        let open = self.expect(&TokenKind::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("unterminated block"));
            }
            statements.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Block {
            id,
            statements,
            span: open,
        })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let id = self.node_id();
        let span = self.current_span();

        if self.eat_keyword("import") {
            let (first, _) = self.expect_ident("import path segment")?;
            let mut path = vec![first];
            while self.eat(&TokenKind::Dot) {
                let (segment, _) = self.expect_ident("import path segment")?;
                path.push(segment);
            }
            let alias = if self.eat_keyword("as") {
                Some(self.expect_ident("import alias")?.0)
            } else {
                None
            };
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Import { path, alias },
            });
        }

        if self.eat_keyword("unit") {
            let (name, _) = self.expect_ident("unit name")?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Unit { name },
            });
        }

        if self.eat_keyword("attribute") {
            let (name, _) = self.expect_ident("attribute name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            let len = self.parse_array_len()?;
            let unit = if self.eat_keyword("in") {
                Some(self.expect_ident("unit name")?.0)
            } else {
                None
            };
            let trend = self.eat_keyword("trend");
            let init = if len.is_none() && self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Attribute {
                    name,
                    ty,
                    len,
                    unit,
                    trend,
                    init,
                },
            });
        }

        if self.eat_keyword("var") {
            let (name, _) = self.expect_ident("variable name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            let len = self.parse_array_len()?;
            let init = if len.is_none() && self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Var {
                    name,
                    ty,
                    len,
                    init,
                },
            });
        }

        if self.check_keyword("timer") || self.check_keyword("repeat") {
            let repeating = self.check_keyword("repeat");
            self.advance_token();
            let (name, _) = self.expect_ident("timer name")?;
            // The amount and the optional unit stay raw tokens so the
            // definition phase can diagnose them with positions.
            let amount = self.advance_token().lexeme;
            let unit = if self.check_ident() {
                Some(self.advance_token().lexeme)
            } else {
                None
            };
            self.expect(&TokenKind::Arrow, "'->'")?;
            let (target, _) = self.expect_ident("timer target")?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Timer {
                    name,
                    amount,
                    unit,
                    repeating,
                    target,
                },
            });
        }

        if self.eat_keyword("display") {
            let (name, _) = self.expect_ident("display name")?;
            self.expect_keyword("on")?;
            let device = self.expect_string("device identifier")?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Display { name, device },
            });
        }

        if self.eat_keyword("function") {
            let (name, _) = self.expect_ident("function name")?;
            let params = self.parse_params()?;
            let ret = if self.eat(&TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let body = self.parse_block()?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Function {
                    name,
                    params,
                    ret,
                    body,
                },
            });
        }

        if self.eat_keyword("if") {
            let mut arms = Vec::new();
            let condition = self.parse_expr()?;
            let block = self.parse_block()?;
            arms.push(IfArm { condition, block });
            let mut else_block = None;
            loop {
                if self.eat_keyword("elsif") {
                    let condition = self.parse_expr()?;
                    let block = self.parse_block()?;
                    arms.push(IfArm { condition, block });
                } else if self.eat_keyword("else") {
                    else_block = Some(self.parse_block()?);
                    break;
                } else {
                    break;
                }
            }
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::If { arms, else_block },
            });
        }

        if self.eat_keyword("start") {
            let (name, _) = self.expect_ident("timer name")?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Start { name },
            });
        }

        if self.eat_keyword("show") {
            let (name, _) = self.expect_ident("display name")?;
            let value = self.parse_expr()?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Show { name, value },
            });
        }

        if self.eat_keyword("return") {
            let value = if self.check(&TokenKind::RBrace) || self.check_keyword("end") {
                None
            } else {
                Some(self.parse_expr()?)
            };
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::Return { value },
            });
        }

        if self.eat_keyword("state") {
            self.expect(&TokenKind::Assign, "'='")?;
            let value = self.parse_expr()?;
            return Ok(Stmt {
                id,
                span,
                kind: StmtKind::StateAssign { value },
            });
        }

        if self.check_ident() {
            let (name, name_span) = self.expect_ident("identifier")?;
            if self.eat(&TokenKind::Assign) {
                let value = self.parse_expr()?;
                return Ok(Stmt {
                    id,
                    span,
                    kind: StmtKind::Assign {
                        target: AssignTarget::Name { name },
                        value,
                    },
                });
            }
            if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                self.expect(&TokenKind::Assign, "'='")?;
                let value = self.parse_expr()?;
                return Ok(Stmt {
                    id,
                    span,
                    kind: StmtKind::Assign {
                        target: AssignTarget::Index { name, index },
                        value,
                    },
                });
            }
            if self.check(&TokenKind::LParen) {
                let expr = self.finish_call(name, name_span)?;
                return Ok(Stmt {
                    id,
                    span,
                    kind: StmtKind::Expr { expr },
                });
            }
            return Err(self.error_at(
                name_span,
                &format!("expected assignment or call after '{}'", name),
            ));
        }

        Err(self.error("expected a statement"))
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check_keyword("or") {
            let span = self.advance_token().span;
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check_keyword("and") {
            let span = self.advance_token().span;
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = if self.check(&TokenKind::Eq) {
                BinaryOp::Eq
            } else if self.check(&TokenKind::Ne) {
                BinaryOp::Ne
            } else {
                break;
            };
            let span = self.advance_token().span;
            let rhs = self.parse_comparison()?;
            lhs = self.binary(op, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.check(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.check(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.check(&TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.check(&TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            let span = self.advance_token().span;
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.check(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.check(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let span = self.advance_token().span;
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.check(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.check(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.check(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let span = self.advance_token().span;
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.check_keyword("not") {
            let id = self.node_id();
            let span = self.advance_token().span;
            let operand = self.parse_unary()?;
            return Ok(Expr {
                id,
                span,
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            });
        }
        if self.check(&TokenKind::Minus) {
            let id = self.node_id();
            let span = self.advance_token().span;
            let operand = self.parse_unary()?;
            return Ok(Expr {
                id,
                span,
                kind: ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();

        if self.check(&TokenKind::LParen) {
            self.advance_token();
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::RParen, "')'")?;
            return Ok(expr);
        }

        let token = self.advance_token();
        match token.kind {
            TokenKind::Int(value) => Ok(self.literal(span, ExprKind::Int(value))),
            TokenKind::Float(value) => Ok(self.literal(span, ExprKind::Float(value))),
            TokenKind::Str(value) => Ok(self.literal(span, ExprKind::Str(value))),
            TokenKind::Ident => match token.lexeme.as_str() {
                "true" => Ok(self.literal(span, ExprKind::Bool(true))),
                "false" => Ok(self.literal(span, ExprKind::Bool(false))),
                "state" => Ok(self.literal(span, ExprKind::State)),
                _ => {
                    let name = token.lexeme;
                    if self.check(&TokenKind::LParen) {
                        return self.finish_call(name, span);
                    }
                    if self.eat(&TokenKind::LBracket) {
                        let index = self.parse_expr()?;
                        self.expect(&TokenKind::RBracket, "']'")?;
                        let id = self.node_id();
                        return Ok(Expr {
                            id,
                            span,
                            kind: ExprKind::Index {
                                name,
                                index: Box::new(index),
                            },
                        });
                    }
                    Ok(self.literal(span, ExprKind::Name(name)))
                }
            },
            _ => Err(self.error_at(
                token.span,
                &format!("unexpected token '{}' in expression", token.lexeme),
            )),
        }
    }

    fn finish_call(&mut self, callee: String, span: Span) -> ParseResult<Expr> {
        let id = self.node_id();
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Expr {
            id,
            span,
            kind: ExprKind::Call { callee, args },
        })
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr, span: Span) -> Expr {
        Expr {
            id: self.node_id(),
            span,
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    fn literal(&mut self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.node_id(),
            span,
            kind,
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn advance_token(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn check_ident(&self) -> bool {
        matches!(self.current().kind, TokenKind::Ident)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.check_ident() && self.current().lexeme == keyword
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance_token();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance_token();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<Span> {
        if self.check(kind) {
            Ok(self.advance_token().span)
        } else {
            Err(self.error(&format!(
                "expected {}, found '{}'",
                what,
                self.current().lexeme
            )))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<Span> {
        if self.check_keyword(keyword) {
            Ok(self.advance_token().span)
        } else {
            Err(self.error(&format!(
                "expected '{}', found '{}'",
                keyword,
                self.current().lexeme
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> ParseResult<(String, Span)> {
        if self.check_ident() {
            let token = self.advance_token();
            Ok((token.lexeme, token.span))
        } else {
            Err(self.error(&format!(
                "expected {}, found '{}'",
                what,
                self.current().lexeme
            )))
        }
    }

    fn expect_string(&mut self, what: &str) -> ParseResult<String> {
        let token = self.advance_token();
        match token.kind {
            TokenKind::Str(value) => Ok(value),
            _ => Err(self.error_at(
                token.span,
                &format!("expected {}, found '{}'", what, token.lexeme),
            )),
        }
    }

    fn error(&self, message: &str) -> ParseError {
        self.error_at(self.current_span(), message)
    }

    fn error_at(&self, span: Span, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let program = parse_program("behavior end").expect("parse");
        assert!(program.params.is_empty());
        assert!(program.body.statements.is_empty());
    }

    #[test]
    fn parses_declarations_and_statements() {
        let src = r#"behavior (threshold: float)
            import site.line1.press as press
            unit celsius
            attribute temperature: float in celsius trend
            timer cooldown 30 second -> press
            display panel on "hmi-01"
            var x: int = 3
            if temperature > threshold { state = "unsched_down" }
            else { state = "operative" }
            start cooldown
            show panel "ok"
        end"#;
        let program = parse_program(src).expect("parse");
        assert_eq!(program.params.len(), 1);
        assert_eq!(program.body.statements.len(), 9);
    }

    #[test]
    fn parses_functions_and_calls() {
        let src = r#"behavior
            function scale(a: float): float { return a * 2.0 }
            var y: float = scale(1.5)
        end"#;
        let program = parse_program(src).expect("parse");
        assert_eq!(program.body.statements.len(), 2);
    }

    #[test]
    fn tracks_positions() {
        let src = "behavior\n  var x: int = 1\nend";
        let program = parse_program(src).expect("parse");
        let stmt = &program.body.statements[0];
        assert_eq!(stmt.span.line, 2);
        assert_eq!(stmt.span.column, 3);
    }

    #[test]
    fn keeps_timer_amount_raw() {
        let src = "behavior\nimport a.b -> x\nend";
        assert!(parse_program(src).is_err());

        let src = "behavior\nimport a.b\ntimer t nonsense second -> b\nend";
        let program = parse_program(src).expect("parse");
        match &program.body.statements[1].kind {
            StmtKind::Timer { amount, .. } => assert_eq!(amount, "nonsense"),
            other => panic!("expected timer, found {:?}", other),
        }
    }

    #[test]
    fn rejects_unterminated_block() {
        let src = "behavior if true { end";
        assert!(parse_program(src).is_err());
    }

    #[test]
    fn respects_operator_precedence() {
        let src = "behavior\nvar x: int = 1 + 2 * 3\nend";
        let program = parse_program(src).expect("parse");
        let StmtKind::Var {
            init: Some(init), ..
        } = &program.body.statements[0].kind
        else {
            panic!("expected var with initializer");
        };
        let ExprKind::Binary { op, rhs, .. } = &init.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }
}
