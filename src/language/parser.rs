use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::{split_template, Lexer, TemplatePart},
    token::{Token, TokenKind},
};
use std::sync::Arc;

/// Parses a source string into a program, collecting every syntax error
/// instead of stopping at the first one. Callers skip evaluation when any
/// error was recorded.
pub fn parse_program(source: &str) -> Result<Program, SyntaxErrors> {
    Parser::new(Lexer::new(source)).parse()
}

/// Binding powers, weakest first. `[`, `.` and `?.` bind tighter than a
/// call so `a.b(c)` resolves the property before applying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Elvis,
    Or,
    And,
    Equals,
    Compare,
    Sum,
    Product,
    Prefix,
    Call,
    Access,
}

fn token_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Elvis => Precedence::Elvis,
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => Precedence::Compare,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        TokenKind::Dot | TokenKind::SafeAccess | TokenKind::LBracket => Precedence::Access,
        _ => Precedence::Lowest,
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(mut lexer: Lexer<'a>) -> Self {
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            cur,
            peek,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.cur_is(TokenKind::Eof) {
            self.consume_terminators();
            if self.cur_is(TokenKind::Eof) {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    self.step_past_statement();
                }
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    // A stray closing brace at top level is just skipped.
                    if self.cur_is(TokenKind::RBrace) {
                        self.advance();
                    }
                }
            }
            self.consume_terminators();
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    /// After a statement parses, `cur` sits on its last token (which may be
    /// the statement's own closing brace); step onto the next one unless the
    /// loop needs to see a terminator.
    fn step_past_statement(&mut self) {
        if !self.cur_is(TokenKind::Eof)
            && !self.cur_is(TokenKind::Semi)
            && !self.cur_is(TokenKind::Newline)
        {
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur.kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    fn expect_peek(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.peek_is(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_at_cur(format!("expected {}, got {}", kind, self.peek.kind)))
        }
    }

    fn error_at_cur(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.cur.span)
    }

    fn peek_precedence(&self) -> Precedence {
        token_precedence(self.peek.kind)
    }

    fn cur_precedence(&self) -> Precedence {
        token_precedence(self.cur.kind)
    }

    fn consume_terminators(&mut self) {
        while self.cur_is(TokenKind::Semi) || self.cur_is(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Newlines the scanner emitted inside a bracketed list are harmless;
    /// skip them where a `,` or closing delimiter is expected.
    fn skip_peek_newlines(&mut self) {
        while self.peek_is(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Drops tokens until a plausible statement boundary after an error.
    fn synchronize(&mut self) {
        while !self.cur_is(TokenKind::Semi)
            && !self.cur_is(TokenKind::Newline)
            && !self.cur_is(TokenKind::RBrace)
            && !self.cur_is(TokenKind::Eof)
        {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.cur.kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if().map(Statement::If),
            TokenKind::Return => self.parse_return(),
            TokenKind::For => self.parse_for(),
            TokenKind::Ident if self.peek_is(TokenKind::Assign) => self.parse_assignment(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.cur.clone();
        self.expect_peek(TokenKind::Ident)?;
        let name = self.cur.literal.clone();
        self.expect_peek(TokenKind::Assign)?;
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Let(LetStmt { token, name, value }))
    }

    fn parse_assignment(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.cur.clone();
        let name = self.cur.literal.clone();
        self.advance();
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Assign(AssignStmt { token, name, value }))
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.cur.clone();
        // A terminator right after `return` means no value.
        if self.peek_is(TokenKind::Semi)
            || self.peek_is(TokenKind::Newline)
            || self.peek_is(TokenKind::Eof)
            || self.peek_is(TokenKind::RBrace)
        {
            return Ok(Statement::Return(ReturnStmt { token, value: None }));
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Return(ReturnStmt {
            token,
            value: Some(value),
        }))
    }

    fn parse_if(&mut self) -> Result<IfStmt, SyntaxError> {
        let token = self.cur.clone();
        self.expect_peek(TokenKind::LParen)?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::LBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(TokenKind::Else) {
            self.advance();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(IfStmt {
            token,
            condition,
            consequence,
            alternative,
        })
    }

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.cur.clone();
        self.expect_peek(TokenKind::LParen)?;
        self.expect_peek(TokenKind::Ident)?;
        let variable = self.cur.literal.clone();
        self.expect_peek(TokenKind::In)?;
        self.advance();
        let iterable = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;
        Ok(Statement::ForIn(ForInStmt {
            token,
            variable,
            iterable,
            body,
        }))
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let token = self.cur.clone();
        let mut statements = Vec::new();
        self.advance();

        loop {
            self.consume_terminators();
            if self.cur_is(TokenKind::RBrace) {
                break;
            }
            if self.cur_is(TokenKind::Eof) {
                return Err(self.error_at_cur("expected }, got EOF"));
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    self.step_past_statement();
                }
                Err(err) => {
                    self.errors.push(err);
                    // synchronize stops at }, which the loop check picks up.
                    self.synchronize();
                }
            }
        }

        Ok(Block { token, statements })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.cur.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Expr(ExprStmt { token, expr }))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenKind::Semi)
            && !self.peek_is(TokenKind::Newline)
            && !self.peek_is(TokenKind::Eof)
            && precedence < self.peek_precedence()
        {
            left = match self.peek.kind {
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::And
                | TokenKind::Or => {
                    self.advance();
                    self.parse_infix(left)?
                }
                TokenKind::Elvis => {
                    self.advance();
                    self.parse_elvis(left)?
                }
                TokenKind::Dot => {
                    self.advance();
                    self.parse_property(left, false)?
                }
                TokenKind::SafeAccess => {
                    self.advance();
                    self.parse_property(left, true)?
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.parse_index(left)?
                }
                TokenKind::LParen => {
                    self.advance();
                    self.parse_call(left)?
                }
                _ => break,
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, SyntaxError> {
        match self.cur.kind {
            TokenKind::Ident => Ok(Expr::Ident(Ident {
                token: self.cur.clone(),
                name: self.cur.literal.clone(),
            })),
            TokenKind::Number => self.parse_number(),
            TokenKind::Str => Ok(Expr::Str(StrLit {
                token: self.cur.clone(),
                value: self.cur.literal.clone(),
            })),
            TokenKind::TemplateStr => self.parse_template(),
            TokenKind::True | TokenKind::False => Ok(Expr::Bool(BoolLit {
                token: self.cur.clone(),
                value: self.cur_is(TokenKind::True),
            })),
            TokenKind::Null => Ok(Expr::Null(NullLit {
                token: self.cur.clone(),
            })),
            TokenKind::Minus | TokenKind::Bang => self.parse_unary(),
            TokenKind::LParen => self.parse_grouped(),
            TokenKind::Fn => self.parse_function(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Illegal => {
                Err(self.error_at_cur(format!("unexpected character '{}'", self.cur.literal)))
            }
            _ => Err(self.error_at_cur(format!("no prefix parse function for {}", self.cur.kind))),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let value = token.literal.parse::<f64>().map_err(|_| {
            self.error_at_cur(format!("could not parse \"{}\" as number", token.literal))
        })?;
        Ok(Expr::Number(NumberLit { token, value }))
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let op = if self.cur_is(TokenKind::Minus) {
            UnaryOp::Neg
        } else {
            UnaryOp::Not
        };
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expr::Unary(Box::new(UnaryExpr { token, op, right })))
    }

    fn parse_grouped(&mut self) -> Result<Expr, SyntaxError> {
        self.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_infix(&mut self, left: Expr) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            other => {
                return Err(self.error_at_cur(format!("no infix parse function for {other}")));
            }
        };
        let precedence = self.cur_precedence();
        self.advance();
        let right = self.parse_expression(precedence)?;
        Ok(Expr::Binary(Box::new(BinaryExpr {
            token,
            op,
            left,
            right,
        })))
    }

    fn parse_elvis(&mut self, left: Expr) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        self.advance();
        let default = self.parse_expression(Precedence::Elvis)?;
        Ok(Expr::Elvis(Box::new(ElvisExpr {
            token,
            left,
            default,
        })))
    }

    fn parse_property(&mut self, object: Expr, safe: bool) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        self.expect_peek(TokenKind::Ident)?;
        let property = self.cur.literal.clone();
        let expr = PropertyExpr {
            token,
            object,
            property,
        };
        Ok(if safe {
            Expr::SafeProperty(Box::new(expr))
        } else {
            Expr::Property(Box::new(expr))
        })
    }

    fn parse_index(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.skip_peek_newlines();
        self.expect_peek(TokenKind::RBracket)?;
        Ok(Expr::Index(Box::new(IndexExpr {
            token,
            object,
            index,
        })))
    }

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let args = self.parse_expression_list(TokenKind::RParen)?;
        Ok(Expr::Call(Box::new(CallExpr {
            token,
            callee,
            args,
        })))
    }

    fn parse_array(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Ok(Expr::Array(ArrayLit { token, elements }))
    }

    /// Comma-separated expressions up to `end`; `cur` sits on the opening
    /// delimiter on entry and on `end` on exit.
    fn parse_expression_list(&mut self, end: TokenKind) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();

        if self.peek_is(end) {
            self.advance();
            return Ok(items);
        }

        self.advance();
        items.push(self.parse_expression(Precedence::Lowest)?);
        self.skip_peek_newlines();

        while self.peek_is(TokenKind::Comma) {
            self.advance();
            self.advance();
            items.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_peek_newlines();
        }

        self.expect_peek(end)?;
        Ok(items)
    }

    fn parse_object(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let mut pairs = Vec::new();

        self.skip_peek_newlines();
        if self.peek_is(TokenKind::RBrace) {
            self.advance();
            return Ok(Expr::Object(ObjectLit { token, pairs }));
        }

        loop {
            self.advance();
            let key = match self.cur.kind {
                TokenKind::Ident | TokenKind::Str => self.cur.literal.clone(),
                other => {
                    return Err(self.error_at_cur(format!("expected object key, got {other}")));
                }
            };
            self.expect_peek(TokenKind::Colon)?;
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            self.skip_peek_newlines();

            if self.peek_is(TokenKind::Comma) {
                self.advance();
                self.skip_peek_newlines();
                continue;
            }
            break;
        }

        self.expect_peek(TokenKind::RBrace)?;
        Ok(Expr::Object(ObjectLit { token, pairs }))
    }

    fn parse_function(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        self.expect_peek(TokenKind::LParen)?;

        let mut params = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.advance();
        } else {
            self.expect_peek(TokenKind::Ident)?;
            params.push(self.cur.literal.clone());
            while self.peek_is(TokenKind::Comma) {
                self.advance();
                self.expect_peek(TokenKind::Ident)?;
                params.push(self.cur.literal.clone());
            }
            self.expect_peek(TokenKind::RParen)?;
        }

        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;
        Ok(Expr::Function(FunctionLit {
            token,
            params,
            body: Arc::new(body),
        }))
    }

    fn parse_template(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.cur.clone();
        let mut parts = Vec::new();
        for part in split_template(&token.literal) {
            match part {
                TemplatePart::Literal(text) => parts.push(Expr::Str(StrLit {
                    token: Token::new(TokenKind::Str, text.clone(), token.span),
                    value: text,
                })),
                TemplatePart::Expr(source) => parts.push(parse_embedded(&source, &token)?),
            }
        }
        Ok(Expr::Template(TemplateLit { token, parts }))
    }
}

/// Parses one embedded template expression by running a nested lexer and
/// parser over its raw source. Errors are re-anchored to the template token.
fn parse_embedded(source: &str, outer: &Token) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(Lexer::new(source));
    let expr = parser.parse_expression(Precedence::Lowest).map_err(|err| {
        SyntaxError::new(
            format!("in template expression: {}", err.message),
            outer.span,
        )
    })?;
    if !parser.peek_is(TokenKind::Eof) {
        return Err(SyntaxError::new(
            "unexpected token after template expression",
            outer.span,
        ));
    }
    Ok(expr)
}
