use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

/// Byte-oriented pull scanner with one-character lookahead.
///
/// Line breaks are only surfaced as [`TokenKind::Newline`] tokens when the
/// previously emitted token could end a statement; otherwise the break is
/// swallowed, which is what makes manifestly incomplete statements continue
/// onto the next line.
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
    read_position: usize,
    ch: u8,
    line: usize,
    column: usize,
    prev_kind: TokenKind,
    mark_start: usize,
    mark_line: usize,
    mark_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            input: source.as_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
            line: 1,
            column: 0,
            // A kind that cannot end a statement, so leading newlines are
            // swallowed.
            prev_kind: TokenKind::Illegal,
            mark_start: 0,
            mark_line: 1,
            mark_column: 0,
        };
        lexer.read_char();
        lexer
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            if self.ch == b'/' && self.peek_char() == b'/' {
                self.skip_line_comment();
                continue;
            }
            if self.ch == b'\n' && !self.prev_kind.can_end_statement() {
                self.read_char();
                continue;
            }
            break;
        }

        self.mark_start = self.position;
        self.mark_line = self.line;
        self.mark_column = self.column;

        let tok = match self.ch {
            b'=' => {
                if self.peek_char() == b'=' {
                    self.two(TokenKind::Eq, "==")
                } else {
                    self.single(TokenKind::Assign)
                }
            }
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b'!' => {
                if self.peek_char() == b'=' {
                    self.two(TokenKind::NotEq, "!=")
                } else {
                    self.single(TokenKind::Bang)
                }
            }
            b'<' => {
                if self.peek_char() == b'=' {
                    self.two(TokenKind::LtEq, "<=")
                } else {
                    self.single(TokenKind::Lt)
                }
            }
            b'>' => {
                if self.peek_char() == b'=' {
                    self.two(TokenKind::GtEq, ">=")
                } else {
                    self.single(TokenKind::Gt)
                }
            }
            b'&' => {
                if self.peek_char() == b'&' {
                    self.two(TokenKind::And, "&&")
                } else {
                    self.single(TokenKind::Illegal)
                }
            }
            b'|' => {
                if self.peek_char() == b'|' {
                    self.two(TokenKind::Or, "||")
                } else {
                    self.single(TokenKind::Illegal)
                }
            }
            b'?' => {
                if self.peek_char() == b'.' {
                    self.two(TokenKind::SafeAccess, "?.")
                } else if self.peek_char() == b':' {
                    self.two(TokenKind::Elvis, "?:")
                } else {
                    self.single(TokenKind::Illegal)
                }
            }
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semi),
            b':' => self.single(TokenKind::Colon),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'.' => self.single(TokenKind::Dot),
            b'"' => self.read_string(),
            b'\n' => {
                let tok = self.finish(TokenKind::Newline, "\\n");
                self.read_char();
                tok
            }
            0 => self.finish(TokenKind::Eof, ""),
            ch if is_letter(ch) => self.read_identifier(),
            ch if is_digit(ch) => self.read_number(),
            _ => self.single(TokenKind::Illegal),
        };

        self.prev_kind = tok.kind;
        tok
    }

    fn read_char(&mut self) {
        if self.ch == b'\n' {
            self.line += 1;
            self.column = 0;
        }
        self.ch = if self.read_position >= self.input.len() {
            0
        } else {
            self.input[self.read_position]
        };
        self.position = self.read_position.min(self.input.len());
        self.read_position += 1;
        self.column += 1;
    }

    fn peek_char(&self) -> u8 {
        if self.read_position >= self.input.len() {
            0
        } else {
            self.input[self.read_position]
        }
    }

    fn finish(&self, kind: TokenKind, literal: impl Into<String>) -> Token {
        Token::new(
            kind,
            literal,
            Span::new(
                self.mark_start,
                self.position,
                self.mark_line,
                self.mark_column,
            ),
        )
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let literal = (self.ch as char).to_string();
        self.read_char();
        self.finish(kind, literal)
    }

    fn two(&mut self, kind: TokenKind, literal: &str) -> Token {
        self.read_char();
        self.read_char();
        self.finish(kind, literal)
    }

    fn skip_whitespace(&mut self) {
        while self.ch == b' ' || self.ch == b'\t' || self.ch == b'\r' {
            self.read_char();
        }
    }

    fn skip_line_comment(&mut self) {
        while self.ch != b'\n' && self.ch != 0 {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while is_letter(self.ch) || is_digit(self.ch) {
            self.read_char();
        }
        let literal = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        self.finish(TokenKind::lookup_ident(&literal), literal)
    }

    /// Reads a number literal, leaving the f64 conversion to the parser.
    fn read_number(&mut self) -> Token {
        let start = self.position;
        while is_digit(self.ch) {
            self.read_char();
        }
        if self.ch == b'.' && is_digit(self.peek_char()) {
            self.read_char();
            while is_digit(self.ch) {
                self.read_char();
            }
        }
        let literal = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        self.finish(TokenKind::Number, literal)
    }

    /// Reads a double-quoted string. The raw text between the quotes is
    /// scanned once; if it contains an unescaped `${` the token becomes a
    /// template carrying the raw text for [`split_template`], otherwise the
    /// escapes are processed here. An unterminated string consumes to
    /// end-of-input and yields whatever was gathered.
    fn read_string(&mut self) -> Token {
        self.read_char();
        let mut raw: Vec<u8> = Vec::new();
        let mut is_template = false;
        let mut expr_depth = 0usize;
        let mut in_expr_string = false;

        while self.ch != 0 {
            if self.ch == b'\\' {
                raw.push(self.ch);
                self.read_char();
                if self.ch != 0 {
                    raw.push(self.ch);
                    self.read_char();
                }
                continue;
            }
            if expr_depth == 0 {
                if self.ch == b'"' {
                    break;
                }
                if self.ch == b'$' && self.peek_char() == b'{' {
                    is_template = true;
                    expr_depth = 1;
                    raw.push(self.ch);
                    self.read_char();
                    raw.push(self.ch);
                    self.read_char();
                    continue;
                }
            } else if in_expr_string {
                if self.ch == b'"' {
                    in_expr_string = false;
                }
            } else {
                match self.ch {
                    b'"' => in_expr_string = true,
                    b'{' => expr_depth += 1,
                    b'}' => expr_depth = expr_depth.saturating_sub(1),
                    _ => {}
                }
            }
            raw.push(self.ch);
            self.read_char();
        }
        if self.ch == b'"' {
            self.read_char();
        }

        let raw = String::from_utf8_lossy(&raw).into_owned();
        if is_template {
            self.finish(TokenKind::TemplateStr, raw)
        } else {
            self.finish(TokenKind::Str, process_escapes(raw.as_bytes()))
        }
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

fn process_escapes(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            out.push(match raw[i + 1] {
                b'n' => b'\n',
                b't' => b'\t',
                b'"' => b'"',
                b'\\' => b'\\',
                other => other,
            });
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// One piece of a template literal: either processed literal text or the raw
/// source of an embedded expression, to be lexed as a nested token stream.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expr(String),
}

/// Splits the raw text of a template token into literal chunks and embedded
/// `${…}` expression sources. Brace depth and nested string literals are
/// tracked so a `}` inside an embedded string does not close the expression.
pub fn split_template(raw: &str) -> Vec<TemplatePart> {
    let bytes = raw.as_bytes();
    let mut parts = Vec::new();
    let mut lit: Vec<u8> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            lit.push(bytes[i]);
            lit.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if !lit.is_empty() {
                parts.push(TemplatePart::Literal(process_escapes(&lit)));
                lit.clear();
            }
            i += 2;
            let start = i;
            let mut depth = 1usize;
            let mut in_string = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' if in_string => {
                        i += 2;
                        continue;
                    }
                    b'"' => in_string = !in_string,
                    b'{' if !in_string => depth += 1,
                    b'}' if !in_string => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            let end = i.min(bytes.len());
            parts.push(TemplatePart::Expr(
                String::from_utf8_lossy(&bytes[start..end]).into_owned(),
            ));
            if i < bytes.len() {
                i += 1;
            }
            continue;
        }
        lit.push(bytes[i]);
        i += 1;
    }

    if !lit.is_empty() {
        parts.push(TemplatePart::Literal(process_escapes(&lit)));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_operators_and_delimiters() {
        let source = "= == != < > <= >= && || ! ?. ?: + - * / % . , ; : ( ) { } [ ]";
        let expected = vec![
            TokenKind::Assign,
            TokenKind::Eq,
            TokenKind::NotEq,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::LtEq,
            TokenKind::GtEq,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Bang,
            TokenKind::SafeAccess,
            TokenKind::Elvis,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Dot,
            TokenKind::Comma,
            TokenKind::Semi,
            TokenKind::Colon,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let mut lexer = Lexer::new("let foo = fn");
        assert_eq!(lexer.next_token().kind, TokenKind::Let);
        let ident = lexer.next_token();
        assert_eq!(ident.kind, TokenKind::Ident);
        assert_eq!(ident.literal, "foo");
        assert_eq!(lexer.next_token().kind, TokenKind::Assign);
        assert_eq!(lexer.next_token().kind, TokenKind::Fn);
    }

    #[test]
    fn number_literal_keeps_exact_text() {
        let mut lexer = Lexer::new("12.50");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.literal, "12.50");
    }

    #[test]
    fn dot_after_integer_is_property_access() {
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let mut lexer = Lexer::new(r#""a\nb\t\"c\\d\q""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, "a\nb\t\"c\\dq");
    }

    #[test]
    fn unterminated_string_consumes_rest() {
        let mut lexer = Lexer::new("\"abc");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, "abc");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn newline_after_value_terminates_statement() {
        assert_eq!(
            kinds("let x = 1\nx"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn newline_after_operator_is_swallowed() {
        assert_eq!(
            kinds("1 +\n2"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn leading_newlines_are_swallowed() {
        assert_eq!(kinds("\n\nx"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("1 // comment\n2"),
            vec![
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let mut lexer = Lexer::new("let x = 1\nlet y = 2");
        let tok = lexer.next_token();
        assert_eq!((tok.line(), tok.column()), (1, 1));
        for _ in 0..4 {
            lexer.next_token();
        }
        let second_let = lexer.next_token();
        assert_eq!(second_let.kind, TokenKind::Let);
        assert_eq!((second_let.line(), second_let.column()), (2, 1));
    }

    #[test]
    fn lone_ampersand_is_illegal() {
        assert_eq!(kinds("&"), vec![TokenKind::Illegal, TokenKind::Eof]);
    }

    #[test]
    fn template_token_and_split() {
        let mut lexer = Lexer::new(r#""Hello ${name}, you are ${age}!""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::TemplateStr);
        let parts = split_template(&tok.literal);
        assert_eq!(
            parts,
            vec![
                TemplatePart::Literal("Hello ".into()),
                TemplatePart::Expr("name".into()),
                TemplatePart::Literal(", you are ".into()),
                TemplatePart::Expr("age".into()),
                TemplatePart::Literal("!".into()),
            ]
        );
    }

    #[test]
    fn template_expr_may_contain_braces_and_strings() {
        let mut lexer = Lexer::new(r#""v=${join(xs, "}")}""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::TemplateStr);
        let parts = split_template(&tok.literal);
        assert_eq!(
            parts,
            vec![
                TemplatePart::Literal("v=".into()),
                TemplatePart::Expr(r#"join(xs, "}")"#.into()),
            ]
        );
    }

    #[test]
    fn escaped_dollar_is_not_a_template() {
        let mut lexer = Lexer::new(r#""\${x}""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, "${x}");
    }
}
