//! Core parser infrastructure and item-level parsing rules.
//!
//! [`Parser`] provides the primitive operations (advance, eat, expect) and
//! error recovery; this module parses top-level items and function bodies.
//! Expressions and types live in [`crate::expr`].

use crate::ast::*;
use crate::codes::{Problem, DECLARATION_EXPECTED, TOKEN_EXPECTED};
use crate::lexer::lex;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parses `source` into a tree and the problems found on the way.
pub fn parse(source: &str) -> (SourceUnit, Vec<Problem>) {
    let mut problems = Vec::new();
    let tokens = lex(source, &mut problems);
    let mut parser = Parser::new(tokens, source, problems);
    let unit = parser.parse_source_unit();
    (unit, parser.problems)
}

/// A recursive descent parser over a lexed token stream.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'src str,
    problems: Vec<Problem>,
}

impl<'src> Parser<'src> {
    /// Creates a parser. `tokens` must end in [`TokenKind::Eof`].
    pub fn new(tokens: Vec<Token>, source: &'src str, problems: Vec<Problem>) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            problems,
        }
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    pub(crate) fn current(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    pub(crate) fn text(&self, span: Span) -> &'src str {
        &self.source[span.start as usize..span.end as usize]
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    /// Returns the span from `start` to the end of the previous token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.to(self.prev_span())
    }

    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) {
        if !self.eat(kind) {
            self.expected(&format!("'{}'", kind.describe()));
        }
    }

    pub(crate) fn expect_name(&mut self) -> Name {
        let span = self.current_span();
        if self.eat(TokenKind::Identifier) {
            Name {
                text: self.text(span).to_string(),
                span,
            }
        } else {
            self.expected("Identifier");
            Name {
                text: String::new(),
                span: Span::new(span.start, span.start),
            }
        }
    }

    pub(crate) fn expect_string(&mut self) -> StringLit {
        let span = self.current_span();
        if self.eat(TokenKind::String) {
            self.string_lit(span)
        } else {
            self.expected("String literal");
            StringLit {
                value: String::new(),
                raw: "\"\"".to_string(),
                span: Span::new(span.start, span.start),
            }
        }
    }

    pub(crate) fn string_lit(&self, span: Span) -> StringLit {
        let raw = self.text(span);
        let quote = &raw[..1];
        let inner = &raw[1..];
        let value = if !inner.is_empty() && inner.ends_with(quote) {
            &inner[..inner.len() - 1]
        } else {
            inner
        };
        StringLit {
            value: value.to_string(),
            raw: raw.to_string(),
            span,
        }
    }

    /// Accepts an explicit `;`, or an inserted one before `}`, end of file or
    /// a line break.
    fn expect_semicolon(&mut self) {
        if self.eat(TokenKind::Semicolon) || self.at(TokenKind::RightBrace) || self.at_eof() {
            return;
        }
        let gap = Span::new(self.prev_span().end, self.current_span().start);
        if self.text(gap).contains('\n') {
            return;
        }
        self.expected("';'");
    }

    // ========================================================================
    // Error handling and recovery
    // ========================================================================

    /// Records a problem at the current token. A second problem at the same
    /// position is dropped, so one bad token yields one message.
    pub(crate) fn report(&mut self, problem: Problem) {
        if self
            .problems
            .last()
            .is_some_and(|last| last.span.start == problem.span.start)
        {
            return;
        }
        self.problems.push(problem);
    }

    pub(crate) fn expected(&mut self, what: &str) {
        let span = self.current_span();
        self.report(Problem::new(TOKEN_EXPECTED, format!("{what} expected."), span));
    }

    fn declaration_expected(&mut self) -> Span {
        let span = self.current_span();
        self.report(Problem::new(
            DECLARATION_EXPECTED,
            "Declaration or statement expected.",
            span,
        ));
        self.advance();
        span
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Parses the whole file.
    pub fn parse_source_unit(&mut self) -> SourceUnit {
        let mut unit = SourceUnit::default();
        while !self.at_eof() {
            match self.current() {
                TokenKind::ReferencePath => {
                    let span = self.current_span();
                    unit.references.push(Name {
                        text: self.text(span).to_string(),
                        span,
                    });
                    self.advance();
                }
                TokenKind::Semicolon => self.advance(),
                TokenKind::Import => unit.items.push(self.parse_import()),
                TokenKind::Export => unit.items.push(self.parse_export()),
                TokenKind::Declare
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Function
                | TokenKind::Enum => {
                    let start = self.current_span();
                    unit.items.push(self.parse_declaration(false, start));
                }
                kind if starts_expr(kind) => {
                    let expr = self.parse_expr();
                    self.expect_semicolon();
                    let span = self.span_from(expr.span());
                    unit.items.push(Item::Expr(expr, span));
                }
                _ => {
                    let span = self.declaration_expected();
                    unit.items.push(Item::Error(span));
                }
            }
        }
        unit
    }

    fn parse_import(&mut self) -> Item {
        let start = self.current_span();
        self.advance();
        let mut names = Vec::new();
        if self.at(TokenKind::LeftBrace) {
            for (imported, local) in self.parse_name_list() {
                names.push(ImportName { imported, local });
            }
            self.expect(TokenKind::From);
        }
        let specifier = self.expect_string();
        self.expect_semicolon();
        Item::Import(ImportDecl {
            names,
            specifier,
            span: self.span_from(start),
        })
    }

    fn parse_export(&mut self) -> Item {
        let start = self.current_span();
        self.advance();
        if self.eat(TokenKind::Star) {
            self.expect(TokenKind::From);
            let specifier = self.expect_string();
            self.expect_semicolon();
            return Item::ExportFrom(ExportFromDecl {
                names: None,
                specifier,
                span: self.span_from(start),
            });
        }
        if self.at(TokenKind::LeftBrace) {
            let names: Vec<ExportName> = self
                .parse_name_list()
                .into_iter()
                .map(|(local, exported)| ExportName { local, exported })
                .collect();
            if self.eat(TokenKind::From) {
                let specifier = self.expect_string();
                self.expect_semicolon();
                return Item::ExportFrom(ExportFromDecl {
                    names: Some(names),
                    specifier,
                    span: self.span_from(start),
                });
            }
            self.expect_semicolon();
            return Item::ExportList(ExportListDecl {
                names,
                span: self.span_from(start),
            });
        }
        self.parse_declaration(true, start)
    }

    /// Parses `{ a, b as c }` into `(a, a)` and `(b, c)` pairs.
    fn parse_name_list(&mut self) -> Vec<(Name, Name)> {
        self.expect(TokenKind::LeftBrace);
        let mut names = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at_eof() {
            let first = self.expect_name();
            let second = if self.eat(TokenKind::As) {
                self.expect_name()
            } else {
                first.clone()
            };
            let progressed = !first.text.is_empty();
            names.push((first, second));
            if !progressed || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace);
        names
    }

    fn parse_declaration(&mut self, exported: bool, start: Span) -> Item {
        let declare = self.eat(TokenKind::Declare);
        match self.current() {
            TokenKind::Const if self.peek_kind(1) == TokenKind::Enum => {
                self.advance();
                Item::Enum(self.parse_enum(exported, declare, true, start))
            }
            TokenKind::Const | TokenKind::Let => {
                Item::Var(self.parse_var(exported, declare, start))
            }
            TokenKind::Function => Item::Function(self.parse_function(exported, declare, start)),
            TokenKind::Enum => Item::Enum(self.parse_enum(exported, declare, false, start)),
            _ => Item::Error(self.declaration_expected()),
        }
    }

    fn parse_var(&mut self, exported: bool, declare: bool, start: Span) -> VarDecl {
        let kind = if self.eat(TokenKind::Let) {
            VarKind::Let
        } else {
            self.expect(TokenKind::Const);
            VarKind::Const
        };
        let name = self.expect_name();
        let ty = self.eat(TokenKind::Colon).then(|| self.parse_type());
        let init = self.eat(TokenKind::Eq).then(|| self.parse_expr());
        self.expect_semicolon();
        VarDecl {
            exported,
            declare,
            kind,
            name,
            ty,
            init,
            span: self.span_from(start),
        }
    }

    fn parse_function(&mut self, exported: bool, declare: bool, start: Span) -> FunctionDecl {
        self.expect(TokenKind::Function);
        let name = self.expect_name();
        self.expect(TokenKind::LeftParen);
        let mut params = Vec::new();
        while !self.at(TokenKind::RightParen) && !self.at_eof() {
            let name = self.expect_name();
            let ty = self.eat(TokenKind::Colon).then(|| self.parse_type());
            let progressed = !name.text.is_empty();
            params.push(Param { name, ty });
            if !progressed || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen);
        let ret = self.eat(TokenKind::Colon).then(|| self.parse_type());
        let body = if self.at(TokenKind::LeftBrace) {
            Some(self.parse_block())
        } else {
            self.expect_semicolon();
            None
        };
        FunctionDecl {
            exported,
            declare,
            name,
            params,
            ret,
            body,
            span: self.span_from(start),
        }
    }

    fn parse_enum(&mut self, exported: bool, declare: bool, is_const: bool, start: Span) -> EnumDecl {
        self.expect(TokenKind::Enum);
        let name = self.expect_name();
        self.expect(TokenKind::LeftBrace);
        let mut members = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at_eof() {
            let name = self.expect_name();
            let init = self.eat(TokenKind::Eq).then(|| self.parse_expr());
            let progressed = !name.text.is_empty();
            members.push(EnumMember { name, init });
            if !progressed || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace);
        EnumDecl {
            exported,
            declare,
            is_const,
            name,
            members,
            span: self.span_from(start),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self) -> Vec<Stmt> {
        self.expect(TokenKind::LeftBrace);
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at_eof() {
            let start = self.current_span();
            match self.current() {
                TokenKind::Semicolon => self.advance(),
                TokenKind::Const | TokenKind::Let => {
                    stmts.push(Stmt::Var(self.parse_var(false, false, start)));
                }
                TokenKind::Return => {
                    self.advance();
                    let value = (!self.at(TokenKind::Semicolon)
                        && !self.at(TokenKind::RightBrace)
                        && !self.at_eof())
                    .then(|| self.parse_expr());
                    self.expect_semicolon();
                    stmts.push(Stmt::Return(value, self.span_from(start)));
                }
                kind if starts_expr(kind) => {
                    let expr = self.parse_expr();
                    self.expect_semicolon();
                    stmts.push(Stmt::Expr(expr, self.span_from(start)));
                }
                _ => stmts.push(Stmt::Error(self.declaration_expected())),
            }
        }
        self.expect(TokenKind::RightBrace);
        stmts
    }
}

/// Returns `true` if `kind` can begin an expression.
pub(crate) fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::LeftParen
            | TokenKind::Minus
            | TokenKind::Bang
    )
}
