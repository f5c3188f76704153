//! Pratt expression parser and type annotations.
//!
//! | BP (L,R) | Operators |
//! |----------|-----------|
//! | (1,2)    | `==` `===` |
//! | (3,4)    | `<` `>` |
//! | (5,6)    | `+` `-` |
//! | (7,8)    | `*` `/` |
//! | prefix 9 | `-` `!` |
//!
//! Calls and member access bind tighter than any prefix operator.

use crate::ast::*;
use crate::parser::Parser;
use crate::token::TokenKind;

const PREFIX_BP: u8 = 9;

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::EqEqEq => BinaryOp::StrictEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        _ => return None,
    })
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Eq | BinaryOp::StrictEq => (1, 2),
        BinaryOp::Lt | BinaryOp::Gt => (3, 4),
        BinaryOp::Add | BinaryOp::Sub => (5, 6),
        BinaryOp::Mul | BinaryOp::Div => (7, 8),
    }
}

impl Parser<'_> {
    /// Parses an expression.
    pub fn parse_expr(&mut self) -> Expr {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_prefix_expr();
        while let Some(op) = binary_op(self.current()) {
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        lhs
    }

    fn parse_prefix_expr(&mut self) -> Expr {
        let start = self.current_span();
        let op = match self.current() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix_expr(),
        };
        self.advance();
        let operand = self.parse_expr_bp(PREFIX_BP);
        let span = start.to(operand.span());
        Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    fn parse_postfix_expr(&mut self) -> Expr {
        let mut expr = self.parse_primary_expr();
        loop {
            if self.eat(TokenKind::Dot) {
                let property = self.expect_name();
                let span = expr.span().to(property.span);
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    span,
                };
            } else if self.eat(TokenKind::LeftParen) {
                let mut args = Vec::new();
                while !self.at(TokenKind::RightParen) && !self.at_eof() {
                    let arg = self.parse_expr();
                    let failed = matches!(arg, Expr::Error(_));
                    args.push(arg);
                    if failed || !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RightParen);
                let span = self.span_from(expr.span());
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            } else {
                return expr;
            }
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let span = self.current_span();
        match self.current() {
            TokenKind::Number => {
                self.advance();
                Expr::Number(self.text(span).to_string(), span)
            }
            TokenKind::String => {
                self.advance();
                Expr::String(self.string_lit(span))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.at(TokenKind::True);
                self.advance();
                Expr::Bool(value, span)
            }
            TokenKind::Identifier => Expr::Ident(self.expect_name()),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RightParen);
                Expr::Paren(Box::new(inner), self.span_from(span))
            }
            _ => {
                self.expected("Expression");
                Expr::Error(span)
            }
        }
    }

    /// Parses a type annotation after `:`.
    pub fn parse_type(&mut self) -> TypeAnn {
        let span = self.current_span();
        match self.current() {
            TokenKind::Identifier => {
                let name = self.expect_name();
                match name.text.as_str() {
                    "number" => TypeAnn::Number(span),
                    "string" => TypeAnn::String(span),
                    "boolean" => TypeAnn::Boolean(span),
                    "void" => TypeAnn::Void(span),
                    "any" => TypeAnn::Any(span),
                    _ => TypeAnn::Named(name),
                }
            }
            TokenKind::Number => {
                self.advance();
                TypeAnn::NumberLit(self.text(span).to_string(), span)
            }
            TokenKind::Minus if self.peek_kind(1) == TokenKind::Number => {
                self.advance();
                let number = self.current_span();
                self.advance();
                TypeAnn::NumberLit(format!("-{}", self.text(number)), span.to(number))
            }
            TokenKind::String => {
                self.advance();
                TypeAnn::StringLit(self.string_lit(span))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.at(TokenKind::True);
                self.advance();
                TypeAnn::BoolLit(value, span)
            }
            _ => {
                self.expected("Type");
                TypeAnn::Error(span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse;

    fn expr(source: &str) -> Expr {
        let (unit, problems) = parse(source);
        assert!(problems.is_empty(), "{problems:?}");
        match unit.items.into_iter().next() {
            Some(Item::Expr(expr, _)) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn left_associative_subtraction() {
        let Expr::Binary { op, lhs, .. } = expr("a - b - c;") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let Expr::Binary { lhs, .. } = expr("-a * b;") else {
            panic!("expected binary");
        };
        assert!(matches!(*lhs, Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn member_call_chain() {
        let Expr::Call { callee, args, .. } = expr("console.log(1, 'x');") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(*callee, Expr::Member { ref property, .. } if property.text == "log"));
    }

    #[test]
    fn literal_types() {
        let (unit, problems) = parse("let a: -1; let b: 'x'; let c: E;");
        assert!(problems.is_empty());
        let types: Vec<_> = unit
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Var(v) => v.ty.clone(),
                _ => None,
            })
            .collect();
        assert!(matches!(&types[0], TypeAnn::NumberLit(n, _) if n == "-1"));
        assert!(matches!(&types[1], TypeAnn::StringLit(s) if s.value == "x"));
        assert!(matches!(&types[2], TypeAnn::Named(n) if n.text == "E"));
    }

    #[test]
    fn missing_operand_reports_expression_expected() {
        let (_, problems) = parse("const a = ;");
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Expression expected.");
    }
}
