//! Syntax tree for one source file.
//!
//! Parse errors are represented by `Error` variants so a file with syntax
//! problems still yields a tree the checker and emitters can walk.

use crate::span::Span;

/// A parsed source file.
#[derive(Clone, Debug, Default)]
pub struct SourceUnit {
    /// Top-level items in source order.
    pub items: Vec<Item>,
    /// `/// <reference path>` targets in source order.
    pub references: Vec<Name>,
}

impl SourceUnit {
    /// Returns `true` if the file has any import or export, making it a
    /// module rather than a global script.
    pub fn is_module(&self) -> bool {
        self.items.iter().any(|item| match item {
            Item::Import(_) | Item::ExportFrom(_) | Item::ExportList(_) => true,
            Item::Var(decl) => decl.exported,
            Item::Function(decl) => decl.exported,
            Item::Enum(decl) => decl.exported,
            Item::Expr(..) | Item::Error(_) => false,
        })
    }

    /// Returns the module specifiers this file depends on, in source order.
    pub fn module_specifiers(&self) -> impl Iterator<Item = &StringLit> {
        self.items.iter().filter_map(|item| match item {
            Item::Import(import) => Some(&import.specifier),
            Item::ExportFrom(export) => Some(&export.specifier),
            _ => None,
        })
    }
}

/// A name and where it was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name {
    /// The text.
    pub text: String,
    /// Where it was written.
    pub span: Span,
}

/// A string literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringLit {
    /// The contents between the quotes, escapes preserved.
    pub value: String,
    /// The literal as written, quotes included.
    pub raw: String,
    /// Where it was written.
    pub span: Span,
}

/// A top-level item.
#[derive(Clone, Debug)]
pub enum Item {
    /// `import { a } from "x";` or `import "x";`
    Import(ImportDecl),
    /// `export { a } from "x";` or `export * from "x";`
    ExportFrom(ExportFromDecl),
    /// `export { a, b as c };`
    ExportList(ExportListDecl),
    /// `const` or `let`.
    Var(VarDecl),
    /// A function.
    Function(FunctionDecl),
    /// An enum.
    Enum(EnumDecl),
    /// An expression statement.
    Expr(Expr, Span),
    /// Input that could not be parsed.
    Error(Span),
}

/// An import declaration. `names` is empty for side-effect imports.
#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub names: Vec<ImportName>,
    pub specifier: StringLit,
    pub span: Span,
}

/// `imported as local`; both are the same name without `as`.
#[derive(Clone, Debug)]
pub struct ImportName {
    pub imported: Name,
    pub local: Name,
}

/// A re-export. `names` is `None` for `export *`.
#[derive(Clone, Debug)]
pub struct ExportFromDecl {
    pub names: Option<Vec<ExportName>>,
    pub specifier: StringLit,
    pub span: Span,
}

/// An export list of local bindings.
#[derive(Clone, Debug)]
pub struct ExportListDecl {
    pub names: Vec<ExportName>,
    pub span: Span,
}

/// `local as exported`.
#[derive(Clone, Debug)]
pub struct ExportName {
    pub local: Name,
    pub exported: Name,
}

/// `const` or `let`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
}

impl VarKind {
    /// The keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
        }
    }
}

/// A variable declaration.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub exported: bool,
    pub declare: bool,
    pub kind: VarKind,
    pub name: Name,
    pub ty: Option<TypeAnn>,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A function declaration. `body` is `None` for signatures.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub exported: bool,
    pub declare: bool,
    pub name: Name,
    pub params: Vec<Param>,
    pub ret: Option<TypeAnn>,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

/// A function parameter.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub ty: Option<TypeAnn>,
}

/// An enum declaration.
#[derive(Clone, Debug)]
pub struct EnumDecl {
    pub exported: bool,
    pub declare: bool,
    pub is_const: bool,
    pub name: Name,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

/// An enum member.
#[derive(Clone, Debug)]
pub struct EnumMember {
    pub name: Name,
    pub init: Option<Expr>,
}

/// A statement inside a function body.
#[derive(Clone, Debug)]
pub enum Stmt {
    Var(VarDecl),
    Return(Option<Expr>, Span),
    Expr(Expr, Span),
    Error(Span),
}

impl Stmt {
    /// Returns the statement's span.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(decl) => decl.span,
            Stmt::Return(_, span) | Stmt::Expr(_, span) | Stmt::Error(span) => *span,
        }
    }
}

/// A type annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAnn {
    Number(Span),
    String(Span),
    Boolean(Span),
    Void(Span),
    Any(Span),
    /// A numeric literal type, as written (a leading `-` included).
    NumberLit(String, Span),
    StringLit(StringLit),
    BoolLit(bool, Span),
    /// A named type, such as an enum.
    Named(Name),
    Error(Span),
}

impl TypeAnn {
    /// Returns the annotation's span.
    pub fn span(&self) -> Span {
        match self {
            TypeAnn::Number(span)
            | TypeAnn::String(span)
            | TypeAnn::Boolean(span)
            | TypeAnn::Void(span)
            | TypeAnn::Any(span)
            | TypeAnn::NumberLit(_, span)
            | TypeAnn::BoolLit(_, span)
            | TypeAnn::Error(span) => *span,
            TypeAnn::StringLit(lit) => lit.span,
            TypeAnn::Named(name) => name.span,
        }
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    StrictEq,
}

impl BinaryOp {
    /// The operator as written.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::StrictEq => "===",
        }
    }
}

/// An expression.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Numeric literal, as written.
    Number(String, Span),
    String(StringLit),
    Bool(bool, Span),
    Ident(Name),
    Member {
        object: Box<Expr>,
        property: Name,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Paren(Box<Expr>, Span),
    Error(Span),
}

impl Expr {
    /// Returns the expression's span.
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span)
            | Expr::Bool(_, span)
            | Expr::Paren(_, span)
            | Expr::Error(span) => *span,
            Expr::String(lit) => lit.span,
            Expr::Ident(name) => name.span,
            Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        Name {
            text: text.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn script_without_exports_is_not_module() {
        let unit = SourceUnit {
            items: vec![Item::Var(VarDecl {
                exported: false,
                declare: false,
                kind: VarKind::Const,
                name: name("x"),
                ty: None,
                init: None,
                span: Span::default(),
            })],
            references: Vec::new(),
        };
        assert!(!unit.is_module());
    }

    #[test]
    fn export_list_makes_module() {
        let unit = SourceUnit {
            items: vec![Item::ExportList(ExportListDecl {
                names: Vec::new(),
                span: Span::default(),
            })],
            references: Vec::new(),
        };
        assert!(unit.is_module());
    }
}
