//! Token kinds.

use crate::span::Span;

/// A token kind. Literal values are read back from the source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    // === Keywords ===
    /// `import`
    Import,
    /// `export`
    Export,
    /// `from`
    From,
    /// `as`
    As,
    /// `declare`
    Declare,
    /// `const`
    Const,
    /// `let`
    Let,
    /// `function`
    Function,
    /// `enum`
    Enum,
    /// `return`
    Return,
    /// `true`
    True,
    /// `false`
    False,

    // === Literals and names ===
    /// An identifier.
    Identifier,
    /// A numeric literal.
    Number,
    /// A single- or double-quoted string literal.
    String,
    /// `/// <reference path="..." />`; the path is the span's text.
    ReferencePath,

    // === Punctuation ===
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `=`
    Eq,
    /// `*`
    Star,

    // === Operators ===
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `/`
    Slash,
    /// `!`
    Bang,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,

    /// A character the lexer could not use.
    Error,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Returns how the token is written, for "expected" messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::From => "from",
            TokenKind::As => "as",
            TokenKind::Declare => "declare",
            TokenKind::Const => "const",
            TokenKind::Let => "let",
            TokenKind::Function => "function",
            TokenKind::Enum => "enum",
            TokenKind::Return => "return",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::ReferencePath => "reference",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Eq => "=",
            TokenKind::Star => "*",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Slash => "/",
            TokenKind::Bang => "!",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of file",
        }
    }
}

/// A token and where it was found.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    /// The kind.
    pub kind: TokenKind,
    /// The source range.
    pub span: Span,
}

/// Maps a word to its keyword, if it is one.
///
/// `from`, `as` and `declare` are contextual in real TypeScript; here they are
/// reserved, which the subset never needs as names.
pub fn lookup_keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "import" => TokenKind::Import,
        "export" => TokenKind::Export,
        "from" => TokenKind::From,
        "as" => TokenKind::As,
        "declare" => TokenKind::Declare,
        "const" => TokenKind::Const,
        "let" => TokenKind::Let,
        "function" => TokenKind::Function,
        "enum" => TokenKind::Enum,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    })
}
