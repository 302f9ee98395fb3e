// lexer for the normalized while-language syntax.

use std::ops::Range;

use derive_more::Display;
use logos::Logos;

// tokenizes the given string.  on an unrecognized lexeme, returns its span.
pub fn lex(code: &str) -> Result<Vec<Token>, Range<usize>> {
    TokenKind::lexer(code)
        .spanned()
        .map(|(kind, span)| match kind {
            Ok(kind) => Ok(Token { kind, span }),
            Err(()) => Err(span),
        })
        .collect()
}

// SECTION: Tokens

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

#[derive(Clone, Copy, Debug, Display, Eq, Logos, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
pub enum TokenKind {
    #[display(fmt = "num")]
    #[regex("[0-9]+")]
    Num,

    #[display(fmt = "id")]
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Id,

    #[display(fmt = "fun")]
    #[token("fun")]
    Fun,

    #[display(fmt = "skip")]
    #[token("skip")]
    Skip,

    #[display(fmt = "output")]
    #[token("output")]
    Output,

    #[display(fmt = "return")]
    #[token("return")]
    Return,

    #[display(fmt = "if")]
    #[token("if")]
    If,

    #[display(fmt = "then")]
    #[token("then")]
    Then,

    #[display(fmt = "else")]
    #[token("else")]
    Else,

    #[display(fmt = "while")]
    #[token("while")]
    While,

    #[display(fmt = "do")]
    #[token("do")]
    Do,

    #[display(fmt = "true")]
    #[token("true")]
    True,

    #[display(fmt = "false")]
    #[token("false")]
    False,

    #[display(fmt = "not")]
    #[token("not")]
    Not,

    #[display(fmt = "and")]
    #[token("and")]
    And,

    #[display(fmt = "or")]
    #[token("or")]
    Or,

    #[display(fmt = ":=")]
    #[token(":=")]
    Gets,

    #[display(fmt = ";")]
    #[token(";")]
    Semicolon,

    #[display(fmt = ",")]
    #[token(",")]
    Comma,

    #[display(fmt = "+")]
    #[token("+")]
    Plus,

    #[display(fmt = "-")]
    #[token("-")]
    Dash,

    #[display(fmt = "*")]
    #[token("*")]
    Star,

    #[display(fmt = "<")]
    #[token("<")]
    Lt,

    #[display(fmt = "=")]
    #[token("=")]
    Equal,

    #[display(fmt = "(")]
    #[token("(")]
    OpenParen,

    #[display(fmt = ")")]
    #[token(")")]
    CloseParen,

    #[display(fmt = "{{")]
    #[token("{")]
    OpenBrace,

    #[display(fmt = "}}")]
    #[token("}")]
    CloseBrace,
}
