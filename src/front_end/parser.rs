// ll(1) parser for the normalized while language.

use derive_more::Display;

use super::*;
use TokenKind::*;

// SECTION: interface

pub fn parse(code: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(code)?;
    program_r(&mut parser)
}

// A parse error with explanatory message.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct ParseError(pub String);
impl std::error::Error for ParseError {}

impl std::str::FromStr for Program {
    type Err = ParseError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        parse(code)
    }
}

// SECTION: parser functionality

#[derive(Clone, Debug)]
struct Parser<'a> {
    code: &'a str,      // the source code being parsed
    tokens: Vec<Token>, // the token stream
    pos: usize,         // the position in the token stream
}

// utility functions for traversing the token stream and creating error
// messages.
impl<'a> Parser<'a> {
    fn new(code: &'a str) -> Result<Self, ParseError> {
        match lex(code) {
            Ok(tokens) => Ok(Parser {
                code,
                tokens,
                pos: 0,
            }),
            Err(span) => Err(error_at(code, span.start, "unrecognized lexeme")),
        }
    }

    // if the next token has the given kind advances the iterator and returns true,
    // otherwise returns false.
    fn eat(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(k) if k == kind => {
                self.next();
                true
            }
            _ => false,
        }
    }

    // returns an Ok or Err result depending on whether the next token has the given
    // kind, advancing the iterator on an Ok result.
    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            self.error_next(&format!("expected `{kind}`"))
        }
    }

    fn next(&mut self) -> Option<TokenKind> {
        if !self.end() {
            self.pos += 1;
            Some(self.tokens[self.pos - 1].kind)
        } else {
            None
        }
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    // looks `n` tokens past the next one.
    fn peek_nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn next_is(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // returns the lexeme of the token immediately prior to the current token.
    fn slice_prev(&self) -> &str {
        &self.code[self.tokens[self.pos - 1].span.clone()]
    }

    fn error_prev<T>(&self, msg: &str) -> Result<T, ParseError> {
        Err(error_at(self.code, self.tokens[self.pos - 1].span.start, msg))
    }

    fn error_next<T>(&self, msg: &str) -> Result<T, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) => Err(error_at(self.code, token.span.start, msg)),
            None => Err(ParseError(format!(
                "parse error: unexpected end of input ({msg})\n"
            ))),
        }
    }
}

// constructs a parse error pointing at the given byte offset of the source.
fn error_at(code: &str, offset: usize, msg: &str) -> ParseError {
    // the row number and the index of the start of the row containing the
    // error-causing lexeme.
    let (row, row_start) = code
        .match_indices('\n')
        .take_while(|(idx, _)| *idx < offset)
        .fold((0, 0), |(row, _), (idx, _)| (row + 1, idx + 1));

    let col = offset - row_start;
    let line = code.lines().nth(row).unwrap_or("");

    ParseError(format!(
        "parse error in line {row}, column {col}\n{line}\n{:width$}^\n{msg}\n",
        "",
        width = col
    ))
}

// SECTION: parsing functions

// the function names come from the production rules of the grammar.

// program.
fn program_r(parser: &mut Parser) -> Result<Program, ParseError> {
    let mut program = Program::default();

    loop {
        match parser.peek() {
            Some(Fun) => program.functions.push(fundef_r(parser)?),
            None => break,
            x => parser.error_next(&format!("expected `fun`, got {x:?}"))?,
        }
    }

    Ok(program)
}

// function definition.
fn fundef_r(parser: &mut Parser) -> Result<FunctionDef, ParseError> {
    parser.expect(Fun)?;
    let name = id_r(parser)?;
    parser.expect(OpenParen)?;

    let mut params = vec![];
    if !parser.next_is(CloseParen) {
        params.push(id_r(parser)?);
        while parser.eat(Comma) {
            params.push(id_r(parser)?);
        }
    }
    parser.expect(CloseParen)?;

    let body = block_r(parser)?;

    Ok(FunctionDef { name, params, body })
}

// braced statement sequence.
fn block_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(OpenBrace)?;

    let mut stmts = vec![stmt_r(parser)?];
    while parser.eat(Semicolon) {
        stmts.push(stmt_r(parser)?);
    }
    parser.expect(CloseBrace)?;

    Ok(Stmt::Block(stmts))
}

// statement.
fn stmt_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    match parser.peek() {
        Some(Skip) => {
            parser.next();
            Ok(Stmt::Skip)
        }
        Some(Output) => {
            parser.next();
            Ok(Stmt::Output(atom_r(parser)?))
        }
        Some(Return) => {
            parser.next();
            Ok(Stmt::Return(atom_r(parser)?))
        }
        Some(If) => {
            parser.next();
            let cond = bexpr_r(parser)?;
            parser.expect(Then)?;
            let tt = Box::new(stmt_r(parser)?);
            parser.expect(Else)?;
            let ff = Box::new(stmt_r(parser)?);
            Ok(Stmt::If { cond, tt, ff })
        }
        Some(While) => {
            parser.next();
            let cond = bexpr_r(parser)?;
            parser.expect(Do)?;
            let body = Box::new(stmt_r(parser)?);
            Ok(Stmt::While { cond, body })
        }
        Some(OpenBrace) => block_r(parser),
        Some(Id) => {
            let lhs = id_r(parser)?;
            parser.expect(Gets)?;
            let rhs = expr_r(parser)?;
            Ok(Stmt::Assign { lhs, rhs })
        }
        x => parser.error_next(&format!("expected a statement, got {x:?}")),
    }
}

// right-hand side of an assignment.
fn expr_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    // a call is the only expression starting with `id (`.
    if parser.next_is(Id) && parser.peek_nth(1) == Some(OpenParen) {
        let callee = id_r(parser)?;
        parser.expect(OpenParen)?;

        let mut args = vec![];
        if !parser.next_is(CloseParen) {
            args.push(atom_r(parser)?);
            while parser.eat(Comma) {
                args.push(atom_r(parser)?);
            }
        }
        parser.expect(CloseParen)?;

        return Ok(Expr::Call { callee, args });
    }

    let lhs = atom_r(parser)?;
    let op = match parser.peek() {
        Some(Plus) => ArithOp::Add,
        Some(Dash) => ArithOp::Sub,
        Some(Star) => ArithOp::Mul,
        _ => return Ok(Expr::Atom(lhs)),
    };
    parser.next();
    let rhs = atom_r(parser)?;

    Ok(Expr::Arith { op, lhs, rhs })
}

// atom: possibly negated integer literal, or identifier.
fn atom_r(parser: &mut Parser) -> Result<Atom, ParseError> {
    let negative = parser.eat(Dash);

    match parser.next() {
        Some(Num) => {
            let magnitude = match parser.slice_prev().parse::<u64>() {
                Ok(n) => n,
                Err(_) => return parser.error_prev("integer literal out of range"),
            };
            if negative {
                // -9223372036854775808 is the only literal whose magnitude
                // does not fit in an i64.
                if magnitude > i64::MAX as u64 + 1 {
                    return parser.error_prev("integer literal out of range");
                }
                Ok(Atom::Int(0i64.wrapping_sub(magnitude as i64)))
            } else if magnitude > i64::MAX as u64 {
                parser.error_prev("integer literal out of range")
            } else {
                Ok(Atom::Int(magnitude as i64))
            }
        }
        Some(Id) if !negative => Ok(Atom::Var(parser.slice_prev().to_owned())),
        x => parser.error_prev(&format!("expected an integer or identifier, got {x:?}")),
    }
}

fn id_r(parser: &mut Parser) -> Result<String, ParseError> {
    parser.expect(Id)?;
    Ok(parser.slice_prev().to_owned())
}

// boolean expression: disjunction.
fn bexpr_r(parser: &mut Parser) -> Result<BExpr, ParseError> {
    let mut lhs = band_r(parser)?;
    while parser.eat(Or) {
        let rhs = band_r(parser)?;
        lhs = BExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

// conjunction.
fn band_r(parser: &mut Parser) -> Result<BExpr, ParseError> {
    let mut lhs = bnot_r(parser)?;
    while parser.eat(And) {
        let rhs = bnot_r(parser)?;
        lhs = BExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

// negation, constants, parentheses, and comparisons.
fn bnot_r(parser: &mut Parser) -> Result<BExpr, ParseError> {
    match parser.peek() {
        Some(Not) => {
            parser.next();
            Ok(BExpr::Not(Box::new(bnot_r(parser)?)))
        }
        Some(True) => {
            parser.next();
            Ok(BExpr::True)
        }
        Some(False) => {
            parser.next();
            Ok(BExpr::False)
        }
        Some(OpenParen) => {
            parser.next();
            let b = bexpr_r(parser)?;
            parser.expect(CloseParen)?;
            Ok(b)
        }
        _ => {
            let lhs = atom_r(parser)?;
            let op = match parser.next() {
                Some(Lt) => CmpOp::Lt,
                Some(Equal) => CmpOp::Eq,
                x => return parser.error_prev(&format!("expected `<` or `=`, got {x:?}")),
            };
            let rhs = atom_r(parser)?;
            Ok(BExpr::Cmp { op, lhs, rhs })
        }
    }
}
