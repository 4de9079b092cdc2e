// Recursive-descent parser over the token stream.
//
//   expression := unary ( ("and" unary)+ | ("or" unary)+ )?
//   unary      := "not" unary | primary
//   primary    := "(" expression ")" | comparison
//   comparison := "ids" ("==" | "!=") operand ("," operand)*
//   operand    := STRING | REGEX
//
// `and` and `or` never mix within one level; grouping parentheses are
// required to combine them.

use regex::Regex;

use super::{
    Expr, Operand, ParseError, ParseErrorKind,
    lexer::{Lexer, Token, TokenKind},
};

const FIELD_IDS: &str = "ids";
const AND: &str = "and";
const OR: &str = "or";
const NOT: &str = "not";

pub(super) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn parse(source: &'a str) -> Result<Expr, ParseError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Self {
            source,
            tokens,
            pos: 0,
        };

        if parser.peek() == &TokenKind::Eof {
            return Err(parser.error(ParseErrorKind::Empty));
        }

        let expr = parser.expression()?;
        parser.expect(&TokenKind::Eof, "end of expression")?;
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.unary()?;
        if self.peek().is_keyword(AND) {
            let operands = self.chain(first, AND, OR)?;
            Ok(Expr::And(operands))
        } else if self.peek().is_keyword(OR) {
            let operands = self.chain(first, OR, AND)?;
            Ok(Expr::Or(operands))
        } else {
            Ok(first)
        }
    }

    fn chain(
        &mut self,
        first: Expr,
        connective: &str,
        other: &str,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut operands = vec![first];
        while self.peek().is_keyword(connective) {
            self.advance();
            operands.push(self.unary()?);
        }
        if self.peek().is_keyword(other) {
            return Err(self.error(ParseErrorKind::MixedConnectives));
        }
        Ok(operands)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek().is_keyword(NOT) {
            self.advance();
            Ok(Expr::Not(Box::new(self.unary()?)))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Ident(word) if word == FIELD_IDS => self.comparison(),
            TokenKind::Ident(word) if ![AND, OR, NOT].contains(&word.as_str()) => {
                let field = word.clone();
                Err(self.error(ParseErrorKind::UnknownField(field)))
            }
            _ => Err(self.unexpected("comparison or '('")),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.advance();

        let negated = match self.peek() {
            TokenKind::Eq => false,
            TokenKind::Ne => true,
            _ => return Err(self.unexpected("'==' or '!='")),
        };
        self.advance();

        let mut operands = vec![self.operand()?];
        while self.peek() == &TokenKind::Comma {
            self.advance();
            operands.push(self.operand()?);
        }

        Ok(Expr::Comparison { negated, operands })
    }

    fn operand(&mut self) -> Result<Operand, ParseError> {
        let operand = match self.peek() {
            TokenKind::Str(literal) => Operand::Literal(literal.clone()),
            TokenKind::Regex(pattern) => {
                let regex = Regex::new(pattern)
                    .map_err(|e| self.error(ParseErrorKind::InvalidRegex(e.to_string())))?;
                Operand::Pattern(regex)
            }
            _ => return Err(self.unexpected("quoted id or /regex/")),
        };
        self.advance();
        Ok(operand)
    }

    fn peek(&self) -> &TokenKind {
        // tokenize always ends the stream with Eof, and Eof is never consumed
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        self.error(ParseErrorKind::UnexpectedToken {
            expected,
            found: self.peek().to_string(),
        })
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.source, self.tokens[self.pos].offset, kind)
    }
}
