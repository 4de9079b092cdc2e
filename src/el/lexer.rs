// Converts expression text into a flat token stream. Offsets are byte
// offsets into the source, used for error reporting.

use std::{fmt, iter::Peekable, str::CharIndices};

use super::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TokenKind {
    /// Bare word: a field name or one of the `and` / `or` / `not` keywords.
    Ident(String),
    /// Double-quoted literal, escapes resolved.
    Str(String),
    /// `/`-delimited pattern, with `\/` unescaped.
    Regex(String),
    Eq,
    Ne,
    Comma,
    LParen,
    RParen,
    Eof,
}

impl TokenKind {
    pub(super) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Ident(word) if word == keyword)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ident(word) => write!(f, "'{word}'"),
            Self::Str(literal) => write!(f, "\"{literal}\""),
            Self::Regex(pattern) => write!(f, "/{pattern}/"),
            Self::Eq => f.write_str("'=='"),
            Self::Ne => f.write_str("'!='"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) offset: usize,
}

pub(super) struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    /// Tokenize the entire input. The last token is always [`TokenKind::Eof`].
    pub(super) fn tokenize(source: &'a str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((offset, ch)) = self.chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset: self.source.len(),
            });
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '=' => self.lex_operator(offset, ch, TokenKind::Eq)?,
            '!' => self.lex_operator(offset, ch, TokenKind::Ne)?,
            '"' => self.lex_string(offset)?,
            '/' => self.lex_regex(offset)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(offset),
            c => return Err(self.error(offset, ParseErrorKind::UnexpectedChar(c))),
        };

        Ok(Token { kind, offset })
    }

    /// Both operators are a first character followed by `=`.
    fn lex_operator(
        &mut self,
        offset: usize,
        first: char,
        kind: TokenKind,
    ) -> Result<TokenKind, ParseError> {
        if self.chars.next_if(|(_, c)| *c == '=').is_some() {
            Ok(kind)
        } else {
            Err(self.error(offset, ParseErrorKind::UnexpectedChar(first)))
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '"' => return Ok(TokenKind::Str(value)),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(self.error(start, ParseErrorKind::UnterminatedString))
    }

    fn lex_regex(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut pattern = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '/' => return Ok(TokenKind::Regex(pattern)),
                // only the delimiter is unescaped, everything else belongs to the regex
                '\\' => match self.chars.next() {
                    Some((_, '/')) => pattern.push('/'),
                    Some((_, escaped)) => {
                        pattern.push('\\');
                        pattern.push(escaped);
                    }
                    None => break,
                },
                c => pattern.push(c),
            }
        }
        Err(self.error(start, ParseErrorKind::UnterminatedRegex))
    }

    fn lex_ident(&mut self, start: usize) -> TokenKind {
        let mut end = start + 1;
        while let Some((offset, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        {
            end = offset + c.len_utf8();
        }
        TokenKind::Ident(self.source[start..end].to_string())
    }

    fn error(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.source, offset, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn comparison_tokens() {
        assert_eq!(
            kinds(r#"ids == "REQ_001", "urn:REQ_101""#),
            vec![
                TokenKind::Ident("ids".to_string()),
                TokenKind::Eq,
                TokenKind::Str("REQ_001".to_string()),
                TokenKind::Comma,
                TokenKind::Str("urn:REQ_101".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn regex_keeps_escapes_except_delimiter() {
        assert_eq!(
            kinds(r"ids != /urn\:REQ_(\d{2,3}|1\/2)$/"),
            vec![
                TokenKind::Ident("ids".to_string()),
                TokenKind::Ne,
                TokenKind::Regex(r"urn\:REQ_(\d{2,3}|1/2)$".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\"b""#),
            vec![TokenKind::Str("a\"b".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn offsets_are_byte_positions() {
        let tokens = Lexer::tokenize("not (ids").unwrap();
        let offsets: Vec<_> = tokens.iter().map(|token| token.offset).collect();
        assert_eq!(offsets, vec![0, 4, 5, 8]);
    }

    #[test]
    fn unsupported_operator() {
        let error = Lexer::tokenize(r#"ids > "REQ_001""#).unwrap_err();
        assert_eq!(error.kind(), &ParseErrorKind::UnexpectedChar('>'));
        assert_eq!(error.offset(), 4);
    }

    #[test]
    fn single_equals_is_rejected() {
        let error = Lexer::tokenize(r#"ids = "REQ_001""#).unwrap_err();
        assert_eq!(error.kind(), &ParseErrorKind::UnexpectedChar('='));
    }

    #[test]
    fn unterminated_literals() {
        let error = Lexer::tokenize(r#"ids == "REQ_001"#).unwrap_err();
        assert_eq!(error.kind(), &ParseErrorKind::UnterminatedString);

        let error = Lexer::tokenize("ids == /REQ_.*").unwrap_err();
        assert_eq!(error.kind(), &ParseErrorKind::UnterminatedRegex);
    }
}
