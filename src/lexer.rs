// ABOUTME: Line-buffered lexer turning source text into a token stream

use crate::error::SchemeError;
use crate::value::Value;
use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_while1},
    character::complete::{anychar, char, none_of},
    combinator::{recognize, value},
    IResult, Parser,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open,
    Close,
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    /// String literal lexeme, delimiters included; the reader decodes it
    Str(String),
    /// Maximal run of non-delimiter characters; the reader transforms it
    Atom(String),
}

/// A cursor over buffered source text. The REPL feeds it one line at a
/// time; `empty` reports whether anything but trivia remains, which is
/// what decides when to print a fresh prompt.
pub struct Lexer {
    input: String,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            input: source.to_string(),
            pos: 0,
        }
    }

    /// Append a line of input (REPL continuation reads).
    pub fn feed(&mut self, line: &str) {
        self.input.push_str(line);
        self.input.push('\n');
    }

    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    fn remainder(&self) -> &str {
        &self.input[self.pos..]
    }

    /// True when only whitespace and comments remain in the buffer.
    pub fn empty(&self) -> bool {
        skip_trivia(self.remainder()).is_empty()
    }

    /// The next token, `None` when the buffer is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>, SchemeError> {
        let rest_len = skip_trivia(self.remainder()).len();
        self.pos = self.input.len() - rest_len;
        let rest = self.remainder();
        if rest.is_empty() {
            return Ok(None);
        }
        match lex_token(rest) {
            Ok((after, token)) => {
                self.pos = self.input.len() - after.len();
                Ok(Some(token))
            }
            Err(_) if rest.starts_with('"') => Err(SchemeError::Syntax {
                form: rest.lines().next().unwrap_or(rest).to_string(),
                message: "unterminated string literal".to_string(),
            }),
            Err(_) => Err(SchemeError::syntax(
                &Value::Str(rest.chars().take(16).collect()),
                "unrecognized input",
            )),
        }
    }
}

/// Skip whitespace and `;`-to-end-of-line comments.
fn skip_trivia(mut input: &str) -> &str {
    loop {
        input = input.trim_start();
        if let Some(rest) = input.strip_prefix(';') {
            input = match rest.find('\n') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            };
        } else {
            return input;
        }
    }
}

fn lex_string(input: &str) -> IResult<&str, Token> {
    alt((
        // The empty string needs its own arm; `escaped` wants at least one
        // normal or escaped character
        recognize((char('"'), char('"'))),
        recognize((
            char('"'),
            escaped(none_of("\"\\"), '\\', anychar),
            char('"'),
        )),
    ))
    .map(|raw: &str| Token::Str(raw.to_string()))
    .parse(input)
}

fn lex_sugar(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::UnquoteSplicing, tag(",@")),
        value(Token::Quote, char('\'')),
        value(Token::Quasiquote, char('`')),
        value(Token::Unquote, char(',')),
    ))
    .parse(input)
}

fn lex_paren(input: &str) -> IResult<&str, Token> {
    alt((value(Token::Open, char('(')), value(Token::Close, char(')')))).parse(input)
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !"()'\",;`".contains(c)
}

fn lex_atom(input: &str) -> IResult<&str, Token> {
    take_while1(is_atom_char)
        .map(|s: &str| Token::Atom(s.to_string()))
        .parse(input)
}

fn lex_token(input: &str) -> IResult<&str, Token> {
    alt((lex_string, lex_sugar, lex_paren, lex_atom)).parse(input)
}
