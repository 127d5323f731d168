// ABOUTME: Reader producing raw datum trees from the token stream

use crate::error::SchemeError;
use crate::lexer::{Lexer, Token};
use crate::number;
use crate::value::Value;

/// Result of reading one top-level datum.
#[derive(Debug)]
pub enum ReadOutcome {
    Datum(Value),
    /// Buffer exhausted between datums
    Eof,
    /// Unmatched `)` at top level; the REPL ignores it, script mode errors
    StrayClose,
    /// Buffer exhausted in the middle of a datum; the REPL reads more input
    Incomplete,
}

enum ReadError {
    Incomplete,
    Failed(SchemeError),
}

impl From<SchemeError> for ReadError {
    fn from(err: SchemeError) -> Self {
        ReadError::Failed(err)
    }
}

/// Read one top-level datum from the lexer.
pub fn read(lexer: &mut Lexer) -> Result<ReadOutcome, SchemeError> {
    match lexer.next_token()? {
        None => Ok(ReadOutcome::Eof),
        Some(Token::Close) => Ok(ReadOutcome::StrayClose),
        Some(token) => match read_ahead(lexer, token) {
            Ok(datum) => Ok(ReadOutcome::Datum(datum)),
            Err(ReadError::Incomplete) => Ok(ReadOutcome::Incomplete),
            Err(ReadError::Failed(err)) => Err(err),
        },
    }
}

fn read_ahead(lexer: &mut Lexer, token: Token) -> Result<Value, ReadError> {
    match token {
        Token::Open => {
            let mut members = Vec::new();
            loop {
                match lexer.next_token()? {
                    None => return Err(ReadError::Incomplete),
                    Some(Token::Close) => return Ok(Value::Seq(members)),
                    Some(next) => members.push(read_ahead(lexer, next)?),
                }
            }
        }
        Token::Quote => read_sugared("quote", lexer),
        Token::Quasiquote => read_sugared("quasiquote", lexer),
        Token::Unquote => read_sugared("unquote", lexer),
        Token::UnquoteSplicing => read_sugared("unquote-splicing", lexer),
        Token::Str(raw) => Ok(Value::Str(decode_string(&raw))),
        Token::Atom(text) => Ok(atom_value(&text)?),
        Token::Close => Err(ReadError::Failed(SchemeError::Syntax {
            form: ")".to_string(),
            message: "unexpected closing parenthesis".to_string(),
        })),
    }
}

/// A quote-sugar token reads the following datum as `(<symbol> <datum>)`.
fn read_sugared(name: &str, lexer: &mut Lexer) -> Result<Value, ReadError> {
    match lexer.next_token()? {
        None => Err(ReadError::Incomplete),
        Some(Token::Close) => Err(ReadError::Failed(SchemeError::Syntax {
            form: name.to_string(),
            message: "expected a datum after quote sugar".to_string(),
        })),
        Some(next) => Ok(Value::Seq(vec![
            Value::symbol(name),
            read_ahead(lexer, next)?,
        ])),
    }
}

/// Atom transformation: booleans, then numbers in the tower's literal
/// order, then symbols (lowercased). `string->number` reuses this, which
/// is why a non-numeric argument comes back as a symbol.
pub fn atom_value(text: &str) -> Result<Value, SchemeError> {
    match text {
        "#t" => return Ok(Value::Bool(true)),
        "#f" => return Ok(Value::Bool(false)),
        _ => {}
    }
    match number::parse_literal(text)? {
        Some(n) => Ok(Value::Number(n)),
        None => Ok(Value::Symbol(text.to_lowercase())),
    }
}

/// Strip the delimiters and decode backslash escapes. Unknown escapes keep
/// the backslash verbatim.
fn decode_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    fn read_one(source: &str) -> Value {
        let mut lexer = Lexer::new(source);
        match read(&mut lexer).unwrap() {
            ReadOutcome::Datum(d) => d,
            other => panic!("expected a datum, got {:?}", other),
        }
    }

    #[test]
    fn test_read_atoms() {
        assert!(matches!(read_one("#t"), Value::Bool(true)));
        assert!(matches!(read_one("#f"), Value::Bool(false)));
        assert!(matches!(
            read_one("42"),
            Value::Number(Number::Int(42))
        ));
        assert!(matches!(
            read_one("2.5"),
            Value::Number(Number::Real(x)) if x == 2.5
        ));
        assert!(matches!(
            read_one("1/3"),
            Value::Number(Number::Rational(1, 3))
        ));
        assert!(matches!(
            read_one("3+4i"),
            Value::Number(Number::Complex(re, im)) if re == 3.0 && im == 4.0
        ));
        assert!(matches!(read_one("#x10"), Value::Number(Number::Int(16))));
    }

    #[test]
    fn test_symbols_are_lowercased() {
        assert!(matches!(read_one("FOO"), Value::Symbol(s) if s == "foo"));
        assert!(matches!(read_one("Bar?"), Value::Symbol(s) if s == "bar?"));
        // a near-miss boolean becomes a symbol, not a boolean
        assert!(matches!(read_one("#T"), Value::Symbol(s) if s == "#t"));
    }

    #[test]
    fn test_rejected_complex_forms_become_symbols() {
        assert!(matches!(read_one("i"), Value::Symbol(s) if s == "i"));
        assert!(matches!(read_one("2i"), Value::Symbol(s) if s == "2i"));
    }

    #[test]
    fn test_read_string_with_escapes() {
        assert!(matches!(
            read_one(r#""say \"hi\"\n""#),
            Value::Str(s) if s == "say \"hi\"\n"
        ));
        assert!(matches!(read_one(r#""""#), Value::Str(s) if s.is_empty()));
    }

    #[test]
    fn test_read_nested_sequence() {
        match read_one("(a (b 2) 3)") {
            Value::Seq(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(&items[0], Value::Symbol(s) if s == "a"));
                match &items[1] {
                    Value::Seq(inner) => {
                        assert_eq!(inner.len(), 2);
                        assert!(matches!(&inner[0], Value::Symbol(s) if s == "b"));
                    }
                    other => panic!("expected inner seq, got {:?}", other),
                }
            }
            other => panic!("expected seq, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_sugar_desugars() {
        match read_one("'x") {
            Value::Seq(items) => {
                assert!(matches!(&items[0], Value::Symbol(s) if s == "quote"));
                assert!(matches!(&items[1], Value::Symbol(s) if s == "x"));
            }
            other => panic!("expected seq, got {:?}", other),
        }
        match read_one(",@xs") {
            Value::Seq(items) => {
                assert!(matches!(&items[0], Value::Symbol(s) if s == "unquote-splicing"));
            }
            other => panic!("expected seq, got {:?}", other),
        }
    }

    #[test]
    fn test_stray_close_and_eof() {
        let mut lexer = Lexer::new(")");
        assert!(matches!(read(&mut lexer).unwrap(), ReadOutcome::StrayClose));

        let mut lexer = Lexer::new("  ; just a comment\n");
        assert!(matches!(read(&mut lexer).unwrap(), ReadOutcome::Eof));
    }

    #[test]
    fn test_incomplete_datum() {
        let mut lexer = Lexer::new("(a (b");
        assert!(matches!(read(&mut lexer).unwrap(), ReadOutcome::Incomplete));

        let mut lexer = Lexer::new("'");
        assert!(matches!(read(&mut lexer).unwrap(), ReadOutcome::Incomplete));
    }

    #[test]
    fn test_multiple_datums_per_buffer() {
        let mut lexer = Lexer::new("1 2");
        assert!(matches!(
            read(&mut lexer).unwrap(),
            ReadOutcome::Datum(Value::Number(Number::Int(1)))
        ));
        assert!(matches!(
            read(&mut lexer).unwrap(),
            ReadOutcome::Datum(Value::Number(Number::Int(2)))
        ));
        assert!(matches!(read(&mut lexer).unwrap(), ReadOutcome::Eof));
    }

    #[test]
    fn test_dot_reads_as_marker_symbol() {
        match read_one("(1 . 2)") {
            Value::Seq(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(&items[1], Value::Symbol(s) if s == "."));
            }
            other => panic!("expected seq, got {:?}", other),
        }
    }
}
