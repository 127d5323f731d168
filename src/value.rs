// ABOUTME: Value types representing Scheme data structures and code trees

use crate::env::Environment;
use crate::error::SchemeError;
use crate::number::Number;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Number(Number),
    Str(String),
    Symbol(String),
    /// The unique empty list `()`
    Nil,
    /// Mutable cons cell; a chain ending in `Nil` is a proper list
    Pair(Rc<PairCell>),
    /// Reader-produced code sequence. Exists only in code trees; `quote`
    /// converts it to pair chains before it can reach user data.
    Seq(Vec<Value>),
    Procedure(Rc<Procedure>),
    Primitive(Primitive),
    Promise(Rc<RefCell<Promise>>),
    Port(Rc<RefCell<Port>>),
    Eof,
    Unspecified,
}

#[derive(Debug)]
pub struct PairCell {
    pub car: RefCell<Value>,
    pub cdr: RefCell<Value>,
}

/// Formal parameters of a procedure: a fixed list of names, or a single
/// name that binds the whole argument list.
#[derive(Debug, Clone)]
pub enum Formals {
    Fixed(Vec<String>),
    Variadic(String),
}

/// A closure: formals, an already-expanded body, and the defining frame.
#[derive(Debug)]
pub struct Procedure {
    pub formals: Formals,
    pub body: Value,
    pub env: Rc<Environment>,
}

/// A named host function registered in the initial environment.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub func: NativeFn,
}

/// Most primitives are pure over their arguments; `eval`, `apply`, `map`
/// and `load` additionally receive the caller's environment.
#[derive(Debug, Clone, Copy)]
pub enum NativeFn {
    Pure(fn(&[Value]) -> Result<Value, SchemeError>),
    WithEnv(fn(&[Value], &Rc<Environment>) -> Result<Value, SchemeError>),
}

#[derive(Debug)]
pub struct Promise {
    pub body: Value,
    pub env: Rc<Environment>,
    pub state: PromiseState,
}

#[derive(Debug)]
pub enum PromiseState {
    Unforced,
    Forced(Value),
}

/// An open or closed file stream with a mode tag. The mode survives
/// closing so the port predicates keep answering.
#[derive(Debug)]
pub enum Port {
    Input(Option<BufReader<File>>),
    Output(Option<File>),
}

impl Port {
    pub fn is_input(&self) -> bool {
        matches!(self, Port::Input(_))
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Port::Output(_))
    }
}

// ============================================================================
// Construction helpers
// ============================================================================

pub fn cons(car: Value, cdr: Value) -> Value {
    Value::Pair(Rc::new(PairCell {
        car: RefCell::new(car),
        cdr: RefCell::new(cdr),
    }))
}

/// Build a proper list from a vector of elements.
pub fn list_from_vec(items: Vec<Value>) -> Value {
    let mut result = Value::Nil;
    for item in items.into_iter().rev() {
        result = cons(item, result);
    }
    result
}

/// Collect a proper list into a vector; `None` for improper chains.
pub fn list_to_vec(value: &Value) -> Option<Vec<Value>> {
    let mut items = Vec::new();
    let mut cursor = value.clone();
    loop {
        match cursor {
            Value::Nil => return Some(items),
            Value::Pair(cell) => {
                items.push(cell.car.borrow().clone());
                let next = cell.cdr.borrow().clone();
                cursor = next;
            }
            _ => return None,
        }
    }
}

impl Value {
    pub fn symbol(name: &str) -> Value {
        Value::Symbol(name.to_string())
    }

    /// Only `#f` is false; every other value is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Nil => "empty list",
            Value::Pair(_) => "pair",
            Value::Seq(_) => "expression",
            Value::Procedure(_) => "procedure",
            Value::Primitive(_) => "procedure",
            Value::Promise(_) => "promise",
            Value::Port(_) => "port",
            Value::Eof => "eof object",
            Value::Unspecified => "unspecified",
        }
        .to_string()
    }

    /// `eqv?`: identity for pairs and procedures, exactness-sensitive value
    /// equality for numbers, content equality for symbols and strings.
    pub fn eqv(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Procedure(a), Value::Procedure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a.name == b.name,
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::Port(a), Value::Port(b)) => Rc::ptr_eq(a, b),
            (Value::Eof, Value::Eof) => true,
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }

    /// `equal?`: structural equality, recursing through pair chains.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Pair(a), Value::Pair(b)) => {
                a.car.borrow().equal(&b.car.borrow()) && a.cdr.borrow().equal(&b.cdr.borrow())
            }
            _ => self.eqv(other),
        }
    }

    /// External form for `display`: strings print raw, everything else as
    /// the printer writes it.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            _ => self.to_string(),
        }
    }
}

// ============================================================================
// Printer
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => {
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                write!(f, "{}", quoted)
            }
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Nil => write!(f, "()"),
            Value::Pair(cell) => {
                // Walk the spine, choosing proper or dotted form
                write!(f, "({}", cell.car.borrow())?;
                let mut cursor = cell.cdr.borrow().clone();
                loop {
                    match cursor {
                        Value::Nil => return write!(f, ")"),
                        Value::Pair(next) => {
                            write!(f, " {}", next.car.borrow())?;
                            let rest = next.cdr.borrow().clone();
                            cursor = rest;
                        }
                        other => return write!(f, " . {})", other),
                    }
                }
            }
            Value::Seq(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Procedure(_) => write!(f, "#<procedure>"),
            Value::Primitive(p) => write!(f, "#<primitive {}>", p.name),
            Value::Promise(_) => write!(f, "#<promise>"),
            Value::Port(port) => {
                if port.borrow().is_input() {
                    write!(f, "#<input-port>")
                } else {
                    write!(f, "#<output-port>")
                }
            }
            Value::Eof => write!(f, "#!eof"),
            Value::Unspecified => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_display() {
        assert_eq!(Value::Bool(true).to_string(), "#t");
        assert_eq!(Value::Bool(false).to_string(), "#f");
    }

    #[test]
    fn test_proper_list_display() {
        let list = list_from_vec(vec![
            Value::Number(Number::Int(1)),
            Value::Number(Number::Int(2)),
            Value::Number(Number::Int(3)),
        ]);
        assert_eq!(list.to_string(), "(1 2 3)");
        assert_eq!(Value::Nil.to_string(), "()");
    }

    #[test]
    fn test_dotted_pair_display() {
        let pair = cons(Value::Number(Number::Int(1)), Value::Number(Number::Int(2)));
        assert_eq!(pair.to_string(), "(1 . 2)");

        let improper = cons(Value::Number(Number::Int(1)), pair);
        assert_eq!(improper.to_string(), "(1 1 . 2)");
    }

    #[test]
    fn test_string_display_json_escapes() {
        assert_eq!(Value::Str("hi".to_string()).to_string(), "\"hi\"");
        assert_eq!(
            Value::Str("a\"b\n".to_string()).to_string(),
            "\"a\\\"b\\n\""
        );
    }

    #[test]
    fn test_display_string_is_raw_for_strings() {
        assert_eq!(Value::Str("hi".to_string()).display_string(), "hi");
        assert_eq!(Value::Bool(true).display_string(), "#t");
    }

    #[test]
    fn test_eof_display() {
        assert_eq!(Value::Eof.to_string(), "#!eof");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Nil.is_truthy());
        assert!(Value::Number(Number::Int(0)).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
    }

    #[test]
    fn test_eqv_pairs_by_identity() {
        let a = cons(Value::Number(Number::Int(1)), Value::Nil);
        let b = cons(Value::Number(Number::Int(1)), Value::Nil);
        assert!(!a.eqv(&b));
        assert!(a.eqv(&a.clone()));
        assert!(a.equal(&b));
    }

    #[test]
    fn test_eqv_numbers_keep_exactness() {
        let exact = Value::Number(Number::Int(1));
        let inexact = Value::Number(Number::Real(1.0));
        assert!(!exact.eqv(&inexact));
        assert!(exact.eqv(&Value::Number(Number::Int(1))));
    }

    #[test]
    fn test_list_round_trip() {
        let items = vec![Value::symbol("a"), Value::symbol("b")];
        let list = list_from_vec(items.clone());
        let back = list_to_vec(&list).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back[0].eqv(&items[0]));

        let improper = cons(Value::symbol("a"), Value::symbol("b"));
        assert!(list_to_vec(&improper).is_none());
    }
}
