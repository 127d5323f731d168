// ABOUTME: Environment module for lexical frames and variable bindings

use crate::error::SchemeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment with a parent
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Binds in THIS frame, creating or overwriting
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up a symbol here and in outer frames
    pub fn lookup(&self, name: &str) -> Result<Value, SchemeError> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(SchemeError::Lookup(name.to_string())),
        }
    }

    /// Overwrites an existing binding in the frame that owns it and returns
    /// the prior value (which is what `set!` evaluates to)
    pub fn assign(&self, name: &str, value: Value) -> Result<Value, SchemeError> {
        if let Some(old) = self.bindings.borrow_mut().get_mut(name) {
            return Ok(std::mem::replace(old, value));
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(SchemeError::Lookup(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    #[test]
    fn test_define_and_lookup() {
        let env = Environment::new();
        env.define("x".to_string(), int(42));

        match env.lookup("x") {
            Ok(Value::Number(Number::Int(n))) => assert_eq!(n, 42),
            other => panic!("expected 42, got {:?}", other),
        }
    }

    #[test]
    fn test_unbound_symbol() {
        let env = Environment::new();
        assert!(matches!(env.lookup("missing"), Err(SchemeError::Lookup(_))));
    }

    #[test]
    fn test_shadowing() {
        let parent = Environment::new();
        parent.define("x".to_string(), int(1));

        let child = Environment::with_parent(parent.clone());
        child.define("x".to_string(), int(2));

        assert!(matches!(
            child.lookup("x"),
            Ok(Value::Number(Number::Int(2)))
        ));
        assert!(matches!(
            parent.lookup("x"),
            Ok(Value::Number(Number::Int(1)))
        ));
    }

    #[test]
    fn test_assign_walks_outward_and_returns_prior() {
        let parent = Environment::new();
        parent.define("x".to_string(), int(1));
        let child = Environment::with_parent(parent.clone());

        let old = child.assign("x", int(5)).unwrap();
        assert!(matches!(old, Value::Number(Number::Int(1))));
        assert!(matches!(
            parent.lookup("x"),
            Ok(Value::Number(Number::Int(5)))
        ));
    }

    #[test]
    fn test_assign_unbound_fails() {
        let env = Environment::new();
        assert!(env.assign("ghost", int(0)).is_err());
    }

    #[test]
    fn test_multiple_levels() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), int(1));
        let parent = Environment::with_parent(grandparent);
        parent.define("b".to_string(), int(2));
        let child = Environment::with_parent(parent);
        child.define("c".to_string(), int(3));

        for (name, expected) in [("a", 1), ("b", 2), ("c", 3)] {
            match child.lookup(name) {
                Ok(Value::Number(Number::Int(n))) => assert_eq!(n, expected),
                other => panic!("expected {}, got {:?}", expected, other),
            }
        }
    }
}
