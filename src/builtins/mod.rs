//! # Built-in Procedures Module
//!
//! The primitive registry seeded into the initial environment, organized
//! by category.
//!
//! ## Categories
//!
//! - **[arithmetic]**: + - * / gcd lcm expt modulo quotient remainder abs
//!   min max floor ceiling truncate round sqrt sin cos tan asin acos atan,
//!   complex constructors/accessors, numerator/denominator
//! - **[comparison]**: = < > <= >= folding left to right
//! - **[predicates]**: type tests, equivalence (eq? eqv? equal?), not/and/or
//! - **[pairs]**: cons car cdr set-car! set-cdr! list length list-ref
//!   list-set! make-list append reverse
//! - **[strings]**: string->number number->string string->symbol substring
//!   string-append
//! - **[io]**: ports, read, write, display
//! - **[control]**: eval apply map force load and the promise observers
//!
//! Each category is a sub-module with its own register function.

use crate::env::Environment;
use crate::error::SchemeError;
use crate::value::{NativeFn, Primitive, Value};
use std::rc::Rc;

pub mod arithmetic;
pub mod comparison;
pub mod control;
pub mod io;
pub mod pairs;
pub mod predicates;
pub mod strings;

// Re-export for convenience
pub use arithmetic::register as register_arithmetic;
pub use comparison::register as register_comparison;
pub use control::register as register_control;
pub use io::register as register_io;
pub use pairs::register as register_pairs;
pub use predicates::register as register_predicates;
pub use strings::register as register_strings;

/// Bind a pure primitive under its Scheme name.
pub(crate) fn define_pure(
    env: &Rc<Environment>,
    name: &'static str,
    func: fn(&[Value]) -> Result<Value, SchemeError>,
) {
    env.define(
        name.to_string(),
        Value::Primitive(Primitive {
            name,
            func: NativeFn::Pure(func),
        }),
    );
}

/// Bind a primitive that also receives the caller's environment.
pub(crate) fn define_with_env(
    env: &Rc<Environment>,
    name: &'static str,
    func: fn(&[Value], &Rc<Environment>) -> Result<Value, SchemeError>,
) {
    env.define(
        name.to_string(),
        Value::Primitive(Primitive {
            name,
            func: NativeFn::WithEnv(func),
        }),
    );
}

// ============================================================================
// Main Registration Function
// ============================================================================

/// Register all built-in procedures in the environment
pub fn register_builtins(env: &Rc<Environment>) {
    register_arithmetic(env);
    register_comparison(env);
    register_predicates(env);
    register_pairs(env);
    register_strings(env);
    register_io(env);
    register_control(env);
}

/// The bootstrap snippet evaluated once at interpreter start.
pub const PRELUDE: &str = include_str!("../prelude.scm");

/// A fresh global environment: builtins plus the Scheme prelude.
pub fn initial_env() -> Result<Rc<Environment>, SchemeError> {
    let env = Environment::new();
    register_builtins(&env);
    crate::eval::eval_source(PRELUDE, &env)?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_env_has_builtins_and_prelude() {
        let env = initial_env().unwrap();
        assert!(env.lookup("+").is_ok());
        assert!(env.lookup("cons").is_ok());
        assert!(env.lookup("cadr").is_ok());
        assert!(env.lookup("assv").is_ok());
    }

    #[test]
    fn test_boolean_aliases() {
        let env = initial_env().unwrap();
        assert!(matches!(env.lookup("true"), Ok(Value::Bool(true))));
        assert!(matches!(env.lookup("false"), Ok(Value::Bool(false))));
    }
}
