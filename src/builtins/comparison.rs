//! Numeric comparisons: =, <, >, <=, >=
//!
//! Each folds its arguments left to right and short-circuits to `#f` at
//! the first failing pair. `=` compares numeric value across exactness;
//! the ordering operators reject complex numbers.

use crate::env::Environment;
use crate::error::SchemeError;
use crate::number::Number;
use crate::value::Value;
use std::rc::Rc;

fn fold_compare(
    function: &str,
    args: &[Value],
    pred: fn(&Number, &Number) -> Result<bool, SchemeError>,
) -> Result<Value, SchemeError> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Number(n) => numbers.push(n),
            other => return Err(SchemeError::type_error(function, "number", other)),
        }
    }
    for window in numbers.windows(2) {
        if !pred(window[0], window[1])? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn builtin_num_eq(args: &[Value]) -> Result<Value, SchemeError> {
    fold_compare("=", args, |a, b| Ok(a.numeric_eq(b)))
}

pub fn builtin_lt(args: &[Value]) -> Result<Value, SchemeError> {
    fold_compare("<", args, Number::lt)
}

pub fn builtin_le(args: &[Value]) -> Result<Value, SchemeError> {
    fold_compare("<=", args, Number::le)
}

pub fn builtin_gt(args: &[Value]) -> Result<Value, SchemeError> {
    fold_compare(">", args, Number::gt)
}

pub fn builtin_ge(args: &[Value]) -> Result<Value, SchemeError> {
    fold_compare(">=", args, Number::ge)
}

/// Register all comparison builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_pure(env, "=", builtin_num_eq);
    super::define_pure(env, "<", builtin_lt);
    super::define_pure(env, "<=", builtin_le);
    super::define_pure(env, ">", builtin_gt);
    super::define_pure(env, ">=", builtin_ge);
}
