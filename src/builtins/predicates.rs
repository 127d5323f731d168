//! Type predicates, equivalence and boolean operations.
//!
//! The numeric predicates are inclusive going up the tower: every exact
//! integer is also rational and real, and every number is complex. `odd?`
//! and `even?` insist on integers. `and` and `or` are ordinary variadic
//! procedures (their arguments are already evaluated), returning the
//! deciding argument like the rest of the tower's operations.

use crate::env::Environment;
use crate::error::{SchemeError, ARITY_ONE, ARITY_TWO};
use crate::number::Number;
use crate::value::{list_to_vec, Value};
use std::rc::Rc;

fn one_arg<'a>(function: &str, args: &'a [Value]) -> Result<&'a Value, SchemeError> {
    match args {
        [single] => Ok(single),
        _ => Err(SchemeError::arity(function, ARITY_ONE, args.len())),
    }
}

fn number_of<'a>(function: &str, args: &'a [Value]) -> Result<&'a Number, SchemeError> {
    match one_arg(function, args)? {
        Value::Number(n) => Ok(n),
        other => Err(SchemeError::type_error(function, "number", other)),
    }
}

macro_rules! type_predicate {
    ($rust_name:ident, $name:literal, $pattern:pat) => {
        pub fn $rust_name(args: &[Value]) -> Result<Value, SchemeError> {
            Ok(Value::Bool(matches!(one_arg($name, args)?, $pattern)))
        }
    };
}

type_predicate!(builtin_boolean_q, "boolean?", Value::Bool(_));
type_predicate!(builtin_string_q, "string?", Value::Str(_));
type_predicate!(builtin_symbol_q, "symbol?", Value::Symbol(_));
type_predicate!(builtin_pair_q, "pair?", Value::Pair(_));
type_predicate!(builtin_null_q, "null?", Value::Nil);
type_predicate!(builtin_promise_q, "promise?", Value::Promise(_));
type_predicate!(builtin_eof_object_q, "eof-object?", Value::Eof);
type_predicate!(builtin_number_q, "number?", Value::Number(_));
type_predicate!(
    builtin_procedure_q,
    "procedure?",
    Value::Procedure(_) | Value::Primitive(_)
);
type_predicate!(
    builtin_integer_q,
    "integer?",
    Value::Number(Number::Int(_))
);
type_predicate!(
    builtin_rational_q,
    "rational?",
    Value::Number(Number::Int(_) | Number::Rational(_, _) | Number::Real(_))
);
type_predicate!(
    builtin_real_q,
    "real?",
    Value::Number(Number::Int(_) | Number::Rational(_, _) | Number::Real(_))
);
type_predicate!(builtin_complex_q, "complex?", Value::Number(_));

/// A proper list: `()` or a pair chain whose spine ends in `()`.
pub fn builtin_list_q(args: &[Value]) -> Result<Value, SchemeError> {
    let value = one_arg("list?", args)?;
    Ok(Value::Bool(list_to_vec(value).is_some()))
}

pub fn builtin_zero_q(args: &[Value]) -> Result<Value, SchemeError> {
    Ok(Value::Bool(number_of("zero?", args)?.is_zero()))
}

pub fn builtin_positive_q(args: &[Value]) -> Result<Value, SchemeError> {
    let n = number_of("positive?", args)?;
    Ok(Value::Bool(n.gt(&Number::Int(0))?))
}

pub fn builtin_negative_q(args: &[Value]) -> Result<Value, SchemeError> {
    let n = number_of("negative?", args)?;
    Ok(Value::Bool(n.lt(&Number::Int(0))?))
}

pub fn builtin_odd_q(args: &[Value]) -> Result<Value, SchemeError> {
    let n = number_of("odd?", args)?.to_int("odd?")?;
    Ok(Value::Bool(n % 2 != 0))
}

pub fn builtin_even_q(args: &[Value]) -> Result<Value, SchemeError> {
    let n = number_of("even?", args)?.to_int("even?")?;
    Ok(Value::Bool(n % 2 == 0))
}

pub fn builtin_port_q(args: &[Value]) -> Result<Value, SchemeError> {
    Ok(Value::Bool(matches!(
        one_arg("port?", args)?,
        Value::Port(_)
    )))
}

pub fn builtin_input_port_q(args: &[Value]) -> Result<Value, SchemeError> {
    match one_arg("input-port?", args)? {
        Value::Port(port) => Ok(Value::Bool(port.borrow().is_input())),
        _ => Ok(Value::Bool(false)),
    }
}

pub fn builtin_output_port_q(args: &[Value]) -> Result<Value, SchemeError> {
    match one_arg("output-port?", args)? {
        Value::Port(port) => Ok(Value::Bool(port.borrow().is_output())),
        _ => Ok(Value::Bool(false)),
    }
}

// ============================================================================
// Equivalence
// ============================================================================

fn two_args<'a>(function: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), SchemeError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(SchemeError::arity(function, ARITY_TWO, args.len())),
    }
}

pub fn builtin_eqv_q(args: &[Value]) -> Result<Value, SchemeError> {
    let (a, b) = two_args("eqv?", args)?;
    Ok(Value::Bool(a.eqv(b)))
}

pub fn builtin_eq_q(args: &[Value]) -> Result<Value, SchemeError> {
    let (a, b) = two_args("eq?", args)?;
    Ok(Value::Bool(a.eqv(b)))
}

pub fn builtin_equal_q(args: &[Value]) -> Result<Value, SchemeError> {
    let (a, b) = two_args("equal?", args)?;
    Ok(Value::Bool(a.equal(b)))
}

// ============================================================================
// Boolean operations
// ============================================================================

pub fn builtin_not(args: &[Value]) -> Result<Value, SchemeError> {
    Ok(Value::Bool(!one_arg("not", args)?.is_truthy()))
}

/// Returns the first false argument, or the last argument; `(and)` is `#t`.
pub fn builtin_and(args: &[Value]) -> Result<Value, SchemeError> {
    let mut result = Value::Bool(true);
    for arg in args {
        if !arg.is_truthy() {
            return Ok(arg.clone());
        }
        result = arg.clone();
    }
    Ok(result)
}

/// Returns the first true argument; `(or)` is `#f`.
pub fn builtin_or(args: &[Value]) -> Result<Value, SchemeError> {
    for arg in args {
        if arg.is_truthy() {
            return Ok(arg.clone());
        }
    }
    Ok(Value::Bool(false))
}

/// Register all predicate and boolean builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_pure(env, "number?", builtin_number_q);
    super::define_pure(env, "integer?", builtin_integer_q);
    super::define_pure(env, "rational?", builtin_rational_q);
    super::define_pure(env, "real?", builtin_real_q);
    super::define_pure(env, "complex?", builtin_complex_q);
    super::define_pure(env, "zero?", builtin_zero_q);
    super::define_pure(env, "positive?", builtin_positive_q);
    super::define_pure(env, "negative?", builtin_negative_q);
    super::define_pure(env, "odd?", builtin_odd_q);
    super::define_pure(env, "even?", builtin_even_q);
    super::define_pure(env, "boolean?", builtin_boolean_q);
    super::define_pure(env, "string?", builtin_string_q);
    super::define_pure(env, "symbol?", builtin_symbol_q);
    super::define_pure(env, "pair?", builtin_pair_q);
    super::define_pure(env, "list?", builtin_list_q);
    super::define_pure(env, "null?", builtin_null_q);
    super::define_pure(env, "procedure?", builtin_procedure_q);
    super::define_pure(env, "port?", builtin_port_q);
    super::define_pure(env, "input-port?", builtin_input_port_q);
    super::define_pure(env, "output-port?", builtin_output_port_q);
    super::define_pure(env, "promise?", builtin_promise_q);
    super::define_pure(env, "eof-object?", builtin_eof_object_q);
    super::define_pure(env, "eq?", builtin_eq_q);
    super::define_pure(env, "eqv?", builtin_eqv_q);
    super::define_pure(env, "equal?", builtin_equal_q);
    super::define_pure(env, "not", builtin_not);
    super::define_pure(env, "and", builtin_and);
    super::define_pure(env, "or", builtin_or);
    // boolean aliases
    env.define("true".to_string(), Value::Bool(true));
    env.define("false".to_string(), Value::Bool(false));
}
