//! Higher-order control: eval, apply, map, force, load and the promise
//! observers.
//!
//! `eval`, `apply`, `map` and `load` are registered as environment-taking
//! primitives because they re-enter the evaluator; the rest are ordinary
//! procedures.

use crate::env::Environment;
use crate::error::{SchemeError, ARITY_AT_LEAST_TWO, ARITY_ONE};
use crate::eval::{apply_procedure, eval, eval_source, force_value, value_to_datum};
use crate::expand::expand;
use crate::value::{list_from_vec, list_to_vec, PromiseState, Value};
use std::rc::Rc;

/// `(eval datum)`: convert runtime data back into a code tree, expand it,
/// and evaluate in the caller's environment.
pub fn builtin_eval(args: &[Value], env: &Rc<Environment>) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("eval", ARITY_ONE, args.len()));
    }
    let core = expand(value_to_datum(&args[0]), true)?;
    eval(core, env.clone())
}

/// `(apply f a b '(c d))` calls `f` with `(a b c d)`; the last argument
/// must be a proper list.
pub fn builtin_apply(args: &[Value], env: &Rc<Environment>) -> Result<Value, SchemeError> {
    if args.len() < 2 {
        return Err(SchemeError::arity("apply", ARITY_AT_LEAST_TWO, args.len()));
    }
    let func = &args[0];
    let (tail, middle) = match args[1..].split_last() {
        Some(split) => split,
        None => return Err(SchemeError::arity("apply", ARITY_AT_LEAST_TWO, args.len())),
    };
    let mut call_args = middle.to_vec();
    match list_to_vec(tail) {
        Some(rest) => call_args.extend(rest),
        None => return Err(SchemeError::type_error("apply", "proper list", tail)),
    }
    apply_procedure(func, call_args, env)
}

/// `(map f list...)` folds over the shortest input list.
pub fn builtin_map(args: &[Value], env: &Rc<Environment>) -> Result<Value, SchemeError> {
    if args.len() < 2 {
        return Err(SchemeError::arity("map", ARITY_AT_LEAST_TWO, args.len()));
    }
    let func = &args[0];
    let mut lists = Vec::with_capacity(args.len() - 1);
    for arg in &args[1..] {
        match list_to_vec(arg) {
            Some(items) => lists.push(items),
            None => return Err(SchemeError::type_error("map", "proper list", arg)),
        }
    }
    let rounds = lists.iter().map(Vec::len).min().unwrap_or(0);
    let mut results = Vec::with_capacity(rounds);
    for index in 0..rounds {
        let row: Vec<Value> = lists.iter().map(|list| list[index].clone()).collect();
        results.push(apply_procedure(func, row, env)?);
    }
    Ok(list_from_vec(results))
}

pub fn builtin_force(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("force", ARITY_ONE, args.len()));
    }
    force_value(&args[0])
}

pub fn builtin_promise_forced_q(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("promise-forced?", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Promise(cell) => Ok(Value::Bool(matches!(
            cell.borrow().state,
            PromiseState::Forced(_)
        ))),
        other => Err(SchemeError::type_error("promise-forced?", "promise", other)),
    }
}

pub fn builtin_promise_value(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("promise-value", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Promise(cell) => match &cell.borrow().state {
            PromiseState::Forced(value) => Ok(value.clone()),
            PromiseState::Unforced => {
                Err(SchemeError::runtime("promise-value: the promise has not been forced"))
            }
        },
        other => Err(SchemeError::type_error("promise-value", "promise", other)),
    }
}

/// `(load path)`: evaluate a source file in the caller's environment.
pub fn builtin_load(args: &[Value], env: &Rc<Environment>) -> Result<Value, SchemeError> {
    let path = match args {
        [Value::Str(path)] => path,
        [other] => return Err(SchemeError::type_error("load", "string", other)),
        _ => return Err(SchemeError::arity("load", ARITY_ONE, args.len())),
    };
    let source =
        std::fs::read_to_string(path).map_err(|e| SchemeError::io(format!("{}: {}", path, e)))?;
    eval_source(&source, env)?;
    Ok(Value::Unspecified)
}

/// Register all control builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_with_env(env, "eval", builtin_eval);
    super::define_with_env(env, "apply", builtin_apply);
    super::define_with_env(env, "map", builtin_map);
    super::define_with_env(env, "load", builtin_load);
    super::define_pure(env, "force", builtin_force);
    super::define_pure(env, "promise-forced?", builtin_promise_forced_q);
    super::define_pure(env, "promise-value", builtin_promise_value);
}
