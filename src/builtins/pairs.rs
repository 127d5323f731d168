//! Pair and list operations.
//!
//! - `cons` / `car` / `cdr`: the cell primitives
//! - `set-car!` / `set-cdr!`: in-place mutation of a shared cell; every
//!   holder of the pair observes the change
//! - `list` / `length` / `list-ref` / `list-set!` / `make-list`
//! - `append` / `reverse`

use crate::env::Environment;
use crate::error::{SchemeError, ARITY_ONE, ARITY_THREE, ARITY_TWO};
use crate::number::Number;
use crate::value::{cons, list_from_vec, list_to_vec, PairCell, Value};
use std::rc::Rc;

fn pair_arg<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a Rc<PairCell>, SchemeError> {
    match &args[index] {
        Value::Pair(cell) => Ok(cell),
        other => Err(SchemeError::type_error(function, "pair", other)),
    }
}

fn list_arg(function: &str, args: &[Value], index: usize) -> Result<Vec<Value>, SchemeError> {
    list_to_vec(&args[index])
        .ok_or_else(|| SchemeError::type_error(function, "proper list", &args[index]))
}

fn index_arg(function: &str, args: &[Value], index: usize, len: usize) -> Result<usize, SchemeError> {
    let n = match &args[index] {
        Value::Number(n) => n.to_int(function)?,
        other => return Err(SchemeError::type_error(function, "integer", other)),
    };
    usize::try_from(n)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| SchemeError::runtime(format!("{}: index {} out of range", function, n)))
}

pub fn builtin_cons(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 2 {
        return Err(SchemeError::arity("cons", ARITY_TWO, args.len()));
    }
    Ok(cons(args[0].clone(), args[1].clone()))
}

pub fn builtin_car(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("car", ARITY_ONE, args.len()));
    }
    Ok(pair_arg("car", args, 0)?.car.borrow().clone())
}

pub fn builtin_cdr(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("cdr", ARITY_ONE, args.len()));
    }
    Ok(pair_arg("cdr", args, 0)?.cdr.borrow().clone())
}

pub fn builtin_set_car(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 2 {
        return Err(SchemeError::arity("set-car!", ARITY_TWO, args.len()));
    }
    let cell = pair_arg("set-car!", args, 0)?;
    *cell.car.borrow_mut() = args[1].clone();
    Ok(args[0].clone())
}

pub fn builtin_set_cdr(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 2 {
        return Err(SchemeError::arity("set-cdr!", ARITY_TWO, args.len()));
    }
    let cell = pair_arg("set-cdr!", args, 0)?;
    *cell.cdr.borrow_mut() = args[1].clone();
    Ok(args[0].clone())
}

pub fn builtin_list(args: &[Value]) -> Result<Value, SchemeError> {
    Ok(list_from_vec(args.to_vec()))
}

pub fn builtin_length(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("length", ARITY_ONE, args.len()));
    }
    let items = list_arg("length", args, 0)?;
    Ok(Value::Number(Number::Int(items.len() as i64)))
}

pub fn builtin_list_ref(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 2 {
        return Err(SchemeError::arity("list-ref", ARITY_TWO, args.len()));
    }
    let items = list_arg("list-ref", args, 0)?;
    let index = index_arg("list-ref", args, 1, items.len())?;
    Ok(items[index].clone())
}

pub fn builtin_list_set(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 3 {
        return Err(SchemeError::arity("list-set!", ARITY_THREE, args.len()));
    }
    let items = list_arg("list-set!", args, 0)?;
    let index = index_arg("list-set!", args, 1, items.len())?;
    // Walk the spine to the target cell and replace its car
    let mut cursor = args[0].clone();
    for _ in 0..index {
        let next = match &cursor {
            Value::Pair(cell) => cell.cdr.borrow().clone(),
            _ => unreachable!("index checked against the spine length"),
        };
        cursor = next;
    }
    match &cursor {
        Value::Pair(cell) => *cell.car.borrow_mut() = args[2].clone(),
        _ => unreachable!("index checked against the spine length"),
    }
    Ok(Value::Unspecified)
}

pub fn builtin_make_list(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 2 {
        return Err(SchemeError::arity("make-list", ARITY_TWO, args.len()));
    }
    let count = match &args[0] {
        Value::Number(n) => n.to_int("make-list")?,
        other => return Err(SchemeError::type_error("make-list", "integer", other)),
    };
    let count = usize::try_from(count)
        .map_err(|_| SchemeError::runtime(format!("make-list: invalid length {}", count)))?;
    Ok(list_from_vec(vec![args[1].clone(); count]))
}

/// Every argument but the last must be a proper list; the last becomes the
/// tail of the result, so `(append '(1) 2)` is `(1 . 2)`.
pub fn builtin_append(args: &[Value]) -> Result<Value, SchemeError> {
    let (last, front) = match args.split_last() {
        Some(split) => split,
        None => return Ok(Value::Nil),
    };
    let mut elements = Vec::new();
    for index in 0..front.len() {
        elements.extend(list_arg("append", args, index)?);
    }
    let mut result = last.clone();
    for element in elements.into_iter().rev() {
        result = cons(element, result);
    }
    Ok(result)
}

pub fn builtin_reverse(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("reverse", ARITY_ONE, args.len()));
    }
    let mut items = list_arg("reverse", args, 0)?;
    items.reverse();
    Ok(list_from_vec(items))
}

/// Register all pair and list builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_pure(env, "cons", builtin_cons);
    super::define_pure(env, "car", builtin_car);
    super::define_pure(env, "cdr", builtin_cdr);
    super::define_pure(env, "set-car!", builtin_set_car);
    super::define_pure(env, "set-cdr!", builtin_set_cdr);
    super::define_pure(env, "list", builtin_list);
    super::define_pure(env, "length", builtin_length);
    super::define_pure(env, "list-ref", builtin_list_ref);
    super::define_pure(env, "list-set!", builtin_list_set);
    super::define_pure(env, "make-list", builtin_make_list);
    super::define_pure(env, "append", builtin_append);
    super::define_pure(env, "reverse", builtin_reverse);
}
