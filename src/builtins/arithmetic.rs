//! Arithmetic operations over the numeric tower.
//!
//! - `+` / `*`: variadic folds with identities 0 and 1
//! - `-`: subtract rightward, or negate a single argument
//! - `/`: divide rightward, or take the reciprocal of a single argument;
//!   exact integer division yields a rational
//! - `gcd` / `lcm`: integer folds with identities 0 and 1
//! - `quotient` / `remainder` / `modulo`: integer division family
//! - `expt`, `abs`, `min`, `max`, rounding family, `sqrt`, trigonometry
//! - complex constructors and accessors, `numerator` / `denominator`

use crate::env::Environment;
use crate::error::{SchemeError, ARITY_AT_LEAST_ONE, ARITY_ONE_OR_TWO};
use crate::number::{self, Number};
use crate::value::Value;
use std::rc::Rc;

fn number_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Number, SchemeError> {
    match &args[index] {
        Value::Number(n) => Ok(n),
        other => Err(SchemeError::type_error(function, "number", other)),
    }
}

fn int_arg(function: &str, args: &[Value], index: usize) -> Result<i64, SchemeError> {
    match &args[index] {
        Value::Number(n) => n.to_int(function),
        other => Err(SchemeError::type_error(function, "integer", other)),
    }
}

fn expect_arity(function: &str, args: &[Value], count: usize) -> Result<(), SchemeError> {
    if args.len() != count {
        return Err(SchemeError::arity(function, count.to_string(), args.len()));
    }
    Ok(())
}

pub fn builtin_add(args: &[Value]) -> Result<Value, SchemeError> {
    let mut sum = Number::Int(0);
    for index in 0..args.len() {
        sum = sum.add(number_arg("+", args, index)?)?;
    }
    Ok(Value::Number(sum))
}

pub fn builtin_sub(args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Err(SchemeError::arity("-", ARITY_AT_LEAST_ONE, 0));
    }
    let first = *number_arg("-", args, 0)?;
    if args.len() == 1 {
        return Ok(Value::Number(first.neg()?));
    }
    let mut result = first;
    for index in 1..args.len() {
        result = result.sub(number_arg("-", args, index)?)?;
    }
    Ok(Value::Number(result))
}

pub fn builtin_mul(args: &[Value]) -> Result<Value, SchemeError> {
    let mut product = Number::Int(1);
    for index in 0..args.len() {
        product = product.mul(number_arg("*", args, index)?)?;
    }
    Ok(Value::Number(product))
}

pub fn builtin_div(args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Err(SchemeError::arity("/", ARITY_AT_LEAST_ONE, 0));
    }
    let first = *number_arg("/", args, 0)?;
    if args.len() == 1 {
        return Ok(Value::Number(first.recip()?));
    }
    let mut result = first;
    for index in 1..args.len() {
        result = result.div(number_arg("/", args, index)?)?;
    }
    Ok(Value::Number(result))
}

/// `(gcd)` is 0; negative inputs count by magnitude.
pub fn builtin_gcd(args: &[Value]) -> Result<Value, SchemeError> {
    let mut acc = 0i64;
    for index in 0..args.len() {
        acc = number::gcd_i64(acc, int_arg("gcd", args, index)?);
    }
    Ok(Value::Number(Number::Int(acc)))
}

/// `(lcm)` is 1.
pub fn builtin_lcm(args: &[Value]) -> Result<Value, SchemeError> {
    let mut acc = 1i64;
    for index in 0..args.len() {
        acc = number::lcm_i64(acc, int_arg("lcm", args, index)?)?;
    }
    Ok(Value::Number(Number::Int(acc)))
}

pub fn builtin_quotient(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("quotient", args, 2)?;
    let result = number::quotient(int_arg("quotient", args, 0)?, int_arg("quotient", args, 1)?)?;
    Ok(Value::Number(result))
}

pub fn builtin_remainder(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("remainder", args, 2)?;
    let result =
        number::remainder(int_arg("remainder", args, 0)?, int_arg("remainder", args, 1)?)?;
    Ok(Value::Number(result))
}

pub fn builtin_modulo(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("modulo", args, 2)?;
    let result = number::modulo(int_arg("modulo", args, 0)?, int_arg("modulo", args, 1)?)?;
    Ok(Value::Number(result))
}

pub fn builtin_expt(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("expt", args, 2)?;
    let base = number_arg("expt", args, 0)?;
    let exponent = number_arg("expt", args, 1)?;
    Ok(Value::Number(base.expt(exponent)?))
}

pub fn builtin_abs(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("abs", args, 1)?;
    Ok(Value::Number(number_arg("abs", args, 0)?.abs()?))
}

pub fn builtin_min(args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Err(SchemeError::arity("min", ARITY_AT_LEAST_ONE, 0));
    }
    let mut best = *number_arg("min", args, 0)?;
    for index in 1..args.len() {
        let candidate = *number_arg("min", args, index)?;
        if candidate.lt(&best)? {
            best = candidate;
        }
    }
    Ok(Value::Number(best))
}

pub fn builtin_max(args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Err(SchemeError::arity("max", ARITY_AT_LEAST_ONE, 0));
    }
    let mut best = *number_arg("max", args, 0)?;
    for index in 1..args.len() {
        let candidate = *number_arg("max", args, index)?;
        if candidate.gt(&best)? {
            best = candidate;
        }
    }
    Ok(Value::Number(best))
}

pub fn builtin_floor(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("floor", args, 1)?;
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()?))
}

pub fn builtin_ceiling(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("ceiling", args, 1)?;
    Ok(Value::Number(number_arg("ceiling", args, 0)?.ceiling()?))
}

pub fn builtin_truncate(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("truncate", args, 1)?;
    Ok(Value::Number(number_arg("truncate", args, 0)?.truncate()?))
}

pub fn builtin_round(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("round", args, 1)?;
    Ok(Value::Number(number_arg("round", args, 0)?.round()?))
}

pub fn builtin_sqrt(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("sqrt", args, 1)?;
    Ok(Value::Number(number_arg("sqrt", args, 0)?.sqrt()?))
}

macro_rules! trig {
    ($rust_name:ident, $name:literal, $method:ident) => {
        pub fn $rust_name(args: &[Value]) -> Result<Value, SchemeError> {
            expect_arity($name, args, 1)?;
            let x = number_arg($name, args, 0)?.to_f64($name)?;
            Ok(Value::Number(Number::Real(x.$method())))
        }
    };
}

trig!(builtin_sin, "sin", sin);
trig!(builtin_cos, "cos", cos);
trig!(builtin_tan, "tan", tan);
trig!(builtin_asin, "asin", asin);
trig!(builtin_acos, "acos", acos);

/// One argument is the plain arctangent; two is `(atan y x)`.
pub fn builtin_atan(args: &[Value]) -> Result<Value, SchemeError> {
    match args.len() {
        1 => {
            let x = number_arg("atan", args, 0)?.to_f64("atan")?;
            Ok(Value::Number(Number::Real(x.atan())))
        }
        2 => {
            let y = number_arg("atan", args, 0)?.to_f64("atan")?;
            let x = number_arg("atan", args, 1)?.to_f64("atan")?;
            Ok(Value::Number(Number::Real(y.atan2(x))))
        }
        n => Err(SchemeError::arity("atan", ARITY_ONE_OR_TWO, n)),
    }
}

// ============================================================================
// Complex numbers and rational accessors
// ============================================================================

pub fn builtin_make_rectangular(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("make-rectangular", args, 2)?;
    let re = number_arg("make-rectangular", args, 0)?.to_f64("make-rectangular")?;
    let im = number_arg("make-rectangular", args, 1)?.to_f64("make-rectangular")?;
    Ok(Value::Number(Number::Complex(re, im)))
}

pub fn builtin_real_part(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("real-part", args, 1)?;
    match number_arg("real-part", args, 0)? {
        Number::Complex(re, _) => Ok(Value::Number(Number::Real(*re))),
        real => Ok(Value::Number(*real)),
    }
}

pub fn builtin_imag_part(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("imag-part", args, 1)?;
    match number_arg("imag-part", args, 0)? {
        Number::Complex(_, im) => Ok(Value::Number(Number::Real(*im))),
        _ => Ok(Value::Number(Number::Int(0))),
    }
}

pub fn builtin_magnitude(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("magnitude", args, 1)?;
    match number_arg("magnitude", args, 0)? {
        Number::Complex(re, im) => Ok(Value::Number(Number::Real(re.hypot(*im)))),
        real => Ok(Value::Number(real.abs()?)),
    }
}

pub fn builtin_numerator(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("numerator", args, 1)?;
    match number_arg("numerator", args, 0)? {
        Number::Int(n) => Ok(Value::Number(Number::Int(*n))),
        Number::Rational(p, _) => Ok(Value::Number(Number::Int(*p))),
        other => Err(SchemeError::type_error(
            "numerator",
            "exact number",
            &Value::Number(*other),
        )),
    }
}

pub fn builtin_denominator(args: &[Value]) -> Result<Value, SchemeError> {
    expect_arity("denominator", args, 1)?;
    match number_arg("denominator", args, 0)? {
        Number::Int(_) => Ok(Value::Number(Number::Int(1))),
        Number::Rational(_, q) => Ok(Value::Number(Number::Int(*q))),
        other => Err(SchemeError::type_error(
            "denominator",
            "exact number",
            &Value::Number(*other),
        )),
    }
}

/// Register all arithmetic builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_pure(env, "+", builtin_add);
    super::define_pure(env, "-", builtin_sub);
    super::define_pure(env, "*", builtin_mul);
    super::define_pure(env, "/", builtin_div);
    super::define_pure(env, "gcd", builtin_gcd);
    super::define_pure(env, "lcm", builtin_lcm);
    super::define_pure(env, "quotient", builtin_quotient);
    super::define_pure(env, "remainder", builtin_remainder);
    super::define_pure(env, "modulo", builtin_modulo);
    super::define_pure(env, "expt", builtin_expt);
    super::define_pure(env, "abs", builtin_abs);
    super::define_pure(env, "min", builtin_min);
    super::define_pure(env, "max", builtin_max);
    super::define_pure(env, "floor", builtin_floor);
    super::define_pure(env, "ceiling", builtin_ceiling);
    super::define_pure(env, "truncate", builtin_truncate);
    super::define_pure(env, "round", builtin_round);
    super::define_pure(env, "sqrt", builtin_sqrt);
    super::define_pure(env, "sin", builtin_sin);
    super::define_pure(env, "cos", builtin_cos);
    super::define_pure(env, "tan", builtin_tan);
    super::define_pure(env, "asin", builtin_asin);
    super::define_pure(env, "acos", builtin_acos);
    super::define_pure(env, "atan", builtin_atan);
    super::define_pure(env, "make-rectangular", builtin_make_rectangular);
    super::define_pure(env, "real-part", builtin_real_part);
    super::define_pure(env, "imag-part", builtin_imag_part);
    super::define_pure(env, "magnitude", builtin_magnitude);
    super::define_pure(env, "numerator", builtin_numerator);
    super::define_pure(env, "denominator", builtin_denominator);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    #[test]
    fn test_add_identity_and_fold() {
        assert_eq!(builtin_add(&[]).unwrap().to_string(), "0");
        assert_eq!(
            builtin_add(&[int(1), int(2), int(3)]).unwrap().to_string(),
            "6"
        );
    }

    #[test]
    fn test_unary_minus_negates() {
        assert_eq!(builtin_sub(&[int(5)]).unwrap().to_string(), "-5");
        assert_eq!(builtin_sub(&[int(10), int(3), int(2)]).unwrap().to_string(), "5");
        assert!(builtin_sub(&[]).is_err());
    }

    #[test]
    fn test_unary_div_reciprocates() {
        assert_eq!(builtin_div(&[int(4)]).unwrap().to_string(), "1/4");
        assert_eq!(builtin_div(&[int(1), int(3)]).unwrap().to_string(), "1/3");
        assert!(builtin_div(&[int(1), int(0)]).is_err());
    }

    #[test]
    fn test_gcd_lcm_identities() {
        assert_eq!(builtin_gcd(&[]).unwrap().to_string(), "0");
        assert_eq!(builtin_lcm(&[]).unwrap().to_string(), "1");
        assert_eq!(builtin_gcd(&[int(12), int(18)]).unwrap().to_string(), "6");
        assert_eq!(builtin_lcm(&[int(4), int(6)]).unwrap().to_string(), "12");
    }

    #[test]
    fn test_integer_ops_reject_non_integers() {
        let half = Value::Number(Number::Rational(1, 2));
        assert!(builtin_gcd(&[half.clone()]).is_err());
        assert!(builtin_modulo(&[int(1), half]).is_err());
    }

    #[test]
    fn test_type_error_on_non_number() {
        assert!(builtin_add(&[Value::Bool(true)]).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(builtin_min(&[int(3), int(1), int(2)]).unwrap().to_string(), "1");
        assert_eq!(builtin_max(&[int(3), int(1), int(2)]).unwrap().to_string(), "3");
    }

    #[test]
    fn test_complex_accessors() {
        let z = builtin_make_rectangular(&[int(3), int(4)]).unwrap();
        assert_eq!(z.to_string(), "3+4i");
        assert_eq!(builtin_real_part(&[z.clone()]).unwrap().to_string(), "3.0");
        assert_eq!(builtin_imag_part(&[z.clone()]).unwrap().to_string(), "4.0");
        assert_eq!(builtin_magnitude(&[z]).unwrap().to_string(), "5.0");
        assert_eq!(builtin_imag_part(&[int(3)]).unwrap().to_string(), "0");
    }

    #[test]
    fn test_numerator_denominator() {
        let half = Value::Number(Number::Rational(1, 2));
        assert_eq!(builtin_numerator(&[half.clone()]).unwrap().to_string(), "1");
        assert_eq!(builtin_denominator(&[half]).unwrap().to_string(), "2");
        assert_eq!(builtin_denominator(&[int(5)]).unwrap().to_string(), "1");
        assert!(builtin_numerator(&[Value::Number(Number::Real(0.5))]).is_err());
    }
}
