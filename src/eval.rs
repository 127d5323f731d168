// ABOUTME: Trampoline evaluator executing expanded core forms

use crate::env::Environment;
use crate::error::SchemeError;
use crate::expand::expand;
use crate::lexer::Lexer;
use crate::reader::{read, ReadOutcome};
use crate::value::{
    cons, list_from_vec, list_to_vec, Formals, NativeFn, Primitive, Procedure, Promise,
    PromiseState, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Evaluate an expanded core form. The loop is a trampoline: tail positions
/// rebind `expr` and `env` and continue instead of recursing, so `cond`,
/// `case`, `begin`, `do` and user procedure calls consume no host stack.
pub fn eval(mut expr: Value, env: Rc<Environment>) -> Result<Value, SchemeError> {
    let mut env = env;
    loop {
        let items = match expr {
            Value::Symbol(name) => return env.lookup(&name),
            Value::Seq(items) => {
                if items.is_empty() {
                    return Ok(Value::Nil);
                }
                items
            }
            // Everything else is self-evaluating
            other => return Ok(other),
        };
        let head = match &items[0] {
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        };
        match head {
            Some("quote") => return datum_to_value(part(&items, 1)?),
            Some("define") => {
                let name = symbol_part(&items, 1)?;
                let value = eval(part(&items, 2)?.clone(), env.clone())?;
                env.define(name.clone(), value);
                return Ok(Value::Symbol(name));
            }
            Some("lambda") => return make_procedure(&items, &env),
            Some("set!") => {
                let name = symbol_part(&items, 1)?;
                let value = eval(part(&items, 2)?.clone(), env.clone())?;
                return env.assign(&name, value);
            }
            Some("delay") => {
                return Ok(Value::Promise(Rc::new(RefCell::new(Promise {
                    body: part(&items, 1)?.clone(),
                    env: env.clone(),
                    state: PromiseState::Unforced,
                }))));
            }
            Some("force") => {
                let promise = eval(part(&items, 1)?.clone(), env.clone())?;
                return force_value(&promise);
            }
            Some("quasiquote") => return eval_quasiquote(part(&items, 1)?, 1, &env),
            Some("cond") => {
                let mut chosen = None;
                for clause in &items[1..] {
                    let parts = clause_parts(clause)?;
                    if matches!(&parts[0], Value::Symbol(s) if s == "else") {
                        chosen = Some(begin_of(&parts[1..]));
                        break;
                    }
                    let test = eval(parts[0].clone(), env.clone())?;
                    if test.is_truthy() {
                        if parts.len() == 1 {
                            return Ok(test);
                        }
                        chosen = Some(begin_of(&parts[1..]));
                        break;
                    }
                }
                match chosen {
                    Some(next) => expr = next,
                    None => return Ok(Value::Unspecified),
                }
            }
            Some("case") => {
                let key = eval(part(&items, 1)?.clone(), env.clone())?;
                let mut chosen = None;
                'clauses: for clause in &items[2..] {
                    let parts = clause_parts(clause)?;
                    if matches!(&parts[0], Value::Symbol(s) if s == "else") {
                        chosen = Some(begin_of(&parts[1..]));
                        break;
                    }
                    for datum in case_datums(&parts[0])? {
                        if key.eqv(&datum_to_value(datum)?) {
                            chosen = Some(begin_of(&parts[1..]));
                            break 'clauses;
                        }
                    }
                }
                match chosen {
                    Some(next) => expr = next,
                    None => return Ok(Value::Unspecified),
                }
            }
            Some("do") => {
                // Bind each parm to its init evaluated in the outer frame
                let frame = Environment::with_parent(env.clone());
                let mut steps = Vec::new();
                for binding in seq_parts(part(&items, 1)?)? {
                    let parts = clause_parts(binding)?;
                    let name = match &parts[0] {
                        Value::Symbol(s) => s.clone(),
                        other => return Err(malformed(other)),
                    };
                    let init = eval(parts[1].clone(), env.clone())?;
                    frame.define(name.clone(), init);
                    steps.push((name, parts.get(2).cloned()));
                }
                let test_clause = seq_parts(part(&items, 2)?)?;
                let (test, result) = (&test_clause[0], &test_clause[1]);
                loop {
                    if eval(test.clone(), frame.clone())?.is_truthy() {
                        expr = result.clone();
                        env = frame;
                        break;
                    }
                    for form in &items[3..] {
                        eval(form.clone(), frame.clone())?;
                    }
                    // All steps evaluate before any parm rebinds
                    let mut next = Vec::with_capacity(steps.len());
                    for (name, step) in &steps {
                        if let Some(step) = step {
                            next.push((name.clone(), eval(step.clone(), frame.clone())?));
                        }
                    }
                    for (name, value) in next {
                        frame.define(name, value);
                    }
                }
            }
            Some("begin") => {
                for form in &items[1..items.len() - 1] {
                    eval(form.clone(), env.clone())?;
                }
                expr = items[items.len() - 1].clone();
            }
            _ => {
                // (proc args...): head and arguments left to right
                let func = eval(items[0].clone(), env.clone())?;
                let mut args = Vec::with_capacity(items.len() - 1);
                for arg in &items[1..] {
                    args.push(eval(arg.clone(), env.clone())?);
                }
                match func {
                    Value::Procedure(procedure) => {
                        let frame = bind_formals(&procedure, args)?;
                        expr = procedure.body.clone();
                        env = frame;
                    }
                    Value::Primitive(primitive) => return call_primitive(&primitive, &args, &env),
                    other => return Err(SchemeError::type_error("apply", "procedure", &other)),
                }
            }
        }
    }
}

fn malformed(form: &Value) -> SchemeError {
    SchemeError::syntax(form, "malformed core form")
}

fn part<'a>(items: &'a [Value], index: usize) -> Result<&'a Value, SchemeError> {
    items
        .get(index)
        .ok_or_else(|| malformed(&Value::Seq(items.to_vec())))
}

fn symbol_part(items: &[Value], index: usize) -> Result<String, SchemeError> {
    match part(items, index)? {
        Value::Symbol(s) => Ok(s.clone()),
        other => Err(malformed(other)),
    }
}

fn seq_parts(value: &Value) -> Result<&[Value], SchemeError> {
    match value {
        Value::Seq(items) => Ok(items),
        other => Err(malformed(other)),
    }
}

fn clause_parts(value: &Value) -> Result<&[Value], SchemeError> {
    let parts = seq_parts(value)?;
    if parts.is_empty() {
        return Err(malformed(value));
    }
    Ok(parts)
}

/// The datum list of an expanded `case` clause, `(quote (d...))`.
fn case_datums(quoted: &Value) -> Result<&[Value], SchemeError> {
    match seq_parts(quoted)? {
        [Value::Symbol(q), Value::Seq(datums)] if q == "quote" => Ok(datums),
        _ => Err(malformed(quoted)),
    }
}

/// A clause body as a single tail expression.
fn begin_of(forms: &[Value]) -> Value {
    match forms {
        [single] => single.clone(),
        _ => {
            let mut out = vec![Value::symbol("begin")];
            out.extend_from_slice(forms);
            Value::Seq(out)
        }
    }
}

fn make_procedure(items: &[Value], env: &Rc<Environment>) -> Result<Value, SchemeError> {
    let formals = match part(items, 1)? {
        Value::Symbol(name) => Formals::Variadic(name.clone()),
        Value::Seq(names) => {
            let mut fixed = Vec::with_capacity(names.len());
            for name in names {
                match name {
                    Value::Symbol(s) => fixed.push(s.clone()),
                    other => return Err(malformed(other)),
                }
            }
            Formals::Fixed(fixed)
        }
        other => return Err(malformed(other)),
    };
    Ok(Value::Procedure(Rc::new(Procedure {
        formals,
        body: part(items, 2)?.clone(),
        env: env.clone(),
    })))
}

/// New frame for a procedure application, parented on the closure's
/// defining frame.
fn bind_formals(procedure: &Procedure, args: Vec<Value>) -> Result<Rc<Environment>, SchemeError> {
    let frame = Environment::with_parent(procedure.env.clone());
    match &procedure.formals {
        Formals::Fixed(names) => {
            if names.len() != args.len() {
                return Err(SchemeError::arity(
                    "procedure",
                    names.len().to_string(),
                    args.len(),
                ));
            }
            for (name, arg) in names.iter().zip(args) {
                frame.define(name.clone(), arg);
            }
        }
        Formals::Variadic(name) => {
            frame.define(name.clone(), list_from_vec(args));
        }
    }
    Ok(frame)
}

/// Apply a procedure or primitive to already-evaluated arguments. Used by
/// the primitives that invoke closures (`map`, `apply`, `eval`).
pub fn apply_procedure(
    func: &Value,
    args: Vec<Value>,
    env: &Rc<Environment>,
) -> Result<Value, SchemeError> {
    match func {
        Value::Procedure(procedure) => {
            let frame = bind_formals(procedure, args)?;
            eval(procedure.body.clone(), frame)
        }
        Value::Primitive(primitive) => call_primitive(primitive, &args, env),
        other => Err(SchemeError::type_error("apply", "procedure", other)),
    }
}

fn call_primitive(
    primitive: &Primitive,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, SchemeError> {
    match primitive.func {
        NativeFn::Pure(f) => f(args),
        NativeFn::WithEnv(f) => f(args, env),
    }
}

/// Force a promise: evaluate the body once in the captured environment,
/// cache the result, return the cached value ever after.
pub fn force_value(value: &Value) -> Result<Value, SchemeError> {
    let cell = match value {
        Value::Promise(cell) => cell.clone(),
        other => return Err(SchemeError::type_error("force", "promise", other)),
    };
    let (body, env) = {
        let promise = cell.borrow();
        if let PromiseState::Forced(cached) = &promise.state {
            return Ok(cached.clone());
        }
        (promise.body.clone(), promise.env.clone())
    };
    let result = eval(body, env)?;
    cell.borrow_mut().state = PromiseState::Forced(result.clone());
    Ok(result)
}

// ============================================================================
// Quote conversion
// ============================================================================

/// Turn a raw quoted tree into runtime data: sequences become pair-chain
/// lists, a trailing `. x` marker builds a dotted chain, atoms stand alone.
pub fn datum_to_value(datum: &Value) -> Result<Value, SchemeError> {
    let items = match datum {
        Value::Seq(items) => items,
        other => return Ok(other.clone()),
    };
    if items.is_empty() {
        return Ok(Value::Nil);
    }
    let dotted =
        items.len() >= 3 && matches!(&items[items.len() - 2], Value::Symbol(s) if s == ".");
    let (proper, mut tail) = if dotted {
        (
            &items[..items.len() - 2],
            datum_to_value(&items[items.len() - 1])?,
        )
    } else {
        (&items[..], Value::Nil)
    };
    for item in proper.iter().rev() {
        if matches!(item, Value::Symbol(s) if s == ".") {
            return Err(SchemeError::syntax(datum, "ill-formed dotted list"));
        }
        tail = cons(datum_to_value(item)?, tail);
    }
    Ok(tail)
}

/// The inverse conversion, used by the `eval` primitive: pair chains become
/// sequences ready for expansion.
pub fn value_to_datum(value: &Value) -> Value {
    match value {
        Value::Nil => Value::Seq(Vec::new()),
        Value::Pair(_) => {
            let mut out = Vec::new();
            let mut cursor = value.clone();
            loop {
                match cursor {
                    Value::Nil => return Value::Seq(out),
                    Value::Pair(cell) => {
                        out.push(value_to_datum(&cell.car.borrow()));
                        let next = cell.cdr.borrow().clone();
                        cursor = next;
                    }
                    improper => {
                        out.push(Value::symbol("."));
                        out.push(value_to_datum(&improper));
                        return Value::Seq(out);
                    }
                }
            }
        }
        other => other.clone(),
    }
}

// ============================================================================
// Quasiquote
// ============================================================================

/// Walk a quasiquote template, evaluating unquoted payloads at depth 1 and
/// rebuilding everything else as list structure.
fn eval_quasiquote(
    template: &Value,
    depth: usize,
    env: &Rc<Environment>,
) -> Result<Value, SchemeError> {
    let items = match template {
        Value::Seq(items) if !items.is_empty() => items,
        Value::Seq(_) => return Ok(Value::Nil),
        other => return Ok(other.clone()),
    };
    match &items[0] {
        Value::Symbol(s) if s == "unquote" => {
            if depth == 1 {
                eval(part(items, 1)?.clone(), env.clone())
            } else {
                let inner = eval_quasiquote(part(items, 1)?, depth - 1, env)?;
                Ok(list_from_vec(vec![Value::symbol("unquote"), inner]))
            }
        }
        Value::Symbol(s) if s == "quasiquote" => {
            let inner = eval_quasiquote(part(items, 1)?, depth + 1, env)?;
            Ok(list_from_vec(vec![Value::symbol("quasiquote"), inner]))
        }
        _ => {
            let dotted =
                items.len() >= 3 && matches!(&items[items.len() - 2], Value::Symbol(s) if s == ".");
            let (proper, mut tail) = if dotted {
                (
                    &items[..items.len() - 2],
                    eval_quasiquote(&items[items.len() - 1], depth, env)?,
                )
            } else {
                (&items[..], Value::Nil)
            };
            let mut out = Vec::with_capacity(proper.len());
            for item in proper {
                if let Value::Seq(parts) = item {
                    if matches!(parts.first(), Some(Value::Symbol(s)) if s == "unquote-splicing") {
                        if depth == 1 {
                            let spliced = eval(part(parts, 1)?.clone(), env.clone())?;
                            match list_to_vec(&spliced) {
                                Some(elements) => out.extend(elements),
                                None => {
                                    return Err(SchemeError::type_error(
                                        "unquote-splicing",
                                        "proper list",
                                        &spliced,
                                    ))
                                }
                            }
                            continue;
                        }
                        let inner = eval_quasiquote(part(parts, 1)?, depth - 1, env)?;
                        out.push(list_from_vec(vec![
                            Value::symbol("unquote-splicing"),
                            inner,
                        ]));
                        continue;
                    }
                }
                out.push(eval_quasiquote(item, depth, env)?);
            }
            for element in out.into_iter().rev() {
                tail = cons(element, tail);
            }
            Ok(tail)
        }
    }
}

// ============================================================================
// Source driver
// ============================================================================

/// Read, expand and evaluate every datum in a source string, returning the
/// last result. Script mode, `load` and the startup prelude all run
/// through here.
pub fn eval_source(source: &str, env: &Rc<Environment>) -> Result<Value, SchemeError> {
    let mut lexer = Lexer::new(source);
    let mut result = Value::Unspecified;
    loop {
        match read(&mut lexer)? {
            ReadOutcome::Datum(datum) => {
                let core = expand(datum, true)?;
                result = eval(core, env.clone())?;
            }
            ReadOutcome::Eof => return Ok(result),
            ReadOutcome::StrayClose => {
                return Err(SchemeError::Syntax {
                    form: ")".to_string(),
                    message: "unexpected closing parenthesis".to_string(),
                })
            }
            ReadOutcome::Incomplete => {
                return Err(SchemeError::Syntax {
                    form: "end of input".to_string(),
                    message: "datum left unterminated".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::number::Number;

    fn setup() -> Rc<Environment> {
        builtins::initial_env().expect("initial environment should build")
    }

    fn run(source: &str, env: &Rc<Environment>) -> Value {
        eval_source(source, env).unwrap()
    }

    fn printed(source: &str) -> String {
        run(source, &setup()).to_string()
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(printed("42"), "42");
        assert_eq!(printed("#t"), "#t");
        assert_eq!(printed("\"hi\""), "\"hi\"");
        assert_eq!(printed("()"), "()");
    }

    #[test]
    fn test_symbol_lookup_and_unbound() {
        let env = setup();
        env.define("x".to_string(), Value::Number(Number::Int(7)));
        assert_eq!(run("x", &env).to_string(), "7");
        assert!(matches!(
            eval_source("ghost", &env),
            Err(SchemeError::Lookup(_))
        ));
    }

    #[test]
    fn test_define_returns_symbol() {
        assert_eq!(printed("(define x 42)"), "x");
    }

    #[test]
    fn test_set_returns_prior_value() {
        let env = setup();
        run("(define x 1)", &env);
        assert_eq!(run("(set! x 2)", &env).to_string(), "1");
        assert_eq!(run("x", &env).to_string(), "2");
    }

    #[test]
    fn test_set_unbound_fails() {
        assert!(eval_source("(set! ghost 1)", &setup()).is_err());
    }

    #[test]
    fn test_quote_builds_runtime_lists() {
        assert_eq!(printed("'(1 2 3)"), "(1 2 3)");
        assert_eq!(printed("'(1 . 2)"), "(1 . 2)");
        assert_eq!(printed("'sym"), "sym");
        assert_eq!(printed("'()"), "()");
        assert_eq!(printed("''a"), "(quote a)");
    }

    #[test]
    fn test_if_and_truthiness() {
        assert_eq!(printed("(if #t 1 2)"), "1");
        assert_eq!(printed("(if #f 1 2)"), "2");
        // only #f is false
        assert_eq!(printed("(if '() 1 2)"), "1");
        assert_eq!(printed("(if 0 1 2)"), "1");
        assert_eq!(printed("(if \"\" 1 2)"), "1");
    }

    #[test]
    fn test_cond_clause_forms() {
        assert_eq!(printed("(cond (#f 1) (#t 2) (else 3))"), "2");
        assert_eq!(printed("(cond (#f 1) (else 3))"), "3");
        // a test-only clause yields the test's value
        assert_eq!(printed("(cond (#f) (42))"), "42");
        // a quoted empty list is a taken test
        assert_eq!(printed("(cond ('() 3))"), "3");
    }

    #[test]
    fn test_case_matches_with_eqv() {
        let env = setup();
        assert_eq!(
            run(
                "(case (* 2 3) ((2 3 5 7) 'prime) ((1 4 6 8 9) 'composite))",
                &env
            )
            .to_string(),
            "composite"
        );
        assert_eq!(
            run("(case 9 ((1 2) 'small) (else 'big))", &env).to_string(),
            "big"
        );
    }

    #[test]
    fn test_begin_sequences() {
        let env = setup();
        assert_eq!(
            run("(begin (define x 1) (set! x 2) x)", &env).to_string(),
            "2"
        );
        assert!(matches!(run("(begin)", &env), Value::Unspecified));
    }

    #[test]
    fn test_lambda_application() {
        assert_eq!(printed("((lambda (x y) (+ x y)) 1 2)"), "3");
        assert_eq!(printed("((lambda args args) 1 2 3)"), "(1 2 3)");
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(matches!(
            eval_source("((lambda (x) x) 1 2)", &setup()),
            Err(SchemeError::Arity { .. })
        ));
    }

    #[test]
    fn test_not_callable() {
        assert!(matches!(
            eval_source("(42 1)", &setup()),
            Err(SchemeError::Type { .. })
        ));
    }

    #[test]
    fn test_closure_captures_defining_frame() {
        let env = setup();
        run("(define (make-adder n) (lambda (x) (+ x n)))", &env);
        run("(define add5 (make-adder 5))", &env);
        assert_eq!(run("(add5 10)", &env).to_string(), "15");
    }

    #[test]
    fn test_lexical_scope_not_dynamic() {
        let env = setup();
        run("(define x 1)", &env);
        run("(define (f) x)", &env);
        assert_eq!(run("(let ((x 2)) (f))", &env).to_string(), "1");
    }

    #[test]
    fn test_internal_defines() {
        assert_eq!(printed("((lambda (x) (define y 10) (+ x y)) 1)"), "11");
    }

    #[test]
    fn test_let_family() {
        assert_eq!(printed("(let ((x 1) (y 2)) (+ x y))"), "3");
        assert_eq!(printed("(let* ((x 1) (y (+ x 1))) y)"), "2");
        assert_eq!(
            printed(
                "(letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                          (odd? (lambda (n) (if (= n 0) #f (even? (- n 1))))))
                   (even? 10))"
            ),
            "#t"
        );
    }

    #[test]
    fn test_named_let_loop() {
        assert_eq!(
            printed("(let loop ((i 0) (acc 0)) (if (> i 5) acc (loop (+ i 1) (+ acc i))))"),
            "15"
        );
    }

    #[test]
    fn test_do_loop() {
        assert_eq!(
            printed("(do ((i 0 (+ i 1)) (acc 0 (+ acc i))) ((= i 5) acc))"),
            "10"
        );
        // steps all evaluate before any parm rebinds
        assert_eq!(
            printed("(do ((a 1 b) (b 2 a) (n 0 (+ n 1))) ((= n 3) (list a b)))"),
            "(2 1)"
        );
    }

    #[test]
    fn test_tail_call_in_deep_recursion() {
        let env = setup();
        run(
            "(define (countdown n) (if (= n 0) 'done (countdown (- n 1))))",
            &env,
        );
        assert_eq!(run("(countdown 100000)", &env).to_string(), "done");
    }

    #[test]
    fn test_delay_and_force_memoize() {
        let env = setup();
        run("(define counter 0)", &env);
        run(
            "(define p (delay (begin (set! counter (+ counter 1)) counter)))",
            &env,
        );
        assert_eq!(run("(promise-forced? p)", &env).to_string(), "#f");
        assert_eq!(run("(force p)", &env).to_string(), "1");
        assert_eq!(run("(force p)", &env).to_string(), "1");
        assert_eq!(run("counter", &env).to_string(), "1");
        assert_eq!(run("(promise-forced? p)", &env).to_string(), "#t");
        assert_eq!(run("(promise-value p)", &env).to_string(), "1");
    }

    #[test]
    fn test_promise_value_before_force_fails() {
        let env = setup();
        run("(define p (delay 1))", &env);
        assert!(eval_source("(promise-value p)", &env).is_err());
    }

    #[test]
    fn test_force_non_promise_fails() {
        assert!(eval_source("(force 42)", &setup()).is_err());
    }

    #[test]
    fn test_quasiquote() {
        assert_eq!(printed("`(1 2 3)"), "(1 2 3)");
        assert_eq!(
            printed("(let ((x 10)) `(a ,x ,@(list 1 2) b))"),
            "(a 10 1 2 b)"
        );
        assert_eq!(printed("`(1 ,(+ 1 1) 3)"), "(1 2 3)");
    }

    #[test]
    fn test_nested_quasiquote_keeps_structure() {
        assert_eq!(printed("``(1 ,x)"), "(quasiquote (1 (unquote x)))");
    }

    #[test]
    fn test_splicing_requires_a_list() {
        assert!(eval_source("`(a ,@5)", &setup()).is_err());
    }

    #[test]
    fn test_datum_round_trips() {
        let seq = Value::Seq(vec![
            Value::Number(Number::Int(1)),
            Value::symbol("."),
            Value::Number(Number::Int(2)),
        ]);
        let value = datum_to_value(&seq).unwrap();
        assert_eq!(value.to_string(), "(1 . 2)");
        let back = value_to_datum(&value);
        assert!(matches!(&back, Value::Seq(items) if items.len() == 3));
    }

    #[test]
    fn test_eval_primitive_expands_too() {
        assert_eq!(printed("(eval '(let ((x 1)) (+ x 1)))"), "2");
        assert_eq!(printed("(eval (list '+ 1 2))"), "3");
    }
}
