// ABOUTME: Syntactic expander lowering derived forms to the core language

use crate::error::SchemeError;
use crate::value::Value;

/// Lower a raw datum tree to core forms, validating derived-form syntax.
/// `definitions_allowed` tracks whether a `define` is syntactically legal
/// at this position (top level or the front of a procedure body).
pub fn expand(expr: Value, definitions_allowed: bool) -> Result<Value, SchemeError> {
    let items = match expr {
        Value::Seq(items) if !items.is_empty() => items,
        other => return Ok(other),
    };
    let head = match &items[0] {
        Value::Symbol(s) => Some(s.clone()),
        _ => None,
    };
    match head.as_deref() {
        Some("quote") => expand_quote(items),
        Some("define") => expand_define(items, definitions_allowed),
        Some("lambda") => expand_lambda(items),
        Some("set!") => expand_set(items),
        Some("if") => expand_if(items),
        Some("cond") => expand_cond(items),
        Some("case") => expand_case(items),
        Some("let") => expand_let(items),
        Some("nlet") => expand_named_let(items),
        Some("let*") => expand_let_star(items),
        Some("letrec") => expand_letrec(items),
        Some("do") => expand_do(items),
        Some("begin") => expand_begin(items, definitions_allowed),
        Some("delay") => expand_unary("delay", items),
        Some("force") => expand_unary("force", items),
        Some("quasiquote") => expand_quasiquote(items),
        Some("unquote") | Some("unquote-splicing") => Err(SchemeError::syntax(
            &Value::Seq(items),
            "only allowed inside quasiquote",
        )),
        _ => {
            // (proc args...)
            let expanded = items
                .into_iter()
                .map(|part| expand(part, false))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Seq(expanded))
        }
    }
}

fn as_seq(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Seq(items) => Some(items),
        _ => None,
    }
}

fn is_dot(value: &Value) -> bool {
    matches!(value, Value::Symbol(s) if s == ".")
}

fn is_define_form(value: &Value) -> bool {
    matches!(as_seq(value), Some([Value::Symbol(head), ..]) if head == "define")
}

fn wrong_shape(items: &[Value]) -> SchemeError {
    SchemeError::syntax(&Value::Seq(items.to_vec()), "wrong number of parts")
}

// ============================================================================
// Core passthroughs with validation
// ============================================================================

fn expand_quote(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() != 2 {
        return Err(wrong_shape(&items));
    }
    validate_datum(&items[1])?;
    Ok(Value::Seq(items))
}

/// Reject mis-shapen dotted datums inside quoted data: at most one `.`
/// marker, and only in the next-to-last position of a sequence.
fn validate_datum(datum: &Value) -> Result<(), SchemeError> {
    let items = match as_seq(datum) {
        Some(items) => items,
        None => return Ok(()),
    };
    let dots = items.iter().filter(|part| is_dot(part)).count();
    if dots > 1 || (dots == 1 && (items.len() < 3 || !is_dot(&items[items.len() - 2]))) {
        return Err(SchemeError::syntax(datum, "ill-formed dotted list"));
    }
    for part in items {
        if !is_dot(part) {
            validate_datum(part)?;
        }
    }
    Ok(())
}

fn expand_unary(name: &str, items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() != 2 {
        return Err(wrong_shape(&items));
    }
    let body = expand(items[1].clone(), false)?;
    Ok(Value::Seq(vec![Value::symbol(name), body]))
}

fn expand_set(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() != 3 {
        return Err(wrong_shape(&items));
    }
    if !matches!(items[1], Value::Symbol(_)) {
        return Err(SchemeError::syntax(
            &Value::Seq(items),
            "can set! only a symbol",
        ));
    }
    let value = expand(items[2].clone(), false)?;
    Ok(Value::Seq(vec![items[0].clone(), items[1].clone(), value]))
}

// ============================================================================
// define / lambda
// ============================================================================

fn expand_define(mut items: Vec<Value>, definitions_allowed: bool) -> Result<Value, SchemeError> {
    if !definitions_allowed {
        return Err(SchemeError::syntax(
            &Value::Seq(items),
            "define is only allowed at top level or at the front of a body",
        ));
    }
    if items.len() == 2 {
        items.push(Value::Unspecified);
    }
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    match items[1].clone() {
        // (define (f args...) body...) => (define f (lambda (args...) body...))
        Value::Seq(header) if !header.is_empty() => {
            let name = header[0].clone();
            if !matches!(name, Value::Symbol(_)) {
                return Err(SchemeError::syntax(
                    &Value::Seq(items),
                    "can only define a symbol",
                ));
            }
            let formals = header_formals(&header[1..], &items)?;
            let mut lambda = vec![Value::symbol("lambda"), formals];
            lambda.extend_from_slice(&items[2..]);
            expand(
                Value::Seq(vec![items[0].clone(), name, Value::Seq(lambda)]),
                definitions_allowed,
            )
        }
        Value::Symbol(_) => {
            if items.len() != 3 {
                return Err(wrong_shape(&items));
            }
            let value = expand(items[2].clone(), false)?;
            Ok(Value::Seq(vec![items[0].clone(), items[1].clone(), value]))
        }
        _ => Err(SchemeError::syntax(
            &Value::Seq(items),
            "can only define a symbol",
        )),
    }
}

/// Formals from a `(define (f ...) ...)` header: a flat symbol list, or
/// `(f . xs)` for a variadic procedure.
fn header_formals(rest: &[Value], whole: &[Value]) -> Result<Value, SchemeError> {
    if let [dot, tail] = rest {
        if is_dot(dot) {
            if matches!(tail, Value::Symbol(_)) {
                return Ok(tail.clone());
            }
            return Err(SchemeError::syntax(
                &Value::Seq(whole.to_vec()),
                "illegal parameter list",
            ));
        }
    }
    if rest.iter().any(is_dot) {
        return Err(SchemeError::syntax(
            &Value::Seq(whole.to_vec()),
            "illegal parameter list",
        ));
    }
    Ok(Value::Seq(rest.to_vec()))
}

fn expand_lambda(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    match &items[1] {
        Value::Symbol(_) => {}
        Value::Seq(formals) => {
            if !formals.iter().all(|f| matches!(f, Value::Symbol(s) if s != ".")) {
                return Err(SchemeError::syntax(
                    &Value::Seq(items.clone()),
                    "illegal parameter list",
                ));
            }
        }
        _ => {
            return Err(SchemeError::syntax(
                &Value::Seq(items),
                "illegal parameter list",
            ))
        }
    }
    let body = expand_body(&items[2..])?;
    Ok(Value::Seq(vec![
        items[0].clone(),
        items[1].clone(),
        body,
    ]))
}

/// Wrap a procedure body in `begin`. Internal defines are legal only at
/// the front; the definition context switches off at the first expression.
fn expand_body(forms: &[Value]) -> Result<Value, SchemeError> {
    let mut out = vec![Value::symbol("begin")];
    let mut defines_legal = true;
    for form in forms {
        if is_define_form(form) {
            if !defines_legal {
                return Err(SchemeError::syntax(
                    form,
                    "definition after the first body expression",
                ));
            }
            out.push(expand(form.clone(), true)?);
        } else {
            defines_legal = false;
            out.push(expand(form.clone(), false)?);
        }
    }
    Ok(Value::Seq(out))
}

// ============================================================================
// Conditionals
// ============================================================================

fn expand_if(mut items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() == 3 {
        items.push(Value::Unspecified);
    }
    if items.len() != 4 {
        return Err(wrong_shape(&items));
    }
    // (if t c a) => (cond (t c) (else a))
    let rewritten = Value::Seq(vec![
        Value::symbol("cond"),
        Value::Seq(vec![items[1].clone(), items[2].clone()]),
        Value::Seq(vec![Value::symbol("else"), items[3].clone()]),
    ]);
    expand(rewritten, false)
}

fn expand_cond(items: Vec<Value>) -> Result<Value, SchemeError> {
    let clauses = &items[1..];
    let mut out = vec![items[0].clone()];
    let mut has_else = false;
    for (index, clause) in clauses.iter().enumerate() {
        let parts = as_seq(clause)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| SchemeError::syntax(clause, "clause must be a non-empty list"))?;
        if matches!(&parts[0], Value::Symbol(s) if s == "else") {
            if index != clauses.len() - 1 {
                return Err(SchemeError::syntax(clause, "else clause must come last"));
            }
            if parts.len() < 2 {
                return Err(SchemeError::syntax(clause, "else clause requires a body"));
            }
            let mut expanded = vec![parts[0].clone()];
            for form in &parts[1..] {
                expanded.push(expand(form.clone(), false)?);
            }
            out.push(Value::Seq(expanded));
            has_else = true;
        } else {
            let mut expanded = vec![expand(parts[0].clone(), false)?];
            for form in &parts[1..] {
                expanded.push(expand(form.clone(), false)?);
            }
            out.push(Value::Seq(expanded));
        }
    }
    if !has_else {
        out.push(Value::Seq(vec![
            Value::symbol("else"),
            Value::Unspecified,
        ]));
    }
    Ok(Value::Seq(out))
}

fn expand_case(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 2 {
        return Err(wrong_shape(&items));
    }
    let mut out = vec![items[0].clone(), expand(items[1].clone(), false)?];
    let clauses = &items[2..];
    let mut has_else = false;
    for (index, clause) in clauses.iter().enumerate() {
        let parts = as_seq(clause)
            .filter(|parts| parts.len() >= 2)
            .ok_or_else(|| SchemeError::syntax(clause, "clause must be a datum list and a body"))?;
        if matches!(&parts[0], Value::Symbol(s) if s == "else") {
            if index != clauses.len() - 1 {
                return Err(SchemeError::syntax(clause, "else clause must come last"));
            }
            has_else = true;
            let mut expanded = vec![parts[0].clone()];
            for form in &parts[1..] {
                expanded.push(expand(form.clone(), false)?);
            }
            out.push(Value::Seq(expanded));
        } else {
            if !matches!(&parts[0], Value::Seq(_)) {
                return Err(SchemeError::syntax(clause, "datums must be a list"));
            }
            validate_datum(&parts[0])?;
            let quoted = Value::Seq(vec![Value::symbol("quote"), parts[0].clone()]);
            let mut expanded = vec![quoted];
            for form in &parts[1..] {
                expanded.push(expand(form.clone(), false)?);
            }
            out.push(Value::Seq(expanded));
        }
    }
    if !has_else {
        out.push(Value::Seq(vec![
            Value::symbol("else"),
            Value::Unspecified,
        ]));
    }
    Ok(Value::Seq(out))
}

// ============================================================================
// Binding forms
// ============================================================================

/// Split a binding list into names and initializer expressions.
fn split_bindings(bindings: &Value) -> Result<(Vec<Value>, Vec<Value>), SchemeError> {
    let pairs = as_seq(bindings)
        .ok_or_else(|| SchemeError::syntax(bindings, "bindings must be a list"))?;
    let mut names = Vec::with_capacity(pairs.len());
    let mut inits = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match as_seq(pair) {
            Some([name @ Value::Symbol(_), init]) => {
                names.push(name.clone());
                inits.push(init.clone());
            }
            _ => {
                return Err(SchemeError::syntax(
                    pair,
                    "binding must be a (symbol expression) pair",
                ))
            }
        }
    }
    Ok((names, inits))
}

fn expand_let(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    // (let name ((x e)...) body...) is a named let
    if matches!(items[1], Value::Symbol(_)) {
        let mut named = vec![Value::symbol("nlet")];
        named.extend_from_slice(&items[1..]);
        return expand_named_let(named);
    }
    let (names, inits) = split_bindings(&items[1])?;
    // ((lambda (names...) body...) inits...)
    let mut lambda = vec![Value::symbol("lambda"), Value::Seq(names)];
    lambda.extend_from_slice(&items[2..]);
    let mut application = vec![Value::Seq(lambda)];
    application.extend(inits);
    expand(Value::Seq(application), false)
}

fn expand_let_star(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    let pairs = as_seq(&items[1])
        .ok_or_else(|| SchemeError::syntax(&items[1], "bindings must be a list"))?;
    if pairs.len() <= 1 {
        let mut rewritten = vec![Value::symbol("let"), items[1].clone()];
        rewritten.extend_from_slice(&items[2..]);
        return expand(Value::Seq(rewritten), false);
    }
    // Peel one binding and nest the rest, rightmost innermost
    let mut inner = vec![Value::symbol("let*"), Value::Seq(pairs[1..].to_vec())];
    inner.extend_from_slice(&items[2..]);
    let rewritten = vec![
        Value::symbol("let"),
        Value::Seq(vec![pairs[0].clone()]),
        Value::Seq(inner),
    ];
    expand(Value::Seq(rewritten), false)
}

fn expand_letrec(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    let (names, inits) = split_bindings(&items[1])?;
    // (let ((x <unspecified>)...)
    //   (let ((x.1 e)...) (set! x x.1)... body...))
    // so initializers see each other's bindings but not their final values
    let outer: Vec<Value> = names
        .iter()
        .map(|name| Value::Seq(vec![name.clone(), Value::Unspecified]))
        .collect();
    let temps: Vec<Value> = names
        .iter()
        .map(|name| match name {
            Value::Symbol(s) => Value::Symbol(format!("{}.1", s)),
            _ => unreachable!("split_bindings only returns symbols"),
        })
        .collect();
    let inner_bindings: Vec<Value> = temps
        .iter()
        .zip(inits)
        .map(|(temp, init)| Value::Seq(vec![temp.clone(), init]))
        .collect();
    let mut inner = vec![Value::symbol("let"), Value::Seq(inner_bindings)];
    for (name, temp) in names.iter().zip(&temps) {
        inner.push(Value::Seq(vec![
            Value::symbol("set!"),
            name.clone(),
            temp.clone(),
        ]));
    }
    inner.extend_from_slice(&items[2..]);
    let rewritten = vec![
        Value::symbol("let"),
        Value::Seq(outer),
        Value::Seq(inner),
    ];
    expand(Value::Seq(rewritten), false)
}

fn expand_named_let(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 4 {
        return Err(wrong_shape(&items));
    }
    let name = items[1].clone();
    if !matches!(name, Value::Symbol(_)) {
        return Err(SchemeError::syntax(
            &Value::Seq(items),
            "loop name must be a symbol",
        ));
    }
    let (names, inits) = split_bindings(&items[2])?;
    // ((letrec ((name (lambda (names...) body...))) name) inits...)
    let mut lambda = vec![Value::symbol("lambda"), Value::Seq(names)];
    lambda.extend_from_slice(&items[3..]);
    let letrec = Value::Seq(vec![
        Value::symbol("letrec"),
        Value::Seq(vec![Value::Seq(vec![name.clone(), Value::Seq(lambda)])]),
        name,
    ]);
    let mut application = vec![letrec];
    application.extend(inits);
    expand(Value::Seq(application), false)
}

fn expand_do(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() < 3 {
        return Err(wrong_shape(&items));
    }
    let pairs = as_seq(&items[1])
        .ok_or_else(|| SchemeError::syntax(&items[1], "bindings must be a list"))?;
    let mut bindings = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match as_seq(pair) {
            Some([name @ Value::Symbol(_), init]) => {
                bindings.push(Value::Seq(vec![name.clone(), expand(init.clone(), false)?]));
            }
            Some([name @ Value::Symbol(_), init, step]) => {
                bindings.push(Value::Seq(vec![
                    name.clone(),
                    expand(init.clone(), false)?,
                    expand(step.clone(), false)?,
                ]));
            }
            _ => {
                return Err(SchemeError::syntax(
                    pair,
                    "binding must be (symbol init) or (symbol init step)",
                ))
            }
        }
    }
    let test_clause = as_seq(&items[2])
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| SchemeError::syntax(&items[2], "expected a (test result...) clause"))?;
    let test = expand(test_clause[0].clone(), false)?;
    let result = match &test_clause[1..] {
        [] => Value::Unspecified,
        [single] => expand(single.clone(), false)?,
        many => {
            let mut begin = vec![Value::symbol("begin")];
            for form in many {
                begin.push(expand(form.clone(), false)?);
            }
            Value::Seq(begin)
        }
    };
    let mut out = vec![
        items[0].clone(),
        Value::Seq(bindings),
        Value::Seq(vec![test, result]),
    ];
    for form in &items[3..] {
        out.push(expand(form.clone(), false)?);
    }
    Ok(Value::Seq(out))
}

// ============================================================================
// begin / quasiquote
// ============================================================================

fn expand_begin(items: Vec<Value>, definitions_allowed: bool) -> Result<Value, SchemeError> {
    let mut out = vec![items[0].clone()];
    if items.len() == 1 {
        out.push(Value::Unspecified);
        return Ok(Value::Seq(out));
    }
    // begin splices into its surroundings, so the definition context flows
    // through unchanged
    for form in &items[1..] {
        out.push(expand(form.clone(), definitions_allowed)?);
    }
    Ok(Value::Seq(out))
}

fn expand_quasiquote(items: Vec<Value>) -> Result<Value, SchemeError> {
    if items.len() != 2 {
        return Err(wrong_shape(&items));
    }
    let template = expand_template(&items[1], 1, true)?;
    Ok(Value::Seq(vec![items[0].clone(), template]))
}

/// Walk a quasiquote template: expand unquoted payloads at depth 1, leave
/// everything else verbatim, and track nesting depth.
fn expand_template(template: &Value, depth: usize, top: bool) -> Result<Value, SchemeError> {
    let items = match as_seq(template) {
        Some(items) if !items.is_empty() => items,
        _ => return Ok(template.clone()),
    };
    match &items[0] {
        Value::Symbol(s) if s == "unquote" || s == "unquote-splicing" => {
            if items.len() != 2 {
                return Err(wrong_shape(items));
            }
            if s == "unquote-splicing" && top {
                return Err(SchemeError::syntax(
                    template,
                    "cannot splice at the top of a quasiquote template",
                ));
            }
            let payload = if depth == 1 {
                expand(items[1].clone(), false)?
            } else {
                expand_template(&items[1], depth - 1, false)?
            };
            Ok(Value::Seq(vec![items[0].clone(), payload]))
        }
        Value::Symbol(s) if s == "quasiquote" => {
            if items.len() != 2 {
                return Err(wrong_shape(items));
            }
            let inner = expand_template(&items[1], depth + 1, false)?;
            Ok(Value::Seq(vec![items[0].clone(), inner]))
        }
        _ => {
            let walked = items
                .iter()
                .map(|item| expand_template(item, depth, false))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Seq(walked))
        }
    }
}
