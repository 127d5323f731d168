// ABOUTME: Proper-tail-call tests; these loop a million times and must not
// grow the host stack

use rscheme::builtins::initial_env;
use rscheme::env::Environment;
use rscheme::eval::eval_source;
use std::rc::Rc;

fn setup() -> Rc<Environment> {
    initial_env().expect("initial environment should build")
}

fn printed(source: &str, env: &Rc<Environment>) -> String {
    eval_source(source, env)
        .unwrap_or_else(|e| panic!("{} failed: {}", source, e))
        .to_string()
}

#[test]
fn test_self_call_in_tail_position() {
    let env = setup();
    printed(
        "(define (loop n) (if (= n 0) 'done (loop (- n 1))))",
        &env,
    );
    assert_eq!(printed("(loop 1000000)", &env), "done");
}

#[test]
fn test_tail_call_through_begin() {
    let env = setup();
    printed(
        "(define (spin n) (if (= n 0) 'done (begin 'ignored (spin (- n 1)))))",
        &env,
    );
    assert_eq!(printed("(spin 1000000)", &env), "done");
}

#[test]
fn test_tail_call_through_cond_and_case() {
    let env = setup();
    printed(
        "(define (walk n)
           (cond ((= n 0) 'done)
                 (else (walk (- n 1)))))",
        &env,
    );
    assert_eq!(printed("(walk 1000000)", &env), "done");

    printed(
        "(define (hop n)
           (case n
             ((0) 'done)
             (else (hop (- n 1)))))",
        &env,
    );
    assert_eq!(printed("(hop 500000)", &env), "done");
}

#[test]
fn test_named_let_loops_unbounded() {
    let env = setup();
    assert_eq!(
        printed(
            "(let loop ((i 0) (acc 0))
               (if (= i 1000000) acc (loop (+ i 1) (+ acc 1))))",
            &env
        ),
        "1000000"
    );
}

#[test]
fn test_do_loop_runs_a_million_steps() {
    let env = setup();
    assert_eq!(
        printed("(do ((i 0 (+ i 1))) ((= i 1000000) i))", &env),
        "1000000"
    );
}

#[test]
fn test_mutual_recursion_in_tail_position() {
    let env = setup();
    printed(
        "(define (ping n) (if (= n 0) 'ping (pong (- n 1))))
         (define (pong n) (if (= n 0) 'pong (ping (- n 1))))",
        &env,
    );
    assert_eq!(printed("(ping 1000001)", &env), "pong");
}
