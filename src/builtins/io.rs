//! Port and console I/O.
//!
//! Ports are plain byte streams opened by path. `read` is line-oriented:
//! it skips blank lines, trims, lowercases, and returns the eof object at
//! end of file. `write` without a port behaves like `display`; with a
//! port it writes the external form. Operating on a closed port is an
//! IOError; closing twice is a no-op.

use crate::env::Environment;
use crate::error::{SchemeError, ARITY_ONE, ARITY_ONE_OR_TWO};
use crate::value::{Port, Value};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::rc::Rc;

fn path_arg<'a>(function: &str, args: &'a [Value]) -> Result<&'a str, SchemeError> {
    match args {
        [Value::Str(path)] => Ok(path),
        [other] => Err(SchemeError::type_error(function, "string", other)),
        _ => Err(SchemeError::arity(function, ARITY_ONE, args.len())),
    }
}

fn port_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Rc<RefCell<Port>>, SchemeError> {
    match &args[index] {
        Value::Port(port) => Ok(port),
        other => Err(SchemeError::type_error(function, "port", other)),
    }
}

pub fn builtin_open_input_file(args: &[Value]) -> Result<Value, SchemeError> {
    let path = path_arg("open-input-file", args)?;
    let file = File::open(path).map_err(|e| SchemeError::io(format!("{}: {}", path, e)))?;
    Ok(Value::Port(Rc::new(RefCell::new(Port::Input(Some(
        BufReader::new(file),
    ))))))
}

pub fn builtin_open_output_file(args: &[Value]) -> Result<Value, SchemeError> {
    let path = path_arg("open-output-file", args)?;
    let file = File::create(path).map_err(|e| SchemeError::io(format!("{}: {}", path, e)))?;
    Ok(Value::Port(Rc::new(RefCell::new(Port::Output(Some(file))))))
}

pub fn builtin_close_input_port(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("close-input-port", ARITY_ONE, args.len()));
    }
    let port = port_arg("close-input-port", args, 0)?;
    match &mut *port.borrow_mut() {
        Port::Input(stream) => {
            stream.take();
            Ok(Value::Unspecified)
        }
        Port::Output(_) => Err(SchemeError::type_error(
            "close-input-port",
            "input port",
            &args[0],
        )),
    }
}

pub fn builtin_close_output_port(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity(
            "close-output-port",
            ARITY_ONE,
            args.len(),
        ));
    }
    let port = port_arg("close-output-port", args, 0)?;
    match &mut *port.borrow_mut() {
        Port::Output(stream) => {
            stream.take();
            Ok(Value::Unspecified)
        }
        Port::Input(_) => Err(SchemeError::type_error(
            "close-output-port",
            "output port",
            &args[0],
        )),
    }
}

/// Read one non-blank line from an input port: trimmed, lowercased, or the
/// eof object once the stream runs dry.
pub fn builtin_read(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("read", ARITY_ONE, args.len()));
    }
    let port = port_arg("read", args, 0)?;
    let mut port = port.borrow_mut();
    let reader = match &mut *port {
        Port::Input(Some(reader)) => reader,
        Port::Input(None) => return Err(SchemeError::io("read: port is closed")),
        Port::Output(_) => {
            return Err(SchemeError::type_error("read", "input port", &args[0]))
        }
    };
    loop {
        let mut line = String::new();
        let count = reader.read_line(&mut line)?;
        if count == 0 {
            return Ok(Value::Eof);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Value::Str(trimmed.to_lowercase()));
        }
    }
}

/// Without a port, write behaves like `display`; with one, the external
/// form goes to the file with no trailing newline.
pub fn builtin_write(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => {
            println!("{}", value.display_string());
            Ok(Value::Unspecified)
        }
        [value, _] => {
            let port = port_arg("write", args, 1)?;
            let mut port = port.borrow_mut();
            match &mut *port {
                Port::Output(Some(file)) => {
                    write!(file, "{}", value)?;
                    Ok(Value::Unspecified)
                }
                Port::Output(None) => Err(SchemeError::io("write: port is closed")),
                Port::Input(_) => {
                    Err(SchemeError::type_error("write", "output port", &args[1]))
                }
            }
        }
        _ => Err(SchemeError::arity("write", ARITY_ONE_OR_TWO, args.len())),
    }
}

pub fn builtin_display(args: &[Value]) -> Result<Value, SchemeError> {
    if args.len() != 1 {
        return Err(SchemeError::arity("display", ARITY_ONE, args.len()));
    }
    println!("{}", args[0].display_string());
    Ok(Value::Unspecified)
}

/// Register all I/O builtins in the environment
pub fn register(env: &Rc<Environment>) {
    super::define_pure(env, "open-input-file", builtin_open_input_file);
    super::define_pure(env, "open-output-file", builtin_open_output_file);
    super::define_pure(env, "close-input-port", builtin_close_input_port);
    super::define_pure(env, "close-output-port", builtin_close_output_port);
    super::define_pure(env, "read", builtin_read);
    super::define_pure(env, "write", builtin_write);
    super::define_pure(env, "display", builtin_display);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("rscheme-io-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = builtin_open_input_file(&[Value::Str(
            "/definitely/not/a/real/file".to_string(),
        )]);
        assert!(matches!(result, Err(SchemeError::Io(_))));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let path = temp_path("round-trip");
        let path_value = Value::Str(path.to_string_lossy().to_string());

        let out = builtin_open_output_file(&[path_value.clone()]).unwrap();
        builtin_write(&[Value::symbol("Marker"), out.clone()]).unwrap();
        builtin_close_output_port(&[out]).unwrap();

        let input = builtin_open_input_file(&[path_value]).unwrap();
        let line = builtin_read(&[input.clone()]).unwrap();
        assert!(matches!(&line, Value::Str(s) if s == "marker"));
        assert!(matches!(builtin_read(&[input.clone()]).unwrap(), Value::Eof));
        builtin_close_input_port(&[input.clone()]).unwrap();
        // double close is a no-op, reading after close is an error
        builtin_close_input_port(&[input.clone()]).unwrap();
        assert!(matches!(
            builtin_read(&[input]),
            Err(SchemeError::Io(_))
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let path = temp_path("blanks");
        std::fs::write(&path, "\n\n  DATA  \n").unwrap();
        let input =
            builtin_open_input_file(&[Value::Str(path.to_string_lossy().to_string())]).unwrap();
        assert_eq!(builtin_read(&[input.clone()]).unwrap().to_string(), "\"data\"");
        assert!(matches!(builtin_read(&[input]).unwrap(), Value::Eof));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mode_mismatch_is_type_error() {
        let path = temp_path("mode");
        std::fs::write(&path, "x\n").unwrap();
        let input =
            builtin_open_input_file(&[Value::Str(path.to_string_lossy().to_string())]).unwrap();
        assert!(builtin_close_output_port(&[input.clone()]).is_err());
        assert!(builtin_write(&[Value::Bool(true), input]).is_err());
        let _ = std::fs::remove_file(path);
    }
}
