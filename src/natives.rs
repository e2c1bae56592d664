//! Built-in functions installed into the global environment.
//!
//! Conversions (`str`, `int`, `float`, `strlen`, `substring`) work on the
//! argument's display string, so `int("42")` and `int(42)` agree.

use std::io::{BufRead, Write};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use rand::Rng;

use crate::callable::{NativeFn, NativeFunction};
use crate::environment::Environment;
use crate::error::{LhoxError, Result};
use crate::interpreter::Interpreter;
use crate::value::Value;

const NATIVES: &[(&str, usize, NativeFn)] = &[
    ("print", 1, print),
    ("input", 1, input),
    ("clock", 0, clock),
    ("str", 1, to_str),
    ("int", 1, to_int),
    ("float", 1, to_float),
    ("rand", 0, rand_float),
    ("randInt", 1, rand_int),
    ("sleep", 1, sleep),
    ("clear", 0, clear),
    ("strlen", 1, strlen),
    ("substring", 3, substring),
    ("getch", 0, getch),
];

/// Define every built-in in `globals`.
pub fn install(globals: &mut Environment) {
    for &(name, arity, func) in NATIVES {
        globals.define(
            name,
            Value::NativeFunction(Rc::new(NativeFunction { name, arity, func })),
        );
    }

    info!("Installed {} native functions", NATIVES.len());
}

fn print(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    writeln!(interpreter.output(), "{}", args[0])?;

    Ok(Value::Nil)
}

fn input(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    {
        let out = interpreter.output();
        write!(out, "{}", args[0])?;
        out.flush()?;
    }

    let mut line = String::new();
    let read = interpreter
        .input()
        .read_line(&mut line)
        .map_err(|e| LhoxError::runtime(format!("failed to read input: {}", e)))?;

    if read == 0 {
        return Err(LhoxError::runtime("failed to read input"));
    }

    Ok(Value::Str(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Whole seconds since the Unix epoch.
fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value> {
    Ok(Value::Int(Utc::now().timestamp()))
}

fn to_str(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Str(args[0].to_string()))
}

fn to_int(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text: String = args[0].to_string();

    text.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| LhoxError::runtime(format!("cannot convert '{}' to int: {}", text, e)))
}

fn to_float(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text: String = args[0].to_string();

    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| LhoxError::runtime(format!("cannot convert '{}' to float: {}", text, e)))
}

fn rand_float(_: &mut Interpreter, _: &[Value]) -> Result<Value> {
    Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

/// Uniform in `[0, n)`.
fn rand_int(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let n: i64 = integer_arg(&args[0])
        .ok_or_else(|| LhoxError::runtime("randInt argument must be a number"))?;

    if n <= 0 {
        return Err(LhoxError::runtime("randInt argument must be > 0"));
    }

    Ok(Value::Int(rand::thread_rng().gen_range(0..n)))
}

/// Blocks for the given number of milliseconds.
fn sleep(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let ms: i64 = integer_arg(&args[0])
        .ok_or_else(|| LhoxError::runtime("sleep argument must be a number (milliseconds)"))?;

    if ms < 0 {
        return Err(LhoxError::runtime("sleep argument must be >= 0"));
    }

    debug!("Sleeping for {} ms", ms);
    thread::sleep(Duration::from_millis(ms.unsigned_abs()));

    Ok(Value::Nil)
}

fn clear(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value> {
    let out = interpreter.output();
    write!(out, "\x1b[2J\x1b[H")?;
    out.flush()?;

    Ok(Value::Nil)
}

/// Length in characters, not bytes.
fn strlen(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let count: usize = args[0].to_string().chars().count();

    Ok(Value::Int(count as i64))
}

/// Characters in the half-open range `[start, end)`.
fn substring(_: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let text: String = args[0].to_string();

    let (start, end) = match (index_arg(&args[1]), index_arg(&args[2])) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(LhoxError::runtime("substring indices must be numbers")),
    };

    let len: usize = text.chars().count();
    if start > end || end > len {
        return Err(LhoxError::runtime("substring index out of range"));
    }

    Ok(Value::Str(text.chars().skip(start).take(end - start).collect()))
}

/// One character from input; a single leading newline is skipped.
fn getch(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value> {
    let reader = interpreter.input();

    let mut ch = read_char(reader)?;
    if matches!(ch, Some('\n') | Some('\r')) {
        ch = read_char(reader)?;
    }

    ch.map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| LhoxError::runtime("failed to read char"))
}

fn read_char(reader: &mut dyn BufRead) -> Result<Option<char>> {
    let mut first = [0u8; 1];
    if reader.read(&mut first)? == 0 {
        return Ok(None);
    }

    let width: usize = match first[0] {
        b if b < 0x80 => 1,
        b if b >> 5 == 0b110 => 2,
        b if b >> 4 == 0b1110 => 3,
        _ => 4,
    };

    let mut bytes = [0u8; 4];
    bytes[0] = first[0];
    reader.read_exact(&mut bytes[1..width])?;

    let decoded: &str = std::str::from_utf8(&bytes[..width])?;

    Ok(decoded.chars().next())
}

/// Int as-is, float truncated, anything else parsed from its display form.
fn integer_arg(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(n) => Some(*n as i64),
        other => other.to_string().trim().parse::<i64>().ok(),
    }
}

/// Non-negative whole number usable as a character index.
fn index_arg(value: &Value) -> Option<usize> {
    match value {
        Value::Int(n) => usize::try_from(*n).ok(),
        Value::Float(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::Float(_) => None,
        other => other
            .to_string()
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|n| usize::try_from(n).ok()),
    }
}
