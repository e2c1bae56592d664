//! Stack machine executing one flat [`Chunk`] per call.
//!
//! Dispatch goes through a fixed table indexed by opcode byte. Arithmetic
//! here is deliberately looser than the tree walker's: `+` stringifies a
//! number paired with a string, integer division by zero falls back to float
//! division, and equality promotes ints against floats.

use std::io::{self, Write};

use log::{debug, error, info};

use crate::chunk::Chunk;
use crate::opcode::OpCode;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

type Handler = fn(&mut Vm, &Chunk) -> InterpretResult;

const HANDLERS: [Option<Handler>; OpCode::COUNT] = {
    let mut table: [Option<Handler>; OpCode::COUNT] = [None; OpCode::COUNT];

    table[OpCode::CONSTANT as usize] = Some(Vm::op_constant as Handler);
    table[OpCode::TRUE as usize] = Some(Vm::op_true as Handler);
    table[OpCode::FALSE as usize] = Some(Vm::op_false as Handler);
    table[OpCode::NIL as usize] = Some(Vm::op_nil as Handler);
    table[OpCode::CONSTANT_M1 as usize] = Some(Vm::op_constant_m1 as Handler);
    table[OpCode::CONSTANT_0 as usize] = Some(Vm::op_constant_0 as Handler);
    table[OpCode::CONSTANT_1 as usize] = Some(Vm::op_constant_1 as Handler);
    table[OpCode::CONSTANT_2 as usize] = Some(Vm::op_constant_2 as Handler);
    table[OpCode::CONSTANT_3 as usize] = Some(Vm::op_constant_3 as Handler);
    table[OpCode::CONSTANT_4 as usize] = Some(Vm::op_constant_4 as Handler);
    table[OpCode::CONSTANT_5 as usize] = Some(Vm::op_constant_5 as Handler);

    table[OpCode::NEGATE as usize] = Some(Vm::op_negate as Handler);
    table[OpCode::NOT as usize] = Some(Vm::op_not as Handler);

    table[OpCode::ADD as usize] = Some(Vm::op_add as Handler);
    table[OpCode::SUBTRACT as usize] = Some(Vm::op_subtract as Handler);
    table[OpCode::MULTIPLY as usize] = Some(Vm::op_multiply as Handler);
    table[OpCode::DIVIDE as usize] = Some(Vm::op_divide as Handler);
    table[OpCode::EQUAL as usize] = Some(Vm::op_equal as Handler);
    table[OpCode::NOT_EQUAL as usize] = Some(Vm::op_not_equal as Handler);
    table[OpCode::GREATER as usize] = Some(Vm::op_greater as Handler);
    table[OpCode::LESS as usize] = Some(Vm::op_less as Handler);
    table[OpCode::GREATER_EQUAL as usize] = Some(Vm::op_greater_equal as Handler);
    table[OpCode::LESS_EQUAL as usize] = Some(Vm::op_less_equal as Handler);

    table[OpCode::RETURN as usize] = Some(Vm::op_return as Handler);
    table[OpCode::PRINT as usize] = Some(Vm::op_print as Handler);

    table
};

pub struct Vm {
    ip: usize,
    stack: Vec<Value>,
    /// Heap values created at run time (currently concatenated strings).
    objects: Vec<Value>,
    out: Box<dyn Write>,
    last_value: Option<Value>,
    last_error: Option<String>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            ip: 0,
            stack: Vec::new(),
            objects: Vec::new(),
            out,
            last_value: None,
            last_error: None,
        }
    }

    /// Runs `chunk` from its first byte with a fresh stack.
    pub fn interpret(&mut self, chunk: &Chunk) -> InterpretResult {
        info!("VM interpreting chunk of {} byte(s)", chunk.len());

        self.ip = 0;
        self.stack.clear();
        self.objects.clear();
        self.last_value = None;
        self.last_error = None;

        let result: InterpretResult = self.run(chunk);

        if let Err(e) = self.out.flush() {
            return self.runtime_error(format!("failed to flush output: {}", e));
        }

        result
    }

    /// Value popped by the most recent `OP_RETURN`.
    pub fn last_value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    /// Message of the fault that stopped the last run, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    fn run(&mut self, chunk: &Chunk) -> InterpretResult {
        while self.ip < chunk.len() {
            let Some(byte) = chunk.byte(self.ip) else {
                break;
            };

            let Some(op) = OpCode::from_byte(byte) else {
                return self.runtime_error(format!("unknown opcode 0x{:02x}", byte));
            };

            debug!("VM ip={} op={} stack={:?}", self.ip, op, self.stack);
            self.ip += 1;

            let Some(handler) = HANDLERS[op as usize] else {
                return self.runtime_error(format!("no handler for {}", op));
            };

            let result: InterpretResult = handler(self, chunk);
            if result != InterpretResult::Ok {
                return result;
            }
        }

        InterpretResult::Ok
    }

    fn runtime_error(&mut self, message: String) -> InterpretResult {
        error!("VM runtime error: {}", message);
        self.last_error = Some(message);

        InterpretResult::RuntimeError
    }

    #[inline]
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// An empty stack pops as `nil`.
    #[inline]
    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Nil)
    }

    fn push_ok(&mut self, value: Value) -> InterpretResult {
        self.push(value);

        InterpretResult::Ok
    }

    // ── constants ───────────────────────────────────────────────────────

    fn op_constant(&mut self, chunk: &Chunk) -> InterpretResult {
        let Some((index, width)) = chunk.read_operand(self.ip) else {
            return self.runtime_error("truncated constant operand".to_string());
        };
        self.ip += width;

        match chunk.constant(index) {
            Some(value) => self.push_ok(value.clone()),
            None => self.runtime_error(format!("constant index {} out of range", index)),
        }
    }

    fn op_true(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Bool(true))
    }

    fn op_false(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Bool(false))
    }

    fn op_nil(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Nil)
    }

    fn op_constant_m1(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(-1))
    }

    fn op_constant_0(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(0))
    }

    fn op_constant_1(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(1))
    }

    fn op_constant_2(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(2))
    }

    fn op_constant_3(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(3))
    }

    fn op_constant_4(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(4))
    }

    fn op_constant_5(&mut self, _: &Chunk) -> InterpretResult {
        self.push_ok(Value::Int(5))
    }

    // ── unary ───────────────────────────────────────────────────────────

    fn op_negate(&mut self, _: &Chunk) -> InterpretResult {
        match self.pop() {
            Value::Int(n) => self.push_ok(Value::Int(n.wrapping_neg())),
            Value::Float(n) => self.push_ok(Value::Float(-n)),
            other => self.runtime_error(format!("operand must be a number, got {}", other)),
        }
    }

    fn op_not(&mut self, _: &Chunk) -> InterpretResult {
        let value: Value = self.pop();

        self.push_ok(Value::Bool(!value.is_truthy()))
    }

    // ── binary ──────────────────────────────────────────────────────────

    fn op_add(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        let joined: String = match (&a, &b) {
            (Value::Str(x), Value::Str(y)) => format!("{}{}", x, y),
            (Value::Str(x), Value::Int(y)) => format!("{}{}", x, y),
            (Value::Str(x), Value::Float(y)) => format!("{}{:.6}", x, y),
            (Value::Int(x), Value::Str(y)) => format!("{}{}", x, y),
            (Value::Float(x), Value::Str(y)) => format!("{:.6}{}", x, y),
            _ => {
                return self.arithmetic(a, b, i64::wrapping_add, |x, y| x + y);
            }
        };

        let value = Value::Str(joined);
        self.objects.push(value.clone());

        self.push_ok(value)
    }

    fn op_subtract(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        self.arithmetic(a, b, i64::wrapping_sub, |x, y| x - y)
    }

    fn op_multiply(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        self.arithmetic(a, b, i64::wrapping_mul, |x, y| x * y)
    }

    fn op_divide(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        match (&a, &b) {
            // A zero int divisor divides as floats instead of trapping.
            (Value::Int(x), Value::Int(0)) => self.push_ok(Value::Float(*x as f64 / 0.0)),
            _ => self.arithmetic(a, b, i64::wrapping_div, |x, y| x / y),
        }
    }

    fn op_equal(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        self.push_ok(Value::Bool(a.loose_eq(&b)))
    }

    fn op_not_equal(&mut self, _: &Chunk) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        self.push_ok(Value::Bool(!a.loose_eq(&b)))
    }

    fn op_greater(&mut self, _: &Chunk) -> InterpretResult {
        self.compare(|o| o.is_gt())
    }

    fn op_less(&mut self, _: &Chunk) -> InterpretResult {
        self.compare(|o| o.is_lt())
    }

    fn op_greater_equal(&mut self, _: &Chunk) -> InterpretResult {
        self.compare(|o| o.is_ge())
    }

    fn op_less_equal(&mut self, _: &Chunk) -> InterpretResult {
        self.compare(|o| o.is_le())
    }

    fn arithmetic(
        &mut self,
        a: Value,
        b: Value,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> InterpretResult {
        if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
            return self.push_ok(Value::Int(int_op(*x, *y)));
        }

        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => self.push_ok(Value::Float(float_op(x, y))),
            _ => self.runtime_error(format!("operands must be numbers, got {} and {}", a, b)),
        }
    }

    fn compare(&mut self, test: fn(std::cmp::Ordering) -> bool) -> InterpretResult {
        let b: Value = self.pop();
        let a: Value = self.pop();

        if !a.is_number() || !b.is_number() {
            return self.runtime_error(format!("operands must be numbers, got {} and {}", a, b));
        }

        // NaN compares false against everything.
        let result: bool = a.numeric_cmp(&b).is_some_and(test);

        self.push_ok(Value::Bool(result))
    }

    // ── special ─────────────────────────────────────────────────────────

    fn op_return(&mut self, _: &Chunk) -> InterpretResult {
        let value: Value = self.pop();
        info!("OP_RETURN popped {}", value);
        self.last_value = Some(value);

        InterpretResult::Ok
    }

    fn op_print(&mut self, _: &Chunk) -> InterpretResult {
        let value: Value = self.pop();

        match writeln!(self.out, "{}", value) {
            Ok(()) => InterpretResult::Ok,
            Err(e) => self.runtime_error(format!("failed to write output: {}", e)),
        }
    }
}
