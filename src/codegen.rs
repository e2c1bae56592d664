//! Lowers the AST into a linear [`Chunk`].
//!
//! Only the straight-line subset is compiled: literals, grouping, unary and
//! binary operators, expression statements, `print` and `return`. Every other
//! node (variables, blocks, control flow, functions, classes) compiles to
//! nothing. The instruction set has no jumps, so there is nothing to patch.

use log::{debug, info};

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::chunk::Chunk;
use crate::error::{LhoxError, Result};
use crate::opcode::OpCode;
use crate::token::{Offset, TokenType};
use crate::value::Value;

/// Sink for generated instructions, keeping bytecode layout out of the AST walk.
pub trait Emitter {
    fn emit(&mut self, offset: Offset, op: OpCode, operand: Option<i64>);

    /// Pools `value` and emits `OP_CONSTANT <index>`.
    fn emit_constant(&mut self, offset: Offset, value: Value);
}

/// Emits straight into a borrowed [`Chunk`].
pub struct ChunkEmitter<'c> {
    chunk: &'c mut Chunk,
}

impl<'c> ChunkEmitter<'c> {
    pub fn new(chunk: &'c mut Chunk) -> Self {
        Self { chunk }
    }
}

impl Emitter for ChunkEmitter<'_> {
    fn emit(&mut self, offset: Offset, op: OpCode, operand: Option<i64>) {
        self.chunk.write(offset, op, operand);
    }

    fn emit_constant(&mut self, offset: Offset, value: Value) {
        let index: i64 = self.chunk.add_constant(value);
        self.chunk.write(offset, OpCode::CONSTANT, Some(index));
    }
}

pub struct CodeGenerator<E: Emitter> {
    emitter: E,
}

impl<E: Emitter> CodeGenerator<E> {
    pub fn new(emitter: E) -> Self {
        Self { emitter }
    }

    /// Compiles `statements`, then terminates the program with `OP_RETURN`.
    pub fn generate(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Generating bytecode for {} statement(s)", statements.len());

        for stmt in statements {
            self.statement(stmt)?;
        }

        self.emitter.emit(Offset::default(), OpCode::RETURN, None);

        Ok(())
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expression(expr) => self.expression(expr),

            Stmt::Print(expr) => {
                self.expression(expr)?;
                self.emitter.emit(expr.offset(), OpCode::PRINT, None);

                Ok(())
            }

            Stmt::Return { keyword, value } => {
                if let Some(value) = value {
                    self.expression(value)?;
                }
                self.emitter.emit(keyword.offset, OpCode::RETURN, None);

                Ok(())
            }

            Stmt::Block { .. }
            | Stmt::Class { .. }
            | Stmt::Function(_)
            | Stmt::If { .. }
            | Stmt::Var { .. }
            | Stmt::While { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. } => {
                debug!("Skipping statement with no bytecode lowering");

                Ok(())
            }
        }
    }

    fn expression(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal { value, offset } => {
                self.literal(*offset, value);

                Ok(())
            }

            Expr::Grouping(inner) => self.expression(inner),

            Expr::Unary { operator, right } => {
                self.expression(right)?;

                let op: OpCode = match operator.token_type {
                    TokenType::MINUS => OpCode::NEGATE,
                    TokenType::BANG => OpCode::NOT,
                    _ => {
                        return Err(LhoxError::compile(format!(
                            "unknown unary operator: {}",
                            operator.lexeme
                        )))
                    }
                };
                self.emitter.emit(operator.offset, op, None);

                Ok(())
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                self.expression(left)?;
                self.expression(right)?;

                let op: OpCode = match operator.token_type {
                    TokenType::PLUS => OpCode::ADD,
                    TokenType::MINUS => OpCode::SUBTRACT,
                    TokenType::STAR => OpCode::MULTIPLY,
                    TokenType::SLASH => OpCode::DIVIDE,
                    TokenType::EQUAL_EQUAL => OpCode::EQUAL,
                    TokenType::BANG_EQUAL => OpCode::NOT_EQUAL,
                    TokenType::GREATER => OpCode::GREATER,
                    TokenType::GREATER_EQUAL => OpCode::GREATER_EQUAL,
                    TokenType::LESS => OpCode::LESS,
                    TokenType::LESS_EQUAL => OpCode::LESS_EQUAL,
                    _ => {
                        return Err(LhoxError::compile(format!(
                            "unknown binary operator: {}",
                            operator.lexeme
                        )))
                    }
                };
                self.emitter.emit(operator.offset, op, None);

                Ok(())
            }

            Expr::Assign { .. }
            | Expr::Call { .. }
            | Expr::Get { .. }
            | Expr::Logical { .. }
            | Expr::Set { .. }
            | Expr::Super { .. }
            | Expr::This { .. }
            | Expr::Ternary { .. }
            | Expr::Variable { .. } => {
                debug!("Skipping expression with no bytecode lowering");

                Ok(())
            }
        }
    }

    /// `nil`, booleans and ints in `-1..=5` get dedicated opcodes; everything
    /// else goes through the constant pool.
    fn literal(&mut self, offset: Offset, value: &LiteralValue) {
        match value {
            LiteralValue::Nil => self.emitter.emit(offset, OpCode::NIL, None),
            LiteralValue::Bool(true) => self.emitter.emit(offset, OpCode::TRUE, None),
            LiteralValue::Bool(false) => self.emitter.emit(offset, OpCode::FALSE, None),
            LiteralValue::Int(n) => match OpCode::small_int(*n) {
                Some(op) => self.emitter.emit(offset, op, None),
                None => self.emitter.emit_constant(offset, Value::Int(*n)),
            },
            LiteralValue::Float(n) => self.emitter.emit_constant(offset, Value::Float(*n)),
            LiteralValue::Str(s) => self.emitter.emit_constant(offset, Value::Str(s.clone())),
        }
    }
}
