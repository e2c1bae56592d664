//! Flat bytecode container.
//!
//! Each instruction is one opcode byte followed by `operand_count()` signed
//! varint operands (zigzag + LEB128, at most ten bytes each). `offsets` holds
//! one source position per instruction, in emission order.

use bytes::{BufMut, BytesMut};
use log::{debug, error};

use crate::opcode::OpCode;
use crate::token::Offset;
use crate::value::Value;

const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Default)]
pub struct Chunk {
    code: BytesMut,
    constants: Vec<Value>,
    offsets: Vec<Offset>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` and its operand. A mismatch between the operand given
    /// and the opcode's declared count is logged, not rejected.
    pub fn write(&mut self, offset: Offset, op: OpCode, operand: Option<i64>) {
        self.code.put_u8(op as u8);
        self.offsets.push(offset);

        let given: usize = usize::from(operand.is_some());
        if given != op.operand_count() {
            error!(
                "operand count mismatch for {}: expected {}, got {} (line {})",
                op,
                op.operand_count(),
                given,
                offset.line
            );
        }

        if let Some(operand) = operand {
            let mut buf = [0u8; MAX_VARINT_LEN];
            let n: usize = put_varint(&mut buf, operand);
            self.code.extend_from_slice(&buf[..n]);
        }
    }

    /// Appends to the constant pool and returns the new entry's index.
    pub fn add_constant(&mut self, value: Value) -> i64 {
        self.constants.push(value);

        (self.constants.len() - 1) as i64
    }

    pub fn constant(&self, index: i64) -> Option<&Value> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.constants.get(i))
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// The raw byte at `index`.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.code.get(index).copied()
    }

    pub fn operator(&self, index: usize) -> Option<OpCode> {
        self.byte(index).and_then(OpCode::from_byte)
    }

    /// Decodes the varint starting at `index`: value and encoded length.
    pub fn read_operand(&self, index: usize) -> Option<(i64, usize)> {
        self.code.get(index..).and_then(get_varint)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Resets code, constants and offsets for reuse.
    pub fn clear(&mut self) {
        self.code.clear();
        self.constants.clear();
        self.offsets.clear();
    }

    /// One line per instruction: the opcode name, followed for `OP_CONSTANT`
    /// by the pool index and the pooled value.
    pub fn disassemble(&self) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut pos: usize = 0;

        while pos < self.code.len() {
            let byte: u8 = self.code[pos];
            let line: usize = self.offsets.get(lines.len()).map_or(0, |o| o.line);
            pos += 1;

            let Some(op) = OpCode::from_byte(byte) else {
                lines.push(format!("UNKNOWN 0x{:02x}", byte));
                continue;
            };

            let mut text: String = op.name().to_string();

            for _ in 0..op.operand_count() {
                let Some((operand, width)) = self.read_operand(pos) else {
                    text.push_str(" <truncated>");
                    break;
                };
                pos += width;

                if op == OpCode::CONSTANT {
                    match self.constant(operand) {
                        Some(value) => text.push_str(&format!(" {} '{}'", operand, value)),
                        None => text.push_str(&format!(" {} <missing>", operand)),
                    }
                } else {
                    text.push_str(&format!(" {}", operand));
                }
            }

            debug!("Disassemble: pos={}, line={}, {}", pos, line, text);
            lines.push(text);
        }

        lines
    }
}

/// Zigzag-encodes `value` and writes it as LEB128 into `buf`, returning the
/// number of bytes used.
fn put_varint(buf: &mut [u8; MAX_VARINT_LEN], value: i64) -> usize {
    let mut ux: u64 = ((value << 1) ^ (value >> 63)) as u64;
    let mut i: usize = 0;

    while ux >= 0x80 {
        buf[i] = (ux as u8) | 0x80;
        ux >>= 7;
        i += 1;
    }
    buf[i] = ux as u8;

    i + 1
}

/// Inverse of [`put_varint`]. `None` on truncated or overlong input.
fn get_varint(bytes: &[u8]) -> Option<(i64, usize)> {
    let mut ux: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &b) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        if b < 0x80 {
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return None;
            }
            ux |= u64::from(b) << shift;

            let value: i64 = ((ux >> 1) as i64) ^ -((ux & 1) as i64);
            return Some((value, i + 1));
        }

        ux |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }

    None
}
