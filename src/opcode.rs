use std::fmt;

/// One-byte instruction tags of the bytecode backend.
///
/// The discriminant is the byte written to the chunk and the index into the
/// VM's dispatch table, so the order here is part of the encoding.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    CONSTANT,
    TRUE,
    FALSE,
    NIL,
    CONSTANT_M1,
    CONSTANT_0,
    CONSTANT_1,
    CONSTANT_2,
    CONSTANT_3,
    CONSTANT_4,
    CONSTANT_5,

    NEGATE,
    NOT,

    ADD,
    SUBTRACT,
    MULTIPLY,
    DIVIDE,
    EQUAL,
    NOT_EQUAL,
    GREATER,
    LESS,
    GREATER_EQUAL,
    LESS_EQUAL,

    RETURN,
    PRINT,
}

impl OpCode {
    /// Number of opcodes; sizes the VM dispatch table.
    pub const COUNT: usize = OpCode::PRINT as usize + 1;

    const ALL: [OpCode; OpCode::COUNT] = [
        OpCode::CONSTANT,
        OpCode::TRUE,
        OpCode::FALSE,
        OpCode::NIL,
        OpCode::CONSTANT_M1,
        OpCode::CONSTANT_0,
        OpCode::CONSTANT_1,
        OpCode::CONSTANT_2,
        OpCode::CONSTANT_3,
        OpCode::CONSTANT_4,
        OpCode::CONSTANT_5,
        OpCode::NEGATE,
        OpCode::NOT,
        OpCode::ADD,
        OpCode::SUBTRACT,
        OpCode::MULTIPLY,
        OpCode::DIVIDE,
        OpCode::EQUAL,
        OpCode::NOT_EQUAL,
        OpCode::GREATER,
        OpCode::LESS,
        OpCode::GREATER_EQUAL,
        OpCode::LESS_EQUAL,
        OpCode::RETURN,
        OpCode::PRINT,
    ];

    /// Decode a code byte; `None` for bytes past the last opcode.
    #[inline]
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Signed-varint operands following the opcode byte.
    #[inline]
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::CONSTANT => 1,
            _ => 0,
        }
    }

    /// Zero-operand opcode for a small integer literal, if there is one.
    pub fn small_int(n: i64) -> Option<OpCode> {
        match n {
            -1 => Some(OpCode::CONSTANT_M1),
            0 => Some(OpCode::CONSTANT_0),
            1 => Some(OpCode::CONSTANT_1),
            2 => Some(OpCode::CONSTANT_2),
            3 => Some(OpCode::CONSTANT_3),
            4 => Some(OpCode::CONSTANT_4),
            5 => Some(OpCode::CONSTANT_5),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::CONSTANT => "OP_CONSTANT",
            OpCode::TRUE => "OP_TRUE",
            OpCode::FALSE => "OP_FALSE",
            OpCode::NIL => "OP_NIL",
            OpCode::CONSTANT_M1 => "OP_CONSTANT_M1",
            OpCode::CONSTANT_0 => "OP_CONSTANT_0",
            OpCode::CONSTANT_1 => "OP_CONSTANT_1",
            OpCode::CONSTANT_2 => "OP_CONSTANT_2",
            OpCode::CONSTANT_3 => "OP_CONSTANT_3",
            OpCode::CONSTANT_4 => "OP_CONSTANT_4",
            OpCode::CONSTANT_5 => "OP_CONSTANT_5",
            OpCode::NEGATE => "OP_NEGATE",
            OpCode::NOT => "OP_NOT",
            OpCode::ADD => "OP_ADD",
            OpCode::SUBTRACT => "OP_SUBTRACT",
            OpCode::MULTIPLY => "OP_MULTIPLY",
            OpCode::DIVIDE => "OP_DIVIDE",
            OpCode::EQUAL => "OP_EQUAL",
            OpCode::NOT_EQUAL => "OP_NOT_EQUAL",
            OpCode::GREATER => "OP_GREATER",
            OpCode::LESS => "OP_LESS",
            OpCode::GREATER_EQUAL => "OP_GREATER_EQUAL",
            OpCode::LESS_EQUAL => "OP_LESS_EQUAL",
            OpCode::RETURN => "OP_RETURN",
            OpCode::PRINT => "OP_PRINT",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_decode_to_their_own_opcode() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_byte(op as u8), Some(op));
        }

        assert_eq!(OpCode::from_byte(OpCode::COUNT as u8), None);
    }
}
