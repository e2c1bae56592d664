#[cfg(test)]
mod bytecode_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use lhox::ast::Stmt;
    use lhox::chunk::Chunk;
    use lhox::codegen::{ChunkEmitter, CodeGenerator, Emitter};
    use lhox::opcode::OpCode;
    use lhox::parser::Parser;
    use lhox::scanner::Scanner;
    use lhox::token::Offset;
    use lhox::value::Value;
    use lhox::vm::{InterpretResult, Vm};

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Records what the generator asks for instead of encoding bytes.
    #[derive(Default)]
    struct RecordingEmitter {
        ops: Vec<(OpCode, Option<i64>)>,
        constants: Vec<Value>,
    }

    impl Emitter for RecordingEmitter {
        fn emit(&mut self, _: Offset, op: OpCode, operand: Option<i64>) {
            self.ops.push((op, operand));
        }

        fn emit_constant(&mut self, offset: Offset, value: Value) {
            self.constants.push(value);
            let index = (self.constants.len() - 1) as i64;
            self.emit(offset, OpCode::CONSTANT, Some(index));
        }
    }

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        statements
    }

    fn compile(source: &str) -> Chunk {
        let statements = parse(source);
        let mut chunk = Chunk::new();

        CodeGenerator::new(ChunkEmitter::new(&mut chunk))
            .generate(&statements)
            .expect("codegen succeeds");

        chunk
    }

    fn run(source: &str) -> (InterpretResult, Vm, String) {
        let chunk = compile(source);
        let out = SharedBuf::default();
        let mut vm = Vm::with_output(Box::new(out.clone()));

        let result = vm.interpret(&chunk);

        (result, vm, out.contents())
    }

    #[test]
    fn test_small_int_uses_dedicated_opcode() {
        let chunk = compile("5;");

        assert_eq!(chunk.code(), &[OpCode::CONSTANT_5 as u8, OpCode::RETURN as u8]);
        assert!(chunk.constants().is_empty());
        assert_eq!(chunk.disassemble(), vec!["OP_CONSTANT_5", "OP_RETURN"]);
    }

    #[test]
    fn test_large_int_goes_through_the_pool() {
        let chunk = compile("600;");

        assert_eq!(chunk.constants(), &[Value::Int(600)]);
        assert_eq!(chunk.disassemble(), vec!["OP_CONSTANT 0 '600'", "OP_RETURN"]);
    }

    #[test]
    fn test_literal_opcodes() {
        let chunk = compile("nil; true; false; -1; 2.5; \"s\";");

        assert_eq!(
            chunk.disassemble(),
            vec![
                "OP_NIL",
                "OP_TRUE",
                "OP_FALSE",
                "OP_CONSTANT_1",
                "OP_NEGATE",
                "OP_CONSTANT 0 '2.5'",
                "OP_CONSTANT 1 's'",
                "OP_RETURN",
            ]
        );
    }

    #[test]
    fn test_disassembly_follows_emission_order() {
        let chunk = compile("print 1 + 2 * 3 >= 7;");

        assert_eq!(
            chunk.disassemble(),
            vec![
                "OP_CONSTANT_1",
                "OP_CONSTANT_2",
                "OP_CONSTANT_3",
                "OP_MULTIPLY",
                "OP_ADD",
                "OP_CONSTANT 0 '7'",
                "OP_GREATER_EQUAL",
                "OP_PRINT",
                "OP_RETURN",
            ]
        );
        assert_eq!(chunk.offsets().len(), 9);
    }

    #[test]
    fn test_wide_constant_indices() {
        let source: String = (100..200).map(|n| format!("{};", n)).collect();
        let chunk = compile(&source);

        assert_eq!(chunk.constants().len(), 100);

        let listing = chunk.disassemble();
        assert_eq!(listing[64], "OP_CONSTANT 64 '164'");
        assert_eq!(listing[99], "OP_CONSTANT 99 '199'");

        let (result, vm, _) = run(&source);
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(vm.last_value(), Some(&Value::Int(199)));
    }

    #[test]
    fn test_unsupported_nodes_emit_nothing() {
        let chunk = compile("var x = 1; { print x; } while (false) {} x = 2;");

        assert_eq!(chunk.disassemble(), vec!["OP_RETURN"]);
    }

    #[test]
    fn test_generator_drives_any_emitter() {
        let statements = parse("\"s\" + 1.5;");
        let mut generator = CodeGenerator::new(RecordingEmitter::default());
        generator.generate(&statements).expect("codegen succeeds");

        let emitter = generator.into_emitter();
        assert_eq!(
            emitter.ops,
            vec![
                (OpCode::CONSTANT, Some(0)),
                (OpCode::CONSTANT, Some(1)),
                (OpCode::ADD, None),
                (OpCode::RETURN, None),
            ]
        );
        assert_eq!(emitter.constants, vec![Value::from("s"), Value::Float(1.5)]);
    }

    #[test]
    fn test_vm_arithmetic() {
        let (result, _, output) =
            run("print 1 + 2 * 3; print 7 / 2; print -(10 - 4) / 4; print 1.5 * 2; print 2 - 0.5;");

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "7\n3\n-1\n3\n1.5\n");
    }

    #[test]
    fn test_vm_int_division_by_zero_is_float() {
        let (result, _, output) = run("print 7 / 0; print -7 / 0;");

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "inf\n-inf\n");
    }

    #[test]
    fn test_vm_string_coercion() {
        let (result, vm, output) =
            run("print \"n = \" + 1; print 1 + \"a\"; print \"x\" + 2.5; print \"a\" + \"b\";");

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "n = 1\n1a\nx2.500000\nab\n");
        assert_eq!(vm.objects().len(), 4);
    }

    #[test]
    fn test_vm_equality_promotes() {
        let (_, _, output) = run("print 1 == 1.0; print 2 != 2; print nil == false; print \"a\" == \"a\";");

        assert_eq!(output, "true\nfalse\nfalse\ntrue\n");
    }

    #[test]
    fn test_vm_comparisons_and_not() {
        let (_, _, output) = run("print 2 > 1; print 2 < 1.5; print 3 <= 3; print !nil; print !0;");

        assert_eq!(output, "true\nfalse\ntrue\ntrue\nfalse\n");
    }

    #[test]
    fn test_vm_last_value_is_final_expression() {
        let (result, vm, output) = run("1 + 1; (4 - 1) * 2;");

        assert_eq!(result, InterpretResult::Ok);
        assert!(output.is_empty());
        assert_eq!(vm.last_value(), Some(&Value::Int(6)));
    }

    #[test]
    fn test_vm_negating_a_string_is_a_runtime_error() {
        let (result, vm, _) = run("print -\"s\";");

        assert_eq!(result, InterpretResult::RuntimeError);
        assert!(vm.last_error().is_some_and(|m| m.contains("operand must be a number")));
    }

    #[test]
    fn test_vm_comparing_non_numbers_is_a_runtime_error() {
        let (result, vm, _) = run("print \"a\" < 1;");

        assert_eq!(result, InterpretResult::RuntimeError);
        assert!(vm.last_error().is_some_and(|m| m.contains("operands must be numbers")));
    }

    #[test]
    fn test_vm_reports_missing_constant() {
        let mut chunk = Chunk::new();
        chunk.write(Offset::default(), OpCode::CONSTANT_1, None);

        let mut vm = Vm::with_output(Box::new(io::sink()));
        assert_eq!(vm.interpret(&chunk), InterpretResult::Ok);
        assert_eq!(vm.stack(), &[Value::Int(1)]);

        let mut corrupt = Chunk::new();
        corrupt.write(Offset::default(), OpCode::CONSTANT, Some(3));

        assert_eq!(vm.interpret(&corrupt), InterpretResult::RuntimeError);
        assert!(vm.last_error().is_some_and(|m| m.contains("out of range")));
    }

    #[test]
    fn test_chunk_operands_round_trip_through_write() {
        let mut chunk = Chunk::new();
        chunk.write(Offset::new(3, 0), OpCode::CONSTANT, Some(300));
        chunk.write(Offset::new(3, 4), OpCode::RETURN, None);

        assert_eq!(chunk.operator(0), Some(OpCode::CONSTANT));
        assert_eq!(chunk.read_operand(1), Some((300, 2)));
        assert_eq!(chunk.operator(3), Some(OpCode::RETURN));
        assert_eq!(chunk.offsets(), &[Offset::new(3, 0), Offset::new(3, 4)]);

        chunk.clear();
        assert!(chunk.is_empty());
        assert!(chunk.offsets().is_empty());
    }
}
