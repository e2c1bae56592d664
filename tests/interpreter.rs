#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    use lhox::error::{LhoxError, Result};
    use lhox::interpreter::Interpreter;
    use lhox::parser::Parser;
    use lhox::resolver::Resolver;
    use lhox::scanner::Scanner;
    use lhox::value::Value;

    /// Cloneable in-memory sink so the test keeps a handle on program output.
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

    fn execute(interpreter: &mut Interpreter, source: &str) -> Result<()> {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        Resolver::new(interpreter).resolve(&statements)?;
        interpreter.interpret(&statements)
    }

    fn run_with_input(source: &str, input: &str) -> (Result<()>, String) {
        let out = SharedBuf::default();
        let mut interpreter = Interpreter::with_io(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            Box::new(out.clone()),
        );

        let result = execute(&mut interpreter, source);

        (result, out.contents())
    }

    fn run(source: &str) -> String {
        let (result, output) = run_with_input(source, "");
        if let Err(e) = result {
            panic!("program failed: {}\noutput so far:\n{}", e, output);
        }

        output
    }

    fn runtime_error(source: &str) -> String {
        match run_with_input(source, "").0 {
            Err(e @ LhoxError::Runtime(_)) => e.to_string(),
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_and_printing() {
        assert_eq!(
            run("print 1 + 2 * 3; print 7 / 2; print -7 / 2; print 1.5 * 2; print 1 + 0.5;"),
            "7\n3\n-3\n3\n1.5\n"
        );
    }

    #[test]
    fn test_print_values() {
        assert_eq!(
            run("print nil; print true; print \"hi\"; print 2.25;"),
            "nil\ntrue\nhi\n2.25\n"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_concatenating_string_with_number_fails() {
        assert!(runtime_error("print \"n = \" + 1;").contains("can only concatenate string to string"));
    }

    #[test]
    fn test_integer_division_by_zero() {
        assert!(runtime_error("print 1 / 0;").contains("division by zero"));
    }

    #[test]
    fn test_float_division_by_zero_follows_ieee() {
        assert_eq!(
            run("print 1.0 / 0; print -1.0 / 0; print 0.0 / 0 == 0.0 / 0; print 3 / 0.0;"),
            "inf\n-inf\nfalse\ninf\n"
        );
    }

    #[test]
    fn test_non_numeric_operands() {
        assert!(runtime_error("print true - 1;").contains("operand must be a int or float"));
        assert!(runtime_error("print -\"x\";").contains("operand must be a number"));
    }

    #[test]
    fn test_equality_and_comparison() {
        assert_eq!(
            run("print 1 == 1; print 1 == 1.0; print \"a\" != \"b\"; print nil == nil; print 2 > 1.5; print 3 <= 3;"),
            "true\nfalse\ntrue\ntrue\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_truthiness_and_logic() {
        assert_eq!(
            run("print !nil; print !0; print nil and 1; print 1 and 2; print true ? \"y\" : \"n\";"),
            "true\nfalse\nnil\n2\ny\n"
        );
    }

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            run("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_assignment_reaches_enclosing_scope() {
        assert_eq!(run("var a = 1; { a = 5; } print a;"), "5\n");
    }

    #[test]
    fn test_undefined_variable() {
        assert!(runtime_error("print missing;").contains("undefined variable: missing"));
        assert!(runtime_error("missing = 1;").contains("cannot assign to undefined variable: missing"));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            run("if (1 < 2) print \"yes\"; else print \"no\"; if (nil) print 1;"),
            "yes\n"
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(run("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let source = r#"
            var i = 0;
            while (true) {
                i = i + 1;
                if (i == 2) continue;
                if (i > 4) break;
                print i;
            }
        "#;

        assert_eq!(run(source), "1\n3\n4\n");
    }

    #[test]
    fn test_break_inside_for() {
        assert_eq!(
            run("for (var i = 0; i < 10; i = i + 1) { if (i == 2) break; print i; }"),
            "0\n1\n"
        );
    }

    #[test]
    fn test_functions_and_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
            fun nothing() {}
            print nothing();
            print fib;
        "#;

        assert_eq!(run(source), "55\nnil\n<fn fib>\n");
    }

    #[test]
    fn test_deep_recursion_does_not_exhaust_native_stack() {
        let output = run(
            "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }
             print count(2000);
             print count(20000);",
        );

        assert_eq!(output, "2000\n20000\n");
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let out = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(out.clone()));
        interpreter.set_max_call_depth(200);

        match execute(&mut interpreter, "fun down(n) { return down(n + 1); } down(0);") {
            Err(LhoxError::Runtime(message)) => assert_eq!(message, "stack overflow"),
            other => panic!("expected a runtime error, got {:?}", other),
        }

        execute(&mut interpreter, "fun depth(n) { if (n == 0) return 0; return depth(n - 1); } print depth(150);")
            .expect("call depth unwinds after the error");
        assert_eq!(out.contents(), "0\n");
    }

    #[test]
    fn test_return_from_inside_loop() {
        let source = r#"
            fun first(limit) {
                var i = 0;
                while (true) {
                    if (i == limit) return i;
                    i = i + 1;
                }
            }
            print first(3);
        "#;

        assert_eq!(run(source), "3\n");
    }

    #[test]
    fn test_closures_capture_their_environment() {
        let source = r#"
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count = count + 1;
                    return count;
                }
                return increment;
            }
            var counter = makeCounter();
            counter();
            print counter();
        "#;

        assert_eq!(run(source), "2\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(run(source), "global\nglobal\n");
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(runtime_error("fun f(a) {} f(1, 2);").contains("expected 1 arguments but got 2"));
    }

    #[test]
    fn test_calling_a_non_callable() {
        assert!(runtime_error("\"text\"();").contains("can only call functions and classes"));
    }

    #[test]
    fn test_classes_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            print p;
            print Point;
        "#;

        assert_eq!(run(source), "3\n12\nPoint instance\nPoint\n");
    }

    #[test]
    fn test_set_evaluates_value_before_object() {
        let output = run(
            "class Holder {}
             var holder = Holder();
             var trace = \"\";
             fun target() { trace = trace + \"object \"; return holder; }
             fun value() { trace = trace + \"value \"; return 7; }
             target().slot = value();
             print trace;
             print holder.slot;",
        );

        assert_eq!(output, "value object \n7\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = r#"
            class A {
                init() { this.v = 1; return; }
            }
            var a = A();
            print a.init();
        "#;

        assert_eq!(run(source), "A instance\n");
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = r#"
            class Animal {
                speak() { return "..."; }
                name() { return "animal"; }
            }
            class Dog < Animal {
                speak() { return "woof after " + super.speak(); }
            }
            var d = Dog();
            print d.speak();
            print d.name();
        "#;

        assert_eq!(run(source), "woof after ...\nanimal\n");
    }

    #[test]
    fn test_bound_method_keeps_this() {
        let source = r#"
            class Box {
                init(v) { this.v = v; }
                get() { return this.v; }
            }
            var getter = Box(7).get;
            print getter();
        "#;

        assert_eq!(run(source), "7\n");
    }

    #[test]
    fn test_undefined_property() {
        let message = runtime_error("class A {} print A().missing;");

        assert!(message.contains("undefined property"), "got: {}", message);
    }

    #[test]
    fn test_properties_only_on_instances() {
        assert!(runtime_error("var x = 1; print x.y;").contains("only instances have properties"));
        assert!(runtime_error("var x = 1; x.y = 2;").contains("only instances have fields"));
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        assert!(runtime_error("var NotClass = 1; class A < NotClass {}").contains("superclass must be a class"));
    }

    #[test]
    fn test_string_natives() {
        assert_eq!(
            run("print strlen(\"héllo\"); print substring(\"hello\", 1, 3); print str(12) + \"!\";"),
            "5\nel\n12!\n"
        );
    }

    #[test]
    fn test_substring_out_of_range() {
        assert!(runtime_error("substring(\"abc\", 2, 5);").contains("substring index out of range"));
        assert!(runtime_error("substring(\"abc\", \"x\", 1);").contains("substring indices must be numbers"));
    }

    #[test]
    fn test_conversion_natives() {
        assert_eq!(
            run("print int(\"42\") + 1; print float(\"1.5\") * 2; print int(7);"),
            "43\n3\n7\n"
        );
        assert!(runtime_error("int(\"abc\");").contains("cannot convert 'abc' to int"));
    }

    #[test]
    fn test_random_natives_stay_in_range() {
        assert_eq!(
            run("var r = randInt(3); print r >= 0 and r < 3; var f = rand(); print f >= 0 and f < 1;"),
            "true\ntrue\n"
        );
        assert!(runtime_error("randInt(0);").contains("randInt argument must be > 0"));
    }

    #[test]
    fn test_clock_and_sleep() {
        assert_eq!(run("print clock() > 0; sleep(1);"), "true\n");
        assert!(runtime_error("sleep(-1);").contains("sleep argument must be >= 0"));
    }

    #[test]
    fn test_native_display() {
        assert_eq!(run("print strlen;"), "<native fn strlen>\n");
    }

    #[test]
    fn test_input_reads_a_line() {
        let (result, output) = run_with_input("var name = input(\"name? \"); print \"hi \" + name;", "Ada\nrest\n");

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, "name? hi Ada\n");
    }

    #[test]
    fn test_input_at_end_of_stream_fails() {
        let (result, _) = run_with_input("input(\"> \");", "");

        assert!(matches!(result, Err(LhoxError::Runtime(_))));
    }

    #[test]
    fn test_getch_skips_leading_newline() {
        let (result, output) = run_with_input("print getch(); print getch();", "\nxé");

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, "x\né\n");
    }

    #[test]
    fn test_globals_persist_across_runs() {
        let out = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(out.clone()));

        execute(&mut interpreter, "var a = 40; fun add(x) { return a + x; }").expect("first run");
        execute(&mut interpreter, "print add(2);").expect("second run");

        assert_eq!(out.contents(), "42\n");
        assert_eq!(interpreter.globals().borrow().get("a").ok(), Some(Value::Int(40)));
    }

    #[test]
    fn test_interpreter_recovers_after_runtime_error() {
        let out = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(out.clone()));

        assert!(execute(&mut interpreter, "{ var local = 1; print 1 / 0; }").is_err());
        execute(&mut interpreter, "var after = 3; print after;").expect("run after error");

        assert_eq!(out.contents(), "3\n");
    }
}
