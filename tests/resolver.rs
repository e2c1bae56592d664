#[cfg(test)]
mod resolver_tests {
    use lhox::error::{LhoxError, Result};
    use lhox::interpreter::Interpreter;
    use lhox::parser::Parser;
    use lhox::resolver::Resolver;
    use lhox::scanner::Scanner;

    fn resolve(source: &str) -> Result<()> {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));
        Resolver::new(&mut interpreter).resolve(&statements)
    }

    fn assert_resolve_error(source: &str, expected: &str) {
        match resolve(source) {
            Err(e @ LhoxError::Resolve { .. }) => {
                assert!(e.to_string().contains(expected), "got: {}", e)
            }
            other => panic!("expected resolve error '{}', got {:?}", expected, other),
        }
    }

    #[test]
    fn test_valid_program_resolves() {
        let source = r#"
            var a = 1;
            fun outer() {
                var b = a;
                fun inner() { return b; }
                return inner;
            }
            class A { m() { return this; } }
            class B < A { m() { return super.m(); } }
        "#;

        assert!(resolve(source).is_ok());
    }

    #[test]
    fn test_globals_may_be_redeclared() {
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn test_redeclaration_in_block() {
        assert_resolve_error("{ var a = 1; var a = 2; }", "'a' already declared in this scope");
    }

    #[test]
    fn test_shadowing_in_nested_block_is_allowed() {
        assert!(resolve("{ var a = 1; { var a = 2; } }").is_ok());
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_resolve_error("fun f(a, a) {}", "'a' already declared in this scope");
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_resolve_error(
            "var a = 1; { var a = a; }",
            "cannot read local variable 'a' in own initializer",
        );
    }

    #[test]
    fn test_return_at_top_level() {
        assert_resolve_error("return 1;", "cannot return from top-level code");
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_resolve_error(
            "class A { init() { return 1; } }",
            "cannot return a value from an initializer",
        );
    }

    #[test]
    fn test_bare_return_from_initializer_is_allowed() {
        assert!(resolve("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn test_this_outside_class() {
        assert_resolve_error("print this;", "cannot use 'this' outside of a class");
        assert_resolve_error("fun f() { return this; }", "cannot use 'this' outside of a class");
    }

    #[test]
    fn test_super_outside_class() {
        assert_resolve_error("print super.m;", "cannot use 'super' outside of a class");
    }

    #[test]
    fn test_super_without_superclass() {
        assert_resolve_error(
            "class A { m() { return super.m(); } }",
            "cannot use 'super' in a class with no superclass",
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_resolve_error("class B < B {}", "a class cannot inherit from itself");
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        assert_resolve_error(
            "while (true) { fun f() { break; } }",
            "'break' outside of a loop",
        );
    }

    #[test]
    fn test_resolution_stops_at_first_error() {
        let err = resolve("return 1; print this;").unwrap_err();

        assert!(err.to_string().contains("top-level"), "got: {}", err);
    }
}
