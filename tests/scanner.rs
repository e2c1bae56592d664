#[cfg(test)]
mod scanner_tests {
    use lhox::error::LhoxError;
    use lhox::scanner::*;
    use lhox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(result: &Result<Token, LhoxError>, tt: TokenType, lexeme: &str) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, tt);
                assert_eq!(token.lexeme, lexeme);
            }
            Err(e) => panic!("Expected {:?} '{}', got error: {}", tt, lexeme, e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= ? :",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_aliases() {
        assert_token_sequence(
            "var x = T; while (F) break; continue",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::TRUE, "T"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::FALSE, "F"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<&LhoxError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 2, "Expected 2 error messages");

        for err in errors {
            assert!(
                err.to_string().contains("unexpected character"),
                "got: {}",
                err
            );
        }
    }

    #[test]
    fn test_numbers_int_and_real() {
        let (tokens, errors) = Scanner::new("42 3.25 .5").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::NUMBER_INT);
        assert_eq!(tokens[0].literal, Some(Literal::Int(42)));
        assert_eq!(tokens[1].token_type, TokenType::NUMBER_REAL);
        assert_eq!(tokens[1].literal, Some(Literal::Real(3.25)));
        assert_eq!(tokens[2].token_type, TokenType::NUMBER_REAL);
        assert_eq!(tokens[2].literal, Some(Literal::Real(0.5)));
    }

    #[test]
    fn test_number_with_two_points_is_an_error() {
        let (_, errors) = Scanner::new("1.2.3").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("multiple decimal points"));
    }

    #[test]
    fn test_method_call_on_number_keeps_dot() {
        assert_token_sequence(
            "1.foo",
            &[
                (TokenType::NUMBER_INT, "1"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_string_spans_lines() {
        let (tokens, errors) = Scanner::new("\"a\nb\" x").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::STRING);
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".to_string())));
        assert_eq!(tokens[1].line(), 2);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = Scanner::new("\"abc").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("unterminated string"));
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_comments_are_tokens() {
        let (tokens, errors) = Scanner::new("// comment\n1").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::COMMENT);
        assert_eq!(tokens[0].literal, Some(Literal::Str(" comment".to_string())));
        assert_eq!(tokens[1].token_type, TokenType::NUMBER_INT);
        assert_eq!(tokens[1].line(), 2);
    }

    #[test]
    fn test_block_comment_counts_lines() {
        let (tokens, errors) = Scanner::new("/* a\nb */ x").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::MULTI_COMMENT);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line(), 2);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, errors) = Scanner::new("/* never closed").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("unterminated multi-line comment"));
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_token_sequence(
            "var café = ünïcode;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "café"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "ünïcode"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_exactly_one_eof() {
        let tokens: Vec<_> = Scanner::new("").collect();

        assert_eq!(tokens.len(), 1);
        assert_token_matches(&tokens[0], TokenType::EOF, "");
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = Scanner::new("x 12 \"hi\"").scan_tokens();

        assert_eq!(tokens[0].to_string(), "IDENTIFIER x null");
        assert_eq!(tokens[1].to_string(), "NUMBER_INT 12 12");
        assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
    }
}
