// tests/parser_tests.rs

use ndjson_select::ast::{
    Aggregate, BinOp, Direction, Expr, Function, Identifier, LimitClause, SelectClause, UnaryOp,
};
use ndjson_select::parser::{parse, parse_expression};

fn expr(text: &str) -> Expr {
    parse_expression(text).unwrap_or_else(|e| panic!("failed to parse {}: {}", text, e))
}

fn canonical(text: &str) -> String {
    expr(text).to_string()
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_minimal_query() {
    let query = parse("SELECT * FROM test").unwrap();

    assert_eq!(query.select, SelectClause::Star);
    assert_eq!(query.from.table, Identifier::new("test"));
    assert_eq!(query.from.alias, None);
    assert!(query.where_clause.is_none());
    assert!(query.order_by.is_none());
    assert!(query.limit.is_none());
}

#[test]
fn test_from_is_mandatory() {
    assert!(parse("SELECT *").is_err());
}

#[test]
fn test_clauses_out_of_order_fail() {
    let err = parse("SELECT * FROM test ORDER BY col1 WHERE col2").unwrap_err();
    assert!(err.message.contains("WHERE"), "{}", err);
}

#[test]
fn test_trailing_input_fails() {
    assert!(parse("SELECT * FROM test extra stuff").is_err());
    assert!(parse("SELECT a FROM t LIMIT 1 2").is_err());
}

#[test]
fn test_full_query() {
    let query = parse(
        "SELECT s.name AS n, COUNT(*) FROM S3Object AS s WHERE s.age > 21 \
         ORDER BY s.age DESC, s.name LIMIT 10 OFFSET 5",
    )
    .unwrap();

    let SelectClause::List(columns) = &query.select else {
        panic!("expected column list");
    };
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].alias, Some(Identifier::new("n")));
    assert_eq!(
        columns[1].expr,
        Expr::Function(Function::Aggregate(Aggregate::Count(None)))
    );
    assert_eq!(query.from.alias, Some(Identifier::new("s")));

    let order = query.order_by.as_ref().unwrap();
    assert_eq!(order.keys[0].direction, Direction::Desc);
    assert_eq!(order.keys[1].direction, Direction::Asc);
    assert_eq!(
        query.limit,
        Some(LimitClause {
            limit: 10,
            offset: Some(5),
        })
    );
}

#[test]
fn test_limit_requires_whole_number() {
    assert!(parse("SELECT * FROM t LIMIT 1.5").is_err());
    assert!(parse("SELECT * FROM t LIMIT -1").is_err());
    assert!(parse("SELECT * FROM t LIMIT 1.0").is_err());
    assert!(parse("SELECT * FROM t LIMIT 1e1").is_err());
    assert!(parse("SELECT * FROM t LIMIT 1 OFFSET 2.0").is_err());
    assert_eq!(
        parse("SELECT * FROM t LIMIT 10 OFFSET 0").unwrap().limit,
        Some(LimitClause {
            limit: 10,
            offset: Some(0),
        })
    );
}

#[test]
fn test_canonical_query_text() {
    let cases = vec![
        ("SELECT * FROM S3Object", "SELECT * FROM S3Object"),
        (
            "select s.a as x from s3object as s where s.a = 1 and s.b < 2",
            "SELECT s.a AS x FROM s3object s WHERE ((s.a = 1) AND (s.b < 2))",
        ),
        (
            "SELECT a FROM t ORDER BY a ASC, b DESC LIMIT 3",
            "SELECT a FROM t ORDER BY a, b DESC LIMIT 3",
        ),
    ];

    for (input, expected) in cases {
        assert_eq!(parse(input).unwrap().to_string(), expected);
    }
}

#[test]
fn test_round_trip_is_idempotent() {
    let queries = [
        "SELECT * FROM S3Object",
        "SELECT s.a, s.b.c AS x FROM S3Object s WHERE s.a IS NOT MISSING",
        "SELECT COUNT(*), AVG(s.n), MAX(s.n) FROM s3object s WHERE s.n BETWEEN 1 AND 10",
        "SELECT LOWER(s.name) || '-' || s.id FROM s3object s WHERE s.name LIKE 'a%' ESCAPE '!'",
        "SELECT -s.a * (s.b + 2) % 3 FROM s3object s WHERE NOT s.flag OR s.kind IN ('x', 'y')",
        r#"SELECT s."Mixed Case" FROM s3object s WHERE s.v IS NULL AND s.w NOT BETWEEN 0 AND 1"#,
        "SELECT s.a FROM s3object s ORDER BY s.a DESC LIMIT 5 OFFSET 2",
        "SELECT s.a FROM s3object s WHERE s.t = TRUE AND s.f <> FALSE",
        "SELECT 'it''s' FROM s3object",
    ];

    for text in queries {
        let first = parse(text).unwrap();
        let rendered = first.to_string();
        let second = parse(&rendered).unwrap_or_else(|e| panic!("{} -> {}: {}", text, rendered, e));
        assert_eq!(first, second, "round trip changed {}", text);
        assert_eq!(second.to_string(), rendered);
    }
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(canonical("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(canonical("(1 + 2) * 3"), "((1 + 2) * 3)");
    assert_eq!(canonical("1 - 2 - 3"), "((1 - 2) - 3)");
    assert_eq!(canonical("-a * b"), "((-a) * b)");
}

#[test]
fn test_logical_precedence() {
    assert_eq!(canonical("a OR b AND c"), "(a OR (b AND c))");
    assert_eq!(canonical("NOT a = 1 AND b"), "((NOT (a = 1)) AND b)");
    assert_eq!(canonical("NOT NOT a"), "(NOT (NOT a))");
}

#[test]
fn test_concat_is_right_associative() {
    let parsed = expr("a || b || c");
    let Expr::Binary {
        op: BinOp::Concat,
        left,
        right,
    } = parsed
    else {
        panic!("expected concat");
    };
    assert_eq!(*left, Expr::Identifier(Identifier::new("a")));
    assert!(matches!(*right, Expr::Binary { op: BinOp::Concat, .. }));
}

#[test]
fn test_comparison_does_not_chain() {
    assert!(parse_expression("a < b < c").is_err());
}

#[test]
fn test_between_upper_bound_is_full_expression() {
    assert_eq!(
        canonical("a BETWEEN 1 AND 5 AND b"),
        "(a BETWEEN 1 AND (5 AND b))"
    );
    assert_eq!(canonical("a NOT BETWEEN 1 AND 5"), "(a NOT BETWEEN 1 AND 5)");
    assert_eq!(
        canonical("a BETWEEN b + 1 AND c OR d"),
        "(a BETWEEN (b + 1) AND (c OR d))"
    );

    let Expr::Between { lower, upper, .. } = expr("a BETWEEN 1 AND 5 AND b") else {
        panic!("expected BETWEEN at the root");
    };
    assert_eq!(*lower, expr("1"));
    assert_eq!(*upper, expr("5 AND b"));
}

#[test]
fn test_like_operands_are_full_expressions() {
    assert_eq!(canonical("a LIKE 'x' OR b"), "(a LIKE ('x' OR b))");
    assert_eq!(
        canonical("a LIKE 'x' || b ESCAPE '!' || c"),
        "(a LIKE ('x' || b) ESCAPE ('!' || c))"
    );

    let Expr::Like { pattern, escape, .. } = expr("a LIKE 'x' OR b") else {
        panic!("expected LIKE at the root");
    };
    assert_eq!(*pattern, expr("'x' OR b"));
    assert!(escape.is_none());
}

#[test]
fn test_is_null_and_missing() {
    assert_eq!(canonical("a IS NULL"), "(a IS NULL)");
    assert_eq!(canonical("a IS NOT NULL"), "(a IS NOT NULL)");
    assert_eq!(canonical("a IS MISSING"), "(a IS MISSING)");
    assert_eq!(canonical("a.b IS NOT MISSING"), "(a.b IS NOT MISSING)");
    assert_eq!(canonical("a IS NULL IS MISSING"), "((a IS NULL) IS MISSING)");
}

#[test]
fn test_in_and_like() {
    assert_eq!(canonical("a + 1 IN (1, 2)"), "((a + 1) IN (1, 2))");
    assert_eq!(canonical("a LIKE 'x%'"), "(a LIKE 'x%')");
    assert_eq!(
        canonical("a LIKE '%x^%' ESCAPE '^'"),
        "(a LIKE '%x^%' ESCAPE '^')"
    );
}

// ============================================================================
// Terms
// ============================================================================

#[test]
fn test_qualified_paths() {
    assert_eq!(expr("a"), Expr::Identifier(Identifier::new("a")));
    assert_eq!(
        expr("s.a.b"),
        Expr::path(
            vec![Identifier::new("s"), Identifier::new("a"), Identifier::new("b")],
            false
        )
    );
    assert_eq!(canonical("s.*"), "s.*");
    assert_eq!(canonical(r#"s."a b""#), r#"s."a b""#);
}

#[test]
fn test_quoted_identifiers_are_case_sensitive() {
    assert_eq!(expr(r#""Name""#), Expr::Identifier(Identifier::quoted("Name")));
    assert_ne!(expr(r#""Name""#), expr("Name"));
}

#[test]
fn test_function_calls() {
    assert_eq!(
        expr("lower(s.a)"),
        Expr::Function(Function::Scalar {
            name: "lower".to_string(),
            args: vec![expr("s.a")],
        })
    );
    assert_eq!(
        expr("sum(a)"),
        Expr::Function(Function::Aggregate(Aggregate::Sum(Box::new(expr("a")))))
    );
    assert!(parse_expression("AVG(*)").is_err());
}

#[test]
fn test_negation_of_literal() {
    assert_eq!(
        expr("-1"),
        Expr::unary(UnaryOp::Negate, Expr::Number(1.into()))
    );
}

#[test]
fn test_in_list_precomputes_literal_set() {
    let Expr::In(list) = expr("a IN ('x', 'y', 'x')") else {
        panic!("expected IN");
    };
    assert_eq!(list.literal_set().map(|s| s.len()), Some(2));

    let Expr::In(list) = expr("a IN ('x', 1)") else {
        panic!("expected IN");
    };
    assert!(list.literal_set().is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_lexical_error_surfaces_as_parse_error() {
    let err = parse("SELECT 'abc FROM t").unwrap_err();
    assert!(err.message.contains("Unterminated"), "{}", err);
}

#[test]
fn test_error_position() {
    let err = parse_expression("a + ").unwrap_err();
    assert_eq!(err.position, 4);
    assert!(err.message.contains("end of input"));
}

#[test]
fn test_missing_closing_paren() {
    assert!(parse_expression("(a + 1").is_err());
    assert!(parse_expression("LOWER(a").is_err());
}
