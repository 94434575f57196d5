// tests/engine_tests.rs
//
// Every query runs on all engines; their outputs must be byte-identical.

use ndjson_select::{EngineKind, EvalError, evaluate, prepare};

const PEOPLE: &str = r#"{"id":1,"name":"Ann","age":34,"tags":["a","b"],"addr":{"city":"Oslo","zip":"0150"}}
{"id":2,"name":"bob","age":null,"addr":{"city":"Bergen"}}
{"id":3,"Name":"Cy","age":27.5,"score":1e2}
{"id":4,"name":"dee","age":41,"addr":"n/a"}
"#;

fn run_all(query: &str, input: &str) -> String {
    run_bytes(query, input.as_bytes())
}

fn run_bytes(query: &str, input: &[u8]) -> String {
    let parsed = prepare(query).unwrap_or_else(|e| panic!("{}: {}", query, e));

    let mut outputs = EngineKind::ALL.iter().map(|kind| {
        let engine = kind.engine();
        let output = engine
            .evaluate(&parsed, input)
            .unwrap_or_else(|e| panic!("{} engine failed on {}: {}", engine.name(), query, e));
        (engine.name(), String::from_utf8(output).unwrap())
    });

    let (_, expected) = outputs.next().unwrap();
    for (name, output) in outputs {
        assert_eq!(output, expected, "{} engine disagrees on {}", name, query);
    }
    expected
}

fn fail_all(query: &str, input: &[u8]) -> EvalError {
    let parsed = prepare(query).unwrap();
    let errors: Vec<EvalError> = EngineKind::ALL
        .iter()
        .map(|kind| {
            kind.engine()
                .evaluate(&parsed, input)
                .expect_err("evaluation should fail")
        })
        .collect();

    for error in &errors[1..] {
        assert!(
            same_failure(error, &errors[0]),
            "engines disagree on failure of {}: {} vs {}",
            query,
            error,
            errors[0]
        );
    }
    errors[0].clone()
}

/// Parser messages for malformed lines may differ; the line may not.
fn same_failure(a: &EvalError, b: &EvalError) -> bool {
    match (a, b) {
        (EvalError::InvalidInput { line: x, .. }, EvalError::InvalidInput { line: y, .. }) => x == y,
        _ => a == b,
    }
}

// ============================================================================
// Reference examples
// ============================================================================

#[test]
fn test_filter_selects_one_row() {
    let output = run_all(
        "SELECT 1 FROM s3object s WHERE s.a = 1",
        "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n",
    );
    assert_eq!(output, "{\"_1\":1}\n");
}

#[test]
fn test_average_over_empty_and_full_input() {
    let query = "SELECT AVG(s.a) FROM s3object s";
    assert_eq!(run_all(query, ""), "{\"_1\":null}\n");
    assert_eq!(
        run_all(query, "{\"a\":5}\n{\"a\":10}\n{\"a\":15}\n"),
        "{\"_1\":10}\n"
    );
}

#[test]
fn test_is_null_versus_is_missing() {
    let input = "{\"a\":1}\n{\"b\":2}\n{\"a\":null}\n";
    assert_eq!(
        run_all("SELECT * FROM s3object s WHERE s.a IS NULL", input),
        "{\"a\":null}\n"
    );
    assert_eq!(
        run_all("SELECT * FROM s3object s WHERE s.a IS MISSING", input),
        "{\"b\":2}\n"
    );
}

#[test]
fn test_like_with_escape() {
    let input = "{\"v\":\"abx%\"}\n{\"v\":\"abxyz\"}\n{\"v\":\"x%\"}\n";
    assert_eq!(
        run_all("SELECT s.v FROM s3object s WHERE s.v LIKE '%x^%' ESCAPE '^'", input),
        "{\"v\":\"abx%\"}\n{\"v\":\"x%\"}\n"
    );
}

#[test]
fn test_missing_column_is_omitted() {
    assert_eq!(
        run_all("SELECT s.x.a, s.b FROM s3object s", "{\"b\":1}\n{\"x\":{\"a\":2}}\n"),
        "{\"b\":1}\n{\"a\":2}\n"
    );
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_select_star_keeps_document_order() {
    let input = "{\"z\":1,\"a\":{\"y\":2,\"b\":[true,null]}}\n";
    assert_eq!(run_all("SELECT * FROM S3Object", input), input);
}

#[test]
fn test_output_keys() {
    assert_eq!(
        run_all(
            "SELECT s.addr.city, s.id AS ident, s.id + 1, name FROM s3object s WHERE s.id = 1",
            PEOPLE
        ),
        "{\"city\":\"Oslo\",\"ident\":1,\"_3\":2,\"name\":\"Ann\"}\n"
    );
}

#[test]
fn test_whole_subtrees() {
    assert_eq!(
        run_all("SELECT s.addr, s.tags FROM s3object s LIMIT 1", PEOPLE),
        "{\"addr\":{\"city\":\"Oslo\",\"zip\":\"0150\"},\"tags\":[\"a\",\"b\"]}\n"
    );
}

#[test]
fn test_case_insensitive_and_quoted_names() {
    assert_eq!(
        run_all("SELECT s.NAME FROM s3object s WHERE s.id = 3", PEOPLE),
        "{\"NAME\":\"Cy\"}\n"
    );
    assert_eq!(
        run_all(r#"SELECT s."name" FROM s3object s WHERE s.id >= 2"#, PEOPLE),
        "{\"name\":\"bob\"}\n{}\n{\"name\":\"dee\"}\n"
    );
}

#[test]
fn test_duplicate_keys_keep_last_value() {
    let input = "{\"a\":1,\"b\":0,\"a\":2}\n";
    assert_eq!(run_all("SELECT s.a FROM s3object s", input), "{\"a\":2}\n");
    assert_eq!(run_all("SELECT * FROM s3object", input), "{\"a\":2,\"b\":0}\n");
}

#[test]
fn test_non_object_records() {
    let input = "5\n[1,2]\n\"s\"\n";
    assert_eq!(run_all("SELECT s.a FROM s3object s", input), "{}\n{}\n{}\n");
    assert_eq!(run_all("SELECT * FROM s3object", input), input);
}

#[test]
fn test_numbers_are_normalized() {
    assert_eq!(
        run_all("SELECT * FROM s3object", "{\"a\":1.0,\"b\":1e2,\"c\":-0.5}\n"),
        "{\"a\":1,\"b\":100,\"c\":-0.5}\n"
    );
}

#[test]
fn test_out_of_range_numbers_read_as_null() {
    let input = "{\"a\":1,\"b\":1e400}\n{\"a\":2,\"b\":-1e400,\"c\":{\"d\":1E+999}}\n";
    assert_eq!(
        run_all("SELECT s.a FROM s3object s", input),
        "{\"a\":1}\n{\"a\":2}\n"
    );
    assert_eq!(
        run_all("SELECT s.a, s.b, s.c.d FROM s3object s WHERE s.b IS NULL", input),
        "{\"a\":1,\"b\":null}\n{\"a\":2,\"b\":null,\"d\":null}\n"
    );
    assert_eq!(
        run_all("SELECT * FROM s3object", input),
        "{\"a\":1,\"b\":null}\n{\"a\":2,\"b\":null,\"c\":{\"d\":null}}\n"
    );
}

// ============================================================================
// Record stream
// ============================================================================

#[test]
fn test_blank_lines_crlf_and_unterminated_last_line() {
    let input = "\n{\"a\":1}\r\n   \n{\"a\":2}";
    assert_eq!(
        run_all("SELECT s.a FROM s3object s", input),
        "{\"a\":1}\n{\"a\":2}\n"
    );
}

#[test]
fn test_malformed_line_reports_line_number() {
    let error = fail_all("SELECT s.a FROM s3object s", b"{\"a\":1}\n\n{\"a\":\n");
    assert!(matches!(error, EvalError::InvalidInput { line: 3, .. }), "{}", error);
}

#[test]
fn test_invalid_utf8() {
    let error = fail_all("SELECT * FROM s3object", b"{\"a\":1}\n{\"a\":\"\xff\"}\n");
    assert!(matches!(error, EvalError::InvalidInput { line: 2, .. }), "{}", error);
}

#[test]
fn test_type_error_aborts_run() {
    let error = fail_all(
        "SELECT s.a FROM s3object s WHERE s.a < 10",
        b"{\"a\":1}\n{\"a\":\"x\"}\n",
    );
    assert!(matches!(error, EvalError::TypeError(_)));
}

#[test]
fn test_non_boolean_where_is_error() {
    let error = fail_all("SELECT * FROM s3object s WHERE s.a", b"{\"a\":1}\n");
    assert!(matches!(error, EvalError::TypeError(_)));
}

// ============================================================================
// ORDER BY / LIMIT
// ============================================================================

#[test]
fn test_order_by_desc_with_null() {
    assert_eq!(
        run_all("SELECT s.id FROM s3object s ORDER BY s.age DESC", PEOPLE),
        "{\"id\":4}\n{\"id\":1}\n{\"id\":3}\n{\"id\":2}\n"
    );
}

#[test]
fn test_order_by_missing_first_then_tiebreak() {
    assert_eq!(
        run_all(
            "SELECT s.id FROM s3object s ORDER BY s.addr.city, s.id DESC LIMIT 2 OFFSET 1",
            PEOPLE
        ),
        "{\"id\":3}\n{\"id\":2}\n"
    );
}

#[test]
fn test_order_by_is_stable() {
    let input = "{\"k\":1,\"v\":\"a\"}\n{\"k\":0,\"v\":\"b\"}\n{\"k\":1,\"v\":\"c\"}\n";
    assert_eq!(
        run_all("SELECT s.v FROM s3object s ORDER BY s.k", input),
        "{\"v\":\"b\"}\n{\"v\":\"a\"}\n{\"v\":\"c\"}\n"
    );
}

#[test]
fn test_limit_and_offset() {
    assert_eq!(
        run_all("SELECT s.id FROM s3object s LIMIT 2", PEOPLE),
        "{\"id\":1}\n{\"id\":2}\n"
    );
    assert_eq!(
        run_all("SELECT s.id FROM s3object s WHERE s.id > 1 LIMIT 5 OFFSET 1", PEOPLE),
        "{\"id\":3}\n{\"id\":4}\n"
    );
    assert_eq!(run_all("SELECT s.id FROM s3object s LIMIT 0", PEOPLE), "");
}

#[test]
fn test_limit_stops_scan() {
    assert_eq!(
        run_all("SELECT s.a FROM s3object s LIMIT 1", "{\"a\":1}\nnot json\n"),
        "{\"a\":1}\n"
    );
}

#[test]
fn test_limit_bounds_aggregated_records() {
    let input = "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n{\"a\":4}\n";
    assert_eq!(
        run_all("SELECT SUM(s.a), COUNT(*) FROM s3object s LIMIT 2 OFFSET 1", input),
        "{\"_1\":5,\"_2\":2}\n"
    );
    assert_eq!(
        run_all("SELECT COUNT(*) FROM s3object s LIMIT 0", input),
        "{\"_1\":0}\n"
    );
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn test_aggregate_with_filter() {
    assert_eq!(
        run_all(
            "SELECT COUNT(*) AS n, AVG(s.age), MAX(s.age), MIN(s.name) FROM s3object s WHERE s.id > 1",
            PEOPLE
        ),
        "{\"n\":3,\"_2\":34.25,\"_3\":41,\"_4\":\"Cy\"}\n"
    );
}

#[test]
fn test_aggregate_ignores_order_by() {
    assert_eq!(
        run_all("SELECT COUNT(*) FROM s3object s ORDER BY s.id DESC", PEOPLE),
        "{\"_1\":4}\n"
    );
}

// ============================================================================
// Differential grid
// ============================================================================

#[test]
fn test_engines_agree() {
    let queries = [
        "SELECT * FROM s3object",
        "SELECT s FROM s3object s",
        "SELECT s, s.id FROM s3object s WHERE s.id BETWEEN 2 AND 3",
        "SELECT s.name, s.addr.city AS city FROM s3object s",
        "SELECT s.id FROM s3object s WHERE s.age > 30",
        "SELECT s.id FROM s3object s WHERE s.age IS NULL OR s.age IS MISSING",
        "SELECT LOWER(s.name) AS n FROM S3Object s WHERE s.name LIKE '%e%'",
        "SELECT s.id, s.age + 1, 'x' || s.id, s.missing + s.id FROM s3object s",
        "SELECT s.addr FROM s3object s WHERE s.addr.city IN ('Oslo', 'Bergen')",
        "SELECT s.tags, s.score FROM s3object s WHERE s.id % 2 = 1",
        r#"SELECT id, "Name" FROM s3object"#,
        "SELECT s.id FROM s3object s WHERE NOT (s.age < 30) OR s.age IS MISSING",
        "SELECT s.addr.zip, s.addr.city, s.addr FROM s3object s ORDER BY s.addr DESC",
        "SELECT COUNT(*), COUNT(s.age), AVG(s.age), SUM(s.id), MAX(s.id), MIN(s.name) FROM s3object s",
        "SELECT COUNT(s.addr.city) FROM s3object s WHERE s.name IS NOT MISSING",
        "SELECT s.id FROM s3object s ORDER BY s.tags, s.name DESC LIMIT 3",
    ];

    let extremes = format!("{}{}\n", PEOPLE, r#"{"id":5,"name":"eve","age":1e400,"score":-1e999}"#);
    for query in queries {
        run_all(query, PEOPLE);
        run_all(query, &extremes);
    }
}

#[test]
fn test_default_engine_matches_naive() {
    let query = prepare("SELECT s.id, s.addr.city FROM s3object s WHERE s.id < 3").unwrap();
    let expected = EngineKind::Naive
        .engine()
        .evaluate(&query, PEOPLE.as_bytes())
        .unwrap();
    assert_eq!(evaluate(&query, PEOPLE.as_bytes()).unwrap(), expected);
}
