use evaldemo::{hello, insecure_eval, safe_eval_literal, EvalError, LiteralError, Value};

#[test]
fn greets_by_name() {
    assert_eq!(hello("Tester"), "Hello, Tester!");
    assert_eq!(hello("World"), "Hello, World!");

    for name in ["", " ", "Ada Lovelace", "😀", "Hello, !"] {
        assert_eq!(hello(name), format!("Hello, {}!", name));
    }
}

#[test]
fn literal_demo() {
    assert_eq!(safe_eval_literal("2"), Ok(Value::Int(2)));
    assert_eq!(
        safe_eval_literal("[1,2]"),
        Ok(Value::List(vec![Value::Int(1), Value::Int(2)]))
    );
}

#[test]
fn literal_refuses_to_evaluate() {
    for expr in ["1 + 1", "hello('x')", "read_file('/etc/passwd')", "__import__('os')", "[1, 2][0]"] {
        let error = safe_eval_literal(expr).unwrap_err();
        assert!(
            matches!(error.data, LiteralError::Malformed(_)),
            "{} should be rejected, got {:?}",
            expr,
            error
        );
    }
}

#[test]
fn insecure_eval_evaluates() {
    assert_eq!(insecure_eval("1 + 1"), Ok(Value::Int(2)));
    assert_eq!(
        insecure_eval("hello('from ' + 'input')"),
        Ok(Value::Str("Hello, from input!".to_string()))
    );
    // literals are expressions too
    assert_eq!(
        insecure_eval("[1,2]"),
        Ok(Value::List(vec![Value::Int(1), Value::Int(2)]))
    );
}

#[test]
fn insecure_eval_propagates_errors() {
    let kind = |expr: &str| insecure_eval(expr).unwrap_err().extract();

    assert!(matches!(kind("1 +"), EvalError::Syntax(_)));
    assert!(matches!(kind("missing"), EvalError::Name(_)));
    assert!(matches!(kind("1 + 'a'"), EvalError::Type(_)));
    assert!(matches!(kind("1 // 0"), EvalError::ZeroDivision));
    assert!(matches!(kind("read_file('/nonexistent/evaldemo')"), EvalError::Io(_)));
}

#[test]
fn insecure_eval_reaches_the_process_environment() {
    let path = std::env::temp_dir().join(format!("evaldemo-{}.txt", std::process::id()));
    std::fs::write(&path, "secret").unwrap();

    let expr = format!("read_file({:?})", path.display().to_string());
    assert_eq!(insecure_eval(&expr), Ok(Value::Str("secret".to_string())));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn repeated_calls_agree() {
    for _ in 0..3 {
        assert_eq!(hello("again"), "Hello, again!");
        assert_eq!(
            safe_eval_literal("{'k': (1, 2.5, None)}"),
            safe_eval_literal("{'k': (1, 2.5, None)}")
        );
        assert_eq!(insecure_eval("sum([1, 2, 3]) * 2"), Ok(Value::Int(12)));
    }
}
