/// `Hello, {name}!` for any name, verbatim.
pub fn hello(name: &str) -> String {
    format!("Hello, {}!", name)
}

#[test]
fn greeting() {
    assert_eq!(hello("Tester"), "Hello, Tester!");
    assert_eq!(hello(""), "Hello, !");
    assert_eq!(hello("{name} ünïcode"), "Hello, {name} ünïcode!");
}
