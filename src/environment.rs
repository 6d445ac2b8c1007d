use std::collections::HashMap;

use super::{Builtin, Value};

/// Names visible to an evaluated expression.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut environment = Self::new();
        for builtin in Builtin::ALL.iter() {
            environment.define(builtin.name(), Value::Function(*builtin));
        }
        environment
    }

    /// Binds `name`, shadowing any builtin of the same name.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

#[test]
fn shadowing() {
    let mut environment = Environment::with_builtins();
    assert_eq!(environment.lookup("len"), Some(&Value::Function(Builtin::Len)));
    assert_eq!(environment.lookup("x"), None);

    environment.define("len", Value::Int(3));
    assert_eq!(environment.lookup("len"), Some(&Value::Int(3)));
}
