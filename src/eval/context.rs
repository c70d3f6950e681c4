use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::Value;

use super::function::{Function, FunctionTable};

/// The scope an expression is evaluated in: variables and functions, with
/// an optional parent consulted for names this scope does not define.
///
/// Contexts are immutable once built and shared through `Arc`; nested
/// scopes (for expressions, user functions, extra variables) are children.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: BTreeMap<String, Value>,
    functions: Option<Arc<FunctionTable>>,
    parent: Option<Arc<EvalContext>>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_functions(mut self, functions: Arc<FunctionTable>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// A scope whose own variables shadow the parent's.
    pub fn child(parent: Arc<EvalContext>, variables: BTreeMap<String, Value>) -> Self {
        Self {
            variables,
            functions: None,
            parent: Some(parent),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        match self.variables.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.variable(name)),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        match self.functions.as_ref().and_then(|f| f.get(name)) {
            Some(function) => Some(function),
            None => self.parent.as_ref().and_then(|p| p.function(name)),
        }
    }

    /// Every variable name visible from this scope.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.variable_names());
        }
        names
    }

    /// Every function name visible from this scope.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .functions
            .iter()
            .flat_map(|f| f.keys().map(String::as_str))
            .collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.function_names());
        }
        names
    }

    pub fn has_functions(&self) -> bool {
        self.functions.is_some() || self.parent.as_ref().is_some_and(|p| p.has_functions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::standard_library;

    #[test]
    fn test_child_shadows_parent() {
        let parent = Arc::new(EvalContext::new().with_variables(BTreeMap::from([
            ("a".to_string(), Value::number(1)),
            ("b".to_string(), Value::number(2)),
        ])));
        let child = EvalContext::child(
            parent,
            BTreeMap::from([("a".to_string(), Value::string("x"))]),
        );
        assert_eq!(child.variable("a"), Some(&Value::string("x")));
        assert_eq!(child.variable("b"), Some(&Value::number(2)));
        assert_eq!(child.variable("c"), None);
    }

    #[test]
    fn test_functions_inherited() {
        let parent = Arc::new(EvalContext::new().with_functions(Arc::new(standard_library())));
        let child = EvalContext::child(parent, BTreeMap::new());
        assert!(child.function("upper").is_some());
        assert!(child.has_functions());
        assert!(child.function_names().contains(&"lower"));
    }
}
