use crate::value::{ClassDef, FunctionDef, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Script-wide function table. Every frame of one script run shares it.
pub type FunctionTable = Rc<RefCell<HashMap<String, Rc<FunctionDef>>>>;

/// Variables visible to the executing frame plus the script's functions.
///
/// Calls do not chain scopes: a callee starts from a copy of the caller's
/// variables (see [`Environment::call_frame`]), so assignments inside a
/// function never leak back out. Lists and objects are still shared since
/// their values are handles.
#[derive(Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    functions: FunctionTable,
    super_class: Option<Rc<ClassDef>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Binds or rebinds a variable in this frame.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    pub fn function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.functions.borrow().get(name).cloned()
    }

    pub fn define_function(&self, name: &str, function: Rc<FunctionDef>) {
        self.functions
            .borrow_mut()
            .insert(name.to_string(), function);
    }

    /// Snapshot of the function table, sorted by name for deterministic merging.
    pub fn functions(&self) -> Vec<(String, Rc<FunctionDef>)> {
        let mut functions: Vec<_> = self
            .functions
            .borrow()
            .iter()
            .map(|(name, function)| (name.clone(), Rc::clone(function)))
            .collect();
        functions.sort_by(|a, b| a.0.cmp(&b.0));
        functions
    }

    /// New frame for a call: a copy of these variables sharing the same
    /// function table.
    pub fn call_frame(&self) -> Environment {
        Self {
            variables: self.variables.clone(),
            functions: Rc::clone(&self.functions),
            super_class: None,
        }
    }

    /// Layers `scope`'s variables over this frame and switches to its
    /// function table. Used when calling a function exported from a module.
    pub fn enter_scope(&mut self, scope: &Environment) {
        for (name, value) in &scope.variables {
            self.variables.insert(name.clone(), value.clone());
        }
        self.functions = Rc::clone(&scope.functions);
    }

    /// Class whose constructor `super(...)` should run from this frame.
    pub fn super_class(&self) -> Option<Rc<ClassDef>> {
        self.super_class.clone()
    }

    pub fn set_super_class(&mut self, class: Option<Rc<ClassDef>>) {
        self.super_class = class;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_frame_copies_variables_and_shares_functions() {
        let mut global = Environment::new();
        global.assign("x", Value::Int(1));

        let mut frame = global.call_frame();
        frame.assign("x", Value::Int(2));
        frame.assign("y", Value::Int(3));

        assert_eq!(global.get("x"), Some(Value::Int(1)));
        assert!(!global.contains("y"));
        assert!(Rc::ptr_eq(&global.functions, &frame.functions));
    }
}
