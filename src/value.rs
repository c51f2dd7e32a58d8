use crate::ast::FunctionDecl;
use crate::collections::{EasyList, EasyObject};
use crate::environment::Environment;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub type ListRef = Rc<RefCell<EasyList>>;
pub type ObjectRef = Rc<RefCell<EasyObject>>;

/// Instance key holding the most-derived class.
pub const CLASS_KEY: &str = "__class__";
/// Instance key holding the parent of `__class__`, or null.
pub const PARENT_KEY: &str = "__parent__";

/// Runtime value. Lists and objects have reference semantics: cloning a
/// `Value` clones the handle, not the contents.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    List(ListRef),
    Object(ObjectRef),
    Class(Rc<ClassDef>),
    Function(Rc<FunctionDef>),
}

/// Intrinsic kind of a value, used to key the builtin method registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Double,
    String,
    List,
    Object,
    Class,
    Function,
}

impl Value {
    pub fn new_list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(EasyList::from_values(items))))
    }

    pub fn new_object(object: EasyObject) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
            Value::Class(_) => ValueKind::Class,
            Value::Function(_) => ValueKind::Function,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Double(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Object(o) => !o.borrow().is_empty(),
            Value::Class(_) | Value::Function(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Class(_) => "class",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the class of an instance, i.e. an object carrying `__class__`.
    pub fn instance_class(&self) -> Option<Rc<ClassDef>> {
        match self {
            Value::Object(object) => match object.borrow().get(CLASS_KEY) {
                Some(Value::Class(class)) => Some(class),
                _ => None,
            },
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Double(l), Value::Double(r)) => l == r,
            (Value::Int(l), Value::Double(r)) => (*l as f64) == *r,
            (Value::Double(l), Value::Int(r)) => *l == (*r as f64),
            (Value::String(l), Value::String(r)) => l == r,
            (Value::List(l), Value::List(r)) => Rc::ptr_eq(l, r),
            (Value::Object(l), Value::Object(r)) => Rc::ptr_eq(l, r),
            (Value::Class(l), Value::Class(r)) => Rc::ptr_eq(l, r),
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => {
                // Always show at least one decimal place for doubles
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, item) in l.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Object(o) => {
                write!(f, "{{")?;
                for (i, (key, value)) in o.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": ", key)?;
                    value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Function(function) => write!(f, "<function {}>", function.name()),
        }
    }
}

/// A callable script function or method.
pub struct FunctionDef {
    pub decl: Rc<FunctionDecl>,
    /// Scope of the defining script, set when the function is exported from
    /// a module so it keeps seeing that module's variables and functions.
    pub captured: Option<Environment>,
    pub is_shared: Cell<bool>,
}

impl FunctionDef {
    pub fn new(decl: Rc<FunctionDecl>) -> Self {
        Self {
            decl,
            captured: None,
            is_shared: Cell::new(false),
        }
    }

    /// Copy of this function bound to the scope it was exported from.
    pub fn with_captured(&self, scope: Environment) -> Self {
        Self {
            decl: Rc::clone(&self.decl),
            captured: Some(scope),
            is_shared: Cell::new(self.is_shared.get()),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn params(&self) -> &[String] {
        &self.decl.params
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared.get()
    }

    pub fn mark_shared(&self) {
        self.is_shared.set(true);
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.decl.name)
            .field("params", &self.decl.params)
            .field("captured", &self.captured.is_some())
            .field("is_shared", &self.is_shared.get())
            .finish()
    }
}

/// A class built when its `class` statement executes.
///
/// `properties` and `methods` already contain the inherited entries, with
/// the body's own declarations overriding same-named ones.
pub struct ClassDef {
    pub name: String,
    pub parent: Option<Rc<ClassDef>>,
    pub properties: EasyObject,
    pub methods: Vec<(String, Rc<FunctionDef>)>,
    pub constructor: Option<Rc<FunctionDef>>,
}

impl ClassDef {
    pub fn new(name: String, parent: Option<Rc<ClassDef>>) -> Self {
        let (properties, methods) = match &parent {
            Some(parent) => (parent.properties.clone(), parent.methods.clone()),
            None => (EasyObject::new(), Vec::new()),
        };

        Self {
            name,
            parent,
            properties,
            methods,
            constructor: None,
        }
    }

    pub fn method(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.methods
            .iter()
            .find(|(method_name, _)| method_name == name)
            .map(|(_, method)| Rc::clone(method))
    }

    pub fn set_method(&mut self, name: &str, method: Rc<FunctionDef>) {
        match self.methods.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = method,
            None => self.methods.push((name.to_string(), method)),
        }
    }

    /// This class followed by each ancestor, most-derived first.
    pub fn chain(self: &Rc<Self>) -> impl Iterator<Item = Rc<ClassDef>> {
        std::iter::successors(Some(Rc::clone(self)), |class| class.parent.clone())
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field(
                "methods",
                &self.methods.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_and_doubles_compare_numerically() {
        assert_eq!(Value::Int(2), Value::Double(2.0));
        assert_ne!(Value::Int(2), Value::String("2".to_string()));
    }

    #[test]
    fn lists_compare_by_identity() {
        let a = Value::new_list(vec![Value::Int(1)]);
        let b = Value::new_list(vec![Value::Int(1)]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn display_quotes_nested_strings_only() {
        let list = Value::new_list(vec![Value::String("a".to_string()), Value::Int(1)]);
        assert_eq!(list.to_string(), "[\"a\", 1]");
        assert_eq!(Value::String("a".to_string()).to_string(), "a");
        assert_eq!(Value::Double(4.0).to_string(), "4.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "True");
    }
}
