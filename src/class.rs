use crate::ast::{ClassMember, Expr, CONSTRUCTOR_NAME};
use crate::collections::EasyObject;
use crate::environment::Environment;
use crate::error::{ScriptError, Span};
use crate::evaluator::{check_arity, Evaluator};
use crate::value::{ClassDef, FunctionDef, Value, CLASS_KEY, PARENT_KEY};
use std::rc::Rc;
use tracing::{debug, trace};

/// Name the receiving instance is bound to inside methods and constructors.
pub const SELF_NAME: &str = "cur";

impl Evaluator {
    /// Executes a `class` statement: builds the class from its parent's
    /// tables plus its own members and binds it as a variable.
    pub(crate) fn define_class(
        &mut self,
        name: &str,
        parent_path: Option<&[String]>,
        members: &[ClassMember],
        env: &mut Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        let parent = match parent_path {
            Some(path) => Some(self.resolve_class(path, env, span)?),
            None => None,
        };

        let mut class = ClassDef::new(name.to_string(), parent);

        // Property initializers see no script variables.
        let detached = Environment::new();
        for member in members {
            match member {
                ClassMember::Property { name, value, .. } => {
                    let value = self.evaluate_expression(value, &detached)?;
                    class.properties.set(name, value);
                }
                ClassMember::Method(decl) => {
                    class.set_method(&decl.name, Rc::new(FunctionDef::new(Rc::clone(decl))));
                }
                ClassMember::Constructor(decl) => {
                    class.constructor = Some(Rc::new(FunctionDef::new(Rc::clone(decl))));
                }
            }
        }

        debug!(
            class = name,
            parent = class.parent.as_ref().map(|p| p.name.as_str()).unwrap_or(""),
            properties = class.properties.len(),
            methods = class.methods.len(),
            "defined class"
        );

        env.assign(name, Value::Class(Rc::new(class)));
        Ok(())
    }

    /// Resolves `Name` or `alias.Name` to a class value.
    pub(crate) fn resolve_class(
        &self,
        path: &[String],
        env: &Environment,
        span: &Span,
    ) -> Result<Rc<ClassDef>, ScriptError> {
        let full_name = path.join(".");
        let mut parts = path.iter();

        let first = parts.next().ok_or_else(|| {
            ScriptError::runtime_error(*span, "Empty class name".to_string())
        })?;
        let mut current = env.get(first).ok_or_else(|| {
            ScriptError::runtime_error(*span, format!("Class '{}' not found", first))
        })?;

        for part in parts {
            let next = match &current {
                Value::Object(object) => object.borrow().get(part),
                _ => {
                    return Err(ScriptError::runtime_error(
                        *span,
                        format!("Invalid class path: '{}'", full_name),
                    ))
                }
            };
            current = next.ok_or_else(|| {
                ScriptError::runtime_error(*span, format!("Nested class '{}' not found", part))
            })?;
        }

        match current {
            Value::Class(class) => Ok(class),
            _ => Err(ScriptError::runtime_error(
                *span,
                format!("'{}' is not a valid class", full_name),
            )),
        }
    }

    /// Builds an instance of `class` and runs its constructor, if any.
    ///
    /// Ancestors' properties and methods are copied in first, nearest
    /// ancestor winning, then the class's own entries overwrite them.
    /// Inherited values are shared by reference, not deep-copied.
    pub fn instantiate(
        &mut self,
        class: &Rc<ClassDef>,
        args: Vec<Value>,
        env: &Environment,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        let mut instance = EasyObject::new();
        instance.set(CLASS_KEY, Value::Class(Rc::clone(class)));
        instance.set(
            PARENT_KEY,
            class.parent.clone().map(Value::Class).unwrap_or(Value::Null),
        );

        for ancestor in class.chain().skip(1) {
            for (key, value) in ancestor.properties.iter() {
                if !instance.contains_key(key) {
                    instance.set(key, value.clone());
                }
            }
        }
        for (key, value) in class.properties.iter() {
            instance.set(key, value.clone());
        }

        for ancestor in class.chain().skip(1) {
            for (name, method) in &ancestor.methods {
                if !instance.contains_key(name) {
                    instance.set(name, Value::Function(Rc::clone(method)));
                }
            }
        }
        for (name, method) in &class.methods {
            instance.set(name, Value::Function(Rc::clone(method)));
        }

        let instance = Value::new_object(instance);
        trace!(class = class.name.as_str(), "instantiate");

        match &class.constructor {
            Some(constructor) => {
                self.run_constructor(class, constructor, instance.clone(), args, env, span)?;
            }
            None if !args.is_empty() => {
                return Err(ScriptError::runtime_error(
                    *span,
                    format!(
                        "Class '{}' has no constructor but was given {} argument{}",
                        class.name,
                        args.len(),
                        if args.len() == 1 { "" } else { "s" }
                    ),
                ));
            }
            None => {}
        }

        Ok(instance)
    }

    /// Runs `constructor` (declared by `class`) against `instance`.
    /// `super(...)` inside it reaches `class`'s parent.
    fn run_constructor(
        &mut self,
        class: &Rc<ClassDef>,
        constructor: &Rc<FunctionDef>,
        instance: Value,
        args: Vec<Value>,
        caller: &Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        check_arity(constructor, &args, span).map_err(|_| {
            ScriptError::runtime_error(
                *span,
                format!(
                    "Constructor of '{}' expects {} arguments, got {}",
                    class.name,
                    constructor.params().len(),
                    args.len()
                ),
            )
        })?;

        let mut frame = caller.call_frame();
        frame.set_super_class(class.parent.clone());
        frame.assign(SELF_NAME, instance);
        for (param, arg) in constructor.params().iter().zip(args) {
            frame.assign(param, arg);
        }

        self.run_body(constructor, &mut frame)?;
        Ok(())
    }

    /// `super(args)`: runs the parent's constructor on the current instance.
    pub(crate) fn call_super(
        &mut self,
        args: &[Expr],
        env: &Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        let instance = match env.get(SELF_NAME) {
            Some(instance @ Value::Object(_)) => instance,
            _ => {
                return Err(ScriptError::runtime_error(
                    *span,
                    format!("Current object ('{}') not found", SELF_NAME),
                ))
            }
        };

        let parent = env.super_class().ok_or_else(|| {
            ScriptError::runtime_error_with_help(
                *span,
                "Super class not found".to_string(),
                "'super(...)' can only be called from the constructor of a class \
                 that extends another class."
                    .to_string(),
            )
        })?;

        let constructor = parent.constructor.clone().ok_or_else(|| {
            ScriptError::module_error(
                *span,
                format!("Method '{}' not found in parent class", CONSTRUCTOR_NAME),
            )
        })?;

        let args = self.evaluate_arguments(args, env)?;
        trace!(parent = parent.name.as_str(), "super");
        self.run_constructor(&parent, &constructor, instance, args, env, span)
    }

    /// `target.method(args)`. Instances dispatch through their class chain
    /// only; plain objects try stored functions or classes, then builtins.
    pub(crate) fn evaluate_method_call(
        &mut self,
        object: &Expr,
        method: &str,
        args: &[Expr],
        env: &Environment,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        let target = self.evaluate_expression(object, env)?;

        if let Some(class) = target.instance_class() {
            let found = class.chain().find_map(|c| c.method(method)).ok_or_else(|| {
                ScriptError::runtime_error(
                    *span,
                    format!("Method '{}' not found in class '{}'", method, class.name),
                )
            })?;
            let args = self.evaluate_arguments(args, env)?;
            return self.call_method(&found, target, args, env, span);
        }

        if let Value::Object(object) = &target {
            let stored = object.borrow().get(method);
            match stored {
                Some(Value::Function(function)) => {
                    let args = self.evaluate_arguments(args, env)?;
                    return self.call_function(&function, args, env, span);
                }
                Some(Value::Class(class)) => {
                    let args = self.evaluate_arguments(args, env)?;
                    return self.instantiate(&class, args, env, span);
                }
                _ => {}
            }
        }

        let args = self.evaluate_arguments(args, env)?;
        match self.builtins.call(&target, method, &args, span) {
            Some(result) => result,
            None => Err(ScriptError::runtime_error(
                *span,
                format!(
                    "The method '{}' doesn't exist on objects of type '{}'. \
                     Check your method name and object type!",
                    method,
                    target.type_name()
                ),
            )),
        }
    }

    /// Runs `method` with `instance` bound as `cur`.
    pub fn call_method(
        &mut self,
        method: &Rc<FunctionDef>,
        instance: Value,
        args: Vec<Value>,
        caller: &Environment,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        check_arity(method, &args, span)?;
        trace!(method = method.name(), "call method");

        let mut frame = caller.call_frame();
        frame.assign(SELF_NAME, instance);
        for (param, arg) in method.params().iter().zip(args) {
            frame.assign(param, arg);
        }

        self.run_body(method, &mut frame)
    }
}
