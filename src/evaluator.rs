use crate::ast::{
    AssignTarget, BinaryOp, Expr, ForKind, LogicalOp, Program, Stmt, UnaryOp,
};
use crate::builtins::Builtins;
use crate::collections::EasyObject;
use crate::environment::Environment;
use crate::error::{ScriptError, Span};
use crate::value::{FunctionDef, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::trace;

/// Where `print` writes. Nested module runs share their importer's sink.
pub type Output = Rc<RefCell<dyn Write>>;

pub const DIVIDE_BY_ZERO: &str = "Uh-oh! You tried to divide by zero. That's not possible.";
pub const INDEX_OUT_OF_RANGE: &str = "List index out of range. Stay within valid bounds!";

/// Outcome of executing a statement. Blocks stop at the first non-`Normal`
/// flow; loops consume `Break`, calls unwrap `Return`.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Evaluator {
    pub(crate) output: Output,
    pub(crate) builtins: Rc<Builtins>,
    /// Canonical path of the script being run; `None` for in-memory sources.
    pub(crate) script_path: Option<PathBuf>,
    /// Scripts currently being loaded, outermost first.
    pub(crate) import_chain: Vec<PathBuf>,
    /// Variables this script has marked with `share(...)`.
    pub(crate) shared_variables: HashSet<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    pub fn with_output(output: Output) -> Self {
        Self {
            output,
            builtins: Rc::new(Builtins::new()),
            script_path: None,
            import_chain: Vec::new(),
            shared_variables: HashSet::new(),
        }
    }

    /// Sets the script path used to resolve relative module paths.
    pub fn with_script_path(mut self, path: PathBuf) -> Self {
        self.import_chain.push(path.clone());
        self.script_path = Some(path);
        self
    }

    pub fn flush_output(&self) {
        if let Err(error) = self.output.borrow_mut().flush() {
            tracing::warn!(%error, "failed to flush script output");
        }
    }

    /// Runs a parsed script. `from ... use` statements are executed before
    /// every other top-level statement.
    pub fn execute_program(
        &mut self,
        program: &Program,
        env: &mut Environment,
    ) -> Result<(), ScriptError> {
        let (imports, rest): (Vec<&Stmt>, Vec<&Stmt>) = program
            .statements
            .iter()
            .partition(|stmt| matches!(stmt, Stmt::Import { .. }));

        for statement in imports.into_iter().chain(rest) {
            match self.execute_statement(statement, env)? {
                Flow::Normal => {}
                Flow::Break => {
                    return Err(ScriptError::runtime_error(
                        *statement.span(),
                        "'break' can only be used inside a loop".to_string(),
                    ))
                }
                Flow::Return(_) => {
                    return Err(ScriptError::runtime_error(
                        *statement.span(),
                        "'return' can only be used inside a function".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: &mut Environment,
    ) -> Result<Flow, ScriptError> {
        for statement in statements {
            match self.execute_statement(statement, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    pub fn execute_statement(
        &mut self,
        stmt: &Stmt,
        env: &mut Environment,
    ) -> Result<Flow, ScriptError> {
        trace!(line = stmt.span().line, column = stmt.span().column, "execute");

        match stmt {
            Stmt::Expression { expr, .. } => {
                self.evaluate_expression(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { expr, span } => {
                let value = self.evaluate_expression(expr, env)?;
                writeln!(self.output.borrow_mut(), "{}", value).map_err(|error| {
                    ScriptError::runtime_error(*span, format!("Failed to write output: {}", error))
                })?;
                Ok(Flow::Normal)
            }
            Stmt::Assign {
                target,
                value,
                span,
            } => {
                let value = self.evaluate_expression(value, env)?;
                self.assign(target, value, env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                branches,
                else_branch,
                ..
            } => {
                for branch in branches {
                    if self.evaluate_expression(&branch.condition, env)?.is_truthy() {
                        return self.execute_block(&branch.body, env);
                    }
                }
                match else_branch {
                    Some(body) => self.execute_block(body, env),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.evaluate_expression(condition, env)?.is_truthy() {
                    match self.execute_block(body, env)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { kind, body, span } => self.execute_for(kind, body, env, span),
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Function { decl, .. } => {
                env.define_function(&decl.name, Rc::new(FunctionDef::new(Rc::clone(decl))));
                Ok(Flow::Normal)
            }
            Stmt::Init { span, .. } => Err(ScriptError::runtime_error_with_help(
                *span,
                "'init' can only appear inside a class body".to_string(),
                "Declare constructors inside 'class Name ... endclass'.".to_string(),
            )),
            Stmt::Class {
                name,
                parent,
                members,
                span,
            } => {
                self.define_class(name, parent.as_deref(), members, env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Super { args, span } => {
                self.call_super(args, env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Share { names, span } => {
                self.share(names, env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Import { path, items, span } => {
                self.import(path, items, env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Load { path, alias, span } => {
                self.load(path, alias, env, span)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn assign(
        &mut self,
        target: &AssignTarget,
        value: Value,
        env: &mut Environment,
        span: &Span,
    ) -> Result<(), ScriptError> {
        match target {
            AssignTarget::Variable { name } => {
                env.assign(name, value);
                Ok(())
            }
            AssignTarget::Index { object, index } => {
                let container = self.evaluate_expression(object, env)?;
                let index = self.evaluate_expression(index, env)?;

                match (&container, &index) {
                    (Value::List(list), Value::Int(i)) => {
                        if list.borrow_mut().set(*i, value) {
                            Ok(())
                        } else {
                            Err(ScriptError::runtime_error(*span, INDEX_OUT_OF_RANGE.to_string()))
                        }
                    }
                    (Value::List(_), other) => Err(ScriptError::runtime_error(
                        *span,
                        format!("List index must be an integer, got '{}'", other.type_name()),
                    )),
                    (Value::Object(object), Value::String(key)) => {
                        object.borrow_mut().set(key, value);
                        Ok(())
                    }
                    (Value::Object(_), other) => Err(ScriptError::runtime_error(
                        *span,
                        format!("Object keys must be strings, got '{}'", other.type_name()),
                    )),
                    (Value::String(_), _) => Err(ScriptError::runtime_error(
                        *span,
                        "Strings can't be modified by index".to_string(),
                    )),
                    (other, _) => Err(ScriptError::runtime_error(
                        *span,
                        format!("Can't assign by index to a value of type '{}'", other.type_name()),
                    )),
                }
            }
            AssignTarget::Property { object, name } => {
                match self.evaluate_expression(object, env)? {
                    Value::Object(object) => {
                        object.borrow_mut().set(name, value);
                        Ok(())
                    }
                    other => Err(ScriptError::runtime_error(
                        *span,
                        format!(
                            "Can't set property '{}' on a value of type '{}'",
                            name,
                            other.type_name()
                        ),
                    )),
                }
            }
        }
    }

    fn execute_for(
        &mut self,
        kind: &ForKind,
        body: &[Stmt],
        env: &mut Environment,
        span: &Span,
    ) -> Result<Flow, ScriptError> {
        // Each iteration's bindings, computed before the body runs.
        let iterations: Vec<Vec<(&str, Value)>> = match kind {
            ForKind::Range { var, start, end } => {
                let start = self.range_bound(start, env)?;
                let end = self.range_bound(end, env)?;
                if start > end {
                    return Ok(Flow::Normal);
                }
                return self.run_range(var, start, end, body, env);
            }
            ForKind::Each { var, iterable } => {
                let iterable = self.evaluate_expression(iterable, env)?;
                self.sequence_items(&iterable, span)?
                    .into_iter()
                    .map(|item| vec![(var.as_str(), item)])
                    .collect()
            }
            ForKind::KeyValue {
                key,
                value,
                iterable,
            } => {
                let iterable = self.evaluate_expression(iterable, env)?;
                self.key_value_pairs(&iterable, span)?
                    .into_iter()
                    .map(|(k, v)| vec![(key.as_str(), k), (value.as_str(), v)])
                    .collect()
            }
        };

        for bindings in iterations {
            for (name, value) in bindings {
                env.assign(name, value);
            }
            match self.execute_block(body, env)? {
                Flow::Normal => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn run_range(
        &mut self,
        var: &str,
        start: i64,
        end: i64,
        body: &[Stmt],
        env: &mut Environment,
    ) -> Result<Flow, ScriptError> {
        for i in start..=end {
            env.assign(var, Value::Int(i));
            match self.execute_block(body, env)? {
                Flow::Normal => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn range_bound(&mut self, expr: &Expr, env: &Environment) -> Result<i64, ScriptError> {
        match self.evaluate_expression(expr, env)? {
            Value::Int(n) => Ok(n),
            other => Err(ScriptError::runtime_error(
                *expr.span(),
                format!("Range bounds must be integers, got '{}'", other.type_name()),
            )),
        }
    }

    /// Items visited by `for (x in iterable)`. Objects yield their keys.
    fn sequence_items(&self, iterable: &Value, span: &Span) -> Result<Vec<Value>, ScriptError> {
        match iterable {
            Value::List(list) => Ok(list.borrow().to_vec()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Object(object) => Ok(object
                .borrow()
                .keys()
                .map(|key| Value::String(key.to_string()))
                .collect()),
            other => Err(ScriptError::runtime_error(
                *span,
                format!("Can't iterate over a value of type '{}'", other.type_name()),
            )),
        }
    }

    /// Pairs visited by `for (k, v in iterable)`: key/value for objects,
    /// index/item for lists and strings.
    fn key_value_pairs(
        &self,
        iterable: &Value,
        span: &Span,
    ) -> Result<Vec<(Value, Value)>, ScriptError> {
        match iterable {
            Value::Object(object) => Ok(object
                .borrow()
                .iter()
                .map(|(key, value)| (Value::String(key.to_string()), value.clone()))
                .collect()),
            other => {
                let items = self.sequence_items(other, span)?;
                Ok(items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (Value::Int(i as i64), item))
                    .collect())
            }
        }
    }

    pub fn evaluate_expression(
        &mut self,
        expr: &Expr,
        env: &Environment,
    ) -> Result<Value, ScriptError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Variable { name, span } => env
                .get(name)
                .or_else(|| env.function(name).map(Value::Function))
                .ok_or_else(|| {
                    ScriptError::runtime_error(*span, format!("Undefined variable '{}'", name))
                }),
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left, env)?;
                let right_val = self.evaluate_expression(right, env)?;
                self.evaluate_binary_op(*operator, left_val, right_val, span)
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate_expression(operand, env)?;
                self.evaluate_unary_op(*operator, operand_val, span)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_val = self.evaluate_expression(left, env)?.is_truthy();
                let result = match operator {
                    LogicalOp::Or => left_val || self.evaluate_expression(right, env)?.is_truthy(),
                    LogicalOp::And => left_val && self.evaluate_expression(right, env)?.is_truthy(),
                };
                Ok(Value::Bool(result))
            }
            Expr::Call { name, args, span } => {
                let function = env
                    .function(name)
                    .or_else(|| match env.get(name) {
                        Some(Value::Function(function)) => Some(function),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        ScriptError::runtime_error(
                            *span,
                            format!("Function '{}' is not defined", name),
                        )
                    })?;
                let args = self.evaluate_arguments(args, env)?;
                self.call_function(&function, args, env, span)
            }
            Expr::MethodCall {
                object,
                method,
                args,
                span,
            } => self.evaluate_method_call(object, method, args, env, span),
            Expr::Property { object, name, span } => {
                let target = self.evaluate_expression(object, env)?;
                self.evaluate_property(target, name, span)
            }
            Expr::Index {
                object,
                index,
                span,
            } => {
                let container = self.evaluate_expression(object, env)?;
                let index = self.evaluate_expression(index, env)?;
                self.evaluate_index(&container, &index, span)
            }
            Expr::Grouping { expr, .. } => self.evaluate_expression(expr, env),
            Expr::List { elements, .. } => {
                let items = self.evaluate_arguments(elements, env)?;
                Ok(Value::new_list(items))
            }
            Expr::Object { entries, .. } => {
                let mut object = EasyObject::new();
                for (key, value_expr) in entries {
                    let value = self.evaluate_expression(value_expr, env)?;
                    object.set(key, value);
                }
                Ok(Value::new_object(object))
            }
            Expr::New {
                class_path,
                args,
                span,
            } => {
                let class = self.resolve_class(class_path, env, span)?;
                let args = self.evaluate_arguments(args, env)?;
                self.instantiate(&class, args, env, span)
            }
        }
    }

    pub(crate) fn evaluate_arguments(
        &mut self,
        args: &[Expr],
        env: &Environment,
    ) -> Result<Vec<Value>, ScriptError> {
        args.iter()
            .map(|arg| self.evaluate_expression(arg, env))
            .collect()
    }

    /// Calls a script function. The callee's frame starts as a copy of the
    /// caller's variables, overlaid with the function's captured module scope
    /// if it has one, then the parameters.
    pub fn call_function(
        &mut self,
        function: &Rc<FunctionDef>,
        args: Vec<Value>,
        caller: &Environment,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        check_arity(function, &args, span)?;
        trace!(function = function.name(), args = args.len(), "call");

        let mut frame = caller.call_frame();
        if let Some(scope) = &function.captured {
            frame.enter_scope(scope);
        }
        for (param, arg) in function.params().iter().zip(args) {
            frame.assign(param, arg);
        }

        self.run_body(function, &mut frame)
    }

    /// Executes a function body in `frame`, unwrapping its return value.
    pub(crate) fn run_body(
        &mut self,
        function: &FunctionDef,
        frame: &mut Environment,
    ) -> Result<Value, ScriptError> {
        match self.execute_block(&function.decl.body, frame)? {
            Flow::Normal => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
            Flow::Break => Err(ScriptError::runtime_error(
                function.decl.span,
                format!("'break' outside of a loop in '{}'", function.name()),
            )),
        }
    }

    fn evaluate_property(
        &mut self,
        target: Value,
        name: &str,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        if let Value::Object(object) = &target {
            return object.borrow().get(name).ok_or_else(|| {
                ScriptError::runtime_error(*span, format!("Object does not contain key '{}'", name))
            });
        }

        // `"abc".length` reads a zero-argument builtin.
        match self.builtins.call(&target, name, &[], span) {
            Some(result) => result,
            None => Err(ScriptError::runtime_error(
                *span,
                format!(
                    "The property '{}' doesn't exist on values of type '{}'",
                    name,
                    target.type_name()
                ),
            )),
        }
    }

    fn evaluate_index(
        &self,
        container: &Value,
        index: &Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match (container, index) {
            (Value::List(list), Value::Int(i)) => list
                .borrow()
                .get(*i)
                .ok_or_else(|| ScriptError::runtime_error(*span, INDEX_OUT_OF_RANGE.to_string())),
            (Value::String(s), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| {
                    ScriptError::runtime_error(
                        *span,
                        "String index out of range. Stay within valid bounds!".to_string(),
                    )
                }),
            (Value::List(_) | Value::String(_), other) => Err(ScriptError::runtime_error(
                *span,
                format!("Index must be an integer, got '{}'", other.type_name()),
            )),
            (Value::Object(object), Value::String(key)) => {
                object.borrow().get(key).ok_or_else(|| {
                    ScriptError::runtime_error(
                        *span,
                        format!("Object does not contain key '{}'", key),
                    )
                })
            }
            (Value::Object(_), other) => Err(ScriptError::runtime_error(
                *span,
                format!("Object keys must be strings, got '{}'", other.type_name()),
            )),
            (other, _) => Err(ScriptError::runtime_error_with_help(
                *span,
                format!("Can't index into a value of type '{}'", other.type_name()),
                "Only lists, strings and objects support '[...]' access.".to_string(),
            )),
        }
    }

    fn evaluate_binary_op(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match operator {
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOp::In => self.evaluate_in_operation(&left, &right, span),
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let (l, r) = match (left.as_number(), right.as_number()) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(operand_error(operator, &left, &right, span)),
                };
                let result = match operator {
                    BinaryOp::Less => l < r,
                    BinaryOp::LessEqual => l <= r,
                    BinaryOp::Greater => l > r,
                    _ => l >= r,
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::Add => match (left, right) {
                (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                (Value::String(_), _) | (_, Value::String(_)) => Err(ScriptError::runtime_error(
                    *span,
                    "Can't concatenate strings with other types of data.".to_string(),
                )),
                (l, r) => arithmetic(operator, &l, &r, span),
            },
            _ => arithmetic(operator, &left, &right, span),
        }
    }

    fn evaluate_unary_op(
        &self,
        operator: UnaryOp,
        operand: Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match operator {
            UnaryOp::Negate => match operand {
                Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                    ScriptError::runtime_error(*span, "Integer overflow in '-'".to_string())
                }),
                Value::Double(n) => Ok(Value::Double(-n)),
                _ => Err(ScriptError::runtime_error(
                    *span,
                    format!("Can't use '-' on a value of type '{}'", operand.type_name()),
                )),
            },
        }
    }

    fn evaluate_in_operation(
        &self,
        left: &Value,
        right: &Value,
        span: &Span,
    ) -> Result<Value, ScriptError> {
        match right {
            Value::List(list) => Ok(Value::Bool(list.borrow().iter().any(|item| item == left))),
            Value::Object(object) => match left {
                Value::String(key) => Ok(Value::Bool(object.borrow().contains_key(key))),
                _ => Err(ScriptError::runtime_error_with_help(
                    *span,
                    format!("Object key lookup requires a string, got '{}'", left.type_name()),
                    "Use 'in' with objects like: \"key\" in {key: 1}.".to_string(),
                )),
            },
            Value::String(string) => match left {
                Value::String(substring) => Ok(Value::Bool(string.contains(substring.as_str()))),
                _ => Err(ScriptError::runtime_error_with_help(
                    *span,
                    format!(
                        "String containment check requires a string, got '{}'",
                        left.type_name()
                    ),
                    "Use 'in' with strings like: \"sub\" in \"substring\".".to_string(),
                )),
            },
            _ => Err(ScriptError::runtime_error_with_help(
                *span,
                format!("'in' operator not supported for type '{}'", right.type_name()),
                "The 'in' operator works with lists, objects, and strings.".to_string(),
            )),
        }
    }
}

pub(crate) fn check_arity(
    function: &FunctionDef,
    args: &[Value],
    span: &Span,
) -> Result<(), ScriptError> {
    let expected = function.params().len();
    if args.len() == expected {
        return Ok(());
    }
    Err(ScriptError::runtime_error(
        *span,
        format!(
            "Function '{}' expects {} argument{}, got {}",
            function.name(),
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        ),
    ))
}

fn operand_error(operator: BinaryOp, left: &Value, right: &Value, span: &Span) -> ScriptError {
    ScriptError::runtime_error(
        *span,
        format!(
            "Can't use '{}' for operands of type '{}' & '{}'",
            operator,
            left.type_name(),
            right.type_name()
        ),
    )
}

fn divide_by_zero(span: &Span) -> ScriptError {
    ScriptError::runtime_error(*span, DIVIDE_BY_ZERO.to_string())
}

/// Numeric operators. Two integers stay integer (except `/`); any double
/// operand promotes the result.
fn arithmetic(
    operator: BinaryOp,
    left: &Value,
    right: &Value,
    span: &Span,
) -> Result<Value, ScriptError> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => integer_arithmetic(operator, *l, *r, span),
        _ => match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => double_arithmetic(operator, l, r, span),
            _ => Err(operand_error(operator, left, right, span)),
        },
    }
}

fn integer_arithmetic(
    operator: BinaryOp,
    l: i64,
    r: i64,
    span: &Span,
) -> Result<Value, ScriptError> {
    let result = match operator {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Subtract => l.checked_sub(r),
        BinaryOp::Multiply => l.checked_mul(r),
        BinaryOp::Divide => {
            if r == 0 {
                return Err(divide_by_zero(span));
            }
            return Ok(Value::Double(l as f64 / r as f64));
        }
        BinaryOp::FloorDivide => {
            if r == 0 {
                return Err(divide_by_zero(span));
            }
            floor_div(l, r)
        }
        BinaryOp::Modulo => {
            if r == 0 {
                return Err(divide_by_zero(span));
            }
            l.checked_rem(r)
        }
        BinaryOp::Power => {
            // Negative or oversized exponents fall back to a double result.
            let exact = u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp));
            return Ok(match exact {
                Some(n) => Value::Int(n),
                None => Value::Double((l as f64).powf(r as f64)),
            });
        }
        _ => {
            return Err(operand_error(operator, &Value::Int(l), &Value::Int(r), span));
        }
    };

    result.map(Value::Int).ok_or_else(|| {
        ScriptError::runtime_error(*span, format!("Integer overflow in '{}'", operator))
    })
}

fn floor_div(l: i64, r: i64) -> Option<i64> {
    let quotient = l.checked_div(r)?;
    if l % r != 0 && ((l < 0) != (r < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn double_arithmetic(
    operator: BinaryOp,
    l: f64,
    r: f64,
    span: &Span,
) -> Result<Value, ScriptError> {
    let result = match operator {
        BinaryOp::Add => l + r,
        BinaryOp::Subtract => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide | BinaryOp::FloorDivide | BinaryOp::Modulo if r == 0.0 => {
            return Err(divide_by_zero(span));
        }
        BinaryOp::Divide => l / r,
        BinaryOp::FloorDivide => (l / r).floor(),
        BinaryOp::Modulo => l % r,
        BinaryOp::Power => l.powf(r),
        _ => {
            return Err(operand_error(operator, &Value::Double(l), &Value::Double(r), span));
        }
    };
    Ok(Value::Double(result))
}
