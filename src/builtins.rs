use crate::error::{ScriptError, Span};
use crate::value::{Value, ValueKind};
use std::collections::HashMap;

/// A builtin method: receiver, evaluated arguments, call site.
pub type BuiltinFn = fn(&Value, &[Value], &Span) -> Result<Value, ScriptError>;

const ALL_KINDS: [ValueKind; 9] = [
    ValueKind::Null,
    ValueKind::Bool,
    ValueKind::Int,
    ValueKind::Double,
    ValueKind::String,
    ValueKind::List,
    ValueKind::Object,
    ValueKind::Class,
    ValueKind::Function,
];

/// Methods available on values by intrinsic kind, e.g. `"abc".uppercase()`
/// or `items.add(4)`.
pub struct Builtins {
    methods: HashMap<ValueKind, HashMap<&'static str, BuiltinFn>>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let mut builtins = Self {
            methods: HashMap::new(),
        };

        for kind in ALL_KINDS {
            builtins.register(kind, "getType", get_type);
            builtins.register(kind, "asString", as_string);
        }

        builtins.register(ValueKind::String, "length", string_length);
        builtins.register(ValueKind::String, "reversed", string_reversed);
        builtins.register(ValueKind::String, "uppercase", string_uppercase);
        builtins.register(ValueKind::String, "lowercase", string_lowercase);
        builtins.register(ValueKind::String, "asInt", string_as_int);
        builtins.register(ValueKind::String, "asDouble", string_as_double);

        builtins.register(ValueKind::List, "length", list_length);
        builtins.register(ValueKind::List, "add", list_add);
        builtins.register(ValueKind::List, "reverse", list_reverse);
        builtins.register(ValueKind::List, "reversed", list_reversed);
        builtins.register(ValueKind::List, "clear", list_clear);

        builtins.register(ValueKind::Object, "count", object_count);
        builtins.register(ValueKind::Object, "containsKey", object_contains_key);
        builtins.register(ValueKind::Object, "get", object_get);
        builtins.register(ValueKind::Object, "set", object_set);
        builtins.register(ValueKind::Object, "keys", object_keys);

        builtins
    }

    pub fn register(&mut self, kind: ValueKind, name: &'static str, method: BuiltinFn) {
        self.methods.entry(kind).or_default().insert(name, method);
    }

    pub fn lookup(&self, kind: ValueKind, name: &str) -> Option<BuiltinFn> {
        self.methods.get(&kind)?.get(name).copied()
    }

    /// Invokes `name` on `receiver`. `None` means no such builtin exists for
    /// the receiver's kind.
    pub fn call(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        span: &Span,
    ) -> Option<Result<Value, ScriptError>> {
        self.lookup(receiver.kind(), name)
            .map(|method| method(receiver, args, span))
    }
}

fn expect_args(name: &str, args: &[Value], count: usize, span: &Span) -> Result<(), ScriptError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(ScriptError::runtime_error(
            *span,
            format!(
                "{}() takes exactly {} argument{}, got {}",
                name,
                count,
                if count == 1 { "" } else { "s" },
                args.len()
            ),
        ))
    }
}

fn string_arg<'a>(name: &str, value: &'a Value, span: &Span) -> Result<&'a str, ScriptError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ScriptError::runtime_error(
            *span,
            format!("{}() expects a string key, got '{}'", name, other.type_name()),
        )),
    }
}

fn get_type(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("getType", args, 0, span)?;
    Ok(Value::String(receiver.type_name().to_string()))
}

fn as_string(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("asString", args, 0, span)?;
    Ok(Value::String(receiver.to_string()))
}

fn receiver_str(receiver: &Value) -> &str {
    match receiver {
        Value::String(s) => s,
        _ => "",
    }
}

fn string_length(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("length", args, 0, span)?;
    Ok(Value::Int(receiver_str(receiver).chars().count() as i64))
}

fn string_reversed(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("reversed", args, 0, span)?;
    Ok(Value::String(receiver_str(receiver).chars().rev().collect()))
}

fn string_uppercase(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("uppercase", args, 0, span)?;
    Ok(Value::String(receiver_str(receiver).to_uppercase()))
}

fn string_lowercase(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("lowercase", args, 0, span)?;
    Ok(Value::String(receiver_str(receiver).to_lowercase()))
}

fn string_as_int(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("asInt", args, 0, span)?;
    let text = receiver_str(receiver);
    text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
        ScriptError::runtime_error(*span, format!("Can't convert '{}' to an int", text))
    })
}

fn string_as_double(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("asDouble", args, 0, span)?;
    let text = receiver_str(receiver);
    text.trim().parse::<f64>().map(Value::Double).map_err(|_| {
        ScriptError::runtime_error(*span, format!("Can't convert '{}' to a double", text))
    })
}

fn list_length(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("length", args, 0, span)?;
    match receiver {
        Value::List(list) => Ok(Value::Int(list.borrow().len() as i64)),
        _ => Ok(Value::Int(0)),
    }
}

fn list_add(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("add", args, 1, span)?;
    if let Value::List(list) = receiver {
        list.borrow_mut().add(args[0].clone());
    }
    Ok(Value::Null)
}

fn list_reverse(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("reverse", args, 0, span)?;
    if let Value::List(list) = receiver {
        list.borrow_mut().reverse();
    }
    Ok(Value::Null)
}

fn list_reversed(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("reversed", args, 0, span)?;
    match receiver {
        Value::List(list) => Ok(Value::new_list(list.borrow().reversed().to_vec())),
        _ => Ok(Value::new_list(Vec::new())),
    }
}

fn list_clear(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("clear", args, 0, span)?;
    if let Value::List(list) = receiver {
        list.borrow_mut().clear();
    }
    Ok(Value::Null)
}

fn object_count(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("count", args, 0, span)?;
    match receiver {
        Value::Object(object) => Ok(Value::Int(object.borrow().len() as i64)),
        _ => Ok(Value::Int(0)),
    }
}

fn object_contains_key(
    receiver: &Value,
    args: &[Value],
    span: &Span,
) -> Result<Value, ScriptError> {
    expect_args("containsKey", args, 1, span)?;
    let key = string_arg("containsKey", &args[0], span)?;
    match receiver {
        Value::Object(object) => Ok(Value::Bool(object.borrow().contains_key(key))),
        _ => Ok(Value::Bool(false)),
    }
}

fn object_get(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("get", args, 1, span)?;
    let key = string_arg("get", &args[0], span)?;
    let found = match receiver {
        Value::Object(object) => object.borrow().get(key),
        _ => None,
    };
    found.ok_or_else(|| {
        ScriptError::runtime_error(*span, format!("Object does not contain key '{}'", key))
    })
}

fn object_set(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("set", args, 2, span)?;
    let key = string_arg("set", &args[0], span)?;
    if let Value::Object(object) = receiver {
        object.borrow_mut().set(key, args[1].clone());
    }
    Ok(Value::Null)
}

fn object_keys(receiver: &Value, args: &[Value], span: &Span) -> Result<Value, ScriptError> {
    expect_args("keys", args, 0, span)?;
    let keys = match receiver {
        Value::Object(object) => object
            .borrow()
            .keys()
            .map(|key| Value::String(key.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    Ok(Value::new_list(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::EasyObject;
    use pretty_assertions::assert_eq;

    fn call(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        Builtins::new()
            .call(receiver, name, args, &Span::default())
            .unwrap_or_else(|| panic!("no builtin '{}' for {}", name, receiver.type_name()))
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn string_methods() {
        let s = string("Hello");
        assert_eq!(call(&s, "length", &[]).unwrap(), Value::Int(5));
        assert_eq!(call(&s, "reversed", &[]).unwrap(), string("olleH"));
        assert_eq!(call(&s, "uppercase", &[]).unwrap(), string("HELLO"));
        assert_eq!(call(&s, "lowercase", &[]).unwrap(), string("hello"));
        assert_eq!(call(&string(" 42 "), "asInt", &[]).unwrap(), Value::Int(42));
        assert_eq!(call(&string("2.5"), "asDouble", &[]).unwrap(), Value::Double(2.5));
        assert!(call(&string("abc"), "asInt", &[]).is_err());
    }

    #[test]
    fn list_methods_mutate_in_place() {
        let list = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        call(&list, "add", &[Value::Int(3)]).unwrap();
        assert_eq!(call(&list, "length", &[]).unwrap(), Value::Int(3));

        let reversed = call(&list, "reversed", &[]).unwrap();
        assert_eq!(reversed.to_string(), "[3, 2, 1]");
        assert_eq!(list.to_string(), "[1, 2, 3]");

        call(&list, "reverse", &[]).unwrap();
        assert_eq!(list.to_string(), "[3, 2, 1]");

        call(&list, "clear", &[]).unwrap();
        assert_eq!(call(&list, "length", &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn object_methods() {
        let object = Value::new_object(EasyObject::new());
        call(&object, "set", &[string("Name"), string("Rex")]).unwrap();

        assert_eq!(call(&object, "count", &[]).unwrap(), Value::Int(1));
        assert_eq!(call(&object, "containsKey", &[string("name")]).unwrap(), Value::Bool(true));
        assert_eq!(call(&object, "get", &[string("NAME")]).unwrap(), string("Rex"));
        assert_eq!(call(&object, "keys", &[]).unwrap().to_string(), "[\"Name\"]");

        let error = call(&object, "get", &[string("age")]).unwrap_err();
        assert_eq!(error.message, "Object does not contain key 'age'");
    }

    #[test]
    fn every_kind_has_get_type_and_as_string() {
        assert_eq!(call(&Value::Int(3), "getType", &[]).unwrap(), string("int"));
        assert_eq!(call(&Value::Double(1.0), "asString", &[]).unwrap(), string("1.0"));
        assert_eq!(call(&Value::Null, "getType", &[]).unwrap(), string("null"));
    }

    #[test]
    fn unknown_methods_are_not_found() {
        let builtins = Builtins::new();
        assert!(builtins
            .call(&Value::Int(1), "length", &[], &Span::default())
            .is_none());
    }

    #[test]
    fn wrong_argument_count_is_an_error() {
        let list = Value::new_list(Vec::new());
        let error = call(&list, "add", &[]).unwrap_err();
        assert_eq!(error.message, "add() takes exactly 1 argument, got 0");
    }
}
