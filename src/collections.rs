use crate::value::Value;

/// Ordered, growable, 0-indexed sequence backing script lists.
#[derive(Debug, Clone, Default)]
pub struct EasyList {
    items: Vec<Value>,
}

impl EasyList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Bounds-checked read. Negative indices are out of range.
    pub fn get(&self, index: i64) -> Option<Value> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .cloned()
    }

    /// Bounds-checked write; returns `false` when `index` is out of range.
    pub fn set(&mut self, index: i64, value: Value) -> bool {
        match usize::try_from(index).ok().and_then(|i| self.items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    pub fn reversed(&self) -> EasyList {
        Self::from_values(self.items.iter().rev().cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.clone()
    }
}

/// Ordered string-keyed map backing script objects and class instances.
///
/// Keys compare case-insensitively but keep the spelling they were first
/// inserted with. Surrounding double quotes are trimmed from keys.
#[derive(Debug, Clone, Default)]
pub struct EasyObject {
    entries: Vec<(String, Value)>,
}

impl EasyObject {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_index(&self, key: &str) -> Option<usize> {
        let key = normalize_key(key);
        self.entries
            .iter()
            .position(|(existing, _)| keys_match(existing, key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_index(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.find_index(key).map(|i| self.entries[i].1.clone())
    }

    /// Updates an existing key in place or appends a new one.
    pub fn set(&mut self, key: &str, value: Value) {
        match self.find_index(key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((normalize_key(key).to_string(), value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

fn normalize_key(key: &str) -> &str {
    key.trim_matches('"')
}

pub(crate) fn keys_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_get_and_set_are_bounds_checked() {
        let mut list = EasyList::new();
        list.add(Value::Int(7));

        assert_eq!(list.get(0), Some(Value::Int(7)));
        assert_eq!(list.get(1), None);
        assert_eq!(list.get(-1), None);
        assert!(list.set(0, Value::Int(8)));
        assert!(!list.set(3, Value::Int(9)));
        assert_eq!(list.get(0), Some(Value::Int(8)));
    }

    #[test]
    fn list_clear_and_reverse() {
        let mut list = EasyList::from_values(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.reversed().to_vec(), vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
        list.reverse();
        assert_eq!(list.get(0), Some(Value::Int(3)));
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn object_keys_are_case_insensitive() {
        let mut object = EasyObject::new();
        object.set("Key", Value::Int(1));

        assert_eq!(object.get("key"), Some(Value::Int(1)));
        assert!(object.contains_key("KEY"));

        object.set("kEy", Value::Int(2));
        assert_eq!(object.len(), 1);
        assert_eq!(object.keys().next(), Some("Key"));
        assert_eq!(object.get("KEY"), Some(Value::Int(2)));
    }

    #[test]
    fn object_preserves_insertion_order() {
        let mut object = EasyObject::new();
        object.set("b", Value::Int(1));
        object.set("A", Value::Int(2));
        object.set("c", Value::Int(3));
        object.set("a", Value::Int(4));

        let keys: Vec<&str> = object.keys().collect();
        assert_eq!(keys, vec!["b", "A", "c"]);
    }

    #[test]
    fn object_trims_quotes_from_keys() {
        let mut object = EasyObject::new();
        object.set("\"name\"", Value::String("x".to_string()));
        assert_eq!(object.keys().next(), Some("name"));
        assert!(object.contains_key("name"));
    }
}
