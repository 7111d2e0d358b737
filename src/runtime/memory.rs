//! Runtime memory model: named mutable value stores.
//!
//! One global space lives for the whole interpretation run; every
//! function/program call gets its own space, pushed onto a call stack on
//! entry and destroyed on return. Spaces are never shared across calls.

use std::collections::HashMap;

use super::value::Value;

/// A mutable name→value store corresponding to one scope activation.
#[derive(Debug, Clone)]
pub struct MemorySpace {
    /// Space name, used in traces and errors (`global`, or the callee name).
    pub name: String,
    slots: HashMap<String, Value>,
}

impl MemorySpace {
    /// Create an empty space.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: HashMap::new(),
        }
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.slots.insert(name.into(), value);
    }

    /// Read a value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// True when the name has a stored value.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Iterate over stored name/value pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.slots.iter()
    }
}

/// The stack of call spaces for one interpretation run.
#[derive(Debug, Default)]
pub struct CallStack {
    spaces: Vec<MemorySpace>,
}

impl CallStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { spaces: Vec::new() }
    }

    /// Push a call space.
    pub fn push(&mut self, space: MemorySpace) {
        self.spaces.push(space);
    }

    /// Pop and discard the top space.
    pub fn pop(&mut self) -> Option<MemorySpace> {
        self.spaces.pop()
    }

    /// The active call space, when any call is in flight.
    pub fn current(&self) -> Option<&MemorySpace> {
        self.spaces.last()
    }

    /// Mutable access to the active call space.
    pub fn current_mut(&mut self) -> Option<&mut MemorySpace> {
        self.spaces.last_mut()
    }

    /// Number of in-flight calls.
    pub fn depth(&self) -> usize {
        self.spaces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_are_independent() {
        let mut stack = CallStack::new();
        let mut first = MemorySpace::new("first");
        first.set("x", Value::Int(1));
        stack.push(first);
        stack.push(MemorySpace::new("second"));

        assert!(stack.current().unwrap().get("x").is_none());
        stack.pop();
        assert_eq!(stack.current().unwrap().get("x"), Some(&Value::Int(1)));
    }
}
