use crate::error::{LhoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a frame; closures keep their defining frame alive through it.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical frame. Frames only point outward, so no `Rc` cycles form
/// between environments themselves.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a new child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Binds `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LhoxError::runtime(format!("undefined variable: {}", name)))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LhoxError::runtime(format!(
                "cannot assign to undefined variable: {}",
                name
            )))
        }
    }

    /// The frame exactly `distance` hops outward from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Result<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing().ok_or_else(|| {
                LhoxError::runtime(format!("no enclosing scope at distance {}", distance))
            })?;
            current = next;
        }

        Ok(current)
    }

    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Result<Value> {
        let frame: EnvRef = Self::ancestor(env, distance)?;
        let value = frame.borrow().get(name);

        value
    }

    /// Assigns in the frame `distance` hops out; the name must already be bound there.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> Result<()> {
        let frame: EnvRef = Self::ancestor(env, distance)?;
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(LhoxError::runtime(format!(
                "cannot assign to undefined variable: {}",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_walk_outward_and_assign_in_place() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Int(1));

        let inner: EnvRef = Environment::child_of(&globals);
        inner.borrow_mut().define("b", Value::Int(2));

        assert_eq!(inner.borrow().get("a").ok(), Some(Value::Int(1)));
        assert_eq!(Environment::get_at(&inner, 0, "b").ok(), Some(Value::Int(2)));

        Environment::assign_at(&inner, 1, "a", Value::Int(3)).unwrap();
        assert_eq!(globals.borrow().get("a").ok(), Some(Value::Int(3)));

        assert!(Environment::assign_at(&inner, 1, "b", Value::Nil).is_err());
        assert!(Environment::ancestor(&inner, 2).is_err());
        assert!(inner.borrow_mut().assign("missing", Value::Nil).is_err());
    }
}
