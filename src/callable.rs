//! Runtime callables: user functions, classes (as constructors), their
//! instances, and host-provided native functions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{LhoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Anything that can appear in callee position.
///
/// The interpreter checks `arguments.len() == arity()` before calling.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value>;
}

/// A user-defined function or method together with the frame it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure additionally binds `this`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let env: EnvRef = Environment::child_of(&self.closure);
        env.borrow_mut().define("this", Value::Instance(instance));

        Function::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }

    fn this_value(&self) -> Result<Value> {
        let this = self.closure.borrow().get("this");

        this
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let env: EnvRef = Environment::child_of(&self.closure);
        {
            let mut frame = env.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                frame.define(&param.lexeme, argument);
            }
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, env)?;

        // `init` always yields the instance, whatever the body did.
        if self.is_initializer {
            return self.this_value();
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
    pub superclass: Option<Rc<Class>>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        methods: HashMap<String, Rc<Function>>,
        superclass: Option<Rc<Class>>,
    ) -> Self {
        Self {
            name: name.into(),
            methods,
            superclass,
        }
    }

    /// Looks the method up here, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

impl Callable for Rc<Class> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Rc<Instance> = Rc::new(Instance::new(Rc::clone(self)));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("superclass", &self.superclass.as_ref().map(|s| &s.name))
            .finish()
    }
}

/// Fields live on the instance; methods are looked up on the class and
/// rebound on every access.
pub struct Instance {
    class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn get(self: &Rc<Self>, name: &str) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(name) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(LhoxError::runtime(format!("undefined property: {}", name)))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

/// Signature shared by every built-in.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(interpreter, &arguments)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
