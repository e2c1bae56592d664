use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{Class, Function, Instance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LhoxError, Result};
use crate::natives;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Calls nested deeper than this fail with `stack overflow`.
pub const MAX_CALL_DEPTH: usize = 25_000;

/// Remaining native stack that triggers growth, and the size of each new segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// How a statement finished. Faults travel separately in `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking evaluator over a resolved AST.
///
/// Variable references recorded by the resolver are looked up exactly that
/// many frames out; unrecorded ones go straight to the globals.
pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    input: Box<dyn BufRead>,
    out: Box<dyn Write>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter reading stdin and writing stdout, with every
    /// native function defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Reads from stdin. The one-byte buffer leaves read-ahead to std's shared
    /// stdin buffer, so REPL lines are never swallowed by `input`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_io(Box::new(BufReader::with_capacity(1, io::stdin())), out)
    }

    pub fn with_io(input: Box<dyn BufRead>, out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        natives::install(&mut globals);
        let globals: EnvRef = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            input,
            out,
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    pub fn set_max_call_depth(&mut self, limit: usize) {
        self.max_call_depth = limit;
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    pub fn input(&mut self) -> &mut dyn BufRead {
        self.input.as_mut()
    }

    /// Records that the binding referenced by `id` lives `depth` frames out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Executes a program top to bottom, stopping at the first error.
    /// A panic during execution is reported as a runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(statements)));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                self.environment = Rc::clone(&self.globals);
                self.call_depth = 0;
                Err(LhoxError::runtime(panic_message(payload.as_ref())))
            }
        };

        self.out.flush()?;

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }

        result
    }

    fn run(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                stray => {
                    return Err(LhoxError::runtime(format!(
                        "unexpected {:?} signal at top level",
                        stray
                    )))
                }
            }
        }

        Ok(())
    }

    /// Executes a single statement, growing the native stack when it runs low.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Block { statements, .. } => {
                let env: EnvRef = Environment::child_of(&self.environment);

                self.execute_block(statements, env)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods)?;

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Continue { .. } => Ok(Flow::Continue),
        }
    }

    /// Runs `statements` inside `env`, restoring the previous environment on
    /// every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            let flow: Flow = self.execute(stmt)?;

            if flow != Flow::Normal {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => return Err(LhoxError::runtime("superclass must be a class")),
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra frame holding `super`.
        let method_env: EnvRef = match &superclass {
            Some(superclass) => {
                let env: EnvRef = Environment::child_of(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let function = Function::new(
                    Rc::clone(decl),
                    Rc::clone(&method_env),
                    decl.name.lexeme == "init",
                );

                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(name.lexeme.as_str(), methods, superclass);
        info!("Class '{}' defined", class.name);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)))
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone())?,
                }

                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable = callee
                    .as_callable()
                    .ok_or_else(|| LhoxError::runtime("can only call functions and classes"))?;

                if values.len() != callable.arity() {
                    return Err(LhoxError::runtime(format!(
                        "expected {} arguments but got {}",
                        callable.arity(),
                        values.len()
                    )));
                }

                if self.call_depth >= self.max_call_depth {
                    return Err(LhoxError::runtime("stack overflow"));
                }

                self.call_depth += 1;
                let result = callable.call(self, values);
                self.call_depth -= 1;

                result
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(&name.lexeme),
                _ => Err(LhoxError::runtime("only instances have properties")),
            },

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal { value, .. } => Ok(literal(value)),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let value: Value = self.evaluate(value)?;

                let instance: Rc<Instance> = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    _ => return Err(LhoxError::runtime("only instances have fields")),
                };
                instance.set(&name.lexeme, value.clone());

                Ok(value)
            }

            Expr::Super { id, method, .. } => self.super_method(*id, &method.lexeme),

            Expr::This { id, keyword } => self.lookup_variable(*id, &keyword.lexeme),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        _ => Err(LhoxError::runtime("operand must be a number")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LhoxError::runtime("unknown unary operator")),
                }
            }

            Expr::Variable { id, name } => self.lookup_variable(*id, &name.lexeme),
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &str) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => {
                let value = self.globals.borrow().get(name);

                value
            }
        }
    }

    /// `super.method` binds the superclass method to the current `this`.
    fn super_method(&self, id: ExprId, method: &str) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LhoxError::runtime("'super' was not resolved"))?;

        let superclass: Rc<Class> = match Environment::get_at(&self.environment, distance, "super")? {
            Value::Class(class) => class,
            _ => return Err(LhoxError::runtime("super must be a class")),
        };

        let this_distance: usize = distance.saturating_sub(1);
        let instance: Rc<Instance> =
            match Environment::get_at(&self.environment, this_distance, "this")? {
                Value::Instance(instance) => instance,
                _ => return Err(LhoxError::runtime("this must be an instance")),
            };

        let function: Rc<Function> = superclass
            .find_method(method)
            .ok_or_else(|| LhoxError::runtime(format!("undefined property: {}", method)))?;

        Ok(Value::Function(Rc::new(function.bind(instance))))
    }
}

fn literal(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Nil => Value::Nil,
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Int(n) => Value::Int(*n),
        LiteralValue::Float(n) => Value::Float(*n),
        LiteralValue::Str(s) => Value::Str(s.clone()),
    }
}

/// Both operands as ints, or both promoted to floats.
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Result<Numbers> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return Ok(Numbers::Ints(*a, *b));
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Numbers::Floats(a, b)),
        _ => Err(LhoxError::runtime("operand must be a int or float")),
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    Ok(match numbers(left, right)? {
        Numbers::Ints(a, b) => Value::Int(int_op(a, b)),
        Numbers::Floats(a, b) => Value::Float(float_op(a, b)),
    })
}

fn comparison(
    left: &Value,
    right: &Value,
    int_op: fn(&i64, &i64) -> bool,
    float_op: fn(&f64, &f64) -> bool,
) -> Result<Value> {
    Ok(Value::Bool(match numbers(left, right)? {
        Numbers::Ints(a, b) => int_op(&a, &b),
        Numbers::Floats(a, b) => float_op(&a, &b),
    }))
}

/// Binary operators of the tree walker: `+` joins only two strings, int
/// division truncates, an int zero divisor is an error, `==` never promotes.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::PLUS => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::Str(_), _) => Err(LhoxError::runtime(
                "can only concatenate string to string",
            )),
            _ => arithmetic(&left, &right, i64::wrapping_add, |a, b| a + b),
        },

        TokenType::MINUS => arithmetic(&left, &right, i64::wrapping_sub, |a, b| a - b),

        TokenType::STAR => arithmetic(&left, &right, i64::wrapping_mul, |a, b| a * b),

        TokenType::SLASH => match numbers(&left, &right)? {
            Numbers::Ints(_, 0) => Err(LhoxError::runtime("division by zero")),
            Numbers::Ints(a, b) => Ok(Value::Int(a.wrapping_div(b))),
            Numbers::Floats(a, b) => Ok(Value::Float(a / b)),
        },

        TokenType::GREATER => comparison(&left, &right, i64::gt, f64::gt),
        TokenType::GREATER_EQUAL => comparison(&left, &right, i64::ge, f64::ge),
        TokenType::LESS => comparison(&left, &right, i64::lt, f64::lt),
        TokenType::LESS_EQUAL => comparison(&left, &right, i64::le, f64::le),

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(LhoxError::runtime(format!(
            "unknown binary operator '{}'",
            operator.lexeme
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "interpreter panicked".to_string()
    }
}
