//! Runtime values
//!
//! `Value` is the tagged sum type stored in attribute slots and passed to
//! callables. `Callable` narrows a value to the two things that may be
//! installed as a body or as advice, and is validated at registration time.

use std::fmt;
use std::rc::Rc;

use crate::composite::MethodId;
use crate::object::ObjectId;
use crate::space::ObjectSpace;
use crate::{CallableRole, MopError, MopResult};

// ============================================================================
// Native Function
// ============================================================================

/// Native function signature.
///
/// Receives the object space, the receiver (`this`) and the positional
/// arguments. Returning `Value::Undefined` means "no value".
pub type NativeFn = dyn Fn(&mut ObjectSpace, ObjectId, &[Value]) -> MopResult<Value>;

/// Reference-counted native closure
#[derive(Clone)]
pub struct Function {
    name: Option<Rc<str>>,
    inner: Rc<NativeFn>,
}

impl Function {
    /// Wrap an anonymous closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ObjectSpace, ObjectId, &[Value]) -> MopResult<Value> + 'static,
    {
        Self {
            name: None,
            inner: Rc::new(f),
        }
    }

    /// Wrap a closure with a diagnostic name
    pub fn named<F>(name: &str, f: F) -> Self
    where
        F: Fn(&mut ObjectSpace, ObjectId, &[Value]) -> MopResult<Value> + 'static,
    {
        Self {
            name: Some(Rc::from(name)),
            inner: Rc::new(f),
        }
    }

    /// The default composite body: ignores its arguments, returns undefined
    pub fn noop() -> Self {
        Self::named("noop", |_, _, _| Ok(Value::Undefined))
    }

    /// Diagnostic name, if one was given
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Call the closure directly, bypassing call-depth accounting.
    ///
    /// Prefer `ObjectSpace::apply`, which enforces `max_call_depth`.
    pub fn call(&self, space: &mut ObjectSpace, this: ObjectId, args: &[Value]) -> MopResult<Value> {
        (self.inner)(space, this, args)
    }

    /// Identity comparison (same closure allocation)
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Function({})", name),
            None => write!(f, "Function(<anonymous>)"),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// ============================================================================
// Value
// ============================================================================

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value; after-advice returning this passes the accumulator through
    #[default]
    Undefined,
    /// Explicit null (a defined value)
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Immutable array
    Array(Rc<[Value]>),
    /// Object handle
    Object(ObjectId),
    /// Native callable
    Function(Function),
    /// Composite method handle (callable)
    Method(MethodId),
}

impl Value {
    /// Build an array value
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a native function value from a closure
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut ObjectSpace, ObjectId, &[Value]) -> MopResult<Value> + 'static,
    {
        Value::Function(Function::new(f))
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Method(_) => "composite method",
        }
    }

    /// Check for `Undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for native functions and composite methods
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Method(_))
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array slice
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get as object handle
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as composite method handle
    pub fn as_method(&self) -> Option<MethodId> {
        match self {
            Value::Method(id) => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Method(a), Value::Method(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(id) => write!(f, "[object {}]", id),
            Value::Function(func) => write!(f, "[function {}]", func.name().unwrap_or("anonymous")),
            Value::Method(id) => write!(f, "[composite {}]", id),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<MethodId> for Value {
    fn from(id: MethodId) -> Self {
        Value::Method(id)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::from(items))
    }
}

// ============================================================================
// Callable
// ============================================================================

/// A value that may be installed as a body or as advice
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// Native closure
    Native(Function),
    /// Another composite method
    Composite(MethodId),
}

impl Callable {
    /// Narrow a value to a callable, rejecting everything else
    pub fn from_value(value: Value, role: CallableRole) -> MopResult<Self> {
        match value {
            Value::Function(func) => Ok(Callable::Native(func)),
            Value::Method(id) => Ok(Callable::Composite(id)),
            other => Err(MopError::NotCallable {
                role,
                found: other.type_name(),
            }),
        }
    }

    /// Widen back to a value
    pub fn into_value(self) -> Value {
        match self {
            Callable::Native(func) => Value::Function(func),
            Callable::Composite(id) => Value::Method(id),
        }
    }
}

impl From<Function> for Callable {
    fn from(func: Function) -> Self {
        Callable::Native(func)
    }
}
