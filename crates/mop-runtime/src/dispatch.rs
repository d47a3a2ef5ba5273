//! Chain Dispatch
//!
//! `resolve` walks the delegation chain looking for an own attribute;
//! `send` resolves a message and invokes it with the original receiver as
//! `this`.
//!
//! ## Misses
//!
//! A name that is absent, or that resolves to a non-callable value, is a
//! dispatch miss. Misses are handed to the space's `NotUnderstood` handler:
//! - `ReportMiss` (default) returns `Reply::NotUnderstood`
//! - `FailOnMiss` returns `MopError::NotUnderstood`
//! - any closure `Fn(&mut ObjectSpace, DispatchMiss, &[Value])` may answer
//!   with a substitute reply instead

use std::fmt;

use crate::object::ObjectId;
use crate::space::ObjectSpace;
use crate::value::{Callable, Value};
use crate::{MopError, MopResult};

/// Why a dispatch missed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissKind {
    /// Nothing in the chain has that name
    NotFound,
    /// The name resolved to a value that cannot be called
    NotCallable,
}

impl fmt::Display for MissKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissKind::NotFound => write!(f, "not found"),
            MissKind::NotCallable => write!(f, "not callable"),
        }
    }
}

/// A message that could not be dispatched
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchMiss {
    /// Object the message was sent to
    pub receiver: ObjectId,
    /// Message name
    pub selector: String,
    /// Why the dispatch missed
    pub kind: MissKind,
    /// The non-callable value, for `MissKind::NotCallable`
    pub resolved: Option<Value>,
}

impl DispatchMiss {
    /// Convert into the error form
    pub fn into_error(self) -> MopError {
        MopError::NotUnderstood {
            selector: self.selector,
            kind: self.kind,
        }
    }
}

/// Outcome of `send`
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The message was handled and produced a value
    Value(Value),
    /// The message was not understood and the handler reported it
    NotUnderstood(DispatchMiss),
}

impl Reply {
    /// Check if the message was handled
    pub fn is_understood(&self) -> bool {
        matches!(self, Reply::Value(_))
    }

    /// The produced value, if any
    pub fn value(self) -> Option<Value> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::NotUnderstood(_) => None,
        }
    }

    /// Treat a reported miss as an error
    pub fn into_result(self) -> MopResult<Value> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::NotUnderstood(miss) => Err(miss.into_error()),
        }
    }
}

/// Policy applied when `send` misses
pub trait NotUnderstood {
    /// Handle a miss. `args` are the arguments the message was sent with.
    fn not_understood(&self, space: &mut ObjectSpace, miss: DispatchMiss, args: &[Value]) -> MopResult<Reply>;
}

/// Report misses as `Reply::NotUnderstood` (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportMiss;

impl NotUnderstood for ReportMiss {
    fn not_understood(&self, _space: &mut ObjectSpace, miss: DispatchMiss, _args: &[Value]) -> MopResult<Reply> {
        tracing::debug!(receiver = %miss.receiver, selector = %miss.selector, kind = %miss.kind, "message not understood");
        Ok(Reply::NotUnderstood(miss))
    }
}

/// Escalate misses to `MopError::NotUnderstood`
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOnMiss;

impl NotUnderstood for FailOnMiss {
    fn not_understood(&self, _space: &mut ObjectSpace, miss: DispatchMiss, _args: &[Value]) -> MopResult<Reply> {
        Err(miss.into_error())
    }
}

impl<F> NotUnderstood for F
where
    F: Fn(&mut ObjectSpace, DispatchMiss, &[Value]) -> MopResult<Reply>,
{
    fn not_understood(&self, space: &mut ObjectSpace, miss: DispatchMiss, args: &[Value]) -> MopResult<Reply> {
        self(space, miss, args)
    }
}

impl ObjectSpace {
    /// Find `name` on `object` or the nearest object in its chain.
    ///
    /// Returns `Ok(None)` when nothing in the chain has the name.
    pub fn resolve(&self, object: ObjectId, name: &str) -> MopResult<Option<Value>> {
        let mut current = Some(object);
        while let Some(id) = current {
            let data = self.object(id)?;
            if let Some(slot) = data.slot(name) {
                return Ok(Some(slot.value()));
            }
            current = data.delegate();
        }
        Ok(None)
    }

    /// Resolve `name` from `receiver` and invoke it with `receiver` as `this`.
    ///
    /// Misses go to the not-understood handler. Errors raised by the invoked
    /// callable propagate unchanged.
    pub fn send(&mut self, receiver: ObjectId, name: &str, args: &[Value]) -> MopResult<Reply> {
        let miss = match self.resolve(receiver, name)? {
            Some(Value::Function(func)) => {
                return Ok(Reply::Value(self.apply(&Callable::Native(func), receiver, args)?));
            }
            Some(Value::Method(method)) => {
                return Ok(Reply::Value(self.apply(&Callable::Composite(method), receiver, args)?));
            }
            Some(other) => DispatchMiss {
                receiver,
                selector: name.to_string(),
                kind: MissKind::NotCallable,
                resolved: Some(other),
            },
            None => DispatchMiss {
                receiver,
                selector: name.to_string(),
                kind: MissKind::NotFound,
                resolved: None,
            },
        };

        let handler = self.miss_handler();
        handler.not_understood(self, miss, args)
    }

    /// Direct call: like `send`, but a reported miss becomes an error
    pub fn call(&mut self, receiver: ObjectId, name: &str, args: &[Value]) -> MopResult<Value> {
        self.send(receiver, name, args)?.into_result()
    }
}
