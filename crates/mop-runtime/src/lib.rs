//! Mop Metaobject Runtime
//!
//! This crate provides a small metaobject protocol:
//! - An object space owning every object and composite method
//! - Delegation chains with a private singleton layer per instance
//! - Composite methods built from before-advice, a body and after-advice
//! - Chain dispatch with an overridable "message not understood" policy
//! - Mixin-style property copying between property maps
//!
//! # Example
//!
//! ```ignore
//! use mop_runtime::{Function, ObjectSpace, PropertyMap, Value};
//!
//! let mut space = ObjectSpace::new();
//! let sam = space.create(None, PropertyMap::new().with("name", "Sam"))?;
//! let greet = Function::new(|space, this, _args| {
//!     let name = space.resolve(this, "name")?.unwrap_or_default();
//!     Ok(Value::from(format!("hello {}", name)))
//! });
//! space.install(sam, "greet", Some(greet.into()))?;
//! let reply = space.send(sam, "greet", &[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod composite;
pub mod dispatch;
pub mod factory;
pub mod mixin;
pub mod object;
pub mod options;
pub mod space;
pub mod value;

pub use composite::{CompositeMethod, MethodId};
pub use dispatch::{DispatchMiss, FailOnMiss, MissKind, NotUnderstood, Reply, ReportMiss};
pub use mixin::{extend, PropertyDescriptor, PropertyMap};
pub use object::{ObjectData, ObjectId, ObjectKind, Slot};
pub use options::{MissPolicy, SpaceOptions};
pub use space::ObjectSpace;
pub use value::{Callable, Function, Value};

use std::fmt;

/// The position a callable was supplied for, used in registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableRole {
    /// Composite method body (install override or assignment)
    Body,
    /// Advice prepended to the before-list
    BeforeAdvice,
    /// Advice appended to the after-list
    AfterAdvice,
}

impl fmt::Display for CallableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableRole::Body => write!(f, "method body"),
            CallableRole::BeforeAdvice => write!(f, "before advice"),
            CallableRole::AfterAdvice => write!(f, "after advice"),
        }
    }
}

/// Object space errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MopError {
    /// A non-callable value was supplied where a body or advice is required
    #[error("{role} must be callable, got {found}")]
    NotCallable {
        /// Where the value was supplied
        role: CallableRole,
        /// Type name of the rejected value
        found: &'static str,
    },

    /// Method names must be non-empty
    #[error("Invalid method name: {0:?}")]
    InvalidName(String),

    /// The object has no delegate to install composite methods on
    #[error("Object {0} has no metaobject layer")]
    NoMetaobjectLayer(ObjectId),

    /// Object handle not issued by this space
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Method handle not issued by this space
    #[error("Unknown composite method: {0}")]
    UnknownMethod(MethodId),

    /// A dispatch miss escalated by the not-understood policy
    #[error("Message not understood: {selector} ({kind})")]
    NotUnderstood {
        /// Message name that failed to dispatch
        selector: String,
        /// Why the dispatch failed
        kind: MissKind,
    },

    /// An arena ran out of handle space
    #[error("Too many {0} in one object space")]
    CapacityExceeded(&'static str),

    /// Nested invocation exceeded `SpaceOptions::max_call_depth`
    #[error("Call depth exceeded (limit {0})")]
    CallDepthExceeded(usize),

    /// Error raised by a native callable
    #[error("{0}")]
    Raised(String),
}

impl MopError {
    /// Convenience constructor for errors raised from native callables
    pub fn raised(message: impl Into<String>) -> Self {
        MopError::Raised(message.into())
    }
}

/// Object space result
pub type MopResult<T> = Result<T, MopError>;
