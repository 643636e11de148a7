use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;

use inject::{Params, Value};

use crate::Done;

/// What calling a task body produced.
pub enum Outcome {
    /// Nothing yet; the body will settle its `done` input itself.
    Pending,
    /// A plain value, which counts as immediate success.
    Value(Value),
    /// Settles when the future resolves.
    Future(LocalBoxFuture<'static, Result<Value>>),
    /// Settles when the stream ends, or on its first error.
    Stream(LocalBoxStream<'static, Result<Value>>),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Value(v) => write!(f, "Value({v:?})"),
            Self::Future(_) => write!(f, "Future"),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

type Body = Rc<dyn Fn(Vec<Value>) -> Result<Outcome>>;

/// A callable task body together with the inputs it declares.
/// Arguments are passed positionally, in declaration order.
#[derive(Clone)]
pub struct TaskFn {
    params: Params,
    display_name: Option<String>,
    body: Body,
}

impl TaskFn {
    pub fn new<F>(params: Params, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Outcome> + 'static,
    {
        Self {
            params,
            display_name: None,
            body: Rc::new(body),
        }
    }

    /// Declare inputs with a parameter signature, e.g. `"(done, level = 2)"`.
    pub fn with_signature<F>(signature: &str, body: F) -> Result<Self>
    where
        F: Fn(Vec<Value>) -> Result<Outcome> + 'static,
    {
        Ok(Self::new(Params::from_signature(signature)?, body))
    }

    /// A body that declares `done` and completes straight away.
    /// Used for tasks that only exist to run their dependencies.
    pub fn noop() -> Self {
        Self::new(Params::from_names(["done"]), |args| {
            if let Some(done) = args.first().and_then(|v| v.downcast_ref::<Done>()) {
                done.complete();
            }
            Ok(Outcome::Value(Value::Undefined))
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Outcome> {
        (self.body)(args)
    }
}

impl std::fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskFn{:?}", self.params.names())
    }
}
