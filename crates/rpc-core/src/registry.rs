//! API registry: the name-to-procedure table an endpoint dispatches incoming
//! requests against.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use rpc_protocol::lower_case_keys;

use crate::error::ApiExecutionError;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Value>, ApiExecutionError>> + Send + 'a>>;

/// A declared parameter or return type, checked against the decoded
/// argument vector before a call reaches its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I64,
    F64,
    String,
    Json,
}

impl ParamType {
    /// Whether a decoded JSON value is shaped the way this parameter type
    /// declares. `Json` accepts anything — it's the escape hatch for
    /// handlers that want the raw value.
    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::Bool => value.is_boolean(),
            ParamType::I64 => value.is_i64() || value.is_u64(),
            ParamType::F64 => value.is_number(),
            ParamType::String => value.is_string(),
            ParamType::Json => true,
        }
    }
}

/// Check a decoded argument vector against a registered procedure's
/// declared parameter types, before its handler ever sees them.
pub fn check_arg_types(args: &[Value], expected: &[ParamType]) -> Result<(), ApiExecutionError> {
    if args.len() != expected.len() {
        return Err(ApiExecutionError::new(format!(
            "expected {} argument(s), got {}",
            expected.len(),
            args.len()
        )));
    }
    for (index, (arg, param_type)) in args.iter().zip(expected.iter()).enumerate() {
        if !param_type.accepts(arg) {
            return Err(ApiExecutionError::new(format!(
                "argument {index} does not match its declared type {param_type:?} (got {arg})"
            )));
        }
    }
    Ok(())
}

/// A handler's declared result type. `Void` is the sentinel meaning "never
/// emit a reply for this API".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Value(ParamType),
}

/// An object-safe, invocable procedure. Implemented for any
/// `Fn(Vec<Value>) -> Future<Output = Result<Option<Value>, ApiExecutionError>>`
/// closure, so handlers built with [`handler0`]/[`handler1`]/[`handler2`] need
/// no manual trait impl.
pub trait Handler: Send + Sync {
    fn invoke(&self, args: Vec<Value>) -> HandlerFuture<'static>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, ApiExecutionError>> + Send + 'static,
{
    fn invoke(&self, args: Vec<Value>) -> HandlerFuture<'static> {
        Box::pin((self)(args))
    }
}

/// Everything the dispatcher needs to route a call to a registered
/// procedure and interpret its result.
#[derive(Clone)]
pub struct ApiDescriptor {
    pub name: String,
    pub parameter_types: Vec<ParamType>,
    pub return_type: ReturnType,
    pub invoke: Arc<dyn Handler>,
}

/// Frozen, read-only table of registered procedures.
pub struct ApiRegistry {
    descriptors: HashMap<String, Arc<ApiDescriptor>>,
}

impl ApiRegistry {
    pub fn try_get(&self, name: &str) -> Option<Arc<ApiDescriptor>> {
        self.descriptors.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Builds an [`ApiRegistry`] before an endpoint starts; registration is not
/// possible once a session owns the table.
#[derive(Default)]
pub struct ApiRegistryBuilder {
    descriptors: HashMap<String, Arc<ApiDescriptor>>,
}

impl ApiRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure under `name`. Panics if `name` is already
    /// registered — a duplicate API name is a construction-time bug, caught
    /// before any connection is accepted.
    #[must_use]
    pub fn register(
        mut self,
        name: impl Into<String>,
        parameter_types: Vec<ParamType>,
        return_type: ReturnType,
        invoke: Arc<dyn Handler>,
    ) -> Self {
        let name = name.into();
        let descriptor = Arc::new(ApiDescriptor {
            name: name.clone(),
            parameter_types,
            return_type,
            invoke,
        });
        if self.descriptors.insert(name.clone(), descriptor).is_some() {
            panic!("API '{name}' registered twice");
        }
        self
    }

    pub fn build(self) -> ApiRegistry {
        ApiRegistry {
            descriptors: self.descriptors,
        }
    }
}

fn execution_error(err: impl std::fmt::Display) -> ApiExecutionError {
    ApiExecutionError::new(err.to_string())
}

/// Adapt a zero-argument handler closure into an object-safe [`Handler`].
pub fn handler0<R, F, Fut>(f: F) -> Arc<dyn Handler>
where
    R: Serialize,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiExecutionError>> + Send + 'static,
{
    Arc::new(move |_args: Vec<Value>| {
        let fut = f();
        async move {
            let result = fut.await?;
            let value = serde_json::to_value(result).map_err(execution_error)?;
            Ok(Some(value))
        }
    })
}

/// Adapt a one-argument handler closure into an object-safe [`Handler`].
/// The single incoming argument is decoded case-insensitively into `P1`.
pub fn handler1<P1, R, F, Fut>(f: F) -> Arc<dyn Handler>
where
    P1: DeserializeOwned,
    R: Serialize,
    F: Fn(P1) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiExecutionError>> + Send + 'static,
{
    Arc::new(move |mut args: Vec<Value>| {
        let decoded = take_arg::<P1>(&mut args, 0);
        let fut = decoded.map(|p1| f(p1));
        async move {
            let result = fut?.await?;
            let value = serde_json::to_value(result).map_err(execution_error)?;
            Ok(Some(value))
        }
    })
}

/// Adapt a two-argument handler closure into an object-safe [`Handler`].
pub fn handler2<P1, P2, R, F, Fut>(f: F) -> Arc<dyn Handler>
where
    P1: DeserializeOwned,
    P2: DeserializeOwned,
    R: Serialize,
    F: Fn(P1, P2) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiExecutionError>> + Send + 'static,
{
    Arc::new(move |mut args: Vec<Value>| {
        let decoded = take_arg::<P2>(&mut args, 1).and_then(|p2| Ok((take_arg::<P1>(&mut args, 0)?, p2)));
        let fut = decoded.map(|(p1, p2)| f(p1, p2));
        async move {
            let result = fut?.await?;
            let value = serde_json::to_value(result).map_err(execution_error)?;
            Ok(Some(value))
        }
    })
}

fn take_arg<T: DeserializeOwned>(args: &mut [Value], index: usize) -> Result<T, ApiExecutionError> {
    let raw = args
        .get(index)
        .cloned()
        .ok_or_else(|| ApiExecutionError::new(format!("missing argument at position {index}")))?;
    let normalized = lower_case_keys(raw);
    serde_json::from_value(normalized).map_err(execution_error)
}
