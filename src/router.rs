use std::{
    borrow::Cow,
    collections::{btree_map::Entry, BTreeMap},
    fmt,
    future::Future,
    panic::Location,
    sync::Arc,
};

use futures::{stream::BoxStream, Stream};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    procedure::{Handler, HttpVerb, MethodDescriptor, Procedure},
    Error, ErrorCode, Reflect,
};

/// Returned when a method can't be registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("Duplicate method '{key}'. Original: {original} Duplicate: {duplicate}")]
    Duplicate {
        key: String,
        original: &'static Location<'static>,
        duplicate: &'static Location<'static>,
    },
    #[error("Invalid {what} name '{name}' at {location}, names must be non-empty identifiers")]
    InvalidName {
        what: &'static str,
        name: String,
        location: &'static Location<'static>,
    },
}

type BuildHook = Box<dyn FnOnce(&BuiltRouter) + Send + 'static>;

/// A registry of services and their methods.
///
/// Methods are registered with [`Router::unary`] and [`Router::live`]. Registering the same
/// `Service.Method` key twice is rejected immediately, including when merging two routers.
/// Call [`Router::build`] once everything is registered.
#[derive(Default)]
pub struct Router {
    procedures: BTreeMap<String, Procedure>,
    hooks: Vec<BuildHook>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Router")
            .field(&self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request/response method. Transports reach it with `POST`.
    #[track_caller]
    pub fn unary<TReq, TRes, F, Fut>(
        self,
        service: impl Into<Cow<'static, str>>,
        method: impl Into<Cow<'static, str>>,
        handler: F,
    ) -> Result<Self, RouterError>
    where
        TReq: DeserializeOwned + Reflect + Send + 'static,
        TRes: Serialize + Reflect + Send + 'static,
        F: Fn(TReq) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TRes, Error>> + Send + 'static,
    {
        self.unary_with(service, method, HttpVerb::Post, handler)
    }

    /// Register a request/response method reached with a specific HTTP verb.
    #[track_caller]
    pub fn unary_with<TReq, TRes, F, Fut>(
        self,
        service: impl Into<Cow<'static, str>>,
        method: impl Into<Cow<'static, str>>,
        verb: HttpVerb,
        handler: F,
    ) -> Result<Self, RouterError>
    where
        TReq: DeserializeOwned + Reflect + Send + 'static,
        TRes: Serialize + Reflect + Send + 'static,
        F: Fn(TReq) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TRes, Error>> + Send + 'static,
    {
        let location = Location::caller();
        let (service, method) = names(service.into(), method.into(), location)?;
        self.insert(Procedure::unary(service, method, verb, location, handler))
    }

    /// Register a method which streams values to its subscriber.
    ///
    /// The handler is called once per subscription and returns the stream of values. Returning an
    /// error rejects the subscription.
    #[track_caller]
    pub fn live<TReq, TRes, F, S>(
        self,
        service: impl Into<Cow<'static, str>>,
        method: impl Into<Cow<'static, str>>,
        handler: F,
    ) -> Result<Self, RouterError>
    where
        TReq: DeserializeOwned + Reflect + Send + 'static,
        TRes: Serialize + Reflect + Send + 'static,
        F: Fn(TReq) -> Result<S, Error> + Send + Sync + 'static,
        S: Stream<Item = TRes> + Send + 'static,
    {
        let location = Location::caller();
        let (service, method) = names(service.into(), method.into(), location)?;
        self.insert(Procedure::live(service, method, location, handler))
    }

    /// Move every method of `other` into this router.
    pub fn merge(mut self, other: Router) -> Result<Self, RouterError> {
        self.hooks.extend(other.hooks);
        for (_, procedure) in other.procedures {
            self = self.insert(procedure)?;
        }
        Ok(self)
    }

    /// Run `func` with the finished registry when [`Router::build`] is called.
    ///
    /// Hooks run in the order they were registered.
    pub fn on_build(mut self, func: impl FnOnce(&BuiltRouter) + Send + 'static) -> Self {
        self.hooks.push(Box::new(func));
        self
    }

    pub fn build(self) -> BuiltRouter {
        let router = BuiltRouter {
            procedures: Arc::new(self.procedures),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("built router with {} methods", router.procedures.len());

        for hook in self.hooks {
            hook(&router);
        }

        router
    }

    fn insert(mut self, procedure: Procedure) -> Result<Self, RouterError> {
        let key = procedure.descriptor.key();
        match self.procedures.entry(key) {
            Entry::Occupied(entry) => Err(RouterError::Duplicate {
                key: entry.key().clone(),
                original: entry.get().descriptor.location,
                duplicate: procedure.descriptor.location,
            }),
            Entry::Vacant(entry) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    "registered {} method '{}'",
                    procedure.descriptor.kind,
                    entry.key()
                );

                entry.insert(procedure);
                Ok(self)
            }
        }
    }
}

fn names(
    service: Cow<'static, str>,
    method: Cow<'static, str>,
    location: &'static Location<'static>,
) -> Result<(Cow<'static, str>, Cow<'static, str>), RouterError> {
    for (what, name) in [("service", &service), ("method", &method)] {
        if !is_identifier(name) {
            return Err(RouterError::InvalidName {
                what,
                name: name.to_string(),
                location,
            });
        }
    }
    Ok((service, method))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A frozen registry which can execute methods and be exported.
///
/// Cloning is cheap, every clone shares the same methods.
#[derive(Clone)]
pub struct BuiltRouter {
    procedures: Arc<BTreeMap<String, Procedure>>,
}

impl fmt::Debug for BuiltRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltRouter")
            .field("methods", &self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BuiltRouter {
    /// Every registered method, ordered by key.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> + '_ {
        self.procedures.values().map(|p| &p.descriptor)
    }

    /// Methods grouped by service. Both services and methods are ordered by name.
    pub fn services(&self) -> BTreeMap<&str, Vec<&MethodDescriptor>> {
        let mut services = BTreeMap::<_, Vec<_>>::new();
        for descriptor in self.methods() {
            services
                .entry(descriptor.service())
                .or_default()
                .push(descriptor);
        }
        services
    }

    pub fn get(&self, key: &str) -> Option<&MethodDescriptor> {
        self.procedures.get(key).map(|p| &p.descriptor)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Execute a unary method.
    pub async fn call(&self, key: &str, input: Value) -> Result<Value, Error> {
        let procedure = self.procedures.get(key).ok_or_else(|| Error::not_found(key))?;
        let Handler::Unary(handler) = &procedure.handler else {
            return Err(Error::new(
                ErrorCode::FailedPrecondition,
                format!("method '{key}' is live, subscribe to it instead"),
            ));
        };

        let result = handler(input).await;

        #[cfg(feature = "tracing")]
        if let Err(err) = &result {
            tracing::debug!("method '{key}' failed: {err}");
        }

        result
    }

    /// Start a subscription to a live method.
    pub fn subscribe(
        &self,
        key: &str,
        input: Value,
    ) -> Result<BoxStream<'static, Result<Value, Error>>, Error> {
        let procedure = self.procedures.get(key).ok_or_else(|| Error::not_found(key))?;
        let Handler::Live(handler) = &procedure.handler else {
            return Err(Error::new(
                ErrorCode::FailedPrecondition,
                format!("method '{key}' is unary, call it instead"),
            ));
        };

        #[cfg(feature = "tracing")]
        tracing::trace!("subscribing to '{key}'");

        handler(input)
    }
}
