use std::{borrow::Cow, fmt, future::Future, panic::Location, sync::Arc};

use futures::{future::BoxFuture, stream::BoxStream, FutureExt, Stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{schema::TypeRef, Error, Reflect};

/// How a method returns its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
#[serde(rename_all = "camelCase")]
#[reflect(module = "typed_rpc")]
pub enum MethodKind {
    /// One request, one response.
    Unary,
    /// One request, a stream of values until the subscriber leaves.
    Live,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary => write!(f, "unary"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// The HTTP verb a transport should use to reach a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
#[serde(rename_all = "UPPERCASE")]
#[reflect(module = "typed_rpc")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about a registered method without executing it.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub(crate) service: Cow<'static, str>,
    pub(crate) method: Cow<'static, str>,
    pub(crate) kind: MethodKind,
    pub(crate) verb: HttpVerb,
    pub(crate) request: TypeRef,
    pub(crate) response: TypeRef,
    pub(crate) location: &'static Location<'static>,
}

impl MethodDescriptor {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The `Service.Method` key used by clients.
    pub fn key(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn request(&self) -> &TypeRef {
        &self.request
    }

    pub fn response(&self) -> &TypeRef {
        &self.response
    }

    /// Where in the source code the method was registered.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

pub(crate) type UnaryFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

pub(crate) type LiveFn = Arc<
    dyn Fn(Value) -> Result<BoxStream<'static, Result<Value, Error>>, Error> + Send + Sync,
>;

#[derive(Clone)]
pub(crate) enum Handler {
    Unary(UnaryFn),
    Live(LiveFn),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary(_) => f.write_str("Handler::Unary(...)"),
            Self::Live(_) => f.write_str("Handler::Live(...)"),
        }
    }
}

/// A method with its type information and its type erased handler.
#[derive(Debug, Clone)]
pub(crate) struct Procedure {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) handler: Handler,
}

impl Procedure {
    pub(crate) fn unary<TReq, TRes, F, Fut>(
        service: Cow<'static, str>,
        method: Cow<'static, str>,
        verb: HttpVerb,
        location: &'static Location<'static>,
        handler: F,
    ) -> Self
    where
        TReq: DeserializeOwned + Reflect + Send + 'static,
        TRes: Serialize + Reflect + Send + 'static,
        F: Fn(TReq) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TRes, Error>> + Send + 'static,
    {
        let key: Arc<str> = format!("{service}.{method}").into();
        let handler: UnaryFn = Arc::new(move |input| {
            let input = match serde_json::from_value::<TReq>(input) {
                Ok(input) => input,
                Err(err) => {
                    return futures::future::ready(Err(Error::invalid_input(&key, err))).boxed()
                }
            };

            handler(input)
                .map(|result| result.and_then(encode::<TRes>))
                .boxed()
        });

        Self {
            descriptor: MethodDescriptor {
                service,
                method,
                kind: MethodKind::Unary,
                verb,
                request: TReq::reflect(),
                response: TRes::reflect(),
                location,
            },
            handler: Handler::Unary(handler),
        }
    }

    pub(crate) fn live<TReq, TRes, F, S>(
        service: Cow<'static, str>,
        method: Cow<'static, str>,
        location: &'static Location<'static>,
        handler: F,
    ) -> Self
    where
        TReq: DeserializeOwned + Reflect + Send + 'static,
        TRes: Serialize + Reflect + Send + 'static,
        F: Fn(TReq) -> Result<S, Error> + Send + Sync + 'static,
        S: Stream<Item = TRes> + Send + 'static,
    {
        let key: Arc<str> = format!("{service}.{method}").into();
        let handler: LiveFn = Arc::new(move |input| {
            let input = serde_json::from_value::<TReq>(input)
                .map_err(|err| Error::invalid_input(&key, err))?;

            Ok(handler(input)?.map(encode::<TRes>).boxed())
        });

        Self {
            descriptor: MethodDescriptor {
                service,
                method,
                kind: MethodKind::Live,
                verb: HttpVerb::Get,
                request: TReq::reflect(),
                response: TRes::reflect(),
                location,
            },
            handler: Handler::Live(handler),
        }
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value, Error> {
    serde_json::to_value(value)
        .map_err(|err| Error::internal(format!("error serializing the result: {err}")))
}
