mod client;
mod codec;
mod debug;
mod endpoint;
pub mod error;
mod hooks;
mod method;
mod middleware;
mod request;
mod secret;
mod template;
mod timeout;
pub mod transport;
mod types;

pub mod prelude {
    pub use crate::client::{Client, ClientConfig};
    pub use crate::codec::Format;
    #[cfg(feature = "json")]
    pub use crate::codec::json::Json;
    pub use crate::codec::text::Text;
    pub use crate::debug::{DebugLevel, DebugSink, NoopDebugSink, StderrDebugSink, TracingDebugSink};
    pub use crate::endpoint::{
        BoundEndpoint, EndpointDescriptor, EndpointRegistry, Endpoints, ResponseParser,
    };
    pub use crate::error::{ApiClientError, FxError};
    pub use crate::hooks::{HookBus, Phase, RequestHook, ResponseHook, Subscription};
    pub use crate::method::{BodyRule, Method};
    pub use crate::middleware::{Middleware, Next};
    pub use crate::request::{CallArgs, DEFAULT_CONTENT_TYPE, PendingCall};
    pub use crate::secret::SecretString;
    pub use crate::template::{PathTemplate, TemplateWarning, TemplateWarningReason, resolve_url};
    pub use crate::timeout::TimeoutOverride;
    #[cfg(feature = "reqwest")]
    pub use crate::transport::ReqwestTransport;
    pub use crate::transport::{
        BoxFuture, Request, RequestMeta, Response, Transport, TransportError, set_default_transport,
    };
    pub use crate::types::{ParamValue, Params};
}
