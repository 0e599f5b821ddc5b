//! Transport for the web chat services: a narrow [`RequestSender`]
//! interface, the reqwest implementation behind it, and the endpoint
//! rotation used for failover.

pub mod endpoint;
pub mod error;
pub mod request;
pub mod sender;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use endpoint::{normalize_endpoint, EndpointRotator};
pub use error::TransportError;
pub use request::{Method, Request, Response, APPLICATION_JSON, OCTET_STREAM};
pub use sender::{join_path, ReqwestSender, RequestSender, SenderSettings};
