/// Request parameters
pub mod params;
/// Request shapes
pub mod request;
/// Response types
pub mod response;

pub use params::{FilePart, ParamValue, Params};
pub use request::{Method, Payload, PreparedRequest};
pub use response::{ApiResponse, RateLimitInfo, RawResponse};
