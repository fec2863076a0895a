pub mod auth;
pub mod response;

pub use auth::{bearer_auth_middleware, Principal, Subject};
pub use response::{ApiResponse, ApiResult};
