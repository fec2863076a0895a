// handlers/public/mod.rs - Public handlers
//
// Token acquisition and account creation. No authentication is required here, so
// every input is validated at the handler boundary.

pub mod users; // register, login, logout, refresh-token

pub use users::{login, logout, refresh_token, register};
