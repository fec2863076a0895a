// handlers/protected/mod.rs - Protected handlers (bearer access token required)
//
// Routes in this tier sit behind `bearer_auth_middleware`. Each handler takes a
// `Principal`, which rejects anonymous requests with 401.

pub mod plans; // /api/plans CRUD scoped to the caller
pub mod users; // /api/users/protected diagnostic
