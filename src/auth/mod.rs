pub mod password;
pub mod revocation;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use revocation::RevocationList;
pub use token::{Claims, TokenError, TokenKind, TokenPair, TokenService};
