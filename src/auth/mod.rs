//! Dashboard authentication: credential store, token signing, and the
//! bearer extractor guarding `/api` routes.

pub mod credentials;
pub mod extractor;
pub mod token;

pub use credentials::CredentialStore;
pub use extractor::AuthUser;
pub use token::{Claims, IssuedToken, TokenManager};
