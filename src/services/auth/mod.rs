pub mod cookie;
pub mod factory;
pub mod identity;
pub mod jwt;
pub mod session;
pub mod token_issuer;

pub use factory::{build_auth_service, build_identity_lookup};
pub use identity::{Identity, IdentityLookup, InMemoryIdentityStore};
pub use session::{AuthService, CookiePolicy};
pub use token_issuer::SessionIssuer;
