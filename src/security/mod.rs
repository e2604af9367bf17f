//! Stateless authentication and authorization.
//!
//! - `token`: issue, decode and verify subject-keyed HS512 tokens
//! - `credentials`: bearer header -> identity or rejection reason
//! - `pipeline`: token and username/password authentication
//! - `matrix`: static route rules and role checks
//! - `chain`: first-match dispatch between the two chains, as a tower layer
//! - `cors`: cross-origin policy, enabled for the API chain only

pub mod chain;
pub mod cors;
pub mod credentials;
pub mod matrix;
pub mod pipeline;
pub mod principal;
pub mod secret;
pub mod subjects;
pub mod token;

pub use chain::{ChainDispatcher, Gate, SecurityChain, SecurityLayer};
pub use credentials::{AuthOutcome, AuthRejection, CredentialVerifier};
pub use matrix::{AuthorizationMatrix, Denial, RouteRule};
pub use pipeline::{AuthenticationPipeline, PasswordPipeline, TokenPipeline};
pub use principal::{Principal, ROLE_ADMIN, ROLE_USER};
pub use secret::SigningSecret;
pub use subjects::{PasswordVerifier, RoleResolver, SecretStore};
pub use token::{TokenClaims, TokenCodec};
