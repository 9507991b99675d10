//! Authentication adapters implementing `SessionValidator`.
//!
//! - `jwt_validator` - HS256 tokens signed by the account service
//! - `mock` - fixed token table for tests

mod jwt_validator;
mod mock;

pub use jwt_validator::{JwtConfig, JwtSessionValidator};
pub use mock::MockSessionValidator;
