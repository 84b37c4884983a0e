pub mod claims;
pub mod codec;
pub mod errors;
pub mod key;

pub use claims::IdentityRef;
pub use claims::TokenClaims;
pub use codec::Token;
pub use codec::TokenCodec;
pub use errors::KeyError;
pub use errors::TokenError;
pub use key::Environment;
pub use key::KeyOrigin;
pub use key::SigningKey;
