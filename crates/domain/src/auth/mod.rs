//! Authentication domain types

mod credential;
mod device;
mod error;
mod state_token;

pub use credential::{ClaimValue, Credential, RENEWAL_BUFFER_SECS};
pub use device::{DeviceCodeChallenge, DevicePollStatus};
pub use error::AuthError;
pub use state_token::StateToken;
