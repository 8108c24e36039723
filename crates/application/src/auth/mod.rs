//! Authorization flows and session credential handling.

mod flow;
mod state_token;
mod token_store;

pub use flow::{AuthorizationFlowController, FlowState, RedirectConfig, RedirectInstruction};
pub use state_token::{StateTokenCodec, StateTokenError, STATE_TOKEN_TTL_SECS};
pub use token_store::TokenStore;
