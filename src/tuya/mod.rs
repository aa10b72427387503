//! Tuya OpenAPI integration module
//!
//! - `signer`: HMAC-SHA256 request signatures (token-fetch and authenticated modes)
//! - `token`: Access token cache with single-flight refresh
//! - `dispatcher`: Device command delivery with one retry on token rejection
//! - `region`: Data center table
//! - `types`: Credentials, commands and wire envelopes

pub mod dispatcher;
pub mod region;
pub mod signer;
pub mod token;
pub mod types;

pub use dispatcher::CommandDispatcher;
pub use region::Region;
pub use token::{Token, TokenManager};
pub use types::{
    system_clock, Clock, CloudResponse, Command, CommandValue, Credentials, DeviceTarget,
};
