//! Release channel, publication and signing policy
//!
//! - **channel**: classifies the project version and picks the repository target
//! - **publication**: per-module artifact set bound to a target, or publish-disabled
//! - **signing**: signs a publication's artifacts when the policy asks for it

pub mod channel;
pub mod publication;
pub mod signing;

pub use channel::{Channel, ChannelResolution, ChannelResolver, should_sign};
pub use publication::{Publication, Publisher};
pub use signing::{CommandSigner, Signer, sign_publication};
