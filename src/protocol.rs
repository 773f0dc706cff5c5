//! implementations of MPC protocols

pub mod beaver;
pub mod custody;
pub mod error;
pub mod legendre;
pub mod party;
pub mod preprocessing;
pub mod runtime;
pub mod shamir;

/// identifies one custody challenge and the key shares dealt for it
pub type SessionId = u64;
