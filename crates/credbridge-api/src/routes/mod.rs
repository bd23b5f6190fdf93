//! # API Route Modules
//!
//! - `issue`: issuance webhook, credential status toggle, registry health.
//! - `verify`: verification relay to the door and the topic buffer.

pub mod issue;
pub mod verify;
