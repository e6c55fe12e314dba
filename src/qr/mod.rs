//! QR payload handling
//!
//! The code a borrower shows on screen carries a [`BorrowIntent`] serialized
//! by [`payload::encode`]; the admin scanner turns the decoded text back into
//! an intent with [`payload::decode`].
//!
//! [`BorrowIntent`]: crate::models::BorrowIntent

pub mod payload;

pub use payload::{decode, encode, encode_intent, PayloadError};
