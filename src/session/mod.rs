//! Client-carried request state.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → cookie.rs (CookieJar, parsed once per request)
//!     → codec.rs (signed, expiring session bag)
//!     → flash.rs (one-shot flash/validation bag, consumed on read)
//!
//! Response side:
//!     Session / Flash
//!     → signer.rs (seal with HMAC-SHA256)
//!     → SetCookie headers, attached after body compression
//! ```
//!
//! # Design Decisions
//! - All state lives in cookies; nothing to lock server-side
//! - Tampering or expiry degrades to "empty", never to a request failure

pub mod codec;
pub mod cookie;
pub mod flash;
pub mod signer;

pub use codec::{Session, SessionCodec, USER_ID_KEY};
pub use cookie::{CookieJar, SetCookie};
pub use flash::{FieldError, Flash, FlashBag, FlashCodec};
pub use signer::{CookieSigner, SealError};
