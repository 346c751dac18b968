//! Pagesmith Core Library
//!
//! Length values, record identifiers and identifier allocation shared by
//! the Pagesmith application and its storage backends.

pub mod allocator;
pub mod identifier;
pub mod length;
pub mod store;

pub use allocator::{AllocError, IdAllocator, IdStrategy, RetryPolicy};
pub use identifier::{Identifier, IdentifierError, TOKEN_BYTES};
pub use length::{Length, LengthError, Unit};
pub use store::{MemoryStore, Store, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
