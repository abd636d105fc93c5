//! Pure transformation stages of the merge pipeline: sanitization and
//! canonical-form normalization, identity-key deduplication, and
//! total-order ranking. Nothing in this module performs I/O.

pub mod dedup;
pub mod normalize;
pub mod rank;

pub use dedup::deduplicate;
pub use normalize::{identity_key, sanitize_paper, sanitize_query_text};
pub use rank::rank;
