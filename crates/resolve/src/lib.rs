//! `paddock-resolve`: fuzzy cross-reference resolver.
//!
//! Pure engine crate: receives pre-loaded candidate pools, returns matched
//! reference keys. No CSV, database, or CLI dependencies.

pub mod error;
pub mod normalize;
pub mod pool;
pub mod resolver;
pub mod score;

pub use error::ResolveError;
pub use normalize::{normalize_label, split_label, DEFAULT_SEPARATORS};
pub use pool::{Candidate, CandidatePool, ScopedPools};
pub use resolver::{best_match, resolve, split_and_resolve, PartMatch, Resolver, Scored};
pub use score::Scorer;
