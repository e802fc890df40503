//! Scattershot - a concurrent random-sampling search engine.
//!
//! Scattershot finds one item in a sparse keyspace (say, one beatmap set
//! matching a filter among millions of mostly empty ids) by firing rounds of
//! concurrent speculative lookups at random keys. The first lookup to succeed
//! wins; the rest of its round is abandoned. Rounds repeat until a match is
//! found or the caller cancels.

pub mod beatmap;
#[cfg(feature = "catalog")]
pub mod catalog;
pub mod channel;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod filter;
pub mod handle;
pub mod observer;
pub mod probe;
pub mod request;
pub mod state;
pub mod types;

pub mod prelude {
  //! Convenient re-exports for common types and traits.

  pub use crate::beatmap::*;
  #[cfg(feature = "catalog")]
  pub use crate::catalog::*;
  pub use crate::config::*;
  pub use crate::credentials::*;
  pub use crate::dispatcher::*;
  pub use crate::engine::*;
  pub use crate::error::{ProbeError, SearchError};
  pub use crate::filter::*;
  pub use crate::handle::*;
  pub use crate::observer::*;
  pub use crate::probe::*;
  pub use crate::request::*;
  pub use crate::state::*;
  pub use crate::types::*;
}
