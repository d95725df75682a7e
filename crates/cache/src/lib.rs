//! Cache layer for order, seller order and sales report reads.
//!
//! - [`Cache`] is the byte-level collaborator (`get`/`set`/`delete` with TTL)
//! - [`CacheKey`] builds keys from a [`CachePurpose`] and an identity
//! - [`CacheAside`] implements best-effort read-through and invalidation
//! - [`InMemoryCache`] and [`RedisCache`] are the two backends

pub mod aside;
pub mod cache;
pub mod error;
pub mod key;
pub mod memory;
pub mod redis_cache;

pub use aside::CacheAside;
pub use cache::Cache;
pub use error::{CacheError, Result};
pub use key::{CacheKey, CachePurpose};
pub use memory::InMemoryCache;
pub use redis_cache::RedisCache;
