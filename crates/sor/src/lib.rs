//! Smart order routing over Balancer style weighted, composable stable and
//! linear pools.
//!
//! [`sor_get_swaps_with_pools`] discovers candidate paths between two tokens
//! in a [`pools::PoolSnapshot`], splits the requested amount across the most
//! promising ones and returns the priced [`swap::Swap`] together with the
//! Vault calls executing it.

pub mod config;
pub mod math;
pub mod path;
pub mod path_graph;
pub mod pools;
pub mod router;
pub mod swap;
pub mod token;

#[cfg(test)]
mod testing;

pub use router::sor_get_swaps_with_pools;
