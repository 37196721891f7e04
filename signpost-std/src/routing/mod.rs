//! # Routing
//!
//! Maps request paths to routes by longest source prefix.
//!
//! - [`RouteTable`]: the validated, immutable route set.
//! - [`RouteDefinition`]: a route as written in configuration.
//! - [`PrefixTrie`]: the character trie behind the lookup.

mod table;
mod trie;

pub use table::{
    Route, RouteDefinition, RouteMatch, RouteTable, RouteTableBuilder, canonical_prefix,
};
pub use trie::PrefixTrie;
