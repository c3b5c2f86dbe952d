#![allow(non_upper_case_globals)]

use cu::pre::*;
use scopetree::{ScopeTree, SortKey};

/// Wrappers over the gimli/elf DWARF surface
pub mod dwarf;

mod builder;
pub use builder::*;

/// Load one ELF input and produce its fully resolved, sorted scope tree.
pub fn load_file(path: &str, sort_key: SortKey) -> cu::Result<ScopeTree> {
    let debug = dwarf::DebugData::open(path)?;
    let mut tree = build(&debug, path)?;
    scopetree::resolve::run_passes(&mut tree, sort_key);
    Ok(tree)
}
