use crate::{ScopeTree, SortKey, sort};

mod globals;
pub use globals::*;
mod names;
pub use names::*;
mod refs;
pub use refs::*;

/// Run all post-creation passes in order: name resolution, reference
/// attribute propagation, globality propagation, then sibling sorting.
pub fn run_passes(tree: &mut ScopeTree, sort_key: SortKey) {
    NameResolver::run(tree);
    ReferenceResolver::run(tree);
    resolve_globals(tree);
    sort::sort_scopes(tree, sort_key);
}
