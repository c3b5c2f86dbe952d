use crate::{NodeId, ScopeTree};

/// Marks every descendant of a cross-CU-referenced object as global.
/// The initial flags were planted by the builder when it saw references
/// crossing compile unit boundaries.
pub fn resolve_globals(tree: &mut ScopeTree) {
    propagate(tree, tree.root());
}

fn propagate(tree: &mut ScopeTree, id: NodeId) {
    let parent_global = tree[id]
        .parent
        .is_some_and(|parent| tree[parent].is_global);
    if parent_global {
        tree[id].is_global = true;
    }
    for child in tree[id].children().to_vec() {
        propagate(tree, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Object, ObjectData, ScopeData, ScopeKind, SymbolData, SymbolKind};

    #[test]
    fn test_globality_propagates_down() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = tree
            .add_object(
                root,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)), 0),
            )
            .unwrap();
        let class = tree
            .add_object(
                cu,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Struct)), 1),
            )
            .unwrap();
        let member = tree
            .add_object(
                class,
                Object::new(ObjectData::Symbol(SymbolData::new(SymbolKind::Member)), 2),
            )
            .unwrap();
        let sibling = tree
            .add_object(
                cu,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Struct)), 1),
            )
            .unwrap();

        // another CU referenced the struct during the build
        tree[class].is_global = true;
        resolve_globals(&mut tree);

        assert!(tree[class].is_global);
        assert!(tree[member].is_global);
        assert!(!tree[sibling].is_global);
        assert!(!tree[cu].is_global);
    }
}
