use std::cmp::Ordering;

use crate::{NodeId, ScopeTree, SortKey};

/// Order the children of every scope by the configured key.
///
/// Every tie-break chain ends at the DWARF offset, which is unique per
/// input, so the resulting order is total and sorting is idempotent.
pub fn sort_scopes(tree: &mut ScopeTree, key: SortKey) {
    sort_children(tree, tree.root(), key);
}

fn sort_children(tree: &mut ScopeTree, id: NodeId, key: SortKey) {
    let mut children = tree[id].children().to_vec();
    children.sort_by(|a, b| compare(tree, *a, *b, key));
    if let Some(scope) = tree[id].as_scope_mut() {
        scope.children = children.clone();
    }
    for child in children {
        sort_children(tree, child, key);
    }
}

fn compare(tree: &ScopeTree, a: NodeId, b: NodeId, key: SortKey) -> Ordering {
    match key {
        SortKey::Line => compare_line(tree, a, b)
            .then_with(|| compare_name(tree, a, b))
            .then_with(|| compare_kind(tree, a, b))
            .then_with(|| compare_offset(tree, a, b)),
        SortKey::Name => compare_name(tree, a, b)
            .then_with(|| compare_line(tree, a, b))
            .then_with(|| compare_kind(tree, a, b))
            .then_with(|| compare_offset(tree, a, b)),
        SortKey::Offset => compare_offset(tree, a, b),
    }
}

fn compare_line(tree: &ScopeTree, a: NodeId, b: NodeId) -> Ordering {
    tree[a].line.unwrap_or(0).cmp(&tree[b].line.unwrap_or(0))
}

fn compare_name(tree: &ScopeTree, a: NodeId, b: NodeId) -> Ordering {
    tree[a].name_str().cmp(tree[b].name_str())
}

fn compare_kind(tree: &ScopeTree, a: NodeId, b: NodeId) -> Ordering {
    tree[a].kind_label().cmp(tree[b].kind_label())
}

fn compare_offset(tree: &ScopeTree, a: NodeId, b: NodeId) -> Ordering {
    tree[a].offset.cmp(&tree[b].offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Goff, Object, ObjectData, ScopeData, ScopeKind, SymbolData, SymbolKind};

    fn add(
        tree: &mut ScopeTree,
        parent: NodeId,
        name: &str,
        line: Option<u64>,
        offset: u64,
    ) -> NodeId {
        let mut obj = Object::new(
            ObjectData::Symbol(SymbolData::new(SymbolKind::Variable)),
            tree[parent].level + 1,
        );
        if !name.is_empty() {
            obj.name = Some(name.to_string());
        }
        obj.line = line;
        obj.offset = Goff(offset);
        tree.add_object(parent, obj).unwrap()
    }

    fn build() -> (ScopeTree, NodeId, [NodeId; 4]) {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = tree
            .add_object(
                root,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)), 0),
            )
            .unwrap();
        let a = add(&mut tree, cu, "beta", Some(10), 0x40);
        let b = add(&mut tree, cu, "alpha", Some(10), 0x30);
        let c = add(&mut tree, cu, "alpha", Some(5), 0x20);
        let d = add(&mut tree, cu, "alpha", Some(5), 0x10);
        (tree, cu, [a, b, c, d])
    }

    #[test]
    fn test_sort_by_line() {
        let (mut tree, cu, [a, b, c, d]) = build();
        sort_scopes(&mut tree, SortKey::Line);
        assert_eq!(tree[cu].children().to_vec(), vec![d, c, b, a]);
    }

    #[test]
    fn test_sort_by_name() {
        let (mut tree, cu, [a, b, c, d]) = build();
        sort_scopes(&mut tree, SortKey::Name);
        // alpha@5 (by offset 0x10, 0x20), alpha@10, beta
        assert_eq!(tree[cu].children().to_vec(), vec![d, c, b, a]);
    }

    #[test]
    fn test_sort_by_offset() {
        let (mut tree, cu, [a, b, c, d]) = build();
        sort_scopes(&mut tree, SortKey::Offset);
        assert_eq!(tree[cu].children().to_vec(), vec![d, c, b, a]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let (mut tree, cu, _) = build();
        sort_scopes(&mut tree, SortKey::Line);
        let first = tree[cu].children().to_vec();
        sort_scopes(&mut tree, SortKey::Line);
        assert_eq!(tree[cu].children().to_vec(), first);
    }

    #[test]
    fn test_kind_breaks_name_and_line_ties() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = tree
            .add_object(
                root,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)), 0),
            )
            .unwrap();
        let var = add(&mut tree, cu, "same", Some(4), 0x50);
        let mut func = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Subprogram)), 1);
        func.name = Some("same".to_string());
        func.line = Some(4);
        func.offset = Goff(0x10);
        let func = tree.add_object(cu, func).unwrap();

        sort_scopes(&mut tree, SortKey::Line);
        // "Function" < "Variable" even though the variable has the lower offset
        assert_eq!(tree[cu].children().to_vec(), vec![func, var]);
    }
}
