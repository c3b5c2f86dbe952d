use fxhash::FxHashSet;

use crate::{NodeId, ScopeTree};

/// Propagates attributes along declaration/definition links.
///
/// An object whose `reference` points at another object (from
/// DW_AT_specification, DW_AT_abstract_origin or DW_AT_extension)
/// inherits the referent's name, source location and type for any of
/// those it did not set itself. Referents resolve first; memoization
/// makes the pass idempotent and terminates reference cycles.
pub struct ReferenceResolver {
    resolved: FxHashSet<NodeId>,
}

impl ReferenceResolver {
    pub fn run(tree: &mut ScopeTree) {
        let mut resolver = Self {
            resolved: FxHashSet::default(),
        };
        resolver.visit(tree, tree.root());
    }

    fn visit(&mut self, tree: &mut ScopeTree, id: NodeId) {
        self.resolve(tree, id);
        for child in tree[id].children().to_vec() {
            self.visit(tree, child);
        }
    }

    fn resolve(&mut self, tree: &mut ScopeTree, id: NodeId) {
        if !self.resolved.insert(id) {
            return;
        }
        let Some(referent) = tree[id].reference else {
            return;
        };
        self.resolve(tree, referent);

        let name = tree[referent].name.clone();
        let line = tree[referent].line;
        let file_name = tree[referent].file_name.clone();
        let file_index = tree[referent].file_index;
        let invalid_file_name = tree[referent].invalid_file_name;
        let type_ref = tree[referent].type_ref;

        let obj = &mut tree[id];
        if obj.name.is_none() {
            obj.name = name;
        }
        if obj.line.is_none() {
            obj.line = line;
        }
        if obj.file_name.is_none() && !obj.invalid_file_name {
            obj.file_name = file_name;
            if obj.file_index.is_none() {
                obj.file_index = file_index;
            }
            if invalid_file_name {
                obj.invalid_file_name = true;
            }
        }
        if obj.type_ref.is_none() {
            obj.type_ref = type_ref;
        }

        // The builder cannot see through specification chains when it
        // decides staticness, so the declaration's verdict lands here.
        let referrer_is_function = tree[id]
            .scope_kind()
            .is_some_and(|k| k.is_function());
        let referent_is_function = tree[referent]
            .scope_kind()
            .is_some_and(|k| k.is_function());
        if referrer_is_function && referent_is_function {
            let referent_static = tree[referent]
                .as_scope()
                .is_some_and(|s| s.is_static);
            if referent_static {
                if let Some(scope) = tree[id].as_scope_mut() {
                    scope.is_static = true;
                }
            }
        }

        // Symbols take their qualified name from where the referent
        // lives, not from where the referring DIE appeared.
        if tree[id].is_symbol() && tree[referent].is_symbol() {
            if let Some(referent_parent) = tree[referent].parent {
                tree[id].qualified_name = tree.qualified_name_prefix(referent_parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Object, ObjectData, ScopeData, ScopeKind, SymbolData, SymbolKind, TypeData, TypeKind,
    };

    fn scope(tree: &mut ScopeTree, parent: NodeId, kind: ScopeKind, name: &str) -> NodeId {
        let level = tree[parent].level + 1;
        let mut obj = Object::new(ObjectData::Scope(ScopeData::new(kind)), level);
        if !name.is_empty() {
            obj.name = Some(name.to_string());
        }
        tree.add_object(parent, obj).unwrap()
    }

    #[test]
    fn test_copies_unset_attributes() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");

        let decl = scope(&mut tree, cu, ScopeKind::Subprogram, "foo");
        tree[decl].line = Some(10);
        tree[decl].file_name = Some("a.h".to_string());
        let base = tree
            .add_object(
                cu,
                Object::new(ObjectData::Type(TypeData::new(TypeKind::Base)), 1),
            )
            .unwrap();
        tree[decl].type_ref = Some(base);

        let def = scope(&mut tree, cu, ScopeKind::Subprogram, "");
        tree[def].reference = Some(decl);

        ReferenceResolver::run(&mut tree);
        assert_eq!(tree[def].name.as_deref(), Some("foo"));
        assert_eq!(tree[def].line, Some(10));
        assert_eq!(tree[def].file_name.as_deref(), Some("a.h"));
        assert_eq!(tree[def].type_ref, Some(base));
    }

    #[test]
    fn test_does_not_clobber_set_attributes() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");
        let decl = scope(&mut tree, cu, ScopeKind::Subprogram, "declared");
        tree[decl].line = Some(10);
        let def = scope(&mut tree, cu, ScopeKind::Subprogram, "defined");
        tree[def].line = Some(99);
        tree[def].reference = Some(decl);

        ReferenceResolver::run(&mut tree);
        assert_eq!(tree[def].name.as_deref(), Some("defined"));
        assert_eq!(tree[def].line, Some(99));
    }

    #[test]
    fn test_static_via_declaration() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");

        // declaration carried no DW_AT_external, so the builder marked it
        let decl = scope(&mut tree, cu, ScopeKind::Subprogram, "helper");
        tree[decl].as_scope_mut().unwrap().is_static = true;
        tree[decl].as_scope_mut().unwrap().is_declaration = true;

        // the definition had DW_AT_specification, so it starts non-static
        let def = scope(&mut tree, cu, ScopeKind::Subprogram, "");
        tree[def].reference = Some(decl);
        assert!(!tree[def].as_scope().unwrap().is_static);

        ReferenceResolver::run(&mut tree);
        assert!(tree[def].as_scope().unwrap().is_static);
    }

    #[test]
    fn test_symbol_qualified_name_from_referent_parent() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");
        let class = scope(&mut tree, cu, ScopeKind::Class, "A");
        let member = tree
            .add_object(
                class,
                Object::new(ObjectData::Symbol(SymbolData::new(SymbolKind::Member)), 2),
            )
            .unwrap();
        tree[member].name = Some("counter".to_string());

        // definition of the static member at namespace scope
        let def = tree
            .add_object(
                cu,
                Object::new(ObjectData::Symbol(SymbolData::new(SymbolKind::Variable)), 1),
            )
            .unwrap();
        tree[def].reference = Some(member);

        ReferenceResolver::run(&mut tree);
        assert_eq!(tree[def].qualified_name.as_deref(), Some("A::"));
        assert_eq!(tree[def].name.as_deref(), Some("counter"));
    }

    #[test]
    fn test_idempotent() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");
        let decl = scope(&mut tree, cu, ScopeKind::Subprogram, "foo");
        tree[decl].line = Some(3);
        let def = scope(&mut tree, cu, ScopeKind::Subprogram, "");
        tree[def].reference = Some(decl);

        ReferenceResolver::run(&mut tree);
        let name = tree[def].name.clone();
        let line = tree[def].line;
        ReferenceResolver::run(&mut tree);
        assert_eq!(tree[def].name, name);
        assert_eq!(tree[def].line, line);
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let mut tree = ScopeTree::new("file.o");
        let root = tree.root();
        let cu = scope(&mut tree, root, ScopeKind::CompileUnit, "a.cpp");
        let a = scope(&mut tree, cu, ScopeKind::Subprogram, "a");
        let b = scope(&mut tree, cu, ScopeKind::Subprogram, "b");
        tree[a].reference = Some(b);
        tree[b].reference = Some(a);
        ReferenceResolver::run(&mut tree);
    }
}
