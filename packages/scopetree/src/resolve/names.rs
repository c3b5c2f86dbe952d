use fxhash::FxHashSet;

use crate::{NodeId, ScopeKind, ScopeTree, SymbolKind, TypeKind};

/// Synthesizes the display names the builder could not produce on its
/// own: composed modifier-type names, array names, subroutine-type
/// signatures, and qualified-name prefixes.
///
/// Objects are resolved target-first and memoized, which both avoids
/// recomputation and terminates on reference cycles.
pub struct NameResolver {
    resolved: FxHashSet<NodeId>,
}

impl NameResolver {
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

        if let Some(parent) = tree[id].parent {
            if !tree[id].is_line() {
                if let Some(prefix) = tree.qualified_name_prefix(parent) {
                    tree[id].qualified_name = Some(prefix);
                }
            }
        }

        if let Some(kind) = tree[id].type_kind() {
            self.resolve_type_name(tree, id, kind);
        } else {
            match tree[id].scope_kind() {
                Some(ScopeKind::SubroutineType) => {
                    self.resolve_function_pointer_name(tree, id)
                }
                Some(ScopeKind::Array) => self.resolve_array_name(tree, id),
                _ => {}
            }
        }
    }

    /// Name of `id`'s referenced type in a type position, with the
    /// referenced object resolved first
    fn pointee_name(&mut self, tree: &mut ScopeTree, id: NodeId) -> Option<String> {
        let target = tree[id].type_ref?;
        self.resolve(tree, target);
        Some(tree.type_name_of(target))
    }

    fn resolve_type_name(&mut self, tree: &mut ScopeTree, id: NodeId, kind: TypeKind) {
        // Composition is left-associative: the pointee name already
        // carries any inner modifiers when we get here.
        let composed = match kind {
            TypeKind::Const => {
                Some(format!("const {}", self.pointee_or_void(tree, id)))
            }
            TypeKind::Volatile => {
                Some(format!("volatile {}", self.pointee_or_void(tree, id)))
            }
            TypeKind::Restrict => {
                Some(format!("restrict {}", self.pointee_or_void(tree, id)))
            }
            TypeKind::Pointer | TypeKind::PointerMember => {
                Some(format!("{} *", self.pointee_or_void(tree, id)))
            }
            TypeKind::Reference => Some(format!("{} &", self.pointee_or_void(tree, id))),
            TypeKind::RvalueReference => {
                Some(format!("{} &&", self.pointee_or_void(tree, id)))
            }
            // An inheritance record adopts the name of the parent type
            TypeKind::Inheritance => self.pointee_name(tree, id),
            // Everything else keeps the name given by its DIE
            _ => {
                if let Some(target) = tree[id].type_ref {
                    self.resolve(tree, target);
                }
                None
            }
        };
        if let Some(name) = composed {
            tree[id].name = Some(name);
        }
    }

    fn pointee_or_void(&mut self, tree: &mut ScopeTree, id: NodeId) -> String {
        self.pointee_name(tree, id)
            .unwrap_or_else(|| "void".to_string())
    }

    /// `<return type> (*)(<parameter types>)`
    fn resolve_function_pointer_name(&mut self, tree: &mut ScopeTree, id: NodeId) {
        let ret = self.pointee_or_void(tree, id);
        let mut name = format!("{ret} (*)(");
        let mut first = true;
        for child in tree[id].children().to_vec() {
            if tree[child].symbol_kind() != Some(SymbolKind::Parameter) {
                continue;
            }
            let param = match tree[child].type_ref {
                Some(target) => {
                    self.resolve(tree, target);
                    tree.type_name_of(target)
                }
                None => "?".to_string(),
            };
            if !first {
                name.push(',');
            }
            name.push_str(&param);
            first = false;
        }
        name.push(')');
        tree[id].name = Some(name);
    }

    /// `<element type name> <subranges>`, e.g. `int [5][10]`
    fn resolve_array_name(&mut self, tree: &mut ScopeTree, id: NodeId) {
        let mut name = self
            .pointee_name(tree, id)
            .unwrap_or_else(|| "?".to_string());
        name.push(' ');
        for child in tree[id].children().to_vec() {
            if tree[child].type_kind() == Some(TypeKind::Subrange) {
                name.push_str(tree[child].name_str());
            }
        }
        tree[id].name = Some(name);
    }
}
