use std::ops::{Index, IndexMut};

use cu::pre::*;

use crate::{Object, ObjectData, ScopeData, ScopeKind};

/// Index of an object in the tree arena
#[rustfmt::skip]
#[derive(DebugCustom, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Display)]
#[display("object#{}", self.0)]
#[debug("object#{}", self.0)]
pub struct NodeId(usize);

/// The logical scope tree for one input file
///
/// All objects live in one arena; parent/child/type/reference links are
/// arena indices, so every referent outlives every referrer for as long
/// as the tree itself is alive.
pub struct ScopeTree {
    nodes: Vec<Object>,
    root: NodeId,
}

impl ScopeTree {
    /// Create a tree holding only the synthetic root, named after the
    /// input file path
    pub fn new(input_path: &str) -> Self {
        let mut root = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Root)), -1);
        root.name = Some(input_path.to_string());
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append an object under `parent`. The parent must be a scope.
    pub fn add_object(&mut self, parent: NodeId, mut object: Object) -> cu::Result<NodeId> {
        let id = NodeId(self.nodes.len());
        object.parent = Some(parent);
        let parent_obj = &mut self[parent];
        let scope = cu::check!(
            parent_obj.as_scope_mut(),
            "cannot add a child to non-scope object at {}",
            parent
        )?;
        scope.children.push(id);
        self.nodes.push(object);
        Ok(id)
    }

    /// Iterate all object ids in creation order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// The compile unit children of the root
    pub fn compile_units(&self) -> Vec<NodeId> {
        self[self.root]
            .children()
            .iter()
            .copied()
            .filter(|id| self[*id].scope_kind() == Some(ScopeKind::CompileUnit))
            .collect()
    }

    /// Walk ancestors from `start` (inclusive) and build the qualified
    /// name prefix, e.g. `"Outer::Inner::"`.
    ///
    /// Only namespaces, classes, structs, unions and enumerations
    /// contribute segments; the walk stops at the first ancestor of any
    /// other kind. Compile units, the root, and enclosing functions
    /// terminate qualification.
    pub fn qualified_name_prefix(&self, start: NodeId) -> Option<String> {
        let mut segments: Vec<&str> = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let obj = &self[id];
            let Some(kind) = obj.scope_kind() else { break };
            if matches!(kind, ScopeKind::Root | ScopeKind::CompileUnit) {
                break;
            }
            if !kind.qualifies_names() {
                break;
            }
            segments.push(obj.name_str());
            cursor = obj.parent;
        }
        if segments.is_empty() {
            return None;
        }
        let mut prefix = String::new();
        for seg in segments.iter().rev() {
            prefix.push_str(seg);
            prefix.push_str("::");
        }
        Some(prefix)
    }

    /// Name of an object as used in type positions: qualified prefix plus
    /// name, or `"?"` for unnamed objects
    pub fn type_name_of(&self, id: NodeId) -> String {
        let obj = &self[id];
        if obj.name.is_none() {
            return "?".to_string();
        }
        obj.qualified_name_str()
    }
}

impl Index<NodeId> for ScopeTree {
    type Output = Object;
    fn index(&self, id: NodeId) -> &Object {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for ScopeTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Object {
        &mut self.nodes[id.0]
    }
}
