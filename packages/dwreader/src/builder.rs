use std::sync::Arc;

use cu::pre::*;
use fxhash::{FxHashMap, FxHashSet};
use gimli::constants::*;
use scopetree::{
    AccessSpecifier, Goff, NodeId, Object, ObjectData, ScopeData, ScopeKind, ScopeTree,
    SymbolData, SymbolKind, TypeData, TypeKind,
};

use crate::dwarf::{AttrValue, DebugData, Die, DieNode, LineEntry, Tag};

/// Build the scope tree for one input.
///
/// This is the first of the two phases: every DIE becomes a typed
/// object keyed by its global offset, and links whose target DIE has
/// not been visited yet are parked in pending tables that drain as the
/// targets arrive. The resolver passes complete the tree afterwards.
pub fn build(debug: &Arc<DebugData>, input_path: &str) -> cu::Result<ScopeTree> {
    let mut builder = TreeBuilder::new(input_path);
    let mut units = DebugData::units(debug);
    while let Some(unit) = cu::check!(units.next_unit(), "failed to iterate compile units")? {
        cu::debug!("reading {unit}");
        builder.cu_start = unit.offset;
        builder.cu_end = unit.next_offset;
        builder.file_table = cu::check!(
            unit.source_files(),
            "failed to read the source file table of {unit}"
        )?;
        let mut tree = unit.tree()?;
        let root_node = tree.root()?;
        let parent = builder.tree.root();
        builder.visit(root_node, parent, 0)?;
    }
    builder.finish()
}

struct TreeBuilder {
    tree: ScopeTree,
    /// Objects created so far, keyed by DIE offset
    created: FxHashMap<Goff, NodeId>,
    /// Offsets of DIEs not yet visited, mapped to the objects waiting to
    /// take the resulting node as their type
    types_to_be_set: FxHashMap<Goff, Vec<NodeId>>,
    /// Same, for declaration/definition references
    references_to_be_set: FxHashMap<Goff, Vec<NodeId>>,
    /// Tags already warned about
    unknown_tags: FxHashSet<Tag>,
    /// Attributes whose form was not understood, already warned about
    unknown_forms: FxHashSet<DwAt>,
    cu_start: Goff,
    cu_end: Goff,
    /// File table of the unit currently being read
    file_table: Vec<String>,
}

impl TreeBuilder {
    fn new(input_path: &str) -> Self {
        Self {
            tree: ScopeTree::new(input_path),
            created: FxHashMap::default(),
            types_to_be_set: FxHashMap::default(),
            references_to_be_set: FxHashMap::default(),
            unknown_tags: FxHashSet::default(),
            unknown_forms: FxHashSet::default(),
            cu_start: Goff(0),
            cu_end: Goff(0),
            file_table: Vec::new(),
        }
    }

    fn visit(&mut self, node: DieNode<'_, '_>, parent: NodeId, level: i32) -> cu::Result<()> {
        // only scopes hold children
        if !self.tree[parent].is_scope() {
            return Ok(());
        }
        let entry = node.entry();
        let offset = entry.goff();
        let tag = entry.tag();

        let Some(data) = object_for_tag(tag) else {
            self.warn_unknown_tag(tag);
            return Ok(());
        };

        let id = self.create_node(parent, data, level, offset)?;
        self.init_common(id, &entry, tag)?;
        self.init_family(id, &entry)?;
        self.init_references(id, &entry)?;
        self.update_pending(id, offset);

        node.for_each_child(|child| self.visit(child, id, level + 1))
    }

    /// Instantiate the object and record it by offset
    fn create_node(
        &mut self,
        parent: NodeId,
        data: ObjectData,
        level: i32,
        offset: Goff,
    ) -> cu::Result<NodeId> {
        let mut object = Object::new(data, level);
        object.offset = offset;
        let id = self.tree.add_object(parent, object)?;
        cu::ensure!(
            self.created.insert(offset, id).is_none(),
            "DWARF offset seen twice: {offset}"
        )?;
        Ok(id)
    }

    /// Read an attribute as a typed value, warning once per attribute
    /// when the form is not one this reader understands
    fn attr_value(&mut self, entry: &Die<'_, '_>, at: DwAt) -> cu::Result<AttrValue> {
        let value = entry.value(at)?;
        if value == AttrValue::UnknownForm && self.unknown_forms.insert(at) {
            cu::warn!("ignoring {at} with an unrecognised form at {}", entry.goff());
        }
        Ok(value)
    }

    fn init_common(&mut self, id: NodeId, entry: &Die<'_, '_>, tag: Tag) -> cu::Result<()> {
        let name = entry.name_opt()?.map(str::to_string);
        let line = match self.attr_value(entry, DW_AT_decl_line)? {
            AttrValue::Unsigned(x) => Some(x),
            _ => None,
        };
        let file = match self.attr_value(entry, DW_AT_decl_file)? {
            AttrValue::Unsigned(x) => Some(x),
            _ => None,
        };
        let object = &mut self.tree[id];
        object.tag = Some(tag);
        object.name = name;
        object.line = line;
        if let Some(file_id) = file {
            apply_source_file(&self.file_table, object, file_id);
        }
        Ok(())
    }

    fn init_family(&mut self, id: NodeId, entry: &Die<'_, '_>) -> cu::Result<()> {
        if let Some(kind) = self.tree[id].scope_kind() {
            self.init_scope(id, kind, entry)?;
        } else if let Some(kind) = self.tree[id].type_kind() {
            self.init_type(id, kind, entry)?;
        } else if self.tree[id].symbol_kind() == Some(SymbolKind::Member) {
            let access = access_specifier(entry)?;
            if let Some(symbol) = self.tree[id].as_symbol_mut() {
                symbol.access = access;
            }
        }
        Ok(())
    }

    fn init_scope(&mut self, id: NodeId, kind: ScopeKind, entry: &Die<'_, '_>) -> cu::Result<()> {
        match kind {
            ScopeKind::CompileUnit => {
                if let Some(scope) = self.tree[id].as_scope_mut() {
                    scope.file_table = self.file_table.clone();
                }
                let rows = cu::check!(
                    entry.unit().line_rows(),
                    "failed to read the line table of {}",
                    entry.unit()
                )?;
                self.create_lines(id, &rows)?;
            }
            ScopeKind::Enumeration => {
                let is_enum_class = entry.flag(DW_AT_enum_class)?;
                if let Some(scope) = self.tree[id].as_scope_mut() {
                    scope.is_enum_class = is_enum_class;
                }
            }
            // the pack's parent is a template
            ScopeKind::TemplatePack => self.mark_parent_template(id),
            kind if kind.is_function() => {
                let is_declaration = entry.flag(DW_AT_declaration)?;
                // A function is static when neither it nor its
                // declaration chain is external. The chain is not linked
                // yet, so the reference resolver has the final word.
                let has_specification = entry.has_attr(DW_AT_specification)?;
                let is_external = entry.flag(DW_AT_external)?;
                let inline = match self.attr_value(entry, DW_AT_inline)? {
                    AttrValue::Unsigned(x) => x,
                    _ => DW_INL_not_inlined.0 as u64,
                };
                let is_declared_inline = inline == DW_INL_declared_not_inlined.0 as u64
                    || inline == DW_INL_declared_inlined.0 as u64;
                if let Some(scope) = self.tree[id].as_scope_mut() {
                    scope.is_declaration = is_declaration;
                    scope.is_static = !has_specification && !is_external;
                    scope.is_declared_inline = is_declared_inline;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn init_type(&mut self, id: NodeId, kind: TypeKind, entry: &Die<'_, '_>) -> cu::Result<()> {
        match kind {
            TypeKind::Base => {
                let byte_size = entry.uint_opt(DW_AT_byte_size)?;
                if let Some(ty) = self.tree[id].as_type_mut() {
                    ty.byte_size = byte_size;
                }
            }
            TypeKind::Enumerator | TypeKind::TemplateValue => {
                let value = const_value_string(&self.attr_value(entry, DW_AT_const_value)?);
                if let Some(ty) = self.tree[id].as_type_mut() {
                    ty.value = value;
                }
            }
            TypeKind::TemplateTemplate => {
                let value = entry.str_opt(DW_AT_GNU_template_name)?.map(str::to_string);
                if let Some(ty) = self.tree[id].as_type_mut() {
                    ty.value = value;
                }
            }
            TypeKind::Subrange => {
                let lower = entry.uint_opt(DW_AT_lower_bound)?.unwrap_or(0);
                let count = self.attr_value(entry, DW_AT_count)?;
                let upper = self.attr_value(entry, DW_AT_upper_bound)?;
                self.tree[id].name = Some(subrange_name(lower, &count, &upper));
            }
            TypeKind::Inheritance => {
                let access = access_specifier(entry)?;
                if let Some(ty) = self.tree[id].as_type_mut() {
                    ty.access = access;
                }
            }
            _ => {}
        }
        if kind.is_template_param() {
            self.mark_parent_template(id);
        }
        Ok(())
    }

    /// Emit the line-table rows as Line children of the compile unit
    fn create_lines(&mut self, cu_id: NodeId, rows: &[LineEntry]) -> cu::Result<()> {
        for row in rows {
            let data = scopetree::LineData {
                address: row.address,
                discriminator: row.discriminator,
                is_new_statement: row.is_stmt,
                is_new_basic_block: row.basic_block,
                is_line_end_sequence: row.end_sequence,
                is_epilogue_begin: row.epilogue_begin,
                is_prologue_end: row.prologue_end,
            };
            let mut object = Object::new(ObjectData::Line(data), 1);
            object.line = row.line;
            // line records have no DIE; the row address stands in
            object.offset = Goff(row.address);
            apply_source_file(&self.file_table, &mut object, row.file);
            self.tree.add_object(cu_id, object)?;
        }
        Ok(())
    }

    /// Resolve the type and reference links of a just-created object, or
    /// park them until the target offset is visited
    fn init_references(&mut self, id: NodeId, entry: &Die<'_, '_>) -> cu::Result<()> {
        let mut type_target = entry.ref_opt(DW_AT_type)?;
        if type_target.is_none() {
            // imports treat DW_AT_import as their type link
            let is_import = self.tree[id]
                .type_kind()
                .is_some_and(|kind| kind.is_import());
            if is_import {
                type_target = entry.ref_opt(DW_AT_import)?;
            }
        }
        if let Some(target) = type_target {
            self.link_type(id, target);
        }

        // specification wins over abstract_origin wins over extension
        let mut reference = entry.ref_opt(DW_AT_specification)?;
        if reference.is_none() {
            reference = entry.ref_opt(DW_AT_abstract_origin)?;
        }
        if reference.is_none() {
            reference = entry.ref_opt(DW_AT_extension)?;
        }
        if let Some(target) = reference {
            self.link_reference(id, target);
        }
        Ok(())
    }

    fn link_type(&mut self, referrer: NodeId, target: Goff) {
        match self.created.get(&target) {
            Some(&target_id) => {
                self.tree[referrer].type_ref = Some(target_id);
                // a referent used from another CU is global
                if !self.in_current_cu(target) {
                    self.tree[target_id].is_global = true;
                }
            }
            None => {
                self.types_to_be_set.entry(target).or_default().push(referrer);
            }
        }
    }

    fn link_reference(&mut self, referrer: NodeId, target: Goff) {
        match self.created.get(&target) {
            Some(&target_id) => {
                self.set_reference(referrer, target_id);
                if !self.in_current_cu(target) {
                    self.tree[target_id].is_global = true;
                }
            }
            None => {
                self.references_to_be_set
                    .entry(target)
                    .or_default()
                    .push(referrer);
            }
        }
    }

    /// Satisfy the pending links that were waiting for this offset
    fn update_pending(&mut self, id: NodeId, offset: Goff) {
        if let Some(waiters) = self.types_to_be_set.remove(&offset) {
            for waiter in waiters {
                self.tree[waiter].type_ref = Some(id);
                let waiter_offset = self.tree[waiter].offset;
                if !self.in_current_cu(waiter_offset) {
                    self.tree[id].is_global = true;
                }
            }
        }
        if let Some(waiters) = self.references_to_be_set.remove(&offset) {
            for waiter in waiters {
                self.set_reference(waiter, id);
                let waiter_offset = self.tree[waiter].offset;
                if !self.in_current_cu(waiter_offset) {
                    self.tree[waiter].is_global = true;
                }
            }
        }
    }

    /// References only connect scope to scope or symbol to symbol;
    /// anything else is dropped
    fn set_reference(&mut self, referrer: NodeId, target: NodeId) {
        let family_match = (self.tree[referrer].is_scope() && self.tree[target].is_scope())
            || (self.tree[referrer].is_symbol() && self.tree[target].is_symbol());
        if family_match {
            self.tree[referrer].reference = Some(target);
        }
    }

    fn mark_parent_template(&mut self, id: NodeId) {
        if let Some(parent) = self.tree[id].parent {
            if let Some(scope) = self.tree[parent].as_scope_mut() {
                scope.is_template = true;
            }
        }
    }

    fn in_current_cu(&self, goff: Goff) -> bool {
        goff >= self.cu_start && goff < self.cu_end
    }

    fn warn_unknown_tag(&mut self, tag: Tag) {
        if self.unknown_tags.insert(tag) {
            cu::warn!("ignoring unknown/unsupported DWARF tag {tag}");
        }
    }

    fn finish(self) -> cu::Result<ScopeTree> {
        // leftovers mean the DWARF referenced offsets that never became
        // objects; the affected nodes simply keep null attributes
        for (goff, waiters) in &self.types_to_be_set {
            cu::warn!(
                "type reference to {goff} was never created ({} waiting object(s))",
                waiters.len()
            );
        }
        for (goff, waiters) in &self.references_to_be_set {
            cu::warn!(
                "object reference to {goff} was never created ({} waiting object(s))",
                waiters.len()
            );
        }
        Ok(self.tree)
    }
}

/// The fixed tag dispatch table. Returns None for tags this reader does
/// not model.
fn object_for_tag(tag: Tag) -> Option<ObjectData> {
    let data = match tag {
        // Types
        DW_TAG_base_type => ObjectData::Type(TypeData::new(TypeKind::Base)),
        DW_TAG_const_type => ObjectData::Type(TypeData::new(TypeKind::Const)),
        DW_TAG_volatile_type => ObjectData::Type(TypeData::new(TypeKind::Volatile)),
        DW_TAG_pointer_type => ObjectData::Type(TypeData::new(TypeKind::Pointer)),
        DW_TAG_ptr_to_member_type => ObjectData::Type(TypeData::new(TypeKind::PointerMember)),
        DW_TAG_reference_type => ObjectData::Type(TypeData::new(TypeKind::Reference)),
        DW_TAG_restrict_type => ObjectData::Type(TypeData::new(TypeKind::Restrict)),
        DW_TAG_rvalue_reference_type => {
            ObjectData::Type(TypeData::new(TypeKind::RvalueReference))
        }
        DW_TAG_unspecified_type => ObjectData::Type(TypeData::new(TypeKind::Unspecified)),
        DW_TAG_typedef => ObjectData::Type(TypeData::new(TypeKind::TypeDef)),
        DW_TAG_enumerator => ObjectData::Type(TypeData::new(TypeKind::Enumerator)),
        DW_TAG_subrange_type => ObjectData::Type(TypeData::new(TypeKind::Subrange)),
        DW_TAG_template_value_parameter => {
            ObjectData::Type(TypeData::new(TypeKind::TemplateValue))
        }
        DW_TAG_template_type_parameter => {
            ObjectData::Type(TypeData::new(TypeKind::TemplateType))
        }
        DW_TAG_GNU_template_template_param => {
            ObjectData::Type(TypeData::new(TypeKind::TemplateTemplate))
        }
        DW_TAG_imported_declaration => {
            ObjectData::Type(TypeData::new(TypeKind::ImportedDeclaration))
        }
        DW_TAG_imported_module => ObjectData::Type(TypeData::new(TypeKind::ImportedModule)),
        DW_TAG_inheritance => ObjectData::Type(TypeData::new(TypeKind::Inheritance)),
        // Symbols
        DW_TAG_formal_parameter => ObjectData::Symbol(SymbolData::new(SymbolKind::Parameter)),
        DW_TAG_unspecified_parameters => {
            ObjectData::Symbol(SymbolData::new(SymbolKind::UnspecifiedParameter))
        }
        DW_TAG_member => ObjectData::Symbol(SymbolData::new(SymbolKind::Member)),
        DW_TAG_variable => ObjectData::Symbol(SymbolData::new(SymbolKind::Variable)),
        // Scopes
        DW_TAG_compile_unit => ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)),
        DW_TAG_namespace => ObjectData::Scope(ScopeData::new(ScopeKind::Namespace)),
        DW_TAG_class_type => ObjectData::Scope(ScopeData::new(ScopeKind::Class)),
        DW_TAG_structure_type => ObjectData::Scope(ScopeData::new(ScopeKind::Struct)),
        DW_TAG_union_type => ObjectData::Scope(ScopeData::new(ScopeKind::Union)),
        DW_TAG_enumeration_type => ObjectData::Scope(ScopeData::new(ScopeKind::Enumeration)),
        DW_TAG_array_type => ObjectData::Scope(ScopeData::new(ScopeKind::Array)),
        DW_TAG_subprogram => ObjectData::Scope(ScopeData::new(ScopeKind::Subprogram)),
        DW_TAG_subroutine_type => ObjectData::Scope(ScopeData::new(ScopeKind::SubroutineType)),
        DW_TAG_inlined_subroutine => {
            ObjectData::Scope(ScopeData::new(ScopeKind::InlinedSubroutine))
        }
        DW_TAG_entry_point => ObjectData::Scope(ScopeData::new(ScopeKind::EntryPoint)),
        DW_TAG_label => ObjectData::Scope(ScopeData::new(ScopeKind::Label)),
        DW_TAG_lexical_block => ObjectData::Scope(ScopeData::new(ScopeKind::LexicalBlock)),
        DW_TAG_try_block => ObjectData::Scope(ScopeData::new(ScopeKind::TryBlock)),
        DW_TAG_catch_block => ObjectData::Scope(ScopeData::new(ScopeKind::CatchBlock)),
        DW_TAG_template_alias => {
            // a template alias is a template by definition
            let mut scope = ScopeData::new(ScopeKind::TemplateAlias);
            scope.is_template = true;
            ObjectData::Scope(scope)
        }
        DW_TAG_GNU_template_parameter_pack => {
            ObjectData::Scope(ScopeData::new(ScopeKind::TemplatePack))
        }
        _ => return None,
    };
    Some(data)
}

/// Map a DWARF file id through the current CU file table. Ids outside
/// the table keep the raw index and flag the name as invalid.
fn apply_source_file(file_table: &[String], object: &mut Object, file_id: u64) {
    object.file_index = Some(file_id);
    match file_table.get(file_id as usize) {
        Some(path) => object.file_name = Some(path.clone()),
        None => object.invalid_file_name = true,
    }
}

/// Synthesize the display name of a subrange: `[N]`, `[L..U]` or `[?]`.
/// Bounds held in reference forms are runtime-computed, which renders
/// as unknown.
fn subrange_name(lower: u64, count: &AttrValue, upper: &AttrValue) -> String {
    match count {
        AttrValue::Unsigned(count) => return format!("[{}]", lower + count),
        AttrValue::Signed(count) => return format!("[{}]", lower + *count as u64),
        AttrValue::Reference(_) => return "[?]".to_string(),
        _ => {}
    }
    match upper {
        AttrValue::Unsigned(upper) => {
            if lower != 0 {
                format!("[{lower}..{upper}]")
            } else {
                format!("[{}]", upper + 1)
            }
        }
        AttrValue::Signed(upper) => {
            let upper = *upper as u64;
            if lower != 0 {
                format!("[{lower}..{upper}]")
            } else {
                format!("[{}]", upper + 1)
            }
        }
        _ => "[?]".to_string(),
    }
}

/// DW_AT_const_value as a decimal string, honoring signedness
fn const_value_string(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::Signed(x) => Some(x.to_string()),
        AttrValue::Unsigned(x) => Some(x.to_string()),
        _ => None,
    }
}

fn access_specifier(entry: &Die<'_, '_>) -> cu::Result<AccessSpecifier> {
    let access = match entry.value(DW_AT_accessibility)? {
        AttrValue::Unsigned(x) if x == DW_ACCESS_private.0 as u64 => AccessSpecifier::Private,
        AttrValue::Unsigned(x) if x == DW_ACCESS_protected.0 as u64 => {
            AccessSpecifier::Protected
        }
        AttrValue::Unsigned(x) if x == DW_ACCESS_public.0 as u64 => AccessSpecifier::Public,
        _ => AccessSpecifier::Unspecified,
    };
    Ok(access)
}
