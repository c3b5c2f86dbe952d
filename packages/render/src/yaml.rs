use std::fmt::Write as _;

use cu::pre::*;
use scopetree::{
    AccessSpecifier, NodeId, Object, ObjectData, PrintSettings, ScopeKind, ScopeTree,
    SymbolKind, TypeKind,
};

use crate::ScopePrinter;

const OUTPUT_VERSION: &str = "0.1";

/// Machine-readable rendering: a stream of one YAML document per
/// object, each with the same object/name/type/source/dwarf/attributes
/// shape. Unset scalars emit as `null`.
pub struct YamlPrinter<'a> {
    settings: &'a PrintSettings,
}

impl<'a> YamlPrinter<'a> {
    pub fn new(settings: &'a PrintSettings) -> Self {
        Self { settings }
    }

    fn common_yaml(&self, tree: &ScopeTree, object: &Object, out: &mut String) {
        let _ = writeln!(out, "object: \"{}\"", object.kind_label());
        match &object.name {
            Some(_) => {
                let _ = writeln!(out, "name: \"{}\"", object.qualified_name_str());
            }
            None => out.push_str("name: null\n"),
        }
        let type_name = match object.type_ref {
            Some(target) => Some(tree[target].qualified_name_str()),
            // an untyped function returns void
            None if object.scope_kind().is_some_and(|k| k.is_function()) => {
                Some("void".to_string())
            }
            None => None,
        };
        match type_name {
            Some(name) => {
                let _ = writeln!(out, "type: \"{name}\"");
            }
            None => out.push_str("type: null\n"),
        }
        out.push_str("source:\n");
        match object.line {
            Some(line) => {
                let _ = writeln!(out, "  line: {line}");
            }
            None => out.push_str("  line: null\n"),
        }
        if object.invalid_file_name {
            out.push_str("  file: \"?\"\n");
        } else {
            match &object.file_name {
                Some(file) => {
                    let _ = writeln!(out, "  file: \"{file}\"");
                }
                None => out.push_str("  file: null\n"),
            }
        }
        out.push_str("dwarf:\n");
        let _ = writeln!(out, "  offset: {}", object.offset.to_hex());
        match object.tag {
            Some(tag) => {
                let _ = writeln!(out, "  tag: \"{tag}\"");
            }
            None => out.push_str("  tag: null\n"),
        }
    }

    fn attributes_yaml(&self, tree: &ScopeTree, id: NodeId, out: &mut String) {
        let object = &tree[id];
        match &object.data {
            ObjectData::Scope(scope) => match scope.kind() {
                ScopeKind::Class | ScopeKind::Struct => {
                    out.push_str("attributes:\n");
                    let _ = writeln!(out, "  is_template: {}", scope.is_template);
                    self.inherits_yaml(tree, id, out);
                }
                ScopeKind::Union => {
                    out.push_str("attributes:\n");
                    let _ = writeln!(out, "  is_template: {}", scope.is_template);
                }
                ScopeKind::Enumeration => {
                    out.push_str("attributes:\n");
                    let _ = writeln!(out, "  class: {}", scope.is_enum_class);
                    self.enumerators_yaml(tree, id, out);
                }
                ScopeKind::TemplatePack => {
                    out.push_str("attributes:\n");
                    self.pack_types_yaml(tree, id, out);
                }
                kind if kind.is_function() => {
                    out.push_str("attributes:\n");
                    out.push_str("  declaration:\n");
                    match object.reference {
                        Some(reference) => {
                            let referent = &tree[reference];
                            if referent.invalid_file_name {
                                out.push_str("    file: \"?\"\n");
                            } else {
                                match &referent.file_name {
                                    Some(file) => {
                                        let _ = writeln!(out, "    file: \"{file}\"");
                                    }
                                    None => out.push_str("    file: null\n"),
                                }
                            }
                            match referent.line {
                                Some(line) => {
                                    let _ = writeln!(out, "    line: {line}");
                                }
                                None => out.push_str("    line: null\n"),
                            }
                        }
                        None => {
                            out.push_str("    file: null\n");
                            out.push_str("    line: null\n");
                        }
                    }
                    let _ = writeln!(out, "  is_template: {}", scope.is_template);
                    let _ = writeln!(out, "  static: {}", scope.is_static);
                    let _ = writeln!(out, "  inline: {}", scope.is_declared_inline);
                    let _ = writeln!(out, "  is_inlined: {}", scope.is_inlined);
                    let _ = writeln!(out, "  is_declaration: {}", scope.is_declaration);
                }
                kind if kind.is_block() => {
                    out.push_str("attributes:\n");
                    let _ = writeln!(out, "  try: {}", kind == ScopeKind::TryBlock);
                    let _ = writeln!(out, "  catch: {}", kind == ScopeKind::CatchBlock);
                }
                _ => out.push_str("attributes: {}\n"),
            },
            ObjectData::Type(ty) => match ty.kind {
                TypeKind::Base => {
                    out.push_str("attributes:\n");
                    match ty.byte_size {
                        Some(size) => {
                            let _ = writeln!(out, "  byte_size: {size}");
                        }
                        None => out.push_str("  byte_size: null\n"),
                    }
                }
                TypeKind::TemplateType => {
                    out.push_str("attributes:\n");
                    match object.type_ref {
                        Some(target) => {
                            let _ =
                                writeln!(out, "  type: \"{}\"", tree[target].qualified_name_str());
                        }
                        None => out.push_str("  type: null\n"),
                    }
                }
                TypeKind::TemplateValue => {
                    out.push_str("attributes:\n");
                    match &ty.value {
                        Some(value) => {
                            let _ = writeln!(out, "  value: {value}");
                        }
                        None => out.push_str("  value: null\n"),
                    }
                }
                TypeKind::TemplateTemplate => {
                    out.push_str("attributes:\n");
                    match &ty.value {
                        Some(value) => {
                            let _ = writeln!(out, "  template: \"{value}\"");
                        }
                        None => out.push_str("  template: null\n"),
                    }
                }
                _ => out.push_str("attributes: {}\n"),
            },
            ObjectData::Symbol(symbol) => match symbol.kind {
                SymbolKind::Member => {
                    out.push_str("attributes:\n");
                    let access = effective_access(tree, object, symbol.access);
                    let _ = writeln!(out, "  access_specifier: \"{access}\"");
                }
                _ => out.push_str("attributes: {}\n"),
            },
            ObjectData::Line(line) => {
                out.push_str("attributes:\n");
                let _ = writeln!(out, "  discriminator: {}", line.discriminator);
                let _ = writeln!(out, "  is_stmt: {}", line.is_new_statement);
                let _ = writeln!(out, "  basic_block: {}", line.is_new_basic_block);
                let _ = writeln!(out, "  end_sequence: {}", line.is_line_end_sequence);
                let _ = writeln!(out, "  prologue_end: {}", line.is_prologue_end);
                let _ = writeln!(out, "  epilogue_begin: {}", line.is_epilogue_begin);
            }
        }
    }

    /// `inherits_from` entries from the aggregate's inheritance children
    fn inherits_yaml(&self, tree: &ScopeTree, id: NodeId, out: &mut String) {
        let object = &tree[id];
        let inherits: Vec<NodeId> = object
            .children()
            .iter()
            .copied()
            .filter(|child| tree[*child].type_kind() == Some(TypeKind::Inheritance))
            .collect();
        if inherits.is_empty() {
            out.push_str("  inherits_from: []\n");
            return;
        }
        out.push_str("  inherits_from:\n");
        for child in inherits {
            let inherit = &tree[child];
            let parent_name = match inherit.type_ref {
                Some(target) => tree[target].qualified_name_str(),
                None => inherit.name_str().to_string(),
            };
            let access = match inherit.as_type().map(|t| t.access) {
                Some(AccessSpecifier::Unspecified) | None => {
                    // C++ default: private for classes, public otherwise
                    if object.scope_kind() == Some(ScopeKind::Class) {
                        "private"
                    } else {
                        "public"
                    }
                }
                Some(access) => access.as_str(),
            };
            let _ = writeln!(out, "    - parent: \"{parent_name}\"");
            let _ = writeln!(out, "      access_specifier: \"{access}\"");
        }
    }

    fn enumerators_yaml(&self, tree: &ScopeTree, id: NodeId, out: &mut String) {
        let enumerators: Vec<NodeId> = tree[id]
            .children()
            .iter()
            .copied()
            .filter(|child| tree[*child].type_kind() == Some(TypeKind::Enumerator))
            .collect();
        if enumerators.is_empty() {
            out.push_str("  enumerators: []\n");
            return;
        }
        out.push_str("  enumerators:\n");
        for child in enumerators {
            let enumerator = &tree[child];
            let _ = writeln!(out, "    - enumerator: \"{}\"", enumerator.name_str());
            match enumerator.as_type().and_then(|t| t.value.as_deref()) {
                Some(value) => {
                    let _ = writeln!(out, "      value: {value}");
                }
                None => out.push_str("      value: null\n"),
            }
        }
    }

    /// Template pack `types` list: type parameters render their type
    /// name, value parameters their value
    fn pack_types_yaml(&self, tree: &ScopeTree, id: NodeId, out: &mut String) {
        let params: Vec<NodeId> = tree[id]
            .children()
            .iter()
            .copied()
            .filter(|child| {
                tree[*child]
                    .type_kind()
                    .is_some_and(|kind| kind.is_template_param())
            })
            .collect();
        if params.is_empty() {
            out.push_str("  types: []\n");
            return;
        }
        out.push_str("  types:\n");
        for child in params {
            let param = &tree[child];
            match param.type_kind() {
                Some(TypeKind::TemplateType) => {
                    let name = match param.type_ref {
                        Some(target) => tree[target].qualified_name_str(),
                        None => String::new(),
                    };
                    let _ = writeln!(out, "    - \"{name}\"");
                }
                Some(TypeKind::TemplateValue) => {
                    let value = param
                        .as_type()
                        .and_then(|t| t.value.as_deref())
                        .unwrap_or("null");
                    let _ = writeln!(out, "    - {value}");
                }
                _ => {
                    let value = param.as_type().and_then(|t| t.value.as_deref()).unwrap_or("");
                    let _ = writeln!(out, "    - \"{value}\"");
                }
            }
        }
    }
}

impl ScopePrinter for YamlPrinter<'_> {
    fn settings(&self) -> &PrintSettings {
        self.settings
    }

    fn file_extension(&self) -> &'static str {
        "yaml"
    }

    fn header(&self, tree: &ScopeTree, out: &mut String) {
        let root = &tree[tree.root()];
        let _ = writeln!(out, "input_file: \"{}\"", root.name_str());
        let _ = writeln!(out, "output_version: \"{OUTPUT_VERSION}\"");
        out.push_str("format: \"YAML\"\n");
    }

    fn print_object(&self, tree: &ScopeTree, id: NodeId, out: &mut String) -> cu::Result<()> {
        out.push_str("---\n");
        self.common_yaml(tree, &tree[id], out);
        self.attributes_yaml(tree, id, out);
        Ok(())
    }
}

/// A member's access defaults to the C++ rule of its enclosing
/// aggregate when the DWARF does not spell it out
fn effective_access(tree: &ScopeTree, object: &Object, access: AccessSpecifier) -> &'static str {
    match access {
        AccessSpecifier::Unspecified => {
            let parent_kind = object.parent.and_then(|parent| tree[parent].scope_kind());
            if parent_kind == Some(ScopeKind::Class) {
                "private"
            } else {
                "public"
            }
        }
        access => access.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_tree;
    use gimli::constants::*;
    use scopetree::{Goff, ScopeData, SymbolData, TypeData};

    fn doc_of(tree: &ScopeTree, id: NodeId) -> String {
        let settings = PrintSettings::brief();
        let printer = YamlPrinter::new(&settings);
        let mut out = String::new();
        printer.print_object(tree, id, &mut out).unwrap();
        out
    }

    fn tree_with_cu() -> (ScopeTree, NodeId) {
        let mut tree = ScopeTree::new("in.o");
        let root = tree.root();
        let mut cu = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)), 0);
        cu.name = Some("a.cpp".to_string());
        cu.offset = Goff(0xb);
        cu.tag = Some(DW_TAG_compile_unit);
        let cu = tree.add_object(root, cu).unwrap();
        (tree, cu)
    }

    #[test]
    fn test_compile_unit_doc() {
        let (tree, cu) = tree_with_cu();
        assert_eq!(
            doc_of(&tree, cu),
            "---\n\
             object: \"CompileUnit\"\n\
             name: \"a.cpp\"\n\
             type: null\n\
             source:\n\
             \u{20} line: null\n\
             \u{20} file: null\n\
             dwarf:\n\
             \u{20} offset: 0xb\n\
             \u{20} tag: \"DW_TAG_compile_unit\"\n\
             attributes: {}\n"
        );
    }

    #[test]
    fn test_alias_doc() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = ScopeData::new(ScopeKind::TemplateAlias);
        data.is_template = true;
        let mut alias = Object::new(ObjectData::Scope(data), 1);
        alias.name = Some("test<int>".to_string());
        alias.line = Some(18);
        alias.file_name = Some("test.cpp".to_string());
        alias.offset = Goff(0x123f);
        alias.tag = Some(DW_TAG_template_alias);
        let alias = tree.add_object(cu, alias).unwrap();

        let mut ty = Object::new(ObjectData::Type(TypeData::new(TypeKind::Base)), 1);
        ty.name = Some("foo<int, int>".to_string());
        ty.qualified_name = Some("Class::".to_string());
        let ty = tree.add_object(cu, ty).unwrap();
        tree[alias].type_ref = Some(ty);

        assert_eq!(
            doc_of(&tree, alias),
            "---\n\
             object: \"Alias\"\n\
             name: \"test<int>\"\n\
             type: \"Class::foo<int, int>\"\n\
             source:\n\
             \u{20} line: 18\n\
             \u{20} file: \"test.cpp\"\n\
             dwarf:\n\
             \u{20} offset: 0x123f\n\
             \u{20} tag: \"DW_TAG_template_alias\"\n\
             attributes: {}\n"
        );
    }

    #[test]
    fn test_class_inheritance_doc() {
        let (mut tree, cu) = tree_with_cu();
        let mut class = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Class)), 1);
        class.name = Some("Derived".to_string());
        class.offset = Goff(0xd3adb33f);
        class.tag = Some(DW_TAG_class_type);
        let class = tree.add_object(cu, class).unwrap();

        let mut base = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Class)), 1);
        base.name = Some("Base".to_string());
        let base = tree.add_object(cu, base).unwrap();

        let mut data = TypeData::new(TypeKind::Inheritance);
        data.access = AccessSpecifier::Public;
        let inherit = tree
            .add_object(class, Object::new(ObjectData::Type(data), 2))
            .unwrap();
        tree[inherit].type_ref = Some(base);

        let doc = doc_of(&tree, class);
        assert!(doc.contains("object: \"Class\""));
        assert!(doc.contains("  offset: 0xd3adb33f\n"));
        assert!(doc.ends_with(
            "attributes:\n\
             \u{20} is_template: false\n\
             \u{20} inherits_from:\n\
             \u{20}   - parent: \"Base\"\n\
             \u{20}     access_specifier: \"public\"\n"
        ));
    }

    #[test]
    fn test_unspecified_inheritance_defaults() {
        let (mut tree, cu) = tree_with_cu();
        let mut class = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Class)), 1);
        class.name = Some("C".to_string());
        let class = tree.add_object(cu, class).unwrap();
        let inherit = tree
            .add_object(
                class,
                Object::new(ObjectData::Type(TypeData::new(TypeKind::Inheritance)), 2),
            )
            .unwrap();
        let mut parent = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Struct)), 1);
        parent.name = Some("P".to_string());
        let parent = tree.add_object(cu, parent).unwrap();
        tree[inherit].type_ref = Some(parent);

        // class inheritance defaults to private
        assert!(doc_of(&tree, class).contains("access_specifier: \"private\""));

        let mut strukt = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Struct)), 1);
        strukt.name = Some("S".to_string());
        let strukt = tree.add_object(cu, strukt).unwrap();
        let inherit2 = tree
            .add_object(
                strukt,
                Object::new(ObjectData::Type(TypeData::new(TypeKind::Inheritance)), 2),
            )
            .unwrap();
        tree[inherit2].type_ref = Some(parent);

        // struct inheritance defaults to public
        assert!(doc_of(&tree, strukt).contains("access_specifier: \"public\""));
    }

    #[test]
    fn test_enum_doc() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = ScopeData::new(ScopeKind::Enumeration);
        data.is_enum_class = true;
        let mut obj = Object::new(ObjectData::Scope(data), 1);
        obj.name = Some("days".to_string());
        let enum_id = tree.add_object(cu, obj).unwrap();

        let mut monday = TypeData::new(TypeKind::Enumerator);
        monday.value = Some("10".to_string());
        let mut monday_obj = Object::new(ObjectData::Type(monday), 2);
        monday_obj.name = Some("monday".to_string());
        tree.add_object(enum_id, monday_obj).unwrap();

        let mut negative = TypeData::new(TypeKind::Enumerator);
        negative.value = Some("-1".to_string());
        let mut negative_obj = Object::new(ObjectData::Type(negative), 2);
        negative_obj.name = Some("missing".to_string());
        tree.add_object(enum_id, negative_obj).unwrap();

        let doc = doc_of(&tree, enum_id);
        assert!(doc.ends_with(
            "attributes:\n\
             \u{20} class: true\n\
             \u{20} enumerators:\n\
             \u{20}   - enumerator: \"monday\"\n\
             \u{20}     value: 10\n\
             \u{20}   - enumerator: \"missing\"\n\
             \u{20}     value: -1\n"
        ));
    }

    #[test]
    fn test_function_doc() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = ScopeData::new(ScopeKind::Subprogram);
        data.is_static = true;
        data.is_declared_inline = true;
        let mut func = Object::new(ObjectData::Scope(data), 1);
        func.name = Some("Foo".to_string());
        func.line = Some(17);
        func.file_name = Some("foo.cpp".to_string());
        func.offset = Goff(0xce);
        func.tag = Some(DW_TAG_subprogram);
        let func = tree.add_object(cu, func).unwrap();

        // untyped functions render a void return
        let doc = doc_of(&tree, func);
        assert!(doc.contains("type: \"void\"\n"));
        assert!(doc.ends_with(
            "attributes:\n\
             \u{20} declaration:\n\
             \u{20}   file: null\n\
             \u{20}   line: null\n\
             \u{20} is_template: false\n\
             \u{20} static: true\n\
             \u{20} inline: true\n\
             \u{20} is_inlined: false\n\
             \u{20} is_declaration: false\n"
        ));

        let mut decl = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Subprogram)), 1);
        decl.file_name = Some("ref.cpp".to_string());
        decl.line = Some(620);
        let decl = tree.add_object(cu, decl).unwrap();
        tree[func].reference = Some(decl);

        let doc = doc_of(&tree, func);
        assert!(doc.contains(
            "  declaration:\n\
             \u{20}   file: \"ref.cpp\"\n\
             \u{20}   line: 620\n"
        ));
    }

    #[test]
    fn test_block_doc() {
        let (mut tree, cu) = tree_with_cu();
        let block = tree
            .add_object(
                cu,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::TryBlock)), 1),
            )
            .unwrap();
        let doc = doc_of(&tree, block);
        assert!(doc.contains("object: \"Block\""));
        assert!(doc.contains("name: null\n"));
        assert!(doc.ends_with(
            "attributes:\n\
             \u{20} try: true\n\
             \u{20} catch: false\n"
        ));
    }

    #[test]
    fn test_template_pack_doc() {
        let (mut tree, cu) = tree_with_cu();
        let mut pack = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::TemplatePack)), 1);
        pack.name = Some("TPack".to_string());
        let pack = tree.add_object(cu, pack).unwrap();

        let mut ty = Object::new(ObjectData::Type(TypeData::new(TypeKind::Base)), 1);
        ty.name = Some("Ty".to_string());
        let ty = tree.add_object(cu, ty).unwrap();

        let type_param = tree
            .add_object(
                pack,
                Object::new(ObjectData::Type(TypeData::new(TypeKind::TemplateType)), 2),
            )
            .unwrap();
        tree[type_param].type_ref = Some(ty);

        let mut value_data = TypeData::new(TypeKind::TemplateValue);
        value_data.value = Some("101".to_string());
        tree.add_object(pack, Object::new(ObjectData::Type(value_data), 2))
            .unwrap();

        let doc = doc_of(&tree, pack);
        assert!(doc.ends_with(
            "attributes:\n\
             \u{20} types:\n\
             \u{20}   - \"Ty\"\n\
             \u{20}   - 101\n"
        ));
    }

    #[test]
    fn test_stream_header() -> cu::Result<()> {
        let (mut tree, cu) = tree_with_cu();
        let mut var = Object::new(
            ObjectData::Symbol(SymbolData::new(SymbolKind::Variable)),
            1,
        );
        var.name = Some("v".to_string());
        tree.add_object(cu, var).unwrap();

        let settings = PrintSettings::brief();
        let printer = YamlPrinter::new(&settings);
        let mut out = String::new();
        print_tree(&printer, &tree, &mut out)?;
        assert!(out.starts_with(
            "input_file: \"in.o\"\n\
             output_version: \"0.1\"\n\
             format: \"YAML\"\n\
             ---\n\
             object: \"CompileUnit\"\n"
        ));
        assert_eq!(out.matches("---\n").count(), 2);
        Ok(())
    }
}
