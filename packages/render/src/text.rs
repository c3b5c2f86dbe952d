use std::fmt::Write as _;

use cu::pre::*;
use scopetree::{
    AccessSpecifier, NodeId, Object, ObjectData, PrintSettings, ScopeKind, ScopeTree,
    SymbolKind, TypeKind,
};

use crate::ScopePrinter;

const TAG_FIELD_WIDTH: usize = 42;

/// Indented human-readable rendering.
///
/// Each printed object takes one `{Kind} ...` line, preceded by the
/// optional fixed-width attribute prefix and the source line column,
/// and followed by `- attribute` detail lines.
pub struct TextPrinter<'a> {
    settings: &'a PrintSettings,
}

impl<'a> TextPrinter<'a> {
    pub fn new(settings: &'a PrintSettings) -> Self {
        Self { settings }
    }

    /// Width of the attribute prefix with the current settings
    fn prefix_width(&self) -> usize {
        let mut width = 0;
        if self.settings.show_dwarf_offset {
            width += 12;
        }
        if self.settings.show_dwarf_parent {
            width += 12;
        }
        if self.settings.show_level {
            width += 3;
        }
        if self.settings.show_is_global {
            width += 1;
        }
        if self.settings.show_dwarf_tag {
            width += TAG_FIELD_WIDTH;
        }
        width
    }

    /// The per-line attribute prefix: DIE offset, parent offset, level,
    /// globality and tag, each field-width stable. The root renders
    /// blanks for every field except globality.
    fn attributes_prefix(&self, tree: &ScopeTree, object: &Object) -> String {
        let mut prefix = String::new();
        let is_root = object.scope_kind() == Some(ScopeKind::Root);
        if self.settings.show_dwarf_offset {
            if is_root {
                prefix.push_str(&" ".repeat(12));
            } else {
                let _ = write!(prefix, "[0x{:08x}]", object.offset.0);
            }
        }
        if self.settings.show_dwarf_parent {
            match object.parent {
                Some(parent) if !is_root => {
                    let _ = write!(prefix, "[0x{:08x}]", tree[parent].offset.0);
                }
                _ => prefix.push_str(&" ".repeat(12)),
            }
        }
        if self.settings.show_level {
            if is_root {
                prefix.push_str("   ");
            } else {
                let _ = write!(prefix, "{:03}", object.level);
            }
        }
        if self.settings.show_is_global {
            prefix.push(if object.is_global { 'X' } else { ' ' });
        }
        if self.settings.show_dwarf_tag {
            match object.tag {
                Some(tag) if !is_root => {
                    let _ = write!(prefix, "{:<width$}", format!("[{tag}]"), width = TAG_FIELD_WIDTH);
                }
                _ => prefix.push_str(&" ".repeat(TAG_FIELD_WIDTH)),
            }
        }
        prefix
    }

    /// `%5d  `, or blanks when the object has no line number
    fn line_column(&self, object: &Object) -> String {
        match object.line {
            Some(line) if line != 0 || self.settings.show_zero_line => {
                format!("{line:>5}  ")
            }
            _ => " ".repeat(7),
        }
    }

    fn indent(&self, level: i32) -> String {
        if self.settings.show_indent {
            " ".repeat(2 * (level + 1).max(0) as usize)
        } else {
            String::new()
        }
    }

    /// `-> "type"` for objects that render their type
    fn type_suffix(&self, tree: &ScopeTree, object: &Object) -> String {
        match object.type_ref {
            Some(target) => format!(" -> \"{}\"", tree[target].qualified_name_str()),
            None if self.settings.show_void => " -> \"void\"".to_string(),
            None => " -> \"\"".to_string(),
        }
    }

    fn object_body(&self, tree: &ScopeTree, object: &Object) -> String {
        match &object.data {
            ObjectData::Scope(scope) => match scope.kind() {
                ScopeKind::Root => format!("{{InputFile}} \"{}\"", object.name_str()),
                ScopeKind::CompileUnit => {
                    format!("{{CompileUnit}} \"{}\"", object.name_str())
                }
                ScopeKind::Namespace => {
                    if object.name.is_none() {
                        "{Namespace}".to_string()
                    } else {
                        format!("{{Namespace}} \"{}\"", object.qualified_name_str())
                    }
                }
                ScopeKind::Class | ScopeKind::Struct | ScopeKind::Union => {
                    format!(
                        "{{{}}} \"{}\"",
                        object.kind_label(),
                        object.qualified_name_str()
                    )
                }
                ScopeKind::Enumeration => {
                    let class = if scope.is_enum_class { " class" } else { "" };
                    let suffix = match object.type_ref {
                        Some(target) => {
                            format!(" -> \"{}\"", tree[target].qualified_name_str())
                        }
                        None => String::new(),
                    };
                    format!("{{Enum}}{class} \"{}\"{suffix}", object.name_str())
                }
                ScopeKind::Array => String::new(),
                ScopeKind::TemplateAlias => format!(
                    "{{Alias}} \"{}\"{}",
                    object.qualified_name_str(),
                    self.type_suffix(tree, object)
                ),
                ScopeKind::TemplatePack => {
                    format!("{{TemplateParameter}} \"{}\"", object.name_str())
                }
                kind if kind.is_block() => "{Block}".to_string(),
                _ => {
                    // functions
                    let modifier = if scope.is_static { " static" } else { "" };
                    let inline = if scope.is_declared_inline { " inline" } else { "" };
                    format!(
                        "{{Function}}{modifier}{inline} \"{}\"{}",
                        object.qualified_name_str(),
                        self.type_suffix(tree, object)
                    )
                }
            },
            ObjectData::Type(ty) => match ty.kind {
                TypeKind::Base => {
                    format!("{{PrimitiveType}} -> \"{}\"", object.name_str())
                }
                TypeKind::TypeDef => format!(
                    "{{Alias}} \"{}\"{}",
                    object.qualified_name_str(),
                    self.type_suffix(tree, object)
                ),
                TypeKind::TemplateType => {
                    let target = match object.type_ref {
                        Some(target) => tree[target].qualified_name_str(),
                        None => String::new(),
                    };
                    format!(
                        "{{TemplateParameter}} \"{}\" -> \"{target}\"",
                        object.name_str()
                    )
                }
                TypeKind::TemplateValue | TypeKind::TemplateTemplate => format!(
                    "{{TemplateParameter}} \"{}\" -> \"{}\"",
                    object.name_str(),
                    ty.value.as_deref().unwrap_or("")
                ),
                TypeKind::ImportedDeclaration | TypeKind::ImportedModule => {
                    let (word, target_name) = match object.type_ref {
                        Some(target) => {
                            let target_obj = &tree[target];
                            let word = if target_obj.scope_kind() == Some(ScopeKind::Namespace)
                            {
                                "namespace"
                            } else if target_obj.is_symbol() {
                                "variable"
                            } else {
                                "type"
                            };
                            (word, target_obj.qualified_name_str())
                        }
                        None => ("type", object.qualified_name_str()),
                    };
                    format!("{{Using}} {word} \"{target_name}\"")
                }
                _ => String::new(),
            },
            ObjectData::Symbol(symbol) => match symbol.kind {
                SymbolKind::Variable => format!(
                    "{{Variable}} \"{}\"{}",
                    object.qualified_name_str(),
                    self.type_suffix(tree, object)
                ),
                SymbolKind::Parameter => format!(
                    "{{Parameter}} \"{}\"{}",
                    object.qualified_name_str(),
                    self.type_suffix(tree, object)
                ),
                SymbolKind::UnspecifiedParameter => "{Parameter} \"...\"".to_string(),
                SymbolKind::Member => {
                    let access = match symbol.access {
                        AccessSpecifier::Unspecified => String::new(),
                        access => format!(" {}", access.as_str()),
                    };
                    format!(
                        "{{Member}}{access} \"{}\"{}",
                        object.qualified_name_str(),
                        self.type_suffix(tree, object)
                    )
                }
            },
            ObjectData::Line(_) => "{CodeLine}".to_string(),
        }
    }

    /// `- attribute` detail lines following the object line
    fn attribute_lines(&self, tree: &ScopeTree, object: &Object) -> Vec<String> {
        let mut lines = Vec::new();
        match &object.data {
            ObjectData::Scope(scope) => {
                let kind = scope.kind();
                if kind.is_function() {
                    if scope.is_declaration {
                        lines.push("Is declaration".to_string());
                    } else if let Some(reference) = object.reference {
                        let referent = &tree[reference];
                        let file = if referent.invalid_file_name {
                            "?".to_string()
                        } else {
                            base_name(referent.file_name.as_deref().unwrap_or(""))
                        };
                        let line = referent.line.unwrap_or(0);
                        lines.push(format!("Declaration @ {file},{line}"));
                    } else {
                        lines.push("No declaration".to_string());
                    }
                    if scope.is_template {
                        lines.push("Template".to_string());
                    }
                    if scope.is_inlined {
                        lines.push("Inlined".to_string());
                    }
                } else if kind.is_aggregate() {
                    if scope.is_template {
                        lines.push("Template".to_string());
                    }
                    for child in object.children() {
                        let inherit = &tree[*child];
                        if inherit.type_kind() != Some(TypeKind::Inheritance) {
                            continue;
                        }
                        let access = match inherit.as_type().map(|t| t.access) {
                            Some(AccessSpecifier::Unspecified) | None => {
                                if kind == ScopeKind::Class {
                                    "private"
                                } else {
                                    "public"
                                }
                            }
                            Some(access) => access.as_str(),
                        };
                        let parent_name = match inherit.type_ref {
                            Some(target) => tree[target].qualified_name_str(),
                            None => inherit.name_str().to_string(),
                        };
                        lines.push(format!("{access} \"{parent_name}\""));
                    }
                } else if kind.is_block() && self.settings.show_block_attributes {
                    match kind {
                        ScopeKind::TryBlock => lines.push("try".to_string()),
                        ScopeKind::CatchBlock => lines.push("catch".to_string()),
                        _ => {}
                    }
                }
            }
            ObjectData::Type(ty) => {
                if ty.kind == TypeKind::Base {
                    if let Some(size) = ty.byte_size {
                        lines.push(format!("{size} bytes"));
                    }
                }
            }
            ObjectData::Line(line) => {
                if self.settings.show_codeline_attributes {
                    if line.is_new_statement {
                        lines.push("NewStatement".to_string());
                    }
                    if line.is_new_basic_block {
                        lines.push("NewBasicBlock".to_string());
                    }
                    if line.is_line_end_sequence {
                        lines.push("LineEndSequence".to_string());
                    }
                    if line.is_prologue_end {
                        lines.push("PrologueEnd".to_string());
                    }
                    if line.is_epilogue_begin {
                        lines.push("EpilogueBegin".to_string());
                    }
                    if line.discriminator != 0 {
                        lines.push(format!("Discriminator {}", line.discriminator));
                    }
                }
            }
            _ => {}
        }
        lines
    }
}

impl ScopePrinter for TextPrinter<'_> {
    fn settings(&self) -> &PrintSettings {
        self.settings
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn header(&self, tree: &ScopeTree, out: &mut String) {
        let root = &tree[tree.root()];
        out.push_str(&self.attributes_prefix(tree, root));
        out.push_str(&" ".repeat(7));
        out.push_str(&self.object_body(tree, root));
        out.push('\n');
    }

    fn print_object(&self, tree: &ScopeTree, id: NodeId, out: &mut String) -> cu::Result<()> {
        let object = &tree[id];
        let body = self.object_body(tree, object);
        if body.is_empty() {
            return Ok(());
        }
        out.push_str(&self.attributes_prefix(tree, object));
        out.push_str(&self.line_column(object));
        let indent = self.indent(object.level);
        out.push_str(&indent);
        out.push_str(&body);
        out.push('\n');

        let detail_indent =
            " ".repeat(self.prefix_width() + 7 + indent.len() + 4);
        for line in self.attribute_lines(tree, object) {
            out.push_str(&detail_indent);
            out.push_str("- ");
            out.push_str(&line);
            out.push('\n');
        }
        Ok(())
    }
}

/// Last path component of a file name
fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_tree;
    use scopetree::{Goff, ScopeData, SymbolData, TypeData};

    fn settings() -> PrintSettings {
        let mut settings = PrintSettings::brief();
        settings.show_indent = false;
        settings
    }

    fn tree_with_cu() -> (ScopeTree, NodeId) {
        let mut tree = ScopeTree::new("in.o");
        let root = tree.root();
        let mut cu = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::CompileUnit)), 0);
        cu.name = Some("a.cpp".to_string());
        let cu = tree.add_object(root, cu).unwrap();
        (tree, cu)
    }

    fn body_of(tree: &ScopeTree, id: NodeId, settings: &PrintSettings) -> String {
        TextPrinter::new(settings).object_body(tree, &tree[id])
    }

    #[test]
    fn test_namespace_body() {
        let (mut tree, cu) = tree_with_cu();
        let ns = tree
            .add_object(
                cu,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Namespace)), 1),
            )
            .unwrap();
        let settings = settings();
        assert_eq!(body_of(&tree, ns, &settings), "{Namespace}");

        tree[ns].name = Some("TestNamespace".to_string());
        tree[ns].qualified_name = Some("Base::".to_string());
        assert_eq!(
            body_of(&tree, ns, &settings),
            "{Namespace} \"Base::TestNamespace\""
        );
    }

    #[test]
    fn test_enum_body() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = ScopeData::new(ScopeKind::Enumeration);
        data.is_enum_class = true;
        let mut obj = Object::new(ObjectData::Scope(data), 1);
        obj.name = Some("days".to_string());
        let enum_id = tree.add_object(cu, obj).unwrap();
        let mut base = Object::new(ObjectData::Type(TypeData::new(TypeKind::Base)), 1);
        base.name = Some("unsigned int".to_string());
        let base = tree.add_object(cu, base).unwrap();
        tree[enum_id].type_ref = Some(base);

        let settings = settings();
        assert_eq!(
            body_of(&tree, enum_id, &settings),
            "{Enum} class \"days\" -> \"unsigned int\""
        );
    }

    #[test]
    fn test_function_body_and_attributes() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = ScopeData::new(ScopeKind::Subprogram);
        data.is_static = true;
        data.is_declared_inline = true;
        let mut obj = Object::new(ObjectData::Scope(data), 1);
        obj.name = Some("sf".to_string());
        let func = tree.add_object(cu, obj).unwrap();

        let mut settings = settings();
        settings.show_void = false;
        assert_eq!(
            body_of(&tree, func, &settings),
            "{Function} static inline \"sf\" -> \"\""
        );
        let printer = TextPrinter::new(&settings);
        assert_eq!(
            printer.attribute_lines(&tree, &tree[func]),
            vec!["No declaration".to_string()]
        );
    }

    #[test]
    fn test_function_declaration_reference() {
        let (mut tree, cu) = tree_with_cu();
        let mut decl = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Subprogram)), 1);
        decl.file_name = Some("test/file.h".to_string());
        decl.line = Some(24);
        let decl = tree.add_object(cu, decl).unwrap();
        let func = tree
            .add_object(
                cu,
                Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Subprogram)), 1),
            )
            .unwrap();
        tree[func].reference = Some(decl);

        let settings = settings();
        let printer = TextPrinter::new(&settings);
        assert_eq!(
            printer.attribute_lines(&tree, &tree[func]),
            vec!["Declaration @ file.h,24".to_string()]
        );

        tree[decl].invalid_file_name = true;
        assert_eq!(
            printer.attribute_lines(&tree, &tree[func]),
            vec!["Declaration @ ?,24".to_string()]
        );
    }

    #[test]
    fn test_member_access() {
        let (mut tree, cu) = tree_with_cu();
        let mut data = SymbolData::new(SymbolKind::Member);
        data.access = AccessSpecifier::Private;
        let mut obj = Object::new(ObjectData::Symbol(data), 1);
        obj.name = Some("m".to_string());
        obj.qualified_name = Some("A::".to_string());
        let member = tree.add_object(cu, obj).unwrap();
        let mut base = Object::new(ObjectData::Type(TypeData::new(TypeKind::Base)), 1);
        base.name = Some("int".to_string());
        let base = tree.add_object(cu, base).unwrap();
        tree[member].type_ref = Some(base);

        assert_eq!(
            body_of(&tree, member, &settings()),
            "{Member} private \"A::m\" -> \"int\""
        );
    }

    #[test]
    fn test_class_inheritance_attributes() {
        let (mut tree, cu) = tree_with_cu();
        let mut base = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Class)), 1);
        base.name = Some("Base".to_string());
        let base = tree.add_object(cu, base).unwrap();
        let mut derived = Object::new(ObjectData::Scope(ScopeData::new(ScopeKind::Class)), 1);
        derived.name = Some("Derived".to_string());
        let derived = tree.add_object(cu, derived).unwrap();
        let mut data = TypeData::new(TypeKind::Inheritance);
        data.access = AccessSpecifier::Public;
        let inherit = tree
            .add_object(derived, Object::new(ObjectData::Type(data), 2))
            .unwrap();
        tree[inherit].type_ref = Some(base);

        let settings = settings();
        let printer = TextPrinter::new(&settings);
        assert_eq!(
            printer.attribute_lines(&tree, &tree[derived]),
            vec!["public \"Base\"".to_string()]
        );
    }

    #[test]
    fn test_attribute_prefix_widths() {
        let (mut tree, cu) = tree_with_cu();
        tree[cu].offset = Goff(0x0b);
        tree[cu].tag = Some(gimli::constants::DW_TAG_compile_unit);
        tree[cu].is_global = true;

        let mut settings = settings();
        settings.show_dwarf_offset = true;
        settings.show_dwarf_parent = true;
        settings.show_level = true;
        settings.show_is_global = true;
        settings.show_dwarf_tag = true;

        let printer = TextPrinter::new(&settings);
        let prefix = printer.attributes_prefix(&tree, &tree[cu]);
        assert_eq!(
            prefix,
            "[0x0000000b][0x00000000]000X[DW_TAG_compile_unit]                     "
        );
        let root_prefix = printer.attributes_prefix(&tree, &tree[tree.root()]);
        assert_eq!(root_prefix.len(), prefix.len());
        assert!(root_prefix.trim().is_empty());
    }

    #[test]
    fn test_full_text_output() -> cu::Result<()> {
        let (mut tree, cu) = tree_with_cu();
        let mut var = Object::new(
            ObjectData::Symbol(SymbolData::new(SymbolKind::Variable)),
            1,
        );
        var.name = Some("v".to_string());
        var.line = Some(3);
        tree.add_object(cu, var).unwrap();

        let mut settings = PrintSettings::brief();
        settings.show_void = false;
        let printer = TextPrinter::new(&settings);
        let mut out = String::new();
        print_tree(&printer, &tree, &mut out)?;
        let expected = "       {InputFile} \"in.o\"\n\
                        \u{20}        {CompileUnit} \"a.cpp\"\n\
                        \u{20}   3      {Variable} \"v\" -> \"\"\n";
        assert_eq!(out, expected);
        Ok(())
    }
}
