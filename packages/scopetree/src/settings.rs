use regex::Regex;

use crate::{Object, ObjectData, ScopeKind, SymbolKind, TypeKind};

/// Key used to order siblings in every scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Line,
    Name,
    Offset,
}

/// Output formats the driver can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Yaml,
}

/// Rendering configuration consumed by the printers
///
/// A plain flag struct: the CLI layer fills it in, everything downstream
/// only reads it.
#[derive(Debug, Default)]
pub struct PrintSettings {
    pub sort_key: SortKey,

    // Object kind visibility
    pub show_alias: bool,
    pub show_block: bool,
    pub show_block_attributes: bool,
    pub show_class: bool,
    pub show_enum: bool,
    pub show_function: bool,
    pub show_member: bool,
    pub show_namespace: bool,
    pub show_parameter: bool,
    pub show_primitive_type: bool,
    pub show_struct: bool,
    pub show_template: bool,
    pub show_union: bool,
    pub show_using: bool,
    pub show_variable: bool,
    pub show_codeline: bool,
    pub show_codeline_attributes: bool,

    // Per-line attribute prefixes
    pub show_dwarf_offset: bool,
    pub show_dwarf_parent: bool,
    pub show_dwarf_tag: bool,
    pub show_level: bool,
    pub show_is_global: bool,

    // Formatting switches
    pub show_indent: bool,
    pub show_void: bool,
    pub show_zero_line: bool,

    // Name filters. Plain filters print only matching objects, tree
    // filters also print the whole subtree of a match.
    pub filters: Vec<Regex>,
    pub filter_anys: Vec<String>,
    pub tree_filters: Vec<Regex>,
    pub tree_filter_anys: Vec<String>,
}

impl PrintSettings {
    /// The default view: every object kind except primitive types and
    /// code lines
    pub fn brief() -> Self {
        let mut settings = Self {
            show_indent: true,
            show_void: true,
            ..Default::default()
        };
        settings.set_show_kinds(true);
        settings.show_primitive_type = false;
        settings.show_codeline = false;
        settings
    }

    /// Set every object-kind flag at once (`--show-all` / `--show-none`)
    pub fn set_show_kinds(&mut self, on: bool) {
        self.show_alias = on;
        self.show_block = on;
        self.show_class = on;
        self.show_enum = on;
        self.show_function = on;
        self.show_member = on;
        self.show_namespace = on;
        self.show_parameter = on;
        self.show_primitive_type = on;
        self.show_struct = on;
        self.show_template = on;
        self.show_union = on;
        self.show_using = on;
        self.show_variable = on;
        self.show_codeline = on;
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
            || !self.filter_anys.is_empty()
            || !self.tree_filters.is_empty()
            || !self.tree_filter_anys.is_empty()
    }

    /// Whether this object's kind is enabled for printing
    pub fn shows_kind(&self, object: &Object) -> bool {
        match &object.data {
            ObjectData::Scope(s) => match s.kind() {
                ScopeKind::Root | ScopeKind::CompileUnit => true,
                ScopeKind::Namespace => self.show_namespace,
                ScopeKind::Class => self.show_class,
                ScopeKind::Struct => self.show_struct,
                ScopeKind::Union => self.show_union,
                ScopeKind::Enumeration => self.show_enum,
                ScopeKind::Array => false,
                ScopeKind::TemplateAlias => self.show_alias,
                ScopeKind::TemplatePack => self.show_template,
                k if k.is_function() => self.show_function,
                k if k.is_block() => self.show_block,
                _ => false,
            },
            ObjectData::Type(t) => match t.kind {
                TypeKind::Base => self.show_primitive_type,
                TypeKind::TypeDef => self.show_alias,
                k if k.is_template_param() => self.show_template,
                k if k.is_import() => self.show_using,
                _ => false,
            },
            ObjectData::Symbol(s) => match s.kind {
                SymbolKind::Parameter | SymbolKind::UnspecifiedParameter => self.show_parameter,
                SymbolKind::Member => self.show_member,
                SymbolKind::Variable => self.show_variable,
            },
            ObjectData::Line(_) => self.show_codeline,
        }
    }

    /// Whether the object name matches a plain filter
    pub fn matches_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|re| re.is_match(name))
            || self.filter_anys.iter().any(|pat| name.contains(pat))
    }

    /// Whether the object name matches a tree (with-children) filter
    pub fn matches_tree_filter(&self, name: &str) -> bool {
        self.tree_filters.iter().any(|re| re.is_match(name))
            || self.tree_filter_anys.iter().any(|pat| name.contains(pat))
    }
}
