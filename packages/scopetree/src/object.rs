use gimli::DwTag;

use crate::{Goff, NodeId};

/// Access specifier attached to members and inheritance records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessSpecifier {
    #[default]
    Unspecified,
    Private,
    Protected,
    Public,
}

impl AccessSpecifier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Public => "public",
        }
    }
}

/// Variant of a Scope object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Synthetic root named after the input file
    Root,
    CompileUnit,
    Namespace,
    Class,
    Struct,
    Union,
    Enumeration,
    /// Array type; subrange children carry the bracketed extents
    Array,
    Subprogram,
    SubroutineType,
    InlinedSubroutine,
    EntryPoint,
    Label,
    LexicalBlock,
    TryBlock,
    CatchBlock,
    TemplateAlias,
    TemplatePack,
}

impl ScopeKind {
    pub const fn is_function(self) -> bool {
        matches!(
            self,
            Self::Subprogram
                | Self::SubroutineType
                | Self::InlinedSubroutine
                | Self::EntryPoint
                | Self::Label
        )
    }

    pub const fn is_block(self) -> bool {
        matches!(self, Self::LexicalBlock | Self::TryBlock | Self::CatchBlock)
    }

    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }

    /// True for the scopes that contribute a `Name::` segment to the
    /// qualified names of their descendants
    pub const fn qualifies_names(self) -> bool {
        matches!(
            self,
            Self::Namespace | Self::Class | Self::Struct | Self::Union | Self::Enumeration
        )
    }
}

/// Variant of a Type object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Base,
    Const,
    Volatile,
    Pointer,
    PointerMember,
    Reference,
    Restrict,
    RvalueReference,
    Unspecified,
    TypeDef,
    Enumerator,
    Subrange,
    TemplateValue,
    TemplateType,
    TemplateTemplate,
    ImportedDeclaration,
    ImportedModule,
    Inheritance,
}

impl TypeKind {
    pub const fn is_template_param(self) -> bool {
        matches!(
            self,
            Self::TemplateValue | Self::TemplateType | Self::TemplateTemplate
        )
    }

    pub const fn is_import(self) -> bool {
        matches!(self, Self::ImportedDeclaration | Self::ImportedModule)
    }

    /// Modifiers compose their name from the pointee type name
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Const
                | Self::Volatile
                | Self::Pointer
                | Self::PointerMember
                | Self::Reference
                | Self::Restrict
                | Self::RvalueReference
        )
    }
}

/// Variant of a Symbol object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Parameter,
    UnspecifiedParameter,
    Member,
    Variable,
}

/// Scope payload: container objects that own children of all families
#[derive(Debug, Clone)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub children: Vec<NodeId>,
    pub is_template: bool,
    pub is_declaration: bool,
    pub is_static: bool,
    pub is_declared_inline: bool,
    pub is_inlined: bool,
    pub is_enum_class: bool,
    /// Per-CU mapping from DWARF file id to path; id 0 is always ""
    pub file_table: Vec<String>,
}

impl ScopeData {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            is_template: false,
            is_declaration: false,
            is_static: false,
            is_declared_inline: false,
            // DW_TAG_inlined_subroutine is inlined by definition
            is_inlined: kind == ScopeKind::InlinedSubroutine,
            is_enum_class: false,
            file_table: Vec::new(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }
}

/// Type payload: non-container types and type modifiers
#[derive(Debug, Clone)]
pub struct TypeData {
    pub kind: TypeKind,
    /// DW_AT_byte_size, base types only
    pub byte_size: Option<u64>,
    /// Enumerator / template parameter value as a decimal or name string
    pub value: Option<String>,
    /// Only meaningful for inheritance records
    pub access: AccessSpecifier,
}

impl TypeData {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            byte_size: None,
            value: None,
            access: AccessSpecifier::Unspecified,
        }
    }
}

/// Symbol payload: named program entities, never containers
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub kind: SymbolKind,
    /// Only meaningful for members
    pub access: AccessSpecifier,
}

impl SymbolData {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            access: AccessSpecifier::Unspecified,
        }
    }
}

/// Line payload: one source-line record of a compile unit's line table
#[derive(Debug, Clone, Default)]
pub struct LineData {
    pub address: u64,
    pub discriminator: u64,
    pub is_new_statement: bool,
    pub is_new_basic_block: bool,
    pub is_line_end_sequence: bool,
    pub is_epilogue_begin: bool,
    pub is_prologue_end: bool,
}

/// Family payload of an [`Object`]
#[derive(Debug, Clone)]
pub enum ObjectData {
    Scope(ScopeData),
    Type(TypeData),
    Symbol(SymbolData),
    Line(LineData),
}

/// One node of the scope tree
///
/// Common attributes live here; family-specific state lives in `data`.
/// `parent`, `type_ref` and `reference` are non-owning arena links; the
/// children vector on the Scope payload is the owning edge.
#[derive(Debug, Clone)]
pub struct Object {
    pub data: ObjectData,
    /// Nesting depth. The root is -1, compile units are 0.
    pub level: i32,
    pub name: Option<String>,
    /// Qualified name prefix such as `"Outer::Inner::"`
    pub qualified_name: Option<String>,
    pub type_ref: Option<NodeId>,
    pub reference: Option<NodeId>,
    pub parent: Option<NodeId>,
    /// Global DIE offset (line records reuse the row address)
    pub offset: Goff,
    pub tag: Option<DwTag>,
    pub line: Option<u64>,
    /// Source file path resolved through the CU file table at ingest
    pub file_name: Option<String>,
    /// Raw DWARF file id, kept when it falls outside the file table
    pub file_index: Option<u64>,
    pub invalid_file_name: bool,
    pub is_global: bool,
}

impl Object {
    pub fn new(data: ObjectData, level: i32) -> Self {
        Self {
            data,
            level,
            name: None,
            qualified_name: None,
            type_ref: None,
            reference: None,
            parent: None,
            offset: Goff(0),
            tag: None,
            line: None,
            file_name: None,
            file_index: None,
            invalid_file_name: false,
            is_global: false,
        }
    }

    pub fn is_scope(&self) -> bool {
        matches!(self.data, ObjectData::Scope(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.data, ObjectData::Symbol(_))
    }

    pub fn is_line(&self) -> bool {
        matches!(self.data, ObjectData::Line(_))
    }

    pub fn as_scope(&self) -> Option<&ScopeData> {
        match &self.data {
            ObjectData::Scope(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scope_mut(&mut self) -> Option<&mut ScopeData> {
        match &mut self.data {
            ObjectData::Scope(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeData> {
        match &self.data {
            ObjectData::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_type_mut(&mut self) -> Option<&mut TypeData> {
        match &mut self.data {
            ObjectData::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&SymbolData> {
        match &self.data {
            ObjectData::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol_mut(&mut self) -> Option<&mut SymbolData> {
        match &mut self.data {
            ObjectData::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineData> {
        match &self.data {
            ObjectData::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn scope_kind(&self) -> Option<ScopeKind> {
        self.as_scope().map(|s| s.kind())
    }

    pub fn type_kind(&self) -> Option<TypeKind> {
        self.as_type().map(|t| t.kind)
    }

    pub fn symbol_kind(&self) -> Option<SymbolKind> {
        self.as_symbol().map(|s| s.kind)
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            ObjectData::Scope(s) => &s.children,
            _ => &[],
        }
    }

    /// The object name, or "" when unnamed
    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Qualified prefix plus name, as printed by the renderers
    pub fn qualified_name_str(&self) -> String {
        match &self.qualified_name {
            Some(prefix) => format!("{prefix}{}", self.name_str()),
            None => self.name_str().to_string(),
        }
    }

    /// Label identifying the object variant in output and sorting
    pub fn kind_label(&self) -> &'static str {
        match &self.data {
            ObjectData::Scope(s) => match s.kind() {
                ScopeKind::Root => "InputFile",
                ScopeKind::CompileUnit => "CompileUnit",
                ScopeKind::Namespace => "Namespace",
                ScopeKind::Class => "Class",
                ScopeKind::Struct => "Struct",
                ScopeKind::Union => "Union",
                ScopeKind::Enumeration => "Enum",
                ScopeKind::Array => "Array",
                k if k.is_function() => "Function",
                k if k.is_block() => "Block",
                ScopeKind::TemplateAlias => "Alias",
                ScopeKind::TemplatePack => "TemplateParameter",
                _ => "Scope",
            },
            ObjectData::Type(t) => match t.kind {
                TypeKind::Base => "PrimitiveType",
                TypeKind::Const => "Const",
                TypeKind::Volatile => "Volatile",
                TypeKind::Pointer => "Pointer",
                TypeKind::PointerMember => "PointerMember",
                TypeKind::Reference => "Reference",
                TypeKind::Restrict => "Restrict",
                TypeKind::RvalueReference => "RvalueReference",
                TypeKind::Unspecified => "Unspecified",
                TypeKind::TypeDef => "Alias",
                TypeKind::Enumerator => "Enumerator",
                TypeKind::Subrange => "Subrange",
                TypeKind::TemplateValue
                | TypeKind::TemplateType
                | TypeKind::TemplateTemplate => "TemplateParameter",
                TypeKind::ImportedDeclaration | TypeKind::ImportedModule => "Using",
                TypeKind::Inheritance => "Inherits",
            },
            ObjectData::Symbol(s) => match s.kind {
                SymbolKind::Parameter | SymbolKind::UnspecifiedParameter => "Parameter",
                SymbolKind::Member => "Member",
                SymbolKind::Variable => "Variable",
            },
            ObjectData::Line(_) => "CodeLine",
        }
    }

    /// Whether this object gets its own entry in the rendered output.
    /// Modifier types, subranges, enumerators and inheritance records only
    /// surface through the objects that use them.
    pub fn is_printed_as_object(&self) -> bool {
        match &self.data {
            ObjectData::Scope(s) => !matches!(s.kind(), ScopeKind::Root | ScopeKind::Array),
            ObjectData::Type(t) => matches!(
                t.kind,
                TypeKind::Base
                    | TypeKind::TypeDef
                    | TypeKind::TemplateValue
                    | TypeKind::TemplateType
                    | TypeKind::TemplateTemplate
                    | TypeKind::ImportedDeclaration
                    | TypeKind::ImportedModule
            ),
            ObjectData::Symbol(_) => true,
            ObjectData::Line(_) => true,
        }
    }
}
