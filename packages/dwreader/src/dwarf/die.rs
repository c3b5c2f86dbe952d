use std::borrow::Cow;

use cu::pre::*;
use gimli::AttributeValue;
use gimli::constants::*;
use scopetree::Goff;

use crate::dwarf::{In, Tag, Unit};

/// Typed value of a DWARF attribute, dispatched on the attribute form.
///
/// `Empty` means the DIE has no such attribute; `UnknownForm` means the
/// form is not one this reader understands. Neither aborts traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Empty,
    UnknownForm,
    Reference(Goff),
    Address(u64),
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Bytes(Vec<u8>),
    Exprloc(Vec<u8>),
    String(String),
}

impl AttrValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

pub struct EntriesTree<'x> {
    pub(crate) unit: &'x Unit,
    pub(crate) tree: gimli::EntriesTree<'x, 'x, In<'static>>,
}

impl<'x> EntriesTree<'x> {
    pub fn root(&mut self) -> cu::Result<DieNode<'x, '_>> {
        let node = cu::check!(
            self.tree.root(),
            "failed to parse tree node in {}",
            self.unit
        )?;
        Ok(DieNode {
            unit: self.unit,
            node,
        })
    }
}

pub struct DieNode<'x, 't> {
    pub(crate) node: gimli::EntriesTreeNode<'x, 'x, 't, In<'static>>,
    pub(crate) unit: &'x Unit,
}

impl<'x> DieNode<'x, '_> {
    pub fn entry(&self) -> Die<'x, '_> {
        let entry = self.node.entry();
        Die {
            unit: self.unit,
            entry: Cow::Borrowed(entry),
        }
    }

    pub fn goff(&self) -> Goff {
        self.unit.goff(self.node.entry().offset())
    }

    /// Execute f on each direct child node (does not include this node)
    pub fn for_each_child<F>(self, mut f: F) -> cu::Result<()>
    where
        F: for<'t> FnMut(DieNode<'x, 't>) -> cu::Result<()>,
    {
        let offset = self.goff();
        let mut children = self.node.children();
        while let Some(child) = cu::check!(
            children.next(),
            "failed to read a child for entry at {offset} in {}",
            self.unit
        )? {
            let node = DieNode {
                node: child,
                unit: self.unit,
            };
            let child_offset = node.goff();
            cu::check!(
                f(node),
                "error while processing child entry at {child_offset}"
            )?;
        }
        Ok(())
    }
}

pub struct Die<'x, 'n> {
    pub(crate) unit: &'x Unit,
    pub(crate) entry: Cow<'n, gimli::DebuggingInformationEntry<'x, 'x, In<'static>, usize>>,
}

impl<'x> Die<'x, '_> {
    /// Get the global offset of this entry
    pub fn goff(&self) -> Goff {
        self.unit.goff(self.entry.offset())
    }

    /// Get the unit this entry belongs to
    pub fn unit(&self) -> &'x Unit {
        self.unit
    }

    pub fn tag(&self) -> Tag {
        self.entry.tag()
    }

    /// Get the DW_AT_name of the entry, if it exists
    pub fn name_opt(&self) -> cu::Result<Option<&str>> {
        self.str_opt(DW_AT_name)
    }

    /// Whether the entry carries the attribute at all
    pub fn has_attr(&self, attr: DwAt) -> cu::Result<bool> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset} in {}",
            self.unit
        )?;
        Ok(value.is_some())
    }

    /// Get the attribute as a typed value, dispatching on its form
    pub fn value(&self, attr: DwAt) -> cu::Result<AttrValue> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset} in {}",
            self.unit
        )?;
        let Some(value) = value else {
            return Ok(AttrValue::Empty);
        };
        let value = match value {
            AttributeValue::UnitRef(local) => AttrValue::Reference(self.unit.goff(local)),
            AttributeValue::DebugInfoRef(global) => AttrValue::Reference(Goff(global.0 as u64)),
            AttributeValue::Addr(x) => AttrValue::Address(x),
            AttributeValue::Flag(x) => AttrValue::Boolean(x),
            AttributeValue::Data1(x) => AttrValue::Unsigned(x as u64),
            AttributeValue::Data2(x) => AttrValue::Unsigned(x as u64),
            AttributeValue::Data4(x) => AttrValue::Unsigned(x as u64),
            AttributeValue::Data8(x) => AttrValue::Unsigned(x),
            AttributeValue::Udata(x) => AttrValue::Unsigned(x),
            AttributeValue::Sdata(x) => AttrValue::Signed(x),
            AttributeValue::SecOffset(x) => AttrValue::Unsigned(x as u64),
            AttributeValue::FileIndex(x) => AttrValue::Unsigned(x),
            // constant-class attributes decay to their numeric value
            AttributeValue::Encoding(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Inline(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Accessibility(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Virtuality(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Visibility(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Language(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::CallingConvention(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Ordering(x) => AttrValue::Unsigned(x.0 as u64),
            AttributeValue::Block(block) => AttrValue::Bytes(block.slice().to_vec()),
            AttributeValue::Exprloc(expr) => AttrValue::Exprloc(expr.0.slice().to_vec()),
            value @ (AttributeValue::String(_)
            | AttributeValue::DebugStrRef(_)
            | AttributeValue::DebugLineStrRef(_)
            | AttributeValue::DebugStrRefSup(_)) => {
                AttrValue::String(self.unit.attr_string(value)?.to_string())
            }
            _ => AttrValue::UnknownForm,
        };
        Ok(value)
    }

    /// Get a string attribute value
    pub fn str_opt(&self, attr: DwAt) -> cu::Result<Option<&str>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset} in {}",
            self.unit
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let value = cu::check!(
            self.unit.attr_string(value),
            "failed to read value for {attr} at {offset} in {}",
            self.unit
        )?;
        Ok(Some(value))
    }

    /// Get an unsigned integer attribute value, allowing it to be missing
    pub fn uint_opt(&self, attr: DwAt) -> cu::Result<Option<u64>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at offset {offset}"
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let value = self.unit.attr_unsigned(offset, attr, value)?;
        Ok(Some(value))
    }

    /// Get an attribute of the entry as a flag
    pub fn flag(&self, attr: DwAt) -> cu::Result<bool> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset}"
        )?;
        match value {
            None => Ok(false),
            Some(AttributeValue::Flag(x)) => Ok(x),
            _ => {
                cu::bail!("expecting {attr} to be a Flag, at entry {offset}");
            }
        }
    }

    /// Read an attribute expected to reference another DIE, returning
    /// the referenced global offset
    pub fn ref_opt(&self, attr: DwAt) -> cu::Result<Option<Goff>> {
        match self.value(attr)? {
            AttrValue::Reference(goff) => Ok(Some(goff)),
            _ => Ok(None),
        }
    }

    /// Execute f on each direct child node (does not include this node)
    pub fn for_each_child<F>(&self, f: F) -> cu::Result<()>
    where
        F: for<'t> FnMut(DieNode<'x, 't>) -> cu::Result<()>,
    {
        let mut tree = self.unit.tree_at(self.entry.offset())?;
        let node = tree.root()?;
        node.for_each_child(f)
    }
}
