use std::borrow::Cow;
use std::sync::Arc;

use cu::pre::*;
use gimli::{AttributeValue, DwAt, UnitSectionOffset};
use scopetree::Goff;

use crate::dwarf::{DebugData, Die, EntriesTree, In};

pub struct UnitIter {
    pub(crate) debug_info_iter: gimli::DebugInfoUnitHeadersIter<In<'static>>,
    pub(crate) dwarf: Arc<DebugData>,
}

impl UnitIter {
    pub fn next_unit(&mut self) -> cu::Result<Option<Unit>> {
        let header = cu::check!(
            self.debug_info_iter.next(),
            "failed to read next unit header"
        )?;
        let Some(header) = header else {
            return Ok(None);
        };
        let offset = match header.offset() {
            UnitSectionOffset::DebugInfoOffset(o) => o.0,
            UnitSectionOffset::DebugTypesOffset(o) => {
                cu::bail!(
                    "failed to get DWARF offset for compilation unit: expecting DebugInfoOffset, got {o:?}"
                );
            }
        };
        let next_offset = offset + header.length_including_self();
        let unit = cu::check!(
            gimli::Unit::new(&self.dwarf.dwarf, header),
            "failed to create debug info unit"
        )?;
        let mut unit = Unit {
            unit,
            dwarf: Arc::clone(&self.dwarf),
            name: String::new(),
            offset: Goff(offset as u64),
            next_offset: Goff(next_offset as u64),
        };

        let mut tree = cu::check!(
            unit.tree(),
            "failed to parse root node when creating debug info unit"
        )?;
        let root = cu::check!(
            tree.root(),
            "failed to parse root node when creating debug info unit"
        )?;
        if let Some(name) = root.entry().name_opt()? {
            unit.name = name.to_string();
        }
        Ok(Some(unit))
    }
}

/// One line-table row of a compile unit
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEntry {
    pub line: Option<u64>,
    pub file: u64,
    pub address: u64,
    pub discriminator: u64,
    pub is_stmt: bool,
    pub basic_block: bool,
    pub end_sequence: bool,
    pub prologue_end: bool,
    pub epilogue_begin: bool,
}

/// Holder of a Unit in .debug_info
#[derive(Display)]
#[display("compilation unit at {} ({})", self.offset, self.name)]
pub struct Unit {
    pub(crate) unit: gimli::Unit<In<'static>>,
    pub(crate) dwarf: Arc<DebugData>,
    /// name of the unit (typically file name)
    pub name: String,
    /// global offset of the unit header
    pub offset: Goff,
    /// global offset of the next unit header; together with `offset`
    /// this delimits every DIE offset belonging to this unit
    pub next_offset: Goff,
}

impl Unit {
    pub fn tree(&self) -> cu::Result<EntriesTree<'_>> {
        self.entries_tree(None)
    }

    pub(crate) fn tree_at(&self, offset: gimli::UnitOffset) -> cu::Result<EntriesTree<'_>> {
        self.entries_tree(Some(offset))
    }

    fn entries_tree(&self, offset: Option<gimli::UnitOffset>) -> cu::Result<EntriesTree<'_>> {
        let tree = cu::check!(
            self.unit.entries_tree(offset),
            "failed to parse entries for {self}"
        )?;
        Ok(EntriesTree { unit: self, tree })
    }

    /// Get a single entry at a unit-local offset
    pub fn entry_at<'x>(&'x self, offset: gimli::UnitOffset) -> cu::Result<Die<'x, 'x>> {
        let entry = cu::check!(
            self.unit.entry(offset),
            "failed to read entry at {} for {self}",
            self.goff(offset)
        )?;
        Ok(Die {
            unit: self,
            entry: Cow::Owned(entry),
        })
    }

    /// Convert a unit-local offset to a global offset
    pub fn goff(&self, offset: gimli::UnitOffset) -> Goff {
        Goff(offset.0 as u64 + self.offset.0)
    }

    /// Whether a global offset belongs to this unit
    pub fn contains(&self, goff: Goff) -> bool {
        goff >= self.offset && goff < self.next_offset
    }

    /// The per-unit source file table. File id 0 always maps to the
    /// empty string; relative paths are joined with their directory and
    /// the compilation directory.
    pub fn source_files(&self) -> cu::Result<Vec<String>> {
        let mut files = vec![String::new()];
        let Some(program) = &self.unit.line_program else {
            return Ok(files);
        };
        let comp_dir = match &self.unit.comp_dir {
            Some(dir) => cu::check!(dir.to_string(), "failed to decode comp_dir for {self}")?,
            None => "",
        };
        let header = program.header();
        for file in header.file_names() {
            let name = self.attr_string(file.path_name())?.to_string();
            if name.starts_with('/') {
                files.push(name);
                continue;
            }
            let dir = match file.directory(header) {
                Some(dir) => self.attr_string(dir)?.to_string(),
                None => String::new(),
            };
            let full = if dir.starts_with('/') {
                format!("{dir}/{name}")
            } else if dir.is_empty() {
                join_dir(comp_dir, &name)
            } else {
                join_dir(comp_dir, &format!("{dir}/{name}"))
            };
            files.push(full);
        }
        Ok(files)
    }

    /// The unit's line table rows in DWARF order
    pub fn line_rows(&self) -> cu::Result<Vec<LineEntry>> {
        let Some(program) = self.unit.line_program.clone() else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        let mut rows = program.rows();
        loop {
            let row = cu::check!(rows.next_row(), "failed to read line table row for {self}")?;
            let Some((_, row)) = row else {
                break;
            };
            entries.push(LineEntry {
                line: row.line().map(|line| line.get()),
                file: row.file_index(),
                address: row.address(),
                discriminator: row.discriminator(),
                is_stmt: row.is_stmt(),
                basic_block: row.basic_block(),
                end_sequence: row.end_sequence(),
                prologue_end: row.prologue_end(),
                epilogue_begin: row.epilogue_begin(),
            });
        }
        Ok(entries)
    }

    /// Get an attribute value as string
    pub(crate) fn attr_string<'x>(
        &'x self,
        value: AttributeValue<In<'static>>,
    ) -> cu::Result<&'x str> {
        let value = cu::check!(
            self.dwarf.dwarf.attr_string(&self.unit, value),
            "failed to get attribute value as string in {self}"
        )?;
        cu::check!(
            value.to_string(),
            "failed to decode attribute value as string in {self}"
        )
    }

    /// Get an attribute value as an unsigned integer
    pub(crate) fn attr_unsigned(
        &self,
        offset: Goff,
        at: DwAt,
        attr: AttributeValue<In<'_>>,
    ) -> cu::Result<u64> {
        match attr {
            AttributeValue::Data1(x) => Ok(x as u64),
            AttributeValue::Data2(x) => Ok(x as u64),
            AttributeValue::Data4(x) => Ok(x as u64),
            AttributeValue::Data8(x) => Ok(x),
            AttributeValue::Udata(x) => Ok(x),
            AttributeValue::Sdata(x) => Ok(x as u64),
            other => {
                cu::bail!("expecting unsigned data for entry {offset}, attr {at}, got: {other:?}")
            }
        }
    }
}

fn join_dir(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
