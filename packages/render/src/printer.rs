use std::collections::BTreeMap;
use std::path::Path;

use cu::pre::*;
use scopetree::error::ErrorCode;
use scopetree::{NodeId, Object, PrintSettings, ScopeKind, ScopeTree, fatal};

/// A renderer over the completed tree.
///
/// Implementations only format; the traversal, filter evaluation and
/// split-output plumbing live here so text and YAML stay in lockstep.
/// Everything writes into an explicit output buffer.
pub trait ScopePrinter {
    fn settings(&self) -> &PrintSettings;
    fn file_extension(&self) -> &'static str;
    /// Written once before any object
    fn header(&self, tree: &ScopeTree, out: &mut String);
    /// Written once after all objects
    fn footer(&self, _out: &mut String) {}
    /// Render a single object (no recursion)
    fn print_object(&self, tree: &ScopeTree, id: NodeId, out: &mut String) -> cu::Result<()>;
}

/// Render the whole tree into one buffer
pub fn print_tree(
    printer: &dyn ScopePrinter,
    tree: &ScopeTree,
    out: &mut String,
) -> cu::Result<()> {
    printer.header(tree, out);
    for child in tree[tree.root()].children() {
        print_subtree(printer, tree, *child, out, false)?;
    }
    printer.footer(out);
    Ok(())
}

/// Render each compile unit into its own file under `dir`. File names
/// are the flattened CU names plus the renderer's extension.
pub fn print_split(printer: &dyn ScopePrinter, tree: &ScopeTree, dir: &Path) -> cu::Result<()> {
    if cu::fs::make_dir(dir).is_err() {
        fatal!(ErrorCode::FileIoMakeDirFailure, "{}", dir.display());
    }
    for cu_id in tree.compile_units() {
        let file_name = format!(
            "{}.{}",
            flatten_scope_name(tree[cu_id].name_str()),
            printer.file_extension()
        );
        let path = dir.join(file_name);
        let mut out = String::new();
        printer.header(tree, &mut out);
        print_subtree(printer, tree, cu_id, &mut out, false)?;
        printer.footer(&mut out);
        if cu::fs::write(&path, &out).is_err() {
            fatal!(ErrorCode::SplitUnableToOpenFile, "{}", path.display());
        }
    }
    Ok(())
}

fn print_subtree(
    printer: &dyn ScopePrinter,
    tree: &ScopeTree,
    id: NodeId,
    out: &mut String,
    in_matched_tree: bool,
) -> cu::Result<()> {
    let settings = printer.settings();
    let object = &tree[id];
    let matched_tree =
        in_matched_tree || settings.matches_tree_filter(object.name_str());
    if should_print(settings, object, matched_tree) {
        printer.print_object(tree, id, out)?;
    }
    for child in object.children() {
        print_subtree(printer, tree, *child, out, matched_tree)?;
    }
    Ok(())
}

fn should_print(settings: &PrintSettings, object: &Object, matched_tree: bool) -> bool {
    if !object.is_printed_as_object() {
        return false;
    }
    if !settings.shows_kind(object) {
        return false;
    }
    // compile units frame the output even when filters are active
    if object.scope_kind() == Some(ScopeKind::CompileUnit) {
        return true;
    }
    if !settings.has_filters() || matched_tree {
        return true;
    }
    settings.matches_filter(object.name_str())
}

/// Flatten a compile unit name into a file name: path separators and
/// dots become underscores (drive separators too on Windows hosts)
pub fn flatten_scope_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '/' | '\\' => '_',
            ':' if cfg!(windows) => '_',
            c => c,
        })
        .collect()
}

/// Per-kind counts of the objects a print pass would emit
#[derive(Debug, Default)]
pub struct Summary {
    counts: BTreeMap<&'static str, usize>,
    total: usize,
}

impl Summary {
    pub fn collect(tree: &ScopeTree, settings: &PrintSettings) -> Self {
        let mut summary = Self::default();
        for id in tree.ids() {
            let object = &tree[id];
            if object.scope_kind() == Some(ScopeKind::Root) {
                continue;
            }
            if object.is_printed_as_object() && settings.shows_kind(object) {
                *summary.counts.entry(object.kind_label()).or_default() += 1;
                summary.total += 1;
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count_of(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:-<29}", "")?;
        writeln!(f, "{:<18}{:>11}", "Object", "Total")?;
        writeln!(f, "{:-<29}", "")?;
        for (label, count) in &self.counts {
            writeln!(f, "{label:<18}{count:>11}")?;
        }
        writeln!(f, "{:-<29}", "")?;
        writeln!(f, "{:<18}{:>11}", "Totals", self.total)
    }
}
