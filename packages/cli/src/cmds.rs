use std::path::{Path, PathBuf};

use cu::pre::*;
use regex::Regex;
use render::{ScopePrinter, Summary, TextPrinter, YamlPrinter};
use scopetree::error::ErrorCode;
use scopetree::{OutputFormat, PrintSettings, ScopeTree, SortKey, fatal};

#[derive(Debug, clap::Parser)]
#[clap(
    name = "scopelens",
    version,
    about = "Print the logical scope tree of ELF files with DWARF debug information"
)]
pub struct CmdMain {
    /// Input ELF files with DWARF debug information
    #[clap(required = true)]
    pub inputs: Vec<String>,

    /// Output formats, comma separated (text, yaml)
    #[clap(long, value_delimiter = ',', default_value = "text")]
    pub output: Vec<String>,

    /// Key used to order siblings (line, name, offset)
    #[clap(long, default_value = "line")]
    pub sort: String,

    /// Write each compile unit to its own file under this directory
    #[clap(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Process inputs without printing the scope view
    #[clap(short = 'q', long)]
    pub quiet: bool,

    /// Print a per-kind object count after the output
    #[clap(long)]
    pub show_summary: bool,

    /// Only print objects whose name matches the regular expression
    #[clap(long, value_name = "regex")]
    pub filter: Vec<String>,
    /// Only print objects whose name contains the text
    #[clap(long, value_name = "text")]
    pub filter_any: Vec<String>,
    /// Print matching objects together with their whole subtree
    #[clap(long, value_name = "regex")]
    pub tree: Vec<String>,
    /// Like --tree, matching on contained text
    #[clap(long, value_name = "text")]
    pub tree_any: Vec<String>,

    /// Start from every object kind enabled
    #[clap(long)]
    pub show_all: bool,
    /// Start from the default object kinds (the default)
    #[clap(long)]
    pub show_brief: bool,
    /// Start from no object kinds
    #[clap(long)]
    pub show_none: bool,

    // Per-kind visibility overrides, applied after the base set
    #[clap(long)]
    pub show_alias: bool,
    #[clap(long)]
    pub no_show_alias: bool,
    #[clap(long)]
    pub show_block: bool,
    #[clap(long)]
    pub no_show_block: bool,
    #[clap(long)]
    pub show_block_attributes: bool,
    #[clap(long)]
    pub show_class: bool,
    #[clap(long)]
    pub no_show_class: bool,
    #[clap(long)]
    pub show_enum: bool,
    #[clap(long)]
    pub no_show_enum: bool,
    #[clap(long)]
    pub show_function: bool,
    #[clap(long)]
    pub no_show_function: bool,
    #[clap(long)]
    pub show_member: bool,
    #[clap(long)]
    pub no_show_member: bool,
    #[clap(long)]
    pub show_namespace: bool,
    #[clap(long)]
    pub no_show_namespace: bool,
    #[clap(long)]
    pub show_parameter: bool,
    #[clap(long)]
    pub no_show_parameter: bool,
    #[clap(long)]
    pub show_primitivetype: bool,
    #[clap(long)]
    pub no_show_primitivetype: bool,
    #[clap(long)]
    pub show_struct: bool,
    #[clap(long)]
    pub no_show_struct: bool,
    #[clap(long)]
    pub show_template: bool,
    #[clap(long)]
    pub no_show_template: bool,
    #[clap(long)]
    pub show_union: bool,
    #[clap(long)]
    pub no_show_union: bool,
    #[clap(long)]
    pub show_using: bool,
    #[clap(long)]
    pub no_show_using: bool,
    #[clap(long)]
    pub show_variable: bool,
    #[clap(long)]
    pub no_show_variable: bool,
    #[clap(long)]
    pub show_codeline: bool,
    #[clap(long)]
    pub no_show_codeline: bool,
    #[clap(long)]
    pub show_codeline_attributes: bool,

    // Per-line attribute prefixes
    /// Prefix every line with the object's DIE offset
    #[clap(long)]
    pub show_dwarf_offset: bool,
    /// Prefix every line with the parent's DIE offset
    #[clap(long)]
    pub show_dwarf_parent: bool,
    /// Prefix every line with the DWARF tag
    #[clap(long)]
    pub show_dwarf_tag: bool,
    /// Prefix every line with the nesting level
    #[clap(long)]
    pub show_level: bool,
    /// Prefix every line with an X for cross-unit objects
    #[clap(long)]
    pub show_is_global: bool,

    /// Do not indent objects by nesting level
    #[clap(long)]
    pub no_show_indent: bool,
    /// Render missing types as "" instead of "void"
    #[clap(long)]
    pub no_show_void: bool,
    /// Print line number zero instead of blanks
    #[clap(long)]
    pub show_zero_line: bool,
}

impl CmdMain {
    pub fn to_settings(&self) -> cu::Result<PrintSettings> {
        let mut settings = PrintSettings::brief();
        settings.sort_key = match self.sort.as_str() {
            "line" => SortKey::Line,
            "name" => SortKey::Name,
            "offset" => SortKey::Offset,
            other => fatal!(ErrorCode::CmdInvalidValue, "invalid --sort value '{other}'"),
        };

        if self.show_none {
            settings.set_show_kinds(false);
        }
        if self.show_all {
            settings.set_show_kinds(true);
        }
        apply_toggle(&mut settings.show_alias, self.show_alias, self.no_show_alias);
        apply_toggle(&mut settings.show_block, self.show_block, self.no_show_block);
        apply_toggle(&mut settings.show_class, self.show_class, self.no_show_class);
        apply_toggle(&mut settings.show_enum, self.show_enum, self.no_show_enum);
        apply_toggle(
            &mut settings.show_function,
            self.show_function,
            self.no_show_function,
        );
        apply_toggle(&mut settings.show_member, self.show_member, self.no_show_member);
        apply_toggle(
            &mut settings.show_namespace,
            self.show_namespace,
            self.no_show_namespace,
        );
        apply_toggle(
            &mut settings.show_parameter,
            self.show_parameter,
            self.no_show_parameter,
        );
        apply_toggle(
            &mut settings.show_primitive_type,
            self.show_primitivetype,
            self.no_show_primitivetype,
        );
        apply_toggle(&mut settings.show_struct, self.show_struct, self.no_show_struct);
        apply_toggle(
            &mut settings.show_template,
            self.show_template,
            self.no_show_template,
        );
        apply_toggle(&mut settings.show_union, self.show_union, self.no_show_union);
        apply_toggle(&mut settings.show_using, self.show_using, self.no_show_using);
        apply_toggle(
            &mut settings.show_variable,
            self.show_variable,
            self.no_show_variable,
        );
        apply_toggle(
            &mut settings.show_codeline,
            self.show_codeline,
            self.no_show_codeline,
        );
        settings.show_block_attributes = self.show_block_attributes;
        settings.show_codeline_attributes = self.show_codeline_attributes;

        settings.show_dwarf_offset = self.show_dwarf_offset;
        settings.show_dwarf_parent = self.show_dwarf_parent;
        settings.show_dwarf_tag = self.show_dwarf_tag;
        settings.show_level = self.show_level;
        settings.show_is_global = self.show_is_global;
        settings.show_indent = !self.no_show_indent;
        settings.show_void = !self.no_show_void;
        settings.show_zero_line = self.show_zero_line;

        for pattern in &self.filter {
            settings.filters.push(compile_regex(pattern)?);
        }
        for pattern in &self.tree {
            settings.tree_filters.push(compile_regex(pattern)?);
        }
        settings.filter_anys = self.filter_any.clone();
        settings.tree_filter_anys = self.tree_any.clone();
        Ok(settings)
    }

    pub fn output_formats(&self) -> cu::Result<Vec<OutputFormat>> {
        let mut formats = Vec::new();
        for format in &self.output {
            let format = match format.as_str() {
                "text" => OutputFormat::Text,
                "yaml" => OutputFormat::Yaml,
                other => {
                    fatal!(ErrorCode::CmdInvalidValue, "invalid --output value '{other}'")
                }
            };
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }
}

fn apply_toggle(setting: &mut bool, on: bool, off: bool) {
    if on {
        *setting = true;
    }
    if off {
        *setting = false;
    }
}

fn compile_regex(pattern: &str) -> cu::Result<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Ok(regex),
        Err(_) => fatal!(ErrorCode::CmdInvalidRegex, "'{pattern}'"),
    }
}

/// Process every input file in order: load, resolve, then render in
/// each requested format
pub fn run(args: CmdMain) -> cu::Result<()> {
    let settings = args.to_settings()?;
    let formats = args.output_formats()?;

    for input in &args.inputs {
        if !Path::new(input).exists() {
            fatal!(ErrorCode::FileNotFound, "{input}");
        }
        cu::debug!("loading {input}");
        let tree = dwreader::load_file(input, settings.sort_key)?;

        for format in &formats {
            match format {
                OutputFormat::Text => {
                    let printer = TextPrinter::new(&settings);
                    emit(&printer, &tree, &args)?;
                }
                OutputFormat::Yaml => {
                    let printer = YamlPrinter::new(&settings);
                    emit(&printer, &tree, &args)?;
                }
            }
        }

        if args.show_summary {
            let summary = Summary::collect(&tree, &settings);
            cu::print!("{summary}");
        }
    }
    Ok(())
}

fn emit(printer: &dyn ScopePrinter, tree: &ScopeTree, args: &CmdMain) -> cu::Result<()> {
    if let Some(dir) = &args.output_dir {
        render::print_split(printer, tree, dir)?;
    } else if !args.quiet {
        let mut out = String::new();
        render::print_tree(printer, tree, &mut out)?;
        cu::print!("{out}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CmdMain {
        <CmdMain as clap::Parser>::try_parse_from(
            std::iter::once("scopelens").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_settings() -> cu::Result<()> {
        let args = parse(&["input.o"]);
        let settings = args.to_settings()?;
        assert_eq!(settings.sort_key, SortKey::Line);
        assert!(settings.show_class);
        assert!(!settings.show_codeline);
        assert_eq!(args.output_formats()?, vec![OutputFormat::Text]);
        Ok(())
    }

    #[test]
    fn test_output_formats() -> cu::Result<()> {
        let args = parse(&["--output", "text,yaml", "input.o"]);
        assert_eq!(
            args.output_formats()?,
            vec![OutputFormat::Text, OutputFormat::Yaml]
        );

        let args = parse(&["--output", "xml", "input.o"]);
        let err = args.output_formats().unwrap_err();
        assert!(format!("{err:?}").contains("ERR_CMD_INVALID_VALUE"));
        Ok(())
    }

    #[test]
    fn test_sort_values() -> cu::Result<()> {
        let args = parse(&["--sort", "offset", "input.o"]);
        assert_eq!(args.to_settings()?.sort_key, SortKey::Offset);
        let args = parse(&["--sort", "size", "input.o"]);
        assert!(args.to_settings().is_err());
        Ok(())
    }

    #[test]
    fn test_show_toggles() -> cu::Result<()> {
        let args = parse(&["--show-none", "--show-class", "input.o"]);
        let settings = args.to_settings()?;
        assert!(settings.show_class);
        assert!(!settings.show_function);

        let args = parse(&["--show-all", "--no-show-codeline", "input.o"]);
        let settings = args.to_settings()?;
        assert!(settings.show_primitive_type);
        assert!(!settings.show_codeline);
        Ok(())
    }

    #[test]
    fn test_bad_regex_is_typed_error() {
        let args = parse(&["--filter", "(unclosed", "input.o"]);
        let err = args.to_settings().unwrap_err();
        assert!(format!("{err:?}").contains("ERR_CMD_INVALID_REGEX"));
    }

    #[test]
    fn test_inputs_required() {
        let result = <CmdMain as clap::Parser>::try_parse_from(["scopelens"]);
        assert!(result.is_err());
    }
}
