//! Command templates: the argument vector used to launch the interpreter per item.

use std::ffi::OsString;
use std::path::Path;

use anyhow::{Result, bail};

/// Placeholder replaced by the item path inside template arguments.
pub const ITEM_PLACEHOLDER: &str = "{}";

/// A validated `program arg...` template.
///
/// When no argument contains [`ITEM_PLACEHOLDER`], the item path is appended
/// as the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    parts: Vec<String>,
}

impl CommandTemplate {
    pub fn new(parts: Vec<String>) -> Result<Self> {
        validate_parts(&parts)?;
        Ok(Self { parts })
    }

    /// Split a CLI template on ASCII whitespace. No shell quoting is applied.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::new(raw.split_ascii_whitespace().map(str::to_string).collect())
    }

    pub fn program(&self) -> &str {
        &self.parts[0]
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Arguments for one item, placeholder substituted.
    pub fn args_for(&self, item_path: &Path) -> Vec<OsString> {
        let rest = &self.parts[1..];
        let mut substituted = false;
        let mut args: Vec<OsString> = rest
            .iter()
            .map(|arg| {
                if arg.contains(ITEM_PLACEHOLDER) {
                    substituted = true;
                    expand_arg(arg, item_path)
                } else {
                    OsString::from(arg)
                }
            })
            .collect();
        if !substituted {
            args.push(item_path.as_os_str().to_os_string());
        }
        args
    }

    /// Human-readable command line for logs and launch failure messages.
    pub fn display_for(&self, item_path: &Path) -> String {
        let mut line = self.program().to_string();
        for arg in self.args_for(item_path) {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Reject empty templates and blank program names.
pub fn validate_parts(parts: &[String]) -> Result<()> {
    match parts.first() {
        None => bail!("command must be a non-empty array"),
        Some(program) if program.trim().is_empty() => bail!("command program must be non-empty"),
        Some(_) => Ok(()),
    }
}

fn expand_arg(arg: &str, item_path: &Path) -> OsString {
    let mut out = OsString::new();
    let mut pieces = arg.split(ITEM_PLACEHOLDER).peekable();
    while let Some(piece) = pieces.next() {
        out.push(piece);
        if pieces.peek().is_some() {
            out.push(item_path.as_os_str());
        }
    }
    out
}
