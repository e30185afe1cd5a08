//! Serializing callables into upgrade-step modules.
//!
//! A [`CallableSource`] describes a Python function or class by its source
//! text. Serialization dedents the source and prepends import lines: one per
//! non-builtin base class, plus whatever extra globals the caller declares.
//! Base classes are read from the `class` header; declared bases tell which
//! module a bare name comes from.

use std::collections::BTreeSet;

use fixturekit_types::error::BuilderError;

const NOOP_UPGRADE: &str = "def noop_upgrade(setup_context):\n    return\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Class,
}

/// Source text of a function or class, plus its base classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSource {
    kind: CallableKind,
    name: String,
    source: String,
    /// Bases as written in the `class` header.
    header_bases: Vec<String>,
    bases: Vec<String>,
}

impl CallableSource {
    /// Parse the source of a `def` or `class`.
    ///
    /// The source is dedented by the indentation of its first line; leading
    /// decorators are kept.
    pub fn parse(source: &str) -> Result<Self, BuilderError> {
        let source = dedent(source);
        let header = source
            .lines()
            .map(str::trim_start)
            .find(|line| !line.is_empty() && !line.starts_with('@'))
            .ok_or_else(|| BuilderError::Serialization("source is empty".to_string()))?;

        let (kind, rest) = if let Some(rest) = header.strip_prefix("class ") {
            (CallableKind::Class, rest)
        } else if let Some(rest) = header
            .strip_prefix("def ")
            .or_else(|| header.strip_prefix("async def "))
        {
            (CallableKind::Function, rest)
        } else {
            return Err(BuilderError::Serialization(format!(
                "a function or class is required, got \"{header}\""
            )));
        };

        let name: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            return Err(BuilderError::Serialization(format!(
                "cannot find a name in \"{header}\""
            )));
        }

        let header_bases = match kind {
            CallableKind::Class => header_bases(&rest[rest.find(&name).unwrap_or(0) + name.len()..]),
            CallableKind::Function => Vec::new(),
        };

        Ok(Self {
            kind,
            name,
            source,
            header_bases,
            bases: Vec::new(),
        })
    }

    /// The default upgrade handler, doing nothing.
    pub fn noop_upgrade() -> Self {
        Self {
            kind: CallableKind::Function,
            name: "noop_upgrade".to_string(),
            source: NOOP_UPGRADE.to_string(),
            header_bases: Vec::new(),
            bases: Vec::new(),
        }
    }

    /// Declare the base classes as dotted names, e.g. `unittest.TestCase`.
    /// Bare names count as builtins and are not imported. A declared base
    /// overrides the header base with the same name.
    pub fn with_bases<S: Into<String>>(mut self, bases: impl IntoIterator<Item = S>) -> Self {
        self.bases.extend(bases.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Remove the first line's indentation from every line starting with it.
fn dedent(source: &str) -> String {
    let source = source.trim_start_matches(['\n', '\r']);
    let indentation: String = source
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();

    let mut dedented: String = source
        .lines()
        .map(|line| line.strip_prefix(indentation.as_str()).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    dedented.truncate(dedented.trim_end().len());
    dedented.push('\n');
    dedented
}

/// Positional bases of `(A, mod.B, metaclass=M):`; keyword arguments are skipped.
fn header_bases(after_name: &str) -> Vec<String> {
    let Some(arguments) = after_name
        .trim_start()
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(arguments, _)| arguments)
    else {
        return Vec::new();
    };
    arguments
        .split(',')
        .map(str::trim)
        .filter(|base| !base.is_empty() && !base.contains('='))
        .map(str::to_string)
        .collect()
}

/// Import for a base as written in the header: `import mod` for `mod.Base`.
fn header_import(base: &str) -> Option<String> {
    let (module, _) = base.rsplit_once('.')?;
    Some(format!("import {module}"))
}

fn import_line(dottedname: &str) -> Option<String> {
    let (module, name) = dottedname.rsplit_once('.')?;
    Some(format!("from {module} import {name}"))
}

/// Module source for `callable`, importing `to_import` (dotted names) and,
/// for classes, the bases.
pub fn serialize_callable(callable: &CallableSource, to_import: &[&str]) -> String {
    let mut names: Vec<&str> = to_import.to_vec();
    let mut imports = BTreeSet::new();
    if callable.kind == CallableKind::Class {
        names.extend(callable.bases.iter().map(String::as_str));
        let declared = |base: &str| {
            callable
                .bases
                .iter()
                .any(|dotted| dotted == base || dotted.rsplit('.').next() == Some(base))
        };
        imports.extend(
            callable
                .header_bases
                .iter()
                .filter(|base| !declared(base.as_str()))
                .filter_map(|base| header_import(base)),
        );
    }

    imports.extend(names.into_iter().filter_map(import_line));
    let imports = imports.into_iter().collect::<Vec<_>>().join("\n");

    format!("{imports}\n\n\n{}", callable.source)
        .trim_start()
        .to_string()
}
