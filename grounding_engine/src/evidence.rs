//! The evidence index: an immutable snapshot of everything the model was
//! shown, plus project-wide oracles for "exists but wasn't in context".
//!
//! Built once by the caller before a checker run (see [`EvidenceIndexBuilder`])
//! and never mutated afterward — every checker holds only a `&EvidenceIndex`.

use std::collections::{HashMap, HashSet};

/// What kind of language construct a [`SymbolOccurrence`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Struct,
    Interface,
    Variable,
    Constant,
}

/// One place a symbol name was defined. A name can have several occurrences
/// across files — attribute checks tolerate any one of them matching.
#[derive(Debug, Clone)]
pub struct SymbolOccurrence {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u64,
    pub return_types: Vec<String>,
    pub parameters: Vec<String>,
    pub fields: Vec<String>,
    pub methods: Vec<String>,
    pub receiver: Option<String>,
}

/// A single `import` statement as shown to the model.
#[derive(Debug, Clone)]
pub struct Import {
    pub path: String,
    /// The local binding; defaults to the package's last path segment.
    pub alias: String,
}

/// Normalizes a path the way `EvidenceIndex::has_file` compares it: forward
/// slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    slashed
        .strip_prefix("./")
        .unwrap_or(&slashed)
        .to_string()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Immutable snapshot of the model's inputs. Construct via
/// [`EvidenceIndexBuilder`], never by hand-assembling the public fields in a
/// hot path.
#[derive(Debug, Clone, Default)]
pub struct EvidenceIndex {
    pub files: HashSet<String>,
    pub file_basenames: HashSet<String>,
    pub file_contents: HashMap<String, String>,
    pub file_lines: HashMap<String, u64>,
    pub symbols: HashSet<String>,
    pub symbol_details: HashMap<String, Vec<SymbolOccurrence>>,
    pub imports: HashMap<String, Vec<Import>>,
    pub calls_within: HashMap<String, Vec<String>>,
    pub frameworks: HashSet<String>,
    pub languages: HashSet<String>,
    pub raw_content: String,
    pub known_files: HashSet<String>,
    pub known_symbols: HashSet<String>,
    pub known_packages: HashSet<String>,
}

impl EvidenceIndex {
    /// Exact, normalized, or basename match.
    pub fn has_file(&self, path: &str) -> bool {
        if self.files.contains(path) {
            return true;
        }
        let normalized = normalize_path(path);
        if self.files.iter().any(|f| normalize_path(f) == normalized) {
            return true;
        }
        self.file_basenames.contains(basename(path))
    }

    /// `true` if the file was shown to the model (excludes the known-but-not
    /// -shown oracle).
    pub fn has_known_file(&self, path: &str) -> bool {
        self.has_file(path) || self.known_files.contains(path) || {
            let normalized = normalize_path(path);
            self.known_files.iter().any(|f| normalize_path(f) == normalized)
        }
    }

    pub fn file_lines(&self, path: &str) -> Option<u64> {
        if let Some(&n) = self.file_lines.get(path) {
            return Some(n);
        }
        let normalized = normalize_path(path);
        self.file_lines
            .iter()
            .find(|(f, _)| normalize_path(f) == normalized)
            .map(|(_, &n)| n)
    }

    /// Case-sensitive primary lookup, case-insensitive fallback.
    pub fn symbols_named(&self, name: &str) -> Vec<&SymbolOccurrence> {
        if let Some(occurrences) = self.symbol_details.get(name) {
            return occurrences.iter().collect();
        }
        let lower = name.to_lowercase();
        self.symbol_details
            .iter()
            .filter(|(k, _)| k.to_lowercase() == lower)
            .flat_map(|(_, v)| v.iter())
            .collect()
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        !self.symbols_named(name).is_empty()
    }

    pub fn has_known_symbol(&self, name: &str) -> bool {
        self.has_symbol(name) || self.known_symbols.contains(name)
    }

    /// Exact match, parent-of-known match (`pkg/a` known ⇒ `pkg/a/b` accepted
    /// as "not phantom" only if `pkg/a/b` itself is known — see invariant:
    /// `KnownPackages` is parent-closed, never child-closed), or stdlib
    /// exemption for project-path prefixes.
    pub fn package_exists(&self, pkg: &str, language: &str) -> bool {
        if self.known_packages.contains(pkg) {
            return true;
        }
        if is_project_path_prefixed(pkg) {
            return false;
        }
        is_stdlib_package(pkg, language)
    }

    /// Up to `limit` known packages, sorted, for suggestion lists.
    pub fn suggest_packages(&self, limit: usize) -> Vec<String> {
        let mut all: Vec<String> = self.known_packages.iter().cloned().collect();
        all.sort();
        all.truncate(limit);
        all
    }
}

const PROJECT_PATH_PREFIXES: &[&str] = &["pkg/", "cmd/", "internal/", "services/"];

fn is_project_path_prefixed(pkg: &str) -> bool {
    PROJECT_PATH_PREFIXES.iter().any(|p| pkg.starts_with(p))
}

fn is_stdlib_package(pkg: &str, language: &str) -> bool {
    match language.to_lowercase().as_str() {
        "go" => GO_STDLIB.contains(&pkg),
        "python" => PYTHON_STDLIB.contains(&pkg),
        "javascript" | "typescript" | "node" => NODE_STDLIB.contains(&pkg),
        _ => false,
    }
}

const GO_STDLIB: &[&str] = &[
    "fmt", "os", "io", "strings", "strconv", "errors", "context", "time", "sync", "net",
    "net/http", "encoding/json", "bytes", "bufio", "sort", "math", "regexp", "path",
    "path/filepath", "log", "testing", "reflect",
];

const PYTHON_STDLIB: &[&str] = &[
    "os", "sys", "json", "re", "collections", "itertools", "functools", "typing",
    "dataclasses", "pathlib", "datetime", "asyncio", "logging", "unittest", "math", "io",
];

const NODE_STDLIB: &[&str] = &[
    "fs", "path", "http", "https", "os", "crypto", "util", "events", "stream", "url",
    "querystring", "child_process", "assert",
];

/// Incrementally assembles an [`EvidenceIndex`], then freezes it with
/// [`build`](Self::build). Mirrors the resolve-then-freeze idiom the crate's
/// configuration layer also follows.
#[derive(Debug, Default)]
pub struct EvidenceIndexBuilder {
    index: EvidenceIndex,
}

impl EvidenceIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        self.index.file_basenames.insert(basename(&path).to_string());
        self.index.file_lines.insert(path.clone(), content.lines().count() as u64);
        self.index.raw_content.push_str(&content);
        self.index.raw_content.push('\n');
        self.index.file_contents.insert(path.clone(), content);
        self.index.files.insert(path);
        self
    }

    pub fn add_symbol(mut self, occurrence: SymbolOccurrence) -> Self {
        self.index.symbols.insert(occurrence.name.clone());
        self.index
            .symbol_details
            .entry(occurrence.name.clone())
            .or_default()
            .push(occurrence);
        self
    }

    pub fn add_import(mut self, file: impl Into<String>, import: Import) -> Self {
        self.index.imports.entry(file.into()).or_default().push(import);
        self
    }

    pub fn add_call(mut self, caller: impl Into<String>, callee: impl Into<String>) -> Self {
        self.index
            .calls_within
            .entry(caller.into())
            .or_default()
            .push(callee.into());
        self
    }

    pub fn add_framework(mut self, framework: impl Into<String>) -> Self {
        self.index.frameworks.insert(framework.into().to_lowercase());
        self
    }

    pub fn add_language(mut self, language: impl Into<String>) -> Self {
        self.index.languages.insert(language.into());
        self
    }

    pub fn known_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.index.known_files.extend(files);
        self
    }

    pub fn known_symbols(mut self, symbols: impl IntoIterator<Item = String>) -> Self {
        self.index.known_symbols.extend(symbols);
        self
    }

    /// Closes the given packages under parent prefixes, satisfying the
    /// invariant that `KnownPackages` is parent-closed (if `pkg/a/b` is
    /// known, so is `pkg/a`). Idempotent: calling twice with the same
    /// package set yields the same final set.
    pub fn known_packages(mut self, packages: impl IntoIterator<Item = String>) -> Self {
        for pkg in packages {
            self.insert_package_with_parents(pkg);
        }
        self
    }

    fn insert_package_with_parents(&mut self, pkg: String) {
        let mut current = pkg.as_str();
        loop {
            self.index.known_packages.insert(current.to_string());
            match current.rfind('/') {
                Some(idx) => current = &current[..idx],
                None => break,
            }
        }
    }

    pub fn build(self) -> EvidenceIndex {
        self.index
    }
}

/// Derives package paths from a set of file paths by stripping the
/// basename. Idempotent and parent-closed, per the crate's tested
/// round-trip property: applying twice equals once.
pub fn derive_packages_from_files(files: impl IntoIterator<Item = String>) -> HashSet<String> {
    let mut builder = EvidenceIndexBuilder::new();
    for file in files {
        if let Some(idx) = normalize_path(&file).rfind('/') {
            let pkg = normalize_path(&file)[..idx].to_string();
            builder = builder.known_packages(std::iter::once(pkg));
        }
    }
    builder.build().known_packages
}
