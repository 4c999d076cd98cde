//! Module loading and cross-file name resolution.
//!
//! A [`Program`] parses each source file once and answers the question
//! "which declaration does this name refer to?", following imports,
//! `export { .. } from` re-exports and `export *` chains.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::rc::Rc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::ast::{Declaration, ImportedName, Module, ReExport};
use crate::error::ExtractError;
use crate::parser::parse_module;

/// Index of a loaded module within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ModuleId(usize);

/// Identity of a top-level declaration: the module that declares it and
/// its local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DeclKey {
    pub module: ModuleId,
    pub name: String,
}

#[derive(Debug)]
pub(crate) struct LoadedModule {
    pub path: Utf8PathBuf,
    pub ast: Module,
}

impl LoadedModule {
    pub(crate) fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.ast.declarations.get(name)
    }
}

/// Extensions tried, in order, when an import specifier has none.
const CANDIDATE_SUFFIXES: &[&str] =
    &[".ts", ".tsx", ".d.ts", "/index.ts", "/index.tsx", "/index.d.ts"];

/// A cache of parsed modules keyed by path.
#[derive(Debug, Default)]
pub(crate) struct Program {
    modules: Vec<Rc<LoadedModule>>,
    by_path: HashMap<Utf8PathBuf, ModuleId>,
}

impl Program {
    /// Loads and parses `path`, or returns the cached module.
    pub(crate) fn load(
        &mut self,
        path: &Utf8Path,
    ) -> Result<ModuleId, ExtractError> {
        let path = normalize(path);
        if let Some(&id) = self.by_path.get(&path) {
            return Ok(id);
        }
        debug!(%path, "parsing module");
        let source = fs::read_to_string(&path)
            .map_err(|e| ExtractError::io(&path, e))?;
        let ast = parse_module(&source).map_err(|e| {
            ExtractError::parse(&path, e.line, e.col, e.message)
        })?;

        let id = ModuleId(self.modules.len());
        self.by_path.insert(path.clone(), id);
        self.modules.push(Rc::new(LoadedModule { path, ast }));
        Ok(id)
    }

    /// Returns a loaded module. The handle is independent of `self`, so
    /// callers may keep it while loading further modules.
    pub(crate) fn module(&self, id: ModuleId) -> Rc<LoadedModule> {
        Rc::clone(&self.modules[id.0])
    }

    /// Resolves a relative import specifier against the importing module.
    fn resolve_specifier(
        &self,
        from: ModuleId,
        specifier: &str,
    ) -> Result<Utf8PathBuf, ExtractError> {
        let from_path = &self.modules[from.0].path;
        let not_found = || ExtractError::module_not_found(from_path, specifier);
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return Err(not_found());
        }
        let dir = from_path.parent().unwrap_or(Utf8Path::new(""));
        let base = dir.join(specifier);

        let mut candidates = Vec::new();
        if base.extension().is_some_and(|ext| ext == "ts" || ext == "tsx") {
            candidates.push(base.clone());
        }
        // ESM-style `./x.js` specifiers name the compiled output.
        if let Some(stem) = specifier.strip_suffix(".js") {
            candidates.push(dir.join(format!("{stem}.ts")));
            candidates.push(dir.join(format!("{stem}.d.ts")));
        }
        candidates.extend(
            CANDIDATE_SUFFIXES
                .iter()
                .map(|suffix| Utf8PathBuf::from(format!("{base}{suffix}"))),
        );

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(not_found)
    }

    fn load_import(
        &mut self,
        from: ModuleId,
        specifier: &str,
    ) -> Result<ModuleId, ExtractError> {
        let path = self.resolve_specifier(from, specifier)?;
        self.load(&path)
    }

    /// Resolves a (possibly `ns.`-qualified) name as seen from inside
    /// `module`: a local declaration, or an imported binding.
    ///
    /// Returns `Ok(None)` when the name is not declared anywhere reachable,
    /// so the caller can fall back to built-in types.
    pub(crate) fn resolve(
        &mut self,
        module: ModuleId,
        name: &str,
    ) -> Result<Option<DeclKey>, ExtractError> {
        let loaded = self.module(module);

        if let Some((namespace, member)) = name.split_once('.') {
            return match loaded.ast.imports.get(namespace) {
                Some(import) if import.imported == ImportedName::Namespace => {
                    let target = self.load_import(module, &import.specifier)?;
                    self.resolve_export(target, member, &mut HashSet::new())
                }
                _ => Ok(None),
            };
        }

        if loaded.ast.declarations.contains_key(name) {
            return Ok(Some(DeclKey {
                module,
                name: name.to_string(),
            }));
        }
        match loaded.ast.imports.get(name) {
            Some(import) => match &import.imported {
                ImportedName::Named(imported) => {
                    let target = self.load_import(module, &import.specifier)?;
                    self.resolve_export(target, imported, &mut HashSet::new())
                }
                ImportedName::Default | ImportedName::Namespace => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Resolves a name exported by `module`.
    ///
    /// `visited` breaks cycles between modules that `export *` from each
    /// other.
    pub(crate) fn resolve_export(
        &mut self,
        module: ModuleId,
        name: &str,
        visited: &mut HashSet<(ModuleId, String)>,
    ) -> Result<Option<DeclKey>, ExtractError> {
        if !visited.insert((module, name.to_string())) {
            return Ok(None);
        }
        let loaded = self.module(module);

        if let Some(local) = loaded.ast.local_exports.get(name) {
            return self.resolve(module, local);
        }
        if let Some(key) = self.resolve(module, name)? {
            return Ok(Some(key));
        }
        for reexport in &loaded.ast.reexports {
            match reexport {
                ReExport::Named {
                    specifier,
                    name: original,
                    exported,
                } if exported == name => {
                    let target = self.load_import(module, specifier)?;
                    return self.resolve_export(target, original, visited);
                }
                ReExport::Named { .. } => {}
                ReExport::All { specifier } => {
                    let target = self.load_import(module, specifier)?;
                    if let Some(key) =
                        self.resolve_export(target, name, visited)?
                    {
                        return Ok(Some(key));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Lexically removes `.` and `..` components, so that one file reached
/// through different relative specifiers has one cache key.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let last = out.components().next_back();
                if matches!(last, Some(Utf8Component::Normal(_))) {
                    out.pop();
                } else if !matches!(last, Some(Utf8Component::RootDir)) {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
