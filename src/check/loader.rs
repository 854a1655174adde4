//! Module loading and name resolution over statically read sources.
//!
//! The checker identifies classes by their fully qualified name
//! (`package.module.Class`). A [`ModuleLoader`] maps dotted module names to
//! parsed sources; [`TypeResolver`] follows imports, re-exports and base
//! class declarations on top of it.
use super::python::{parse_module, PyClass, PyModule, PyValue};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Upper bound on visited ancestors for one class.
const MAX_ANCESTORS: usize = 64;
/// Upper bound on alias and constant indirections.
const MAX_INDIRECTIONS: usize = 8;

/// A parsed module together with its qualified name.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub name: String,
    /// True when loaded from a package `__init__.py`.
    pub is_package: bool,
    pub source: PyModule,
}

impl LoadedModule {
    /// Package used as the anchor for relative imports.
    fn package(&self) -> &str {
        if self.is_package {
            return &self.name;
        }
        self.name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    /// Absolute module named by an import with `level` leading dots.
    fn absolute_module(&self, level: usize, module: &str) -> String {
        if level == 0 {
            return module.to_string();
        }
        let mut parts: Vec<&str> = self
            .package()
            .split('.')
            .filter(|part| !part.is_empty())
            .collect();
        for _ in 1..level {
            parts.pop();
        }
        if !module.is_empty() {
            parts.push(module);
        }
        parts.join(".")
    }
}

/// Source of parsed modules, keyed by dotted module name.
pub trait ModuleLoader {
    /// Load a module. `Ok(None)` means no source is reachable for the name;
    /// errors mean the source exists but could not be read or parsed.
    fn load(&self, name: &str) -> Result<Option<Rc<LoadedModule>>>;
}

/// A package prefix mapped onto a directory.
#[derive(Debug, Clone)]
pub struct SourceRoot {
    pub package: String,
    pub dir: PathBuf,
}

/// Loads modules from directories on disk, caching results per instance.
#[derive(Debug)]
pub struct SourceTreeLoader {
    roots: Vec<SourceRoot>,
    cache: RefCell<BTreeMap<String, Option<Rc<LoadedModule>>>>,
}

impl SourceTreeLoader {
    pub fn new(roots: Vec<SourceRoot>) -> Self {
        Self {
            roots,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    /// Locate the source file for a module name, if any.
    pub fn module_file(&self, name: &str) -> Option<(PathBuf, bool)> {
        for root in &self.roots {
            let rest = if name == root.package {
                ""
            } else if let Some(rest) = name
                .strip_prefix(root.package.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
            {
                rest
            } else {
                continue;
            };
            let mut dir = root.dir.clone();
            for part in rest.split('.').filter(|part| !part.is_empty()) {
                dir.push(part);
            }
            let module_file = dir.with_extension("py");
            if !rest.is_empty() && module_file.is_file() {
                return Some((module_file, false));
            }
            let init_file = dir.join("__init__.py");
            if init_file.is_file() {
                return Some((init_file, true));
            }
        }
        None
    }
}

impl ModuleLoader for SourceTreeLoader {
    fn load(&self, name: &str) -> Result<Option<Rc<LoadedModule>>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        let loaded = match self.module_file(name) {
            Some((path, is_package)) => {
                let source = read_source(&path)?;
                Some(Rc::new(LoadedModule {
                    name: name.to_string(),
                    is_package,
                    source,
                }))
            }
            None => None,
        };
        self.cache
            .borrow_mut()
            .insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }
}

/// Read and parse one source file.
pub fn read_source(path: &Path) -> Result<PyModule> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let module = parse_module(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(module)
}

/// Resolves names and class ancestry through a [`ModuleLoader`].
pub struct TypeResolver<'a> {
    loader: &'a dyn ModuleLoader,
}

impl<'a> TypeResolver<'a> {
    pub fn new(loader: &'a dyn ModuleLoader) -> Self {
        Self { loader }
    }

    pub fn load(&self, name: &str) -> Result<Option<Rc<LoadedModule>>> {
        self.loader.load(name)
    }

    /// Qualify a dotted name as seen from inside `module`.
    ///
    /// Returns `None` when the head of the name is not bound in the module.
    pub fn qualify(&self, module: &LoadedModule, dotted: &str) -> Option<String> {
        self.qualify_bounded(module, dotted, 0)
    }

    fn qualify_bounded(&self, module: &LoadedModule, dotted: &str, depth: usize) -> Option<String> {
        if depth > MAX_INDIRECTIONS {
            return None;
        }
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let base = if module.source.class(head).is_some() {
            format!("{}.{head}", module.name)
        } else if let Some(binding) = module.source.binding(head) {
            let target = module.absolute_module(binding.level, &binding.module);
            match &binding.member {
                Some(member) if target.is_empty() => member.clone(),
                Some(member) => format!("{target}.{member}"),
                None => target,
            }
        } else if let Some(PyValue::Ref(alias)) = module.source.constants.get(head) {
            if alias == head {
                return None;
            }
            self.qualify_bounded(module, alias, depth + 1)?
        } else {
            return None;
        };
        Some(match rest {
            Some(rest) => format!("{base}.{rest}"),
            None => base,
        })
    }

    /// Find the class a qualified name designates, following re-exports.
    ///
    /// Returns the canonical qualified name with the declaring module and
    /// class, or `None` when the declaration is not reachable.
    pub fn locate_class(
        &self,
        qualified: &str,
    ) -> Result<Option<(String, Rc<LoadedModule>, PyClass)>> {
        let mut current = qualified.to_string();
        for _ in 0..MAX_INDIRECTIONS {
            let Some((module_name, class_name)) = current.rsplit_once('.') else {
                return Ok(None);
            };
            let Some(module) = self.loader.load(module_name)? else {
                return Ok(None);
            };
            if let Some(class) = module.source.class(class_name) {
                let class = class.clone();
                return Ok(Some((current, module, class)));
            }
            if module.source.binding(class_name).is_none() {
                return Ok(None);
            }
            match self.qualify(&module, class_name) {
                Some(next) if next != current => current = next,
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Qualified names of every reachable ancestor of `class` declared in
    /// `module`. Unreachable ancestors are kept by name without descending.
    pub fn ancestors(&self, module: &LoadedModule, class: &PyClass) -> Result<BTreeSet<String>> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = class
            .bases
            .iter()
            .filter_map(|base| self.qualify(module, base))
            .collect();

        while let Some(name) = queue.pop_front() {
            if seen.len() >= MAX_ANCESTORS {
                break;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some((canonical, declaring, declared)) = self.locate_class(&name)? else {
                continue;
            };
            seen.insert(canonical);
            for base in &declared.bases {
                if let Some(parent) = self.qualify(&declaring, base) {
                    if !seen.contains(&parent) {
                        queue.push_back(parent);
                    }
                }
            }
        }
        Ok(seen)
    }

    /// Ancestor classes of `class` in attribute lookup order, each with its
    /// declaring module.
    ///
    /// Bases are walked depth first and left to right, each class once.
    /// Unreachable bases are skipped.
    pub fn lineage(
        &self,
        module: &LoadedModule,
        class: &PyClass,
    ) -> Result<Vec<(Rc<LoadedModule>, PyClass)>> {
        let mut seen = BTreeSet::from([format!("{}.{}", module.name, class.name)]);
        let mut lineage = Vec::new();
        let mut stack: Vec<String> = class
            .bases
            .iter()
            .rev()
            .filter_map(|base| self.qualify(module, base))
            .collect();

        while let Some(name) = stack.pop() {
            if seen.len() >= MAX_ANCESTORS {
                break;
            }
            let Some((canonical, declaring, declared)) = self.locate_class(&name)? else {
                continue;
            };
            if !seen.insert(canonical) {
                continue;
            }
            stack.extend(
                declared
                    .bases
                    .iter()
                    .rev()
                    .filter_map(|base| self.qualify(&declaring, base)),
            );
            lineage.push((declaring, declared));
        }
        Ok(lineage)
    }

    /// Statically evaluate a value read from `module`.
    ///
    /// References to constants and class attributes are followed through
    /// imports. References that cannot be followed stay as [`PyValue::Ref`]
    /// unless a platform fallback knows them.
    pub fn evaluate(&self, module: &LoadedModule, value: &PyValue) -> PyValue {
        self.evaluate_bounded(module, value, 0)
    }

    fn evaluate_bounded(&self, module: &LoadedModule, value: &PyValue, depth: usize) -> PyValue {
        if depth > MAX_INDIRECTIONS {
            return value.clone();
        }
        match value {
            PyValue::List(items) => PyValue::List(
                items
                    .iter()
                    .map(|item| self.evaluate_bounded(module, item, depth + 1))
                    .collect(),
            ),
            PyValue::Tuple(items) => PyValue::Tuple(
                items
                    .iter()
                    .map(|item| self.evaluate_bounded(module, item, depth + 1))
                    .collect(),
            ),
            PyValue::Ref(dotted) => self
                .follow_reference(module, dotted, depth)
                .unwrap_or_else(|| value.clone()),
            other => other.clone(),
        }
    }

    fn follow_reference(
        &self,
        module: &LoadedModule,
        dotted: &str,
        depth: usize,
    ) -> Option<PyValue> {
        if !dotted.contains('.') {
            if let Some(constant) = module.source.constants.get(dotted) {
                return Some(self.evaluate_bounded(module, constant, depth + 1));
            }
        }
        let qualified = self.qualify(module, dotted)?;
        if let Some(found) = self.lookup_qualified(&qualified, depth) {
            return Some(found);
        }
        platform_constant(&qualified)
    }

    /// Look up `module.CONSTANT` or `module.Class.ATTR`.
    fn lookup_qualified(&self, qualified: &str, depth: usize) -> Option<PyValue> {
        let (owner, attr) = qualified.rsplit_once('.')?;
        match self.loader.load(owner) {
            Ok(Some(module)) => {
                if let Some(value) = module.source.constants.get(attr) {
                    return Some(self.evaluate_bounded(&module, value, depth + 1));
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(module = owner, error = %err, "unable to load referenced module");
                return None;
            }
        }
        let (module_name, class_name) = owner.rsplit_once('.')?;
        match self.locate_class(&format!("{module_name}.{class_name}")) {
            Ok(Some((_, declaring, class))) => {
                let value = class.attributes.get(attr)?;
                Some(self.evaluate_bounded(&declaring, value, depth + 1))
            }
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(class = owner, error = %err, "unable to load referenced class");
                None
            }
        }
    }
}

/// Application categories known to the platform core.
pub const CATEGORIES: [&str; 6] = [
    "APPLICATION",
    "MOBILE",
    "DRIVER",
    "HOMEAUTOMATION",
    "MEDIA",
    "SERVICE",
];

const CATEGORIES_QUALIFIED: &str = "cleep.common.CATEGORIES";

/// Values of well-known platform constants, used when core sources are not
/// available to read them from.
fn platform_constant(qualified: &str) -> Option<PyValue> {
    let member = qualified
        .strip_prefix(CATEGORIES_QUALIFIED)?
        .strip_prefix('.')?;
    CATEGORIES
        .contains(&member)
        .then(|| PyValue::Str(member.to_string()))
}
