//! File enumeration for module checks.
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const INIT_MARKER: &str = "__init__.py";
const PYCACHE_DIR: &str = "__pycache__";
const LINT_CONFIG: &str = ".pylintrc";

/// How a frontend file is referenced by `desc.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Usage {
    Global,
    Config,
    Pages,
    Res,
    Core,
    Unused,
}

impl Usage {
    pub fn as_str(self) -> &'static str {
        match self {
            Usage::Global => "GLOBAL",
            Usage::Config => "CONFIG",
            Usage::Pages => "PAGES",
            Usage::Res => "RES",
            Usage::Core => "CORE",
            Usage::Unused => "UNUSED",
        }
    }
}

/// A file found while scanning a module tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub fullpath: PathBuf,
    pub filename: String,
    /// Path relative to the scan's fixed root, `/`-separated.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl FileRecord {
    /// Build a record for `fullpath`, relative to `root`.
    pub fn new(fullpath: PathBuf, root: &Path) -> Result<Self> {
        let relative = fullpath
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", fullpath.display(), root.display()))?;
        let path = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let filename = fullpath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", fullpath.display()))?;
        Ok(Self {
            fullpath,
            filename,
            path,
            usage: None,
            extension: None,
        })
    }

    /// Record the file extension, dot included (`.js`).
    pub fn with_extension(mut self) -> Self {
        self.extension = self
            .fullpath
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()));
        self
    }

    /// File stem without the `.py` suffix.
    pub fn stem(&self) -> &str {
        self.filename
            .strip_suffix(".py")
            .unwrap_or(self.filename.as_str())
    }
}

/// Result of scanning a backend module directory.
#[derive(Debug, Clone, Default)]
pub struct BackendScan {
    pub init_markers: Vec<PathBuf>,
    pub module: Option<FileRecord>,
    pub files: Vec<FileRecord>,
    /// Every distinct parent directory of a scanned file, in scan order.
    pub folders: Vec<PathBuf>,
}

impl BackendScan {
    /// Scanned folders without an `__init__.py`.
    pub fn folders_missing_init(&self) -> Vec<PathBuf> {
        self.folders
            .iter()
            .filter(|folder| {
                !self
                    .init_markers
                    .iter()
                    .any(|marker| marker.parent() == Some(folder.as_path()))
            })
            .cloned()
            .collect()
    }
}

/// Recursively collect regular files below `root`, sorted.
///
/// `skip` is called with each entry name; matching entries (files or
/// directories) are not visited.
pub fn collect_files_recursive(root: &Path, skip: &dyn Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.with_context(|| format!("read {}", root.display()))?;
        let name = entry.file_name();
        if skip(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path, skip)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn ensure_dir(dir: &Path, what: &str) -> Result<()> {
    if !dir.is_dir() {
        return Err(anyhow!("{what} {} does not exist", dir.display()));
    }
    Ok(())
}

/// Scan a backend module: Python sources only, caches and hidden entries
/// skipped. `main_file` is reported separately from the other files.
pub fn scan_backend(
    module_dir: &Path,
    modules_root: &Path,
    main_file: &Path,
) -> Result<BackendScan> {
    ensure_dir(module_dir, "backend directory")?;
    let skip = |name: &str| name == PYCACHE_DIR || name == LINT_CONFIG || name.starts_with('.');
    let mut scan = BackendScan::default();
    for fullpath in collect_files_recursive(module_dir, &skip)? {
        if fullpath.extension().and_then(|ext| ext.to_str()) != Some("py") {
            continue;
        }
        let is_init = fullpath.file_name().and_then(|name| name.to_str()) == Some(INIT_MARKER);
        if is_init {
            scan.init_markers.push(fullpath.clone());
        } else if fullpath == main_file {
            scan.module = Some(FileRecord::new(fullpath.clone(), modules_root)?);
        } else {
            scan.files.push(FileRecord::new(fullpath.clone(), modules_root)?);
        }
        if let Some(folder) = fullpath.parent() {
            if !scan.folders.iter().any(|known| known == folder) {
                scan.folders.push(folder.to_path_buf());
            }
        }
    }
    tracing::debug!(
        dir = %module_dir.display(),
        files = scan.files.len(),
        folders = scan.folders.len(),
        "scanned backend"
    );
    Ok(scan)
}

/// Scan a frontend module: every file except hidden, backup and temp files.
pub fn scan_frontend(module_dir: &Path, modules_root: &Path) -> Result<Vec<FileRecord>> {
    ensure_dir(module_dir, "frontend directory")?;
    let skip =
        |name: &str| name.starts_with('.') || name.starts_with('~') || name.ends_with(".tmp");
    let files = collect_files_recursive(module_dir, &skip)?
        .into_iter()
        .map(|fullpath| FileRecord::new(fullpath, modules_root).map(FileRecord::with_extension))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(dir = %module_dir.display(), files = files.len(), "scanned frontend");
    Ok(files)
}

/// Scan a module scripts directory. A missing directory yields no files.
pub fn scan_scripts(scripts_dir: &Path, module_src: &Path) -> Result<Vec<FileRecord>> {
    if !scripts_dir.is_dir() {
        return Ok(Vec::new());
    }
    let skip = |name: &str| name.starts_with('.');
    collect_files_recursive(scripts_dir, &skip)?
        .into_iter()
        .map(|fullpath| FileRecord::new(fullpath, module_src))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, b"").expect("write file");
    }

    #[test]
    fn backend_scan_classifies_python_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let modules = dir.path().join("modules");
        let module = modules.join("demo");
        touch(&module.join("__init__.py"));
        touch(&module.join("demo.py"));
        touch(&module.join("demoevent.py"));
        touch(&module.join("README.md"));
        touch(&module.join(".pylintrc"));
        touch(&module.join("__pycache__/demo.cpython-39.pyc"));
        touch(&module.join("__pycache__/cached.py"));
        touch(&module.join("libs/helper.py"));

        let scan = scan_backend(&module, &modules, &module.join("demo.py")).expect("scan");
        assert_eq!(scan.init_markers, vec![module.join("__init__.py")]);
        assert_eq!(scan.module.as_ref().map(|m| m.path.as_str()), Some("demo/demo.py"));
        let paths: Vec<&str> = scan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["demo/demoevent.py", "demo/libs/helper.py"]);
        assert_eq!(scan.folders, vec![module.clone(), module.join("libs")]);
        assert_eq!(scan.folders_missing_init(), vec![module.join("libs")]);
    }

    #[test]
    fn backend_scan_requires_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err =
            scan_backend(&missing, dir.path(), &missing.join("nope.py")).expect_err("missing");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn frontend_scan_skips_hidden_backup_and_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let modules = dir.path().join("modules");
        let module = modules.join("demo");
        touch(&module.join("desc.json"));
        touch(&module.join("demo.config.js"));
        touch(&module.join(".hidden.js"));
        touch(&module.join("~backup.js"));
        touch(&module.join("edit.tmp"));
        touch(&module.join("images/icon.png"));

        let files = scan_frontend(&module, &modules).expect("scan");
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["demo/demo.config.js", "demo/desc.json", "demo/images/icon.png"]
        );
        assert_eq!(files[0].extension.as_deref(), Some(".js"));
        assert_eq!(files[2].filename, "icon.png");
    }

    #[test]
    fn scripts_scan_is_relative_to_module_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("modules/demo");
        touch(&src.join("scripts/postinst.sh"));
        let files = scan_scripts(&src.join("scripts"), &src).expect("scan");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "scripts/postinst.sh");
        assert!(scan_scripts(&src.join("absent"), &src).expect("scan").is_empty());
    }
}
