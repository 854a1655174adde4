//! Entry points of the module checks.
use super::files::{self, FileRecord};
use super::loader::{LoadedModule, ModuleLoader, SourceRoot, SourceTreeLoader, TypeResolver};
use super::manifest;
use super::metadata;
use super::python::{PyClass, PyValue};
use super::report::{BackendFiles, BackendReport, Findings, FrontendReport, ScriptsReport};
use super::roles;
use crate::paths::{PlatformPaths, CORE_PACKAGE, MODULES_PACKAGE};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Install script names kept when packaging a module.
pub const LIFECYCLE_SCRIPTS: [&str; 4] = [
    "preinst.sh",
    "postinst.sh",
    "preuninst.sh",
    "postuninst.sh",
];

/// Check the installed backend of `module_name`.
pub fn check_backend(paths: &PlatformPaths, module_name: &str) -> Result<BackendReport> {
    let core_dst = paths.core_dst()?;
    let loader = SourceTreeLoader::new(vec![SourceRoot {
        package: CORE_PACKAGE.to_string(),
        dir: core_dst.to_path_buf(),
    }]);
    check_backend_with(paths, module_name, &loader)
}

/// Check a backend, reading sources through `loader`.
pub fn check_backend_with(
    paths: &PlatformPaths,
    module_name: &str,
    loader: &dyn ModuleLoader,
) -> Result<BackendReport> {
    let modules_root = paths.modules_dst()?;
    let module = paths.module(module_name);
    let module_dir = module.backend_dst()?;
    if !module_dir.is_dir() {
        return Err(anyhow!("Module \"{module_name}\" does not exist"));
    }

    let resolver = TypeResolver::new(loader);
    let main_module_name = format!("{MODULES_PACKAGE}.{module_name}.{module_name}");
    let unloadable =
        format!("Unable to load application \"{module_name}\". Please check your code");
    let main_module = match resolver.load(&main_module_name) {
        Ok(Some(main_module)) => main_module,
        Ok(None) => return Err(anyhow!(unloadable)),
        Err(err) => {
            tracing::error!(module = module_name, error = %err, "unable to load application");
            return Err(err.context(unloadable));
        }
    };
    let class = main_module.source.class_ignore_case(module_name).ok_or_else(|| {
        anyhow!(
            "Main class was not found for app \"{module_name}\". \
             Application class must have the same name than app name"
        )
    })?;

    let values = class_attributes(&resolver, &main_module, class).with_context(|| unloadable)?;
    let metadata_check = metadata::check_metadata(&class.name, &values);

    let scan = files::scan_backend(module_dir, &modules_root, &module.main_file()?)?;
    let classification = roles::classify_files(&scan.files, MODULES_PACKAGE, &resolver);

    let mut findings = Findings::default();
    findings.extend(metadata_check.findings);
    findings.extend(classification.findings.clone());
    let missing_init = scan.folders_missing_init();
    if !missing_init.is_empty() {
        let mut folders: Vec<String> = missing_init
            .iter()
            .map(|folder| crate::util::display_path(folder, Some(&modules_root)))
            .collect();
        folders.sort();
        findings.error(format!(
            "Some __init__.py files are missing in root folder or sub folders ({})",
            folders.join(", ")
        ));
    }

    let mut libs: Vec<FileRecord> = scan
        .files
        .iter()
        .filter(|file| !classification.contains(file))
        .cloned()
        .collect();
    libs.sort_by(|a, b| a.fullpath.cmp(&b.fullpath));

    tracing::debug!(
        module = module_name,
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "backend checked"
    );
    Ok(BackendReport {
        findings,
        metadata: metadata_check.metadata,
        files: BackendFiles {
            module: scan.module,
            events: classification.events,
            drivers: classification.drivers,
            formatters: classification.formatters,
            libs,
        },
    })
}

/// Attributes visible on `class`, inherited ones included.
///
/// The nearest declaration wins and is evaluated in its declaring module.
fn class_attributes(
    resolver: &TypeResolver,
    module: &Rc<LoadedModule>,
    class: &PyClass,
) -> Result<BTreeMap<String, PyValue>> {
    let lineage = resolver.lineage(module, class)?;
    let own = std::iter::once((Rc::clone(module), class.clone()));
    let mut values = BTreeMap::new();
    for (declaring, declared) in own.chain(lineage) {
        for (name, value) in &declared.attributes {
            values
                .entry(name.clone())
                .or_insert_with(|| resolver.evaluate(&declaring, value));
        }
    }
    Ok(values)
}

/// Check the installed frontend of `module_name` against its manifest.
pub fn check_frontend(paths: &PlatformPaths, module_name: &str) -> Result<FrontendReport> {
    let modules_root = paths.modules_html_dst();
    let module = paths.module(module_name);
    let files = files::scan_frontend(module.frontend_dst(), &modules_root)?;
    let report = manifest::check_manifest(files, module_name)?;
    tracing::debug!(
        module = module_name,
        errors = report.findings.errors.len(),
        warnings = report.findings.warnings.len(),
        "frontend checked"
    );
    Ok(report)
}

/// Check the install scripts in the module sources.
pub fn check_scripts(paths: &PlatformPaths, module_name: &str) -> Result<ScriptsReport> {
    let module = paths.module(module_name);
    let mut report = ScriptsReport::default();
    for file in files::scan_scripts(&module.scripts_src(), module.src())? {
        if LIFECYCLE_SCRIPTS.contains(&file.filename.as_str()) {
            report.files.push(file);
        } else {
            report.findings.warning(format!(
                "File \"{}\" in scripts folder won't be part of {module_name} package",
                file.filename
            ));
        }
    }
    Ok(report)
}
