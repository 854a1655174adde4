//! Frontend manifest (`desc.json`) checks.
//!
//! The manifest declares which frontend files the platform loads. Checking
//! it is a linear pipeline: locate, parse, shape-check, then reconcile the
//! declared lists with the files present on disk.
use super::files::{FileRecord, Usage};
use super::report::{Findings, FrontendReport};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "desc.json";

const REQUIRED_KEYS: [&str; 3] = ["config", "global", "icon"];
const BUCKETS: [&str; 3] = ["js", "html", "css"];
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// File lists of one manifest section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Bucket {
    #[serde(default)]
    pub js: Vec<String>,
    #[serde(default)]
    pub html: Vec<String>,
    #[serde(default)]
    pub css: Vec<String>,
}

impl Bucket {
    fn all(&self) -> impl Iterator<Item = &String> {
        self.js.iter().chain(&self.html).chain(&self.css)
    }
}

/// Typed manifest content, read once the shape check passed.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ManifestContent {
    #[serde(default)]
    pub global: Bucket,
    #[serde(default)]
    pub config: Bucket,
    /// Page buckets in declaration order.
    #[serde(default, deserialize_with = "pages_in_order")]
    pub pages: Vec<(String, Bucket)>,
    #[serde(default)]
    pub res: Vec<String>,
    #[serde(default)]
    pub icon: Option<Value>,
}

fn pages_in_order<'de, D>(deserializer: D) -> Result<Vec<(String, Bucket)>, D::Error>
where
    D: Deserializer<'de>,
{
    Map::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(page, value)| {
            Bucket::deserialize(value)
                .map(|bucket| (page, bucket))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Aggregated file lists declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestLists {
    pub global: Vec<String>,
    pub config: Vec<String>,
    pub pages: Vec<String>,
    pub res: Vec<String>,
    pub js: Vec<String>,
    pub html: Vec<String>,
    pub css: Vec<String>,
}

impl ManifestLists {
    pub fn from_content(content: &ManifestContent) -> Self {
        let mut lists = Self {
            global: content.global.all().cloned().collect(),
            config: content.config.all().cloned().collect(),
            res: content.res.clone(),
            ..Self::default()
        };
        let pages = content.pages.iter().map(|(_, bucket)| bucket);
        for page in pages.clone() {
            lists.pages.extend(page.all().cloned());
        }
        let buckets = std::iter::once(&content.global)
            .chain(std::iter::once(&content.config))
            .chain(pages);
        for bucket in buckets {
            lists.js.extend(bucket.js.iter().cloned());
            lists.html.extend(bucket.html.iter().cloned());
            lists.css.extend(bucket.css.iter().cloned());
        }
        lists
    }
}

/// First frontend file named `desc.json`.
pub fn locate_manifest(files: &[FileRecord]) -> Option<&FileRecord> {
    files.iter().find(|file| file.filename == MANIFEST_FILE)
}

/// Read and parse a manifest; it must hold a JSON object.
pub fn read_manifest(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).with_context(|| {
        format!("Invalid {MANIFEST_FILE} file. Please check content ({})", path.display())
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!(
            "Invalid {MANIFEST_FILE} file. Please check content ({}): top level must be an object",
            path.display()
        )),
    }
}

/// Validate the manifest structure.
pub fn check_shape(content: &Map<String, Value>) -> Findings {
    let mut findings = Findings::default();
    if !REQUIRED_KEYS.iter().all(|key| content.contains_key(*key)) {
        findings.error(format!(
            "Invalid {MANIFEST_FILE} content. At least one mandatory key is missing"
        ));
    }
    for section in ["global", "config"] {
        if let Some(value) = content.get(section) {
            check_bucket(section, value, &mut findings);
        }
    }
    if let Some(res) = content.get("res") {
        check_list("res", res, &mut findings);
    }
    if let Some(pages) = content.get("pages") {
        match pages {
            Value::Object(pages) => {
                for (page, value) in pages {
                    check_bucket(&format!("pages.{page}"), value, &mut findings);
                }
            }
            _ => findings.error("Invalid pages section: it must be an object"),
        }
    }
    findings
}

fn check_bucket(section: &str, value: &Value, findings: &mut Findings) {
    let Value::Object(bucket) = value else {
        findings.error(format!("Invalid {section} section: it must be an object"));
        return;
    };
    for kind in BUCKETS {
        if let Some(list) = bucket.get(kind) {
            check_list(&format!("{section}.{kind}"), list, findings);
        }
    }
}

fn check_list(section: &str, value: &Value, findings: &mut Findings) {
    let Value::Array(items) = value else {
        findings.error(format!("Invalid {section} section: it must be an array"));
        return;
    };
    if items.iter().any(|item| !item.is_string()) {
        findings.error(format!("Invalid {section} section: entries must be strings"));
    }
}

/// Extension as written; `logo.PNG` does not match `png`.
fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

/// Warn about files listed in a bucket that does not fit their extension.
pub fn check_extensions(lists: &ManifestLists) -> Findings {
    let mut findings = Findings::default();
    let sections: [(&str, &[String], &[&str]); 3] = [
        ("js", lists.js.as_slice(), &["js"][..]),
        ("html", lists.html.as_slice(), &["html", "htm"][..]),
        ("css", lists.css.as_slice(), &["css"][..]),
    ];
    for (section, names, allowed) in sections {
        for name in names {
            let fits = extension_of(name).is_some_and(|ext| allowed.contains(&ext));
            if !fits {
                findings.warning(format!(
                    "File \"{name}\" should not be in \"{section}\" section. Please fix it"
                ));
            }
        }
    }
    for name in &lists.res {
        let image = extension_of(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext));
        if !image {
            findings.warning(format!(
                "File \"{name}\" seems not to have a supported image format. Please convert it"
            ));
        }
    }
    findings
}

/// Module-relative path of a frontend record (`<module>/` stripped).
fn module_relative<'a>(file: &'a FileRecord, module_name: &str) -> &'a str {
    file.path
        .strip_prefix(module_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(&file.path)
}

/// Tag every file with its usage; unused files produce a warning.
pub fn tag_usage(files: &mut [FileRecord], lists: &ManifestLists, module_name: &str) -> Findings {
    let mut findings = Findings::default();
    for file in files.iter_mut() {
        let relative = module_relative(file, module_name).to_string();
        let listed = |names: &[String]| {
            names
                .iter()
                .any(|name| *name == file.filename || *name == relative)
        };
        let usage = if listed(&lists.global) {
            Usage::Global
        } else if listed(&lists.config) {
            Usage::Config
        } else if listed(&lists.pages) {
            Usage::Pages
        } else if listed(&lists.res) {
            Usage::Res
        } else if file.filename == MANIFEST_FILE {
            Usage::Core
        } else {
            findings.warning(format!("File \"{}\" is unused", file.path));
            Usage::Unused
        };
        file.usage = Some(usage);
    }
    findings
}

/// Report every declared file that is not on disk.
pub fn find_missing(files: &[FileRecord], lists: &ManifestLists, module_name: &str) -> Findings {
    let mut findings = Findings::default();
    let present: Vec<&str> = files
        .iter()
        .map(|file| module_relative(file, module_name))
        .collect();
    let sections: [(&str, &[String]); 4] = [
        ("global", lists.global.as_slice()),
        ("config", lists.config.as_slice()),
        ("res", lists.res.as_slice()),
        ("pages", lists.pages.as_slice()),
    ];
    for (section, names) in sections {
        for name in names {
            if !present.contains(&name.as_str()) {
                findings.error(format!(
                    "File \"{name}\" specified in {MANIFEST_FILE} \"{section}\" section is missing"
                ));
            }
        }
    }
    findings
}

/// Check the scanned frontend files of `module_name` against its manifest.
///
/// A missing or unparsable manifest is fatal. Reconciliation only runs when
/// the shape check found no errors.
pub fn check_manifest(mut files: Vec<FileRecord>, module_name: &str) -> Result<FrontendReport> {
    let manifest = locate_manifest(&files).ok_or_else(|| {
        anyhow!(
            "{MANIFEST_FILE} file is missing for module \"{module_name}\". \
             Please add it following Cleep recommandation"
        )
    })?;
    let raw = read_manifest(&manifest.fullpath)?;
    let mut findings = check_shape(&raw);
    if findings.has_errors() {
        return Ok(FrontendReport {
            findings,
            files: Vec::new(),
        });
    }

    let content: ManifestContent = serde_json::from_value(Value::Object(raw))
        .with_context(|| format!("decode {MANIFEST_FILE} of module \"{module_name}\""))?;
    let lists = ManifestLists::from_content(&content);
    findings.extend(check_extensions(&lists));
    findings.extend(tag_usage(&mut files, &lists, module_name));
    findings.extend(find_missing(&files, &lists, module_name));
    Ok(FrontendReport { findings, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(PathBuf::from(format!("/modules/{path}")), Path::new("/modules"))
            .expect("record")
            .with_extension()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn shape_requires_mandatory_keys_once() {
        let findings = check_shape(&object(json!({"global": {}})));
        assert_eq!(
            findings.errors,
            vec!["Invalid desc.json content. At least one mandatory key is missing".to_string()]
        );
    }

    #[test]
    fn shape_rejects_non_list_buckets() {
        let findings = check_shape(&object(json!({
            "config": {"js": "demo.config.js"},
            "global": {"css": {}},
            "icon": "x",
            "res": "icon.png",
            "pages": {"main": {"html": 1}}
        })));
        assert_eq!(
            findings.errors,
            vec![
                "Invalid global.css section: it must be an array".to_string(),
                "Invalid config.js section: it must be an array".to_string(),
                "Invalid res section: it must be an array".to_string(),
                "Invalid pages.main.html section: it must be an array".to_string(),
            ]
        );
    }

    #[test]
    fn lists_aggregate_sections_and_buckets() {
        let content: ManifestContent = serde_json::from_value(json!({
            "global": {"js": ["a.js"], "css": ["a.css"]},
            "config": {"js": ["c.js"], "html": ["c.html"]},
            "pages": {"p": {"js": ["p.js"]}},
            "res": ["r.png"],
            "icon": "icon"
        }))
        .expect("content");
        let lists = ManifestLists::from_content(&content);
        assert_eq!(lists.global, vec!["a.js", "a.css"]);
        assert_eq!(lists.config, vec!["c.js", "c.html"]);
        assert_eq!(lists.pages, vec!["p.js"]);
        assert_eq!(lists.js, vec!["a.js", "c.js", "p.js"]);
        assert_eq!(lists.html, vec!["c.html"]);
        assert_eq!(lists.css, vec!["a.css"]);
    }

    #[test]
    fn extension_warnings_follow_bucket_order() {
        let lists = ManifestLists {
            js: vec!["x.css".into()],
            html: vec!["page.htm".into()],
            css: vec!["y.js".into()],
            res: vec!["logo.svg".into(), "ok.png".into()],
            ..ManifestLists::default()
        };
        let findings = check_extensions(&lists);
        assert_eq!(
            findings.warnings,
            vec![
                "File \"x.css\" should not be in \"js\" section. Please fix it".to_string(),
                "File \"y.js\" should not be in \"css\" section. Please fix it".to_string(),
                "File \"logo.svg\" seems not to have a supported image format. Please convert it"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn extensions_are_case_sensitive() {
        let lists = ManifestLists {
            js: vec!["app.JS".into()],
            html: vec!["page.htm".into()],
            res: vec!["logo.PNG".into()],
            ..ManifestLists::default()
        };
        let findings = check_extensions(&lists);
        assert_eq!(
            findings.warnings,
            vec![
                "File \"app.JS\" should not be in \"js\" section. Please fix it".to_string(),
                "File \"logo.PNG\" seems not to have a supported image format. Please convert it"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn pages_keep_declaration_order() {
        let text = r#"{
            "pages": {
                "zeta": {"js": "z.js"},
                "alpha": {"html": 1}
            }
        }"#;
        let raw: Value = serde_json::from_str(text).expect("json");
        let findings = check_shape(&object(raw));
        assert_eq!(
            &findings.errors[1..],
            &[
                "Invalid pages.zeta.js section: it must be an array".to_string(),
                "Invalid pages.alpha.html section: it must be an array".to_string(),
            ]
        );

        let content: ManifestContent = serde_json::from_str(
            r#"{"pages": {"zeta": {"js": ["z.js"]}, "alpha": {"js": ["a.js"]}}}"#,
        )
        .expect("content");
        let lists = ManifestLists::from_content(&content);
        assert_eq!(lists.pages, vec!["z.js", "a.js"]);
        assert_eq!(lists.js, vec!["z.js", "a.js"]);
    }

    #[test]
    fn usage_precedence_prefers_global() {
        let mut files = vec![
            record("demo/shared.js"),
            record("demo/desc.json"),
            record("demo/orphan.js"),
            record("demo/images/icon.png"),
        ];
        let lists = ManifestLists {
            global: vec!["shared.js".into()],
            config: vec!["shared.js".into()],
            res: vec!["images/icon.png".into()],
            ..ManifestLists::default()
        };
        let findings = tag_usage(&mut files, &lists, "demo");
        let usages: Vec<Option<Usage>> = files.iter().map(|f| f.usage).collect();
        assert_eq!(
            usages,
            vec![
                Some(Usage::Global),
                Some(Usage::Core),
                Some(Usage::Unused),
                Some(Usage::Res)
            ]
        );
        assert_eq!(
            findings.warnings,
            vec!["File \"demo/orphan.js\" is unused".to_string()]
        );
    }

    #[test]
    fn missing_files_are_reported_per_section() {
        let files = vec![record("demo/desc.json"), record("demo/present.js")];
        let lists = ManifestLists {
            global: vec!["present.js".into(), "gone.js".into()],
            pages: vec!["page.html".into()],
            ..ManifestLists::default()
        };
        let findings = find_missing(&files, &lists, "demo");
        assert_eq!(
            findings.errors,
            vec![
                "File \"gone.js\" specified in desc.json \"global\" section is missing".to_string(),
                "File \"page.html\" specified in desc.json \"pages\" section is missing".to_string(),
            ]
        );
    }
}
