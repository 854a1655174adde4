//! Shared fixture for integration tests: a throwaway platform install and a
//! config file pointing the binary at it.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const EVENT_BASE: &str = "class Event:\n    def __init__(self, params):\n        self.params = params\n";
pub const DRIVER_BASE: &str = "class Driver:\n    pass\n";
pub const FORMATTER_BASE: &str = "class ProfileFormatter:\n    pass\n";

/// Main class of a module that passes every metadata rule.
pub fn valid_main_source(class_name: &str) -> String {
    format!(
        r#"import logging
from cleep.core import CleepModule
from cleep.common import CATEGORIES

__all__ = ["{class_name}"]


class {class_name}(CleepModule):
    """
    Plays sounds
    """

    MODULE_AUTHOR = "Cleep"
    MODULE_VERSION = "1.2.3"
    MODULE_DEPS = []
    MODULE_DESCRIPTION = "Plays sounds"
    MODULE_LONGDESCRIPTION = (
        "Plays sounds on the device "
        "through the configured card"
    )
    MODULE_CATEGORY = CATEGORIES.MEDIA
    MODULE_TAGS = ["audio", "sound"]
    MODULE_COUNTRY = None
    MODULE_URLINFO = "https://example.org/info"
    MODULE_URLHELP = "https://example.org/help"
    MODULE_URLSITE = "https://example.org"
    MODULE_URLBUGS = "https://example.org/bugs"
    MODULE_PRICE = 0.0
    MODULE_LABEL = "Audio"

    def __init__(self, bootstrap, debug_enabled):
        CleepModule.__init__(self, bootstrap, debug_enabled)
        self.volume = {{"left": 50, "right": 50}}

    def get_volume(self):
        return self.volume
"#
    )
}

/// A platform install rooted in a temp dir.
pub struct Fixture {
    _temp: TempDir,
    root: PathBuf,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().to_path_buf();
        let fixture = Self { _temp: temp, root };
        fixture.write_core("libs/internals/event.py", EVENT_BASE);
        fixture.write_core("libs/internals/driver.py", DRIVER_BASE);
        fixture.write_core("libs/internals/profileformatter.py", FORMATTER_BASE);
        let config = serde_json::json!({
            "repo_dir": fixture.repo_dir(),
            "core_dst": fixture.core_dir(),
            "html_dst": fixture.root.join("html"),
            "modules_scripts_dst": fixture.root.join("scripts"),
            "bin_dst": fixture.root.join("bin"),
            "media_dst": fixture.root.join("media"),
            "config_dir": fixture.root.join("etc"),
        });
        let text = serde_json::to_string_pretty(&config).expect("serialize config");
        fs::write(fixture.config_path(), text).expect("write config");
        fixture
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("appdev.json")
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.root.join("repo")
    }

    pub fn core_dir(&self) -> PathBuf {
        self.root.join("core")
    }

    pub fn backend_dir(&self, module: &str) -> PathBuf {
        self.core_dir().join("modules").join(module)
    }

    pub fn frontend_dir(&self, module: &str) -> PathBuf {
        self.root.join("html/js/modules").join(module)
    }

    pub fn scripts_src_dir(&self, module: &str) -> PathBuf {
        self.repo_dir().join("modules").join(module).join("scripts")
    }

    pub fn write_core(&self, relative: &str, body: &str) {
        write_file(&self.core_dir().join(relative), body);
    }

    pub fn write_backend(&self, module: &str, relative: &str, body: &str) {
        write_file(&self.backend_dir(module).join(relative), body);
    }

    pub fn write_frontend(&self, module: &str, relative: &str, body: &str) {
        write_file(&self.frontend_dir(module).join(relative), body);
    }

    pub fn write_script(&self, module: &str, name: &str, body: &str) {
        write_file(&self.scripts_src_dir(module).join(name), body);
    }

    /// Install a backend whose main class passes every rule.
    pub fn install_valid_backend(&self, module: &str, class_name: &str) {
        self.write_backend(module, "__init__.py", "");
        self.write_backend(module, &format!("{module}.py"), &valid_main_source(class_name));
    }

    /// Run the binary with this fixture's config.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_appdev"))
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env_remove("REPO_DIR")
            .env_remove("CORE_DST")
            .env("RUST_LOG", "warn")
            .output()
            .expect("run appdev")
    }

    /// Run `modcheck --json` and parse the summary printed on stdout.
    pub fn modcheck_json(&self, module: &str, selectors: &[&str]) -> (Output, serde_json::Value) {
        let mut args = vec!["modcheck", "--module", module, "--json"];
        args.extend_from_slice(selectors);
        let output = self.run(&args);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let summary = serde_json::from_str(&stdout).unwrap_or_else(|err| {
            panic!(
                "parse modcheck JSON ({err}): stdout={stdout} stderr={}",
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output, summary)
    }
}

pub fn write_file(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, body).expect("write fixture file");
}

/// String entries of a JSON array at `pointer`.
pub fn strings_at(value: &serde_json::Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
