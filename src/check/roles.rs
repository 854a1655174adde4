//! Role classification of backend files (events, drivers, formatters).
use super::files::FileRecord;
use super::loader::TypeResolver;
use super::report::Findings;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Event,
    Driver,
    Formatter,
}

/// What a file must satisfy to implement a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement {
    pub role: Role,
    /// Required file name suffix, before `.py`.
    pub suffix: &'static str,
    /// Qualified name of the required ancestor class.
    pub ancestor: &'static str,
}

impl RoleRequirement {
    /// Short name of the required ancestor class.
    pub fn ancestor_name(&self) -> &'static str {
        self.ancestor
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(self.ancestor)
    }

    fn matches(&self, filename: &str) -> bool {
        filename
            .to_lowercase()
            .ends_with(&format!("{}.py", self.suffix))
    }
}

pub const ROLE_REQUIREMENTS: [RoleRequirement; 3] = [
    RoleRequirement {
        role: Role::Event,
        suffix: "event",
        ancestor: "cleep.libs.internals.event.Event",
    },
    RoleRequirement {
        role: Role::Driver,
        suffix: "driver",
        ancestor: "cleep.libs.internals.driver.Driver",
    },
    RoleRequirement {
        role: Role::Formatter,
        suffix: "formatter",
        ancestor: "cleep.libs.internals.profileformatter.ProfileFormatter",
    },
];

/// First requirement whose suffix matches the file name.
pub fn requirement_for(filename: &str) -> Option<&'static RoleRequirement> {
    ROLE_REQUIREMENTS
        .iter()
        .find(|requirement| requirement.matches(filename))
}

/// A file that implements a role, with the implementing class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleFile {
    #[serde(flatten)]
    pub file: FileRecord,
    pub classname: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoleClassification {
    pub events: Vec<RoleFile>,
    pub drivers: Vec<RoleFile>,
    pub formatters: Vec<RoleFile>,
    pub findings: Findings,
}

impl RoleClassification {
    fn push(&mut self, role: Role, file: RoleFile) {
        match role {
            Role::Event => self.events.push(file),
            Role::Driver => self.drivers.push(file),
            Role::Formatter => self.formatters.push(file),
        }
    }

    /// Whether `file` was accepted under any role.
    pub fn contains(&self, file: &FileRecord) -> bool {
        self.events
            .iter()
            .chain(&self.drivers)
            .chain(&self.formatters)
            .any(|role_file| role_file.file.fullpath == file.fullpath)
    }
}

/// Dotted module name of a scanned file below `package`.
pub fn module_name_for(package: &str, file: &FileRecord) -> String {
    let dotted = file
        .path
        .strip_suffix(".py")
        .unwrap_or(&file.path)
        .replace('/', ".");
    format!("{package}.{dotted}")
}

/// Classify `files` into roles. Failures are reported as errors and the
/// offending files are left out of every role.
pub fn classify_files(
    files: &[FileRecord],
    package: &str,
    resolver: &TypeResolver,
) -> RoleClassification {
    let mut out = RoleClassification::default();
    for requirement in &ROLE_REQUIREMENTS {
        for file in files
            .iter()
            .filter(|file| requirement_for(&file.filename) == Some(requirement))
        {
            match classify_file(file, requirement, package, resolver) {
                Ok(classname) => out.push(
                    requirement.role,
                    RoleFile {
                        file: file.clone(),
                        classname,
                    },
                ),
                Err(message) => {
                    tracing::debug!(
                        file = %file.fullpath.display(),
                        role = ?requirement.role,
                        "role check failed"
                    );
                    out.findings.error(message);
                }
            }
        }
    }
    out.events.sort_by(|a, b| a.file.fullpath.cmp(&b.file.fullpath));
    out.drivers.sort_by(|a, b| a.file.fullpath.cmp(&b.file.fullpath));
    out.formatters
        .sort_by(|a, b| a.file.fullpath.cmp(&b.file.fullpath));
    out
}

fn classify_file(
    file: &FileRecord,
    requirement: &RoleRequirement,
    package: &str,
    resolver: &TypeResolver,
) -> Result<String, String> {
    let fullpath = file.fullpath.display();
    let load_error =
        |cause: String| format!("Error loading file \"{fullpath}\". Please check file [{cause}]");

    let module_name = module_name_for(package, file);
    let module = match resolver.load(&module_name) {
        Ok(Some(module)) => module,
        Ok(None) => return Err(load_error(format!("module {module_name} not found"))),
        Err(err) => return Err(load_error(format!("{err:#}"))),
    };
    let Some(class) = module.source.class_ignore_case(file.stem()) else {
        return Err(format!(
            "Error loading file \"{fullpath}\": class name should have the same name than filename"
        ));
    };
    let ancestors = resolver
        .ancestors(&module, class)
        .map_err(|err| load_error(format!("{err:#}")))?;
    if !ancestors.contains(requirement.ancestor) {
        return Err(format!(
            "Error loading file \"{fullpath}\": class \"{}\" should inherit from \"{}\" ({}) due to its name. Please fix it",
            class.name,
            requirement.ancestor_name(),
            requirement.ancestor
        ));
    }
    Ok(class.name.clone())
}
