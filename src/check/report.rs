//! Check reports returned by the orchestrator.
use super::files::FileRecord;
use super::metadata::ModuleMetadata;
use super::roles::RoleFile;
use serde::Serialize;

/// Non-fatal problems collected by a check. Fatal conditions abort the check
/// with an error instead.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Append another set of findings, preserving order.
    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Classified backend files.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BackendFiles {
    pub module: Option<FileRecord>,
    pub events: Vec<RoleFile>,
    pub drivers: Vec<RoleFile>,
    pub formatters: Vec<RoleFile>,
    pub libs: Vec<FileRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BackendReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub metadata: ModuleMetadata,
    pub files: BackendFiles,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FrontendReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScriptsReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub files: Vec<FileRecord>,
}

/// Combined result of `modcheck`; absent sections were not requested.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CheckSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend: Option<FrontendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<ScriptsReport>,
}

impl CheckSummary {
    pub fn has_errors(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|report| report.findings.has_errors())
            || self
                .frontend
                .as_ref()
                .is_some_and(|report| report.findings.has_errors())
            || self
                .scripts
                .as_ref()
                .is_some_and(|report| report.findings.has_errors())
    }
}
