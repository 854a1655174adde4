//! Validation of the metadata constants declared on an application class.
use super::loader::CATEGORIES;
use super::python::PyValue;
use super::report::Findings;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const VERSION_PATTERN: &str = r"^\d+\.\d+\.\d+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Str,
    List,
    Float,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Str => "str",
            PrimitiveType::List => "list",
            PrimitiveType::Float => "float",
        }
    }

    fn accepts(self, value: &PyValue) -> bool {
        matches!(
            (self, value),
            (PrimitiveType::Str, PyValue::Str(_))
                | (PrimitiveType::List, PyValue::List(_))
                | (PrimitiveType::Float, PyValue::Float(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Rule for one metadata constant.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSpec {
    pub name: &'static str,
    pub kind: PrimitiveType,
    pub nullable: bool,
    pub allow_empty: bool,
    pub validator: Option<fn(&PyValue) -> bool>,
    /// Replaces the generic message for type, validator and emptiness failures.
    pub message: Option<&'static str>,
    pub severity: Severity,
}

const fn constant(name: &'static str, kind: PrimitiveType, severity: Severity) -> ConstantSpec {
    ConstantSpec {
        name,
        kind,
        nullable: false,
        allow_empty: false,
        validator: None,
        message: None,
        severity,
    }
}

pub const CONSTANT_SPECS: [ConstantSpec; 14] = [
    constant("MODULE_AUTHOR", PrimitiveType::Str, Severity::Error),
    constant("MODULE_DESCRIPTION", PrimitiveType::Str, Severity::Error),
    constant("MODULE_LONGDESCRIPTION", PrimitiveType::Str, Severity::Error),
    ConstantSpec {
        validator: Some(is_known_category),
        message: Some(
            "MODULE_CATEGORY must be filled with existing categories. See cleep.common.CATEGORIES",
        ),
        ..constant("MODULE_CATEGORY", PrimitiveType::Str, Severity::Error)
    },
    ConstantSpec {
        allow_empty: true,
        ..constant("MODULE_DEPS", PrimitiveType::List, Severity::Error)
    },
    ConstantSpec {
        validator: Some(is_semver),
        message: Some("MODULE_VERSION must follow semver rules https://semver.org/"),
        ..constant("MODULE_VERSION", PrimitiveType::Str, Severity::Error)
    },
    constant("MODULE_TAGS", PrimitiveType::List, Severity::Warning),
    constant("MODULE_URLINFO", PrimitiveType::Str, Severity::Warning),
    constant("MODULE_URLHELP", PrimitiveType::Str, Severity::Warning),
    constant("MODULE_URLSITE", PrimitiveType::Str, Severity::Warning),
    constant("MODULE_URLBUGS", PrimitiveType::Str, Severity::Warning),
    ConstantSpec {
        nullable: true,
        validator: Some(is_country_code),
        message: Some("Constant MODULE_COUNTRY must be ISO3166-2 compatible code"),
        ..constant("MODULE_COUNTRY", PrimitiveType::Str, Severity::Error)
    },
    ConstantSpec {
        nullable: true,
        ..constant("MODULE_PRICE", PrimitiveType::Float, Severity::Error)
    },
    ConstantSpec {
        nullable: true,
        ..constant("MODULE_LABEL", PrimitiveType::Str, Severity::Error)
    },
];

fn is_known_category(value: &PyValue) -> bool {
    value
        .as_str()
        .is_some_and(|category| CATEGORIES.contains(&category))
}

fn is_semver(value: &PyValue) -> bool {
    let Some(version) = value.as_str() else {
        return false;
    };
    Regex::new(VERSION_PATTERN).is_ok_and(|pattern| pattern.is_match(version))
}

fn is_country_code(value: &PyValue) -> bool {
    value.len() == Some(2)
}

/// Check one constant. Absent and `None` values are treated alike.
pub fn check_constant(spec: &ConstantSpec, value: Option<&PyValue>) -> Option<String> {
    let Some(value) = value.filter(|value| !value.is_none()) else {
        if spec.nullable {
            return None;
        }
        return Some(format!("Constant \"{}\" is missing", spec.name));
    };
    let custom = spec.message.map(str::to_string);

    if !spec.kind.accepts(value) {
        return Some(custom.unwrap_or_else(|| {
            format!(
                "Constant \"{}\" has wrong type (\"{}\" instead of \"{}\")",
                spec.name,
                value.type_name(),
                spec.kind.name()
            )
        }));
    }
    if let Some(validator) = spec.validator {
        if !validator(value) {
            return Some(custom.unwrap_or_else(|| {
                format!(
                    "Constant \"{}\" is invalid (specified=\"{}\")",
                    spec.name,
                    value.render()
                )
            }));
        }
    }
    if !spec.allow_empty && value.is_empty().unwrap_or(false) {
        return Some(custom.unwrap_or_else(|| {
            format!(
                "Constant \"{}\" is empty (specified=\"{}\")",
                spec.name,
                value.render()
            )
        }));
    }
    None
}

/// Run every constant rule in table order.
pub fn check_constants(values: &BTreeMap<String, PyValue>) -> Findings {
    let mut findings = Findings::default();
    for spec in &CONSTANT_SPECS {
        if let Some(message) = check_constant(spec, values.get(spec.name)) {
            match spec.severity {
                Severity::Error => findings.error(message),
                Severity::Warning => findings.warning(message),
            }
        }
    }
    findings
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ModuleUrls {
    pub info: Option<String>,
    pub help: Option<String>,
    pub site: Option<String>,
    pub bugs: Option<String>,
}

/// Metadata summary built from the checked constants.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ModuleMetadata {
    pub author: Option<String>,
    pub description: Option<String>,
    pub longdescription: Option<String>,
    pub category: Option<String>,
    pub deps: Vec<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,
    pub country: Option<String>,
    pub urls: ModuleUrls,
    pub price: Option<f64>,
    pub label: Option<String>,
}

impl ModuleMetadata {
    /// Summarize `values`. The label defaults to `class_name` only when
    /// `MODULE_LABEL` is not declared at all.
    pub fn from_values(class_name: &str, values: &BTreeMap<String, PyValue>) -> Self {
        let text = |name: &str| values.get(name).and_then(PyValue::as_str).map(str::to_string);
        let strings = |name: &str| -> Vec<String> {
            match values.get(name) {
                Some(PyValue::List(items)) | Some(PyValue::Tuple(items)) => items
                    .iter()
                    .filter_map(PyValue::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            }
        };
        let price = match values.get("MODULE_PRICE") {
            Some(PyValue::Float(price)) => Some(*price),
            Some(PyValue::Int(price)) => Some(*price as f64),
            _ => None,
        };
        Self {
            author: text("MODULE_AUTHOR"),
            description: text("MODULE_DESCRIPTION"),
            longdescription: text("MODULE_LONGDESCRIPTION"),
            category: text("MODULE_CATEGORY"),
            deps: strings("MODULE_DEPS"),
            version: text("MODULE_VERSION"),
            tags: strings("MODULE_TAGS"),
            country: text("MODULE_COUNTRY"),
            urls: ModuleUrls {
                info: text("MODULE_URLINFO"),
                help: text("MODULE_URLHELP"),
                site: text("MODULE_URLSITE"),
                bugs: text("MODULE_URLBUGS"),
            },
            price,
            label: match values.get("MODULE_LABEL") {
                Some(value) => value.as_str().map(str::to_string),
                None => Some(class_name.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataCheck {
    pub metadata: ModuleMetadata,
    pub findings: Findings,
}

/// Check evaluated class constants and build the metadata summary.
pub fn check_metadata(class_name: &str, values: &BTreeMap<String, PyValue>) -> MetadataCheck {
    MetadataCheck {
        metadata: ModuleMetadata::from_values(class_name, values),
        findings: check_constants(values),
    }
}
