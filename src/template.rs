// Template rendering for generated configuration files
//
// Rendering is pure: a template set plus a variable mapping produces
// text, nothing else. Placement of rendered files is the runtime's job
// (see `Container::ensure_file`).

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, TemplateError};

/// Variable value in a template mapping
#[derive(Debug, Clone)]
pub enum TemplateValue {
    Str(String),
    /// Rendered one element per line, in the supplied order
    List(Vec<String>),
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            TemplateValue::Str(s) => s.clone(),
            TemplateValue::List(items) => items.join("\n"),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Str(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Str(value)
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(value: Vec<String>) -> Self {
        TemplateValue::List(value)
    }
}

pub type TemplateMapping = HashMap<String, TemplateValue>;

/// A generated file: its name and the directory it belongs in.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    file_name: String,
    output_directory: PathBuf,
}

impl TemplateDescriptor {
    pub fn new(file_name: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            output_directory: output_directory.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_directory.join(&self.file_name)
    }
}

/// A descriptor together with its rendered contents, ready for
/// conditional placement in a container.
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub descriptor: TemplateDescriptor,
    pub contents: String,
}

/// A named set of embedded template resources, keyed by generated file
/// name. Each handler family carries its own set next to the shared one.
pub struct TemplateSet {
    resources: HashMap<&'static str, &'static str>,
    variable_pattern: Regex,
}

impl TemplateSet {
    pub fn new(resources: &[(&'static str, &'static str)]) -> Self {
        Self {
            resources: resources.iter().copied().collect(),
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}")
                .expect("valid template variable pattern"),
        }
    }

    /// Look up the raw resource for a generated file name
    pub fn source(&self, file_name: &str) -> Result<&'static str> {
        self.resources
            .get(file_name)
            .copied()
            .ok_or_else(|| {
                TemplateError::NotFound {
                    name: file_name.to_string(),
                }
                .into()
            })
    }

    /// Render the resource for `descriptor` with `mapping`.
    /// Every placeholder must be covered by the mapping.
    pub fn render(
        &self,
        descriptor: &TemplateDescriptor,
        mapping: &TemplateMapping,
    ) -> Result<RenderedTemplate> {
        let source = self.source(descriptor.file_name())?;

        let mut contents = String::with_capacity(source.len());
        let mut last_end = 0;
        for captures in self.variable_pattern.captures_iter(source) {
            let whole = captures.get(0).expect("capture 0 always present");
            let variable = &captures[1];
            let value = mapping.get(variable).ok_or_else(|| {
                crate::error::KilnError::from(TemplateError::UnresolvedVariable {
                    template: descriptor.file_name().to_string(),
                    variable: variable.to_string(),
                })
            })?;
            contents.push_str(&source[last_end..whole.start()]);
            contents.push_str(&value.render());
            last_end = whole.end();
        }
        contents.push_str(&source[last_end..]);

        Ok(RenderedTemplate {
            descriptor: descriptor.clone(),
            contents,
        })
    }
}
