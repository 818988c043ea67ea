//! Instruction templates for the three transformer roles.
//!
//! A template is plain text with `{field}` placeholders. Rendering is strict:
//! every placeholder must be supplied and nothing else may be.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::{ModuleIdentity, TemplateError};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid"))
}

/// Which transformer role a template serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRole {
    GenerateTests,
    Refactor,
    Fix,
}

impl TemplateRole {
    /// Placeholders the orchestrator supplies for this role.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            TemplateRole::GenerateTests | TemplateRole::Refactor => &["code"],
            TemplateRole::Fix => &["legacy_code", "refactored_code", "error_message"],
        }
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TemplateRole::GenerateTests => "generate_tests",
            TemplateRole::Refactor => "refactor",
            TemplateRole::Fix => "fix",
        };
        f.write_str(s)
    }
}

/// A named instruction template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names appearing in the template.
    pub fn placeholders(&self) -> BTreeSet<String> {
        placeholder_re()
            .captures_iter(&self.text)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Substitute `values` into the template in a single pass.
    pub fn render(&self, name: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let wanted = self.placeholders();
        for (key, _) in values {
            if !wanted.contains(*key) {
                return Err(TemplateError::UnexpectedField {
                    template: name.to_string(),
                    field: key.to_string(),
                });
            }
        }
        for field in &wanted {
            if !values.iter().any(|(k, _)| *k == field.as_str()) {
                return Err(TemplateError::MissingField {
                    template: name.to_string(),
                    field: field.clone(),
                });
            }
        }

        let rendered = placeholder_re().replace_all(&self.text, |caps: &Captures| {
            values
                .iter()
                .find(|(k, _)| *k == &caps[1])
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// The three templates used by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSet {
    pub generate_tests: PromptTemplate,
    pub refactor: PromptTemplate,
    pub fix: PromptTemplate,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::for_module(&ModuleIdentity::default())
    }
}

impl TemplateSet {
    /// Built-in templates with the module identity baked into the
    /// test-generation import contract.
    pub fn for_module(module: &ModuleIdentity) -> Self {
        let generate_tests = format!(
            "You are a QA engineer writing characterization tests for legacy Python code.\n\
             Write a pytest suite that pins down the code's CURRENT behavior,\n\
             including odd cases.\n\
             \n\
             Rules:\n\
             1. The code under test is saved as `{source}`.\n\
             2. Import it with exactly this line: `{import}`\n\
             3. Do not invent any other module names.\n\
             4. If the code implicitly returns None, assert None; do not assume an exception.\n\
             \n\
             Legacy code:\n\
             {{code}}\n\
             \n\
             Reply with the Python test code only.\n",
            source = module.source_file(),
            import = module.import_line(),
        );

        let refactor = "You are a senior Python engineer. Modernize the legacy code below.\n\
             \n\
             Rules:\n\
             1. Add type hints.\n\
             2. Follow PEP 8.\n\
             3. Use descriptive names for locals and parameters; keep public names unchanged.\n\
             4. Do NOT change behavior. Every input must produce the same output as before.\n\
             \n\
             Legacy code:\n\
             {code}\n\
             \n\
             Reply with the Python code only, without markdown.\n";

        let fix = "You are debugging a refactoring that broke the regression tests.\n\
             Fix the refactored code so that it passes the tests\n\
             while keeping the modernized style.\n\
             \n\
             Original legacy code:\n\
             {legacy_code}\n\
             \n\
             Refactored code that failed:\n\
             {refactored_code}\n\
             \n\
             Test failure output:\n\
             {error_message}\n\
             \n\
             Reply with the fixed Python code only. Do not explain.\n";

        Self {
            generate_tests: PromptTemplate::new(generate_tests),
            refactor: PromptTemplate::new(refactor),
            fix: PromptTemplate::new(fix),
        }
    }

    pub fn get(&self, role: TemplateRole) -> &PromptTemplate {
        match role {
            TemplateRole::GenerateTests => &self.generate_tests,
            TemplateRole::Refactor => &self.refactor,
            TemplateRole::Fix => &self.fix,
        }
    }

    /// Render the template for `role`.
    pub fn render(
        &self,
        role: TemplateRole,
        values: &[(&str, &str)],
    ) -> Result<String, TemplateError> {
        self.get(role).render(&role.to_string(), values)
    }

    /// Check that every template uses exactly the fields its role supplies.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for role in [TemplateRole::GenerateTests, TemplateRole::Refactor, TemplateRole::Fix] {
            let found = self.get(role).placeholders();
            for field in role.fields() {
                if !found.contains(*field) {
                    return Err(TemplateError::MissingField {
                        template: role.to_string(),
                        field: field.to_string(),
                    });
                }
            }
            if let Some(extra) = found.iter().find(|f| !role.fields().contains(&f.as_str())) {
                return Err(TemplateError::UnexpectedField {
                    template: role.to_string(),
                    field: extra.clone(),
                });
            }
        }
        Ok(())
    }
}
