//! Code and test artifacts exchanged between the orchestrator and its
//! collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

macro_rules! text_artifact {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(text: impl Into<String>) -> Self {
                Self(text.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

text_artifact!(
    /// The original source submitted for refactoring. Never mutated.
    LegacyCode
);

text_artifact!(
    /// A machine-produced rewrite of the legacy code.
    CandidateCode
);

text_artifact!(
    /// A generated regression suite, bound to the legacy code's public surface
    /// through the [`ModuleIdentity`] import contract.
    TestArtifact
);

/// The fixed module identity under which code is materialized for testing.
///
/// Generated tests import everything from `module_name`; the executor writes
/// code to `<module_name>.py` and the suite to `test_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub module_name: String,
    pub test_file: String,
}

impl Default for ModuleIdentity {
    fn default() -> Self {
        Self {
            module_name: "main_module".to_string(),
            test_file: "test_main.py".to_string(),
        }
    }
}

impl ModuleIdentity {
    pub fn new(module_name: impl Into<String>, test_file: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            test_file: test_file.into(),
        }
    }

    /// File name the code artifact is written to.
    pub fn source_file(&self) -> String {
        format!("{}.py", self.module_name)
    }

    /// The single import statement generated tests must use.
    pub fn import_line(&self) -> String {
        format!("from {} import *", self.module_name)
    }

    /// Preamble injected ahead of every generated test body.
    pub fn preamble(&self) -> String {
        format!(
            "import sys\nimport os\nsys.path.append(os.getcwd())\n{}\n",
            self.import_line()
        )
    }

    /// Prefix the preamble to a generated test body.
    pub fn wrap_tests(&self, tests: &TestArtifact) -> String {
        let mut out = self.preamble();
        out.push_str(tests.as_str());
        out
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !is_identifier(&self.module_name) {
            return Err(ConfigError::Invalid(format!(
                "module name is not a valid identifier: {:?}",
                self.module_name
            )));
        }
        let stem = self.test_file.strip_suffix(".py").unwrap_or("");
        if !is_identifier(stem) {
            return Err(ConfigError::Invalid(format!(
                "test file must be a .py file with an identifier stem: {:?}",
                self.test_file
            )));
        }
        if stem == self.module_name {
            return Err(ConfigError::Invalid(
                "test file must not shadow the module under test".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
