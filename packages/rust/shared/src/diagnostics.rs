//! Warning and error flags collected while parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A diagnostic code plus the text that triggered it.
///
/// Displays as `code<context>`, or bare `code` when there is no context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flag {
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

impl Flag {
    pub fn new(code: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            context: context.into(),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{}<{}>", self.code, self.context)
        }
    }
}

/// Append-only collection of warning and error flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub warnings: Vec<Flag>,
    #[serde(default)]
    pub errors: Vec<Flag>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, code: impl Into<String>, context: impl Into<String>) {
        self.warnings.push(Flag::new(code, context));
    }

    pub fn error(&mut self, code: impl Into<String>, context: impl Into<String>) {
        self.errors.push(Flag::new(code, context));
    }

    /// Record a warning unless an identical one is already present.
    /// Used for duplicate-detection flags, which would otherwise repeat.
    pub fn warn_once(&mut self, code: impl Into<String>, context: impl Into<String>) {
        let flag = Flag::new(code, context);
        if !self.warnings.contains(&flag) {
            self.warnings.push(flag);
        }
    }

    /// Append every flag of `other`, preserving order.
    pub fn extend(&mut self, other: &Diagnostics) {
        self.warnings.extend(other.warnings.iter().cloned());
        self.errors.extend(other.errors.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|f| f.code == code)
    }

    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|f| f.code == code)
    }
}
