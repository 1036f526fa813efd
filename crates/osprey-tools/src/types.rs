//! Results reported by the external tools

/// Outcome of structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub well_formed: bool,
    /// Validator's status line, e.g. `Well-Formed and valid`
    pub status: String,
    /// Individual diagnostics in report order
    pub messages: Vec<String>,
    /// Raw validator output
    pub output: String,
}

impl ValidationReport {
    /// True when validation failed only with messages starting with one of `benign`.
    pub fn only_benign(&self, benign: &[String]) -> bool {
        !self.messages.is_empty()
            && self
                .messages
                .iter()
                .all(|m| benign.iter().any(|b| m.starts_with(b.as_str())))
    }
}

/// Outcome of a generic inspection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub success: bool,
    /// Combined stdout and stderr
    pub output: String,
}
