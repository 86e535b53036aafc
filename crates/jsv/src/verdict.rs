use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::params::ParamSet;

/// A change of a job parameter requested by a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Add or overwrite a top-level parameter
    Set { name: String, value: String },
    /// Add or overwrite an element of a list parameter (e.g. `l_hard`)
    AddNested {
        group: String,
        name: String,
        value: String,
    },
}

impl Mutation {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Mutation::Set {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn add_nested(
        group: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Mutation::AddNested {
            group: group.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Name of the top-level parameter modified by this mutation.
    pub fn target(&self) -> &str {
        match self {
            Mutation::Set { name, .. } => name,
            Mutation::AddNested { group, .. } => group,
        }
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::Set { name, value } => write!(f, "{name}={value}"),
            Mutation::AddNested { group, name, value } => write!(f, "{group}/{name}={value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(Option<String>),
    /// Accept the job with the parameters modified by the verifier
    Correct(Option<String>),
    Reject(Option<String>),
}

impl Decision {
    /// Name of the decision in the JSV protocol.
    pub fn state(&self) -> &'static str {
        match self {
            Decision::Accept(_) => "ACCEPT",
            Decision::Correct(_) => "CORRECT",
            Decision::Reject(_) => "REJECT",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Accept(msg) | Decision::Correct(msg) | Decision::Reject(msg) => {
                msg.as_deref()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: LogLevel,
    pub message: String,
}

/// Outcome of a single job verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub mutations: Vec<Mutation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Verdict {
    pub fn new(decision: Decision) -> Self {
        Verdict {
            decision,
            mutations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_modified(&self) -> bool {
        !self.mutations.is_empty()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level,
            message: message.into(),
        });
    }

    /// Parameters as they look after all mutations are applied.
    pub fn apply_to(&self, params: &ParamSet) -> ParamSet {
        let mut params = params.clone();
        for mutation in &self.mutations {
            params.apply(mutation);
        }
        params
    }

    /// Top-level parameters touched by the mutations, in the order of their first change.
    pub fn touched_params(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for mutation in &self.mutations {
            let name = mutation.target();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::{Decision, Mutation, Verdict};
    use crate::params::ParamSet;

    #[test]
    fn test_touched_params_first_change_order() {
        let mut verdict = Verdict::new(Decision::Correct(None));
        verdict.mutations = vec![
            Mutation::set("binding_type", "set"),
            Mutation::add_nested("l_hard", "m_mem_free", "2048"),
            Mutation::set("binding_amount", "1"),
            Mutation::add_nested("l_hard", "h_rt", "3600"),
        ];
        assert_eq!(
            verdict.touched_params(),
            vec!["binding_type", "l_hard", "binding_amount"]
        );
    }

    #[test]
    fn test_apply_to_keeps_original() {
        let params = ParamSet::from_iter([("pe_name", "smp")]);
        let mut verdict = Verdict::new(Decision::Correct(None));
        verdict.mutations.push(Mutation::set("pe_name", "mpi"));
        let result = verdict.apply_to(&params);
        assert_eq!(params.get("pe_name"), Some("smp"));
        assert_eq!(result.get("pe_name"), Some("mpi"));
    }

    #[test]
    fn test_decision_message() {
        assert_eq!(Decision::Accept(None).message(), None);
        assert_eq!(
            Decision::Correct(Some("Job was modified".to_string())).message(),
            Some("Job was modified")
        );
        assert_eq!(Decision::Reject(None).state(), "REJECT");
    }

    #[test]
    fn test_mutation_display() {
        assert_eq!(Mutation::set("binding_amount", "4").to_string(), "binding_amount=4");
        assert_eq!(
            Mutation::add_nested("l_hard", "h_rt", "3600").to_string(),
            "l_hard/h_rt=3600"
        );
    }
}
