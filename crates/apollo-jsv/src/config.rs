use std::path::Path;
use std::time::Duration;

use jsv::params::{CONTEXT, LIMITS_HARD, MEMORY_RESOURCE, QUEUE_HARD, WALLTIME_RESOURCE};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::error::ApolloError;
use crate::common::time::{deserialize_human_duration, serialize_human_duration};

pub const DEFAULT_CONTEXT_VALUE: &str = "jsv";
pub const DEFAULT_EXCLUDED_QUEUES: &str = "admin.q*";
pub const DEFAULT_BINDING_PE_PATTERN: &str = "(openmp|smp)";
pub const DEFAULT_MEMORY_PER_SLOT_MIB: u64 = 2048;
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(3600);

fn default_context_param() -> String {
    CONTEXT.to_string()
}

fn default_context_value() -> String {
    DEFAULT_CONTEXT_VALUE.to_string()
}

fn default_queue_param() -> String {
    QUEUE_HARD.to_string()
}

fn default_excluded_queues() -> String {
    DEFAULT_EXCLUDED_QUEUES.to_string()
}

fn default_pe_pattern() -> String {
    DEFAULT_BINDING_PE_PATTERN.to_string()
}

fn default_limits_group() -> String {
    LIMITS_HARD.to_string()
}

fn default_memory_resource() -> String {
    MEMORY_RESOURCE.to_string()
}

fn default_memory_per_slot() -> u64 {
    DEFAULT_MEMORY_PER_SLOT_MIB
}

fn default_walltime_resource() -> String {
    WALLTIME_RESOURCE.to_string()
}

fn default_time_limit() -> Duration {
    DEFAULT_TIME_LIMIT
}

/// Only jobs whose context marker equals `value` are subject to the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextGate {
    #[serde(default = "default_context_param")]
    pub param: String,
    #[serde(default = "default_context_value")]
    pub value: String,
}

impl Default for ContextGate {
    fn default() -> Self {
        ContextGate {
            param: default_context_param(),
            value: default_context_value(),
        }
    }
}

/// Jobs submitted to a hard queue matching `pattern` are accepted without changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueExclusion {
    #[serde(default = "default_queue_param")]
    pub param: String,
    #[serde(default = "default_excluded_queues")]
    pub pattern: String,
}

impl Default for QueueExclusion {
    fn default() -> Self {
        QueueExclusion {
            param: default_queue_param(),
            pattern: default_excluded_queues(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Parallel environments that receive automatic core binding
    #[serde(default = "default_pe_pattern")]
    pub pe_pattern: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        BindingConfig {
            pe_pattern: default_pe_pattern(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryLimit {
    #[serde(default = "default_limits_group")]
    pub group: String,
    #[serde(default = "default_memory_resource")]
    pub resource: String,
    #[serde(default = "default_memory_per_slot")]
    pub per_slot_mib: u64,
}

impl Default for MemoryLimit {
    fn default() -> Self {
        MemoryLimit {
            group: default_limits_group(),
            resource: default_memory_resource(),
            per_slot_mib: default_memory_per_slot(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeLimit {
    #[serde(default = "default_limits_group")]
    pub group: String,
    #[serde(default = "default_walltime_resource")]
    pub resource: String,
    #[serde(
        default = "default_time_limit",
        deserialize_with = "deserialize_human_duration",
        serialize_with = "serialize_human_duration"
    )]
    pub limit: Duration,
}

impl Default for TimeLimit {
    fn default() -> Self {
        TimeLimit {
            group: default_limits_group(),
            resource: default_walltime_resource(),
            limit: default_time_limit(),
        }
    }
}

/// Description of a verification policy, usually loaded from a TOML file.
///
/// Checks that are represented by an `Option` are disabled when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Log all job parameters before and after the verification
    #[serde(default)]
    pub show_params: bool,
    /// Ask the scheduler to send the submission environment
    #[serde(default)]
    pub send_env: bool,
    #[serde(default)]
    pub context: Option<ContextGate>,
    #[serde(default)]
    pub excluded_queues: Option<QueueExclusion>,
    #[serde(default)]
    pub binding: BindingConfig,
    #[serde(default)]
    pub memory: Option<MemoryLimit>,
    #[serde(default)]
    pub time_limit: Option<TimeLimit>,
}

impl PolicyConfig {
    pub fn parse(str: &str) -> crate::Result<PolicyConfig> {
        Ok(toml::from_str(str)?)
    }

    pub fn load(path: &Path) -> crate::Result<PolicyConfig> {
        log::debug!("Loading policy from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Built-in policies.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Preset {
    /// Core binding, memory limit of 2 GiB per slot and one hour of wall-clock time for all jobs
    #[default]
    Apollo,
    /// Core binding for jobs submitted with the `jsv` context, except administrative queues
    Context,
}

impl Preset {
    pub fn config(&self) -> PolicyConfig {
        match self {
            Preset::Apollo => PolicyConfig {
                show_params: true,
                send_env: false,
                context: None,
                excluded_queues: None,
                binding: BindingConfig::default(),
                memory: Some(MemoryLimit::default()),
                time_limit: Some(TimeLimit::default()),
            },
            Preset::Context => PolicyConfig {
                show_params: false,
                send_env: false,
                context: Some(ContextGate::default()),
                excluded_queues: Some(QueueExclusion::default()),
                binding: BindingConfig::default(),
                memory: None,
                time_limit: None,
            },
        }
    }
}

/// Validated policy with compiled patterns.
#[derive(Debug, Clone)]
pub struct Policy {
    config: PolicyConfig,
    excluded_queues: Option<Regex>,
    binding_pe: Regex,
}

impl Policy {
    pub fn new(config: PolicyConfig) -> crate::Result<Self> {
        if let Some(context) = &config.context {
            if context.param.is_empty() {
                return Err(ApolloError::ConfigError(
                    "Context parameter name cannot be empty".into(),
                ));
            }
        }
        if let Some(memory) = &config.memory {
            if memory.per_slot_mib == 0 {
                return Err(ApolloError::ConfigError(
                    "Memory per slot has to be positive".into(),
                ));
            }
        }
        if let Some(time_limit) = &config.time_limit {
            if time_limit.limit.as_secs() == 0 {
                return Err(ApolloError::ConfigError(
                    "Time limit has to be at least one second".into(),
                ));
            }
        }
        let excluded_queues = config
            .excluded_queues
            .as_ref()
            .map(|exclusion| Regex::new(&exclusion.pattern))
            .transpose()?;
        let binding_pe = Regex::new(&config.binding.pe_pattern)?;
        Ok(Policy {
            config,
            excluded_queues,
            binding_pe,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Parameter holding the hard queue list and the pattern of excluded queues.
    pub fn excluded_queues(&self) -> Option<(&str, &Regex)> {
        match (&self.config.excluded_queues, &self.excluded_queues) {
            (Some(exclusion), Some(pattern)) => Some((exclusion.param.as_str(), pattern)),
            _ => None,
        }
    }

    pub fn binding_pe(&self) -> &Regex {
        &self.binding_pe
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::{Policy, PolicyConfig, Preset};
    use crate::common::error::ApolloError;

    #[test]
    fn test_parse_empty_policy() {
        let config = PolicyConfig::parse("").unwrap();
        assert_eq!(config, PolicyConfig::default());
        assert!(config.memory.is_none());
        assert!(config.time_limit.is_none());
        assert_eq!(config.binding.pe_pattern, "(openmp|smp)");
    }

    #[test]
    fn test_parse_full_policy() {
        let config = PolicyConfig::parse(
            r#"
        show_params = true

        [context]
        value = "batch"

        [excluded_queues]
        pattern = "^(admin|test)\\.q"

        [binding]
        pe_pattern = "^omp$"

        [memory]
        per_slot_mib = 4096

        [time_limit]
        limit = "2h"
        "#,
        )
        .unwrap();
        assert!(config.show_params);
        let context = config.context.as_ref().unwrap();
        assert_eq!(context.param, "ac");
        assert_eq!(context.value, "batch");
        assert_eq!(config.excluded_queues.as_ref().unwrap().param, "q_hard");
        let memory = config.memory.as_ref().unwrap();
        assert_eq!(memory.group, "l_hard");
        assert_eq!(memory.resource, "m_mem_free");
        assert_eq!(memory.per_slot_mib, 4096);
        assert_eq!(
            config.time_limit.as_ref().unwrap().limit,
            Duration::from_secs(7200)
        );
    }

    #[test]
    fn test_parse_hms_time_limit() {
        let config = PolicyConfig::parse(
            r#"
        [time_limit]
        limit = "00:30:00"
        "#,
        )
        .unwrap();
        assert_eq!(config.time_limit.unwrap().limit, Duration::from_secs(1800));
    }

    #[test]
    fn test_unknown_fields() {
        let r = PolicyConfig::parse(
            r#"
        [memory]
        per_slot = 1024
        "#,
        );
        assert!(matches!(r, Err(ApolloError::DeserializationError(_))));
    }

    #[test]
    fn test_invalid_time_limit() {
        let r = PolicyConfig::parse(
            r#"
        [time_limit]
        limit = "forever"
        "#,
        );
        assert!(matches!(r, Err(ApolloError::DeserializationError(_))));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut config = Preset::Apollo.config();
        config.binding.pe_pattern = "(smp".to_string();
        assert!(matches!(
            Policy::new(config),
            Err(ApolloError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_memory_per_slot() {
        let config = PolicyConfig::parse(
            r#"
        [memory]
        per_slot_mib = 0
        "#,
        )
        .unwrap();
        assert!(matches!(
            Policy::new(config),
            Err(ApolloError::ConfigError(_))
        ));
    }

    #[test]
    fn test_presets_are_valid() {
        let apollo = Policy::new(Preset::Apollo.config()).unwrap();
        assert!(apollo.excluded_queues().is_none());
        assert!(apollo.config().context.is_none());

        let context = Policy::new(Preset::Context.config()).unwrap();
        let (param, pattern) = context.excluded_queues().unwrap();
        assert_eq!(param, "q_hard");
        assert!(pattern.is_match("admin.q"));
        assert!(!pattern.is_match("all.q"));
        assert!(context.config().memory.is_none());
        assert!(context.config().time_limit.is_none());
    }

    #[test]
    fn test_preset_roundtrip_through_toml() {
        let config = Preset::Apollo.config();
        let text = config.to_toml().unwrap();
        assert_eq!(PolicyConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_shipped_policies_match_presets() {
        let apollo = PolicyConfig::parse(include_str!("../../../policies/apollo.toml")).unwrap();
        assert_eq!(apollo, Preset::Apollo.config());
        let context = PolicyConfig::parse(include_str!("../../../policies/context.toml")).unwrap();
        assert_eq!(context, Preset::Context.config());
    }

    #[test]
    fn test_load_policy_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[time_limit]\nlimit = \"10m\"").unwrap();
        let config = PolicyConfig::load(file.path()).unwrap();
        assert_eq!(config.time_limit.unwrap().limit, Duration::from_secs(600));
    }
}
