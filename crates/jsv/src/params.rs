use crate::Map;
use crate::verdict::Mutation;

/// Known job parameters
pub const JOB_ID: &str = "JOB_ID";
pub const CONTEXT: &str = "ac";
pub const QUEUE_HARD: &str = "q_hard";
pub const PE_NAME: &str = "pe_name";
pub const PE_MIN: &str = "pe_min";
pub const BINDING_TYPE: &str = "binding_type";
pub const BINDING_STRATEGY: &str = "binding_strategy";
pub const BINDING_AMOUNT: &str = "binding_amount";
pub const BINDING_EXP_N: &str = "binding_exp_n";
pub const LIMITS_HARD: &str = "l_hard";

/// Known resources inside of [`LIMITS_HARD`]
pub const MEMORY_RESOURCE: &str = "m_mem_free";
pub const WALLTIME_RESOURCE: &str = "h_rt";

const LIST_SEPARATOR: &str = ",";

/// Iterates over the elements of a list parameter.
/// Each element is either `name=value` or a bare `name`.
fn list_entries(value: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    value
        .split(LIST_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (entry, None),
        })
}

fn format_entry(name: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{name}={value}"),
        None => name.to_string(),
    }
}

/// Snapshot of the parameters (and optionally the environment) of a single job submission.
///
/// Nested parameters (e.g. hard resource limits) are kept in the encoding used by the
/// scheduler, a comma separated list stored under a single top-level parameter
/// (`l_hard` = `h_rt=3600,m_mem_free=2048`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSet {
    params: Map<String, String>,
    envs: Map<String, String>,
}

impl ParamSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Returns the value of `name` inside of the list parameter `group`.
    /// An element without a value (`name` instead of `name=value`) yields an empty string.
    pub fn get_nested(&self, group: &str, name: &str) -> Option<&str> {
        list_entries(self.get(group)?)
            .find(|(entry, _)| *entry == name)
            .map(|(_, value)| value.unwrap_or(""))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Sets `name` inside of the list parameter `group`.
    /// An existing element is replaced in place, otherwise the element is appended.
    pub fn add_nested(&mut self, group: &str, name: &str, value: &str) {
        let current = self.params.get(group).map(|v| v.as_str()).unwrap_or("");
        let mut replaced = false;
        let mut entries: Vec<String> = list_entries(current)
            .map(|(entry, entry_value)| {
                if entry == name {
                    replaced = true;
                    format_entry(name, Some(value))
                } else {
                    format_entry(entry, entry_value)
                }
            })
            .collect();
        if !replaced {
            entries.push(format_entry(name, Some(value)));
        }
        self.params.insert(group.to_string(), entries.join(LIST_SEPARATOR));
    }

    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Set { name, value } => self.set(name.as_str(), value.as_str()),
            Mutation::AddNested { group, name, value } => self.add_nested(group, name, value),
        }
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get_env(&self, name: &str) -> Option<&str> {
        self.envs.get(name).map(|v| v.as_str())
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.envs.insert(name.into(), value.into());
    }

    pub fn remove_env(&mut self, name: &str) -> Option<String> {
        self.envs.remove(name)
    }

    pub fn envs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.params.clear();
        self.envs.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ParamSet {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            envs: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LIMITS_HARD, ParamSet};
    use crate::verdict::Mutation;

    #[test]
    fn test_get_missing() {
        let params = ParamSet::from_iter([("pe_name", "smp")]);
        assert_eq!(params.get("pe_name"), Some("smp"));
        assert_eq!(params.get("pe_min"), None);
        assert!(!params.contains("pe_min"));
    }

    #[test]
    fn test_get_empty_value() {
        let params = ParamSet::from_iter([("binding_type", "")]);
        assert!(params.contains("binding_type"));
        assert_eq!(params.get("binding_type"), Some(""));
    }

    #[test]
    fn test_get_nested() {
        let params = ParamSet::from_iter([(LIMITS_HARD, "h_rt=100,m_mem_free=4G,exclusive")]);
        assert_eq!(params.get_nested(LIMITS_HARD, "h_rt"), Some("100"));
        assert_eq!(params.get_nested(LIMITS_HARD, "m_mem_free"), Some("4G"));
        assert_eq!(params.get_nested(LIMITS_HARD, "exclusive"), Some(""));
        assert_eq!(params.get_nested(LIMITS_HARD, "gpu"), None);
        assert_eq!(params.get_nested("l_soft", "h_rt"), None);
    }

    #[test]
    fn test_get_nested_prefix_is_not_a_match() {
        let params = ParamSet::from_iter([(LIMITS_HARD, "h_rt_max=100")]);
        assert_eq!(params.get_nested(LIMITS_HARD, "h_rt"), None);
    }

    #[test]
    fn test_add_nested_creates_group() {
        let mut params = ParamSet::new();
        params.add_nested(LIMITS_HARD, "h_rt", "3600");
        assert_eq!(params.get(LIMITS_HARD), Some("h_rt=3600"));
    }

    #[test]
    fn test_add_nested_appends() {
        let mut params = ParamSet::from_iter([(LIMITS_HARD, "exclusive,m_mem_free=2048")]);
        params.add_nested(LIMITS_HARD, "h_rt", "3600");
        assert_eq!(
            params.get(LIMITS_HARD),
            Some("exclusive,m_mem_free=2048,h_rt=3600")
        );
    }

    #[test]
    fn test_add_nested_replaces_in_place() {
        let mut params = ParamSet::from_iter([(LIMITS_HARD, "h_rt=10,m_mem_free=2048")]);
        params.add_nested(LIMITS_HARD, "h_rt", "3600");
        assert_eq!(params.get(LIMITS_HARD), Some("h_rt=3600,m_mem_free=2048"));
    }

    #[test]
    fn test_apply_mutations() {
        let mut params = ParamSet::new();
        params.apply(&Mutation::set("binding_amount", "4"));
        params.apply(&Mutation::add_nested(LIMITS_HARD, "m_mem_free", "8192"));
        assert_eq!(params.get("binding_amount"), Some("4"));
        assert_eq!(params.get_nested(LIMITS_HARD, "m_mem_free"), Some("8192"));
    }

    #[test]
    fn test_envs() {
        let mut params = ParamSet::new();
        params.set_env("HOME", "/home/user");
        assert_eq!(params.get_env("HOME"), Some("/home/user"));
        assert!(params.is_empty());
        assert_eq!(params.remove_env("HOME").as_deref(), Some("/home/user"));
        assert_eq!(params.get_env("HOME"), None);
    }
}
