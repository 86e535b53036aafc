use std::path::{Path, PathBuf};

use crate::config::{Policy, PolicyConfig, Preset};
use crate::output::outputs::Output;

pub struct GlobalSettings {
    policy_path: Option<PathBuf>,
    preset: Preset,
    printer: Box<dyn Output>,
}

impl GlobalSettings {
    pub fn new(policy_path: Option<PathBuf>, preset: Preset, printer: Box<dyn Output>) -> Self {
        GlobalSettings {
            policy_path,
            preset,
            printer,
        }
    }

    pub fn policy_path(&self) -> Option<&Path> {
        self.policy_path.as_deref()
    }

    pub fn printer(&self) -> &dyn Output {
        self.printer.as_ref()
    }

    /// A policy file takes precedence over the selected preset.
    pub fn policy_config(&self) -> crate::Result<PolicyConfig> {
        match self.policy_path() {
            Some(path) => PolicyConfig::load(path),
            None => {
                log::debug!("Using preset policy {:?}", self.preset);
                Ok(self.preset.config())
            }
        }
    }

    pub fn load_policy(&self) -> crate::Result<Policy> {
        Policy::new(self.policy_config()?)
    }
}
