use jsv::{ParamSet, Verdict};

use crate::config::PolicyConfig;

#[derive(clap::ValueEnum, Clone)]
pub enum Outputs {
    CLI,
    JSON,
    Quiet,
}

pub trait Output {
    // Verification
    fn print_verdict(&self, params: &ParamSet, verdict: &Verdict);

    // Policy
    fn print_policy(&self, config: &PolicyConfig) -> anyhow::Result<()>;

    // Errors
    fn print_error(&self, error: anyhow::Error);
}
