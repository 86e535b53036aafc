use anyhow::Error;
use jsv::{ParamSet, Verdict};

use crate::config::PolicyConfig;
use crate::output::outputs::Output;

#[derive(Default)]
pub struct Quiet;

impl Output for Quiet {
    fn print_verdict(&self, _params: &ParamSet, verdict: &Verdict) {
        println!("{}", verdict.decision.state())
    }

    fn print_policy(&self, _config: &PolicyConfig) -> anyhow::Result<()> {
        Ok(())
    }

    fn print_error(&self, error: Error) {
        eprintln!("{error:?}");
    }
}
