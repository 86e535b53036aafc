use anyhow::Error;
use jsv::{ParamSet, Verdict};
use serde_json::json;

use crate::config::PolicyConfig;
use crate::output::outputs::Output;

#[derive(Default)]
pub struct JsonOutput;

impl JsonOutput {
    fn print(&self, data: serde_json::Value) {
        println!("{data:#}");
    }
}

fn format_verdict(params: &ParamSet, verdict: &Verdict) -> serde_json::Value {
    let result: serde_json::Map<String, serde_json::Value> = verdict
        .apply_to(params)
        .params()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect();
    json!({
        "decision": verdict.decision.state(),
        "message": verdict.decision.message(),
        "mutations": verdict.mutations,
        "diagnostics": verdict.diagnostics,
        "params": result,
    })
}

impl Output for JsonOutput {
    fn print_verdict(&self, params: &ParamSet, verdict: &Verdict) {
        self.print(format_verdict(params, verdict));
    }

    fn print_policy(&self, config: &PolicyConfig) -> anyhow::Result<()> {
        self.print(serde_json::to_value(config)?);
        Ok(())
    }

    fn print_error(&self, error: Error) {
        self.print(json!({
            "error": format!("{error:?}")
        }))
    }
}
