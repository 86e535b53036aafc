use std::io;
use std::io::IsTerminal;

use clap::{CommandFactory, FromArgMatches};
use clap_complete::generate;
use cli_table::ColorChoice;
use serde::Deserialize;

use apollo_jsv::common::cli::{
    ColorPolicy, CommonOpts, EvaluateOpts, GenerateCompletionOpts, RootOptions, SubCommand,
};
use apollo_jsv::common::error::error;
use apollo_jsv::common::setup::setup_logging;
use apollo_jsv::globalsettings::GlobalSettings;
use apollo_jsv::output::cli::CliOutput;
use apollo_jsv::output::json::JsonOutput;
use apollo_jsv::output::outputs::{Output, Outputs};
use apollo_jsv::output::quiet::Quiet;
use apollo_jsv::policy::{PolicyVerifier, evaluate};
use jsv::{ParamSet, Session};

// Commands

fn command_run(gsettings: &GlobalSettings) -> anyhow::Result<()> {
    let policy = gsettings.load_policy()?;
    let mut verifier = PolicyVerifier::new(policy);

    let stdin = io::stdin();
    let stdout = io::stdout();
    Session::new(&mut verifier, stdin.lock(), stdout.lock()).run()?;

    log::debug!("Verified {} job(s)", verifier.verified());
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

fn load_params(opts: &EvaluateOpts) -> apollo_jsv::Result<ParamSet> {
    let content = std::fs::read_to_string(&opts.params)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let serde_json::Value::Object(object) = value else {
        return error(format!(
            "Job parameters in {} have to be a JSON object",
            opts.params.display()
        ));
    };
    let mut params = ParamSet::new();
    for (name, value) in object {
        let value = match ParamValue::deserialize(value) {
            Ok(ParamValue::Int(n)) => n.to_string(),
            Ok(ParamValue::Float(n)) => n.to_string(),
            Ok(ParamValue::Bool(b)) => if b { "y" } else { "n" }.to_string(),
            Ok(ParamValue::String(s)) => s,
            Err(_) => {
                return error(format!(
                    "Job parameter {name} has to be a string, a number or a boolean"
                ));
            }
        };
        params.set(name, value);
    }
    Ok(params)
}

fn command_evaluate(gsettings: &GlobalSettings, opts: EvaluateOpts) -> anyhow::Result<()> {
    let policy = gsettings.load_policy()?;
    let params = load_params(&opts)?;
    let verdict = evaluate(&policy, &params);
    gsettings.printer().print_verdict(&params, &verdict);
    Ok(())
}

fn command_policy(gsettings: &GlobalSettings) -> anyhow::Result<()> {
    let policy = gsettings.load_policy()?;
    gsettings.printer().print_policy(policy.config())
}

fn make_global_settings(opts: CommonOpts) -> GlobalSettings {
    let color_policy = match opts.colors {
        ColorPolicy::Always => ColorChoice::AlwaysAnsi,
        ColorPolicy::Auto => {
            if io::stdout().is_terminal() {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        }
        ColorPolicy::Never => ColorChoice::Never,
    };

    // Create Printer
    let printer: Box<dyn Output> = match opts.output_mode {
        Outputs::CLI => {
            // Set colored public for CLI
            match color_policy {
                ColorChoice::Always | ColorChoice::AlwaysAnsi => {
                    colored::control::set_override(true)
                }
                ColorChoice::Never => colored::control::set_override(false),
                _ => {}
            }
            Box::new(CliOutput::new(color_policy))
        }
        Outputs::JSON => Box::<JsonOutput>::default(),
        Outputs::Quiet => Box::<Quiet>::default(),
    };

    GlobalSettings::new(opts.policy, opts.preset, printer)
}

fn generate_completion(opts: GenerateCompletionOpts) -> anyhow::Result<()> {
    let generator = opts.shell;
    let mut app = RootOptions::command();
    eprintln!("Generating completion file for {generator}...");
    generate(generator, &mut app, "apollo-jsv".to_string(), &mut io::stdout());
    Ok(())
}

fn main() -> apollo_jsv::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.debug);

    let gsettings = make_global_settings(top_opts.common);

    let result = match top_opts.subcmd.unwrap_or_default() {
        SubCommand::Run => command_run(&gsettings),
        SubCommand::Evaluate(opts) => command_evaluate(&gsettings, opts),
        SubCommand::Policy => command_policy(&gsettings),
        SubCommand::GenerateCompletion(opts) => generate_completion(opts),
    };

    if let Err(e) = result {
        gsettings.printer().print_error(e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use apollo_jsv::common::cli::EvaluateOpts;

    use super::load_params;

    fn write_params(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_params() {
        let file = write_params(r#"{"pe_name": "smp", "pe_min": 4, "l_hard": "h_rt=60"}"#);
        let params = load_params(&EvaluateOpts {
            params: file.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(params.get("pe_name"), Some("smp"));
        assert_eq!(params.get("pe_min"), Some("4"));
        assert_eq!(params.get_nested("l_hard", "h_rt"), Some("60"));
    }

    #[test]
    fn test_load_params_float_and_bool() {
        let file = write_params(r#"{"pe_min": 4.0, "pe_max": 2.5, "R": true, "b": false}"#);
        let params = load_params(&EvaluateOpts {
            params: file.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(params.get("pe_min"), Some("4"));
        assert_eq!(params.get("pe_max"), Some("2.5"));
        assert_eq!(params.get("R"), Some("y"));
        assert_eq!(params.get("b"), Some("n"));
    }

    #[test]
    fn test_load_params_nested_value() {
        let file = write_params(r#"{"pe_name": ["smp"]}"#);
        let error = load_params(&EvaluateOpts {
            params: file.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(error.to_string().contains("pe_name"));
    }

    #[test]
    fn test_load_params_not_an_object() {
        let file = write_params(r#"["pe_name", "smp"]"#);
        assert!(
            load_params(&EvaluateOpts {
                params: file.path().to_path_buf(),
            })
            .is_err()
        );
    }
}
