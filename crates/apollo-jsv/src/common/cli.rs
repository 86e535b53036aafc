use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::Preset;
use crate::output::outputs::Outputs;

#[derive(clap::ValueEnum, Clone)]
pub enum ColorPolicy {
    /// Use colors if the stdout is detected to be a terminal.
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Path to a TOML file with the verification policy
    ///
    /// Overrides `--preset` when used.
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        global = true,
        env = "APOLLO_JSV_POLICY",
        help_heading("GLOBAL OPTIONS")
    )]
    pub policy: Option<PathBuf>,

    /// Built-in policy used when no policy file is given
    #[arg(
        long,
        default_value_t = Preset::Apollo,
        value_enum,
        global = true,
        env = "APOLLO_JSV_PRESET",
        help_heading("GLOBAL OPTIONS")
    )]
    pub preset: Preset,

    /// Sets console color policy
    #[arg(
        long,
        default_value_t = ColorPolicy::Auto,
        value_enum,
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub colors: ColorPolicy,

    /// Sets output formatting
    #[arg(
        long,
        env = "APOLLO_JSV_OUTPUT_MODE",
        default_value_t = Outputs::CLI,
        value_enum,
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub output_mode: Outputs,

    /// Enables more detailed log output
    #[arg(
        long,
        env = "APOLLO_JSV_DEBUG",
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub debug: bool,
}

// Root CLI options
#[derive(Parser)]
#[command(
    author,
    about,
    version(crate::APOLLO_JSV_VERSION),
    disable_help_subcommand(true),
    help_expected(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: Option<SubCommand>,
}

#[derive(Subcommand, Default)]
pub enum SubCommand {
    /// Verify jobs using the JSV protocol on stdin/stdout
    ///
    /// This is the default command, the scheduler starts the JSV without arguments.
    #[default]
    Run,
    /// Verify a single job described by a JSON file and print the result
    Evaluate(EvaluateOpts),
    /// Print the effective verification policy
    Policy,
    /// Generate shell completion script
    GenerateCompletion(GenerateCompletionOpts),
}

#[derive(Parser)]
pub struct EvaluateOpts {
    /// Path to a JSON object with job parameters, e.g. `{"pe_name": "smp", "pe_min": 4}`.
    /// Values are strings, numbers or booleans (sent as `y`/`n`).
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub params: PathBuf,
}

#[derive(Parser)]
pub struct GenerateCompletionOpts {
    /// Shell flavour for which the completion script should be generated
    #[arg(value_enum)]
    pub shell: Shell,
}
