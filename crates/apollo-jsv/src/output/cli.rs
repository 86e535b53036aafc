use cli_table::format::{Justify, Separator};
use cli_table::{Cell, CellStruct, Color, ColorChoice, Style, Table, TableStruct, print_stdout};

use anyhow::Error;
use colored::Color as Colorization;
use colored::Colorize;
use jsv::{Decision, LogLevel, ParamSet, Verdict};

use crate::config::PolicyConfig;
use crate::output::outputs::Output;

pub const DECISION_COLOR_ACCEPT: Colorization = Colorization::Green;
pub const DECISION_COLOR_CORRECT: Colorization = Colorization::Yellow;
pub const DECISION_COLOR_REJECT: Colorization = Colorization::Red;

pub struct CliOutput {
    color_policy: ColorChoice,
}

impl CliOutput {
    pub fn new(color_policy: ColorChoice) -> CliOutput {
        CliOutput { color_policy }
    }

    fn print_vertical_table(&self, rows: Vec<Vec<CellStruct>>) {
        let table = rows.table().separator(
            Separator::builder()
                .column(Some(Default::default()))
                .build(),
        );
        self.print_table(table);
    }

    fn print_horizontal_table(&self, rows: Vec<Vec<CellStruct>>, header: Vec<CellStruct>) {
        let table = rows
            .table()
            .separator(
                Separator::builder()
                    .title(Some(Default::default()))
                    .column(Some(Default::default()))
                    .build(),
            )
            .title(header);
        self.print_table(table);
    }

    fn print_table(&self, table: TableStruct) {
        let table = table.color_choice(self.color_policy);
        if let Err(e) = print_stdout(table) {
            log::error!("Cannot print table to stdout: {:?}", e);
        }
    }
}

fn decision_color(decision: &Decision) -> Color {
    match decision {
        Decision::Accept(_) => Color::Green,
        Decision::Correct(_) => Color::Yellow,
        Decision::Reject(_) => Color::Red,
    }
}

fn format_log_level(level: LogLevel) -> String {
    let color = match level {
        LogLevel::Info => DECISION_COLOR_ACCEPT,
        LogLevel::Warning => DECISION_COLOR_CORRECT,
        LogLevel::Error => DECISION_COLOR_REJECT,
    };
    level.as_str().color(color).to_string()
}

impl Output for CliOutput {
    fn print_verdict(&self, params: &ParamSet, verdict: &Verdict) {
        let decision = &verdict.decision;
        let rows = vec![
            vec![
                "Decision".cell().bold(true),
                decision
                    .state()
                    .cell()
                    .foreground_color(Some(decision_color(decision))),
            ],
            vec![
                "Message".cell().bold(true),
                decision.message().unwrap_or_default().cell(),
            ],
            vec![
                "Changes".cell().bold(true),
                verdict.mutations.len().cell().justify(Justify::Left),
            ],
        ];
        self.print_vertical_table(rows);

        if verdict.is_modified() {
            let result = verdict.apply_to(params);
            let rows: Vec<Vec<CellStruct>> = verdict
                .touched_params()
                .into_iter()
                .map(|name| {
                    vec![
                        name.cell().bold(true),
                        params.get(name).unwrap_or("-").cell(),
                        result.get(name).unwrap_or_default().cell(),
                    ]
                })
                .collect();
            let header = vec![
                "Parameter".cell().bold(true),
                "Submitted".cell().bold(true),
                "Verified".cell().bold(true),
            ];
            self.print_horizontal_table(rows, header);
        }

        for diagnostic in &verdict.diagnostics {
            println!(
                "{} {}",
                format_log_level(diagnostic.level),
                diagnostic.message
            );
        }
    }

    fn print_policy(&self, config: &PolicyConfig) -> anyhow::Result<()> {
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn print_error(&self, error: Error) {
        eprintln!("{error:?}");
    }
}
