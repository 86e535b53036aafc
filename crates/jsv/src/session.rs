//! Line based JSV protocol spoken between the scheduler and a verification process.
//!
//! The scheduler writes commands (`START`, `PARAM`, `ENV`, `BEGIN`, `QUIT`) to the standard
//! input of the JSV and reads its answers (`STARTED`, `PARAM`, `LOG`, `RESULT`, `ERROR`)
//! from the standard output. Every job is a `START`, `PARAM`/`ENV`, `BEGIN` cycle; after the
//! `RESULT` line the session waits for the next `START`.
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::ops::ControlFlow;

use crate::error::{JsvError, protocol_error};
use crate::params::ParamSet;
use crate::verdict::{Decision, LogLevel, Verdict};

/// Callback registered for every job submitted to the scheduler.
pub trait Verifier {
    /// Invoked on every `START`, i.e. once per job.
    /// Returns `true` if the submission environment of the job should be sent to the JSV.
    fn on_start(&mut self) -> bool {
        false
    }

    fn verify(&mut self, params: &ParamSet) -> Verdict;
}

impl<V: Verifier + ?Sized> Verifier for &mut V {
    fn on_start(&mut self) -> bool {
        (**self).on_start()
    }

    fn verify(&mut self, params: &ParamSet) -> Verdict {
        (**self).verify(params)
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Initialized,
    Started,
    Verifying,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionState::Initialized => "initialized",
            SessionState::Started => "started",
            SessionState::Verifying => "verifying",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Begin,
    Quit,
    Param { name: &'a str, value: &'a str },
    EnvAdd { name: &'a str, value: &'a str },
    EnvMod { name: &'a str, value: &'a str },
    EnvDel { name: &'a str },
}

fn split_name_value(input: &str) -> crate::Result<(&str, &str)> {
    let (name, value) = input.split_once(' ').unwrap_or((input, ""));
    if name.is_empty() {
        return protocol_error("Missing name".to_string());
    }
    Ok((name, value))
}

fn parse_command(line: &str) -> crate::Result<Command<'_>> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "START" => Ok(Command::Start),
        "BEGIN" => Ok(Command::Begin),
        "QUIT" => Ok(Command::Quit),
        "PARAM" => {
            let (name, value) = split_name_value(rest)?;
            Ok(Command::Param { name, value })
        }
        "ENV" => {
            let (action, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            match action {
                "ADD" => {
                    let (name, value) = split_name_value(rest)?;
                    Ok(Command::EnvAdd { name, value })
                }
                "MOD" => {
                    let (name, value) = split_name_value(rest)?;
                    Ok(Command::EnvMod { name, value })
                }
                "DEL" => {
                    let (name, _) = split_name_value(rest)?;
                    Ok(Command::EnvDel { name })
                }
                _ => protocol_error(format!("JSV script got unknown ENV action \"{action}\"")),
            }
        }
        _ => protocol_error(format!("JSV script got unknown command \"{command}\"")),
    }
}

pub struct Session<V, R, W> {
    verifier: V,
    input: R,
    output: W,
    state: SessionState,
    params: ParamSet,
}

impl<V: Verifier, R: BufRead, W: Write> Session<V, R, W> {
    pub fn new(verifier: V, input: R, output: W) -> Self {
        Session {
            verifier,
            input,
            output,
            state: SessionState::Initialized,
            params: ParamSet::new(),
        }
    }

    /// Processes commands until `QUIT` is received or the input is closed.
    ///
    /// Malformed or unexpected commands are answered with an `ERROR` line and do not end the
    /// session. Only IO errors are returned.
    pub fn run(&mut self) -> crate::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                log::debug!("JSV input was closed");
                return Ok(());
            }
            let command = line.trim_end_matches(['\n', '\r']);
            if let ControlFlow::Break(()) = self.handle_line(command)? {
                log::debug!("JSV session was terminated");
                return Ok(());
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> crate::Result<ControlFlow<()>> {
        if line.trim().is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        log::trace!("Received JSV command: {line}");

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(JsvError::ProtocolError(message)) => {
                self.send_error(&message)?;
                return Ok(ControlFlow::Continue(()));
            }
            Err(error) => return Err(error),
        };

        match command {
            Command::Start => self.handle_start()?,
            Command::Begin => self.handle_begin()?,
            Command::Quit => return Ok(ControlFlow::Break(())),
            Command::Param { name, value } => {
                if self.check_started("PARAM")? {
                    self.params.set(name, value);
                }
            }
            Command::EnvAdd { name, value } | Command::EnvMod { name, value } => {
                if self.check_started("ENV")? {
                    self.params.set_env(name, value);
                }
            }
            Command::EnvDel { name } => {
                if self.check_started("ENV")? {
                    self.params.remove_env(name);
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn check_started(&mut self, command: &str) -> crate::Result<bool> {
        if self.state == SessionState::Started {
            Ok(true)
        } else {
            self.send_error(&format!(
                "JSV script got {command} command but is in state {}",
                self.state
            ))?;
            Ok(false)
        }
    }

    fn handle_start(&mut self) -> crate::Result<()> {
        if self.state != SessionState::Initialized {
            return self.send_error(&format!(
                "JSV script got START command but is in state {}",
                self.state
            ));
        }
        self.params.clear();
        if self.verifier.on_start() {
            self.send("SEND ENV")?;
        }
        self.send("STARTED")?;
        self.state = SessionState::Started;
        Ok(())
    }

    fn handle_begin(&mut self) -> crate::Result<()> {
        if !self.check_started("BEGIN")? {
            return Ok(());
        }
        self.state = SessionState::Verifying;
        let verdict = self.verifier.verify(&self.params);
        self.send_verdict(&verdict)?;
        self.params.clear();
        self.state = SessionState::Initialized;
        Ok(())
    }

    fn send_verdict(&mut self, verdict: &Verdict) -> crate::Result<()> {
        for diagnostic in &verdict.diagnostics {
            log::log!(log::Level::from(diagnostic.level), "{}", diagnostic.message);
            self.send(&format!(
                "LOG {} {}",
                diagnostic.level.as_str(),
                single_line(&diagnostic.message)
            ))?;
        }

        match verdict.decision {
            Decision::Correct(_) => {
                let params = verdict.apply_to(&self.params);
                for name in verdict.touched_params() {
                    let value = params.get(name).unwrap_or_default();
                    self.send(&format!("PARAM {name} {value}"))?;
                }
            }
            _ if verdict.is_modified() => {
                log::warn!(
                    "Ignoring {} parameter change(s) of a job that was not corrected",
                    verdict.mutations.len()
                );
            }
            _ => {}
        }

        let state = verdict.decision.state();
        match verdict.decision.message() {
            Some(message) => self.send(&format!("RESULT STATE {state} {}", single_line(message))),
            None => self.send(&format!("RESULT STATE {state}")),
        }
    }

    fn send_error(&mut self, message: &str) -> crate::Result<()> {
        log::warn!("{message}");
        self.send(&format!("ERROR {message}"))
    }

    fn send(&mut self, line: &str) -> crate::Result<()> {
        log::trace!("Sending JSV command: {line}");
        writeln!(self.output, "{line}")?;
        self.output.flush()?;
        Ok(())
    }
}

/// Protocol messages are line delimited.
fn single_line(message: &str) -> String {
    message.replace(['\n', '\r'], " ")
}
