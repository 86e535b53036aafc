//! Decision procedure applied to every submitted job.
//!
//! The evaluation is a linear sequence of steps, the first step that decides the job wins:
//! 1. context gate (jobs without the configured context marker are accepted untouched)
//! 2. excluded queues (e.g. administrative queues are accepted untouched)
//! 3. automatic core binding
//! 4. automatic memory limit
//! 5. wall-clock time limit
//!
//! Missing parameters are a normal outcome, malformed values only skip the affected change.
mod verifier;

pub use verifier::PolicyVerifier;

use jsv::params::{
    BINDING_AMOUNT, BINDING_EXP_N, BINDING_STRATEGY, BINDING_TYPE, PE_MIN, PE_NAME,
};
use jsv::{Decision, Mutation, ParamSet, Verdict};

use crate::config::{MemoryLimit, Policy, TimeLimit};

pub const MODIFIED_MESSAGE: &str = "Job was modified";

pub const BINDING_STRATEGY_LINEAR: &str = "linear_automatic";
pub const BINDING_TYPE_SET: &str = "set";
pub const BINDING_EXP_N_VALUE: &str = "0";

/// Slot count of jobs without a parallel environment.
pub const DEFAULT_SLOTS: &str = "1";

pub fn evaluate(policy: &Policy, params: &ParamSet) -> Verdict {
    let mut verdict = Verdict::new(Decision::Accept(None));
    let config = policy.config();

    if let Some(gate) = &config.context {
        if params.get(&gate.param) != Some(gate.value.as_str()) {
            log::debug!(
                "Job context {:?} does not match {:?}, skipping verification",
                params.get(&gate.param),
                gate.value
            );
            return verdict;
        }
    }

    if let Some((param, pattern)) = policy.excluded_queues() {
        if let Some(queue) = params.get(param) {
            if pattern.is_match(queue) {
                log::debug!("Queue {queue} is excluded from verification");
                return verdict;
            }
        }
    }

    if config.show_params {
        show_params(&mut verdict, "Initial", params, true);
    }

    let slots = bind_cores(policy, params, &mut verdict);
    if let Some(memory) = &config.memory {
        limit_memory(memory, params, slots.as_deref(), &mut verdict);
    }
    if let Some(time_limit) = &config.time_limit {
        limit_time(time_limit, &mut verdict);
    }

    if config.show_params {
        let params = verdict.apply_to(params);
        show_params(&mut verdict, "Final", &params, false);
    }

    if verdict.is_modified() {
        verdict.decision = Decision::Correct(Some(MODIFIED_MESSAGE.to_string()));
    }
    verdict
}

/// Sets linear core binding for jobs without an explicit binding.
///
/// Returns the number of slots requested by the job (as sent by the scheduler)
/// or `None` if it cannot be determined.
fn bind_cores(policy: &Policy, params: &ParamSet, verdict: &mut Verdict) -> Option<String> {
    if let Some(binding_type) = params.get(BINDING_TYPE) {
        verdict.info(format!(
            "Binding type {binding_type} was already set, skipping automatic core binding"
        ));
        return Some(DEFAULT_SLOTS.to_string());
    }

    let slots = match params.get(PE_NAME) {
        Some(pe_name) if policy.binding_pe().is_match(pe_name) => match params.get(PE_MIN) {
            Some(pe_min) if !pe_min.is_empty() => {
                verdict.info(format!(
                    "Parallel environment {pe_name} qualifies for automatic core binding"
                ));
                pe_min
            }
            _ => {
                verdict.warning(format!(
                    "Parallel environment {pe_name} has no minimal slot count, skipping automatic core binding"
                ));
                return None;
            }
        },
        Some(pe_name) => {
            verdict.info(format!(
                "Parallel environment {pe_name} does not qualify for automatic core binding"
            ));
            return Some(DEFAULT_SLOTS.to_string());
        }
        None => DEFAULT_SLOTS,
    };

    verdict.info(format!("Setting automatic core binding to {slots} core(s)"));
    verdict.mutations.extend([
        Mutation::set(BINDING_STRATEGY, BINDING_STRATEGY_LINEAR),
        Mutation::set(BINDING_TYPE, BINDING_TYPE_SET),
        Mutation::set(BINDING_AMOUNT, slots),
        Mutation::set(BINDING_EXP_N, BINDING_EXP_N_VALUE),
    ]);
    Some(slots.to_string())
}

fn parse_slots(slots: &str) -> Option<u64> {
    slots.parse::<u64>().ok()
}

/// Sets a memory limit proportional to the number of slots unless the job already has one.
fn limit_memory(
    memory: &MemoryLimit,
    params: &ParamSet,
    slots: Option<&str>,
    verdict: &mut Verdict,
) {
    if let Some(limit) = params.get_nested(&memory.group, &memory.resource) {
        verdict.info(format!(
            "Memory limit {limit} was already set, skipping automatic memory limit"
        ));
        return;
    }
    let Some(slots) = slots else {
        verdict.error("Unknown number of slots, cannot set memory limit");
        return;
    };
    match parse_slots(slots).and_then(|count| count.checked_mul(memory.per_slot_mib)) {
        Some(limit) => {
            verdict.info(format!("Setting automatic memory limit to {limit} MiB"));
            verdict.mutations.push(Mutation::add_nested(
                &memory.group,
                &memory.resource,
                limit.to_string(),
            ));
        }
        None => {
            verdict.error(format!(
                "Cannot convert slot count {slots:?} to a non-negative integer, cannot set memory limit"
            ));
        }
    }
}

/// Overwrites the wall-clock limit of every job.
fn limit_time(time_limit: &TimeLimit, verdict: &mut Verdict) {
    let seconds = time_limit.limit.as_secs();
    verdict.info(format!("Setting wall-clock limit to {seconds} seconds"));
    verdict.mutations.push(Mutation::add_nested(
        &time_limit.group,
        &time_limit.resource,
        seconds.to_string(),
    ));
}

fn show_params(verdict: &mut Verdict, title: &str, params: &ParamSet, with_envs: bool) {
    verdict.info(format!("--------------- {title} Params -----------------"));
    for (name, value) in params.params() {
        verdict.info(format!("{name} = {value}"));
    }
    if with_envs {
        for (name, value) in params.envs() {
            verdict.info(format!("env {name} = {value}"));
        }
    }
    verdict.info("------------------------------------------------");
}
