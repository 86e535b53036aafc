use jsv::params::JOB_ID;
use jsv::{ParamSet, Verdict, Verifier};

use crate::config::Policy;
use crate::policy::evaluate;

/// Connects a [`Policy`] to a JSV session.
pub struct PolicyVerifier {
    policy: Policy,
    verified: u64,
}

impl PolicyVerifier {
    pub fn new(policy: Policy) -> Self {
        PolicyVerifier {
            policy,
            verified: 0,
        }
    }

    /// Number of jobs verified so far.
    pub fn verified(&self) -> u64 {
        self.verified
    }
}

impl Verifier for PolicyVerifier {
    fn on_start(&mut self) -> bool {
        log::debug!("Verification of a new job started");
        self.policy.config().send_env
    }

    fn verify(&mut self, params: &ParamSet) -> Verdict {
        self.verified += 1;
        let verdict = evaluate(&self.policy, params);
        log::debug!(
            "Job {} verified: {} ({} change(s))",
            params.get(JOB_ID).unwrap_or("<unknown>"),
            verdict.decision.state(),
            verdict.mutations.len()
        );
        verdict
    }
}

#[cfg(test)]
mod tests {
    use jsv::Session;

    use super::PolicyVerifier;
    use crate::config::{Policy, Preset};

    fn run_session(preset: Preset, input: &str) -> String {
        let mut verifier = PolicyVerifier::new(Policy::new(preset.config()).unwrap());
        let mut output = Vec::new();
        Session::new(&mut verifier, input.as_bytes(), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_session_smp_job() {
        let mut config = Preset::Apollo.config();
        config.show_params = false;
        let mut verifier = PolicyVerifier::new(Policy::new(config).unwrap());
        let mut output = Vec::new();
        Session::new(
            &mut verifier,
            "START\nPARAM JOB_ID 42\nPARAM pe_name smp\nPARAM pe_min 4\nBEGIN\nQUIT\n".as_bytes(),
            &mut output,
        )
        .run()
        .unwrap();
        assert_eq!(verifier.verified(), 1);
        insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r###"
        STARTED
        LOG INFO Parallel environment smp qualifies for automatic core binding
        LOG INFO Setting automatic core binding to 4 core(s)
        LOG INFO Setting automatic memory limit to 8192 MiB
        LOG INFO Setting wall-clock limit to 3600 seconds
        PARAM binding_strategy linear_automatic
        PARAM binding_type set
        PARAM binding_amount 4
        PARAM binding_exp_n 0
        PARAM l_hard m_mem_free=8192,h_rt=3600
        RESULT STATE CORRECT Job was modified
        "###);
    }

    #[test]
    fn test_session_context_preset() {
        let output = run_session(
            Preset::Context,
            "START\nPARAM q_hard all.q\nBEGIN\nSTART\nPARAM ac jsv\nPARAM q_hard admin.q\nBEGIN\nSTART\nPARAM ac jsv\nPARAM pe_name mpi\nBEGIN\nQUIT\n",
        );
        insta::assert_snapshot!(output, @r###"
        STARTED
        RESULT STATE ACCEPT
        STARTED
        RESULT STATE ACCEPT
        STARTED
        LOG INFO Parallel environment mpi does not qualify for automatic core binding
        RESULT STATE ACCEPT
        "###);
    }

    #[test]
    fn test_session_send_env() {
        let mut config = Preset::Context.config();
        config.send_env = true;
        let mut verifier = PolicyVerifier::new(Policy::new(config).unwrap());
        let mut output = Vec::new();
        Session::new(
            &mut verifier,
            "START\nBEGIN\nSTART\nQUIT\n".as_bytes(),
            &mut output,
        )
        .run()
        .unwrap();
        insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r###"
        SEND ENV
        STARTED
        RESULT STATE ACCEPT
        SEND ENV
        STARTED
        "###);
    }
}
