//! Explicit diagnostic sessions.
//!
//! A [`Session`] is started with a [`Policy`], fed failing lines one at a time
//! and finished to collect what it found. Each failure is re-evaluated
//! incrementally; when a shape-class failure traps, the offending
//! sub-expression and an explanation are recorded alongside the original
//! message.

use std::fmt::{self, Display, Formatter};

use log::{debug, info, warn};

use crate::eval::Evaluator;
use crate::explain::explain;
use crate::host::{Environment, FailureClassifier, Operations, ShapeAccessor};
use crate::parser::parse;
use crate::policy::Policy;

/// What a session learned about one failing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub line: String,
    /// Source form of the smallest failing sub-expression.
    pub offending: String,
    pub explanation: Option<String>,
    /// The original failure message followed by a newline and the
    /// explanation (empty when there is none).
    pub message: String,
}

impl Display for Diagnosis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    policy: Policy,
    diagnoses: Vec<Diagnosis>,
}

impl Session {
    pub fn start(policy: Policy) -> Self {
        debug!("starting session with {} sentinels", policy.sentinels.len());
        Self {
            policy,
            diagnoses: Vec::new(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Re-evaluates `line` after it failed with `message`.
    ///
    /// Returns `None` when the message is not shape-related, the line holds
    /// nothing to analyze or cannot be parsed, or evaluation does not trap.
    pub fn diagnose<H, Env>(
        &mut self,
        host: &H,
        line: &str,
        env: &Env,
        message: &str,
    ) -> Option<Diagnosis>
    where
        H: Operations + FailureClassifier<H::Error> + ShapeAccessor<H::Value> + ?Sized,
        H::Value: std::fmt::Debug,
        Env: Environment<H::Value> + ?Sized,
    {
        if !self.policy.is_interesting(message) {
            debug!("ignoring failure without shape sentinels: {message}");
            return None;
        }

        let node = match parse(line) {
            Ok(Some(node)) => node,
            Ok(None) => {
                debug!("nothing to analyze in `{}`", line.trim());
                return None;
            }
            Err(err) => {
                warn!("cannot analyze `{}`: {err}", line.trim());
                return None;
            }
        };

        let evaluator = Evaluator::new(host, host);
        let err = match evaluator.evaluate(&node, env) {
            Ok(_) => {
                debug!("`{node}` evaluated without failure");
                return None;
            }
            Err(err) => err,
        };
        let Some(trap) = err.as_trap() else {
            debug!("`{node}` failed without a shape trap: {err}");
            return None;
        };

        let explanation = explain(trap, host);
        let diagnosis = Diagnosis {
            line: line.trim().to_string(),
            offending: trap.node.to_string(),
            message: format!("{message}\n{}", explanation.as_deref().unwrap_or_default()),
            explanation,
        };
        info!("diagnosed `{}` at `{}`", diagnosis.line, diagnosis.offending);
        self.diagnoses.push(diagnosis.clone());
        Some(diagnosis)
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    pub fn finish(self) -> Vec<Diagnosis> {
        debug!("finishing session with {} diagnoses", self.diagnoses.len());
        self.diagnoses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{TensorHost, Value};

    const MATMUL_FAILURE: &str = "matmul: Input operand 1 has a mismatch in its core dimension 0";

    fn env() -> rustc_hash::FxHashMap<String, Value> {
        let mut env = TensorHost::prelude();
        env.insert("x".to_string(), Value::tensor([8, 3]));
        env.insert("w".to_string(), Value::tensor([3, 5]));
        env.insert("b".to_string(), Value::tensor([4]));
        env
    }

    #[test]
    fn diagnoses_the_innermost_failure() {
        let mut session = Session::start(Policy::default());
        let diagnosis = session
            .diagnose(
                &TensorHost::new(),
                "    y = np.tanh(x @ w + b)  # layer 1\n",
                &env(),
                "operands could not be broadcast together with shapes (8,5) (4,)",
            )
            .expect("expected a diagnosis");

        assert_eq!(diagnosis.line, "y = np.tanh(x @ w + b)  # layer 1");
        assert_eq!(diagnosis.offending, "x @ w + b");
        assert_eq!(
            diagnosis.explanation.as_deref(),
            Some(
                "Cause: x @ w + b on left operand x @ w w/shape (8, 5) and right operand b w/shape (4,)"
            )
        );
        assert_eq!(
            diagnosis.message,
            "operands could not be broadcast together with shapes (8,5) (4,)\nCause: x @ w + b on left operand x @ w w/shape (8, 5) and right operand b w/shape (4,)"
        );
        assert_eq!(session.finish(), vec![diagnosis]);
    }

    #[test]
    fn uninteresting_messages_are_skipped() {
        let mut session = Session::start(Policy::default());
        let diagnosis = session.diagnose(
            &TensorHost::new(),
            "x @ b",
            &env(),
            "name 'q' is not defined",
        );
        assert_eq!(diagnosis, None);
        assert!(session.diagnoses().is_empty());
    }

    #[test]
    fn unparsable_and_statement_lines_yield_nothing() {
        let mut session = Session::start(Policy::default());
        let host = TensorHost::new();
        assert_eq!(session.diagnose(&host, "x @", &env(), MATMUL_FAILURE), None);
        assert_eq!(session.diagnose(&host, "return x @ b", &env(), MATMUL_FAILURE), None);
        assert_eq!(session.diagnose(&host, "# x @ b", &env(), MATMUL_FAILURE), None);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn non_trap_outcomes_yield_nothing() {
        let mut session = Session::start(Policy::default());
        let host = TensorHost::new();
        // Evaluates cleanly in the replayed environment.
        assert_eq!(session.diagnose(&host, "x @ w", &env(), MATMUL_FAILURE), None);
        // Fails, but not with a shape-class failure.
        assert_eq!(session.diagnose(&host, "x @ q", &env(), MATMUL_FAILURE), None);
        assert_eq!(session.diagnose(&host, "x.weight @ w", &env(), MATMUL_FAILURE), None);
    }

    #[test]
    fn message_keeps_original_text_without_explanation() {
        let mut session = Session::start(Policy::default());
        let diagnosis = session
            .diagnose(&TensorHost::new(), "x.sum() @ w.sum()", &env(), MATMUL_FAILURE)
            .expect("expected a diagnosis");
        assert_eq!(diagnosis.offending, "x.sum() @ w.sum()");
        assert_eq!(diagnosis.explanation, None);
        assert_eq!(diagnosis.message, format!("{MATMUL_FAILURE}\n"));
    }

    #[test]
    fn accumulates_across_lines() {
        let mut session = Session::start(Policy::default());
        let host = TensorHost::new();
        session.diagnose(&host, "x @ b", &env(), MATMUL_FAILURE);
        session.diagnose(&host, "x @ w", &env(), MATMUL_FAILURE);
        session.diagnose(&host, "w @ b", &env(), MATMUL_FAILURE);
        let found = session.finish();
        assert_eq!(
            found.iter().map(|d| d.offending.as_str()).collect::<Vec<_>>(),
            vec!["x @ b", "w @ b"]
        );
    }
}
