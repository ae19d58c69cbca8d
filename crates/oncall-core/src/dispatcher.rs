//! Concurrent specialist fan-out
//!
//! Every role is called at once against the same redacted prompt. Each
//! call carries its own timeout; one role failing or stalling does not
//! affect the others. The calls are plain futures polled by the request
//! future, so dropping the request abandons them.

use crate::error::SpecialistError;
use crate::redact::RedactedPrompt;
use crate::roster::{Roster, RosterEntry};
use crate::specialist::SpecialistReply;
use futures::future::join_all;
use oncall_composition::{RoleId, SpecialistStatus};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

/// Terminal state of one role's call
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialistRun {
    /// Role
    pub role: RoleId,
    /// Wall time spent
    pub elapsed: Duration,
    /// Reply or failure
    pub outcome: Result<SpecialistReply, SpecialistError>,
    /// Served from fixtures rather than a collaborator
    pub mocked: bool,
}

impl SpecialistRun {
    /// Telemetry status for this run
    #[must_use]
    pub fn status(&self) -> SpecialistStatus {
        match &self.outcome {
            Ok(_) if self.mocked => SpecialistStatus::Mocked,
            Ok(_) => SpecialistStatus::Ok,
            Err(e) if e.is_timeout() => SpecialistStatus::TimedOut,
            Err(_) => SpecialistStatus::Failed,
        }
    }

    /// Did the role return text
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// All runs of one dispatch, in role priority order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    runs: Vec<SpecialistRun>,
}

impl DispatchReport {
    /// Wrap runs already in priority order
    #[must_use]
    pub fn new(runs: Vec<SpecialistRun>) -> Self {
        Self { runs }
    }

    /// Runs in priority order
    #[inline]
    #[must_use]
    pub fn runs(&self) -> &[SpecialistRun] {
        &self.runs
    }

    /// Roles that produced nothing
    #[must_use]
    pub fn gaps(&self) -> Vec<RoleId> {
        self.runs
            .iter()
            .filter(|r| !r.succeeded())
            .map(|r| r.role.clone())
            .collect()
    }

    /// Consume into runs
    #[must_use]
    pub fn into_runs(self) -> Vec<SpecialistRun> {
        self.runs
    }
}

/// Runs every roster role concurrently
#[derive(Debug, Clone)]
pub struct SpecialistDispatcher {
    roster: Roster,
    timeout: Duration,
}

impl SpecialistDispatcher {
    /// Create dispatcher with a per-role timeout
    #[inline]
    #[must_use]
    pub fn new(roster: Roster, timeout: Duration) -> Self {
        Self { roster, timeout }
    }

    /// Roster in use
    #[inline]
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Per-role timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call every role and wait for all of them to finish
    ///
    /// Only redacted prompts are accepted. The report lists roles in
    /// roster order regardless of completion order.
    pub async fn dispatch(&self, prompt: &RedactedPrompt) -> DispatchReport {
        let calls = self
            .roster
            .entries()
            .iter()
            .map(|entry| self.run_one(entry, prompt));
        DispatchReport::new(join_all(calls).await)
    }

    async fn run_one(&self, entry: &RosterEntry, prompt: &RedactedPrompt) -> SpecialistRun {
        let role = entry.role.id.clone();
        let started = Instant::now();

        let outcome = match timeout(self.timeout, entry.client.call(&entry.role.instructions, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(SpecialistError::TimedOut { after: self.timeout }),
        };
        let elapsed = started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(reply) => info!(
                role = %role,
                elapsed_ms,
                model = reply.model.as_deref().unwrap_or("unknown"),
                bytes = reply.text.len(),
                "Specialist completed"
            ),
            Err(error) => warn!(role = %role, elapsed_ms, error = %error, "Specialist failed"),
        }

        SpecialistRun {
            role,
            elapsed,
            outcome,
            mocked: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::SpecialistRole;
    use crate::specialist::{MockSpecialistClient, SpecialistClient};
    use std::sync::Arc;

    fn role(name: &str) -> SpecialistRole {
        SpecialistRole::new(name, vec![], format!("you are {name}"))
    }

    fn replying(text: &'static str) -> Arc<dyn SpecialistClient> {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call()
            .times(1)
            .returning(move |_, _| Ok(SpecialistReply::text(text)));
        Arc::new(mock)
    }

    fn failing(error: SpecialistError) -> Arc<dyn SpecialistClient> {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call()
            .times(1)
            .returning(move |_, _| Err(error.clone()));
        Arc::new(mock)
    }

    #[tokio::test]
    async fn report_follows_roster_order_and_lists_gaps() {
        let roster = Roster::builder()
            .role(role("a"))
            .role(role("b"))
            .role(role("c"))
            .client_for("a", replying("{}"))
            .client_for("b", failing(SpecialistError::Transport("refused".into())))
            .client_for("c", failing(SpecialistError::MalformedResponse("empty".into())))
            .build()
            .unwrap();

        let report = SpecialistDispatcher::new(roster, Duration::from_secs(5))
            .dispatch(&RedactedPrompt::new("incident"))
            .await;

        let roles: Vec<_> = report.runs().iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["a", "b", "c"]);
        assert_eq!(report.gaps(), vec![RoleId::new("b"), RoleId::new("c")]);
        assert_eq!(report.runs()[0].status(), SpecialistStatus::Ok);
        assert_eq!(report.runs()[1].status(), SpecialistStatus::Failed);
    }

    #[tokio::test]
    async fn each_role_gets_its_own_instructions() {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call()
            .withf(|instructions, prompt| instructions == "you are a" && prompt.as_str() == "p")
            .times(1)
            .returning(|_, _| Ok(SpecialistReply::text("{}")));
        let roster = Roster::builder()
            .role(role("a"))
            .default_client(Arc::new(mock))
            .build()
            .unwrap();

        let report = SpecialistDispatcher::new(roster, Duration::from_secs(1))
            .dispatch(&RedactedPrompt::new("p"))
            .await;
        assert!(report.gaps().is_empty());
    }

    #[test]
    fn mocked_runs_report_mocked_status() {
        let run = SpecialistRun {
            role: RoleId::new("a"),
            elapsed: Duration::ZERO,
            outcome: Ok(SpecialistReply::text("{}")),
            mocked: true,
        };
        assert_eq!(run.status(), SpecialistStatus::Mocked);

        let timed_out = SpecialistRun {
            outcome: Err(SpecialistError::TimedOut { after: Duration::from_secs(1) }),
            mocked: false,
            ..run
        };
        assert_eq!(timed_out.status(), SpecialistStatus::TimedOut);
    }
}
