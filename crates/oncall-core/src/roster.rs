//! Specialist roles and their collaborator handles
//!
//! Role order is priority order: dispatch results and fragment merging
//! both follow it.

use crate::error::RosterError;
use crate::prompt::{
    role_instructions, COMMS_PREAMBLE, PIR_PREAMBLE, SUMMARY_PREAMBLE, TRIAGE_PREAMBLE,
};
use crate::specialist::SpecialistClient;
use oncall_composition::RoleId;
use oncall_contract::{keys, Contract};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Root causes, actions, missing information, runbook alignment
pub const TRIAGE: &str = "triage";
/// What happened and current status
pub const SUMMARY: &str = "summary";
/// Slack and stakeholder drafts
pub const COMMS: &str = "comms";
/// Post-incident report
pub const PIR: &str = "pir";

/// One specialist role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialistRole {
    /// Role name
    pub id: RoleId,
    /// Output keys this role is asked to produce
    pub owned_keys: Vec<&'static str>,
    /// System instructions sent with every call
    pub instructions: String,
}

impl SpecialistRole {
    /// Create role
    #[must_use]
    pub fn new(id: impl Into<RoleId>, owned_keys: Vec<&'static str>, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owned_keys,
            instructions: instructions.into(),
        }
    }

    /// Does this role produce `key`
    #[inline]
    #[must_use]
    pub fn owns(&self, key: &str) -> bool {
        self.owned_keys.iter().any(|k| *k == key)
    }

    /// The four built-in roles in priority order
    ///
    /// Instructions embed the part of `analysis`'s JSON Schema each role owns.
    #[must_use]
    pub fn builtin(analysis: &Contract) -> Vec<Self> {
        let schema = analysis.to_json_schema();
        let role = |id: &str, preamble: &str, owned: Vec<&'static str>| {
            let instructions = role_instructions(preamble, &owned, &schema);
            Self::new(id, owned, instructions)
        };

        vec![
            role(
                TRIAGE,
                TRIAGE_PREAMBLE,
                vec![
                    keys::SUSPECTED_ROOT_CAUSES,
                    keys::IMMEDIATE_ACTIONS,
                    keys::MISSING_INFORMATION,
                    keys::RUNBOOK_ALIGNMENT,
                ],
            ),
            role(SUMMARY, SUMMARY_PREAMBLE, vec![keys::SUMMARY]),
            role(COMMS, COMMS_PREAMBLE, vec![keys::COMMS]),
            role(PIR, PIR_PREAMBLE, vec![keys::POST_INCIDENT_REPORT]),
        ]
    }
}

/// Role paired with the client that serves it
#[derive(Clone)]
pub struct RosterEntry {
    /// Role
    pub role: SpecialistRole,
    /// Collaborator handle
    pub client: Arc<dyn SpecialistClient>,
}

impl fmt::Debug for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterEntry").field("role", &self.role.id).finish_non_exhaustive()
    }
}

/// Ordered set of roles with their clients
#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Start building a roster
    #[inline]
    #[must_use]
    pub fn builder() -> RosterBuilder {
        RosterBuilder::default()
    }

    /// Entries in priority order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Role names in priority order
    #[must_use]
    pub fn priority(&self) -> Vec<RoleId> {
        self.entries.iter().map(|e| e.role.id.clone()).collect()
    }

    /// Roles in priority order
    pub fn roles(&self) -> impl Iterator<Item = &SpecialistRole> {
        self.entries.iter().map(|e| &e.role)
    }

    /// Number of roles
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No roles
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`Roster`]
#[derive(Default)]
pub struct RosterBuilder {
    roles: Vec<SpecialistRole>,
    default_client: Option<Arc<dyn SpecialistClient>>,
    overrides: HashMap<RoleId, Arc<dyn SpecialistClient>>,
}

impl RosterBuilder {
    /// Append a role (lowest priority so far)
    #[must_use]
    pub fn role(mut self, role: SpecialistRole) -> Self {
        self.roles.push(role);
        self
    }

    /// Append several roles
    #[must_use]
    pub fn roles(mut self, roles: impl IntoIterator<Item = SpecialistRole>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Client for every role without an override
    #[must_use]
    pub fn default_client(mut self, client: Arc<dyn SpecialistClient>) -> Self {
        self.default_client = Some(client);
        self
    }

    /// Client for one role
    #[must_use]
    pub fn client_for(mut self, role: impl Into<RoleId>, client: Arc<dyn SpecialistClient>) -> Self {
        self.overrides.insert(role.into(), client);
        self
    }

    /// Check and assemble
    ///
    /// # Errors
    /// - [`RosterError::Empty`] with no roles
    /// - [`RosterError::DuplicateRole`] when two roles share a name
    /// - [`RosterError::UnknownRole`] when an override names no role
    /// - [`RosterError::MissingClient`] when a role has no client
    pub fn build(self) -> Result<Roster, RosterError> {
        let Self {
            roles,
            default_client,
            mut overrides,
        } = self;
        if roles.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut seen = HashSet::new();
        for role in &roles {
            if !seen.insert(role.id.clone()) {
                return Err(RosterError::DuplicateRole(role.id.clone()));
            }
        }
        if let Some(unknown) = overrides.keys().find(|id| !seen.contains(*id)) {
            return Err(RosterError::UnknownRole(unknown.clone()));
        }

        let entries = roles
            .into_iter()
            .map(|role| {
                let client = overrides
                    .remove(&role.id)
                    .or_else(|| default_client.clone())
                    .ok_or_else(|| RosterError::MissingClient(role.id.clone()))?;
                Ok(RosterEntry { role, client })
            })
            .collect::<Result<Vec<_>, RosterError>>()?;

        Ok(Roster { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialist::MockSpecialistClient;
    use oncall_contract::analysis_contract;

    fn client() -> Arc<dyn SpecialistClient> {
        Arc::new(MockSpecialistClient::new())
    }

    fn builtin() -> Vec<SpecialistRole> {
        SpecialistRole::builtin(&analysis_contract().unwrap())
    }

    #[test]
    fn builtin_roles_cover_every_section_once() {
        let roles = builtin();
        let names: Vec<_> = roles.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(names, vec![TRIAGE, SUMMARY, COMMS, PIR]);

        let contract = analysis_contract().unwrap();
        for key in contract.required_keys().filter(|k| *k != keys::TELEMETRY) {
            assert_eq!(roles.iter().filter(|r| r.owns(key)).count(), 1, "{key}");
        }
    }

    #[test]
    fn default_client_serves_all_roles() {
        let roster = Roster::builder().roles(builtin()).default_client(client()).build().unwrap();
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.priority()[0], RoleId::new(TRIAGE));
    }

    #[test]
    fn override_replaces_default_for_one_role() {
        let special = client();
        let roster = Roster::builder()
            .roles(builtin())
            .default_client(client())
            .client_for(COMMS, special.clone())
            .build()
            .unwrap();

        let comms = roster.entries().iter().find(|e| e.role.id.as_str() == COMMS).unwrap();
        assert!(Arc::ptr_eq(&comms.client, &special));
    }

    #[test]
    fn duplicate_roles_rejected() {
        let err = Roster::builder()
            .role(SpecialistRole::new("a", vec![], ""))
            .role(SpecialistRole::new("a", vec![], ""))
            .default_client(client())
            .build()
            .unwrap_err();
        assert_eq!(err, RosterError::DuplicateRole(RoleId::new("a")));
    }

    #[test]
    fn missing_client_rejected() {
        let err = Roster::builder()
            .role(SpecialistRole::new("a", vec![], ""))
            .build()
            .unwrap_err();
        assert_eq!(err, RosterError::MissingClient(RoleId::new("a")));
    }

    #[test]
    fn unknown_override_rejected() {
        let err = Roster::builder()
            .role(SpecialistRole::new("a", vec![], ""))
            .client_for("b", client())
            .build()
            .unwrap_err();
        assert_eq!(err, RosterError::UnknownRole(RoleId::new("b")));
    }

    #[test]
    fn empty_roster_rejected() {
        assert_eq!(Roster::builder().build().unwrap_err(), RosterError::Empty);
    }
}
