//! Proposed Actions
//!
//! The tagged action union produced by the decide phase and drained by the
//! commit phases in a fixed category order: economy first, then social,
//! then culture, then migration. Matching on the union is exhaustive so a
//! new variant cannot be silently ignored.

use bevy_ecs::prelude::*;

use cog_events::ResourceKind;

use crate::components::culture::NormTopic;

/// Terms proposed by a negotiation initiator: give `give_quantity` of
/// `give_kind` in exchange for `want_quantity` of `want_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeOffer {
    pub give_kind: ResourceKind,
    pub give_quantity: u32,
    pub want_kind: ResourceKind,
    pub want_quantity: u32,
}

/// A culture ballot cast through the `Vote` action.
#[derive(Debug, Clone, PartialEq)]
pub enum CultureBallot {
    ProposeMyth { summary: String },
    SupportMyth { myth_id: String },
    ProposeNorm { topic: NormTopic },
    SupportNorm { norm_id: String },
}

/// An action proposed by one agent for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposedAction {
    Negotiate {
        counterparty: String,
        offer: TradeOffer,
    },
    Vote {
        ballot: CultureBallot,
    },
    Migrate {
        to_region: String,
    },
    Idle,
}

/// Resource: actions collected during the decide phase, in agent-id order.
#[derive(Resource, Debug, Default)]
pub struct ActionQueue {
    actions: Vec<(String, ProposedAction)>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, agent_id: impl Into<String>, action: ProposedAction) {
        self.actions.push((agent_id.into(), action));
    }

    /// Removes and returns all negotiation proposals, preserving order.
    pub fn take_negotiations(&mut self) -> Vec<(String, String, TradeOffer)> {
        let mut taken = Vec::new();
        self.actions.retain(|(agent_id, action)| match action {
            ProposedAction::Negotiate {
                counterparty,
                offer,
            } => {
                taken.push((agent_id.clone(), counterparty.clone(), *offer));
                false
            }
            ProposedAction::Vote { .. } | ProposedAction::Migrate { .. } | ProposedAction::Idle => {
                true
            }
        });
        taken
    }

    /// Removes and returns all culture ballots, preserving order.
    pub fn take_ballots(&mut self) -> Vec<(String, CultureBallot)> {
        let mut taken = Vec::new();
        self.actions.retain(|(agent_id, action)| match action {
            ProposedAction::Vote { ballot } => {
                taken.push((agent_id.clone(), ballot.clone()));
                false
            }
            ProposedAction::Negotiate { .. }
            | ProposedAction::Migrate { .. }
            | ProposedAction::Idle => true,
        });
        taken
    }

    /// Removes and returns all migrations, preserving order.
    pub fn take_migrations(&mut self) -> Vec<(String, String)> {
        let mut taken = Vec::new();
        self.actions.retain(|(agent_id, action)| match action {
            ProposedAction::Migrate { to_region } => {
                taken.push((agent_id.clone(), to_region.clone()));
                false
            }
            ProposedAction::Negotiate { .. }
            | ProposedAction::Vote { .. }
            | ProposedAction::Idle => true,
        });
        taken
    }

    /// Drops whatever remains (idle actions) at the end of the tick.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_takes_preserve_order_and_leave_others() {
        let mut queue = ActionQueue::new();
        queue.push(
            "agent_0001",
            ProposedAction::Negotiate {
                counterparty: "agent_0002".to_string(),
                offer: TradeOffer {
                    give_kind: ResourceKind::Ore,
                    give_quantity: 2,
                    want_kind: ResourceKind::Grain,
                    want_quantity: 5,
                },
            },
        );
        queue.push("agent_0002", ProposedAction::Idle);
        queue.push(
            "agent_0003",
            ProposedAction::Migrate {
                to_region: "cinder_reach".to_string(),
            },
        );
        queue.push(
            "agent_0004",
            ProposedAction::Negotiate {
                counterparty: "agent_0001".to_string(),
                offer: TradeOffer {
                    give_kind: ResourceKind::Cloth,
                    give_quantity: 1,
                    want_kind: ResourceKind::Ore,
                    want_quantity: 1,
                },
            },
        );

        let negotiations = queue.take_negotiations();
        assert_eq!(negotiations.len(), 2);
        assert_eq!(negotiations[0].0, "agent_0001");
        assert_eq!(negotiations[1].0, "agent_0004");
        assert_eq!(queue.len(), 2);

        let migrations = queue.take_migrations();
        assert_eq!(migrations, vec![("agent_0003".to_string(), "cinder_reach".to_string())]);
        assert_eq!(queue.len(), 1);
    }
}
