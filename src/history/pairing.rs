//! Tool-call / tool-response correlation.
//!
//! A `functionResponse` pairs with the nearest preceding unmatched
//! `functionCall` carrying the same id. When every such call is already
//! taken, the response falls back to the most recent call with that id so a
//! duplicated response still renders against a real declaration.

use crate::types::{Part, Turn};
use std::collections::{HashMap, HashSet};

/// Position of one part inside a turn slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartRef {
    pub turn: usize,
    pub part: usize,
}

/// Result of correlating every call and response in a turn slice.
#[derive(Debug, Default)]
pub struct ToolPairing {
    response_to_call: HashMap<PartRef, PartRef>,
    answered_calls: HashSet<PartRef>,
    orphan_responses: Vec<PartRef>,
    unanswered_calls: Vec<PartRef>,
}

impl ToolPairing {
    /// Single forward pass, indexed by id.
    pub fn build(turns: &[Turn]) -> Self {
        let mut pairing = Self::default();
        let mut open: HashMap<&str, Vec<PartRef>> = HashMap::new();
        let mut last_seen: HashMap<&str, PartRef> = HashMap::new();
        let mut calls_in_order = Vec::new();

        for (turn_idx, turn) in turns.iter().enumerate() {
            for (part_idx, part) in turn.parts.iter().enumerate() {
                let at = PartRef {
                    turn: turn_idx,
                    part: part_idx,
                };
                match part {
                    Part::FunctionCall { function_call } => {
                        open.entry(function_call.id.as_str()).or_default().push(at);
                        last_seen.insert(function_call.id.as_str(), at);
                        calls_in_order.push(at);
                    }
                    Part::FunctionResponse { function_response } => {
                        let id = function_response.id.as_str();
                        let matched = open
                            .get_mut(id)
                            .and_then(Vec::pop)
                            .or_else(|| last_seen.get(id).copied());
                        match matched {
                            Some(call) => {
                                pairing.response_to_call.insert(at, call);
                                pairing.answered_calls.insert(call);
                            }
                            None => pairing.orphan_responses.push(at),
                        }
                    }
                    _ => {}
                }
            }
        }

        pairing.unanswered_calls = calls_in_order
            .into_iter()
            .filter(|call| !pairing.answered_calls.contains(call))
            .collect();
        pairing
    }

    /// Call paired with the response at `response`, if any.
    pub fn call_for(&self, response: PartRef) -> Option<PartRef> {
        self.response_to_call.get(&response).copied()
    }

    pub fn orphan_responses(&self) -> &[PartRef] {
        &self.orphan_responses
    }

    pub fn unanswered_calls(&self) -> &[PartRef] {
        &self.unanswered_calls
    }
}

/// Remove calls without a retained response and responses without a retained
/// call, then drop turns left empty by the removal.
///
/// Returns the number of parts removed.
pub(crate) fn repair_tool_pairing(turns: &mut Vec<Turn>) -> usize {
    let pairing = ToolPairing::build(turns);
    let mut doomed: HashSet<PartRef> = pairing.orphan_responses().iter().copied().collect();
    doomed.extend(pairing.unanswered_calls().iter().copied());
    if doomed.is_empty() {
        return 0;
    }

    for (turn_idx, turn) in turns.iter_mut().enumerate() {
        let mut part_idx = 0usize;
        turn.parts.retain(|_| {
            let keep = !doomed.contains(&PartRef {
                turn: turn_idx,
                part: part_idx,
            });
            part_idx += 1;
            keep
        });
    }

    let emptied: HashSet<usize> = doomed.iter().map(|at| at.turn).collect();
    let mut turn_idx = 0usize;
    turns.retain(|turn| {
        let keep = !(emptied.contains(&turn_idx) && turn.parts.is_empty());
        turn_idx += 1;
        keep
    });

    tracing::debug!(removed_parts = doomed.len(), "repaired tool-call pairing");
    doomed.len()
}
