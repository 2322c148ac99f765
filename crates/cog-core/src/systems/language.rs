//! Language Drift
//!
//! Per-tick lexicon evolution: agents occasionally adopt a neighbor's
//! term for a concept (cultural mirroring, damped by local norm
//! stability) or coin a new one (divergence drift). The engine also
//! maintains the population-level divergence metric - a Jensen-Shannon
//! distance between the current term distribution and the baseline
//! captured at initialization. The metric is observability only; nothing
//! reads it back into decision logic.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::BTreeMap;

use cog_events::{EventPayload, EventSubtype, EventType};

use crate::components::agent::{AgentId, Alive, Lexicon, Personality, Region, TrustLedger};
use crate::components::culture::{ArtifactStatus, CultureState};
use crate::components::world::WorldClock;
use crate::config::Config;
use crate::events::TickEvents;
use crate::rng::{lane_rng, RngStream};
use crate::setup::concepts::coin_term;
use crate::systems::perception::RegionIndex;

/// Jensen-Shannon distance between two term-count distributions, in
/// [0, 1]. Symmetric, and 0 for identical distributions.
pub fn jensen_shannon_distance(p: &BTreeMap<String, u32>, q: &BTreeMap<String, u32>) -> f32 {
    let p_total: u32 = p.values().sum();
    let q_total: u32 = q.values().sum();
    if p_total == 0 || q_total == 0 {
        return if p_total == q_total { 0.0 } else { 1.0 };
    }

    let mut terms: Vec<&String> = p.keys().chain(q.keys()).collect();
    terms.sort();
    terms.dedup();

    let mut divergence = 0.0f64;
    for term in terms {
        let p_prob = p.get(term).copied().unwrap_or(0) as f64 / p_total as f64;
        let q_prob = q.get(term).copied().unwrap_or(0) as f64 / q_total as f64;
        let mid = (p_prob + q_prob) / 2.0;
        if p_prob > 0.0 {
            divergence += 0.5 * p_prob * (p_prob / mid).ln();
        }
        if q_prob > 0.0 {
            divergence += 0.5 * q_prob * (q_prob / mid).ln();
        }
    }
    // Normalize by ln(2) so the distance lands in [0, 1].
    ((divergence / std::f64::consts::LN_2).max(0.0)).sqrt() as f32
}

/// One resolved lexicon change, applied and reported in agent-id order.
struct DriftDecision {
    agent_id: String,
    concept: String,
    new_term: String,
    previous: String,
    source: Option<String>,
    subtype: EventSubtype,
}

/// Local norm stability of a region: how thoroughly adopted norms cover
/// its residents, shifted by ambient sentiment.
fn region_stability(
    region: &str,
    index: &RegionIndex,
    culture: &CultureState,
    base_stability: f32,
) -> f32 {
    let residents = index.residents(region);
    let adopted: Vec<_> = culture.adopted_norms().collect();
    let raw = if adopted.is_empty() || residents.is_empty() {
        base_stability
    } else {
        let mut coverage = 0.0f32;
        for norm in &adopted {
            let adhering = residents
                .iter()
                .filter(|id| norm.adherents.contains(*id))
                .count();
            coverage += adhering as f32 / residents.len() as f32;
        }
        base_stability.max(coverage / adopted.len() as f32)
    };
    (raw + culture.sentiment_modifier).clamp(0.0, 1.0)
}

/// System: drift lexicons and refresh the divergence metric.
pub fn drift_language(
    clock: Res<WorldClock>,
    config: Res<Config>,
    index: Res<RegionIndex>,
    mut culture: ResMut<CultureState>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(
        &AgentId,
        &Personality,
        &Region,
        &TrustLedger,
        &mut Lexicon,
        &Alive,
    )>,
) {
    // Pre-drift read pass: region/concept term usage and the sorted
    // agent roll, so every decision sees the same tick-start state.
    let mut region_terms: BTreeMap<String, BTreeMap<String, Vec<(String, String)>>> =
        BTreeMap::new();
    let mut roll: Vec<String> = Vec::new();
    for (agent_id, _, region, _, lexicon, alive) in query.iter() {
        if !alive.is_alive() {
            continue;
        }
        roll.push(agent_id.0.clone());
        let by_concept = region_terms.entry(region.0.clone()).or_default();
        for (concept, entry) in lexicon.iter() {
            by_concept
                .entry(concept.clone())
                .or_default()
                .push((agent_id.0.clone(), entry.term.clone()));
        }
    }
    roll.sort();
    let lanes: BTreeMap<&String, u64> = roll
        .iter()
        .enumerate()
        .map(|(lane, id)| (id, lane as u64))
        .collect();

    let mut stability_cache: BTreeMap<String, f32> = BTreeMap::new();

    // Decision pass, still read-only.
    let mut decisions: Vec<DriftDecision> = Vec::new();
    let mut sorted_agents: Vec<_> = query
        .iter()
        .filter(|(_, _, _, _, _, alive)| alive.is_alive())
        .collect();
    sorted_agents.sort_by(|a, b| a.0.cmp(b.0));

    for (agent_id, personality, region, trust, lexicon, _) in sorted_agents {
        let lane = lanes[&agent_id.0];
        let mut rng = lane_rng(clock.seed, clock.tick, RngStream::Language, lane);

        if rng.gen::<f32>() >= config.language.attempt_rate {
            continue;
        }
        let concepts: Vec<&String> = lexicon.concepts().collect();
        if concepts.is_empty() {
            continue;
        }
        let concept = concepts[rng.gen_range(0..concepts.len())].clone();
        let own_term = match lexicon.term_for(&concept) {
            Some(term) => term.to_string(),
            None => continue,
        };

        let stability = *stability_cache.entry(region.0.clone()).or_insert_with(|| {
            region_stability(&region.0, &index, &culture, config.language.base_stability)
        });

        if rng.gen::<f32>() < config.language.mirroring_rate * (1.0 - stability) {
            if let Some((source, term)) = pick_neighbor_term(
                &region_terms,
                &region.0,
                &concept,
                &agent_id.0,
                &own_term,
                trust,
                &mut rng,
            ) {
                decisions.push(DriftDecision {
                    agent_id: agent_id.0.clone(),
                    concept,
                    new_term: term,
                    previous: own_term,
                    source: Some(source),
                    subtype: EventSubtype::TermAdopted,
                });
            }
        } else if rng.gen::<f32>() < config.language.drift_rate * (0.5 + personality.openness) {
            let coined = coin_term(&mut rng);
            if coined != own_term {
                decisions.push(DriftDecision {
                    agent_id: agent_id.0.clone(),
                    concept,
                    new_term: coined,
                    previous: own_term,
                    source: None,
                    subtype: EventSubtype::TermCoined,
                });
            }
        }
    }

    // Write pass: apply decisions, then emit in the decision order
    // (already sorted by agent id).
    let mut by_agent: BTreeMap<&String, &DriftDecision> = BTreeMap::new();
    for decision in &decisions {
        by_agent.insert(&decision.agent_id, decision);
    }
    for (agent_id, _, _, _, mut lexicon, alive) in query.iter_mut() {
        if !alive.is_alive() {
            continue;
        }
        if let Some(decision) = by_agent.get(&agent_id.0) {
            lexicon.adopt(
                &decision.concept,
                decision.new_term.as_str(),
                clock.tick,
                config.language.max_term_history,
            );
        }
    }
    for decision in &decisions {
        tick_events.emit(
            EventType::Language,
            decision.subtype,
            vec![decision.agent_id.clone()],
            EventPayload::Language {
                concept: decision.concept.clone(),
                term: decision.new_term.clone(),
                previous: Some(decision.previous.clone()),
                source: decision.source.clone(),
            },
        );
    }

    // Refresh the population distribution and the divergence metric.
    let mut distribution: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for (_, _, _, _, lexicon, alive) in query.iter() {
        if !alive.is_alive() {
            continue;
        }
        for (concept, entry) in lexicon.iter() {
            *distribution
                .entry(concept.clone())
                .or_default()
                .entry(entry.term.clone())
                .or_insert(0) += 1;
        }
    }
    let empty = BTreeMap::new();
    let mut total = 0.0f32;
    let mut counted = 0usize;
    for (concept, baseline) in &culture.baseline_distribution {
        let current = distribution.get(concept).unwrap_or(&empty);
        total += jensen_shannon_distance(current, baseline);
        counted += 1;
    }
    culture.divergence = if counted == 0 { 0.0 } else { total / counted as f32 };
    culture.term_distribution = distribution;
}

/// Weighted pick of a neighbor's differing term; weight grows with the
/// count of users and the trust toward them.
fn pick_neighbor_term(
    region_terms: &BTreeMap<String, BTreeMap<String, Vec<(String, String)>>>,
    region: &str,
    concept: &str,
    self_id: &str,
    own_term: &str,
    trust: &TrustLedger,
    rng: &mut SmallRng,
) -> Option<(String, String)> {
    let users = region_terms.get(region)?.get(concept)?;
    let candidates: Vec<(&String, &String, f32)> = users
        .iter()
        .filter(|(user, term)| user != self_id && term != own_term)
        .map(|(user, term)| (user, term, 1.0 + trust.get(user).max(0.0)))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let total: f32 = candidates.iter().map(|(_, _, w)| w).sum();
    let roll = rng.gen::<f32>() * total;
    let mut cumulative = 0.0;
    for (user, term, weight) in &candidates {
        cumulative += weight;
        if roll < cumulative {
            return Some(((*user).clone(), (*term).clone()));
        }
    }
    let (user, term, _) = candidates.last()?;
    Some(((*user).clone(), (*term).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs
            .iter()
            .map(|(term, count)| (term.to_string(), *count))
            .collect()
    }

    #[test]
    fn identical_distributions_have_zero_distance() {
        let p = counts(&[("mer", 5), ("vash", 3)]);
        assert_eq!(jensen_shannon_distance(&p, &p), 0.0);
    }

    #[test]
    fn disjoint_distributions_have_maximal_distance() {
        let p = counts(&[("mer", 5)]);
        let q = counts(&[("vash", 5)]);
        let distance = jensen_shannon_distance(&p, &q);
        assert!((distance - 1.0).abs() < 1e-3);
    }

    #[test]
    fn distance_is_symmetric() {
        let p = counts(&[("mer", 5), ("vash", 1)]);
        let q = counts(&[("mer", 2), ("tolka", 4)]);
        let forward = jensen_shannon_distance(&p, &q);
        let backward = jensen_shannon_distance(&q, &p);
        assert!((forward - backward).abs() < 1e-6);
        assert!(forward > 0.0 && forward < 1.0);
    }
}
