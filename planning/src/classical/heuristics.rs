//! Delete-relaxation heuristic: build the relaxed planning graph from a state
//! until the goal is covered or a fixpoint is reached, then count the actions
//! supporting the goal by layered backward regression.

use std::collections::HashSet;
use std::sync::Arc;

use crate::classical::GroundAction;
use crate::expressions::{Atom, Expr};
use crate::search::Cost;
use crate::world::World;

/// Estimate reported when the relaxed graph reaches a fixpoint without
/// covering the goal. Large enough to push such states to the back of the
/// frontier; a tuning constant, not a proven bound.
pub const UNREACHABLE_ESTIMATE: Cost = 1000.;

pub struct RelaxedPlanHeuristic {
    actions: Arc<Vec<GroundAction>>,
    /// The goal, normalized to a conjunction so subgoal iteration is uniform.
    goal: Expr,
}

impl RelaxedPlanHeuristic {
    pub fn new(actions: Arc<Vec<GroundAction>>, goal: Expr) -> RelaxedPlanHeuristic {
        let goal = match goal {
            conjunction @ Expr::And(_) => conjunction,
            other => Expr::And(vec![other]),
        };
        RelaxedPlanHeuristic { actions, goal }
    }

    /// Estimated number of steps from `world` to the goal.
    pub fn estimate(&self, world: &World) -> Cost {
        // forward phase: proposition layers props[0..] and, between each
        // consecutive pair, the indices of the templates applicable there
        let mut props: Vec<World> = vec![world.clone()];
        let mut layers: Vec<Vec<usize>> = Vec::new();
        loop {
            let k = props.len() - 1;
            if props[k].models(&self.goal) {
                break;
            }
            let applicable: Vec<usize> = self
                .actions
                .iter()
                .enumerate()
                .filter(|(_, a)| props[k].models(a.condition()))
                .map(|(i, _)| i)
                .collect();
            let mut added: Vec<Atom> = Vec::new();
            for &i in &applicable {
                added.extend(self.actions[i].formula().changes(&props[k]).adds);
            }
            if added.is_empty() {
                // fixpoint without covering the goal
                return UNREACHABLE_ESTIMATE;
            }
            let next = props[k].extended(added);
            layers.push(applicable);
            props.push(next);
        }

        // backward phase: regress the goal through the layers, counting the
        // supporting actions
        let max_k = props.len() - 1;
        if max_k == 0 {
            return 0.;
        }
        let mut pending: Vec<Vec<Expr>> = vec![Vec::new(); max_k + 1];
        for subgoal in conjuncts(&self.goal) {
            pending[first_layer(&props, subgoal)].push(subgoal.clone());
        }
        let mut supported: HashSet<Atom> = HashSet::new();
        let mut selected = 0usize;
        for k in (1..=max_k).rev() {
            let subgoals = std::mem::take(&mut pending[k]);
            for subgoal in subgoals {
                if let Expr::Prop(atom) = &subgoal {
                    if supported.contains(atom) {
                        continue;
                    }
                }
                // first action of the layer whose additions introduce the subgoal
                let supporter = layers[k - 1].iter().copied().find(|&i| {
                    let adds = self.actions[i].formula().changes(&props[k - 1]).adds;
                    match &subgoal {
                        Expr::Prop(atom) => adds.contains(atom),
                        other => props[k - 1].extended(adds).models(other),
                    }
                });
                let Some(action) = supporter else { continue };
                selected += 1;
                supported.extend(self.actions[action].formula().changes(&props[k - 1]).adds);
                // the supporter's preconditions become subgoals at their layer
                for pre in conjuncts(self.actions[action].condition()) {
                    let j = first_layer(&props, pre);
                    if j >= 1 {
                        pending[j].push(pre.clone());
                    }
                }
            }
        }
        selected as Cost
    }
}

/// The conjuncts of a formula: the children of a top-level `and`, or the
/// formula itself.
fn conjuncts(e: &Expr) -> Vec<&Expr> {
    match e {
        Expr::And(children) => children.iter().collect(),
        other => vec![other],
    }
}

/// The first proposition layer that models the formula. Falls back to the
/// last layer, where every subgoal under regression is known to hold.
fn first_layer(props: &[World], formula: &Expr) -> usize {
    (0..props.len())
        .find(|&k| props[k].models(formula))
        .unwrap_or(props.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::ground;
    use crate::parsing::ActionSchema;
    use crate::world::ObjectSets;
    use altair_utils::input::Sym;

    fn s(x: &str) -> Sym {
        Sym::from(x)
    }

    fn schema(name: &str, pre: Expr, eff: Expr) -> ActionSchema {
        ActionSchema {
            name: s(name),
            params: Vec::new(),
            precondition: pre,
            effect: eff,
        }
    }

    fn templates(schemas: &[ActionSchema]) -> Arc<Vec<GroundAction>> {
        let sets = ObjectSets::default();
        let mut out = Vec::new();
        for schema in schemas {
            out.extend(ground(schema, &sets).unwrap());
        }
        Arc::new(out)
    }

    fn world(atoms: &[&str]) -> World {
        World::new(
            atoms.iter().map(|a| Atom::new(s(a), [])),
            Arc::new(ObjectSets::default()),
        )
    }

    #[test]
    fn counts_the_supporting_chain() {
        let actions = templates(&[
            schema("first", Expr::atom("p", []), Expr::atom("q", [])),
            schema("second", Expr::atom("q", []), Expr::atom("r", [])),
        ]);
        let h = RelaxedPlanHeuristic::new(actions, Expr::atom("r", []));
        assert_eq!(h.estimate(&world(&["p"])), 2.);
        assert_eq!(h.estimate(&world(&["q"])), 1.);
        assert_eq!(h.estimate(&world(&["r"])), 0.);
    }

    #[test]
    fn one_action_may_support_several_subgoals() {
        let actions = templates(&[schema(
            "both",
            Expr::And(vec![]),
            Expr::and(vec![Expr::atom("p", []), Expr::atom("q", [])]),
        )]);
        let goal = Expr::and(vec![Expr::atom("p", []), Expr::atom("q", [])]);
        let h = RelaxedPlanHeuristic::new(actions, goal);
        assert_eq!(h.estimate(&world(&[])), 1.);
    }

    #[test]
    fn unreachable_goals_hit_the_sentinel() {
        let actions = templates(&[schema("loop", Expr::atom("p", []), Expr::atom("p", []))]);
        let h = RelaxedPlanHeuristic::new(actions, Expr::atom("q", []));
        assert_eq!(h.estimate(&world(&["p"])), UNREACHABLE_ESTIMATE);
        // no applicable action at all
        let h = RelaxedPlanHeuristic::new(templates(&[]), Expr::atom("q", []));
        assert_eq!(h.estimate(&world(&[])), UNREACHABLE_ESTIMATE);
    }

    #[test]
    fn deletes_are_ignored_by_the_relaxation() {
        // consuming p to reach q and r would be impossible without relaxation
        let actions = templates(&[
            schema(
                "spend-on-q",
                Expr::atom("p", []),
                Expr::and(vec![
                    Expr::negation(Expr::atom("p", [])),
                    Expr::atom("q", []),
                ]),
            ),
            schema(
                "spend-on-r",
                Expr::atom("p", []),
                Expr::and(vec![
                    Expr::negation(Expr::atom("p", [])),
                    Expr::atom("r", []),
                ]),
            ),
        ]);
        let goal = Expr::and(vec![Expr::atom("q", []), Expr::atom("r", [])]);
        let h = RelaxedPlanHeuristic::new(actions, goal);
        assert_eq!(h.estimate(&world(&["p"])), 2.);
    }

    #[test]
    fn layer_sizes_are_nondecreasing() {
        // the chain grows one atom per layer; convergence within the universe
        let actions = templates(&[
            schema("a", Expr::atom("p", []), Expr::atom("q", [])),
            schema("b", Expr::atom("q", []), Expr::atom("r", [])),
            schema("c", Expr::atom("r", []), Expr::atom("done", [])),
        ]);
        let h = RelaxedPlanHeuristic::new(actions, Expr::atom("done", []));
        assert_eq!(h.estimate(&world(&["p"])), 3.);
    }
}
