//! Adapter between grounded planning states and the search graph: a node
//! wraps a world and the shared ground template list, and its outgoing edges
//! are the applicable ground actions.

use std::sync::Arc;

use crate::classical::GroundAction;
use crate::expressions::Atom;
use crate::search::{Edge, SearchNode};
use crate::world::World;

#[derive(Clone)]
pub struct PlanNode {
    world: World,
    actions: Arc<Vec<GroundAction>>,
}

impl PlanNode {
    pub fn new(world: World, actions: Arc<Vec<GroundAction>>) -> PlanNode {
        PlanNode { world, actions }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// One unit-cost edge per template whose precondition holds, in template
    /// order. Applying the packaged `when` formula only fires the effect
    /// branch whose condition was just verified. With `relaxed` set, delete
    /// effects are suppressed (the heuristic's view of the state space).
    pub fn successors(&self, relaxed: bool) -> Vec<Edge<PlanNode>> {
        let mut edges = Vec::new();
        for action in self.actions.iter() {
            if !self.world.models(action.condition()) {
                continue;
            }
            let world = if relaxed {
                self.world.apply_relaxed(action.formula())
            } else {
                self.world.apply(action.formula())
            };
            edges.push(Edge {
                target: PlanNode {
                    world,
                    actions: self.actions.clone(),
                },
                cost: 1.,
                name: action.display_name(),
            });
        }
        edges
    }
}

impl SearchNode for PlanNode {
    /// The frozen atom set: planning states with equal atoms are the same
    /// node for frontier and closed-set purposes.
    type Id = im::HashSet<Atom>;

    fn id(&self) -> Self::Id {
        self.world.atoms().clone()
    }

    fn neighbors(&self) -> Vec<Edge<Self>> {
        self.successors(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::ground;
    use crate::expressions::Expr;
    use crate::parsing::{ActionSchema, Param};
    use crate::world::ObjectSets;
    use altair_utils::input::Sym;

    fn s(x: &str) -> Sym {
        Sym::from(x)
    }

    fn node() -> PlanNode {
        let sets = Arc::new(ObjectSets::from_entries([(
            s("city"),
            vec![s("a"), s("b")],
        )]));
        let drive = ActionSchema {
            name: s("drive"),
            params: vec![
                Param { name: s("?from"), tpe: s("city") },
                Param { name: s("?to"), tpe: s("city") },
            ],
            precondition: Expr::atom("at", [s("?from")]),
            effect: Expr::and(vec![
                Expr::negation(Expr::atom("at", [s("?from")])),
                Expr::atom("at", [s("?to")]),
            ]),
        };
        let actions = Arc::new(ground(&drive, &sets).unwrap());
        let world = World::new([Atom::new(s("at"), [s("a")])], sets);
        PlanNode::new(world, actions)
    }

    #[test]
    fn edges_are_the_applicable_actions() {
        let node = node();
        let edges = node.neighbors();
        let names: Vec<String> = edges.iter().map(|e| e.name.clone()).collect();
        // only the two templates leaving `a` apply, in template order
        assert_eq!(names, vec!["drive(a,a)", "drive(a,b)"]);
        assert!(edges.iter().all(|e| e.cost == 1.));
        let moved = &edges[1].target;
        assert!(moved.world().holds(&Atom::new(s("at"), [s("b")])));
        assert!(!moved.world().holds(&Atom::new(s("at"), [s("a")])));
    }

    #[test]
    fn relaxed_successors_keep_deleted_atoms() {
        let node = node();
        let edges = node.successors(true);
        let moved = &edges[1].target;
        assert!(moved.world().holds(&Atom::new(s("at"), [s("b")])));
        assert!(moved.world().holds(&Atom::new(s("at"), [s("a")])));
    }

    #[test]
    fn nodes_with_equal_atoms_share_an_id() {
        let node = node();
        let again = node.clone();
        assert_eq!(node.id(), again.id());
        let edges = node.neighbors();
        assert_ne!(node.id(), edges[1].target.id());
    }
}
