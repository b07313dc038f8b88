//! Classical planning over ground conditional-effect templates: the typed
//! object universe, the grounder, and the `plan` entry point wiring the
//! grounded problem into the search driver.

pub mod heuristics;
pub mod node;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt::{Display, Error, Formatter};
use std::sync::Arc;

use altair_utils::enumerate;
use altair_utils::input::Sym;
use anyhow::Result;
use streaming_iterator::StreamingIterator;
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::classical::heuristics::RelaxedPlanHeuristic;
use crate::classical::node::PlanNode;
use crate::expressions::Expr;
use crate::parsing::{ActionSchema, Domain, Problem};
use crate::search::{astar, default_heuristic, Edge, SearchOutcome};
use crate::world::{ObjectSets, World};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroundingError {
    #[error("unknown type `{0}` in action parameters")]
    UnknownType(Sym),
    #[error("cyclic type hierarchy through `{0}`")]
    CyclicTypes(Sym),
}

/// A fully substituted action instance. The formula is always packaged as
/// `when(precondition, effect)` so the ordinary effect-application path
/// handles the action like any other conditional effect.
#[derive(Clone, Debug)]
pub struct GroundAction {
    name: Sym,
    args: Vec<Sym>,
    formula: Expr,
}

impl GroundAction {
    fn from_when(name: Sym, args: Vec<Sym>, formula: Expr) -> GroundAction {
        debug_assert!(matches!(formula, Expr::When(_, _)));
        GroundAction { name, args, formula }
    }

    pub fn name(&self) -> &Sym {
        &self.name
    }

    pub fn args(&self) -> &[Sym] {
        &self.args
    }

    /// The packaged `when(precondition, effect)` formula.
    pub fn formula(&self) -> &Expr {
        &self.formula
    }

    pub fn condition(&self) -> &Expr {
        match &self.formula {
            Expr::When(condition, _) => condition,
            _ => unreachable!("ground actions are packaged as conditional effects"),
        }
    }

    pub fn effect(&self) -> &Expr {
        match &self.formula {
            Expr::When(_, effect) => effect,
            _ => unreachable!("ground actions are packaged as conditional effects"),
        }
    }

    /// The observable action name, `schema(v1,v2,…)` in declared parameter order.
    pub fn display_name(&self) -> String {
        format!("{}({})", self.name, self.args.iter().join(","))
    }
}

impl Display for GroundAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.display_name())
    }
}

/// Builds the typed object universe for a domain/problem pair: domain
/// constants and problem objects merged per type, the type hierarchy closed
/// transitively, and the universal set sealed under the `""` key.
pub fn object_universe(domain: &Domain, problem: &Problem) -> Result<ObjectSets, GroundingError> {
    let mut declared: BTreeMap<Sym, Vec<Sym>> = BTreeMap::new();
    for (tpe, objects) in domain.constants.iter().chain(problem.objects.iter()) {
        declared.entry(tpe.clone()).or_default().extend(objects.iter().cloned());
    }

    // every type name in sight: hierarchy parents, their children, declared types
    let mut names: Vec<Sym> = Vec::new();
    let mut seen: HashSet<Sym> = HashSet::new();
    for name in domain
        .types
        .keys()
        .chain(domain.types.values().flatten())
        .chain(declared.keys())
    {
        if seen.insert(name.clone()) {
            names.push(name.clone());
        }
    }

    let mut entries: Vec<(Sym, Vec<Sym>)> = Vec::with_capacity(names.len());
    for name in names {
        let mut extent = Vec::new();
        let mut trail = Vec::new();
        collect_extent(&name, &domain.types, &declared, &mut trail, &mut extent)?;
        let mut seen = HashSet::new();
        extent.retain(|o| seen.insert(o.clone()));
        entries.push((name, extent));
    }
    Ok(ObjectSets::from_entries(entries))
}

/// Objects of `tpe`: its own declarations followed by those of its subtypes,
/// in declared order.
fn collect_extent(
    tpe: &Sym,
    hierarchy: &BTreeMap<Sym, Vec<Sym>>,
    declared: &BTreeMap<Sym, Vec<Sym>>,
    trail: &mut Vec<Sym>,
    out: &mut Vec<Sym>,
) -> Result<(), GroundingError> {
    if trail.contains(tpe) {
        return Err(GroundingError::CyclicTypes(tpe.clone()));
    }
    trail.push(tpe.clone());
    if let Some(own) = declared.get(tpe) {
        out.extend(own.iter().cloned());
    }
    if let Some(children) = hierarchy.get(tpe) {
        for child in children {
            collect_extent(child, hierarchy, declared, trail, out)?;
        }
    }
    trail.pop();
    Ok(())
}

/// Grounds one action schema: one template per tuple in the cartesian product
/// of the parameter type extents. Parameters are bound in declared order and
/// objects visited in extent order, so the template list is deterministic.
pub fn ground(schema: &ActionSchema, sets: &ObjectSets) -> Result<Vec<GroundAction>, GroundingError> {
    let packaged = Expr::when(schema.precondition.clone(), schema.effect.clone());

    let mut extents = Vec::with_capacity(schema.params.len());
    for param in &schema.params {
        let extent = sets
            .extent(&param.tpe)
            .ok_or_else(|| GroundingError::UnknownType(param.tpe.clone()))?;
        extents.push(extent.iter());
    }

    let mut templates = Vec::new();
    let mut bindings = enumerate(extents);
    while let Some(binding) = bindings.next() {
        let mut formula = packaged.clone();
        for (param, value) in schema.params.iter().zip(binding.iter()) {
            formula = formula.substitute(&param.name, value);
        }
        let args: Vec<Sym> = binding.iter().map(|v| (*v).clone()).collect();
        templates.push(GroundAction::from_when(schema.name.clone(), args, formula));
    }
    Ok(templates)
}

/// Finds a plan for the problem in the given domain.
///
/// Returns the search outcome: the plan edges carry the ground action names,
/// the cost is the number of steps, and the counters report frontier traffic.
/// `use_heuristic` selects the relaxed-plan heuristic; otherwise search runs
/// with the zero heuristic.
pub fn plan(
    domain: &Domain,
    problem: &Problem,
    use_heuristic: bool,
) -> Result<SearchOutcome<PlanNode>> {
    let sets = Arc::new(object_universe(domain, problem)?);
    let world = World::new(problem.init.iter().cloned(), sets.clone());

    let mut actions = Vec::new();
    for schema in &domain.actions {
        actions.extend(ground(schema, &sets)?);
    }
    debug!(templates = actions.len(), "grounded the action schemas");
    let actions = Arc::new(actions);

    let start = PlanNode::new(world, actions.clone());
    let goal = problem.goal.clone();
    let reached = {
        let goal = goal.clone();
        move |n: &PlanNode| n.world().models(&goal)
    };

    let outcome = if use_heuristic {
        let h = RelaxedPlanHeuristic::new(actions, goal);
        astar(
            start,
            move |n: &PlanNode, _edge: Option<&Edge<PlanNode>>| h.estimate(n.world()),
            reached,
        )
    } else {
        astar(start, default_heuristic, reached)
    };
    Ok(outcome)
}
