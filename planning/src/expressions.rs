//! First-order logical formulas with quantifiers: the representation of action
//! preconditions, effects and goals, together with truth evaluation against a
//! [`World`], variable substitution and effect change-set extraction.

use std::collections::HashSet;
use std::fmt::{Display, Error, Formatter};

use altair_utils::disp_iter;
use altair_utils::input::Sym;
use anyhow::{bail, ensure, Result};
use smallvec::SmallVec;

use crate::parsing::sexpr::SExpr;
use crate::world::World;

/// Argument list of an atom. Predicates rarely take more than three arguments.
pub type Args = SmallVec<[Sym; 3]>;

/// A predicate application such as `on(a, b)`. Arguments are constants once
/// grounded; before grounding they may still be `?`-prefixed variable markers.
///
/// Atoms are value objects: equality and hashing are structural over the
/// predicate name and the argument sequence, so worlds can store them in sets.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Atom {
    pub head: Sym,
    pub args: Args,
}

impl Atom {
    pub fn new(head: impl Into<Sym>, args: impl IntoIterator<Item = Sym>) -> Atom {
        Atom {
            head: head.into(),
            args: args.into_iter().collect(),
        }
    }

    /// A copy of this atom with every argument naming `variable` replaced by `value`.
    /// The predicate name itself is never substituted.
    pub fn substitute(&self, variable: &str, value: &Sym) -> Atom {
        let args = self
            .args
            .iter()
            .map(|a| if a.as_str() == variable { value.clone() } else { a.clone() })
            .collect();
        Atom {
            head: self.head.clone(),
            args,
        }
    }

    /// True when no argument is a variable marker.
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(|a| !a.starts_with('?'))
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}(", self.head)?;
        disp_iter(f, self.args.as_slice(), ", ")?;
        write!(f, ")")
    }
}

/// Bound variable of a universal or existential quantifier. A specification
/// without a type ranges over the universal object set.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VarSpec {
    pub name: Sym,
    pub tpe: Option<Sym>,
}

impl VarSpec {
    pub fn new(name: impl Into<Sym>, tpe: Option<Sym>) -> VarSpec {
        VarSpec {
            name: name.into(),
            tpe,
        }
    }

    /// Reads a variable specification: either a bare `?v` or a one- or
    /// three-element list `(?v)` / `(?v - type)`.
    pub fn from_sexpr(e: &SExpr) -> Result<VarSpec> {
        match e {
            SExpr::Atom(s) if s.starts_with('?') => Ok(VarSpec::new(s.clone(), None)),
            SExpr::List(items) => match items.as_slice() {
                [SExpr::Atom(v)] if v.starts_with('?') => Ok(VarSpec::new(v.clone(), None)),
                [SExpr::Atom(v), SExpr::Atom(dash), SExpr::Atom(tpe)]
                    if v.starts_with('?') && dash.as_str() == "-" =>
                {
                    Ok(VarSpec::new(v.clone(), Some(tpe.clone())))
                }
                _ => bail!("malformed variable specification: {e}"),
            },
            _ => bail!("malformed variable specification: {e}"),
        }
    }
}

impl Display for VarSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match &self.tpe {
            Some(tpe) => write!(f, "{} - {}", self.name, tpe),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ground atoms added to and removed from a world by an effect.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Changes {
    pub adds: HashSet<Atom>,
    pub dels: HashSet<Atom>,
}

impl Changes {
    fn absorb(&mut self, other: Changes) {
        self.adds.extend(other.adds);
        self.dels.extend(other.dels);
    }
}

/// A logical formula. Every operation returns a fresh value; formulas are
/// never mutated in place.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expr {
    /// A bare symbol: an object name or a variable marker.
    Constant(Sym),
    Prop(Atom),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Imply(Box<Expr>, Box<Expr>),
    /// Structural equality of the two subterms.
    Equals(Box<Expr>, Box<Expr>),
    /// Conditional effect. Never true under modeling; only meaningful when applied.
    When(Box<Expr>, Box<Expr>),
    ForAll(VarSpec, Box<Expr>),
    Exists(VarSpec, Box<Expr>),
}

impl Expr {
    pub fn atom(head: impl Into<Sym>, args: impl IntoIterator<Item = Sym>) -> Expr {
        Expr::Prop(Atom::new(head, args))
    }

    pub fn and(children: Vec<Expr>) -> Expr {
        Expr::And(children)
    }

    pub fn or(children: Vec<Expr>) -> Expr {
        Expr::Or(children)
    }

    pub fn negation(of: Expr) -> Expr {
        Expr::Not(Box::new(of))
    }

    pub fn imply(antecedent: Expr, consequent: Expr) -> Expr {
        Expr::Imply(Box::new(antecedent), Box::new(consequent))
    }

    pub fn equals(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Equals(Box::new(lhs), Box::new(rhs))
    }

    pub fn when(condition: Expr, effect: Expr) -> Expr {
        Expr::When(Box::new(condition), Box::new(effect))
    }

    pub fn forall(spec: VarSpec, body: Expr) -> Expr {
        Expr::ForAll(spec, Box::new(body))
    }

    pub fn exists(spec: VarSpec, body: Expr) -> Expr {
        Expr::Exists(spec, Box::new(body))
    }

    /// Truth of this formula in `world`, under the closed-world assumption.
    ///
    /// `when` is never modeled; it only carries meaning for effect application.
    pub fn modeled_by(&self, world: &World) -> bool {
        match self {
            Expr::Constant(_) => false,
            Expr::Prop(atom) => world.holds(atom),
            Expr::Not(inner) => !inner.modeled_by(world),
            Expr::And(children) => children.iter().all(|c| c.modeled_by(world)),
            Expr::Or(children) => children.iter().any(|c| c.modeled_by(world)),
            Expr::Imply(antecedent, consequent) => {
                !antecedent.modeled_by(world) || consequent.modeled_by(world)
            }
            Expr::Equals(lhs, rhs) => lhs == rhs,
            Expr::When(_, _) => false,
            Expr::ForAll(spec, body) => Self::expanded(spec, body, world, Expr::And).modeled_by(world),
            Expr::Exists(spec, body) => Self::expanded(spec, body, world, Expr::Or).modeled_by(world),
        }
    }

    /// A copy of this formula with every occurrence of `variable` replaced by
    /// the constant `value`.
    ///
    /// Quantifiers are left untouched except for their body: bound variables
    /// are not renamed, so nested quantifiers must bind distinct names.
    pub fn substitute(&self, variable: &str, value: &Sym) -> Expr {
        match self {
            Expr::Constant(v) => {
                if v.as_str() == variable {
                    Expr::Constant(value.clone())
                } else {
                    self.clone()
                }
            }
            Expr::Prop(atom) => Expr::Prop(atom.substitute(variable, value)),
            Expr::Not(inner) => Expr::negation(inner.substitute(variable, value)),
            Expr::And(children) => {
                Expr::And(children.iter().map(|c| c.substitute(variable, value)).collect())
            }
            Expr::Or(children) => {
                Expr::Or(children.iter().map(|c| c.substitute(variable, value)).collect())
            }
            Expr::Imply(antecedent, consequent) => Expr::imply(
                antecedent.substitute(variable, value),
                consequent.substitute(variable, value),
            ),
            Expr::Equals(lhs, rhs) => Expr::equals(
                lhs.substitute(variable, value),
                rhs.substitute(variable, value),
            ),
            Expr::When(condition, effect) => Expr::when(
                condition.substitute(variable, value),
                effect.substitute(variable, value),
            ),
            Expr::ForAll(spec, body) => {
                Expr::forall(spec.clone(), body.substitute(variable, value))
            }
            Expr::Exists(spec, body) => {
                Expr::exists(spec.clone(), body.substitute(variable, value))
            }
        }
    }

    /// Ground atoms this formula adds to and deletes from `world` when applied
    /// as an effect.
    ///
    /// Effects are conjunctions of literals, `when` and `forall` clauses;
    /// other connectives contribute no changes. An atom appearing in both sets
    /// is deleted: the world applies deletions after additions.
    pub fn changes(&self, world: &World) -> Changes {
        let mut ch = Changes::default();
        match self {
            Expr::Prop(atom) => {
                if !world.holds(atom) {
                    ch.adds.insert(atom.clone());
                }
            }
            Expr::Not(inner) => {
                // only atoms may be negated in an effect
                if let Expr::Prop(atom) = inner.as_ref() {
                    if world.holds(atom) {
                        ch.dels.insert(atom.clone());
                    } else {
                        // already false under the closed-world assumption; keep the
                        // atom on both sides so the delete wins in the successor
                        ch.adds.insert(atom.clone());
                        ch.dels.insert(atom.clone());
                    }
                }
            }
            Expr::And(children) => {
                for child in children {
                    ch.absorb(child.changes(world));
                }
            }
            Expr::When(condition, effect) => {
                if condition.modeled_by(world) {
                    ch = effect.changes(world);
                }
            }
            Expr::ForAll(spec, body) => {
                ch = Self::expanded(spec, body, world, Expr::And).changes(world);
            }
            _ => {}
        }
        ch
    }

    /// Macro-expands a quantifier body over the extent of the bound variable,
    /// wrapping the instances in `and` (universal) or `or` (existential).
    fn expanded(spec: &VarSpec, body: &Expr, world: &World, wrap: fn(Vec<Expr>) -> Expr) -> Expr {
        let extent = world.extent_of(spec.tpe.as_deref());
        wrap(extent.iter().map(|value| body.substitute(&spec.name, value)).collect())
    }

    /// Builds a formula from a parsed s-expression.
    ///
    /// The head of a list selects the connective (`and`, `or`, `not`, `imply`,
    /// `=`, `when`, `forall`, `exists`); any other head is a predicate name and
    /// the list is an atom whose arguments must be plain symbols.
    pub fn from_sexpr(e: &SExpr) -> Result<Expr> {
        let items = match e {
            SExpr::Atom(s) => return Ok(Expr::Constant(s.clone())),
            SExpr::List(items) => items,
        };
        let (head, operands) = match items.split_first() {
            Some((SExpr::Atom(head), operands)) => (head, operands),
            Some((SExpr::List(_), _)) => bail!("expected an operator or predicate name: {e}"),
            None => bail!("empty expression"),
        };
        let expr = match head.as_str() {
            "and" => Expr::And(operands.iter().map(Expr::from_sexpr).collect::<Result<_>>()?),
            "or" => Expr::Or(operands.iter().map(Expr::from_sexpr).collect::<Result<_>>()?),
            "not" => {
                ensure!(operands.len() == 1, "`not` takes exactly one operand: {e}");
                Expr::negation(Expr::from_sexpr(&operands[0])?)
            }
            "imply" => {
                ensure!(operands.len() == 2, "`imply` takes exactly two operands: {e}");
                Expr::imply(Expr::from_sexpr(&operands[0])?, Expr::from_sexpr(&operands[1])?)
            }
            "=" => {
                ensure!(operands.len() == 2, "`=` takes exactly two operands: {e}");
                Expr::equals(Expr::from_sexpr(&operands[0])?, Expr::from_sexpr(&operands[1])?)
            }
            "when" => {
                ensure!(operands.len() == 2, "`when` takes exactly two operands: {e}");
                Expr::when(Expr::from_sexpr(&operands[0])?, Expr::from_sexpr(&operands[1])?)
            }
            "forall" | "exists" => {
                ensure!(operands.len() == 2, "`{head}` takes a variable specification and a body: {e}");
                let spec = VarSpec::from_sexpr(&operands[0])?;
                let body = Expr::from_sexpr(&operands[1])?;
                if head.as_str() == "forall" {
                    Expr::forall(spec, body)
                } else {
                    Expr::exists(spec, body)
                }
            }
            h if h.starts_with('?') => {
                bail!("variable specification outside of a quantifier: {e}")
            }
            _ => {
                let mut args = Args::new();
                for operand in operands {
                    match operand {
                        SExpr::Atom(s) => args.push(s.clone()),
                        SExpr::List(_) => {
                            bail!("atom arguments must be constants or variables: {e}")
                        }
                    }
                }
                Expr::Prop(Atom {
                    head: head.clone(),
                    args,
                })
            }
        };
        Ok(expr)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Prop(atom) => write!(f, "{atom}"),
            Expr::Not(inner) => write!(f, "not({inner})"),
            Expr::And(children) => {
                write!(f, "and(")?;
                disp_iter(f, children.as_slice(), ", ")?;
                write!(f, ")")
            }
            Expr::Or(children) => {
                write!(f, "or(")?;
                disp_iter(f, children.as_slice(), ", ")?;
                write!(f, ")")
            }
            Expr::Imply(a, c) => write!(f, "imply({a}, {c})"),
            Expr::Equals(l, r) => write!(f, "equals({l}, {r})"),
            Expr::When(c, e) => write!(f, "when({c}, {e})"),
            Expr::ForAll(spec, body) => write!(f, "forall({spec}, {body})"),
            Expr::Exists(spec, body) => write!(f, "exists({spec}, {body})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ObjectSets;
    use std::sync::Arc;

    fn s(x: &str) -> Sym {
        Sym::from(x)
    }

    fn atom(head: &str, args: &[&str]) -> Atom {
        Atom::new(s(head), args.iter().map(|a| s(a)))
    }

    fn stacked_world() -> World {
        World::new(
            [atom("on", &["a", "b"]), atom("on", &["b", "c"]), atom("on", &["c", "d"])],
            Arc::new(ObjectSets::default()),
        )
    }

    #[test]
    fn atoms_are_value_objects() {
        assert_eq!(atom("on", &["a", "b"]), atom("on", &["a", "b"]));
        assert_ne!(atom("on", &["a", "b"]), atom("on", &["b", "a"]));
        assert_ne!(atom("on", &["a", "b"]), atom("at", &["a", "b"]));
        assert_eq!(atom("on", &["a", "b"]).to_string(), "on(a, b)");
    }

    #[test]
    fn disjunction_over_stacked_blocks() {
        let world = stacked_world();
        let exp = Expr::or(vec![
            Expr::atom("on", [s("a"), s("b")]),
            Expr::atom("on", [s("a"), s("d")]),
        ]);
        assert!(world.models(&exp));

        let change = Expr::and(vec![
            Expr::negation(Expr::atom("on", [s("a"), s("b")])),
            Expr::atom("on", [s("a"), s("c")]),
        ]);
        let next = world.apply(&change);
        assert!(!next.models(&exp));
        // the original world is untouched
        assert!(world.models(&exp));
    }

    #[test]
    fn conjunction_implication_and_equality() {
        let world = stacked_world();
        assert!(!world.models(&Expr::and(vec![
            Expr::atom("on", [s("a"), s("b")]),
            Expr::atom("on", [s("a"), s("d")]),
        ])));
        // antecedent false
        assert!(world.models(&Expr::imply(
            Expr::atom("on", [s("a"), s("d")]),
            Expr::atom("on", [s("b"), s("a")]),
        )));
        // antecedent true, consequent false
        assert!(!world.models(&Expr::imply(
            Expr::atom("on", [s("a"), s("b")]),
            Expr::atom("on", [s("a"), s("d")]),
        )));
        assert!(world.models(&Expr::equals(
            Expr::Constant(s("a")),
            Expr::Constant(s("a"))
        )));
        assert!(!world.models(&Expr::equals(
            Expr::Constant(s("a")),
            Expr::Constant(s("b"))
        )));
    }

    #[test]
    fn when_is_never_modeled() {
        let world = stacked_world();
        let when = Expr::when(
            Expr::atom("on", [s("a"), s("b")]),
            Expr::atom("on", [s("a"), s("c")]),
        );
        assert!(!world.models(&when));
    }

    #[test]
    fn substitution_is_total_and_pure() {
        let spec = VarSpec::new(s("?l"), Some(s("locations")));
        let formula = Expr::forall(
            spec,
            Expr::imply(
                Expr::atom("at", [s("?l"), s("mickey")]),
                Expr::atom("at", [s("?l"), s("minny")]),
            ),
        );
        let substituted = formula.substitute("?l", &s("park"));
        // the quantifier still binds ?l; only the body was rewritten
        match &substituted {
            Expr::ForAll(spec, body) => {
                assert_eq!(spec.name.as_str(), "?l");
                assert_eq!(
                    body.as_ref(),
                    &Expr::imply(
                        Expr::atom("at", [s("park"), s("mickey")]),
                        Expr::atom("at", [s("park"), s("minny")]),
                    )
                );
            }
            other => panic!("expected a universal quantifier, got {other}"),
        }
        // substituting an absent variable is the identity
        assert_eq!(formula.substitute("?x", &s("park")), formula);
    }

    #[test]
    fn existential_substitution_preserves_the_connective() {
        let formula = Expr::exists(
            VarSpec::new(s("?l"), None),
            Expr::atom("at", [s("?l"), s("?who")]),
        );
        match formula.substitute("?who", &s("mickey")) {
            Expr::Exists(_, body) => {
                assert_eq!(*body, Expr::atom("at", [s("?l"), s("mickey")]))
            }
            other => panic!("expected an existential quantifier, got {other}"),
        }
    }

    fn mickey_world() -> World {
        let sets = ObjectSets::from_entries([(
            s("locations"),
            vec![s("home"), s("park"), s("store"), s("airport"), s("theater")],
        )]);
        World::new(
            [atom("at", &["store", "mickey"]), atom("at", &["airport", "minny"])],
            Arc::new(sets),
        )
    }

    fn mickey_formula() -> Expr {
        Expr::and(vec![
            Expr::negation(Expr::atom("at", [s("park"), s("mickey")])),
            Expr::or(vec![
                Expr::atom("at", [s("home"), s("mickey")]),
                Expr::atom("at", [s("store"), s("mickey")]),
                Expr::atom("at", [s("theater"), s("mickey")]),
                Expr::atom("at", [s("airport"), s("mickey")]),
            ]),
            Expr::imply(
                Expr::atom("friends", [s("mickey"), s("minny")]),
                Expr::forall(
                    VarSpec::new(s("?l"), Some(s("locations"))),
                    Expr::imply(
                        Expr::atom("at", [s("?l"), s("mickey")]),
                        Expr::atom("at", [s("?l"), s("minny")]),
                    ),
                ),
            ),
        ])
    }

    #[test]
    fn quantified_formula_follows_the_friendship() {
        let world = mickey_world();
        let formula = mickey_formula();
        assert!(world.models(&formula));

        // once the friendship holds the universal obligation fails
        let friends = world.apply(&Expr::atom("friends", [s("mickey"), s("minny")]));
        assert!(!friends.models(&formula));

        // moving minny to the store restores it
        let reunited = friends.apply(&Expr::and(vec![
            Expr::atom("at", [s("store"), s("minny")]),
            Expr::negation(Expr::atom("at", [s("airport"), s("minny")])),
        ]));
        assert!(reunited.models(&formula));
    }

    #[test]
    fn existential_quantification() {
        let world = mickey_world();
        let somewhere = Expr::exists(
            VarSpec::new(s("?l"), Some(s("locations"))),
            Expr::atom("at", [s("?l"), s("mickey")]),
        );
        assert!(world.models(&somewhere));
        let nowhere = Expr::exists(
            VarSpec::new(s("?l"), Some(s("unknown-set"))),
            Expr::atom("at", [s("?l"), s("mickey")]),
        );
        // an unknown set quantifies over nothing
        assert!(!world.models(&nowhere));
    }

    #[test]
    fn conditional_effects_fire_only_when_modeled() {
        let world = stacked_world();
        let when = Expr::when(
            Expr::atom("on", [s("a"), s("b")]),
            Expr::atom("clear", [s("d")]),
        );
        let ch = when.changes(&world);
        assert!(ch.adds.contains(&atom("clear", &["d"])));
        assert!(ch.dels.is_empty());

        let dormant = Expr::when(
            Expr::atom("on", [s("a"), s("d")]),
            Expr::atom("clear", [s("d")]),
        );
        assert_eq!(dormant.changes(&world), Changes::default());
    }

    #[test]
    fn parses_the_connective_vocabulary() {
        use crate::parsing::sexpr::parse;

        let forms = parse("(and (on a b) (not (on ?x b)) (or (= ?x a) (imply (p) (q))))").unwrap();
        let expr = Expr::from_sexpr(&forms[0]).unwrap();
        assert_eq!(
            expr.to_string(),
            "and(on(a, b), not(on(?x, b)), or(equals(?x, a), imply(p(), q())))"
        );

        let forms = parse("(forall (?s - stories) (murdermystery ?s))").unwrap();
        match Expr::from_sexpr(&forms[0]).unwrap() {
            Expr::ForAll(spec, _) => {
                assert_eq!(spec.name.as_str(), "?s");
                assert_eq!(spec.tpe.as_deref(), Some("stories"));
            }
            other => panic!("expected a universal quantifier, got {other}"),
        }

        assert!(Expr::from_sexpr(&parse("(not a b)").unwrap()[0]).is_err());
        assert!(Expr::from_sexpr(&parse("(imply a)").unwrap()[0]).is_err());
        assert!(Expr::from_sexpr(&parse("(on (deeply nested) b)").unwrap()[0]).is_err());
    }
}
