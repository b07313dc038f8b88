//! PDDL reader: turns a domain/problem pair into typed records: the type
//! hierarchy, objects grouped by type, predicate signatures, action schemas
//! with parsed precondition/effect formulas, the initial atom list and the
//! goal formula.

pub mod sexpr;

use std::collections::BTreeMap;
use std::fmt::{Display, Error, Formatter};
use std::path::Path;

use altair_utils::disp_iter;
use altair_utils::input::{Input, Sym};
use anyhow::{anyhow, bail, ensure, Context, Result};

use crate::expressions::{Atom, Expr};
use crate::parsing::sexpr::{parse, SExpr};

/// A declared parameter or typed symbol; the type is `""` when none was given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Sym,
    pub tpe: Sym,
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        if self.tpe.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.tpe)
        }
    }
}

/// Signature of a predicate as declared in the `:predicates` section.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub name: Sym,
    pub args: Vec<Param>,
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}(", self.name)?;
        disp_iter(f, self.args.as_slice(), ", ")?;
        write!(f, ")")
    }
}

/// A lifted action: typed parameters in declared order plus the precondition
/// and effect formulas with free `?`-variables.
#[derive(Clone, Debug)]
pub struct ActionSchema {
    pub name: Sym,
    pub params: Vec<Param>,
    pub precondition: Expr,
    pub effect: Expr,
}

impl Display for ActionSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}(", self.name)?;
        disp_iter(f, self.params.as_slice(), ", ")?;
        write!(f, ")")
    }
}

#[derive(Clone, Debug)]
pub struct Domain {
    pub name: Sym,
    /// Type hierarchy: parent type to its declared child types. Types declared
    /// without a parent appear under `""`.
    pub types: BTreeMap<Sym, Vec<Sym>>,
    /// Domain constants grouped by type.
    pub constants: BTreeMap<Sym, Vec<Sym>>,
    pub predicates: Vec<Predicate>,
    pub actions: Vec<ActionSchema>,
}

#[derive(Clone, Debug)]
pub struct Problem {
    pub name: Sym,
    pub domain: Sym,
    /// Problem objects grouped by type.
    pub objects: BTreeMap<Sym, Vec<Sym>>,
    /// Ground atoms true in the initial state.
    pub init: Vec<Atom>,
    pub goal: Expr,
}

pub fn parse_domain(path: &Path) -> Result<Domain> {
    let input = Input::from_file(path)
        .with_context(|| format!("Could not read domain file {}", path.display()))?;
    read_domain(input).with_context(|| format!("Invalid domain {}", path.display()))
}

pub fn parse_problem(path: &Path) -> Result<Problem> {
    let input = Input::from_file(path)
        .with_context(|| format!("Could not read problem file {}", path.display()))?;
    read_problem(input).with_context(|| format!("Invalid problem {}", path.display()))
}

pub fn parse_domain_str(text: &str) -> Result<Domain> {
    read_domain(Input::from_string(text)).context("Invalid domain")
}

pub fn parse_problem_str(text: &str) -> Result<Problem> {
    read_problem(Input::from_string(text)).context("Invalid problem")
}

/// Consume a typed list of symbols:
///  - `(a - loc b - loc c - loc)` : symbols a, b and c of type loc
///  - `(a b c - loc)`  : symbols a, b and c of type loc
///  - `(a b c)` : symbols a, b and c without a type
fn consume_typed(items: &[SExpr]) -> Result<Vec<Param>> {
    let mut out = Vec::with_capacity(items.len());
    let mut untyped: Vec<Sym> = Vec::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        let symbol = item
            .as_atom()
            .ok_or_else(|| anyhow!("expected a symbol in a typed list, got {item}"))?;
        if symbol.as_str() == "-" {
            let tpe = iter
                .next()
                .and_then(SExpr::as_atom)
                .ok_or_else(|| anyhow!("missing type name after `-`"))?;
            for name in untyped.drain(..) {
                out.push(Param { name, tpe: tpe.clone() });
            }
        } else {
            untyped.push(symbol.clone());
        }
    }
    // trailing symbols with no type
    for name in untyped.drain(..) {
        out.push(Param { name, tpe: Sym::from("") });
    }
    Ok(out)
}

/// Groups a typed list by type, preserving declaration order within each type.
fn group_by_type(params: Vec<Param>) -> BTreeMap<Sym, Vec<Sym>> {
    let mut grouped: BTreeMap<Sym, Vec<Sym>> = BTreeMap::new();
    for param in params {
        grouped.entry(param.tpe).or_default().push(param.name);
    }
    grouped
}

/// Parses a precondition or effect body; an absent or empty body is the empty
/// conjunction.
fn formula_of(value: Option<&SExpr>) -> Result<Expr> {
    match value {
        None => Ok(Expr::And(Vec::new())),
        Some(SExpr::List(items)) if items.is_empty() => Ok(Expr::And(Vec::new())),
        Some(e) => Expr::from_sexpr(e),
    }
}

fn read_action(items: &[SExpr]) -> Result<ActionSchema> {
    let (name, mut rest) = match items.split_first() {
        Some((SExpr::Atom(name), rest)) => (name.clone(), rest),
        _ => bail!("missing action name"),
    };
    let mut params = None;
    let mut precondition = None;
    let mut effect = None;
    while let Some((key, tail)) = rest.split_first() {
        let (value, tail) = match tail.split_first() {
            Some((value, tail)) => (value, tail),
            None => bail!("no value associated to `{key}` in action `{name}`"),
        };
        match key {
            e if e.is_atom(":parameters") => {
                let list = value
                    .as_list()
                    .ok_or_else(|| anyhow!("expected a parameter list in action `{name}`"))?;
                params = Some(consume_typed(list)?);
            }
            e if e.is_atom(":precondition") => precondition = Some(formula_of(Some(value))?),
            e if e.is_atom(":effect") => effect = Some(formula_of(Some(value))?),
            e => bail!("unsupported key in action `{name}`: {e}"),
        }
        rest = tail;
    }
    Ok(ActionSchema {
        name,
        params: params.unwrap_or_default(),
        precondition: precondition.unwrap_or_else(|| Expr::And(Vec::new())),
        effect: effect.unwrap_or_else(|| Expr::And(Vec::new())),
    })
}

fn read_domain(input: Input) -> Result<Domain> {
    let forms = parse(input)?;
    let define = single_define(&forms)?;

    let mut name = Sym::from("");
    let mut types = BTreeMap::new();
    let mut constants = BTreeMap::new();
    let mut predicates = Vec::new();
    let mut actions: Vec<ActionSchema> = Vec::new();

    for section in define {
        let items = section
            .as_list()
            .ok_or_else(|| anyhow!("expected a parenthesized section, got {section}"))?;
        let Some((head, rest)) = items.split_first() else {
            bail!("empty section in domain");
        };
        match head {
            e if e.is_atom("domain") => {
                name = rest
                    .first()
                    .and_then(SExpr::as_atom)
                    .ok_or_else(|| anyhow!("missing domain name"))?
                    .clone();
            }
            e if e.is_atom(":requirements") => {
                // feature flags are accepted and ignored; the supported
                // fragment is fixed
            }
            e if e.is_atom(":types") => {
                ensure!(types.is_empty(), "more than one `:types` section");
                // the typed-list types are children of their declared parent
                types = group_by_type(consume_typed(rest)?);
            }
            e if e.is_atom(":constants") => {
                ensure!(constants.is_empty(), "more than one `:constants` section");
                constants = group_by_type(consume_typed(rest)?);
            }
            e if e.is_atom(":predicates") => {
                for pred in rest {
                    let pred = pred
                        .as_list()
                        .ok_or_else(|| anyhow!("expected a predicate declaration, got {pred}"))?;
                    let (pname, args) = match pred.split_first() {
                        Some((SExpr::Atom(pname), args)) => (pname.clone(), args),
                        _ => bail!("missing predicate name"),
                    };
                    predicates.push(Predicate {
                        name: pname,
                        args: consume_typed(args)?,
                    });
                }
            }
            e if e.is_atom(":action") => {
                let action = read_action(rest)?;
                ensure!(
                    actions.iter().all(|a| a.name != action.name),
                    "duplicate action name `{}`",
                    action.name
                );
                actions.push(action);
            }
            e => bail!("unsupported block in domain: {e}"),
        }
    }

    Ok(Domain {
        name,
        types,
        constants,
        predicates,
        actions,
    })
}

fn read_problem(input: Input) -> Result<Problem> {
    let forms = parse(input)?;
    let define = single_define(&forms)?;

    let mut name = Sym::from("");
    let mut domain = Sym::from("");
    let mut objects = BTreeMap::new();
    let mut init = Vec::new();
    let mut goal = None;

    for section in define {
        let items = section
            .as_list()
            .ok_or_else(|| anyhow!("expected a parenthesized section, got {section}"))?;
        let Some((head, rest)) = items.split_first() else {
            bail!("empty section in problem");
        };
        match head {
            e if e.is_atom("problem") => {
                name = rest
                    .first()
                    .and_then(SExpr::as_atom)
                    .ok_or_else(|| anyhow!("missing problem name"))?
                    .clone();
            }
            e if e.is_atom(":domain") => {
                domain = rest
                    .first()
                    .and_then(SExpr::as_atom)
                    .ok_or_else(|| anyhow!("missing domain reference"))?
                    .clone();
            }
            e if e.is_atom(":objects") => {
                ensure!(objects.is_empty(), "more than one `:objects` section");
                objects = group_by_type(consume_typed(rest)?);
            }
            e if e.is_atom(":init") => {
                for fact in rest {
                    match Expr::from_sexpr(fact)? {
                        Expr::Prop(atom) => {
                            ensure!(atom.is_ground(), "initial atom is not ground: {atom}");
                            init.push(atom);
                        }
                        other => bail!("initial state entries must be ground atoms, got {other}"),
                    }
                }
            }
            e if e.is_atom(":goal") => {
                ensure!(goal.is_none(), "more than one `:goal` section");
                ensure!(rest.len() == 1, "`:goal` takes a single formula");
                goal = Some(Expr::from_sexpr(&rest[0])?);
            }
            e => bail!("unsupported block in problem: {e}"),
        }
    }

    Ok(Problem {
        name,
        domain,
        objects,
        init,
        goal: goal.ok_or_else(|| anyhow!("problem has no `:goal` section"))?,
    })
}

/// Unwraps the single `(define ...)` form of a domain or problem file and
/// returns its sections.
fn single_define(forms: &[SExpr]) -> Result<&[SExpr]> {
    ensure!(forms.len() == 1, "expected a single `(define ...)` form");
    let items = forms[0]
        .as_list()
        .ok_or_else(|| anyhow!("expected a `(define ...)` form"))?;
    match items.split_first() {
        Some((head, rest)) if head.is_atom("define") => Ok(rest),
        _ => bail!("expected a `(define ...)` form"),
    }
}
