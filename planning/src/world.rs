//! Immutable planning states: a set of true ground atoms under the
//! closed-world assumption, plus the typed object universe shared by every
//! successor state.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt::{Display, Error, Formatter};
use std::sync::Arc;

use altair_utils::input::Sym;

use crate::expressions::{Atom, Changes, Expr};

/// The typed object universe: each type name maps to its ordered object list.
/// The empty key `""` holds the deduplicated union of all objects and is the
/// default range of untyped quantifiers and parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectSets {
    by_type: BTreeMap<Sym, Vec<Sym>>,
}

impl ObjectSets {
    /// Builds the universe from `(type, objects)` entries and seals it by
    /// computing the universal set. Objects listed under `""` come first in
    /// the universal set; the remaining types contribute in key order.
    pub fn from_entries(entries: impl IntoIterator<Item = (Sym, Vec<Sym>)>) -> ObjectSets {
        let mut by_type: BTreeMap<Sym, Vec<Sym>> = BTreeMap::new();
        for (tpe, objects) in entries {
            by_type.entry(tpe).or_default().extend(objects);
        }
        let mut seen: HashSet<Sym> = HashSet::new();
        let mut universe: Vec<Sym> = Vec::new();
        let untyped = by_type.remove("").unwrap_or_default();
        for object in untyped.iter().chain(by_type.values().flatten()) {
            if seen.insert(object.clone()) {
                universe.push(object.clone());
            }
        }
        by_type.insert(Sym::from(""), universe);
        ObjectSets { by_type }
    }

    /// The objects of the given type, `None` if the type was never declared.
    pub fn extent(&self, tpe: &str) -> Option<&[Sym]> {
        self.by_type.get(tpe).map(|v| v.as_slice())
    }

    /// The deduplicated union of all object lists.
    pub fn universe(&self) -> &[Sym] {
        self.extent("").unwrap_or(&[])
    }
}

/// A snapshot of the world: the ground atoms that are currently true. Atoms
/// absent from the set are false. Worlds are immutable; applying an effect
/// yields a new world sharing the object universe and most of the atom set.
#[derive(Clone, Debug)]
pub struct World {
    atoms: im::HashSet<Atom>,
    sets: Arc<ObjectSets>,
}

impl World {
    pub fn new(atoms: impl IntoIterator<Item = Atom>, sets: Arc<ObjectSets>) -> World {
        World {
            atoms: atoms.into_iter().collect(),
            sets,
        }
    }

    pub fn atoms(&self) -> &im::HashSet<Atom> {
        &self.atoms
    }

    pub fn sets(&self) -> &Arc<ObjectSets> {
        &self.sets
    }

    pub fn holds(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    /// Range of a quantified variable: the extent of its type, the universal
    /// set when untyped, empty when the type name is unknown.
    pub fn extent_of(&self, tpe: Option<&str>) -> &[Sym] {
        match tpe {
            Some(name) => self.sets.extent(name).unwrap_or(&[]),
            None => self.sets.universe(),
        }
    }

    pub fn models(&self, condition: &Expr) -> bool {
        condition.modeled_by(self)
    }

    /// The world resulting from applying `effect`: additions first, then
    /// deletions, so an atom both added and deleted ends up false.
    pub fn apply(&self, effect: &Expr) -> World {
        let Changes { adds, dels } = effect.changes(self);
        let mut atoms = self.atoms.clone();
        for atom in adds {
            atoms.insert(atom);
        }
        for atom in &dels {
            atoms.remove(atom);
        }
        World {
            atoms,
            sets: self.sets.clone(),
        }
    }

    /// Delete-relaxed application: additions only. Used when building the
    /// relaxed planning graph.
    pub fn apply_relaxed(&self, effect: &Expr) -> World {
        let Changes { adds, .. } = effect.changes(self);
        self.extended(adds)
    }

    /// This world plus the given atoms.
    pub(crate) fn extended(&self, additions: impl IntoIterator<Item = Atom>) -> World {
        let mut atoms = self.atoms.clone();
        for atom in additions {
            atoms.insert(atom);
        }
        World {
            atoms,
            sets: self.sets.clone(),
        }
    }
}

/// Two worlds are equal when they hold the same atoms; the object universe is
/// fixed per problem and shared by reference.
impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms
    }
}

impl Eq for World {}

impl Display for World {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let mut first = true;
        for atom in &self.atoms {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{atom}")?;
            first = false;
        }
        Ok(())
    }
}
