//! S-expression layer of the PDDL reader: comment stripping, case folding,
//! tokenization and shift/reduce assembly of balanced parenthesized lists.

use std::fmt::{Debug, Display, Error, Formatter};

use altair_utils::disp_iter;
use altair_utils::input::{Input, Sym};
use anyhow::{bail, ensure, Result};
use regex::Regex;

#[derive(Clone)]
pub enum SExpr {
    Atom(Sym),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn as_atom(&self) -> Option<&Sym> {
        match self {
            SExpr::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn is_atom(&self, expected: &str) -> bool {
        self.as_atom().map(|a| a.as_str() == expected).unwrap_or(false)
    }
}

impl Display for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SExpr::Atom(a) => write!(f, "{a}"),
            SExpr::List(items) => {
                write!(f, "(")?;
                disp_iter(f, items.as_slice(), " ")?;
                write!(f, ")")
            }
        }
    }
}

impl Debug for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{self}")
    }
}

/// Reads all top-level s-expressions from the input. Text after `;` on a line
/// is a comment; symbols are folded to lower case.
pub fn parse(input: impl Into<Input>) -> Result<Vec<SExpr>> {
    let input = input.into();
    let stripped: String = input
        .text
        .lines()
        .map(|line| line.split(';').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    let lowered = stripped.to_lowercase();

    let token = Regex::new(r"[()]|[^\s()]+")?;
    // one frame per unclosed parenthesis; the bottom frame collects top-level forms
    let mut frames: Vec<Vec<SExpr>> = vec![Vec::new()];
    for tok in token.find_iter(&lowered) {
        match tok.as_str() {
            "(" => frames.push(Vec::new()),
            ")" => {
                let Some(list) = frames.pop() else {
                    bail!("unexpected closing parenthesis");
                };
                match frames.last_mut() {
                    Some(enclosing) => enclosing.push(SExpr::List(list)),
                    None => bail!("unexpected closing parenthesis"),
                }
            }
            symbol => match frames.last_mut() {
                Some(enclosing) => enclosing.push(SExpr::Atom(Sym::from(symbol))),
                None => unreachable!("the bottom frame is never popped"),
            },
        }
    }
    ensure!(
        frames.len() == 1,
        "unbalanced parentheses: {} list(s) left open",
        frames.len() - 1
    );
    Ok(frames.remove(0))
}
