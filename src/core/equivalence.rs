//! Ingredient equivalence resolution.
//!
//! Declared pairs are merged into classes; every class gets one
//! representative that is guaranteed to be an active ingredient whenever the
//! class has one. The resulting function is total: names outside every class
//! map to themselves.

use crate::config::settings::EquivalenceBridge;
use crate::core::snapshot::Equivalence;
use std::collections::{BTreeMap, BTreeSet};

/// Disjoint-set forest over ingredient names.
#[derive(Default)]
struct NameSets {
    index: BTreeMap<String, usize>,
    parent: Vec<usize>,
}

impl NameSets {
    fn id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.index.insert(name.to_string(), id);
        id
    }

    fn root(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: &str, b: &str) {
        let a = self.id(a);
        let b = self.id(b);
        let (ra, rb) = (self.root(a), self.root(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }

    fn classes(mut self) -> Vec<BTreeSet<String>> {
        let names: Vec<(String, usize)> = std::mem::take(&mut self.index).into_iter().collect();
        let mut grouped: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for (name, id) in names {
            let root = self.root(id);
            grouped.entry(root).or_default().insert(name);
        }
        grouped.into_values().collect()
    }
}

/// Maps every ingredient name to the representative of its equivalence class.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceResolver {
    representatives: BTreeMap<String, String>,
}

impl EquivalenceResolver {
    /// Builds the classes and picks their representatives.
    ///
    /// A bridge adds its member to the class of its canonical name, and is
    /// ignored unless that name is declared as a canonical. The representative is the
    /// lexicographically smallest active member, or the smallest declared
    /// canonical name when no member is active.
    #[must_use]
    pub fn new(
        declarations: &[Equivalence],
        bridges: &[EquivalenceBridge],
        active: &BTreeSet<String>,
    ) -> Self {
        let canonicals: BTreeSet<&str> = declarations
            .iter()
            .map(|d| d.canonical.as_str())
            .collect();

        let mut sets = NameSets::default();
        for declaration in declarations {
            sets.union(&declaration.canonical, &declaration.equal);
        }
        for bridge in bridges {
            if canonicals.contains(bridge.canonical.as_str()) {
                sets.union(&bridge.canonical, &bridge.member);
            }
        }

        let mut representatives = BTreeMap::new();
        for members in sets.classes() {
            let representative = members
                .iter()
                .find(|m| active.contains(*m))
                .or_else(|| members.iter().find(|m| canonicals.contains(m.as_str())))
                .or_else(|| members.first())
                .cloned()
                .unwrap_or_default();
            for member in members {
                representatives.insert(member, representative.clone());
            }
        }

        Self { representatives }
    }

    /// Representative name for `name`; identity for names outside every class.
    #[must_use]
    pub fn representative<'a>(&'a self, name: &'a str) -> &'a str {
        self.representatives
            .get(name)
            .map_or(name, String::as_str)
    }
}
