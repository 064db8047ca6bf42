//! Accumulated Horn system: declared relations and closed rules.

use std::collections::HashMap;

use solhorn_smtlib::{Command, Script, Sort, Term};

/// An uninterpreted relation over a fixed argument signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub name: String,
    pub domain: Vec<Sort>,
}

impl Relation {
    pub fn new(name: impl Into<String>, domain: Vec<Sort>) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    pub fn declaration(&self) -> Command {
        Command::DeclareFun(self.name.clone(), self.domain.clone(), Sort::Bool)
    }
}

/// Relations and rules in registration order.
#[derive(Debug, Clone, Default)]
pub struct HornSystem {
    relations: Vec<Relation>,
    by_name: HashMap<String, usize>,
    rules: Vec<(String, Term)>,
}

impl HornSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `relation`. Registering the same declaration twice is a
    /// no-op.
    ///
    /// # Panics
    ///
    /// If a relation with the same name but a different signature exists.
    pub fn register(&mut self, relation: &Relation) {
        if let Some(&idx) = self.by_name.get(&relation.name) {
            assert_eq!(
                self.relations[idx].domain, relation.domain,
                "relation {} re-registered with a different signature",
                relation.name
            );
            return;
        }
        self.by_name
            .insert(relation.name.clone(), self.relations.len());
        self.relations.push(relation.clone());
    }

    pub fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push((name.to_string(), rule.clone()));
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.by_name.get(name).map(|&idx| &self.relations[idx])
    }

    pub fn rules(&self) -> &[(String, Term)] {
        &self.rules
    }

    pub fn clear(&mut self) {
        self.relations.clear();
        self.by_name.clear();
        self.rules.clear();
    }

    /// Render a reachability query for `goal` as an SMT-LIB2 `HORN` script.
    ///
    /// The goal is asserted as `(=> goal false)`, so the script is
    /// unsatisfiable exactly when `goal` is derivable.
    pub fn query_script(&self, goal: &Term, options: &[(String, String)], with_proof: bool) -> Script {
        let mut script = Script::new();
        for (key, value) in options {
            script.push(Command::SetOption(key.clone(), value.clone()));
        }
        script.push(Command::SetLogic("HORN".to_string()));
        script.extend(self.relations.iter().map(Relation::declaration));
        for (name, rule) in &self.rules {
            script.push(Command::Comment(name.clone()));
            script.push(Command::Assert(rule.clone()));
        }
        script.push(Command::Assert(Term::implies(goal.clone(), Term::BoolLit(false))));
        script.push(Command::CheckSat);
        if with_proof {
            script.push(Command::GetProof);
        }
        script
    }
}
