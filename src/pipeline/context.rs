//! Execution context: symbolic variable name → artifact ids.

use std::collections::BTreeMap;

use super::config::StepInputs;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    vars: BTreeMap<String, Vec<i64>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate the ids of every referenced variable, in order. Unknown names add nothing.
    pub fn resolve(&self, inputs: &StepInputs) -> Vec<i64> {
        inputs
            .names()
            .into_iter()
            .flat_map(|name| self.vars.get(name).into_iter().flatten().copied())
            .collect()
    }

    /// Bind `name` to `ids`, replacing any previous binding.
    pub fn publish(&mut self, name: &str, ids: Vec<i64>) {
        self.vars.insert(name.to_string(), ids);
    }

    pub fn get(&self, name: &str) -> Option<&[i64]> {
        self.vars.get(name).map(Vec::as_slice)
    }

    pub fn vars(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.vars
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
