//! Cohort resolution: named subsets of modules sharing a configuration treatment
//!
//! Every module belongs to the implicit `all` cohort. Other cohorts are declared in
//! `[[cohorts]]` with exactly one rule (explicit list, name pattern, or derived from
//! another cohort). Resolution happens once per build; the resulting map is read-only.

use crate::core::config::CohortConfig;
use crate::core::error::{ConfigError, YardError, YardResult};
use crate::utils::{MATCH_OPTIONS, compile_pattern};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Name of the implicit cohort containing every module
pub const ALL: &str = "all";

/// How a cohort selects its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CohortRule {
  All,
  Members(Vec<String>),
  Pattern(String),
  From(String),
}

impl CohortRule {
  /// Extract the single rule of a cohort definition
  pub fn from_config(cohort: &CohortConfig) -> YardResult<Self> {
    let mut rules = Vec::new();
    if cohort.all {
      rules.push(CohortRule::All);
    }
    if let Some(modules) = &cohort.modules {
      rules.push(CohortRule::Members(modules.clone()));
    }
    if let Some(pattern) = &cohort.pattern {
      rules.push(CohortRule::Pattern(pattern.clone()));
    }
    if let Some(from) = &cohort.from {
      rules.push(CohortRule::From(from.clone()));
    }

    match rules.len() {
      1 => Ok(rules.remove(0)),
      0 => Err(
        ConfigError::MissingField {
          field: format!("rule (all, modules, pattern or from) for cohort '{}'", cohort.name),
        }
        .into(),
      ),
      _ => Err(YardError::with_help(
        format!("Cohort '{}' declares more than one rule", cohort.name),
        "Use exactly one of `all`, `modules`, `pattern` or `from`",
      )),
    }
  }
}

/// Resolved cohort → members mapping. Members keep module declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct CohortMap {
  cohorts: BTreeMap<String, Vec<String>>,
  #[serde(skip)]
  module_order: Vec<String>,
}

impl CohortMap {
  /// Resolve all cohort definitions against the module list.
  ///
  /// # Errors
  /// - a cohort references an undefined module or cohort
  /// - `from` references form a loop
  /// - a cohort is declared twice or redefines `all`
  pub fn resolve(modules: &[String], definitions: &[CohortConfig]) -> YardResult<Self> {
    let mut rules: HashMap<&str, CohortRule> = HashMap::new();
    for definition in definitions {
      if definition.name == ALL || rules.contains_key(definition.name.as_str()) {
        return Err(
          ConfigError::Duplicate {
            kind: "cohort",
            name: definition.name.clone(),
          }
          .into(),
        );
      }
      rules.insert(definition.name.as_str(), CohortRule::from_config(definition)?);
    }

    let mut resolver = Resolver {
      modules,
      rules: &rules,
      resolved: HashMap::new(),
      visiting: Vec::new(),
    };

    let mut cohorts = BTreeMap::new();
    cohorts.insert(ALL.to_string(), modules.to_vec());
    for definition in definitions {
      let members = resolver.resolve(&definition.name)?;
      cohorts.insert(definition.name.clone(), members);
    }

    Ok(Self {
      cohorts,
      module_order: modules.to_vec(),
    })
  }

  /// Members of a cohort in module declaration order
  pub fn members(&self, cohort: &str) -> YardResult<&[String]> {
    self.cohorts.get(cohort).map(Vec::as_slice).ok_or_else(|| {
      ConfigError::UnknownCohort {
        name: cohort.to_string(),
        referenced_by: "treatment".to_string(),
      }
      .into()
    })
  }

  /// Check membership
  pub fn contains(&self, cohort: &str, module: &str) -> bool {
    self
      .cohorts
      .get(cohort)
      .is_some_and(|members| members.iter().any(|m| m == module))
  }

  /// All cohorts a module belongs to (sorted by cohort name)
  pub fn memberships(&self, module: &str) -> Vec<String> {
    self
      .cohorts
      .iter()
      .filter(|(_, members)| members.iter().any(|m| m == module))
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Cohort names (sorted)
  pub fn names(&self) -> Vec<String> {
    self.cohorts.keys().cloned().collect()
  }

  /// Modules in declaration order
  pub fn modules(&self) -> &[String] {
    &self.module_order
  }
}

struct Resolver<'a> {
  modules: &'a [String],
  rules: &'a HashMap<&'a str, CohortRule>,
  resolved: HashMap<String, Vec<String>>,
  visiting: Vec<String>,
}

impl Resolver<'_> {
  fn resolve(&mut self, name: &str) -> YardResult<Vec<String>> {
    if name == ALL {
      return Ok(self.modules.to_vec());
    }
    if let Some(members) = self.resolved.get(name) {
      return Ok(members.clone());
    }
    if let Some(pos) = self.visiting.iter().position(|n| n == name) {
      let mut chain = self.visiting[pos..].to_vec();
      chain.push(name.to_string());
      return Err(ConfigError::CohortCycle { chain }.into());
    }

    let rules = self.rules;
    let rule = rules.get(name).ok_or_else(|| ConfigError::UnknownCohort {
      name: name.to_string(),
      referenced_by: self
        .visiting
        .last()
        .map(|c| format!("cohort '{}'", c))
        .unwrap_or_else(|| "configuration".to_string()),
    })?;

    self.visiting.push(name.to_string());
    let selected: HashSet<String> = match rule {
      CohortRule::All => self.modules.iter().cloned().collect(),
      CohortRule::Members(list) => {
        for module in list {
          if !self.modules.contains(module) {
            return Err(
              ConfigError::UnknownModule {
                cohort: name.to_string(),
                module: module.clone(),
              }
              .into(),
            );
          }
        }
        list.iter().cloned().collect()
      }
      CohortRule::Pattern(pattern) => {
        let compiled = compile_pattern(pattern)?;
        self
          .modules
          .iter()
          .filter(|m| compiled.matches_with(m, MATCH_OPTIONS))
          .cloned()
          .collect()
      }
      CohortRule::From(parent) => self.resolve(parent)?.into_iter().collect(),
    };
    self.visiting.pop();

    let members: Vec<String> = self.modules.iter().filter(|m| selected.contains(*m)).cloned().collect();
    self.resolved.insert(name.to_string(), members.clone());
    Ok(members)
  }
}
