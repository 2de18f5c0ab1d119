//! Project analysis model
//!
//! `Target` is the unit of build description discovered during
//! evaluation; `ProjectAnalysis` aggregates everything one file (and
//! after merging, the whole project) contributes. Maps are BTreeMaps so
//! merging and emission stay order-deterministic across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Kind of a discovered CMake target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    StaticLib,
    SharedLib,
    InterfaceLib,
    Executable,
    Custom,
    Unknown,
}

impl Default for TargetKind {
    fn default() -> Self {
        TargetKind::Unknown
    }
}

/// A named build artifact with its sources, dependencies and properties.
/// Property-setter commands mutate targets in place, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
    pub source_dir: PathBuf,
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    pub include_dirs: Vec<String>,
    pub compile_defs: Vec<String>,
    pub compile_opts: Vec<String>,
    pub link_libs: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl Target {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }
}

/// Everything evaluation learned about a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_name: String,
    pub project_version: String,
    pub targets: Vec<Target>,
    pub global_vars: BTreeMap<String, String>,
    pub cache_vars: BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

impl ProjectAnalysis {
    /// Merge another file's analysis into this one. First non-empty
    /// name/version win; target lists concatenate; variable maps union
    /// with later writers overwriting; warnings concatenate.
    pub fn merge(&mut self, other: ProjectAnalysis) {
        if self.project_name.is_empty() && !other.project_name.is_empty() {
            self.project_name = other.project_name;
        }
        if self.project_version.is_empty() && !other.project_version.is_empty() {
            self.project_version = other.project_version;
        }
        self.targets.extend(other.targets);
        self.global_vars.extend(other.global_vars);
        self.cache_vars.extend(other.cache_vars);
        self.warnings.extend(other.warnings);
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(name: &str, version: &str) -> ProjectAnalysis {
        ProjectAnalysis {
            project_name: name.into(),
            project_version: version.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_first_name_wins() {
        let mut base = analysis("", "");
        base.merge(analysis("alpha", "1.0"));
        base.merge(analysis("beta", "2.0"));
        assert_eq!(base.project_name, "alpha");
        assert_eq!(base.project_version, "1.0");
    }

    #[test]
    fn test_merge_concatenates_targets() {
        let mut base = ProjectAnalysis::default();
        let mut a = ProjectAnalysis::default();
        a.targets.push(Target::new("one", TargetKind::StaticLib));
        let mut b = ProjectAnalysis::default();
        b.targets.push(Target::new("two", TargetKind::Executable));

        base.merge(a);
        base.merge(b);
        assert_eq!(base.targets.len(), 2);
        assert_eq!(base.targets[0].name, "one");
        assert_eq!(base.targets[1].name, "two");
    }

    #[test]
    fn test_merge_later_variable_writer_overwrites() {
        let mut base = ProjectAnalysis::default();
        let mut a = ProjectAnalysis::default();
        a.global_vars.insert("X".into(), "1".into());
        let mut b = ProjectAnalysis::default();
        b.global_vars.insert("X".into(), "2".into());
        b.cache_vars.insert("OPT".into(), "ON".into());

        base.merge(a);
        base.merge(b);
        assert_eq!(base.global_vars["X"], "2");
        assert_eq!(base.cache_vars["OPT"], "ON");
    }

    #[test]
    fn test_merge_is_order_stable() {
        // Merging [a, b] pairwise equals merging sequentially.
        let mut left = ProjectAnalysis::default();
        let mut a = ProjectAnalysis::default();
        a.warnings.push("w1".into());
        let mut b = ProjectAnalysis::default();
        b.warnings.push("w2".into());

        left.merge(a.clone());
        left.merge(b.clone());

        let mut middle = a;
        middle.merge(b);
        let mut right = ProjectAnalysis::default();
        right.merge(middle);

        assert_eq!(left, right);
    }
}
