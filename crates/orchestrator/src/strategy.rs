//! Repository access strategy selection.

use codeforge_core::{CodingTask, Complexity, RepoAccessMode};

/// Choose how the execution environment obtains source code.
///
/// Pure function of (override, complexity, estimated_files):
/// 1. an explicit `repo_access_mode` always wins;
/// 2. trivial/simple tasks touching at most 3 files go through the
///    host's remote API, with no local clone;
/// 3. complex and very complex tasks reuse a persistent workspace to
///    amortize clone cost;
/// 4. everything else gets a fresh isolated clone.
pub fn select_strategy(task: &CodingTask) -> RepoAccessMode {
    if let Some(mode) = task.repo_access_mode {
        return mode;
    }

    if task.complexity.is_lightweight() && task.estimated_files <= 3 {
        return RepoAccessMode::GithubCli;
    }

    if matches!(
        task.complexity,
        Complexity::Complex | Complexity::VeryComplex
    ) {
        return RepoAccessMode::PersistentWorkspace;
    }

    RepoAccessMode::CloneOnDemand
}
