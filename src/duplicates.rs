//! Duplicate-file policy: what happens when a download target already
//! exists.
//!
//! The policy is process-scoped state threaded explicitly through the
//! orchestrator, never a global. An explicitly configured policy is applied
//! without prompting. Otherwise, in interactive mode, the user is asked
//! exactly once per run; the answer becomes the policy for every later
//! duplicate.

use crate::errors::Result;
use crate::prompt::{is_yes, Prompter};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Leave the existing file alone, count the task as skipped.
    Skip,
    /// Replace the existing file.
    Overwrite,
    /// Write next to it as `name (1).ext`, `name (2).ext`, ...
    AppendNumber,
}

#[derive(Debug, Default)]
pub struct DuplicateState {
    policy: Option<DuplicatePolicy>,
    prompted: bool,
}

impl DuplicateState {
    /// State seeded from configuration. A `Some` policy disables prompting
    /// for the whole run.
    pub fn configured(policy: Option<DuplicatePolicy>) -> Self {
        Self {
            policy,
            prompted: false,
        }
    }

    pub fn policy(&self) -> Option<DuplicatePolicy> {
        self.policy
    }

    pub fn prompted(&self) -> bool {
        self.prompted
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Go ahead and write to this path (may differ from the requested one
    /// under `AppendNumber`).
    Proceed(PathBuf),
    /// Non-error outcome: the task is skipped.
    Skip,
}

/// Decides what to do about `target` for the current task.
pub fn resolve(
    state: &mut DuplicateState,
    target: &Path,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<Resolution> {
    if !target.exists() {
        return Ok(Resolution::Proceed(target.to_path_buf()));
    }

    let policy = match state.policy {
        Some(policy) => policy,
        None if interactive && !state.prompted => {
            let policy = prompt_for_policy(prompter, target)?;
            state.policy = Some(policy);
            state.prompted = true;
            policy
        }
        // Undecided and unable to ask: keep existing files.
        None => DuplicatePolicy::Skip,
    };

    match policy {
        DuplicatePolicy::Skip => Ok(Resolution::Skip),
        DuplicatePolicy::Overwrite => Ok(Resolution::Proceed(target.to_path_buf())),
        DuplicatePolicy::AppendNumber => Ok(Resolution::Proceed(next_free_path(target))),
    }
}

fn prompt_for_policy(prompter: &mut dyn Prompter, target: &Path) -> Result<DuplicatePolicy> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());

    let answer = prompter.read_line(&format!(
        "'{}' was already downloaded.\n  Skip all duplicate downloads this run? [Y/n]: ",
        name
    ))?;

    if is_yes(&answer, true) {
        info!("Skipping duplicate downloads for the rest of this run.");
        return Ok(DuplicatePolicy::Skip);
    }

    let answer = prompter
        .read_line("  Overwrite existing files, or append a number to the new ones? [o/a]: ")?;

    if answer.to_ascii_lowercase().starts_with('o') {
        info!("Overwriting existing files for the rest of this run.");
        Ok(DuplicatePolicy::Overwrite)
    } else {
        info!("Appending numbers to duplicate filenames for the rest of this run.");
        Ok(DuplicatePolicy::AppendNumber)
    }
}

/// Probes `name (1).ext`, `name (2).ext`, ... until a free path is found.
/// Race-free under the strictly sequential download loop.
fn next_free_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    for n in 1.. {
        let candidate = match &extension {
            Some(ext) => parent.join(format!("{} ({}).{}", stem, n, ext)),
            None => parent.join(format!("{} ({})", stem, n)),
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    unreachable!("counter exhausted while probing for a free filename")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").expect("write test file");
    }

    #[test]
    fn missing_target_proceeds_without_consulting_policy() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        let mut state = DuplicateState::default();
        let mut prompter = ScriptedPrompter::new(&[]);

        let resolution = resolve(&mut state, &target, true, &mut prompter).expect("resolve");
        assert_eq!(resolution, Resolution::Proceed(target));
        assert_eq!(prompter.asked, 0);
        assert!(!state.prompted());
    }

    #[test]
    fn configured_policy_never_prompts() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        touch(&target);

        let mut state = DuplicateState::configured(Some(DuplicatePolicy::Overwrite));
        let mut prompter = ScriptedPrompter::new(&[]);

        for _ in 0..3 {
            let resolution =
                resolve(&mut state, &target, true, &mut prompter).expect("resolve");
            assert_eq!(resolution, Resolution::Proceed(target.clone()));
        }
        assert_eq!(prompter.asked, 0);
    }

    #[test]
    fn interactive_prompts_exactly_once() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        touch(&target);

        let mut state = DuplicateState::default();
        // "n" to skip-all, "a" for append-number; no further answers scripted,
        // so a second prompt would panic.
        let mut prompter = ScriptedPrompter::new(&["n", "a"]);

        let first = resolve(&mut state, &target, true, &mut prompter).expect("resolve");
        assert!(matches!(first, Resolution::Proceed(_)));
        assert!(state.prompted());
        assert_eq!(state.policy(), Some(DuplicatePolicy::AppendNumber));

        let second = resolve(&mut state, &target, true, &mut prompter).expect("resolve");
        assert!(matches!(second, Resolution::Proceed(_)));
        assert_eq!(prompter.asked, 2);
    }

    #[test]
    fn empty_answer_defaults_to_skip_all() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        touch(&target);

        let mut state = DuplicateState::default();
        let mut prompter = ScriptedPrompter::new(&[""]);

        let resolution = resolve(&mut state, &target, true, &mut prompter).expect("resolve");
        assert_eq!(resolution, Resolution::Skip);
        assert_eq!(state.policy(), Some(DuplicatePolicy::Skip));
    }

    #[test]
    fn undecided_non_interactive_skips() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        touch(&target);

        let mut state = DuplicateState::default();
        let mut prompter = ScriptedPrompter::new(&[]);

        let resolution = resolve(&mut state, &target, false, &mut prompter).expect("resolve");
        assert_eq!(resolution, Resolution::Skip);
    }

    #[test]
    fn append_number_resolves_to_a_path_that_does_not_exist() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("song.mp3");
        touch(&target);
        touch(&dir.path().join("song (1).mp3"));
        touch(&dir.path().join("song (2).mp3"));

        let mut state = DuplicateState::configured(Some(DuplicatePolicy::AppendNumber));
        let mut prompter = ScriptedPrompter::new(&[]);

        let resolution = resolve(&mut state, &target, false, &mut prompter).expect("resolve");
        let Resolution::Proceed(path) = resolution else {
            panic!("expected proceed");
        };
        assert_eq!(path, dir.path().join("song (3).mp3"));
        assert!(!path.exists());
    }
}
