//! The concrete tool catalogue

pub mod clarify;
pub mod fs;
pub mod git;
pub mod plan;
pub mod screenshot;
pub mod shell;
pub mod skills;
pub mod speak;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use quill_agent::ToolRegistry;

use crate::sandbox::Sandbox;
use crate::skills::SkillCatalogue;
use crate::state::StateStore;

/// Build the full registry for a session
pub fn build_registry(
    sandbox: &Sandbox,
    store: &StateStore,
    catalogue: Arc<SkillCatalogue>,
    restart_flag: Arc<AtomicBool>,
    prompts_dir: PathBuf,
    voice: bool,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.add_tool(Arc::new(fs::FileCreateTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(fs::FileReadTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(fs::FileEditTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(shell::ExecuteBashTool::new(sandbox.root())));
    registry.add_tool(Arc::new(plan::PlanTool::new(prompts_dir)));

    registry.add_tool(Arc::new(git::GitAddCommitPushTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(git::GitHistoryTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(git::GitRevertTool::new(sandbox.clone())));

    registry.add_tool(Arc::new(screenshot::ScreenshotTool::new(sandbox.clone())));
    registry.add_tool(Arc::new(speak::SpeakTool::new(voice)));

    registry.add_tool(Arc::new(skills::ListSkillsTool::new(catalogue.clone())));
    registry.add_tool(Arc::new(skills::GetSkillInfoTool::new(catalogue.clone())));
    registry.add_tool(Arc::new(skills::SkillSearchTool::new(catalogue)));

    registry.add_tool(Arc::new(state::SetRestartStateTool::new(store.clone())));
    registry.add_tool(Arc::new(state::GetRestartStateTool::new(store.clone())));
    registry.add_tool(Arc::new(state::ClearRestartStateTool::new(store.clone())));
    registry.add_tool(Arc::new(state::RestartCliTool::new(
        store.clone(),
        restart_flag,
    )));
    registry.add_tool(Arc::new(state::CompactStateTool::new(store.clone())));
    registry.add_tool(Arc::new(state::GetCompactStateTool::new(store.clone())));
    registry.add_tool(Arc::new(state::ClearCompactStateTool::new(store.clone())));

    registry.add_tool(Arc::new(clarify::ClarifyTool));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_full_catalogue() {
        let sandbox = Sandbox::new("/proj");
        let store = StateStore::new("/proj");
        let registry = build_registry(
            &sandbox,
            &store,
            Arc::new(SkillCatalogue::default()),
            Arc::new(AtomicBool::new(false)),
            PathBuf::from("/proj/prompts"),
            false,
        );

        let names = registry.names();
        for expected in [
            "file_create",
            "file_read",
            "file_edit",
            "execute_bash",
            "plan",
            "git_add_commit_push",
            "git_history",
            "git_revert_to_commit",
            "screenshot",
            "speak",
            "list_skills",
            "get_skill_info",
            "skill_search",
            "set_restart_state",
            "get_restart_state",
            "clear_restart_state",
            "restart_cli",
            "compact_state",
            "get_compact_state",
            "clear_compact_state",
            "clarify",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
    }
}
