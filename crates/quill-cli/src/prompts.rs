//! System prompt assembly.
//!
//! The system prompt is concatenated from optional markdown fragments
//! (SYSTEM.md, AGENT.md, PERSONA.md in the prompts directory), a model
//! configuration section, project guidance (AGENTS.md or CLAUDE.md at
//! the sandbox root), and the skill inventory. Every piece is optional;
//! an empty assembly falls back to a minimal default.

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::skills::SkillCatalogue;

const DEFAULT_PROMPT: &str =
    "You are quill, a command-line coding assistant with access to tools. \
     Prefer taking action with tools over describing what you would do.";

/// Read a prompt fragment, empty if missing
fn load_fragment(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Assemble the full system prompt
pub fn build_system_prompt(root: &Path, config: &Config, skills: &SkillCatalogue) -> String {
    let prompts_dir = root.join(&config.prompts_dir);

    let system = load_fragment(&prompts_dir.join("SYSTEM.md"));
    let agent = load_fragment(&prompts_dir.join("AGENT.md"));
    let persona = load_fragment(&prompts_dir.join("PERSONA.md"));

    let mut parts: Vec<String> = Vec::new();
    if !system.trim().is_empty() {
        parts.push(system.trim().to_string());
    }
    if !agent.trim().is_empty() {
        parts.push(format!("## AGENT MEMORY\n{}", agent.trim()));
    }
    if !persona.trim().is_empty() {
        parts.push(format!("## PERSONA\n{}", persona.trim()));
    }
    if parts.is_empty() {
        parts.push(DEFAULT_PROMPT.to_string());
    }

    parts.push(model_section(config));

    if let Some(guidance) = project_guidance(root) {
        parts.push(guidance);
    }

    let inventory = skills.prompt_inventory();
    if !inventory.is_empty() {
        parts.push(inventory);
    }

    parts.join("\n\n")
}

fn model_section(config: &Config) -> String {
    format!(
        "## MODEL CONFIGURATION\n\n\
         Your LLM configuration:\n\
         - **Model**: {}\n\
         - **Max completion tokens**: {}\n\
         - **Context window size**: {} tokens\n\n\
         Use this information to understand your capabilities and limitations.",
        config.model, config.max_tokens, config.context_window
    )
}

/// AGENTS.md takes precedence over CLAUDE.md when both exist
fn project_guidance(root: &Path) -> Option<String> {
    for name in ["AGENTS.md", "CLAUDE.md"] {
        let path = root.join(name);
        if let Ok(content) = fs::read_to_string(&path) {
            if !content.trim().is_empty() {
                return Some(format!("## ADDITIONAL PROJECT GUIDANCE\n{}", content.trim()));
            }
        }
    }
    None
}
