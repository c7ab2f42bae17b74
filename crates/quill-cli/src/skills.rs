//! Skill catalogue: markdown documents describing extra capabilities.
//!
//! Skills are plain `.md` files in the configured skills directory,
//! loaded once at startup. The catalogue feeds three tools and a short
//! inventory section in the system prompt.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct SkillCatalogue {
    skills: Vec<Skill>,
}

impl SkillCatalogue {
    /// Load every `.md` file in the directory. A missing directory is an
    /// empty catalogue.
    pub fn load(dir: &Path) -> Self {
        let mut skills = Vec::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Self::default(),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(body) = fs::read_to_string(&path) else {
                tracing::warn!("skipping unreadable skill file {}", path.display());
                continue;
            };
            skills.push(Skill {
                name: name.to_string(),
                description: first_paragraph(&body),
                body,
            });
        }
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Self { skills }
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// `list_skills` result text
    pub fn list_all(&self) -> String {
        if self.skills.is_empty() {
            return "No skills are currently loaded.".to_string();
        }
        let mut out = String::from("Available skills:\n\n");
        for skill in &self.skills {
            out.push_str(&format!("  - {}: {}\n", skill.name, skill.description));
        }
        out
    }

    /// `get_skill_info` result text
    pub fn info(&self, name: &str) -> String {
        match self.skills.iter().find(|s| s.name == name) {
            Some(skill) => format!("# Skill: {}\n\n{}", skill.name, skill.body),
            None => format!(
                "Skill '{}' not found. Use list_skills to see what is available.",
                name
            ),
        }
    }

    /// `skill_search` result text
    pub fn search(&self, keyword: &str) -> String {
        let needle = keyword.to_lowercase();
        let matches: Vec<&Skill> = self
            .skills
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
            })
            .collect();

        if matches.is_empty() {
            return format!(
                "No skills found matching '{}'. Try a different keyword.",
                keyword
            );
        }
        let mut out = format!("Skills matching '{}':\n\n", keyword);
        for skill in matches {
            out.push_str(&format!("  - {}: {}\n", skill.name, skill.description));
        }
        out
    }

    /// One-line-per-skill inventory for the system prompt
    pub fn prompt_inventory(&self) -> String {
        if self.skills.is_empty() {
            return String::new();
        }
        let mut out = String::from("## AVAILABLE SKILLS\n\n");
        for skill in &self.skills {
            out.push_str(&format!("- {}: {}\n", skill.name, skill.description));
        }
        out.push_str("\nUse get_skill_info to read a skill before applying it.");
        out
    }
}

/// First non-heading paragraph of a markdown document, flattened to one
/// line.
fn first_paragraph(body: &str) -> String {
    let mut lines = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !lines.is_empty() {
                break;
            }
            continue;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed);
    }
    if lines.is_empty() {
        "No description available.".to_string()
    } else {
        lines.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_catalogue() -> (SkillCatalogue, PathBuf) {
        let dir = std::env::temp_dir().join(format!("quill-skills-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("deploy.md"),
            "# Deploy\n\nShip the service to staging.\n\n## Steps\n1. build\n",
        )
        .unwrap();
        fs::write(
            dir.join("review.md"),
            "# Review\n\nReview a pull request carefully.\n",
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "not a skill").unwrap();
        (SkillCatalogue::load(&dir), dir)
    }

    #[test]
    fn test_loads_only_markdown() {
        let (catalogue, dir) = temp_catalogue();
        let listing = catalogue.list_all();
        assert!(listing.contains("deploy"));
        assert!(listing.contains("review"));
        assert!(!listing.contains("notes"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_description_is_first_paragraph() {
        let (catalogue, dir) = temp_catalogue();
        assert!(catalogue.list_all().contains("Ship the service to staging."));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_info_returns_full_body() {
        let (catalogue, dir) = temp_catalogue();
        let info = catalogue.info("deploy");
        assert!(info.contains("## Steps"));
        assert!(catalogue.info("absent").contains("not found"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_search_matches_description() {
        let (catalogue, dir) = temp_catalogue();
        assert!(catalogue.search("pull request").contains("review"));
        assert!(catalogue.search("zzz").contains("No skills found"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let catalogue = SkillCatalogue::load(Path::new("/nonexistent/quill-skills"));
        assert!(catalogue.is_empty());
        assert_eq!(catalogue.prompt_inventory(), "");
    }
}
