//! Skill library
//!
//! Skills are markdown playbooks with YAML front matter. A built-in set is
//! compiled in; an optional directory adds more or overrides by name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("skill {0} has no YAML front matter")]
    MissingFrontMatter(String),

    #[error("skill {name} has invalid front matter: {source}")]
    FrontMatter {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read skills from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "path")]
pub enum SkillSource {
    Builtin,
    File(PathBuf),
}

#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub name: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub tools: Vec<String>,
    pub body: String,
    pub source: SkillSource,
}

/// Result of matching a free-text request against the library
#[derive(Debug, Clone, Serialize)]
pub struct SkillMatch<'a> {
    pub skill: &'a Skill,
    pub score: usize,
    pub matched_keywords: Vec<&'a str>,
}

const BUILTIN: &[(&str, &str)] = &[
    ("fleet-overview.md", include_str!("../../skills/fleet-overview.md")),
    ("capacity-planning.md", include_str!("../../skills/capacity-planning.md")),
    ("sql-performance.md", include_str!("../../skills/sql-performance.md")),
    ("host-resources.md", include_str!("../../skills/host-resources.md")),
    ("database-security-review.md", include_str!("../../skills/database-security-review.md")),
    ("inventory-cache.md", include_str!("../../skills/inventory-cache.md")),
];

/// Split `---` delimited front matter from the body
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }
    None
}

impl Skill {
    /// Parse a skill document; `origin` names it in errors
    pub fn parse(origin: &str, text: &str, source: SkillSource) -> Result<Self, SkillError> {
        let (front, body) = split_front_matter(text).ok_or_else(|| SkillError::MissingFrontMatter(origin.to_string()))?;
        let meta: FrontMatter = serde_yaml::from_str(front).map_err(|source| SkillError::FrontMatter {
            name: origin.to_string(),
            source,
        })?;

        Ok(Skill {
            title: meta.title.unwrap_or_else(|| meta.name.replace('-', " ")),
            name: meta.name,
            description: meta.description,
            keywords: meta.keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            tools: meta.tools,
            body: body.trim().to_string(),
            source,
        })
    }

    /// Keywords found in an already lowercased query
    fn matched_keywords(&self, query: &str) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|k| !k.is_empty() && query.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkillLibrary {
    skills: BTreeMap<String, Skill>,
}

impl SkillLibrary {
    /// Built-in skills only
    pub fn builtin() -> Self {
        let mut library = Self::default();
        for (file, text) in BUILTIN {
            match Skill::parse(file, text, SkillSource::Builtin) {
                Ok(skill) => library.insert(skill),
                Err(e) => warn!(error = %e, "Skipping built-in skill"),
            }
        }
        library
    }

    /// Built-ins plus every `*.md` file in `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self, SkillError> {
        let mut library = Self::builtin();
        if let Some(dir) = dir {
            library.load_dir(dir)?;
        }
        info!(skills = library.len(), "Skill library loaded");
        Ok(library)
    }

    fn load_dir(&mut self, dir: &Path) -> Result<(), SkillError> {
        let io = |source| SkillError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "md").unwrap_or(false))
            .collect();
        paths.sort();

        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| SkillError::Io {
                path: path.clone(),
                source,
            })?;
            match Skill::parse(&path.display().to_string(), &text, SkillSource::File(path.clone())) {
                Ok(skill) => {
                    debug!(skill = %skill.name, path = %path.display(), "Loaded skill");
                    self.insert(skill);
                }
                Err(e) => warn!(error = %e, "Skipping skill file"),
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, skill: Skill) {
        self.skills.insert(skill.name.clone(), skill);
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// Skills in name order
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// Best skill by number of keywords contained in `query`; ties go to name order
    pub fn match_query(&self, query: &str) -> Option<SkillMatch<'_>> {
        let query = query.to_lowercase();
        let mut best: Option<SkillMatch<'_>> = None;

        for skill in self.skills.values() {
            let matched = skill.matched_keywords(&query);
            let score = matched.len();
            if score == 0 {
                continue;
            }
            if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                best = Some(SkillMatch {
                    skill,
                    score,
                    matched_keywords: matched,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "---\nname: demo\ntitle: Demo skill\ndescription: For tests\nkeywords: [cpu, Forecast]\ntools: [list_database_insights]\n---\n\n# Body\n\nSteps.\n";

    #[test]
    fn test_parse_front_matter() {
        let skill = Skill::parse("demo.md", SAMPLE, SkillSource::Builtin).unwrap();
        assert_eq!(skill.name, "demo");
        assert_eq!(skill.title, "Demo skill");
        assert_eq!(skill.keywords, vec!["cpu", "forecast"]);
        assert_eq!(skill.tools, vec!["list_database_insights"]);
        assert_eq!(skill.body, "# Body\n\nSteps.");
    }

    #[test]
    fn test_missing_front_matter() {
        let err = Skill::parse("bare.md", "# just markdown", SkillSource::Builtin).unwrap_err();
        assert!(matches!(err, SkillError::MissingFrontMatter(_)));
    }

    #[test]
    fn test_builtins_parse_and_reference_tools() {
        let library = SkillLibrary::builtin();
        assert_eq!(library.len(), BUILTIN.len());
        for skill in library.iter() {
            assert!(!skill.keywords.is_empty(), "{} has no keywords", skill.name);
            assert!(!skill.tools.is_empty(), "{} lists no tools", skill.name);
        }
    }

    #[test]
    fn test_match_counts_keywords() {
        let mut library = SkillLibrary::default();
        library.insert(Skill::parse("a", "---\nname: alpha\nkeywords: [cpu]\n---\n", SkillSource::Builtin).unwrap());
        library.insert(Skill::parse("b", "---\nname: beta\nkeywords: [cpu, forecast]\n---\n", SkillSource::Builtin).unwrap());

        let m = library.match_query("Forecast CPU for next month").unwrap();
        assert_eq!(m.skill.name, "beta");
        assert_eq!(m.score, 2);

        // Tie goes to name order
        let m = library.match_query("cpu please").unwrap();
        assert_eq!(m.skill.name, "alpha");

        assert!(library.match_query("hello").is_none());
    }

    #[test]
    fn test_directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fleet.md"),
            "---\nname: fleet-overview\ndescription: custom\nkeywords: [fleet]\ntools: [get_cache_statistics]\n---\nCustom body\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = SkillLibrary::load(Some(dir.path())).unwrap();
        let skill = library.get("fleet-overview").unwrap();
        assert_eq!(skill.description, "custom");
        assert!(matches!(skill.source, SkillSource::File(_)));
        assert_eq!(library.len(), BUILTIN.len());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = SkillLibrary::load(Some(Path::new("/definitely/not/here"))).unwrap_err();
        assert!(matches!(err, SkillError::Io { .. }));
    }
}
