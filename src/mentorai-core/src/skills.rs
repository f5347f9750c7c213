//! Skill ancestry: static prerequisite trees per learning domain.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::MentorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub id: &'static str,
    pub name: &'static str,
    pub level: u8,
    pub dependencies: &'static [&'static str],
}

const PROGRAMMING: &[Skill] = &[
    Skill {
        id: "vars",
        name: "Variables",
        level: 1,
        dependencies: &[],
    },
    Skill {
        id: "loops",
        name: "Loops",
        level: 2,
        dependencies: &["vars"],
    },
    Skill {
        id: "funcs",
        name: "Functions",
        level: 2,
        dependencies: &["vars"],
    },
    Skill {
        id: "objects",
        name: "Objects",
        level: 3,
        dependencies: &["funcs"],
    },
    Skill {
        id: "async",
        name: "Async/Await",
        level: 4,
        dependencies: &["objects", "loops"],
    },
    Skill {
        id: "react",
        name: "React",
        level: 5,
        dependencies: &["async"],
    },
];

const MATHEMATICS: &[Skill] = &[
    Skill {
        id: "arith",
        name: "Arithmetic",
        level: 1,
        dependencies: &[],
    },
    Skill {
        id: "algebra",
        name: "Algebra",
        level: 2,
        dependencies: &["arith"],
    },
    Skill {
        id: "geom",
        name: "Geometry",
        level: 2,
        dependencies: &["arith"],
    },
    Skill {
        id: "trig",
        name: "Trigonometry",
        level: 3,
        dependencies: &["algebra", "geom"],
    },
    Skill {
        id: "calculus",
        name: "Calculus",
        level: 4,
        dependencies: &["trig"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkillDomain {
    Programming,
    Mathematics,
}

impl SkillDomain {
    pub const ALL: [SkillDomain; 2] = [SkillDomain::Programming, SkillDomain::Mathematics];

    pub fn parse(s: &str) -> Result<Self, MentorError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "programming" | "code" => Ok(SkillDomain::Programming),
            "mathematics" | "math" | "maths" => Ok(SkillDomain::Mathematics),
            other => Err(MentorError::validation(
                "domain",
                format!(
                    "unknown skill domain '{}' (expected programming or mathematics)",
                    other
                ),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillDomain::Programming => "Programming",
            SkillDomain::Mathematics => "Mathematics",
        }
    }
}

impl fmt::Display for SkillDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillDomain {
    type Err = MentorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The prerequisite graph of one domain.
#[derive(Debug, Clone, Copy)]
pub struct SkillTree {
    domain: SkillDomain,
    skills: &'static [Skill],
}

impl SkillTree {
    pub fn for_domain(domain: SkillDomain) -> Self {
        let skills = match domain {
            SkillDomain::Programming => PROGRAMMING,
            SkillDomain::Mathematics => MATHEMATICS,
        };
        Self { domain, skills }
    }

    pub fn domain(&self) -> SkillDomain {
        self.domain
    }

    pub fn skills(&self) -> &'static [Skill] {
        self.skills
    }

    pub fn skill(&self, id: &str) -> Result<&'static Skill, MentorError> {
        self.skills.iter().find(|s| s.id == id).ok_or_else(|| {
            MentorError::validation(
                "skill",
                format!("unknown skill '{}' in {}", id, self.domain),
            )
        })
    }

    /// Every skill in dependency order: prerequisites before the skills that
    /// need them, ties broken by level and then id.
    pub fn ordered(&self) -> Vec<&'static Skill> {
        let mut pending: HashMap<&str, usize> = self
            .skills
            .iter()
            .map(|s| (s.id, s.dependencies.len()))
            .collect();
        let mut ready: BTreeSet<(u8, &str)> = self
            .skills
            .iter()
            .filter(|s| s.dependencies.is_empty())
            .map(|s| (s.level, s.id))
            .collect();

        let mut order = Vec::with_capacity(self.skills.len());
        while let Some((_, id)) = ready.pop_first() {
            let Some(skill) = self.skills.iter().find(|s| s.id == id) else {
                continue;
            };
            order.push(skill);

            for dependent in self.skills.iter().filter(|s| s.dependencies.contains(&id)) {
                if let Some(count) = pending.get_mut(dependent.id) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((dependent.level, dependent.id));
                    }
                }
            }
        }
        order
    }

    /// Transitive prerequisites of `id`, prerequisites first. The skill
    /// itself is not included.
    pub fn ancestry(&self, id: &str) -> Result<Vec<&'static Skill>, MentorError> {
        let root = self.skill(id)?;

        let mut ancestors: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = root.dependencies.to_vec();
        while let Some(dep) = stack.pop() {
            if ancestors.insert(dep) {
                stack.extend(self.skill(dep)?.dependencies.iter().copied());
            }
        }

        Ok(self
            .ordered()
            .into_iter()
            .filter(|s| ancestors.contains(s.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(skills: &[&Skill]) -> Vec<&'static str> {
        skills.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_parse_domain() {
        assert_eq!(SkillDomain::parse("Programming").unwrap(), SkillDomain::Programming);
        assert_eq!("maths".parse::<SkillDomain>().unwrap(), SkillDomain::Mathematics);
        assert!(SkillDomain::parse("cooking").unwrap_err().is_validation());
    }

    #[test]
    fn test_programming_order() {
        let tree = SkillTree::for_domain(SkillDomain::Programming);
        assert_eq!(
            ids(&tree.ordered()),
            vec!["vars", "funcs", "loops", "objects", "async", "react"]
        );
    }

    #[test]
    fn test_mathematics_order() {
        let tree = SkillTree::for_domain(SkillDomain::Mathematics);
        assert_eq!(
            ids(&tree.ordered()),
            vec!["arith", "algebra", "geom", "trig", "calculus"]
        );
    }

    #[test]
    fn test_ancestry_is_transitive() {
        let tree = SkillTree::for_domain(SkillDomain::Programming);
        assert_eq!(
            ids(&tree.ancestry("async").unwrap()),
            vec!["vars", "funcs", "loops", "objects"]
        );
        assert!(tree.ancestry("vars").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_skill() {
        let tree = SkillTree::for_domain(SkillDomain::Mathematics);
        let err = tree.ancestry("react").unwrap_err();
        assert!(matches!(err, MentorError::Validation { ref field, .. } if field == "skill"));
    }

    #[test]
    fn test_every_dependency_exists() {
        for domain in SkillDomain::ALL {
            let tree = SkillTree::for_domain(domain);
            assert_eq!(tree.ordered().len(), tree.skills().len());
            for skill in tree.skills() {
                for dep in skill.dependencies {
                    assert!(tree.skill(dep).is_ok(), "{} -> {}", skill.id, dep);
                }
            }
        }
    }
}
