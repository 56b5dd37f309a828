use crate::state::{CooldownDef, ResourceDef, ResourceKey};

use super::Skill;

/// Every resource, cooldown group and skill of one job.
///
/// Shared read-only across runs behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobDefinition {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resources: Vec<ResourceDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cooldowns: Vec<CooldownDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub skills: Vec<Skill>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            cooldowns: Vec::new(),
            skills: Vec::new(),
        }
    }

    pub fn with_resource(mut self, def: ResourceDef) -> Self {
        self.resources.push(def);
        self
    }

    pub fn with_cooldown(mut self, def: CooldownDef) -> Self {
        self.cooldowns.push(def);
        self
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.name == name)
    }

    pub fn resource_def(&self, key: &ResourceKey) -> Option<&ResourceDef> {
        self.resources.iter().find(|def| &def.key == key)
    }

    pub fn cooldown_def(&self, key: &ResourceKey) -> Option<&CooldownDef> {
        self.cooldowns.iter().find(|def| &def.key == key)
    }

    /// Cross-reference problems: skills naming undeclared resources or cooldowns.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let known_resource =
            |key: &ResourceKey| self.resource_def(key).is_some() || ResourceKey::locks().contains(key);

        for skill in &self.skills {
            if let Some(cost) = &skill.base_cost
                && !known_resource(&cost.resource)
            {
                problems.push(format!("{}: cost uses unknown resource {}", skill.name, cost.resource));
            }
            if let Some(group) = &skill.cooldown_group
                && group != &ResourceKey::GCD
                && self.cooldown_def(group).is_none()
            {
                problems.push(format!("{}: unknown cooldown group {group}", skill.name));
            }
            for proc_ in &skill.procs {
                if !known_resource(&proc_.resource) {
                    problems.push(format!("{}: unknown proc resource {}", skill.name, proc_.resource));
                }
            }
            for requirement in &skill.requirements {
                if !known_resource(requirement.resource()) {
                    problems.push(format!(
                        "{}: requirement on unknown resource {}",
                        skill.name,
                        requirement.resource()
                    ));
                }
            }
            for timed in &skill.effects {
                if let Some(resource) = timed.effect.resource()
                    && !known_resource(resource)
                {
                    problems.push(format!("{}: effect on unknown resource {resource}", skill.name));
                }
            }
        }
        problems
    }
}
