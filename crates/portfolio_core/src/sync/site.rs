//! Public home page content aggregate.

use crate::model::content::{BentoItem, EducationItem, Profile, Project, Resume, Skill};
use crate::store::StoreHandle;
use crate::sync::live::{watch_collection, watch_singleton, LiveContent};
use serde::Serialize;

/// Skills sharing one category, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// Point-in-time view of everything the home page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSnapshot {
    pub profile: Profile,
    pub skill_groups: Vec<SkillGroup>,
    pub education: Vec<EducationItem>,
    pub bento: Vec<BentoItem>,
    pub projects: Vec<Project>,
    pub resume: Option<Resume>,
    pub loading: bool,
}

/// Independent live sources backing the public site.
///
/// Each source holds its own subscription; none are shared.
pub struct SiteContent {
    pub profile: LiveContent<Profile>,
    pub skills: LiveContent<Vec<Skill>>,
    pub education: LiveContent<Vec<EducationItem>>,
    pub bento: LiveContent<Vec<BentoItem>>,
    pub projects: LiveContent<Vec<Project>>,
    pub resume: LiveContent<Option<Resume>>,
}

impl SiteContent {
    pub fn activate(store: &StoreHandle) -> Self {
        Self {
            profile: watch_singleton::<Profile>(store),
            skills: watch_collection::<Skill>(store),
            education: watch_collection::<EducationItem>(store),
            bento: watch_collection::<BentoItem>(store),
            projects: watch_collection::<Project>(store),
            resume: watch_singleton::<Resume>(store),
        }
    }

    /// True while any source still waits for its first snapshot.
    pub fn is_loading(&self) -> bool {
        self.profile.is_loading()
            || self.skills.is_loading()
            || self.education.is_loading()
            || self.bento.is_loading()
            || self.projects.is_loading()
            || self.resume.is_loading()
    }

    pub fn home_snapshot(&self) -> HomeSnapshot {
        HomeSnapshot {
            profile: self.profile.data(),
            skill_groups: group_skills(&self.skills.data()),
            education: self.education.data(),
            bento: self.bento.data(),
            projects: self.projects.data(),
            resume: self.resume.data(),
            loading: self.is_loading(),
        }
    }
}

pub fn group_skills(skills: &[Skill]) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        match groups
            .iter_mut()
            .find(|group| group.category == skill.category)
        {
            Some(group) => group.skills.push(skill.clone()),
            None => groups.push(SkillGroup {
                category: skill.category.clone(),
                skills: vec![skill.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::{group_skills, SiteContent};
    use crate::model::defaults::{default_profile, default_skills};
    use crate::store::StoreHandle;

    #[test]
    fn groups_keep_first_appearance_order() {
        let groups = group_skills(&default_skills());
        let categories: Vec<&str> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Core Skills", "ML & AI", "Tools"]);
        assert_eq!(groups[0].skills.len(), 6);
    }

    #[test]
    fn demo_mode_snapshot_is_settled_fallback_content() {
        let site = SiteContent::activate(&StoreHandle::unavailable());
        assert!(!site.is_loading());
        let snapshot = site.home_snapshot();
        assert_eq!(snapshot.profile, default_profile());
        assert_eq!(snapshot.projects.len(), 3);
        assert!(snapshot.resume.is_none());
        assert!(!snapshot.loading);
    }
}
