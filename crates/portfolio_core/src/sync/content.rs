//! Live-content bindings for each portfolio content type.

use crate::model::content::{BentoItem, EducationItem, Profile, Project, Resume, Skill};
use crate::model::defaults::{
    default_bento_items, default_education, default_profile, default_skills, sample_projects,
};
use crate::store::{DocPath, Document, SortDirection};
use crate::sync::live::{CollectionContent, SingletonContent};
use std::cmp::Ordering;

pub const SKILLS_COLLECTION: &str = "skills";
pub const EDUCATION_COLLECTION: &str = "education";
pub const BENTO_COLLECTION: &str = "bentoGrid";
pub const PROJECTS_COLLECTION: &str = "projects";
pub const SETTINGS_COLLECTION: &str = "settings";
pub const PROFILE_DOC: &str = "profile";
pub const RESUME_DOC: &str = "resume";
pub const VISITORS_DOC: &str = "visitors";

impl CollectionContent for Skill {
    const COLLECTION: &'static str = SKILLS_COLLECTION;
    const ORDER_FIELD: &'static str = "order";
    const ORDER_DIRECTION: SortDirection = SortDirection::Ascending;

    fn defaults() -> Vec<Self> {
        default_skills()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

impl CollectionContent for EducationItem {
    const COLLECTION: &'static str = EDUCATION_COLLECTION;
    const ORDER_FIELD: &'static str = "order";
    const ORDER_DIRECTION: SortDirection = SortDirection::Ascending;

    fn defaults() -> Vec<Self> {
        default_education()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

impl CollectionContent for BentoItem {
    const COLLECTION: &'static str = BENTO_COLLECTION;
    const ORDER_FIELD: &'static str = "order";
    const ORDER_DIRECTION: SortDirection = SortDirection::Ascending;

    fn defaults() -> Vec<Self> {
        default_bento_items()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

impl CollectionContent for Project {
    const COLLECTION: &'static str = PROJECTS_COLLECTION;
    const ORDER_FIELD: &'static str = "createdAt";
    const ORDER_DIRECTION: SortDirection = SortDirection::Descending;

    fn defaults() -> Vec<Self> {
        sample_projects()
    }

    /// Newest first; undated projects last.
    fn compare(&self, other: &Self) -> Ordering {
        match (&self.created_at, &other.created_at) {
            (Some(left), Some(right)) => right.cmp(left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl SingletonContent for Profile {
    type Value = Profile;

    fn path() -> DocPath {
        DocPath::new(SETTINGS_COLLECTION, PROFILE_DOC)
    }

    fn fallback() -> Self::Value {
        default_profile()
    }

    fn from_document(document: Option<&Document>) -> Result<Self::Value, serde_json::Error> {
        match document {
            Some(document) => document.decode_body(),
            None => Ok(default_profile()),
        }
    }
}

/// `None` means "no resume", distinct from any fallback file.
impl SingletonContent for Resume {
    type Value = Option<Resume>;

    fn path() -> DocPath {
        DocPath::new(SETTINGS_COLLECTION, RESUME_DOC)
    }

    fn fallback() -> Self::Value {
        None
    }

    fn from_document(document: Option<&Document>) -> Result<Self::Value, serde_json::Error> {
        let Some(document) = document else {
            return Ok(None);
        };
        let resume: Resume = document.decode_body()?;
        Ok(resume.is_set().then_some(resume))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::content::{Project, Resume, Skill};
    use crate::store::{Document, Fields};
    use crate::sync::live::{merge_collection, SingletonContent};
    use serde_json::json;

    fn doc(id: &str, body: serde_json::Value) -> Document {
        let fields: Fields = serde_json::from_value(body).expect("object body");
        Document::new(id, fields)
    }

    #[test]
    fn skills_sort_by_order_independent_of_arrival() {
        let documents = vec![
            doc("c", json!({"name": "C", "category": "x", "order": 2})),
            doc("a", json!({"name": "A", "category": "x", "order": 0})),
            doc("b", json!({"name": "B", "category": "x", "order": 1})),
        ];
        let skills: Vec<Skill> = merge_collection(&documents);
        let orders: Vec<i64> = skills.iter().map(|skill| skill.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(skills[0].id, "a");
    }

    #[test]
    fn undecodable_documents_are_skipped() {
        let documents = vec![
            doc("bad", json!({"category": "x"})),
            doc("ok", json!({"name": "Rust", "category": "x", "order": 0})),
        ];
        let skills: Vec<Skill> = merge_collection(&documents);
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].id, "ok");
    }

    #[test]
    fn projects_sort_newest_first_with_undated_last() {
        let documents = vec![
            doc("undated", json!({"title": "U", "description": "d"})),
            doc(
                "old",
                json!({"title": "O", "description": "d", "createdAt": "2024-01-01T00:00:00Z"}),
            ),
            doc(
                "new",
                json!({"title": "N", "description": "d", "createdAt": "2025-06-01T00:00:00Z"}),
            ),
        ];
        let projects: Vec<Project> = merge_collection(&documents);
        let ids: Vec<&str> = projects.iter().map(|project| project.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[test]
    fn resume_with_null_url_maps_to_not_set() {
        let cleared = doc("resume", json!({"url": null, "updatedAt": "2025-01-01T00:00:00Z"}));
        assert_eq!(Resume::from_document(Some(&cleared)).unwrap(), None);
        assert_eq!(Resume::from_document(None).unwrap(), None);

        let set = doc("resume", json!({"url": "https://x/cv.pdf", "fileName": "cv.pdf"}));
        let resume = Resume::from_document(Some(&set)).unwrap().expect("resume set");
        assert_eq!(resume.file_name.as_deref(), Some("cv.pdf"));
    }
}
