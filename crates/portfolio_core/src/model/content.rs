//! Typed content entities.
//!
//! # Responsibility
//! - Describe collection items (skills, education, bento grid, projects).
//! - Describe singleton documents (profile, resume pointer, visitor stats).
//!
//! # Invariants
//! - `order` values need not be contiguous or unique.
//! - A resume document whose `url` is null means "no resume".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned document identifier.
pub type ContentId = String;

/// One skill chip shown in the skills section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default, skip_serializing)]
    pub id: ContentId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub order: i64,
}

/// One entry of the education timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationItem {
    #[serde(default, skip_serializing)]
    pub id: ContentId,
    pub degree: String,
    pub school: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Layout slot of a bento grid tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BentoCategory {
    /// Large featured tile.
    Main,
    /// Regular skill tile.
    Skill,
    /// Numeric stat tile.
    Stat,
}

impl BentoCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Skill => "skill",
            Self::Stat => "stat",
        }
    }
}

/// One tile of the "about" bento grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BentoItem {
    #[serde(default, skip_serializing)]
    pub id: ContentId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub category: BentoCategory,
    #[serde(default)]
    pub order: i64,
    /// Editable tech tags, only meaningful for `BentoCategory::Main`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
}

/// One project card.
///
/// Projects carry no `order` field; they are listed newest first by
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing)]
    pub id: ContentId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Hero/contact profile stored at `settings/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub available_for_work: bool,
}

/// Resume pointer stored at `settings/resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    /// `None` after an explicit delete.
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resume {
    /// Returns whether this pointer references an actual file.
    pub fn is_set(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

/// Visitor counter stored at `settings/visitors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    #[serde(default)]
    pub total_visitors: u64,
    #[serde(default)]
    pub last_visit: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::{BentoCategory, BentoItem, Resume, Skill};
    use serde_json::json;

    #[test]
    fn skill_id_is_not_serialized() {
        let skill = Skill {
            id: "abc".to_string(),
            name: "Rust".to_string(),
            category: "Core Skills".to_string(),
            order: 3,
        };
        let value = serde_json::to_value(&skill).expect("skill serializes");
        assert_eq!(
            value,
            json!({"name": "Rust", "category": "Core Skills", "order": 3})
        );
    }

    #[test]
    fn bento_item_reads_camel_case_and_lowercase_category() {
        let item: BentoItem = serde_json::from_value(json!({
            "id": "x1",
            "title": "Data",
            "description": "Pipelines",
            "icon": "Layers",
            "category": "main",
            "order": 0,
            "technologies": ["Python"]
        }))
        .expect("bento item parses");
        assert_eq!(item.id, "x1");
        assert_eq!(item.category, BentoCategory::Main);
        assert_eq!(item.technologies, Some(vec!["Python".to_string()]));
    }

    #[test]
    fn resume_with_blank_or_null_url_is_not_set() {
        let cleared = Resume {
            url: None,
            file_name: None,
            updated_at: None,
        };
        assert!(!cleared.is_set());

        let blank = Resume {
            url: Some("  ".to_string()),
            ..cleared.clone()
        };
        assert!(!blank.is_set());

        let set = Resume {
            url: Some("https://cdn.example.com/cv.pdf".to_string()),
            ..cleared
        };
        assert!(set.is_set());
    }
}
