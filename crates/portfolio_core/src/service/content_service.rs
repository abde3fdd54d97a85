//! Admin editing operations.
//!
//! # Responsibility
//! - Typed create/update/delete for every content collection.
//! - Full-replace writes for the profile and the resume pointer.
//! - Seeding of compiled-in sample content.
//!
//! # Invariants
//! - New ordered items are appended with `order = current item count`.
//! - Every failure names the operation that failed.
//! - Writes go straight to the store; live views pick them up through their
//!   subscriptions.

use crate::model::content::{BentoItem, ContentId, EducationItem, Profile, Project, Resume, Skill};
use crate::model::defaults::{
    default_bento_items, default_education, default_profile, default_skills, sample_projects,
};
use crate::store::{
    to_fields, CollectionQuery, DocPath, DocumentStore, StoreError, StoreHandle,
};
use crate::sync::content::{
    BENTO_COLLECTION, EDUCATION_COLLECTION, PROFILE_DOC, PROJECTS_COLLECTION, RESUME_DOC,
    SETTINGS_COLLECTION, SKILLS_COLLECTION,
};
use chrono::{Duration, Utc};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug)]
pub enum EditorErrorKind {
    /// Input rejected before any write.
    Invalid(String),
    Store(StoreError),
}

impl Display for EditorErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

/// Failure of one editing operation.
#[derive(Debug)]
pub struct EditorError {
    pub operation: &'static str,
    pub kind: EditorErrorKind,
}

impl EditorError {
    fn invalid(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind: EditorErrorKind::Invalid(message.into()),
        }
    }

    fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| Self {
            operation,
            kind: EditorErrorKind::Store(err),
        }
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to {}: {}", self.operation, self.kind)
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            EditorErrorKind::Store(err) => Some(err),
            EditorErrorKind::Invalid(_) => None,
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Collection selectable for sample seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Skills,
    Education,
    Bento,
    Projects,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skills => "skills",
            Self::Education => "education",
            Self::Bento => "bento",
            Self::Projects => "projects",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Self::Skills => SKILLS_COLLECTION,
            Self::Education => EDUCATION_COLLECTION,
            Self::Bento => BENTO_COLLECTION,
            Self::Projects => PROJECTS_COLLECTION,
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skills" => Ok(Self::Skills),
            "education" => Ok(Self::Education),
            "bento" | "bentogrid" => Ok(Self::Bento),
            "projects" => Ok(Self::Projects),
            other => Err(format!(
                "unknown content kind `{other}`; expected skills|education|bento|projects"
            )),
        }
    }
}

/// Admin editing facade over a store handle.
pub struct ContentEditor {
    store: StoreHandle,
}

impl ContentEditor {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    fn backend(&self, operation: &'static str) -> EditorResult<&Arc<dyn DocumentStore>> {
        self.store.store().map_err(EditorError::store(operation))
    }

    fn next_order(&self, operation: &'static str, collection: &str) -> EditorResult<i64> {
        let count = self
            .backend(operation)?
            .list(&CollectionQuery::new(collection))
            .map_err(EditorError::store(operation))?
            .len();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    fn add_item<T: Serialize>(
        &self,
        operation: &'static str,
        collection: &str,
        item: &T,
    ) -> EditorResult<ContentId> {
        let store = self.backend(operation)?;
        let fields = to_fields(item).map_err(EditorError::store(operation))?;
        let id = store
            .add(collection, fields)
            .map_err(EditorError::store(operation))?;
        info!("event=content_add module=service status=ok collection={collection} id={id}");
        Ok(id)
    }

    /// Replaces an existing document, carrying over the `preserve` fields
    /// from the stored version.
    fn replace_item<T: Serialize>(
        &self,
        operation: &'static str,
        collection: &str,
        id: &str,
        item: &T,
        preserve: &[&str],
    ) -> EditorResult<()> {
        if id.trim().is_empty() {
            return Err(EditorError::invalid(operation, "missing document id"));
        }
        let store = self.backend(operation)?;
        let path = DocPath::new(collection, id);
        let existing = store
            .get(&path)
            .map_err(EditorError::store(operation))?
            .ok_or_else(|| EditorError::store(operation)(StoreError::NotFound(path.clone())))?;

        let mut fields = to_fields(item).map_err(EditorError::store(operation))?;
        for field in preserve {
            if let Some(value) = existing.fields.get(*field) {
                fields.insert((*field).to_string(), value.clone());
            }
        }
        store
            .set(&path, fields)
            .map_err(EditorError::store(operation))?;
        info!("event=content_update module=service status=ok collection={collection} id={id}");
        Ok(())
    }

    fn delete_item(&self, operation: &'static str, collection: &str, id: &str) -> EditorResult<()> {
        if id.trim().is_empty() {
            return Err(EditorError::invalid(operation, "missing document id"));
        }
        self.backend(operation)?
            .delete(&DocPath::new(collection, id))
            .map_err(EditorError::store(operation))?;
        info!("event=content_delete module=service status=ok collection={collection} id={id}");
        Ok(())
    }

    pub fn add_skill(&self, name: &str, category: &str) -> EditorResult<ContentId> {
        const OP: &str = "add skill";
        let name = require(OP, "name", name)?;
        let category = require(OP, "category", category)?;
        let skill = Skill {
            id: String::new(),
            name,
            category,
            order: self.next_order(OP, SKILLS_COLLECTION)?,
        };
        self.add_item(OP, SKILLS_COLLECTION, &skill)
    }

    pub fn update_skill(&self, skill: &Skill) -> EditorResult<()> {
        const OP: &str = "update skill";
        require(OP, "name", &skill.name)?;
        self.replace_item(OP, SKILLS_COLLECTION, &skill.id, skill, &[])
    }

    pub fn delete_skill(&self, id: &str) -> EditorResult<()> {
        self.delete_item("delete skill", SKILLS_COLLECTION, id)
    }

    /// Appends an education entry; `item.order` and `item.id` are ignored.
    pub fn add_education(&self, item: &EducationItem) -> EditorResult<ContentId> {
        const OP: &str = "add education";
        require(OP, "degree", &item.degree)?;
        require(OP, "school", &item.school)?;
        let mut item = item.clone();
        item.order = self.next_order(OP, EDUCATION_COLLECTION)?;
        self.add_item(OP, EDUCATION_COLLECTION, &item)
    }

    pub fn update_education(&self, item: &EducationItem) -> EditorResult<()> {
        const OP: &str = "update education";
        require(OP, "degree", &item.degree)?;
        require(OP, "school", &item.school)?;
        self.replace_item(OP, EDUCATION_COLLECTION, &item.id, item, &[])
    }

    pub fn delete_education(&self, id: &str) -> EditorResult<()> {
        self.delete_item("delete education", EDUCATION_COLLECTION, id)
    }

    /// Appends a bento tile; `item.order` and `item.id` are ignored.
    pub fn add_bento_item(&self, item: &BentoItem) -> EditorResult<ContentId> {
        const OP: &str = "add bento item";
        require(OP, "title", &item.title)?;
        let mut item = item.clone();
        item.order = self.next_order(OP, BENTO_COLLECTION)?;
        self.add_item(OP, BENTO_COLLECTION, &item)
    }

    pub fn update_bento_item(&self, item: &BentoItem) -> EditorResult<()> {
        const OP: &str = "update bento item";
        require(OP, "title", &item.title)?;
        self.replace_item(OP, BENTO_COLLECTION, &item.id, item, &[])
    }

    pub fn delete_bento_item(&self, id: &str) -> EditorResult<()> {
        self.delete_item("delete bento item", BENTO_COLLECTION, id)
    }

    /// Creates the project when `id` is empty, otherwise updates it.
    ///
    /// Creation stamps `createdAt` and `updatedAt`. Updates replace every
    /// other field, stamp `updatedAt`, and keep the stored `createdAt`.
    pub fn save_project(&self, project: &Project) -> EditorResult<ContentId> {
        const OP: &str = "save project";
        require(OP, "title", &project.title)?;
        let now = Utc::now();
        let mut project = project.clone();
        project.updated_at = Some(now);

        if project.id.trim().is_empty() {
            project.created_at = Some(now);
            return self.add_item(OP, PROJECTS_COLLECTION, &project);
        }
        project.created_at = None;
        self.replace_item(OP, PROJECTS_COLLECTION, &project.id, &project, &["createdAt"])?;
        Ok(project.id)
    }

    pub fn delete_project(&self, id: &str) -> EditorResult<()> {
        self.delete_item("delete project", PROJECTS_COLLECTION, id)
    }

    /// Replaces the profile document.
    pub fn save_profile(&self, profile: &Profile) -> EditorResult<()> {
        const OP: &str = "save profile";
        require(OP, "name", &profile.name)?;
        let email = profile.email.trim();
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            return Err(EditorError::invalid(OP, "email is not a valid address"));
        }
        let fields = to_fields(profile).map_err(EditorError::store(OP))?;
        self.backend(OP)?
            .set(&DocPath::new(SETTINGS_COLLECTION, PROFILE_DOC), fields)
            .map_err(EditorError::store(OP))?;
        info!("event=profile_save module=service status=ok");
        Ok(())
    }

    /// One-shot profile read; the compiled-in profile when none is stored.
    pub fn load_profile(&self) -> EditorResult<Profile> {
        const OP: &str = "load profile";
        let document = self
            .backend(OP)?
            .get(&DocPath::new(SETTINGS_COLLECTION, PROFILE_DOC))
            .map_err(EditorError::store(OP))?;
        match document {
            Some(document) => document
                .decode_body()
                .map_err(|err| EditorError::store(OP)(StoreError::from(err))),
            None => Ok(default_profile()),
        }
    }

    /// Points the resume at `url`.
    pub fn set_resume_url(&self, url: &str, file_name: Option<&str>) -> EditorResult<()> {
        const OP: &str = "set resume";
        let url = require(OP, "url", url)?;
        self.write_resume(
            OP,
            &Resume {
                url: Some(url),
                file_name: file_name.map(str::to_string),
                updated_at: Some(Utc::now()),
            },
        )
    }

    /// Marks the resume as absent; the document itself is kept.
    pub fn clear_resume(&self) -> EditorResult<()> {
        self.write_resume(
            "clear resume",
            &Resume {
                url: None,
                file_name: None,
                updated_at: Some(Utc::now()),
            },
        )
    }

    fn write_resume(&self, operation: &'static str, resume: &Resume) -> EditorResult<()> {
        let fields = to_fields(resume).map_err(EditorError::store(operation))?;
        self.backend(operation)?
            .set(&DocPath::new(SETTINGS_COLLECTION, RESUME_DOC), fields)
            .map_err(EditorError::store(operation))?;
        info!(
            "event=resume_write module=service status=ok set={}",
            resume.is_set()
        );
        Ok(())
    }

    /// Adds the compiled-in sample items of one collection.
    ///
    /// Returns the number of documents written. Items keep their sample
    /// `order`; sample projects are stamped a second apart so they keep
    /// their listed order.
    pub fn seed_samples(&self, kind: ContentKind) -> EditorResult<usize> {
        const OP: &str = "seed samples";
        let collection = kind.collection();
        let written = match kind {
            ContentKind::Skills => self.add_all(OP, collection, &default_skills())?,
            ContentKind::Education => self.add_all(OP, collection, &default_education())?,
            ContentKind::Bento => self.add_all(OP, collection, &default_bento_items())?,
            ContentKind::Projects => {
                let now = Utc::now();
                let projects: Vec<Project> = sample_projects()
                    .into_iter()
                    .enumerate()
                    .map(|(index, mut project)| {
                        let stamp = now - Duration::seconds(index as i64);
                        project.created_at = Some(stamp);
                        project.updated_at = Some(stamp);
                        project
                    })
                    .collect();
                self.add_all(OP, collection, &projects)?
            }
        };
        info!(
            "event=seed_samples module=service status=ok kind={} written={written}",
            kind.as_str()
        );
        Ok(written)
    }

    fn add_all<T: Serialize>(
        &self,
        operation: &'static str,
        collection: &str,
        items: &[T],
    ) -> EditorResult<usize> {
        for (index, item) in items.iter().enumerate() {
            if let Err(err) = self.add_item(operation, collection, item) {
                error!(
                    "event=seed_samples module=service status=error collection={collection} written={index} error={err}"
                );
                return Err(err);
            }
        }
        Ok(items.len())
    }
}

/// Splits a comma-separated technology list; blanks are dropped.
pub fn parse_technologies(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn require(operation: &'static str, field: &str, value: &str) -> EditorResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EditorError::invalid(operation, format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_technologies, ContentEditor, ContentKind, EditorErrorKind};
    use crate::store::StoreHandle;

    #[test]
    fn technologies_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_technologies(" React, ,TypeScript ,Firebase,"),
            vec!["React", "TypeScript", "Firebase"]
        );
        assert!(parse_technologies("  ").is_empty());
    }

    #[test]
    fn content_kind_parses_aliases() {
        assert_eq!("Bento".parse::<ContentKind>(), Ok(ContentKind::Bento));
        assert_eq!("bentoGrid".parse::<ContentKind>(), Ok(ContentKind::Bento));
        assert!("posts".parse::<ContentKind>().is_err());
    }

    #[test]
    fn unavailable_store_error_names_the_operation() {
        let editor = ContentEditor::new(StoreHandle::Unavailable);
        let err = editor.delete_skill("abc").unwrap_err();
        assert!(matches!(err.kind, EditorErrorKind::Store(_)));
        assert!(err.to_string().starts_with("failed to delete skill:"));
    }
}
