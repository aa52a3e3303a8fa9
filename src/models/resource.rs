//! Class resources and the multipart body used to upload them.
//!
//! Field names are asymmetric on the wire. Responses are read under the
//! English names or the portal's legacy Portuguese ones (`tipo_recurso`,
//! `turma`, `acesso_previo`, ...), but [`NewResource::to_form`] only writes
//! the English names (`kind`, `class`, `prior_access_allowed`). A backend
//! that accepts only the legacy names will reject these uploads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::MultipartForm;

/// Kind of learning material attached to a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Video,
    Document,
    Link,
    Pdf,
    Zip,
    Other,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Video,
        ResourceKind::Document,
        ResourceKind::Link,
        ResourceKind::Pdf,
        ResourceKind::Zip,
        ResourceKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Document => "document",
            ResourceKind::Link => "link",
            ResourceKind::Pdf => "pdf",
            ResourceKind::Zip => "zip",
            ResourceKind::Other => "other",
        }
    }

    /// Strict parse for user input; unknown names are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Some(ResourceKind::Video),
            "document" | "documento" => Some(ResourceKind::Document),
            "link" => Some(ResourceKind::Link),
            "pdf" => Some(ResourceKind::Pdf),
            "zip" => Some(ResourceKind::Zip),
            "other" | "outro" => Some(ResourceKind::Other),
            _ => None,
        }
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        ResourceKind::parse(&s).unwrap_or(ResourceKind::Other)
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learning resource belonging to a class.
///
/// Whether a learner may open it is computed by [`crate::visibility`],
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    #[serde(default, alias = "turma", rename = "class")]
    pub class_id: Option<i64>,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
    #[serde(alias = "tipo_recurso")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "arquivo")]
    pub file: Option<String>,
    #[serde(default, alias = "acesso_previo")]
    pub prior_access_allowed: bool,
    #[serde(default, alias = "draft")]
    pub is_draft: bool,
}

impl Resource {
    /// Where the material can be opened: the uploaded file wins over the URL.
    pub fn location(&self) -> Option<&str> {
        self.file
            .as_deref()
            .filter(|f| !f.is_empty())
            .or_else(|| self.url.as_deref().filter(|u| !u.is_empty()))
    }
}

/// Admin request for `POST /resources/register/`.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub class_id: i64,
    pub kind: ResourceKind,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    /// `(file name, contents)` of an uploaded file.
    pub file: Option<(String, Vec<u8>)>,
    pub prior_access_allowed: bool,
    pub is_draft: bool,
}

impl NewResource {
    pub fn new(class_id: i64, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            class_id,
            kind,
            name: name.into(),
            description: None,
            url: None,
            file: None,
            prior_access_allowed: false,
            is_draft: false,
        }
    }

    /// Multipart body for `/resources/register/`, using English field names.
    pub fn to_form(&self) -> MultipartForm {
        let mut form = MultipartForm::default()
            .text("name", self.name.clone())
            .text("description", self.description.clone().unwrap_or_default())
            .text("kind", self.kind.as_str())
            .text("class", self.class_id.to_string())
            .text("prior_access_allowed", self.prior_access_allowed.to_string())
            .text("is_draft", self.is_draft.to_string());
        if let Some(ref url) = self.url {
            form = form.text("url", url.clone());
        }
        if let Some((ref file_name, ref bytes)) = self.file {
            form = form.file("file", file_name.clone(), bytes.clone());
        }
        form
    }
}
