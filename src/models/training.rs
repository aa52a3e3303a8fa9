//! Trainings and their scheduled class offerings ("turmas").
//!
//! Reads accept the legacy Portuguese field names as aliases (`nome`,
//! `treinamento`, `alunos_matriculados`, ...). Request bodies ([`NewTraining`],
//! [`NewClass`], [`ClassUpdate`]) are written with English names only, so
//! enrolment goes out as `learners` rather than `alunos_ids`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Resource, UserRecord};

/// Curriculum a class offering is based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
}

/// The training a class points at: either just its id or the nested record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainingRef {
    Id(i64),
    Nested(Training),
}

impl TrainingRef {
    pub fn id(&self) -> i64 {
        match self {
            TrainingRef::Id(id) => *id,
            TrainingRef::Nested(training) => training.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TrainingRef::Id(_) => None,
            TrainingRef::Nested(training) => Some(&training.name),
        }
    }
}

/// A scheduled cohort of a training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOffering {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "treinamento")]
    pub training: TrainingRef,
    #[serde(alias = "data_inicio")]
    pub start_date: NaiveDate,
    #[serde(default, alias = "data_conclusao")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default, alias = "link_acesso")]
    pub access_link: Option<String>,
    #[serde(default, alias = "alunos_matriculados")]
    pub enrolled_learners: Vec<UserRecord>,
    #[serde(default, alias = "recursos", deserialize_with = "nested_resources")]
    pub resources: Vec<Resource>,
    #[serde(default, alias = "criado_por")]
    pub created_by: Option<i64>,
}

impl ClassOffering {
    pub fn training_id(&self) -> i64 {
        self.training.id()
    }

    /// Only the creator of a class manages its learners and resources.
    pub fn is_created_by(&self, user: &UserRecord) -> bool {
        self.created_by == Some(user.id)
    }

    pub fn is_enrolled(&self, user: &UserRecord) -> bool {
        self.enrolled_learners.iter().any(|l| l.id == user.id)
    }
}

/// List endpoints return resource ids where detail endpoints nest records;
/// keep only the nested records.
fn nested_resources<'de, D>(deserializer: D) -> Result<Vec<Resource>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Full(Resource),
        Id(#[allow(dead_code)] i64),
    }

    let entries = Vec::<Entry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Full(resource) => Some(resource),
            Entry::Id(_) => None,
        })
        .collect())
}

/// Response of `GET /classes/{id}/detail/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassDetail {
    #[serde(alias = "turma")]
    pub class: ClassOffering,
    #[serde(default, alias = "recursos")]
    pub resources: Vec<Resource>,
}

impl ClassDetail {
    /// Fold the separately listed resources into the class.
    pub fn into_class(self) -> ClassOffering {
        let mut class = self.class;
        if !self.resources.is_empty() {
            class.resources = self.resources;
        }
        class
    }
}

/// Admin request for `POST /trainings/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTraining {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Admin request for `POST /classes/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewClass {
    #[serde(rename = "training")]
    pub training_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_link: Option<String>,
    #[serde(rename = "learners", skip_serializing_if = "Vec::is_empty")]
    pub learner_ids: Vec<i64>,
}

/// Partial update for `PATCH /classes/{id}/edit/`.
///
/// `learner_ids`, when present, replaces the whole enrolment set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(rename = "learners", skip_serializing_if = "Option::is_none")]
    pub learner_ids: Option<Vec<i64>>,
}

impl ClassUpdate {
    pub fn enrol(learner_ids: Vec<i64>) -> Self {
        Self {
            learner_ids: Some(learner_ids),
            ..Self::default()
        }
    }
}
