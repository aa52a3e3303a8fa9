//! Which class resources a learner may open at a given moment.
//!
//! Before the class starts only resources flagged for prior access are
//! visible. From the start instant on, every non-draft resource is.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{ClassOffering, Resource, UserRecord};

/// Placeholder shown instead of a locked resource.
pub const LOCKED_MESSAGE: &str = "Resource unavailable until the class starts";

/// Whether `resource` is accessible at `now` in a class starting at `class_start`.
///
/// `now == class_start` counts as started.
pub fn can_access(class_start: NaiveDateTime, resource: &Resource, now: NaiveDateTime) -> bool {
    if now < class_start {
        resource.prior_access_allowed
    } else {
        !resource.is_draft
    }
}

/// First instant of a class start date.
pub fn start_instant(start_date: NaiveDate) -> NaiveDateTime {
    start_date.and_time(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAccess {
    Available(Resource),
    Locked(Resource),
}

impl ResourceAccess {
    pub fn evaluate(start_date: NaiveDate, resource: &Resource, now: NaiveDateTime) -> Self {
        if can_access(start_instant(start_date), resource, now) {
            ResourceAccess::Available(resource.clone())
        } else {
            ResourceAccess::Locked(resource.clone())
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ResourceAccess::Available(_))
    }

    pub fn resource(&self) -> &Resource {
        match self {
            ResourceAccess::Available(r) | ResourceAccess::Locked(r) => r,
        }
    }
}

/// A class together with the access decision for each of its resources.
#[derive(Debug, Clone)]
pub struct ClassAccess {
    pub class: ClassOffering,
    pub resources: Vec<ResourceAccess>,
}

impl ClassOffering {
    pub fn start_instant(&self) -> NaiveDateTime {
        start_instant(self.start_date)
    }

    pub fn can_access(&self, resource: &Resource, now: NaiveDateTime) -> bool {
        can_access(self.start_instant(), resource, now)
    }

    /// Resources in class order, each marked available or locked.
    pub fn resource_access(&self, now: NaiveDateTime) -> Vec<ResourceAccess> {
        self.resources
            .iter()
            .map(|r| ResourceAccess::evaluate(self.start_date, r, now))
            .collect()
    }

    /// Resources as `viewer` sees them. The class creator manages every
    /// resource, drafts included; anyone else gets [`Self::resource_access`].
    pub fn resource_access_for(&self, viewer: Option<&UserRecord>, now: NaiveDateTime) -> Vec<ResourceAccess> {
        if viewer.is_some_and(|user| self.is_created_by(user)) {
            self.resources.iter().cloned().map(ResourceAccess::Available).collect()
        } else {
            self.resource_access(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceKind, TrainingRef};
    use chrono::Duration;

    fn resource(prior_access_allowed: bool, is_draft: bool) -> Resource {
        Resource {
            id: 1,
            class_id: Some(1),
            name: "Lesson".into(),
            description: None,
            kind: ResourceKind::Video,
            url: Some("https://example.com/v.mp4".into()),
            file: None,
            prior_access_allowed,
            is_draft,
        }
    }

    fn start() -> NaiveDateTime {
        start_instant(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    #[test]
    fn test_access_table() {
        let before = start() - Duration::seconds(1);
        let after = start() + Duration::days(30);

        for prior in [false, true] {
            for draft in [false, true] {
                let r = resource(prior, draft);
                assert_eq!(can_access(start(), &r, before), prior, "before start prior={} draft={}", prior, draft);
                assert_eq!(can_access(start(), &r, start()), !draft, "at start prior={} draft={}", prior, draft);
                assert_eq!(can_access(start(), &r, after), !draft, "after start prior={} draft={}", prior, draft);
            }
        }
    }

    #[test]
    fn test_plain_resource_one_day_before_and_at_start() {
        let r = resource(false, false);
        assert!(!can_access(start(), &r, start() - Duration::days(1)));
        assert!(can_access(start(), &r, start()));
    }

    #[test]
    fn test_prior_access_draft_hides_after_start() {
        // Prior access does not override draft status once started.
        let r = resource(true, true);
        assert!(can_access(start(), &r, start() - Duration::hours(2)));
        assert!(!can_access(start(), &r, start() + Duration::hours(2)));
    }

    fn class(resources: Vec<Resource>) -> ClassOffering {
        ClassOffering {
            id: 1,
            name: "March".into(),
            training: TrainingRef::Id(1),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            completion_date: None,
            access_link: None,
            enrolled_learners: vec![],
            resources,
            created_by: Some(3),
        }
    }

    fn viewer(id: i64) -> UserRecord {
        UserRecord {
            id,
            name: "Ana".into(),
            email: "a@x.com".into(),
            phone: None,
            is_administrator: false,
            is_staff: false,
        }
    }

    #[test]
    fn test_class_resource_access_keeps_order() {
        let mut early = resource(true, false);
        early.id = 1;
        let mut regular = resource(false, false);
        regular.id = 2;
        let class = class(vec![early, regular]);

        let access = class.resource_access(start() - Duration::days(1));
        assert_eq!(access.len(), 2);
        assert!(access[0].is_available());
        assert!(!access[1].is_available());
        assert_eq!(access[1].resource().id, 2);
        assert!(class.can_access(&class.resources[1], class.start_instant()));
    }

    #[test]
    fn test_learner_view_locks_drafts_and_unstarted_resources() {
        let mut regular = resource(false, false);
        regular.id = 1;
        let mut draft = resource(false, true);
        draft.id = 2;
        let class = class(vec![regular, draft]);
        let learner = viewer(9);

        let before = class.resource_access_for(Some(&learner), start() - Duration::days(1));
        assert!(before.iter().all(|a| !a.is_available()));

        let after = class.resource_access_for(Some(&learner), start() + Duration::days(1));
        assert!(after[0].is_available());
        assert!(!after[1].is_available());

        let anonymous = class.resource_access_for(None, start() + Duration::days(1));
        assert_eq!(anonymous, after);
    }

    #[test]
    fn test_creator_view_shows_every_resource() {
        let class = class(vec![resource(false, true), resource(false, false)]);
        let creator = viewer(3);

        let access = class.resource_access_for(Some(&creator), start() - Duration::days(1));
        assert_eq!(access.len(), 2);
        assert!(access.iter().all(ResourceAccess::is_available));
    }
}
