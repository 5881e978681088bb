use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter_matches;
use pulsewatch_ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodKind {
    /// Suppresses both execution and alerting.
    Blackout,
    /// Suppresses alerting only.
    Quiet,
}

/// A time window modifying monitoring behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: Id,
    pub name: String,
    pub kind: PeriodKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub roles: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub subjects: BTreeSet<Id>,
    pub modified: DateTime<Utc>,
}

impl Period {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    /// "Matches" a (subject, check) pair per §3: role filter empty or
    /// overlaps subject roles; AND tag filter empty or overlaps check tags;
    /// AND subject set empty or contains subject id.
    pub fn matches(
        &self,
        subject_id: Id,
        subject_roles: &BTreeSet<String>,
        check_tags: &BTreeSet<String>,
    ) -> bool {
        filter_matches(&self.roles, subject_roles)
            && filter_matches(&self.tags, check_tags)
            && (self.subjects.is_empty() || self.subjects.contains(&subject_id))
    }

    /// Matches for contexts with no check in play (whole-subject blackout,
    /// §4.2 step 2): the tag filter must be empty to count as a match.
    pub fn matches_subject_only(&self, subject_id: Id, subject_roles: &BTreeSet<String>) -> bool {
        self.tags.is_empty() && self.matches(subject_id, subject_roles, &BTreeSet::new())
    }

    /// Effective-modified per §4.2: max(modified, start if start <= now else
    /// -inf, end if end <= now else -inf). This makes conditional-GET
    /// invalidate exactly when the period transitions into or out of
    /// "active".
    pub fn effective_modified(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut effective = self.modified;
        if self.start <= now && self.start > effective {
            effective = self.start;
        }
        if self.end <= now && self.end > effective {
            effective = self.end;
        }
        effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn period(kind: PeriodKind, start: DateTime<Utc>, end: DateTime<Utc>) -> Period {
        Period {
            id: Id::new(),
            name: "p".into(),
            kind,
            start,
            end,
            roles: BTreeSet::new(),
            tags: BTreeSet::new(),
            subjects: BTreeSet::new(),
            modified: start,
        }
    }

    #[test]
    fn active_bounds_are_inclusive() {
        let now = Utc::now();
        let p = period(PeriodKind::Blackout, now - Duration::minutes(1), now + Duration::minutes(1));
        assert!(p.is_active(now));
        assert!(p.is_active(now - Duration::minutes(1)));
        assert!(p.is_active(now + Duration::minutes(1)));
        assert!(!p.is_active(now + Duration::minutes(2)));
    }

    #[test]
    fn effective_modified_tracks_activation_transition() {
        let modified = Utc::now() - Duration::hours(1);
        let start = Utc::now() - Duration::minutes(5);
        let end = Utc::now() + Duration::minutes(30);
        let mut p = period(PeriodKind::Quiet, start, end);
        p.modified = modified;
        let now = Utc::now();
        // start <= now <= end: start has already happened, contributes its
        // timestamp; end is in the future and is excluded.
        assert_eq!(p.effective_modified(now), start);
    }

    #[test]
    fn empty_tag_filter_required_for_whole_subject_match() {
        let now = Utc::now();
        let mut p = period(PeriodKind::Blackout, now - Duration::minutes(1), now + Duration::minutes(1));
        p.tags.insert("db".into());
        assert!(!p.matches_subject_only(Id::new(), &BTreeSet::new()));
    }
}
