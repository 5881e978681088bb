//! A per-request join cache (§4.2.E, §4.4): avoids re-fetching the same
//! check or period twice while synthesizing one agent configuration, or while
//! reconciling one remote-check execution cycle.

use std::collections::HashMap;

use pulsewatch_ids::Id;
use pulsewatch_model::{Check, Period};

use crate::{RepoResult, Repository};

#[derive(Default)]
pub struct RequestCache {
    checks: HashMap<Id, Check>,
    periods: HashMap<Id, Period>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_check(&mut self, repo: &dyn Repository, id: Id) -> RepoResult<Check> {
        if let Some(check) = self.checks.get(&id) {
            return Ok(check.clone());
        }
        let check = repo.find_check(id).await?;
        self.checks.insert(id, check.clone());
        Ok(check)
    }

    pub async fn get_period(&mut self, repo: &dyn Repository, id: Id) -> RepoResult<Period> {
        if let Some(period) = self.periods.get(&id) {
            return Ok(period.clone());
        }
        let period = repo.find_period(id).await?;
        self.periods.insert(id, period.clone());
        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRepository;
    use chrono::Utc;
    use pulsewatch_model::CheckKind;
    use std::collections::{BTreeMap, BTreeSet};

    #[tokio::test]
    async fn get_check_fetches_once_then_serves_from_cache() {
        let repo = InMemoryRepository::open();
        let check = Check {
            id: Id::new(),
            name: "disk".into(),
            kind: CheckKind::Disk,
            params: BTreeMap::new(),
            interval_seconds: 60,
            roles: BTreeSet::new(),
            tags: BTreeSet::new(),
            modified: Utc::now(),
        };
        repo.create_check(check.clone()).await.unwrap();

        let mut cache = RequestCache::new();
        let first = cache.get_check(&repo, check.id).await.unwrap();
        repo.delete_check(check.id).await.unwrap();
        let second = cache.get_check(&repo, check.id).await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
