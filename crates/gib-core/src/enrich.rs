//! Best-effort info enrichment.
//!
//! Four ordered stages over a resolved descriptor: member count, oldest
//! message date, admin/owner list, id-era fallback. Each stage catches its
//! own failures and leaves the field at its default; nothing in here aborts
//! the pipeline, and nothing escapes it.

use std::future::Future;
use std::time::Duration;

use chrono::DateTime;

use crate::{
    domain::{CreatedEstimate, EstimateMethod, GroupDescriptor},
    ports::{Directory, Entity, Participant},
    Error, Result,
};

const OLDEST_MESSAGE_NOTE: &str = "Oldest visible message date (approx if early messages deleted).";
const ID_HEURISTIC_NOTE: &str = "Group ID heuristic estimate; less precise.";

/// One era bucket: ids strictly below `below` get `label`.
#[derive(Clone, Debug)]
pub struct EraBucket {
    pub below: i64,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct EnrichOptions {
    /// How many non-bot participants to list when the admin-filtered query
    /// fails.
    pub admin_fallback_limit: usize,
    /// Ordered, ascending exclusive upper bounds on the absolute id.
    pub era_buckets: Vec<EraBucket>,
    /// Label when no bucket bound matches.
    pub era_final: String,
    /// Budget for each individual directory call.
    pub call_timeout: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        let bucket = |below: i64, label: &str| EraBucket {
            below,
            label: label.to_string(),
        };
        Self {
            admin_fallback_limit: 50,
            era_buckets: vec![
                bucket(100_000_000_000, "2015-2016"),
                bucket(1_000_000_000_000, "2017-2018"),
                bucket(10_000_000_000_000, "2019-2021"),
            ],
            era_final: "2022-2025".to_string(),
            call_timeout: Duration::from_secs(15),
        }
    }
}

/// Era label for an absolute numeric id. Exactly one label for any
/// non-negative id; bounds are exclusive, so an id equal to a bound falls
/// into the next bucket.
pub fn era_label<'a>(id_abs: i64, opts: &'a EnrichOptions) -> &'a str {
    for bucket in &opts.era_buckets {
        if id_abs < bucket.below {
            return &bucket.label;
        }
    }
    &opts.era_final
}

async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::External("timeout".to_string())),
    }
}

/// Run the enrichment stages over a resolved descriptor, in place.
pub async fn enrich(
    directory: &dyn Directory,
    entity: &Entity,
    descriptor: &mut GroupDescriptor,
    opts: &EnrichOptions,
) {
    member_count_stage(directory, entity, descriptor, opts).await;
    oldest_message_stage(directory, entity, descriptor, opts).await;
    admins_stage(directory, entity, descriptor, opts).await;
    id_heuristic_stage(descriptor, opts);
}

/// Extended profile count, falling back to the count embedded on the entity.
/// Non-channel-like entities stay unset.
async fn member_count_stage(
    directory: &dyn Directory,
    entity: &Entity,
    descriptor: &mut GroupDescriptor,
    opts: &EnrichOptions,
) {
    if !entity.channel_like {
        return;
    }
    descriptor.member_count = match bounded(opts.call_timeout, directory.full_profile(entity)).await
    {
        Ok(profile) => profile.member_count.or(entity.member_count),
        Err(_) => entity.member_count,
    };
}

async fn oldest_message_stage(
    directory: &dyn Directory,
    entity: &Entity,
    descriptor: &mut GroupDescriptor,
    opts: &EnrichOptions,
) {
    let stamp = match bounded(opts.call_timeout, directory.oldest_message(entity)).await {
        Ok(Some(stamp)) => stamp,
        Ok(None) | Err(_) => return,
    };
    let Some(date) = DateTime::from_timestamp(stamp.date, 0) else {
        return;
    };
    descriptor.created = CreatedEstimate {
        value: date.format("%Y-%m-%d %H:%M:%S").to_string(),
        method: EstimateMethod::OldestMessage,
        note: OLDEST_MESSAGE_NOTE.to_string(),
    };
}

/// Admin list with first-listed-admin owner guess. When the admin-filtered
/// query fails, degrade to the first N non-bot participants.
async fn admins_stage(
    directory: &dyn Directory,
    entity: &Entity,
    descriptor: &mut GroupDescriptor,
    opts: &EnrichOptions,
) {
    let names = match bounded(opts.call_timeout, directory.list_admins(entity)).await {
        Ok(admins) => admins.iter().map(Participant::display_name).collect(),
        Err(_) => {
            match bounded(
                opts.call_timeout,
                directory.list_participants(entity, opts.admin_fallback_limit),
            )
            .await
            {
                Ok(participants) => participants
                    .iter()
                    .filter(|p| !p.is_bot)
                    .map(degraded_name)
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
    };

    if let Some(first) = names.first() {
        descriptor.owner_guess = first.clone();
    }
    descriptor.admins = names;
}

// The degraded listing prefers the handle, unlike the admin path which
// prefers real names.
fn degraded_name(p: &Participant) -> String {
    p.username
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| p.first_name.clone().filter(|n| !n.is_empty()))
        .unwrap_or_else(|| format!("id{}", p.id))
}

/// Only runs when the oldest-message stage produced nothing.
fn id_heuristic_stage(descriptor: &mut GroupDescriptor, opts: &EnrichOptions) {
    if descriptor.created.method != EstimateMethod::Unknown {
        return;
    }
    match descriptor.id {
        Some(id) => {
            let label = era_label(id.saturating_abs(), opts);
            descriptor.created = CreatedEstimate {
                value: format!("~{label}"),
                method: EstimateMethod::IdHeuristic,
                note: ID_HEURISTIC_NOTE.to_string(),
            };
        }
        None => {
            descriptor.created = CreatedEstimate::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupDescriptor, GroupKind, NormalizedRef};
    use crate::ports::{FullProfile, MessageStamp};
    use async_trait::async_trait;

    fn fail<T>(what: &str) -> Result<T> {
        Err(Error::External(format!("{what} failed")))
    }

    /// Directory fake with per-call switches.
    #[derive(Default)]
    struct FakeDirectory {
        full_profile: Option<i64>,
        full_profile_fails: bool,
        oldest: Option<i64>,
        oldest_fails: bool,
        admins: Vec<Participant>,
        admins_fail: bool,
        participants: Vec<Participant>,
        participants_fail: bool,
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn lookup(&self, _r: &NormalizedRef) -> Result<Entity> {
            fail("lookup")
        }

        async fn full_profile(&self, _e: &Entity) -> Result<FullProfile> {
            if self.full_profile_fails {
                return fail("full_profile");
            }
            Ok(FullProfile {
                member_count: self.full_profile,
            })
        }

        async fn oldest_message(&self, _e: &Entity) -> Result<Option<MessageStamp>> {
            if self.oldest_fails {
                return fail("oldest_message");
            }
            Ok(self.oldest.map(|date| MessageStamp { date }))
        }

        async fn list_admins(&self, _e: &Entity) -> Result<Vec<Participant>> {
            if self.admins_fail {
                return fail("list_admins");
            }
            Ok(self.admins.clone())
        }

        async fn list_participants(&self, _e: &Entity, limit: usize) -> Result<Vec<Participant>> {
            if self.participants_fail {
                return fail("list_participants");
            }
            Ok(self.participants.iter().take(limit).cloned().collect())
        }
    }

    fn channel_entity() -> Entity {
        Entity {
            id: 1_000_000_000_001,
            title: Some("c".to_string()),
            channel_like: true,
            broadcast: true,
            member_count: Some(11),
        }
    }

    fn base(entity: &Entity) -> GroupDescriptor {
        GroupDescriptor::base(entity.display_title(), Some(entity.id), GroupKind::Channel)
    }

    fn person(id: i64, first: Option<&str>, user: Option<&str>, bot: bool) -> Participant {
        Participant {
            id,
            first_name: first.map(str::to_string),
            last_name: None,
            username: user.map(str::to_string),
            is_bot: bot,
        }
    }

    #[tokio::test]
    async fn full_profile_count_wins_over_embedded() {
        let dir = FakeDirectory {
            full_profile: Some(123),
            ..Default::default()
        };
        let entity = channel_entity();
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.member_count, Some(123));
    }

    #[tokio::test]
    async fn failed_full_profile_degrades_to_embedded_count() {
        let dir = FakeDirectory {
            full_profile_fails: true,
            ..Default::default()
        };
        let entity = channel_entity();
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.member_count, Some(11));
    }

    #[tokio::test]
    async fn non_channel_entities_keep_member_count_unset() {
        let dir = FakeDirectory {
            full_profile: Some(123),
            ..Default::default()
        };
        let entity = Entity {
            channel_like: false,
            broadcast: false,
            ..channel_entity()
        };
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.member_count, None);
    }

    #[tokio::test]
    async fn oldest_message_date_is_recorded_verbatim() {
        let dir = FakeDirectory {
            oldest: Some(1_500_000_000),
            ..Default::default()
        };
        let entity = channel_entity();
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.created.method, EstimateMethod::OldestMessage);
        assert_eq!(d.created.value, "2017-07-14 02:40:00");
    }

    #[tokio::test]
    async fn admin_names_and_owner_guess() {
        let dir = FakeDirectory {
            admins: vec![
                person(1, Some("Ann"), Some("ann"), false),
                person(2, None, Some("bob"), false),
                person(3, None, None, false),
            ],
            ..Default::default()
        };
        let entity = channel_entity();
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.admins, vec!["Ann", "bob", "id3"]);
        assert_eq!(d.owner_guess, "Ann");
    }

    #[tokio::test]
    async fn failed_admin_query_degrades_to_non_bot_participants() {
        let dir = FakeDirectory {
            admins_fail: true,
            participants: vec![
                person(1, Some("Ann"), Some("ann"), false),
                person(2, Some("Robo"), Some("robo_bot"), true),
                person(3, Some("Cid"), None, false),
            ],
            ..Default::default()
        };
        let entity = channel_entity();
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        // Degraded naming prefers handles; bots are skipped.
        assert_eq!(d.admins, vec!["ann", "Cid"]);
        assert_eq!(d.owner_guess, "ann");
    }

    #[tokio::test]
    async fn everything_failing_still_produces_a_descriptor() {
        let dir = FakeDirectory {
            full_profile_fails: true,
            oldest_fails: true,
            admins_fail: true,
            participants_fail: true,
            ..Default::default()
        };
        let entity = Entity {
            member_count: None,
            ..channel_entity()
        };
        let mut d = base(&entity);
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.member_count, None);
        assert!(d.admins.is_empty());
        assert_eq!(d.owner_guess, "Unknown");
        // Id heuristic still fires.
        assert_eq!(d.created.method, EstimateMethod::IdHeuristic);
        assert_eq!(d.created.value, "~2019-2021");
    }

    #[tokio::test]
    async fn no_oldest_message_and_no_id_reports_unknown() {
        let dir = FakeDirectory::default();
        let entity = channel_entity();
        let mut d = base(&entity);
        d.id = None;
        enrich(&dir, &entity, &mut d, &EnrichOptions::default()).await;
        assert_eq!(d.created.method, EstimateMethod::Unknown);
        assert_eq!(d.created.value, "Unknown");
    }

    #[test]
    fn era_buckets_are_monotonic_and_exhaustive() {
        let opts = EnrichOptions::default();
        assert_eq!(era_label(0, &opts), "2015-2016");
        assert_eq!(era_label(99_999_999_999, &opts), "2015-2016");
        // Bounds are exclusive: an id equal to a bound is in the next bucket.
        assert_eq!(era_label(100_000_000_000, &opts), "2017-2018");
        assert_eq!(era_label(1_000_000_000_000, &opts), "2019-2021");
        assert_eq!(era_label(10_000_000_000_000, &opts), "2022-2025");
        assert_eq!(era_label(i64::MAX, &opts), "2022-2025");
    }
}
