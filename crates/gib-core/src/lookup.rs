//! Group-info lookup entry point.
//!
//! Composes normalizer -> resolver -> enrichment into a single call. Cost
//! accounting stays with the caller: this service never touches the ledger,
//! so debit/refund policy lives where the product flow is.

use std::sync::Arc;

use crate::{
    domain::GroupDescriptor,
    enrich::{enrich, EnrichOptions},
    normalize::normalize,
    ports::Directory,
    resolver::resolve,
    Error, Result,
};

pub struct GroupInfoService {
    directory: Arc<dyn Directory>,
    opts: EnrichOptions,
}

impl GroupInfoService {
    pub fn new(directory: Arc<dyn Directory>, opts: EnrichOptions) -> Self {
        Self { directory, opts }
    }

    /// Build a best-effort info record for a user-supplied group reference.
    ///
    /// Fails with `EmptyInput` on blank input and `Unresolvable` when the
    /// directory cannot identify the reference (including a timed-out
    /// lookup). Enrichment failures never surface; the corresponding fields
    /// stay at their defaults.
    pub async fn lookup_group_info(&self, raw_text: &str) -> Result<GroupDescriptor> {
        let reference = normalize(raw_text)?;

        let resolved = tokio::time::timeout(
            self.opts.call_timeout,
            resolve(self.directory.as_ref(), &reference),
        )
        .await
        .map_err(|_| Error::Unresolvable("timeout".to_string()))?;
        let (entity, mut descriptor) = resolved?;

        enrich(self.directory.as_ref(), &entity, &mut descriptor, &self.opts).await;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstimateMethod, NormalizedRef, UserId};
    use crate::ledger::CreditLedger;
    use crate::ports::{Entity, FullProfile, MessageStamp, Participant};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeDirectory {
        entity: Option<Entity>,
        slow_lookup: bool,
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn lookup(&self, _r: &NormalizedRef) -> Result<Entity> {
            if self.slow_lookup {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.entity
                .clone()
                .ok_or_else(|| Error::External("no such peer".to_string()))
        }

        async fn full_profile(&self, _e: &Entity) -> Result<FullProfile> {
            Err(Error::External("unavailable".to_string()))
        }

        async fn oldest_message(&self, _e: &Entity) -> Result<Option<MessageStamp>> {
            Ok(None)
        }

        async fn list_admins(&self, _e: &Entity) -> Result<Vec<Participant>> {
            Ok(Vec::new())
        }

        async fn list_participants(&self, _e: &Entity, _limit: usize) -> Result<Vec<Participant>> {
            Ok(Vec::new())
        }
    }

    fn service(entity: Option<Entity>, slow_lookup: bool) -> GroupInfoService {
        let opts = EnrichOptions {
            call_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        GroupInfoService::new(Arc::new(FakeDirectory { entity, slow_lookup }), opts)
    }

    fn some_group() -> Entity {
        Entity {
            id: 55_000_000_000,
            title: Some("Rustaceans".to_string()),
            channel_like: false,
            broadcast: false,
            member_count: Some(9),
        }
    }

    #[tokio::test]
    async fn resolved_group_gets_id_heuristic_estimate() {
        let svc = service(Some(some_group()), false);
        let d = svc.lookup_group_info("@rustaceans").await.unwrap();
        assert_eq!(d.title, "Rustaceans");
        assert_eq!(d.id, Some(55_000_000_000));
        assert_eq!(d.created.method, EstimateMethod::IdHeuristic);
        assert_eq!(d.created.value, "~2015-2016");
        assert_eq!(d.owner_guess, "Unknown");
        assert!(d.admins.is_empty());
    }

    #[tokio::test]
    async fn failed_lookup_is_unresolvable() {
        let svc = service(None, false);
        match svc.lookup_group_info("@nope").await {
            Err(Error::Unresolvable(reason)) => assert!(reason.contains("no such peer")),
            other => panic!("expected Unresolvable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_lookup_times_out_as_unresolvable() {
        let svc = service(Some(some_group()), true);
        match svc.lookup_group_info("@slow").await {
            Err(Error::Unresolvable(reason)) => assert_eq!(reason, "timeout"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_any_directory_call() {
        let svc = service(None, false);
        assert!(matches!(
            svc.lookup_group_info("  ").await,
            Err(Error::EmptyInput)
        ));
    }

    // The product flow: debit, attempt, refund on failure.
    #[tokio::test]
    async fn failed_resolution_refunds_the_debit() {
        let ledger = CreditLedger::new(Arc::new(MemoryStore::new()), 5);
        ledger.ensure_account(UserId(1), None, "u").unwrap();
        let svc = service(None, false);

        let outcome = {
            let guard = ledger.try_debit(UserId(1), 5).unwrap();
            match svc.lookup_group_info("@nope").await {
                Ok(d) => {
                    guard.disarm();
                    Ok(d)
                }
                Err(e) => Err(e), // guard drops here, refunding
            }
        };

        assert!(matches!(outcome, Err(Error::Unresolvable(_))));
        assert_eq!(ledger.balance(UserId(1)).unwrap(), 5);
        assert_eq!(ledger.total_searches().unwrap(), 1);
    }

    // Cancellation after debit must also refund.
    #[tokio::test]
    async fn abandoned_request_refunds_via_guard_drop() {
        let ledger = Arc::new(CreditLedger::new(Arc::new(MemoryStore::new()), 5));
        ledger.ensure_account(UserId(1), None, "u").unwrap();

        let svc = Arc::new(service(Some(some_group()), true));
        let task = {
            let ledger = ledger.clone();
            let svc = svc.clone();
            tokio::spawn(async move {
                let guard = ledger.try_debit(UserId(1), 5).unwrap();
                let d = svc.lookup_group_info("@slow").await?;
                guard.disarm();
                Ok::<_, Error>(d)
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();
        let _ = task.await;

        assert_eq!(ledger.balance(UserId(1)).unwrap(), 5);
    }
}
