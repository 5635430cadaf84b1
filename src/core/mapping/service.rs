//! Identity mapping service
//!
//! Resolves AMRS identifiers to HIE identifiers through a per-kind TTL cache.
//! Every cache miss of one call is resolved in a single resolver round trip.
//! Ids being resolved are tracked per id: a caller claims the misses nobody
//! else is fetching and waits only on the flights carrying the rest, so
//! callers asking for disjoint ids never queue behind each other.

use crate::adapters::hie::IdentityResolver;
use crate::config::HieConfig;
use crate::domain::{MappingKind, Result};
use moka::future::Cache;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Outcome published by the caller that owns a flight
#[derive(Clone)]
enum FlightOutcome {
    Resolved(Arc<HashMap<String, String>>),
    Failed,
}

type FlightReceiver = watch::Receiver<Option<FlightOutcome>>;

struct KindCache {
    entries: Cache<String, String>,
    in_flight: Mutex<HashMap<String, (u64, FlightReceiver)>>,
    next_flight: AtomicU64,
}

/// Misses split between those this caller fetches and those already in flight
struct Claim<'a> {
    owned: Option<Flight<'a>>,
    waiting: HashMap<u64, (FlightReceiver, Vec<String>)>,
}

/// Ids claimed by one caller; the claim is released on drop
struct Flight<'a> {
    cache: &'a KindCache,
    token: u64,
    ids: Vec<String>,
    sender: watch::Sender<Option<FlightOutcome>>,
}

impl Flight<'_> {
    fn finish(self, outcome: FlightOutcome) {
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.flights();
        for id in &self.ids {
            if in_flight.get(id).is_some_and(|(token, _)| *token == self.token) {
                in_flight.remove(id);
            }
        }
    }
}

impl KindCache {
    fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            in_flight: Mutex::new(HashMap::new()),
            next_flight: AtomicU64::new(0),
        }
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<String, (u64, FlightReceiver)>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Splits `ids` into cached pairs and misses
    async fn lookup(&self, ids: &[String]) -> (HashMap<String, String>, Vec<String>) {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.entries.get(id).await {
                Some(remote) => {
                    found.insert(id.clone(), remote);
                }
                None => missing.push(id.clone()),
            }
        }
        (found, missing)
    }

    /// Claims the misses no other caller is fetching
    fn claim(&self, missing: Vec<String>) -> Claim<'_> {
        let mut in_flight = self.flights();
        let mut owned = Vec::new();
        let mut waiting: HashMap<u64, (FlightReceiver, Vec<String>)> = HashMap::new();
        for id in missing {
            match in_flight.get(&id) {
                Some((token, receiver)) => waiting
                    .entry(*token)
                    .or_insert_with(|| (receiver.clone(), Vec::new()))
                    .1
                    .push(id),
                None => owned.push(id),
            }
        }
        if owned.is_empty() {
            return Claim { owned: None, waiting };
        }

        let token = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(None);
        for id in &owned {
            in_flight.insert(id.clone(), (token, receiver.clone()));
        }
        drop(in_flight);

        Claim {
            owned: Some(Flight {
                cache: self,
                token,
                ids: owned,
                sender,
            }),
            waiting,
        }
    }
}

/// Waits for a flight; `None` when its owner failed or went away
async fn land(mut receiver: FlightReceiver) -> Option<Arc<HashMap<String, String>>> {
    let outcome = receiver.wait_for(Option::is_some).await.ok()?.clone();
    match outcome {
        Some(FlightOutcome::Resolved(mappings)) => Some(mappings),
        _ => None,
    }
}

/// Batched, cached local → HIE identifier resolution
pub struct IdentityMappingService {
    resolver: Arc<dyn IdentityResolver>,
    practitioners: KindCache,
    facilities: KindCache,
    patients: KindCache,
}

impl IdentityMappingService {
    pub fn new(resolver: Arc<dyn IdentityResolver>, ttl: Duration, capacity: u64) -> Self {
        Self {
            resolver,
            practitioners: KindCache::new(ttl, capacity),
            facilities: KindCache::new(ttl, capacity),
            patients: KindCache::new(ttl, capacity),
        }
    }

    pub fn from_config(resolver: Arc<dyn IdentityResolver>, config: &HieConfig) -> Self {
        Self::new(
            resolver,
            Duration::from_secs(config.mapping_cache_ttl_seconds),
            config.mapping_cache_capacity,
        )
    }

    pub async fn resolve_practitioner_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.resolve(MappingKind::Practitioner, ids).await
    }

    pub async fn resolve_facility_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.resolve(MappingKind::Facility, ids).await
    }

    pub async fn resolve_patient_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.resolve(MappingKind::Patient, ids).await
    }

    fn cache_for(&self, kind: MappingKind) -> &KindCache {
        match kind {
            MappingKind::Practitioner => &self.practitioners,
            MappingKind::Facility => &self.facilities,
            MappingKind::Patient => &self.patients,
        }
    }

    /// Resolves `ids`; ids without a mapping are absent from the result
    pub async fn resolve(&self, kind: MappingKind, ids: &[String]) -> Result<HashMap<String, String>> {
        let unique: Vec<String> = ids
            .iter()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let cache = self.cache_for(kind);
        let (mut resolved, missing) = cache.lookup(&unique).await;
        if missing.is_empty() {
            tracing::trace!(kind = %kind, hits = resolved.len(), "Mappings served from cache");
            return Ok(resolved);
        }

        let Claim { owned, waiting } = cache.claim(missing);

        // own flight first, so two callers waiting on each other both progress
        if let Some(flight) = owned {
            let fetched = self.fetch(kind, cache, &flight.ids).await;
            match fetched {
                Ok(mappings) => {
                    resolved.extend(mappings.iter().map(|(k, v)| (k.clone(), v.clone())));
                    flight.finish(FlightOutcome::Resolved(mappings));
                }
                Err(e) => {
                    flight.finish(FlightOutcome::Failed);
                    return Err(e);
                }
            }
        }

        for (_, (receiver, ids)) in waiting {
            match land(receiver).await {
                Some(mappings) => {
                    for id in ids {
                        if let Some(remote) = mappings.get(&id) {
                            resolved.insert(id, remote.clone());
                        }
                    }
                }
                None => {
                    tracing::debug!(kind = %kind, ids = ids.len(), "Shared lookup failed, resolving directly");
                    let mappings = self.fetch(kind, cache, &ids).await?;
                    resolved.extend(mappings.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        Ok(resolved)
    }

    /// One resolver round trip for `ids`, cached on success
    async fn fetch(
        &self,
        kind: MappingKind,
        cache: &KindCache,
        ids: &[String],
    ) -> Result<Arc<HashMap<String, String>>> {
        let mappings = self.resolver.resolve(kind, ids).await?;
        let mut resolved = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            cache
                .entries
                .insert(mapping.local_id.clone(), mapping.remote_id.clone())
                .await;
            resolved.insert(mapping.local_id, mapping.remote_id);
        }

        let unmapped = ids.iter().filter(|id| !resolved.contains_key(*id)).count();
        if unmapped > 0 {
            tracing::debug!(kind = %kind, unmapped = unmapped, "Some identifiers have no HIE mapping");
        }

        Ok(Arc::new(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BridgeError, EncounterContext, IdentityMapping};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
        requested: StdMutex<Vec<Vec<String>>>,
        active: AtomicUsize,
        peak_active: AtomicUsize,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl IdentityResolver for CountingResolver {
        async fn resolve(&self, kind: MappingKind, ids: &[String]) -> Result<Vec<IdentityMapping>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(ids.to_vec());
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_active.fetch_max(now_active, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(BridgeError::Connection("mapping endpoint down".to_string()));
            }
            Ok(ids
                .iter()
                .filter(|id| !id.starts_with("unknown"))
                .map(|id| IdentityMapping {
                    local_id: id.clone(),
                    remote_id: format!("HIE-{id}"),
                    kind,
                })
                .collect())
        }

        async fn get_facility_code_for_location(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn get_encounter_context(&self, _: &str) -> Result<Option<EncounterContext>> {
            Ok(None)
        }
    }

    fn service(resolver: Arc<CountingResolver>) -> IdentityMappingService {
        IdentityMappingService::new(resolver, Duration::from_secs(60), 100)
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());
        assert!(svc.resolve_practitioner_ids(&[]).await.unwrap().is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_misses_resolved_in_one_call_and_unknown_absent() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());

        let map = svc
            .resolve_facility_ids(&ids(&["f1", "f2", "f1", "unknown-3"]))
            .await
            .unwrap();

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.requested.lock().unwrap()[0], ids(&["f1", "f2", "unknown-3"]));
        assert_eq!(map.len(), 2);
        assert_eq!(map["f1"], "HIE-f1");
        assert!(!map.contains_key("unknown-3"));
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_ids() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());

        svc.resolve_practitioner_ids(&ids(&["p1", "p2"])).await.unwrap();
        let again = svc.resolve_practitioner_ids(&ids(&["p2", "p1"])).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.len(), 2);

        svc.resolve_practitioner_ids(&ids(&["p1", "p3"])).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.requested.lock().unwrap()[1], ids(&["p3"]));
    }

    #[tokio::test]
    async fn test_kinds_are_cached_separately() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());

        svc.resolve_practitioner_ids(&ids(&["x"])).await.unwrap();
        svc.resolve_patient_ids(&ids(&["x"])).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_coalesce() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = Arc::new(service(resolver.clone()));
        let wanted = ids(&["p1", "p2"]);

        let (a, b) = tokio::join!(
            svc.resolve_practitioner_ids(&wanted),
            svc.resolve_practitioner_ids(&wanted)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disjoint_callers_resolve_in_parallel() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());

        let (ids_a, ids_b) = (ids(&["p1"]), ids(&["p2"]));
        let (a, b) = tokio::join!(
            svc.resolve_practitioner_ids(&ids_a),
            svc.resolve_practitioner_ids(&ids_b)
        );

        assert_eq!(a.unwrap()["p1"], "HIE-p1");
        assert_eq!(b.unwrap()["p2"], "HIE-p2");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.peak_active.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overlapping_callers_fetch_only_unclaimed_ids() {
        let resolver = Arc::new(CountingResolver::default());
        let svc = service(resolver.clone());

        let (ids_a, ids_b) = (ids(&["f1", "f2"]), ids(&["f2", "f3"]));
        let (a, b) = tokio::join!(
            svc.resolve_facility_ids(&ids_a),
            svc.resolve_facility_ids(&ids_b)
        );

        let b = b.unwrap();
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.len(), 2);
        assert_eq!(b["f2"], "HIE-f2");
        assert_eq!(
            *resolver.requested.lock().unwrap(),
            vec![ids(&["f1", "f2"]), ids(&["f3"])]
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_by_waiting_caller() {
        let resolver = Arc::new(CountingResolver::default());
        resolver.fail_next.store(true, Ordering::SeqCst);
        let svc = service(resolver.clone());
        let wanted = ids(&["p1"]);

        let (a, b) = tokio::join!(
            svc.resolve_practitioner_ids(&wanted),
            svc.resolve_practitioner_ids(&wanted)
        );

        assert!(a.is_err());
        assert_eq!(b.unwrap()["p1"], "HIE-p1");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

        // nothing left claimed after the failure
        svc.resolve_practitioner_ids(&ids(&["p1"])).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }
}
