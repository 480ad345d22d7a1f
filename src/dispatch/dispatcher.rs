//! Rate-limited dispatcher

use crate::config::DispatchConfig;
use crate::feed::PairSnapshot;
use crate::notify::{alert_message, Notifier};
use crate::screen::Admission;
use crate::store::{DedupStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// An admitted snapshot with the figures it was admitted on
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub snapshot: PairSnapshot,
    pub admission: Admission,
}

impl Candidate {
    pub fn address(&self) -> &str {
        &self.snapshot.address
    }
}

/// Outcome of one dispatch pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Admitted addresses skipped because an alert was already delivered
    pub already_sent: usize,
    /// Delivery attempts made
    pub attempted: usize,
    /// Deliveries acknowledged and durably marked
    pub delivered: usize,
    /// Deliveries that failed; retried next cycle
    pub failed: usize,
    /// Eligible candidates left for a later cycle by the per-cycle cap
    pub deferred: usize,
}

/// Sends at most `max_posts_per_scan` alerts per cycle, spaced apart, marking
/// each address sent only after the notifier acknowledges it.
pub struct Dispatcher {
    max_posts: usize,
    spacing: Duration,
    /// Delivered addresses whose `mark_sent` failed, with their delivery time
    pending_marks: BTreeMap<String, DateTime<Utc>>,
}

impl Dispatcher {
    /// Create a dispatcher from configuration
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            max_posts: config.max_posts_per_scan,
            spacing: config.send_spacing(),
            pending_marks: BTreeMap::new(),
        }
    }

    /// Number of delivered alerts still waiting to be recorded
    pub fn pending_marks(&self) -> usize {
        self.pending_marks.len()
    }

    /// Retry durable marks for alerts that were delivered but not recorded.
    /// Stops at the first failure, leaving the rest pending.
    pub fn flush_pending<S>(&mut self, store: &mut S) -> Result<usize, StoreError>
    where
        S: DedupStore + ?Sized,
    {
        let mut flushed = 0;
        while let Some((address, sent_at)) = self.pending_marks.pop_first() {
            if let Err(e) = store.mark_sent(&address, sent_at) {
                self.pending_marks.insert(address, sent_at);
                return Err(e);
            }
            tracing::info!(address = %address, "Recorded previously unconfirmed delivery");
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Deliver the admitted candidates of one cycle.
    ///
    /// Already-sent addresses are skipped without touching the store. Of the
    /// rest, the most liquid `max_posts` are sent (ties by address); the others
    /// stay unmarked for the next cycle. A storage error aborts the pass.
    pub async fn dispatch<S, N>(
        &mut self,
        admitted: Vec<Candidate>,
        store: &mut S,
        notifier: &N,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport, StoreError>
    where
        S: DedupStore + ?Sized,
        N: Notifier + ?Sized,
    {
        let mut report = DispatchReport::default();

        self.flush_pending(store)?;

        let mut eligible = Vec::new();
        for candidate in dedupe_by_address(admitted) {
            if self.pending_marks.contains_key(candidate.address())
                || store.has_sent(candidate.address())?
            {
                report.already_sent += 1;
                continue;
            }
            store.record_seen(candidate.address(), now)?;
            eligible.push(candidate);
        }

        eligible.sort_by(|a, b| {
            b.admission
                .liquidity
                .total_cmp(&a.admission.liquidity)
                .then_with(|| a.address().cmp(b.address()))
        });

        if eligible.len() > self.max_posts {
            let deferred = eligible.split_off(self.max_posts);
            report.deferred = deferred.len();
            for candidate in &deferred {
                tracing::debug!(
                    address = %candidate.address(),
                    liquidity = candidate.admission.liquidity,
                    "Deferred by per-cycle cap"
                );
            }
        }

        for (i, candidate) in eligible.iter().enumerate() {
            if i > 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }

            let first_seen = store.first_seen(candidate.address())?.unwrap_or(now);
            let called = (now - first_seen).num_minutes();
            let text = alert_message(&candidate.snapshot, &candidate.admission, called);

            report.attempted += 1;
            if let Err(e) = notifier.send(&text).await {
                report.failed += 1;
                tracing::warn!(
                    address = %candidate.address(),
                    symbol = %candidate.snapshot.symbol,
                    error = %e,
                    "Alert delivery failed, will retry next cycle"
                );
                continue;
            }

            let sent_at = Utc::now();
            if let Err(e) = store.mark_sent(candidate.address(), sent_at) {
                tracing::error!(
                    address = %candidate.address(),
                    error = %e,
                    "Alert delivered but not recorded; holding it as pending"
                );
                self.pending_marks
                    .insert(candidate.address().to_string(), sent_at);
                return Err(e);
            }

            report.delivered += 1;
            tracing::info!(
                address = %candidate.address(),
                name = %candidate.snapshot.name,
                symbol = %candidate.snapshot.symbol,
                valuation = candidate.admission.valuation,
                volume_h24 = candidate.admission.volume_h24,
                age_minutes = candidate.admission.age_minutes,
                "Posted alert"
            );
        }

        Ok(report)
    }
}

/// Keep one candidate per address, the one with the most liquidity
fn dedupe_by_address(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        match best.get(candidate.address()) {
            Some(existing) if existing.admission.liquidity >= candidate.admission.liquidity => {}
            _ => {
                best.insert(candidate.address().to_string(), candidate);
            }
        }
    }
    best.into_values().collect()
}
