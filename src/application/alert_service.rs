// Alert service - bounded in-memory operations feed
use crate::application::fleet_service::{FleetError, FleetService};
use crate::application::operator_context::OperatorContext;
use crate::domain::alert::{self, AlertMessage};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Rolling buffer of recent alerts; the oldest entry is evicted on overflow
#[derive(Debug)]
pub struct AlertFeed {
    capacity: usize,
    entries: VecDeque<AlertMessage>,
}

impl AlertFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the evicted alert, if the feed was full
    pub fn push(&mut self, alert: AlertMessage) -> Option<AlertMessage> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(alert);
        evicted
    }

    /// Newest first
    pub fn list(&self) -> Vec<AlertMessage> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn delete(&mut self, id: Uuid) -> bool {
        match self.entries.iter().position(|a| a.id == id) {
            Some(idx) => self.entries.remove(idx).is_some(),
            None => false,
        }
    }

    /// Flip the saved flag, returning its new value
    pub fn toggle_saved(&mut self, id: Uuid) -> Option<bool> {
        let alert = self.entries.iter_mut().find(|a| a.id == id)?;
        alert.saved = !alert.saved;
        Some(alert.saved)
    }
}

#[derive(Clone)]
pub struct AlertService {
    fleet: FleetService,
    feed: Arc<Mutex<AlertFeed>>,
    rng: Arc<Mutex<StdRng>>,
}

impl AlertService {
    /// `seed` fixes the alert sequence; without one the generator is seeded
    /// from OS entropy.
    pub fn new(fleet: FleetService, capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            fleet,
            feed: Arc::new(Mutex::new(AlertFeed::new(capacity))),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Synthesize one alert from the current fleet and add it to the feed
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<AlertMessage>, FleetError> {
        let snapshot = self.fleet.snapshot().await?;

        // Per-tick seed, logged with the alert
        let seed = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next_u64();
        let alert = alert::synthesize_seeded(&snapshot, seed, now);

        if let Some(alert) = &alert {
            let mut feed = self.feed();
            feed.push(alert.clone());
            tracing::debug!(
                alert_id = %alert.id,
                seed,
                vehicle_id = alert.vehicle_id,
                severity = ?alert.severity,
                feed_len = feed.len(),
                "alert synthesized"
            );
        }
        Ok(alert)
    }

    pub fn list(&self) -> Vec<AlertMessage> {
        self.feed().list()
    }

    pub fn delete(&self, ctx: &OperatorContext, id: Uuid) -> bool {
        let removed = self.feed().delete(id);
        tracing::info!(operator = ctx.actor(), alert_id = %id, removed, "alert delete");
        removed
    }

    pub fn toggle_saved(&self, ctx: &OperatorContext, id: Uuid) -> Option<bool> {
        let saved = self.feed().toggle_saved(id);
        tracing::info!(operator = ctx.actor(), alert_id = %id, saved = ?saved, "alert saved toggle");
        saved
    }

    fn feed(&self) -> std::sync::MutexGuard<'_, AlertFeed> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
