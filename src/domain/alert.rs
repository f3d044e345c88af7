// Operations alerts synthesized from a fleet snapshot
use super::health::{HealthAssessment, HealthTier};
use super::telemetry::VehicleId;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_tier(tier: HealthTier) -> Self {
        match tier {
            HealthTier::Excellent | HealthTier::Healthy => Severity::Info,
            HealthTier::Monitor => Severity::Warning,
            HealthTier::Critical => Severity::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub id: Uuid,
    pub vehicle_id: VehicleId,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    /// Real SoH when the vehicle had an assessment, otherwise a pseudo value
    pub soh_percent: f64,
    pub timestamp: DateTime<Utc>,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub vehicle_id: VehicleId,
    pub health: HealthAssessment,
}

/// Read-only view of the fleet at the time of a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    pub vehicles: Vec<VehicleSnapshot>,
}

const PSEUDO_SOH_RANGE: std::ops::Range<f64> = 72.0..100.0;

struct Template {
    title: &'static str,
    body: &'static str,
}

const INFO_TEMPLATES: &[Template] = &[
    Template {
        title: "Battery nominal",
        body: "Vehicle {vehicle} is holding {soh}% of its original capacity. No action needed.",
    },
    Template {
        title: "Routine health check passed",
        body: "Monthly check for vehicle {vehicle} complete: SoH {soh}% ({tier}), within expected fade.",
    },
    Template {
        title: "Charging pattern stable",
        body: "Vehicle {vehicle} shows stable charge behaviour at {soh}% SoH.",
    },
];

const WARNING_TEMPLATES: &[Template] = &[
    Template {
        title: "Capacity fade above trend",
        body: "Vehicle {vehicle} is down to {soh}% SoH ({tier}). Schedule a diagnostic at the next service window.",
    },
    Template {
        title: "Thermal stress suspected",
        body: "Vehicle {vehicle} at {soh}% SoH; review recent temperature peaks and fast-charge usage.",
    },
    Template {
        title: "Monitor battery health",
        body: "Vehicle {vehicle} entered the monitor band ({soh}% SoH). Consider lighter duty cycles.",
    },
];

const CRITICAL_TEMPLATES: &[Template] = &[
    Template {
        title: "Battery replacement advised",
        body: "Vehicle {vehicle} has fallen to {soh}% SoH ({tier}). Plan a pack replacement.",
    },
    Template {
        title: "Critical capacity loss",
        body: "Vehicle {vehicle} reports {soh}% SoH; range estimates are no longer reliable.",
    },
];

fn templates(severity: Severity) -> &'static [Template] {
    match severity {
        Severity::Info => INFO_TEMPLATES,
        Severity::Warning => WARNING_TEMPLATES,
        Severity::Critical => CRITICAL_TEMPLATES,
    }
}

/// Pick one vehicle at random and build a templated alert for it.
///
/// All randomness comes from `rng`, so a seeded generator gives repeatable
/// output. Returns `None` for an empty fleet.
pub fn synthesize<R: Rng>(
    snapshot: &FleetSnapshot,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<AlertMessage> {
    let vehicle = snapshot.vehicles.choose(rng)?;

    let soh_percent = match vehicle.health.assessed() {
        Some(assessment) => assessment.percentage,
        None => rng.gen_range(PSEUDO_SOH_RANGE),
    };
    let tier = HealthTier::from_percentage(soh_percent);
    let severity = Severity::from_tier(tier);
    let template = templates(severity).choose(rng)?;

    let mut id_bytes = [0u8; 16];
    rng.fill(&mut id_bytes);

    let soh_text = format!("{soh_percent:.1}");
    let vehicle_text = vehicle.vehicle_id.to_string();

    Some(AlertMessage {
        id: uuid::Builder::from_random_bytes(id_bytes).into_uuid(),
        vehicle_id: vehicle.vehicle_id,
        severity,
        title: template.title.to_string(),
        body: template
            .body
            .replace("{vehicle}", &vehicle_text)
            .replace("{soh}", &soh_text)
            .replace("{tier}", tier.label()),
        soh_percent,
        timestamp: now,
        saved: false,
    })
}

pub fn synthesize_seeded(snapshot: &FleetSnapshot, seed: u64, now: DateTime<Utc>) -> Option<AlertMessage> {
    synthesize(snapshot, &mut StdRng::seed_from_u64(seed), now)
}
