/*!
Rule-based detection of new and escalated impact threats
*/

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::Url;
use sentry_data::{SavedObject, Score, Snapshot, TrackedObject};
use serde::Serialize;
use tracing::debug;

use crate::monitor::{config::SourceConfig, error::AsentryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreatKind {
    /// Not in the previous snapshot
    New,
    /// Present before, with a strictly higher risk now
    Increased,
}

/// Which metric went up for an [`ThreatKind::Increased`] threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Escalation {
    PalermoIncrease,
    /// Torino went from unrated to rated
    TorinoRated,
    TorinoIncrease,
}

/// Trait for threat detection rules
pub trait ThreatDetector: Send + Sync {
    /// Name of the detector
    fn name(&self) -> &'static str;

    /// Decide whether `current` is a threat worth reporting given what was
    /// known about it before.
    fn detect(&self, current: &TrackedObject, previous: Option<&SavedObject>) -> Option<Detection>;
}

/// Result of a single detector match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub kind: ThreatKind,
    pub escalation: Option<Escalation>,
}

/// An object that should be brought to the user's attention.
#[derive(Debug, Clone, Serialize)]
pub struct ThreatAlert {
    pub kind: ThreatKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
    pub id: String,
    pub name: String,
    pub designation: String,
    pub impact_range: String,
    pub ps_cum: Score,
    pub ts_max: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_ps_cum: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_ts_max: Option<Score>,
    pub details_url: String,
    pub detected_at: DateTime<Utc>,
}

/// Outcome of comparing a fetch against the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Alerts in fetch order
    pub alerts: Vec<ThreatAlert>,
    /// True iff at least one alert was produced
    pub any_change: bool,
    /// Previously tracked ids absent from this fetch, sorted
    pub dropped: Vec<String>,
}

/// Reports objects absent from the previous snapshot.
pub struct NewObjectDetector;

impl ThreatDetector for NewObjectDetector {
    fn name(&self) -> &'static str {
        "new-object"
    }

    fn detect(&self, _current: &TrackedObject, previous: Option<&SavedObject>) -> Option<Detection> {
        previous.is_none().then_some(Detection {
            kind: ThreatKind::New,
            escalation: None,
        })
    }
}

/// Reports a strictly higher cumulative Palermo Scale.
pub struct PalermoIncreaseDetector;

impl ThreatDetector for PalermoIncreaseDetector {
    fn name(&self) -> &'static str {
        "palermo-increase"
    }

    fn detect(&self, current: &TrackedObject, previous: Option<&SavedObject>) -> Option<Detection> {
        let previous = previous?;
        (current.ps_cum.value() > previous.ps_cum.value()).then_some(Detection {
            kind: ThreatKind::Increased,
            escalation: Some(Escalation::PalermoIncrease),
        })
    }
}

/// Reports a Torino rating appearing or rising.
pub struct TorinoIncreaseDetector;

impl ThreatDetector for TorinoIncreaseDetector {
    fn name(&self) -> &'static str {
        "torino-increase"
    }

    fn detect(&self, current: &TrackedObject, previous: Option<&SavedObject>) -> Option<Detection> {
        let previous = previous?;
        let escalation = match (&current.ts_max, &previous.ts_max) {
            (Some(_), None) => Escalation::TorinoRated,
            (Some(now), Some(before)) if now.value() > before.value() => Escalation::TorinoIncrease,
            _ => return None,
        };
        Some(Detection {
            kind: ThreatKind::Increased,
            escalation: Some(escalation),
        })
    }
}

/// Runs every detector over a fetch and builds alerts.
pub struct DetectionEngine {
    detectors: Vec<Box<dyn ThreatDetector>>,
    details_base: Url,
}

impl DetectionEngine {
    pub fn new(config: &SourceConfig) -> Result<Self, AsentryError> {
        let details_base = Url::parse(&config.details_url).map_err(|e| {
            AsentryError::Config(format!("invalid details_url {:?}: {}", config.details_url, e))
        })?;

        let detectors: Vec<Box<dyn ThreatDetector>> = vec![
            Box::new(NewObjectDetector),
            Box::new(PalermoIncreaseDetector),
            Box::new(TorinoIncreaseDetector),
        ];

        debug!("Initialized detection engine with {} detectors", detectors.len());
        Ok(Self {
            detectors,
            details_base,
        })
    }

    /// Compare the current fetch with the previous snapshot.
    ///
    /// Objects that vanished from the fetch are listed in
    /// [`Comparison::dropped`] but never alert.
    pub fn compare(&self, previous: &Snapshot, current: &[TrackedObject]) -> Comparison {
        let detected_at = Utc::now();
        let mut alerts = Vec::new();

        for object in current {
            let saved = previous.get(&object.id);

            // The first matching detector decides; one alert per object.
            let detection = self.detectors.iter().find_map(|detector| {
                let detection = detector.detect(object, saved)?;
                debug!("{} matched {}", detector.name(), object.id);
                Some(detection)
            });

            match detection {
                Some(detection) => {
                    alerts.push(self.build_alert(object, saved, detection, detected_at));
                }
                None => debug!("No change for {}", object.id),
            }
        }

        let current_ids: HashSet<&str> = current.iter().map(|o| o.id.as_str()).collect();
        let mut dropped: Vec<String> = previous
            .iter()
            .filter(|saved| !current_ids.contains(saved.id.as_str()))
            .map(|saved| saved.id.clone())
            .collect();
        dropped.sort();

        Comparison {
            any_change: !alerts.is_empty(),
            alerts,
            dropped,
        }
    }

    fn build_alert(
        &self,
        object: &TrackedObject,
        saved: Option<&SavedObject>,
        detection: Detection,
        detected_at: DateTime<Utc>,
    ) -> ThreatAlert {
        ThreatAlert {
            kind: detection.kind,
            escalation: detection.escalation,
            id: object.id.clone(),
            name: object.display_name().to_string(),
            designation: object.des.clone(),
            impact_range: object.range.clone(),
            ps_cum: object.ps_cum.clone(),
            ts_max: object.ts_max.clone(),
            previous_ps_cum: saved.map(|s| s.ps_cum.clone()),
            previous_ts_max: saved.and_then(|s| s.ts_max.clone()),
            details_url: self.details_link(&object.des),
            detected_at,
        }
    }

    /// `<details page>#?des=<designation>`
    pub fn details_link(&self, designation: &str) -> String {
        let mut url = self.details_base.clone();
        url.set_fragment(Some(&format!("?des={}", designation)));
        url.to_string()
    }
}
