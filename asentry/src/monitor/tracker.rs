/*!
Coordinator for a single check of the Sentry table
*/

use tracing::{debug, info, warn};

use crate::monitor::{
    config::TrackerConfig,
    detection_engine::DetectionEngine,
    error::AsentryError,
    fetcher::ThreatSource,
    output_plugins::OutputManager,
    sound::AlertSound,
    state_manager::StateManager,
};

/// Exit code for runs that ended in an [`AsentryError`]
pub const ERROR_EXIT_CODE: u8 = 2;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing new or increased
    Clean,
    /// At least one new or increased threat was reported
    ThreatsFound,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Clean => 0,
            RunOutcome::ThreatsFound => 1,
        }
    }
}

/// Main tracker that coordinates all components
pub struct ThreatTracker {
    source: Box<dyn ThreatSource>,
    state_manager: StateManager,
    detection_engine: DetectionEngine,
    output_manager: OutputManager,
    sound: AlertSound,
}

impl ThreatTracker {
    /// Create a tracker from configuration and a data source
    pub fn new(config: &TrackerConfig, source: Box<dyn ThreatSource>) -> Result<Self, AsentryError> {
        let state_manager = StateManager::new(config.snapshot_path()?);
        let detection_engine = DetectionEngine::new(&config.source)?;
        let output_manager = OutputManager::new(&config.outputs);
        let sound = AlertSound::new(config.sound_path(), config.alert.player.clone());

        Ok(Self::from_parts(
            source,
            state_manager,
            detection_engine,
            output_manager,
            sound,
        ))
    }

    pub fn from_parts(
        source: Box<dyn ThreatSource>,
        state_manager: StateManager,
        detection_engine: DetectionEngine,
        output_manager: OutputManager,
        sound: AlertSound,
    ) -> Self {
        Self {
            source,
            state_manager,
            detection_engine,
            output_manager,
            sound,
        }
    }

    /// Load, fetch, compare, save, report.
    ///
    /// The snapshot is only replaced after a successful fetch, and it is
    /// replaced whether or not anything changed.
    pub async fn run(&mut self) -> Result<RunOutcome, AsentryError> {
        info!("Snapshot: {:?}", self.state_manager.path());
        let previous = self.state_manager.load();
        info!("{} objects known from the previous run", previous.len());

        let current = self.source.fetch().await?;
        info!("Fetched {} objects from {}", current.len(), self.source.name());

        let comparison = self.detection_engine.compare(&previous, &current);
        if !comparison.dropped.is_empty() {
            info!("No longer listed: {}", comparison.dropped.join(", "));
        }

        self.state_manager.save(&current)?;

        self.output_manager.initialize().await;
        debug!("{} outputs ready", self.output_manager.len());
        let outcome = if comparison.any_change {
            warn!("{} new or increased threats", comparison.alerts.len());
            self.output_manager.announce(&comparison.alerts).await;
            if self.sound.play().await {
                info!("Played alert sound");
            }
            RunOutcome::ThreatsFound
        } else {
            info!("No new threats");
            self.output_manager.report_clear().await;
            RunOutcome::Clean
        };
        self.output_manager.finalize().await;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sentry_data::{DataError, TrackedObject};

    use super::*;
    use crate::monitor::{
        config::SourceConfig, detection_engine::ThreatAlert, output_plugins::OutputHandler,
    };

    enum Fixed {
        Objects(Vec<TrackedObject>),
        WrongVersion,
    }

    struct FixedSource(Fixed);

    #[async_trait]
    impl ThreatSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self) -> Result<Vec<TrackedObject>, AsentryError> {
            match &self.0 {
                Fixed::Objects(objects) => Ok(objects.clone()),
                Fixed::WrongVersion => Err(AsentryError::Format(DataError::UnexpectedVersion {
                    found: "1.0".into(),
                    expected: "2.0".into(),
                })),
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutputHandler for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn initialize(&mut self) -> Result<(), AsentryError> {
            Ok(())
        }

        async fn handle_alert(&mut self, alert: &ThreatAlert) -> Result<(), AsentryError> {
            self.0
                .lock()
                .unwrap()
                .push(format!("{:?} {}", alert.kind, alert.id));
            Ok(())
        }

        async fn report_clear(&mut self) -> Result<(), AsentryError> {
            self.0.lock().unwrap().push("No new threats".to_string());
            Ok(())
        }
    }

    fn object(id: &str, ps_cum: &str, ts_max: Option<&str>) -> TrackedObject {
        serde_json::from_value(serde_json::json!({
            "id": id, "fullname": format!("({id})"), "des": id,
            "range": "2100-2110", "ps_cum": ps_cum, "ts_max": ts_max,
        }))
        .unwrap()
    }

    fn tracker(snapshot: &Path, source: Fixed, recorder: &Recorder) -> ThreatTracker {
        ThreatTracker::from_parts(
            Box::new(FixedSource(source)),
            StateManager::new(snapshot.to_path_buf()),
            DetectionEngine::new(&SourceConfig::default()).unwrap(),
            OutputManager::with_handlers(vec![Box::new(recorder.clone())]),
            AlertSound::disabled(),
        )
    }

    fn seed(snapshot: &Path, objects: &[TrackedObject]) {
        StateManager::new(snapshot.to_path_buf()).save(objects).unwrap();
    }

    #[tokio::test]
    async fn first_run_reports_new_threat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        let recorder = Recorder::default();

        let current = vec![object("a", "-1.55", None)];
        let outcome = tracker(&path, Fixed::Objects(current), &recorder)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::ThreatsFound);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(recorder.events(), ["New a"]);
        assert!(StateManager::new(path).load().contains("a"));
    }

    #[tokio::test]
    async fn unchanged_data_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        seed(&path, &[object("a", "-1.55", None)]);
        let recorder = Recorder::default();

        let outcome = tracker(&path, Fixed::Objects(vec![object("a", "-1.55", None)]), &recorder)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Clean);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(recorder.events(), ["No new threats"]);
    }

    #[tokio::test]
    async fn torino_increase_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        seed(&path, &[object("a", "-1.80", Some("1"))]);
        let recorder = Recorder::default();

        let outcome = tracker(
            &path,
            Fixed::Objects(vec![object("a", "-1.80", Some("2"))]),
            &recorder,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(recorder.events(), ["Increased a"]);
    }

    #[tokio::test]
    async fn second_run_uses_first_run_as_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        let objects = vec![object("a", "-1.55", None), object("b", "-2.00", Some("0"))];

        let first = Recorder::default();
        tracker(&path, Fixed::Objects(objects.clone()), &first)
            .run()
            .await
            .unwrap();
        let second = Recorder::default();
        let outcome = tracker(&path, Fixed::Objects(objects), &second)
            .run()
            .await
            .unwrap();

        assert_eq!(first.events(), ["New a", "New b"]);
        assert_eq!(outcome, RunOutcome::Clean);
    }

    #[tokio::test]
    async fn format_error_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        seed(&path, &[object("a", "-1.55", None)]);
        let before = std::fs::read(&path).unwrap();
        let recorder = Recorder::default();

        let err = tracker(&path, Fixed::WrongVersion, &recorder)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, AsentryError::Format(_)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn save_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let recorder = Recorder::default();

        let err = tracker(
            &blocker.join(".asentry"),
            Fixed::Objects(vec![object("a", "-1.55", None)]),
            &recorder,
        )
        .run()
        .await
        .unwrap_err();

        assert!(matches!(err, AsentryError::Persistence { .. }));
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_treats_everything_as_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".asentry");
        std::fs::write(&path, "garbage").unwrap();
        let recorder = Recorder::default();

        let outcome = tracker(&path, Fixed::Objects(vec![object("a", "-1.55", None)]), &recorder)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::ThreatsFound);
        assert!(StateManager::new(path).load().contains("a"));
    }
}
