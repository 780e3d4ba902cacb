use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::admission::MixAdmission;
use crate::error::{MixError, Result};
use crate::mixer::{MixKind, Mixer};
use crate::types::{DataMix, WeightedMix};

/// Runs mixing jobs against a [`Mixer`].
///
/// Before a job reaches the mixer:
/// 1. every model given as an absolute path must exist on disk,
/// 2. the job must be admitted by [`MixAdmission`].
///
/// When a timeout is configured the mixer future is dropped at the deadline.
pub struct MixService {
    mixer: Arc<dyn Mixer>,
    admission: MixAdmission,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for MixService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixService")
            .field("mixer", &self.mixer.name())
            .field("admission", &self.admission)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MixService {
    pub fn new(mixer: Arc<dyn Mixer>, admission: MixAdmission) -> Self {
        Self {
            mixer,
            admission,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mixer_name(&self) -> &str {
        self.mixer.name()
    }

    pub fn admission(&self) -> &MixAdmission {
        &self.admission
    }

    pub async fn mix(&self, job: &WeightedMix) -> Result<()> {
        self.run(
            MixKind::Uniform,
            job.models(),
            job.output_path(),
            self.mixer.mix(job),
        )
        .await
    }

    pub async fn mix_by_layers(&self, job: &WeightedMix) -> Result<()> {
        self.run(
            MixKind::ByLayers,
            job.models(),
            job.output_path(),
            self.mixer.mix_by_layers(job),
        )
        .await
    }

    pub async fn mix_with_data(&self, job: &DataMix) -> Result<()> {
        self.run(
            MixKind::WithData,
            job.models(),
            job.output_path(),
            self.mixer.mix_with_data(job),
        )
        .await
    }

    async fn run<F>(&self, kind: MixKind, models: &[String], output_path: &Path, call: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        ensure_local_models_exist(models).await?;
        let _permit = self.admission.try_acquire(output_path)?;

        let started = Instant::now();
        info!(
            operation = %kind,
            mixer = self.mixer.name(),
            models = models.len(),
            output_path = %output_path.display(),
            "mix started"
        );

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(MixError::Timeout(limit))),
            None => call.await,
        };

        let elapsed_ms = started.elapsed().as_millis();
        match &outcome {
            Ok(()) => info!(operation = %kind, elapsed_ms, "mix finished"),
            Err(e) => warn!(operation = %kind, elapsed_ms, error = %e, "mix failed"),
        }
        outcome
    }
}

/// Identifiers that are absolute paths name local checkpoints and must
/// exist; anything else is left for the library to resolve (hub names).
async fn ensure_local_models_exist(models: &[String]) -> Result<()> {
    for model in models {
        let path = Path::new(model);
        if path.is_absolute() && !tokio::fs::try_exists(path).await? {
            return Err(MixError::ModelNotFound(model.clone()));
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{ExampleSet, GenerativeExample, ModelFamily};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct StubMixer {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        hang: bool,
        fail: Option<&'static str>,
    }

    impl StubMixer {
        async fn call(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            match self.fail {
                Some(message) => Err(MixError::Backend(message.into())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Mixer for StubMixer {
        fn name(&self) -> &str {
            "stub"
        }

        async fn mix(&self, _job: &WeightedMix) -> Result<()> {
            self.call().await
        }

        async fn mix_by_layers(&self, _job: &WeightedMix) -> Result<()> {
            self.call().await
        }

        async fn mix_with_data(&self, _job: &DataMix) -> Result<()> {
            self.call().await
        }
    }

    fn job(models: &[&str], output: &str) -> WeightedMix {
        WeightedMix::new(
            models.iter().map(|m| m.to_string()).collect(),
            ModelFamily::Decoder,
            vec![1.0; models.len()],
            output,
        )
        .unwrap()
    }

    fn service(mixer: StubMixer, capacity: usize) -> (Arc<StubMixer>, Arc<MixService>) {
        let mixer = Arc::new(mixer);
        let service = MixService::new(mixer.clone(), MixAdmission::new(capacity));
        (mixer, Arc::new(service))
    }

    async fn wait_for_in_flight(service: &MixService, n: usize) {
        while service.admission().in_flight() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn successful_mix_reaches_mixer() {
        let (mixer, service) = service(StubMixer::default(), 1);
        service.mix(&job(&["A", "B"], "/tmp/out")).await.unwrap();
        assert_eq!(mixer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.admission().in_flight(), 0);
        assert!(logs_contain("mix started"));
        assert!(logs_contain("mix finished"));
    }

    #[tokio::test]
    async fn backend_failure_is_passed_through() {
        let stub = StubMixer {
            fail: Some("model A has no lm_head"),
            ..Default::default()
        };
        let (_, service) = service(stub, 1);
        let err = service
            .mix_by_layers(&job(&["A"], "/tmp/out"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model A has no lm_head");
        assert_eq!(service.admission().in_flight(), 0);
    }

    #[tokio::test]
    async fn missing_local_model_is_not_found() {
        let (mixer, service) = service(StubMixer::default(), 1);
        let missing = format!("/nonexistent/{}", uuid::Uuid::new_v4());
        let err = service
            .mix(&job(&["BAAI/bge-base-en-v1.5", missing.as_str()], "/tmp/out"))
            .await
            .unwrap_err();
        assert!(matches!(err, MixError::ModelNotFound(ref m) if *m == missing));
        assert_eq!(mixer.calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_model_path_is_io_error() {
        let (mixer, service) = service(StubMixer::default(), 1);
        let file = std::env::temp_dir().join(format!("cocktail-{}", uuid::Uuid::new_v4()));
        std::fs::write(&file, b"not a directory").unwrap();
        let below_file = file.join("config.json").to_string_lossy().into_owned();

        let err = service
            .mix(&job(&[below_file.as_str()], "/tmp/out"))
            .await
            .unwrap_err();
        std::fs::remove_file(&file).unwrap();

        assert!(matches!(err, MixError::Io(_)), "got {err:?}");
        assert_eq!(mixer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_local_model_is_accepted() {
        let (_, service) = service(StubMixer::default(), 1);
        let dir = std::env::temp_dir().to_string_lossy().into_owned();
        assert!(service.mix(&job(&[dir.as_str()], "/tmp/out")).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_mixes_are_admitted_or_refused() {
        let gate = Arc::new(Notify::new());
        let stub = StubMixer {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let (mixer, service) = service(stub, 1);

        let running = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.mix(&job(&["A"], "/tmp/shared")).await })
        };
        wait_for_in_flight(&service, 1).await;

        let same_path = service.mix(&job(&["B"], "/tmp/shared")).await.unwrap_err();
        assert!(matches!(same_path, MixError::OutputInUse(_)));

        let other_path = service.mix(&job(&["B"], "/tmp/other")).await.unwrap_err();
        assert!(matches!(other_path, MixError::Busy { capacity: 1 }));

        gate.notify_one();
        running.await.unwrap().unwrap();
        assert_eq!(mixer.calls.load(Ordering::SeqCst), 1);
        assert!(service.mix(&job(&["B"], "/tmp/shared")).await.is_ok());
    }

    #[tokio::test]
    async fn slow_mix_times_out_and_releases_permit() {
        let mixer = Arc::new(StubMixer {
            hang: true,
            ..Default::default()
        });
        let limit = Duration::from_millis(50);
        let service =
            MixService::new(mixer, MixAdmission::new(1)).with_timeout(Some(limit));

        let data = DataMix::new(
            vec!["A".into()],
            5.0,
            ExampleSet::Generative(vec![GenerativeExample {
                input: "i".into(),
                output: "o".into(),
            }]),
            "/tmp/out",
        )
        .unwrap();
        let err = service.mix_with_data(&data).await.unwrap_err();
        assert!(matches!(err, MixError::Timeout(d) if d == limit));
        assert_eq!(service.admission().in_flight(), 0);
    }
}
