//! Model Lifecycle Manager
//! Mission: Load the generator exactly once and report its readiness

use crate::generation::generator::{Generator, GeneratorError, GeneratorLoader};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Observable lifecycle state, reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed(_) => "failed",
        }
    }
}

/// Guards the single process-wide generator.
///
/// The load slot is a tokio Mutex held across the entire load, so concurrent
/// first callers queue behind the in-flight load and observe its outcome
/// instead of starting their own. A failed load is sticky: every later call
/// re-raises the recorded error rather than hammering a broken dependency.
pub struct ModelManager {
    loader: Arc<dyn GeneratorLoader>,
    slot: Mutex<Option<Result<Arc<dyn Generator>, String>>>,
    state: RwLock<ModelState>,
}

impl ModelManager {
    pub fn new(loader: Arc<dyn GeneratorLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            state: RwLock::new(ModelState::Uninitialized),
        }
    }

    /// Get the ready generator, loading it on first use.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn Generator>, GeneratorError> {
        let mut slot = self.slot.lock().await;

        if let Some(outcome) = slot.as_ref() {
            return match outcome {
                Ok(generator) => Ok(generator.clone()),
                Err(recorded) => Err(GeneratorError::Load(recorded.clone())),
            };
        }

        *self.state.write() = ModelState::Loading;
        match self.loader.load().await {
            Ok(generator) => {
                *self.state.write() = ModelState::Ready;
                *slot = Some(Ok(generator.clone()));
                info!("Model lifecycle: loading -> ready");
                Ok(generator)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Model lifecycle: loading -> failed: {}", message);
                *self.state.write() = ModelState::Failed(message.clone());
                *slot = Some(Err(message.clone()));
                Err(GeneratorError::Load(message))
            }
        }
    }

    pub fn state(&self) -> ModelState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::generator::{GeneratedText, GenerationParams};
    use crate::generation::schemas::FinishReason;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubGenerator;

    #[async_trait]
    impl Generator for StubGenerator {
        fn model_id(&self) -> &str {
            "stub"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<GeneratedText, GeneratorError> {
            Ok(GeneratedText {
                text: "ok".to_string(),
                prompt_tokens: 1,
                completion_tokens: 1,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct CountingLoader {
        loads: AtomicU32,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl GeneratorLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn Generator>, GeneratorError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent callers pile up on the load slot.
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if self.fail {
                Err(GeneratorError::Load("cache corrupted".to_string()))
            } else {
                Ok(Arc::new(StubGenerator))
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let loader = CountingLoader::new(false);
        let manager = Arc::new(ModelManager::new(loader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = manager.clone();
            handles.push(tokio::spawn(async move { m.ensure_ready().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_failed_load_is_sticky() {
        let loader = CountingLoader::new(true);
        let manager = ModelManager::new(loader.clone());

        assert!(manager.ensure_ready().await.is_err());
        assert!(manager.ensure_ready().await.is_err());

        // Second call re-raises the recorded failure without reloading
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(matches!(manager.state(), ModelState::Failed(_)));
    }

    #[tokio::test]
    async fn test_ready_state_transitions() {
        let manager = ModelManager::new(CountingLoader::new(false));
        assert_eq!(manager.state(), ModelState::Uninitialized);

        manager.ensure_ready().await.unwrap();
        assert_eq!(manager.state(), ModelState::Ready);
        assert_eq!(manager.state().as_str(), "ready");
    }
}
