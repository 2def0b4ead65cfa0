//! Model Registry (A3): process-wide handles to the four external model
//! collaborators, each serialised behind its own `tokio::sync::Mutex` so two
//! in-flight requests never drive the same (typically GPU-bound) model
//! concurrently. `tokio::sync::Mutex` rather than `parking_lot`, since
//! acquisition here spans an `.await`.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use videogen_core::{CoefficientModel, RenderModel, ScriptModel, TtsModel};

/// RAII guard released on drop, granting exclusive use of one model handle
/// for the lifetime of the borrow.
pub struct ModelHandle<'a, T: ?Sized> {
    model: Arc<T>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a, T: ?Sized> std::ops::Deref for ModelHandle<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.model
    }
}

/// Process-wide model cache. Constructed once at server startup and shared
/// across requests via `Arc`; acquisition is scoped per call so a slow
/// render doesn't hold locks for the other three models.
pub struct ModelRegistry {
    script_model: Arc<dyn ScriptModel>,
    script_lock: Mutex<()>,

    tts_model: Arc<dyn TtsModel>,
    tts_lock: Mutex<()>,

    coeff_model: Arc<dyn CoefficientModel>,
    coeff_lock: Mutex<()>,

    render_model: Arc<dyn RenderModel>,
    render_lock: Mutex<()>,
}

impl ModelRegistry {
    pub fn new(
        script_model: Arc<dyn ScriptModel>,
        tts_model: Arc<dyn TtsModel>,
        coeff_model: Arc<dyn CoefficientModel>,
        render_model: Arc<dyn RenderModel>,
    ) -> Self {
        Self {
            script_model,
            script_lock: Mutex::new(()),
            tts_model,
            tts_lock: Mutex::new(()),
            coeff_model,
            coeff_lock: Mutex::new(()),
            render_model,
            render_lock: Mutex::new(()),
        }
    }

    pub async fn script(&self) -> ModelHandle<'_, dyn ScriptModel> {
        ModelHandle {
            model: self.script_model.clone(),
            _guard: self.script_lock.lock().await,
        }
    }

    /// A raw handle to the script model, bypassing the per-model mutex.
    /// Used to build a `ScriptClient` once at startup; the client's own
    /// calls are still serialised through [`Self::script`] by the
    /// orchestrator.
    pub fn script_model(&self) -> Arc<dyn ScriptModel> {
        self.script_model.clone()
    }

    pub async fn tts(&self) -> ModelHandle<'_, dyn TtsModel> {
        ModelHandle {
            model: self.tts_model.clone(),
            _guard: self.tts_lock.lock().await,
        }
    }

    pub async fn coeff(&self) -> ModelHandle<'_, dyn CoefficientModel> {
        ModelHandle {
            model: self.coeff_model.clone(),
            _guard: self.coeff_lock.lock().await,
        }
    }

    pub async fn render(&self) -> ModelHandle<'_, dyn RenderModel> {
        ModelHandle {
            model: self.render_model.clone(),
            _guard: self.render_lock.lock().await,
        }
    }
}
