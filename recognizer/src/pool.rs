//! Bounded pool of engines for concurrent callers.
//!
//! An [`Engine`] serves one call at a time. The pool holds several engines
//! and lends each to one caller at a time, so concurrent calls never share a
//! buffer set. Throughput scales with the pool size, and so does memory: each
//! engine carries its own session and buffers. Callers beyond the pool size
//! wait for an engine to come back.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use image::DynamicImage;
use lens_onnx::Runtime;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::engine::Engine;
use crate::error::{EngineError, PredictError};

struct PoolState<R: Runtime> {
    idle: Vec<Engine<R>>,
    closed: bool,
}

/// Lends engines to one caller at a time.
pub struct EnginePool<R: Runtime> {
    state: Mutex<PoolState<R>>,
    returned: Condvar,
    size: usize,
}

impl<R: Runtime> EnginePool<R> {
    /// Creates a pool from ready engines. An empty list is rejected, since
    /// no caller could ever acquire from it.
    pub fn from_engines(engines: Vec<Engine<R>>) -> Result<Self, EngineError> {
        if engines.is_empty() {
            return Err(EngineError::EmptyPool);
        }
        let size = engines.len();
        Ok(Self {
            state: Mutex::new(PoolState {
                idle: engines,
                closed: false,
            }),
            returned: Condvar::new(),
            size,
        })
    }

    /// Creates `size` engines (at least one) with `factory`.
    ///
    /// If any engine fails to build, the ones already built are released and
    /// the error is returned.
    pub fn build<F>(size: usize, mut factory: F) -> Result<Self, EngineError>
    where
        F: FnMut() -> Result<Engine<R>, EngineError>,
    {
        let size = size.max(1);
        let engines = (0..size)
            .map(|_| factory())
            .collect::<Result<Vec<_>, _>>()?;
        debug!(size, "engine pool ready");
        Self::from_engines(engines)
    }

    /// Number of engines the pool was created with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of engines currently idle.
    pub fn available(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Takes an engine, waiting until one is idle.
    pub fn acquire(&self) -> Result<PooledEngine<'_, R>, PredictError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PredictError::Released);
            }
            if let Some(engine) = state.idle.pop() {
                return Ok(self.lend(engine));
            }
            self.returned.wait(&mut state);
        }
    }

    /// Takes an engine, waiting at most `timeout`. Returns `Ok(None)` when
    /// none became idle in time. A timeout too large to form a deadline
    /// waits like [`acquire`](Self::acquire).
    pub fn try_acquire_for(
        &self,
        timeout: Duration,
    ) -> Result<Option<PooledEngine<'_, R>>, PredictError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.acquire().map(Some);
        };
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PredictError::Released);
            }
            if let Some(engine) = state.idle.pop() {
                return Ok(Some(self.lend(engine)));
            }
            if self.returned.wait_until(&mut state, deadline).timed_out() && state.idle.is_empty()
            {
                return Ok(None);
            }
        }
    }

    /// Classifies encoded image bytes on the next idle engine.
    pub fn predict_from_bytes(&self, raw: &[u8]) -> Result<String, PredictError> {
        self.acquire()?.predict_from_bytes(raw)
    }

    /// Classifies a decoded image on the next idle engine.
    pub fn predict_from_image(&self, image: &DynamicImage) -> Result<String, PredictError> {
        self.acquire()?.predict_from_image(image)
    }

    /// Releases idle engines and rejects later acquires. Engines still lent
    /// out are released when they come back.
    pub fn close(&self) {
        let idle = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.idle)
        };
        drop(idle);
        self.returned.notify_all();
        debug!("engine pool closed");
    }

    fn lend(&self, engine: Engine<R>) -> PooledEngine<'_, R> {
        PooledEngine {
            pool: self,
            engine: Some(engine),
        }
    }

    fn give_back(&self, engine: Engine<R>) {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            drop(engine);
            return;
        }
        state.idle.push(engine);
        drop(state);
        self.returned.notify_one();
    }
}

impl<R: Runtime> std::fmt::Debug for EnginePool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("size", &self.size)
            .field("available", &self.available())
            .finish()
    }
}

/// An engine borrowed from an [`EnginePool`]. Returned on drop.
pub struct PooledEngine<'a, R: Runtime> {
    pool: &'a EnginePool<R>,
    engine: Option<Engine<R>>,
}

impl<R: Runtime> Deref for PooledEngine<'_, R> {
    type Target = Engine<R>;

    fn deref(&self) -> &Engine<R> {
        match &self.engine {
            Some(engine) => engine,
            None => unreachable!("pooled engine taken before drop"),
        }
    }
}

impl<R: Runtime> DerefMut for PooledEngine<'_, R> {
    fn deref_mut(&mut self) -> &mut Engine<R> {
        match &mut self.engine {
            Some(engine) => engine,
            None => unreachable!("pooled engine taken before drop"),
        }
    }
}

impl<R: Runtime> Drop for PooledEngine<'_, R> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.give_back(engine);
        }
    }
}
