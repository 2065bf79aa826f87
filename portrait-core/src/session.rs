//! Background enhancement runs with cancellation by supersession.
//!
//! Every `submit` bumps a generation counter. A run checks the counter between
//! stages and stops once a newer run (or an explicit `cancel`) has replaced
//! it, so only the latest request ever delivers an image.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
    mpsc::Sender,
};

use log::debug;
use portrait_utils::EnhanceSettings;

use crate::error::{EnhanceError, Result};
use crate::pipeline::{EnhanceOutcome, EnhanceStatus, PortraitEnhancer};
use crate::types::PixelImage;

/// Lets a running pipeline notice it has been superseded.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: Arc<AtomicU64>,
    job_id: u64,
}

impl CancelToken {
    /// A token that is never cancelled, for synchronous callers.
    pub fn never() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            job_id: 0,
        }
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.job_id
    }

    /// `Err(Cancelled)` once the run has been superseded.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EnhanceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a background run sends back when it ends.
#[derive(Debug)]
pub enum SessionMessage {
    Finished { job_id: u64, outcome: EnhanceOutcome },
    /// The run was superseded; its partial work was discarded.
    Cancelled { job_id: u64 },
}

impl SessionMessage {
    pub fn job_id(&self) -> u64 {
        match self {
            SessionMessage::Finished { job_id, .. } | SessionMessage::Cancelled { job_id } => {
                *job_id
            }
        }
    }
}

/// Runs enhancements on the rayon pool, one live request at a time.
#[derive(Debug, Clone)]
pub struct EnhancementSession {
    enhancer: Arc<PortraitEnhancer>,
    generation: Arc<AtomicU64>,
}

impl EnhancementSession {
    pub fn new(enhancer: Arc<PortraitEnhancer>) -> Self {
        Self {
            enhancer,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a run in the background, cancelling any run still in flight.
    ///
    /// Returns the new job id. Exactly one [`SessionMessage`] for that id is
    /// sent on `sender`, unless the receiver has gone away.
    pub fn submit(
        &self,
        image: PixelImage,
        settings: EnhanceSettings,
        sender: Sender<SessionMessage>,
    ) -> u64 {
        let job_id = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancelToken {
            generation: Arc::clone(&self.generation),
            job_id,
        };
        let enhancer = Arc::clone(&self.enhancer);
        debug!("enhancement job {job_id} submitted");

        rayon::spawn(move || {
            let outcome = enhancer.run(&image, &settings, &token, false);
            let message = if matches!(outcome.status, EnhanceStatus::Cancelled) || token.is_cancelled()
            {
                debug!("enhancement job {job_id} cancelled");
                SessionMessage::Cancelled { job_id }
            } else {
                SessionMessage::Finished { job_id, outcome }
            };
            let _ = sender.send(message);
        });
        job_id
    }

    /// Cancel whatever is running without starting anything new.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether `job_id` is still the latest request.
    pub fn is_current(&self, job_id: u64) -> bool {
        self.generation.load(Ordering::Acquire) == job_id
    }

    pub fn enhancer(&self) -> &PortraitEnhancer {
        &self.enhancer
    }
}
