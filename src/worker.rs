// ============================================================================
// MIX WORKER — run one mix off the caller's thread and stream its progress
// ============================================================================
//
// The job runs on the rayon pool.  The receiver sees one `Progress` message
// per stage, then exactly one `Completed` or `Failed`.  Dropping the
// receiver is the only way to abandon a job: later sends are ignored.
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use crate::error::MixError;
use crate::mixer::{MixMode, MixStage, Region, SpectralMixer, WeightPair};
use crate::spectral_image::SpectralImage;
use crate::{log_err, log_info};

/// Everything one background mix needs, owned so it can cross threads.
#[derive(Clone, Debug)]
pub struct MixJob {
    pub images: Vec<Arc<SpectralImage>>,
    pub region: Option<Region>,
    pub weights: Vec<WeightPair>,
    pub mode: MixMode,
}

/// Messages sent from the mix worker to the caller.
#[derive(Debug)]
pub enum MixMessage {
    Progress(MixStage),
    Completed {
        image: SpectralImage,
        elapsed_ms: u64,
    },
    Failed(MixError),
}

/// Spawn `job` and return the receiving end of its message channel.
pub fn start_mix(job: MixJob) -> Receiver<MixMessage> {
    let (tx, rx) = mpsc::channel();
    spawn_mix(job, tx);
    rx
}

/// Spawn `job` on the rayon pool, reporting through `sender`.
pub fn spawn_mix(job: MixJob, sender: Sender<MixMessage>) {
    log_info!(
        "Mix job started: {:?} over {} images",
        job.mode,
        job.images.len()
    );
    spawn_with(sender, move |progress| run_job(&job, progress));
}

/// Run `work` on the rayon pool. Progress, the outcome and any panic are
/// turned into messages on `sender`.
fn spawn_with<W>(sender: Sender<MixMessage>, work: W)
where
    W: FnOnce(&mut dyn FnMut(MixStage)) -> Result<SpectralImage, MixError> + Send + 'static,
{
    rayon::spawn(move || {
        let start = Instant::now();
        let progress_tx = sender.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut progress = |stage: MixStage| {
                let _ = progress_tx.send(MixMessage::Progress(stage));
            };
            work(&mut progress)
        }));

        let message = match result {
            Ok(Ok(image)) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                log_info!("Mix job finished in {}ms", elapsed_ms);
                MixMessage::Completed { image, elapsed_ms }
            }
            Ok(Err(e)) => {
                log_err!("Mix job failed: {}", e);
                MixMessage::Failed(e)
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log_err!("Mix job panicked: {}", msg);
                MixMessage::Failed(MixError::WorkerPanicked(msg))
            }
        };
        let _ = sender.send(message);
    });
}

fn run_job<F>(job: &MixJob, progress: F) -> Result<SpectralImage, MixError>
where
    F: FnMut(MixStage),
{
    let mixer = SpectralMixer::new(job.images.iter().map(|img| img.as_ref()), job.region)?;
    mixer.mix_with_progress(job.mode, &job.weights, progress)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
