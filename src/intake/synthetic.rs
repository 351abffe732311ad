use chrono::Utc;
use image::DynamicImage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::common::Frame;
use crate::config::IntakeConfig;

/// Paced blank-frame source. Real deployments attach a camera to the same
/// channel; this source lets the full conveyor/arm path run on a rig with
/// no capture hardware, and keeps the frame cadence honest for tests.
pub struct SyntheticCamera {
    config: IntakeConfig,
    frame_tx: Sender<Frame>,
}

impl SyntheticCamera {
    pub fn new(config: IntakeConfig, frame_tx: Sender<Frame>) -> Self {
        Self { config, frame_tx }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.fps.max(1)));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut index: u64 = 0;

        info!(
            width = self.config.width,
            height = self.config.height,
            fps = self.config.fps,
            "Synthetic camera started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Synthetic camera stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let image = DynamicImage::new_rgb8(self.config.width, self.config.height);
                    let frame = Frame::new(index, image, Utc::now());
                    index += 1;
                    match self.frame_tx.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            // Drop frame to keep real-time
                            warn!("Dropping frame: channel full");
                        }
                        Err(TrySendError::Closed(_)) => {
                            warn!("Frame channel closed, stopping synthetic camera");
                            break;
                        }
                    }
                }
            }
        }
    }
}
