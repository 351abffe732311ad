use std::sync::Arc;

use tracing::{info, warn, Level};

use sortbot_rust::config::{OrientationAlgorithm, SortConfig};
use sortbot_rust::coordinator::CoordinatorBuilder;
use sortbot_rust::error::SortError;
use sortbot_rust::hardware::{ConveyorSwitch, KasaPlug, SimulatedArm};
use sortbot_rust::vision::{
    MomentEstimator, OrientationEstimator, RectFitEstimator, StaticDetector,
};

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), SortError> {
    init_logging();

    let config_path = std::env::var("SORTBOT_CONFIG").ok();
    let config = SortConfig::load(config_path.as_deref().or(Some("sortbot")))?;
    info!(
        categories = config.categories.len(),
        stable_frames = config.stable_frames,
        cooldown_secs = config.cooldown_secs,
        "Configuration loaded"
    );

    let conveyor = Arc::new(KasaPlug::new(
        config.conveyor.host.clone(),
        config.conveyor.port,
    ));
    if config.conveyor.ensure_running_at_start {
        match conveyor.turn_on().await {
            Ok(()) => info!("Conveyor running"),
            Err(e) => warn!("Could not start conveyor at boot: {e}"),
        }
    }

    let orientation: Arc<dyn OrientationEstimator> = match config.orientation_algorithm {
        OrientationAlgorithm::Moments => Arc::new(MomentEstimator::new()),
        OrientationAlgorithm::RectFit => Arc::new(RectFitEstimator::new()),
    };

    // No model and no arm are wired in this binary; deployments swap in
    // their Detector / ArmDriver here. The stand-ins keep the rig
    // commissionable end to end.
    warn!("Running with the static detector and simulated arm stand-ins");
    let coordinator = CoordinatorBuilder::new(config)
        .detector(Arc::new(StaticDetector::empty()))
        .orientation(orientation)
        .arm(Arc::new(SimulatedArm::new()))
        .conveyor(conveyor)
        .build()?;

    info!("Sorting coordinator running, Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| SortError::Coordinator(e.to_string()))?;

    info!("Shutting down");
    coordinator.stop();
    coordinator.join().await;
    Ok(())
}
