//! The bike order orchestration and its activities.
//!
//! `CrazyBikeOrchestration` assembles a bike and then ships it. Payloads are
//! the JSON forms of the types in [`crate::bike`].

use std::sync::Arc;
use std::time::Duration;

use duroxide::providers::Provider;
use duroxide::runtime::registry::ActivityRegistry;
use duroxide::runtime::{self, Runtime, RuntimeOptions};
use duroxide::{ActivityContext, OrchestrationContext, OrchestrationRegistry};
use tracing::{error, info};

use crate::bike::{AssembledBike, Bike, ShippedBike};

pub const CRAZY_BIKE_ORCHESTRATION: &str = "CrazyBikeOrchestration";
pub const ASSEMBLE_BIKE_ACTIVITY: &str = "AssembleBike";
pub const SHIP_BIKE_ACTIVITY: &str = "ShipBike";

pub const DEFAULT_ACTIVITY_DELAY: Duration = Duration::from_secs(5);

/// Knobs for the worker side of the application.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Simulated work time of each activity.
    pub activity_delay: Duration,
    /// Lower bound on dispatcher polling; `None` keeps the runtime default.
    pub dispatcher_poll_interval: Option<Duration>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            activity_delay: DEFAULT_ACTIVITY_DELAY,
            dispatcher_poll_interval: None,
        }
    }
}

/// Build a bike from its parts after the simulated assembly time.
pub async fn assemble_bike(input: &str, delay: Duration) -> Result<AssembledBike, String> {
    let bike: Bike =
        serde_json::from_str(input).map_err(|e| format!("invalid bike payload: {e}"))?;
    if bike.parts.is_empty() {
        return Err(format!("bike {} has no parts to assemble", bike.id));
    }

    tokio::time::sleep(delay).await;

    Ok(AssembledBike {
        message: format!(
            "Bike {} with ID {} assembled with {} parts.",
            bike.model,
            bike.id,
            bike.parts.len()
        ),
        id: bike.id,
        model: bike.model,
    })
}

/// Ship an assembled bike after the simulated shipping time.
pub async fn ship_bike(input: &str, delay: Duration) -> Result<ShippedBike, String> {
    let assembled: AssembledBike =
        serde_json::from_str(input).map_err(|e| format!("invalid assembled bike payload: {e}"))?;

    tokio::time::sleep(delay).await;

    Ok(ShippedBike {
        message: format!(
            "Bike {} with ID {} shipped!",
            assembled.model, assembled.id
        ),
        id: assembled.id,
        model: assembled.model,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("failed to serialize activity output: {e}"))
}

pub fn activity_registry(options: &WorkerOptions) -> ActivityRegistry {
    let assemble_delay = options.activity_delay;
    let ship_delay = options.activity_delay;

    ActivityRegistry::builder()
        .register(
            ASSEMBLE_BIKE_ACTIVITY,
            move |ctx: ActivityContext, input: String| async move {
                match assemble_bike(&input, assemble_delay).await {
                    Ok(assembled) => {
                        ctx.trace_info(format!(
                            "AssembleBike called with response: {}",
                            assembled.message
                        ));
                        to_json(&assembled)
                    }
                    Err(e) => {
                        error!(error = %e, "An error occurred in AssembleBike");
                        Err(e)
                    }
                }
            },
        )
        .register(
            SHIP_BIKE_ACTIVITY,
            move |ctx: ActivityContext, input: String| async move {
                match ship_bike(&input, ship_delay).await {
                    Ok(shipped) => {
                        ctx.trace_info(format!(
                            "ShipBike called with response: {}",
                            shipped.message
                        ));
                        to_json(&shipped)
                    }
                    Err(e) => {
                        error!(error = %e, "An error occurred in ShipBike");
                        Err(e)
                    }
                }
            },
        )
        .build()
}

pub fn orchestration_registry() -> OrchestrationRegistry {
    let orchestration = |ctx: OrchestrationContext, input: String| async move {
        let bike: Bike = serde_json::from_str(&input).map_err(|e| {
            let message = format!("invalid bike order: {e}");
            ctx.trace_error(message.clone());
            message
        })?;

        ctx.trace_info(format!("Starting bike assembly for Bike ID: {}", bike.id));
        let assembled = ctx
            .schedule_activity(ASSEMBLE_BIKE_ACTIVITY, input)
            .await
            .map_err(|e| {
                ctx.trace_error(format!(
                    "An error occurred in {CRAZY_BIKE_ORCHESTRATION} for Bike ID: {}: {e}",
                    bike.id
                ));
                e
            })?;

        ctx.trace_info(format!("Starting bike shipping for Bike ID: {}", bike.id));
        let shipped = ctx
            .schedule_activity(SHIP_BIKE_ACTIVITY, assembled)
            .await
            .map_err(|e| {
                ctx.trace_error(format!(
                    "An error occurred in {CRAZY_BIKE_ORCHESTRATION} for Bike ID: {}: {e}",
                    bike.id
                ));
                e
            })?;

        let shipped: ShippedBike = serde_json::from_str(&shipped)
            .map_err(|e| format!("invalid shipped bike payload: {e}"))?;
        Ok::<_, String>(shipped.message)
    };

    OrchestrationRegistry::builder()
        .register(CRAZY_BIKE_ORCHESTRATION, orchestration)
        .build()
}

/// Start a runtime that executes bike orchestrations and activities against `store`.
pub async fn start_runtime(store: Arc<dyn Provider>, options: &WorkerOptions) -> Arc<Runtime> {
    info!(
        activity_delay_ms = options.activity_delay.as_millis() as u64,
        "Starting CrazyBikeOrchestration worker"
    );

    let activities = activity_registry(options);
    let orchestrations = orchestration_registry();

    match options.dispatcher_poll_interval {
        Some(interval) => {
            let runtime_options = RuntimeOptions {
                dispatcher_min_poll_interval: interval,
                ..Default::default()
            };
            runtime::Runtime::start_with_options(store, activities, orchestrations, runtime_options)
                .await
        }
        None => runtime::Runtime::start_with_store(store, activities, orchestrations).await,
    }
}
