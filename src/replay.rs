//! Scroll scenario replay used by the CLI and integration tests.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    HandleId, MediaHandle, SchedulerError,
    config::SchedulerConfig,
    media::{AutoplayPolicy, SimulatedVideo},
    scheduler::{
        facade::{MediaScope, Scheduler},
        telemetry::TelemetrySnapshot,
    },
    visibility::{AlwaysVisible, Rect, ViewportSource, VisibilitySource},
};

/// Viewport dimensions in logical pixels.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

/// One media element laid out on the page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioElement {
    pub name: String,
    pub src: String,
    pub bounds: Rect,
    #[serde(default)]
    pub blocked: bool,
}

/// Scroll offset the replay stops at.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ScrollStop {
    #[serde(default)]
    pub x: f32,
    pub y: f32,
}

/// Page layout plus the scroll path to replay.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default = "default_page")]
    pub page: String,
    pub viewport: ViewportSize,
    #[serde(rename = "element", default)]
    pub elements: Vec<ScenarioElement>,
    #[serde(rename = "stop", default)]
    pub stops: Vec<ScrollStop>,
}

fn default_page() -> String {
    "index".to_string()
}

impl Scenario {
    pub fn from_toml_str(raw: &str) -> Result<Self, SchedulerError> {
        let scenario: Self = toml::from_str(raw)
            .map_err(|err| SchedulerError::Config(format!("invalid scenario document: {err}")))?;
        if scenario.viewport.width <= 0.0 || scenario.viewport.height <= 0.0 {
            return Err(SchedulerError::Config(
                "viewport dimensions must be positive".to_string(),
            ));
        }
        Ok(scenario)
    }
}

/// Scheduler state observed after one scroll stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub stop: ScrollStop,
    pub active: Vec<String>,
    pub waiting: Vec<String>,
}

/// Outcome of a full replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub telemetry: TelemetrySnapshot,
}

/// Replays `scenario` through a scheduler backed by a viewport source, or by
/// the always-visible source when `degraded` is set.
#[instrument(skip_all, fields(page = %scenario.page, degraded = degraded))]
pub async fn run(
    config: &SchedulerConfig,
    scenario: &Scenario,
    degraded: bool,
) -> Result<ReplayReport, SchedulerError> {
    if degraded {
        let scheduler = Scheduler::new(config.clone(), AlwaysVisible::new())?;
        drive(scheduler, scenario, |_, _| {}).await
    } else {
        let viewport = Rect::new(0.0, 0.0, scenario.viewport.width, scenario.viewport.height);
        let scheduler = Scheduler::new(config.clone(), ViewportSource::new(viewport, config))?;
        drive(scheduler, scenario, |source, stop| {
            source.scroll_to(stop.x, stop.y)
        })
        .await
    }
}

async fn drive<V, F>(
    mut scheduler: Scheduler<V>,
    scenario: &Scenario,
    mut scroll: F,
) -> Result<ReplayReport, SchedulerError>
where
    V: VisibilitySource,
    F: FnMut(&mut V, ScrollStop),
{
    let mut scope = MediaScope::new(scenario.page.clone());
    for element in &scenario.elements {
        let autoplay = if element.blocked {
            AutoplayPolicy::Blocked
        } else {
            AutoplayPolicy::Allowed
        };
        let video: Arc<dyn MediaHandle> =
            Arc::new(SimulatedVideo::new(element.src.clone()).with_autoplay(autoplay));
        scope.push(video, Some(element.bounds));
    }
    let ids = scheduler.mount(scope)?;
    let names: BTreeMap<HandleId, String> = ids
        .into_iter()
        .zip(scenario.elements.iter().map(|element| element.name.clone()))
        .collect();
    let label = |ids: Vec<HandleId>| -> Vec<String> {
        ids.iter()
            .filter_map(|id| names.get(id).cloned())
            .collect()
    };

    scheduler.pump();
    let initial = ScrollStop { x: 0.0, y: 0.0 };
    let stops = std::iter::once(initial).chain(scenario.stops.iter().copied());
    let mut steps = Vec::new();
    for stop in stops {
        scroll(scheduler.source_mut(), stop);
        scheduler.pump();
        settle().await;
        scheduler.pump();

        let step = StepReport {
            stop,
            active: label(scheduler.active()),
            waiting: label(scheduler.waiting()),
        };
        info!(
            target = "replay",
            x = stop.x,
            y = stop.y,
            active = ?step.active,
            waiting = ?step.waiting,
            "scroll stop"
        );
        steps.push(step);
    }

    let telemetry = scheduler.telemetry().snapshot();
    scheduler.unmount();
    Ok(ReplayReport { steps, telemetry })
}

/// Gives spawned play requests a chance to settle.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}
