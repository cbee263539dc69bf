// Calendar drag-and-drop replay
// Main entry point
//
// Replays scripted pointer gestures against the drag-and-drop engine and a
// SQLite event store, logging every drop outcome.
//
// Usage: calendar-dnd <script.json> [database path]

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use egui::{pos2, vec2, Pos2, Rect};
use serde::Deserialize;
use serde_json::Value;

use calendar_dnd::dnd::geometry::slot_start_instant;
use calendar_dnd::dnd::handles::grab_payload;
use calendar_dnd::dnd::payload::{parse_payload, resolve_target, DropTarget};
use calendar_dnd::dnd::tracker::{RetainedPreview, ScopeListeners};
use calendar_dnd::dnd::{DragTracker, DropContext, DropCoordinator, GestureOutcome, PointerButton};
use calendar_dnd::models::event::CalendarEvent;
use calendar_dnd::models::mutation::RecurringScope;
use calendar_dnd::models::settings::Settings;
use calendar_dnd::models::slot::SLOTS_PER_DAY;
use calendar_dnd::models::ui::ViewKind;
use calendar_dnd::services::dialog::FixedScope;
use calendar_dnd::services::event_store::{EventRange, SqliteEventStore};
use calendar_dnd::services::notification::LogNotifier;
use calendar_dnd::services::query_cache::{spawn_pump, CacheHandle, OptimisticMutations, QueryCache};
use calendar_dnd::services::settings::SettingsService;

const GRID_WIDTH_PX: f32 = 140.0;

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    view: ViewKind,
    /// Answer given whenever a recurring event asks for a scope.
    #[serde(default)]
    scope: Option<RecurringScope>,
    #[serde(default)]
    calendars: Vec<ScriptCalendar>,
    #[serde(default)]
    events: Vec<CalendarEvent>,
    /// Ranges loaded into the cache and kept live.
    #[serde(default)]
    watch: Vec<EventRange>,
    #[serde(default)]
    gestures: Vec<Gesture>,
}

#[derive(Debug, Deserialize)]
struct ScriptCalendar {
    id: String,
    name: String,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Gesture {
    /// Day column the pointer goes down in.
    date: NaiveDate,
    /// Pointer positions; the first is the press and the last the release.
    path: Vec<[f32; 2]>,
    /// Grab a stored event by its rendered block `[x, y, width, height]`.
    #[serde(default)]
    grab: Option<Grab>,
    /// Raw drag data, used when nothing is grabbed.
    #[serde(default)]
    payload: Option<Value>,
    /// Zones under the pointer at release. Defaults to the released time block.
    #[serde(default)]
    targets: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Grab {
    event_id: String,
    block: [f32; 4],
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let script_path = args
        .next()
        .ok_or_else(|| anyhow!("usage: calendar-dnd <script.json> [database path]"))?;
    let db_path = args.next().unwrap_or_else(|| ":memory:".to_string());

    let settings = load_settings();
    let script = read_script(Path::new(&script_path))?;

    log::info!("Replaying {} gestures from {}", script.gestures.len(), script_path);
    replay(script, &db_path, settings).await
}

fn load_settings() -> Settings {
    match SettingsService::default_path().and_then(|path| SettingsService::load(&path)) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load settings, using defaults: {:#}", e);
            Settings::default()
        }
    }
}

fn read_script(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse script {}", path.display()))
}

async fn replay(script: Script, db_path: &str, settings: Settings) -> Result<()> {
    let store = SqliteEventStore::open(db_path)?.with_range_buffer(settings.range_buffer());
    for calendar in &script.calendars {
        store
            .add_calendar(&calendar.id, &calendar.name, calendar.color.as_deref())
            .with_context(|| format!("Failed to add calendar {}", calendar.id))?;
    }
    for event in &script.events {
        store
            .insert_event(event)
            .with_context(|| format!("Failed to seed event {}", event.id))?;
    }
    let calendar_ids = store.calendar_ids()?;
    let live = store.subscribe(script.watch.clone());
    let store = Arc::new(store);

    let cache = CacheHandle::new(QueryCache::new(settings.range_buffer()));
    let mutations = Arc::new(OptimisticMutations::new(
        cache.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        settings.time_zone,
    ));
    for range in &script.watch {
        mutations.load_range(*range).await;
    }
    let pump = spawn_pump(live, cache.clone());

    let context = DropContext::from_settings(&settings, script.view, &calendar_ids);
    let coordinator = DropCoordinator::new(mutations.clone(), Arc::new(FixedScope(script.scope)), context);

    let grid = Rect::from_min_size(
        Pos2::ZERO,
        vec2(GRID_WIDTH_PX, settings.slot_height_px * SLOTS_PER_DAY as f32),
    );
    let mut tracker = DragTracker::from_settings(
        ScopeListeners::default(),
        RetainedPreview::default(),
        grid,
        &settings,
    );

    for (index, gesture) in script.gestures.iter().enumerate() {
        if let Err(e) = run_gesture(&mut tracker, &coordinator, &store, &settings, script.view, gesture).await {
            log::error!("Gesture {} failed: {:#}", index + 1, e);
        }
    }

    let refreshed = mutations.refetch_stale().await;
    log::info!("Refetched {} stale ranges", refreshed);
    for (range, records) in cache.contents() {
        match records {
            Some(records) => log::info!("{}: {} events", range, records.len()),
            None => log::info!("{}: loading", range),
        }
    }
    log::info!(
        "Listeners attached {} times, released {} times",
        tracker.scope().attach_count(),
        tracker.scope().detach_count()
    );

    pump.abort();
    Ok(())
}

async fn run_gesture(
    tracker: &mut DragTracker<ScopeListeners, RetainedPreview>,
    coordinator: &DropCoordinator,
    store: &SqliteEventStore,
    settings: &Settings,
    view: ViewKind,
    gesture: &Gesture,
) -> Result<()> {
    let (first, rest) = gesture
        .path
        .split_first()
        .ok_or_else(|| anyhow!("gesture has an empty pointer path"))?;
    let press = pos2(first[0], first[1]);

    let raw_payload = match (&gesture.grab, &gesture.payload) {
        (Some(grab), _) => {
            let event = store
                .get_event(&grab.event_id)?
                .ok_or_else(|| anyhow!("event {} is not stored", grab.event_id))?;
            let [x, y, w, h] = grab.block;
            let block = Rect::from_min_size(pos2(x, y), vec2(w, h));
            Some(serde_json::to_value(grab_payload(&event, block, press, view))?)
        }
        (None, payload) => payload.clone(),
    };
    let payload = raw_payload.as_ref().and_then(parse_payload);

    tracker.pointer_down(PointerButton::Primary, press, gesture.date, payload);
    let release = rest.last().map_or(press, |p| pos2(p[0], p[1]));
    for point in rest.iter().take(rest.len().saturating_sub(1)) {
        tracker.pointer_move(pos2(point[0], point[1]));
    }

    match tracker.pointer_up(release) {
        GestureOutcome::Dragged {
            date,
            release_slot,
            payload: Some(payload),
            ..
        } => {
            let targets = match &gesture.targets {
                Some(targets) => targets.clone(),
                None => {
                    let slot_start = slot_start_instant(date, release_slot, settings.time_zone);
                    vec![serde_json::to_value(DropTarget::TimeBlock { slot_start })?]
                }
            };
            match resolve_target(&targets) {
                Some(target) => {
                    let outcome = coordinator.complete_drop(&payload, &target).await;
                    log::info!("Drop of {} on {:?}: {:?}", payload.kind(), target, outcome);
                }
                None => log::info!("Drop of {} outside any zone", payload.kind()),
            }
        }
        GestureOutcome::Dragged { range, .. } => {
            log::info!("Selected {}..{} on {}", range.start_slot, range.end_slot, gesture.date);
        }
        GestureOutcome::Clicked { slot, range, .. } => {
            log::info!("Clicked {} on {} ({} slots)", slot, gesture.date, range.len());
        }
        GestureOutcome::Cancelled | GestureOutcome::Ignored => {}
    }

    if tracker.take_synthetic_click() {
        log::debug!("Suppressed trailing click");
    }
    Ok(())
}
