// Property-based tests for slot quantization and drop resolution
// Checks the grid arithmetic with random inputs

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use egui::{pos2, vec2, Rect};
use proptest::prelude::*;

use calendar_dnd::dnd::geometry::{index_to_slot, slot_from_position, slot_start_instant, slot_to_linear_index};
use calendar_dnd::dnd::resolve::{resolve_drop, DropDecision};
use calendar_dnd::dnd::{DragPayload, DropContext, DropTarget};
use calendar_dnd::models::event::CalendarEvent;
use calendar_dnd::models::settings::Settings;
use calendar_dnd::models::slot::{Slot, SLOTS_PER_DAY, SLOT_MINUTES};
use calendar_dnd::models::ui::ViewKind;

fn valid_slot() -> impl Strategy<Value = Slot> {
    (0u32..24, 0u32..4).prop_map(|(hour, quarter)| Slot::new(hour, quarter * SLOT_MINUTES).unwrap())
}

proptest! {
    #[test]
    fn slot_index_round_trips(slot in valid_slot()) {
        prop_assert_eq!(index_to_slot(slot_to_linear_index(slot)), slot);
    }

    #[test]
    fn pointer_always_maps_to_a_valid_slot(
        y in -2000.0f32..4000.0,
        first_hour in 0u32..24,
        height in 1.0f32..64.0,
    ) {
        let grid = Rect::from_min_size(pos2(0.0, 100.0), vec2(140.0, height * SLOTS_PER_DAY as f32));
        let slot = slot_from_position(pos2(10.0, y), grid, first_hour, height);
        prop_assert!(slot.index() < SLOTS_PER_DAY);
        prop_assert!(slot.index() >= first_hour * 4);
    }

    #[test]
    fn slot_start_is_on_the_quarter_hour(slot in valid_slot(), day in 1u32..=28) {
        let date = NaiveDate::from_ymd_opt(2026, 2, day).unwrap();
        let instant = slot_start_instant(date, slot, chrono_tz::Tz::UTC);
        prop_assert_eq!(instant.timestamp() % (i64::from(SLOT_MINUTES) * 60), 0);
    }

    #[test]
    fn move_to_time_block_preserves_duration(
        start_slot in valid_slot(),
        target_slot in valid_slot(),
        minutes in 15i64..600,
    ) {
        let day = NaiveDate::from_ymd_opt(2026, 1, 27).unwrap();
        let start = slot_start_instant(day, start_slot, chrono_tz::Tz::UTC);
        let event = CalendarEvent::timed("evt", "Block", start, start + Duration::minutes(minutes)).unwrap();
        let slot_start = slot_start_instant(day, target_slot, chrono_tz::Tz::UTC);

        let ctx = DropContext::from_settings(&Settings::default(), ViewKind::Week, &[]);
        let decision = resolve_drop(
            &DragPayload::event_move(event),
            &DropTarget::TimeBlock { slot_start },
            &ctx,
        );

        match decision {
            DropDecision::Update { patch, .. } => {
                let (new_start, new_end) = (patch.start.unwrap(), patch.end.unwrap());
                prop_assert_eq!(new_start, slot_start);
                prop_assert_eq!(new_end - new_start, Duration::minutes(minutes));
            }
            DropDecision::Ignore(_) => prop_assert_eq!(start, slot_start),
            other => prop_assert!(false, "unexpected decision {:?}", other),
        }
    }
}

#[test]
fn known_slot_instant() {
    let date = NaiveDate::from_ymd_opt(2026, 1, 27).unwrap();
    let slot = Slot::new(14, 0).unwrap();
    assert_eq!(
        slot_start_instant(date, slot, chrono_tz::Tz::UTC),
        Utc.with_ymd_and_hms(2026, 1, 27, 14, 0, 0).unwrap()
    );
}
