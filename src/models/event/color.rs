/// Colour used when neither the event nor its calendar specify one.
pub const DEFAULT_EVENT_COLOR: &str = "#3B82F6";

/// Legacy colour names still found on older records.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("blue", "#3B82F6"),
    ("green", "#22C55E"),
    ("red", "#EF4444"),
    ("yellow", "#EAB308"),
    ("purple", "#A855F7"),
    ("orange", "#F97316"),
    ("gray", "#6B7280"),
];

fn is_hex6(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve an event colour to `#RRGGBB`, falling back to the calendar colour
/// and then to [`DEFAULT_EVENT_COLOR`].
pub fn resolve_color(event_color: Option<&str>, calendar_color: Option<&str>) -> String {
    let raw = match event_color.or(calendar_color) {
        Some(value) if !value.is_empty() => value,
        _ => return DEFAULT_EVENT_COLOR.to_string(),
    };

    if is_hex6(raw) {
        return raw.to_string();
    }

    let lower = raw.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, hex)| hex.to_string())
        .unwrap_or_else(|| DEFAULT_EVENT_COLOR.to_string())
}
