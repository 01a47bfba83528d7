/// Facility identifiers used in output rows and CLI summaries.
pub const RAPID_CITY: &str = "RCMC";
pub const KAISER: &str = "Kaiser";
pub const MONUMENT: &str = "Monument";

/// Panel label some chart exports use when no real panel was ordered. A record
/// resolved to this label takes its own component name as the panel instead.
pub const PLACEHOLDER_PANEL: &str = "Visit Labs";

/// Segment separator in the `DATE--PANEL--FACILITY.pdf` filename contract.
pub const FILENAME_SEPARATOR: &str = "--";
