use serde::{Deserialize, Serialize};

/// One extracted lab measurement. Field order here drives the CSV column
/// order, so it must stay: source, facility, panel_name, component,
/// test_date, value, ref_range, unit, flag, page_marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabRecord {
    /// Originating document filename
    pub source: String,
    /// Controlled facility identifier
    pub facility: String,
    /// Grouping label for the battery of tests this row belongs to
    pub panel_name: String,
    /// The specific measurement name, normalized
    pub component: String,
    /// Collection date as MM/DD/YYYY text
    pub test_date: String,
    /// Numeric or comparator-prefixed numeric text, e.g. `<5`
    pub value: String,
    /// Interval or free text such as "Not Established"; may be empty
    pub ref_range: String,
    /// Unit of measure; may be empty
    pub unit: String,
    /// Abnormality marker: empty, `H`, `L`, or `A`
    pub flag: String,
    /// Printed page/Bates identifier for provenance
    pub page_marker: String,
}

impl LabRecord {
    /// A row is only worth emitting when it names both a component and a value.
    pub fn is_complete(&self) -> bool {
        !self.component.is_empty() && !self.value.is_empty()
    }
}
