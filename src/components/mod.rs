//! HTML builders for the styled boxes injected into post bodies.
//!
//! Every builder returns a self-contained fragment with inline styles so it
//! renders the same under any WordPress theme. Builders that take a list
//! return the empty string for an empty list, and all caller-supplied text is
//! HTML-escaped.

mod boxes;
mod lists;
mod schema;

pub use boxes::{
    callout_box, definition_box, expert_quote_box, highlight_box, numbered_box, pro_tip_box,
    quick_answer_box, warning_box, CalloutKind,
};
pub use lists::{
    checklist_box, comparison_table, data_table, icon_grid_box, key_takeaways, progress_tracker,
    statistics_box, step_by_step_box, timeline_box, GridItem, Stat, Step, TimelineEvent,
};
pub use schema::{faq_accordion, faq_schema_json_ld, references_section, youtube_embed};
pub(crate) use schema::json_ld_script;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const BOX_CLASS: &str = "wpo-box wpo-animate";
pub(crate) const ACCENT: &str = "#6366f1";

/// Box styles the body-injection pass cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualType {
    ProTip,
    Highlight,
    ExpertQuote,
    StatBox,
    Checklist,
    Warning,
    StepByStep,
    DataTable,
    Callout,
    Comparison,
    Definition,
    Numbered,
    IconGrid,
    Timeline,
}

pub const VISUAL_ROTATION: [VisualType; 14] = [
    VisualType::Callout,
    VisualType::Highlight,
    VisualType::ProTip,
    VisualType::StatBox,
    VisualType::ExpertQuote,
    VisualType::Checklist,
    VisualType::Warning,
    VisualType::DataTable,
    VisualType::StepByStep,
    VisualType::Comparison,
    VisualType::Definition,
    VisualType::Numbered,
    VisualType::Highlight,
    VisualType::ProTip,
];

/// Visual for the `n`th injection slot; wraps around the rotation.
pub fn visual_for_slot(n: usize) -> VisualType {
    VISUAL_ROTATION[n % VISUAL_ROTATION.len()]
}

pub(crate) fn unique_id() -> String {
    format!("wpo-{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Standard box shell: `<div class="wpo-box ..." style="...">inner</div>`.
pub(crate) fn shell(style: &str, inner: &str) -> String {
    format!("\n<div class=\"{BOX_CLASS}\" style=\"{style}\">{inner}</div>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps() {
        assert_eq!(visual_for_slot(0), VisualType::Callout);
        assert_eq!(visual_for_slot(13), VisualType::ProTip);
        assert_eq!(visual_for_slot(14), VisualType::Callout);
    }

    #[test]
    fn visual_type_serializes_camel_case() {
        let s = serde_json::to_string(&VisualType::ExpertQuote).unwrap();
        assert_eq!(s, "\"expertQuote\"");
    }

    #[test]
    fn unique_ids_differ() {
        assert_ne!(unique_id(), unique_id());
        assert!(unique_id().starts_with("wpo-"));
    }
}
