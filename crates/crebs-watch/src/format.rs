use std::fmt::Display;

use html_escape::encode_text;

use crate::types::{ChangeLabel, ChangeRecord};

pub const CHANGE_HEADER: &str = "📢 <b>CREBS Update</b>";
pub const FAILURE_HEADER: &str = "⚠️ <b>CREBS check failed</b>";
const URGENT_ICON: &str = "🚨";

fn render_block(change: &ChangeRecord) -> String {
    let icon = if change.is_urgent() {
        URGENT_ICON
    } else {
        change.label.icon()
    };

    let mut block = format!(
        "{} <b>{}: {}</b>\n<code>{}</code>",
        icon,
        change.label,
        encode_text(change.paper()),
        encode_text(&change.new_value)
    );
    if change.is_urgent() && change.label == ChangeLabel::Booking {
        block.push_str("\n<i>New exam date assigned</i>");
    }
    block
}

/// Renders changes into one message, header first, blocks separated by a
/// blank line. Callers skip empty change lists; given none, only the header
/// is produced.
pub fn render_changes(changes: &[ChangeRecord]) -> String {
    if changes.is_empty() {
        return CHANGE_HEADER.to_string();
    }
    let blocks: Vec<String> = changes.iter().map(render_block).collect();
    format!("{}\n\n{}", CHANGE_HEADER, blocks.join("\n\n"))
}

/// Message sent once when a run gives up.
pub fn render_failure(reason: impl Display) -> String {
    format!(
        "{}\n<code>{}</code>",
        FAILURE_HEADER,
        encode_text(&reason.to_string())
    )
}
