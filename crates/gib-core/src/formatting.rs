//! Telegram-HTML rendering of lookup results.

use crate::domain::GroupDescriptor;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the info card the bot replies with.
///
/// Telegram HTML supports only a small subset (`<b>`, `<i>`, `<code>`), so
/// everything user-controlled is escaped.
pub fn format_group_info(info: &GroupDescriptor) -> String {
    let id = info
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let members = info
        .member_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let admins = if info.admins.is_empty() {
        "None".to_string()
    } else {
        info.admins.join(", ")
    };

    let mut text = format!(
        "<b>Title:</b> {}\n\
         <b>ID:</b> <code>{}</code>\n\
         <b>Type:</b> {}\n\
         <b>Members:</b> {}\n\
         <b>Created (approx):</b> {} ({})\n\
         <b>Owner (best-effort):</b> {}\n\
         <b>Admins:</b> {}\n",
        escape_html(&info.title),
        escape_html(&id),
        info.kind.as_str(),
        escape_html(&members),
        escape_html(&info.created.value),
        escape_html(info.created.method.as_str()),
        escape_html(&info.owner_guess),
        escape_html(&admins),
    );
    if !info.created.note.is_empty() {
        text.push_str(&format!("\n<i>{}</i>\n", escape_html(&info.created.note)));
    }
    text
}

/// One-line summary for inline results.
pub fn format_group_summary(info: &GroupDescriptor) -> String {
    format!("{} — {}", info.title, info.created.value)
}
