use serde::{Deserialize, Serialize};

use super::{shell, ACCENT};
use crate::text::escape_html;

const GRADIENT_CARD: &str =
    "border: none; border-radius: 24px; padding: 32px; margin: 44px 0; color: white;";

fn gradient_box(gradient: &str, icon: &str, label: &str, body: &str) -> String {
    shell(
        &format!("background: linear-gradient(135deg, {gradient}); {GRADIENT_CARD}"),
        &format!(
            "<div style=\"display: flex; align-items: flex-start; gap: 20px;\">\
<span style=\"font-size: 28px;\">{icon}</span>\
<div style=\"flex: 1;\">\
<div style=\"font-size: 11px; font-weight: 800; text-transform: uppercase; letter-spacing: 2.5px; margin-bottom: 10px;\">{}</div>\
<p style=\"font-size: 17px; line-height: 1.75; margin: 0;\">{}</p>\
</div></div>",
            escape_html(label),
            escape_html(body)
        ),
    )
}

/// Lead answer box placed directly under the intro.
pub fn quick_answer_box(answer: &str, title: Option<&str>) -> String {
    gradient_box(
        "#667eea 0%, #764ba2 100%",
        "⚡",
        title.unwrap_or("Quick Answer"),
        answer,
    )
}

pub fn pro_tip_box(tip: &str, title: Option<&str>) -> String {
    gradient_box("#11998e 0%, #38ef7d 100%", "💡", title.unwrap_or("Pro Tip"), tip)
}

pub fn warning_box(warning: &str, title: Option<&str>) -> String {
    gradient_box("#f093fb 0%, #f5576c 100%", "⚠️", title.unwrap_or("Warning"), warning)
}

pub fn expert_quote_box(quote: &str, author: &str, role: Option<&str>) -> String {
    let role = role
        .map(|r| format!("<span style=\"font-size: 14px; opacity: 0.6;\">{}</span>", escape_html(r)))
        .unwrap_or_default();
    format!(
        "\n<blockquote class=\"wpo-box wpo-animate\" style=\"border-left: 5px solid {ACCENT}; border-radius: 0 24px 24px 0; padding: 36px; margin: 48px 0;\">\
<p style=\"font-size: 20px; line-height: 1.85; font-style: italic; margin: 0 0 24px 0;\">{}</p>\
<footer><cite style=\"font-style: normal; font-weight: 800; display: block;\">{}</cite>{role}</footer>\
</blockquote>",
        escape_html(quote),
        escape_html(author)
    )
}

/// `color` is a `#rrggbb` hex; anything else falls back to the accent.
pub fn highlight_box(text: &str, icon: Option<&str>, color: Option<&str>) -> String {
    let color = color.filter(|c| is_hex_color(c)).unwrap_or(ACCENT);
    shell(
        &format!("background: linear-gradient(135deg, {color} 0%, {color}cc 100%); {GRADIENT_CARD}"),
        &format!(
            "<div style=\"display: flex; align-items: center; gap: 20px;\">\
<span style=\"font-size: 42px;\">{}</span>\
<p style=\"font-size: 19px; line-height: 1.75; margin: 0; font-weight: 600;\">{}</p></div>",
            escape_html(icon.unwrap_or("✨")),
            escape_html(text)
        ),
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl CalloutKind {
    fn palette(self) -> (&'static str, &'static str, &'static str) {
        match self {
            CalloutKind::Info => ("#3b82f6", "ℹ️", "Info"),
            CalloutKind::Success => ("#10b981", "✅", "Success"),
            CalloutKind::Warning => ("#f59e0b", "⚡", "Note"),
            CalloutKind::Error => ("#ef4444", "🔥", "Important"),
        }
    }
}

pub fn callout_box(text: &str, kind: CalloutKind) -> String {
    let (border, icon, label) = kind.palette();
    shell(
        &format!(
            "border: 2px solid {border}25; border-left: 5px solid {border}; border-radius: 0 20px 20px 0; padding: 24px 28px; margin: 40px 0;"
        ),
        &format!(
            "<div style=\"display: flex; align-items: flex-start; gap: 16px;\">\
<span style=\"font-size: 26px;\">{icon}</span>\
<div style=\"flex: 1;\">\
<div style=\"font-size: 11px; font-weight: 800; text-transform: uppercase; color: {border}; margin-bottom: 8px;\">{label}</div>\
<p style=\"font-size: 16px; line-height: 1.75; margin: 0;\">{}</p>\
</div></div>",
            escape_html(text)
        ),
    )
}

pub fn definition_box(term: &str, definition: &str) -> String {
    shell(
        "border-left: 6px solid #3b82f6; border-radius: 0 20px 20px 0; padding: 28px 32px; margin: 44px 0;",
        &format!(
            "<div style=\"font-size: 11px; font-weight: 800; text-transform: uppercase; color: #3b82f6; margin-bottom: 8px;\">Definition</div>\
<h4 style=\"font-size: 20px; font-weight: 800; margin: 0 0 12px 0;\">{}</h4>\
<p style=\"font-size: 16px; line-height: 1.8; margin: 0;\">{}</p>",
            escape_html(term),
            escape_html(definition)
        ),
    )
}

pub fn numbered_box(number: &str, title: &str, description: &str, color: Option<&str>) -> String {
    let color = color.filter(|c| is_hex_color(c)).unwrap_or(ACCENT);
    shell(
        &format!(
            "display: flex; gap: 24px; align-items: flex-start; border: 2px solid {color}20; border-radius: 24px; padding: 32px; margin: 44px 0;"
        ),
        &format!(
            "<div style=\"min-width: 72px; height: 72px; background: {color}; border-radius: 20px; color: white; font-size: 32px; font-weight: 900; display: flex; align-items: center; justify-content: center;\">{}</div>\
<div style=\"flex: 1;\">\
<h4 style=\"font-size: 20px; font-weight: 800; margin: 0 0 12px 0;\">{}</h4>\
<p style=\"font-size: 16px; line-height: 1.8; margin: 0;\">{}</p>\
</div>",
            escape_html(number),
            escape_html(title),
            escape_html(description)
        ),
    )
}

fn is_hex_color(c: &str) -> bool {
    c.len() == 7 && c.starts_with('#') && c[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}
