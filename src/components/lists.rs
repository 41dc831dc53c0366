use serde::{Deserialize, Serialize};

use super::{shell, ACCENT};
use crate::text::escape_html;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridItem {
    pub icon: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: String,
    pub title: String,
    pub description: String,
}

const PANEL: &str = "border: 2px solid rgba(99,102,241,0.12); border-radius: 28px; padding: 36px; margin: 52px 0;";
const ROW_RULE: &str = "border-bottom: 1px solid rgba(128,128,128,0.1);";

fn heading(tag: &str, text: &str) -> String {
    format!("<{tag} style=\"font-size: 22px; font-weight: 800; margin: 0 0 24px 0;\">{}</{tag}>", escape_html(text))
}

/// Separator style for every row except the last.
fn rule(i: usize, len: usize) -> &'static str {
    if i + 1 < len {
        ROW_RULE
    } else {
        ""
    }
}

pub fn statistics_box(stats: &[Stat]) -> String {
    if stats.is_empty() {
        return String::new();
    }
    let items: String = stats
        .iter()
        .map(|s| {
            format!(
                "<div style=\"flex: 1; min-width: 150px; text-align: center; padding: 32px 20px; border-radius: 20px;\">\
<div style=\"font-size: 20px; margin-bottom: 12px;\">{}</div>\
<div style=\"font-size: 42px; font-weight: 900; color: {ACCENT};\">{}</div>\
<div style=\"font-size: 14px; font-weight: 600; text-transform: uppercase;\">{}</div></div>",
                escape_html(s.icon.as_deref().unwrap_or("📊")),
                escape_html(&s.value),
                escape_html(&s.label)
            )
        })
        .collect();
    shell(
        PANEL,
        &format!("<div style=\"display: flex; flex-wrap: wrap; justify-content: center; gap: 20px;\">{items}</div>"),
    )
}

pub fn data_table(title: &str, headers: &[String], rows: &[Vec<String>], source: Option<&str>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let head: String = headers
        .iter()
        .map(|h| {
            format!(
                "<th style=\"padding: 16px 20px; text-align: left; font-size: 12px; font-weight: 800; text-transform: uppercase;\">{}</th>",
                escape_html(h)
            )
        })
        .collect();
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let bg = if i % 2 == 0 { "transparent" } else { "rgba(128,128,128,0.03)" };
            let cells: String = row
                .iter()
                .enumerate()
                .map(|(j, cell)| {
                    let weight = if j == 0 { " font-weight: 600;" } else { "" };
                    format!(
                        "<td style=\"padding: 16px 20px; {ROW_RULE}{weight}\">{}</td>",
                        escape_html(cell)
                    )
                })
                .collect();
            format!("<tr style=\"background: {bg};\">{cells}</tr>")
        })
        .collect();
    let source = source
        .map(|s| format!("<p style=\"font-size: 13px; opacity: 0.6; margin: 6px 0 0 0;\">Source: {}</p>", escape_html(s)))
        .unwrap_or_default();
    shell(
        "border: 2px solid rgba(128,128,128,0.12); border-radius: 24px; overflow: hidden; margin: 56px 0; padding: 0;",
        &format!(
            "<div style=\"padding: 24px 28px;\"><h3 style=\"font-size: 20px; font-weight: 800; margin: 0;\">{}</h3>{source}</div>\
<div style=\"overflow-x: auto;\"><table style=\"width: 100%; border-collapse: collapse;\">\
<thead><tr>{head}</tr></thead><tbody>{body}</tbody></table></div>",
            escape_html(title)
        ),
    )
}

pub fn checklist_box(title: &str, items: &[String], icon: Option<&str>) -> String {
    if items.is_empty() {
        return String::new();
    }
    let icon = escape_html(icon.unwrap_or("✅"));
    let lis: String = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "<li style=\"display: flex; gap: 16px; padding: 16px 0; {}\"><span>{icon}</span><span>{}</span></li>",
                rule(i, items.len()),
                escape_html(item)
            )
        })
        .collect();
    shell(
        "border: 2px solid rgba(16,185,129,0.18); border-radius: 24px; padding: 32px; margin: 48px 0;",
        &format!("{}<ul style=\"list-style: none; padding: 0; margin: 0;\">{lis}</ul>", heading("h3", title)),
    )
}

pub fn step_by_step_box(title: &str, steps: &[Step]) -> String {
    if steps.is_empty() {
        return String::new();
    }
    let items: String = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "<div style=\"display: flex; gap: 24px; padding-bottom: 28px; {}\">\
<div style=\"width: 60px; height: 60px; background: {ACCENT}; border-radius: 50%; color: white; font-weight: 900; display: flex; align-items: center; justify-content: center;\">{}</div>\
<div style=\"flex: 1;\"><h4 style=\"font-size: 18px; font-weight: 800; margin: 0 0 10px 0;\">{}</h4>\
<p style=\"font-size: 15px; line-height: 1.8; margin: 0;\">{}</p></div></div>",
                rule(i, steps.len()),
                i + 1,
                escape_html(&s.title),
                escape_html(&s.description)
            )
        })
        .collect();
    shell(PANEL, &format!("{}{items}", heading("h3", title)))
}

/// Two-column "avoid / do" table.
pub fn comparison_table(title: &str, headers: (&str, &str), rows: &[(String, String)]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let body: String = rows
        .iter()
        .map(|(bad, good)| {
            format!(
                "<tr style=\"{ROW_RULE}\">\
<td style=\"padding: 18px 24px; width: 50%;\"><span style=\"color: #ef4444; margin-right: 10px;\">✗</span>{}</td>\
<td style=\"padding: 18px 24px; width: 50%;\"><span style=\"color: #10b981; margin-right: 10px;\">✓</span>{}</td></tr>",
                escape_html(bad),
                escape_html(good)
            )
        })
        .collect();
    shell(
        "border: 2px solid rgba(128,128,128,0.12); border-radius: 24px; overflow: hidden; margin: 48px 0; padding: 0;",
        &format!(
            "<div style=\"padding: 24px 28px;\"><h3 style=\"font-size: 20px; font-weight: 800; margin: 0;\">{}</h3></div>\
<table style=\"width: 100%; border-collapse: collapse;\"><thead><tr>\
<th style=\"padding: 16px 24px; text-align: left; color: #ef4444;\">{}</th>\
<th style=\"padding: 16px 24px; text-align: left; color: #10b981;\">{}</th>\
</tr></thead><tbody>{body}</tbody></table>",
            escape_html(title),
            escape_html(headers.0),
            escape_html(headers.1)
        ),
    )
}

pub fn key_takeaways(takeaways: &[String]) -> String {
    if takeaways.is_empty() {
        return String::new();
    }
    let items: String = takeaways
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "<li style=\"display: flex; gap: 18px; padding: 20px 0; {}\">\
<span style=\"min-width: 40px; height: 40px; background: {ACCENT}; border-radius: 12px; color: white; font-weight: 800; display: flex; align-items: center; justify-content: center;\">{}</span>\
<span style=\"font-size: 17px; line-height: 1.7;\">{}</span></li>",
                rule(i, takeaways.len()),
                i + 1,
                escape_html(t)
            )
        })
        .collect();
    shell(
        PANEL,
        &format!(
            "<h3 style=\"font-size: 26px; font-weight: 900; margin: 0;\">Key Takeaways</h3>\
<p style=\"font-size: 15px; opacity: 0.6; margin: 6px 0 28px 0;\">The essential points to remember</p>\
<ul style=\"list-style: none; padding: 0; margin: 0;\">{items}</ul>"
        ),
    )
}

pub fn icon_grid_box(title: &str, items: &[GridItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let cells: String = items
        .iter()
        .map(|it| {
            format!(
                "<div style=\"text-align: center; padding: 28px 20px; border-radius: 20px;\">\
<div style=\"font-size: 40px; margin-bottom: 16px;\">{}</div>\
<h4 style=\"font-size: 17px; font-weight: 800; margin: 0 0 10px 0;\">{}</h4>\
<p style=\"font-size: 14px; line-height: 1.6; margin: 0;\">{}</p></div>",
                escape_html(&it.icon),
                escape_html(&it.title),
                escape_html(&it.description)
            )
        })
        .collect();
    shell(
        PANEL,
        &format!(
            "{}<div style=\"display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px;\">{cells}</div>",
            heading("h3", title)
        ),
    )
}

pub fn timeline_box(title: &str, events: &[TimelineEvent]) -> String {
    if events.is_empty() {
        return String::new();
    }
    let items: String = events
        .iter()
        .enumerate()
        .map(|(i, ev)| {
            let connector = if i + 1 < events.len() {
                format!("<div style=\"width: 3px; flex: 1; background: {ACCENT}; margin: 8px 0;\"></div>")
            } else {
                String::new()
            };
            format!(
                "<div style=\"display: flex; gap: 20px;\">\
<div style=\"display: flex; flex-direction: column; align-items: center;\">\
<div style=\"width: 20px; height: 20px; background: {ACCENT}; border-radius: 50%;\"></div>{connector}</div>\
<div style=\"flex: 1; padding-bottom: 24px;\">\
<div style=\"font-size: 12px; font-weight: 700; color: {ACCENT}; text-transform: uppercase;\">{}</div>\
<h4 style=\"font-size: 18px; font-weight: 800; margin: 0 0 8px 0;\">{}</h4>\
<p style=\"font-size: 15px; line-height: 1.7; margin: 0;\">{}</p></div></div>",
                escape_html(&ev.time),
                escape_html(&ev.title),
                escape_html(&ev.description)
            )
        })
        .collect();
    shell(PANEL, &format!("{}{items}", heading("h3", title)))
}

/// `current_step` is 1-based; earlier steps render as done.
pub fn progress_tracker(title: &str, steps: &[String], current_step: usize) -> String {
    if steps.is_empty() {
        return String::new();
    }
    let current = current_step.max(1) - 1;
    let items: String = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let done = i < current;
            let bg = if done {
                "#10b981"
            } else if i == current {
                ACCENT
            } else {
                "rgba(128,128,128,0.2)"
            };
            let marker = if done { "✓".to_string() } else { (i + 1).to_string() };
            let bar = if i + 1 < steps.len() {
                let c = if done { "#10b981" } else { "rgba(128,128,128,0.15)" };
                format!("<div style=\"flex: 0.5; height: 4px; background: {c}; margin-top: 24px;\"></div>")
            } else {
                String::new()
            };
            format!(
                "<div style=\"flex: 1; text-align: center;\">\
<div style=\"width: 48px; height: 48px; margin: 0 auto 12px; background: {bg}; border-radius: 50%; display: flex; align-items: center; justify-content: center;\">{marker}</div>\
<div style=\"font-size: 14px; font-weight: 600;\">{}</div></div>{bar}",
                escape_html(step)
            )
        })
        .collect();
    shell(
        PANEL,
        &format!(
            "{}<div style=\"display: flex; align-items: flex-start; justify-content: center;\">{items}</div>",
            heading("h3", title)
        ),
    )
}
