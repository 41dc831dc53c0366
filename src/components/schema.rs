use serde_json::json;

use super::{shell, unique_id, ACCENT};
use crate::contract::{FaqItem, ValidatedReference};
use crate::text::{escape_html, format_thousands};
use crate::youtube::YouTubeVideo;

const MAX_REFERENCES: usize = 10;
const HIGH_AUTHORITY: u32 = 80;

/// Collapsible FAQ list carrying FAQPage microdata.
pub fn faq_accordion(faqs: &[FaqItem]) -> String {
    if faqs.is_empty() {
        return String::new();
    }
    let section_id = unique_id();
    let items: String = faqs
        .iter()
        .map(|f| {
            format!(
                "<div itemscope itemprop=\"mainEntity\" itemtype=\"https://schema.org/Question\" class=\"wpo-faq-item\" style=\"border: 2px solid rgba(128,128,128,0.1); border-radius: 16px; margin-bottom: 14px; overflow: hidden;\">\
<button onclick=\"var c=this.nextElementSibling;c.style.maxHeight=(c.style.maxHeight&&c.style.maxHeight!=='0px')?'0px':c.scrollHeight+'px';\" style=\"width: 100%; display: flex; justify-content: space-between; padding: 22px 28px; cursor: pointer; font-size: 17px; font-weight: 700; background: none; border: none; text-align: left; color: inherit;\">\
<span itemprop=\"name\">{}</span><span style=\"color: {ACCENT};\">▼</span></button>\
<div itemscope itemprop=\"acceptedAnswer\" itemtype=\"https://schema.org/Answer\" style=\"max-height: 0; overflow: hidden; transition: max-height 0.4s ease-out;\">\
<div itemprop=\"text\" style=\"padding: 24px 28px; font-size: 16px; line-height: 1.9;\">{}</div></div></div>",
                escape_html(&f.question),
                escape_html(&f.answer)
            )
        })
        .collect();
    format!(
        "\n<section id=\"{section_id}\" itemscope itemtype=\"https://schema.org/FAQPage\" class=\"wpo-animate\" style=\"margin: 64px 0;\">\
<h2 style=\"font-size: 28px; font-weight: 900; margin: 0;\">Frequently Asked Questions</h2>\
<p style=\"font-size: 15px; opacity: 0.6; margin: 6px 0 32px 0;\">{} questions answered by experts</p>\
<div class=\"wpo-faq-container\">{items}</div></section>",
        faqs.len()
    )
}

/// `<script type="application/ld+json">` block with a FAQPage document.
pub fn faq_schema_json_ld(faqs: &[FaqItem]) -> String {
    if faqs.is_empty() {
        return String::new();
    }
    let questions: Vec<serde_json::Value> = faqs
        .iter()
        .map(|f| {
            json!({
                "@type": "Question",
                "name": f.question,
                "acceptedAnswer": { "@type": "Answer", "text": f.answer },
            })
        })
        .collect();
    let doc = json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": questions,
    });
    json_ld_script(&doc)
}

/// Wraps a JSON-LD document in a script tag. `</` is escaped so string
/// values cannot close the tag early.
pub(crate) fn json_ld_script(doc: &serde_json::Value) -> String {
    let body = doc.to_string().replace("</", "<\\/");
    format!("<script type=\"application/ld+json\">{body}</script>")
}

pub fn references_section(references: &[ValidatedReference]) -> String {
    if references.is_empty() {
        return String::new();
    }
    let shown = references.len().min(MAX_REFERENCES);
    let items: String = references
        .iter()
        .take(MAX_REFERENCES)
        .enumerate()
        .map(|(i, r)| {
            let year = r.year.as_deref().map(|y| format!(" ({})", escape_html(y))).unwrap_or_default();
            let badge = if r.authority_score.unwrap_or(0) >= HIGH_AUTHORITY {
                "<span style=\"background: rgba(16,185,129,0.2); color: #059669; padding: 3px 10px; border-radius: 6px; font-size: 11px; font-weight: 700;\">HIGH AUTHORITY</span>"
            } else {
                ""
            };
            let snippet = r
                .snippet
                .as_deref()
                .map(|s| format!("<p style=\"font-size: 14px; line-height: 1.6; margin: 10px 0 0 0;\">{}</p>", escape_html(s)))
                .unwrap_or_default();
            let sep = if i + 1 < shown {
                "border-bottom: 1px solid rgba(128,128,128,0.1);"
            } else {
                ""
            };
            format!(
                "<li style=\"display: flex; gap: 16px; padding: 18px 0; {sep}\">\
<div style=\"width: 32px; font-weight: 800; color: {ACCENT};\">{}</div>\
<div style=\"flex: 1; min-width: 0;\">\
<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" style=\"font-size: 16px; font-weight: 700; color: {ACCENT}; text-decoration: none;\">{}{year}</a>\
<div style=\"display: flex; gap: 10px; font-size: 13px;\"><span>{}</span>{badge}</div>{snippet}</div></li>",
                i + 1,
                escape_html(&r.url),
                escape_html(&r.title),
                escape_html(&r.source)
            )
        })
        .collect();
    format!(
        "\n<section class=\"wpo-box wpo-animate\" style=\"border: 2px solid rgba(99,102,241,0.12); border-radius: 24px; padding: 36px; margin: 56px 0;\">\
<h2 style=\"font-size: 24px; font-weight: 900; margin: 0;\">References &amp; Sources</h2>\
<p style=\"font-size: 14px; opacity: 0.6; margin: 6px 0 28px 0;\">{} authoritative sources cited</p>\
<ul style=\"list-style: none; padding: 0; margin: 0;\">{items}</ul></section>",
        references.len()
    )
}

/// Card-style player with channel, view count and duration. A video with no
/// id renders nothing.
pub fn youtube_embed(video: &YouTubeVideo) -> String {
    if video.video_id.is_empty() {
        tracing::warn!(target: "wpo::youtube", "refusing to embed video without id");
        return String::new();
    }
    let duration = video
        .duration
        .as_deref()
        .map(|d| format!("<span>⏱️ {}</span>", escape_html(d)))
        .unwrap_or_default();
    shell(
        "margin: 56px 0; border-radius: 24px; overflow: hidden; border: none; padding: 0;",
        &format!(
            "<div style=\"position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; background: #000;\">\
<iframe src=\"https://www.youtube.com/embed/{}?rel=0&amp;modestbranding=1\" title=\"{}\" frameborder=\"0\" \
allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share\" allowfullscreen loading=\"lazy\" \
style=\"position: absolute; top: 0; left: 0; width: 100%; height: 100%; border: none;\"></iframe></div>\
<div style=\"padding: 24px 28px;\">\
<h4 style=\"font-size: 17px; font-weight: 800; margin: 0 0 6px 0;\">{}</h4>\
<div style=\"display: flex; gap: 16px; font-size: 13px; opacity: 0.6; flex-wrap: wrap;\">\
<span>📺 {}</span><span>👁️ {} views</span>{duration}</div></div>",
            escape_html(&video.video_id),
            escape_html(&video.title),
            escape_html(&video.title),
            escape_html(&video.channel),
            format_thousands(video.views)
        ),
    )
}
