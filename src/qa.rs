//! QA swarm: independent, stateless rule checks over a generated article,
//! averaged into one score with a hard gate on critical failures.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contract::{ContentContract, EntityGapAnalysis, NeuronTerm};
use crate::seo::EEAT_PHRASES;
use crate::text::{count_words, format_thousands, strip_html};

/// Minimum aggregate score for a passing run.
pub const PASS_THRESHOLD: u32 = 65;

const MIN_WORDS: usize = 3000;
const MIN_HTML_CHARS: usize = 5000;

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h1").expect("static regex"));
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h2").expect("static regex"));
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h3").expect("static regex"));
static RE_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<ul|<ol").expect("static regex"));
static RE_TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<table").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaCategory {
    Critical,
    Seo,
    Aeo,
    Geo,
    Enhancement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaStatus {
    Passed,
    Failed,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaValidationResult {
    pub agent: String,
    pub category: QaCategory,
    pub status: QaStatus,
    /// Always within [0, 100].
    pub score: f64,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaSwarmResult {
    pub score: u32,
    pub results: Vec<QaValidationResult>,
    pub passed: bool,
    pub critical_fails: usize,
}

impl QaSwarmResult {
    /// Rules that did not pass, critical first.
    pub fn deficiencies(&self) -> Vec<&QaValidationResult> {
        let mut out: Vec<_> = self
            .results
            .iter()
            .filter(|r| r.status != QaStatus::Passed)
            .collect();
        out.sort_by_key(|r| (r.category != QaCategory::Critical, r.status != QaStatus::Failed));
        out
    }
}

fn result(
    agent: &str,
    category: QaCategory,
    status: QaStatus,
    score: f64,
    feedback: String,
    fix: Option<String>,
) -> QaValidationResult {
    QaValidationResult {
        agent: agent.to_string(),
        category,
        status,
        score: score.clamp(0.0, 100.0),
        feedback,
        fix_suggestion: fix,
    }
}

/// Count-vs-target rule: passes at `target`, warns at `warn_at`.
fn ratio_rule(
    agent: &str,
    category: QaCategory,
    count: usize,
    target: usize,
    warn_at: usize,
    feedback: String,
    fix: impl FnOnce() -> String,
) -> QaValidationResult {
    let status = if count >= target {
        QaStatus::Passed
    } else if count >= warn_at {
        QaStatus::Warning
    } else {
        QaStatus::Failed
    };
    let score = (count as f64 / target as f64 * 100.0).min(100.0);
    let fix = (count < target).then(fix);
    result(agent, category, status, score, feedback, fix)
}

/// Presence rule: 100 when present, otherwise `missing_status` with `missing_score`.
fn presence_rule(
    agent: &str,
    category: QaCategory,
    present: bool,
    missing_status: QaStatus,
    missing_score: f64,
    (found, missing, fix): (&str, &str, &str),
) -> QaValidationResult {
    if present {
        result(agent, category, QaStatus::Passed, 100.0, found.to_string(), None)
    } else {
        result(
            agent,
            category,
            missing_status,
            missing_score,
            missing.to_string(),
            Some(fix.to_string()),
        )
    }
}

pub fn run_qa_swarm(
    contract: &ContentContract,
    entity_gap: Option<&EntityGapAnalysis>,
    neuron_terms: Option<&[NeuronTerm]>,
) -> QaSwarmResult {
    let html = contract.html_content.as_str();
    let lower = html.to_lowercase();
    let text_lower = strip_html(html).to_lowercase();
    let word_count = if contract.word_count > 0 {
        contract.word_count
    } else {
        count_words(html)
    };

    let mut results = Vec::with_capacity(17);

    // Critical
    let h1 = RE_H1.find_iter(html).count();
    results.push(if h1 == 0 {
        result(
            "H1 Validator",
            QaCategory::Critical,
            QaStatus::Passed,
            100.0,
            "No H1 tags found, WordPress provides the title".to_string(),
            None,
        )
    } else {
        result(
            "H1 Validator",
            QaCategory::Critical,
            QaStatus::Failed,
            0.0,
            format!("Found {h1} H1 tag(s), must remove"),
            Some("Remove all H1 tags from content".to_string()),
        )
    });

    results.push(result(
        "Word Count Validator",
        QaCategory::Critical,
        if word_count >= MIN_WORDS { QaStatus::Passed } else { QaStatus::Failed },
        (word_count as f64 / MIN_WORDS as f64 * 100.0).min(100.0),
        format!(
            "{} words (minimum: {})",
            format_thousands(word_count as u64),
            format_thousands(MIN_WORDS as u64)
        ),
        (word_count < MIN_WORDS).then(|| format!("Add {} more words", MIN_WORDS - word_count)),
    ));

    let html_len = html.chars().count();
    let long_enough = html_len > MIN_HTML_CHARS;
    results.push(result(
        "Content Validator",
        QaCategory::Critical,
        if long_enough { QaStatus::Passed } else { QaStatus::Failed },
        if long_enough { 100.0 } else { html_len as f64 / MIN_HTML_CHARS as f64 * 100.0 },
        if long_enough { "Sufficient HTML content" } else { "HTML content too short" }.to_string(),
        (!long_enough).then(|| "Generate more comprehensive content".to_string()),
    ));

    // SEO
    let h2 = RE_H2.find_iter(html).count();
    results.push(ratio_rule(
        "H2 Structure",
        QaCategory::Seo,
        h2,
        8,
        5,
        format!("{h2} H2 headings (target: 8+)"),
        || format!("Add {} more H2 sections", 8usize.saturating_sub(h2)),
    ));

    let h3 = RE_H3.find_iter(html).count();
    results.push(ratio_rule(
        "H3 Structure",
        QaCategory::Seo,
        h3,
        15,
        8,
        format!("{h3} H3 headings (target: 15+)"),
        || "Add more H3 subsections".to_string(),
    ));

    let links = contract.internal_links.len();
    results.push(ratio_rule(
        "Internal Links",
        QaCategory::Seo,
        links,
        12,
        6,
        format!("{links} internal links (target: 12+)"),
        || "Add more contextual internal links".to_string(),
    ));

    // AEO
    let has_faq = lower.contains("frequently asked") || html.contains("FAQPage") || html.contains('❓');
    results.push(presence_rule(
        "FAQ Section",
        QaCategory::Aeo,
        has_faq,
        QaStatus::Failed,
        0.0,
        ("FAQ section detected", "Missing FAQ section", "Add FAQ section with 7-10 questions"),
    ));

    let faqs = contract.faqs.len();
    results.push(ratio_rule(
        "FAQ Count",
        QaCategory::Aeo,
        faqs,
        7,
        5,
        format!("{faqs} FAQ items (target: 7+)"),
        || format!("Add {} more FAQ questions", 7usize.saturating_sub(faqs)),
    ));

    results.push(presence_rule(
        "Quick Answer Box",
        QaCategory::Aeo,
        lower.contains("quick answer"),
        QaStatus::Warning,
        50.0,
        (
            "Quick Answer box present",
            "Consider adding Quick Answer box",
            "Add Quick Answer box at top of content",
        ),
    ));

    // GEO
    let has_schema = html.contains("FAQPage")
        || html.contains(r#"itemtype="https://schema.org"#)
        || html.contains("application/ld+json");
    results.push(presence_rule(
        "Schema Markup",
        QaCategory::Geo,
        has_schema,
        QaStatus::Failed,
        0.0,
        ("Schema markup detected", "Missing schema markup", "Add FAQPage and Article schema"),
    ));

    let eeat = EEAT_PHRASES.iter().filter(|p| text_lower.contains(*p)).count();
    results.push(ratio_rule(
        "E-E-A-T Signals",
        QaCategory::Geo,
        eeat,
        5,
        3,
        format!("{eeat} E-E-A-T signal phrases (target: 5+)"),
        || "Add more authority phrases and citations".to_string(),
    ));

    // Enhancement
    let lists = RE_LIST.find_iter(html).count();
    results.push(ratio_rule(
        "List Elements",
        QaCategory::Enhancement,
        lists,
        5,
        3,
        format!("{lists} lists (target: 5+)"),
        || "Add more bulleted/numbered lists".to_string(),
    ));

    let tables = RE_TABLE.find_iter(html).count();
    results.push(ratio_rule(
        "Tables",
        QaCategory::Enhancement,
        tables,
        2,
        1,
        format!("{tables} tables (target: 2+)"),
        || "Add comparison tables for better AEO".to_string(),
    ));

    results.push(presence_rule(
        "Video Content",
        QaCategory::Enhancement,
        html.contains("youtube.com/embed") || html.contains("youtu.be"),
        QaStatus::Warning,
        50.0,
        ("YouTube video embedded", "Consider adding relevant video", "Embed a relevant YouTube video"),
    ));

    results.push(presence_rule(
        "References Section",
        QaCategory::Enhancement,
        lower.contains("references") || lower.contains("sources") || html.contains('📚'),
        QaStatus::Warning,
        50.0,
        (
            "References section detected",
            "Consider adding references",
            "Add authoritative references section",
        ),
    ));

    // Optional coverage rules
    if let Some(terms) = neuron_terms.filter(|t| !t.is_empty()) {
        results.push(neuron_coverage(terms, &text_lower));
    }
    if let Some(gap) = entity_gap.filter(|g| !g.missing_entities.is_empty()) {
        results.push(entity_coverage(gap, &text_lower));
    }

    let total: f64 = results.iter().map(|r| r.score).sum();
    let score = (total / results.len() as f64).round() as u32;
    let critical_fails = results
        .iter()
        .filter(|r| r.category == QaCategory::Critical && r.status == QaStatus::Failed)
        .count();
    let passed = score >= PASS_THRESHOLD && critical_fails == 0;

    counter!("wpo_qa_runs_total").increment(1);
    if passed {
        counter!("wpo_qa_passed_total").increment(1);
    }
    tracing::info!(
        target: "wpo::qa",
        slug = %contract.slug,
        score,
        passed,
        critical_fails,
        rules = results.len(),
        "qa swarm finished"
    );

    QaSwarmResult {
        score,
        results,
        passed,
        critical_fails,
    }
}

/// Share of terms used at least once, weighted by importance.
fn neuron_coverage(terms: &[NeuronTerm], text_lower: &str) -> QaValidationResult {
    let weight_total: f64 = terms.iter().map(|t| t.importance.max(0.0)).sum();
    let (covered, weight_covered) = terms
        .iter()
        .filter(|t| text_lower.contains(&t.term.to_lowercase()))
        .fold((0usize, 0.0f64), |(n, w), t| (n + 1, w + t.importance.max(0.0)));
    let ratio = if weight_total > 0.0 {
        weight_covered / weight_total
    } else {
        covered as f64 / terms.len() as f64
    };
    let score = ratio * 100.0;
    let status = coverage_status(score);
    let missing: Vec<&str> = terms
        .iter()
        .filter(|t| !text_lower.contains(&t.term.to_lowercase()))
        .take(5)
        .map(|t| t.term.as_str())
        .collect();
    result(
        "Neuron Term Coverage",
        QaCategory::Seo,
        status,
        score,
        format!("{covered}/{} NLP terms used", terms.len()),
        (!missing.is_empty()).then(|| format!("Work in: {}", missing.join(", "))),
    )
}

fn entity_coverage(gap: &EntityGapAnalysis, text_lower: &str) -> QaValidationResult {
    let total = gap.missing_entities.len();
    let missing: Vec<&str> = gap
        .missing_entities
        .iter()
        .filter(|e| !text_lower.contains(&e.to_lowercase()))
        .map(String::as_str)
        .collect();
    let covered = total - missing.len();
    let score = covered as f64 / total as f64 * 100.0;
    result(
        "Entity Coverage",
        QaCategory::Geo,
        coverage_status(score),
        score,
        format!("{covered}/{total} competitor entities covered"),
        (!missing.is_empty()).then(|| {
            let head: Vec<&str> = missing.iter().take(5).copied().collect();
            format!("Mention: {}", head.join(", "))
        }),
    )
}

fn coverage_status(score: f64) -> QaStatus {
    if score >= 70.0 {
        QaStatus::Passed
    } else if score >= 40.0 {
        QaStatus::Warning
    } else {
        QaStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{FaqItem, InternalLinkResult, NeuronTermKind};

    fn rich_contract() -> ContentContract {
        let mut html = String::from("<div>Quick Answer: yes.</div>");
        for i in 0..8 {
            html.push_str(&format!("<h2>Section {i}</h2>"));
            for j in 0..2 {
                html.push_str(&format!("<h3>Sub {i}.{j}</h3><p>{}</p>", "According to experts the data is clear and research shows gains. ".repeat(6)));
            }
            html.push_str("<ul><li>a</li></ul>");
        }
        html.push_str("<table></table><table></table>");
        html.push_str(r#"<section itemscope itemtype="https://schema.org/FAQPage"><h2>Frequently Asked Questions</h2></section>"#);
        html.push_str(r#"<iframe src="https://www.youtube.com/embed/abcdefghijk"></iframe><h2>References</h2>"#);
        html.push_str("<p>Studies indicate that experts recommend this. Data suggests so; it was published in a journal.</p>");
        let mut c = ContentContract::new("Title", "slug", html);
        c.word_count = 3500;
        c.faqs = (0..7)
            .map(|i| FaqItem { question: format!("Q{i}?"), answer: "A".into() })
            .collect();
        c.internal_links = (0..12)
            .map(|i| InternalLinkResult {
                url: format!("/p{i}"),
                anchor_text: "a b c".into(),
                relevance_score: 0.8,
                position: i * 500,
                context: None,
            })
            .collect();
        c
    }

    #[test]
    fn fifteen_rules_in_order() {
        let r = run_qa_swarm(&rich_contract(), None, None);
        let names: Vec<&str> = r.results.iter().map(|x| x.agent.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "H1 Validator",
                "Word Count Validator",
                "Content Validator",
                "H2 Structure",
                "H3 Structure",
                "Internal Links",
                "FAQ Section",
                "FAQ Count",
                "Quick Answer Box",
                "Schema Markup",
                "E-E-A-T Signals",
                "List Elements",
                "Tables",
                "Video Content",
                "References Section",
            ]
        );
    }

    #[test]
    fn rich_content_passes() {
        let r = run_qa_swarm(&rich_contract(), None, None);
        assert_eq!(r.critical_fails, 0);
        assert!(r.passed, "score {} results {:?}", r.score, r.deficiencies());
        assert!(r.results.iter().all(|x| (0.0..=100.0).contains(&x.score)));
    }

    #[test]
    fn critical_failure_blocks_pass_regardless_of_score() {
        let mut c = rich_contract();
        c.html_content = format!("<h1>Title</h1>{}", c.html_content);
        let r = run_qa_swarm(&c, None, None);
        assert_eq!(r.critical_fails, 1);
        assert!(r.score >= PASS_THRESHOLD);
        assert!(!r.passed);
    }

    #[test]
    fn word_count_falls_back_to_html() {
        let mut c = ContentContract::new("t", "s", "<p>one two</p>");
        c.word_count = 0;
        let r = run_qa_swarm(&c, None, None);
        let wc = &r.results[1];
        assert_eq!(wc.status, QaStatus::Failed);
        assert_eq!(wc.feedback, "2 words (minimum: 3,000)");
        assert_eq!(wc.fix_suggestion.as_deref(), Some("Add 2998 more words"));
    }

    #[test]
    fn tables_and_warnings() {
        let c = ContentContract::new("t", "s", "<table></table><ul></ul><ol></ol><ul></ul>");
        let r = run_qa_swarm(&c, None, None);
        let tables = r.results.iter().find(|x| x.agent == "Tables").unwrap();
        assert_eq!(tables.status, QaStatus::Warning);
        assert_eq!(tables.score, 50.0);
        let lists = r.results.iter().find(|x| x.agent == "List Elements").unwrap();
        assert_eq!(lists.status, QaStatus::Warning);
        assert!((lists.score - 60.0).abs() < 1e-9);
        let video = r.results.iter().find(|x| x.agent == "Video Content").unwrap();
        assert_eq!((video.status, video.score), (QaStatus::Warning, 50.0));
    }

    #[test]
    fn optional_coverage_rules_are_appended() {
        let terms = vec![
            NeuronTerm { term: "cushioning".into(), kind: NeuronTermKind::Critical, importance: 1.0, recommended: 3, current: None },
            NeuronTerm { term: "drop".into(), kind: NeuronTermKind::Body, importance: 1.0, recommended: 1, current: None },
        ];
        let gap = EntityGapAnalysis {
            missing_entities: vec!["Nike".into(), "Asics".into()],
            ..Default::default()
        };
        let c = ContentContract::new("t", "s", "<p>Great cushioning from Nike.</p>");
        let r = run_qa_swarm(&c, Some(&gap), Some(&terms));
        assert_eq!(r.results.len(), 17);
        let nt = &r.results[15];
        assert_eq!(nt.agent, "Neuron Term Coverage");
        assert_eq!(nt.score, 50.0);
        assert_eq!(nt.status, QaStatus::Warning);
        let ec = &r.results[16];
        assert_eq!(ec.fix_suggestion.as_deref(), Some("Mention: Asics"));
    }

    #[test]
    fn deficiencies_put_critical_first() {
        let c = ContentContract::new("t", "s", "<h1>x</h1>");
        let r = run_qa_swarm(&c, None, None);
        assert_eq!(r.deficiencies()[0].category, QaCategory::Critical);
    }
}
