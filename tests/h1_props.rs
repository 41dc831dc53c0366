// tests/h1_props.rs
use proptest::prelude::*;

use wp_optimizer_pro::seo::calculate_seo_metrics;
use wp_optimizer_pro::text::{count_words, remove_all_h1_tags, validate_no_h1};

const FRAGMENTS: &[&str] = &[
    "<h1>", "</h1>", "<H1 class=\"hero\">", "<h1/>", "<h1 id=x />", "</H1>", "<p>body copy</p>",
    "<h2>Section</h2>", "\n", "\n\n\n\n", " ", "plain words", "h1", "<div>", "</div>", "<h1x>",
];

fn fragment_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..24).prop_map(|parts| parts.concat())
}

fn headings(tag: &str, n: usize) -> String {
    (0..n).map(|i| format!("<{tag}>Heading {i}</{tag}>")).collect()
}

fn expected_structure(h1: usize, h2: usize, h3: usize) -> u32 {
    if h1 > 0 {
        60u32.saturating_sub(20 * h1 as u32)
    } else if h2 >= 5 && h3 >= 10 {
        100
    } else if h2 >= 3 {
        80
    } else {
        60
    }
}

proptest! {
    #![proptest_config(ProptestConfig { max_global_rejects: 65536, ..ProptestConfig::with_cases(256) })]

    #[test]
    fn removal_is_total_and_idempotent(html in fragment_soup()) {
        let once = remove_all_h1_tags(&html);
        prop_assert!(!once.to_lowercase().contains("<h1"), "left an h1 in {:?}", once);
        prop_assert!(validate_no_h1(&once).valid);
        prop_assert_eq!(remove_all_h1_tags(&once), once);
    }

    #[test]
    fn input_without_h1_is_returned_verbatim(html in fragment_soup()) {
        prop_assume!(!html.to_lowercase().contains("<h1"));
        prop_assert_eq!(remove_all_h1_tags(&html), html);
    }

    #[test]
    fn heading_structure_matches_counts(h1 in 0usize..5, h2 in 0usize..9, h3 in 0usize..14) {
        let html = format!("{}{}{}", headings("h1", h1), headings("h2", h2), headings("h3", h3));
        let m = calculate_seo_metrics(&html, "Title", "slug");
        prop_assert_eq!(m.h2_count, h2);
        prop_assert_eq!(m.h3_count, h3);
        prop_assert_eq!(m.heading_structure, expected_structure(h1, h2, h3));
    }
}

#[test]
fn seven_h2_and_twenty_h3_score_full_marks() {
    let html = format!("{}{}", headings("h2", 7), headings("h3", 20));
    assert_eq!(calculate_seo_metrics(&html, "t", "s").heading_structure, 100);
}

#[test]
fn words_are_counted_across_tags() {
    assert_eq!(count_words("<p>Hello world</p>"), 2);
    assert_eq!(count_words("<p>one</p><p>two</p>three"), 3);
    assert_eq!(count_words(""), 0);
}
