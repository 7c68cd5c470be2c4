//! Generation prompt built from the largest clusters.

use crate::clustering::Cluster;
use crate::config::SynthesisConfig;
use crate::constants::truncate_chars;

/// One block per cluster (largest first, capped), then the output contract.
pub fn build_prompt(clusters: &[Cluster], cfg: &SynthesisConfig) -> String {
    let mut blocks = Vec::new();
    for (i, cluster) in clusters.iter().take(cfg.max_prompt_clusters).enumerate() {
        let keywords: Vec<&str> = cluster
            .keywords
            .iter()
            .take(cfg.prompt_keywords)
            .map(|k| k.as_str())
            .collect();
        let examples: Vec<String> = cluster
            .representative_texts
            .iter()
            .take(cfg.prompt_examples)
            .map(|text| format!("  - {}", example(text, cfg.example_chars)))
            .collect();

        blocks.push(format!(
            "Cluster {} ({} messages)\nKeywords: {}\nSample messages:\n{}",
            i + 1,
            cluster.size,
            keywords.join(", "),
            examples.join("\n"),
        ));
    }

    format!(
        r#"You analyze discussions in a group chat. Messages were grouped into clusters by meaning. Name the main topics being discussed.

{clusters}

## Output format (JSON only, no markdown, no explanation)
[{{"title": "...", "summary": "..."}}]

## Rules
- Return 3 to {max_topics} topics, most discussed first.
- Title: 2 to {max_words} words naming the subject.
- Summary: one sentence, {min_chars} to {max_chars} characters.
- Write in {language}.
- No duplicate or overlapping topics."#,
        clusters = blocks.join("\n\n"),
        max_topics = cfg.max_topics,
        max_words = cfg.max_title_words,
        min_chars = cfg.min_summary_chars,
        max_chars = cfg.max_summary_chars,
        language = cfg.language,
    )
}

/// Truncate to `max_chars` characters, marking the cut with `...`.
fn example(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() < text.len() {
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}
