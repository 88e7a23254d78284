use std::collections::BTreeMap;

use natal_telemetry::{read_jsonl, Paths, TurnRecord};

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let turns: Vec<TurnRecord> = read_jsonl(&paths.turns_file())?;
    println!("{}", build_report(&turns));
    Ok(())
}

fn build_report(turns: &[TurnRecord]) -> String {
    if turns.is_empty() {
        return "No turns recorded yet (set \"telemetry\": true in config.json).".to_string();
    }

    let mut sections = Vec::new();

    // Section 1: Summary
    let total_tokens: usize = turns.iter().map(|t| t.estimated_tokens).sum();
    let hits: usize = turns.iter().map(|t| t.summary_hits.len()).sum();
    let misses: usize = turns.iter().map(|t| t.summary_misses.len()).sum();
    let hit_rate = if hits + misses > 0 {
        hits as f64 / (hits + misses) as f64
    } else {
        0.0
    };
    sections.push(format!(
        "Context Report\n==============\n\
         Total turns: {}\nSubjects: {}\n\
         Average context: {} tokens\n\
         Summary hit rate: {:.1}% ({} hits, {} misses)",
        turns.len(),
        subject_count(turns),
        total_tokens / turns.len(),
        hit_rate * 100.0,
        hits,
        misses
    ));

    // Section 2: Window
    let mut sizes: Vec<usize> = turns.iter().map(|t| t.window_messages).collect();
    sizes.sort_unstable();
    let with_digest = turns.iter().filter(|t| t.has_digest).count();
    sections.push(format!(
        "\nConversation Window\n-------------------\n\
         Median window: {} messages | Max: {}\n\
         Turns with digest: {}/{} ({:.0}%)",
        sizes[sizes.len() / 2],
        sizes[sizes.len() - 1],
        with_digest,
        turns.len(),
        with_digest as f64 / turns.len() as f64 * 100.0
    ));

    // Section 3: Per-key cache behaviour
    let leaderboard = build_key_leaderboard(turns);
    if !leaderboard.is_empty() {
        sections.push(format!("\nTopic Keys\n----------\n{}", leaderboard));
    }

    sections.join("\n")
}

fn subject_count(turns: &[TurnRecord]) -> usize {
    let mut subjects: Vec<&str> = turns.iter().map(|t| t.subject_id.as_str()).collect();
    subjects.sort_unstable();
    subjects.dedup();
    subjects.len()
}

fn build_key_leaderboard(turns: &[TurnRecord]) -> String {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for t in turns {
        for key in &t.summary_hits {
            counts.entry(key.as_str()).or_default().0 += 1;
        }
        for key in &t.summary_misses {
            counts.entry(key.as_str()).or_default().1 += 1;
        }
    }

    let mut keys: Vec<_> = counts.into_iter().collect();
    keys.sort_by_key(|(_, (hit, miss))| std::cmp::Reverse(hit + miss));

    keys.iter()
        .map(|(key, (hit, miss))| {
            format!(
                "  {:<10} requested:{} hits:{} misses:{} hit rate:{:.0}%",
                key,
                hit + miss,
                hit,
                miss,
                *hit as f64 / (hit + miss) as f64 * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turn(subject: &str, hits: &[&str], misses: &[&str], window: usize, digest: bool) -> TurnRecord {
        TurnRecord {
            subject_id: subject.to_string(),
            timestamp: Utc::now(),
            summary_hits: hits.iter().map(|s| s.to_string()).collect(),
            summary_misses: misses.iter().map(|s| s.to_string()).collect(),
            window_messages: window,
            estimated_tokens: 800,
            has_digest: digest,
        }
    }

    fn sample_turns() -> Vec<TurnRecord> {
        vec![
            turn("a", &[], &["planets", "dasha"], 0, false),
            turn("a", &["planets", "dasha"], &[], 2, false),
            turn("b", &["planets"], &["yogas"], 18, true),
        ]
    }

    #[test]
    fn test_build_report_has_sections() {
        let report = build_report(&sample_turns());
        assert!(report.contains("Context Report"));
        assert!(report.contains("Subjects: 2"));
        assert!(report.contains("Summary hit rate: 50.0% (3 hits, 3 misses)"));
        assert!(report.contains("Turns with digest: 1/3"));
        assert!(report.contains("Topic Keys"));
    }

    #[test]
    fn test_build_report_empty() {
        assert!(build_report(&[]).contains("No turns"));
    }

    #[test]
    fn test_key_leaderboard_sorted_by_requests() {
        let leaderboard = build_key_leaderboard(&sample_turns());
        let first = leaderboard.lines().next().unwrap();
        assert!(first.trim_start().starts_with("planets"));
        assert!(first.contains("requested:3 hits:2 misses:1"));
    }
}
