//! Strips leaked reasoning markers from answer text.

use regex::Regex;
use std::sync::OnceLock;

fn reasoning_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)```[ \t]*(?:thoughts?|chain[- ]?of[- ]?thought|analysis)\b.*?```")
            .expect("reasoning fence pattern is valid")
    })
}

fn reasoning_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?:thoughts?|reasoning|analysis):[^\n]*(?:\n|$)")
            .expect("reasoning line pattern is valid")
    })
}

/// Remove `Thought:`/`Reasoning:`/`Analysis:` lines and reasoning-labelled
/// code fences, then trim.
///
/// Only matches at line start or on a fence label, so prose such as
/// "my reasoning: ..." mid-sentence is left alone. Repeats until nothing
/// changes, which makes the result idempotent.
pub fn sanitize_answer(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let without_fences = reasoning_fence().replace_all(&current, "");
        let without_lines = reasoning_line().replace_all(&without_fences, "");
        let next = without_lines.trim();
        if next == current {
            return current;
        }
        current = next.to_string();
    }
}
