//! Reasoning ("thinking") segment handling.
//!
//! DeepSeek-style models emit their deliberation first and close it with a
//! bare `</think>` tag. There is no opening tag, so everything before the
//! first closing tag is reasoning and everything after it is the answer.

/// Closing tag that ends the reasoning segment.
pub const THINK_CLOSE_TAG: &str = "</think>";

/// Model-name fragments that mark a model as emitting reasoning.
pub const DEFAULT_REASONING_MARKERS: &[&str] = &["deepseek", "think"];

/// Split a complete reply into `(reasoning, answer)`.
///
/// Without a closing tag the whole text is the answer and is returned as-is.
/// With one, both halves are trimmed. Only the first tag counts; a tag-like
/// string inside the answer is left untouched.
pub fn split_thinking(content: Option<&str>) -> (String, String) {
    let Some(content) = content else {
        return (String::new(), String::new());
    };

    match content.split_once(THINK_CLOSE_TAG) {
        Some((thinking, answer)) => (thinking.trim().to_string(), answer.trim().to_string()),
        None => (String::new(), content.to_string()),
    }
}

/// Decides which models get reasoning extraction.
///
/// Matching is a case-insensitive substring test on the model id. This is a
/// naming heuristic: a model that reasons but is not named accordingly is
/// passed through untouched, and a model whose name happens to contain a
/// marker gets buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningPolicy {
    markers: Vec<String>,
}

impl ReasoningPolicy {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn is_reasoning_capable(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.markers.iter().any(|m| model.contains(m.as_str()))
    }
}

impl Default for ReasoningPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REASONING_MARKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_tag_is_all_answer() {
        let (thinking, answer) = split_thinking(Some("  plain answer \n"));
        assert_eq!(thinking, "");
        assert_eq!(answer, "  plain answer \n");
    }

    #[test]
    fn splits_at_tag_and_trims_both_sides() {
        let (thinking, answer) =
            split_thinking(Some("\nLet me add them.\n</think>\n\nThe answer is 4."));
        assert_eq!(thinking, "Let me add them.");
        assert_eq!(answer, "The answer is 4.");
    }

    #[test]
    fn only_first_tag_counts() {
        let (thinking, answer) = split_thinking(Some("a</think>b</think>c"));
        assert_eq!(thinking, "a");
        assert_eq!(answer, "b</think>c");
    }

    #[test]
    fn empty_and_missing_input() {
        assert_eq!(split_thinking(None), (String::new(), String::new()));
        assert_eq!(split_thinking(Some("")), (String::new(), String::new()));
    }

    #[test]
    fn tag_at_edges() {
        assert_eq!(
            split_thinking(Some("</think>answer")),
            (String::new(), "answer".to_string())
        );
        assert_eq!(
            split_thinking(Some("reasoning</think>")),
            ("reasoning".to_string(), String::new())
        );
    }

    #[test]
    fn default_policy_matches_case_insensitively() {
        let policy = ReasoningPolicy::default();
        assert!(policy.is_reasoning_capable("deepseek-ai/DeepSeek-R1"));
        assert!(policy.is_reasoning_capable("Qwen/QwQ-32B-Thinking"));
        assert!(!policy.is_reasoning_capable("meta-llama/Llama-3.1-8B-Instruct"));
    }

    #[test]
    fn custom_markers_ignore_blanks() {
        let policy = ReasoningPolicy::new(["  QwQ ", "", " "]);
        assert_eq!(policy.markers(), ["qwq".to_string()]);
        assert!(policy.is_reasoning_capable("Qwen/QwQ-32B"));
        assert!(!policy.is_reasoning_capable("deepseek-ai/DeepSeek-R1"));
    }
}
