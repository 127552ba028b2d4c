use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::llm::{ChatMessage, ChatModel};
use merge::MergedGraph;

const SYSTEM_PROMPT: &str = "You are an assistant that generates user-style questions \
based on the provided knowledge graph in json format \
the output should only be the questions.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    /// Minimum number of questions wanted; `None` accepts whatever comes back
    pub expected_count: Option<usize>,
    /// Total chat calls allowed when fewer than `expected_count` come back
    pub max_attempts: usize,
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            expected_count: None,
            max_attempts: 1,
        }
    }
}

pub struct QuestionGenerator {
    llm: Box<dyn ChatModel>,
    config: QuestionConfig,
}

impl QuestionGenerator {
    pub fn new(llm: impl ChatModel + 'static, config: QuestionConfig) -> Self {
        Self {
            llm: Box::new(llm),
            config,
        }
    }

    /// Ask the model for user-style questions about `summary`.
    ///
    /// The reply is free text split into lines, so the result is best effort.
    /// When `expected_count` is set and not met, the model is asked again with
    /// a reminder, and the longest list seen is returned.
    pub async fn generate(&self, summary: &str) -> Result<Vec<String>> {
        let mut messages = build_messages(summary);
        let mut best: Vec<String> = Vec::new();
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let reply = self.llm.chat(&messages).await
                .context("Failed to generate questions")?;
            let questions = parse_questions(&reply);

            if questions.len() > best.len() {
                best = questions;
            }

            match self.config.expected_count {
                Some(expected) if best.len() < expected => {
                    warn!(attempt, got = best.len(), expected, "Too few questions, re-prompting");
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!(
                        "Please write at least {} questions, one per line, and nothing else.",
                        expected
                    )));
                }
                _ => break,
            }
        }

        info!(questions = best.len(), "Generated questions");
        Ok(best)
    }

    /// Questions about a merged graph, given the model its compact JSON form.
    pub async fn generate_from_graph(&self, graph: &MergedGraph) -> Result<Vec<String>> {
        let serialized = graph.to_compact_json()
            .context("Failed to serialize graph")?;
        self.generate(&serialized).await
    }
}

pub fn build_messages(summary: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Summary:\n{}\n\nQuestions:", summary)),
    ]
}

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+").expect("list marker pattern is valid")
    })
}

/// Split a raw reply into question lines, dropping blanks and list markers.
pub fn parse_questions(reply: &str) -> Vec<String> {
    reply
        .split('\n')
        .map(|line| list_marker().replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use extract::{Node, PartialGraph, Relationship};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_questions_strips_markers_and_blanks() {
        let reply = "1. How do professors use the LMS?\n\n2) What does Blackboard provide?\n- Why do students need AI support?\n   \n* Where do LMS features fall short?";

        let questions = parse_questions(reply);

        assert_eq!(
            questions,
            vec![
                "How do professors use the LMS?",
                "What does Blackboard provide?",
                "Why do students need AI support?",
                "Where do LMS features fall short?",
            ]
        );
    }

    #[test]
    fn test_parse_questions_keeps_unmarked_lines() {
        let questions = parse_questions("Here are some questions:\nIs 2024 the rollout year?");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1], "Is 2024 the rollout year?");
    }

    #[test]
    fn test_messages_match_prompt_format() {
        let messages = build_messages("{\"nodes\": []}");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.ends_with("the output should only be the questions."));
        assert_eq!(messages[1].content, "Summary:\n{\"nodes\": []}\n\nQuestions:");
    }

    /// Replies in order and records every conversation it was sent.
    #[derive(Clone, Default)]
    struct ScriptedChat {
        replies: Arc<Mutex<VecDeque<String>>>,
        calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedChat {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no reply left"))
        }
    }

    fn generator(chat: &ScriptedChat, expected_count: Option<usize>, max_attempts: usize) -> QuestionGenerator {
        QuestionGenerator::new(
            chat.clone(),
            QuestionConfig {
                expected_count,
                max_attempts,
            },
        )
    }

    #[tokio::test]
    async fn test_short_reply_is_reprompted() {
        let chat = ScriptedChat::new(&["1. Who uses the LMS?", "1. Who uses the LMS?\n2. Why?\n3. When?"]);

        let questions = generator(&chat, Some(3), 3).generate("LMS summary").await.unwrap();

        assert_eq!(questions, vec!["Who uses the LMS?", "Why?", "When?"]);

        let calls = chat.calls();
        assert_eq!(calls.len(), 2);
        let second = &calls[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[2], ChatMessage::assistant("1. Who uses the LMS?"));
        assert_eq!(second[3].role, "user");
        assert!(second[3].content.contains("at least 3 questions"));
    }

    #[tokio::test]
    async fn test_longest_list_kept_when_attempts_run_out() {
        let chat = ScriptedChat::new(&["Q1\nQ2", "Q1", "Q3"]);

        let questions = generator(&chat, Some(5), 3).generate("summary").await.unwrap();

        assert_eq!(questions, vec!["Q1", "Q2"]);
        assert_eq!(chat.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_no_expected_count_makes_one_call() {
        let chat = ScriptedChat::new(&["Q1", "Q2\nQ3"]);

        let questions = generator(&chat, None, 3).generate("summary").await.unwrap();

        assert_eq!(questions, vec!["Q1"]);
        assert_eq!(chat.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_error_propagates() {
        let chat = ScriptedChat::new(&[]);

        let err = generator(&chat, None, 1).generate("summary").await.unwrap_err();
        assert!(format!("{:#}", err).contains("no reply left"));
    }

    #[tokio::test]
    async fn test_generate_from_graph_sends_compact_json() {
        let graph = merge::merge_graphs(&[PartialGraph::new(
            vec![Node::new("LMS", "Platform").with_metadata("vendor", "Blackboard")],
            vec![Relationship::new(Node::new("LMS", "Platform"), "USED_BY", Node::new("Professors", "Faculty"))],
        )])
        .unwrap();
        let chat = ScriptedChat::new(&["How do professors use the LMS?"]);

        let questions = generator(&chat, None, 1).generate_from_graph(&graph).await.unwrap();
        assert_eq!(questions, vec!["How do professors use the LMS?"]);

        let prompt = &chat.calls()[0][1].content;
        let expected = format!("Summary:\n{}\n\nQuestions:", graph.to_compact_json().unwrap());
        assert_eq!(prompt, &expected);
        assert!(prompt.contains("\"USED_BY\""));
        assert!(!prompt.contains("Blackboard"));
    }
}
