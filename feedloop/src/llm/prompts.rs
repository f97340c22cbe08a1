//! Prompt assembly for grounded, feedback-aware answers.
//!
//! Rendering is a pure function of its inputs: no clock, no randomness, no
//! hidden state. The same context always yields byte-identical output.

use chrono::SecondsFormat;

use crate::feedback::ApplicabilityFilter;
use crate::models::{
    ChatMessage, ChatRole, FeedbackSnippet, RetrievedFeedback, SourceDocument, UserRole,
};

pub const SYSTEM_INSTRUCTION: &str = "You are an AI assistant helping a logistics company answer questions based on internal documents and user feedback.
User feedback captures corrections from subject matter experts. When a feedback entry applies to the question it is authoritative; otherwise stay coherent with the retrieved documents.
When multiple feedback entries conflict, prefer the one provided by the highest weighted role.
Roles have the following priority from lowest to highest authority: driver, manager, owner.";

pub const ANSWER_INSTRUCTIONS: &str = "Instructions: Treat the applicable user feedback as the authoritative source and let it override conflicting document content. Where no feedback applies, stay consistent with the retrieved documents. Answer concisely and reference the relevant operational details.";

pub const NO_HISTORY: &str = "No previous conversation.";
pub const NO_DOCUMENTS: &str = "No retrieved documents.";
pub const NO_FEEDBACK: &str = "No applicable feedback for this question.";

/// Everything a prompt is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub query: &'a str,
    pub documents: &'a [SourceDocument],
    pub history: &'a [ChatMessage],
    pub candidates: &'a [RetrievedFeedback],
    pub user_role: UserRole,
    pub filter: ApplicabilityFilter,
}

/// The prompt and the feedback that made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub prompt: String,
    pub applied_feedback: Vec<FeedbackSnippet>,
}

/// Run the applicability filter over the candidates and render the prompt.
///
/// # Example
/// ```
/// use feedloop::feedback::ApplicabilityFilter;
/// use feedloop::llm::prompts::{build_prompt, PromptContext, NO_DOCUMENTS};
/// use feedloop::models::UserRole;
///
/// let rendered = build_prompt(&PromptContext {
///     query: "What is the fuel surcharge policy?",
///     documents: &[],
///     history: &[],
///     candidates: &[],
///     user_role: UserRole::Driver,
///     filter: ApplicabilityFilter::default(),
/// });
/// assert!(rendered.prompt.contains(NO_DOCUMENTS));
/// assert!(rendered.applied_feedback.is_empty());
/// ```
pub fn build_prompt(ctx: &PromptContext<'_>) -> RenderedPrompt {
    let applied_feedback = ctx.filter.select(ctx.query, ctx.documents, ctx.candidates);

    let prompt = [
        SYSTEM_INSTRUCTION.to_string(),
        format!(
            "The active user role is {} with weight {}.",
            ctx.user_role,
            ctx.user_role.weight()
        ),
        "Chat history:".to_string(),
        format_history(ctx.history),
        "\nRetrieved documents:".to_string(),
        format_documents(ctx.documents),
        "\nApplicable user feedback (highest priority first):".to_string(),
        format_feedback(&applied_feedback),
        format!("\n{ANSWER_INSTRUCTIONS}"),
        format!("\nUser question: {}", ctx.query),
    ]
    .join("\n");

    RenderedPrompt {
        prompt,
        applied_feedback,
    }
}

pub fn format_history(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    history
        .iter()
        .map(|message| {
            let prefix = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{prefix}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_documents(documents: &[SourceDocument]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS.to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, document)| {
            let index = i + 1;
            let source = document
                .source
                .clone()
                .unwrap_or_else(|| format!("chunk-{index}"));
            format!("Document {index} (source: {source})\n{}", document.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_feedback(feedback: &[FeedbackSnippet]) -> String {
    if feedback.is_empty() {
        return NO_FEEDBACK.to_string();
    }
    feedback
        .iter()
        .map(|snippet| {
            [
                format!(
                    "Role: {} (weight {}, score {:.2})",
                    snippet.user_role, snippet.weight, snippet.score
                ),
                format!(
                    "Submitted at: {}",
                    snippet.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                ),
                format!("Original query: {}", snippet.query),
                "Updated response:".to_string(),
                snippet.updated_response.clone(),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackEntry;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn owner_feedback() -> RetrievedFeedback {
        let mut entry = FeedbackEntry::new(
            "fuel surcharge rules",
            "Fuel surcharge applies above 500 miles",
            "Fuel surcharge applies above 400 miles as of policy update",
            UserRole::Owner,
        );
        entry.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        RetrievedFeedback {
            entry,
            score: 1.45,
            weight: 3,
        }
    }

    fn fuel_document() -> SourceDocument {
        SourceDocument {
            source: Some("policies.md".to_string()),
            content: "The fuel surcharge applies above 500 miles.".to_string(),
            score: Some(0.4),
        }
    }

    #[test]
    fn test_section_order_and_placeholders() {
        let rendered = build_prompt(&PromptContext {
            query: "Where do I park?",
            documents: &[],
            history: &[],
            candidates: &[],
            user_role: UserRole::Manager,
            filter: ApplicabilityFilter::default(),
        });

        let expected = [
            SYSTEM_INSTRUCTION,
            "The active user role is manager with weight 2.",
            "Chat history:",
            NO_HISTORY,
            "\nRetrieved documents:",
            NO_DOCUMENTS,
            "\nApplicable user feedback (highest priority first):",
            NO_FEEDBACK,
            format!("\n{ANSWER_INSTRUCTIONS}").as_str(),
            "\nUser question: Where do I park?",
        ]
        .join("\n");

        assert_eq!(rendered.prompt, expected);
        assert!(rendered.applied_feedback.is_empty());
    }

    #[test]
    fn test_applied_feedback_is_rendered() {
        let documents = vec![fuel_document()];
        let candidates = vec![owner_feedback()];
        let rendered = build_prompt(&PromptContext {
            query: "What is the fuel surcharge policy?",
            documents: &documents,
            history: &[],
            candidates: &candidates,
            user_role: UserRole::Driver,
            filter: ApplicabilityFilter::default(),
        });

        assert_eq!(rendered.applied_feedback.len(), 1);
        assert!(rendered.prompt.contains(
            "Role: owner (weight 3, score 1.45)\nSubmitted at: 2024-03-01T09:30:00Z\nOriginal query: fuel surcharge rules\nUpdated response:\nFuel surcharge applies above 400 miles as of policy update"
        ));
        assert!(!rendered.prompt.contains(NO_FEEDBACK));
        assert!(rendered.prompt.ends_with("User question: What is the fuel surcharge policy?"));
    }

    #[test]
    fn test_documents_fall_back_to_chunk_labels() {
        let documents = vec![
            SourceDocument {
                source: None,
                content: "first".to_string(),
                score: None,
            },
            fuel_document(),
            SourceDocument {
                source: None,
                content: "third".to_string(),
                score: None,
            },
        ];

        assert_eq!(
            format_documents(&documents),
            "Document 1 (source: chunk-1)\nfirst\n\nDocument 2 (source: policies.md)\nThe fuel surcharge applies above 500 miles.\n\nDocument 3 (source: chunk-3)\nthird"
        );
    }

    #[test]
    fn test_history_formatting() {
        let history = vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello, how can I help?"),
        ];
        assert_eq!(
            format_history(&history),
            "User: Hi\nAssistant: Hello, how can I help?"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let documents = vec![fuel_document()];
        let candidates = vec![owner_feedback()];
        let history = vec![ChatMessage::user("earlier question")];
        let ctx = PromptContext {
            query: "What is the fuel surcharge policy?",
            documents: &documents,
            history: &history,
            candidates: &candidates,
            user_role: UserRole::Owner,
            filter: ApplicabilityFilter::default(),
        };

        let first = build_prompt(&ctx);
        let second = build_prompt(&ctx);
        assert_eq!(first, second);
        assert_eq!(first.prompt.as_bytes(), second.prompt.as_bytes());
    }

    #[test]
    fn test_applied_feedback_matches_filter() {
        let documents = vec![fuel_document()];
        let candidates = vec![owner_feedback()];
        let filter = ApplicabilityFilter::default();
        let query = "What is the fuel surcharge policy?";

        let rendered = build_prompt(&PromptContext {
            query,
            documents: &documents,
            history: &[],
            candidates: &candidates,
            user_role: UserRole::Driver,
            filter,
        });

        assert_eq!(
            rendered.applied_feedback,
            filter.select(query, &documents, &candidates)
        );
    }
}
