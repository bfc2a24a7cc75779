//! Hidden planning pass — advisory intent analysis before a turn.
//!
//! A separate, simpler model call that classifies the request and
//! sketches an execution plan. The orchestration loop is correct without
//! it; hosts opt in per message and surface the plan (or don't). Any
//! failure falls back to a keyword heuristic rather than erroring.

use sidekick_core::backend::{ModelBackend, ModelRequest};
use sidekick_core::message::PromptMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanIntent {
    EditFile,
    CreateFile,
    Explain,
    Refactor,
    Debug,
    #[default]
    Chat,
}

/// An advisory execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub intent: PlanIntent,
    pub target_files: Vec<String>,
    pub steps: Vec<String>,
    pub context_needed: Vec<String>,
    pub reasoning: String,
    /// 0.0–1.0
    pub confidence: f32,
}

/// Editor-state hints fed into the planning prompt.
#[derive(Debug, Clone, Default)]
pub struct PlanningHints {
    pub current_file: Option<String>,
    pub open_files: Vec<String>,
    pub recent_files: Vec<String>,
    pub project_file_count: usize,
}

/// Runs the planning pass.
pub struct Planner {
    backend: Arc<dyn ModelBackend>,
    model: String,
}

/// Loose deserialization target for whatever JSON the model returns.
#[derive(Default, Deserialize)]
struct PlanDraft {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    target_files: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    context_needed: Vec<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: Option<f32>,
}

impl Planner {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Create a plan for the given request. Never fails: a bad model
    /// reply degrades to the keyword fallback.
    pub async fn create_plan(&self, user_input: &str, hints: &PlanningHints) -> Plan {
        let prompt = Self::build_prompt(user_input, hints);
        let request = ModelRequest::new(&self.model, vec![PromptMessage::user(prompt)]);

        match self.backend.complete(request).await {
            Ok(reply) => match Self::parse_plan(&reply.text) {
                Some(plan) => {
                    debug!(intent = ?plan.intent, "Plan created");
                    plan
                }
                None => {
                    debug!("Plan JSON unparseable, using keyword fallback");
                    fallback_plan(user_input)
                }
            },
            Err(e) => {
                debug!("Planning call failed ({e}), using keyword fallback");
                fallback_plan(user_input)
            }
        }
    }

    fn build_prompt(user_input: &str, hints: &PlanningHints) -> String {
        format!(
            "You are a planning agent. Analyze the request and produce an execution plan.\n\n\
             USER REQUEST: \"{user_input}\"\n\n\
             CONTEXT:\n\
             - Current file: {}\n\
             - Open files: {}\n\
             - Recent files: {}\n\
             - Project has {} files\n\n\
             Reply with ONLY a JSON object of this shape, no explanation:\n\
             {{\n\
               \"intent\": \"edit_file\" | \"create_file\" | \"explain\" | \"refactor\" | \"debug\" | \"chat\",\n\
               \"target_files\": [\"...\"],\n\
               \"steps\": [\"...\"],\n\
               \"context_needed\": [\"...\"],\n\
               \"reasoning\": \"...\",\n\
               \"confidence\": 0.9\n\
             }}",
            hints.current_file.as_deref().unwrap_or("none"),
            join_or_none(&hints.open_files),
            join_or_none(&hints.recent_files),
            hints.project_file_count,
        )
    }

    /// Extract the first JSON object from the reply and map it.
    fn parse_plan(text: &str) -> Option<Plan> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }

        let draft: PlanDraft = serde_json::from_str(&text[start..=end]).ok()?;
        Some(Plan {
            intent: draft
                .intent
                .as_deref()
                .and_then(parse_intent)
                .unwrap_or_default(),
            target_files: draft.target_files,
            steps: draft.steps,
            context_needed: draft.context_needed,
            reasoning: draft.reasoning,
            confidence: draft.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        })
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".into()
    } else {
        items.join(", ")
    }
}

fn parse_intent(raw: &str) -> Option<PlanIntent> {
    match raw {
        "edit_file" => Some(PlanIntent::EditFile),
        "create_file" => Some(PlanIntent::CreateFile),
        "explain" => Some(PlanIntent::Explain),
        "refactor" => Some(PlanIntent::Refactor),
        "debug" => Some(PlanIntent::Debug),
        "chat" => Some(PlanIntent::Chat),
        _ => None,
    }
}

/// Keyword-based plan when the model can't be asked or answered badly.
fn fallback_plan(user_input: &str) -> Plan {
    let lower = user_input.to_lowercase();

    let intent = if lower.contains("create") || lower.contains("new file") || lower.contains("add a") {
        PlanIntent::CreateFile
    } else if lower.contains("fix") || lower.contains("debug") || lower.contains("error") {
        PlanIntent::Debug
    } else if lower.contains("refactor") || lower.contains("clean up") {
        PlanIntent::Refactor
    } else if lower.contains("explain") || lower.contains("what does") || lower.contains("how does")
    {
        PlanIntent::Explain
    } else if lower.contains("edit") || lower.contains("change") || lower.contains("update") {
        PlanIntent::EditFile
    } else {
        PlanIntent::Chat
    };

    Plan {
        intent,
        target_files: Vec::new(),
        steps: vec![
            "Analyze the request and the relevant code".into(),
            "Apply the change or compose the answer".into(),
            "Verify the outcome".into(),
        ],
        context_needed: Vec::new(),
        reasoning: "Heuristic fallback plan (planning call unavailable)".into(),
        confidence: 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingBackend, SequentialMockBackend};

    #[tokio::test]
    async fn parses_clean_json_plan() {
        let backend = Arc::new(SequentialMockBackend::single_text(
            r#"{"intent": "edit_file", "target_files": ["src/auth.rs"],
                "steps": ["open the file", "fix the check"],
                "context_needed": ["src/token.rs"],
                "reasoning": "the bug is in auth", "confidence": 0.92}"#,
        ));
        let planner = Planner::new(backend, "m");
        let plan = planner
            .create_plan("fix the login bug", &PlanningHints::default())
            .await;

        assert_eq!(plan.intent, PlanIntent::EditFile);
        assert_eq!(plan.target_files, vec!["src/auth.rs"]);
        assert_eq!(plan.steps.len(), 2);
        assert!((plan.confidence - 0.92).abs() < 1e-6);
    }

    #[tokio::test]
    async fn json_wrapped_in_prose_still_parses() {
        let backend = Arc::new(SequentialMockBackend::single_text(
            "Here's my plan:\n{\"intent\": \"explain\", \"confidence\": 0.7}\nDone.",
        ));
        let planner = Planner::new(backend, "m");
        let plan = planner
            .create_plan("what does this do", &PlanningHints::default())
            .await;
        assert_eq!(plan.intent, PlanIntent::Explain);
    }

    #[tokio::test]
    async fn garbage_reply_falls_back_to_keywords() {
        let backend = Arc::new(SequentialMockBackend::single_text("no json here"));
        let planner = Planner::new(backend, "m");
        let plan = planner
            .create_plan("please refactor this module", &PlanningHints::default())
            .await;
        assert_eq!(plan.intent, PlanIntent::Refactor);
        assert!((plan.confidence - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn backend_failure_falls_back() {
        let backend = Arc::new(FailingBackend::unreachable());
        let planner = Planner::new(backend, "m");
        let plan = planner
            .create_plan("create a new config file", &PlanningHints::default())
            .await;
        assert_eq!(plan.intent, PlanIntent::CreateFile);
    }

    #[tokio::test]
    async fn unknown_intent_defaults_to_chat() {
        let backend = Arc::new(SequentialMockBackend::single_text(
            r#"{"intent": "world_domination", "confidence": 1.0}"#,
        ));
        let planner = Planner::new(backend, "m");
        let plan = planner.create_plan("hello", &PlanningHints::default()).await;
        assert_eq!(plan.intent, PlanIntent::Chat);
    }

    #[tokio::test]
    async fn hints_appear_in_prompt() {
        let backend = Arc::new(SequentialMockBackend::single_text("{}"));
        let planner = Planner::new(backend.clone(), "m");
        let hints = PlanningHints {
            current_file: Some("src/main.rs".into()),
            open_files: vec!["a.rs".into(), "b.rs".into()],
            recent_files: vec![],
            project_file_count: 42,
        };
        let _ = planner.create_plan("do things", &hints).await;
        let prompt = backend.requests()[0].messages[0].content.clone();
        assert!(prompt.contains("src/main.rs"));
        assert!(prompt.contains("a.rs, b.rs"));
        assert!(prompt.contains("42 files"));
    }
}
