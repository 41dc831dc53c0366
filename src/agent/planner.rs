use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{AgentGoal, AgentTask, Complexity, ExecutionPlan, RiskLevel, TaskStatus};
use crate::error::LlmError;
use crate::llm::{decode_json, ChatMessage, ChatRequest, DynLlm};

const PLANNER_SYSTEM: &str = "You are an expert AI task planner. Always respond with valid JSON.";
const PLAN_MAX_TOKENS: u32 = 4000;
const DEFAULT_ESTIMATE_MS: u64 = 60_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    tasks: Vec<RawTask>,
    #[serde(default)]
    estimated_duration: Option<u64>,
    #[serde(default)]
    complexity: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    description: String,
    tool_name: String,
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Turns a goal into an ordered task list with one LLM call.
pub struct TaskPlanner {
    llm: DynLlm,
    catalog: String,
}

impl TaskPlanner {
    /// `catalog` is the `- name: description` tool listing shown to the model.
    pub fn new(llm: DynLlm, catalog: String) -> Self {
        Self { llm, catalog }
    }

    pub async fn decompose(&self, goal: &AgentGoal) -> Result<ExecutionPlan, LlmError> {
        tracing::info!(target: "wpo::agent", goal = %goal.description, "planning");
        let req = ChatRequest {
            messages: vec![
                ChatMessage::system(PLANNER_SYSTEM),
                ChatMessage::user(self.prompt(goal)),
            ],
            temperature: 0.3,
            max_tokens: PLAN_MAX_TOKENS,
        };
        let raw = self.llm.complete(&req).await?;
        let plan: RawPlan = decode_json(&raw).inspect_err(|e| {
            tracing::error!(target: "wpo::agent", error = %e, "failed to parse plan");
        })?;

        let tasks: Vec<AgentTask> = plan
            .tasks
            .into_iter()
            .map(|t| AgentTask {
                id: format!("task_{}", Uuid::new_v4().simple()),
                goal_id: goal.id.clone(),
                description: t.description,
                tool_name: t.tool_name,
                parameters: t.parameters,
                dependencies: t.dependencies,
                status: TaskStatus::Pending,
                result: None,
                error: None,
                attempts: 0,
                correction: None,
            })
            .collect();
        tracing::info!(target: "wpo::agent", tasks = tasks.len(), "plan generated");

        Ok(ExecutionPlan {
            goal_id: goal.id.clone(),
            tasks,
            estimated_duration_ms: plan.estimated_duration.unwrap_or(DEFAULT_ESTIMATE_MS),
            complexity: plan
                .complexity
                .as_deref()
                .and_then(Complexity::from_label)
                .unwrap_or_default(),
            risk_level: plan
                .risk_level
                .as_deref()
                .and_then(RiskLevel::from_label)
                .unwrap_or_default(),
        })
    }

    /// Plans again with one `Avoid: <error>` constraint per failed task.
    pub async fn replan(&self, goal: &AgentGoal, failed: &[&AgentTask]) -> Result<ExecutionPlan, LlmError> {
        tracing::info!(target: "wpo::agent", failed = failed.len(), "replanning after failures");
        let mut amended = goal.clone();
        amended.constraints.extend(
            failed
                .iter()
                .map(|t| format!("Avoid: {}", t.error.as_deref().unwrap_or("unknown error"))),
        );
        self.decompose(&amended).await
    }

    fn prompt(&self, goal: &AgentGoal) -> String {
        let bullets = |items: &[String]| {
            if items.is_empty() {
                "- none".to_string()
            } else {
                items.iter().map(|c| format!("- {c}")).collect::<Vec<_>>().join("\n")
            }
        };
        format!(
            "Decompose the following goal into executable tasks.\n\n\
GOAL: {}\n\n\
CONSTRAINTS:\n{}\n\n\
SUCCESS CRITERIA:\n{}\n\n\
AVAILABLE TOOLS:\n{}\n\n\
Create a detailed execution plan with tasks. Each task should use one of the available tools.\n\
Return JSON format:\n\
{{\n  \"tasks\": [\n    {{\n      \"description\": \"Task description\",\n      \"toolName\": \"tool_name\",\n      \"parameters\": {{ }},\n      \"dependencies\": [\"previous_task_ids\"]\n    }}\n  ],\n  \"estimatedDuration\": number_in_ms,\n  \"complexity\": \"simple|moderate|complex|extreme\",\n  \"riskLevel\": \"low|medium|high\"\n}}",
            goal.description,
            bullets(&goal.constraints),
            bullets(&goal.success_criteria),
            self.catalog
        )
    }
}
