//! Goal-driven agent: plan with one LLM call, then work the task list in a
//! reason → act loop with self-correction, a single replan and an optional
//! reflection pass at the end.

pub mod planner;
pub mod tools;

pub use planner::TaskPlanner;
pub use tools::{AgentWorkspace, ToolKind, ToolRegistry, ToolServices};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AgentError, LlmError};
use crate::llm::{decode_json, ChatMessage, ChatRequest, DynLlm};
use crate::memory::EpisodicMemory;

const AGENT_SYSTEM: &str = "You are an expert autonomous agent. Always respond with valid JSON.";
const AGENT_MAX_TOKENS: u32 = 2000;
const DEFAULT_THOUGHT_CONFIDENCE: f64 = 0.8;
const FALLBACK_CONFIDENCE: f64 = 0.5;

// ------------------------------------------------------------
// Configuration
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_retries: u32,
    /// Below this, the reasoning step's tool choice is ignored in favour of
    /// the planned tool.
    pub confidence_threshold: f64,
    pub timeout_ms: u64,
    pub enable_reflection: bool,
    pub enable_self_correction: bool,
    pub step_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_retries: 3,
            confidence_threshold: 0.7,
            timeout_ms: 300_000,
            enable_reflection: true,
            enable_self_correction: true,
            step_delay_ms: 100,
        }
    }
}

// ------------------------------------------------------------
// Run records
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGoal {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl AgentGoal {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: format!("goal_{}", Uuid::new_v4().simple()),
            description: description.into(),
            constraints: Vec::new(),
            success_criteria: Vec::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_constraint(mut self, c: impl Into<String>) -> Self {
        self.constraints.push(c.into());
        self
    }

    pub fn with_success_criterion(mut self, c: impl Into<String>) -> Self {
        self.success_criteria.push(c.into());
        self
    }

    pub fn with_priority(mut self, p: Priority) -> Self {
        self.priority = p;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    pub id: String,
    pub goal_id: String,
    pub description: String,
    pub tool_name: String,
    pub parameters: Value,
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
    /// Latest self-correction advice, fed into the next reasoning prompt.
    pub correction: Option<String>,
}

impl AgentTask {
    pub fn new(goal_id: &str, description: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: format!("task_{}", Uuid::new_v4().simple()),
            goal_id: goal_id.to_string(),
            description: description.into(),
            tool_name: tool_name.into(),
            parameters: Value::Null,
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            correction: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    pub id: String,
    pub task_id: String,
    pub reasoning: String,
    /// Tool the reasoning step picked.
    pub action: String,
    pub expected_outcome: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
    Extreme,
}

impl Complexity {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "moderate" => Some(Self::Moderate),
            "complex" => Some(Self::Complex),
            "extreme" => Some(Self::Extreme),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub goal_id: String,
    pub tasks: Vec<AgentTask>,
    pub estimated_duration_ms: u64,
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reflection {
    pub learnings: Vec<String>,
    pub improvements: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub success_rate: f64,
    pub total_thoughts: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub goal: AgentGoal,
    pub status: AgentStatus,
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
    /// Every task seen during the run, including ones superseded by a replan.
    pub tasks: Vec<AgentTask>,
    pub thoughts: Vec<AgentThought>,
    pub replanned: bool,
    pub timed_out: bool,
    pub iterations: usize,
    pub reflection: Option<Reflection>,
    pub metrics: AgentMetrics,
}

impl AgentRun {
    pub fn tasks_with(&self, status: TaskStatus) -> impl Iterator<Item = &AgentTask> {
        self.tasks.iter().filter(move |t| t.status == status)
    }
}

// ------------------------------------------------------------
// Agent
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ReasoningReply {
    reasoning: String,
    #[serde(rename = "toolToUse")]
    tool_to_use: String,
    #[serde(default, rename = "expectedOutcome")]
    expected_outcome: String,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct AutonomousAgent {
    llm: DynLlm,
    planner: TaskPlanner,
    registry: ToolRegistry,
    config: AgentConfig,
    episodes: Option<Arc<EpisodicMemory>>,
}

impl AutonomousAgent {
    pub fn new(llm: DynLlm, registry: ToolRegistry, config: AgentConfig) -> Self {
        let planner = TaskPlanner::new(llm.clone(), registry.catalog());
        Self {
            llm,
            planner,
            registry,
            config,
            episodes: None,
        }
    }

    pub fn with_episodic_memory(mut self, memory: Arc<EpisodicMemory>) -> Self {
        self.episodes = Some(memory);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Works toward `goal`, mutating `ws`. LLM failures while planning or
    /// reasoning abort the run; tool failures end up in the returned run.
    pub async fn pursue(&self, goal: AgentGoal, ws: &mut AgentWorkspace) -> Result<AgentRun, AgentError> {
        if goal.description.trim().is_empty() {
            return Err(AgentError::EmptyGoal);
        }
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.timeout_ms);
        tracing::info!(target: "wpo::agent", goal_id = %goal.id, goal = %goal.description, "pursuing goal");
        if let Some(ep) = &self.episodes {
            ep.start_episode(&goal.description);
        }

        let plan = match self.planner.decompose(&goal).await {
            Ok(p) => p,
            Err(e) => {
                if let Some(ep) = &self.episodes {
                    ep.record_action("plan", &format!("failed: {e}"));
                    ep.end_episode();
                }
                return Err(AgentError::Planning(e));
            }
        };
        tracing::info!(
            target: "wpo::agent",
            tasks = plan.tasks.len(),
            complexity = ?plan.complexity,
            risk = ?plan.risk_level,
            "plan ready"
        );

        let mut complexity = plan.complexity;
        let mut risk_level = plan.risk_level;
        let mut tasks = plan.tasks;
        let mut thoughts: Vec<AgentThought> = Vec::new();
        let mut replanned = false;
        let mut timed_out = false;
        let mut iterations = 0;

        loop {
            let Some(idx) = tasks.iter().position(|t| t.status == TaskStatus::Pending) else {
                tracing::info!(target: "wpo::agent", "all tasks settled");
                break;
            };
            if iterations >= self.config.max_iterations {
                tracing::warn!(target: "wpo::agent", iterations, "iteration limit reached");
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(target: "wpo::agent", timeout_ms = self.config.timeout_ms, "agent timed out");
                timed_out = true;
                break;
            }
            iterations += 1;

            tasks[idx].status = TaskStatus::Running;
            let thought = match self.reason(&tasks[idx]).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(target: "wpo::agent", task = %tasks[idx].description, error = %e, "reasoning failed; aborting run");
                    if let Some(ep) = &self.episodes {
                        ep.record_action("reason", &format!("failed: {e}"));
                        ep.end_episode();
                    }
                    return Err(AgentError::Reasoning(e));
                }
            };
            let tool = if thought.confidence >= self.config.confidence_threshold {
                thought.action.clone()
            } else {
                tasks[idx].tool_name.clone()
            };
            thoughts.push(thought);

            tasks[idx].attempts += 1;
            let params = tasks[idx].parameters.clone();
            match self.registry.execute(&tool, &params, ws).await {
                Ok(value) => {
                    let task = &mut tasks[idx];
                    task.status = TaskStatus::Completed;
                    task.result = Some(value);
                    task.error = None;
                    counter!("wpo_agent_tasks_total", "status" => "completed").increment(1);
                    tracing::info!(target: "wpo::agent", task = %task.description, %tool, "task completed");
                    if let Some(ep) = &self.episodes {
                        ep.record_action(&tool, "completed");
                    }
                }
                Err(e) => {
                    let msg = e.to_string();
                    if let Some(ep) = &self.episodes {
                        ep.record_action(&tool, &format!("failed: {msg}"));
                    }
                    let retries_used = tasks[idx].attempts - 1;
                    if self.config.enable_self_correction && retries_used < self.config.max_retries {
                        tracing::warn!(
                            target: "wpo::agent",
                            task = %tasks[idx].description,
                            retry = retries_used + 1,
                            max = self.config.max_retries,
                            error = %msg,
                            "task failed; self-correcting"
                        );
                        let advice = self.self_correct(&tasks[idx], &msg, thoughts.last()).await;
                        let task = &mut tasks[idx];
                        task.correction = advice.or(task.correction.take());
                        task.error = Some(msg);
                        task.status = TaskStatus::Pending;
                    } else {
                        tasks[idx].status = TaskStatus::Failed;
                        tasks[idx].error = Some(msg.clone());
                        counter!("wpo_agent_tasks_total", "status" => "failed").increment(1);
                        tracing::error!(target: "wpo::agent", task = %tasks[idx].description, error = %msg, "task failed");

                        if self.config.enable_reflection && !replanned {
                            replanned = true;
                            let outcome = {
                                let failed: Vec<&AgentTask> =
                                    tasks.iter().filter(|t| t.status == TaskStatus::Failed).collect();
                                self.planner.replan(&goal, &failed).await
                            };
                            match outcome {
                                Ok(next) => {
                                    for t in tasks.iter_mut().filter(|t| t.status == TaskStatus::Pending) {
                                        t.status = TaskStatus::Skipped;
                                    }
                                    complexity = next.complexity;
                                    risk_level = next.risk_level;
                                    tasks.extend(next.tasks);
                                }
                                Err(e) => {
                                    tracing::warn!(target: "wpo::agent", error = %e, "replanning failed; continuing with current plan");
                                }
                            }
                        }
                    }
                }
            }

            if self.config.step_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.step_delay_ms)).await;
            }
        }

        for t in tasks.iter_mut().filter(|t| t.status == TaskStatus::Pending) {
            t.status = TaskStatus::Skipped;
            counter!("wpo_agent_tasks_total", "status" => "skipped").increment(1);
        }

        let metrics = compute_metrics(&tasks, thoughts.len(), started.elapsed());
        let reflection = if self.config.enable_reflection {
            self.reflect(&tasks, &thoughts, &metrics).await
        } else {
            None
        };

        if let Some(ep) = &self.episodes {
            for learning in reflection.iter().flat_map(|r| r.learnings.iter()) {
                ep.add_learning(learning);
            }
            ep.end_episode();
        }

        let status = if metrics.failed_tasks == 0 && !timed_out {
            AgentStatus::Completed
        } else {
            AgentStatus::Failed
        };
        tracing::info!(
            target: "wpo::agent",
            goal_id = %goal.id,
            status = ?status,
            completed = metrics.completed_tasks,
            failed = metrics.failed_tasks,
            duration_ms = metrics.duration_ms,
            "goal finished"
        );

        Ok(AgentRun {
            goal,
            status,
            complexity,
            risk_level,
            tasks,
            thoughts,
            replanned,
            timed_out,
            iterations,
            reflection,
            metrics,
        })
    }

    async fn ask(&self, prompt: String) -> Result<String, LlmError> {
        let req = ChatRequest {
            messages: vec![ChatMessage::system(AGENT_SYSTEM), ChatMessage::user(prompt)],
            temperature: 0.3,
            max_tokens: AGENT_MAX_TOKENS,
        };
        self.llm.complete(&req).await
    }

    /// A reply that is not the expected JSON becomes a low-confidence thought
    /// carrying the raw text. Any other LLM error is returned.
    async fn reason(&self, task: &AgentTask) -> Result<AgentThought, LlmError> {
        let deps = if task.dependencies.is_empty() {
            "none".to_string()
        } else {
            task.dependencies.join(", ")
        };
        let correction = task
            .correction
            .as_deref()
            .map(|c| format!("Previous attempt failed ({}). Correction advice: {c}\n\n", task.error.as_deref().unwrap_or("unknown")))
            .unwrap_or_default();
        let prompt = format!(
            "Task: {}\nPlanned tool: {}\nParameters: {}\nDependencies: {deps}\n\n{correction}Available tools:\n{}\n\n\
Reason step by step about how to accomplish this task.\n\
Respond with JSON: {{ \"reasoning\": \"...\", \"toolToUse\": \"tool_name\", \"expectedOutcome\": \"...\", \"confidence\": 0.0-1.0 }}",
            task.description,
            task.tool_name,
            task.parameters,
            self.registry.catalog()
        );

        let base = |reasoning: String, action: String, expected: String, confidence: f64| AgentThought {
            id: format!("thought_{}", Uuid::new_v4().simple()),
            task_id: task.id.clone(),
            reasoning,
            action,
            expected_outcome: expected,
            confidence,
            timestamp: Utc::now(),
        };

        match self.ask(prompt).await.and_then(|raw| decode_json::<ReasoningReply>(&raw)) {
            Ok(r) => Ok(base(
                r.reasoning,
                r.tool_to_use,
                r.expected_outcome,
                r.confidence.unwrap_or(DEFAULT_THOUGHT_CONFIDENCE).clamp(0.0, 1.0),
            )),
            Err(LlmError::Decode { raw, .. }) => {
                tracing::debug!(target: "wpo::agent", task = %task.description, "reasoning was not JSON; using planned tool");
                Ok(base(raw, task.tool_name.clone(), "Execute task".into(), FALLBACK_CONFIDENCE))
            }
            Err(e) => Err(e),
        }
    }

    async fn self_correct(&self, task: &AgentTask, error: &str, last: Option<&AgentThought>) -> Option<String> {
        let prompt = format!(
            "Task that failed: {}\nError: {error}\nPrevious reasoning: {}\n\n\
Analyze why this failed and suggest a corrected approach.\n\
Respond with JSON: {{ \"analysis\": \"...\", \"correction\": \"...\", \"newApproach\": \"...\" }}",
            task.description,
            last.map(|t| t.reasoning.as_str()).unwrap_or("none")
        );
        match self.ask(prompt).await {
            Ok(raw) => {
                tracing::debug!(target: "wpo::agent", chars = raw.len(), "self-correction advice received");
                Some(raw)
            }
            Err(e) => {
                tracing::warn!(target: "wpo::agent", error = %e, "self-correction call failed");
                None
            }
        }
    }

    async fn reflect(&self, tasks: &[AgentTask], thoughts: &[AgentThought], m: &AgentMetrics) -> Option<Reflection> {
        let avg_confidence = if thoughts.is_empty() {
            0.0
        } else {
            thoughts.iter().map(|t| t.confidence).sum::<f64>() / thoughts.len() as f64
        };
        let failed: Vec<&str> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .map(|t| t.description.as_str())
            .collect();
        let prompt = format!(
            "Execution Summary:\n- Total tasks: {}\n- Completed: {}\n- Failed: {}\n- Thoughts generated: {}\n- Average confidence: {avg_confidence:.2}\n\n\
Failed tasks: {}\n\n\
Provide insights for improving future executions.\n\
Respond with JSON: {{ \"learnings\": [...], \"improvements\": [...], \"patterns\": [...] }}",
            m.total_tasks,
            m.completed_tasks,
            m.failed_tasks,
            m.total_thoughts,
            if failed.is_empty() { "none".to_string() } else { failed.join(", ") }
        );
        match self.ask(prompt).await.and_then(|raw| decode_json::<Reflection>(&raw)) {
            Ok(r) => {
                tracing::info!(target: "wpo::agent", learnings = r.learnings.len(), "reflection complete");
                Some(r)
            }
            Err(e) => {
                tracing::warn!(target: "wpo::agent", error = %e, "reflection skipped");
                None
            }
        }
    }
}

fn compute_metrics(tasks: &[AgentTask], thoughts: usize, elapsed: Duration) -> AgentMetrics {
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let failed = tasks.iter().filter(|t| t.status == TaskStatus::Failed).count();
    AgentMetrics {
        total_tasks: tasks.len(),
        completed_tasks: completed,
        failed_tasks: failed,
        success_rate: completed as f64 / tasks.len().max(1) as f64,
        total_thoughts: thoughts,
        duration_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContentContract;
    use crate::llm::ScriptedLlm;

    fn quick() -> AgentConfig {
        AgentConfig {
            step_delay_ms: 0,
            ..AgentConfig::default()
        }
    }

    fn workspace() -> AgentWorkspace {
        AgentWorkspace::new(ContentContract::new("T", "t", "<h1>T</h1><p>Body text here.</p>"))
    }

    #[test]
    fn defaults() {
        let c = AgentConfig::default();
        assert_eq!(c.max_iterations, 50);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.timeout_ms, 300_000);
        assert!(c.enable_reflection && c.enable_self_correction);
        assert_eq!(c.step_delay_ms, 100);
    }

    #[tokio::test]
    async fn happy_path_runs_planned_tool() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"tasks":[{"description":"strip h1","toolName":"remove_h1_tags"}],"complexity":"simple"}"#,
            r#"{"reasoning":"h1 duplicates title","toolToUse":"remove_h1_tags","expectedOutcome":"no h1"}"#,
            r#"{"learnings":["h1 removal is cheap"],"improvements":[],"patterns":[]}"#,
        ]));
        let episodes = Arc::new(EpisodicMemory::new());
        let agent = AutonomousAgent::new(llm, ToolRegistry::default(), quick()).with_episodic_memory(episodes.clone());
        let mut ws = workspace();
        let run = agent.pursue(AgentGoal::new("Clean headings"), &mut ws).await.unwrap();

        assert_eq!(run.status, AgentStatus::Completed);
        assert_eq!(run.complexity, Complexity::Simple);
        assert_eq!(run.metrics.completed_tasks, 1);
        assert!((run.metrics.success_rate - 1.0).abs() < 1e-9);
        assert_eq!(run.thoughts.len(), 1);
        assert!(!ws.contract.html_content.contains("<h1"));
        assert_eq!(run.reflection.unwrap().learnings, vec!["h1 removal is cheap"]);

        let ep = &episodes.recent_episodes(1)[0];
        assert_eq!(ep.actions.len(), 1);
        assert_eq!(ep.learnings, vec!["h1 removal is cheap"]);
    }

    #[tokio::test]
    async fn prose_reasoning_falls_back_to_planned_tool() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"tasks":[{"description":"strip h1","toolName":"remove_h1_tags"}]}"#,
            "Let me just remove the headings.",
        ]));
        let cfg = AgentConfig {
            enable_reflection: false,
            ..quick()
        };
        let agent = AutonomousAgent::new(llm, ToolRegistry::default(), cfg);
        let run = agent.pursue(AgentGoal::new("Clean"), &mut workspace()).await.unwrap();
        assert_eq!(run.status, AgentStatus::Completed);
        let t = &run.thoughts[0];
        assert!((t.confidence - 0.5).abs() < 1e-9);
        assert_eq!(t.reasoning, "Let me just remove the headings.");
        assert_eq!(t.action, "remove_h1_tags");
    }

    #[tokio::test]
    async fn planning_failure_aborts() {
        let llm = Arc::new(ScriptedLlm::new(["no plan today"]));
        let agent = AutonomousAgent::new(llm, ToolRegistry::default(), quick());
        let err = agent.pursue(AgentGoal::new("x"), &mut workspace()).await.unwrap_err();
        assert!(matches!(err, AgentError::Planning(LlmError::Decode { .. })));

        let agent = AutonomousAgent::new(Arc::new(ScriptedLlm::default()), ToolRegistry::default(), quick());
        assert!(matches!(
            agent.pursue(AgentGoal::new("  "), &mut workspace()).await,
            Err(AgentError::EmptyGoal)
        ));
    }

    #[tokio::test]
    async fn reasoning_failure_aborts() {
        let llm = Arc::new(ScriptedLlm::from_results(vec![
            Ok(r#"{"tasks":[{"description":"strip h1","toolName":"remove_h1_tags"}]}"#.to_string()),
            Err(LlmError::EmptyResponse),
        ]));
        let episodes = Arc::new(EpisodicMemory::new());
        let agent = AutonomousAgent::new(llm, ToolRegistry::default(), quick()).with_episodic_memory(episodes.clone());
        let mut ws = workspace();
        let err = agent.pursue(AgentGoal::new("Clean headings"), &mut ws).await.unwrap_err();

        assert!(matches!(err, AgentError::Reasoning(LlmError::EmptyResponse)));
        // the planned tool never ran
        assert!(ws.contract.html_content.contains("<h1>"));
        let ep = &episodes.recent_episodes(1)[0];
        assert_eq!(ep.actions.len(), 1);
        assert_eq!(ep.actions[0].action, "reason");
        assert!(ep.actions[0].result.starts_with("failed"));
        // the episode was already closed
        assert!(episodes.end_episode().is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_fail_then_replan_once() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"tasks":[{"description":"warp","toolName":"teleport"},{"description":"later","toolName":"run_qa_swarm"}]}"#,
            // attempt 1 + self-correction, attempt 2 (final)
            "prose",
            r#"{"analysis":"no such tool","correction":"use another","newApproach":"qa"}"#,
            "prose",
            // replan
            r#"{"tasks":[{"description":"qa","toolName":"run_qa_swarm"}]}"#,
            "prose",
        ]));
        let cfg = AgentConfig {
            max_retries: 1,
            ..quick()
        };
        let agent = AutonomousAgent::new(llm.clone(), ToolRegistry::default(), cfg);
        let run = agent.pursue(AgentGoal::new("Ship it"), &mut workspace()).await.unwrap();

        assert!(run.replanned);
        assert_eq!(run.status, AgentStatus::Failed);
        let failed: Vec<_> = run.tasks_with(TaskStatus::Failed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 2);
        assert_eq!(failed[0].error.as_deref(), Some("Tool not found: teleport"));
        assert_eq!(run.tasks_with(TaskStatus::Skipped).count(), 1);
        assert_eq!(run.tasks_with(TaskStatus::Completed).count(), 1);
        assert!(llm.prompts().iter().any(|p| p.contains("Avoid: Tool not found: teleport")));
        // reflection reply was missing from the script
        assert!(run.reflection.is_none());
    }

    #[tokio::test]
    async fn iteration_cap_skips_the_rest() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"tasks":[{"description":"a","toolName":"remove_h1_tags"},{"description":"b","toolName":"remove_h1_tags"}]}"#,
            "prose",
        ]));
        let cfg = AgentConfig {
            max_iterations: 1,
            enable_reflection: false,
            ..quick()
        };
        let run = AutonomousAgent::new(llm, ToolRegistry::default(), cfg)
            .pursue(AgentGoal::new("x"), &mut workspace())
            .await
            .unwrap();
        assert_eq!(run.iterations, 1);
        assert_eq!(run.tasks_with(TaskStatus::Skipped).count(), 1);
        assert_eq!(run.status, AgentStatus::Completed);
    }

    #[tokio::test]
    async fn zero_timeout_stops_before_work() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"tasks":[{"description":"a","toolName":"remove_h1_tags"}]}"#]));
        let cfg = AgentConfig {
            timeout_ms: 0,
            enable_reflection: false,
            ..quick()
        };
        let run = AutonomousAgent::new(llm, ToolRegistry::default(), cfg)
            .pursue(AgentGoal::new("x"), &mut workspace())
            .await
            .unwrap();
        assert!(run.timed_out);
        assert_eq!(run.status, AgentStatus::Failed);
        assert_eq!(run.iterations, 0);
    }
}
