// tests/agent_loop.rs
//
// Drives the autonomous agent end to end with a scripted model, real tools
// and an in-memory vector store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;

use wp_optimizer_pro::agent::tools::{AgentWorkspace, ToolRegistry, ToolServices};
use wp_optimizer_pro::agent::{AgentConfig, AgentGoal, AgentStatus, AutonomousAgent, TaskStatus};
use wp_optimizer_pro::contract::{ContentContract, InternalLinkTarget};
use wp_optimizer_pro::error::LlmError;
use wp_optimizer_pro::llm::ScriptedLlm;
use wp_optimizer_pro::memory::{EmbeddingProvider, EpisodicMemory, VectorMemorySystem};

struct LetterEmbeddings;

#[async_trait]
impl EmbeddingProvider for LetterEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut v = vec![0f32; 26];
        for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            v[(c - b'a') as usize] += 1.0;
        }
        Ok(v)
    }
}

fn fast() -> AgentConfig {
    AgentConfig {
        step_delay_ms: 0,
        ..AgentConfig::default()
    }
}

fn workspace() -> AgentWorkspace {
    let first = "Healthy soil starts with organic matter, and many growers rely on compost tea recipes to feed microbes between plantings.";
    let second = "Mulch keeps moisture in the ground through summer, which protects roots and cuts how often the beds need watering.";
    let mut ws = AgentWorkspace::new(ContentContract::new(
        "Soil Health",
        "soil-health",
        format!("<h1>Soil Health</h1><p>{first}</p><h2>Moisture</h2><p>{second}</p>"),
    ));
    ws.current_url = "https://garden.test/soil-health/".into();
    ws.targets = vec![InternalLinkTarget {
        url: "https://garden.test/compost-tea-recipes/".into(),
        title: "Compost Tea Recipes".into(),
        ..InternalLinkTarget::default()
    }];
    ws
}

const PLAN: &str = r#"{
  "tasks": [
    {"description": "Drop the duplicate title", "toolName": "remove_h1_tags"},
    {"description": "Link related guides", "toolName": "inject_internal_links", "parameters": {"maxLinks": 1}},
    {"description": "Summarise", "toolName": "add_key_takeaways", "parameters": {"takeaways": ["Feed the soil", "Mulch in summer"]}},
    {"description": "Check notes", "toolName": "recall_memory", "parameters": {"query": "compost tea", "topK": 2}},
    {"description": "Score the result", "toolName": "run_qa_swarm"}
  ],
  "complexity": "moderate",
  "riskLevel": "low"
}"#;

#[tokio::test]
async fn plan_runs_every_tool_against_the_workspace() {
    let memory = Arc::new(VectorMemorySystem::new(Arc::new(LetterEmbeddings)));
    memory
        .store("Compost tea needs steady aeration", Map::new(), vec!["soil".into()])
        .await
        .expect("stored");

    let llm = Arc::new(ScriptedLlm::new([
        PLAN,
        // Low confidence: the planned tool wins over the suggestion.
        r#"{"reasoning":"maybe publish","toolToUse":"publish_post","confidence":0.2}"#,
        r#"{"reasoning":"one link fits","toolToUse":"inject_internal_links","confidence":0.9}"#,
        "Add the two takeaways.",
        r#"{"reasoning":"look up notes","toolToUse":"recall_memory"}"#,
        r#"{"reasoning":"final check","toolToUse":"run_qa_swarm","confidence":1.0}"#,
        r#"{"learnings":["links need long paragraphs"],"improvements":["add faqs"],"patterns":[]}"#,
    ]));
    let registry = ToolRegistry::new(ToolServices {
        memory: Some(memory),
        ..ToolServices::default()
    });
    let episodes = Arc::new(EpisodicMemory::new());
    let agent = AutonomousAgent::new(llm.clone(), registry, fast()).with_episodic_memory(episodes.clone());

    let mut ws = workspace();
    let run = agent
        .pursue(AgentGoal::new("Optimize the soil health article"), &mut ws)
        .await
        .expect("run");

    assert_eq!(run.status, AgentStatus::Completed);
    assert_eq!(run.metrics.total_tasks, 5);
    assert_eq!(run.metrics.completed_tasks, 5);
    assert_eq!(run.iterations, 5);
    assert!(!run.replanned);

    let html = &ws.contract.html_content;
    assert!(!html.contains("<h1"));
    assert!(html.contains(r#"<a href="https://garden.test/compost-tea-recipes/""#));
    assert!(html.contains("Key Takeaways"));
    assert_eq!(ws.contract.internal_links.len(), 1);
    assert_eq!(ws.contract.internal_links[0].anchor_text, "compost tea recipes");

    let recall = run.tasks[3].result.as_ref().expect("recall result");
    assert_eq!(recall["memories"].as_array().map(Vec::len), Some(1));
    let qa = run.tasks[4].result.as_ref().expect("qa result");
    assert!(qa["score"].is_number());

    assert_eq!(run.thoughts[0].action, "publish_post");
    assert_eq!(run.tasks[0].status, TaskStatus::Completed);

    let ep = &episodes.recent_episodes(1)[0];
    assert_eq!(ep.actions.len(), 5);
    assert_eq!(ep.learnings, vec!["links need long paragraphs"]);

    // plan + five reasoning calls + reflection
    assert_eq!(llm.prompts().len(), 7);
}

#[tokio::test]
async fn unavailable_tool_fails_the_run_without_retries() {
    let llm = Arc::new(ScriptedLlm::new([
        r#"{"tasks":[{"description":"ship it","toolName":"publish_post"},{"description":"tidy","toolName":"remove_h1_tags"}]}"#,
        r#"{"reasoning":"publish","toolToUse":"publish_post"}"#,
        r#"{"reasoning":"tidy","toolToUse":"remove_h1_tags"}"#,
    ]));
    let cfg = AgentConfig {
        enable_reflection: false,
        enable_self_correction: false,
        ..fast()
    };
    let agent = AutonomousAgent::new(llm, ToolRegistry::default(), cfg);
    let mut ws = workspace();
    let run = agent.pursue(AgentGoal::new("Publish"), &mut ws).await.expect("run");

    assert_eq!(run.status, AgentStatus::Failed);
    assert_eq!(run.tasks[0].status, TaskStatus::Failed);
    assert_eq!(run.tasks[0].attempts, 1);
    assert!(run.tasks[0].error.as_deref().unwrap_or("").contains("WordPress"));
    assert_eq!(run.tasks[1].status, TaskStatus::Completed);
    assert!(run.reflection.is_none());
}

#[tokio::test]
async fn blank_goal_is_rejected_before_planning() {
    let llm = Arc::new(ScriptedLlm::default());
    let agent = AutonomousAgent::new(llm.clone(), ToolRegistry::default(), fast());
    let err = agent.pursue(AgentGoal::new("   "), &mut workspace()).await.unwrap_err();
    assert!(matches!(err, wp_optimizer_pro::error::AgentError::EmptyGoal));
    assert!(llm.prompts().is_empty());
}
