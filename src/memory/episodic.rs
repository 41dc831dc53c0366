use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeAction {
    pub action: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub session_id: String,
    pub goal: String,
    pub started_at: DateTime<Utc>,
    pub actions: Vec<EpisodeAction>,
    pub learnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPatterns {
    pub successful_actions: Vec<String>,
    pub common_learnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodicStats {
    pub total_episodes: usize,
    pub total_actions: usize,
    pub total_learnings: usize,
    pub avg_actions_per_episode: f64,
    pub avg_learnings_per_episode: f64,
}

#[derive(Default)]
struct State {
    episodes: Vec<Episode>,
    current: Option<usize>,
}

/// Per-run record of goals, actions and learnings. One episode is open at a
/// time; actions recorded with no open episode are dropped.
#[derive(Default)]
pub struct EpisodicMemory {
    state: Mutex<State>,
}

impl EpisodicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_episode(&self, goal: &str) -> String {
        let session_id = format!("ep_{}", Uuid::new_v4().simple());
        let mut st = self.lock();
        st.episodes.push(Episode {
            session_id: session_id.clone(),
            goal: goal.to_string(),
            started_at: Utc::now(),
            actions: Vec::new(),
            learnings: Vec::new(),
        });
        let idx = st.episodes.len() - 1;
        st.current = Some(idx);
        session_id
    }

    pub fn record_action(&self, action: &str, result: &str) {
        let mut st = self.lock();
        if let Some(ep) = current_mut(&mut st) {
            ep.actions.push(EpisodeAction {
                action: action.to_string(),
                result: result.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn add_learning(&self, learning: &str) {
        let mut st = self.lock();
        if let Some(ep) = current_mut(&mut st) {
            ep.learnings.push(learning.to_string());
        }
    }

    /// Closes the open episode and returns a copy of it.
    pub fn end_episode(&self) -> Option<Episode> {
        let mut st = self.lock();
        let idx = st.current.take()?;
        st.episodes.get(idx).cloned()
    }

    pub fn episode(&self, session_id: &str) -> Option<Episode> {
        self.lock()
            .episodes
            .iter()
            .find(|e| e.session_id == session_id)
            .cloned()
    }

    /// Newest first.
    pub fn recent_episodes(&self, limit: usize) -> Vec<Episode> {
        let st = self.lock();
        let mut eps = st.episodes.clone();
        eps.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        eps.truncate(limit);
        eps
    }

    /// Episodes whose goal shares enough keywords (words over 3 chars) with
    /// `goal`: at least min(2, keywords / 2).
    pub fn find_similar_episodes(&self, goal: &str) -> Vec<Episode> {
        let keywords = keywords_of(goal);
        if keywords.is_empty() {
            return Vec::new();
        }
        let needed = (keywords.len() as f64 / 2.0).min(2.0);
        self.lock()
            .episodes
            .iter()
            .filter(|ep| {
                let theirs = keywords_of(&ep.goal);
                let overlap = keywords
                    .iter()
                    .filter(|k| theirs.iter().any(|t| t.contains(k.as_str()) || k.contains(t.as_str())))
                    .count();
                overlap as f64 >= needed
            })
            .cloned()
            .collect()
    }

    /// Most frequent successful actions and recurring learnings, top 10 each.
    pub fn extract_patterns(&self) -> MemoryPatterns {
        let st = self.lock();
        let mut actions: HashMap<&str, usize> = HashMap::new();
        let mut learnings: HashMap<&str, usize> = HashMap::new();
        for ep in &st.episodes {
            for a in &ep.actions {
                if a.result.to_lowercase().contains("success") {
                    *actions.entry(a.action.as_str()).or_default() += 1;
                }
            }
            for l in &ep.learnings {
                *learnings.entry(l.as_str()).or_default() += 1;
            }
        }
        MemoryPatterns {
            successful_actions: top_n(actions, 10),
            common_learnings: top_n(learnings, 10),
        }
    }

    pub fn stats(&self) -> EpisodicStats {
        let st = self.lock();
        let total_episodes = st.episodes.len();
        let total_actions: usize = st.episodes.iter().map(|e| e.actions.len()).sum();
        let total_learnings: usize = st.episodes.iter().map(|e| e.learnings.len()).sum();
        let avg = |n: usize| {
            if total_episodes == 0 {
                0.0
            } else {
                n as f64 / total_episodes as f64
            }
        };
        EpisodicStats {
            total_episodes,
            total_actions,
            total_learnings,
            avg_actions_per_episode: avg(total_actions),
            avg_learnings_per_episode: avg(total_learnings),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn current_mut(st: &mut State) -> Option<&mut Episode> {
    let idx = st.current?;
    st.episodes.get_mut(idx)
}

fn keywords_of(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

// Ties break alphabetically so output is stable.
fn top_n(counts: HashMap<&str, usize>, n: usize) -> Vec<String> {
    let mut v: Vec<(&str, usize)> = counts.into_iter().collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    v.into_iter().take(n).map(|(k, _)| k.to_string()).collect()
}
