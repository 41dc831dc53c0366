use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{ChatRequest, LlmClient};
use crate::error::LlmError;

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            date: Utc::now().date_naive(),
            count: 0,
        }
    }
}

/// Caps the number of real calls per UTC day. Failed calls do not count.
pub struct BudgetedClient<C> {
    inner: C,
    daily_limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<C: LlmClient> BudgetedClient<C> {
    pub fn new(inner: C, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    /// Calls made so far today.
    pub fn used_today(&self) -> u32 {
        let g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        if g.date == Utc::now().date_naive() {
            g.count
        } else {
            0
        }
    }

    fn check_budget(&self) -> Result<(), LlmError> {
        let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        let today = Utc::now().date_naive();
        if g.date != today {
            *g = DailyCounter::today();
        }
        if g.count >= self.daily_limit {
            tracing::warn!(target: "wpo::llm", limit = self.daily_limit, "daily LLM budget exhausted");
            return Err(LlmError::DailyLimit(self.daily_limit));
        }
        Ok(())
    }

    fn record_call(&self) {
        let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        g.count = g.count.saturating_add(1);
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for BudgetedClient<C> {
    async fn complete(&self, req: &ChatRequest) -> Result<String, LlmError> {
        self.check_budget()?;
        let out = self.inner.complete(req).await?;
        self.record_call();
        Ok(out)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
