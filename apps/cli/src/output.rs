//! Submit handler that prints finished searches

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use cohort_query::SearchParams;
use cohort_search::{SearchHistory, SubmitHandler};

pub struct ConsoleHandler {
    pretty: bool,
    history: Mutex<SearchHistory>,
}

impl ConsoleHandler {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            history: Mutex::new(SearchHistory::new()),
        }
    }

    pub fn render(&self, search_params: &SearchParams) -> anyhow::Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(search_params)?
        } else {
            serde_json::to_string(search_params)?
        };
        Ok(rendered)
    }

    fn print(&self, search_params: &SearchParams, description: &str) -> anyhow::Result<()> {
        let rendered = self.render(search_params)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{rendered}")?;
        writeln!(stdout, "{description}")?;
        Ok(())
    }
}

#[async_trait]
impl SubmitHandler for ConsoleHandler {
    async fn on_submit(&self, search_params: SearchParams, description: String) -> bool {
        if let Err(e) = self.print(&search_params, &description) {
            tracing::error!(error = %e, "Failed to write query");
            return false;
        }

        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = history.add(&search_params, description, Vec::new());
        tracing::debug!(id = %id, searches = history.len(), "Search recorded");
        true
    }
}
