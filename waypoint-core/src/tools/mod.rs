//! Tool backends the routing agent can call.

pub mod client;
pub mod destinations;
pub mod weather;
pub mod web_search;

use std::sync::Arc;

use crate::tools::destinations::DestinationsCatalog;
use crate::tools::weather::WeatherProvider;
use crate::tools::web_search::SearchProvider;

/// The backends wired into an engine. Web search is optional since it
/// needs an API key.
#[derive(Clone)]
pub struct ToolSet {
    pub weather: Arc<dyn WeatherProvider>,
    pub destinations: DestinationsCatalog,
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl ToolSet {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        ToolSet {
            weather,
            destinations: DestinationsCatalog::new(),
            search: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }
}
