use log::info;
use std::sync::Arc;

use crate::core::config::AppConfig;
#[cfg(feature = "llm")]
use crate::llm::{LLMProvider, OpenAIClient};
use crate::seo::generator::{ContentGenerator, MockGenerator};
use crate::seo::wizard::WizardStore;
use crate::tickets::store::{demo_tickets, TicketStore};

pub struct AppState {
    pub config: AppConfig,
    pub tickets: TicketStore,
    pub wizard: WizardStore,
    pub generator: Arc<dyn ContentGenerator>,
    #[cfg(feature = "llm")]
    pub llm: Option<Arc<dyn LLMProvider>>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let tickets = if config.tickets.seed_demo_data {
            let tickets = demo_tickets();
            info!("Seeded {} demo tickets", tickets.len());
            TicketStore::with_tickets(tickets)
        } else {
            TicketStore::new()
        };

        #[cfg(feature = "llm")]
        let llm = Self::llm_provider(&config);

        #[cfg(feature = "llm")]
        let generator: Arc<dyn ContentGenerator> = match &llm {
            Some(provider) => {
                info!("SEO stages use model {}", config.llm.model);
                Arc::new(crate::seo::generator::LlmGenerator::new(provider.clone()))
            }
            None => Arc::new(MockGenerator::new(config.mock_latency())),
        };

        #[cfg(not(feature = "llm"))]
        let generator: Arc<dyn ContentGenerator> = Arc::new(MockGenerator::new(config.mock_latency()));

        info!("Content generator: {}", generator.name());

        Self {
            tickets,
            wizard: WizardStore::new(),
            generator,
            #[cfg(feature = "llm")]
            llm,
            config,
        }
    }

    /// Swaps the stage generator, mostly for tests that need fixed output.
    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = generator;
        self
    }

    #[cfg(feature = "llm")]
    fn llm_provider(config: &AppConfig) -> Option<Arc<dyn LLMProvider>> {
        if !config.llm.is_usable() {
            return None;
        }
        match OpenAIClient::from_config(&config.llm) {
            Ok(client) => {
                let provider: Arc<dyn LLMProvider> = Arc::new(client);
                Some(provider)
            }
            Err(e) => {
                log::warn!("LLM client unavailable, using templates: {}", e);
                None
            }
        }
    }
}
