use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::content::word_count;
use super::draft::{reduce, DraftAction, SeoDraft, WizardStage};
use super::generator::{ContentGenerator, StageConfig, StageOutput, StageRequest};
use super::links::LinkSet;
use super::SeoError;
use crate::core::config::SeoConfig;

/// Last batch offered to the user for each choice-based stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCandidates {
    pub keywords: Vec<String>,
    pub titles: Vec<String>,
    pub outlines: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: Uuid,
    pub draft: SeoDraft,
    pub candidates: StageCandidates,
    pub current_stage: WizardStage,
    pub pending_stage: Option<WizardStage>,
    /// Bumped by `reset`; a stage started on an older revision is dropped.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    fn new(topic: Option<String>) -> Self {
        let now = Utc::now();
        let draft = match topic {
            Some(topic) => reduce(&SeoDraft::default(), DraftAction::SetTopic { topic }),
            None => SeoDraft::default(),
        };
        Self {
            id: Uuid::new_v4(),
            current_stage: draft.current_stage(),
            draft,
            candidates: StageCandidates::default(),
            pending_stage: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn set_draft(&mut self, draft: SeoDraft) {
        self.current_stage = draft.current_stage();
        self.draft = draft;
        self.updated_at = Utc::now();
    }

    /// Commits a finished stage. Choice stages only refresh the candidates;
    /// links and content land in the draft directly.
    fn commit(&mut self, output: StageOutput) {
        match output {
            StageOutput::Keywords(keywords) => self.candidates.keywords = keywords,
            StageOutput::Titles(titles) => self.candidates.titles = titles,
            StageOutput::Outlines(outlines) => self.candidates.outlines = outlines,
            StageOutput::Images(images) => self.candidates.images = images,
            StageOutput::Links(links) => {
                let links = keep_selection(&self.draft, links);
                let draft = reduce(&self.draft, DraftAction::SetLinks { links });
                self.set_draft(draft);
            }
            StageOutput::Content(content) => {
                debug!("Draft {} content is {} words", self.id, word_count(&content));
                let draft = reduce(&self.draft, DraftAction::SetContent { content });
                self.set_draft(draft);
            }
        }
        self.updated_at = Utc::now();
    }
}

/// Links the user already ticked stay ticked when suggestions are refetched.
fn keep_selection(draft: &SeoDraft, mut links: LinkSet) -> LinkSet {
    let was_selected = |url: &str| {
        draft
            .internal_links
            .iter()
            .chain(&draft.external_links)
            .any(|l| l.selected && l.url == url)
    };
    for link in links.internal.iter_mut().chain(links.external.iter_mut()) {
        link.selected = link.selected || was_selected(&link.url);
    }
    links
}

struct InFlight {
    stage: WizardStage,
    token: CancellationToken,
}

/// Server-side wizard sessions. Each session runs at most one stage at a
/// time; a run commits its whole output or nothing.
#[derive(Default)]
pub struct WizardStore {
    sessions: RwLock<HashMap<Uuid, WizardSession>>,
    in_flight: Mutex<HashMap<Uuid, InFlight>>,
}

impl WizardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_pending(&self, mut session: WizardSession) -> WizardSession {
        session.pending_stage = self.in_flight().get(&session.id).map(|f| f.stage);
        session
    }

    pub async fn create(&self, topic: Option<String>) -> WizardSession {
        let session = WizardSession::new(topic);
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        info!("Created SEO wizard session {}", session.id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<WizardSession, SeoError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| SeoError::NotFound(format!("Draft {id} not found")))?;
        Ok(self.with_pending(session))
    }

    pub async fn apply(&self, id: Uuid, action: DraftAction) -> Result<WizardSession, SeoError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| SeoError::NotFound(format!("Draft {id} not found")))?;
        if action == DraftAction::Reset {
            session.revision += 1;
        }
        let draft = reduce(&session.draft, action);
        session.set_draft(draft);
        let session = session.clone();
        drop(sessions);
        Ok(self.with_pending(session))
    }

    /// Drops a session, cancelling its pending stage if there is one.
    pub async fn remove(&self, id: Uuid) -> Result<(), SeoError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| SeoError::NotFound(format!("Draft {id} not found")))?;
        self.cancel(id);
        info!("Removed SEO wizard session {}", id);
        Ok(())
    }

    /// Signals the pending stage of a session to stop. Returns whether there
    /// was one.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.in_flight().get(&id) {
            Some(flight) => {
                info!("Cancelling {:?} stage of draft {}", flight.stage, id);
                flight.token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn run_stage(
        &self,
        id: Uuid,
        config: &StageConfig,
        generator: &dyn ContentGenerator,
        defaults: &SeoConfig,
        timeout: Duration,
    ) -> Result<WizardSession, SeoError> {
        let started = self.get(id).await?;
        let request = StageRequest::from_draft(&started.draft, config, defaults)?;
        let stage = config.stage();

        let token = CancellationToken::new();
        {
            let mut in_flight = self.in_flight();
            if let Some(flight) = in_flight.get(&id) {
                return Err(SeoError::StageInFlight(format!(
                    "{:?} stage is already running for draft {id}",
                    flight.stage
                )));
            }
            in_flight.insert(
                id,
                InFlight {
                    stage,
                    token: token.clone(),
                },
            );
        }
        // Dropped on every exit path, including when the caller goes away.
        let _release = scopeguard::guard((), |_| {
            self.in_flight().remove(&id);
        });

        info!(
            "Running {:?} stage for draft {} with {} generator",
            stage,
            id,
            generator.name()
        );

        let output = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(SeoError::Cancelled(format!("{stage:?} stage cancelled")));
            }
            result = tokio::time::timeout(timeout, generator.generate(&request)) => match result {
                Ok(output) => output,
                Err(_) => {
                    warn!("{:?} stage for draft {} timed out after {:?}", stage, id, timeout);
                    return Err(SeoError::Timeout(format!(
                        "{stage:?} stage timed out after {}s",
                        timeout.as_secs()
                    )));
                }
            }
        };

        let output = output.map_err(|e| {
            warn!("{:?} stage for draft {} failed: {}", stage, id, e);
            e
        })?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| SeoError::NotFound(format!("Draft {id} not found")))?;
        if token.is_cancelled() {
            info!("{:?} stage for draft {} cancelled before commit", stage, id);
            return Err(SeoError::Cancelled(format!("{stage:?} stage cancelled")));
        }
        if session.revision != started.revision {
            warn!("Draft {} was reset while {:?} stage ran, dropping output", id, stage);
            return Err(SeoError::Cancelled(format!(
                "draft was reset while {stage:?} stage was running"
            )));
        }
        session.commit(output);
        let mut session = session.clone();
        session.pending_stage = None;
        info!("{:?} stage for draft {} committed", stage, id);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::generator::MockGenerator;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;

    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Template output, released only when the test opens the gate.
    #[derive(Default)]
    struct GatedGenerator {
        gate: Notify,
    }

    #[async_trait]
    impl ContentGenerator for GatedGenerator {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn generate(&self, request: &StageRequest) -> Result<StageOutput, SeoError> {
            self.gate.notified().await;
            Ok(MockGenerator::render(request))
        }
    }

    fn spawn_keywords(
        store: &Arc<WizardStore>,
        id: Uuid,
        generator: &Arc<GatedGenerator>,
    ) -> tokio::task::JoinHandle<Result<WizardSession, SeoError>> {
        let store = store.clone();
        let generator = generator.clone();
        tokio::spawn(async move {
            store
                .run_stage(
                    id,
                    &StageConfig::Keywords { count: Some(3) },
                    generator.as_ref(),
                    &SeoConfig::default(),
                    TIMEOUT,
                )
                .await
        })
    }

    async fn wait_until_pending(store: &WizardStore, id: Uuid) {
        for _ in 0..200 {
            if store.get(id).await.unwrap().pending_stage.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stage never became pending");
    }

    async fn store_with_topic() -> (Arc<WizardStore>, Uuid) {
        let store = Arc::new(WizardStore::new());
        let session = store.create(Some("SEO".to_string())).await;
        (store, session.id)
    }

    #[tokio::test]
    async fn test_stage_results_land_in_candidates_or_draft() {
        let (store, id) = store_with_topic().await;
        let generator = MockGenerator::default();
        let defaults = SeoConfig::default();

        let session = store
            .run_stage(
                id,
                &StageConfig::Keywords { count: Some(3) },
                &generator,
                &defaults,
                TIMEOUT,
            )
            .await
            .unwrap();
        assert_eq!(session.candidates.keywords.len(), 3);
        assert!(session.draft.selected_keywords.is_empty());
        assert_eq!(session.current_stage, WizardStage::Keywords);

        store
            .apply(
                id,
                DraftAction::SetKeywords {
                    keywords: session.candidates.keywords.clone(),
                },
            )
            .await
            .unwrap();
        let session = store
            .run_stage(id, &StageConfig::Links, &generator, &defaults, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(session.draft.external_links.len(), 3);
        assert!(session.pending_stage.is_none());
    }

    #[tokio::test]
    async fn test_refetching_links_keeps_selection() {
        let (store, id) = store_with_topic().await;
        let generator = MockGenerator::default();
        let defaults = SeoConfig::default();

        let session = store
            .run_stage(id, &StageConfig::Links, &generator, &defaults, TIMEOUT)
            .await
            .unwrap();
        let url = session.draft.internal_links[0].url.clone();
        store
            .apply(
                id,
                DraftAction::ToggleLink {
                    kind: crate::seo::links::LinkKind::Internal,
                    url: url.clone(),
                },
            )
            .await
            .unwrap();

        let session = store
            .run_stage(id, &StageConfig::Links, &generator, &defaults, TIMEOUT)
            .await
            .unwrap();
        assert!(session.draft.internal_links.iter().any(|l| l.url == url && l.selected));
    }

    #[tokio::test]
    async fn test_validation_failure_commits_nothing() {
        let store = WizardStore::new();
        let session = store.create(None).await;
        let err = store
            .run_stage(
                session.id,
                &StageConfig::Content {
                    options: Default::default(),
                },
                &MockGenerator::default(),
                &SeoConfig::default(),
                TIMEOUT,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Validation(_)));
        let after = store.get(session.id).await.unwrap();
        assert_eq!(after.draft, session.draft);
        assert!(after.pending_stage.is_none());
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_and_cancel_commits_nothing() {
        let (store, id) = store_with_topic().await;
        let slow = Arc::new(MockGenerator::new(Duration::from_secs(10)));

        let running = {
            let store = store.clone();
            let slow = slow.clone();
            tokio::spawn(async move {
                store
                    .run_stage(
                        id,
                        &StageConfig::Keywords { count: None },
                        slow.as_ref(),
                        &SeoConfig::default(),
                        TIMEOUT,
                    )
                    .await
            })
        };

        // Wait until the spawned run has registered itself.
        for _ in 0..100 {
            if store.get(id).await.unwrap().pending_stage.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            store.get(id).await.unwrap().pending_stage,
            Some(WizardStage::Keywords)
        );

        let err = store
            .run_stage(
                id,
                &StageConfig::Titles { count: None },
                slow.as_ref(),
                &SeoConfig::default(),
                TIMEOUT,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::StageInFlight(_)));

        assert!(store.cancel(id));
        let result = running.await.unwrap();
        assert!(matches!(result, Err(SeoError::Cancelled(_))));

        let session = store.get(id).await.unwrap();
        assert!(session.candidates.keywords.is_empty());
        assert!(session.pending_stage.is_none());
        assert!(!store.cancel(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_session() {
        let (store, id) = store_with_topic().await;
        let slow = MockGenerator::new(Duration::from_secs(120));

        let err = store
            .run_stage(
                id,
                &StageConfig::Keywords { count: None },
                &slow,
                &SeoConfig::default(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Timeout(_)));
        assert!(store.get(id).await.unwrap().pending_stage.is_none());
    }

    #[tokio::test]
    async fn test_cancel_after_generation_commits_nothing() {
        let (store, id) = store_with_topic().await;
        let generator = Arc::new(GatedGenerator::default());
        let running = spawn_keywords(&store, id, &generator);
        wait_until_pending(&store, id).await;

        // Generation finishes while the commit waits behind the sessions lock.
        let sessions = store.sessions.write().await;
        generator.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.cancel(id));
        drop(sessions);

        let result = running.await.unwrap();
        assert!(matches!(result, Err(SeoError::Cancelled(_))));
        let session = store.get(id).await.unwrap();
        assert!(session.candidates.keywords.is_empty());
        assert!(session.pending_stage.is_none());
    }

    #[tokio::test]
    async fn test_reset_during_run_drops_output() {
        let (store, id) = store_with_topic().await;
        let generator = Arc::new(GatedGenerator::default());
        let running = spawn_keywords(&store, id, &generator);
        wait_until_pending(&store, id).await;

        let session = store.apply(id, DraftAction::Reset).await.unwrap();
        assert_eq!(session.revision, 1);
        assert_eq!(session.draft, SeoDraft::default());
        generator.gate.notify_one();

        let result = running.await.unwrap();
        assert!(matches!(result, Err(SeoError::Cancelled(_))));
        let session = store.get(id).await.unwrap();
        assert!(session.candidates.keywords.is_empty());
        assert!(session.pending_stage.is_none());

        let err = store
            .run_stage(
                id,
                &StageConfig::Links,
                &MockGenerator::default(),
                &SeoConfig::default(),
                TIMEOUT,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_drops_session() {
        let (store, id) = store_with_topic().await;
        store.remove(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(SeoError::NotFound(_))));
        assert!(matches!(store.remove(id).await, Err(SeoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_draft() {
        let store = WizardStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(SeoError::NotFound(_))
        ));
    }
}
