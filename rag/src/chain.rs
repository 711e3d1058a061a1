use tracing::{debug, info};

use crate::build_prompt::{build_answer_request, build_condense_request};
use crate::config::Config;
use crate::embed_chunks::Embedder;
use crate::error::Result;
use crate::generate::{generate_answer, generate_standalone_question, LanguageModel};
use crate::providers::Providers;
use crate::retrieve_chunks::{retrieve_top, Hit};
use crate::session_memory::{SessionLocks, SessionMemory};
use crate::vector_store::{open_store, VectorStore};

/// An answer plus the chunks that were given to the model as context.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<Hit>,
}

/// Retrieval + session history + language model, for one session.
/// Built per request; holds no state worth sharing between requests.
pub struct ConversationalChain<'a> {
    cfg: &'a Config,
    session_id: String,
    locks: &'a SessionLocks,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
    store: Box<dyn VectorStore>,
}

impl<'a> ConversationalChain<'a> {
    pub fn open(
        cfg: &'a Config,
        providers: &dyn Providers,
        session_id: &str,
        locks: &'a SessionLocks,
    ) -> Result<Self> {
        let embedder = providers.embedder(cfg)?;
        let llm = providers.language_model(cfg)?;
        let store = open_store(cfg)?;
        Ok(Self {
            cfg,
            session_id: session_id.to_string(),
            locks,
            embedder,
            llm,
            store,
        })
    }

    pub fn answer(&mut self, question: &str) -> Result<ChainAnswer> {
        let lock = self.locks.lock_for(&self.session_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.answer_locked(question)
        };
        self.locks.release(&self.session_id, lock);
        result
    }

    fn answer_locked(&self, question: &str) -> Result<ChainAnswer> {
        let mut memory =
            SessionMemory::open(&self.cfg.memory_dir, &self.session_id, self.cfg.history_max_turns)?;

        let standalone = if memory.history().is_empty() {
            question.to_string()
        } else {
            let request = build_condense_request(memory.history(), question);
            let rewritten = generate_standalone_question(self.llm.as_ref(), &request, question)?;
            debug!(session = %self.session_id, standalone = %rewritten, "condensed follow-up question");
            rewritten
        };

        let hits = retrieve_top(
            self.store.as_ref(),
            self.embedder.as_ref(),
            &standalone,
            self.cfg.top_k,
        )?;
        let request =
            build_answer_request(&self.cfg.system_prompt, &standalone, &hits, memory.history());
        let answer = generate_answer(self.llm.as_ref(), &request)?;

        memory.append(question, &answer)?;
        info!(
            session = %self.session_id,
            sources = hits.len(),
            history = memory.history().len(),
            "answered question"
        );

        Ok(ChainAnswer { answer, sources: hits })
    }
}

/// Opens a chain for `session_id` and answers one question with it.
pub fn answer_question(
    cfg: &Config,
    providers: &dyn Providers,
    locks: &SessionLocks,
    session_id: &str,
    question: &str,
) -> Result<ChainAnswer> {
    ConversationalChain::open(cfg, providers, session_id, locks)?.answer(question)
}
