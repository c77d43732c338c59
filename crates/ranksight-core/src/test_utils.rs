//! Test utilities for ranksight-core.
//!
//! Deterministic fakes for the search and judge capabilities.
//! Only compiled when running tests.

use crate::error::JudgeError;
use crate::judge::{Comparison, Judge, PairKey, ProjectProfile, Verdict};
use crate::search::{ProjectId, RankedResult, SearchChannel, SearchError, SearchFilters};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Search channel that always returns the same ranking.
pub struct StaticChannel {
    name: String,
    ids: Vec<u64>,
    fail: bool,
    calls: Cell<usize>,
    last_top_k: Cell<usize>,
}

impl StaticChannel {
    /// Channel returning `ids` in order, scores descending from 1.0.
    pub fn new(name: &str, ids: &[u64]) -> Self {
        Self {
            name: name.to_string(),
            ids: ids.to_vec(),
            fail: false,
            calls: Cell::new(0),
            last_top_k: Cell::new(0),
        }
    }

    /// Channel whose every search fails.
    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, &[])
        }
    }

    /// Number of searches served.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// `top_k` of the most recent search.
    pub fn last_top_k(&self) -> usize {
        self.last_top_k.get()
    }
}

#[async_trait::async_trait(?Send)]
impl SearchChannel for StaticChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        _query_text: &str,
        _filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError> {
        self.calls.set(self.calls.get() + 1);
        self.last_top_k.set(top_k);
        if self.fail {
            return Err(SearchError::ChannelFailed {
                channel: self.name.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .ids
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(i, &id)| RankedResult::new(ProjectId::from_u64(id), 1.0 / (i + 1) as f32))
            .collect())
    }
}

/// Lets a test keep a handle on a channel the retriever owns.
#[async_trait::async_trait(?Send)]
impl SearchChannel for Rc<StaticChannel> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError> {
        (**self).search(query_text, filters, top_k).await
    }
}

enum Script {
    /// Earlier in the list is always better; unknown ids tie
    Preference(Vec<ProjectId>),
    /// Same verdict regardless of content
    Fixed(Verdict),
    /// Explicit winner per pair; unlisted pairs tie
    Beats(HashMap<PairKey, ProjectId>),
    /// Verdicts in call order, repeating
    Sequence(Vec<Verdict>),
}

/// Judge with scripted, content-based (or position-based) answers.
pub struct ScriptedJudge {
    script: Script,
    failing: HashSet<PairKey>,
    calls: Cell<usize>,
    seen: RefCell<Vec<(ProjectId, ProjectId)>>,
}

impl ScriptedJudge {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            failing: HashSet::new(),
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Consistent judge: prefers whichever id comes first in `order`.
    pub fn preferring(order: &[u64]) -> Self {
        Self::with_script(Script::Preference(
            order.iter().copied().map(ProjectId::from_u64).collect(),
        ))
    }

    /// Purely position-driven judge.
    pub fn always(verdict: Verdict) -> Self {
        Self::with_script(Script::Fixed(verdict))
    }

    /// Judge where `(winner, loser)` pairs decide each matchup.
    pub fn beats(outcomes: &[(u64, u64)]) -> Self {
        let map = outcomes
            .iter()
            .map(|&(w, l)| {
                let (key, _) = PairKey::new(ProjectId::from_u64(w), ProjectId::from_u64(l));
                (key, ProjectId::from_u64(w))
            })
            .collect();
        Self::with_script(Script::Beats(map))
    }

    /// Judge answering `verdicts` in call order, starting over when exhausted.
    pub fn sequence(verdicts: &[Verdict]) -> Self {
        Self::with_script(Script::Sequence(verdicts.to_vec()))
    }

    /// Makes every call involving the pair `(x, y)` fail.
    pub fn failing_on(mut self, x: u64, y: u64) -> Self {
        let (key, _) = PairKey::new(ProjectId::from_u64(x), ProjectId::from_u64(y));
        self.failing.insert(key);
        self
    }

    /// Number of `compare` calls received.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// `(left, right)` ids of every call, in call order.
    pub fn seen(&self) -> Vec<(ProjectId, ProjectId)> {
        self.seen.borrow().clone()
    }

    fn decide(&self, left: ProjectId, right: ProjectId) -> Verdict {
        let side = |winner: Option<ProjectId>| match winner {
            Some(w) if w == left => Verdict::Left,
            Some(w) if w == right => Verdict::Right,
            _ => Verdict::Tie,
        };

        match &self.script {
            Script::Fixed(v) => *v,
            Script::Preference(order) => {
                let pos = |id| order.iter().position(|o| *o == id);
                match (pos(left), pos(right)) {
                    (Some(l), Some(r)) if l < r => Verdict::Left,
                    (Some(l), Some(r)) if r < l => Verdict::Right,
                    (Some(_), None) => Verdict::Left,
                    (None, Some(_)) => Verdict::Right,
                    _ => Verdict::Tie,
                }
            }
            Script::Beats(map) => side(map.get(&PairKey::new(left, right).0).copied()),
            Script::Sequence(verdicts) => {
                let call = self.calls.get().saturating_sub(1);
                verdicts.get(call % verdicts.len().max(1)).copied().unwrap_or(Verdict::Tie)
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl Judge for ScriptedJudge {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn compare(
        &self,
        _query_text: &str,
        left: &ProjectProfile,
        right: &ProjectProfile,
    ) -> Result<Comparison, JudgeError> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push((left.id, right.id));

        if self.failing.contains(&PairKey::new(left.id, right.id).0) {
            return Err(JudgeError::Request("judge unavailable".to_string()));
        }

        let verdict = self.decide(left.id, right.id);
        Ok(Comparison::new(
            verdict,
            format!("{} vs {}: {:?}", left.id, right.id, verdict),
        ))
    }
}

/// Profiles with only an id set, in the given order.
pub fn profiles(ids: &[u64]) -> Vec<ProjectProfile> {
    ids.iter()
        .map(|&id| ProjectProfile::new(ProjectId::from_u64(id)))
        .collect()
}
