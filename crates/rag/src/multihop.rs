//! Multi-hop retrieval
//!
//! Flow:
//! 1. Hybrid search on the original query
//! 2. Show the accumulated evidence to a judge model
//! 3. If the judge asks for more, run its sub-queries and merge unseen results
//! 4. Repeat up to `max_hops`, then rank everything by final score
//!
//! Judge failures, unparseable verdicts and sub-query search failures end the
//! loop early and keep what was gathered. Only the initial search can fail the
//! whole run.

use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use neo_config::RagConfig;
use neo_core::{CompletionRequest, HybridResult, LanguageModel};
use neo_llm::{parse_json_output, templates};

use crate::gate::extract_context;
use crate::hybrid::HybridScorer;
use crate::RagError;

/// Shown to the judge when nothing clears the visibility threshold
const NO_CONTEXT_PLACEHOLDER: &str = "No context found yet.";

#[derive(Debug, Clone)]
pub struct MultiHopConfig {
    pub max_hops: usize,
    pub initial_top_k: usize,
    pub hop_top_k: usize,
    pub visibility_threshold: f32,
}

impl Default for MultiHopConfig {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for MultiHopConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            max_hops: config.max_hops,
            initial_top_k: config.initial_top_k,
            hop_top_k: config.hop_top_k,
            visibility_threshold: config.visibility_threshold,
        }
    }
}

/// Judge response: `{"sufficient": bool, "queries": [string]}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default)]
    pub sufficient: bool,
    #[serde(default)]
    pub queries: Option<Vec<String>>,
}

impl JudgeVerdict {
    /// Non-blank follow-up queries, trimmed, in order
    pub fn follow_up_queries(&self) -> Vec<String> {
        self.queries
            .iter()
            .flatten()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Result of one orchestration run
#[derive(Debug, Clone, Default)]
pub struct MultiHopOutcome {
    /// Deduplicated by id, best first
    pub results: Vec<HybridResult>,
    /// Completed hops
    pub hops: usize,
    pub generated_queries: Vec<String>,
}

pub struct MultiHopOrchestrator {
    scorer: Arc<HybridScorer>,
    judge: Arc<dyn LanguageModel>,
    config: MultiHopConfig,
}

impl MultiHopOrchestrator {
    pub fn new(
        scorer: Arc<HybridScorer>,
        judge: Arc<dyn LanguageModel>,
        config: MultiHopConfig,
    ) -> Self {
        Self {
            scorer,
            judge,
            config,
        }
    }

    pub async fn run(&self, query: &str) -> Result<MultiHopOutcome, RagError> {
        tracing::debug!(query = %query, max_hops = self.config.max_hops, "Starting multi-hop search");

        let initial = self.scorer.search(query, self.config.initial_top_k).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(initial.len());
        merge_unseen(&mut results, &mut seen, initial);

        let mut hops = 0;
        let mut generated_queries = Vec::new();

        while hops < self.config.max_hops {
            let Some(verdict) = self.consult_judge(query, &results, hops).await else {
                break;
            };

            if verdict.sufficient {
                tracing::debug!(hop = hops + 1, "Judge found context sufficient");
                break;
            }

            let queries = verdict.follow_up_queries();
            if queries.is_empty() {
                tracing::debug!(hop = hops + 1, "Judge proposed no follow-up queries");
                break;
            }

            tracing::debug!(hop = hops + 1, queries = ?queries, "Running follow-up queries");

            let mut search_failed = false;
            for sub_query in &queries {
                match self.scorer.search(sub_query, self.config.hop_top_k).await {
                    Ok(found) => merge_unseen(&mut results, &mut seen, found),
                    Err(e) => {
                        tracing::warn!(hop = hops + 1, sub_query = %sub_query, error = %e, "Follow-up search failed");
                        search_failed = true;
                        break;
                    }
                }
            }

            generated_queries.extend(queries);
            if search_failed {
                break;
            }
            hops += 1;
        }

        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });

        metrics::histogram!("neo_multihop_hops").record(hops as f64);
        tracing::debug!(
            hops,
            results = results.len(),
            generated = generated_queries.len(),
            "Multi-hop search complete"
        );

        Ok(MultiHopOutcome {
            results,
            hops,
            generated_queries,
        })
    }

    /// Ask the judge about the evidence so far; `None` ends the loop
    async fn consult_judge(
        &self,
        query: &str,
        results: &[HybridResult],
        hop: usize,
    ) -> Option<JudgeVerdict> {
        let visible = extract_context(results, self.config.visibility_threshold);
        let context = if visible.is_sufficient() {
            visible.text
        } else {
            NO_CONTEXT_PLACEHOLDER.to_string()
        };

        tracing::debug!(
            hop = hop + 1,
            context_chars = context.len(),
            results = results.len(),
            "Evaluating context sufficiency"
        );

        let request = CompletionRequest::new(
            templates::decomposition(&context, query),
            templates::DECOMPOSITION_USER_MESSAGE,
        );

        let raw = match self.judge.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(hop = hop + 1, error = %e, "Judge call failed");
                return None;
            }
        };

        match parse_json_output::<JudgeVerdict>(&raw) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::warn!(hop = hop + 1, error = %e, "Judge verdict unparseable");
                None
            }
        }
    }
}

fn merge_unseen(
    results: &mut Vec<HybridResult>,
    seen: &mut HashSet<String>,
    found: Vec<HybridResult>,
) {
    for result in found {
        if seen.insert(result.id.clone()) {
            results.push(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordExtractor;
    use async_trait::async_trait;
    use neo_core::{MatchMetadata, RetrievalMatch, TextStream, VectorSearch};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    /// Per-query canned matches; unknown queries fail
    struct CannedSearch {
        by_query: HashMap<String, Vec<RetrievalMatch>>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl VectorSearch for CannedSearch {
        async fn search(&self, query: &str, top_k: usize) -> neo_core::Result<Vec<RetrievalMatch>> {
            self.calls.lock().push((query.to_string(), top_k));
            self.by_query
                .get(query)
                .map(|m| m.iter().take(top_k).cloned().collect())
                .ok_or_else(|| neo_core::Error::VectorSearch(format!("no route for {query}")))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    /// Replies with scripted judge outputs in order
    struct ScriptedJudge {
        replies: Mutex<VecDeque<neo_core::Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedJudge {
        async fn complete(&self, request: &CompletionRequest) -> neo_core::Result<String> {
            self.prompts.lock().push(request.system_prompt.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(neo_core::Error::Llm("script exhausted".into())))
        }

        fn complete_stream<'a>(&'a self, _request: CompletionRequest) -> TextStream<'a> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "scripted-judge"
        }
    }

    fn m(id: &str, score: f32, text: &str) -> RetrievalMatch {
        RetrievalMatch::new(id, score, MatchMetadata::new(text))
    }

    fn orchestrator(
        routes: Vec<(&str, Vec<RetrievalMatch>)>,
        replies: Vec<neo_core::Result<String>>,
        max_hops: usize,
    ) -> (MultiHopOrchestrator, Arc<CannedSearch>, Arc<ScriptedJudge>) {
        let search = Arc::new(CannedSearch {
            by_query: routes
                .into_iter()
                .map(|(q, m)| (q.to_string(), m))
                .collect(),
            calls: Mutex::new(Vec::new()),
        });
        let judge = Arc::new(ScriptedJudge {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        });
        let rag = RagConfig {
            max_hops,
            search_retries: 0,
            ..Default::default()
        };
        let scorer = Arc::new(HybridScorer::new(
            search.clone(),
            Arc::new(KeywordExtractor::default()),
            &rag,
        ));
        let orchestrator =
            MultiHopOrchestrator::new(scorer, judge.clone(), MultiHopConfig::from(&rag));
        (orchestrator, search, judge)
    }

    #[tokio::test]
    async fn test_sufficient_stops_without_hop() {
        let (orch, search, _) = orchestrator(
            vec![("what is orion", vec![m("a", 0.9, "Orion is the router")])],
            vec![Ok(r#"{"sufficient": true, "queries": []}"#.to_string())],
            1,
        );

        let outcome = orch.run("what is orion").await.unwrap();
        assert_eq!(outcome.hops, 0);
        assert!(outcome.generated_queries.is_empty());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(search.calls.lock().as_slice(), &[("what is orion".to_string(), 10)]);
    }

    #[tokio::test]
    async fn test_one_hop_merges_unseen_results() {
        let (orch, search, _) = orchestrator(
            vec![
                ("who built orion", vec![m("a", 0.6, "Orion overview"), m("a", 0.5, "dup")]),
                ("orion authors", vec![m("a", 0.99, "dup later"), m("b", 0.95, "Jay built Orion")]),
            ],
            vec![Ok("```json\n{\"sufficient\": false, \"queries\": [\"orion authors\"]}\n```".to_string())],
            1,
        );

        let outcome = orch.run("who built orion").await.unwrap();
        assert_eq!(outcome.hops, 1);
        assert_eq!(outcome.generated_queries, vec!["orion authors"]);

        let ids: Vec<&str> = outcome.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        // first sighting of "a" is kept, not re-scored
        assert_eq!(outcome.results[1].metadata.text.as_deref(), Some("Orion overview"));

        let calls = search.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], ("orion authors".to_string(), 5));
    }

    #[tokio::test]
    async fn test_max_hops_bounds_rounds() {
        let (orch, search, judge) = orchestrator(
            vec![("q", vec![m("a", 0.5, "x")]), ("more", vec![m("b", 0.5, "y")])],
            vec![
                Ok(r#"{"sufficient": false, "queries": ["more"]}"#.to_string()),
                Ok(r#"{"sufficient": false, "queries": ["more"]}"#.to_string()),
            ],
            1,
        );

        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 1);
        assert_eq!(search.calls.lock().len(), 2);
        assert_eq!(judge.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_verdict_returns_accumulated() {
        let (orch, _, _) = orchestrator(
            vec![("q", vec![m("a", 0.7, "x")])],
            vec![Ok("I think you need more context.".to_string())],
            1,
        );

        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 0);
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn test_judge_failure_is_not_an_error() {
        let (orch, _, _) = orchestrator(
            vec![("q", vec![m("a", 0.7, "x")])],
            vec![Err(neo_core::Error::Llm("502".into()))],
            1,
        );
        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 0);
    }

    #[tokio::test]
    async fn test_blank_queries_stop() {
        let (orch, search, _) = orchestrator(
            vec![("q", vec![m("a", 0.7, "x")])],
            vec![Ok(r#"{"sufficient": false, "queries": ["  ", ""]}"#.to_string())],
            1,
        );
        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 0);
        assert_eq!(search.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sub_query_failure_keeps_results() {
        let (orch, _, _) = orchestrator(
            vec![("q", vec![m("a", 0.7, "x")])],
            vec![Ok(r#"{"sufficient": false, "queries": ["unrouted"]}"#.to_string())],
            1,
        );
        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 0);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.generated_queries, vec!["unrouted"]);
    }

    #[tokio::test]
    async fn test_initial_search_failure_is_error() {
        let (orch, _, _) = orchestrator(vec![], vec![], 1);
        assert!(matches!(orch.run("q").await, Err(RagError::VectorSearch(_))));
    }

    #[tokio::test]
    async fn test_judge_sees_placeholder_without_visible_context() {
        let (orch, _, judge) = orchestrator(
            vec![("q", vec![m("a", 0.1, "faint")])],
            vec![Ok(r#"{"sufficient": true}"#.to_string())],
            1,
        );
        orch.run("q").await.unwrap();
        assert!(judge.prompts.lock()[0].contains("No context found yet."));
    }

    #[tokio::test]
    async fn test_zero_hops_skips_judge() {
        let (orch, _, judge) = orchestrator(vec![("q", vec![m("a", 0.7, "x")])], vec![], 0);
        let outcome = orch.run("q").await.unwrap();
        assert_eq!(outcome.hops, 0);
        assert!(judge.prompts.lock().is_empty());
    }

    #[test]
    fn test_verdict_parsing() {
        let verdict: JudgeVerdict = serde_json::from_str(r#"{"queries": null}"#).unwrap();
        assert!(!verdict.sufficient);
        assert!(verdict.follow_up_queries().is_empty());

        let verdict: JudgeVerdict =
            serde_json::from_str(r#"{"sufficient": false, "queries": [" a ", "b"]}"#).unwrap();
        assert_eq!(verdict.follow_up_queries(), vec!["a", "b"]);
    }
}
