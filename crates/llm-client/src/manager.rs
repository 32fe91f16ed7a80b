use crate::config::{BackoffPolicy, EndpointsFile};
use crate::endpoint::{AzureChatEndpoint, ChatEndpoint, ChatRequest};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::{LlmError, LlmResult};
use llm_parse::{ParseStrategy, Record};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Raw reply text and the endpoint that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub endpoint: String,
}

/// A reply reduced to a structured record.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredReply {
    pub record: Record,
    pub strategy: ParseStrategy,
    pub endpoint: String,
    /// Requests sent for this reply, including JSON reformatting retries.
    pub attempts: usize,
}

/// Snapshot of the manager's counters. Observability only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InvocationStats {
    pub calls_attempted: u64,
    pub successful_parses: u64,
    pub failed_parses: u64,
    pub transport_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    calls_attempted: AtomicU64,
    successful_parses: AtomicU64,
    failed_parses: AtomicU64,
    transport_failures: AtomicU64,
}

/// Issues chat requests against an ordered list of interchangeable endpoints.
///
/// One instance is shared across concurrent review tasks; the endpoint cursor is behind a
/// mutex so rotation stays consistent.
pub struct InvocationManager {
    endpoints: Vec<Arc<dyn ChatEndpoint>>,
    cursor: Mutex<usize>,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    counters: Counters,
}

impl std::fmt::Debug for InvocationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.endpoints.iter().map(|e| e.name()).collect();
        f.debug_struct("InvocationManager")
            .field("endpoints", &names)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl InvocationManager {
    pub fn new(endpoints: Vec<Arc<dyn ChatEndpoint>>, policy: BackoffPolicy) -> LlmResult<Self> {
        if endpoints.is_empty() {
            return Err(LlmError::InvalidConfig(
                "at least one endpoint must be configured".into(),
            ));
        }
        if policy.max_cycles == 0 {
            return Err(LlmError::InvalidConfig(
                "max_cycles must be at least 1".into(),
            ));
        }

        Ok(Self {
            endpoints,
            cursor: Mutex::new(0),
            policy,
            sleeper: Arc::new(TokioSleeper),
            counters: Counters::default(),
        })
    }

    /// Build HTTP endpoints from configuration, resolving credentials through `lookup`.
    pub fn from_config<F>(file: &EndpointsFile, lookup: F) -> LlmResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoints = file
            .resolve_all(lookup)?
            .into_iter()
            .map(|resolved| {
                AzureChatEndpoint::new(resolved).map(|e| Arc::new(e) as Arc<dyn ChatEndpoint>)
            })
            .collect::<LlmResult<Vec<_>>>()?;

        Self::new(endpoints, file.backoff)
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    pub fn stats(&self) -> InvocationStats {
        InvocationStats {
            calls_attempted: self.counters.calls_attempted.load(Ordering::Relaxed),
            successful_parses: self.counters.successful_parses.load(Ordering::Relaxed),
            failed_parses: self.counters.failed_parses.load(Ordering::Relaxed),
            transport_failures: self.counters.transport_failures.load(Ordering::Relaxed),
        }
    }

    fn current_index(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the cursor past `failed`, unless another task already moved it.
    fn advance_from(&self, failed: usize) {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if *cursor == failed {
            *cursor = (failed + 1) % self.endpoints.len();
        }
    }

    /// Send `request`, rotating through endpoints on failure.
    ///
    /// Each cycle tries at most one endpoint per configured entry. After a cycle in which every
    /// attempt failed the manager sleeps for `cycle_delay`; after `max_cycles` such cycles it
    /// returns [`LlmError::EndpointsExhausted`].
    pub async fn invoke(&self, request: &ChatRequest) -> LlmResult<Completion> {
        let mut last_error = String::new();

        for cycle in 1..=self.policy.max_cycles {
            for _ in 0..self.endpoints.len() {
                let index = self.current_index();
                let endpoint = &self.endpoints[index];
                self.counters.calls_attempted.fetch_add(1, Ordering::Relaxed);

                match endpoint.complete(request).await {
                    Ok(text) => {
                        return Ok(Completion {
                            text,
                            endpoint: endpoint.name().to_string(),
                        });
                    }
                    Err(err) => {
                        self.counters
                            .transport_failures
                            .fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            endpoint = endpoint.name(),
                            cycle,
                            error = %err,
                            "endpoint call failed, rotating"
                        );
                        last_error = err.to_string();
                        self.advance_from(index);
                    }
                }
            }

            tracing::warn!(
                cycle,
                max_cycles = self.policy.max_cycles,
                delay_secs = self.policy.cycle_delay.as_secs_f64(),
                "all endpoints failed in cycle, backing off"
            );
            self.sleeper.sleep(self.policy.cycle_delay).await;
        }

        tracing::error!(
            cycles = self.policy.max_cycles,
            last_error = %last_error,
            "all endpoints exhausted"
        );
        Err(LlmError::EndpointsExhausted {
            cycles: self.policy.max_cycles,
            last_error,
        })
    }

    /// Send `request` and parse the reply, re-asking for pure JSON up to `max_json_retries`
    /// extra times.
    ///
    /// Transport exhaustion is returned immediately. If the final reply still cannot be
    /// parsed the error carries that reply's text verbatim.
    pub async fn invoke_with_json_retry(
        &self,
        request: &ChatRequest,
        max_json_retries: usize,
    ) -> LlmResult<StructuredReply> {
        let reminded = request.with_json_reminder();
        let mut retries = 0;

        loop {
            let outgoing = if retries == 0 { request } else { &reminded };
            let completion = self.invoke(outgoing).await?;

            match llm_parse::parse(&completion.text) {
                Ok(parsed) => {
                    self.counters
                        .successful_parses
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        endpoint = %completion.endpoint,
                        strategy = %parsed.strategy,
                        "parsed structured reply"
                    );
                    return Ok(StructuredReply {
                        record: parsed.record,
                        strategy: parsed.strategy,
                        endpoint: completion.endpoint,
                        attempts: retries + 1,
                    });
                }
                Err(failure) => {
                    self.counters.failed_parses.fetch_add(1, Ordering::Relaxed);
                    if retries >= max_json_retries {
                        tracing::warn!(
                            attempts = retries + 1,
                            "reply still unparseable after JSON retries"
                        );
                        return Err(LlmError::Unparseable(failure));
                    }
                    retries += 1;
                    tracing::warn!(
                        retry = retries,
                        max_json_retries,
                        "reply was not parseable, requesting pure JSON"
                    );
                    self.sleeper.sleep(self.policy.json_retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Replies from a script; the last entry repeats once the script runs out.
    struct ScriptedEndpoint {
        name: String,
        script: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedEndpoint {
        fn new(name: &str, script: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Self::new(name, vec![Err("connection refused")])
        }

        fn replying(name: &str, text: &str) -> Arc<Self> {
            Self::new(name, vec![Ok(text)])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatEndpoint for ScriptedEndpoint {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            };
            next.map_err(|message| LlmError::Transport {
                endpoint: self.name.clone(),
                message,
            })
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn manager(
        endpoints: Vec<Arc<ScriptedEndpoint>>,
    ) -> (InvocationManager, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let endpoints = endpoints
            .into_iter()
            .map(|e| e as Arc<dyn ChatEndpoint>)
            .collect();
        let manager = InvocationManager::new(endpoints, BackoffPolicy::default())
            .unwrap()
            .with_sleeper(sleeper.clone());
        (manager, sleeper)
    }

    fn request() -> ChatRequest {
        ChatRequest::new("system", "review patient 1")
    }

    #[tokio::test]
    async fn failover_to_second_endpoint_without_sleeping() {
        let first = ScriptedEndpoint::failing("first");
        let second = ScriptedEndpoint::replying("second", "ok");
        let (manager, sleeper) = manager(vec![first.clone(), second.clone()]);

        let completion = manager.invoke(&request()).await.unwrap();

        assert_eq!(completion.text, "ok");
        assert_eq!(completion.endpoint, "second");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(manager.current_index(), 1);
    }

    #[tokio::test]
    async fn cursor_persists_between_calls() {
        let first = ScriptedEndpoint::failing("first");
        let second = ScriptedEndpoint::replying("second", "ok");
        let (manager, _) = manager(vec![first.clone(), second.clone()]);

        manager.invoke(&request()).await.unwrap();
        manager.invoke(&request()).await.unwrap();

        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 2);
    }

    #[tokio::test]
    async fn exhaustion_after_three_cycles_and_three_sleeps() {
        let a = ScriptedEndpoint::failing("a");
        let b = ScriptedEndpoint::failing("b");
        let (manager, sleeper) = manager(vec![a.clone(), b.clone()]);

        let err = manager.invoke(&request()).await.expect_err("all fail");

        assert!(matches!(err, LlmError::EndpointsExhausted { cycles: 3, .. }));
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(10); 3]);
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 3);
        assert_eq!(manager.stats().transport_failures, 6);
    }

    #[tokio::test]
    async fn recovery_in_a_later_cycle() {
        let flaky = ScriptedEndpoint::new("flaky", vec![Err("503"), Ok("back")]);
        let (manager, sleeper) = manager(vec![flaky.clone()]);

        let completion = manager.invoke(&request()).await.unwrap();

        assert_eq!(completion.text, "back");
        assert_eq!(sleeper.sleeps().len(), 1);
    }

    #[test]
    fn advance_is_compare_and_set() {
        let (manager, _) = manager(vec![
            ScriptedEndpoint::failing("a"),
            ScriptedEndpoint::failing("b"),
            ScriptedEndpoint::failing("c"),
        ]);

        manager.advance_from(0);
        manager.advance_from(0);
        assert_eq!(manager.current_index(), 1);

        manager.advance_from(1);
        manager.advance_from(2);
        assert_eq!(manager.current_index(), 0);
    }

    #[test]
    fn empty_endpoint_list_is_invalid() {
        let err = InvocationManager::new(Vec::new(), BackoffPolicy::default())
            .expect_err("no endpoints");
        assert!(matches!(err, LlmError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn json_retry_appends_reminder_and_succeeds() {
        let endpoint = ScriptedEndpoint::new(
            "only",
            vec![Ok("Sorry, here is my answer in prose."), Ok(r#"{"patient_id": "1"}"#)],
        );
        let (manager, sleeper) = manager(vec![endpoint.clone()]);

        let reply = manager
            .invoke_with_json_retry(&request(), 2)
            .await
            .unwrap();

        assert_eq!(reply.attempts, 2);
        assert_eq!(reply.strategy, ParseStrategy::Direct);
        assert_eq!(reply.record["patient_id"], "1");
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(1)]);

        let requests = endpoint.requests.lock().unwrap().clone();
        assert_eq!(requests[0], request());
        assert_eq!(requests[1], request().with_json_reminder());

        let stats = manager.stats();
        assert_eq!(stats.calls_attempted, 2);
        assert_eq!(stats.successful_parses, 1);
        assert_eq!(stats.failed_parses, 1);
    }

    #[tokio::test]
    async fn json_retry_gives_up_with_last_raw_text() {
        let endpoint = ScriptedEndpoint::replying("only", "still not json");
        let (manager, _) = manager(vec![endpoint.clone()]);

        let err = manager
            .invoke_with_json_retry(&request(), 2)
            .await
            .expect_err("never parses");

        match err {
            LlmError::Unparseable(failure) => assert_eq!(failure.raw_text, "still not json"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(endpoint.calls(), 3);
        assert_eq!(manager.stats().failed_parses, 3);
    }

    #[tokio::test]
    async fn json_retry_propagates_exhaustion_immediately() {
        let (manager, sleeper) = manager(vec![ScriptedEndpoint::failing("down")]);

        let err = manager
            .invoke_with_json_retry(&request(), 2)
            .await
            .expect_err("transport down");

        assert!(matches!(err, LlmError::EndpointsExhausted { .. }));
        assert_eq!(sleeper.sleeps().len(), 3);
        assert_eq!(manager.stats().failed_parses, 0);
    }
}
