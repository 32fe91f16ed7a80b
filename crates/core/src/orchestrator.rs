//! Bounded-concurrency dispatch of adjudication requests.
//!
//! Every request becomes its own task; a semaphore sized from [`CoreConfig::max_workers`] limits
//! how many are talking to the LLM at once. Requests stay with the dispatcher, keyed by task id,
//! so a failure in one task, including a panic, becomes that request's failure record and never
//! aborts the batch.

use crate::adjudication::{
    AdjudicationRequest, AdjudicationResult, CaseContext, CaseReview, CodeClassification,
    FailedReview,
};
use crate::config::CoreConfig;
use crate::dataset::PatientRow;
use crate::prompts;
use crate::ReviewError;
use llm_client::{InvocationManager, InvocationStats, LlmError, StructuredReply};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

const PARSE_FAILURE_MESSAGE: &str = "Failed to parse AI response";

type TaskOutcome = Result<Result<StructuredReply, LlmError>, JoinError>;

/// Runs classification and review batches against a shared [`InvocationManager`].
#[derive(Clone, Debug)]
pub struct CaseReviewer {
    llm: Arc<InvocationManager>,
    config: Arc<CoreConfig>,
}

impl CaseReviewer {
    pub fn new(llm: Arc<InvocationManager>, config: Arc<CoreConfig>) -> Self {
        Self { llm, config }
    }

    pub fn stats(&self) -> InvocationStats {
        self.llm.stats()
    }

    /// Classify each missed code. Output is in input order, one entry per code.
    pub async fn classify_codes(&self, codes: Vec<String>) -> Vec<CodeClassification> {
        tracing::info!(codes = codes.len(), "classifying missed codes");
        let requests = codes
            .into_iter()
            .map(|code| AdjudicationRequest::Classification { code })
            .collect();

        self.dispatch(requests)
            .await
            .into_iter()
            .map(|(request, outcome)| classification_outcome(request.subject(), outcome))
            .collect()
    }

    /// Review partial match cases. Output is in input order, one result per case.
    pub async fn review_partial_matches(&self, cases: &[&PatientRow]) -> Vec<AdjudicationResult> {
        tracing::info!(cases = cases.len(), "reviewing partial matches");
        let requests = cases
            .iter()
            .map(|row| AdjudicationRequest::PartialReview(CaseContext::from_row(row)))
            .collect();
        self.review(requests).await
    }

    /// Review no match cases. Output is in input order, one result per case.
    pub async fn review_no_matches(&self, cases: &[&PatientRow]) -> Vec<AdjudicationResult> {
        tracing::info!(cases = cases.len(), "reviewing no match cases");
        let requests = cases
            .iter()
            .map(|row| AdjudicationRequest::NoMatchReview(CaseContext::from_row(row)))
            .collect();
        self.review(requests).await
    }

    async fn review(&self, requests: Vec<AdjudicationRequest>) -> Vec<AdjudicationResult> {
        let results: Vec<AdjudicationResult> = self
            .dispatch(requests)
            .await
            .into_iter()
            .map(|(request, outcome)| review_outcome(&request, outcome))
            .collect();

        let reviewed = results.iter().filter(|r| r.is_reviewed()).count();
        tracing::info!(
            reviewed,
            failed = results.len() - reviewed,
            "review batch finished"
        );
        results
    }

    async fn dispatch(
        &self,
        requests: Vec<AdjudicationRequest>,
    ) -> Vec<(AdjudicationRequest, TaskOutcome)> {
        let llm = Arc::clone(&self.llm);
        let max_json_retries = self.config.max_json_retries();
        run_bounded(requests, self.config.max_workers(), move |request| {
            let llm = Arc::clone(&llm);
            async move {
                let chat = prompts::chat_request(&request);
                llm.invoke_with_json_retry(&chat, max_json_retries).await
            }
        })
        .await
    }
}

/// Run `work` for every request, at most `max_workers` at a time, and return one outcome per
/// request in request order. A task that panics or is cancelled yields its `JoinError`.
async fn run_bounded<T, F, Fut>(
    requests: Vec<AdjudicationRequest>,
    max_workers: usize,
    work: F,
) -> Vec<(AdjudicationRequest, Result<T, JoinError>)>
where
    F: Fn(AdjudicationRequest) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let total = requests.len();
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<Id, (usize, AdjudicationRequest)> = HashMap::with_capacity(total);

    for (index, request) in requests.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = work(request.clone());
        let handle = tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            job.await
        });
        pending.insert(handle.id(), (index, request));
    }

    let mut finished = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, value)) => (id, Ok(value)),
            Err(err) => (err.id(), Err(err)),
        };
        let Some((index, request)) = pending.remove(&id) else {
            tracing::error!(task = %id, "finished task has no matching request");
            continue;
        };
        tracing::debug!(
            kind = %request.case_kind(),
            subject = request.subject(),
            completed = finished.len() + 1,
            total,
            "request finished"
        );
        finished.push((index, request, outcome));
    }

    finished.sort_by_key(|(index, _, _)| *index);
    finished
        .into_iter()
        .map(|(_, request, outcome)| (request, outcome))
        .collect()
}

fn record_text(reply: &StructuredReply) -> String {
    serde_json::to_string(&reply.record).unwrap_or_default()
}

fn classification_outcome(code: &str, outcome: TaskOutcome) -> CodeClassification {
    match outcome {
        Ok(Ok(reply)) => {
            let raw = record_text(&reply);
            match CodeClassification::from_record(reply.record, code) {
                Ok(classification) => {
                    tracing::info!(
                        code,
                        classification = ?classification.classification,
                        "classified code"
                    );
                    classification
                }
                Err(err) => {
                    tracing::warn!(code, error = %err, "classification reply did not match schema");
                    CodeClassification::parsing_error(code, raw)
                }
            }
        }
        Ok(Err(LlmError::Unparseable(failure))) => {
            tracing::warn!(code, "classification reply was not parseable");
            CodeClassification::parsing_error(code, failure.raw_text)
        }
        Ok(Err(err)) => {
            tracing::error!(code, error = %err, "classification request failed");
            CodeClassification::api_error(code, &err.to_string())
        }
        Err(err) => {
            tracing::error!(code, error = %err, "classification task failed");
            CodeClassification::api_error(code, &format!("Execution error: {err}"))
        }
    }
}

fn review_outcome(request: &AdjudicationRequest, outcome: TaskOutcome) -> AdjudicationResult {
    let patient_id = request.patient_id().cloned();
    let failed = |error: String, raw_response: Option<String>| {
        AdjudicationResult::Failed(FailedReview {
            patient_id: patient_id.clone(),
            error,
            raw_response,
        })
    };

    match outcome {
        Ok(Ok(reply)) => {
            let raw = record_text(&reply);
            match CaseReview::from_record(reply.record) {
                Ok(mut review) => {
                    if review.patient_id.is_none() {
                        tracing::debug!(
                            patient_id = request.subject(),
                            "review omitted patient id, using request's"
                        );
                        review.patient_id = patient_id.clone();
                    }
                    tracing::info!(patient_id = request.subject(), "completed review");
                    AdjudicationResult::Reviewed(review)
                }
                Err(err @ ReviewError::InvalidResponse { .. }) => {
                    tracing::warn!(
                        patient_id = request.subject(),
                        error = %err,
                        "review reply did not match schema"
                    );
                    failed(PARSE_FAILURE_MESSAGE.into(), Some(raw))
                }
                Err(err) => failed(format!("API error: {err}"), None),
            }
        }
        Ok(Err(LlmError::Unparseable(failure))) => {
            tracing::warn!(patient_id = request.subject(), "review reply was not parseable");
            failed(PARSE_FAILURE_MESSAGE.into(), Some(failure.raw_text))
        }
        Ok(Err(err)) => {
            tracing::error!(patient_id = request.subject(), error = %err, "review request failed");
            failed(format!("API error: {err}"), None)
        }
        Err(err) => {
            tracing::error!(patient_id = request.subject(), error = %err, "review task failed");
            failed(format!("Execution error: {err}"), None)
        }
    }
}
