use std::io::Write;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SummaryMode;
use crate::explain::{ExplainError, Explainer};
use crate::pr::{diff, PullRequest, SourceControl};
use crate::render::MarkupRenderer;
use crate::report::{Printer, RunReport, SummaryEntry};
use crate::ticket::{IssueTracker, TicketId, TicketPattern};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Explain(#[from] ExplainError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Explain mode needs a text-generation client")]
    MissingExplainer,
}

/// What to do with each PR once its ticket and diff are in hand.
/// Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Ask for an explanation and print it rendered.
    Explain,
    /// Print the diff as fetched.
    RawDiff,
    /// Print a per-file, per-hunk listing of added and removed lines.
    Inspect,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    /// Only process the PR whose extracted ticket equals this exactly.
    pub ticket_filter: Option<String>,
    pub summary: SummaryMode,
}

/// Sequences listing, ticket lookup, diff fetch and output for every PR.
pub struct Pipeline<'a> {
    source: &'a dyn SourceControl,
    tracker: &'a dyn IssueTracker,
    explainer: Option<Explainer<'a>>,
    pattern: TicketPattern,
    renderer: MarkupRenderer,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn SourceControl,
        tracker: &'a dyn IssueTracker,
        pattern: TicketPattern,
        renderer: MarkupRenderer,
    ) -> Self {
        Self {
            source,
            tracker,
            explainer: None,
            pattern,
            renderer,
        }
    }

    pub fn with_explainer(mut self, explainer: Explainer<'a>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Process every listed PR in order, then print the summary.
    ///
    /// A failed listing yields an empty report and no output. Ticket and
    /// diff failures skip the item. Text-generation failures abort the run.
    pub async fn run<W: Write>(
        &self,
        options: &RunOptions,
        printer: &mut Printer<W>,
    ) -> Result<RunReport, PipelineError> {
        if options.mode == Mode::Explain && self.explainer.is_none() {
            return Err(PipelineError::MissingExplainer);
        }

        let prs = match self.source.list_pull_requests().await {
            Ok(prs) => prs,
            Err(e) => {
                error!(error = %e, "failed to fetch pull requests");
                return Ok(RunReport::default());
            }
        };
        info!(count = prs.len(), mode = ?options.mode, "fetched pull requests");

        let mut report = RunReport::default();
        for pr in &prs {
            let Some(ticket_id) = self.pattern.extract(&pr.title) else {
                debug!(pr = pr.id, title = %pr.title, "no ticket in title");
                continue;
            };

            let processed = self
                .process(pr, &ticket_id, options, printer)
                .instrument(info_span!("pull_request", pr = pr.id, ticket = %ticket_id))
                .await?;

            if processed {
                report.processed += 1;
            }
            if processed || options.summary == SummaryMode::AllTagged {
                report.summary.push(SummaryEntry {
                    ticket_url: self.tracker.browse_url(&ticket_id),
                    ticket: ticket_id,
                    pr_id: pr.id,
                    pr_url: pr.url.clone(),
                });
            }
        }

        printer.summary(&report.summary)?;
        info!(processed = report.processed, listed = report.summary.len(), "run complete");
        Ok(report)
    }

    /// Returns whether the PR produced output.
    async fn process<W: Write>(
        &self,
        pr: &PullRequest,
        ticket_id: &TicketId,
        options: &RunOptions,
        printer: &mut Printer<W>,
    ) -> Result<bool, PipelineError> {
        if let Some(wanted) = &options.ticket_filter {
            if wanted != ticket_id.as_str() {
                return Ok(false);
            }
        }

        let ticket = match self.tracker.fetch_ticket(ticket_id).await {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(error = %e, "skipping: ticket lookup failed");
                return Ok(false);
            }
        };

        let diff_text = match self.source.fetch_diff(pr.id).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "skipping: diff fetch failed");
                return Ok(false);
            }
        };

        match options.mode {
            Mode::RawDiff => {
                printer.banner(pr, &ticket)?;
                printer.raw_diff(&diff_text)?;
            }
            Mode::Inspect => {
                let files = match diff::parse_diff(&diff_text) {
                    Ok(files) => files,
                    Err(e) => {
                        warn!(error = %e, "skipping: diff could not be parsed");
                        return Ok(false);
                    }
                };
                printer.banner(pr, &ticket)?;
                printer.inspection(&diff::inspect(&files))?;
            }
            Mode::Explain => {
                let explainer = self
                    .explainer
                    .as_ref()
                    .ok_or(PipelineError::MissingExplainer)?;
                let explanation = explainer.explain(&ticket.label(), &diff_text).await?;
                printer.banner(pr, &ticket)?;
                printer.explanation(&self.renderer.render(&explanation))?;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::TextGenerator;
    use crate::pr::PrError;
    use crate::render::Palette;
    use crate::ticket::{Ticket, TicketError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIFF: &str = "diff --git a/Cart.php b/Cart.php\n--- a/Cart.php\n+++ b/Cart.php\n@@ -1,1 +1,1 @@\n-return $t;\n+return max(0, $t);\n";

    struct FakeSource {
        prs: Option<Vec<PullRequest>>,
        diffs: HashMap<u64, String>,
    }

    #[async_trait]
    impl SourceControl for FakeSource {
        async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, PrError> {
            self.prs
                .clone()
                .ok_or_else(|| PrError::DiffParse("listing unavailable".to_string()))
        }

        async fn fetch_diff(&self, pr_id: u64) -> Result<String, PrError> {
            self.diffs
                .get(&pr_id)
                .cloned()
                .ok_or_else(|| PrError::DiffParse(format!("no diff for {pr_id}")))
        }
    }

    struct FakeTracker {
        known: Vec<&'static str>,
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn fetch_ticket(&self, id: &TicketId) -> Result<Ticket, TicketError> {
            if self.known.contains(&id.as_str()) {
                Ok(Ticket {
                    key: id.to_string(),
                    summary: format!("Summary of {id}"),
                })
            } else {
                Err(TicketError::Status {
                    status: reqwest::StatusCode::NOT_FOUND,
                    key: id.to_string(),
                })
            }
        }

        fn browse_url(&self, id: &TicketId) -> String {
            format!("https://jira.example/browse/{id}")
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExplainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExplainError::ServiceUnavailable("HTTP 503".to_string()))
            } else {
                Ok("Code Changes Explained:\nClamps the **total**.".to_string())
            }
        }
    }

    fn pr(id: u64, title: &str) -> PullRequest {
        PullRequest {
            id,
            title: title.to_string(),
            url: format!("https://bb.example/pullrequests/{id}"),
        }
    }

    /// Three PRs: TT-1 (all good), "Refactor utils" (no ticket), TT-3 (unknown ticket).
    fn fixtures() -> (FakeSource, FakeTracker) {
        let source = FakeSource {
            prs: Some(vec![
                pr(1, "TT-1 Clamp cart total"),
                pr(2, "Refactor utils"),
                pr(3, "TT-3 Unknown ticket"),
            ]),
            diffs: [(1, DIFF.to_string()), (3, DIFF.to_string())].into_iter().collect(),
        };
        let tracker = FakeTracker { known: vec!["TT-1"] };
        (source, tracker)
    }

    fn options(mode: Mode) -> RunOptions {
        RunOptions {
            mode,
            ticket_filter: None,
            summary: SummaryMode::AllTagged,
        }
    }

    fn pipeline<'a>(source: &'a FakeSource, tracker: &'a FakeTracker) -> Pipeline<'a> {
        Pipeline::new(
            source,
            tracker,
            TicketPattern::new(r"[A-Z]{2}-\d+").unwrap(),
            MarkupRenderer::new(Palette::ansi()),
        )
    }

    async fn run_to_string(
        pipeline: &Pipeline<'_>,
        options: &RunOptions,
    ) -> (Result<RunReport, PipelineError>, String) {
        let mut printer = Printer::new(Vec::new(), &Palette::ansi());
        let result = pipeline.run(options, &mut printer).await;
        (result, String::from_utf8(printer.into_inner()).unwrap())
    }

    #[tokio::test]
    async fn test_explain_mode_renders_and_skips_failures() {
        let (source, tracker) = fixtures();
        let generator = CountingGenerator::new(false);
        let pipeline = pipeline(&source, &tracker).with_explainer(Explainer::new(&generator));

        let (result, out) = run_to_string(&pipeline, &options(Mode::Explain)).await;
        let report = result.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(out.contains("PR: TT-1 Clamp cart total"));
        assert!(out.contains("Jira Ticket: TT-1 - Summary of TT-1"));
        assert!(out.contains("Clamps the \x1b[36mtotal\x1b[0m."));
        assert!(!out.contains("PR: TT-3"));
    }

    #[tokio::test]
    async fn test_summary_lists_all_tagged_items_by_default() {
        let (source, tracker) = fixtures();
        let generator = CountingGenerator::new(false);
        let pipeline = pipeline(&source, &tracker).with_explainer(Explainer::new(&generator));

        let (result, out) = run_to_string(&pipeline, &options(Mode::Explain)).await;
        let report = result.unwrap();

        let listed: Vec<u64> = report.summary.iter().map(|e| e.pr_id).collect();
        assert_eq!(listed, vec![1, 3]);
        assert!(out.contains("- [TT-1](https://jira.example/browse/TT-1) | PR: [1]("));
        assert!(out.contains("- [TT-3](https://jira.example/browse/TT-3) | PR: [3]("));
    }

    #[tokio::test]
    async fn test_processed_summary_mode_lists_only_output_items() {
        let (source, tracker) = fixtures();
        let mut opts = options(Mode::RawDiff);
        opts.summary = SummaryMode::Processed;

        let (result, _) = run_to_string(&pipeline(&source, &tracker), &opts).await;
        let report = result.unwrap();

        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].ticket.as_str(), "TT-1");
    }

    #[tokio::test]
    async fn test_raw_mode_echoes_diff_without_generation() {
        let (source, tracker) = fixtures();
        let generator = CountingGenerator::new(false);
        let pipeline = pipeline(&source, &tracker).with_explainer(Explainer::new(&generator));

        let (result, out) = run_to_string(&pipeline, &options(Mode::RawDiff)).await;

        assert_eq!(result.unwrap().processed, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(out.contains(DIFF));
    }

    #[tokio::test]
    async fn test_raw_mode_needs_no_explainer() {
        let (source, tracker) = fixtures();
        let (result, _) = run_to_string(&pipeline(&source, &tracker), &options(Mode::RawDiff)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_explain_mode_without_explainer_is_an_error() {
        let (source, tracker) = fixtures();
        let (result, out) = run_to_string(&pipeline(&source, &tracker), &options(Mode::Explain)).await;
        assert!(matches!(result, Err(PipelineError::MissingExplainer)));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_inspect_mode_lists_hunks() {
        let (source, tracker) = fixtures();
        let (result, out) = run_to_string(&pipeline(&source, &tracker), &options(Mode::Inspect)).await;

        assert_eq!(result.unwrap().processed, 1);
        assert!(out.contains("File: Cart.php"));
        assert!(out.contains("Hunk with 1 lines added and 1 lines removed:"));
        assert!(out.contains("Added: return max(0, $t);"));
    }

    #[tokio::test]
    async fn test_ticket_filter_processes_only_matching_item() {
        let (source, tracker) = fixtures();
        let generator = CountingGenerator::new(false);
        let pipeline = pipeline(&source, &tracker).with_explainer(Explainer::new(&generator));
        let mut opts = options(Mode::Explain);
        opts.ticket_filter = Some("TT-3".to_string());

        let (result, out) = run_to_string(&pipeline, &opts).await;
        let report = result.unwrap();

        // TT-3's lookup fails, TT-1 is filtered out
        assert_eq!(report.processed, 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(!out.contains("PR: TT-1"));
        assert_eq!(report.summary.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_diff_skips_item() {
        let (mut source, tracker) = fixtures();
        source.diffs.clear();
        let (result, out) = run_to_string(&pipeline(&source, &tracker), &options(Mode::RawDiff)).await;

        assert_eq!(result.unwrap().processed, 0);
        assert!(!out.contains("PR: TT-1"));
    }

    #[tokio::test]
    async fn test_listing_failure_produces_no_output() {
        let (mut source, tracker) = fixtures();
        source.prs = None;
        let (result, out) = run_to_string(&pipeline(&source, &tracker), &options(Mode::RawDiff)).await;

        let report = result.unwrap();
        assert_eq!(report.processed, 0);
        assert!(report.summary.is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_run() {
        let (source, tracker) = fixtures();
        let generator = CountingGenerator::new(true);
        let pipeline = pipeline(&source, &tracker).with_explainer(Explainer::new(&generator));

        let (result, out) = run_to_string(&pipeline, &options(Mode::Explain)).await;

        assert!(matches!(
            result,
            Err(PipelineError::Explain(ExplainError::ServiceUnavailable(_)))
        ));
        assert!(!out.contains("List of Explained Tickets"));
    }
}
