use crate::dom::{Document, ElementSnapshot};
use crate::error::{RelayError, Result};
use crate::locator::score::{rank, score};
use crate::locator::{Candidate, LocateOptions, LocateResult, SelectorStrategy};
use serde::Serialize;
use tokio::time::{Instant, sleep};

/// Strategies in the order they are tried: ascending priority, declaration order for ties
fn ordered(strategies: &[SelectorStrategy]) -> Vec<&SelectorStrategy> {
    let mut ordered: Vec<&SelectorStrategy> = strategies.iter().collect();
    ordered.sort_by_key(|s| s.priority);
    ordered
}

/// Best validated candidate of one strategy, if any
fn best_of(document: &dyn Document, strategy: &SelectorStrategy) -> Result<Option<Candidate>> {
    let mut scored: Vec<(ElementSnapshot, f64)> = strategy
        .matcher
        .find(document)?
        .into_iter()
        .filter(|snapshot| strategy.validator.accepts(snapshot))
        .map(|snapshot| {
            let value = score(&snapshot, strategy.scoring, &strategy.hints);
            (snapshot, value)
        })
        .collect();

    rank(&mut scored);

    Ok(scored.into_iter().next().map(|(element, score)| Candidate {
        element,
        score,
        source: strategy.id.clone(),
    }))
}

/// One poll tick: the first strategy yielding any valid candidate wins
fn resolve_once(document: &dyn Document, strategies: &[&SelectorStrategy]) -> Option<Candidate> {
    for strategy in strategies {
        match best_of(document, strategy) {
            Ok(Some(candidate)) => return Some(candidate),
            Ok(None) => {}
            Err(e) => log::debug!("Strategy '{}' failed this tick: {}", strategy.id, e),
        }
    }
    None
}

/// Locate an element by trying strategies in priority order until one yields a
/// valid candidate or the deadline passes.
///
/// Every tick resolves from scratch against the live document. A `found=false`
/// result is only returned once the full deadline has elapsed.
pub async fn locate(
    document: &dyn Document,
    strategies: &[SelectorStrategy],
    options: LocateOptions,
) -> Result<LocateResult> {
    if strategies.is_empty() {
        return Err(RelayError::InvalidArgument("at least one strategy is required".to_string()));
    }
    options.validate()?;

    let strategies = ordered(strategies);
    let started = Instant::now();
    let deadline = started + options.deadline;
    let mut attempts_made = 0u32;
    let mut context_resets = 0u32;
    let mut context = document.context_id().ok();

    loop {
        let current = document.context_id().ok();
        if current.is_some() && current != context {
            log::info!(
                "Document changed from {:?} to {:?}; restarting resolution on the new page",
                context,
                current
            );
            context_resets += 1;
            context = current;
        }

        attempts_made += 1;
        if let Some(candidate) = resolve_once(document, &strategies) {
            log::debug!(
                "Located {} via '{}' (score {}) after {} attempt(s)",
                candidate.element.handle,
                candidate.source,
                candidate.score,
                attempts_made
            );
            return Ok(LocateResult {
                found: true,
                element: Some(candidate),
                attempts_made,
                elapsed_ms: started.elapsed().as_millis() as u64,
                context_resets,
            });
        }

        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "No strategy matched within {:?} ({} attempts)",
                options.deadline,
                attempts_made
            );
            return Ok(LocateResult {
                found: false,
                element: None,
                attempts_made,
                elapsed_ms: started.elapsed().as_millis() as u64,
                context_resets,
            });
        }

        sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// One raw match as seen by a strategy
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosedElement {
    pub element: ElementSnapshot,
    pub accepted: bool,
    pub score: f64,
}

/// Everything one strategy sees on the current page
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub id: String,
    pub priority: i32,
    pub matches: Vec<DiagnosedElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StrategyReport {
    pub fn accepted(&self) -> usize {
        self.matches.iter().filter(|m| m.accepted).count()
    }
}

/// Report every strategy's raw matches, validator verdicts and scores in trial order
pub fn diagnose(document: &dyn Document, strategies: &[SelectorStrategy]) -> Vec<StrategyReport> {
    ordered(strategies)
        .into_iter()
        .map(|strategy| match strategy.matcher.find(document) {
            Ok(found) => StrategyReport {
                id: strategy.id.clone(),
                priority: strategy.priority,
                matches: found
                    .into_iter()
                    .map(|element| DiagnosedElement {
                        accepted: strategy.validator.accepts(&element),
                        score: score(&element, strategy.scoring, &strategy.hints),
                        element,
                    })
                    .collect(),
                error: None,
            },
            Err(e) => StrategyReport {
                id: strategy.id.clone(),
                priority: strategy.priority,
                matches: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect()
}
