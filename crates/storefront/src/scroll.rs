//! Infinite scroll controller.
//!
//! The browser reports its scroll position on every (throttled, passive)
//! scroll event. The controller hands out at most one [`LoadTicket`] at a
//! time: only when no load is in flight, more pages remain, and the viewport
//! bottom is within the threshold of the document bottom. The ticket is
//! redeemed with [`InfiniteScroll::complete`] once the fetch resolves.

use serde::Deserialize;

/// Distance from the document bottom, in CSS pixels, that triggers a load.
pub const DEFAULT_THRESHOLD: f64 = 200.0;

/// Scroll position as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScrollMetrics {
    /// `window.scrollY`
    pub scroll_top: f64,
    /// `window.innerHeight`
    pub viewport_height: f64,
    /// `document.documentElement.scrollHeight`
    pub document_height: f64,
}

impl ScrollMetrics {
    /// Pixels between the bottom of the viewport and the bottom of the document.
    #[must_use]
    pub fn distance_to_bottom(&self) -> f64 {
        (self.document_height - (self.scroll_top + self.viewport_height)).max(0.0)
    }

    #[must_use]
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.distance_to_bottom() <= threshold
    }
}

/// Permission to fetch one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Page to fetch.
    pub page: u32,
    /// List generation the ticket was issued for.
    pub generation: u64,
}

/// Result of the fetch a ticket was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page arrived; `has_more` comes from its pagination block.
    Loaded { has_more: bool },
    /// The fetch failed; the page counter is left where it was.
    Failed,
}

/// Guards next-page loads behind in-flight and has-more flags.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteScroll {
    threshold: f64,
    page: u32,
    has_more: bool,
    generation: u64,
    in_flight: Option<LoadTicket>,
}

impl InfiniteScroll {
    /// An idle controller with nothing to load yet.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            page: 1,
            has_more: false,
            generation: 0,
            in_flight: None,
        }
    }

    /// Start over after a fresh first-page load of list `generation`.
    ///
    /// Any in-flight ticket becomes stale.
    pub const fn reset(&mut self, generation: u64, page: u32, has_more: bool) {
        self.generation = generation;
        self.page = page;
        self.has_more = has_more;
        self.in_flight = None;
    }

    /// Stop issuing tickets, e.g. when the list page is unmounted.
    pub const fn disable(&mut self) {
        self.has_more = false;
        self.in_flight = None;
    }

    /// Handle a scroll event. Returns a ticket when a load should start.
    pub fn on_scroll(&mut self, metrics: &ScrollMetrics) -> Option<LoadTicket> {
        if self.in_flight.is_some() || !self.has_more || !metrics.is_near_bottom(self.threshold) {
            return None;
        }

        let ticket = LoadTicket {
            page: self.page.saturating_add(1),
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Redeem a ticket. Returns `false` for a stale ticket, whose result must
    /// be discarded.
    pub fn complete(&mut self, ticket: LoadTicket, outcome: LoadOutcome) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }

        self.in_flight = None;
        if let LoadOutcome::Loaded { has_more } = outcome {
            self.page = ticket.page;
            self.has_more = has_more;
        }
        true
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Last page merged into the list.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for InfiniteScroll {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
