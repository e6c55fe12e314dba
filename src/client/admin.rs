//! Admin side of the scan handshake.
//!
//! A camera keeps delivering frames while a code is being looked up, so the
//! controller only lets one frame through at a time: entering `Decoding`
//! takes a [`PhaseLatch`] and every frame that arrives while it is held is
//! dropped. The latch is released on every exit path, including early
//! returns and a cancelled future, so the scanner never stays stuck.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use super::AdminBackend;
use crate::{
    error::{AppError, AppResult},
    models::{Borrowing, BorrowIntent, LookupResult},
    qr,
    services::{borrowings::DueDatePolicy, scan::ProcessScan},
};

/// Turns a camera frame or uploaded image into QR text
pub trait FrameDecoder: Send + Sync {
    /// Text of the code in the frame, `None` if the frame holds no code
    fn decode(&self, frame: &[u8]) -> Option<String>;
}

/// Decoder for frames that already carry the code's text, as produced by
/// hardware scanners in keyboard mode
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8FrameDecoder;

impl FrameDecoder for Utf8FrameDecoder {
    fn decode(&self, frame: &[u8]) -> Option<String> {
        let text = std::str::from_utf8(frame).ok()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// A looked-up request under review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReview {
    pub intent: BorrowIntent,
    pub lookup: LookupResult,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdminScanState {
    #[default]
    Idle,
    Decoding,
    Reviewing(ScanReview),
    /// Looked up, but the item has no stock. Only cancel is possible.
    Blocked(ScanReview),
    Committing(ScanReview),
}

impl AdminScanState {
    fn review(&self) -> Option<&ScanReview> {
        match self {
            AdminScanState::Reviewing(r) | AdminScanState::Blocked(r) | AdminScanState::Committing(r) => Some(r),
            AdminScanState::Idle | AdminScanState::Decoding => None,
        }
    }
}

/// What became of a frame
#[derive(Debug)]
pub enum FrameOutcome {
    /// Another frame is being handled, or a request is already under review
    Ignored,
    Rejected(AppError),
    Reviewing(ScanReview),
    Blocked(ScanReview),
}

#[derive(Default)]
struct Inner {
    state: AdminScanState,
    last_error: Option<String>,
    last_confirmation: Option<Borrowing>,
}

/// Holds the controller in a transient phase and falls back when dropped
/// without being resolved
struct PhaseLatch<'a> {
    inner: &'a Mutex<Inner>,
    fallback: Option<AdminScanState>,
}

impl<'a> PhaseLatch<'a> {
    /// Enter `Decoding` from `Idle`. `None` if the scanner is busy.
    fn enter_decoding(inner: &'a Mutex<Inner>) -> Option<Self> {
        let mut guard = lock(inner);
        if guard.state != AdminScanState::Idle {
            return None;
        }
        guard.state = AdminScanState::Decoding;
        Some(Self {
            inner,
            fallback: Some(AdminScanState::Idle),
        })
    }

    /// Enter `Committing` from `Reviewing`, returning the review to submit
    fn enter_committing(inner: &'a Mutex<Inner>) -> AppResult<(Self, ScanReview)> {
        let mut guard = lock(inner);
        let review = match &guard.state {
            AdminScanState::Reviewing(review) => review.clone(),
            AdminScanState::Blocked(review) => {
                return Err(AppError::StockUnavailable(format!(
                    "{} is out of stock",
                    review.lookup.item_name
                )))
            }
            _ => return Err(AppError::BusinessRule("No scanned request to approve".to_string())),
        };
        guard.state = AdminScanState::Committing(review.clone());
        Ok((
            Self {
                inner,
                fallback: Some(AdminScanState::Reviewing(review.clone())),
            },
            review,
        ))
    }

    fn resolve(mut self, next: AdminScanState) {
        self.fallback = None;
        lock(self.inner).state = next;
    }
}

impl Drop for PhaseLatch<'_> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            lock(self.inner).state = fallback;
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One admin's scanning session
pub struct AdminScanController<B, D = Utf8FrameDecoder> {
    backend: Arc<B>,
    decoder: D,
    due_dates: DueDatePolicy,
    inner: Mutex<Inner>,
}

impl<B: AdminBackend> AdminScanController<B, Utf8FrameDecoder> {
    pub fn new(backend: Arc<B>, due_dates: DueDatePolicy) -> Self {
        Self::with_decoder(backend, Utf8FrameDecoder, due_dates)
    }
}

impl<B: AdminBackend, D: FrameDecoder> AdminScanController<B, D> {
    pub fn with_decoder(backend: Arc<B>, decoder: D, due_dates: DueDatePolicy) -> Self {
        Self {
            backend,
            decoder,
            due_dates,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> AdminScanState {
        lock(&self.inner).state.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).last_error.clone()
    }

    /// Borrowing created by the last successful submit
    pub fn last_confirmation(&self) -> Option<Borrowing> {
        lock(&self.inner).last_confirmation.clone()
    }

    /// Feed one camera frame or uploaded image
    pub async fn on_frame(&self, frame: &[u8]) -> FrameOutcome {
        let Some(latch) = PhaseLatch::enter_decoding(&self.inner) else {
            return FrameOutcome::Ignored;
        };

        match self.decoder.decode(frame) {
            Some(text) => self.resolve(latch, &text).await,
            None => self.reject(AppError::MalformedPayload("No QR code found in image".to_string())),
        }
    }

    /// Feed text a scanner already decoded
    pub async fn on_text(&self, text: &str) -> FrameOutcome {
        let Some(latch) = PhaseLatch::enter_decoding(&self.inner) else {
            return FrameOutcome::Ignored;
        };
        self.resolve(latch, text).await
    }

    async fn resolve(&self, latch: PhaseLatch<'_>, text: &str) -> FrameOutcome {
        let intent = match qr::decode(text) {
            Ok(intent) => intent,
            Err(e) => return self.reject(e.into()),
        };

        let lookup = match self.backend.lookup(intent.user_id, intent.item_id).await {
            Ok(lookup) => lookup,
            Err(e) => return self.reject(e),
        };

        let review = ScanReview {
            intent,
            lookup,
            return_date: None,
        };
        lock(&self.inner).last_error = None;

        if review.lookup.item_stock > 0 {
            latch.resolve(AdminScanState::Reviewing(review.clone()));
            FrameOutcome::Reviewing(review)
        } else {
            tracing::info!(
                user_id = review.intent.user_id,
                item_id = review.intent.item_id,
                "Scanned item is out of stock"
            );
            latch.resolve(AdminScanState::Blocked(review.clone()));
            FrameOutcome::Blocked(review)
        }
    }

    fn reject(&self, error: AppError) -> FrameOutcome {
        tracing::debug!("Scan rejected: {}", error);
        lock(&self.inner).last_error = Some(error.to_string());
        FrameOutcome::Rejected(error)
    }

    /// Pick the loan's last day. It must not be before today.
    pub fn set_return_date(&self, date: NaiveDate) -> AppResult<()> {
        self.due_dates.resolve(date, Utc::now())?;

        let mut inner = lock(&self.inner);
        match &mut inner.state {
            AdminScanState::Reviewing(review) => {
                review.return_date = Some(date);
                Ok(())
            }
            _ => Err(AppError::BusinessRule("No scanned request under review".to_string())),
        }
    }

    /// Approve the reviewed request.
    ///
    /// On success the controller returns to `Idle` with the new borrowing as
    /// its confirmation. On failure it returns to `Reviewing` with the error
    /// recorded, and the admin may retry or cancel.
    pub async fn submit(&self) -> AppResult<Borrowing> {
        let (latch, review) = PhaseLatch::enter_committing(&self.inner)?;

        let Some(return_date) = review.return_date else {
            return Err(AppError::MissingFields("Return date is required".to_string()));
        };

        let request = ProcessScan {
            user_id: review.intent.user_id,
            item_id: review.intent.item_id,
            return_date,
        };

        match self.backend.process_scan(&request).await {
            Ok(borrowing) => {
                {
                    let mut inner = lock(&self.inner);
                    inner.last_error = None;
                    inner.last_confirmation = Some(borrowing.clone());
                }
                latch.resolve(AdminScanState::Idle);
                tracing::info!(borrowing_id = borrowing.id, "Borrowing approved");
                Ok(borrowing)
            }
            Err(e) => {
                lock(&self.inner).last_error = Some(e.to_string());
                drop(latch);
                Err(e)
            }
        }
    }

    /// Abandon the request under review and tell the borrower.
    ///
    /// The controller is back in `Idle` whatever the server answers; a slot
    /// the server could not reset expires on its own. Returns `false` when
    /// there was nothing to cancel.
    pub async fn cancel(&self) -> AppResult<bool> {
        let user_id = {
            let mut inner = lock(&self.inner);
            let user_id = match &inner.state {
                AdminScanState::Reviewing(r) | AdminScanState::Blocked(r) => r.intent.user_id,
                _ => return Ok(false),
            };
            inner.state = AdminScanState::Idle;
            user_id
        };

        if let Err(e) = self.backend.cancel_scan(user_id).await {
            tracing::warn!(user_id, "Cancel not delivered: {}", e);
            lock(&self.inner).last_error = Some(e.to_string());
            return Err(e);
        }
        Ok(true)
    }

    /// The request currently shown to the admin, if any
    pub fn review(&self) -> Option<ScanReview> {
        lock(&self.inner).state.review().cloned()
    }
}
