use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{AppliedLine, ClaimLine, LineOutcome, SkipReason, SkippedLine};
use crate::cart::{Cart, CartStore};
use crate::donations::{ClaimWrite, Donation, DonationStatus, InventoryStore};
use crate::error::AppError;
use crate::notifications::NotificationDispatcher;

/// Result of a committed checkout.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub lines: Vec<LineOutcome>,
    /// Inventory as it stands after the checkout.
    pub donations: Vec<Donation>,
    pub cart: Cart,
    /// Claim notifications, started after the writes were committed.
    pub notifications: JoinHandle<()>,
}

impl CheckoutOutcome {
    pub fn applied_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, LineOutcome::Applied(_)))
            .count()
    }
}

/// Moves donations from a user's cart into claimed inventory.
///
/// Each line is written with one conditional store update, so two users
/// racing for the last serving are serialized by the store and only one of
/// them gets an applied line. Bad lines are skipped and reported, never
/// fatal. The cart is cleared once every line has been attempted, and
/// notifications go out only after that.
pub struct ClaimReconciler {
    inventory: Arc<dyn InventoryStore>,
    carts: Arc<dyn CartStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

enum Stage {
    Nothing,
    Partial(usize),
}

impl Stage {
    fn fail(&self, source: anyhow::Error) -> AppError {
        match *self {
            Stage::Nothing => AppError::Store(source),
            Stage::Partial(applied) => AppError::CheckoutInterrupted { applied, source },
        }
    }
}

impl ClaimReconciler {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        carts: Arc<dyn CartStore>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            inventory,
            carts,
            dispatcher,
        }
    }

    #[instrument(skip(self, claims), fields(lines = claims.len()))]
    pub async fn checkout(
        &self,
        user_id: &str,
        claims: &[ClaimLine],
        now: OffsetDateTime,
    ) -> Result<CheckoutOutcome, AppError> {
        if claims.is_empty() {
            return Err(AppError::Validation("Claims are required".into()));
        }
        let has_items = self
            .carts
            .find(user_id)
            .await?
            .is_some_and(|cart| !cart.items.is_empty());
        if !has_items {
            return Err(AppError::Validation("Cart is empty".into()));
        }

        let mut committed = Vec::new();
        let result = self.commit(user_id, claims, now, &mut committed).await;
        // Lines that made it to the store get their notices even if a later
        // step failed.
        let notifications = self.spawn_notifications(user_id, committed);

        let (lines, donations, cart) = result?;
        Ok(CheckoutOutcome {
            lines,
            donations,
            cart,
            notifications,
        })
    }

    async fn commit(
        &self,
        user_id: &str,
        claims: &[ClaimLine],
        now: OffsetDateTime,
        committed: &mut Vec<Donation>,
    ) -> Result<(Vec<LineOutcome>, Vec<Donation>, Cart), AppError> {
        let ids: Vec<Uuid> = claims.iter().filter_map(parse_id).collect();
        let known: HashMap<Uuid, Donation> = self
            .inventory
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let mut lines = Vec::with_capacity(claims.len());
        for claim in claims {
            let stage = stage_of(committed);
            let line = match self.claim_line(claim, &known, user_id, now).await {
                Ok(Ok((applied, donation))) => {
                    committed.push(donation);
                    LineOutcome::Applied(applied)
                }
                Ok(Err(reason)) => {
                    warn!(donation_id = ?claim.donation_id, ?reason, "checkout line skipped");
                    LineOutcome::Skipped(SkippedLine {
                        donation_id: claim.donation_id.clone(),
                        reason,
                    })
                }
                Err(e) => return Err(stage.fail(e)),
            };
            lines.push(line);
        }

        let stage = stage_of(committed);
        let cart = self
            .carts
            .clear(user_id)
            .await
            .map_err(|e| stage.fail(e))?
            .unwrap_or_else(|| Cart::empty(user_id, now));
        let donations = self.inventory.list_all().await.map_err(|e| stage.fail(e))?;

        info!(
            applied = committed.len(),
            skipped = lines.len() - committed.len(),
            "checkout committed"
        );
        Ok((lines, donations, cart))
    }

    /// Inner `Err` is a skip; outer `Err` is a store failure.
    async fn claim_line(
        &self,
        claim: &ClaimLine,
        known: &HashMap<Uuid, Donation>,
        user_id: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Result<(AppliedLine, Donation), SkipReason>> {
        let Some(id) = parse_id(claim) else {
            return Ok(Err(SkipReason::InvalidDonationId));
        };
        let requested = match claim.servings {
            Some(s) if s >= 1 => i32::try_from(s).unwrap_or(i32::MAX),
            _ => return Ok(Err(SkipReason::InvalidServings)),
        };
        match known.get(&id) {
            None => return Ok(Err(SkipReason::NotFound)),
            Some(d) if !d.is_claimable() => return Ok(Err(SkipReason::Unavailable)),
            Some(_) => {}
        }

        Ok(
            match self.inventory.apply_claim(id, requested, user_id, now).await? {
                ClaimWrite::Applied {
                    donation,
                    previous_quantity,
                } => {
                    let line = AppliedLine {
                        donation_id: id,
                        requested,
                        granted: requested.min(previous_quantity),
                        remaining: donation.quantity,
                        fully_claimed: donation.status == DonationStatus::Claimed,
                    };
                    info!(
                        donation_id = %id,
                        granted = line.granted,
                        remaining = line.remaining,
                        "claim applied"
                    );
                    Ok((line, donation))
                }
                ClaimWrite::NotFound => Err(SkipReason::NotFound),
                ClaimWrite::Unavailable { status, quantity } => {
                    debug!(donation_id = %id, ?status, quantity, "lost claim race");
                    Err(SkipReason::Unavailable)
                }
            },
        )
    }

    fn spawn_notifications(&self, user_id: &str, claimed: Vec<Donation>) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            for donation in &claimed {
                dispatcher.notify_claim(donation, &user_id).await;
            }
        })
    }
}

fn parse_id(claim: &ClaimLine) -> Option<Uuid> {
    claim
        .donation_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

fn stage_of(committed: &[Donation]) -> Stage {
    if committed.is_empty() {
        Stage::Nothing
    } else {
        Stage::Partial(committed.len())
    }
}
