use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::geo::{format_km, haversine_m, maps_directions_url};
use super::push::PushTransport;
use super::repo::NotificationStore;
use super::repo_types::{NewNotification, Notification, KIND_DONATION_CLAIMED, KIND_TEST};
use crate::donations::Donation;
use crate::users::{UserDirectory, UserProfile};

const CLAIMED_TITLE: &str = "Donation Claimed";

/// Best-effort fan-out of claim notices. Nothing here returns an error to
/// the checkout path: failures are logged and the feed entry is still
/// written with `delivered = false`.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    feed: Arc<dyn NotificationStore>,
    push: Arc<dyn PushTransport>,
    pickup_window: time::Duration,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        feed: Arc<dyn NotificationStore>,
        push: Arc<dyn PushTransport>,
        pickup_window: time::Duration,
    ) -> Self {
        Self {
            users,
            feed,
            push,
            pickup_window,
        }
    }

    #[instrument(skip(self, donation), fields(donation_id = %donation.id))]
    pub async fn notify_claim(&self, donation: &Donation, claimer_email: &str) {
        let claimer = self.lookup(claimer_email).await;
        let donor = self.lookup(&donation.email).await;

        let donor_body = donor_message(claimer.as_ref());
        self.deliver(
            &donation.email,
            donor.as_ref(),
            CLAIMED_TITLE,
            &donor_body,
            KIND_DONATION_CLAIMED,
            json!({
                "type": KIND_DONATION_CLAIMED,
                "donationId": donation.id,
                "claimedBy": claimer_email,
            }),
        )
        .await;

        let map_url = donation.coordinates.map(maps_directions_url);
        let recipient_body = recipient_message(donation, claimer.as_ref(), self.pickup_window);
        self.deliver(
            claimer_email,
            claimer.as_ref(),
            CLAIMED_TITLE,
            &recipient_body,
            KIND_DONATION_CLAIMED,
            json!({
                "type": KIND_DONATION_CLAIMED,
                "donationId": donation.id,
                "donorEmail": donation.email,
                "mapUrl": map_url.unwrap_or_default(),
            }),
        )
        .await;
    }

    /// Sends a test push straight to `token` and records it in `email`'s feed.
    pub async fn send_test(&self, email: &str, token: &str) -> anyhow::Result<Notification> {
        let message = "This is a test notification from the food donation app!";
        let data = json!({
            "type": KIND_TEST,
            "timestamp": time::OffsetDateTime::now_utc().unix_timestamp(),
        });
        let delivered = match self.push.send(token, "Test Notification", message, &data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "test push failed");
                false
            }
        };
        self.feed
            .insert(NewNotification {
                email: email.to_string(),
                title: "Test Notification".into(),
                message: message.into(),
                kind: KIND_TEST.into(),
                data,
                delivered,
            })
            .await
    }

    async fn lookup(&self, email: &str) -> Option<UserProfile> {
        match self.users.find_by_email(email).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, email, "user lookup failed");
                None
            }
        }
    }

    async fn deliver(
        &self,
        email: &str,
        profile: Option<&UserProfile>,
        title: &str,
        body: &str,
        kind: &str,
        data: Value,
    ) {
        // Feed reads match on the normalized address.
        let email = email.trim().to_lowercase();
        let email = email.as_str();
        let delivered = match profile.and_then(|p| p.push_token.as_deref()) {
            Some(token) => match self.push.send(token, title, body, &data).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, email, "push failed");
                    false
                }
            },
            None => {
                info!(email, "no push token, feed only");
                false
            }
        };

        let record = NewNotification {
            email: email.to_string(),
            title: title.to_string(),
            message: body.to_string(),
            kind: kind.to_string(),
            data,
            delivered,
        };
        if let Err(e) = self.feed.insert(record).await {
            warn!(error = %e, email, "failed to store notification");
        }
    }
}

fn donor_message(claimer: Option<&UserProfile>) -> String {
    let name = claimer.map(|c| c.name.as_str()).unwrap_or("A user");
    let mut body = format!("{name} has claimed your donation. Be available to share the food.");
    if let Some(address) = claimer.and_then(|c| c.address.as_deref()) {
        body.push_str(&format!("\nReceiver is coming from: {address}"));
    }
    body
}

fn recipient_message(
    donation: &Donation,
    claimer: Option<&UserProfile>,
    pickup_window: time::Duration,
) -> String {
    let mut body = format!("You have claimed {}'s donation.", donation.donor_name);
    if let Some(dest) = donation.coordinates {
        body.push_str(&format!("\nDonor location: {}", maps_directions_url(dest)));
        if let Some(origin) = claimer.and_then(|c| c.coordinates) {
            body.push_str(&format!("\nDistance: {} km", format_km(haversine_m(origin, dest))));
        }
    }
    body.push_str(&format!(
        "\nYou have {} to pick up the donation.",
        describe_window(pickup_window)
    ));
    body
}

fn describe_window(window: time::Duration) -> String {
    let minutes = window.whole_minutes().max(0);
    let (hours, rest) = (minutes / 60, minutes % 60);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match (hours, rest) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}
