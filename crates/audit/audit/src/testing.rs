use chrono::{TimeDelta, Utc};

use crate::error::AuditError;
use crate::record::{PaymentAction, PaymentLogEntry, PaymentLogQuery, PaymentStatus};
use crate::store::PaymentLogStore;

/// Run the payment log conformance suite against an empty store.
///
/// # Errors
///
/// Returns an error if the backend fails an operation.
pub async fn run_log_conformance_tests(store: &dyn PaymentLogStore) -> Result<(), AuditError> {
    let base = Utc::now();

    let attempt = PaymentLogEntry::new(
        PaymentAction::PaymentAttempt,
        "paystack",
        PaymentStatus::Pending,
        base,
    )
    .with_reference("REF-1")
    .with_amount(5000.0, "NGN");
    let result = PaymentLogEntry::new(
        PaymentAction::PaymentResult,
        "paystack",
        PaymentStatus::Success,
        base + TimeDelta::seconds(1),
    )
    .with_reference("REF-1");
    let other = PaymentLogEntry::new(
        PaymentAction::PaymentAttempt,
        "flutterwave",
        PaymentStatus::Failed,
        base + TimeDelta::seconds(2),
    );

    store.append(attempt.clone()).await?;
    store.append(result.clone()).await?;
    store.append(other.clone()).await?;

    let page = store.query(&PaymentLogQuery::default()).await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.entries.first(), Some(&other), "newest entry first");

    let page = store
        .query(&PaymentLogQuery {
            reference: Some("REF-1".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 2);

    let page = store
        .query(&PaymentLogQuery {
            gateway: Some("paystack".into()),
            status: Some(PaymentStatus::Pending),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.entries, vec![attempt]);

    let page = store
        .query(&PaymentLogQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.entries, vec![result]);

    Ok(())
}
