//! Bulk send behaviour against a recording transport

use std::collections::HashSet;
use std::sync::Arc;

use omnicanal::{
    email::{BulkRequest, EmailSender, Recipient, RenderContext, Sender},
    testing::RecordingTransport,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn template_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("status.html"), "<p>Status for {{ name }}</p>").unwrap();
    std::fs::write(dir.path().join("terms.pdf"), b"%PDF-1.4").unwrap();
    dir
}

fn sender(transport: &RecordingTransport, dir: &TempDir, max_concurrency: usize) -> EmailSender {
    EmailSender::new(
        Arc::new(transport.clone()),
        Sender::new("noreply@example.com", None),
    )
    .with_template_dir(dir.path())
    .with_attachment_dir(dir.path())
    .with_max_concurrency(max_concurrency)
}

fn recipient(email: &str, name: &str) -> Recipient {
    Recipient::new(email, RenderContext::new().with("name", name))
}

#[tokio::test]
async fn test_shared_attachment_reaches_every_recipient() {
    let dir = template_dir();
    let transport = RecordingTransport::new();

    let result = sender(&transport, &dir, 2)
        .send_bulk(
            BulkRequest::new(
                vec![recipient("a@example.com", "A"), recipient("b@example.com", "B")],
                "Statement - {name}",
                "status.html",
            )
            .attachment("terms.pdf"),
        )
        .await;

    assert_eq!(result.delivered, vec!["a@example.com", "b@example.com"]);
    for envelope in transport.sent() {
        assert_eq!(envelope.attachments.len(), 1);
        assert_eq!(envelope.attachments[0].content, b"%PDF-1.4");
    }
}

#[tokio::test]
async fn test_missing_shared_template_fails_everyone() {
    let dir = template_dir();
    let transport = RecordingTransport::new();

    let result = sender(&transport, &dir, 4)
        .send_bulk(BulkRequest::new(
            vec![recipient("a@example.com", "A"), recipient("b@example.com", "B")],
            "Status - {name}",
            "missing.html",
        ))
        .await;

    assert!(result.delivered.is_empty());
    assert_eq!(result.failed, vec!["a@example.com", "b@example.com"]);
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_missing_variable_fails_only_that_recipient() {
    let dir = template_dir();
    let transport = RecordingTransport::new();

    let result = sender(&transport, &dir, 4)
        .send_bulk(BulkRequest::new(
            vec![
                recipient("a@example.com", "A"),
                Recipient::new("anon@example.com", RenderContext::new()),
            ],
            "Status",
            "status.html",
        ))
        .await;

    assert_eq!(result.delivered, vec!["a@example.com"]);
    assert_eq!(result.failed, vec!["anon@example.com"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_bulk_partitions_every_recipient(
        outcomes in proptest::collection::vec(any::<bool>(), 0..24),
        max_concurrency in 1usize..6,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = template_dir();

        let addresses: Vec<String> = (0..outcomes.len())
            .map(|i| format!("user{i}@example.com"))
            .collect();

        let mut transport = RecordingTransport::new();
        for (address, succeeds) in addresses.iter().zip(&outcomes) {
            if !succeeds {
                transport = transport.failing_for(address.clone());
            }
        }

        let recipients = addresses
            .iter()
            .enumerate()
            .map(|(i, address)| recipient(address, &i.to_string()))
            .collect();

        let result = runtime.block_on(
            sender(&transport, &dir, max_concurrency)
                .send_bulk(BulkRequest::new(recipients, "Status - {name}", "status.html")),
        );

        prop_assert_eq!(result.total(), addresses.len());

        let delivered: HashSet<&String> = result.delivered.iter().collect();
        let failed: HashSet<&String> = result.failed.iter().collect();
        prop_assert!(delivered.is_disjoint(&failed));

        let expected_delivered: Vec<String> = addresses
            .iter()
            .zip(&outcomes)
            .filter(|(_, succeeds)| **succeeds)
            .map(|(address, _)| address.clone())
            .collect();
        let expected_failed: Vec<String> = addresses
            .iter()
            .zip(&outcomes)
            .filter(|(_, succeeds)| !**succeeds)
            .map(|(address, _)| address.clone())
            .collect();

        prop_assert_eq!(&result.delivered, &expected_delivered);
        prop_assert_eq!(&result.failed, &expected_failed);
        prop_assert_eq!(transport.attempts(), addresses.len());
        prop_assert_eq!(transport.sent_count(), expected_delivered.len());
    }
}
