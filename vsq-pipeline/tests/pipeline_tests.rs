//! Identification-to-valuation pipeline integration tests
//!
//! Drive `IdentificationSession` end to end against a scripted
//! `VehicleApi`: happy path, each failure stage, local validation,
//! and stale-response handling after a re-upload.

mod helpers;

use helpers::{jpeg, session_with, ImageScript, ScriptedApi};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use vsq_pipeline::catalog::SpecCatalog;
use vsq_pipeline::events::PipelineEvent;
use vsq_pipeline::form::FormField;
use vsq_pipeline::parser::ParseOutcome;
use vsq_pipeline::recognition::ConfidenceLevel;
use vsq_pipeline::valuation::MarketComment;
use vsq_pipeline::{IdentificationSession, PipelineError, PipelineStage, RemoteStage};

const ACCENT: &str = "Hyundai Accent Sedan 2012";

#[tokio::test]
async fn test_accent_identified_and_priced() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.93));
    api.queue_price(185000.0);
    let session = session_with(api.clone());

    let outcome = session.process(jpeg("accent.jpg")).await.unwrap();
    assert_eq!(outcome.generation, 1);
    assert_eq!(outcome.identity.label, ACCENT);
    assert_eq!(outcome.identity.confidence(), Some(ConfidenceLevel::High));

    let attrs = outcome.parse.attributes().expect("four-token identity parses");
    assert_eq!(attrs.make, "Hyundai");
    assert_eq!(attrs.model, "Accent");
    assert_eq!(attrs.body_type, "Sedan");
    assert_eq!(attrs.year, "2012");
    assert_eq!(attrs.fuel_type, "Benzine");
    assert_eq!(attrs.cc, "1600");
    assert_eq!(attrs.transmission_type, "Automatic");

    let record = outcome.enrichment.expect("catalog has the Accent");
    assert_eq!(record.title, ACCENT);
    assert_eq!(session.stage().await, PipelineStage::Parsed);

    session.set_field(FormField::Kilometers, "50000").await.unwrap();
    session.set_field(FormField::Color, "White").await.unwrap();

    let quote = session.submit().await.unwrap();
    assert_eq!(quote.price, 185000.0);
    assert_eq!(quote.comment, MarketComment::PriceBelowMarket);
    assert_eq!(session.stage().await, PipelineStage::Quoted);

    let requests = api.price_requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.make, "Hyundai");
    assert_eq!(sent.model, "Accent");
    assert_eq!(sent.body_type, "Sedan");
    assert_eq!(sent.year, 2012);
    assert_eq!(sent.kilometers, 50000);
    assert_eq!(sent.color, "White");
    assert_eq!(sent.fuel_type, "Benzine");
    assert_eq!(sent.transmission_type, "Automatic");
    assert_eq!(sent.cc, Some(1600));

    let json = serde_json::to_value(sent).unwrap();
    assert_eq!(json["Kilometers"], 50000);
    assert_eq!(json["Year"], 2012);
    assert_eq!(json["listBy"], "");
}

#[tokio::test]
async fn test_no_vehicle_halts_before_classification() {
    let api = ScriptedApi::new();
    api.script("tree.jpg", ImageScript::no_vehicle());
    let session = session_with(api.clone());

    let err = session.process(jpeg("tree.jpg")).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoVehicleDetected));
    assert!(err.requires_new_image());
    assert_eq!(api.calls(&api.classify_calls), 0);

    let state = session.snapshot().await;
    assert_eq!(state.stage, PipelineStage::Failed(RemoteStage::Detection));
    assert!(state.identity.is_none());
    assert!(state.form.is_none());
    assert!(state
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("No car detected"));
}

#[tokio::test]
async fn test_detection_network_failure() {
    let api = ScriptedApi::new();
    api.script("a.jpg", ImageScript::detection_down());
    let session = session_with(api.clone());

    let err = session.process(jpeg("a.jpg")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Network {
            stage: RemoteStage::Detection,
            ..
        }
    ));
    assert_eq!(
        session.stage().await,
        PipelineStage::Failed(RemoteStage::Detection)
    );
    assert_eq!(api.calls(&api.classify_calls), 0);
}

#[tokio::test]
async fn test_classification_network_failure() {
    let api = ScriptedApi::new();
    api.script("a.jpg", ImageScript::classification_down());
    let session = session_with(api.clone());

    let err = session.process(jpeg("a.jpg")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Network {
            stage: RemoteStage::Classification,
            ..
        }
    ));
    assert!(err.requires_new_image());

    let state = session.snapshot().await;
    assert_eq!(state.stage, PipelineStage::Failed(RemoteStage::Classification));
    assert!(state.parse.is_none());
    assert!(state.enrichment.is_none());

    // A failed image cannot be priced
    assert!(matches!(
        session.submit().await,
        Err(PipelineError::NotReady(_))
    ));
}

#[tokio::test]
async fn test_new_upload_recovers_after_failure() {
    let api = ScriptedApi::new();
    api.script("tree.jpg", ImageScript::no_vehicle());
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.7));
    let session = session_with(api);

    session.process(jpeg("tree.jpg")).await.unwrap_err();
    let outcome = session.process(jpeg("accent.jpg")).await.unwrap();

    assert_eq!(outcome.generation, 2);
    assert_eq!(outcome.identity.confidence(), Some(ConfidenceLevel::Medium));
    let state = session.snapshot().await;
    assert_eq!(state.stage, PipelineStage::Parsed);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_valuation_failure_keeps_form_for_resubmit() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    api.queue_price_failure(500);
    api.queue_price(150000.0);
    let session = session_with(api.clone());

    session.process(jpeg("accent.jpg")).await.unwrap();
    session.set_field(FormField::Kilometers, "80000").await.unwrap();

    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Network {
            stage: RemoteStage::Valuation,
            ..
        }
    ));
    assert!(!err.requires_new_image());

    let state = session.snapshot().await;
    assert_eq!(state.stage, PipelineStage::Failed(RemoteStage::Valuation));
    assert!(state.identity.is_some());
    assert!(state.quote.is_none());
    assert_eq!(state.form.as_ref().unwrap().kilometers, "80000");

    let quote = session.submit().await.unwrap();
    assert_eq!(quote.price, 150000.0);
    assert_eq!(api.calls(&api.price_calls), 2);
    assert_eq!(api.calls(&api.check_calls), 1);
}

#[tokio::test]
async fn test_missing_kilometers_rejected_locally() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    api.queue_price(1.0);
    let session = session_with(api.clone());

    session.process(jpeg("accent.jpg")).await.unwrap();

    let err = session.submit().await.unwrap_err();
    match &err {
        PipelineError::Validation(validation) => {
            assert_eq!(validation.missing, vec![FormField::Kilometers]);
            assert!(validation.invalid.is_empty());
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert_eq!(api.calls(&api.price_calls), 0);

    let state = session.snapshot().await;
    assert_eq!(state.stage, PipelineStage::Parsed);
    assert!(state
        .last_error
        .as_deref()
        .unwrap()
        .contains("Kilometers"));
}

#[tokio::test]
async fn test_non_numeric_kilometers_rejected_locally() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    let session = session_with(api.clone());

    session.process(jpeg("accent.jpg")).await.unwrap();
    session.set_field(FormField::Kilometers, "lots").await.unwrap();

    let err = session.submit().await.unwrap_err();
    match err {
        PipelineError::Validation(validation) => {
            assert!(validation.missing.is_empty());
            assert_eq!(validation.invalid, vec![FormField::Kilometers]);
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert_eq!(api.calls(&api.price_calls), 0);
}

#[tokio::test]
async fn test_out_of_range_year_rejected_locally() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    api.queue_price(120000.0);
    let session = session_with(api.clone());

    session.process(jpeg("accent.jpg")).await.unwrap();
    session.set_field(FormField::Kilometers, "5").await.unwrap();
    session.set_field(FormField::Year, "-2147483648").await.unwrap();

    let err = session.submit().await.unwrap_err();
    match err {
        PipelineError::Validation(validation) => {
            assert!(validation.missing.is_empty());
            assert_eq!(validation.invalid, vec![FormField::Year]);
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert_eq!(api.calls(&api.price_calls), 0);
    assert_eq!(session.stage().await, PipelineStage::Parsed);

    // Correcting the year unblocks submission
    session.set_field(FormField::Year, "2012").await.unwrap();
    let quote = session.submit().await.unwrap();
    assert_eq!(quote.price, 120000.0);
    assert_eq!(api.price_requests()[0].year, 2012);
}

#[tokio::test]
async fn test_stale_classification_discarded_after_reupload() {
    let api = ScriptedApi::new();
    let gate = Arc::new(Notify::new());
    api.script(
        "bmw.jpg",
        ImageScript::vehicle("BMW X3 SUV 2012", 0.95).gated(gate.clone()),
    );
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));

    let (tx, mut rx) = mpsc::channel(64);
    let session = Arc::new(session_with(api.clone()).with_events(tx));

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.process(jpeg("bmw.jpg")).await })
    };

    // Replace the image while the first classification is in flight
    api.classify_started.notified().await;
    let outcome = session.process(jpeg("accent.jpg")).await.unwrap();
    assert_eq!(outcome.generation, 2);

    gate.notify_one();
    let stale = slow.await.unwrap().unwrap_err();
    assert!(matches!(
        stale,
        PipelineError::Superseded {
            generation: 1,
            current: 2
        }
    ));

    let state = session.snapshot().await;
    assert_eq!(state.generation, 2);
    assert_eq!(state.stage, PipelineStage::Parsed);
    assert_eq!(state.identity.unwrap().label, ACCENT);
    assert_eq!(state.form.unwrap().make, "Hyundai");

    drop(session);
    let mut discarded = false;
    while let Some(event) = rx.recv().await {
        if let PipelineEvent::StaleResponseDiscarded {
            generation,
            current,
        } = event
        {
            assert_eq!((generation, current), (1, 2));
            discarded = true;
        }
    }
    assert!(discarded);
}

#[tokio::test]
async fn test_stale_quote_discarded_after_reupload() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    api.script("bmw.jpg", ImageScript::vehicle("BMW X3 SUV 2012", 0.95));
    let gate = Arc::new(Notify::new());
    api.hold_prices(gate.clone());
    api.queue_price(185000.0);

    let session = Arc::new(session_with(api.clone()));
    session.process(jpeg("accent.jpg")).await.unwrap();
    session.set_field(FormField::Kilometers, "50000").await.unwrap();

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };

    // Replace the image while the valuation is in flight
    api.price_started.notified().await;
    assert_eq!(session.stage().await, PipelineStage::Estimating);
    let outcome = session.process(jpeg("bmw.jpg")).await.unwrap();
    assert_eq!(outcome.generation, 2);

    gate.notify_one();
    let stale = pending.await.unwrap().unwrap_err();
    assert!(matches!(
        stale,
        PipelineError::Superseded {
            generation: 1,
            current: 2
        }
    ));

    let state = session.snapshot().await;
    assert_eq!(state.generation, 2);
    assert_eq!(state.stage, PipelineStage::Parsed);
    assert!(state.quote.is_none());
    assert!(state.last_error.is_none());
    assert_eq!(state.identity.unwrap().label, "BMW X3 SUV 2012");
    let form = state.form.unwrap();
    assert_eq!(form.make, "BMW");
    assert!(form.kilometers.is_empty());
}

#[tokio::test]
async fn test_short_identity_is_unparseable() {
    let api = ScriptedApi::new();
    api.script("odd.jpg", ImageScript::vehicle("Hyundai Accent", 0.5));
    let session = session_with(api);

    let outcome = session.process(jpeg("odd.jpg")).await.unwrap();
    assert_eq!(
        outcome.parse,
        ParseOutcome::Unparseable {
            raw: "Hyundai Accent".to_string()
        }
    );
    assert_eq!(outcome.identity.confidence(), Some(ConfidenceLevel::Low));
    assert!(outcome.enrichment.is_none());

    let form = session.form().await.unwrap();
    assert!(form.make.is_empty());
    assert!(form.fuel_type.is_empty());
    assert_eq!(session.stage().await, PipelineStage::Parsed);
}

#[tokio::test]
async fn test_unknown_identity_parses_without_defaults() {
    let api = ScriptedApi::new();
    api.script(
        "kia.jpg",
        ImageScript::vehicle("Kia Cerato Sedan 2015", 0.88),
    );
    let session = session_with(api);

    let outcome = session.process(jpeg("kia.jpg")).await.unwrap();
    let attrs = outcome.parse.attributes().unwrap();
    assert_eq!(attrs.make, "Kia");
    assert_eq!(attrs.year, "2015");
    assert!(attrs.fuel_type.is_empty());
    assert!(attrs.cc.is_empty());
    assert!(outcome.enrichment.is_none());
}

#[tokio::test]
async fn test_events_follow_stages() {
    let api = ScriptedApi::new();
    api.script("accent.jpg", ImageScript::vehicle(ACCENT, 0.9));
    api.queue_price(99000.0);

    let (tx, mut rx) = mpsc::channel(64);
    let catalog = Arc::new(SpecCatalog::bundled().unwrap());
    let session = IdentificationSession::new(api, catalog).with_events(tx);

    session.process(jpeg("accent.jpg")).await.unwrap();
    session.set_field(FormField::Kilometers, "1000").await.unwrap();
    session.submit().await.unwrap();
    drop(session);

    let mut stages = Vec::new();
    let mut identified = false;
    let mut quoted = false;
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::StageChanged { stage, .. } => stages.push(stage),
            PipelineEvent::VehicleIdentified {
                parsed, enriched, ..
            } => {
                assert!(parsed && enriched);
                identified = true;
            }
            PipelineEvent::QuoteReady { price, .. } => {
                assert_eq!(price, 99000.0);
                quoted = true;
            }
            _ => {}
        }
    }

    assert!(identified && quoted);
    assert_eq!(
        stages,
        vec![
            PipelineStage::Detecting,
            PipelineStage::Classifying,
            PipelineStage::Parsed,
            PipelineStage::Estimating,
            PipelineStage::Quoted,
        ]
    );
}

#[tokio::test]
async fn test_operations_before_upload() {
    let api = ScriptedApi::new();
    let session = session_with(api);

    assert!(matches!(session.identify().await, Err(PipelineError::NoImage)));
    assert!(matches!(
        session.set_field(FormField::Color, "Red").await,
        Err(PipelineError::NotReady(PipelineStage::Idle))
    ));
    assert!(matches!(
        session.submit().await,
        Err(PipelineError::NotReady(PipelineStage::Idle))
    ));
}
