//! Integration tests for the scan, annotate, observe and copy cycle.

use std::sync::Arc;
use std::time::Duration;

use postcode_marker::activation::wait_for_activation;
use postcode_marker::clipboard::MemoryClipboard;
use postcode_marker::dom::{inner_html, Document, NodeId, SharedDocument};
use postcode_marker::engine::{
    trigger_of, CODE_ATTR, COPIED_CLASS, SUCCESS_GLYPH, TRIGGER_CLASS, WRAPPER_CLASS,
};
use postcode_marker::settings::{
    load_or_default, FileSettingsStore, Settings, SettingsHandle, SettingsStore,
};
use postcode_marker::{Engine, EngineConfig};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn document(paragraphs: &[&str]) -> (SharedDocument, Vec<NodeId>) {
    let mut doc = Document::with_body();
    let body = doc.body().unwrap();
    let mut units = Vec::new();
    for text in paragraphs {
        let p = doc.create_element("p");
        let t = doc.create_text(*text);
        doc.append_child(p, t).unwrap();
        doc.append_child(body, p).unwrap();
        units.push(t);
    }
    (SharedDocument::new(doc), units)
}

fn engine(doc: &SharedDocument, settings: &SettingsHandle, clipboard: &MemoryClipboard) -> Engine {
    Engine::new(
        doc.clone(),
        settings.subscribe(),
        Arc::new(clipboard.clone()),
        EngineConfig::default(),
    )
}

fn wrapper_codes(doc: &SharedDocument) -> Vec<String> {
    doc.read(|d| {
        d.elements_with_class(d.body().unwrap(), WRAPPER_CLASS)
            .into_iter()
            .filter_map(|w| d.attribute(w, CODE_ATTR).map(str::to_string))
            .collect()
    })
}

fn body_html(doc: &SharedDocument) -> String {
    doc.read(|d| inner_html(d, d.body().unwrap()))
}

/// Running a pass twice changes nothing the second time.
#[tokio::test]
async fn test_repeated_passes_are_idempotent() {
    let (doc, _) = document(&["Office 1011 AB", "Depot 3511 CD, backup 3511 CD", "none"]);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());

    let first = engine.scan_now().await;
    assert_eq!(first.outcome.wrappers_created, 3);
    let snapshot = body_html(&doc);

    let second = engine.scan_now().await;
    assert_eq!(second.outcome.wrappers_created, 0);
    assert_eq!(body_html(&doc), snapshot);
    assert_eq!(wrapper_codes(&doc).len(), 3);
}

/// Only well-formed postal codes are wrapped.
#[tokio::test]
async fn test_pattern_correctness() {
    let (doc, _) = document(&[
        "Address: 1234 AB City",
        "Account 12345 AB",
        "Short 1234 A",
        "Lowercase 1234 ab",
        "Trailing 1234 ABC",
    ]);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());

    engine.scan_now().await;
    assert_eq!(wrapper_codes(&doc), vec!["1234 AB".to_string()]);
}

/// Two codes in one unit keep the text around and between them intact.
#[tokio::test]
async fn test_offsets_with_two_matches() {
    let original = "Ship from 1011 AB to 9711 LM today";
    let (doc, _) = document(&[original]);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());

    engine.scan_now().await;

    assert_eq!(wrapper_codes(&doc), vec!["1011 AB", "9711 LM"]);
    let plain: String = doc.read(|d| {
        let p = d.children(d.body().unwrap())[0];
        d.children(p).iter().filter_map(|&c| d.text(c)).collect()
    });
    assert_eq!(plain, "Ship from  to  today");
}

/// The engine's own writes never schedule another pass.
#[tokio::test(start_paused = true)]
async fn test_self_mutations_are_suppressed() {
    let (doc, _) = document(&["1234 AB", "5678 CD"]);
    let settings = SettingsHandle::new(Settings::default());
    let clipboard = MemoryClipboard::new();
    let engine = engine(&doc, &settings, &clipboard);
    engine.start().unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.passes(), 1);

    // Copy feedback rewrites the trigger twice.
    let trigger = doc.read(|d| {
        let wrapper = d.elements_with_class(d.body().unwrap(), WRAPPER_CLASS)[0];
        trigger_of(d, wrapper).unwrap()
    });
    doc.dispatch_click(trigger);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(engine.passes(), 1);
    let stats = engine.watcher_stats();
    assert_eq!(stats.rescans, 0);
    assert!(stats.suppressed >= 1);

    engine.shutdown().await;
}

/// Foreign insertions are picked up by one debounced rescan.
#[tokio::test(start_paused = true)]
async fn test_foreign_insertions_coalesce_into_one_rescan() {
    let (doc, _) = document(&["1234 AB"]);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());
    engine.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    for i in 0..5 {
        doc.with_doc(|d| {
            let body = d.body().unwrap();
            let p = d.create_element("p");
            let t = d.create_text(format!("Item {i}: 20{i}0 XY"));
            d.append_child(p, t).unwrap();
            d.append_child(body, p).unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(engine.passes(), 2);
    assert_eq!(wrapper_codes(&doc).len(), 6);
    engine.shutdown().await;
}

/// Exactly one batch never yields; one unit more yields at least once.
#[tokio::test]
async fn test_batch_boundaries() {
    let batch_size = Settings::default().throughput().batch_size;
    let settings = SettingsHandle::new(Settings::default());

    let texts: Vec<String> = (0..=batch_size).map(|i| format!("#{i} 1234 AB")).collect();
    let exact: Vec<&str> = texts[..batch_size].iter().map(String::as_str).collect();
    let (doc, _) = document(&exact);
    let report = engine(&doc, &settings, &MemoryClipboard::new())
        .scan_now()
        .await;
    assert_eq!(report.batches, 1);
    assert_eq!(report.yields, 0);

    let over: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (doc, _) = document(&over);
    let report = engine(&doc, &settings, &MemoryClipboard::new())
        .scan_now()
        .await;
    assert_eq!(report.batches, 2);
    assert!(report.yields >= 1);
}

/// Clicking a trigger copies its code and shows reverting feedback.
#[tokio::test(start_paused = true)]
async fn test_copy_round_trip() {
    let (doc, _) = document(&["Visit us at 2511 CV Den Haag"]);
    let settings = SettingsHandle::new(Settings::default());
    let clipboard = MemoryClipboard::new();
    let engine = engine(&doc, &settings, &clipboard);
    let report = engine.scan_now().await;
    assert_eq!(report.triggers_wired, 1);

    let trigger = doc.read(|d| d.elements_with_class(d.body().unwrap(), TRIGGER_CLASS)[0]);
    let label = doc.read(|d| d.text_content(trigger));

    let event = doc.dispatch_click(trigger);
    assert!(event.default_prevented());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(clipboard.contents().as_deref(), Some("2511 CV"));
    doc.read(|d| {
        assert_eq!(d.text_content(trigger), SUCCESS_GLYPH);
        assert!(d.has_class(trigger, COPIED_CLASS));
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    doc.read(|d| {
        assert_eq!(d.text_content(trigger), label);
        assert!(!d.has_class(trigger, COPIED_CLASS));
    });
}

/// A large document is capped per pass in performance mode.
#[tokio::test]
async fn test_throughput_cap() {
    let texts: Vec<String> = (0..5000).map(|i| format!("Row {i}: 1234 AB")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (doc, _) = document(&refs);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());

    let report = engine.scan_now().await;
    assert_eq!(report.candidates, 200);
    assert_eq!(report.outcome.wrappers_created, 200);

    let report = engine.scan_now().await;
    assert_eq!(report.candidates, 200);
    assert_eq!(wrapper_codes(&doc).len(), 400);
}

/// Replaced units are reclaimed and drop out of the registry.
#[tokio::test]
async fn test_registry_forgets_reclaimed_units() {
    let (doc, units) = document(&["1234 AB", "5678 CD"]);
    let settings = SettingsHandle::new(Settings::default());
    let engine = engine(&doc, &settings, &MemoryClipboard::new());

    engine.scan_now().await;
    assert_eq!(engine.registry_len(), (2, 2));
    let snapshot = body_html(&doc);

    let freed = doc.with_doc(Document::collect_garbage);
    assert!(freed >= 2);
    assert!(doc.read(|d| units.iter().all(|&u| !d.contains(u))));

    let report = engine.scan_now().await;
    assert_eq!(report.candidates, 0);
    assert_eq!(engine.registry_len(), (0, 0));
    assert_eq!(body_html(&doc), snapshot);
}

/// Stored settings drive activation and the throughput profile.
#[tokio::test]
async fn test_settings_file_drives_engine() {
    let tmp = TempDir::new().unwrap();
    let store = FileSettingsStore::new(tmp.path().join("settings.json"));
    store
        .save(&Settings {
            whole_site_enabled: false,
            performance_mode: false,
        })
        .unwrap();

    let handle = SettingsHandle::new(load_or_default(&store));
    let mut rx = handle.subscribe();
    let cancel = CancellationToken::new();

    let waiter = tokio::spawn(async move { wait_for_activation(&mut rx, &cancel).await });
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    handle.update(Settings {
        whole_site_enabled: true,
        performance_mode: false,
    });
    assert!(waiter.await.unwrap());

    let texts: Vec<String> = (0..300).map(|i| format!("{i} 1234 AB")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (doc, _) = document(&refs);
    let report = engine(&doc, &handle, &MemoryClipboard::new())
        .scan_now()
        .await;
    assert_eq!(report.candidates, 300);
    assert_eq!(report.batches, 6);
    assert_eq!(report.yields, 0);
}

/// Units removed while a pass yields are skipped and the pass carries on.
#[tokio::test]
async fn test_units_removed_between_batches_are_skipped() {
    let texts: Vec<String> = (0..30).map(|i| format!("Row {i}: 1234 AB")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (doc, units) = document(&refs);
    let settings = SettingsHandle::new(Settings::default());
    let engine = Arc::new(engine(&doc, &settings, &MemoryClipboard::new()));

    let pass = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.scan_now().await }
    });

    // Wait until the first batch has replaced its units and the pass yielded.
    while doc.read(|d| d.parent(units[0]).is_some()) {
        tokio::task::yield_now().await;
    }

    let (detached, reclaimed) = (units[28], units[29]);
    doc.with_doc(|d| {
        let p = d.parent(reclaimed).unwrap();
        d.remove_child(p, reclaimed).unwrap();
        d.collect_garbage();
        assert!(!d.contains(reclaimed));

        let p = d.parent(detached).unwrap();
        d.remove_child(p, detached).unwrap();
    });

    let report = pass.await.unwrap();
    assert_eq!(report.candidates, 30);
    assert_eq!(report.batches, 3);
    assert!(report.yields >= 1);
    assert_eq!(report.outcome.units_skipped, 2);
    assert_eq!(report.outcome.units_annotated, 28);
    assert_eq!(report.outcome.wrappers_created, 28);
    assert_eq!(report.outcome.errors, 0);
    assert_eq!(wrapper_codes(&doc).len(), 28);
}
