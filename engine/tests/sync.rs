// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end sync pass tests against a mocked DAV server.

use std::sync::{Arc, Mutex};

use syncplus_dav::{AuthMethod, DavClient, DavConfig, ETag, Href};
use syncplus_engine::{
    AccountSettings, CalendarFlavor, CancelToken, Collection, CollectionKind, ContactsFlavor,
    LocalEntry, LocalStore, MemoryStore, SyncError, SyncExtras, SyncManager, SyncState,
    SyncTokenKind,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOOK: &str = "/dav/book/";

fn book_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(Collection::new(
        "book-1",
        BOOK,
        CollectionKind::AddressBook,
    )))
}

fn dav(server: &MockServer, collection: &str) -> DavClient {
    DavClient::new(DavConfig {
        base_url: server.uri(),
        collection_path: collection.to_string(),
        auth: AuthMethod::None,
        ..Default::default()
    })
    .unwrap()
}

fn contacts_manager(server: &MockServer, store: Arc<MemoryStore>) -> SyncManager {
    SyncManager::new(
        dav(server, BOOK),
        store,
        Box::new(ContactsFlavor::new(&AccountSettings::default())),
        CancelToken::new(),
    )
}

fn vcard(uid: &str) -> String {
    format!("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{uid}\r\nFN:{uid}\r\nEND:VCARD\r\n")
}

fn seeded_contact(uid: &str, file_name: &str, etag: &str) -> LocalEntry {
    let payload = syncplus_vobject::parse(&vcard(uid)).unwrap().remove(0);
    let mut entry = LocalEntry::new(uid, payload);
    entry.file_name = Some(file_name.to_string());
    entry.etag = Some(ETag::from(etag));
    entry.remotely_present = true;
    entry
}

fn caps_body(ctag: &str, with_sync_collection: bool) -> String {
    let report_set = if with_sync_collection {
        "<D:supported-report-set>\
           <D:supported-report><D:report><D:sync-collection/></D:report></D:supported-report>\
         </D:supported-report-set>\
         <D:sync-token>srv-token</D:sync-token>"
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>{BOOK}</D:href>
    <D:propstat>
      <D:prop>
        <CS:getctag>{ctag}</CS:getctag>
        {report_set}
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
    )
}

fn listing_body(items: &[(&str, &str)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>{BOOK}</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
    );
    for (name, etag) in items {
        body.push_str(&format!(
            r#"
  <D:response>
    <D:href>{BOOK}{name}</D:href>
    <D:propstat>
      <D:prop><D:getetag>{etag}</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
        ));
    }
    body.push_str("\n</D:multistatus>");
    body
}

fn multiget_body(items: &[(&str, &str, &str)]) -> String {
    let mut body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CARD="urn:ietf:params:xml:ns:carddav">"#
        .to_string();
    for (name, etag, data) in items {
        body.push_str(&format!(
            r#"
  <D:response>
    <D:href>{BOOK}{name}</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>{etag}</D:getetag>
        <CARD:address-data>{data}</CARD:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
        ));
    }
    body.push_str("\n</D:multistatus>");
    body
}

async fn mount_caps(server: &MockServer, ctag: &str, with_sync_collection: bool) {
    Mock::given(method("PROPFIND"))
        .and(path(BOOK))
        .and(header("Depth", "0"))
        .respond_with(
            ResponseTemplate::new(207).set_body_raw(caps_body(ctag, with_sync_collection), "application/xml"),
        )
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, items: &[(&str, &str)]) {
    Mock::given(method("PROPFIND"))
        .and(path(BOOK))
        .and(header("Depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(listing_body(items), "application/xml"))
        .mount(server)
        .await;
}

async fn forbid_writes(server: &MockServer) {
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_sync_then_second_pass_is_quiet() {
    let server = MockServer::start().await;
    mount_caps(&server, "c1", false).await;
    mount_listing(&server, &[("a.vcf", "\"1\""), ("b.vcf", "\"2\"")]).await;
    forbid_writes(&server).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            multiget_body(&[
                ("a.vcf", "\"1\"", &vcard("a")),
                ("b.vcf", "\"2\"", &vcard("b")),
            ]),
            "application/xml",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let store = book_store();
    let mut manager = contacts_manager(&server, Arc::clone(&store));

    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.uploaded, 0);

    let state = store.snapshot();
    assert_eq!(state.len(), 2);
    assert!(state.iter().all(|e| e.remotely_present && !e.dirty));

    let sync_state = store.read_sync_state().await.unwrap().unwrap();
    assert_eq!(sync_state.kind, SyncTokenKind::CTag);
    assert_eq!(sync_state.value, "c1");

    // Second pass: nothing changed, so no multiget, no writes.
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();
    assert_eq!(stats, Default::default());
    assert_eq!(
        store.read_sync_state().await.unwrap().unwrap().value,
        "c1"
    );
}

#[tokio::test]
async fn vanished_remote_resource_is_removed_locally() {
    let server = MockServer::start().await;
    mount_caps(&server, "c2", false).await;
    mount_listing(&server, &[]).await;
    forbid_writes(&server).await;

    let store = book_store();
    store.seed(seeded_contact("a", "a.vcf", "\"1\""));

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.deleted_local, 1);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn delta_walk_applies_changes_and_stores_new_token() {
    let server = MockServer::start().await;
    mount_caps(&server, "c3", true).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("sync-collection"))
        .and(body_string_contains("t1"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>{BOOK}b.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>"1"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>{BOOK}a.vcf</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
  <D:sync-token>t2</D:sync-token>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            multiget_body(&[("b.vcf", "\"1\"", &vcard("b"))]),
            "application/xml",
        ))
        .mount(&server)
        .await;

    let store = book_store();
    store.seed(seeded_contact("a", "a.vcf", "\"1\""));
    store.seed_state(SyncState::sync_token("t1"));

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.deleted_local, 1);
    assert!(store.find_by_uid("a").await.unwrap().is_none());
    assert!(store.find_by_uid("b").await.unwrap().is_some());

    let state = store.read_sync_state().await.unwrap().unwrap();
    assert_eq!(state.kind, SyncTokenKind::SyncToken);
    assert_eq!(state.value, "t2");
    assert!(!state.initial_sync);
}

#[tokio::test]
async fn truncated_delta_persists_resume_marker_and_defers_uploads() {
    let server = MockServer::start().await;
    mount_caps(&server, "c4", true).await;
    forbid_writes(&server).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("sync-collection"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>{BOOK}</D:href>
    <D:status>HTTP/1.1 507 Insufficient Storage</D:status>
  </D:response>
  <D:sync-token>partial-1</D:sync-token>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    let store = book_store();
    let mut edited = seeded_contact("a", "a.vcf", "\"1\"");
    edited.dirty = true;
    store.seed(edited);

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    manager.perform_sync(&SyncExtras::default()).await.unwrap();

    let state = store.read_sync_state().await.unwrap().unwrap();
    assert_eq!(state.value, "partial-1");
    assert!(state.initial_sync);

    // The local edit was not pushed while the listing is incomplete.
    assert!(store.find_by_uid("a").await.unwrap().unwrap().dirty);
}

#[tokio::test]
async fn read_only_collection_reverts_local_changes_and_drops_state() {
    let server = MockServer::start().await;
    mount_listing(&server, &[]).await;
    forbid_writes(&server).await;

    Mock::given(method("PROPFIND"))
        .and(path(BOOK))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>{BOOK}</D:href>
    <D:propstat>
      <D:prop>
        <CS:getctag>c5</CS:getctag>
        <D:current-user-privilege-set>
          <D:privilege><D:read/></D:privilege>
        </D:current-user-privilege-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    let store = book_store();
    store.seed_state(SyncState::ctag("old"));
    let mut edited = seeded_contact("a", "a.vcf", "\"1\"");
    edited.dirty = true;
    store.seed(edited);
    let mut tombstone = seeded_contact("b", "b.vcf", "\"2\"");
    tombstone.deleted = true;
    store.seed(tombstone);

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.reverted, 2);
    let a = store.find_by_uid("a").await.unwrap().unwrap();
    assert!(!a.dirty);
    assert!(a.etag.is_none(), "revert forces re-download");
    let b = store.find_by_uid("b").await.unwrap().unwrap();
    assert!(!b.deleted);

    assert!(store.read_sync_state().await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_resources_are_skipped_and_reported() {
    let server = MockServer::start().await;
    mount_caps(&server, "c6", false).await;
    mount_listing(&server, &[("good.vcf", "\"1\""), ("bad.vcf", "\"2\"")]).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            multiget_body(&[
                ("good.vcf", "\"1\"", &vcard("good")),
                ("bad.vcf", "\"2\"", "BEGIN:VCARD\r\nno end in sight"),
            ]),
            "application/xml",
        ))
        .mount(&server)
        .await;

    let reported: Arc<Mutex<Vec<Href>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);

    let store = book_store();
    let mut manager = contacts_manager(&server, Arc::clone(&store))
        .with_invalid_resource_callback(Arc::new(move |href: &Href| {
            sink.lock().unwrap().push(href.clone());
        }));

    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.skipped_invalid, 1);
    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].as_str().ends_with("bad.vcf"));
    assert!(store.find_by_uid("good").await.unwrap().is_some());
}

#[tokio::test]
async fn multiget_item_without_etag_aborts_the_pass() {
    let server = MockServer::start().await;
    mount_caps(&server, "c7", false).await;
    mount_listing(&server, &[("a.vcf", "\"1\"")]).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CARD="urn:ietf:params:xml:ns:carddav">
  <D:response>
    <D:href>{BOOK}a.vcf</D:href>
    <D:propstat>
      <D:prop><CARD:address-data>{}</CARD:address-data></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#,
                vcard("a")
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    let store = book_store();
    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let err = manager.perform_sync(&SyncExtras::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Protocol(_)));
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn rejected_credentials_abort_with_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path(BOOK))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut manager = contacts_manager(&server, book_store());
    let err = manager.perform_sync(&SyncExtras::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized));
}

#[tokio::test]
async fn cancelled_token_stops_before_any_request() {
    let server = MockServer::start().await;
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut manager = SyncManager::new(
        dav(&server, BOOK),
        book_store(),
        Box::new(ContactsFlavor::new(&AccountSettings::default())),
        cancel,
    );
    let err = manager.perform_sync(&SyncExtras::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn time_window_forces_calendar_query_even_with_sync_collection() {
    const CAL: &str = "/dav/cal/";
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path(CAL))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>{CAL}</D:href>
    <D:propstat>
      <D:prop>
        <CS:getctag>cal-tag</CS:getctag>
        <D:sync-token>cal-token</D:sync-token>
        <D:supported-report-set>
          <D:supported-report><D:report><D:sync-collection/></D:report></D:supported-report>
        </D:supported-report-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    Mock::given(method("REPORT"))
        .and(path(CAL))
        .and(body_string_contains("calendar-query"))
        .and(body_string_contains("time-range"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:"></D:multistatus>"#,
            "application/xml",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("REPORT"))
        .and(path(CAL))
        .and(body_string_contains("sync-collection"))
        .respond_with(ResponseTemplate::new(207))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(Collection::new(
        "cal-1",
        CAL,
        CollectionKind::Calendar,
    )));
    let settings = AccountSettings {
        time_range_past_days: Some(90),
        ..AccountSettings::default()
    };
    let mut manager = SyncManager::new(
        dav(&server, CAL),
        store.clone(),
        Box::new(CalendarFlavor::new(&settings)),
        CancelToken::new(),
    );
    manager.perform_sync(&SyncExtras::default()).await.unwrap();

    // With a window the stored state is the CTag, never the sync token.
    let state = store.read_sync_state().await.unwrap().unwrap();
    assert_eq!(state.kind, SyncTokenKind::CTag);
    assert_eq!(state.value, "cal-tag");
}

#[tokio::test]
async fn uploads_use_etag_preconditions_and_conflicts_stay_dirty() {
    let server = MockServer::start().await;
    mount_caps(&server, "c8", false).await;
    mount_listing(&server, &[]).await;

    Mock::given(method("PUT"))
        .and(path(format!("{BOOK}new.vcf")))
        .and(header("if-none-match", "*"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"n1\""))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("{BOOK}old.vcf")))
        .and(header("if-match", "\"1\""))
        .respond_with(ResponseTemplate::new(412))
        .expect(1)
        .mount(&server)
        .await;

    let store = book_store();
    let payload = syncplus_vobject::parse(&vcard("new")).unwrap().remove(0);
    let mut fresh = LocalEntry::new_local("new", payload);
    fresh.file_name = Some("new.vcf".to_string());
    store.seed(fresh);
    let mut conflicted = seeded_contact("old", "old.vcf", "\"1\"");
    conflicted.dirty = true;
    store.seed(conflicted);

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.uploaded, 1);
    let new = store.find_by_uid("new").await.unwrap().unwrap();
    assert!(!new.dirty);
    assert_eq!(new.etag.as_ref().unwrap().as_str(), "\"n1\"");
    assert!(new.remotely_present);

    let old = store.find_by_uid("old").await.unwrap().unwrap();
    assert!(old.dirty, "conflicted upload is retried next pass");
}

#[tokio::test]
async fn calendar_uploads_capture_schedule_tags() {
    const CAL: &str = "/dav/cal/";
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path(CAL))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>{CAL}</D:href>
    <D:propstat>
      <D:prop><CS:getctag>c-ev</CS:getctag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path(CAL))
        .and(header("Depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>{CAL}</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("{CAL}ev-1.ics")))
        .and(header("if-none-match", "*"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("ETag", "\"e1\"")
                .insert_header("Schedule-Tag", "\"st-1\""),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(Collection::new(
        "cal-1",
        CAL,
        CollectionKind::Calendar,
    )));
    let ical = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:ev-1\r\nSUMMARY:standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let payload = syncplus_vobject::parse(ical).unwrap().remove(0);
    let mut event = LocalEntry::new_local("ev-1", payload);
    event.file_name = Some("ev-1.ics".to_string());
    store.seed(event);

    let mut manager = SyncManager::new(
        dav(&server, CAL),
        store.clone(),
        Box::new(CalendarFlavor::new(&AccountSettings::default())),
        CancelToken::new(),
    );
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.uploaded, 1);
    let event = store.find_by_uid("ev-1").await.unwrap().unwrap();
    assert_eq!(event.etag.as_ref().unwrap().as_str(), "\"e1\"");
    assert_eq!(event.schedule_tag.as_deref(), Some("\"st-1\""));
}

#[tokio::test]
async fn local_only_tombstones_vanish_without_remote_delete() {
    let server = MockServer::start().await;
    mount_caps(&server, "c10", false).await;
    mount_listing(&server, &[]).await;
    forbid_writes(&server).await;

    let store = book_store();
    let payload = syncplus_vobject::parse(&vcard("draft")).unwrap().remove(0);
    let mut never_uploaded = LocalEntry::new_local("draft", payload);
    never_uploaded.deleted = true;
    store.seed(never_uploaded);

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    // The entry never existed remotely, so nothing was deleted there.
    assert_eq!(stats.deleted_remote, 0);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn tombstones_delete_remotely_then_vanish() {
    let server = MockServer::start().await;
    mount_caps(&server, "c9", false).await;
    mount_listing(&server, &[("a.vcf", "\"1\""), ("gone.vcf", "\"2\"")]).await;

    Mock::given(method("REPORT"))
        .and(path(BOOK))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            multiget_body(&[("a.vcf", "\"1\"", &vcard("a"))]),
            "application/xml",
        ))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{BOOK}gone.vcf")))
        .and(header("if-match", "\"2\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = book_store();
    let mut tombstone = seeded_contact("gone", "gone.vcf", "\"2\"");
    tombstone.deleted = true;
    store.seed(tombstone);

    let mut manager = contacts_manager(&server, Arc::clone(&store));
    let stats = manager.perform_sync(&SyncExtras::default()).await.unwrap();

    assert_eq!(stats.deleted_remote, 1);
    assert!(store.find_by_uid("gone").await.unwrap().is_none());
}
