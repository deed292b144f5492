// tests/feed_parse.rs
//
// Feed document parsing across RSS 2.0, RSS 1.0 (RDF) and Atom fixtures.

use rss_intel_monitor::ingest::error::ParseError;
use rss_intel_monitor::ingest::feed::parse_feed;

#[test]
fn rss_fixture_keeps_document_order_and_cleans_text() {
    let xml = include_str!("fixtures/security_rss.xml");
    let entries = parse_feed(xml).expect("rss parses");
    assert_eq!(entries.len(), 4);

    assert_eq!(entries[0].title, "Critical RCE found in popular VPN appliance");
    assert_eq!(
        entries[0].link.as_deref(),
        Some("https://news.example.test/2025/06/vpn-rce")
    );
    assert_eq!(
        entries[0].summary,
        "Attackers are exploiting a critical flaw in the web portal."
    );
    assert!(entries[1].published.is_some(), "numeric offset date parses");

    // The repeated link is still returned; dedup happens in the worker.
    assert_eq!(entries[2].link, entries[0].link);
    assert_eq!(entries[3].link, None);
}

#[test]
fn atom_fixture_prefers_alternate_link_and_falls_back_to_content() {
    let xml = include_str!("fixtures/advisories_atom.xml");
    let entries = parse_feed(xml).expect("atom parses");
    assert_eq!(entries.len(), 2);

    assert_eq!(
        entries[0].link.as_deref(),
        Some("https://adv.example.test/advisory/1")
    );
    assert_eq!(entries[0].title, "Zero-day & patch guidance");
    assert_eq!(entries[0].summary, "Vulnerability in the update service.");
    assert_eq!(
        entries[0].published.map(|d| d.to_rfc3339()),
        Some("2025-06-10T11:00:00+00:00".to_string())
    );

    assert_eq!(
        entries[1].link.as_deref(),
        Some("https://adv.example.test/advisory/2")
    );
    assert_eq!(entries[1].summary, "Scheduled downtime.");
    // `updated` is used when `published` is absent, normalised to UTC.
    assert_eq!(
        entries[1].published.map(|d| d.to_rfc3339()),
        Some("2025-06-09T06:00:00+00:00".to_string())
    );
}

#[test]
fn rdf_fixture_reads_items_outside_channel() {
    let xml = include_str!("fixtures/bulletin_rdf.xml");
    let entries = parse_feed(xml).expect("rdf parses");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "Ransomware campaign targets hospitals");
    assert_eq!(
        entries[1].link.as_deref(),
        Some("https://bulletin.example.test/b/101")
    );
    assert_eq!(entries[1].summary, "");
}

#[test]
fn channel_without_items_is_an_empty_feed() {
    let xml = r#"<rss version="2.0"><channel><title>Quiet</title></channel></rss>"#;
    assert!(parse_feed(xml).expect("parses").is_empty());
}

#[test]
fn html_entities_outside_xml_are_tolerated() {
    let xml = "<rss><channel><item><title>Patch&nbsp;Tuesday &ndash; June</title>\
               <link>https://x.test/pt</link></item></channel></rss>";
    let entries = parse_feed(xml).expect("parses");
    assert_eq!(entries[0].title, "Patch Tuesday - June");
}

#[test]
fn mismatched_tags_are_a_parse_error() {
    let xml = "<rss><channel><item><title>a</title><link>https://x.test/1</link></item>\
               <item></channel></rss>";
    assert!(matches!(parse_feed(xml), Err(ParseError::Xml(_))));
}

#[test]
fn bot_wall_html_is_rejected() {
    let html = "<!DOCTYPE html><html><head><title>Just a moment...</title></head><body></body></html>";
    let err = parse_feed(html).expect_err("html is not a feed");
    assert!(matches!(err, ParseError::UnknownRoot(ref r) if r == "html"));
}

#[test]
fn media_and_atom_extensions_inside_item_do_not_clash() {
    let xml = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/"
     xmlns:atom="http://www.w3.org/2005/Atom" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Wire</title>
    <atom:link href="https://wire.test/rss" rel="self" type="application/rss+xml"/>
    <item>
      <title>Real title</title>
      <atom:link href="https://wire.test/self/1" rel="self"/>
      <link>https://wire.test/story/1</link>
      <dc:title>Dublin Core title</dc:title>
      <description>Body text.</description>
      <media:content url="https://cdn.wire.test/1.jpg">
        <media:title>Thumb caption</media:title>
        <media:description>Photo credit</media:description>
      </media:content>
      <media:title>Second caption</media:title>
      <dc:date>2025-06-10T09:00:00Z</dc:date>
    </item>
  </channel>
</rss>"#;
    let entries = parse_feed(xml).expect("valid media rss parses");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Real title");
    assert_eq!(entries[0].link.as_deref(), Some("https://wire.test/story/1"));
    assert_eq!(entries[0].summary, "Body text.");
    assert_eq!(
        entries[0].published.map(|d| d.to_rfc3339()),
        Some("2025-06-10T09:00:00+00:00".to_string())
    );
}

#[test]
fn repeated_core_field_keeps_first_occurrence() {
    let xml = "<rss><channel><item><title>First</title><title>Second</title>\
               <link>https://x.test/1</link><link>https://x.test/2</link></item></channel></rss>";
    let entries = parse_feed(xml).expect("parses");
    assert_eq!(entries[0].title, "First");
    assert_eq!(entries[0].link.as_deref(), Some("https://x.test/1"));
}

#[test]
fn truncated_document_is_a_parse_error() {
    let xml = "<rss><channel><item><title>a</title><link>https://x.test/1</link></item>";
    assert!(matches!(parse_feed(xml), Err(ParseError::Xml(_))));
}
