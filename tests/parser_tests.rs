//! # Path Parsing Tests
//!
//! Tests for turning distinguished-path expressions into container segments.
//!
//! These tests verify:
//! - Only `OU=` components become segments, in leaf-first order
//! - Tags match case-insensitively and both `,` and `;` delimit components
//! - Escaped delimiters stay inside a segment name
//! - Lenient and strict handling of malformed components
//! - Destination addresses parse back to the same segments

use ou_provisioner::dn::{ContainerAddress, DomainRoot, Segment};
use ou_provisioner::parser::{parse, parse_with_mode, MalformedReason, ParseMode};
use ou_provisioner::provisioner::destination_address;

fn names(segments: &[Segment]) -> Vec<&str> {
    segments.iter().map(Segment::as_str).collect()
}

fn domain_root() -> ContainerAddress {
    ContainerAddress::root(DomainRoot::parse("DC=Domain,DC=Com").unwrap())
}

#[test]
fn test_parse_full_distinguished_name() {
    let path = parse("CN=Test User,OU=Men,OU=Staff,OU=NewOU,DC=Domain,DC=Com");

    assert_eq!(names(path.segments()), vec!["Men", "Staff", "NewOU"]);
    assert_eq!(names(&path.root_first()), vec!["NewOU", "Staff", "Men"]);

    let destination = destination_address(&domain_root(), &path.root_first());
    assert_eq!(
        destination.dn(),
        "OU=Men,OU=Staff,OU=NewOU,DC=Domain,DC=Com",
        "Destination should be the leaf-most OU under the root"
    );
}

#[test]
fn test_parse_path_without_containers() {
    let path = parse("CN=Test User,DC=Domain,DC=Com");
    assert!(path.is_empty(), "No OU components should yield no segments");
    assert_eq!(path.len(), 0);

    assert!(parse("").is_empty());
    assert!(parse("   ").is_empty());
}

#[test]
fn test_parse_tags_are_case_insensitive() {
    let path = parse("ou=Men,Ou=Staff,oU=NewOU");
    assert_eq!(names(path.segments()), vec!["Men", "Staff", "NewOU"]);
}

#[test]
fn test_parse_accepts_semicolon_delimiters() {
    let path = parse("OU=Men;OU=Staff,OU=NewOU");
    assert_eq!(names(path.segments()), vec!["Men", "Staff", "NewOU"]);
}

#[test]
fn test_parse_keeps_escaped_delimiters_in_names() {
    let path = parse(r"OU=Sales\, East,OU=Regions");
    assert_eq!(names(path.segments()), vec!["Sales, East", "Regions"]);

    let hex = parse(r"OU=R\26D,OU=Teams");
    assert_eq!(names(hex.segments()), vec!["R&D", "Teams"]);
}

#[test]
fn test_parse_trims_whitespace_around_components() {
    let path = parse(" OU = Men , OU=Staff ");
    assert_eq!(names(path.segments()), vec!["Men", "Staff"]);
}

#[test]
fn test_lenient_mode_skips_malformed_components() {
    let raw = "OU=Men,,garbage,OU=,OU=Staff";

    let lenient = parse_with_mode(raw, ParseMode::Lenient).unwrap();
    assert_eq!(names(lenient.segments()), vec!["Men", "Staff"]);
    assert_eq!(lenient, parse(raw), "parse() should be the lenient mode");
}

#[test]
fn test_strict_mode_reports_first_malformed_component() {
    let err = parse_with_mode("OU=Men,,OU=Staff", ParseMode::Strict).unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.reason, MalformedReason::EmptyComponent);

    let err = parse_with_mode("OU=Men,Staff", ParseMode::Strict).unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.component, "Staff");
    assert_eq!(err.reason, MalformedReason::MissingEquals);

    let err = parse_with_mode("OU=Men,OU=", ParseMode::Strict).unwrap_err();
    assert_eq!(err.reason, MalformedReason::EmptyValue);
}

#[test]
fn test_strict_mode_accepts_well_formed_paths() {
    let path =
        parse_with_mode("CN=Test User,OU=Men,OU=Staff,DC=Domain,DC=Com", ParseMode::Strict)
            .unwrap();
    assert_eq!(names(path.segments()), vec!["Men", "Staff"]);
}

#[test]
fn test_destination_dn_parses_back_to_same_segments() {
    let written = parse(r"OU=Sales\, East,OU=R\+D,OU=NewOU");
    let destination = destination_address(&domain_root(), &written.root_first());

    let reparsed = parse(&destination.dn());
    assert_eq!(
        reparsed.segments(),
        written.segments(),
        "Re-parsing {destination} should give back the same segments"
    );
}

#[test]
fn test_destination_dn_keeps_non_ascii_whitespace_in_names() {
    let segments: Vec<Segment> = ["\u{3000}b", "a\u{3000}", "tab\t", " padded "]
        .iter()
        .map(|name| Segment::new(*name).unwrap())
        .collect();
    let destination = destination_address(&domain_root(), &segments);

    let reparsed = parse(&destination.dn());
    assert_eq!(
        reparsed.root_first(),
        segments,
        "Re-parsing {destination:?} should give back the same segments"
    );
}
