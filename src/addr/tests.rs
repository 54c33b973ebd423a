//! Unit tests for address parsing and CIDR range arithmetic.

use super::*;
use rstest::rstest;

#[rstest]
#[case("10.0.0.0", false, 0x0a00_0000)]
#[case("255.255.255.255", false, 0xffff_ffff)]
#[case("::1", true, 1)]
#[case("2a01:4f8::", true, 0x2a01_04f8_0000_0000_0000_0000_0000_0000)]
fn parse_address_resolves_family_without_hint(
    #[case] text: &str,
    #[case] is_v6: bool,
    #[case] value: u128,
) {
    assert_eq!(parse_address(text, None), Ok((is_v6, value)));
}

#[rstest]
#[case("not-an-address")]
#[case("10.0.0.256")]
#[case("")]
fn parse_address_rejects_malformed_text(#[case] text: &str) {
    assert_eq!(
        parse_address(text, None),
        Err(AddrError::Format(text.to_owned()))
    );
}

#[rstest]
#[case("10.0.0.1", Some(true), "IPv6")]
#[case("2a01:4f8::2", Some(false), "IPv4")]
fn parse_address_rejects_family_mismatch(
    #[case] text: &str,
    #[case] hint: Option<bool>,
    #[case] expected: &'static str,
) {
    assert_eq!(
        parse_address(text, hint),
        Err(AddrError::Family {
            address: text.to_owned(),
            expected,
        })
    );
}

#[test]
fn format_address_round_trips_both_families() {
    let (_, v4) = parse_address("192.168.1.77", None).expect("v4 parses");
    assert_eq!(format_address(v4, false).expect("fits"), "192.168.1.77");
    let (_, v6) = parse_address("2a01:4f8::2", None).expect("v6 parses");
    assert_eq!(format_address(v6, true).expect("fits"), "2a01:4f8::2");
}

#[test]
fn format_address_rejects_oversized_v4_value() {
    let err = format_address(u128::from(u32::MAX) + 1, false).expect_err("must overflow");
    assert!(matches!(err, AddrError::Unrepresentable { .. }));
}

#[test]
fn range_for_slash_24_matches_expected_bounds() {
    let range = AddressRange::new("10.0.0.0", 24).expect("valid network");
    assert_eq!(range.low_address(), "10.0.0.0");
    assert_eq!(range.high_address(), "10.0.0.255");
    assert!(range.contains("10.0.0.5").expect("valid address"));
    assert!(range.contains("10.0.0.255").expect("valid address"));
    assert!(!range.contains("10.0.1.0").expect("valid address"));
}

#[test]
fn range_bounds_enclose_network_value_and_edges() {
    for (network, mask) in [("10.1.2.128", 25), ("2a01:4f8:100::", 56), ("0.0.0.0", 0)] {
        let range = AddressRange::new(network, mask).expect("valid network");
        let (low, high) = range.bounds();
        assert!(low <= range.network_value());
        assert!(range.network_value() <= high);
        assert!(range.contains(&range.low_address()).expect("low bound"));
        assert!(range.contains(&range.high_address()).expect("high bound"));
    }
}

#[test]
fn range_excludes_neighbours_outside_the_bounds() {
    let range = AddressRange::new("10.0.4.0", 22).expect("valid network");
    let (low, high) = range.bounds();
    let below = format_address(low - 1, false).expect("representable");
    let above = format_address(high + 1, false).expect("representable");
    assert!(!range.contains(&below).expect("valid address"));
    assert!(!range.contains(&above).expect("valid address"));
}

#[test]
fn zero_mask_v6_covers_the_whole_address_space() {
    let range = AddressRange::new("::", 0).expect("valid network");
    assert_eq!(range.bounds(), (0, u128::MAX));
}

#[test]
fn v4_full_range_high_bound_formats_at_the_width_limit() {
    let range = AddressRange::new("0.0.0.0", 0).expect("valid network");
    assert_eq!(range.low_address(), "0.0.0.0");
    assert_eq!(range.high_address(), "255.255.255.255");
}

#[test]
fn host_prefix_collapses_to_a_single_address() {
    let range = AddressRange::new("192.0.2.7", 32).expect("valid network");
    assert_eq!(range.low_address(), "192.0.2.7");
    assert_eq!(range.high_address(), "192.0.2.7");
}

#[rstest]
#[case("10.0.0.0", 33, "IPv4")]
#[case("2a01:4f8::", 129, "IPv6")]
fn oversized_masks_are_rejected(
    #[case] network: &str,
    #[case] mask: u32,
    #[case] family: &'static str,
) {
    assert_eq!(
        AddressRange::new(network, mask),
        Err(AddrError::Mask { mask, family })
    );
}

#[test]
fn contains_rejects_addresses_of_the_other_family() {
    let range = AddressRange::new("10.0.0.0", 24).expect("valid network");
    assert!(matches!(
        range.contains("2a01:4f8::2"),
        Err(AddrError::Family { .. })
    ));
}
