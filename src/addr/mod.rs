//! Numeric IPv4/IPv6 parsing and CIDR range arithmetic.
//!
//! Everything in this module is a pure function of its inputs; network
//! addresses are widened to `u128` so both families share one code path.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;

/// Bits in an IPv4 address.
const V4_BITS: u32 = 32;
/// Bits in an IPv6 address.
const V6_BITS: u32 = 128;

/// Errors raised by address parsing and range computation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AddrError {
    /// Raised when the text is not a valid address in any family.
    #[error("malformed IP address '{0}'")]
    Format(String),
    /// Raised when the text parses but not in the expected family.
    #[error("address '{address}' is not an {expected} address")]
    Family {
        /// Offending address text.
        address: String,
        /// Family that was requested, `IPv4` or `IPv6`.
        expected: &'static str,
    },
    /// Raised when the prefix length exceeds the family's address width.
    #[error("invalid prefix length {mask} for an {family} network")]
    Mask {
        /// Offending prefix length.
        mask: u32,
        /// Family the prefix was applied to.
        family: &'static str,
    },
    /// Raised when a numeric value does not fit an IPv4 address.
    #[error("value {value:#x} does not fit an IPv4 address")]
    Unrepresentable {
        /// Numeric value that overflowed 32 bits.
        value: u128,
    },
}

/// Parses an address into its numeric value, returning `(is_v6, value)`.
///
/// When `v6_hint` is supplied the text must parse in that family; a valid
/// address of the other family raises [`AddrError::Family`].
///
/// # Errors
///
/// Returns [`AddrError::Format`] for text that is no address at all and
/// [`AddrError::Family`] on a hint mismatch.
pub fn parse_address(text: &str, v6_hint: Option<bool>) -> Result<(bool, u128), AddrError> {
    match v6_hint {
        Some(true) => match text.parse::<Ipv6Addr>() {
            Ok(addr) => Ok((true, u128::from(addr))),
            Err(_) if text.parse::<Ipv4Addr>().is_ok() => Err(AddrError::Family {
                address: text.to_owned(),
                expected: "IPv6",
            }),
            Err(_) => Err(AddrError::Format(text.to_owned())),
        },
        Some(false) => match text.parse::<Ipv4Addr>() {
            Ok(addr) => Ok((false, u128::from(u32::from(addr)))),
            Err(_) if text.parse::<Ipv6Addr>().is_ok() => Err(AddrError::Family {
                address: text.to_owned(),
                expected: "IPv4",
            }),
            Err(_) => Err(AddrError::Format(text.to_owned())),
        },
        None => match text.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok((false, u128::from(u32::from(addr)))),
            Ok(IpAddr::V6(addr)) => Ok((true, u128::from(addr))),
            Err(_) => Err(AddrError::Format(text.to_owned())),
        },
    }
}

/// Formats a numeric address value back into its textual form.
///
/// # Errors
///
/// Returns [`AddrError::Unrepresentable`] when `is_v6` is false and the
/// value exceeds 32 bits.
pub fn format_address(value: u128, is_v6: bool) -> Result<String, AddrError> {
    if is_v6 {
        return Ok(Ipv6Addr::from(value).to_string());
    }
    let narrow = u32::try_from(value).map_err(|_| AddrError::Unrepresentable { value })?;
    Ok(Ipv4Addr::from(narrow).to_string())
}

/// Inclusive range of addresses covered by one network/prefix pair.
///
/// The range is derived wholesale from the textual network and prefix at
/// construction and is immutable afterwards; callers refresh by building a
/// new value rather than patching fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressRange {
    is_v6: bool,
    network_value: u128,
    mask: u32,
    low: u128,
    high: u128,
}

impl AddressRange {
    /// Computes the range for `network`/`mask` using standard CIDR
    /// arithmetic: host bits are zeroed for the low bound and set for the
    /// high bound.
    ///
    /// # Errors
    ///
    /// Returns [`AddrError::Format`] for malformed network text and
    /// [`AddrError::Mask`] when the prefix exceeds the family width.
    pub fn new(network: &str, mask: u32) -> Result<Self, AddrError> {
        let (is_v6, network_value) = parse_address(network, None)?;
        let bits = if is_v6 { V6_BITS } else { V4_BITS };
        if mask > bits {
            return Err(AddrError::Mask {
                mask,
                family: if is_v6 { "IPv6" } else { "IPv4" },
            });
        }
        let host_bits = bits - mask;
        let host_mask = if host_bits == V6_BITS {
            u128::MAX
        } else {
            (1u128 << host_bits) - 1
        };
        Ok(Self {
            is_v6,
            network_value,
            mask,
            low: network_value & !host_mask,
            high: network_value | host_mask,
        })
    }

    /// Returns whether the textual address falls inside the range.
    ///
    /// The address is parsed with the range's own family as hint, so a
    /// well-formed address of the other family is a [`AddrError::Family`]
    /// error rather than a silent `false`.
    ///
    /// # Errors
    ///
    /// Propagates parsing failures from [`parse_address`].
    pub fn contains(&self, address: &str) -> Result<bool, AddrError> {
        let (_, value) = parse_address(address, Some(self.is_v6))?;
        Ok(self.low <= value && value <= self.high)
    }

    /// Smallest address of the range in textual form.
    #[must_use]
    pub fn low_address(&self) -> String {
        format_textual(self.low, self.is_v6)
    }

    /// Biggest address of the range in textual form.
    #[must_use]
    pub fn high_address(&self) -> String {
        format_textual(self.high, self.is_v6)
    }

    /// Returns the inclusive numeric `(low, high)` bounds.
    #[must_use]
    pub const fn bounds(&self) -> (u128, u128) {
        (self.low, self.high)
    }

    /// Numeric value of the network address the range was built from.
    #[must_use]
    pub const fn network_value(&self) -> u128 {
        self.network_value
    }

    /// Prefix length the range was built from.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Whether the range covers an IPv6 network.
    #[must_use]
    pub const fn is_v6(&self) -> bool {
        self.is_v6
    }
}

// Bounds never exceed the family width, so formatting cannot fail.
fn format_textual(value: u128, is_v6: bool) -> String {
    format_address(value, is_v6).map_or_else(
        |err| {
            debug_assert!(false, "range bound out of family width: {err}");
            String::new()
        },
        |text| text,
    )
}

#[cfg(test)]
mod tests;
