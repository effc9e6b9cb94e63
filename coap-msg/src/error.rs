use core::fmt;

/// Errors encounterable while building a [`crate::Packet`].
///
/// These are all either programmer errors (calling the build methods out of
/// order, or with data that violates RFC 7252) or capacity errors (the fixed
/// buffer or option table is full). Both kinds leave the packet under
/// construction poisoned; the caller must `begin()` again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
  /// A build method was called before its prerequisite step, e.g. `add_option`
  /// before `add_header`.
  OutOfOrder,
  /// `add_tokens` was given a length greater than 8, or bytes without a
  /// matching nonzero length.
  BadToken,
  /// `add_option` was given a number outside the recognised set (including 0,
  /// the reserved `OPTION_REPEAT` value).
  BadOption,
  /// `add_option` was given a number less than the last option added; options
  /// must be added in non-decreasing order.
  BadOrder,
  /// The option table (`MAX_OPTIONS` entries) is already full.
  TooManyOptions,
  /// `add_payload` was called twice for the same packet.
  PayloadAlreadyPresent,
  /// The write would advance `length` past the buffer's fixed capacity.
  CapacityExceeded,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      | Self::OutOfOrder => "build method called out of order",
      | Self::BadToken => "token length must be in 0..=8",
      | Self::BadOption => "option number not in the recognised set",
      | Self::BadOrder => "option number must be >= the previous option's number",
      | Self::TooManyOptions => "option table is full",
      | Self::PayloadAlreadyPresent => "payload already added to this packet",
      | Self::CapacityExceeded => "write would exceed packet buffer capacity",
    };
    f.write_str(msg)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}

/// Errors encounterable while parsing a byte sequence into a [`crate::Packet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
  /// Fewer than 4 bytes were given; no complete header is present.
  Truncated,
  /// The version nibble was not 1.
  BadVersion,
  /// The token-length nibble was greater than 8.
  BadToken,
  /// An option's delta or length nibble was the reserved value 15.
  MalformedOption,
  /// More options were present than the fixed option table (`MAX_OPTIONS`)
  /// can index.
  TooManyOptions,
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      | Self::Truncated => "fewer than 4 bytes: no complete CoAP header",
      | Self::BadVersion => "unsupported CoAP version",
      | Self::BadToken => "token length nibble greater than 8",
      | Self::MalformedOption => "option delta or length nibble was the reserved value 15",
      | Self::TooManyOptions => "more options present than the fixed option table can index",
    };
    f.write_str(msg)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}
