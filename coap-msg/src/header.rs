use core::fmt;

/// CoAP message type (RFC 7252 §3), carried in bits 4-5 of the first header
/// byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
  /// Confirmable — retransmitted until acknowledged or the global deadline
  /// expires.
  Con,
  /// Non-confirmable — sent once, no retransmission.
  Non,
  /// Acknowledgement of a confirmable message.
  Ack,
  /// Reset, sent when a message cannot be processed.
  Rst,
}

impl Type {
  pub(crate) fn from_bits(bits: u8) -> Self {
    match bits & 0x03 {
      | 0 => Self::Con,
      | 1 => Self::Non,
      | 2 => Self::Ack,
      | _ => Self::Rst,
    }
  }

  pub(crate) fn bits(self) -> u8 {
    match self {
      | Self::Con => 0,
      | Self::Non => 1,
      | Self::Ack => 2,
      | Self::Rst => 3,
    }
  }
}

/// A CoAP method or response code, packed as a 3-bit class and 5-bit detail
/// into one byte (RFC 7252 §3: `class.detail`, e.g. `2.05`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code {
  /// The code's class, 0-7 (0 = request, 2 = success, 4 = client error, 5 =
  /// server error).
  pub class: u8,
  /// The code's detail, 0-31.
  pub detail: u8,
}

impl Code {
  /// Builds a code from its class and detail parts.
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Packs this code into its one-byte wire representation.
  pub const fn to_byte(self) -> u8 {
    (self.class << 5) | (self.detail & 0x1f)
  }

  /// Unpacks a wire byte into class and detail.
  pub const fn from_byte(byte: u8) -> Self {
    Self { class: byte >> 5, detail: byte & 0x1f }
  }

  /// `0.00`, the empty message code (used by standalone ACKs and RSTs).
  pub const EMPTY: Self = Self::new(0, 0);
  /// `0.01 GET`.
  pub const GET: Self = Self::new(0, 1);
  /// `0.02 POST`.
  pub const POST: Self = Self::new(0, 2);
  /// `0.03 PUT`.
  pub const PUT: Self = Self::new(0, 3);
  /// `0.04 DELETE`.
  pub const DELETE: Self = Self::new(0, 4);

  /// `2.01 Created`.
  pub const CREATED: Self = Self::new(2, 1);
  /// `2.02 Deleted`.
  pub const DELETED: Self = Self::new(2, 2);
  /// `2.03 Valid`.
  pub const VALID: Self = Self::new(2, 3);
  /// `2.04 Changed`.
  pub const CHANGED: Self = Self::new(2, 4);
  /// `2.05 Content`.
  pub const CONTENT: Self = Self::new(2, 5);

  /// `4.00 Bad Request`.
  pub const BAD_REQUEST: Self = Self::new(4, 0);
  /// `4.01 Unauthorized`.
  pub const UNAUTHORIZED: Self = Self::new(4, 1);
  /// `4.02 Bad Option`.
  pub const BAD_OPTION: Self = Self::new(4, 2);
  /// `4.03 Forbidden`.
  pub const FORBIDDEN: Self = Self::new(4, 3);
  /// `4.04 Not Found`.
  pub const NOT_FOUND: Self = Self::new(4, 4);
  /// `4.05 Method Not Allowed`.
  pub const METHOD_NOT_ALLOWED: Self = Self::new(4, 5);
  /// `4.06 Not Acceptable`.
  pub const NOT_ACCEPTABLE: Self = Self::new(4, 6);
  /// `4.12 Precondition Failed`.
  pub const PRECONDITION_FAILED: Self = Self::new(4, 12);
  /// `4.13 Request Entity Too Large`.
  pub const REQUEST_ENTITY_TOO_LARGE: Self = Self::new(4, 13);
  /// `4.15 Unsupported Content-Format`.
  pub const UNSUPPORTED_CONTENT_FORMAT: Self = Self::new(4, 15);

  /// `5.00 Internal Server Error`.
  pub const INTERNAL_SERVER_ERROR: Self = Self::new(5, 0);
  /// `5.01 Not Implemented`.
  pub const NOT_IMPLEMENTED: Self = Self::new(5, 1);
  /// `5.02 Bad Gateway`.
  pub const BAD_GATEWAY: Self = Self::new(5, 2);
  /// `5.03 Service Unavailable`.
  pub const SERVICE_UNAVAILABLE: Self = Self::new(5, 3);
  /// `5.04 Gateway Timeout`.
  pub const GATEWAY_TIMEOUT: Self = Self::new(5, 4);
  /// `5.05 Proxying Not Supported`.
  pub const PROXYING_NOT_SUPPORTED: Self = Self::new(5, 5);

  /// Returns the `(class, detail)` pair, for callers that want to format it
  /// themselves.
  pub fn to_human(self) -> (u8, u8) {
    (self.class, self.detail)
  }
}

impl fmt::Display for Code {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.class, self.detail)
  }
}

impl From<u8> for Code {
  fn from(byte: u8) -> Self {
    Self::from_byte(byte)
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> Self {
    code.to_byte()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_round_trips_through_a_byte() {
    let code = Code::new(2, 5);
    assert_eq!(code.to_byte(), 0x45);
    assert_eq!(Code::from_byte(0x45), code);
    assert_eq!(Code::CONTENT, code);
  }

  #[test]
  fn code_formats_as_class_dot_detail() {
    extern crate std;
    use std::string::ToString;
    assert_eq!(Code::GET.to_string(), "0.01");
    assert_eq!(Code::NOT_FOUND.to_string(), "4.04");
  }

  #[test]
  fn type_bits_round_trip() {
    for ty in [Type::Con, Type::Non, Type::Ack, Type::Rst] {
      assert_eq!(Type::from_bits(ty.bits()), ty);
    }
  }
}
