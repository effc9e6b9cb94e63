use tinyvec::ArrayVec;

use crate::error::{BuildError, ParseError};
use crate::header::{Code, Type};
use crate::option::{self, OptionEntry};

const VERSION: u8 = 1;

/// Tracks how far a packet under construction has progressed along
/// `begin -> add_header -> add_tokens? -> add_option* -> add_payload?`.
/// `add_tokens` is only legal right after `add_header`; `add_option` and
/// `add_payload` are legal from `HeaderDone` onward, since either step may be
/// skipped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BuildStage {
  Empty,
  HeaderDone,
  TokensDone,
  OptionsDone,
  PayloadDone,
}

/// A fixed-capacity CoAP packet: `CAP` bytes of wire buffer plus an index of
/// up to `MAX_OPTS` options.
///
/// Two ways to populate one: incrementally through the `add_*` build methods
/// (enforcing RFC 7252's header/token/option/payload ordering and the
/// non-decreasing option number rule), or in one shot through [`Packet::parse`].
/// A packet built or parsed this way never allocates; `CAP` and `MAX_OPTS` are
/// chosen by the caller to match its device's memory budget.
#[derive(Clone, Debug)]
pub struct Packet<const CAP: usize, const MAX_OPTS: usize> {
  buf: ArrayVec<[u8; CAP]>,
  stage: BuildStage,

  version: u8,
  ty: Type,
  token_length: u8,
  code: Code,
  message_id: u16,
  payload_off: Option<u16>,

  options: ArrayVec<[OptionEntry; MAX_OPTS]>,
  last_option_number: u32,
  option_cursor: usize,
}

impl<const CAP: usize, const MAX_OPTS: usize> Packet<CAP, MAX_OPTS> {
  /// An empty packet, ready for `add_header`. Equivalent to
  /// `Packet::default()`.
  pub fn new() -> Self {
    Self {
      buf: ArrayVec::new(),
      stage: BuildStage::Empty,
      version: VERSION,
      ty: Type::Con,
      token_length: 0,
      code: Code::EMPTY,
      message_id: 0,
      payload_off: None,
      options: ArrayVec::new(),
      last_option_number: 0,
      option_cursor: 0,
    }
  }

  /// Resets the packet to a blank state, discarding any bytes and options
  /// already built or parsed, ready for `add_header`.
  pub fn begin(&mut self) {
    *self = Self::new();
  }

  fn push_byte(&mut self, byte: u8) -> Result<(), BuildError> {
    if self.buf.len() >= CAP {
      return Err(BuildError::CapacityExceeded);
    }
    self.buf.push(byte);
    Ok(())
  }

  fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
    if self.buf.len() + bytes.len() > CAP {
      return Err(BuildError::CapacityExceeded);
    }
    self.buf.extend_from_slice(bytes);
    Ok(())
  }

  /// Writes the 4-byte fixed header. Must be the first build call after
  /// `begin`.
  pub fn add_header(&mut self, ty: Type, code: Code, message_id: u16) -> Result<(), BuildError> {
    if self.stage != BuildStage::Empty {
      return Err(BuildError::OutOfOrder);
    }
    let byte0 = (VERSION << 6) | (ty.bits() << 4);
    self.push_byte(byte0)?;
    self.push_byte(code.to_byte())?;
    self.push_bytes(&message_id.to_be_bytes())?;

    self.ty = ty;
    self.code = code;
    self.message_id = message_id;
    self.stage = BuildStage::HeaderDone;
    Ok(())
  }

  /// Appends the token and records its length in the header's low nibble.
  /// Only legal immediately after `add_header`; skip it for a zero-length
  /// token.
  pub fn add_tokens(&mut self, token_length: u8, bytes: &[u8]) -> Result<(), BuildError> {
    if self.stage != BuildStage::HeaderDone {
      return Err(BuildError::OutOfOrder);
    }
    if token_length > 8 || token_length as usize != bytes.len() {
      return Err(BuildError::BadToken);
    }
    self.push_bytes(bytes)?;
    self.buf[0] |= token_length & 0x0f;
    self.token_length = token_length;
    self.stage = BuildStage::TokensDone;
    Ok(())
  }

  /// Appends one option. Options must be added in non-decreasing `number`
  /// order; `number` must belong to the recognised set.
  pub fn add_option(&mut self, number: u16, value: &[u8]) -> Result<(), BuildError> {
    match self.stage {
      | BuildStage::HeaderDone | BuildStage::TokensDone | BuildStage::OptionsDone => {},
      | BuildStage::Empty | BuildStage::PayloadDone => return Err(BuildError::OutOfOrder),
    }
    if !option::is_recognised(number) {
      return Err(BuildError::BadOption);
    }
    if (number as u32) < self.last_option_number {
      return Err(BuildError::BadOrder);
    }
    if self.options.len() >= MAX_OPTS {
      return Err(BuildError::TooManyOptions);
    }

    let delta = number as u32 - self.last_option_number;
    let delta_enc = option::encode_len_or_delta(delta);
    let len_enc = option::encode_len_or_delta(value.len() as u32);

    let header = (delta_enc.nibble << 4) | len_enc.nibble;
    self.push_byte(header)?;
    self.push_bytes(&delta_enc.ext)?;
    self.push_bytes(&len_enc.ext)?;
    let value_offset = self.buf.len() as u16;
    self.push_bytes(value)?;

    self.options.push(OptionEntry { number, value_offset, value_len: value.len() as u16 });
    self.last_option_number = number as u32;
    self.stage = BuildStage::OptionsDone;
    Ok(())
  }

  /// Writes the `0xFF` payload marker followed by `bytes`. May be called at
  /// most once per build.
  pub fn add_payload(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
    match self.stage {
      | BuildStage::HeaderDone | BuildStage::TokensDone | BuildStage::OptionsDone => {},
      | BuildStage::PayloadDone => return Err(BuildError::PayloadAlreadyPresent),
      | BuildStage::Empty => return Err(BuildError::OutOfOrder),
    }
    self.push_byte(0xFF)?;
    let payload_off = self.buf.len() as u16;
    self.push_bytes(bytes)?;
    self.payload_off = Some(payload_off);
    self.stage = BuildStage::PayloadDone;
    Ok(())
  }

  /// Parses a received datagram into a packet. `bytes.len()` must not exceed
  /// `CAP`.
  pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
    if bytes.len() < 4 {
      return Err(ParseError::Truncated);
    }
    if bytes.len() > CAP {
      return Err(ParseError::Truncated);
    }

    let byte0 = bytes[0];
    let version = byte0 >> 6;
    if version != VERSION {
      return Err(ParseError::BadVersion);
    }
    let ty = Type::from_bits(byte0 >> 4);
    let token_length = byte0 & 0x0f;
    if token_length > 8 {
      return Err(ParseError::BadToken);
    }
    let code = Code::from_byte(bytes[1]);
    let message_id = u16::from_be_bytes([bytes[2], bytes[3]]);

    let n = bytes.len();
    let mut cursor = 4usize + token_length as usize;
    if cursor > n {
      return Err(ParseError::Truncated);
    }

    let mut options: ArrayVec<[OptionEntry; MAX_OPTS]> = ArrayVec::new();
    let mut last_number: u32 = 0;

    while cursor < n && bytes[cursor] != 0xFF {
      let header = bytes[cursor];
      let delta_nibble = header >> 4;
      let length_nibble = header & 0x0f;
      cursor += 1;

      let (delta, consumed) = option::decode_len_or_delta(delta_nibble, &bytes[cursor..])?;
      cursor += consumed;
      let (len, consumed) = option::decode_len_or_delta(length_nibble, &bytes[cursor..])?;
      cursor += consumed;

      let number = last_number + delta;
      last_number = number;

      if cursor + len as usize > n {
        return Err(ParseError::Truncated);
      }
      if options.len() >= MAX_OPTS {
        return Err(ParseError::TooManyOptions);
      }
      options.push(OptionEntry { number: number as u16, value_offset: cursor as u16, value_len: len as u16 });
      cursor += len as usize;
    }

    let payload_off = if cursor < n && bytes[cursor] == 0xFF { Some(cursor as u16 + 1) } else { None };

    let mut buf = ArrayVec::new();
    buf.extend_from_slice(bytes);

    Ok(Self {
      buf,
      stage: BuildStage::PayloadDone,
      version,
      ty,
      token_length,
      code,
      message_id,
      payload_off,
      options,
      last_option_number: last_number,
      option_cursor: 0,
    })
  }

  /// The packet's encoded bytes.
  pub fn as_bytes(&self) -> &[u8] {
    &self.buf
  }

  /// Number of meaningful bytes currently in the buffer.
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  /// True if no bytes have been written yet.
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  /// CoAP version; always 1 for a valid packet.
  pub fn version(&self) -> u8 {
    self.version
  }

  /// Message type (CON/NON/ACK/RST).
  pub fn ty(&self) -> Type {
    self.ty
  }

  /// Method or response code.
  pub fn code(&self) -> Code {
    self.code
  }

  /// 16-bit message ID.
  pub fn message_id(&self) -> u16 {
    self.message_id
  }

  /// Token length in bytes, 0..=8.
  pub fn token_length(&self) -> u8 {
    self.token_length
  }

  /// The token bytes, `token_length()` long.
  pub fn token(&self) -> &[u8] {
    &self.buf[4..4 + self.token_length as usize]
  }

  /// Offset of the payload within the buffer, or `None` if the packet has no
  /// payload.
  pub fn payload_off(&self) -> Option<u16> {
    self.payload_off
  }

  /// The payload bytes, or an empty slice if the packet has no payload.
  pub fn payload(&self) -> &[u8] {
    match self.payload_off {
      | Some(off) => &self.buf[off as usize..],
      | None => &[],
    }
  }

  /// Number of options currently indexed.
  pub fn option_count(&self) -> usize {
    self.options.len()
  }

  /// Resets the option iteration cursor and returns the first option's
  /// number, or `None` if the packet has no options.
  pub fn option_start(&mut self) -> Option<u16> {
    self.option_cursor = 0;
    self.options.get(0).map(|o| o.number)
  }

  /// Advances the option iteration cursor and returns the next option's
  /// number, or `None` once iteration is exhausted. Call `option_start`
  /// first; the cursor does not reset on its own.
  pub fn next_option(&mut self) -> Option<u16> {
    self.option_cursor += 1;
    self.options.get(self.option_cursor).map(|o| o.number)
  }

  /// The value of the option the cursor currently points at, or `None` if
  /// the cursor is out of range.
  pub fn current_value(&self) -> Option<&[u8]> {
    let entry = self.options.get(self.option_cursor)?;
    let start = entry.value_offset as usize;
    let end = start + entry.value_len as usize;
    self.buf.get(start..end)
  }
}

impl<const CAP: usize, const MAX_OPTS: usize> Default for Packet<CAP, MAX_OPTS> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const CAP: usize, const MAX_OPTS: usize> PartialEq for Packet<CAP, MAX_OPTS> {
  fn eq(&self, other: &Self) -> bool {
    self.as_bytes() == other.as_bytes()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type TestPacket = Packet<64, 8>;

  #[test]
  fn get_round_trip_matches_spec_scenario_s1() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::GET, 0x1234).unwrap();
    p.add_tokens(1, &[0xAB]).unwrap();
    p.add_option(option::URI_PATH, b"hi").unwrap();

    assert_eq!(p.as_bytes(), &[0x41, 0x01, 0x12, 0x34, 0xAB, 0xB2, b'h', b'i']);

    let mut parsed = TestPacket::parse(p.as_bytes()).unwrap();
    assert_eq!(parsed.ty(), Type::Con);
    assert_eq!(parsed.code(), Code::GET);
    assert_eq!(parsed.message_id(), 0x1234);
    assert_eq!(parsed.token(), &[0xAB]);
    assert_eq!(parsed.option_start(), Some(11));
    assert_eq!(parsed.current_value(), Some(&b"hi"[..]));
    assert_eq!(parsed.next_option(), None);
  }

  #[test]
  fn option_delta_extension_matches_spec_scenario_s2() {
    let mut p = TestPacket::new();
    p.add_header(Type::Non, Code::EMPTY, 0).unwrap();
    p.add_option(269, &[]).unwrap();

    assert_eq!(&p.as_bytes()[4..], &[0xE0, 0x00, 0x00]);

    let mut parsed = TestPacket::parse(p.as_bytes()).unwrap();
    assert_eq!(parsed.option_start(), Some(269));
    assert_eq!(parsed.current_value(), Some(&[][..]));
  }

  #[test]
  fn add_option_before_header_is_out_of_order() {
    let mut p = TestPacket::new();
    assert_eq!(p.add_option(option::URI_PATH, b"x"), Err(BuildError::OutOfOrder));
  }

  #[test]
  fn add_tokens_after_an_option_is_out_of_order() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::GET, 1).unwrap();
    p.add_option(option::URI_PATH, b"x").unwrap();
    assert_eq!(p.add_tokens(1, &[0x01]), Err(BuildError::OutOfOrder));
  }

  #[test]
  fn decreasing_option_number_is_rejected() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::GET, 1).unwrap();
    p.add_option(option::URI_PATH, b"a").unwrap();
    assert_eq!(p.add_option(option::IF_MATCH, b"b"), Err(BuildError::BadOrder));
  }

  #[test]
  fn unrecognised_option_number_is_rejected() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::GET, 1).unwrap();
    assert_eq!(p.add_option(0, b"x"), Err(BuildError::BadOption));
    assert_eq!(p.add_option(2, b"x"), Err(BuildError::BadOption));
  }

  #[test]
  fn second_payload_is_rejected() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::CONTENT, 1).unwrap();
    p.add_payload(b"a").unwrap();
    assert_eq!(p.add_payload(b"b"), Err(BuildError::PayloadAlreadyPresent));
  }

  #[test]
  fn token_length_mismatch_is_rejected() {
    let mut p = TestPacket::new();
    p.add_header(Type::Con, Code::GET, 1).unwrap();
    assert_eq!(p.add_tokens(2, &[0x01]), Err(BuildError::BadToken));
    assert_eq!(p.add_tokens(9, &[0; 9]), Err(BuildError::BadToken));
  }

  #[test]
  fn capacity_exceeded_on_a_tiny_buffer() {
    let mut p = Packet::<4, 4>::new();
    assert_eq!(p.add_header(Type::Con, Code::GET, 1), Ok(()));
    assert_eq!(p.add_tokens(4, &[1, 2, 3, 4]), Err(BuildError::CapacityExceeded));
  }

  #[test]
  fn truncated_datagrams_fail_to_parse() {
    assert_eq!(TestPacket::parse(&[0x40, 0x01, 0x00]), Err(ParseError::Truncated));
  }

  #[test]
  fn bad_version_is_rejected() {
    let bytes = [0x80, 0x01, 0x00, 0x00];
    assert_eq!(TestPacket::parse(&bytes), Err(ParseError::BadVersion));
  }

  #[test]
  fn no_payload_marker_means_no_payload() {
    let mut p = TestPacket::new();
    p.add_header(Type::Ack, Code::EMPTY, 7).unwrap();
    let parsed = TestPacket::parse(p.as_bytes()).unwrap();
    assert_eq!(parsed.payload_off(), None);
    assert_eq!(parsed.payload(), &[] as &[u8]);
  }

  #[test]
  fn too_many_options_is_rejected_when_the_table_is_full() {
    let mut p = Packet::<128, 2>::new();
    p.add_header(Type::Con, Code::GET, 1).unwrap();
    p.add_option(1, &[]).unwrap();
    p.add_option(3, &[]).unwrap();
    assert_eq!(p.add_option(4, &[]), Err(BuildError::TooManyOptions));
  }
}
