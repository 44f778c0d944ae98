//! Filecoin address parsing.
//!
//! Storage providers are identified by Filecoin addresses such as `f01000`. Parsing happens per
//! check, so a malformed address only fails the check that uses it.

use crate::error::AddressError;
use blake2::Blake2b;
use blake2::digest::Digest;
use blake2::digest::consts::U4;
use std::fmt;
use std::str::FromStr;

/// Length of the checksum appended to non-ID address payloads
const CHECKSUM_LEN: usize = 4;
/// blake2b with a 4 byte digest, the address checksum function
type Blake2b32 = Blake2b<U4>;
/// Length of a secp256k1 / actor address payload (blake2b-160)
const HASH_PAYLOAD_LEN: usize = 20;
/// Length of a BLS public key
const BLS_PAYLOAD_LEN: usize = 48;
/// Upper bound of a delegated sub-address
const MAX_SUBADDRESS_LEN: usize = 54;

/// Network an address belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    /// `f` prefix
    Mainnet,
    /// `t` prefix
    Testnet,
}

impl Network {
    fn prefix(self) -> char {
        match self {
            Network::Mainnet => 'f',
            Network::Testnet => 't',
        }
    }
}

/// Address protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Actor ID, e.g. `f01000`
    Id,
    /// secp256k1 public key hash
    Secp256k1,
    /// Actor address
    Actor,
    /// BLS public key
    Bls,
    /// Delegated (f4) address
    Delegated,
}

impl Protocol {
    fn from_char(c: char) -> Result<Self, AddressError> {
        match c {
            '0' => Ok(Protocol::Id),
            '1' => Ok(Protocol::Secp256k1),
            '2' => Ok(Protocol::Actor),
            '3' => Ok(Protocol::Bls),
            '4' => Ok(Protocol::Delegated),
            other => Err(AddressError::UnknownProtocol(other)),
        }
    }

    fn number(self) -> u8 {
        match self {
            Protocol::Id => 0,
            Protocol::Secp256k1 => 1,
            Protocol::Actor => 2,
            Protocol::Bls => 3,
            Protocol::Delegated => 4,
        }
    }
}

/// A well-formed Filecoin address
///
/// Prefix, protocol, payload encoding, length and checksum are validated here. Whether the
/// actor exists is up to the chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    protocol: Protocol,
    payload: String,
}

impl Address {
    /// Network of the address
    pub fn network(&self) -> Network {
        self.network
    }

    /// Protocol of the address
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Actor id, for ID addresses
    pub fn actor_id(&self) -> Option<u64> {
        match self.protocol {
            Protocol::Id => self.payload.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(net), Some(proto)) = (chars.next(), chars.next()) else {
            return Err(AddressError::TooShort(s.to_string()));
        };
        let payload = chars.as_str();
        if payload.is_empty() {
            return Err(AddressError::TooShort(s.to_string()));
        }

        let network = match net {
            'f' => Network::Mainnet,
            't' => Network::Testnet,
            other => return Err(AddressError::UnknownNetwork(other)),
        };
        let protocol = Protocol::from_char(proto)?;

        match protocol {
            Protocol::Id => {
                validate_id(payload)?;
            }
            Protocol::Secp256k1 | Protocol::Actor => {
                validate_hash_payload(protocol, payload, HASH_PAYLOAD_LEN + CHECKSUM_LEN)?
            }
            Protocol::Bls => {
                validate_hash_payload(protocol, payload, BLS_PAYLOAD_LEN + CHECKSUM_LEN)?
            }
            Protocol::Delegated => validate_delegated(payload)?,
        }

        Ok(Self {
            network,
            protocol,
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.network.prefix(),
            self.protocol.number(),
            self.payload
        )
    }
}

fn validate_id(payload: &str) -> Result<u64, AddressError> {
    if !payload.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidId(payload.to_string()));
    }
    payload
        .parse::<u64>()
        .map_err(|_| AddressError::InvalidId(payload.to_string()))
}

/// Check the trailing checksum of `decoded` against `header || payload`.
fn verify_checksum(header: &[u8], decoded: &[u8], original: &str) -> Result<(), AddressError> {
    let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    let mut hasher = Blake2b32::new();
    hasher.update(header);
    hasher.update(payload);
    if hasher.finalize().as_slice() != checksum {
        return Err(AddressError::ChecksumMismatch(original.to_string()));
    }
    Ok(())
}

/// Unsigned LEB128, the encoding of the delegated namespace in checksummed bytes
fn uvarint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn decode_base32(payload: &str) -> Result<Vec<u8>, AddressError> {
    // multibase 'b' is RFC 4648 lowercase base32 without padding, the Filecoin encoding
    multibase::decode(format!("b{payload}"))
        .map(|(_, bytes)| bytes)
        .map_err(|_| AddressError::InvalidEncoding(payload.to_string()))
}

fn validate_hash_payload(
    protocol: Protocol,
    payload: &str,
    expected: usize,
) -> Result<(), AddressError> {
    let decoded = decode_base32(payload)?;
    if decoded.len() != expected {
        return Err(AddressError::InvalidLength {
            protocol: protocol.number(),
            expected,
            actual: decoded.len(),
        });
    }
    verify_checksum(&[protocol.number()], &decoded, payload)
}

fn validate_delegated(payload: &str) -> Result<(), AddressError> {
    let Some((namespace, sub)) = payload.split_once('f') else {
        return Err(AddressError::InvalidEncoding(payload.to_string()));
    };
    let namespace = validate_id(namespace)?;

    let decoded = decode_base32(sub)?;
    if decoded.len() <= CHECKSUM_LEN || decoded.len() > MAX_SUBADDRESS_LEN + CHECKSUM_LEN {
        return Err(AddressError::InvalidLength {
            protocol: Protocol::Delegated.number(),
            expected: MAX_SUBADDRESS_LEN + CHECKSUM_LEN,
            actual: decoded.len(),
        });
    }

    let mut header = vec![Protocol::Delegated.number()];
    uvarint(namespace, &mut header);
    verify_checksum(&header, &decoded, payload)
}
