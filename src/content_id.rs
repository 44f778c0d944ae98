//! Content identifiers.

use cid::Cid;
use multibase::Base;
use std::fmt;
use std::str::FromStr;

/// A parsed content identifier (CIDv0 or CIDv1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentId(Cid);

impl ContentId {
    /// Raw multihash bytes of the content
    pub fn multihash_bytes(&self) -> Vec<u8> {
        self.0.hash().to_bytes()
    }

    /// Multihash in base58btc without a multibase prefix, the form IPNI uses in URL paths
    pub fn multihash_b58(&self) -> String {
        let encoded = multibase::encode(Base::Base58Btc, self.multihash_bytes());
        match encoded.strip_prefix(Base::Base58Btc.code()) {
            Some(stripped) => stripped.to_string(),
            None => encoded,
        }
    }
}

impl FromStr for ContentId {
    type Err = cid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Cid>().map(Self)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cidv1_multihash() {
        let cid: ContentId = "bafkreih25dih6ug3xtj73vswccw423b56ilrwmnos4cbwhrceudopdp5sq"
            .parse()
            .unwrap();
        assert_eq!(
            cid.multihash_b58(),
            "QmfE6Y4CkCxXXN8yW94r2JVA7ajQ9KayAKmd5mwjTsCfjZ"
        );
        assert_eq!(
            cid.to_string(),
            "bafkreih25dih6ug3xtj73vswccw423b56ilrwmnos4cbwhrceudopdp5sq"
        );
    }

    #[test]
    fn cidv0_and_cidv1_share_a_multihash() {
        let v0: ContentId = "QmbWqxBEKC3P8tqsKc98xmWNzrzDtRLMiMPL8wBuTGsMnR"
            .parse()
            .unwrap();
        let v1: ContentId = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
            .parse()
            .unwrap();

        assert_eq!(v0.multihash_bytes(), v1.multihash_bytes());
        assert_eq!(
            v1.multihash_b58(),
            "QmbWqxBEKC3P8tqsKc98xmWNzrzDtRLMiMPL8wBuTGsMnR"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-cid".parse::<ContentId>().is_err());
        assert!("".parse::<ContentId>().is_err());
        assert!("bafy...X".parse::<ContentId>().is_err());
    }
}
