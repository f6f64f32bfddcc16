//! Content-identifier codec: base-58 CIDv0 → fixed-width `0x` hex.
//!
//! A CIDv0 (`Qm…`) is a base-58 multihash: one byte of hash-function code
//! (`0x12`, sha2-256), one byte of digest length (`0x20`), then the 32-byte
//! digest. Contracts store only the digest, so the two prefix bytes are
//! dropped and the remainder is written as `bytes32`-style hex.

use crate::error::CidError;

/// Number of multihash prefix bytes (function code + length) dropped by [`encode_cid`].
pub const MULTIHASH_PREFIX_LEN: usize = 2;

/// Decode a base-58 CID (Bitcoin/IPFS alphabet) into raw bytes.
///
/// Leading `1`s decode to leading zero bytes.
pub fn decode_cid(cid: &str) -> Result<Vec<u8>, CidError> {
    bs58::decode(cid)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| CidError::InvalidBase58 {
            cid: cid.to_string(),
            reason: e.to_string(),
        })
}

/// Re-encode a CID as `0x` + lowercase hex of its bytes after the multihash prefix.
pub fn encode_cid(cid: &str) -> Result<String, CidError> {
    let bytes = decode_cid(cid)?;
    if bytes.len() < MULTIHASH_PREFIX_LEN {
        return Err(CidError::Truncated {
            cid: cid.to_string(),
            len: bytes.len(),
        });
    }
    Ok(format!("0x{}", hex::encode(&bytes[MULTIHASH_PREFIX_LEN..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn encodes_real_cid_v0() {
        assert_eq!(
            encode_cid(CID_V0).unwrap(),
            "0x9d6c2be50f706953479ab9df2ce3edca90b68053c00b3004b7f0accbe1e8eedf"
        );
    }

    #[test]
    fn full_decode_keeps_multihash_prefix() {
        let bytes = decode_cid(CID_V0).unwrap();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[..2], &[0x12, 0x20]);
    }

    #[test]
    fn encoded_length_is_decoded_length_minus_two() {
        for cid in [CID_V0, "QmTzQ1", "11", "zzzzzz", "1111abc"] {
            let decoded = decode_cid(cid).unwrap().len();
            let encoded = encode_cid(cid).unwrap();
            assert!(encoded.starts_with("0x"));
            assert_eq!((encoded.len() - 2) / 2, decoded - 2, "cid {cid}");
        }
    }

    #[test]
    fn short_cid() {
        assert_eq!(encode_cid("QmTzQ1").unwrap(), "0xcbea6a");
        // Two leading zero bytes and nothing else.
        assert_eq!(encode_cid("11").unwrap(), "0x");
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        for bad in ["Qm0abc", "QmOabc", "QmIabc", "Qmlabc", "Qm abc", "Qmé"] {
            assert!(
                matches!(encode_cid(bad), Err(CidError::InvalidBase58 { .. })),
                "expected decode error for {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_fewer_than_two_bytes() {
        assert_eq!(
            encode_cid("2"),
            Err(CidError::Truncated {
                cid: "2".into(),
                len: 1
            })
        );
        assert!(matches!(encode_cid(""), Err(CidError::Truncated { len: 0, .. })));
    }
}
