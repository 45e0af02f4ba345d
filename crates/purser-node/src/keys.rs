//! Key material and address derivation
//!
//! Single-key wallets only: UTXO chains get compressed-key
//! pay-to-pubkey-hash addresses with WIF-encoded secrets, account chains
//! get Keccak-derived addresses in EIP-55 casing with hex-encoded
//! secrets. Key material never appears in errors or logs.

use ripemd::Ripemd160;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use zeroize::Zeroizing;

use purser_core::{Error, Result};
use purser_params::{ChainParams, Currency, NetworkType};

/// WIF compressed-key marker byte
const COMPRESSED_FLAG: u8 = 0x01;

/// A decoded UTXO private key.
///
/// The network is inferred from the WIF version byte, so a key can only
/// ever spend on the network it was minted for.
pub struct WifKey {
    /// Signing key
    pub secret: SecretKey,
    /// Derived public key
    pub public: PublicKey,
    /// Network the WIF version byte belongs to
    pub network: NetworkType,
}

/// Generate a fresh random keypair
pub fn generate_keypair(secp: &Secp256k1<All>) -> (SecretKey, PublicKey) {
    secp.generate_keypair(&mut rand::thread_rng())
}

/// Encode a secret as compressed-key WIF for the given chain
pub fn encode_wif(params: &ChainParams, secret: &SecretKey) -> Result<Zeroizing<String>> {
    let prefix = params.wif_prefix.ok_or_else(|| {
        Error::Configuration(format!("{} has no private key encoding", params.name))
    })?;
    let mut payload = Zeroizing::new(Vec::with_capacity(33));
    payload.extend_from_slice(&secret.secret_bytes());
    payload.push(COMPRESSED_FLAG);
    Ok(Zeroizing::new(
        bs58::encode(payload.as_slice())
            .with_check_version(prefix)
            .into_string(),
    ))
}

/// Decode a WIF string, inferring the network from its version byte.
///
/// Keys without the compressed-key marker are accepted but still derive
/// compressed-key addresses; every key this service mints is compressed.
pub fn decode_wif(secp: &Secp256k1<All>, currency: Currency, wif: &str) -> Result<WifKey> {
    let payload = Zeroizing::new(
        bs58::decode(wif.trim())
            .with_check(None)
            .into_vec()
            .map_err(|_| Error::Signing("Malformed private key".to_string()))?,
    );
    let (version, body) = payload
        .split_first()
        .ok_or_else(|| Error::Signing("Malformed private key".to_string()))?;
    let network = network_for_wif(currency, *version)
        .ok_or_else(|| Error::Signing("Private key does not match a known network".to_string()))?;
    let secret_bytes = match body.len() {
        33 if body[32] == COMPRESSED_FLAG => &body[..32],
        32 => body,
        _ => return Err(Error::Signing("Unexpected private key length".to_string())),
    };
    let secret = SecretKey::from_slice(secret_bytes)
        .map_err(|_| Error::Signing("Invalid private key".to_string()))?;
    let public = PublicKey::from_secret_key(secp, &secret);
    Ok(WifKey {
        secret,
        public,
        network,
    })
}

fn network_for_wif(currency: Currency, version: u8) -> Option<NetworkType> {
    for network in [NetworkType::Mainnet, NetworkType::Testnet] {
        if ChainParams::for_currency(currency, network).wif_prefix == Some(version) {
            return Some(network);
        }
    }
    None
}

/// hash160 of the compressed public key
pub fn pubkey_hash(public: &PublicKey) -> [u8; 20] {
    let sha = Sha256::digest(public.serialize());
    Ripemd160::digest(sha).into()
}

/// Base58Check pay-to-pubkey-hash address for a public key
pub fn p2pkh_address(params: &ChainParams, public: &PublicKey) -> Result<String> {
    let prefix = params.p2pkh_prefix.ok_or_else(|| {
        Error::Configuration(format!(
            "{} has no pay-to-pubkey-hash address form",
            params.name
        ))
    })?;
    Ok(bs58::encode(pubkey_hash(public))
        .with_check_version(prefix)
        .into_string())
}

/// Encode an account-chain secret as 0x-prefixed hex
pub fn encode_account_secret(secret: &SecretKey) -> Zeroizing<String> {
    Zeroizing::new(format!("0x{}", hex::encode(secret.secret_bytes())))
}

/// Decode a 0x-prefixed (or bare) hex account-chain secret
pub fn decode_account_secret(
    secp: &Secp256k1<All>,
    private_key: &str,
) -> Result<(SecretKey, PublicKey)> {
    let digits = private_key.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    let bytes = Zeroizing::new(
        hex::decode(digits).map_err(|_| Error::Signing("Malformed private key".to_string()))?,
    );
    let secret = SecretKey::from_slice(&bytes)
        .map_err(|_| Error::Signing("Invalid private key".to_string()))?;
    let public = PublicKey::from_secret_key(secp, &secret);
    Ok((secret, public))
}

/// Account address for a public key, in EIP-55 checksum casing
pub fn account_address(public: &PublicKey) -> String {
    let uncompressed = public.serialize_uncompressed();
    // Keccak of the raw 64-byte point, skipping the 0x04 marker.
    let digest = Keccak256::digest(&uncompressed[1..]);
    to_eip55(&digest[12..])
}

/// Apply EIP-55 checksum casing to a 20-byte address
fn to_eip55(bytes: &[u8]) -> String {
    let lower = hex::encode(bytes);
    let digest = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
