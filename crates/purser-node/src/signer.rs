//! Local signing
//!
//! [`LocalSigner`] implements the core signing interface with in-process
//! key material: WIF secrets for UTXO chains, 0x-prefixed hex secrets for
//! account chains. Every derived address is run back through the address
//! validator before it is handed out.

use secp256k1::{All, Message, Secp256k1};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use purser_core::{
    AccountIntent, Address, AddressValidator, Error, Result, Signer, UtxoIntent,
};
use purser_params::{ChainParams, Currency, NetworkType};

use crate::{keys, rlp, tx};

/// EIP-155 recovery id base: `v = chain_id * 2 + 35 + recovery`
const EIP155_V_BASE: u64 = 35;

/// Signer holding nothing but a curve context
pub struct LocalSigner {
    secp: Secp256k1<All>,
}

impl LocalSigner {
    /// Create a signer
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for LocalSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for LocalSigner {
    fn create_keypair(
        &self,
        currency: Currency,
        network: NetworkType,
    ) -> Result<(Address, Zeroizing<String>)> {
        let (secret, public) = keys::generate_keypair(&self.secp);
        let (encoded, private_key) = if currency.is_utxo() {
            let params = ChainParams::for_currency(currency, network);
            (
                keys::p2pkh_address(&params, &public)?,
                keys::encode_wif(&params, &secret)?,
            )
        } else {
            (
                keys::account_address(&public),
                keys::encode_account_secret(&secret),
            )
        };
        let address = AddressValidator::new(network).validate(currency, &encoded)?;
        Ok((address, private_key))
    }

    fn derive_address(
        &self,
        currency: Currency,
        network: NetworkType,
        private_key: &str,
    ) -> Result<Address> {
        let encoded = if currency.is_utxo() {
            let key = keys::decode_wif(&self.secp, currency, private_key)?;
            if key.network != network {
                return Err(Error::Signing(
                    "Private key does not match the configured network".to_string(),
                ));
            }
            keys::p2pkh_address(&ChainParams::for_currency(currency, network), &key.public)?
        } else {
            let (_, public) = keys::decode_account_secret(&self.secp, private_key)?;
            keys::account_address(&public)
        };
        AddressValidator::new(network).validate(currency, &encoded)
    }

    fn sign_utxo(&self, intent: &UtxoIntent, private_key: &str) -> Result<String> {
        let key = keys::decode_wif(&self.secp, intent.currency, private_key)?;
        tx::sign_transaction(&self.secp, intent, &key)
    }

    fn sign_account(&self, intent: &AccountIntent, private_key: &str) -> Result<String> {
        let (secret, _) = keys::decode_account_secret(&self.secp, private_key)?;
        let to = decode_h160(intent.to.as_str())?;
        let data = match &intent.data {
            Some(data) => hex::decode(data.trim_start_matches("0x"))
                .map_err(|_| Error::Signing("Bad call data".to_string()))?,
            None => Vec::new(),
        };

        // EIP-155: the signed digest covers the chain id in the ninth
        // slot, with empty r and s.
        let mut fields = Vec::new();
        rlp::append_uint(&mut fields, u128::from(intent.nonce));
        rlp::append_uint(&mut fields, intent.gas_price);
        rlp::append_uint(&mut fields, u128::from(intent.gas_limit));
        rlp::append_bytes(&mut fields, &to);
        rlp::append_uint(&mut fields, intent.value);
        rlp::append_bytes(&mut fields, &data);
        rlp::append_uint(&mut fields, u128::from(intent.chain_id));
        rlp::append_uint(&mut fields, 0);
        rlp::append_uint(&mut fields, 0);

        let digest = Keccak256::digest(rlp::wrap_list(&fields));
        let message = Message::from_slice(&digest)
            .map_err(|_| Error::Signing("Bad signing digest".to_string()))?;
        let signature = self.secp.sign_ecdsa_recoverable(&message, &secret);
        let (recovery, compact) = signature.serialize_compact();
        let v = intent.chain_id * 2 + EIP155_V_BASE + recovery.to_i32() as u64;

        let mut signed = Vec::new();
        rlp::append_uint(&mut signed, u128::from(intent.nonce));
        rlp::append_uint(&mut signed, intent.gas_price);
        rlp::append_uint(&mut signed, u128::from(intent.gas_limit));
        rlp::append_bytes(&mut signed, &to);
        rlp::append_uint(&mut signed, intent.value);
        rlp::append_bytes(&mut signed, &data);
        rlp::append_uint(&mut signed, u128::from(v));
        rlp::append_bytes(&mut signed, rlp::strip_leading_zeros(&compact[..32]));
        rlp::append_bytes(&mut signed, rlp::strip_leading_zeros(&compact[32..]));

        Ok(format!("0x{}", hex::encode(rlp::wrap_list(&signed))))
    }
}

fn decode_h160(address: &str) -> Result<[u8; 20]> {
    let digits = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(digits)
        .map_err(|_| Error::InvalidAddress(format!("Bad account address: {}", address)))?;
    bytes
        .try_into()
        .map_err(|_| Error::InvalidAddress(format!("Bad account address: {}", address)))
}
