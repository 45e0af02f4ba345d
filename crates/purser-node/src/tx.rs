//! UTXO transaction assembly and signature hashing
//!
//! Produces version-1 pay-to-pubkey-hash spends. Bitcoin and Litecoin
//! sign with the original signature hash; Bitcoin Cash signs the
//! BIP143-style digest carrying the fork id flag, which keeps its
//! signatures invalid on the other chains.

use secp256k1::{All, Message, Secp256k1};
use sha2::{Digest, Sha256};

use purser_core::{Address, Error, PlannedOutput, Result, Unspent, UtxoIntent};
use purser_params::{ChainParams, Currency};

use crate::keys::{self, WifKey};

const TX_VERSION: u32 = 1;
const LOCKTIME: u32 = 0;
const SEQUENCE_FINAL: u32 = 0xffff_ffff;
const SIGHASH_ALL: u32 = 0x01;
/// SIGHASH_ALL with the Bitcoin Cash fork id bit set
const SIGHASH_ALL_FORKID: u32 = 0x41;

/// Sign every input of an intent and serialize the final transaction as
/// hex, ready for `sendrawtransaction`.
///
/// All inputs must be pay-to-pubkey-hash outputs controlled by `key`.
/// The network is taken from the key itself.
pub fn sign_transaction(
    secp: &Secp256k1<All>,
    intent: &UtxoIntent,
    key: &WifKey,
) -> Result<String> {
    if intent.inputs.is_empty() || intent.outputs.is_empty() {
        return Err(Error::Signing("Nothing to sign".to_string()));
    }
    let params = ChainParams::for_currency(intent.currency, key.network);
    let entries = output_entries(&params, &intent.outputs)?;
    let own_script = p2pkh_script(&keys::pubkey_hash(&key.public));
    let hashtype = if matches!(intent.currency, Currency::Bch) {
        SIGHASH_ALL_FORKID
    } else {
        SIGHASH_ALL
    };

    let mut script_sigs = Vec::with_capacity(intent.inputs.len());
    for (index, input) in intent.inputs.iter().enumerate() {
        // The node reports the locking script with each unspent; fall
        // back to the key's own script when it is absent.
        let script_code = if input.script_pubkey.is_empty() {
            own_script.clone()
        } else {
            hex::decode(&input.script_pubkey).map_err(|_| {
                Error::InvalidAddress(format!("Bad locking script on {}", input.txid))
            })?
        };
        let sighash = if hashtype == SIGHASH_ALL_FORKID {
            forkid_sighash(intent, index, &script_code, &entries)?
        } else {
            legacy_sighash(intent, index, &script_code, &entries)?
        };
        let message = Message::from_slice(&sighash)
            .map_err(|_| Error::Signing("Bad signature hash".to_string()))?;
        let signature = secp.sign_ecdsa(&message, &key.secret);
        let mut encoded = signature.serialize_der().to_vec();
        encoded.push(hashtype as u8);
        script_sigs.push(script_sig(&encoded, &key.public.serialize()));
    }

    let raw = serialize_transaction(intent, &script_sigs, &entries)?;
    Ok(hex::encode(raw))
}

/// One serialized output: value, script length, script
fn output_entries(params: &ChainParams, outputs: &[PlannedOutput]) -> Result<Vec<Vec<u8>>> {
    outputs
        .iter()
        .map(|output| {
            let script = output_script(params, &output.address)?;
            let mut entry = Vec::with_capacity(9 + script.len());
            entry.extend_from_slice(&value_bytes(output.amount)?);
            push_varint(&mut entry, script.len() as u64);
            entry.extend_from_slice(&script);
            Ok(entry)
        })
        .collect()
}

/// Locking script for a validated destination address
fn output_script(params: &ChainParams, address: &Address) -> Result<Vec<u8>> {
    let text = address.as_str();
    if let Some(hrp) = params.bech32_hrp {
        let shaped = text.len() > hrp.len()
            && text[..hrp.len()].eq_ignore_ascii_case(hrp)
            && text.as_bytes()[hrp.len()] == b'1';
        if shaped {
            if let Ok(script) = segwit_script(text) {
                return Ok(script);
            }
        }
    }
    base58_script(params, text)
}

fn segwit_script(text: &str) -> Result<Vec<u8>> {
    let (_, version, program) = bech32::segwit::decode(text)
        .map_err(|_| Error::InvalidAddress(format!("Not a witness address: {}", text)))?;
    if version.to_u8() != 0 {
        return Err(Error::InvalidAddress(format!(
            "Unsupported witness version in {}",
            text
        )));
    }
    let mut script = Vec::with_capacity(2 + program.len());
    script.push(0x00);
    script.push(program.len() as u8);
    script.extend_from_slice(&program);
    Ok(script)
}

fn base58_script(params: &ChainParams, text: &str) -> Result<Vec<u8>> {
    let payload = bs58::decode(text)
        .with_check(None)
        .into_vec()
        .map_err(|_| Error::InvalidAddress(format!("Undecodable address: {}", text)))?;
    if payload.len() != 21 {
        return Err(Error::InvalidAddress(format!(
            "Unexpected address payload in {}",
            text
        )));
    }
    let (version, hash) = (payload[0], &payload[1..]);
    if params.p2pkh_prefix == Some(version) {
        Ok(p2pkh_script(hash))
    } else if params.p2sh_prefix == Some(version) {
        Ok(p2sh_script(hash))
    } else {
        Err(Error::InvalidAddress(format!(
            "Address {} does not belong to {}",
            text, params.name
        )))
    }
}

fn p2pkh_script(hash: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[0x76, 0xa9, 0x14]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

fn p2sh_script(hash: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[0xa9, 0x14]);
    script.extend_from_slice(hash);
    script.push(0x87);
    script
}

fn script_sig(signature: &[u8], pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + signature.len() + pubkey.len());
    script.push(signature.len() as u8);
    script.extend_from_slice(signature);
    script.push(pubkey.len() as u8);
    script.extend_from_slice(pubkey);
    script
}

/// Original signature hash: the transaction with every script slot
/// empty except the signed input, which carries the spent script
fn legacy_sighash(
    intent: &UtxoIntent,
    index: usize,
    script_code: &[u8],
    entries: &[Vec<u8>],
) -> Result<[u8; 32]> {
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&TX_VERSION.to_le_bytes());
    push_varint(&mut preimage, intent.inputs.len() as u64);
    for (position, input) in intent.inputs.iter().enumerate() {
        push_outpoint(&mut preimage, input)?;
        if position == index {
            push_varint(&mut preimage, script_code.len() as u64);
            preimage.extend_from_slice(script_code);
        } else {
            push_varint(&mut preimage, 0);
        }
        preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    }
    push_varint(&mut preimage, entries.len() as u64);
    for entry in entries {
        preimage.extend_from_slice(entry);
    }
    preimage.extend_from_slice(&LOCKTIME.to_le_bytes());
    preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
    Ok(sha256d(&preimage))
}

/// BIP143-style signature hash with the fork id flag, committing to the
/// spent input's value
fn forkid_sighash(
    intent: &UtxoIntent,
    index: usize,
    script_code: &[u8],
    entries: &[Vec<u8>],
) -> Result<[u8; 32]> {
    let mut prevouts = Vec::with_capacity(intent.inputs.len() * 36);
    let mut sequences = Vec::with_capacity(intent.inputs.len() * 4);
    for input in &intent.inputs {
        push_outpoint(&mut prevouts, input)?;
        sequences.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for entry in entries {
        outputs.extend_from_slice(entry);
    }

    let signed = &intent.inputs[index];
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&TX_VERSION.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&prevouts));
    preimage.extend_from_slice(&sha256d(&sequences));
    push_outpoint(&mut preimage, signed)?;
    push_varint(&mut preimage, script_code.len() as u64);
    preimage.extend_from_slice(script_code);
    preimage.extend_from_slice(&value_bytes(signed.amount)?);
    preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&outputs));
    preimage.extend_from_slice(&LOCKTIME.to_le_bytes());
    preimage.extend_from_slice(&SIGHASH_ALL_FORKID.to_le_bytes());
    Ok(sha256d(&preimage))
}

fn serialize_transaction(
    intent: &UtxoIntent,
    script_sigs: &[Vec<u8>],
    entries: &[Vec<u8>],
) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&TX_VERSION.to_le_bytes());
    push_varint(&mut raw, intent.inputs.len() as u64);
    for (input, script_sig) in intent.inputs.iter().zip(script_sigs) {
        push_outpoint(&mut raw, input)?;
        push_varint(&mut raw, script_sig.len() as u64);
        raw.extend_from_slice(script_sig);
        raw.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    }
    push_varint(&mut raw, entries.len() as u64);
    for entry in entries {
        raw.extend_from_slice(entry);
    }
    raw.extend_from_slice(&LOCKTIME.to_le_bytes());
    Ok(raw)
}

/// Outpoint: funding txid in wire byte order, then the output index
fn push_outpoint(out: &mut Vec<u8>, input: &Unspent) -> Result<()> {
    let mut txid = hex::decode(&input.txid)
        .map_err(|_| Error::Signing(format!("Bad funding txid: {}", input.txid)))?;
    if txid.len() != 32 {
        return Err(Error::Signing(format!("Bad funding txid: {}", input.txid)));
    }
    txid.reverse();
    out.extend_from_slice(&txid);
    out.extend_from_slice(&input.vout.to_le_bytes());
    Ok(())
}

fn push_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn value_bytes(amount: u128) -> Result<[u8; 8]> {
    u64::try_from(amount)
        .map(|value| value.to_le_bytes())
        .map_err(|_| Error::AmountOverflow(format!("Output value out of range: {}", amount)))
}

fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use purser_params::NetworkType;
    use secp256k1::ecdsa::Signature;

    const KEY_ONE_WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

    fn base58_address(version: u8, hash: &[u8]) -> String {
        bs58::encode(hash).with_check_version(version).into_string()
    }

    fn test_intent(currency: Currency, destination: Address) -> UtxoIntent {
        let txid: String = "00112233445566778899aabbccddeeff".repeat(2);
        UtxoIntent {
            currency,
            inputs: vec![Unspent {
                txid,
                vout: 1,
                amount: 100_000,
                confirmations: 6,
                script_pubkey: hex::encode(p2pkh_script(
                    &hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
                )),
            }],
            outputs: vec![PlannedOutput {
                address: destination,
                amount: 99_000,
            }],
            fee: 1_000,
            change: 0,
        }
    }

    #[test]
    fn test_varint_boundaries() {
        let mut out = Vec::new();
        push_varint(&mut out, 0xfc);
        assert_eq!(out, vec![0xfc]);

        out.clear();
        push_varint(&mut out, 0xfd);
        assert_eq!(out, vec![0xfd, 0xfd, 0x00]);

        out.clear();
        push_varint(&mut out, 0x1_0000);
        assert_eq!(out, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_base58_scripts() {
        let params = ChainParams::bitcoin(NetworkType::Mainnet);
        let hash = [0xabu8; 20];

        let p2pkh = base58_script(&params, &base58_address(0x00, &hash)).unwrap();
        assert_eq!(p2pkh.len(), 25);
        assert_eq!(&p2pkh[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&p2pkh[3..23], &hash);
        assert_eq!(&p2pkh[23..], &[0x88, 0xac]);

        let p2sh = base58_script(&params, &base58_address(0x05, &hash)).unwrap();
        assert_eq!(p2sh.len(), 23);
        assert_eq!(p2sh[0], 0xa9);
        assert_eq!(p2sh[22], 0x87);
    }

    #[test]
    fn test_segwit_script_from_reference_address() {
        let script = segwit_script("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
        assert_eq!(
            hex::encode(script),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_foreign_version_byte_rejected() {
        let params = ChainParams::bitcoin(NetworkType::Mainnet);
        let err = base58_script(&params, &base58_address(0x30, &[0u8; 20])).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[test]
    fn test_signature_verifies_against_legacy_sighash() {
        let secp = Secp256k1::new();
        let key = keys::decode_wif(&secp, Currency::Btc, KEY_ONE_WIF).unwrap();
        let destination = Address::unchecked(Currency::Btc, &base58_address(0x00, &[0x11; 20]));
        let intent = test_intent(Currency::Btc, destination);

        let raw = hex::decode(sign_transaction(&secp, &intent, &key).unwrap()).unwrap();

        // version, input count, outpoint
        assert_eq!(&raw[..4], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(raw[4], 0x01);
        let mut expected_txid = hex::decode(&intent.inputs[0].txid).unwrap();
        expected_txid.reverse();
        assert_eq!(&raw[5..37], &expected_txid[..]);
        assert_eq!(&raw[37..41], &[0x01, 0x00, 0x00, 0x00]);

        // scriptSig: pushed DER signature with trailing hashtype, then
        // the pushed compressed public key
        let script_len = raw[41] as usize;
        let script = &raw[42..42 + script_len];
        let sig_len = script[0] as usize;
        let der = &script[1..sig_len];
        let hashtype = script[sig_len];
        assert_eq!(hashtype, 0x01);
        assert_eq!(script[sig_len + 1] as usize, 33);
        assert_eq!(&script[sig_len + 2..], &key.public.serialize()[..]);

        let params = ChainParams::bitcoin(NetworkType::Mainnet);
        let entries = output_entries(&params, &intent.outputs).unwrap();
        let script_code = hex::decode(&intent.inputs[0].script_pubkey).unwrap();
        let sighash = legacy_sighash(&intent, 0, &script_code, &entries).unwrap();
        let message = Message::from_slice(&sighash).unwrap();
        let signature = Signature::from_der(der).unwrap();
        assert!(secp.verify_ecdsa(&message, &signature, &key.public).is_ok());
    }

    #[test]
    fn test_fork_chain_signs_forkid_digest() {
        let secp = Secp256k1::new();
        let key = keys::decode_wif(&secp, Currency::Bch, KEY_ONE_WIF).unwrap();
        let destination = Address::unchecked(Currency::Bch, &base58_address(0x00, &[0x11; 20]));
        let intent = test_intent(Currency::Bch, destination);

        let raw = hex::decode(sign_transaction(&secp, &intent, &key).unwrap()).unwrap();

        let script_len = raw[41] as usize;
        let script = &raw[42..42 + script_len];
        let sig_len = script[0] as usize;
        let der = &script[1..sig_len];
        assert_eq!(script[sig_len], 0x41);

        let params = ChainParams::bitcoin_cash(NetworkType::Mainnet);
        let entries = output_entries(&params, &intent.outputs).unwrap();
        let script_code = hex::decode(&intent.inputs[0].script_pubkey).unwrap();
        let sighash = forkid_sighash(&intent, 0, &script_code, &entries).unwrap();
        let message = Message::from_slice(&sighash).unwrap();
        let signature = Signature::from_der(der).unwrap();
        assert!(secp.verify_ecdsa(&message, &signature, &key.public).is_ok());

        // The legacy digest must not verify; the fork id changes it.
        let legacy = legacy_sighash(&intent, 0, &script_code, &entries).unwrap();
        let legacy_message = Message::from_slice(&legacy).unwrap();
        assert!(secp
            .verify_ecdsa(&legacy_message, &signature, &key.public)
            .is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let secp = Secp256k1::new();
        let key = keys::decode_wif(&secp, Currency::Btc, KEY_ONE_WIF).unwrap();
        let destination = Address::unchecked(Currency::Btc, &base58_address(0x00, &[0x22; 20]));
        let intent = test_intent(Currency::Btc, destination);

        let first = sign_transaction(&secp, &intent, &key).unwrap();
        let second = sign_transaction(&secp, &intent, &key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_intent_rejected() {
        let secp = Secp256k1::new();
        let key = keys::decode_wif(&secp, Currency::Btc, KEY_ONE_WIF).unwrap();
        let intent = UtxoIntent {
            currency: Currency::Btc,
            inputs: vec![],
            outputs: vec![],
            fee: 0,
            change: 0,
        };
        assert!(sign_transaction(&secp, &intent, &key).is_err());
    }
}
