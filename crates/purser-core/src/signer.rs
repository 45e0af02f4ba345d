//! Signing collaborator interface

use purser_params::{Currency, NetworkType};
use zeroize::Zeroizing;

use crate::account::AccountIntent;
use crate::address::Address;
use crate::utxo::UtxoIntent;
use crate::Result;

/// Key generation, address derivation, and transaction signing.
///
/// Builders treat key material as an opaque string and never inspect it.
/// Implementations own the curve and digest math and must keep key
/// material out of logs and error messages.
pub trait Signer: Send + Sync {
    /// Generate a fresh keypair, returning the address and its private key
    fn create_keypair(
        &self,
        currency: Currency,
        network: NetworkType,
    ) -> Result<(Address, Zeroizing<String>)>;

    /// Derive the address controlled by existing private key material
    fn derive_address(
        &self,
        currency: Currency,
        network: NetworkType,
        private_key: &str,
    ) -> Result<Address>;

    /// Sign a UTXO intent into a broadcast-ready raw transaction, hex-encoded
    fn sign_utxo(&self, intent: &UtxoIntent, private_key: &str) -> Result<String>;

    /// Sign an account intent into a broadcast-ready raw transaction, hex-encoded
    fn sign_account(&self, intent: &AccountIntent, private_key: &str) -> Result<String>;
}
