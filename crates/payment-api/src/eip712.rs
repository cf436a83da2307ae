//! EIP-712 signing and recovery for payment headers.
//!
//! Clients authenticate a [`PaymentHeader`] by signing its typed-data hash;
//! the RPC layer recovers the signer and hands the meterer an account it can
//! trust. The domain is:
//!
//! - Name: "PrismPayments"
//! - Version: "1"
//! - ChainId and verifying contract: deployment parameters
//!
//! The header type is:
//!
//! ```text
//! PaymentPermit(address account,bytes quorumNumbers,uint32 dataLength,uint32 binIndex,uint64 cumulativePayment)
//! ```
//!
//! # Signing a header
//!
//! ```ignore
//! use alloy_signer::SignerSync;
//!
//! let hash = header.signing_hash(chain_id, verifying_contract);
//! let sig = signer.sign_hash_sync(&hash)?;
//! let signed = SignedPaymentHeader::from_signature(header, sig);
//! ```

use alloy_primitives::{Address, Signature, B256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{PaymentError, PaymentHeader, PaymentResult};

sol! {
    /// Typed-data layout of a payment header.
    struct PaymentPermit {
        address account;
        bytes quorumNumbers;
        uint32 dataLength;
        uint32 binIndex;
        uint64 cumulativePayment;
    }
}

/// EIP-712 domain name for payment header signing.
pub const DOMAIN_NAME: &str = "PrismPayments";

/// EIP-712 domain version for payment header signing.
pub const DOMAIN_VERSION: &str = "1";

/// Build the EIP-712 domain for header signing.
///
/// The chain id and verifying contract are deployment parameters rather than
/// constants; callers obtain them from node configuration.
pub fn signing_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

impl From<&PaymentHeader> for PaymentPermit {
    fn from(header: &PaymentHeader) -> Self {
        Self {
            account: header.account,
            quorumNumbers: header.quorum_numbers.clone().into(),
            dataLength: header.data_length,
            binIndex: header.bin_index,
            cumulativePayment: header.cumulative_payment,
        }
    }
}

/// Extension trait for [`PaymentHeader`] providing EIP-712 signing support.
pub trait PaymentHeaderExt {
    /// Compute the EIP-712 signing hash under the given domain parameters.
    fn signing_hash(&self, chain_id: u64, verifying_contract: Address) -> B256;
}

impl PaymentHeaderExt for PaymentHeader {
    fn signing_hash(&self, chain_id: u64, verifying_contract: Address) -> B256 {
        PaymentPermit::from(self).eip712_signing_hash(&signing_domain(chain_id, verifying_contract))
    }
}

/// A payment header together with its authentication signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPaymentHeader {
    /// The unsigned header data.
    #[serde(flatten)]
    pub header: PaymentHeader,
    /// ECDSA signature (65 bytes: r[32] + s[32] + v[1]).
    pub signature: Bytes,
}

impl SignedPaymentHeader {
    /// Create a signed header from raw signature bytes.
    pub fn new(header: PaymentHeader, signature: Bytes) -> Self {
        Self { header, signature }
    }

    /// Create a signed header from a header and signature.
    pub fn from_signature(header: PaymentHeader, sig: Signature) -> Self {
        Self {
            header,
            signature: Bytes::copy_from_slice(&sig.as_bytes()),
        }
    }

    /// Parse the signature bytes.
    fn parse_signature(&self) -> PaymentResult<Signature> {
        if self.signature.len() != 65 {
            return Err(PaymentError::InvalidSignature(format!(
                "invalid signature length: expected 65, got {}",
                self.signature.len()
            )));
        }

        Signature::try_from(self.signature.as_ref())
            .map_err(|e| PaymentError::InvalidSignature(format!("malformed signature: {e}")))
    }

    /// Recover the signer address from the signature.
    pub fn recover_signer(
        &self,
        chain_id: u64,
        verifying_contract: Address,
    ) -> PaymentResult<Address> {
        let sig = self.parse_signature()?;
        let hash = self.header.signing_hash(chain_id, verifying_contract);

        sig.recover_address_from_prehash(&hash)
            .map_err(|e| PaymentError::InvalidSignature(format!("recovery failed: {e}")))
    }

    /// Verify that the header was signed by the account it names.
    pub fn verify(&self, chain_id: u64, verifying_contract: Address) -> PaymentResult<()> {
        let signer = self.recover_signer(chain_id, verifying_contract)?;
        if signer != self.header.account {
            return Err(PaymentError::InvalidSignature(format!(
                "recovered {signer}, expected {}",
                self.header.account
            )));
        }
        Ok(())
    }
}
