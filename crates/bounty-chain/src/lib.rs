//! Transaction signing, submission and confirmation for funded bounties.
//!
//! [`pipeline::TransactionPipeline`] drives one marketplace-prepared
//! transaction from signing to a resolved outcome over any
//! [`network::BountyNetwork`]; [`solana_rpc::SolanaRpcNetwork`] is the
//! JSON-RPC implementation used in production.

pub mod network;
pub mod pipeline;
pub mod solana_rpc;
pub mod solana_wire;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wallet;
