// Copyright (C) 2026 EVM Debug Service Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! ERC-20 balance-mapping-slot probe (C9).
//!
//! Standard ERC-20 tokens store balances in a `mapping(address => uint256)`
//! whose storage slot varies by implementation. This brute-forces the
//! slot by snapshot/mutate/call/revert over candidate slot numbers.

use alloy_primitives::{keccak256, Address, U256};
use debug_common::{error::Result, DebugError};

use crate::rpc::RpcClient;

/// Selector of `balanceOf(address)`.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Number of candidate mapping slots probed before giving up.
const MAX_SLOT: u32 = 100;

/// Forces `user`'s balance of `token` to `target_balance` (a raw `0x`
/// hex string, compared byte-for-byte against the `eth_call` result —
/// no numeric normalization, matching the probe's literal semantics)
/// by finding and overwriting the correct balance-mapping storage slot.
///
/// Returns the winning slot number.
pub async fn set_erc20_balance(
    rpc: &RpcClient<'_>,
    fork_id: &str,
    user: &str,
    token: &str,
    target_balance: &str,
) -> Result<u32> {
    let user_address: Address =
        user.parse().map_err(|_| DebugError::InvalidInput(format!("invalid user address: {user}")))?;
    let calldata = balance_of_calldata(user_address);

    for slot_number in 0..MAX_SLOT {
        let snapshot_id = rpc.snapshot(fork_id).await?;
        let balance_slot = balance_mapping_slot(user_address, slot_number);

        rpc.set_storage_at(fork_id, token, &balance_slot, target_balance).await?;
        let observed = rpc.send_call(fork_id, token, &calldata).await?;

        if observed == target_balance {
            return Ok(slot_number);
        }

        rpc.revert_state(fork_id, &snapshot_id).await?;
    }

    Err(DebugError::MappingSlotNotFound(token.to_string()))
}

/// `keccak256(pad32(user) || pad32(slot_number))`, hex-encoded with a
/// `0x` prefix.
fn balance_mapping_slot(user: Address, slot_number: u32) -> String {
    let mut preimage = [0u8; 64];
    preimage[0..32].copy_from_slice(user.into_word().as_slice());
    preimage[32..64].copy_from_slice(&U256::from(slot_number).to_be_bytes::<32>());
    format!("0x{}", hex::encode(keccak256(preimage)))
}

fn balance_of_calldata(user: Address) -> String {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(user.into_word().as_slice());
    format!("0x{}", hex::encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_mapping_slot_is_deterministic() {
        let user: Address = "0x000000000000000000000000000000000000aa".parse().unwrap();
        let slot_a = balance_mapping_slot(user, 0);
        let slot_b = balance_mapping_slot(user, 0);
        assert_eq!(slot_a, slot_b);

        let slot_other = balance_mapping_slot(user, 1);
        assert_ne!(slot_a, slot_other);
    }

    #[test]
    fn balance_of_calldata_carries_selector_and_padded_address() {
        let user: Address = "0x000000000000000000000000000000000000aa".parse().unwrap();
        let calldata = balance_of_calldata(user);
        assert!(calldata.starts_with("0x70a08231"));
        assert_eq!(calldata.len(), 2 + 8 + 64);
    }
}
