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

//! ABI decoder (C8): pure function from `(abi_json, input_hex)` to a
//! resolved method signature and decoded `(name, type, value)` triples.

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::JsonAbi;
use debug_common::types::ArgumentTriple;
use itertools::Itertools;

/// Minimum length of `input_hex` (including the `0x` prefix) for a
/// 4-byte selector to even be present.
const MIN_CALLDATA_LEN: usize = 10;

/// Failure modes specific to decoding, distinct from [`debug_common::DebugError`]
/// because an unresolved call is non-fatal (callers fall back to
/// `function_signature: "Unknown"`, spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiDecodeError {
    /// `input_hex` is `"0x"` or otherwise too short to contain a selector.
    TooShort,
    /// No function in the ABI has a selector matching the input.
    UnknownSelector,
    /// The selector matched but argument decoding failed.
    UnpackFailure(String),
}

/// A resolved call: its canonical signature and decoded arguments.
#[derive(Debug, Clone)]
pub struct DecodedCall {
    /// Canonical function signature, e.g. `"transfer(address,uint256)"`.
    pub function_signature: String,
    /// Decoded arguments in declaration order.
    pub arguments: Vec<ArgumentTriple>,
}

/// Resolves `input_hex`'s selector against `abi_json` and unpacks its
/// argument tuple.
pub fn decode_call(abi_json: &str, input_hex: &str) -> Result<DecodedCall, AbiDecodeError> {
    if input_hex.len() < MIN_CALLDATA_LEN {
        return Err(AbiDecodeError::TooShort);
    }

    let body = input_hex.trim_start_matches("0x");
    let data = hex::decode(body).map_err(|_| AbiDecodeError::TooShort)?;
    if data.len() < 4 {
        return Err(AbiDecodeError::TooShort);
    }

    let abi: JsonAbi =
        serde_json::from_str(abi_json).map_err(|e| AbiDecodeError::UnpackFailure(format!("malformed ABI: {e}")))?;

    let selector = &data[0..4];
    let function = abi
        .functions()
        .find(|f| f.selector().as_slice() == selector)
        .ok_or(AbiDecodeError::UnknownSelector)?;

    let values = function
        .abi_decode_input(&data[4..])
        .map_err(|e| AbiDecodeError::UnpackFailure(e.to_string()))?;

    let arguments = function
        .inputs
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(index, (param, value))| ArgumentTriple {
            name: if param.name.is_empty() { format!("arg{index}") } else { param.name.clone() },
            r#type: param.ty.clone(),
            value: format_value(value),
        })
        .collect();

    Ok(DecodedCall { function_signature: function.signature(), arguments })
}

fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(a) => a.to_string(),
        DynSolValue::FixedBytes(bytes, size) => format!("0x{}", hex::encode(&bytes.as_slice()[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f.as_slice())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", items.iter().map(format_value).join(","))
        }
        DynSolValue::Tuple(items) => {
            format!("({})", items.iter().map(format_value).join(","))
        }
        DynSolValue::CustomStruct { tuple, .. } => {
            format!("({})", tuple.iter().map(format_value).join(","))
        }
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"balanceOf","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}
    ]"#;

    #[test]
    fn decode_call_resolves_transfer_and_its_arguments() {
        let input = "0xa9059cbb000000000000000000000000000000000000000000000000000000000000dead0000000000000000000000000000000000000000000000000de0b6b3a7640000";
        let decoded = decode_call(ERC20_ABI, input).unwrap();
        assert_eq!(decoded.function_signature, "transfer(address,uint256)");
        assert_eq!(decoded.arguments.len(), 2);
        assert_eq!(decoded.arguments[0].name, "to");
        assert_eq!(decoded.arguments[1].name, "amount");
        assert_eq!(decoded.arguments[1].value, "1000000000000000000");
    }

    #[test]
    fn decode_call_rejects_unknown_selector() {
        let input = "0xdeadbeef00000000000000000000000000000000000000000000000000000000000000";
        assert_eq!(decode_call(ERC20_ABI, input), Err(AbiDecodeError::UnknownSelector));
    }

    #[test]
    fn decode_call_rejects_short_input() {
        assert_eq!(decode_call(ERC20_ABI, "0x"), Err(AbiDecodeError::TooShort));
        assert_eq!(decode_call(ERC20_ABI, "0xa9"), Err(AbiDecodeError::TooShort));
    }
}
