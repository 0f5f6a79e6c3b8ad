//! # Type-3 Executor Options
//!
//! ```text
//! [type: u16 = 3]
//! repeated:
//!   [worker id: u8 = 1][option size: u16][option type: u8][option body]
//!
//! lzReceive (1): [gas: u128] [value: u128]?
//! lzRead    (5): [gas: u128] [calldata size: u32] [value: u128]?
//! ```
//!
//! All integers big-endian. `option size` counts the type byte and the body.

use crate::domain::{BridgeError, U256};

/// Options container type.
pub const TYPE_3: u16 = 3;
/// Executor worker id.
pub const EXECUTOR_WORKER_ID: u8 = 1;
/// `lzReceive` option type.
pub const OPTION_TYPE_LZRECEIVE: u8 = 1;
/// `lzRead` option type.
pub const OPTION_TYPE_LZREAD: u8 = 5;

/// One executor option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorOption {
    /// Gas and value for the destination `lzReceive` call.
    LzReceive {
        /// Execution gas.
        gas: u128,
        /// Native value delivered with the call.
        value: u128,
    },
    /// Gas, expected calldata size and value for a read.
    LzRead {
        /// Execution gas.
        gas: u128,
        /// Expected response calldata size.
        calldata_size: u32,
        /// Native value delivered with the call.
        value: u128,
    },
}

/// Aggregate of all options in one container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionBudget {
    /// Total gas across options.
    pub gas: u128,
    /// Total value across options.
    pub value: u128,
    /// Largest declared calldata size.
    pub calldata_size: u32,
}

/// Type-3 options builder.
#[derive(Clone, Debug, Default)]
pub struct OptionsBuilder {
    options: Vec<ExecutorOption>,
}

impl OptionsBuilder {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an `lzReceive` option.
    pub fn add_lz_receive(mut self, gas: u128, value: u128) -> Self {
        self.options.push(ExecutorOption::LzReceive { gas, value });
        self
    }

    /// Append an `lzRead` option.
    pub fn add_lz_read(mut self, gas: u128, calldata_size: u32, value: u128) -> Self {
        self.options.push(ExecutorOption::LzRead {
            gas,
            calldata_size,
            value,
        });
        self
    }

    /// Encode the container.
    pub fn build(&self) -> Vec<u8> {
        let mut out = TYPE_3.to_be_bytes().to_vec();
        for option in &self.options {
            let (option_type, body) = encode_option(option);
            // Body length is at most 36 bytes.
            let size = (body.len() + 1) as u16;
            out.push(EXECUTOR_WORKER_ID);
            out.extend_from_slice(&size.to_be_bytes());
            out.push(option_type);
            out.extend_from_slice(&body);
        }
        out
    }
}

fn encode_option(option: &ExecutorOption) -> (u8, Vec<u8>) {
    match *option {
        ExecutorOption::LzReceive { gas, value } => {
            let mut body = gas.to_be_bytes().to_vec();
            if value > 0 {
                body.extend_from_slice(&value.to_be_bytes());
            }
            (OPTION_TYPE_LZRECEIVE, body)
        }
        ExecutorOption::LzRead {
            gas,
            calldata_size,
            value,
        } => {
            let mut body = gas.to_be_bytes().to_vec();
            body.extend_from_slice(&calldata_size.to_be_bytes());
            if value > 0 {
                body.extend_from_slice(&value.to_be_bytes());
            }
            (OPTION_TYPE_LZREAD, body)
        }
    }
}

fn invalid(msg: impl Into<String>) -> BridgeError {
    BridgeError::InvalidOptions(msg.into())
}

fn read_u128(bytes: &[u8]) -> Result<u128, BridgeError> {
    let raw: [u8; 16] = bytes.try_into().map_err(|_| invalid("bad u128 field"))?;
    Ok(u128::from_be_bytes(raw))
}

fn read_u32(bytes: &[u8]) -> Result<u32, BridgeError> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| invalid("bad u32 field"))?;
    Ok(u32::from_be_bytes(raw))
}

fn decode_option(option_type: u8, body: &[u8]) -> Result<ExecutorOption, BridgeError> {
    match option_type {
        OPTION_TYPE_LZRECEIVE => match body.len() {
            16 => Ok(ExecutorOption::LzReceive {
                gas: read_u128(body)?,
                value: 0,
            }),
            32 => Ok(ExecutorOption::LzReceive {
                gas: read_u128(&body[..16])?,
                value: read_u128(&body[16..])?,
            }),
            n => Err(invalid(format!("lzReceive option of {n} bytes"))),
        },
        OPTION_TYPE_LZREAD => match body.len() {
            20 => Ok(ExecutorOption::LzRead {
                gas: read_u128(&body[..16])?,
                calldata_size: read_u32(&body[16..])?,
                value: 0,
            }),
            36 => Ok(ExecutorOption::LzRead {
                gas: read_u128(&body[..16])?,
                calldata_size: read_u32(&body[16..20])?,
                value: read_u128(&body[20..])?,
            }),
            n => Err(invalid(format!("lzRead option of {n} bytes"))),
        },
        other => Err(invalid(format!("unknown option type {other}"))),
    }
}

/// Decode a type-3 container.
pub fn parse_options(bytes: &[u8]) -> Result<Vec<ExecutorOption>, BridgeError> {
    if bytes.len() < 2 {
        return Err(invalid("missing options type"));
    }
    let container = u16::from_be_bytes([bytes[0], bytes[1]]);
    if container != TYPE_3 {
        return Err(invalid(format!("unsupported options type {container}")));
    }

    let mut options = Vec::new();
    let mut cursor = 2;
    while cursor < bytes.len() {
        let header = bytes
            .get(cursor..cursor + 4)
            .ok_or_else(|| invalid("truncated option header"))?;
        let worker_id = header[0];
        let size = u16::from_be_bytes([header[1], header[2]]) as usize;
        let option_type = header[3];

        if worker_id != EXECUTOR_WORKER_ID {
            return Err(invalid(format!("unknown worker id {worker_id}")));
        }
        if size == 0 {
            return Err(invalid("zero option size"));
        }

        let body_start = cursor + 4;
        let body_end = cursor + 3 + size;
        let body = bytes
            .get(body_start..body_end)
            .ok_or_else(|| invalid("truncated option body"))?;
        options.push(decode_option(option_type, body)?);
        cursor = body_end;
    }

    if options.is_empty() {
        return Err(invalid("no executor options"));
    }
    Ok(options)
}

/// Sum gas and value across options.
pub fn summarize(options: &[ExecutorOption]) -> ExecutionBudget {
    options.iter().fold(ExecutionBudget::default(), |mut acc, option| {
        match *option {
            ExecutorOption::LzReceive { gas, value } => {
                acc.gas = acc.gas.saturating_add(gas);
                acc.value = acc.value.saturating_add(value);
            }
            ExecutorOption::LzRead {
                gas,
                calldata_size,
                value,
            } => {
                acc.gas = acc.gas.saturating_add(gas);
                acc.value = acc.value.saturating_add(value);
                acc.calldata_size = acc.calldata_size.max(calldata_size);
            }
        }
        acc
    })
}

/// Narrow a native value to the option field width.
pub fn value_to_u128(value: U256) -> Result<u128, BridgeError> {
    if value > U256::from(u128::MAX) {
        return Err(invalid("value exceeds 128 bits"));
    }
    Ok(value.low_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz_receive_layout() {
        let bytes = OptionsBuilder::new().add_lz_receive(200_000, 0).build();
        // type(2) + worker(1) + size(2) + option type(1) + gas(16)
        assert_eq!(bytes.len(), 22);
        assert_eq!(&bytes[..2], &[0, 3]);
        assert_eq!(bytes[2], EXECUTOR_WORKER_ID);
        assert_eq!(u16::from_be_bytes([bytes[3], bytes[4]]), 17);
        assert_eq!(bytes[5], OPTION_TYPE_LZRECEIVE);
    }

    #[test]
    fn test_parse_built_options() {
        let bytes = OptionsBuilder::new()
            .add_lz_receive(100_000, 5)
            .add_lz_read(50_000, 64, 0)
            .build();
        let options = parse_options(&bytes).unwrap();
        assert_eq!(
            options,
            vec![
                ExecutorOption::LzReceive {
                    gas: 100_000,
                    value: 5
                },
                ExecutorOption::LzRead {
                    gas: 50_000,
                    calldata_size: 64,
                    value: 0
                },
            ]
        );

        let budget = summarize(&options);
        assert_eq!(budget.gas, 150_000);
        assert_eq!(budget.value, 5);
        assert_eq!(budget.calldata_size, 64);
    }

    #[test]
    fn test_malformed_options() {
        assert!(matches!(parse_options(&[]), Err(BridgeError::InvalidOptions(_))));
        assert!(parse_options(&[0, 1]).is_err());
        assert!(parse_options(&[0, 3]).is_err());

        let mut bytes = OptionsBuilder::new().add_lz_receive(1, 0).build();
        bytes.pop();
        assert!(parse_options(&bytes).is_err());

        let mut bytes = OptionsBuilder::new().add_lz_receive(1, 0).build();
        bytes[2] = 2;
        assert!(parse_options(&bytes).is_err());
    }

    #[test]
    fn test_value_width() {
        assert_eq!(value_to_u128(U256::from(7u64)).unwrap(), 7);
        assert!(value_to_u128(U256::MAX).is_err());
    }
}
