//! Builds explicit-session [`Permission`]s from declarative contract rules.
//!
//! A rule names a function parameter, its Solidity type, a comparison and a
//! value. The builder resolves the parameter against the function's ABI
//! signature and turns it into a [`ParameterRule`] over the parameter's
//! calldata word:
//!
//! - the selector is always checked first (offset `0`, 4-byte mask);
//! - parameter `i` lives at offset `4 + 32 * i`;
//! - a `string` or `bytes` parameter can only be pinned with `EQUAL`, through
//!   its offset word and the length and content words of its tail.
//!
//! ```
//! use alloy_primitives::{address, U256};
//! use seqkit_eip155::permission::{ContractFunctionPermission, ParameterRuleInput, create_contract_permission};
//! use seqkit_types::session::ParameterOperation;
//!
//! let permission = create_contract_permission(&ContractFunctionPermission {
//!     address: Some(address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359")),
//!     function_signature: Some("function transfer(address to, uint256 value)".into()),
//!     rules: vec![ParameterRuleInput::new(
//!         "value",
//!         "uint256",
//!         ParameterOperation::LessThanOrEqual,
//!         U256::from(1_000_000u64),
//!     )],
//!     only_once: false,
//! })
//! .unwrap();
//! assert_eq!(permission.rules.len(), 2);
//! ```

mod encode;

pub use encode::*;

use encode::word;

use alloy_json_abi::Function;
use alloy_primitives::{Address, B256, U256};
use serde::Deserialize;
use seqkit_types::session::{ParameterOperation, ParameterRule, Permission};

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Why a permission could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("Contract address is required")]
    MissingAddress,
    #[error("Function #{index} on contract {address} has no function signature")]
    MissingFunctionSignature { address: Address, index: usize },
    #[error("Rules given without a function signature on contract {0}")]
    RulesWithoutFunction(Address),
    #[error("Invalid function signature '{signature}': {reason}")]
    InvalidFunctionSignature { signature: String, reason: String },
    #[error("Unsupported parameter type '{0}'")]
    UnsupportedType(String),
    #[error("Parameter '{param}' not found in '{signature}'")]
    UnknownParam { param: String, signature: String },
    #[error("Parameter '{param}' matches more than one {ty} input of '{signature}'")]
    AmbiguousParam {
        param: String,
        ty: String,
        signature: String,
    },
    #[error("Rule on parameter '{param}' of type {ty} cannot be enforced: {reason}")]
    UnsupportedRule {
        param: String,
        ty: String,
        reason: String,
    },
    #[error("Parameter '{param}' is declared as {declared} but the function takes {actual}")]
    ParamTypeMismatch {
        param: String,
        declared: String,
        actual: String,
    },
    #[error("Invalid value for parameter '{param}' of type {ty}: {reason}")]
    InvalidValue {
        param: String,
        ty: String,
        reason: String,
    },
}

/// One declarative parameter rule: `{param, type, condition, value, cumulative}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRuleInput {
    /// Parameter name, or its zero-based position.
    pub param: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub condition: ParameterOperation,
    pub value: RuleValue,
    #[serde(default)]
    pub cumulative: bool,
}

impl ParameterRuleInput {
    pub fn new(
        param: impl Into<String>,
        ty: impl Into<String>,
        condition: ParameterOperation,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self {
            param: param.into(),
            ty: ty.into(),
            condition,
            value: value.into(),
            cumulative: false,
        }
    }

    pub fn cumulative(mut self) -> Self {
        self.cumulative = true;
        self
    }
}

/// A single function of a single contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFunctionPermission {
    pub address: Option<Address>,
    #[serde(default)]
    pub function_signature: Option<String>,
    #[serde(default)]
    pub rules: Vec<ParameterRuleInput>,
    #[serde(default)]
    pub only_once: bool,
}

/// One function entry of a [`ContractPermissions`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPermission {
    #[serde(default)]
    pub function_signature: Option<String>,
    #[serde(default)]
    pub rules: Vec<ParameterRuleInput>,
    #[serde(default)]
    pub only_once: bool,
}

/// A contract and, optionally, the functions allowed on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPermissions {
    pub address: Option<Address>,
    #[serde(default)]
    pub functions: Vec<FunctionPermission>,
}

/// Builds the permission for one contract function.
///
/// Without a function signature (and without rules) the contract is allowed
/// as a whole.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(address = ?input.address)))]
pub fn create_contract_permission(
    input: &ContractFunctionPermission,
) -> Result<Permission, PermissionError> {
    let address = input.address.ok_or(PermissionError::MissingAddress)?;
    match &input.function_signature {
        Some(signature) => function_permission(address, signature, &input.rules, input.only_once),
        None if input.rules.is_empty() => Ok(Permission::allow_all(address)),
        None => Err(PermissionError::RulesWithoutFunction(address)),
    }
}

/// Builds permissions for a list of contracts.
///
/// A contract without functions yields one allow-all permission; a contract
/// with `N` functions yields `N` sibling permissions, in order.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(contracts = contracts.len())))]
pub fn create_contract_permissions(
    contracts: &[ContractPermissions],
) -> Result<Vec<Permission>, PermissionError> {
    let mut permissions = Vec::new();
    for contract in contracts {
        let address = contract.address.ok_or(PermissionError::MissingAddress)?;
        if contract.functions.is_empty() {
            permissions.push(Permission::allow_all(address));
            continue;
        }
        for (index, function) in contract.functions.iter().enumerate() {
            let signature = function
                .function_signature
                .as_deref()
                .ok_or(PermissionError::MissingFunctionSignature { address, index })?;
            permissions.push(function_permission(
                address,
                signature,
                &function.rules,
                function.only_once,
            )?);
        }
    }
    Ok(permissions)
}

fn parse_function(signature: &str) -> Result<Function, PermissionError> {
    let trimmed = signature.trim();
    let trimmed = trimmed.strip_prefix("function ").unwrap_or(trimmed);
    Function::parse(trimmed).map_err(|e| PermissionError::InvalidFunctionSignature {
        signature: signature.to_owned(),
        reason: e.to_string(),
    })
}

fn selector_rule(function: &Function, only_once: bool) -> ParameterRule {
    let mut value = B256::ZERO;
    value[..4].copy_from_slice(function.selector().as_slice());
    let mut mask = B256::ZERO;
    mask[..4].fill(0xff);
    ParameterRule {
        cumulative: only_once,
        operation: ParameterOperation::Equal,
        value,
        offset: U256::ZERO,
        mask,
    }
}

/// Position of `param` among the function inputs: by name, then by index.
///
/// Only a signature with unnamed inputs, such as `transfer(address,uint256)`,
/// falls back to the declared type, and then only when exactly one input has it.
fn resolve_param(
    function: &Function,
    param: &str,
    ty: SolParamType,
) -> Result<usize, PermissionError> {
    let inputs = &function.inputs;
    let unknown = || PermissionError::UnknownParam {
        param: param.to_owned(),
        signature: function.signature(),
    };
    if let Some(index) = inputs
        .iter()
        .position(|input| !input.name.is_empty() && input.name == param)
    {
        return Ok(index);
    }
    if let Ok(index) = param.parse::<usize>() {
        return if index < inputs.len() {
            Ok(index)
        } else {
            Err(unknown())
        };
    }
    if inputs.iter().any(|input| !input.name.is_empty()) {
        return Err(unknown());
    }
    let mut of_type = inputs
        .iter()
        .enumerate()
        .filter(|(_, input)| input.ty.parse::<SolParamType>() == Ok(ty))
        .map(|(index, _)| index);
    match (of_type.next(), of_type.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(PermissionError::AmbiguousParam {
            param: param.to_owned(),
            ty: ty.to_string(),
            signature: function.signature(),
        }),
        (None, _) => Err(unknown()),
    }
}

/// Rules pinning a `string` or `bytes` argument to one value.
///
/// The head word must point at the first tail slot, which then holds the
/// length followed by the contents. That slot is only known when every input
/// takes a single head word and no dynamic input comes earlier.
fn dynamic_rules(
    function: &Function,
    index: usize,
    rule: &ParameterRuleInput,
    ty: SolParamType,
) -> Result<Vec<ParameterRule>, PermissionError> {
    let unsupported = |reason: &str| PermissionError::UnsupportedRule {
        param: rule.param.clone(),
        ty: ty.to_string(),
        reason: reason.to_owned(),
    };
    if rule.condition != ParameterOperation::Equal {
        return Err(unsupported("only EQUAL can be checked on a dynamic value"));
    }
    if rule.cumulative {
        return Err(unsupported("a dynamic value cannot be cumulative"));
    }
    let head = function
        .inputs
        .iter()
        .map(|input| input.ty.parse::<SolParamType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| unsupported("the function takes a non-elementary input"))?;
    if head[..index].iter().any(|earlier| !earlier.is_static()) {
        return Err(unsupported("an earlier dynamic input moves its contents"));
    }
    let tail = 32 * head.len();
    let words = rule
        .value
        .encode_tail(ty)
        .map_err(|reason| PermissionError::InvalidValue {
            param: rule.param.clone(),
            ty: ty.to_string(),
            reason,
        })?;
    let pointer = ParameterRule {
        cumulative: false,
        operation: ParameterOperation::Equal,
        value: word(U256::from(tail)),
        offset: U256::from(4 + 32 * index),
        mask: B256::repeat_byte(0xff),
    };
    let contents = words
        .into_iter()
        .enumerate()
        .map(|(slot, encoded)| ParameterRule {
            cumulative: false,
            operation: ParameterOperation::Equal,
            value: encoded.value,
            offset: U256::from(4 + tail + 32 * slot),
            mask: encoded.mask,
        });
    Ok(std::iter::once(pointer).chain(contents).collect())
}

fn function_permission(
    target: Address,
    signature: &str,
    rules: &[ParameterRuleInput],
    only_once: bool,
) -> Result<Permission, PermissionError> {
    let function = parse_function(signature)?;
    let mut built = Vec::with_capacity(rules.len() + 1);
    built.push(selector_rule(&function, only_once));
    for rule in rules {
        let ty: SolParamType = rule
            .ty
            .parse()
            .map_err(|_| PermissionError::UnsupportedType(rule.ty.clone()))?;
        let index = resolve_param(&function, &rule.param, ty)?;
        let actual = &function.inputs[index].ty;
        if actual.parse::<SolParamType>() != Ok(ty) {
            return Err(PermissionError::ParamTypeMismatch {
                param: rule.param.clone(),
                declared: ty.to_string(),
                actual: actual.clone(),
            });
        }
        if !ty.is_static() {
            built.extend(dynamic_rules(&function, index, rule, ty)?);
            continue;
        }
        let encoded = rule
            .value
            .encode(ty)
            .map_err(|reason| PermissionError::InvalidValue {
                param: rule.param.clone(),
                ty: ty.to_string(),
                reason,
            })?;
        built.push(ParameterRule {
            cumulative: rule.cumulative,
            operation: rule.condition,
            value: encoded.value,
            offset: U256::from(4 + 32 * index),
            mask: encoded.mask,
        });
    }
    Ok(Permission {
        target,
        rules: built,
    })
}
