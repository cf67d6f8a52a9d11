//! Enumeration codec: declared symbol strings to generated variants.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::registry::{EnumVariant, TypeToken};
use crate::model::typed::TypedValue;
use crate::model::value::Value;
use crate::value::ValueCodec;

/// Bidirectional symbol/variant map for one generated enumeration, built
/// once from the descriptor's variant list.
pub struct EnumCodec {
    type_token: TypeToken,
    by_symbol: HashMap<Arc<str>, Arc<str>>,
    by_variant: HashMap<Arc<str>, Arc<str>>,
    symbols: Vec<Arc<str>>,
}

impl EnumCodec {
    pub fn new(type_token: TypeToken, variants: Vec<EnumVariant>) -> Self {
        let mut by_symbol = HashMap::with_capacity(variants.len());
        let mut by_variant = HashMap::with_capacity(variants.len());
        let mut symbols = Vec::with_capacity(variants.len());
        for variant in variants {
            symbols.push(variant.symbol.clone());
            by_symbol.insert(variant.symbol.clone(), variant.name.clone());
            by_variant.insert(variant.name, variant.symbol);
        }
        Self {
            type_token,
            by_symbol,
            by_variant,
            symbols,
        }
    }

    fn invalid(&self, value: impl ToString) -> CodecError {
        CodecError::InvalidValue {
            type_name: self.type_token.to_string(),
            value: value.to_string(),
            allowed: self.symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ValueCodec for EnumCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        let TypedValue::Enum {
            type_token,
            variant,
        } = value
        else {
            return Err(self.invalid(value));
        };
        if *type_token != self.type_token {
            return Err(self.invalid(value));
        }
        let symbol = self
            .by_variant
            .get(variant)
            .ok_or_else(|| self.invalid(variant))?;
        Ok(Value::String(symbol.clone()))
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        let symbol = value.as_str().ok_or_else(|| self.invalid(value))?;
        let variant = self
            .by_symbol
            .get(symbol)
            .ok_or_else(|| self.invalid(symbol))?;
        Ok(TypedValue::Enum {
            type_token: self.type_token.clone(),
            variant: variant.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> EnumCodec {
        EnumCodec::new(
            TypeToken::new("Mode"),
            vec![
                EnumVariant {
                    name: Arc::from("Normal"),
                    symbol: Arc::from("normal"),
                },
                EnumVariant {
                    name: Arc::from("LowPower"),
                    symbol: Arc::from("low-power"),
                },
            ],
        )
    }

    #[test]
    fn maps_symbols_both_ways() {
        let codec = codec();
        let typed = codec.to_typed(&Value::string("low-power")).unwrap();
        assert_eq!(
            typed,
            TypedValue::Enum {
                type_token: TypeToken::new("Mode"),
                variant: Arc::from("LowPower"),
            }
        );
        assert_eq!(codec.to_generic(&typed).unwrap(), Value::string("low-power"));
    }

    #[test]
    fn unknown_symbol_lists_valid_ones() {
        let err = codec().to_typed(&Value::string("turbo")).unwrap_err();
        let CodecError::InvalidValue { allowed, .. } = err else {
            panic!("wrong error: {err}");
        };
        assert_eq!(allowed, ["normal", "low-power"]);
    }

    #[test]
    fn foreign_enum_value_is_rejected() {
        let err = codec()
            .to_generic(&TypedValue::Enum {
                type_token: TypeToken::new("Other"),
                variant: Arc::from("Normal"),
            })
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }
}
