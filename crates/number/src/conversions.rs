//! Conversions between `U256` and arbitrary precision integers.

use {
    anyhow::{Result, ensure},
    num::{BigInt, BigUint, bigint::Sign},
    primitive_types::U256,
};

pub fn u256_to_big_uint(input: &U256) -> BigUint {
    let mut bytes = [0; 32];
    input.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

pub fn u256_to_big_int(input: &U256) -> BigInt {
    BigInt::from_biguint(Sign::Plus, u256_to_big_uint(input))
}

pub fn big_uint_to_u256(input: &BigUint) -> Result<U256> {
    let bytes = input.to_bytes_be();
    ensure!(bytes.len() <= 32, "too large");
    Ok(U256::from_big_endian(&bytes))
}

pub fn big_int_to_u256(input: &BigInt) -> Result<U256> {
    ensure!(input.sign() != Sign::Minus, "negative");
    big_uint_to_u256(input.magnitude())
}

#[cfg(test)]
mod tests {
    use {super::*, num::Zero};

    #[test]
    fn big_int_round_trips_through_u256() {
        for value in [U256::zero(), U256::one(), U256::exp10(18), U256::MAX] {
            assert_eq!(big_int_to_u256(&u256_to_big_int(&value)).unwrap(), value);
        }
    }

    #[test]
    fn rejects_negative_and_too_large() {
        assert!(big_int_to_u256(&BigInt::from(-1)).is_err());
        let too_large = u256_to_big_int(&U256::MAX) + BigInt::from(1);
        assert!(big_int_to_u256(&too_large).is_err());
        assert!(big_int_to_u256(&BigInt::zero()).unwrap().is_zero());
    }
}
