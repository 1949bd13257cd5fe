//! Exponentiation and logarithm with 18 decimal fixed point numbers, as
//! implemented by the `LogExpMath` library of the Balancer contracts.
//!
//! The computation runs on signed big integers and uses truncating division,
//! which matches Solidity's `int256` division. Intermediate values never leave
//! the `int256` range for inputs accepted by [`pow`].

use {
    super::error::Error,
    num::{BigInt, Signed, Zero},
    number::conversions::{big_int_to_u256, u256_to_big_int},
    primitive_types::U256,
    std::sync::LazyLock,
};

fn int(s: &str) -> BigInt {
    s.parse().expect("valid integer literal")
}

static ONE_18: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(10).pow(18));
static ONE_20: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(10).pow(20));
static ONE_36: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(10).pow(36));

static MAX_NATURAL_EXPONENT: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(130) * &*ONE_18);
static MIN_NATURAL_EXPONENT: LazyLock<BigInt> = LazyLock::new(|| BigInt::from(-41) * &*ONE_18);

static LN_36_LOWER_BOUND: LazyLock<BigInt> =
    LazyLock::new(|| &*ONE_18 - BigInt::from(10).pow(17));
static LN_36_UPPER_BOUND: LazyLock<BigInt> =
    LazyLock::new(|| &*ONE_18 + BigInt::from(10).pow(17));

static MILD_EXPONENT_BOUND: LazyLock<BigInt> =
    LazyLock::new(|| BigInt::from(2).pow(254) / &*ONE_20);

// 18 decimal constants. `a0` and `a1` have no decimals.
static X0: LazyLock<BigInt> = LazyLock::new(|| int("128000000000000000000"));
static A0: LazyLock<BigInt> =
    LazyLock::new(|| int("38877084059945950922200000000000000000000000000000000000"));
static X1: LazyLock<BigInt> = LazyLock::new(|| int("64000000000000000000"));
static A1: LazyLock<BigInt> = LazyLock::new(|| int("6235149080811616882910000000"));

// 20 decimal constants, `(x_n, e^x_n)` for `x_n = 2^(7 - n)`.
static X_A: LazyLock<[(BigInt, BigInt); 10]> = LazyLock::new(|| {
    [
        (
            int("3200000000000000000000"),
            int("7896296018268069516100000000000000"),
        ),
        (
            int("1600000000000000000000"),
            int("888611052050787263676000000"),
        ),
        (
            int("800000000000000000000"),
            int("298095798704172827474000"),
        ),
        (int("400000000000000000000"), int("5459815003314423907810")),
        (int("200000000000000000000"), int("738905609893065022723")),
        (int("100000000000000000000"), int("271828182845904523536")),
        (int("50000000000000000000"), int("164872127070012814685")),
        (int("25000000000000000000"), int("128402541668774148407")),
        (int("12500000000000000000"), int("113314845306682631683")),
        (int("6250000000000000000"), int("106449445891785942956")),
    ]
});

/// Computes `x^y` for 18 decimal fixed point `x` and `y`.
pub fn pow(x: U256, y: U256) -> Result<U256, Error> {
    if y.is_zero() {
        return Ok(U256::exp10(18));
    }
    if x.is_zero() {
        return Ok(U256::zero());
    }
    if x.bit(255) {
        return Err(Error::XOutOfBounds);
    }
    let x = u256_to_big_int(&x);
    let y = u256_to_big_int(&y);
    if y >= *MILD_EXPONENT_BOUND {
        return Err(Error::YOutOfBounds);
    }

    let mut logx_times_y = if *LN_36_LOWER_BOUND < x && x < *LN_36_UPPER_BOUND {
        let ln_36_x = ln_36(x);
        // `ln_36_x` has 36 decimal places, so multiplying by `y` would overflow
        // `int256`. Split it into its integer and fractional part first.
        (&ln_36_x / &*ONE_18) * &y + ((&ln_36_x % &*ONE_18) * &y) / &*ONE_18
    } else {
        ln(x) * &y
    };
    logx_times_y /= &*ONE_18;

    if logx_times_y < *MIN_NATURAL_EXPONENT || logx_times_y > *MAX_NATURAL_EXPONENT {
        return Err(Error::ProductOutOfBounds);
    }

    big_int_to_u256(&exp(logx_times_y)?).map_err(|_| Error::ProductOutOfBounds)
}

/// Natural exponentiation of an 18 decimal fixed point number.
pub fn exp(mut x: BigInt) -> Result<BigInt, Error> {
    if x < *MIN_NATURAL_EXPONENT || x > *MAX_NATURAL_EXPONENT {
        return Err(Error::InvalidExponent);
    }

    if x.is_negative() {
        // e^(-x) = 1 / e^x, with the numerator scaled by 1e18 to keep precision.
        return Ok((&*ONE_18 * &*ONE_18) / exp(-x)?);
    }

    let first_an = if x >= *X0 {
        x -= &*X0;
        A0.clone()
    } else if x >= *X1 {
        x -= &*X1;
        A1.clone()
    } else {
        BigInt::from(1)
    };

    // Switch to 20 decimals for the remaining computation.
    x *= BigInt::from(100);

    let mut product = ONE_20.clone();
    // `x10` and `x11` are not needed here, the Taylor series below already has
    // enough precision.
    for (x_n, a_n) in X_A.iter().take(8) {
        if x >= *x_n {
            x -= x_n;
            product = (product * a_n) / &*ONE_20;
        }
    }

    let mut series_sum = ONE_20.clone();
    let mut term = x.clone();
    series_sum += &term;
    for n in 2..=12 {
        term = ((&term * &x) / &*ONE_20) / BigInt::from(n);
        series_sum += &term;
    }

    Ok((((product * series_sum) / &*ONE_20) * first_an) / BigInt::from(100))
}

/// Natural logarithm of an 18 decimal fixed point number.
fn ln(mut a: BigInt) -> BigInt {
    if a < *ONE_18 {
        // ln(a) = -ln(1 / a)
        return -ln((&*ONE_18 * &*ONE_18) / a);
    }

    let mut sum = BigInt::zero();
    if a >= &*A0 * &*ONE_18 {
        a /= &*A0;
        sum += &*X0;
    }
    if a >= &*A1 * &*ONE_18 {
        a /= &*A1;
        sum += &*X1;
    }

    // Switch to 20 decimals.
    sum *= BigInt::from(100);
    a *= BigInt::from(100);

    for (x_n, a_n) in X_A.iter() {
        if a >= *a_n {
            a = (a * &*ONE_20) / a_n;
            sum += x_n;
        }
    }

    // ln(a) = 2 * atanh(z) with z = (a - 1) / (a + 1), using the odd terms of
    // the Taylor series.
    let z = ((&a - &*ONE_20) * &*ONE_20) / (&a + &*ONE_20);
    let z_squared = (&z * &z) / &*ONE_20;

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for n in [3, 5, 7, 9, 11] {
        num = (num * &z_squared) / &*ONE_20;
        series_sum += &num / BigInt::from(n);
    }
    series_sum *= BigInt::from(2);

    (sum + series_sum) / BigInt::from(100)
}

/// Natural logarithm with 36 decimals of precision for arguments close to
/// one. Returns a 36 decimal fixed point number.
fn ln_36(x: BigInt) -> BigInt {
    let x = x * &*ONE_18;

    let z = ((&x - &*ONE_36) * &*ONE_36) / (&x + &*ONE_36);
    let z_squared = (&z * &z) / &*ONE_36;

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for n in [3, 5, 7, 9, 11, 13, 15] {
        num = (num * &z_squared) / &*ONE_36;
        series_sum += &num / BigInt::from(n);
    }

    series_sum * BigInt::from(2)
}
