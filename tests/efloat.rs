//! EFloat containment: exact results must stay inside computed intervals.

use rt1w::core::efloat::EFloat;
use rt1w::core::pbrt::*;
use rt1w::core::rng::Rng;

#[derive(Copy, Clone, Debug)]
enum ErrorMode {
    None,
    Typical,
    Large,
    Extreme,
}

const MODES: [ErrorMode; 4] = [
    ErrorMode::None,
    ErrorMode::Typical,
    ErrorMode::Large,
    ErrorMode::Extreme,
];

const ITERATIONS: usize = 10_000;

/// Random value spanning several orders of magnitude, with an error bound
/// sized by the mode: zero, a few ulps, many ulps, or a large fraction of
/// the value.
fn random_efloat(rng: &mut Rng, mode: ErrorMode) -> EFloat {
    let logu = lerp(rng.f32(), -6.0, 6.0);
    let val = (10.0 as Float).powf(logu);
    let sign = if rng.f32() < 0.5 { -1.0 } else { 1.0 };

    match mode {
        ErrorMode::None => EFloat::new(sign * val, 0.0),
        ErrorMode::Typical => {
            let ulp_error = rng.u32_bound(1024);
            let offset = bits_to_float(float_to_bits(val) + ulp_error);
            EFloat::new(sign * val, (offset - val).abs())
        }
        ErrorMode::Large => {
            let ulp_error = rng.u32_bound(1024 * 1024);
            let offset = bits_to_float(float_to_bits(val) + ulp_error);
            EFloat::new(sign * val, (offset - val).abs())
        }
        ErrorMode::Extreme => EFloat::new(sign * val, 4.0 * rng.f32() * val.abs()),
    }
}

/// A precise value somewhere inside the interval; endpoints get extra
/// weight so the bounds themselves are exercised.
fn random_precise(ef: EFloat, rng: &mut Rng) -> f64 {
    match rng.u32_bound(3) {
        0 => ef.hi() as f64,
        1 => ef.lo() as f64,
        _ => clamp(
            lerp(rng.f32(), ef.lo(), ef.hi()),
            ef.lo(),
            ef.hi(),
        ) as f64,
    }
}

fn check_binary(op: impl Fn(EFloat, EFloat) -> EFloat, precise: impl Fn(f64, f64) -> f64, skip: impl Fn(EFloat, EFloat) -> bool) {
    let mut rng = Rng::from_seed(0xef10a7);

    for mode in MODES {
        let mut violations = 0;
        for _ in 0..ITERATIONS {
            let a = random_efloat(&mut rng, mode);
            let b = random_efloat(&mut rng, mode);
            if skip(a, b) {
                continue;
            }
            let pa = random_precise(a, &mut rng);
            let pb = random_precise(b, &mut rng);

            let r = op(a, b);
            let pr = precise(pa, pb) as Float;
            if pr < r.lo() || pr > r.hi() {
                violations += 1;
            }
        }
        assert_eq!(violations, 0, "containment violated in mode {:?}", mode);
    }
}

#[test]
fn precise_values_start_inside() {
    let mut rng = Rng::from_seed(1);
    for _ in 0..ITERATIONS {
        let mode = MODES[rng.u32_bound(4) as usize];
        let ef = random_efloat(&mut rng, mode);
        let p = random_precise(ef, &mut rng);
        assert!(p >= ef.lo() as f64 && p <= ef.hi() as f64);
    }
}

#[test]
fn add_contains_exact_result() {
    check_binary(|a, b| a + b, |a, b| a + b, |_, _| false);
}

#[test]
fn sub_contains_exact_result() {
    check_binary(|a, b| a - b, |a, b| a - b, |_, _| false);
}

#[test]
fn mul_contains_exact_result() {
    check_binary(|a, b| a * b, |a, b| a * b, |_, _| false);
}

#[test]
fn div_contains_exact_result() {
    // Division is only defined for divisors clear of zero.
    check_binary(
        |a, b| a / b,
        |a, b| a / b,
        |_, b| b.error() >= 0.5 * b.abs_min(),
    );
}

#[test]
fn abs_contains_exact_result() {
    let mut rng = Rng::from_seed(0xab5);
    for mode in MODES {
        let mut violations = 0;
        for _ in 0..ITERATIONS {
            let ef = random_efloat(&mut rng, mode);
            let p = random_precise(ef, &mut rng);

            let r = ef.abs();
            let pr = p.abs() as Float;
            if pr < r.lo() || pr > r.hi() {
                violations += 1;
            }
        }
        assert_eq!(violations, 0, "containment violated in mode {:?}", mode);
    }
}

#[test]
fn sqrt_contains_exact_result() {
    let mut rng = Rng::from_seed(0x5a27);
    for mode in MODES {
        let mut violations = 0;
        for _ in 0..ITERATIONS {
            let ef = random_efloat(&mut rng, mode);
            if ef.lo() < ef.error() || ef.hi() < ef.error() {
                continue;
            }
            let p = random_precise(ef, &mut rng);

            let r = ef.sqrt();
            let pr = p.sqrt() as Float;
            if pr < r.lo() || pr > r.hi() {
                violations += 1;
            }
        }
        assert_eq!(violations, 0, "containment violated in mode {:?}", mode);
    }
}
