//! Error-bounded floating point arithmetic.

use crate::core::pbrt::*;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A float `v` together with a conservative absolute error bound `e`, so
/// that the exact value lies in `[v - e, v + e]`. Closed under the four
/// arithmetic operations plus `sqrt` and `abs`; every operation widens the
/// bound enough to account for its own rounding.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EFloat {
    v: Float,
    e: Float,
}

impl EFloat {
    pub fn new(v: Float, e: Float) -> Self {
        Self { v, e }
    }

    pub fn value(self) -> Float {
        self.v
    }

    pub fn error(self) -> Float {
        self.e
    }

    pub fn lo(self) -> Float {
        self.v - self.e
    }

    pub fn hi(self) -> Float {
        self.v + self.e
    }

    /// Smallest absolute value over the interval.
    pub fn abs_min(self) -> Float {
        if self.v > 0.0 { self.lo() } else { self.hi() }.abs()
    }

    /// Largest absolute value over the interval.
    pub fn abs_max(self) -> Float {
        if self.v > 0.0 { self.hi() } else { self.lo() }.abs()
    }

    pub fn sqrt(self) -> Self {
        if self.lo() == 0.0 && self.hi() == 0.0 && self.e == 0.0 {
            return Self::default();
        }
        debug_assert!(self.e == 0.0 || (self.lo() > self.e && self.hi() > self.e));

        let a = self.e * (1.0 + EPSILON);
        let hlo = EPSILON * self.lo().sqrt() + a / (2.0 * (self.lo() - self.e).sqrt());
        let hhi = EPSILON * self.hi().sqrt() + a / (2.0 * (self.hi() - self.e).sqrt());

        Self::new(self.v.sqrt(), hlo.max(hhi))
    }

    pub fn abs(self) -> Self {
        if self.lo() >= 0.0 {
            self
        } else if self.hi() <= 0.0 {
            Self::new(-self.v, self.e)
        } else {
            Self::new(self.v.abs(), self.abs_max())
        }
    }
}

impl From<Float> for EFloat {
    fn from(v: Float) -> Self {
        Self { v, e: 0.0 }
    }
}

impl Add for EFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let a = EPSILON * (self.lo() + rhs.lo()).abs().max((self.hi() + rhs.hi()).abs());
        let b = (1.0 + EPSILON) * (self.e + rhs.e);
        Self::new(self.v + rhs.v, MIN_REAL + a + b)
    }
}

impl Sub for EFloat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let a = EPSILON * (self.lo() - rhs.hi()).abs().max((self.hi() - rhs.lo()).abs());
        let b = (1.0 + EPSILON) * (self.e + rhs.e);
        Self::new(self.v - rhs.v, MIN_REAL + a + b)
    }
}

impl Mul for EFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let a = EPSILON * self.abs_max() * rhs.abs_max();
        let b = (1.0 + EPSILON)
            * (self.abs_max() * rhs.e + rhs.abs_max() * self.e + self.e * rhs.e);
        Self::new(self.v * rhs.v, MIN_REAL + a + b)
    }
}

impl Div for EFloat {
    type Output = Self;

    /// Requires the divisor interval to stay clear of zero,
    /// `e < abs_min() / 2`; wider divisors make the quotient bound
    /// meaningless.
    fn div(self, rhs: Self) -> Self {
        if rhs.e > 0.5 * rhs.abs_min() {
            warn!("EFloat division, divisor error is too large");
        }
        let a = 1.0 / (rhs.abs_min() - rhs.e);
        let b = rhs.e / rhs.abs_min();
        let c = EPSILON + b + 2.0 * (b * b);
        Self::new(self.v / rhs.v, MIN_REAL + a * (self.e + (self.abs_max() + self.e) * c))
    }
}

impl Neg for EFloat {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.v, self.e)
    }
}

impl Add<EFloat> for Float {
    type Output = EFloat;
    fn add(self, rhs: EFloat) -> EFloat {
        EFloat::from(self) + rhs
    }
}

impl Sub<EFloat> for Float {
    type Output = EFloat;
    fn sub(self, rhs: EFloat) -> EFloat {
        EFloat::from(self) - rhs
    }
}

impl Mul<EFloat> for Float {
    type Output = EFloat;
    fn mul(self, rhs: EFloat) -> EFloat {
        EFloat::from(self) * rhs
    }
}

impl Div<EFloat> for Float {
    type Output = EFloat;
    fn div(self, rhs: EFloat) -> EFloat {
        EFloat::from(self) / rhs
    }
}

/// Solves `a t^2 + b t + c = 0` over error-bounded coefficients. The
/// discriminant is evaluated in double precision; the roots come back in
/// ascending order of their midpoints.
pub fn quadratic_efloat(a: EFloat, b: EFloat, c: EFloat) -> Option<(EFloat, EFloat)> {
    let delta = b.value() as f64 * b.value() as f64
        - 4.0 * a.value() as f64 * c.value() as f64;
    if delta < 0.0 {
        return None;
    }
    let sqrt_delta = EFloat::from(delta as Float).sqrt();
    let q = if b.value() < 0.0 {
        -0.5 * (b - sqrt_delta)
    } else {
        -0.5 * (b + sqrt_delta)
    };
    let t0 = q / a;
    let t1 = c / q;
    if t0.value() > t1.value() {
        Some((t1, t0))
    } else {
        Some((t0, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_endpoints() {
        let ef = EFloat::new(2.0, 0.25);
        assert_eq!(ef.lo(), 1.75);
        assert_eq!(ef.hi(), 2.25);
        assert_eq!(ef.abs_min(), 1.75);
        assert_eq!(ef.abs_max(), 2.25);

        let nef = EFloat::new(-2.0, 0.25);
        assert_eq!(nef.abs_min(), 1.75);
        assert_eq!(nef.abs_max(), 2.25);
    }

    #[test]
    fn exact_inputs_stay_tight() {
        let a = EFloat::from(1.0);
        let b = EFloat::from(2.0);
        let s = a + b;
        assert_eq!(s.value(), 3.0);
        assert!(s.error() < 1e-5);
    }

    #[test]
    fn abs_straddles_zero() {
        let ef = EFloat::new(-0.1, 0.5);
        let r = ef.abs();
        assert!(r.lo() <= 0.0);
        assert!(r.hi() >= 0.4);
    }

    #[test]
    fn quadratic_contains_roots() {
        // (t - 2)(t - 5) = t^2 - 7t + 10
        let (t0, t1) = quadratic_efloat(
            EFloat::from(1.0),
            EFloat::from(-7.0),
            EFloat::from(10.0),
        )
        .unwrap();
        assert!(t0.lo() <= 2.0 && 2.0 <= t0.hi());
        assert!(t1.lo() <= 5.0 && 5.0 <= t1.hi());

        assert!(quadratic_efloat(
            EFloat::from(1.0),
            EFloat::from(0.0),
            EFloat::from(4.0)
        )
        .is_none());
    }
}
