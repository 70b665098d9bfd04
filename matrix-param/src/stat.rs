use special::Gamma as SpecialGamma;

pub const LN_2PI: f64 = 1.837_877_066_409_345_5;

pub fn digamma(x: f64) -> f64 {
    x.digamma()
}

pub fn ln_gamma(x: f64) -> f64 {
    SpecialGamma::ln_gamma(x).0
}

/// `ln B(a, b) = lnΓ(a) + lnΓ(b) - lnΓ(a + b)`
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// `x` unless it is NaN, then 0. Used where `0 ln 0` shows up as NaN.
pub fn nan_to_zero(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x
    }
}

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let ex = x.exp();
        ex / (1.0 + ex)
    }
}
