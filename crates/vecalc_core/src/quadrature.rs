//! Adaptive Gauss-Kronrod quadrature in one, two and three dimensions.
//!
//! Each interval is integrated with the 15-point Kronrod rule, and the
//! embedded 7-point Gauss rule gives the error estimate. The interval with
//! the largest error is bisected until the total error meets the tolerance
//! or the subdivision limit is reached. Multiple integrals nest the 1-D
//! routine, with inner limits evaluated at the outer coordinates.

use crate::error::{CalculusError, Result};
use serde::{Deserialize, Serialize};

/// Kronrod abscissae on [-1, 1], descending, symmetric about 0.
/// Odd indices are the 7-point Gauss nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.000_000_000_000_000_000_000_000_000_000_000,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// Gauss weights for XGK[1], XGK[3], XGK[5] and the centre.
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuadSettings {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Maximum number of subintervals.
    pub limit: usize,
}

impl Default for QuadSettings {
    fn default() -> Self {
        Self {
            abs_tol: 1.49e-8,
            rel_tol: 1.49e-8,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadResult {
    pub value: f64,
    /// Estimated absolute error of `value`.
    pub error: f64,
    /// Total integrand evaluations, including those of inner integrals.
    pub evaluations: usize,
}

/// Inner limit of a double or triple integral: a constant or a function of `x`.
pub enum Limit<'a> {
    Const(f64),
    Curve(Box<dyn Fn(f64) -> f64 + 'a>),
}

impl<'a> Limit<'a> {
    pub fn curve(f: impl Fn(f64) -> f64 + 'a) -> Self {
        Limit::Curve(Box::new(f))
    }

    pub fn at(&self, x: f64) -> f64 {
        match self {
            Limit::Const(value) => *value,
            Limit::Curve(f) => f(x),
        }
    }
}

impl From<f64> for Limit<'_> {
    fn from(value: f64) -> Self {
        Limit::Const(value)
    }
}

/// Innermost limit of a triple integral: a constant or a function of `(x, y)`.
pub enum SurfaceLimit<'a> {
    Const(f64),
    Surface(Box<dyn Fn(f64, f64) -> f64 + 'a>),
}

impl<'a> SurfaceLimit<'a> {
    pub fn surface(f: impl Fn(f64, f64) -> f64 + 'a) -> Self {
        SurfaceLimit::Surface(Box::new(f))
    }

    pub fn at(&self, x: f64, y: f64) -> f64 {
        match self {
            SurfaceLimit::Const(value) => *value,
            SurfaceLimit::Surface(f) => f(x, y),
        }
    }
}

impl From<f64> for SurfaceLimit<'_> {
    fn from(value: f64) -> Self {
        SurfaceLimit::Const(value)
    }
}

/// `∫_a^b f(x) dx`.
pub fn quad<F>(mut f: F, a: f64, b: f64, settings: &QuadSettings) -> Result<QuadResult>
where
    F: FnMut(f64) -> f64,
{
    adaptive(|x| Ok(f(x)), a, b, settings)
}

/// `∫_a^b ∫_{lower(x)}^{upper(x)} f(x, y) dy dx`.
pub fn dblquad<F>(
    mut f: F,
    (a, b): (f64, f64),
    lower: &Limit<'_>,
    upper: &Limit<'_>,
    settings: &QuadSettings,
) -> Result<QuadResult>
where
    F: FnMut(f64, f64) -> f64,
{
    let mut evaluations = 0;
    let outer = adaptive(
        |x| {
            let inner = adaptive(|y| Ok(f(x, y)), lower.at(x), upper.at(x), settings)?;
            evaluations += inner.evaluations;
            Ok(inner.value)
        },
        a,
        b,
        settings,
    )?;
    Ok(QuadResult {
        evaluations,
        ..outer
    })
}

/// `∫_a^b ∫_{y_lower(x)}^{y_upper(x)} ∫_{z_lower(x, y)}^{z_upper(x, y)} f(x, y, z) dz dy dx`.
pub fn tplquad<F>(
    mut f: F,
    (a, b): (f64, f64),
    y_lower: &Limit<'_>,
    y_upper: &Limit<'_>,
    z_lower: &SurfaceLimit<'_>,
    z_upper: &SurfaceLimit<'_>,
    settings: &QuadSettings,
) -> Result<QuadResult>
where
    F: FnMut(f64, f64, f64) -> f64,
{
    let mut evaluations = 0;
    let outer = adaptive(
        |x| {
            let middle = adaptive(
                |y| {
                    let inner = adaptive(
                        |z| Ok(f(x, y, z)),
                        z_lower.at(x, y),
                        z_upper.at(x, y),
                        settings,
                    )?;
                    evaluations += inner.evaluations;
                    Ok(inner.value)
                },
                y_lower.at(x),
                y_upper.at(x),
                settings,
            )?;
            Ok(middle.value)
        },
        a,
        b,
        settings,
    )?;
    Ok(QuadResult {
        evaluations,
        ..outer
    })
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn adaptive<F>(mut f: F, a: f64, b: f64, settings: &QuadSettings) -> Result<QuadResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    if !a.is_finite() || !b.is_finite() {
        return Err(CalculusError::invalid(format!(
            "Integration limits must be finite, got [{a}, {b}]."
        )));
    }
    if settings.limit == 0 {
        return Err(CalculusError::invalid("Quadrature limit must be at least 1."));
    }
    if a == b {
        return Ok(QuadResult {
            value: 0.0,
            error: 0.0,
            evaluations: 0,
        });
    }
    if a > b {
        let flipped = adaptive(f, b, a, settings)?;
        return Ok(QuadResult {
            value: -flipped.value,
            ..flipped
        });
    }

    let mut evaluations = 0;
    let mut segments = vec![kronrod_segment(&mut f, a, b, &mut evaluations)?];

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = settings.abs_tol.max(settings.rel_tol * value.abs());
        if error <= tolerance {
            return Ok(QuadResult {
                value,
                error,
                evaluations,
            });
        }
        if segments.len() >= settings.limit {
            log::warn!(
                "Quadrature on [{}, {}] reached {} subintervals; estimated error {:e} exceeds {:e}",
                a,
                b,
                settings.limit,
                error,
                tolerance
            );
            return Ok(QuadResult {
                value,
                error,
                evaluations,
            });
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, l), (_, r)| l.error.total_cmp(&r.error))
            .map(|(index, _)| index)
            .unwrap_or(0);
        let Segment { a: left, b: right, .. } = segments[worst];
        let mid = 0.5 * (left + right);
        if mid <= left || mid >= right {
            log::warn!("Quadrature interval [{left}, {right}] cannot be bisected further");
            return Ok(QuadResult {
                value,
                error,
                evaluations,
            });
        }
        segments.swap_remove(worst);
        segments.push(kronrod_segment(&mut f, left, mid, &mut evaluations)?);
        segments.push(kronrod_segment(&mut f, mid, right, &mut evaluations)?);
    }
}

/// One 15-point Kronrod estimate with the QUADPACK error heuristic.
fn kronrod_segment<F>(f: &mut F, a: f64, b: f64, evaluations: &mut usize) -> Result<Segment>
where
    F: FnMut(f64) -> Result<f64>,
{
    let centre = 0.5 * (a + b);
    let half_length = 0.5 * (b - a);
    let mut sample = |x: f64| -> Result<f64> {
        *evaluations += 1;
        let value = f(x)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CalculusError::Quadrature(format!(
                "integrand is not finite at {x} (value {value})"
            )))
        }
    };

    let f_centre = sample(centre)?;
    let mut kronrod = WGK[7] * f_centre;
    let mut gauss = WG[3] * f_centre;
    let mut abs_sum = kronrod.abs();
    let mut pairs = [(0.0, 0.0); 7];

    for (j, pair) in pairs.iter_mut().enumerate() {
        let offset = half_length * XGK[j];
        let lo = sample(centre - offset)?;
        let hi = sample(centre + offset)?;
        kronrod += WGK[j] * (lo + hi);
        abs_sum += WGK[j] * (lo.abs() + hi.abs());
        if j % 2 == 1 {
            gauss += WG[j / 2] * (lo + hi);
        }
        *pair = (lo, hi);
    }

    let mean = 0.5 * kronrod;
    let mut asc = WGK[7] * (f_centre - mean).abs();
    for (j, (lo, hi)) in pairs.iter().enumerate() {
        asc += WGK[j] * ((lo - mean).abs() + (hi - mean).abs());
    }

    let value = kronrod * half_length;
    let abs_sum = abs_sum * half_length.abs();
    let asc = asc * half_length.abs();
    let mut error = ((kronrod - gauss) * half_length).abs();
    if asc != 0.0 && error != 0.0 {
        error = asc * (200.0 * error / asc).powf(1.5).min(1.0);
    }
    if abs_sum > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * abs_sum);
    }

    Ok(Segment { a, b, value, error })
}
