use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for masses,
/// mass fractions and power.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the step loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and reporting.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Mass of `count` assemblies of `unit_mass` each, saturating at
/// `Fixed64::MAX` for effectively unbounded inventories.
#[inline]
pub fn assemblies_mass(count: usize, unit_mass: Fixed64) -> Fixed64 {
    Fixed64::saturating_from_num(count).saturating_mul(unit_mass)
}

/// Sum of masses, saturating instead of overflowing.
pub fn saturating_sum<I: IntoIterator<Item = Fixed64>>(values: I) -> Fixed64 {
    values
        .into_iter()
        .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v))
}

/// Ceiling division for signed step counts. `b` must be positive.
#[inline]
pub fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    let q = a / b;
    if a % b > 0 { q + 1 } else { q }
}
