//! Medication Zone Temperature Bands
//!
//! Bands follow WHO cold-chain guidance for each medication category.
//! `min..max` is the compliant range; `critical_min..critical_max` is the
//! last tolerable excursion band before product loss is presumed.

// ===== ABSOLUTE PHYSICAL BOUNDS =====

/// Lowest temperature any cold-chain sensor can plausibly report (°C).
///
/// Below this the reading is a sensor fault, not an excursion. Deep-frozen
/// biologics transport bottoms out around -40 °C; -50 °C leaves margin.
pub const PHYSICAL_MIN_C: f32 = -50.0;

/// Highest plausible cold-chain reading (°C).
pub const PHYSICAL_MAX_C: f32 = 50.0;

// ===== VACCINES (2-8 °C, WHO standard band) =====

/// Vaccine compliant minimum (°C).
pub const VACCINES_MIN_C: f32 = 2.0;
/// Vaccine compliant maximum (°C).
pub const VACCINES_MAX_C: f32 = 8.0;
/// Vaccine critical minimum (°C) - freezing destroys adjuvanted vaccines.
pub const VACCINES_CRITICAL_MIN_C: f32 = 0.0;
/// Vaccine critical maximum (°C).
pub const VACCINES_CRITICAL_MAX_C: f32 = 10.0;

// ===== INSULINS (2-8 °C, wider heat excursion band) =====

/// Insulin compliant minimum (°C).
pub const INSULINS_MIN_C: f32 = 2.0;
/// Insulin compliant maximum (°C).
pub const INSULINS_MAX_C: f32 = 8.0;
/// Insulin critical minimum (°C).
pub const INSULINS_CRITICAL_MIN_C: f32 = 0.0;
/// Insulin critical maximum (°C) - tolerates brief warmth better than
/// vaccines.
pub const INSULINS_CRITICAL_MAX_C: f32 = 12.0;

// ===== BIOLOGICS (frozen storage, -20..-15 °C) =====

/// Biologics compliant minimum (°C).
pub const BIOLOGICS_MIN_C: f32 = -20.0;
/// Biologics compliant maximum (°C).
pub const BIOLOGICS_MAX_C: f32 = -15.0;
/// Biologics critical minimum (°C).
pub const BIOLOGICS_CRITICAL_MIN_C: f32 = -25.0;
/// Biologics critical maximum (°C).
pub const BIOLOGICS_CRITICAL_MAX_C: f32 = -10.0;

// ===== ANTIBIOTICS (controlled room temperature) =====

/// Antibiotics compliant minimum (°C).
pub const ANTIBIOTICS_MIN_C: f32 = 15.0;
/// Antibiotics compliant maximum (°C).
pub const ANTIBIOTICS_MAX_C: f32 = 25.0;
/// Antibiotics critical minimum (°C).
pub const ANTIBIOTICS_CRITICAL_MIN_C: f32 = 8.0;
/// Antibiotics critical maximum (°C).
pub const ANTIBIOTICS_CRITICAL_MAX_C: f32 = 30.0;
