use crate::types::Real;

/// Configuration rejected at vehicle construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("vehicle has no wheels")]
    NoWheels,

    #[error("per-corner arrays disagree: {wheels} wheels, {suspension} suspension corners, {tires} tires")]
    CornerCountMismatch {
        wheels: usize,
        suspension: usize,
        tires: usize,
    },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Real },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: Real },

    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: Real },

    #[error("{field} is not finite")]
    NonFinite { field: &'static str },

    #[error("engine torque curve is empty")]
    EmptyTorqueCurve,

    #[error("engine torque curve needs at least two points, got {0}")]
    TorqueCurveTooShort(usize),

    #[error("engine torque curve rpm must strictly increase (point {index}: {rpm} after {previous})")]
    NonMonotonicTorqueCurve {
        index: usize,
        rpm: Real,
        previous: Real,
    },

    #[error("gear table needs a neutral entry and at least one forward gear")]
    MissingForwardGear,

    #[error("gear table slot 0 is neutral and must be 0, got {0}")]
    NeutralRatioNotZero(Real),

    #[error("reverse ratio must be negative, got {0}")]
    ReverseRatioNotNegative(Real),

    #[error("idle rpm {idle} must be below max rpm {max}")]
    IdleAboveMax { idle: Real, max: Real },
}

/// Snapshot that cannot be resumed under the given configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RestoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("snapshot carries {found} corners, configuration has {expected}")]
    CornerCount { expected: usize, found: usize },

    #[error("snapshot gear {gear} is outside [{lowest}, {highest}]")]
    GearOutOfRange { gear: i32, lowest: i32, highest: i32 },

    #[error("snapshot is mid-shift with clutch at {0}, expected fully open")]
    ClutchWhileShifting(Real),

    #[error("snapshot shift timer {0} is negative or not finite")]
    InvalidShiftTimer(Real),
}

pub(crate) fn ensure_positive(field: &'static str, value: Real) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

pub(crate) fn ensure_non_negative(field: &'static str, value: Real) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn ensure_unit(field: &'static str, value: Real) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfUnitRange { field, value });
    }
    Ok(())
}

pub(crate) fn ensure_finite(field: &'static str, value: Real) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    Ok(())
}
