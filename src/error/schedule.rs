use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlanFamily {
    #[error("rps_schedule")]
    Rate,
    #[error("instances_schedule")]
    Instances,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Schedule step must not be empty.")]
    EmptyStep,
    #[error("Malformed schedule step '{step}'. Expected '<type>(<args>)'.")]
    MalformedStep { step: String },
    #[error("No such load type implemented: '{name}'.")]
    UnknownStepType { name: String },
    #[error("Error in step configuration '{step}'. Expected format: '{expected}'.")]
    WrongArguments {
        step: String,
        expected: &'static str,
    },
    #[error("Invalid number '{value}' in step '{step}': {source}")]
    InvalidNumber {
        step: String,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Number '{value}' in step '{step}' must be finite.")]
    NonFiniteNumber { step: String, value: String },
    #[error("Rate must be >= 0 in step '{step}'.")]
    NegativeRate { step: String },
    #[error("Step size must be > 0 in step '{step}'.")]
    ZeroStepSize { step: String },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Failed to parse duration '{value}'.")]
    InvalidDuration { value: String },
    #[error("Invalid duration unit '{unit}' in '{value}'.")]
    InvalidDurationUnit { unit: String, value: String },
    #[error("Duration overflow in '{value}'.")]
    DurationOverflow { value: String },
    #[error("Can not stop instances in instances_schedule (requested {count}).")]
    NegativeInstances { count: i64 },
    #[error("Instance count must be a whole number, got '{value}'.")]
    NonIntegralInstances { value: String },
    #[error("Step '{step}' is not supported in {family}.")]
    UnsupportedStep { step: String, family: PlanFamily },
}
