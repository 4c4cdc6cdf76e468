use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Represents all known command ids.
///
/// Ids fill the low 7 bits of the command byte, the top bit being the
/// acknowledgement request. Id 0 is reserved and never dispatched.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    None = 0,
    Ack = 1,
    Ping = 2,
    DebugMessage = 3,
    GetRunningMode = 4,
    ManageSubscriptions = 5,

    // System
    GetSystemStrings = 16,
    GetSystemStatus = 17,
    SetDeviceStrings = 18,
    SaveToFlash = 19,
    EraseFlash = 20,

    // Control
    MotorOverride = 23,
    GetControllerReferences = 24,
    GetControlSignals = 25,
    GetControllerLimits = 26,
    SetControllerLimits = 27,
    GetArmSettings = 28,
    SetArmSettings = 29,
    GetRateControllerData = 30,
    SetRateControllerData = 31,
    GetAttitudeControllerData = 32,
    SetAttitudeControllerData = 33,
    GetVelocityControllerData = 34,
    SetVelocityControllerData = 35,
    GetPositionControllerData = 36,
    SetPositionControllerData = 37,
    GetChannelMix = 39,
    SetChannelMix = 40,

    // RC
    GetRCInputSettings = 41,
    SetRCInputSettings = 42,
    GetRCOutputSettings = 43,
    SetRCOutputSettings = 44,
    GetRCValues = 45,

    // Sensors
    GetIMUData = 46,
    GetRawIMUData = 47,
    GetIMUCalibration = 48,
    SetIMUCalibration = 49,

    // Estimation
    GetEstimationRate = 50,
    GetEstimationAttitude = 51,
    GetEstimationVelocity = 52,
    GetEstimationPosition = 53,
    GetEstimationAllStates = 54,
    ResetEstimation = 55,

    // Filters
    GetControlFilters = 56,
    SetControlFilters = 57,

    // External references
    ComputerControlReference = 126,
    MotionCaptureMeasurement = 127,
}

impl Command {
    /// Returns the 7-bit id carried on the wire.
    pub const fn id(self) -> u8 {
        self as u8
    }
}
