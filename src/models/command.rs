use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Device identifiers understood by the backend `/control` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Diesel,
    Sbms,
    Pcs,
    Pn14,
    System,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diesel => "diesel",
            Self::Sbms => "sbms",
            Self::Pcs => "pcs",
            Self::Pn14 => "pn14",
            Self::System => "system",
        }
    }

    /// Operator-facing subsystem name
    pub fn system_name(&self) -> &'static str {
        match self {
            Self::Diesel => "Diesel Generator",
            Self::Sbms => "ESS Battery (SBMS)",
            Self::Pcs => "PCS System",
            Self::Pn14 => "SkySails PN14",
            Self::System => "System Control",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diesel" => Ok(Self::Diesel),
            "sbms" => Ok(Self::Sbms),
            "pcs" => Ok(Self::Pcs),
            "pn14" | "skysails" => Ok(Self::Pn14),
            "system" => Ok(Self::System),
            other => Err(AppError::InvalidInput(format!("Invalid device: {}", other))),
        }
    }
}

/// Control actions accepted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartDg,
    StopDg,
    PowerOnSbms,
    PowerOffSbms,
    ClearSbmsFault,
    OpenDcSwitch,
    CloseDcSwitch,
    ClosePcsSwitch,
    ClosePrechargeSwitch,
    PcsFreqUp,
    PcsFreqDown,
    PcsFreqReset,
    PcsFaultReset,
    PcsRunMicrogrid,
    PcsStopMicrogrid,
    PcsReadSummary,
    AcbOpen,
    AcbClose,
    Operation,
    Shutdown,
    Start,
    Stop,
}

impl Action {
    pub const ALL: [Action; 22] = [
        Self::StartDg,
        Self::StopDg,
        Self::PowerOnSbms,
        Self::PowerOffSbms,
        Self::ClearSbmsFault,
        Self::OpenDcSwitch,
        Self::CloseDcSwitch,
        Self::ClosePcsSwitch,
        Self::ClosePrechargeSwitch,
        Self::PcsFreqUp,
        Self::PcsFreqDown,
        Self::PcsFreqReset,
        Self::PcsFaultReset,
        Self::PcsRunMicrogrid,
        Self::PcsStopMicrogrid,
        Self::PcsReadSummary,
        Self::AcbOpen,
        Self::AcbClose,
        Self::Operation,
        Self::Shutdown,
        Self::Start,
        Self::Stop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartDg => "start_dg",
            Self::StopDg => "stop_dg",
            Self::PowerOnSbms => "power_on_sbms",
            Self::PowerOffSbms => "power_off_sbms",
            Self::ClearSbmsFault => "clear_sbms_fault",
            Self::OpenDcSwitch => "open_dc_switch",
            Self::CloseDcSwitch => "close_dc_switch",
            Self::ClosePcsSwitch => "close_pcs_switch",
            Self::ClosePrechargeSwitch => "close_precharge_switch",
            Self::PcsFreqUp => "pcs_freq_up",
            Self::PcsFreqDown => "pcs_freq_down",
            Self::PcsFreqReset => "pcs_freq_reset",
            Self::PcsFaultReset => "pcs_fault_reset",
            Self::PcsRunMicrogrid => "pcs_run_microgrid",
            Self::PcsStopMicrogrid => "pcs_stop_microgrid",
            Self::PcsReadSummary => "pcs_read_summary",
            Self::AcbOpen => "acb_open",
            Self::AcbClose => "acb_close",
            Self::Operation => "operation",
            Self::Shutdown => "shutdown",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// Human label shown in the audit trail
    pub fn label(&self) -> &'static str {
        match self {
            Self::StartDg => "Start Generator",
            Self::StopDg => "Stop Generator",
            Self::PowerOnSbms => "Power ON SBMS",
            Self::PowerOffSbms => "Power OFF SBMS",
            Self::ClearSbmsFault => "Clear Fault",
            Self::OpenDcSwitch => "Open DC Switch",
            Self::CloseDcSwitch => "Close DC Switch",
            Self::ClosePcsSwitch => "Close PCS Switch",
            Self::ClosePrechargeSwitch => "Close Precharge Switch",
            Self::PcsFreqUp => "Frequency Up",
            Self::PcsFreqDown => "Frequency Down",
            Self::PcsFreqReset => "Frequency Reset",
            Self::PcsFaultReset => "PCS Fault Reset",
            Self::PcsRunMicrogrid => "Run Microgrid",
            Self::PcsStopMicrogrid => "Stop Microgrid",
            Self::PcsReadSummary => "Read PCS Summary",
            Self::AcbOpen => "ACB Open",
            Self::AcbClose => "ACB Close",
            Self::Operation => "Power ON",
            Self::Shutdown => "Power OFF",
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }

    /// Devices this action may be addressed to. Empty means any device.
    fn devices(&self) -> &'static [Device] {
        match self {
            Self::StartDg | Self::StopDg => &[Device::Diesel],
            Self::PowerOnSbms
            | Self::PowerOffSbms
            | Self::ClearSbmsFault
            | Self::OpenDcSwitch
            | Self::CloseDcSwitch
            | Self::ClosePcsSwitch
            | Self::ClosePrechargeSwitch => &[Device::Sbms],
            Self::PcsFreqUp
            | Self::PcsFreqDown
            | Self::PcsFreqReset
            | Self::PcsFaultReset
            | Self::PcsRunMicrogrid
            | Self::PcsStopMicrogrid
            | Self::PcsReadSummary => &[Device::Pcs],
            Self::AcbOpen | Self::AcbClose => &[Device::System, Device::Diesel],
            Self::Operation | Self::Shutdown | Self::Start | Self::Stop => &[],
        }
    }

    pub fn applies_to(&self, device: Device) -> bool {
        let devices = self.devices();
        devices.is_empty() || devices.contains(&device)
    }

    pub fn is_frequency(&self) -> bool {
        matches!(self, Self::PcsFreqUp | Self::PcsFreqDown | Self::PcsFreqReset)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid control command: {}", s)))
    }
}

/// Body of `POST /control`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub device: Device,
    pub action: Action,
}

impl CommandRequest {
    pub fn new(device: Device, action: Action) -> Self {
        Self { device, action }
    }

    /// Parse and validate a wire-level (device, action) pair against the vocabulary
    pub fn parse(device: &str, action: &str) -> Result<Self, AppError> {
        let device: Device = device.parse()?;
        let action: Action = action.parse()?;

        if !action.applies_to(device) {
            return Err(AppError::InvalidInput(format!(
                "Action {} is not valid for device {}",
                action, device
            )));
        }

        Ok(Self { device, action })
    }

    /// Component name used by the audit trail
    pub fn component(&self) -> &'static str {
        match (self.device, self.action) {
            (Device::Pcs, a) if a.is_frequency() => "Frequency Control",
            (Device::Diesel, Action::StartDg | Action::StopDg) => "Engine Control",
            (Device::Sbms, _) => "Battery Management",
            (Device::Pn14, _) => "Wind Power System",
            _ => "System Control",
        }
    }
}

/// Outcome of one dispatch, success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub original_request: CommandRequest,
}
