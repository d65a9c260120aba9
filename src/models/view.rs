use serde::{Deserialize, Serialize};

/// Unified, UI-agnostic view of the whole site.
///
/// Every leaf always carries a concrete value; missing telemetry degrades to
/// the defaults below rather than to an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub skysails: SkySailsView,
    pub ess: EssView,
    pub diesel: DieselView,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KiteStatus {
    #[default]
    Standby,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkySailsView {
    /// m/s
    pub wind_speed: f64,
    /// N
    pub tension: f64,
    pub status: KiteStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssStatus {
    Active,
    #[default]
    Inactive,
}

impl EssStatus {
    pub fn from_switch(on: bool) -> Self {
        if on {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// Link health of a device as seen by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Normal,
    Offline,
}

impl LinkStatus {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Normal
        } else {
            Self::Offline
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssView {
    pub switch: bool,
    pub status: EssStatus,
    pub voltage: f64,
    pub current: f64,
    pub rack1: RackView,
    pub rack2: RackView,
    pub rack3: RackView,
    pub rack4: RackView,
    pub ups: UpsView,
    pub aircon: AirconView,
    pub pcs: PcsView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RackView {
    /// °C
    pub temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsView {
    /// percent
    pub load: i64,
    pub status: LinkStatus,
}

/// The backend has no air-conditioning telemetry; these are fixed placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirconView {
    pub status: String,
    pub temperature: f64,
    pub humidity: f64,
    pub mode: String,
}

impl Default for AirconView {
    fn default() -> Self {
        Self {
            status: "Running".to_string(),
            temperature: 3.0,
            humidity: 50.0,
            mode: "Cooling".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    On,
    #[default]
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    #[default]
    Microgrid,
    Mains,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcsStatus {
    Charging,
    #[default]
    Standby,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridStatus {
    Connected,
    #[default]
    Disconnected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultState {
    #[default]
    Normal,
    Fault,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcsView {
    /// Hz
    pub frequency: f64,
    pub voltage: f64,
    pub current: f64,
    pub status: LinkStatus,
    /// kW
    pub active_power: f64,
    /// kW, no backend source
    pub reactive_power: f64,
    /// percent
    pub load: i64,
    pub connection_status: ConnectionStatus,
    pub operating_mode: OperatingMode,
    pub pcs_status: PcsStatus,
    pub grid_status: GridStatus,
    pub supply_frequency: f64,
    pub dc_voltage: f64,
    pub fault: FaultState,
    pub line_voltage: f64,
    pub line_frequency: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    Auto,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerState {
    Open,
    #[default]
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselView {
    pub engine_switch: bool,
    pub status: DieselStatusView,
    pub power: DieselPowerView,
    pub other: DieselOtherView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselStatusView {
    /// 1 while the engine runs, 0 otherwise
    pub state: u8,
    pub mode: EngineMode,
    pub acb: BreakerState,
    pub frequency: f64,
    pub oil_pressure: f64,
    pub coolant_temp: f64,
    pub fuel: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselPowerView {
    pub l1_power: f64,
    pub l2_power: f64,
    pub l3_power: f64,
    pub l1_voltage: f64,
    pub l2_voltage: f64,
    pub l3_voltage: f64,
    pub l1_current: f64,
    pub l2_current: f64,
    pub l3_current: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselOtherView {
    pub battery_voltage: f64,
    pub field_voltage: f64,
    pub temperature: f64,
    pub power: f64,
}

/// Addressable leaves that local writers (optimistic commands, edit sessions)
/// may touch independently of polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPath {
    EssSwitch,
    EssStatus,
    DieselEngineSwitch,
    DieselState,
    DieselFrequency,
    PcsFrequency,
}

impl FieldPath {
    /// "<category>_<field>" key used by edit sessions
    pub fn key(&self) -> &'static str {
        match self {
            Self::EssSwitch => "ess_switch",
            Self::EssStatus => "ess_status",
            Self::DieselEngineSwitch => "diesel_engineSwitch",
            Self::DieselState => "diesel_state",
            Self::DieselFrequency => "diesel_frequency",
            Self::PcsFrequency => "pcs_frequency",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ess_switch" => Some(Self::EssSwitch),
            "ess_status" => Some(Self::EssStatus),
            "diesel_engineSwitch" => Some(Self::DieselEngineSwitch),
            "diesel_state" => Some(Self::DieselState),
            "diesel_frequency" => Some(Self::DieselFrequency),
            "pcs_frequency" => Some(Self::PcsFrequency),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Code(u8),
    Number(f64),
    Ess(EssStatus),
}

impl ViewModel {
    pub fn get(&self, path: FieldPath) -> FieldValue {
        match path {
            FieldPath::EssSwitch => FieldValue::Flag(self.ess.switch),
            FieldPath::EssStatus => FieldValue::Ess(self.ess.status),
            FieldPath::DieselEngineSwitch => FieldValue::Flag(self.diesel.engine_switch),
            FieldPath::DieselState => FieldValue::Code(self.diesel.status.state),
            FieldPath::DieselFrequency => FieldValue::Number(self.diesel.status.frequency),
            FieldPath::PcsFrequency => FieldValue::Number(self.ess.pcs.frequency),
        }
    }

    /// Write a single leaf. Returns false when the value kind does not match the path.
    pub fn set(&mut self, path: FieldPath, value: FieldValue) -> bool {
        match (path, value) {
            (FieldPath::EssSwitch, FieldValue::Flag(v)) => self.ess.switch = v,
            (FieldPath::EssStatus, FieldValue::Ess(v)) => self.ess.status = v,
            (FieldPath::DieselEngineSwitch, FieldValue::Flag(v)) => self.diesel.engine_switch = v,
            (FieldPath::DieselState, FieldValue::Code(v)) => self.diesel.status.state = v,
            (FieldPath::DieselFrequency, FieldValue::Number(v)) => self.diesel.status.frequency = v,
            (FieldPath::PcsFrequency, FieldValue::Number(v)) => self.ess.pcs.frequency = v,
            _ => return false,
        }
        true
    }

    /// Copy the given leaves from `other` into `self`
    pub fn copy_fields<'a, I>(&mut self, other: &ViewModel, paths: I)
    where
        I: IntoIterator<Item = &'a FieldPath>,
    {
        for path in paths {
            self.set(*path, other.get(*path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_initial_dashboard_state() {
        let view = ViewModel::default();

        assert_eq!(view.skysails.status, KiteStatus::Standby);
        assert!(!view.ess.switch);
        assert_eq!(view.ess.status, EssStatus::Inactive);
        assert_eq!(view.ess.aircon.status, "Running");
        assert_eq!(view.ess.pcs.connection_status, ConnectionStatus::Off);
        assert_eq!(view.ess.pcs.operating_mode, OperatingMode::Microgrid);
        assert_eq!(view.ess.pcs.fault, FaultState::Normal);
        assert_eq!(view.diesel.status.state, 0);
    }

    #[test]
    fn test_field_key_roundtrip() {
        for path in [
            FieldPath::EssSwitch,
            FieldPath::EssStatus,
            FieldPath::DieselEngineSwitch,
            FieldPath::DieselState,
            FieldPath::DieselFrequency,
            FieldPath::PcsFrequency,
        ] {
            assert_eq!(FieldPath::from_key(path.key()), Some(path));
        }
        assert_eq!(FieldPath::from_key("pcs_voltage"), None);
    }

    #[test]
    fn test_set_rejects_mismatched_kind() {
        let mut view = ViewModel::default();

        assert!(!view.set(FieldPath::EssSwitch, FieldValue::Number(1.0)));
        assert!(view.set(FieldPath::PcsFrequency, FieldValue::Number(59.9)));
        assert_eq!(view.ess.pcs.frequency, 59.9);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ViewModel::default()).unwrap();

        assert!(json["skysails"]["windSpeed"].is_number());
        assert_eq!(json["ess"]["pcs"]["connectionStatus"], "Off");
        assert!(json["diesel"]["engineSwitch"].is_boolean());
        assert!(json["diesel"]["power"]["l1Power"].is_number());
    }
}
