//! Telemetry normalizer
//!
//! Maps the loosely typed `GET /status` payload onto the [`ViewModel`].
//! Never fails: absent or malformed fields fall back to the view defaults.

use jsonpath_lib as jsonpath;
use serde_json::Value;

use crate::models::view::{
    AirconView, BreakerState, ConnectionStatus, DieselOtherView, DieselPowerView,
    DieselStatusView, DieselView, EngineMode, EssStatus, EssView, FaultState, GridStatus,
    KiteStatus, LinkStatus, OperatingMode, PcsStatus, PcsView, RackView, SkySailsView, UpsView,
    ViewModel,
};

/// Build a fresh view from a raw snapshot.
///
/// A payload without a `devices` object (backend unreachable, proxy error page
/// parsed as JSON, ...) yields `previous` unchanged.
pub fn normalize(raw: &Value, previous: &ViewModel) -> ViewModel {
    if !raw.get("devices").map(Value::is_object).unwrap_or(false) {
        return previous.clone();
    }

    let t = Telemetry { root: raw };

    ViewModel {
        skysails: skysails(&t),
        ess: ess(&t),
        diesel: diesel(&t),
    }
}

/// `devices.global_status`, or the top-level `global_status` the backend actually sends
pub fn global_status(raw: &Value) -> Option<bool> {
    let t = Telemetry { root: raw };
    t.lookup("$.devices.global_status")
        .or_else(|| t.lookup("$.global_status"))
        .and_then(|v| v.as_bool())
}

fn skysails(t: &Telemetry) -> SkySailsView {
    SkySailsView {
        wind_speed: t.number("pn14", "wind"),
        tension: t.number("pn14", "force"),
        status: match t.text("pn14", "status").as_deref() {
            Some("Inactive") => KiteStatus::Standby,
            _ => KiteStatus::Active,
        },
    }
}

fn ess(t: &Telemetry) -> EssView {
    let active = t.flag("sbms", "active");

    EssView {
        switch: active,
        status: EssStatus::from_switch(active),
        voltage: t.number("sbms", "voltage"),
        current: t.number("sbms", "current"),
        rack1: rack(t, "rack1"),
        rack2: rack(t, "rack2"),
        rack3: rack(t, "rack3"),
        rack4: rack(t, "rack4"),
        ups: UpsView {
            // SOC stands in for UPS load
            load: t.number("sbms", "soc").round() as i64,
            status: LinkStatus::from_connected(t.flag("sbms", "connected")),
        },
        aircon: AirconView::default(),
        pcs: pcs(t),
    }
}

fn rack(t: &Telemetry, name: &str) -> RackView {
    RackView {
        temperature: t.number("sbms", &format!("{}.temperature", name)),
    }
}

fn pcs(t: &Telemetry) -> PcsView {
    let connected = t.flag("pcs", "connected");
    let power = t.number("pcs", "power");

    PcsView {
        frequency: t.number("pcs", "frequency"),
        voltage: t.number("pcs", "linevoltage"),
        current: t.number("pcs", "current"),
        status: LinkStatus::from_connected(connected),
        active_power: power,
        reactive_power: 0.0,
        // Placeholder formula kept for compatibility: kW read directly as percent
        load: (power / 100.0 * 100.0).round() as i64,
        connection_status: if connected {
            ConnectionStatus::On
        } else {
            ConnectionStatus::Off
        },
        operating_mode: if t.flag("pcs", "operationmode") {
            OperatingMode::Microgrid
        } else {
            OperatingMode::Mains
        },
        pcs_status: if t.code("pcs", "pcsstatus") == Some(1) {
            PcsStatus::Charging
        } else {
            PcsStatus::Standby
        },
        grid_status: if t.code("pcs", "gridstatus") == Some(1) {
            GridStatus::Connected
        } else {
            GridStatus::Disconnected
        },
        supply_frequency: t.number("pcs", "supplyfrequency"),
        dc_voltage: t.number("pcs", "dcvoltage"),
        // Only an explicit 0 is healthy; an absent fault word reads as a fault
        fault: match t.lookup("$.devices.pcs.fault") {
            Some(v) if v.as_f64() == Some(0.0) => FaultState::Normal,
            _ => FaultState::Fault,
        },
        line_voltage: t.number("pcs", "linevoltage"),
        line_frequency: t.number("pcs", "linefrequency"),
    }
}

fn diesel(t: &Telemetry) -> DieselView {
    let flags = translate_diesel_status(t.lookup("$.devices.diesel.status").as_ref());

    DieselView {
        engine_switch: flags.running,
        status: DieselStatusView {
            state: u8::from(flags.running),
            mode: flags.mode,
            acb: flags.acb,
            frequency: t.number("diesel", "frequency"),
            oil_pressure: t.number("diesel", "oilpressure"),
            coolant_temp: t.number("diesel", "coolertemperature"),
            fuel: t.number("diesel", "fuel"),
        },
        power: DieselPowerView {
            l1_power: t.number("diesel", "l1power"),
            l2_power: t.number("diesel", "l2power"),
            l3_power: t.number("diesel", "l3power"),
            l1_voltage: t.number("diesel", "l1l2voltage"),
            l2_voltage: t.number("diesel", "l2l3voltage"),
            l3_voltage: t.number("diesel", "l3l1voltage"),
            l1_current: t.number("diesel", "l1current"),
            l2_current: t.number("diesel", "l2current"),
            l3_current: t.number("diesel", "l3current"),
        },
        other: DieselOtherView {
            battery_voltage: t.number("diesel", "batteryvoltage"),
            field_voltage: t.number("diesel", "chargemagneticvoltage"),
            temperature: t.number("diesel", "temperature"),
            power: t.number("diesel", "power"),
        },
    }
}

/// Engine flags recovered from the diesel controller's `status` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DieselStatusFlags {
    pub running: bool,
    pub mode: EngineMode,
    pub acb: BreakerState,
}

/// Compatibility shim for the diesel `status` field.
///
/// Free text is substring-matched exactly like the legacy dashboard did
/// ("Started" = running, "Auto" = auto mode, "OFF" = breaker open). Numeric
/// controller codes are 0 stopped, 1 starting, 2 running, 3 fault. Replace
/// this function if the backend ever reports structured engine state.
pub fn translate_diesel_status(raw: Option<&Value>) -> DieselStatusFlags {
    match raw {
        Some(Value::String(text)) => DieselStatusFlags {
            running: text.contains("Started"),
            mode: if text.contains("Auto") {
                EngineMode::Auto
            } else {
                EngineMode::Manual
            },
            acb: if text.contains("OFF") {
                BreakerState::Open
            } else {
                BreakerState::Closed
            },
        },
        Some(Value::Number(code)) => DieselStatusFlags {
            running: matches!(code.as_i64(), Some(1) | Some(2)),
            mode: EngineMode::Manual,
            acb: BreakerState::Closed,
        },
        _ => DieselStatusFlags {
            running: false,
            mode: EngineMode::Manual,
            acb: BreakerState::Closed,
        },
    }
}

struct Telemetry<'a> {
    root: &'a Value,
}

impl Telemetry<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        jsonpath::select(self.root, path)
            .ok()
            .and_then(|v| v.into_iter().next().cloned())
    }

    fn field(&self, device: &str, field: &str) -> Option<Value> {
        self.lookup(&format!("$.devices.{}.{}", device, field))
    }

    /// Numeric field; numeric strings are accepted, anything else reads as 0
    fn number(&self, device: &str, field: &str) -> f64 {
        let value = match self.field(device, field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// Truthiness: non-zero numbers, non-empty strings and `true`
    fn flag(&self, device: &str, field: &str) -> bool {
        match self.field(device, field) {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
            Some(Value::Null) | None => false,
        }
    }

    /// Strict integer code, `None` when absent or not an integer
    fn code(&self, device: &str, field: &str) -> Option<i64> {
        self.field(device, field).and_then(|v| v.as_i64())
    }

    fn text(&self, device: &str, field: &str) -> Option<String> {
        self.field(device, field)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "devices": {
                "pn14": {"wind": 12.3, "force": 450, "status": "Active", "connected": true},
                "sbms": {
                    "active": true, "connected": true, "voltage": 768.4, "current": 12.5,
                    "soc": 81.6, "soh": 99,
                    "rack1": {"temperature": 24.5}, "rack2": {"temperature": 25.0},
                    "rack3": {"temperature": 25.5}, "rack4": {"temperature": 26.0}
                },
                "pcs": {
                    "connected": true, "frequency": 59.9, "linevoltage": 380.2, "current": 40.1,
                    "power": 42.4, "operationmode": 1, "pcsstatus": 1, "gridstatus": 0,
                    "supplyfrequency": 60.0, "dcvoltage": 760.0, "fault": 0,
                    "linefrequency": 60.0
                },
                "diesel": {
                    "connected": true, "status": "Started Auto", "frequency": 60.01,
                    "oilpressure": 4, "coolertemperature": 82, "fuel": 70,
                    "l1power": 10, "l2power": 11, "l3power": 12,
                    "l1l2voltage": 380, "l2l3voltage": 381, "l3l1voltage": 382,
                    "l1current": 15, "l2current": 16, "l3current": 17,
                    "batteryvoltage": 24.4, "chargemagneticvoltage": 27.1,
                    "temperature": 82, "power": 33
                }
            },
            "global_status": true
        })
    }

    #[test]
    fn test_skysails_scenario() {
        let raw = json!({"devices": {"pn14": {"wind": 12.3, "force": 450, "status": "Active"}}});
        let view = normalize(&raw, &ViewModel::default());

        assert_eq!(
            view.skysails,
            SkySailsView {
                wind_speed: 12.3,
                tension: 450.0,
                status: KiteStatus::Active,
            }
        );
    }

    #[test]
    fn test_inactive_kite_maps_to_standby() {
        let raw = json!({"devices": {"pn14": {"status": "Inactive"}}});
        let view = normalize(&raw, &ViewModel::default());

        assert_eq!(view.skysails.status, KiteStatus::Standby);
    }

    #[test]
    fn test_missing_devices_is_noop() {
        let mut previous = ViewModel::default();
        previous.skysails.wind_speed = 7.5;
        previous.ess.pcs.frequency = 59.95;

        assert_eq!(normalize(&json!({}), &previous), previous);
        assert_eq!(normalize(&json!({"error": "down"}), &previous), previous);
        assert_eq!(normalize(&json!({"devices": null}), &previous), previous);
    }

    #[test]
    fn test_full_payload() {
        let view = normalize(&full_payload(), &ViewModel::default());

        assert!(view.ess.switch);
        assert_eq!(view.ess.status, EssStatus::Active);
        assert_eq!(view.ess.rack3.temperature, 25.5);
        assert_eq!(view.ess.ups.load, 82);
        assert_eq!(view.ess.ups.status, LinkStatus::Normal);

        let pcs = &view.ess.pcs;
        assert_eq!(pcs.frequency, 59.9);
        assert_eq!(pcs.voltage, 380.2);
        assert_eq!(pcs.active_power, 42.4);
        assert_eq!(pcs.reactive_power, 0.0);
        assert_eq!(pcs.load, 42);
        assert_eq!(pcs.connection_status, ConnectionStatus::On);
        assert_eq!(pcs.operating_mode, OperatingMode::Microgrid);
        assert_eq!(pcs.pcs_status, PcsStatus::Charging);
        assert_eq!(pcs.grid_status, GridStatus::Disconnected);
        assert_eq!(pcs.fault, FaultState::Normal);

        let diesel = &view.diesel;
        assert!(diesel.engine_switch);
        assert_eq!(diesel.status.state, 1);
        assert_eq!(diesel.status.mode, EngineMode::Auto);
        assert_eq!(diesel.status.acb, BreakerState::Closed);
        assert_eq!(diesel.power.l1_voltage, 380.0);
        assert_eq!(diesel.power.l3_voltage, 382.0);
        assert_eq!(diesel.other.field_voltage, 27.1);
    }

    #[test]
    fn test_pcs_offline_and_faulted() {
        let raw = json!({"devices": {"pcs": {"connected": false, "fault": 3, "operationmode": 0}}});
        let pcs = normalize(&raw, &ViewModel::default()).ess.pcs;

        assert_eq!(pcs.status, LinkStatus::Offline);
        assert_eq!(pcs.connection_status, ConnectionStatus::Off);
        assert_eq!(pcs.operating_mode, OperatingMode::Mains);
        assert_eq!(pcs.fault, FaultState::Fault);
    }

    #[test]
    fn test_pcs_fault_needs_explicit_zero() {
        for fault in [json!(null), json!("0"), json!(1)] {
            let raw = json!({"devices": {"pcs": {"connected": true, "fault": fault}}});
            let pcs = normalize(&raw, &ViewModel::default()).ess.pcs;
            assert_eq!(pcs.fault, FaultState::Fault, "fault word {}", fault);
        }

        let raw = json!({"devices": {"pcs": {"connected": true}}});
        assert_eq!(
            normalize(&raw, &ViewModel::default()).ess.pcs.fault,
            FaultState::Fault
        );

        let raw = json!({"devices": {"pcs": {"connected": true, "fault": 0}}});
        assert_eq!(
            normalize(&raw, &ViewModel::default()).ess.pcs.fault,
            FaultState::Normal
        );
    }

    #[test]
    fn test_placeholder_strings_default_to_zero() {
        let raw = json!({"devices": {
            "pn14": {"wind": "--", "force": "--", "status": "--"},
            "diesel": {"fuel": "--", "frequency": "59.8"}
        }});
        let view = normalize(&raw, &ViewModel::default());

        assert_eq!(view.skysails.wind_speed, 0.0);
        assert_eq!(view.skysails.status, KiteStatus::Active);
        assert_eq!(view.diesel.status.fuel, 0.0);
        assert_eq!(view.diesel.status.frequency, 59.8);
    }

    #[test]
    fn test_diesel_status_shim() {
        let stopped = translate_diesel_status(Some(&json!("Stopped Manual ACB OFF")));
        assert_eq!(
            stopped,
            DieselStatusFlags {
                running: false,
                mode: EngineMode::Manual,
                acb: BreakerState::Open,
            }
        );

        assert!(translate_diesel_status(Some(&json!(2))).running);
        assert!(!translate_diesel_status(Some(&json!(3))).running);
        assert!(!translate_diesel_status(None).running);
    }

    #[test]
    fn test_global_status() {
        assert_eq!(global_status(&full_payload()), Some(true));
        assert_eq!(
            global_status(&json!({"devices": {"global_status": false}})),
            Some(false)
        );
        assert_eq!(global_status(&json!({})), None);
    }

    fn has_null_leaf(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Array(items) => items.iter().any(has_null_leaf),
            Value::Object(map) => map.values().any(has_null_leaf),
            _ => false,
        }
    }

    fn random_partial(rng: &mut StdRng, full: &Value) -> Value {
        let mut partial = json!({"devices": {}});
        let devices = full["devices"].as_object().unwrap();

        for (name, fields) in devices {
            if rng.gen_bool(0.25) {
                continue;
            }
            let mut kept = serde_json::Map::new();
            for (key, value) in fields.as_object().unwrap() {
                match rng.gen_range(0..4) {
                    0 => {}
                    1 => {
                        kept.insert(key.clone(), Value::Null);
                    }
                    2 => {
                        kept.insert(key.clone(), json!("--"));
                    }
                    _ => {
                        kept.insert(key.clone(), value.clone());
                    }
                }
            }
            partial["devices"][name] = Value::Object(kept);
        }

        partial
    }

    #[test]
    fn test_random_partial_payloads_have_no_null_leaves() {
        let full = full_payload();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let raw = random_partial(&mut rng, &full);
            let view = normalize(&raw, &ViewModel::default());
            let json = serde_json::to_value(&view).unwrap();

            assert!(!has_null_leaf(&json), "null leaf for payload {}", raw);
            assert!(view.ess.pcs.frequency.is_finite());
        }
    }
}
