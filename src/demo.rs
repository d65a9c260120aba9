//! Demo mode: small random drift applied to the last known view while the
//! backend is unreachable, so a showroom dashboard does not look frozen.
//!
//! Only enabled through `demo.enabled`. Command-owned leaves (switches,
//! engine state, frequencies) are never touched.

use rand::Rng;

use crate::models::ViewModel;

/// Uniform step in `[-span / 2, span / 2)`
fn step<R: Rng + ?Sized>(rng: &mut R, span: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * span
}

/// Drift inside `[lo, hi]` when the value already sits in that band,
/// otherwise drift freely but stay non-negative.
fn drift<R: Rng + ?Sized>(rng: &mut R, value: f64, span: f64, lo: f64, hi: f64) -> f64 {
    let next = value + step(rng, span);
    if (lo..=hi).contains(&value) {
        next.clamp(lo, hi)
    } else {
        next.max(0.0)
    }
}

pub fn perturb<R: Rng + ?Sized>(view: &mut ViewModel, rng: &mut R) {
    let kite = &mut view.skysails;
    kite.wind_speed = (kite.wind_speed + step(rng, 2.0)).max(0.0);
    kite.tension = (kite.tension + step(rng, 100.0)).max(0.0);

    let pcs = &mut view.ess.pcs;
    pcs.voltage = drift(rng, pcs.voltage, 1.0, 95.0, 105.0);
    pcs.current = drift(rng, pcs.current, 0.5, 18.0, 22.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_perturb_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut view = ViewModel::default();
        view.ess.pcs.voltage = 100.0;
        view.ess.pcs.current = 20.0;

        for _ in 0..1_000 {
            perturb(&mut view, &mut rng);

            assert!(view.skysails.wind_speed >= 0.0);
            assert!(view.skysails.tension >= 0.0);
            assert!((95.0..=105.0).contains(&view.ess.pcs.voltage));
            assert!((18.0..=22.0).contains(&view.ess.pcs.current));
        }
    }

    #[test]
    fn test_perturb_leaves_command_fields_alone() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut view = ViewModel::default();
        view.skysails.wind_speed = 10.0;
        view.ess.switch = true;
        view.ess.pcs.frequency = 59.9;
        view.diesel.engine_switch = true;
        view.diesel.status.frequency = 50.0;
        let before = view.clone();

        perturb(&mut view, &mut rng);

        assert_ne!(view.skysails.wind_speed, before.skysails.wind_speed);
        assert_eq!(view.ess.switch, before.ess.switch);
        assert_eq!(view.ess.pcs.frequency, before.ess.pcs.frequency);
        assert_eq!(view.diesel, before.diesel);
    }

    #[test]
    fn test_out_of_band_values_are_not_snapped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut view = ViewModel::default();
        view.ess.pcs.voltage = 380.0;

        perturb(&mut view, &mut rng);

        assert!((379.0..=381.0).contains(&view.ess.pcs.voltage));
    }
}
