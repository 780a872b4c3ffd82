//! Storage stays within bounds under arbitrary daily forcing.

use hydroute_core::{Month, NodeId};
use hydroute_reservoir::{Reservoir, ReservoirParams, ReservoirRecord};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct Day {
    inflow: f64,
    demand: f64,
    precip: f64,
    evap: f64,
}

fn day() -> impl Strategy<Value = Day> {
    (0.0f64..5e7, 0.0f64..2e7, 0.0f64..30.0, 0.0f64..10.0).prop_map(
        |(inflow, demand, precip, evap)| Day {
            inflow,
            demand,
            precip,
            evap,
        },
    )
}

fn reservoir(capacity: f64, irrigation: bool) -> Reservoir {
    let record = ReservoirRecord {
        commission_year: 1,
        capacity,
        surface_area: 0.5,
        installed_capacity: 1,
        height: 20,
        purpose: [if irrigation { 2 } else { 1 }, 0, 0, 0, 0],
    };
    Reservoir::from_record(NodeId::new(0), &record, &ReservoirParams::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn storage_and_buffer_stay_in_bounds(
        capacity in 1e6f64..1e10,
        irrigation in any::<bool>(),
        days in prop::collection::vec(day(), 1..800),
    ) {
        let mut r = reservoir(capacity, irrigation);
        let mut month = Month::JANUARY;
        let mut day_of_month = 0;
        let mut year = 1;
        let mut water_in = 0.0;
        let mut water_out = 0.0;
        for d in &days {
            let spill = r.fill(d.inflow);
            r.record_inflow(d.inflow);
            water_in += d.inflow;
            water_out += spill;

            let release = r.daily_release(month);
            water_out += release.to_river;
            water_out += r.supply_irrigation(d.demand);

            let flux = r.update_surface(d.precip, d.evap);
            water_in += flux.precipitation;
            water_out += flux.evaporation + flux.spill;

            prop_assert!(r.storage() >= 0.0);
            prop_assert!(r.storage() <= r.capacity());
            prop_assert!(r.state().buffer.iter().all(|&b| b >= 0.0));

            day_of_month += 1;
            if day_of_month == month.days() {
                r.update_monthly(month, year);
                day_of_month = 0;
                month = month.next();
                if month == Month::JANUARY {
                    r.update_annual();
                    year += 1;
                }
            }
        }
        let balance = water_in - water_out - r.total_water();
        prop_assert!(balance.abs() <= 1e-6 * water_in.max(1.0));
    }
}
