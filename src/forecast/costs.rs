//! Daily grid cost projection from hourly forecast points.

use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::stats::round_to;
use crate::domain::{DailyCostSummary, ForecastPoint};

/// Flat import/export rates per kWh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub import_rate: f64,
    pub export_rate: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            import_rate: 0.18,
            export_rate: 0.08,
        }
    }
}

/// Groups hourly points by local date; each point counts as one hour of energy.
pub fn daily_costs(points: &[ForecastPoint], tariff: &Tariff, tz: Tz) -> Vec<DailyCostSummary> {
    points
        .iter()
        .chunk_by(|p| p.timestamp.with_timezone(&tz).date_naive())
        .into_iter()
        .map(|(date, day)| {
            let mut consumption = 0.0;
            let mut generation = 0.0;
            let mut import = 0.0;
            let mut export = 0.0;
            for p in day {
                consumption += p.consumption_kw;
                generation += p.generation_kw;
                let net = p.generation_kw - p.consumption_kw;
                if net < 0.0 {
                    import += -net;
                } else {
                    export += net;
                }
            }

            let import_cost = import * tariff.import_rate;
            let export_revenue = export * tariff.export_rate;
            let net_cost = import_cost - export_revenue;
            let savings = consumption * tariff.import_rate - net_cost;
            let self_consumption_pct = if consumption > 0.0 {
                (consumption - import) / consumption * 100.0
            } else {
                0.0
            };

            DailyCostSummary {
                date,
                consumption_kwh: round_to(consumption, 2),
                generation_kwh: round_to(generation, 2),
                grid_import_kwh: round_to(import, 2),
                grid_export_kwh: round_to(export, 2),
                import_cost: round_to(import_cost, 2),
                export_revenue: round_to(export_revenue, 2),
                net_cost: round_to(net_cost, 2),
                savings: round_to(savings, 2),
                self_consumption_pct: round_to(self_consumption_pct, 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    fn point(ts: DateTime<Utc>, generation: f64, consumption: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: ts,
            generation_kw: generation,
            consumption_kw: consumption,
            net_energy_kw: round_to(generation - consumption, 2),
            temperature_c: None,
            cloud_cover_pct: None,
            wind_speed: None,
            condition: None,
            confidence_pct: 90,
        }
    }

    #[test]
    fn test_single_day_balance() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        // one hour importing 2 kWh, one hour exporting 3 kWh
        let points = vec![point(t0, 0.0, 2.0), point(t0 + Duration::hours(1), 4.0, 1.0)];
        let days = daily_costs(&points, &Tariff::default(), Tz::UTC);

        assert_eq!(days.len(), 1);
        let d = &days[0];
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(d.consumption_kwh, 3.0);
        assert_eq!(d.generation_kwh, 4.0);
        assert_eq!(d.grid_import_kwh, 2.0);
        assert_eq!(d.grid_export_kwh, 3.0);
        assert_eq!(d.import_cost, 0.36);
        assert_eq!(d.export_revenue, 0.24);
        assert_eq!(d.net_cost, 0.12);
        // 3 kWh at 0.18 would have cost 0.54
        assert_eq!(d.savings, 0.42);
        assert_eq!(d.self_consumption_pct, 33.3);
    }

    #[test]
    fn test_groups_by_local_date() {
        let start = Utc.with_ymd_and_hms(2024, 6, 9, 22, 0, 0).unwrap();
        let points: Vec<_> = (0..48).map(|h| point(start + Duration::hours(h), 0.0, 1.0)).collect();

        let utc_days = daily_costs(&points, &Tariff::default(), Tz::UTC);
        assert_eq!(utc_days.len(), 3);

        // local midnight in Stockholm is 22:00 UTC in June
        let local_days = daily_costs(&points, &Tariff::default(), chrono_tz::Europe::Stockholm);
        assert_eq!(local_days.len(), 2);
        assert!(local_days.iter().all(|d| d.consumption_kwh == 24.0));
    }

    #[test]
    fn test_empty_points() {
        assert!(daily_costs(&[], &Tariff::default(), Tz::UTC).is_empty());
    }
}
